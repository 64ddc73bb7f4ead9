//! # Document
//!
//! A chapter's node tree. Blocks sit behind `Arc` so that cloning a document
//! for a new snapshot shares every block an edit does not touch; edits go
//! through [`Document::block_mut`], which copies a block on first write.

use crate::visitor::{walk_annotation, Visitor};
use crate::{
    AnnotationRange, Block, Inline, NodeKey, Point, Reference, Selection, TextRun,
};
use std::cmp::Ordering;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    blocks: Vec<Arc<Block>>,
}

/// Where a node lives in the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeLocation {
    /// Index of the containing block
    pub block: usize,
    /// Index among the block's children, `None` for the block itself
    pub index: Option<usize>,
    /// Index inside an annotation when the node is an annotation child
    pub child: Option<usize>,
}

impl Document {
    /// Empty chapter: one blank paragraph
    pub fn new() -> Self {
        Self::from_blocks(vec![Block::empty_paragraph()])
    }

    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        let mut blocks: Vec<Arc<Block>> = blocks.into_iter().map(Arc::new).collect();
        if blocks.is_empty() {
            blocks.push(Arc::new(Block::empty_paragraph()));
        }
        Self { blocks }
    }

    /// Wrap a whole string as a single paragraph of plain text
    pub fn from_plain_text(text: &str) -> Self {
        Self::from_blocks(vec![Block::paragraph(vec![Inline::Text(TextRun::plain(
            text,
        ))])])
    }

    pub fn blocks(&self) -> &[Arc<Block>] {
        &self.blocks
    }

    pub fn block(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index).map(Arc::as_ref)
    }

    /// Mutable access to a block, detaching it from other snapshots
    pub fn block_mut(&mut self, index: usize) -> Option<&mut Block> {
        self.blocks.get_mut(index).map(Arc::make_mut)
    }

    pub fn insert_block(&mut self, index: usize, block: Block) {
        let index = index.min(self.blocks.len());
        self.blocks.insert(index, Arc::new(block));
    }

    /// Remove a block; the last block is replaced by a blank paragraph
    pub fn remove_block(&mut self, index: usize) -> Option<Block> {
        if index >= self.blocks.len() {
            return None;
        }
        let removed = self.blocks.remove(index);
        if self.blocks.is_empty() {
            self.blocks.push(Arc::new(Block::empty_paragraph()));
        }
        Some(Arc::unwrap_or_clone(removed))
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Whether `other` shares the block at `index` without copying it
    pub fn shares_block(&self, other: &Document, index: usize) -> bool {
        match (self.blocks.get(index), other.blocks.get(index)) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn locate(&self, key: NodeKey) -> Option<NodeLocation> {
        for (block_index, block) in self.blocks.iter().enumerate() {
            if block.key == key {
                return Some(NodeLocation {
                    block: block_index,
                    index: None,
                    child: None,
                });
            }
            for (index, inline) in block.children.iter().enumerate() {
                if inline.key() == key {
                    return Some(NodeLocation {
                        block: block_index,
                        index: Some(index),
                        child: None,
                    });
                }
                if let Inline::Annotation(annotation) = inline {
                    if let Some(child) = annotation.children.iter().position(|c| c.key() == key)
                    {
                        return Some(NodeLocation {
                            block: block_index,
                            index: Some(index),
                            child: Some(child),
                        });
                    }
                }
            }
        }
        None
    }

    /// Whether a node with this key is attached to the tree
    pub fn contains(&self, key: NodeKey) -> bool {
        self.locate(key).is_some()
    }

    pub fn find_inline(&self, key: NodeKey) -> Option<&Inline> {
        let location = self.locate(key)?;
        let block = self.blocks.get(location.block)?;
        let inline = block.children.get(location.index?)?;
        match (inline, location.child) {
            (Inline::Annotation(annotation), Some(child)) => annotation.children.get(child),
            (inline, None) => Some(inline),
            _ => None,
        }
    }

    pub fn find_text(&self, key: NodeKey) -> Option<&TextRun> {
        match self.find_inline(key)? {
            Inline::Text(run) => Some(run),
            _ => None,
        }
    }

    /// Mutable text run lookup; copies the containing block on write
    pub fn find_text_mut(&mut self, key: NodeKey) -> Option<&mut TextRun> {
        let location = self.locate(key)?;
        let block = self.block_mut(location.block)?;
        let inline = block.children.get_mut(location.index?)?;
        let inline = match (inline, location.child) {
            (Inline::Annotation(annotation), Some(child)) => annotation.children.get_mut(child)?,
            (inline, None) => inline,
            _ => return None,
        };
        match inline {
            Inline::Text(run) => Some(run),
            _ => None,
        }
    }

    /// Keys from `key` up to its block: node, enclosing annotation, block
    pub fn ancestry(&self, key: NodeKey) -> Vec<NodeKey> {
        let Some(location) = self.locate(key) else {
            return Vec::new();
        };
        let block = &self.blocks[location.block];
        let mut chain = vec![key];
        if let (Some(index), Some(_)) = (location.index, location.child) {
            chain.push(block.children[index].key());
        }
        if location.index.is_some() {
            chain.push(block.key);
        }
        chain
    }

    /// Order points by document position; `None` if either is detached
    pub fn compare_points(&self, a: &Point, b: &Point) -> Option<Ordering> {
        let a = self.position_of(a)?;
        let b = self.position_of(b)?;
        Some(a.cmp(&b))
    }

    /// `(block index, linear offset in block)` of a point
    pub fn position_of(&self, point: &Point) -> Option<(usize, usize)> {
        let location = self.locate(point.key)?;
        let offset = self.blocks[location.block].offset_of(point)?;
        Some((location.block, offset))
    }

    /// All text runs in document order
    pub fn text_runs(&self) -> Vec<&TextRun> {
        struct Runs<'a>(Vec<&'a TextRun>);
        impl<'a> Visitor<'a> for Runs<'a> {
            fn visit_text(&mut self, run: &'a TextRun) {
                self.0.push(run);
            }
        }
        let mut runs = Runs(Vec::new());
        runs.visit_document(self);
        runs.0
    }

    /// Blocks joined by newlines; references render as `@name`
    pub fn plain_text(&self) -> String {
        self.blocks
            .iter()
            .map(|block| block.text_content())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Distinct annotation ids in order of first appearance
    pub fn annotation_ids(&self) -> Vec<String> {
        struct Ids(Vec<String>);
        impl<'a> Visitor<'a> for Ids {
            fn visit_annotation(&mut self, annotation: &'a AnnotationRange) {
                for id in &annotation.ids {
                    if !self.0.contains(id) {
                        self.0.push(id.clone());
                    }
                }
                walk_annotation(self, annotation);
            }
        }
        let mut ids = Ids(Vec::new());
        ids.visit_document(self);
        ids.0
    }

    /// Keys of the references pointing at `entity_id`
    pub fn references_to(&self, entity_id: &str) -> Vec<NodeKey> {
        struct Refs<'e> {
            entity_id: &'e str,
            found: Vec<NodeKey>,
        }
        impl<'a> Visitor<'a> for Refs<'_> {
            fn visit_reference(&mut self, reference: &'a Reference) {
                if reference.entity_id == self.entity_id {
                    self.found.push(reference.key);
                }
            }
        }
        let mut refs = Refs {
            entity_id,
            found: Vec::new(),
        };
        refs.visit_document(self);
        refs.found
    }

    /// Selection spanning every leaf tagged with annotation `id`.
    ///
    /// Used to jump from an annotation's record to its place in the text.
    pub fn locate_annotation(&self, id: &str) -> Option<Selection> {
        let mut first: Option<Point> = None;
        let mut last: Option<Point> = None;
        for block in &self.blocks {
            for inline in &block.children {
                let Inline::Annotation(annotation) = inline else {
                    continue;
                };
                if !annotation.has_id(id) {
                    continue;
                }
                for child in &annotation.children {
                    let (key, len) = match child {
                        Inline::Text(run) => (run.key, run.char_len()),
                        Inline::Reference(reference) => (reference.key, 1),
                        Inline::Annotation(_) => continue,
                    };
                    first.get_or_insert(Point::new(key, 0));
                    last = Some(Point::new(key, len));
                }
            }
        }
        Some(Selection::new(first?, last?))
    }

    /// Annotation node whose primary id is `id`
    pub fn annotation_by_primary_id(&self, id: &str) -> Option<&AnnotationRange> {
        self.blocks.iter().flat_map(|block| block.children.iter()).find_map(|inline| {
            match inline {
                Inline::Annotation(annotation) if annotation.primary_id() == Some(id) => {
                    Some(annotation)
                }
                _ => None,
            }
        })
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
