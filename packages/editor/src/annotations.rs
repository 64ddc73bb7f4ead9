//! # Annotation and Reference Edits
//!
//! Annotations are flat: a leaf is covered by at most one annotation node,
//! and overlapping annotations share that node's id list. Wrapping therefore
//! rewrites leaf tags rather than nesting nodes:
//!
//! ```text
//! before   plain[He]  note{a}[llo wo]  plain[rld]
//! wrap b   over "ello w"
//! after    plain[H]  {b}[e]  {a,b}[llo w]  {a}[o]  plain[rld]
//! ```

use crate::edits::{caret_at, cut_block, delete_bounds, missing_block, resolve, set_leaves};
use crate::mutations::{MutationError, MutationOutcome};
use novella_document::leaves::{cut, Leaf, LeafNode, Mark};
use novella_document::visitor::{walk_block, walk_block_mut, Visitor, VisitorMut};
use novella_document::{
    AnnotationRange, Block, Document, EntityKind, Inline, NodeKey, Reference, Selection, TextFormat,
    TextRun,
};
use std::collections::{HashMap, HashSet};

pub(crate) fn wrap(
    doc: &mut Document,
    selection: &Selection,
    id: &str,
) -> Result<MutationOutcome, MutationError> {
    let bounds = resolve(doc, selection)?;
    if bounds.is_collapsed() {
        return Ok(MutationOutcome::unchanged());
    }

    let mut changed = false;
    for index in bounds.start_block..=bounds.end_block {
        let (start, end) = bounds.within(index);
        let mut cut = cut_block(doc, index, start, end)?;
        let range = cut.range.clone();
        if range.is_empty() {
            continue;
        }

        // Annotations reaching outside the selection are split; only the
        // covered part gains the id
        let outside: HashSet<NodeKey> = cut
            .leaves
            .iter()
            .enumerate()
            .filter(|(i, _)| !range.contains(i))
            .filter_map(|(_, leaf)| leaf.mark.as_ref().map(|mark| mark.key))
            .collect();
        let wrapper = NodeKey::fresh();
        let mut split = HashMap::new();
        let mut block_changed = false;

        for leaf in &mut cut.leaves[range] {
            match &mut leaf.mark {
                Some(mark) => {
                    if mark.ids.iter().any(|existing| existing == id) {
                        continue;
                    }
                    if outside.contains(&mark.key) {
                        mark.key = *split.entry(mark.key).or_insert_with(NodeKey::fresh);
                    }
                    mark.ids.push(id.to_string());
                }
                None => {
                    leaf.mark = Some(Mark {
                        key: wrapper,
                        ids: vec![id.to_string()],
                    })
                }
            }
            block_changed = true;
        }
        if block_changed {
            set_leaves(doc, index, cut.leaves)?;
            changed = true;
        }
    }

    if changed {
        tracing::debug!(id, "wrapped selection in annotation");
    }
    Ok(MutationOutcome {
        changed,
        caret: None,
    })
}

pub(crate) fn unwrap(doc: &mut Document, key: NodeKey) -> Result<MutationOutcome, MutationError> {
    let location = doc.locate(key).ok_or(MutationError::NodeNotFound(key))?;
    let index = location.index.ok_or(MutationError::NotAnAnnotation(key))?;
    let block = doc
        .block_mut(location.block)
        .ok_or_else(|| missing_block(location.block))?;
    if !matches!(block.children.get(index), Some(Inline::Annotation(_))) {
        return Err(MutationError::NotAnAnnotation(key));
    }
    if let Inline::Annotation(annotation) = block.children.remove(index) {
        block.children.splice(index..index, annotation.children);
    }
    block.normalize();
    Ok(MutationOutcome::changed())
}

pub(crate) fn remove_id(doc: &mut Document, id: &str) -> MutationOutcome {
    let mut changed = false;
    for index in 0..doc.block_count() {
        let holds_id = doc.block(index).is_some_and(|block| {
            block.children.iter().any(|inline| match inline {
                Inline::Annotation(annotation) => annotation.has_id(id),
                _ => false,
            })
        });
        if !holds_id {
            continue;
        }
        if let Some(block) = doc.block_mut(index) {
            for inline in &mut block.children {
                if let Inline::Annotation(annotation) = inline {
                    annotation.ids.retain(|existing| existing != id);
                }
            }
            block.normalize();
            changed = true;
        }
    }
    MutationOutcome {
        changed,
        caret: None,
    }
}

/// Replace the selection with a reference followed by a separator space.
///
/// The text after the caret moves into the separator's run, so the result is
/// `host text | reference | " " + rest`, and the caret lands after the space.
pub(crate) fn insert_reference(
    doc: &mut Document,
    selection: &Selection,
    entity_id: &str,
    display_name: &str,
    entity_kind: EntityKind,
) -> Result<MutationOutcome, MutationError> {
    let bounds = resolve(doc, selection)?;
    let (block_index, position) = if bounds.is_collapsed() {
        let position = doc
            .position_of(&bounds.start)
            .ok_or(MutationError::NodeNotFound(bounds.start.key))?;
        (bounds.start_block, position.1)
    } else {
        delete_bounds(doc, &bounds)?
    };

    let block = doc
        .block_mut(block_index)
        .ok_or_else(|| missing_block(block_index))?;
    let point = if bounds.is_collapsed() {
        bounds.start
    } else {
        block
            .text_point_at(position)
            .ok_or_else(|| missing_block(block_index))?
    };
    let mut cut = cut(block, Some(&point), None).ok_or(MutationError::OffsetOutOfRange {
        key: point.key,
        offset: point.offset,
    })?;

    let (mark, format) = host_style(&cut.leaves, point.key);
    let at = cut.range.start;
    cut.leaves.splice(
        at..at,
        [
            Leaf {
                mark: mark.clone(),
                node: LeafNode::Reference(Reference::new(entity_id, display_name, entity_kind)),
            },
            Leaf {
                mark,
                node: LeafNode::Text(TextRun::new(" ", format)),
            },
        ],
    );
    set_leaves(doc, block_index, cut.leaves)?;

    tracing::debug!(entity_id, kind = %entity_kind, "inserted reference");
    let caret = caret_at(doc, block_index, position + 2);
    Ok(MutationOutcome::changed().with_caret(caret))
}

/// Annotation tag and format of the leaf a caret sits on
fn host_style(leaves: &[Leaf], key: NodeKey) -> (Option<Mark>, TextFormat) {
    leaves
        .iter()
        .find(|leaf| leaf.node.key() == key)
        .map(|leaf| {
            let format = leaf.text().map(|run| run.format).unwrap_or_default();
            (leaf.mark.clone(), format)
        })
        .unwrap_or_default()
}

pub(crate) fn rename_reference(doc: &mut Document, entity_id: &str, display_name: &str) -> MutationOutcome {
    struct Stale<'e> {
        entity_id: &'e str,
        display_name: &'e str,
        found: bool,
    }
    impl<'a> Visitor<'a> for Stale<'_> {
        fn visit_reference(&mut self, reference: &'a Reference) {
            if reference.entity_id == self.entity_id && reference.display_name != self.display_name {
                self.found = true;
            }
        }
    }

    struct Rename<'e> {
        entity_id: &'e str,
        display_name: &'e str,
    }
    impl VisitorMut for Rename<'_> {
        fn visit_reference_mut(&mut self, reference: &mut Reference) {
            if reference.entity_id == self.entity_id {
                reference.display_name = self.display_name.to_string();
            }
        }
    }

    let mut changed = false;
    for index in 0..doc.block_count() {
        let stale = doc.block(index).is_some_and(|block: &Block| {
            let mut stale = Stale {
                entity_id,
                display_name,
                found: false,
            };
            walk_block(&mut stale, block);
            stale.found
        });
        if !stale {
            continue;
        }
        if let Some(block) = doc.block_mut(index) {
            walk_block_mut(
                &mut Rename {
                    entity_id,
                    display_name,
                },
                block,
            );
            changed = true;
        }
    }
    MutationOutcome {
        changed,
        caret: None,
    }
}

/// Annotation node covering a text run, if any
pub fn annotation_of(doc: &Document, key: NodeKey) -> Option<&AnnotationRange> {
    let location = doc.locate(key)?;
    location.child?;
    match doc.block(location.block)?.children.get(location.index?)? {
        Inline::Annotation(annotation) => Some(annotation),
        _ => None,
    }
}
