//! # Leaf Segments
//!
//! Structural edits (wrapping, deleting, splitting, formatting) work on a
//! flattened view of one block: a list of text and reference leaves, each
//! tagged with the annotation it sits in. Edits cut the list at caret points,
//! rewrite the tags or drop leaves, then [`rebuild`] the inline tree.
//!
//! [`normalize`] is applied after every structural edit:
//! - annotations without ids are unwrapped
//! - empty text runs are dropped (a block keeps one if it would be empty)
//! - adjacent annotations with identical ids merge into one node
//! - adjacent runs with identical format inside the same parent merge

use crate::{AnnotationRange, Block, Inline, NodeKey, Point, Reference, TextRun};
use std::collections::HashSet;
use std::ops::Range;

/// Annotation tag of a leaf
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mark {
    pub key: NodeKey,
    pub ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeafNode {
    Text(TextRun),
    Reference(Reference),
}

impl LeafNode {
    pub fn key(&self) -> NodeKey {
        match self {
            LeafNode::Text(run) => run.key,
            LeafNode::Reference(reference) => reference.key,
        }
    }

    fn into_inline(self) -> Inline {
        match self {
            LeafNode::Text(run) => Inline::Text(run),
            LeafNode::Reference(reference) => Inline::Reference(reference),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leaf {
    pub mark: Option<Mark>,
    pub node: LeafNode,
}

impl Leaf {
    pub fn text(&self) -> Option<&TextRun> {
        match &self.node {
            LeafNode::Text(run) => Some(run),
            LeafNode::Reference(_) => None,
        }
    }

    fn same_parent(&self, other: &Leaf) -> bool {
        match (&self.mark, &other.mark) {
            (None, None) => true,
            (Some(a), Some(b)) => a.key == b.key,
            _ => false,
        }
    }
}

/// Flatten inline children into leaves.
///
/// Nested annotations (only found in imported documents) collapse into one
/// tag carrying the union of their ids.
pub fn flatten(children: Vec<Inline>) -> Vec<Leaf> {
    let mut leaves = Vec::new();
    flatten_into(children, None, &mut leaves);
    leaves
}

fn flatten_into(children: Vec<Inline>, mark: Option<&Mark>, out: &mut Vec<Leaf>) {
    for inline in children {
        match inline {
            Inline::Text(run) => out.push(Leaf {
                mark: mark.cloned(),
                node: LeafNode::Text(run),
            }),
            Inline::Reference(reference) => out.push(Leaf {
                mark: mark.cloned(),
                node: LeafNode::Reference(reference),
            }),
            Inline::Annotation(annotation) => {
                let mut ids = mark.map(|m| m.ids.clone()).unwrap_or_default();
                for id in annotation.ids {
                    if !ids.contains(&id) {
                        ids.push(id);
                    }
                }
                let inner = Mark {
                    key: annotation.key,
                    ids,
                };
                flatten_into(annotation.children, Some(&inner), out);
            }
        }
    }
}

/// Group consecutive leaves sharing an annotation key back into a tree
///
/// A key whose leaves are not contiguous yields several nodes; every node
/// after the first gets a fresh key.
pub fn rebuild(leaves: Vec<Leaf>) -> Vec<Inline> {
    let mut out: Vec<Inline> = Vec::new();
    let mut seen = HashSet::new();
    let mut open_key = None;
    for leaf in leaves {
        let Some(mark) = leaf.mark else {
            out.push(leaf.node.into_inline());
            open_key = None;
            continue;
        };
        if let (Some(open), Some(Inline::Annotation(node))) = (open_key, out.last_mut()) {
            if open == mark.key {
                node.children.push(leaf.node.into_inline());
                continue;
            }
        }
        let key = if seen.insert(mark.key) {
            mark.key
        } else {
            NodeKey::fresh()
        };
        open_key = Some(mark.key);
        out.push(Inline::Annotation(AnnotationRange {
            key,
            ids: mark.ids,
            children: vec![leaf.node.into_inline()],
        }));
    }
    out
}

/// Canonical form of a block's inline children
pub fn normalize(children: Vec<Inline>) -> Vec<Inline> {
    let mut merged: Vec<Leaf> = Vec::new();
    for mut leaf in flatten(children) {
        if leaf.mark.as_ref().is_some_and(|mark| mark.ids.is_empty()) {
            leaf.mark = None;
        }
        if leaf.text().is_some_and(|run| run.text.is_empty()) {
            continue;
        }
        if let Some(prev) = merged.last() {
            if let (Some(prev_mark), Some(mark)) = (&prev.mark, &mut leaf.mark) {
                if prev_mark.ids == mark.ids {
                    mark.key = prev_mark.key;
                }
            }
        }
        if let Some(prev) = merged.last_mut() {
            if prev.same_parent(&leaf) {
                if let (LeafNode::Text(prev_run), LeafNode::Text(run)) =
                    (&mut prev.node, &leaf.node)
                {
                    if prev_run.format == run.format {
                        prev_run.text.push_str(&run.text);
                        continue;
                    }
                }
            }
        }
        merged.push(leaf);
    }

    if merged.is_empty() {
        return vec![Inline::Text(TextRun::plain(""))];
    }
    rebuild(merged)
}

impl Block {
    /// Re-establish the canonical inline form after an edit
    pub fn normalize(&mut self) {
        let children = std::mem::take(&mut self.children);
        self.children = normalize(children);
    }

    /// Text point for a caret position, creating an empty run when the
    /// position only borders references (block edges, between references).
    ///
    /// The run is left in place un-normalized so the caller can type into it.
    pub fn text_point_at(&mut self, position: usize) -> Option<Point> {
        if let Some(point) = self.text_point(position) {
            return Some(point);
        }
        if position > self.position_len() {
            return None;
        }

        let mut leaves = flatten(std::mem::take(&mut self.children));
        let mut acc = 0;
        let mut index = leaves.len();
        for (i, leaf) in leaves.iter().enumerate() {
            if acc == position {
                index = i;
                break;
            }
            acc += match &leaf.node {
                LeafNode::Text(run) => run.char_len(),
                LeafNode::Reference(_) => 1,
            };
        }

        let neighbour = leaves
            .get(index)
            .or_else(|| index.checked_sub(1).and_then(|i| leaves.get(i)));
        let mark = neighbour.and_then(|leaf| leaf.mark.clone());
        let run = TextRun::plain("");
        let point = Point::new(run.key, 0);
        leaves.insert(
            index,
            Leaf {
                mark,
                node: LeafNode::Text(run),
            },
        );
        self.children = rebuild(leaves);
        Some(point)
    }
}

/// A block's leaves cut so that the requested points fall on leaf boundaries
#[derive(Debug)]
pub struct Cut {
    pub leaves: Vec<Leaf>,
    /// Leaves between the start and end points
    pub range: Range<usize>,
}

/// Flatten `block` and split text leaves at `start` and `end`.
///
/// `None` stands for the block's beginning (`start`) or end (`end`). Returns
/// `None` when a point does not address a run of this block or its offset is
/// out of range. The run containing a split point keeps its key for the part
/// before the point; the remainder gets a fresh key.
pub fn cut(block: &Block, start: Option<&Point>, end: Option<&Point>) -> Option<Cut> {
    let mut leaves = flatten(block.children.clone());

    let mut end_index = match end {
        Some(point) => split_at(&mut leaves, point)?.0,
        None => leaves.len(),
    };
    let start_index = match start {
        Some(point) => {
            let (boundary, inserted) = split_at(&mut leaves, point)?;
            if inserted && boundary <= end_index {
                end_index += 1;
            }
            boundary
        }
        None => 0,
    };

    if start_index > end_index {
        return None;
    }
    Some(Cut {
        leaves,
        range: start_index..end_index,
    })
}

/// Split the leaf addressed by `point`; returns the boundary index and
/// whether a new leaf was inserted
fn split_at(leaves: &mut Vec<Leaf>, point: &Point) -> Option<(usize, bool)> {
    let index = leaves.iter().position(|leaf| leaf.node.key() == point.key)?;
    let run = match &leaves[index].node {
        LeafNode::Text(run) => run,
        LeafNode::Reference(_) => {
            return match point.offset {
                0 => Some((index, false)),
                1 => Some((index + 1, false)),
                _ => None,
            };
        }
    };
    let len = run.char_len();
    if point.offset > len {
        return None;
    }
    if point.offset == 0 {
        return Some((index, false));
    }
    if point.offset == len {
        return Some((index + 1, false));
    }

    let byte = byte_offset(&run.text, point.offset);
    let tail = TextRun::new(run.text[byte..].to_string(), run.format);
    let mark = leaves[index].mark.clone();
    if let LeafNode::Text(head) = &mut leaves[index].node {
        head.text.truncate(byte);
    }
    leaves.insert(
        index + 1,
        Leaf {
            mark,
            node: LeafNode::Text(tail),
        },
    );
    Some((index + 1, true))
}

/// Byte index of the `chars`-th char of `text` (clamped to the end)
pub fn byte_offset(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map(|(byte, _)| byte)
        .unwrap_or(text.len())
}
