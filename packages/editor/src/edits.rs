//! Text and block edits behind the text-level mutations.

use crate::format::{format_text, Language};
use crate::mutations::{MutationError, MutationOutcome, TextSpan};
use novella_document::leaves::{byte_offset, cut, normalize, rebuild, Cut, Leaf, LeafNode};
use novella_document::visitor::{walk_block, walk_block_mut, Visitor, VisitorMut};
use novella_document::{
    Block, BlockKind, Document, Inline, NodeKey, Point, Selection, TextFormat, TextRun,
};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Forward selection with its blocks resolved
#[derive(Debug, Clone, Copy)]
pub(crate) struct Bounds {
    pub start: Point,
    pub end: Point,
    pub start_block: usize,
    pub end_block: usize,
}

impl Bounds {
    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    /// Start and end points that apply inside block `index`
    pub fn within(&self, index: usize) -> (Option<&Point>, Option<&Point>) {
        let start = (index == self.start_block).then_some(&self.start);
        let end = (index == self.end_block).then_some(&self.end);
        (start, end)
    }
}

pub(crate) fn resolve(doc: &Document, selection: &Selection) -> Result<Bounds, MutationError> {
    let forward = selection
        .normalized(doc)
        .ok_or(MutationError::NodeNotFound(selection.anchor.key))?;
    let start_block = block_of(doc, forward.start().key)?;
    let end_block = block_of(doc, forward.end().key)?;
    Ok(Bounds {
        start: forward.start(),
        end: forward.end(),
        start_block,
        end_block,
    })
}

pub(crate) fn block_of(doc: &Document, key: NodeKey) -> Result<usize, MutationError> {
    doc.locate(key)
        .map(|location| location.block)
        .ok_or(MutationError::NodeNotFound(key))
}

pub(crate) fn cut_block(
    doc: &Document,
    index: usize,
    start: Option<&Point>,
    end: Option<&Point>,
) -> Result<Cut, MutationError> {
    let block = doc.block(index).ok_or_else(|| missing_block(index))?;
    cut(block, start, end).ok_or_else(|| {
        let point = start.or(end).copied().unwrap_or(Point::new(block.key, 0));
        MutationError::OffsetOutOfRange {
            key: point.key,
            offset: point.offset,
        }
    })
}

/// Replace a block's content with normalized leaves
pub(crate) fn set_leaves(
    doc: &mut Document,
    index: usize,
    leaves: Vec<Leaf>,
) -> Result<(), MutationError> {
    let block = doc.block_mut(index).ok_or_else(|| missing_block(index))?;
    block.children = normalize(rebuild(leaves));
    Ok(())
}

pub(crate) fn missing_block(index: usize) -> MutationError {
    MutationError::InvalidStructure(format!("block {} does not exist", index))
}

pub(crate) fn caret_at(doc: &Document, block: usize, position: usize) -> Option<Point> {
    doc.block(block)?.point_at(position)
}

/// Remove the content between `bounds`; returns the caret as
/// `(block, position)`
pub(crate) fn delete_bounds(
    doc: &mut Document,
    bounds: &Bounds,
) -> Result<(usize, usize), MutationError> {
    let caret = doc
        .position_of(&bounds.start)
        .ok_or(MutationError::NodeNotFound(bounds.start.key))?;

    if bounds.start_block == bounds.end_block {
        let mut cut = cut_block(doc, bounds.start_block, Some(&bounds.start), Some(&bounds.end))?;
        cut.leaves.drain(cut.range.clone());
        set_leaves(doc, bounds.start_block, cut.leaves)?;
        return Ok(caret);
    }

    let head = cut_block(doc, bounds.start_block, Some(&bounds.start), None)?;
    let mut tail = cut_block(doc, bounds.end_block, None, Some(&bounds.end))?;
    let mut leaves = head.leaves;
    leaves.truncate(head.range.start);
    leaves.extend(tail.leaves.split_off(tail.range.end));

    for index in (bounds.start_block + 1..=bounds.end_block).rev() {
        doc.remove_block(index);
    }
    set_leaves(doc, bounds.start_block, leaves)?;
    Ok(caret)
}

pub(crate) fn insert_text(
    doc: &mut Document,
    selection: &Selection,
    text: &str,
) -> Result<MutationOutcome, MutationError> {
    let bounds = resolve(doc, selection)?;
    let collapsed = bounds.is_collapsed();
    if collapsed && text.is_empty() {
        return Ok(MutationOutcome::unchanged());
    }

    let (block_index, position) = if collapsed {
        let position = doc
            .position_of(&bounds.start)
            .ok_or(MutationError::NodeNotFound(bounds.start.key))?;
        (bounds.start_block, position.1)
    } else {
        delete_bounds(doc, &bounds)?
    };

    let point = if collapsed && doc.find_text(bounds.start.key).is_some() {
        bounds.start
    } else {
        // Next to a reference with no bordering run, type into a fresh one
        doc.block_mut(block_index)
            .and_then(|block| block.text_point_at(position))
            .ok_or_else(|| missing_block(block_index))?
    };
    let run = doc
        .find_text_mut(point.key)
        .ok_or(MutationError::NotText(point.key))?;
    let byte = byte_offset(&run.text, point.offset);
    run.text.insert_str(byte, text);

    if let Some(block) = doc.block_mut(block_index) {
        block.normalize();
    }
    let caret = caret_at(doc, block_index, position + text.chars().count());
    Ok(MutationOutcome::changed().with_caret(caret))
}

pub(crate) fn delete_range(
    doc: &mut Document,
    selection: &Selection,
) -> Result<MutationOutcome, MutationError> {
    let bounds = resolve(doc, selection)?;
    if bounds.is_collapsed() {
        return Ok(MutationOutcome::unchanged());
    }
    let (block, position) = delete_bounds(doc, &bounds)?;
    Ok(MutationOutcome::changed().with_caret(caret_at(doc, block, position)))
}

/// Apply spans grouped by run, highest start first so earlier offsets in the
/// same run stay valid
pub(crate) fn replace_spans(
    doc: &mut Document,
    spans: &[TextSpan],
) -> Result<MutationOutcome, MutationError> {
    let mut order: Vec<NodeKey> = Vec::new();
    let mut by_run: HashMap<NodeKey, Vec<&TextSpan>> = HashMap::new();
    for span in spans {
        if !by_run.contains_key(&span.node) {
            order.push(span.node);
        }
        by_run.entry(span.node).or_default().push(span);
    }

    let mut touched = BTreeSet::new();
    let mut changed = false;
    for key in order {
        let Some(mut group) = by_run.remove(&key) else {
            continue;
        };
        group.sort_by(|a, b| b.start.cmp(&a.start));
        for pair in group.windows(2) {
            if pair[1].end > pair[0].start {
                return Err(MutationError::InvalidStructure(format!(
                    "overlapping spans in {}",
                    key
                )));
            }
        }

        touched.insert(block_of(doc, key)?);
        let run = doc.find_text_mut(key).ok_or(MutationError::NotText(key))?;
        for span in group {
            let start = byte_offset(&run.text, span.start);
            let end = byte_offset(&run.text, span.end);
            if run.text[start..end] != span.replacement {
                run.text.replace_range(start..end, &span.replacement);
                changed = true;
            }
        }
    }

    for index in touched {
        if let Some(block) = doc.block_mut(index) {
            block.normalize();
        }
    }
    Ok(MutationOutcome {
        changed,
        caret: None,
    })
}

pub(crate) fn set_text(
    doc: &mut Document,
    node: NodeKey,
    text: &str,
) -> Result<MutationOutcome, MutationError> {
    let block_index = block_of(doc, node)?;
    if doc.find_text(node).is_some_and(|run| run.text == text) {
        return Ok(MutationOutcome::unchanged());
    }
    let run = doc.find_text_mut(node).ok_or(MutationError::NotText(node))?;
    run.text = text.to_string();
    if let Some(block) = doc.block_mut(block_index) {
        block.normalize();
    }
    Ok(MutationOutcome::changed())
}

pub(crate) fn toggle_format(
    doc: &mut Document,
    selection: &Selection,
    format: TextFormat,
) -> Result<MutationOutcome, MutationError> {
    let bounds = resolve(doc, selection)?;
    if bounds.is_collapsed() || format.is_empty() {
        return Ok(MutationOutcome::unchanged());
    }

    let mut segments = Vec::new();
    for index in bounds.start_block..=bounds.end_block {
        let (start, end) = bounds.within(index);
        segments.push((index, cut_block(doc, index, start, end)?));
    }

    let mut selected = segments
        .iter()
        .flat_map(|(_, cut)| cut.leaves[cut.range.clone()].iter())
        .filter_map(Leaf::text)
        .filter(|run| !run.text.is_empty())
        .peekable();
    if selected.peek().is_none() {
        return Ok(MutationOutcome::unchanged());
    }
    let enable = !selected.all(|run| run.format.contains(format));

    for (index, mut cut) in segments {
        let range = cut.range.clone();
        for leaf in &mut cut.leaves[range] {
            if let LeafNode::Text(run) = &mut leaf.node {
                run.format.set(format, enable);
            }
        }
        set_leaves(doc, index, cut.leaves)?;
    }
    Ok(MutationOutcome::changed())
}

pub(crate) fn split_block(doc: &mut Document, at: &Point) -> Result<MutationOutcome, MutationError> {
    let index = block_of(doc, at.key)?;
    let kind = doc.block(index).ok_or_else(|| missing_block(index))?.kind;
    let mut cut = cut_block(doc, index, Some(at), None)?;
    let mut tail = cut.leaves.split_off(cut.range.start);
    let head = cut.leaves;

    // An annotation split across the boundary becomes two nodes
    let head_marks: HashSet<NodeKey> = head
        .iter()
        .filter_map(|leaf| leaf.mark.as_ref().map(|mark| mark.key))
        .collect();
    let mut renamed = HashMap::new();
    for leaf in &mut tail {
        if let Some(mark) = &mut leaf.mark {
            if head_marks.contains(&mark.key) {
                mark.key = *renamed.entry(mark.key).or_insert_with(NodeKey::fresh);
            }
        }
    }

    let tail_is_empty = tail
        .iter()
        .all(|leaf| leaf.text().is_some_and(|run| run.text.is_empty()));
    let tail_kind = match kind {
        BlockKind::Heading { .. } if tail_is_empty => BlockKind::Paragraph,
        other => other,
    };

    set_leaves(doc, index, head)?;
    doc.insert_block(index + 1, Block::new(tail_kind, normalize(rebuild(tail))));
    Ok(MutationOutcome::changed().with_caret(caret_at(doc, index + 1, 0)))
}

pub(crate) fn remove_node(doc: &mut Document, key: NodeKey) -> Result<MutationOutcome, MutationError> {
    let location = doc.locate(key).ok_or(MutationError::NodeNotFound(key))?;
    let Some(index) = location.index else {
        doc.remove_block(location.block);
        return Ok(MutationOutcome::changed());
    };

    let caret_position = doc
        .block(location.block)
        .map(|block| {
            block.children[..index]
                .iter()
                .map(|inline| inline.position_len())
                .sum::<usize>()
        })
        .unwrap_or(0);

    let block = doc
        .block_mut(location.block)
        .ok_or_else(|| missing_block(location.block))?;
    match location.child {
        None => {
            block.children.remove(index);
        }
        Some(child) => {
            if let Some(Inline::Annotation(annotation)) = block.children.get_mut(index) {
                annotation.children.remove(child);
            }
        }
    }
    block.normalize();

    let caret = match location.child {
        None => caret_at(doc, location.block, caret_position),
        Some(_) => None,
    };
    Ok(MutationOutcome::changed().with_caret(caret))
}

/// Run the formatter over every text run, copying only blocks that change
pub(crate) fn auto_format(doc: &mut Document, language: Language) -> MutationOutcome {
    struct Pending {
        language: Language,
        found: bool,
    }
    impl<'a> Visitor<'a> for Pending {
        fn visit_text(&mut self, run: &'a TextRun) {
            if !self.found && format_text(&run.text, self.language) != run.text {
                self.found = true;
            }
        }
    }

    struct Apply {
        language: Language,
    }
    impl VisitorMut for Apply {
        fn visit_text_mut(&mut self, run: &mut TextRun) {
            run.text = format_text(&run.text, self.language);
        }
    }

    let mut changed = false;
    for index in 0..doc.block_count() {
        let needs_format = doc.block(index).is_some_and(|block| {
            let mut pending = Pending {
                language,
                found: false,
            };
            walk_block(&mut pending, block);
            pending.found
        });
        if !needs_format {
            continue;
        }
        if let Some(block) = doc.block_mut(index) {
            walk_block_mut(&mut Apply { language }, block);
            block.normalize();
            changed = true;
        }
    }

    if changed {
        tracing::debug!(?language, "auto-format rewrote text");
    }
    MutationOutcome {
        changed,
        caret: None,
    }
}
