//! # Document Mutations
//!
//! Every edit to a chapter is one named `Mutation`. The command bus applies
//! it to a copy of the current document and commits the copy as the next
//! snapshot, so history and search only ever see whole, validated edits.
//!
//! ## Mutation Semantics
//!
//! ### Annotations
//! - Wrapping composes with existing annotations: covered content gains the
//!   id, partially covered nodes are split at the selection boundary
//! - Annotations never cross blocks; a multi-block wrap yields one node per
//!   block, all carrying the id
//! - Removing the last id of a node unwraps it, leaving the text in place
//!
//! ### References
//! - Inserted as one edit: selected text removed, reference placed, then a
//!   separator space followed by the text that came after the caret
//! - Renames update every reference to the entity in place
//!
//! ### Text
//! - Offsets are chars inside one text run, or 0/1 on either side of a
//!   reference that no run borders
//! - Blocks are normalized after every edit, which may merge runs; callers
//!   use the caret returned in [`MutationOutcome`] instead of old points

use crate::format::Language;
use crate::{annotations, edits};
use novella_document::{Document, EntityKind, Inline, NodeKey, Point, Selection, TextFormat};
use thiserror::Error;

/// Replacement of `[start, end)` chars inside one text run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSpan {
    pub node: NodeKey,
    pub start: usize,
    pub end: usize,
    pub replacement: String,
}

/// Named document edits
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Wrap the selected content in an annotation carrying `id`
    WrapAnnotation { selection: Selection, id: String },

    /// Splice an annotation node's children into its parent
    UnwrapAnnotation { key: NodeKey },

    /// Drop `id` from every annotation, unwrapping nodes left without ids
    RemoveAnnotationId { id: String },

    /// Replace the selection with a reference plus a separator space
    InsertReference {
        selection: Selection,
        entity_id: String,
        display_name: String,
        entity_kind: EntityKind,
    },

    /// Replace the selection with literal text
    InsertText { selection: Selection, text: String },

    /// Remove the selected content, merging blocks when it spans several
    DeleteRange { selection: Selection },

    /// Replace char spans of text runs (search/replace)
    ReplaceSpans { spans: Vec<TextSpan> },

    /// Replace a text run's whole content
    SetText { node: NodeKey, text: String },

    /// Set `format` on the selected text, or clear it if all of it has it
    ToggleFormat {
        selection: Selection,
        format: TextFormat,
    },

    /// Split a block in two at a caret point
    SplitBlock { at: Point },

    /// Remove a block or inline node as a whole
    RemoveNode { key: NodeKey },

    /// Update the display name of every reference to an entity
    RenameReference {
        entity_id: String,
        display_name: String,
    },

    /// Normalize whitespace and punctuation of every text run
    AutoFormat { language: Language },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MutationError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeKey),

    #[error("Node is not text: {0}")]
    NotText(NodeKey),

    #[error("Node is not an annotation: {0}")]
    NotAnAnnotation(NodeKey),

    #[error("Offset {offset} out of range in {key}")]
    OffsetOutOfRange { key: NodeKey, offset: usize },

    #[error("Invalid structure: {0}")]
    InvalidStructure(String),
}

/// What a successful mutation did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MutationOutcome {
    /// Whether the document differs from before
    pub changed: bool,

    /// Caret after the edit, for edits that place one
    pub caret: Option<Point>,
}

impl MutationOutcome {
    pub fn unchanged() -> Self {
        Self::default()
    }

    pub fn changed() -> Self {
        Self {
            changed: true,
            caret: None,
        }
    }

    pub fn with_caret(mut self, caret: Option<Point>) -> Self {
        self.caret = caret;
        self
    }
}

impl Mutation {
    /// Stable name used in the bus log
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::WrapAnnotation { .. } => "wrap-annotation",
            Mutation::UnwrapAnnotation { .. } => "unwrap-annotation",
            Mutation::RemoveAnnotationId { .. } => "remove-annotation-id",
            Mutation::InsertReference { .. } => "insert-reference",
            Mutation::InsertText { .. } => "insert-text",
            Mutation::DeleteRange { .. } => "delete-range",
            Mutation::ReplaceSpans { .. } => "replace-spans",
            Mutation::SetText { .. } => "set-text",
            Mutation::ToggleFormat { .. } => "toggle-format",
            Mutation::SplitBlock { .. } => "split-block",
            Mutation::RemoveNode { .. } => "remove-node",
            Mutation::RenameReference { .. } => "rename-reference",
            Mutation::AutoFormat { .. } => "auto-format",
        }
    }

    /// Apply mutation to the document with validation
    pub fn apply(&self, doc: &mut Document) -> Result<MutationOutcome, MutationError> {
        self.validate(doc)?;

        match self {
            Mutation::WrapAnnotation { selection, id } => annotations::wrap(doc, selection, id),
            Mutation::UnwrapAnnotation { key } => annotations::unwrap(doc, *key),
            Mutation::RemoveAnnotationId { id } => Ok(annotations::remove_id(doc, id)),
            Mutation::InsertReference {
                selection,
                entity_id,
                display_name,
                entity_kind,
            } => annotations::insert_reference(doc, selection, entity_id, display_name, *entity_kind),
            Mutation::RenameReference {
                entity_id,
                display_name,
            } => Ok(annotations::rename_reference(doc, entity_id, display_name)),
            Mutation::InsertText { selection, text } => edits::insert_text(doc, selection, text),
            Mutation::DeleteRange { selection } => edits::delete_range(doc, selection),
            Mutation::ReplaceSpans { spans } => edits::replace_spans(doc, spans),
            Mutation::SetText { node, text } => edits::set_text(doc, *node, text),
            Mutation::ToggleFormat { selection, format } => {
                edits::toggle_format(doc, selection, *format)
            }
            Mutation::SplitBlock { at } => edits::split_block(doc, at),
            Mutation::RemoveNode { key } => edits::remove_node(doc, *key),
            Mutation::AutoFormat { language } => Ok(edits::auto_format(doc, *language)),
        }
    }

    /// Validate without applying
    pub fn validate(&self, doc: &Document) -> Result<(), MutationError> {
        match self {
            Mutation::WrapAnnotation { selection, id } => {
                if id.is_empty() {
                    return Err(MutationError::InvalidStructure(
                        "annotation id must not be empty".to_string(),
                    ));
                }
                check_selection(doc, selection)
            }

            Mutation::UnwrapAnnotation { key } => match doc.locate(*key) {
                None => Err(MutationError::NodeNotFound(*key)),
                Some(location) if location.index.is_none() || location.child.is_some() => {
                    Err(MutationError::NotAnAnnotation(*key))
                }
                Some(_) => match doc.find_inline(*key) {
                    Some(Inline::Annotation(_)) => Ok(()),
                    _ => Err(MutationError::NotAnAnnotation(*key)),
                },
            },

            Mutation::InsertReference {
                selection,
                entity_id,
                ..
            } => {
                if entity_id.is_empty() {
                    return Err(MutationError::InvalidStructure(
                        "reference needs an entity id".to_string(),
                    ));
                }
                check_selection(doc, selection)
            }

            Mutation::InsertText { selection, .. }
            | Mutation::DeleteRange { selection }
            | Mutation::ToggleFormat { selection, .. } => check_selection(doc, selection),

            Mutation::ReplaceSpans { spans } => {
                for span in spans {
                    if span.start > span.end {
                        return Err(MutationError::OffsetOutOfRange {
                            key: span.node,
                            offset: span.start,
                        });
                    }
                    check_point(doc, &Point::new(span.node, span.end))?;
                }
                Ok(())
            }

            Mutation::SetText { node, .. } => check_point(doc, &Point::new(*node, 0)),

            Mutation::SplitBlock { at } => check_point(doc, at),

            Mutation::RemoveNode { key } => {
                if doc.contains(*key) {
                    Ok(())
                } else {
                    Err(MutationError::NodeNotFound(*key))
                }
            }

            Mutation::RemoveAnnotationId { .. }
            | Mutation::RenameReference { .. }
            | Mutation::AutoFormat { .. } => Ok(()),
        }
    }
}

/// A point must sit inside an attached text run or on either side of an
/// attached reference
pub(crate) fn check_point(doc: &Document, point: &Point) -> Result<(), MutationError> {
    let len = match doc.find_inline(point.key) {
        Some(Inline::Text(run)) => run.char_len(),
        Some(Inline::Reference(_)) => 1,
        Some(Inline::Annotation(_)) => return Err(MutationError::NotText(point.key)),
        None if doc.contains(point.key) => return Err(MutationError::NotText(point.key)),
        None => return Err(MutationError::NodeNotFound(point.key)),
    };
    if point.offset > len {
        return Err(MutationError::OffsetOutOfRange {
            key: point.key,
            offset: point.offset,
        });
    }
    Ok(())
}

fn check_selection(doc: &Document, selection: &Selection) -> Result<(), MutationError> {
    check_point(doc, &selection.anchor)?;
    check_point(doc, &selection.focus)
}
