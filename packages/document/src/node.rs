//! # Manuscript Nodes
//!
//! The closed set of node kinds a chapter is made of.
//!
//! ```text
//! Document
//!  └─ Block (paragraph | heading | quote)
//!      ├─ Text         leaf, string + format flags
//!      ├─ Reference    leaf, atomic entity token
//!      └─ Annotation   ids + [Text | Reference]
//! ```
//!
//! Annotations never nest. Overlapping annotations are expressed by the
//! identifier list of a single node, so every inline position is covered by
//! at most one annotation node.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_KEY: AtomicU64 = AtomicU64::new(1);

/// Transient identity of a node inside a live document.
///
/// Keys are minted from a process-wide counter, survive snapshot cloning and
/// are never serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(u64);

impl NodeKey {
    /// Mint a key that no other node has
    pub fn fresh() -> Self {
        NodeKey(NEXT_KEY.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

bitflags::bitflags! {
    /// Inline formatting of a text run.
    ///
    /// Bit values follow the persisted editor-state layout so stored chapters
    /// keep their formatting.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TextFormat: u32 {
        const BOLD = 1 << 0;
        const ITALIC = 1 << 1;
        const STRIKETHROUGH = 1 << 2;
        const UNDERLINE = 1 << 3;
    }
}

/// Plain text payload with formatting flags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    pub key: NodeKey,
    pub text: String,
    pub format: TextFormat,
}

impl TextRun {
    pub fn new(text: impl Into<String>, format: TextFormat) -> Self {
        Self {
            key: NodeKey::fresh(),
            text: text.into(),
            format,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, TextFormat::empty())
    }

    /// Length in chars, the unit every offset in this crate uses
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Inline wrapper carrying one id per overlapping annotation.
///
/// `ids[0]` is the primary id used for event correlation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationRange {
    pub key: NodeKey,
    pub ids: Vec<String>,
    pub children: Vec<Inline>,
}

impl AnnotationRange {
    pub fn new(ids: Vec<String>, children: Vec<Inline>) -> Self {
        Self {
            key: NodeKey::fresh(),
            ids,
            children,
        }
    }

    pub fn primary_id(&self) -> Option<&str> {
        self.ids.first().map(String::as_str)
    }

    pub fn has_id(&self, id: &str) -> bool {
        self.ids.iter().any(|existing| existing == id)
    }

    pub fn text_content(&self) -> String {
        self.children.iter().map(Inline::text_content).collect()
    }
}

/// Kind of world-building entity a reference points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Character,
    Item,
    World,
    #[serde(alias = "location")]
    Map,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Character => "character",
            EntityKind::Item => "item",
            EntityKind::World => "world",
            EntityKind::Map => "map",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "character" => Ok(EntityKind::Character),
            "item" => Ok(EntityKind::Item),
            "world" => Ok(EntityKind::World),
            "map" | "location" => Ok(EntityKind::Map),
            other => Err(format!("unknown entity kind '{}'", other)),
        }
    }
}

/// Atomic inline token linking to an external entity.
///
/// Offsets never point inside a reference; it is inserted and removed as a
/// whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub key: NodeKey,
    pub entity_id: String,
    pub display_name: String,
    pub entity_kind: EntityKind,
}

impl Reference {
    pub fn new(
        entity_id: impl Into<String>,
        display_name: impl Into<String>,
        entity_kind: EntityKind,
    ) -> Self {
        Self {
            key: NodeKey::fresh(),
            entity_id: entity_id.into(),
            display_name: display_name.into(),
            entity_kind,
        }
    }

    /// Text shown when the reference is flattened to plain text
    pub fn text_content(&self) -> String {
        format!("@{}", self.display_name)
    }
}

/// Inline content of a block
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(TextRun),
    Annotation(AnnotationRange),
    Reference(Reference),
}

impl Inline {
    pub fn key(&self) -> NodeKey {
        match self {
            Inline::Text(run) => run.key,
            Inline::Annotation(annotation) => annotation.key,
            Inline::Reference(reference) => reference.key,
        }
    }

    pub fn text_content(&self) -> String {
        match self {
            Inline::Text(run) => run.text.clone(),
            Inline::Annotation(annotation) => annotation.text_content(),
            Inline::Reference(reference) => reference.text_content(),
        }
    }

    /// Number of caret positions the node spans: chars for text, one for a
    /// reference
    pub fn position_len(&self) -> usize {
        match self {
            Inline::Text(run) => run.char_len(),
            Inline::Annotation(annotation) => {
                annotation.children.iter().map(Inline::position_len).sum()
            }
            Inline::Reference(_) => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Paragraph,
    Heading { level: u8 },
    Quote,
}

/// Block-level container of inline content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub key: NodeKey,
    pub kind: BlockKind,
    pub children: Vec<Inline>,
}

impl Block {
    pub fn new(kind: BlockKind, children: Vec<Inline>) -> Self {
        Self {
            key: NodeKey::fresh(),
            kind,
            children,
        }
    }

    pub fn paragraph(children: Vec<Inline>) -> Self {
        Self::new(BlockKind::Paragraph, children)
    }

    /// Paragraph holding a single empty run, the caret home of a blank line
    pub fn empty_paragraph() -> Self {
        Self::paragraph(vec![Inline::Text(TextRun::plain(""))])
    }

    pub fn text_content(&self) -> String {
        self.children.iter().map(Inline::text_content).collect()
    }

    pub fn position_len(&self) -> usize {
        self.children.iter().map(Inline::position_len).sum()
    }
}
