//! # Serialized Form
//!
//! Chapters are stored as JSON:
//!
//! ```json
//! {"version":1,"root":{"type":"root","children":[
//!   {"type":"paragraph","children":[{"type":"text","text":"Hi","format":1}]}
//! ]}}
//! ```
//!
//! The reader also accepts the unversioned editor-state layout older chapters
//! were saved in: `idea-mark`, `mark` and `plot-anchor` load as annotations,
//! `mention` nodes load as references, line breaks and tabs become text, and
//! fields this crate does not model are ignored.

use crate::error::{DocumentError, DocumentResult};
use crate::{AnnotationRange, Block, BlockKind, Document, Inline, Reference, TextFormat, TextRun};
use serde::{Deserialize, Serialize};

pub const SERIALIZATION_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct WireDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<u32>,
    root: WireRoot,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireRoot {
    #[serde(rename = "type", default = "root_type")]
    kind: String,
    #[serde(default)]
    children: Vec<WireBlock>,
}

fn root_type() -> String {
    "root".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
struct WireBlock {
    #[serde(rename = "type")]
    kind: String,
    /// Heading tag, `h1`..`h6`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tag: Option<String>,
    #[serde(default)]
    children: Vec<WireInline>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum WireInline {
    Text {
        #[serde(default)]
        text: String,
        #[serde(default, with = "format_bits")]
        format: TextFormat,
    },
    #[serde(alias = "idea-mark", alias = "mark", alias = "plot-anchor")]
    Annotation {
        #[serde(default)]
        ids: Vec<String>,
        #[serde(default)]
        children: Vec<WireInline>,
    },
    #[serde(alias = "mention")]
    Reference {
        #[serde(rename = "entityId", alias = "mentionId")]
        entity_id: String,
        #[serde(rename = "displayName", alias = "mentionName")]
        display_name: String,
        #[serde(rename = "entityKind", alias = "mentionType")]
        entity_kind: String,
    },
    Linebreak,
    Tab,
    #[serde(other)]
    Unknown,
}

mod format_bits {
    use crate::TextFormat;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(format: &TextFormat, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(format.bits())
    }

    /// Unknown bits (code, highlight, ...) are dropped
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<TextFormat, D::Error> {
        let bits = u32::deserialize(deserializer)?;
        Ok(TextFormat::from_bits_truncate(bits))
    }
}

impl Document {
    /// Strict load of a serialized chapter
    pub fn from_json(raw: &str) -> DocumentResult<Document> {
        let wire: WireDocument = serde_json::from_str(raw)?;
        if let Some(version) = wire.version {
            if version > SERIALIZATION_VERSION {
                return Err(DocumentError::UnsupportedVersion(version));
            }
        }
        if wire.root.kind != "root" {
            return Err(DocumentError::Invalid(format!(
                "expected root node, found '{}'",
                wire.root.kind
            )));
        }
        let blocks = wire.root.children.into_iter().map(import_block).collect();
        Ok(Document::from_blocks(blocks))
    }

    /// Load stored chapter content; never fails.
    ///
    /// Content that is not a serialized document becomes a single paragraph
    /// of plain text. A JSON string contributes its decoded value.
    pub fn from_serialized(raw: &str) -> Document {
        if raw.trim().is_empty() {
            return Document::new();
        }
        match Document::from_json(raw) {
            Ok(doc) => doc,
            Err(err) => {
                tracing::warn!(error = %err, "content is not a serialized document, importing as plain text");
                match serde_json::from_str::<String>(raw) {
                    Ok(text) => Document::from_plain_text(&text),
                    Err(_) => Document::from_plain_text(raw),
                }
            }
        }
    }

    pub fn to_json(&self) -> DocumentResult<String> {
        Ok(serde_json::to_string(&self.to_wire())?)
    }

    pub fn to_json_pretty(&self) -> DocumentResult<String> {
        Ok(serde_json::to_string_pretty(&self.to_wire())?)
    }

    fn to_wire(&self) -> WireDocument {
        WireDocument {
            version: Some(SERIALIZATION_VERSION),
            root: WireRoot {
                kind: root_type(),
                children: self.blocks().iter().map(|block| export_block(block)).collect(),
            },
        }
    }
}

fn import_block(wire: WireBlock) -> Block {
    let kind = match wire.kind.as_str() {
        "paragraph" => BlockKind::Paragraph,
        "heading" => BlockKind::Heading {
            level: heading_level(wire.tag.as_deref()),
        },
        "quote" => BlockKind::Quote,
        other => {
            tracing::debug!(kind = other, "importing unknown block as paragraph");
            BlockKind::Paragraph
        }
    };
    let children = wire.children.into_iter().filter_map(import_inline).collect();
    let mut block = Block::new(kind, children);
    block.normalize();
    block
}

fn heading_level(tag: Option<&str>) -> u8 {
    tag.and_then(|tag| tag.strip_prefix('h'))
        .and_then(|level| level.parse::<u8>().ok())
        .filter(|level| (1..=6).contains(level))
        .unwrap_or(1)
}

fn import_inline(wire: WireInline) -> Option<Inline> {
    match wire {
        WireInline::Text { text, format } => Some(Inline::Text(TextRun::new(text, format))),
        WireInline::Linebreak => Some(Inline::Text(TextRun::plain("\n"))),
        WireInline::Tab => Some(Inline::Text(TextRun::plain("\t"))),
        WireInline::Annotation { ids, children } => {
            let children: Vec<Inline> = children.into_iter().filter_map(import_inline).collect();
            if children.is_empty() {
                return None;
            }
            Some(Inline::Annotation(AnnotationRange::new(ids, children)))
        }
        WireInline::Reference {
            entity_id,
            display_name,
            entity_kind,
        } => match entity_kind.parse() {
            Ok(kind) => Some(Inline::Reference(Reference::new(entity_id, display_name, kind))),
            Err(err) => {
                tracing::warn!(entity_id = %entity_id, "{}, keeping reference as text", err);
                Some(Inline::Text(TextRun::plain(format!("@{}", display_name))))
            }
        },
        WireInline::Unknown => None,
    }
}

fn export_block(block: &Block) -> WireBlock {
    let (kind, tag) = match block.kind {
        BlockKind::Paragraph => ("paragraph", None),
        BlockKind::Heading { level } => ("heading", Some(format!("h{}", level))),
        BlockKind::Quote => ("quote", None),
    };
    WireBlock {
        kind: kind.to_string(),
        tag,
        children: block.children.iter().map(export_inline).collect(),
    }
}

fn export_inline(inline: &Inline) -> WireInline {
    match inline {
        Inline::Text(run) => WireInline::Text {
            text: run.text.clone(),
            format: run.format,
        },
        Inline::Annotation(annotation) => WireInline::Annotation {
            ids: annotation.ids.clone(),
            children: annotation.children.iter().map(export_inline).collect(),
        },
        Inline::Reference(reference) => WireInline::Reference {
            entity_id: reference.entity_id.clone(),
            display_name: reference.display_name.clone(),
            entity_kind: reference.entity_kind.as_str().to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EntityKind;

    const LEGACY: &str = r#"{
        "root": {
            "children": [
                {
                    "children": [
                        {"detail":0,"format":1,"mode":"normal","style":"","text":"Bold ","type":"text","version":1},
                        {"type":"idea-mark","ids":["idea-1"],"children":[
                            {"format":0,"text":"idea","type":"text","version":1}
                        ]},
                        {"type":"linebreak","version":1},
                        {"type":"mention","version":1,"mentionId":"c1","mentionName":"Alice","mentionType":"character"},
                        {"type":"emoji","text":"?"}
                    ],
                    "direction":"ltr","format":"","indent":0,"type":"paragraph","version":1
                },
                {"children":[{"text":"Title","type":"text","format":0}],"tag":"h2","type":"heading","version":1}
            ],
            "direction":"ltr","format":"","indent":0,"type":"root","version":1
        }
    }"#;

    #[test]
    fn test_legacy_editor_state_loads() {
        let doc = Document::from_json(LEGACY).unwrap();
        assert_eq!(doc.block_count(), 2);
        assert_eq!(doc.plain_text(), "Bold idea\n@Alice\nTitle");
        assert_eq!(doc.annotation_ids(), vec!["idea-1"]);
        assert_eq!(doc.references_to("c1").len(), 1);
        assert_eq!(doc.blocks()[1].kind, BlockKind::Heading { level: 2 });

        let first = doc.text_runs()[0];
        assert_eq!(first.format, TextFormat::BOLD);
    }

    #[test]
    fn test_export_then_import_keeps_content() {
        let doc = Document::from_json(LEGACY).unwrap();
        let json = doc.to_json().unwrap();
        assert!(json.starts_with(r#"{"version":1,"root":{"type":"root""#));

        let again = Document::from_json(&json).unwrap();
        assert_eq!(again.plain_text(), doc.plain_text());
        assert_eq!(again.annotation_ids(), doc.annotation_ids());
    }

    #[test]
    fn test_plain_text_fallback() {
        let doc = Document::from_serialized("Once upon a time");
        assert_eq!(doc.plain_text(), "Once upon a time");

        let doc = Document::from_serialized(r#""quoted \"text\"""#);
        assert_eq!(doc.plain_text(), r#"quoted "text""#);

        let doc = Document::from_serialized("[1, 2]");
        assert_eq!(doc.plain_text(), "[1, 2]");

        assert_eq!(Document::from_serialized("   ").plain_text(), "");
    }

    #[test]
    fn test_newer_version_is_rejected() {
        let raw = r#"{"version":9,"root":{"type":"root","children":[]}}"#;
        assert!(matches!(
            Document::from_json(raw),
            Err(DocumentError::UnsupportedVersion(9))
        ));
    }

    #[test]
    fn test_location_kind_and_unknown_kind() {
        let raw = r#"{"root":{"type":"root","children":[{"type":"paragraph","children":[
            {"type":"reference","entityId":"m1","displayName":"Harbor","entityKind":"location"},
            {"type":"reference","entityId":"x","displayName":"Ghost","entityKind":"spirit"}
        ]}]}}"#;
        let doc = Document::from_json(raw).unwrap();
        match &doc.blocks()[0].children[0] {
            Inline::Reference(reference) => assert_eq!(reference.entity_kind, EntityKind::Map),
            other => panic!("expected reference, got {:?}", other),
        }
        assert_eq!(doc.plain_text(), "@Harbor@Ghost");
        assert!(doc.references_to("x").is_empty());
    }
}
