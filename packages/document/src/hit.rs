//! Pointer hit resolution.
//!
//! The host reports the node under the pointer plus any annotation id
//! attribute carried by the rendered element. Resolution walks a short
//! ancestor chain, so a click on text inside an annotation reaches the
//! annotation, while a click on plain paragraph text does not.

use crate::{Document, EntityKind, Inline, NodeKey};

/// Ancestors examined above the hit node
pub const MAX_ANCESTOR_HOPS: usize = 2;

/// What the host knows about a pointer event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointerTarget {
    pub key: NodeKey,
    /// Annotation id attribute found on the hit element, if any
    pub annotation_attr: Option<String>,
}

impl PointerTarget {
    pub fn node(key: NodeKey) -> Self {
        Self {
            key,
            annotation_attr: None,
        }
    }

    pub fn with_annotation_attr(mut self, id: impl Into<String>) -> Self {
        self.annotation_attr = Some(id.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    Annotation {
        key: NodeKey,
        ids: Vec<String>,
    },
    Reference {
        key: NodeKey,
        entity_id: String,
        kind: EntityKind,
    },
}

impl Document {
    /// Nearest annotation or reference for a pointer target.
    ///
    /// An explicit annotation attribute wins when it names an annotation in
    /// the hit node's ancestry; otherwise the hit node and then up to
    /// [`MAX_ANCESTOR_HOPS`] ancestors are checked.
    pub fn nearest_annotation_or_reference(&self, target: &PointerTarget) -> Option<Resolved> {
        let chain = self.ancestry(target.key);
        if chain.is_empty() {
            return None;
        }

        if let Some(id) = &target.annotation_attr {
            let explicit = chain.iter().find_map(|key| match self.find_inline(*key)? {
                Inline::Annotation(annotation) if annotation.primary_id() == Some(id.as_str()) => {
                    Some(Resolved::Annotation {
                        key: annotation.key,
                        ids: annotation.ids.clone(),
                    })
                }
                _ => None,
            });
            if explicit.is_some() {
                return explicit;
            }
        }

        chain
            .iter()
            .take(MAX_ANCESTOR_HOPS + 1)
            .find_map(|key| match self.find_inline(*key)? {
                Inline::Annotation(annotation) => Some(Resolved::Annotation {
                    key: annotation.key,
                    ids: annotation.ids.clone(),
                }),
                Inline::Reference(reference) => Some(Resolved::Reference {
                    key: reference.key,
                    entity_id: reference.entity_id.clone(),
                    kind: reference.entity_kind,
                }),
                Inline::Text(_) => None,
            })
    }
}
