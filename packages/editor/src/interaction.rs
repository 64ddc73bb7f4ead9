//! Pointer activation of annotations and references.

use novella_document::{Document, EntityKind, PointerTarget, Resolved};

/// Host-side navigation triggered by activating a node
pub trait Navigator {
    /// An annotation was activated; `primary_id` identifies its record
    fn annotation_activated(&mut self, primary_id: &str);

    fn reference_activated(&mut self, entity_id: &str, kind: EntityKind);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDisposition {
    /// Consumed; selection handling must not also run
    Handled,
    Unhandled,
}

/// Resolve a pointer target and notify the navigator
pub fn dispatch_pointer(
    doc: &Document,
    target: &PointerTarget,
    navigator: &mut dyn Navigator,
) -> EventDisposition {
    if !doc.contains(target.key) {
        return EventDisposition::Unhandled;
    }

    match doc.nearest_annotation_or_reference(target) {
        Some(Resolved::Annotation { ids, .. }) => match ids.first() {
            Some(primary) => {
                navigator.annotation_activated(primary);
                EventDisposition::Handled
            }
            None => EventDisposition::Unhandled,
        },
        Some(Resolved::Reference {
            entity_id, kind, ..
        }) => {
            navigator.reference_activated(&entity_id, kind);
            EventDisposition::Handled
        }
        None => EventDisposition::Unhandled,
    }
}

/// Navigator that records activations, for hosts that poll
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecordingNavigator {
    pub activations: Vec<Activation>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    Annotation(String),
    Reference { entity_id: String, kind: EntityKind },
}

impl Navigator for RecordingNavigator {
    fn annotation_activated(&mut self, primary_id: &str) {
        self.activations.push(Activation::Annotation(primary_id.to_string()));
    }

    fn reference_activated(&mut self, entity_id: &str, kind: EntityKind) {
        self.activations.push(Activation::Reference {
            entity_id: entity_id.to_string(),
            kind,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use novella_document::{AnnotationRange, Block, Inline, NodeKey, Reference, TextRun};

    fn fixture() -> (Document, NodeKey, NodeKey, NodeKey) {
        let marked = TextRun::plain("marked");
        let plain = TextRun::plain(" plain");
        let reference = Reference::new("c1", "Alice", EntityKind::Character);
        let keys = (marked.key, plain.key, reference.key);
        let doc = Document::from_blocks(vec![Block::paragraph(vec![
            Inline::Annotation(AnnotationRange::new(
                vec!["idea-1".to_string(), "idea-2".to_string()],
                vec![Inline::Text(marked)],
            )),
            Inline::Text(plain),
            Inline::Reference(reference),
        ])]);
        (doc, keys.0, keys.1, keys.2)
    }

    #[test]
    fn test_annotation_reports_primary_id() {
        let (doc, marked, _, _) = fixture();
        let mut navigator = RecordingNavigator::default();
        let disposition = dispatch_pointer(&doc, &PointerTarget::node(marked), &mut navigator);

        assert_eq!(disposition, EventDisposition::Handled);
        assert_eq!(
            navigator.activations,
            vec![Activation::Annotation("idea-1".to_string())]
        );
    }

    #[test]
    fn test_reference_reports_entity() {
        let (doc, _, _, reference) = fixture();
        let mut navigator = RecordingNavigator::default();
        dispatch_pointer(&doc, &PointerTarget::node(reference), &mut navigator);

        assert_eq!(
            navigator.activations,
            vec![Activation::Reference {
                entity_id: "c1".to_string(),
                kind: EntityKind::Character,
            }]
        );
    }

    #[test]
    fn test_plain_text_is_unhandled() {
        let (doc, _, plain, _) = fixture();
        let mut navigator = RecordingNavigator::default();
        let disposition = dispatch_pointer(&doc, &PointerTarget::node(plain), &mut navigator);

        assert_eq!(disposition, EventDisposition::Unhandled);
        assert!(navigator.activations.is_empty());
    }

    #[test]
    fn test_detached_target_is_unhandled() {
        let (doc, _, _, _) = fixture();
        let mut navigator = RecordingNavigator::default();
        let disposition =
            dispatch_pointer(&doc, &PointerTarget::node(NodeKey::fresh()), &mut navigator);
        assert_eq!(disposition, EventDisposition::Unhandled);
    }
}
