use crate::{AnnotationRange, Block, Document, Inline, Reference, TextRun};

/// Visitor for traversing a document immutably
///
/// Default implementations walk the entire tree. Override specific visit_*
/// methods to act on nodes; call the matching walk_* function to keep
/// descending.
pub trait Visitor<'a>: Sized {
    fn visit_document(&mut self, doc: &'a Document) {
        walk_document(self, doc);
    }

    fn visit_block(&mut self, block: &'a Block) {
        walk_block(self, block);
    }

    fn visit_inline(&mut self, inline: &'a Inline) {
        walk_inline(self, inline);
    }

    fn visit_annotation(&mut self, annotation: &'a AnnotationRange) {
        walk_annotation(self, annotation);
    }

    fn visit_text(&mut self, _run: &'a TextRun) {}

    fn visit_reference(&mut self, _reference: &'a Reference) {}
}

/// Mutable visitor for rewriting leaves in place
///
/// Walking a document copies every block it enters; use it for whole
/// document rewrites, not for targeted edits.
pub trait VisitorMut: Sized {
    fn visit_block_mut(&mut self, block: &mut Block) {
        walk_block_mut(self, block);
    }

    fn visit_inline_mut(&mut self, inline: &mut Inline) {
        walk_inline_mut(self, inline);
    }

    fn visit_text_mut(&mut self, _run: &mut TextRun) {}

    fn visit_reference_mut(&mut self, _reference: &mut Reference) {}
}

pub fn walk_document<'a, V: Visitor<'a>>(visitor: &mut V, doc: &'a Document) {
    for block in doc.blocks() {
        visitor.visit_block(block);
    }
}

pub fn walk_block<'a, V: Visitor<'a>>(visitor: &mut V, block: &'a Block) {
    for inline in &block.children {
        visitor.visit_inline(inline);
    }
}

pub fn walk_inline<'a, V: Visitor<'a>>(visitor: &mut V, inline: &'a Inline) {
    match inline {
        Inline::Text(run) => visitor.visit_text(run),
        Inline::Reference(reference) => visitor.visit_reference(reference),
        Inline::Annotation(annotation) => visitor.visit_annotation(annotation),
    }
}

pub fn walk_annotation<'a, V: Visitor<'a>>(visitor: &mut V, annotation: &'a AnnotationRange) {
    for child in &annotation.children {
        visitor.visit_inline(child);
    }
}

pub fn walk_document_mut<V: VisitorMut>(visitor: &mut V, doc: &mut Document) {
    for index in 0..doc.block_count() {
        if let Some(block) = doc.block_mut(index) {
            visitor.visit_block_mut(block);
        }
    }
}

pub fn walk_block_mut<V: VisitorMut>(visitor: &mut V, block: &mut Block) {
    for inline in &mut block.children {
        visitor.visit_inline_mut(inline);
    }
}

pub fn walk_inline_mut<V: VisitorMut>(visitor: &mut V, inline: &mut Inline) {
    match inline {
        Inline::Text(run) => visitor.visit_text_mut(run),
        Inline::Reference(reference) => visitor.visit_reference_mut(reference),
        Inline::Annotation(annotation) => {
            for child in &mut annotation.children {
                visitor.visit_inline_mut(child);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EntityKind;

    struct Counter {
        texts: usize,
        references: usize,
        annotations: usize,
    }

    impl<'a> Visitor<'a> for Counter {
        fn visit_text(&mut self, _run: &'a TextRun) {
            self.texts += 1;
        }

        fn visit_reference(&mut self, _reference: &'a Reference) {
            self.references += 1;
        }

        fn visit_annotation(&mut self, annotation: &'a AnnotationRange) {
            self.annotations += 1;
            walk_annotation(self, annotation);
        }
    }

    struct Shout;

    impl VisitorMut for Shout {
        fn visit_text_mut(&mut self, run: &mut TextRun) {
            run.text = run.text.to_uppercase();
        }
    }

    fn sample() -> Document {
        Document::from_blocks(vec![Block::paragraph(vec![
            Inline::Text(TextRun::plain("hi ")),
            Inline::Annotation(AnnotationRange::new(
                vec!["i1".into()],
                vec![
                    Inline::Text(TextRun::plain("there")),
                    Inline::Reference(Reference::new("c1", "Bob", EntityKind::Character)),
                ],
            )),
        ])])
    }

    #[test]
    fn test_visitor_reaches_annotation_children() {
        let doc = sample();
        let mut counter = Counter {
            texts: 0,
            references: 0,
            annotations: 0,
        };
        counter.visit_document(&doc);
        assert_eq!(counter.texts, 2);
        assert_eq!(counter.references, 1);
        assert_eq!(counter.annotations, 1);
    }

    #[test]
    fn test_visitor_mut_rewrites_text() {
        let mut doc = sample();
        walk_document_mut(&mut Shout, &mut doc);
        assert_eq!(doc.plain_text(), "HI THERE@Bob");
    }
}
