//! End-to-end editing scenarios through the session
//!
//! This tests:
//! - Annotation wrap/unwrap and overlap
//! - Reference insertion from the composer
//! - Find/replace across runs and annotations
//! - Pointer activation
//! - Persistence round trips

use novella_editor::document::{AnnotationRange, Block, EntityKind, Inline, Reference, TextRun};
use novella_editor::{
    Activation, ComposerKey, ComposerState, Document, EditorConfig, EditorSession, Entity, EventDisposition,
    FileStore, KeyOutcome, ManualClock, MemoryStore, Mutation, NodeKey, Point, PointerTarget,
    RecordingNavigator, SearchQuery, Selection, StaticCatalog,
};

fn session_with(doc: Document) -> (EditorSession<ManualClock>, ManualClock) {
    let clock = ManualClock::new();
    let mut session = EditorSession::with_clock(EditorConfig::default(), clock.clone());
    session.open(Some("chapter-1".to_string()), doc);
    (session, clock)
}

fn run_key(session: &EditorSession<ManualClock>, index: usize) -> NodeKey {
    session.document().text_runs()[index].key
}

/// Type into the first run, the way a keystroke reaches the session
fn type_at(session: &mut EditorSession<ManualClock>, offset: usize, text: &str) {
    let key = run_key(session, 0);
    session
        .dispatch(Mutation::InsertText {
            selection: Selection::within(key, offset, offset),
            text: text.to_string(),
        })
        .unwrap();
}

#[test]
fn test_wrap_then_unwrap_restores_text() {
    let (mut session, clock) = session_with(Document::from_plain_text("The harbor at dusk"));
    let key = run_key(&session, 0);

    clock.advance_ms(1000);
    session
        .dispatch(Mutation::WrapAnnotation {
            selection: Selection::within(key, 4, 10),
            id: "idea-1".to_string(),
        })
        .unwrap();

    let located = session.document().locate_annotation("idea-1").unwrap();
    let annotation_key = session
        .document()
        .annotation_by_primary_id("idea-1")
        .map(|annotation| annotation.key)
        .unwrap();
    assert_eq!(session.document().find_text(located.anchor.key).unwrap().text, "harbor");

    clock.advance_ms(1000);
    session
        .dispatch(Mutation::UnwrapAnnotation {
            key: annotation_key,
        })
        .unwrap();

    assert!(session.document().annotation_ids().is_empty());
    assert_eq!(session.document().plain_text(), "The harbor at dusk");
    assert_eq!(session.document().text_runs().len(), 1);
}

#[test]
fn test_overlapping_annotations_share_nodes() {
    let (mut session, clock) = session_with(Document::from_plain_text("Hello world"));
    let key = run_key(&session, 0);

    session
        .dispatch(Mutation::WrapAnnotation {
            selection: Selection::within(key, 2, 8),
            id: "a".to_string(),
        })
        .unwrap();

    clock.advance_ms(1000);
    let start = run_key(&session, 0);
    let end = run_key(&session, 2);
    session
        .dispatch(Mutation::WrapAnnotation {
            selection: Selection::new(Point::new(start, 1), Point::new(end, 0)),
            id: "b".to_string(),
        })
        .unwrap();

    assert_eq!(session.document().annotation_ids(), vec!["b", "a"]);

    clock.advance_ms(1000);
    session.remove_annotation("a").unwrap();
    assert_eq!(session.document().annotation_ids(), vec!["b"]);
    assert_eq!(session.document().plain_text(), "Hello world");
}

#[test]
fn test_multi_block_wrap_yields_one_node_per_block() {
    let doc = Document::from_blocks(vec![
        Block::paragraph(vec![Inline::Text(TextRun::plain("first line"))]),
        Block::paragraph(vec![Inline::Text(TextRun::plain("second line"))]),
    ]);
    let (mut session, _) = session_with(doc);
    let first = run_key(&session, 0);
    let second = run_key(&session, 1);

    session
        .dispatch(Mutation::WrapAnnotation {
            selection: Selection::new(Point::new(second, 6), Point::new(first, 6)),
            id: "span".to_string(),
        })
        .unwrap();

    let per_block: Vec<usize> = session
        .document()
        .blocks()
        .iter()
        .map(|block| {
            block
                .children
                .iter()
                .filter(|inline| matches!(inline, Inline::Annotation(a) if a.has_id("span")))
                .count()
        })
        .collect();
    assert_eq!(per_block, vec![1, 1]);
}

#[test]
fn test_reference_commit_is_atomic() {
    let (mut session, clock) = session_with(Document::from_plain_text("Met  today"));
    let catalog = StaticCatalog::new(vec![
        Entity::new("c1", "Alice", EntityKind::Character),
        Entity::new("c2", "Bob", EntityKind::Character),
    ]);
    assert_eq!(session.load_catalog(&catalog, "novel-1").unwrap(), 2);

    clock.advance_ms(1000);
    type_at(&mut session, 4, "@");
    type_at(&mut session, 5, "b");
    assert!(session.composer().is_composing());
    assert_eq!(session.composer().query(), Some("b"));
    assert_eq!(session.composer().candidates().len(), 1);

    let before = session.history().past_len();
    let outcome = session.handle_composer_key(ComposerKey::Tab).unwrap();
    assert!(matches!(outcome, KeyOutcome::Commit(_)));

    assert_eq!(session.history().past_len(), before + 1);
    assert_eq!(session.document().plain_text(), "Met @Bob  today");
    assert_eq!(session.document().references_to("c2").len(), 1);

    let caret = session.selection().unwrap().focus;
    let (_, position) = session.document().position_of(&caret).unwrap();
    assert_eq!(position, 6);
}

#[test]
fn test_escape_leaves_typed_text() {
    let (mut session, _) = session_with(Document::from_plain_text(""));
    session.set_catalog(vec![Entity::new("c1", "Alice", EntityKind::Character)]);

    type_at(&mut session, 0, "@");
    type_at(&mut session, 1, "al");
    assert!(session.composer().is_composing());

    let outcome = session.handle_composer_key(ComposerKey::Escape).unwrap();
    assert_eq!(outcome, KeyOutcome::Aborted);
    assert_eq!(session.document().plain_text(), "@al");
    assert!(session.document().references_to("c1").is_empty());
}

#[test]
fn test_typing_space_aborts_composition() {
    let (mut session, _) = session_with(Document::from_plain_text(""));
    type_at(&mut session, 0, "@");
    type_at(&mut session, 1, "ab");
    assert!(session.composer().is_composing());

    type_at(&mut session, 3, " ");
    assert!(!session.composer().is_composing());
    assert_eq!(session.document().plain_text(), "@ab ");

    type_at(&mut session, 4, "cd");
    assert_eq!(session.composer().state(), &ComposerState::Idle);
    assert_eq!(session.document().plain_text(), "@ab cd");
}

#[test]
fn test_typing_before_leading_reference() {
    let (mut session, _) = session_with(Document::from_plain_text(""));
    session.set_catalog(vec![Entity::new("c1", "Alice", EntityKind::Character)]);

    type_at(&mut session, 0, "@");
    let outcome = session.handle_composer_key(ComposerKey::Tab).unwrap();
    assert!(matches!(outcome, KeyOutcome::Commit(_)));
    assert_eq!(session.document().plain_text(), "@Alice ");

    let reference_key = session.document().references_to("c1")[0];
    let before = session.document().blocks()[0].point_at(0).unwrap();
    assert_eq!(before, Point::new(reference_key, 0));

    session
        .dispatch(Mutation::InsertText {
            selection: Selection::caret(before),
            text: "Hi ".to_string(),
        })
        .unwrap();
    assert_eq!(session.document().plain_text(), "Hi @Alice ");

    let caret = session.selection().unwrap().focus;
    assert_eq!(session.document().position_of(&caret), Some((0, 3)));
}

#[test]
fn test_search_matches_do_not_overlap() {
    let (mut session, _) = session_with(Document::from_plain_text("aaaa aa"));
    let matches = session.search(SearchQuery::literal("aa")).to_vec();

    let spans: Vec<(usize, usize)> = matches.iter().map(|m| (m.start, m.end)).collect();
    assert_eq!(spans, vec![(0, 2), (2, 4), (5, 7)]);
    assert!(matches.iter().all(|m| m.node == matches[0].node));
}

#[test]
fn test_replace_all_spans_runs_and_annotations() {
    let doc = Document::from_blocks(vec![
        Block::paragraph(vec![
            Inline::Text(TextRun::plain("rain, ")),
            Inline::Annotation(AnnotationRange::new(
                vec!["mood".to_string()],
                vec![Inline::Text(TextRun::plain("more rain"))],
            )),
        ]),
        Block::paragraph(vec![Inline::Text(TextRun::plain("Rain again"))]),
    ]);
    let (mut session, _) = session_with(doc);

    session.search(SearchQuery::literal("rain"));
    assert_eq!(session.search_engine().matches().len(), 3);

    session.replace_all("snow").unwrap();
    assert_eq!(session.document().plain_text(), "snow, more snow\nsnow again");
    assert!(session.search_engine().matches().is_empty());
    assert_eq!(session.document().annotation_ids(), vec!["mood"]);

    session.undo();
    assert_eq!(session.search_engine().matches().len(), 3);
}

#[test]
fn test_regex_replacement_is_literal() {
    let (mut session, _) = session_with(Document::from_plain_text("v1 v22 v333"));
    session.search(SearchQuery::pattern(r"v(\d+)").case_sensitive(true));
    session.replace_all("$1").unwrap();
    assert_eq!(session.document().plain_text(), "$1 $1 $1");
}

#[test]
fn test_pointer_activation() {
    let marked = TextRun::plain("the plan");
    let marked_key = marked.key;
    let reference = Reference::new("m1", "Harbor", EntityKind::Map);
    let reference_key = reference.key;
    let doc = Document::from_blocks(vec![Block::paragraph(vec![
        Inline::Annotation(AnnotationRange::new(
            vec!["plot-7".to_string()],
            vec![Inline::Text(marked)],
        )),
        Inline::Text(TextRun::plain(" at ")),
        Inline::Reference(reference),
    ])]);
    let (session, _) = session_with(doc);

    let mut navigator = RecordingNavigator::default();
    assert_eq!(
        session.pointer(&PointerTarget::node(marked_key), &mut navigator),
        EventDisposition::Handled
    );
    assert_eq!(
        session.pointer(&PointerTarget::node(reference_key), &mut navigator),
        EventDisposition::Handled
    );
    assert_eq!(
        session.pointer(&PointerTarget::node(NodeKey::fresh()), &mut navigator),
        EventDisposition::Unhandled
    );
    assert_eq!(
        navigator.activations,
        vec![
            Activation::Annotation("plot-7".to_string()),
            Activation::Reference {
                entity_id: "m1".to_string(),
                kind: EntityKind::Map,
            },
        ]
    );
}

#[test]
fn test_file_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = FileStore::new(dir.path());

    let (mut session, _) = session_with(Document::from_plain_text("Hi "));
    let key = run_key(&session, 0);
    session
        .dispatch(Mutation::InsertReference {
            selection: Selection::within(key, 3, 3),
            entity_id: "c1".to_string(),
            display_name: "Alice".to_string(),
            entity_kind: EntityKind::Character,
        })
        .unwrap();
    session.save(&mut store).unwrap();

    let mut reopened = EditorSession::with_clock(EditorConfig::default(), ManualClock::new());
    reopened.open_from_store(&store, "chapter-1").unwrap();
    assert_eq!(reopened.document().plain_text(), "Hi @Alice ");
    assert_eq!(reopened.document().references_to("c1").len(), 1);
}

#[test]
fn test_damaged_chapter_opens_as_plain_text() {
    let mut store = MemoryStore::new();
    novella_editor::DocumentStore::save_document(&mut store, "broken", "{not json").unwrap();

    let (mut session, _) = session_with(Document::new());
    session.open_from_store(&store, "broken").unwrap();
    assert_eq!(session.document().plain_text(), "{not json");
}
