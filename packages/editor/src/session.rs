//! # Editor Session
//!
//! Owns everything one open chapter needs: the command bus (current
//! snapshot), history, search state, reference composer, word counter and
//! the cached entity catalog.
//!
//! Every edit goes through [`EditorSession::dispatch`], which keeps the
//! derived state in step with each commit:
//!
//! ```text
//! Mutation → bus commit → history record
//!                       → search re-run (if a query is active)
//!                       → word count rescheduled
//!                       → composer re-evaluated at the new caret
//! ```

use crate::bus::{Commit, CommandBus};
use crate::catalog::{Entity, EntityCatalog};
use crate::clock::{Clock, SystemClock};
use crate::composer::{ComposerKey, KeyOutcome, KindFilter, ReferenceComposer};
use crate::errors::EditorError;
use crate::history::{History, HistoryState};
use crate::interaction::{dispatch_pointer, EventDisposition, Navigator};
use crate::mutations::Mutation;
use crate::preferences::EditorConfig;
use crate::search::{Match, MatchProjector, SearchEngine, SearchQuery};
use crate::shortcuts::{KeyEvent, ShortcutAction};
use crate::store::DocumentStore;
use crate::word_count::WordCounter;
use novella_document::{Document, PointerTarget, Selection};
use std::sync::Arc;

/// Result of a key event checked against the shortcut map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutOutcome {
    /// Executed by the session
    Handled(ShortcutAction),
    /// Bound, but carried out by the host (save, sidebar, new idea)
    Host(ShortcutAction),
    Unbound,
}

pub struct EditorSession<C: Clock + Clone = SystemClock> {
    config: EditorConfig,
    document_id: Option<String>,
    bus: CommandBus,
    history: History<Arc<Document>, C>,
    search: SearchEngine,
    composer: ReferenceComposer,
    word_counter: WordCounter,
    catalog: Vec<Entity>,
    selection: Option<Selection>,
    clock: C,
}

impl EditorSession<SystemClock> {
    pub fn new(config: EditorConfig) -> Self {
        Self::with_clock(config, SystemClock::new())
    }
}

impl<C: Clock + Clone> EditorSession<C> {
    pub fn with_clock(config: EditorConfig, clock: C) -> Self {
        let document = Arc::new(Document::new());
        let mut word_counter = WordCounter::new(config.word_count_delay());
        word_counter.recount(&document);
        Self {
            history: History::new(Arc::clone(&document), config.history(), clock.clone()),
            bus: CommandBus::new(document),
            search: SearchEngine::new(),
            composer: ReferenceComposer::new(config.trigger, config.candidate_limit),
            word_counter,
            catalog: Vec::new(),
            selection: None,
            document_id: None,
            config,
            clock,
        }
    }

    /// Switch to another chapter; no state carries over
    pub fn open(&mut self, id: Option<String>, document: Document) {
        let document = Arc::new(document);
        self.bus.replace(Arc::clone(&document));
        self.bus.clear_log();
        self.history.reset(document);
        self.search.clear();
        self.composer.abort();
        self.selection = None;
        self.word_counter.recount(self.bus.document());
        tracing::debug!(id = ?id, "opened chapter");
        self.document_id = id;
    }

    /// Load a chapter from a store; damaged content opens as plain text
    pub fn open_from_store(
        &mut self,
        store: &dyn DocumentStore,
        id: &str,
    ) -> Result<(), EditorError> {
        let raw = store.load_document(id)?;
        self.open(Some(id.to_string()), Document::from_serialized(&raw));
        Ok(())
    }

    pub fn save(&self, store: &mut dyn DocumentStore) -> Result<(), EditorError> {
        let id = self.document_id.as_deref().ok_or(EditorError::NotStoreBacked)?;
        let json = self.bus.document().to_json()?;
        store.save_document(id, &json)?;
        Ok(())
    }

    pub fn document(&self) -> &Arc<Document> {
        self.bus.document()
    }

    pub fn document_id(&self) -> Option<&str> {
        self.document_id.as_deref()
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn revision(&self) -> u64 {
        self.bus.revision()
    }

    pub fn bus(&self) -> &CommandBus {
        &self.bus
    }

    pub fn history(&self) -> &History<Arc<Document>, C> {
        &self.history
    }

    pub fn search_engine(&self) -> &SearchEngine {
        &self.search
    }

    pub fn composer(&self) -> &ReferenceComposer {
        &self.composer
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    /// Edit merged into the current undo step when typed in quick succession
    pub fn dispatch(&mut self, mutation: Mutation) -> Result<Commit, EditorError> {
        self.commit(&mutation, false)
    }

    /// Edit that always forms its own undo step
    pub fn dispatch_immediate(&mut self, mutation: Mutation) -> Result<Commit, EditorError> {
        self.commit(&mutation, true)
    }

    fn commit(&mut self, mutation: &Mutation, immediate: bool) -> Result<Commit, EditorError> {
        let commit = self.bus.dispatch(mutation)?;
        if commit.changed {
            self.history.record(Arc::clone(&commit.document), immediate);
            self.after_change();
        }
        if let Some(caret) = commit.caret {
            self.set_selection(Selection::caret(caret));
        }
        Ok(commit)
    }

    fn after_change(&mut self) {
        self.search.refresh(self.bus.document());
        self.word_counter.schedule(self.clock.now());
    }

    /// Move the history's present into the bus
    fn sync_from_history(&mut self) {
        self.bus.replace(Arc::clone(self.history.present()));
        self.composer.abort();
        let document = Arc::clone(self.bus.document());
        if let Some(selection) = self.selection {
            if !document.contains(selection.anchor.key) || !document.contains(selection.focus.key)
            {
                self.selection = None;
            }
        }
        self.after_change();
    }

    /// Host selection changed
    pub fn set_selection(&mut self, selection: Selection) {
        self.selection = Some(selection);
        self.composer
            .update(self.bus.document(), &selection, &self.catalog);
    }

    pub fn undo(&mut self) -> bool {
        if !self.history.undo() {
            return false;
        }
        self.sync_from_history();
        true
    }

    pub fn redo(&mut self) -> bool {
        if !self.history.redo() {
            return false;
        }
        self.sync_from_history();
        true
    }

    /// Export history, e.g. to keep it while another chapter is open
    pub fn history_state(&self) -> HistoryState<Arc<Document>> {
        self.history.state().clone()
    }

    pub fn restore_history(&mut self, state: HistoryState<Arc<Document>>) {
        self.history.restore(state);
        self.sync_from_history();
    }

    /// Format every text run as one undo step
    pub fn auto_format(&mut self) -> Result<Commit, EditorError> {
        let mutation = Mutation::AutoFormat {
            language: self.config.language(),
        };
        let commit = self.bus.dispatch(&mutation)?;
        if commit.changed {
            // Checkpoint the unformatted text; the formatted result merges
            // into that checkpoint
            self.history.snapshot();
            self.history.record(Arc::clone(&commit.document), false);
            self.after_change();
        }
        Ok(commit)
    }

    pub fn handle_shortcut(&mut self, event: &KeyEvent) -> Result<ShortcutOutcome, EditorError> {
        let Some(action) = self.config.shortcuts.action_for(event) else {
            return Ok(ShortcutOutcome::Unbound);
        };
        match action {
            ShortcutAction::Undo => {
                self.undo();
            }
            ShortcutAction::Redo => {
                self.redo();
            }
            ShortcutAction::Format => {
                self.auto_format()?;
            }
            ShortcutAction::Save | ShortcutAction::ToggleSidebar | ShortcutAction::CreateIdea => {
                return Ok(ShortcutOutcome::Host(action));
            }
        }
        Ok(ShortcutOutcome::Handled(action))
    }

    /// Fire the word count if its deadline has passed
    pub fn tick(&mut self) -> Option<usize> {
        let now = self.clock.now();
        self.word_counter.tick(now, self.bus.document())
    }

    pub fn word_count(&self) -> usize {
        self.word_counter.count()
    }

    pub fn load_catalog(
        &mut self,
        catalog: &dyn EntityCatalog,
        scope_id: &str,
    ) -> Result<usize, EditorError> {
        let entities = catalog.list_mentionable(scope_id)?;
        let count = entities.len();
        self.set_catalog(entities);
        Ok(count)
    }

    /// Replace the entity catalog; an open composition re-ranks against it
    pub fn set_catalog(&mut self, entities: Vec<Entity>) {
        self.catalog = entities;
        self.composer.set_filter(self.composer.filter(), &self.catalog);
    }

    pub fn set_composer_filter(&mut self, filter: KindFilter) {
        self.composer.set_filter(filter, &self.catalog);
    }

    /// Key press while the composer may be open; a commit is dispatched as
    /// one undo step
    pub fn handle_composer_key(&mut self, key: ComposerKey) -> Result<KeyOutcome, EditorError> {
        let outcome = self.composer.handle_key(key);
        if let KeyOutcome::Commit(mutation) = &outcome {
            self.commit(mutation, true)?;
        }
        Ok(outcome)
    }

    /// Commit a candidate picked with the pointer
    pub fn pick_candidate(&mut self, index: usize) -> Result<KeyOutcome, EditorError> {
        let outcome = self.composer.pick(index);
        if let KeyOutcome::Commit(mutation) = &outcome {
            self.commit(mutation, true)?;
        }
        Ok(outcome)
    }

    pub fn pointer(&self, target: &PointerTarget, navigator: &mut dyn Navigator) -> EventDisposition {
        dispatch_pointer(self.bus.document(), target, navigator)
    }

    /// Start a new query; the first match becomes current
    pub fn search(&mut self, query: SearchQuery) -> &[Match] {
        self.search.search(self.bus.document(), query)
    }

    pub fn clear_search(&mut self) {
        self.search.clear();
    }

    pub fn search_next(&mut self, projector: &mut dyn MatchProjector) -> Option<Match> {
        let found = self.search.next().cloned();
        self.search.project(projector);
        found
    }

    pub fn search_prev(&mut self, projector: &mut dyn MatchProjector) -> Option<Match> {
        let found = self.search.prev().cloned();
        self.search.project(projector);
        found
    }

    /// Replace the current match; `None` when there is none
    pub fn replace_current(&mut self, replacement: &str) -> Result<Option<Commit>, EditorError> {
        let Some(index) = self.search.current_index() else {
            return Ok(None);
        };
        match self.search.replace_one(index, replacement) {
            Some(mutation) => self.commit(&mutation, true).map(Some),
            None => Ok(None),
        }
    }

    pub fn replace_all(&mut self, replacement: &str) -> Result<Option<Commit>, EditorError> {
        match self.search.replace_all(replacement) {
            Some(mutation) => self.commit(&mutation, true).map(Some),
            None => Ok(None),
        }
    }

    /// Propagate an entity rename to every reference in the chapter
    pub fn rename_entity(
        &mut self,
        entity_id: &str,
        display_name: &str,
    ) -> Result<Commit, EditorError> {
        for entity in self.catalog.iter_mut().filter(|entity| entity.id == entity_id) {
            entity.name = display_name.to_string();
        }
        self.dispatch_immediate(Mutation::RenameReference {
            entity_id: entity_id.to_string(),
            display_name: display_name.to_string(),
        })
    }

    /// Detach an annotation record from the text, e.g. after it was deleted
    pub fn remove_annotation(&mut self, id: &str) -> Result<Commit, EditorError> {
        self.dispatch_immediate(Mutation::RemoveAnnotationId { id: id.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::MemoryStore;
    use novella_document::{EntityKind, NodeKey, Point};

    fn session(text: &str) -> (EditorSession<ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        let mut session = EditorSession::with_clock(EditorConfig::default(), clock.clone());
        session.open(Some("ch-1".to_string()), Document::from_plain_text(text));
        (session, clock)
    }

    fn first_run(session: &EditorSession<ManualClock>) -> NodeKey {
        session.document().text_runs()[0].key
    }

    fn type_at(session: &mut EditorSession<ManualClock>, offset: usize, text: &str) {
        let key = first_run(session);
        session
            .dispatch(Mutation::InsertText {
                selection: Selection::within(key, offset, offset),
                text: text.to_string(),
            })
            .unwrap();
    }

    #[test]
    fn test_typing_burst_is_one_undo_step() {
        let (mut session, clock) = session("");
        clock.advance_ms(2000);
        type_at(&mut session, 0, "a");
        clock.advance_ms(100);
        type_at(&mut session, 1, "b");
        clock.advance_ms(100);
        type_at(&mut session, 2, "c");

        assert_eq!(session.document().plain_text(), "abc");
        assert!(session.undo());
        assert_eq!(session.document().plain_text(), "");
        assert!(session.redo());
        assert_eq!(session.document().plain_text(), "abc");
    }

    #[test]
    fn test_pause_creates_new_step() {
        let (mut session, clock) = session("");
        clock.advance_ms(2000);
        type_at(&mut session, 0, "a");
        clock.advance_ms(2000);
        type_at(&mut session, 1, "b");

        session.undo();
        assert_eq!(session.document().plain_text(), "a");
    }

    #[test]
    fn test_auto_format_undoes_in_one_step() {
        let (mut session, clock) = session("你好,世界");
        clock.advance_ms(2000);
        session.auto_format().unwrap();
        assert_eq!(session.document().plain_text(), "你好，世界");

        session.undo();
        assert_eq!(session.document().plain_text(), "你好,世界");
        assert!(!session.history().can_undo());
    }

    #[test]
    fn test_auto_format_without_changes_adds_no_step() {
        let (mut session, _) = session("你好，世界");
        let commit = session.auto_format().unwrap();
        assert!(!commit.changed);
        assert!(!session.history().can_undo());
    }

    #[test]
    fn test_search_follows_edits() {
        let (mut session, clock) = session("cat and cat");
        session.search(SearchQuery::literal("cat"));
        assert_eq!(session.search_engine().matches().len(), 2);

        clock.advance_ms(2000);
        session.replace_current("dog").unwrap();
        assert_eq!(session.document().plain_text(), "dog and cat");
        assert_eq!(session.search_engine().matches().len(), 1);
        assert_eq!(session.search_engine().current_index(), Some(0));

        session.undo();
        assert_eq!(session.search_engine().matches().len(), 2);
    }

    #[test]
    fn test_word_count_is_debounced() {
        let (mut session, clock) = session("ab");
        assert_eq!(session.word_count(), 2);

        type_at(&mut session, 2, "cd");
        clock.advance_ms(1000);
        assert_eq!(session.tick(), None);
        assert_eq!(session.word_count(), 2);

        clock.advance_ms(600);
        assert_eq!(session.tick(), Some(4));
    }

    #[test]
    fn test_composer_commit_is_one_step() {
        let (mut session, clock) = session("Hi ");
        session.set_catalog(vec![Entity::new("c1", "Alice", EntityKind::Character)]);

        clock.advance_ms(2000);
        type_at(&mut session, 3, "@");
        assert!(session.composer().is_composing());
        clock.advance_ms(50);
        type_at(&mut session, 4, "al");
        assert_eq!(session.composer().query(), Some("al"));

        clock.advance_ms(50);
        let outcome = session.handle_composer_key(ComposerKey::Enter).unwrap();
        assert!(matches!(outcome, KeyOutcome::Commit(_)));
        assert_eq!(session.document().plain_text(), "Hi @Alice ");
        assert_eq!(session.document().references_to("c1").len(), 1);

        session.undo();
        assert_eq!(session.document().plain_text(), "Hi @al");
    }

    #[test]
    fn test_catalog_change_reranks_open_composition() {
        let (mut session, _) = session("");
        type_at(&mut session, 0, "@");
        assert!(session.composer().is_composing());
        assert!(session.composer().candidates().is_empty());

        session.set_catalog(vec![
            Entity::new("c1", "Alice", EntityKind::Character),
            Entity::new("m1", "Harbor", EntityKind::Map),
        ]);
        assert_eq!(session.composer().candidates().len(), 2);
        assert_eq!(session.composer().selected().map(|e| e.id.as_str()), Some("c1"));
    }

    #[test]
    fn test_shortcuts_drive_history() {
        let (mut session, clock) = session("");
        clock.advance_ms(2000);
        type_at(&mut session, 0, "x");

        let outcome = session.handle_shortcut(&KeyEvent::ctrl("z")).unwrap();
        assert_eq!(outcome, ShortcutOutcome::Handled(ShortcutAction::Undo));
        assert_eq!(session.document().plain_text(), "");

        let outcome = session.handle_shortcut(&KeyEvent::ctrl("s")).unwrap();
        assert_eq!(outcome, ShortcutOutcome::Host(ShortcutAction::Save));
        assert_eq!(
            session.handle_shortcut(&KeyEvent::plain("q")).unwrap(),
            ShortcutOutcome::Unbound
        );
    }

    #[test]
    fn test_open_resets_everything() {
        let (mut session, clock) = session("cat");
        session.search(SearchQuery::literal("cat"));
        clock.advance_ms(2000);
        type_at(&mut session, 3, "s");

        session.open(None, Document::from_plain_text("new chapter"));
        assert!(!session.history().can_undo());
        assert!(!session.search_engine().is_active());
        assert_eq!(session.word_count(), 10);
        assert_eq!(session.document_id(), None);
    }

    #[test]
    fn test_save_and_reopen_through_store() {
        let (mut session, clock) = session("Hello");
        clock.advance_ms(2000);
        let key = first_run(&session);
        session
            .dispatch(Mutation::WrapAnnotation {
                selection: Selection::within(key, 0, 5),
                id: "idea-1".to_string(),
            })
            .unwrap();

        let mut store = MemoryStore::new();
        session.save(&mut store).unwrap();

        let mut reopened = EditorSession::with_clock(EditorConfig::default(), ManualClock::new());
        reopened.open_from_store(&store, "ch-1").unwrap();
        assert_eq!(reopened.document().annotation_ids(), vec!["idea-1".to_string()]);
    }

    #[test]
    fn test_save_requires_id() {
        let (mut session, _) = session("x");
        session.open(None, Document::new());
        let mut store = MemoryStore::new();
        assert!(matches!(
            session.save(&mut store),
            Err(EditorError::NotStoreBacked)
        ));
    }

    #[test]
    fn test_rename_entity_updates_references() {
        let (mut session, _) = session("Hi ");
        let key = first_run(&session);
        session
            .dispatch(Mutation::InsertReference {
                selection: Selection::caret(Point::new(key, 3)),
                entity_id: "c1".to_string(),
                display_name: "Alice".to_string(),
                entity_kind: EntityKind::Character,
            })
            .unwrap();

        session.rename_entity("c1", "Alicia").unwrap();
        assert_eq!(session.document().plain_text(), "Hi @Alicia ");
    }
}
