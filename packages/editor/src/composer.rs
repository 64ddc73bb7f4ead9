//! # Reference Composer
//!
//! State machine behind `@name` completion.
//!
//! ```text
//!            trigger typed after whitespace
//!   Idle ───────────────────────────────────► Composing { run, anchor, query }
//!    ▲                                              │
//!    └──── commit │ escape │ caret leaves │ space ──┘
//! ```
//!
//! The composer never edits the document itself. A commit hands back a
//! [`Mutation::InsertReference`] replacing `trigger + query` with the
//! reference, which the session records as one undo step. An abort leaves
//! whatever was typed in place as literal text.

use crate::catalog::Entity;
use crate::mutations::Mutation;
use novella_document::{Document, EntityKind, NodeKey, Selection};

pub const DEFAULT_TRIGGER: char = '@';
pub const DEFAULT_CANDIDATE_LIMIT: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposerState {
    Idle,
    Composing {
        /// Text run holding the trigger
        run: NodeKey,
        /// Char offset of the trigger inside the run
        anchor_offset: usize,
        query: String,
    },
}

/// Restricts candidates to one entity kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KindFilter {
    #[default]
    All,
    Only(EntityKind),
}

impl KindFilter {
    fn accepts(self, kind: EntityKind) -> bool {
        match self {
            KindFilter::All => true,
            KindFilter::Only(only) => only == kind,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposerKey {
    Up,
    Down,
    Enter,
    Tab,
    Escape,
}

/// What a key press did while composing
#[derive(Debug, Clone, PartialEq)]
pub enum KeyOutcome {
    /// Not for the composer; normal editor handling applies
    Ignored,
    /// Highlight moved
    Consumed,
    /// Composition ended without edits
    Aborted,
    /// Composition ended; dispatch this edit as one undo step
    Commit(Mutation),
}

#[derive(Debug, Clone)]
pub struct ReferenceComposer {
    state: ComposerState,
    filter: KindFilter,
    candidates: Vec<Entity>,
    selected: usize,
    trigger: char,
    candidate_limit: usize,
}

impl Default for ReferenceComposer {
    fn default() -> Self {
        Self::new(DEFAULT_TRIGGER, DEFAULT_CANDIDATE_LIMIT)
    }
}

impl ReferenceComposer {
    pub fn new(trigger: char, candidate_limit: usize) -> Self {
        Self {
            state: ComposerState::Idle,
            filter: KindFilter::All,
            candidates: Vec::new(),
            selected: 0,
            trigger,
            candidate_limit,
        }
    }

    pub fn state(&self) -> &ComposerState {
        &self.state
    }

    pub fn is_composing(&self) -> bool {
        matches!(self.state, ComposerState::Composing { .. })
    }

    pub fn query(&self) -> Option<&str> {
        match &self.state {
            ComposerState::Composing { query, .. } => Some(query),
            ComposerState::Idle => None,
        }
    }

    pub fn candidates(&self) -> &[Entity] {
        &self.candidates
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn selected(&self) -> Option<&Entity> {
        self.candidates.get(self.selected)
    }

    pub fn filter(&self) -> KindFilter {
        self.filter
    }

    /// Re-evaluate after the document or selection changed
    pub fn update(&mut self, doc: &Document, selection: &Selection, catalog: &[Entity]) {
        if !selection.is_collapsed() {
            self.abort();
            return;
        }
        let caret = selection.focus;
        let Some(run) = doc.find_text(caret.key) else {
            self.abort();
            return;
        };
        let chars: Vec<char> = run.text.chars().collect();

        if let ComposerState::Composing {
            run: host,
            anchor_offset,
            query,
        } = &self.state
        {
            let anchor = *anchor_offset;
            let still_inside = caret.key == *host
                && caret.offset > anchor
                && caret.offset <= chars.len()
                && chars.get(anchor) == Some(&self.trigger);
            if still_inside {
                let typed: String = chars[anchor + 1..caret.offset].iter().collect();
                if typed.chars().any(char::is_whitespace) {
                    self.abort();
                    return;
                }
                if typed != *query {
                    self.state = ComposerState::Composing {
                        run: caret.key,
                        anchor_offset: anchor,
                        query: typed,
                    };
                    self.rank(catalog);
                }
                return;
            }
            self.abort();
        }

        // Trigger must start a word: first char of the run or after whitespace
        let Some(before) = caret.offset.checked_sub(1) else {
            return;
        };
        if chars.get(before) != Some(&self.trigger) {
            return;
        }
        let starts_word = before == 0 || chars.get(before - 1).is_some_and(|c| c.is_whitespace());
        if !starts_word {
            return;
        }

        tracing::trace!(run = %caret.key, offset = before, "reference composition started");
        self.state = ComposerState::Composing {
            run: caret.key,
            anchor_offset: before,
            query: String::new(),
        };
        self.filter = KindFilter::All;
        self.rank(catalog);
    }

    pub fn set_filter(&mut self, filter: KindFilter, catalog: &[Entity]) {
        self.filter = filter;
        if self.is_composing() {
            self.rank(catalog);
        }
    }

    pub fn handle_key(&mut self, key: ComposerKey) -> KeyOutcome {
        if !self.is_composing() {
            return KeyOutcome::Ignored;
        }
        if key == ComposerKey::Escape {
            self.abort();
            return KeyOutcome::Aborted;
        }
        if self.candidates.is_empty() {
            return KeyOutcome::Ignored;
        }

        let len = self.candidates.len();
        match key {
            ComposerKey::Down => {
                self.selected = (self.selected + 1) % len;
                KeyOutcome::Consumed
            }
            ComposerKey::Up => {
                self.selected = (self.selected + len - 1) % len;
                KeyOutcome::Consumed
            }
            ComposerKey::Enter | ComposerKey::Tab => self.pick(self.selected),
            ComposerKey::Escape => KeyOutcome::Aborted,
        }
    }

    /// Commit candidate `index`, e.g. on a click in the list
    pub fn pick(&mut self, index: usize) -> KeyOutcome {
        let Some(entity) = self.candidates.get(index).cloned() else {
            return KeyOutcome::Ignored;
        };
        let ComposerState::Composing {
            run,
            anchor_offset,
            query,
        } = &self.state
        else {
            return KeyOutcome::Ignored;
        };

        let end = anchor_offset + 1 + query.chars().count();
        let mutation = Mutation::InsertReference {
            selection: Selection::within(*run, *anchor_offset, end),
            entity_id: entity.id,
            display_name: entity.name,
            entity_kind: entity.kind,
        };
        self.abort();
        KeyOutcome::Commit(mutation)
    }

    /// Back to idle; typed text stays as it is
    pub fn abort(&mut self) {
        if self.is_composing() {
            tracing::trace!("reference composition ended");
        }
        self.state = ComposerState::Idle;
        self.candidates.clear();
        self.selected = 0;
    }

    fn rank(&mut self, catalog: &[Entity]) {
        let query = self.query().unwrap_or_default().to_lowercase();
        self.candidates = catalog
            .iter()
            .filter(|entity| self.filter.accepts(entity.kind))
            .filter(|entity| entity.name.to_lowercase().contains(&query))
            .take(self.candidate_limit)
            .cloned()
            .collect();
        self.selected = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use novella_document::Point;

    fn catalog() -> Vec<Entity> {
        vec![
            Entity::new("c1", "Alice", EntityKind::Character),
            Entity::new("c2", "Albert", EntityKind::Character),
            Entity::new("i1", "Alembic", EntityKind::Item),
            Entity::new("w1", "Bob", EntityKind::Character),
        ]
    }

    fn caret(doc: &Document, offset: usize) -> Selection {
        Selection::caret(Point::new(doc.text_runs()[0].key, offset))
    }

    #[test]
    fn test_trigger_after_space_starts_composing() {
        let doc = Document::from_plain_text("Hi @");
        let mut composer = ReferenceComposer::default();
        composer.update(&doc, &caret(&doc, 4), &catalog());

        assert!(composer.is_composing());
        assert_eq!(composer.query(), Some(""));
        assert_eq!(composer.candidates().len(), 4);
    }

    #[test]
    fn test_trigger_inside_word_is_ignored() {
        let doc = Document::from_plain_text("mail@");
        let mut composer = ReferenceComposer::default();
        composer.update(&doc, &caret(&doc, 5), &catalog());
        assert!(!composer.is_composing());
    }

    #[test]
    fn test_query_ranks_case_insensitively() {
        let doc = Document::from_plain_text("@al");
        let mut composer = ReferenceComposer::default();
        let key = doc.text_runs()[0].key;
        composer.update(&doc, &Selection::caret(Point::new(key, 1)), &catalog());
        composer.update(&doc, &caret(&doc, 3), &catalog());

        let names: Vec<&str> = composer.candidates().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Alice", "Albert", "Alembic"]);
    }

    #[test]
    fn test_filter_restricts_kind_and_resets_selection() {
        let doc = Document::from_plain_text("@");
        let mut composer = ReferenceComposer::default();
        composer.update(&doc, &caret(&doc, 1), &catalog());
        composer.handle_key(ComposerKey::Down);
        assert_eq!(composer.selected_index(), 1);

        composer.set_filter(KindFilter::Only(EntityKind::Item), &catalog());
        assert_eq!(composer.candidates().len(), 1);
        assert_eq!(composer.selected_index(), 0);
    }

    #[test]
    fn test_candidates_are_capped() {
        let many: Vec<Entity> = (0..20)
            .map(|i| Entity::new(format!("c{}", i), format!("Name {}", i), EntityKind::Character))
            .collect();
        let doc = Document::from_plain_text("@");
        let mut composer = ReferenceComposer::default();
        composer.update(&doc, &caret(&doc, 1), &many);
        assert_eq!(composer.candidates().len(), DEFAULT_CANDIDATE_LIMIT);
    }

    #[test]
    fn test_whitespace_in_query_aborts() {
        let doc = Document::from_plain_text("@");
        let mut composer = ReferenceComposer::default();
        composer.update(&doc, &caret(&doc, 1), &catalog());

        let mut typed = doc.clone();
        let key = typed.text_runs()[0].key;
        typed.find_text_mut(key).unwrap().text = "@al x".to_string();
        composer.update(&typed, &caret(&typed, 5), &catalog());

        assert!(!composer.is_composing());
    }

    #[test]
    fn test_caret_before_anchor_aborts() {
        let doc = Document::from_plain_text("Hi @al");
        let mut composer = ReferenceComposer::default();
        let key = doc.text_runs()[0].key;
        composer.update(&doc, &Selection::caret(Point::new(key, 4)), &catalog());
        assert!(composer.is_composing());

        composer.update(&doc, &caret(&doc, 3), &catalog());
        assert!(!composer.is_composing());
    }

    #[test]
    fn test_range_selection_aborts() {
        let doc = Document::from_plain_text("@al");
        let mut composer = ReferenceComposer::default();
        composer.update(&doc, &caret(&doc, 1), &catalog());

        let key = doc.text_runs()[0].key;
        composer.update(&doc, &Selection::within(key, 1, 3), &catalog());
        assert!(!composer.is_composing());
    }

    #[test]
    fn test_keys_cycle_and_commit() {
        let doc = Document::from_plain_text("@al");
        let key = doc.text_runs()[0].key;
        let mut composer = ReferenceComposer::default();
        composer.update(&doc, &Selection::caret(Point::new(key, 1)), &catalog());
        composer.update(&doc, &Selection::caret(Point::new(key, 3)), &catalog());

        assert_eq!(composer.handle_key(ComposerKey::Up), KeyOutcome::Consumed);
        assert_eq!(composer.selected().map(|e| e.id.as_str()), Some("i1"));
        assert_eq!(composer.handle_key(ComposerKey::Down), KeyOutcome::Consumed);
        assert_eq!(composer.selected().map(|e| e.id.as_str()), Some("c1"));

        let outcome = composer.handle_key(ComposerKey::Enter);
        assert_eq!(
            outcome,
            KeyOutcome::Commit(Mutation::InsertReference {
                selection: Selection::within(key, 0, 3),
                entity_id: "c1".to_string(),
                display_name: "Alice".to_string(),
                entity_kind: EntityKind::Character,
            })
        );
        assert!(!composer.is_composing());
    }

    #[test]
    fn test_keys_pass_through_without_candidates() {
        let doc = Document::from_plain_text("@zz");
        let key = doc.text_runs()[0].key;
        let mut composer = ReferenceComposer::default();
        composer.update(&doc, &Selection::caret(Point::new(key, 1)), &catalog());
        composer.update(&doc, &Selection::caret(Point::new(key, 3)), &catalog());
        assert!(composer.candidates().is_empty());

        assert_eq!(composer.handle_key(ComposerKey::Enter), KeyOutcome::Ignored);
        assert_eq!(composer.handle_key(ComposerKey::Down), KeyOutcome::Ignored);
        assert_eq!(composer.handle_key(ComposerKey::Escape), KeyOutcome::Aborted);
        assert!(!composer.is_composing());
    }

    #[test]
    fn test_custom_trigger() {
        let doc = Document::from_plain_text("#");
        let mut composer = ReferenceComposer::new('#', 8);
        composer.update(&doc, &caret(&doc, 1), &catalog());
        assert!(composer.is_composing());
    }
}
