//! # Novella Editor
//!
//! Editing engine for manuscript chapters.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ document: node tree + serialized form       │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: EditorSession                       │
//! │  - Mutations through the command bus        │
//! │  - Debounced undo/redo history              │
//! │  - Find/replace re-synced after each commit │
//! │  - @-reference composer                     │
//! │  - Auto-format, word count, shortcuts       │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ host: store, entity catalog, navigator      │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Snapshots are values**: every commit publishes a new `Arc<Document>`
//! 2. **One write path**: all edits are `Mutation`s dispatched by the session
//! 3. **Derived state follows commits**: search matches and word counts are
//!    recomputed from the snapshot, never patched
//! 4. **Host at the edges**: storage, entities and navigation are traits
//!
//! ## Usage
//!
//! ```rust,ignore
//! use novella_editor::{EditorConfig, EditorSession, Mutation, SearchQuery};
//!
//! let mut session = EditorSession::new(EditorConfig::default());
//! session.open_from_store(&store, "chapter-1")?;
//!
//! session.dispatch(Mutation::InsertText { selection, text: "你好".into() })?;
//! session.search(SearchQuery::literal("你好"));
//! session.replace_all("再见")?;
//! session.undo();
//!
//! session.save(&mut store)?;
//! ```

mod annotations;
mod bus;
mod catalog;
mod clock;
mod composer;
mod edits;
mod errors;
mod format;
mod history;
mod interaction;
mod mutations;
mod preferences;
mod search;
mod session;
mod shortcuts;
mod store;
mod word_count;

pub use annotations::annotation_of;
pub use bus::{CommandBus, Commit, LogEntry, DEFAULT_LOG_LIMIT};
pub use catalog::{CatalogError, Entity, EntityCatalog, StaticCatalog};
pub use clock::{Clock, ManualClock, SystemClock};
pub use composer::{
    ComposerKey, ComposerState, KeyOutcome, KindFilter, ReferenceComposer,
    DEFAULT_CANDIDATE_LIMIT, DEFAULT_TRIGGER,
};
pub use errors::EditorError;
pub use format::{format_text, Language};
pub use history::{Checkpoint, History, HistoryConfig, HistoryState, Recorded};
pub use interaction::{dispatch_pointer, Activation, EventDisposition, Navigator, RecordingNavigator};
pub use mutations::{Mutation, MutationError, MutationOutcome, TextSpan};
pub use preferences::EditorConfig;
pub use search::{
    find_matches, MarkerProjector, Match, MatchProjector, NoopProjector, SearchEngine, SearchQuery,
};
pub use session::{EditorSession, ShortcutOutcome};
pub use shortcuts::{KeyBinding, KeyEvent, ShortcutAction, ShortcutMap};
pub use store::{DocumentStore, FileStore, MemoryStore, StoreError};
pub use word_count::{count_words, WordCounter, DEFAULT_WORD_COUNT_DELAY};

// Re-export the document model for convenience
pub use novella_document as document;
pub use novella_document::{Document, NodeKey, Point, PointerTarget, Selection};
