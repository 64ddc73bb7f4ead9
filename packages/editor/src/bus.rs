//! # Command Bus
//!
//! Single write path for document edits: Validate → Apply → Commit → Log
//!
//! The bus manages:
//! - Applying mutations to a copy of the current snapshot
//! - Publishing the copy as the next immutable snapshot
//! - A bounded log of committed mutation names
//!
//! A mutation that fails leaves the current snapshot untouched. A mutation
//! that changes nothing keeps the current `Arc`, so history sees the same
//! snapshot and ignores it.

use crate::mutations::{Mutation, MutationError};
use novella_document::{Document, Point};
use std::collections::VecDeque;
use std::sync::Arc;

pub const DEFAULT_LOG_LIMIT: usize = 256;

/// One committed mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub revision: u64,
    pub name: &'static str,
}

/// Result of a dispatch
#[derive(Debug, Clone)]
pub struct Commit {
    /// Revision after the dispatch
    pub revision: u64,

    /// Whether a new snapshot was published
    pub changed: bool,

    /// Caret placed by the mutation, if any
    pub caret: Option<Point>,

    /// Current snapshot
    pub document: Arc<Document>,
}

pub struct CommandBus {
    document: Arc<Document>,
    revision: u64,
    log: VecDeque<LogEntry>,
    log_limit: usize,
}

impl CommandBus {
    pub fn new(document: Arc<Document>) -> Self {
        Self::with_log_limit(document, DEFAULT_LOG_LIMIT)
    }

    pub fn with_log_limit(document: Arc<Document>, log_limit: usize) -> Self {
        Self {
            document,
            revision: 0,
            log: VecDeque::new(),
            log_limit,
        }
    }

    /// Apply mutation and commit the resulting snapshot
    pub fn dispatch(&mut self, mutation: &Mutation) -> Result<Commit, MutationError> {
        let mut next = Document::clone(&self.document);
        let outcome = mutation.apply(&mut next)?;

        if outcome.changed {
            self.revision += 1;
            self.document = Arc::new(next);
            self.log.push_back(LogEntry {
                revision: self.revision,
                name: mutation.name(),
            });
            while self.log.len() > self.log_limit {
                self.log.pop_front();
            }
            tracing::debug!(mutation = mutation.name(), revision = self.revision, "committed");
        } else {
            tracing::trace!(mutation = mutation.name(), "mutation left document unchanged");
        }

        Ok(Commit {
            revision: self.revision,
            changed: outcome.changed,
            caret: outcome.caret,
            document: Arc::clone(&self.document),
        })
    }

    /// Replace the current snapshot without going through a mutation.
    ///
    /// Used when history moves to another snapshot or a new chapter opens;
    /// counts as a revision so derived state (search matches) is refreshed.
    pub fn replace(&mut self, document: Arc<Document>) {
        if Arc::ptr_eq(&self.document, &document) {
            return;
        }
        self.revision += 1;
        self.document = document;
    }

    pub fn document(&self) -> &Arc<Document> {
        &self.document
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Committed mutations, oldest first
    pub fn log(&self) -> impl Iterator<Item = &LogEntry> {
        self.log.iter()
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
    }
}
