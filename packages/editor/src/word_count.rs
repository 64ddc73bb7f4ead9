use novella_document::Document;
use std::time::Duration;

pub const DEFAULT_WORD_COUNT_DELAY: Duration = Duration::from_millis(1500);

/// Characters that count towards a chapter's length: everything except
/// whitespace, so CJK text counts per ideograph
pub fn count_words(doc: &Document) -> usize {
    doc.plain_text().chars().filter(|c| !c.is_whitespace()).count()
}

/// Deadline-debounced recount.
///
/// Every edit pushes the deadline back; the count is only refreshed once
/// edits pause for `delay`.
#[derive(Debug, Clone)]
pub struct WordCounter {
    delay: Duration,
    deadline: Option<Duration>,
    count: usize,
}

impl WordCounter {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
            count: 0,
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// (Re)schedule a recount `delay` after `now`
    pub fn schedule(&mut self, now: Duration) {
        self.deadline = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Count right away, dropping any pending recount
    pub fn recount(&mut self, doc: &Document) -> usize {
        self.deadline = None;
        self.count = count_words(doc);
        self.count
    }

    /// Recount if the deadline has passed; returns the new count when it did
    pub fn tick(&mut self, now: Duration, doc: &Document) -> Option<usize> {
        match self.deadline {
            Some(deadline) if now >= deadline => Some(self.recount(doc)),
            _ => None,
        }
    }
}

impl Default for WordCounter {
    fn default() -> Self {
        Self::new(DEFAULT_WORD_COUNT_DELAY)
    }
}
