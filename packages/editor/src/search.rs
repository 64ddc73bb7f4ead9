//! # Find and Replace
//!
//! Matches are computed per text run, in document order, against one
//! document snapshot. Any commit invalidates them; the session re-runs the
//! active query after every change so offsets never go stale.
//!
//! Replacements are not applied here. `replace_one` and `replace_all` build a
//! [`Mutation::ReplaceSpans`] that goes through the command bus like every
//! other edit, which keeps replace undoable.

use crate::mutations::{Mutation, TextSpan};
use novella_document::{Document, NodeKey, Reference, TextRun, Visitor};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub text: String,
    pub case_sensitive: bool,
    pub regex: bool,
}

impl SearchQuery {
    pub fn literal(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn pattern(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            regex: true,
            ..Default::default()
        }
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// `None` for an empty query or an invalid pattern
    fn compile(&self) -> Option<Regex> {
        if self.text.is_empty() {
            return None;
        }
        let source = if self.regex {
            self.text.clone()
        } else {
            regex::escape(&self.text)
        };
        match RegexBuilder::new(&source)
            .case_insensitive(!self.case_sensitive)
            .build()
        {
            Ok(regex) => Some(regex),
            Err(err) => {
                tracing::debug!(query = %self.text, error = %err, "invalid search pattern");
                None
            }
        }
    }
}

/// One occurrence inside a text run, as char offsets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub node: NodeKey,
    pub start: usize,
    pub end: usize,
    pub matched_text: String,
}

/// Presentation of matches, kept out of the engine
pub trait MatchProjector {
    fn highlight(&mut self, matches: &[Match], active: Option<usize>);

    fn scroll_into_view(&mut self, found: &Match);
}

/// Projector for hosts without a view
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProjector;

impl MatchProjector for NoopProjector {
    fn highlight(&mut self, _matches: &[Match], _active: Option<usize>) {}

    fn scroll_into_view(&mut self, _found: &Match) {}
}

/// Renders matches into plain text between `[` and `]`
#[derive(Debug, Default, Clone)]
pub struct MarkerProjector {
    matches: Vec<Match>,
    active: Option<usize>,
    last_scrolled: Option<Match>,
}

impl MarkerProjector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<usize> {
        self.active
    }

    pub fn last_scrolled(&self) -> Option<&Match> {
        self.last_scrolled.as_ref()
    }

    /// Plain text of `doc`, one line per block, highlighted matches marked
    pub fn render(&self, doc: &Document) -> String {
        struct Render<'p> {
            matches: &'p [Match],
            line: String,
        }
        impl<'a> Visitor<'a> for Render<'_> {
            fn visit_text(&mut self, run: &'a TextRun) {
                let mut spans: Vec<&Match> =
                    self.matches.iter().filter(|m| m.node == run.key).collect();
                spans.sort_by_key(|m| m.start);
                let mut spans = spans.into_iter().peekable();

                for (i, c) in run.text.chars().enumerate() {
                    if spans.peek().is_some_and(|m| m.start == i) {
                        self.line.push('[');
                    }
                    self.line.push(c);
                    if spans.peek().is_some_and(|m| m.end == i + 1) {
                        self.line.push(']');
                        spans.next();
                    }
                }
            }

            fn visit_reference(&mut self, reference: &'a Reference) {
                self.line.push_str(&reference.text_content());
            }
        }

        doc.blocks()
            .iter()
            .map(|block| {
                let mut render = Render {
                    matches: &self.matches,
                    line: String::new(),
                };
                render.visit_block(block);
                render.line
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl MatchProjector for MarkerProjector {
    fn highlight(&mut self, matches: &[Match], active: Option<usize>) {
        self.matches = matches.to_vec();
        self.active = active;
    }

    fn scroll_into_view(&mut self, found: &Match) {
        self.last_scrolled = Some(found.clone());
    }
}

/// Match index for the active query
#[derive(Debug, Default, Clone)]
pub struct SearchEngine {
    query: Option<SearchQuery>,
    matches: Vec<Match>,
    current: Option<usize>,
}

impl SearchEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run a new query; the first match becomes current
    pub fn search(&mut self, doc: &Document, query: SearchQuery) -> &[Match] {
        self.matches = find_matches(doc, &query);
        self.current = if self.matches.is_empty() { None } else { Some(0) };
        self.query = Some(query);
        &self.matches
    }

    /// Re-run the active query against a changed document, keeping the
    /// current index where the match count allows
    pub fn refresh(&mut self, doc: &Document) {
        let Some(query) = &self.query else {
            return;
        };
        self.matches = find_matches(doc, query);
        self.current = match (self.current, self.matches.len()) {
            (_, 0) => None,
            (Some(index), len) => Some(index.min(len - 1)),
            (None, _) => Some(0),
        };
    }

    pub fn clear(&mut self) {
        self.query = None;
        self.matches.clear();
        self.current = None;
    }

    pub fn is_active(&self) -> bool {
        self.query.is_some()
    }

    pub fn query(&self) -> Option<&SearchQuery> {
        self.query.as_ref()
    }

    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current(&self) -> Option<&Match> {
        self.current.and_then(|index| self.matches.get(index))
    }

    /// Advance circularly; `None` when there are no matches
    pub fn next(&mut self) -> Option<&Match> {
        let len = self.matches.len();
        if len == 0 {
            return None;
        }
        let next = self.current.map_or(0, |index| (index + 1) % len);
        self.current = Some(next);
        self.matches.get(next)
    }

    /// Step back circularly; `None` when there are no matches
    pub fn prev(&mut self) -> Option<&Match> {
        let len = self.matches.len();
        if len == 0 {
            return None;
        }
        let prev = self.current.map_or(len - 1, |index| (index + len - 1) % len);
        self.current = Some(prev);
        self.matches.get(prev)
    }

    /// Push the current state to a projector
    pub fn project(&self, projector: &mut dyn MatchProjector) {
        projector.highlight(&self.matches, self.current);
        if let Some(current) = self.current() {
            projector.scroll_into_view(current);
        }
    }

    /// Edit replacing match `index`
    pub fn replace_one(&self, index: usize, replacement: &str) -> Option<Mutation> {
        let found = self.matches.get(index)?;
        Some(Mutation::ReplaceSpans {
            spans: vec![span(found, replacement)],
        })
    }

    /// Edit replacing every match
    pub fn replace_all(&self, replacement: &str) -> Option<Mutation> {
        if self.matches.is_empty() {
            return None;
        }
        Some(Mutation::ReplaceSpans {
            spans: self.matches.iter().map(|m| span(m, replacement)).collect(),
        })
    }
}

fn span(found: &Match, replacement: &str) -> TextSpan {
    TextSpan {
        node: found.node,
        start: found.start,
        end: found.end,
        replacement: replacement.to_string(),
    }
}

/// Non-overlapping matches of `query` over every text run of `doc`
pub fn find_matches(doc: &Document, query: &SearchQuery) -> Vec<Match> {
    let Some(regex) = query.compile() else {
        return Vec::new();
    };

    let mut found = Vec::new();
    for run in doc.text_runs() {
        // Byte offsets are converted to chars incrementally
        let mut chars_before = 0;
        let mut bytes_seen = 0;
        for m in regex.find_iter(&run.text) {
            if m.start() == m.end() {
                continue;
            }
            chars_before += run.text[bytes_seen..m.start()].chars().count();
            let len = m.as_str().chars().count();
            found.push(Match {
                node: run.key,
                start: chars_before,
                end: chars_before + len,
                matched_text: m.as_str().to_string(),
            });
            chars_before += len;
            bytes_seen = m.end();
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use novella_document::{AnnotationRange, Block, EntityKind, Inline};

    fn doc() -> Document {
        Document::from_blocks(vec![
            Block::paragraph(vec![
                Inline::Text(TextRun::plain("The cat sat. ")),
                Inline::Annotation(AnnotationRange::new(
                    vec!["idea".to_string()],
                    vec![Inline::Text(TextRun::plain("Cat nap"))],
                )),
            ]),
            Block::paragraph(vec![
                Inline::Reference(Reference::new("c1", "Cat", EntityKind::Character)),
                Inline::Text(TextRun::plain(" 猫和cat")),
            ]),
        ])
    }

    #[test]
    fn test_literal_search_is_case_insensitive_by_default() {
        let doc = doc();
        let mut engine = SearchEngine::new();
        let matches = engine.search(&doc, SearchQuery::literal("cat"));

        let texts: Vec<&str> = matches.iter().map(|m| m.matched_text.as_str()).collect();
        assert_eq!(texts, vec!["cat", "Cat", "cat"]);
        assert_eq!(engine.current_index(), Some(0));
    }

    #[test]
    fn test_offsets_are_chars() {
        let doc = doc();
        let matches = find_matches(&doc, &SearchQuery::literal("cat").case_sensitive(true));
        let last = matches.last().unwrap();
        assert_eq!((last.start, last.end), (3, 6));
        assert_eq!(matches.len(), 2);
    }

    #[test]
    fn test_literal_query_escapes_metacharacters() {
        let doc = doc();
        assert_eq!(find_matches(&doc, &SearchQuery::literal("sat.")).len(), 1);
        assert_eq!(find_matches(&doc, &SearchQuery::literal("c.t")).len(), 0);
        assert_eq!(find_matches(&doc, &SearchQuery::pattern("c.t")).len(), 3);
    }

    #[test]
    fn test_empty_and_invalid_queries_match_nothing() {
        let doc = doc();
        assert!(find_matches(&doc, &SearchQuery::literal("")).is_empty());
        assert!(find_matches(&doc, &SearchQuery::pattern("(unclosed")).is_empty());
    }

    #[test]
    fn test_zero_length_matches_are_skipped() {
        let doc = doc();
        assert!(find_matches(&doc, &SearchQuery::pattern("x*")).is_empty());
    }

    #[test]
    fn test_navigation_wraps() {
        let doc = doc();
        let mut engine = SearchEngine::new();
        engine.search(&doc, SearchQuery::literal("cat"));

        engine.next();
        engine.next();
        assert_eq!(engine.current_index(), Some(2));
        engine.next();
        assert_eq!(engine.current_index(), Some(0));
        engine.prev();
        assert_eq!(engine.current_index(), Some(2));
    }

    #[test]
    fn test_navigation_on_empty_is_noop() {
        let doc = doc();
        let mut engine = SearchEngine::new();
        engine.search(&doc, SearchQuery::literal("dog"));
        assert!(engine.next().is_none());
        assert!(engine.prev().is_none());
        assert_eq!(engine.current_index(), None);
    }

    #[test]
    fn test_replace_all_and_refresh() {
        let mut doc = doc();
        let mut engine = SearchEngine::new();
        engine.search(&doc, SearchQuery::literal("cat"));

        let mutation = engine.replace_all("dog").unwrap();
        mutation.apply(&mut doc).unwrap();
        engine.refresh(&doc);

        assert!(engine.matches().is_empty());
        assert_eq!(engine.current_index(), None);
        assert_eq!(doc.plain_text(), "The dog sat. dog nap\n@Cat 猫和dog");
    }

    #[test]
    fn test_replace_one_keeps_index_clamped() {
        let mut doc = doc();
        let mut engine = SearchEngine::new();
        engine.search(&doc, SearchQuery::literal("cat"));
        engine.next();
        engine.next();

        let mutation = engine.replace_one(2, "dog").unwrap();
        mutation.apply(&mut doc).unwrap();
        engine.refresh(&doc);

        assert_eq!(engine.matches().len(), 2);
        assert_eq!(engine.current_index(), Some(1));
    }

    #[test]
    fn test_marker_projector_renders_matches() {
        let doc = doc();
        let mut engine = SearchEngine::new();
        engine.search(&doc, SearchQuery::literal("cat"));

        let mut projector = MarkerProjector::new();
        engine.project(&mut projector);

        assert_eq!(
            projector.render(&doc),
            "The [cat] sat. [Cat] nap\n@Cat 猫和[cat]"
        );
        assert_eq!(projector.active(), Some(0));
        assert_eq!(projector.last_scrolled().map(|m| m.start), Some(4));
    }
}
