//! Caret points and selections.
//!
//! A [`Point`] usually addresses a char offset inside a text run. References
//! are atomic: a point keyed by a reference has offset 0 (before it) or 1
//! (after it). Those only come up where no text run borders the reference,
//! e.g. a block that starts with one or two references side by side.

use crate::{Block, Document, Inline, NodeKey};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    /// Text run (or reference) the caret sits in
    pub key: NodeKey,
    /// Char offset inside the run; 0 or 1 for a reference
    pub offset: usize,
}

impl Point {
    pub fn new(key: NodeKey, offset: usize) -> Self {
        Self { key, offset }
    }
}

/// Anchor/focus pair as reported by the host; may be backward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Selection {
    pub anchor: Point,
    pub focus: Point,
}

impl Selection {
    pub fn new(anchor: Point, focus: Point) -> Self {
        Self { anchor, focus }
    }

    pub fn caret(point: Point) -> Self {
        Self::new(point, point)
    }

    /// Selection inside a single run
    pub fn within(key: NodeKey, start: usize, end: usize) -> Self {
        Self::new(Point::new(key, start), Point::new(key, end))
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    /// Forward form of the selection, `None` when either point is detached
    pub fn normalized(&self, doc: &Document) -> Option<Selection> {
        match doc.compare_points(&self.anchor, &self.focus)? {
            Ordering::Greater => Some(Selection::new(self.focus, self.anchor)),
            _ => Some(*self),
        }
    }

    pub fn is_backward(&self, doc: &Document) -> bool {
        matches!(
            doc.compare_points(&self.anchor, &self.focus),
            Some(Ordering::Greater)
        )
    }

    /// First point in document order (assumes a normalized selection)
    pub fn start(&self) -> Point {
        self.anchor
    }

    /// Last point in document order (assumes a normalized selection)
    pub fn end(&self) -> Point {
        self.focus
    }
}

impl Block {
    /// Linear caret position of `point` inside this block.
    ///
    /// Text contributes one position per char, a reference contributes one.
    pub fn offset_of(&self, point: &Point) -> Option<usize> {
        let mut acc = 0;
        let mut found = None;
        for_each_leaf(&self.children, &mut |inline| {
            if found.is_some() {
                return;
            }
            match inline {
                Inline::Text(run) if run.key == point.key => {
                    if point.offset <= run.char_len() {
                        found = Some(acc + point.offset);
                    }
                    acc += run.char_len();
                }
                Inline::Reference(reference) if reference.key == point.key => {
                    if point.offset <= 1 {
                        found = Some(acc + point.offset);
                    }
                    acc += 1;
                }
                other => acc += other.position_len(),
            }
        });
        found
    }

    /// Point for a linear caret position.
    ///
    /// Text points win; a reference-side point is returned only when no text
    /// run touches `position`.
    pub fn point_at(&self, position: usize) -> Option<Point> {
        self.text_point(position)
            .or_else(|| self.reference_point(position))
    }

    /// Text point for a linear caret position.
    ///
    /// At a run boundary the start of the following run wins; the end of the
    /// preceding run is used when no run starts there.
    pub fn text_point(&self, position: usize) -> Option<Point> {
        let mut acc = 0;
        let mut ending = None;
        let mut found = None;
        for_each_leaf(&self.children, &mut |inline| {
            if found.is_some() {
                return;
            }
            match inline {
                Inline::Text(run) => {
                    let len = run.char_len();
                    if position >= acc && position < acc + len {
                        found = Some(Point::new(run.key, position - acc));
                    } else if position == acc + len {
                        ending = Some(Point::new(run.key, len));
                    }
                    acc += len;
                }
                other => acc += other.position_len(),
            }
        });
        found.or(ending)
    }

    fn reference_point(&self, position: usize) -> Option<Point> {
        let mut acc = 0;
        let mut found = None;
        for_each_leaf(&self.children, &mut |inline| {
            if found.is_some() {
                return;
            }
            match inline {
                Inline::Reference(reference) if position == acc => {
                    found = Some(Point::new(reference.key, 0));
                }
                Inline::Reference(reference) if position == acc + 1 => {
                    found = Some(Point::new(reference.key, 1));
                }
                other => acc += other.position_len(),
            }
        });
        found
    }
}

/// Visit text and reference leaves in order, descending into annotations
pub(crate) fn for_each_leaf<'a>(children: &'a [Inline], f: &mut impl FnMut(&'a Inline)) {
    for inline in children {
        match inline {
            Inline::Annotation(annotation) => for_each_leaf(&annotation.children, f),
            leaf => f(leaf),
        }
    }
}
