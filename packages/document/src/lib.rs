//! Manuscript document model.
//!
//! A chapter is a tree of blocks holding text runs, annotation ranges and
//! entity references. Documents are values: blocks are shared between
//! clones and copied on first write, which keeps history snapshots cheap.

pub mod document;
pub mod error;
pub mod hit;
pub mod leaves;
pub mod node;
pub mod selection;
pub mod serialize;
pub mod visitor;

pub use document::{Document, NodeLocation};
pub use error::{DocumentError, DocumentResult};
pub use hit::{PointerTarget, Resolved, MAX_ANCESTOR_HOPS};
pub use node::{
    AnnotationRange, Block, BlockKind, EntityKind, Inline, NodeKey, Reference, TextFormat, TextRun,
};
pub use selection::{Point, Selection};
pub use serialize::SERIALIZATION_VERSION;
pub use visitor::{Visitor, VisitorMut};
