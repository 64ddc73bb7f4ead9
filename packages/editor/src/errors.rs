//! Error types for the editor

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Mutation error: {0}")]
    Mutation(#[from] crate::mutations::MutationError),

    #[error("Store error: {0}")]
    Store(#[from] crate::store::StoreError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] crate::catalog::CatalogError),

    #[error("Serialization error: {0}")]
    Document(#[from] novella_document::DocumentError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Document is not store-backed")]
    NotStoreBacked,
}
