//! # Chapter Storage
//!
//! Serialized chapters are opaque strings to the store; parsing happens in
//! [`Document::from_serialized`](novella_document::Document::from_serialized),
//! which never fails, so a damaged chapter still opens as plain text.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Invalid document id: {0:?}")]
    InvalidId(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub trait DocumentStore {
    fn load_document(&self, id: &str) -> Result<String, StoreError>;

    fn save_document(&mut self, id: &str, content: &str) -> Result<(), StoreError>;
}

/// In-process store
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    documents: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl DocumentStore for MemoryStore {
    fn load_document(&self, id: &str) -> Result<String, StoreError> {
        self.documents
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn save_document(&mut self, id: &str, content: &str) -> Result<(), StoreError> {
        self.documents.insert(id.to_string(), content.to_string());
        Ok(())
    }
}

/// One `<id>.json` file per chapter inside a directory
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, id: &str) -> Result<PathBuf, StoreError> {
        let valid = !id.is_empty()
            && id != "."
            && id != ".."
            && !id.contains(['/', '\\'])
            && !id.contains('\0');
        if !valid {
            return Err(StoreError::InvalidId(id.to_string()));
        }
        Ok(self.root.join(format!("{}.json", id)))
    }
}

impl DocumentStore for FileStore {
    fn load_document(&self, id: &str) -> Result<String, StoreError> {
        let path = self.path_for(id)?;
        match fs::read_to_string(&path) {
            Ok(content) => Ok(content),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(id.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn save_document(&mut self, id: &str, content: &str) -> Result<(), StoreError> {
        let path = self.path_for(id)?;
        fs::create_dir_all(&self.root)?;
        fs::write(&path, content)?;
        tracing::debug!(path = %path.display(), "saved chapter");
        Ok(())
    }
}
