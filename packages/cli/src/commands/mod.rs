pub mod annotate;
pub mod format;
pub mod replace;
pub mod search;
pub mod stats;

pub use annotate::{annotate, AnnotateArgs};
pub use format::{format, FormatArgs};
pub use replace::{replace, ReplaceArgs};
pub use search::{search, SearchArgs};
pub use stats::{stats, StatsArgs};

use crate::config::Config;
use novella_editor::{EditorSession, FileStore};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CHAPTER_EXTENSION: &str = "json";

#[derive(Error, Debug)]
pub enum ChapterPathError {
    #[error("Not a .json chapter file: {}", .0.display())]
    NotAChapter(PathBuf),

    #[error("Input path does not exist: {}", .0.display())]
    Missing(PathBuf),
}

/// A chapter file opened in an editor session.
///
/// The file's directory acts as the store and its stem as the chapter id,
/// so writing back goes through the same path as the editor's own saves.
pub struct Chapter {
    pub path: PathBuf,
    pub session: EditorSession,
    store: FileStore,
}

impl Chapter {
    pub fn open(path: &Path, config: &Config) -> anyhow::Result<Self> {
        if !path.exists() {
            return Err(ChapterPathError::Missing(path.to_path_buf()).into());
        }
        let (root, id) = split_chapter_path(path)?;
        let store = FileStore::new(root);
        let mut session = EditorSession::new(config.editor.clone());
        session.open_from_store(&store, &id)?;
        Ok(Self {
            path: path.to_path_buf(),
            session,
            store,
        })
    }

    pub fn save(&mut self) -> anyhow::Result<()> {
        self.session.save(&mut self.store)?;
        Ok(())
    }
}

fn split_chapter_path(path: &Path) -> Result<(PathBuf, String), ChapterPathError> {
    let not_a_chapter = || ChapterPathError::NotAChapter(path.to_path_buf());
    if path.extension().and_then(|ext| ext.to_str()) != Some(CHAPTER_EXTENSION) {
        return Err(not_a_chapter());
    }
    let id = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(not_a_chapter)?;
    let root = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    Ok((root, id.to_string()))
}

/// Chapter files under `input`: the file itself, or every `.json` file below
/// a directory in a stable order. The config file is never a chapter.
pub fn chapter_files(input: &Path) -> anyhow::Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if !input.is_dir() {
        return Err(ChapterPathError::Missing(input.to_path_buf()).into());
    }

    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(input).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        let is_chapter = entry.file_type().is_file()
            && path.extension().and_then(|ext| ext.to_str()) == Some(CHAPTER_EXTENSION)
            && entry.file_name() != crate::config::DEFAULT_CONFIG_NAME;
        if is_chapter {
            files.push(path.to_path_buf());
        }
    }
    Ok(files)
}
