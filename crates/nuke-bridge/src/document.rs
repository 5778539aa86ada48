//! Source of the code sent by "run active document".

use crate::error::{BridgeError, Result};
use std::path::{Path, PathBuf};

/// What the editor currently shows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DocumentSnapshot {
    /// File backing the document; `None` for unsaved buffers.
    pub path: Option<PathBuf>,
    pub text: String,
    /// Selected text, if any.
    pub selection: Option<String>,
}

impl DocumentSnapshot {
    /// The code to execute: the selection when non-empty, else everything.
    pub fn code(&self) -> &str {
        match self.selection.as_deref() {
            Some(selection) if !selection.trim().is_empty() => selection,
            _ => &self.text,
        }
    }

    /// Path sent as the request's `file` field.
    pub fn file_field(&self) -> String {
        self.path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default()
    }
}

/// Provider of the active document.
pub trait ActiveDocument: Send + Sync {
    /// `None` when no document is open.
    fn snapshot(&self) -> Option<DocumentSnapshot>;
}

/// A document read from disk when the snapshot is taken.
#[derive(Debug, Clone)]
pub struct FileDocument {
    path: PathBuf,
}

impl FileDocument {
    /// Fails if `path` cannot be read now, so a bad path is reported up front.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        std::fs::metadata(&path).map_err(|e| BridgeError::io_with_path(e, &path))?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ActiveDocument for FileDocument {
    fn snapshot(&self) -> Option<DocumentSnapshot> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => Some(DocumentSnapshot {
                path: Some(self.path.clone()),
                text,
                selection: None,
            }),
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", self.path.display(), e);
                None
            }
        }
    }
}
