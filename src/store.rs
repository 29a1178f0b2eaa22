//! Tracked lock files: where they are, what they contain, how they are
//! written back.

use crate::edit::{atomic_write, EditError};
use crate::registry::{Transport, TransportError};
use indexmap::IndexMap;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::debug;
use url::Url;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("The specified file {path:?} does not exist")]
    FileMissing { path: String },

    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to fetch {path}: {source}")]
    Remote {
        path: String,
        #[source]
        source: TransportError,
    },

    #[error("{path} is not valid UTF-8")]
    Encoding { path: String },

    #[error("file {path:?} is not tracked")]
    Untracked { path: String },

    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: EditError,
    },
}

/// Whether `path` is an `http://` or `https://` URL.
pub fn is_url(path: &str) -> bool {
    let lower = path.get(..8).unwrap_or(path).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Existence checks and full reads for tracked paths.
pub trait ContentRetriever {
    fn exists(&self, path: &str) -> bool;
    fn read_all(&self, path: &str) -> Result<String, StoreError>;
}

impl<R: ContentRetriever + ?Sized> ContentRetriever for &R {
    fn exists(&self, path: &str) -> bool {
        (**self).exists(path)
    }

    fn read_all(&self, path: &str) -> Result<String, StoreError> {
        (**self).read_all(path)
    }
}

/// Reads local files, and URLs when given a transport.
#[derive(Default)]
pub struct FileRetriever {
    transport: Option<Box<dyn Transport>>,
}

impl FileRetriever {
    pub fn local() -> Self {
        Self::default()
    }

    pub fn with_transport(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Some(Box::new(transport)),
        }
    }
}

impl ContentRetriever for FileRetriever {
    fn exists(&self, path: &str) -> bool {
        if is_url(path) {
            // Remote existence is settled by the read itself
            return self.transport.is_some();
        }
        Path::new(path).is_file()
    }

    fn read_all(&self, path: &str) -> Result<String, StoreError> {
        if !is_url(path) {
            return fs::read_to_string(path).map_err(|source| StoreError::Read {
                path: path.to_string(),
                source,
            });
        }

        let missing = || StoreError::FileMissing {
            path: path.to_string(),
        };
        let transport = self.transport.as_ref().ok_or_else(missing)?;
        let url = Url::parse(path).map_err(|_| missing())?;
        let body = transport.get(&url).map_err(|source| {
            if source.is_not_found() {
                missing()
            } else {
                StoreError::Remote {
                    path: path.to_string(),
                    source,
                }
            }
        })?;
        String::from_utf8(body).map_err(|_| StoreError::Encoding {
            path: path.to_string(),
        })
    }
}

/// A file registered for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedFile {
    original_path: String,
    resolved_path: String,
    content: Option<String>,
}

impl TrackedFile {
    pub fn original_path(&self) -> &str {
        &self.original_path
    }

    pub fn resolved_path(&self) -> &str {
        &self.resolved_path
    }

    /// `None` until the store has been read.
    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }
}

/// Tracked files keyed by original path, in registration order.
#[derive(Debug, Clone, Default)]
pub struct DocumentStore {
    files: IndexMap<String, TrackedFile>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file. No I/O; registering twice is a no-op.
    pub fn add_path(&mut self, original_path: impl Into<String>) {
        let original_path = original_path.into();
        self.files
            .entry(original_path.clone())
            .or_insert_with(|| TrackedFile {
                resolved_path: original_path.clone(),
                original_path,
                content: None,
            });
    }

    /// Root relative local paths at `dir`. Absolute paths and URLs are left
    /// alone, and the result depends only on the original path.
    pub fn resolve_against_working_directory(&mut self, dir: &str) {
        for file in self.files.values_mut() {
            let original = &file.original_path;
            file.resolved_path = if dir.is_empty() || is_url(original) || Path::new(original).is_absolute() {
                original.clone()
            } else {
                Path::new(dir).join(original).to_string_lossy().into_owned()
            };
            debug!(original = %file.original_path, resolved = %file.resolved_path, "resolved path");
        }
    }

    /// Load every tracked file, stopping at the first missing one.
    pub fn read<R: ContentRetriever + ?Sized>(&mut self, retriever: &R) -> Result<(), StoreError> {
        for file in self.files.values_mut() {
            if !retriever.exists(&file.resolved_path) {
                return Err(StoreError::FileMissing {
                    path: file.resolved_path.clone(),
                });
            }
            let content = retriever.read_all(&file.resolved_path)?;
            debug!(path = %file.resolved_path, bytes = content.len(), "read lock file");
            file.content = Some(content);
        }
        Ok(())
    }

    /// Replace the in-memory content of a tracked file.
    pub fn update(&mut self, original_path: &str, content: String) -> Result<(), StoreError> {
        let file = self.get_mut(original_path)?;
        file.content = Some(content);
        Ok(())
    }

    /// Persist `content` to the file's resolved path.
    pub fn write(&mut self, original_path: &str, content: String) -> Result<(), StoreError> {
        let file = self.get_mut(original_path)?;
        atomic_write(Path::new(&file.resolved_path), content.as_bytes()).map_err(|source| {
            StoreError::Write {
                path: file.resolved_path.clone(),
                source,
            }
        })?;
        debug!(path = %file.resolved_path, bytes = content.len(), "wrote lock file");
        file.content = Some(content);
        Ok(())
    }

    pub fn get(&self, original_path: &str) -> Option<&TrackedFile> {
        self.files.get(original_path)
    }

    pub fn files(&self) -> impl Iterator<Item = &TrackedFile> {
        self.files.values()
    }

    fn get_mut(&mut self, original_path: &str) -> Result<&mut TrackedFile, StoreError> {
        self.files
            .get_mut(original_path)
            .ok_or_else(|| StoreError::Untracked {
                path: original_path.to_string(),
            })
    }
}
