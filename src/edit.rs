use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

/// The patch primitive: byte-span replacement with verification.
///
/// Every lock file rewrite (version, constraints, hashes) compiles down to a
/// list of these. Intelligence lives in span acquisition, not application.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "Edit does nothing until applied"]
pub struct Edit {
    /// Document the span belongs to, used for error reporting
    pub file: PathBuf,
    /// Starting byte offset (inclusive)
    pub byte_start: usize,
    /// Ending byte offset (exclusive)
    pub byte_end: usize,
    /// New text to insert at [byte_start, byte_end)
    pub new_text: String,
    /// Verification of what we expect to find before applying
    pub expected_before: EditVerification,
}

/// Verification strategy for edit safety.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditVerification {
    /// Exact text match required
    ExactMatch(String),
    /// xxh3 hash of expected text (used for long hash lists)
    Hash(u64),
}

impl EditVerification {
    /// Check if the provided text matches the verification criteria.
    pub fn matches(&self, text: &str) -> bool {
        match self {
            EditVerification::ExactMatch(expected) => text == expected,
            EditVerification::Hash(expected_hash) => xxh3_64(text.as_bytes()) == *expected_hash,
        }
    }

    /// Create verification from text, using hash for text over 1KB.
    pub fn from_text(text: &str) -> Self {
        if text.len() > 1024 {
            EditVerification::Hash(xxh3_64(text.as_bytes()))
        } else {
            EditVerification::ExactMatch(text.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum EditError {
    #[error("before-text verification failed at {file}:{byte_start}")]
    BeforeTextMismatch {
        file: PathBuf,
        byte_start: usize,
        byte_end: usize,
        found: String,
    },

    #[error("invalid byte range: [{byte_start}, {byte_end}) in document of length {len}")]
    InvalidByteRange {
        byte_start: usize,
        byte_end: usize,
        len: usize,
    },

    #[error("overlapping edits at {file}:{byte_start}")]
    Overlap { file: PathBuf, byte_start: usize },

    #[error("edit splits a UTF-8 character at {file}:{byte}")]
    CharBoundary { file: PathBuf, byte: usize },

    #[error("file I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result of applying an edit.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "EditResult should be checked for applied/already-applied"]
pub enum EditResult {
    /// Span was replaced
    Applied { byte_start: usize, bytes_changed: usize },
    /// Span already held the new text
    AlreadyApplied { byte_start: usize },
}

impl EditResult {
    pub fn is_applied(&self) -> bool {
        matches!(self, EditResult::Applied { .. })
    }
}

impl Edit {
    /// Create a new edit with automatic verification generation.
    pub fn new(
        file: impl Into<PathBuf>,
        byte_start: usize,
        byte_end: usize,
        new_text: impl Into<String>,
        expected_before: impl AsRef<str>,
    ) -> Self {
        Self {
            file: file.into(),
            byte_start,
            byte_end,
            new_text: new_text.into(),
            expected_before: EditVerification::from_text(expected_before.as_ref()),
        }
    }

    /// An insertion at `at`; the expected before-text is empty.
    pub fn insert(file: impl Into<PathBuf>, at: usize, new_text: impl Into<String>) -> Self {
        Self::new(file, at, at, new_text, "")
    }

    /// Validate the edit against a buffer, returning the text currently in the span.
    fn validate<'a>(&self, content: &'a str) -> Result<&'a str, EditError> {
        if self.byte_start > self.byte_end || self.byte_end > content.len() {
            return Err(EditError::InvalidByteRange {
                byte_start: self.byte_start,
                byte_end: self.byte_end,
                len: content.len(),
            });
        }

        for byte in [self.byte_start, self.byte_end] {
            if !content.is_char_boundary(byte) {
                return Err(EditError::CharBoundary {
                    file: self.file.clone(),
                    byte,
                });
            }
        }

        let current = &content[self.byte_start..self.byte_end];

        // Idempotency: already holding the new text is always valid
        if current == self.new_text {
            return Ok(current);
        }

        if !self.expected_before.matches(current) {
            return Err(EditError::BeforeTextMismatch {
                file: self.file.clone(),
                byte_start: self.byte_start,
                byte_end: self.byte_end,
                found: current.to_string(),
            });
        }

        Ok(current)
    }

    /// Apply this edit to an in-memory buffer.
    pub fn apply_to(&self, content: &mut String) -> Result<EditResult, EditError> {
        let current = self.validate(content)?;
        if current == self.new_text {
            return Ok(EditResult::AlreadyApplied {
                byte_start: self.byte_start,
            });
        }

        content.replace_range(self.byte_start..self.byte_end, &self.new_text);
        Ok(EditResult::Applied {
            byte_start: self.byte_start,
            bytes_changed: self.new_text.len(),
        })
    }

    /// Apply several edits against the same buffer.
    ///
    /// All edits are validated against the original text first; they are then
    /// applied bottom-to-top so earlier offsets stay valid.
    pub fn apply_all(content: &str, mut edits: Vec<Edit>) -> Result<(String, Vec<EditResult>), EditError> {
        edits.sort_by(|a, b| b.byte_start.cmp(&a.byte_start).then(b.byte_end.cmp(&a.byte_end)));

        for edit in &edits {
            edit.validate(content)?;
        }

        // Sorted descending: the earlier edit must end before the later one starts
        for window in edits.windows(2) {
            let (later, earlier) = (&window[0], &window[1]);
            if earlier.byte_end > later.byte_start {
                return Err(EditError::Overlap {
                    file: later.file.clone(),
                    byte_start: later.byte_start,
                });
            }
        }

        let mut updated = content.to_string();
        let mut results = Vec::with_capacity(edits.len());
        for edit in &edits {
            results.push(edit.apply_to(&mut updated)?);
        }
        results.reverse();

        Ok((updated, results))
    }
}

/// Atomic file write: tempfile + fsync + rename.
///
/// The original file's permissions carry over to the replacement.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<(), EditError> {
    let io_err = |source| EditError::Io {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = tempfile::NamedTempFile::new_in(parent).map_err(io_err)?;
    temp.write_all(content).map_err(io_err)?;
    temp.as_file().sync_all().map_err(io_err)?;

    if let Ok(metadata) = fs::metadata(path) {
        fs::set_permissions(temp.path(), metadata.permissions()).map_err(io_err)?;
    }

    temp.persist(path).map_err(|e| io_err(e.error))?;

    Ok(())
}
