use crate::lockfile::errors::LockFileError;
use crate::lockfile::scanner::{self, BlockSpan};
use crate::lockfile::validator::validate_document;
use hcl_edit::structure::{Block, Body, Structure};
use std::path::{Path, PathBuf};

/// A parsed lock file.
///
/// Holds the exact source text, the HCL body parsed from it, and the byte
/// spans of its top-level blocks. The two views are aligned block-for-block.
#[derive(Debug, Clone)]
pub struct LockDocument {
    path: PathBuf,
    content: String,
    body: Body,
    blocks: Vec<BlockSpan>,
}

impl LockDocument {
    pub fn parse(path: impl Into<PathBuf>, content: impl Into<String>) -> Result<Self, LockFileError> {
        let path = path.into();
        let content = content.into();

        let body = validate_document(&path, &content)?;
        let blocks = scanner::scan(&path, &content)?;

        let parsed = body.iter().filter(|s| s.as_block().is_some()).count();
        if parsed != blocks.len() {
            return Err(LockFileError::InvalidSyntax {
                file: path,
                message: format!(
                    "parser found {parsed} top-level blocks but scanner found {}",
                    blocks.len()
                ),
            });
        }

        Ok(Self {
            path,
            content,
            body,
            blocks,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn into_content(self) -> String {
        self.content
    }

    pub fn block_spans(&self) -> &[BlockSpan] {
        &self.blocks
    }

    /// The parsed block at the same index as `block_spans()[index]`.
    pub fn parsed_block(&self, index: usize) -> Option<&Block> {
        self.body.iter().filter_map(Structure::as_block).nth(index)
    }

    /// Labels of every `provider` block, in document order.
    pub fn provider_labels(&self) -> impl Iterator<Item = &str> {
        self.blocks
            .iter()
            .filter(|block| block.ident == "provider")
            .filter_map(|block| block.labels.first().map(String::as_str))
    }
}
