//! Byte-span scanner for lock file structure.
//!
//! The HCL parser answers "what does this block say"; the scanner answers
//! "where, exactly, is it written". Patches are planned against these spans.

use crate::lockfile::errors::LockFileError;
use std::path::{Path, PathBuf};

/// A top-level block and the spans of its direct attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSpan {
    pub ident: String,
    /// Decoded label values
    pub labels: Vec<String>,
    /// Offset of the block identifier
    pub start: usize,
    /// Offset of the opening `{`
    pub open_brace: usize,
    /// One past the closing `}`
    pub end: usize,
    pub attributes: Vec<AttributeSpan>,
}

impl BlockSpan {
    pub fn attribute(&self, key: &str) -> Option<&AttributeSpan> {
        self.attributes.iter().find(|attr| attr.key == key)
    }

    /// Leading whitespace of the line holding the block identifier.
    pub fn indent<'a>(&self, content: &'a str) -> &'a str {
        let line_start = line_start(content, self.start);
        let prefix = &content[line_start..self.start];
        let len = prefix.len() - prefix.trim_start_matches([' ', '\t']).len();
        &prefix[..len]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSpan {
    pub key: String,
    pub key_start: usize,
    pub value_start: usize,
    pub value_end: usize,
    /// Whitespace before the key, when the key opens its line
    pub indent: Option<String>,
}

/// Scan every top-level block in `content`.
pub fn scan(file: &Path, content: &str) -> Result<Vec<BlockSpan>, LockFileError> {
    let mut cursor = Cursor::new(file, content);
    let mut blocks = Vec::new();

    loop {
        cursor.skip_trivia()?;
        if cursor.peek().is_none() {
            break;
        }

        let start = cursor.pos;
        let ident = cursor.read_ident()?;
        cursor.skip_inline_trivia()?;

        if cursor.peek() == Some(b'=') {
            cursor.pos += 1;
            cursor.skip_inline_trivia()?;
            cursor.skip_expression()?;
            continue;
        }

        let labels = cursor.read_labels()?;
        let open_brace = cursor.pos;
        cursor.pos += 1;
        let attributes = cursor.scan_body()?;

        blocks.push(BlockSpan {
            ident,
            labels,
            start,
            open_brace,
            end: cursor.pos,
            attributes,
        });
    }

    Ok(blocks)
}

fn line_start(content: &str, offset: usize) -> usize {
    content[..offset].rfind('\n').map_or(0, |idx| idx + 1)
}

struct Cursor<'a> {
    file: &'a Path,
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(file: &'a Path, src: &'a str) -> Self {
        Self {
            file,
            src,
            bytes: src.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_next(&self) -> Option<u8> {
        self.bytes.get(self.pos + 1).copied()
    }

    fn error(&self, message: impl Into<String>) -> LockFileError {
        LockFileError::Scan {
            file: PathBuf::from(self.file),
            byte: self.pos,
            message: message.into(),
        }
    }

    fn bump_char(&mut self) {
        if let Some(ch) = self.src[self.pos..].chars().next() {
            self.pos += ch.len_utf8();
        }
    }

    /// Skip blanks and comments without crossing a newline.
    fn skip_inline_trivia(&mut self) -> Result<(), LockFileError> {
        loop {
            match (self.peek(), self.peek_next()) {
                (Some(b' ' | b'\t' | b'\r'), _) => self.pos += 1,
                (Some(b'#'), _) | (Some(b'/'), Some(b'/')) => self.skip_line_comment(),
                (Some(b'/'), Some(b'*')) => self.skip_block_comment()?,
                _ => return Ok(()),
            }
        }
    }

    fn skip_trivia(&mut self) -> Result<(), LockFileError> {
        loop {
            self.skip_inline_trivia()?;
            if self.peek() == Some(b'\n') {
                self.pos += 1;
            } else {
                return Ok(());
            }
        }
    }

    fn skip_line_comment(&mut self) {
        match self.src[self.pos..].find('\n') {
            Some(idx) => self.pos += idx,
            None => self.pos = self.src.len(),
        }
    }

    fn skip_block_comment(&mut self) -> Result<(), LockFileError> {
        match self.src[self.pos + 2..].find("*/") {
            Some(idx) => {
                self.pos += 2 + idx + 2;
                Ok(())
            }
            None => Err(self.error("unterminated block comment")),
        }
    }

    fn read_ident(&mut self) -> Result<String, LockFileError> {
        let rest = &self.src[self.pos..];
        match rest.chars().next() {
            Some(ch) if ch.is_alphabetic() || ch == '_' => {}
            _ => return Err(self.error("expected identifier")),
        }

        let len = rest
            .char_indices()
            .find(|(_, ch)| !(ch.is_alphanumeric() || *ch == '_' || *ch == '-'))
            .map_or(rest.len(), |(idx, _)| idx);
        self.pos += len;
        Ok(rest[..len].to_string())
    }

    /// Labels up to, not including, the opening brace.
    fn read_labels(&mut self) -> Result<Vec<String>, LockFileError> {
        let mut labels = Vec::new();
        loop {
            self.skip_inline_trivia()?;
            match self.peek() {
                Some(b'{') => return Ok(labels),
                Some(b'"') => labels.push(self.read_quoted()?),
                Some(_) => labels.push(self.read_ident()?),
                None => return Err(self.error("expected block label or '{'")),
            }
        }
    }

    /// Read a quoted string, decoding escapes. Template sequences are kept raw.
    fn read_quoted(&mut self) -> Result<String, LockFileError> {
        self.pos += 1;
        let mut out = String::new();

        loop {
            let rest = &self.src[self.pos..];
            let Some(ch) = rest.chars().next() else {
                return Err(self.error("unterminated string"));
            };

            match ch {
                '"' => {
                    self.pos += 1;
                    return Ok(out);
                }
                '\n' => return Err(self.error("newline in quoted string")),
                '\\' => {
                    self.pos += 1;
                    let Some(escaped) = self.src[self.pos..].chars().next() else {
                        return Err(self.error("unterminated escape sequence"));
                    };
                    self.pos += escaped.len_utf8();
                    match escaped {
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        'r' => out.push('\r'),
                        '"' => out.push('"'),
                        '\\' => out.push('\\'),
                        other => {
                            out.push('\\');
                            out.push(other);
                        }
                    }
                }
                '$' | '%' if rest.len() > 2 && rest[1..].starts_with(ch) && rest[2..].starts_with('{') => {
                    out.push(ch);
                    out.push('{');
                    self.pos += 3;
                }
                '$' | '%' if rest[1..].starts_with('{') => {
                    let start = self.pos;
                    self.pos += 1;
                    self.skip_balanced()?;
                    out.push_str(&self.src[start..self.pos]);
                }
                _ => {
                    out.push(ch);
                    self.pos += ch.len_utf8();
                }
            }
        }
    }

    /// Skip a bracketed group starting at the current opening bracket.
    fn skip_balanced(&mut self) -> Result<(), LockFileError> {
        let mut depth = 0usize;
        loop {
            match (self.peek(), self.peek_next()) {
                (None, _) => return Err(self.error("unbalanced brackets")),
                (Some(b'"'), _) => {
                    self.read_quoted()?;
                }
                (Some(b'#'), _) | (Some(b'/'), Some(b'/')) => self.skip_line_comment(),
                (Some(b'/'), Some(b'*')) => self.skip_block_comment()?,
                (Some(b'<'), Some(b'<')) => {
                    return Err(self.error("heredoc expressions are not supported"))
                }
                (Some(b'{' | b'[' | b'('), _) => {
                    depth += 1;
                    self.pos += 1;
                }
                (Some(b'}' | b']' | b')'), _) => {
                    self.pos += 1;
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return Ok(());
                    }
                }
                _ => self.bump_char(),
            }
        }
    }

    /// Skip an attribute value, returning the offset one past its last token.
    fn skip_expression(&mut self) -> Result<usize, LockFileError> {
        let mut depth = 0usize;
        let mut end = self.pos;

        loop {
            match (self.peek(), self.peek_next()) {
                (None, _) if depth == 0 => break,
                (None, _) => return Err(self.error("unexpected end of document in expression")),
                (Some(b'\n'), _) if depth == 0 => break,
                (Some(b'}'), _) if depth == 0 => break,
                (Some(b'#'), _) | (Some(b'/'), Some(b'/')) => self.skip_line_comment(),
                (Some(b'/'), Some(b'*')) => self.skip_block_comment()?,
                (Some(b'<'), Some(b'<')) => {
                    return Err(self.error("heredoc expressions are not supported"))
                }
                (Some(b'"'), _) => {
                    self.read_quoted()?;
                    end = self.pos;
                }
                (Some(b'{' | b'[' | b'('), _) => {
                    depth += 1;
                    self.pos += 1;
                    end = self.pos;
                }
                (Some(b'}' | b']' | b')'), _) => {
                    if depth == 0 {
                        return Err(self.error("unbalanced closing bracket"));
                    }
                    depth -= 1;
                    self.pos += 1;
                    end = self.pos;
                }
                (Some(b' ' | b'\t' | b'\r' | b'\n'), _) => self.pos += 1,
                _ => {
                    self.bump_char();
                    end = self.pos;
                }
            }
        }

        Ok(end)
    }

    /// Scan a block body after its opening brace, consuming the closing one.
    fn scan_body(&mut self) -> Result<Vec<AttributeSpan>, LockFileError> {
        let mut attributes = Vec::new();

        loop {
            self.skip_trivia()?;
            match self.peek() {
                None => return Err(self.error("unterminated block")),
                Some(b'}') => {
                    self.pos += 1;
                    return Ok(attributes);
                }
                _ => {}
            }

            let key_start = self.pos;
            let key = self.read_ident()?;
            self.skip_inline_trivia()?;

            if self.peek() == Some(b'=') {
                self.pos += 1;
                self.skip_inline_trivia()?;
                let value_start = self.pos;
                let value_end = self.skip_expression()?;

                let prefix = &self.src[line_start(self.src, key_start)..key_start];
                let indent = prefix
                    .chars()
                    .all(|ch| ch == ' ' || ch == '\t')
                    .then(|| prefix.to_string());

                attributes.push(AttributeSpan {
                    key,
                    key_start,
                    value_start,
                    value_end,
                    indent,
                });
            } else {
                // Nested block: skipped whole
                self.read_labels()?;
                self.skip_balanced()?;
            }
        }
    }
}
