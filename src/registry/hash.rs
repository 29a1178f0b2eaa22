//! Provider package hash schemes.
//!
//! `zh:` is the hex SHA-256 of a release archive as published in the
//! release's SHA256SUMS document. `h1:` hashes the archive's *contents*:
//! base64 SHA-256 over `"<sha256hex>  <name>\n"` lines, ordered by name.

use crate::registry::errors::RegistryError;
use base64::prelude::{Engine as _, BASE64_STANDARD};
use sha2::{Digest, Sha256};
use std::io::{Cursor, Read};

pub const ZIP_HASH_PREFIX: &str = "zh:";
pub const PACKAGE_HASH_PREFIX: &str = "h1:";

/// One `SHA256SUMS` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumEntry {
    pub sha256: String,
    pub file_name: String,
}

impl ChecksumEntry {
    pub fn zh_hash(&self) -> String {
        format!("{ZIP_HASH_PREFIX}{}", self.sha256)
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Parse a `SHA256SUMS` document (`sha256sum` output format).
pub fn parse_sha256sums(text: &str) -> Result<Vec<ChecksumEntry>, RegistryError> {
    let mut entries = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let malformed = || RegistryError::MalformedChecksums {
            line: idx + 1,
            content: line.to_string(),
        };

        let mut parts = line.split_whitespace();
        let (Some(sha256), Some(file_name), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(malformed());
        };

        if sha256.len() != 64 || !sha256.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(malformed());
        }

        entries.push(ChecksumEntry {
            sha256: sha256.to_ascii_lowercase(),
            // Binary-mode marker
            file_name: file_name.trim_start_matches('*').to_string(),
        });
    }

    Ok(entries)
}

/// Compute the `h1:` hash of a zip archive.
pub fn package_hash(file_name: &str, archive: &[u8]) -> Result<String, RegistryError> {
    let mut zip = zip::ZipArchive::new(Cursor::new(archive)).map_err(|source| RegistryError::Archive {
        file: file_name.to_string(),
        source,
    })?;

    let mut files = Vec::with_capacity(zip.len());
    for idx in 0..zip.len() {
        let mut entry = zip.by_index(idx).map_err(|source| RegistryError::Archive {
            file: file_name.to_string(),
            source,
        })?;
        let name = entry.name().to_string();

        let mut buf = Vec::with_capacity(usize::try_from(entry.size()).unwrap_or(0));
        entry
            .read_to_end(&mut buf)
            .map_err(|source| RegistryError::ArchiveIo {
                file: file_name.to_string(),
                entry: name.clone(),
                source,
            })?;

        files.push((name, sha256_hex(&buf)));
    }

    files.sort_by(|a, b| a.0.cmp(&b.0));

    let mut summary = Sha256::new();
    for (name, digest) in &files {
        summary.update(format!("{digest}  {name}\n").as_bytes());
    }

    Ok(format!(
        "{PACKAGE_HASH_PREFIX}{}",
        BASE64_STANDARD.encode(summary.finalize())
    ))
}
