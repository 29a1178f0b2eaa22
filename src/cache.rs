//! Thread-local cache of computed `h1:` package hashes.
//!
//! Computing an `h1:` hash means downloading and unpacking a whole provider
//! archive, so results are memoised per archive SHA-256. Archives are
//! immutable once published, which makes the checksum a safe key.
//! Cache is capped at 256 entries; the whole cache is dropped when full.

use std::cell::RefCell;
use std::collections::HashMap;

const MAX_CACHE_ENTRIES: usize = 256;

thread_local! {
    static PACKAGE_HASHES: RefCell<HashMap<String, String>> =
        RefCell::new(HashMap::new());
}

/// Get the package hash for an archive checksum, or compute and cache it.
///
/// Failures are not cached.
pub fn get_or_compute<E>(
    archive_sha256: &str,
    compute: impl FnOnce() -> Result<String, E>,
) -> Result<String, E> {
    let key = archive_sha256.to_ascii_lowercase();

    if let Some(hit) = PACKAGE_HASHES.with(|cache| cache.borrow().get(&key).cloned()) {
        return Ok(hit);
    }

    let computed = compute()?;

    PACKAGE_HASHES.with(|cache| {
        let mut cache = cache.borrow_mut();
        if cache.len() >= MAX_CACHE_ENTRIES {
            cache.clear();
        }
        cache.insert(key, computed.clone());
    });

    Ok(computed)
}

/// Clear the cache (mainly for testing).
pub fn clear_cache() {
    PACKAGE_HASHES.with(|cache| {
        cache.borrow_mut().clear();
    });
}

pub fn cache_size() -> usize {
    PACKAGE_HASHES.with(|cache| cache.borrow().len())
}
