use crate::lockfile::ProviderBlockState;

/// Outcome of comparing a block against the desired state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationResult {
    pub matches_version: bool,
    pub matches_hashes: bool,
    pub desired_version: String,
    pub desired_hashes: Vec<String>,
}

impl ReconciliationResult {
    pub fn is_consistent(&self) -> bool {
        self.matches_version && self.matches_hashes
    }

    pub fn needs_patch(&self) -> bool {
        !self.is_consistent()
    }
}

/// Compare current against desired.
///
/// Versions compare as exact strings. Hash lists compare as ordered
/// sequences: the same hashes in another order are a mismatch.
pub fn decide(
    current: &ProviderBlockState,
    desired_version: &str,
    desired_hashes: &[String],
) -> ReconciliationResult {
    ReconciliationResult {
        matches_version: current.version == desired_version,
        matches_hashes: current.hashes == desired_hashes,
        desired_version: desired_version.to_string(),
        desired_hashes: desired_hashes.to_vec(),
    }
}
