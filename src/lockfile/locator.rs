use crate::address::ProviderAddress;
use crate::lockfile::document::LockDocument;
use crate::lockfile::errors::LockFileError;
use tracing::{debug, info};

const SUGGESTION_THRESHOLD: f64 = 0.85;

/// Reference to the single provider block matching an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHandle {
    index: usize,
    address: ProviderAddress,
    label: String,
}

impl BlockHandle {
    /// Index among the document's top-level blocks.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn address(&self) -> &ProviderAddress {
        &self.address
    }

    /// Label exactly as written in the lock file.
    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Find the provider block whose label resolves to `address`.
///
/// Labels are compared after resolution, so `hashicorp/null` and
/// `registry.terraform.io/hashicorp/null` name the same block.
pub fn locate(document: &LockDocument, address: &ProviderAddress) -> Result<BlockHandle, LockFileError> {
    let mut matches = Vec::new();

    for (index, span) in document.block_spans().iter().enumerate() {
        if span.ident != "provider" {
            continue;
        }
        let [label] = span.labels.as_slice() else {
            debug!(labels = ?span.labels, "skipping provider block without a single label");
            continue;
        };

        match ProviderAddress::parse(label) {
            Ok(candidate) if candidate == *address => matches.push(BlockHandle {
                index,
                address: candidate,
                label: label.clone(),
            }),
            Ok(_) => {}
            Err(err) => debug!(%label, %err, "skipping provider block with unresolvable label"),
        }
    }

    match matches.len() {
        0 => {
            if let Some(suggestion) = closest_label(document, address) {
                info!(
                    provider = %address,
                    file = %document.path().display(),
                    "no matching provider block; did you mean {suggestion:?}?"
                );
            }
            Err(LockFileError::ProviderBlockNotFound {
                address: address.to_string(),
                file: document.path().display().to_string(),
            })
        }
        1 => Ok(matches.remove(0)),
        count => Err(LockFileError::AmbiguousMatch {
            address: address.to_string(),
            file: document.path().display().to_string(),
            count,
        }),
    }
}

fn closest_label(document: &LockDocument, address: &ProviderAddress) -> Option<String> {
    let wanted = address.to_string();
    document
        .provider_labels()
        .map(|label| (strsim::jaro_winkler(&label.to_ascii_lowercase(), &wanted), label))
        .filter(|(score, _)| *score >= SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, label)| label.to_string())
}
