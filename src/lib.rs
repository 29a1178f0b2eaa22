//! Lock Patcher: keep Terraform dependency lock files pinned to a provider
//! version.
//!
//! Reads `.terraform.lock.hcl` files, finds the `provider` block for one
//! provider, compares its `version` and `hashes` with the desired version and
//! the package hashes published by the registry, and rewrites only the
//! attributes that differ.
//!
//! # Architecture
//!
//! Every rewrite compiles down to the [`Edit`] primitive: a verified
//! byte-span replacement. Block and attribute spans come from a small
//! scanner that is cross-checked against the `hcl-edit` parser, so
//! comments, spacing and the other blocks of a document survive untouched.
//!
//! # Safety
//!
//! - All edits verify expected before-text before applying
//! - Patched documents are re-parsed before they are written
//! - Atomic file writes (tempfile + fsync + rename)
//! - Condition checks never write
//!
//! # Example
//!
//! ```no_run
//! use lock_patcher::{RegistryLock, Spec};
//!
//! let spec = Spec {
//!     file: ".terraform.lock.hcl".to_string(),
//!     provider: "hashicorp/kubernetes".to_string(),
//!     platforms: vec!["linux_amd64".to_string()],
//!     value: "2.23.0".to_string(),
//!     ..Spec::default()
//! };
//!
//! let lock = RegistryLock::from_spec(spec)?;
//! let report = lock.target("", "", false)?;
//! println!("{}", report.description);
//! # Ok::<(), lock_patcher::LockError>(())
//! ```

pub mod address;
pub mod cache;
pub mod config;
pub mod edit;
pub mod lockfile;
pub mod reconcile;
pub mod registry;
pub mod resource;
pub mod store;

// Re-exports
pub use address::{AddressError, ProviderAddress};
pub use config::{load_from_path, load_from_str, ConfigError, Manifest, Spec, ValidationError};
pub use edit::{Edit, EditError, EditResult, EditVerification};
pub use lockfile::{LockDocument, LockFileError, ProviderBlockState};
pub use reconcile::{decide, ReconciliationResult};
pub use registry::{
    HashOracle, HttpTransport, MemoryOracle, Platform, RegistryError, RegistryIndex, Release,
    Transport, TransportError,
};
pub use resource::{
    ConditionOutcome, FileChange, LockError, RegistryLock, TargetReport, TerraformLock,
};
pub use store::{ContentRetriever, DocumentStore, FileRetriever, StoreError};
