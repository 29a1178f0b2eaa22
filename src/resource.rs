//! The `terraform/lock` resource: Condition and Target over tracked lock
//! files.
//!
//! Every invocation builds its own [`DocumentStore`] from the [`Spec`], so a
//! resource holds no file state between calls.

use crate::address::{AddressError, ProviderAddress};
use crate::config::{matches_constraints, parse_version, Spec, ValidationError, VersionError};
use crate::lockfile::{apply, extract, locate, LockDocument, LockFileError, ProviderBlockState};
use crate::reconcile::{decide, ReconciliationResult};
use crate::registry::{
    HashOracle, HttpTransport, Platform, RegistryError, RegistryIndex, TransportError,
};
use crate::store::{is_url, ContentRetriever, DocumentStore, FileRetriever, StoreError};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum LockError {
    #[error("wrong spec content: {0}")]
    Config(#[from] ValidationError),

    #[error(transparent)]
    Address(#[from] AddressError),

    #[error("invalid platform: {0}")]
    Platform(#[source] RegistryError),

    #[error("terraform/lock condition only supports one file")]
    TooManyFiles { count: usize },

    #[error("URL scheme is not supported for HCL target: {path:?}")]
    UnsupportedUrlScheme { path: String },

    #[error("no version to reconcile: neither \"value\" nor a source value is set")]
    MissingVersion,

    #[error(transparent)]
    InvalidVersion(#[from] VersionError),

    #[error("failed to query provider locks for provider: {provider:?}, version: {version:?}, platforms: {platforms:?}: {source}")]
    Oracle {
        provider: String,
        version: String,
        platforms: Vec<String>,
        #[source]
        source: RegistryError,
    },

    #[error("file {path:?} has not been read")]
    NotRead { path: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    LockFile(#[from] LockFileError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Result of a Condition check.
#[derive(Debug, Clone, Serialize)]
pub struct ConditionOutcome {
    pub pass: bool,
    pub message: String,
    pub file: String,
    pub current_version: String,
    #[serde(skip)]
    pub decision: ReconciliationResult,
}

/// What Target did, or would do, to one file.
#[derive(Debug, Clone, Serialize)]
pub struct FileChange {
    /// Path as configured
    pub path: String,
    pub resolved_path: String,
    pub changed: bool,
    pub old_version: String,
    pub new_version: String,
    #[serde(skip)]
    pub before: String,
    #[serde(skip)]
    pub after: String,
}

/// Result of a Target run across every tracked file.
#[derive(Debug, Clone, Serialize)]
pub struct TargetReport {
    pub changed: bool,
    pub dry_run: bool,
    pub description: String,
    pub files: Vec<FileChange>,
}

impl TargetReport {
    /// Paths that were, or in dry-run would be, rewritten.
    pub fn changed_files(&self) -> impl Iterator<Item = &str> {
        self.files
            .iter()
            .filter(|change| change.changed)
            .map(|change| change.path.as_str())
    }
}

/// A lock resource wired to the live registry and the local filesystem.
pub type RegistryLock = TerraformLock<RegistryIndex<HttpTransport>, FileRetriever>;

pub struct TerraformLock<O, R = FileRetriever> {
    spec: Spec,
    address: ProviderAddress,
    platforms: Vec<Platform>,
    paths: Vec<String>,
    oracle: O,
    retriever: R,
}

impl RegistryLock {
    pub fn from_spec(spec: Spec) -> Result<Self, LockError> {
        let transport = HttpTransport::new()?;
        let retriever = FileRetriever::with_transport(transport.clone());
        Self::new(spec, RegistryIndex::new(transport), retriever)
    }
}

impl<O: HashOracle, R: ContentRetriever> TerraformLock<O, R> {
    /// Validate the lock definition and resolve the provider address. No I/O.
    pub fn new(spec: Spec, oracle: O, retriever: R) -> Result<Self, LockError> {
        spec.validate()?;
        let address = ProviderAddress::parse(&spec.provider)?;
        let platforms = Platform::parse_all(&spec.platforms).map_err(LockError::Platform)?;
        let paths = spec.paths();

        debug!(provider = %address, files = paths.len(), "created terraform/lock resource");

        Ok(Self {
            spec,
            address,
            platforms,
            paths,
            oracle,
            retriever,
        })
    }

    pub fn spec(&self) -> &Spec {
        &self.spec
    }

    pub fn address(&self) -> &ProviderAddress {
        &self.address
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn report_config(&self) -> Spec {
        self.spec.report_config()
    }

    /// Current state of one tracked file, without reconciling.
    pub fn query(&self, path: &str, workdir: &str) -> Result<ProviderBlockState, LockError> {
        let path = path.strip_prefix("file://").unwrap_or(path);
        if !self.paths.iter().any(|tracked| tracked == path) {
            return Err(StoreError::Untracked {
                path: path.to_string(),
            }
            .into());
        }

        let mut store = DocumentStore::new();
        store.add_path(path);
        store.resolve_against_working_directory(workdir);
        store.read(&self.retriever)?;

        let (document, _) = self.load(&store, path)?;
        let handle = locate(&document, &self.address)?;
        Ok(extract(&document, &handle)?)
    }

    /// Check whether the single tracked file already holds the desired state.
    ///
    /// Never writes. A version or hash mismatch is a failed outcome, not an
    /// error.
    pub fn condition(&self, source: &str, workdir: &str) -> Result<ConditionOutcome, LockError> {
        if self.paths.len() > 1 {
            return Err(LockError::TooManyFiles {
                count: self.paths.len(),
            });
        }
        let desired_version = self.desired_version(source)?;

        let mut store = self.store(workdir);
        store.read(&self.retriever)?;

        let path = self.paths.first().cloned().unwrap_or_default();
        let (document, _) = self.load(&store, &path)?;
        let handle = locate(&document, &self.address)?;
        let state = extract(&document, &handle)?;

        let desired_hashes = self.desired_hashes(&desired_version)?;
        let decision = decide(&state, &desired_version, &desired_hashes);

        let provider = self.address.for_display();
        let message = if decision.is_consistent() {
            format!("terraform/lock: provider {provider:?} in file {path:?} is correctly set to {desired_version:?}")
        } else if !decision.matches_version {
            format!(
                "terraform/lock: provider {provider:?} version in file {path:?} is incorrectly set to {:?} and should be {desired_version:?}",
                state.version
            )
        } else {
            format!(
                "terraform/lock: provider {provider:?} hashes in file {path:?} are incorrectly set to {} entries and should be the {} registry hashes for {:?}",
                state.hashes.len(),
                desired_hashes.len(),
                self.spec.platforms
            )
        };

        info!(pass = decision.is_consistent(), "{message}");

        Ok(ConditionOutcome {
            pass: decision.is_consistent(),
            message,
            file: path,
            current_version: state.version,
            decision,
        })
    }

    /// Bring every tracked file to the desired state.
    ///
    /// Files are processed in configuration order; the first failure aborts
    /// the run. With `dry_run` nothing is written.
    pub fn target(&self, source: &str, workdir: &str, dry_run: bool) -> Result<TargetReport, LockError> {
        if let Some(path) = self.paths.iter().find(|path| is_url(path)) {
            return Err(LockError::UnsupportedUrlScheme { path: path.clone() });
        }
        let desired_version = self.desired_version(source)?;

        let mut store = self.store(workdir);
        store.read(&self.retriever)?;

        let mut desired_hashes: Option<Vec<String>> = None;
        let mut changes = Vec::with_capacity(self.paths.len());

        for path in &self.paths {
            let (mut document, resolved_path) = self.load(&store, path)?;
            let handle = locate(&document, &self.address)?;
            let state = extract(&document, &handle)?;

            let hashes = match &desired_hashes {
                Some(hashes) => hashes.clone(),
                None => {
                    let hashes = self.desired_hashes(&desired_version)?;
                    desired_hashes = Some(hashes.clone());
                    hashes
                }
            };

            let decision = decide(&state, &desired_version, &hashes);
            if decision.is_consistent() {
                debug!(file = %path, version = %state.version, "lock file already up to date");
                changes.push(FileChange {
                    path: path.clone(),
                    resolved_path,
                    changed: false,
                    old_version: state.version.clone(),
                    new_version: desired_version.clone(),
                    before: document.content().to_string(),
                    after: document.content().to_string(),
                });
                continue;
            }

            self.check_kept_constraints(&state, &desired_version);

            let before = document.content().to_string();
            apply(
                &mut document,
                &handle,
                &desired_version,
                &hashes,
                self.spec.skipconstraints,
            )?;
            let after = document.into_content();

            if dry_run {
                info!(file = %path, from = %state.version, to = %desired_version, "dry run: lock file would be updated");
                store.update(path, after.clone())?;
            } else {
                store.write(path, after.clone())?;
                info!(file = %path, from = %state.version, to = %desired_version, "updated lock file");
            }

            changes.push(FileChange {
                path: path.clone(),
                resolved_path,
                changed: true,
                old_version: state.version,
                new_version: desired_version.clone(),
                before,
                after,
            });
        }

        let changed = changes.iter().any(|change| change.changed);
        let description = self.describe(&changes, &desired_version, dry_run);

        Ok(TargetReport {
            changed,
            dry_run,
            description,
            files: changes,
        })
    }

    fn store(&self, workdir: &str) -> DocumentStore {
        let mut store = DocumentStore::new();
        for path in &self.paths {
            store.add_path(path.as_str());
        }
        store.resolve_against_working_directory(workdir);
        store
    }

    fn load(&self, store: &DocumentStore, path: &str) -> Result<(LockDocument, String), LockError> {
        let file = store.get(path).ok_or_else(|| StoreError::Untracked {
            path: path.to_string(),
        })?;
        let content = file.content().ok_or_else(|| LockError::NotRead {
            path: path.to_string(),
        })?;
        let document = LockDocument::parse(file.original_path(), content)?;
        Ok((document, file.resolved_path().to_string()))
    }

    fn desired_version(&self, source: &str) -> Result<String, LockError> {
        let value = self.spec.value.trim();
        let version = if value.is_empty() { source.trim() } else { value };
        if version.is_empty() {
            return Err(LockError::MissingVersion);
        }
        parse_version(version)?;
        Ok(version.to_string())
    }

    fn desired_hashes(&self, version: &str) -> Result<Vec<String>, LockError> {
        self.oracle
            .get_hashes(&self.address, version, &self.platforms)
            .map_err(|source| LockError::Oracle {
                provider: self.spec.provider.clone(),
                version: version.to_string(),
                platforms: self.spec.platforms.clone(),
                source,
            })
    }

    fn check_kept_constraints(&self, state: &ProviderBlockState, desired_version: &str) {
        if !self.spec.skipconstraints {
            return;
        }
        let Some(constraints) = state.constraints.as_deref() else {
            return;
        };

        match matches_constraints(desired_version, constraints) {
            Ok(true) => {}
            Ok(false) => warn!(
                provider = %self.address.for_display(),
                constraints,
                version = desired_version,
                "kept constraints do not admit the new version"
            ),
            Err(err) => warn!(
                provider = %self.address.for_display(),
                constraints,
                %err,
                "cannot evaluate kept constraints"
            ),
        }
    }

    fn describe(&self, changes: &[FileChange], desired_version: &str, dry_run: bool) -> String {
        let provider = self.address.for_display();
        let verb = if dry_run { "would be updated" } else { "updated" };

        let lines: Vec<String> = changes
            .iter()
            .filter(|change| change.changed)
            .map(|change| {
                format!(
                    "terraform/lock: provider {provider:?} {verb} from {:?} to {:?} in file {:?}",
                    change.old_version, change.new_version, change.path
                )
            })
            .collect();

        if lines.is_empty() {
            format!("terraform/lock: provider {provider:?} already set to {desired_version:?} with expected hashes")
        } else {
            lines.join("\n")
        }
    }
}
