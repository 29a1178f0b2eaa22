use crate::address::ProviderAddress;
use crate::config::version::parse_version;
use crate::registry::Platform;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

const FILE_SCHEME: &str = "file://";

/// Desired state for one lock resource.
#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq, Eq)]
pub struct Spec {
    /// Single lock file path; exclusive with `files`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub file: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
    /// Explicit desired version; when empty the upstream source value is used
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,
    /// `namespace/type` or `hostname/namespace/type`
    #[serde(default)]
    pub provider: String,
    /// `os_arch` identifiers to request package hashes for
    #[serde(default)]
    pub platforms: Vec<String>,
    /// Leave an existing `constraints` attribute untouched
    #[serde(default, alias = "skip_constraints")]
    pub skipconstraints: bool,
}

impl Spec {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();
        self.collect_issues(None, &mut issues);
        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }

    fn collect_issues(&self, lock_id: Option<&str>, issues: &mut Vec<ValidationIssue>) {
        let lock_id = lock_id.map(str::to_string);

        if self.file.trim().is_empty() && self.files.is_empty() {
            issues.push(ValidationIssue::MissingField {
                lock_id: lock_id.clone(),
                field: "file",
            });
        }
        if !self.file.trim().is_empty() && !self.files.is_empty() {
            issues.push(ValidationIssue::InvalidCombo {
                lock_id: lock_id.clone(),
                message: "parameter \"file\" and \"files\" are mutually exclusive".to_string(),
            });
        }
        if self.files.iter().any(|f| f.trim().is_empty()) {
            issues.push(ValidationIssue::InvalidCombo {
                lock_id: lock_id.clone(),
                message: "\"files\" contains an empty path".to_string(),
            });
        }

        if self.provider.trim().is_empty() {
            issues.push(ValidationIssue::MissingField {
                lock_id: lock_id.clone(),
                field: "provider",
            });
        } else if let Err(err) = ProviderAddress::parse(&self.provider) {
            issues.push(ValidationIssue::InvalidValue {
                lock_id: lock_id.clone(),
                message: err.to_string(),
            });
        }

        if self.platforms.is_empty() {
            issues.push(ValidationIssue::MissingField {
                lock_id: lock_id.clone(),
                field: "platforms",
            });
        }
        for platform in &self.platforms {
            if let Err(err) = Platform::parse(platform) {
                issues.push(ValidationIssue::InvalidValue {
                    lock_id: lock_id.clone(),
                    message: err.to_string(),
                });
            }
        }

        if !self.value.trim().is_empty() {
            if let Err(err) = parse_version(&self.value) {
                issues.push(ValidationIssue::InvalidValue {
                    lock_id,
                    message: err.to_string(),
                });
            }
        }
    }

    /// Lock file paths, `file` first, with any `file://` prefix removed.
    /// Repeated paths are kept once, at their first position.
    pub fn paths(&self) -> Vec<String> {
        let file = (!self.file.trim().is_empty()).then_some(&self.file);
        file.into_iter()
            .chain(self.files.iter())
            .map(|path| path.strip_prefix(FILE_SCHEME).unwrap_or(path).to_string())
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect()
    }

    /// The identifying fields only, for reports.
    pub fn report_config(&self) -> Spec {
        Spec {
            file: self.file.clone(),
            files: self.files.clone(),
            value: self.value.clone(),
            provider: self.provider.clone(),
            platforms: self.platforms.clone(),
            skipconstraints: self.skipconstraints,
        }
    }
}

/// A manifest grouping several lock resources.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Manifest {
    /// Working directory relative paths are rooted at
    #[serde(default)]
    pub workdir: Option<String>,
    #[serde(default)]
    pub locks: Vec<LockDefinition>,
}

impl Manifest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.locks.is_empty() {
            issues.push(ValidationIssue::EmptyLockList);
        }

        let mut seen = HashSet::new();
        for lock in &self.locks {
            if lock.id.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    lock_id: None,
                    field: "id",
                });
            } else if !seen.insert(lock.id.as_str()) {
                issues.push(ValidationIssue::InvalidCombo {
                    lock_id: Some(lock.id.clone()),
                    message: "duplicate id".to_string(),
                });
            }
            lock.spec.collect_issues(Some(&lock.id), &mut issues);
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LockDefinition {
    pub id: String,
    #[serde(flatten)]
    pub spec: Spec,
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    EmptyLockList,
    MissingField {
        lock_id: Option<String>,
        field: &'static str,
    },
    InvalidCombo {
        lock_id: Option<String>,
        message: String,
    },
    InvalidValue {
        lock_id: Option<String>,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = |lock_id: &Option<String>| match lock_id {
            Some(id) => format!("lock '{id}': "),
            None => String::new(),
        };
        match self {
            ValidationIssue::EmptyLockList => write!(f, "manifest contains no locks"),
            ValidationIssue::MissingField { lock_id, field } => {
                write!(f, "{}terraform/lock {field} undefined", prefix(lock_id))
            }
            ValidationIssue::InvalidCombo { lock_id, message } => {
                write!(f, "{}{message}", prefix(lock_id))
            }
            ValidationIssue::InvalidValue { lock_id, message } => {
                write!(f, "{}{message}", prefix(lock_id))
            }
        }
    }
}
