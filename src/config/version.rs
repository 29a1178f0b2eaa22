//! Terraform version constraints.
//!
//! Supports the operators Terraform accepts in `required_providers`:
//! `=`, `!=`, `>`, `>=`, `<`, `<=` and the pessimistic `~>`, combined
//! with commas, e.g. `">= 2.21, < 3.0"` or `"~> 2.21"`.

use semver::Version;
use std::fmt;

/// Errors during constraint evaluation
#[derive(Debug, Clone)]
pub enum VersionError {
    /// Invalid version string (e.g., "not-a-version")
    InvalidVersion { value: String, source: String },
    /// Invalid constraint (e.g., ">=bad")
    InvalidConstraint { value: String, source: String },
}

impl fmt::Display for VersionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionError::InvalidVersion { value, source } => {
                write!(f, "invalid version '{}': {}", value, source)
            }
            VersionError::InvalidConstraint { value, source } => {
                write!(f, "invalid version constraint '{}': {}", value, source)
            }
        }
    }
}

impl std::error::Error for VersionError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Eq,
    NotEq,
    Gt,
    Gte,
    Lt,
    Lte,
    Pessimistic,
}

#[derive(Debug, Clone)]
struct Constraint {
    op: Operator,
    version: Version,
    /// Number of segments written, for `~>`
    segments: usize,
}

/// Parse an exact provider version.
pub fn parse_version(value: &str) -> Result<Version, VersionError> {
    Version::parse(value.trim()).map_err(|e| VersionError::InvalidVersion {
        value: value.to_string(),
        source: e.to_string(),
    })
}

/// Check if a version satisfies a Terraform constraint string.
///
/// # Examples
///
/// ```
/// use lock_patcher::config::version::matches_constraints;
///
/// assert!(matches_constraints("2.23.0", "~> 2.21").unwrap());
/// assert!(!matches_constraints("3.0.0", "~> 2.21").unwrap());
/// assert!(matches_constraints("2.23.0", ">= 2.0, != 2.22.0").unwrap());
///
/// // Empty constraint admits everything
/// assert!(matches_constraints("1.0.0", "").unwrap());
/// ```
pub fn matches_constraints(version: &str, constraints: &str) -> Result<bool, VersionError> {
    let version = parse_version(version)?;

    let mut admitted = true;
    for part in constraints.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let constraint = parse_constraint(part)?;
        admitted &= constraint.admits(&version);
    }

    Ok(admitted)
}

fn parse_constraint(raw: &str) -> Result<Constraint, VersionError> {
    let (op, rest) = [
        ("~>", Operator::Pessimistic),
        (">=", Operator::Gte),
        ("<=", Operator::Lte),
        ("!=", Operator::NotEq),
        (">", Operator::Gt),
        ("<", Operator::Lt),
        ("=", Operator::Eq),
    ]
    .iter()
    .find_map(|(prefix, op)| raw.strip_prefix(*prefix).map(|rest| (*op, rest)))
    .unwrap_or((Operator::Eq, raw));

    let rest = rest.trim();
    let invalid = |source: &str| VersionError::InvalidConstraint {
        value: raw.to_string(),
        source: source.to_string(),
    };

    let (core, suffix) = match rest.find(['-', '+']) {
        Some(idx) => rest.split_at(idx),
        None => (rest, ""),
    };
    let segments = core.split('.').count();
    if core.is_empty() || segments > 3 {
        return Err(invalid("expected one to three numeric segments"));
    }
    if core.split('.').any(|s| s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit())) {
        return Err(invalid("version segments must be numeric"));
    }

    let padded = match segments {
        1 => format!("{core}.0.0{suffix}"),
        2 => format!("{core}.0{suffix}"),
        _ => format!("{core}{suffix}"),
    };
    let version = Version::parse(&padded).map_err(|e| invalid(&e.to_string()))?;

    Ok(Constraint {
        op,
        version,
        segments,
    })
}

impl Constraint {
    fn admits(&self, candidate: &Version) -> bool {
        // Pre-releases only match constraints that name them exactly
        if !candidate.pre.is_empty() && self.version.pre.is_empty() {
            return false;
        }

        match self.op {
            Operator::Eq => candidate == &self.version,
            Operator::NotEq => candidate != &self.version,
            Operator::Gt => candidate > &self.version,
            Operator::Gte => candidate >= &self.version,
            Operator::Lt => candidate < &self.version,
            Operator::Lte => candidate <= &self.version,
            Operator::Pessimistic => {
                if candidate < &self.version {
                    return false;
                }
                match self.segments {
                    1 | 2 => candidate.major == self.version.major,
                    _ => candidate.major == self.version.major && candidate.minor == self.version.minor,
                }
            }
        }
    }
}
