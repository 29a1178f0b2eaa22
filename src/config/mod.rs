pub mod loader;
pub mod schema;
pub mod version;

pub use loader::{load_from_path, load_from_str, ConfigError, ManifestOrigin};
pub use schema::{LockDefinition, Manifest, Spec, ValidationError, ValidationIssue};
pub use version::{matches_constraints, parse_version, VersionError};
