use crate::lockfile::errors::LockFileError;
use hcl_edit::structure::Body;
use std::path::Path;

/// Parse `content` as an HCL body, reporting failures against `path`.
pub fn validate_document(path: &Path, content: &str) -> Result<Body, LockFileError> {
    hcl_edit::parser::parse_body(content).map_err(|err| LockFileError::InvalidSyntax {
        file: path.to_path_buf(),
        message: err.to_string(),
    })
}
