use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LockFileError {
    #[error("invalid HCL syntax in {file}: {message}")]
    InvalidSyntax { file: PathBuf, message: String },

    #[error("cannot scan {file} at byte {byte}: {message}")]
    Scan {
        file: PathBuf,
        byte: usize,
        message: String,
    },

    #[error("cannot find value for {address:?} from file {file:?}")]
    ProviderBlockNotFound { address: String, file: String },

    #[error("ambiguous match for {address:?} in file {file:?}: {count} provider blocks")]
    AmbiguousMatch {
        address: String,
        file: String,
        count: usize,
    },

    #[error("provider block {address:?} has no {attribute:?} attribute")]
    MissingAttribute {
        address: String,
        attribute: &'static str,
    },

    #[error("unsupported {attribute:?} attribute in provider block {address:?}: expected {expected}, found {found}")]
    UnsupportedExpression {
        address: String,
        attribute: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    #[error("edit error: {0}")]
    Edit(#[from] crate::edit::EditError),
}
