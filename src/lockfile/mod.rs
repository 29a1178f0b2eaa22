//! Lock file structure: parsing, locating provider blocks, reading their
//! state and patching them in place.

pub mod document;
pub mod errors;
pub mod locator;
pub mod patcher;
pub mod scanner;
pub mod state;
pub mod validator;

pub use document::LockDocument;
pub use errors::LockFileError;
pub use locator::{locate, BlockHandle};
pub use patcher::{apply, plan, render_hashes};
pub use state::{extract, ProviderBlockState};
pub use validator::validate_document;
