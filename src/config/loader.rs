use crate::config::schema::{Manifest, ValidationError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Where a manifest was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestOrigin {
    Inline,
    File(PathBuf),
}

impl fmt::Display for ManifestOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManifestOrigin::Inline => f.write_str("<inline>"),
            ManifestOrigin::File(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read lock manifest {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("lock manifest {origin} is not valid TOML: {source}")]
    Syntax {
        origin: ManifestOrigin,
        #[source]
        source: toml_edit::de::Error,
    },

    #[error("lock manifest {origin} is invalid:\n{source}")]
    Invalid {
        origin: ManifestOrigin,
        #[source]
        source: ValidationError,
    },
}

impl ConfigError {
    pub fn origin(&self) -> ManifestOrigin {
        match self {
            ConfigError::Read { path, .. } => ManifestOrigin::File(path.clone()),
            ConfigError::Syntax { origin, .. } | ConfigError::Invalid { origin, .. } => origin.clone(),
        }
    }
}

fn parse(input: &str, origin: ManifestOrigin) -> Result<Manifest, ConfigError> {
    let manifest: Manifest = match toml_edit::de::from_str(input) {
        Ok(manifest) => manifest,
        Err(source) => return Err(ConfigError::Syntax { origin, source }),
    };
    match manifest.validate() {
        Ok(()) => Ok(manifest),
        Err(source) => Err(ConfigError::Invalid { origin, source }),
    }
}

pub fn load_from_str(input: &str) -> Result<Manifest, ConfigError> {
    parse(input, ManifestOrigin::Inline)
}

/// Load a manifest file. A relative `workdir` is taken relative to the
/// directory holding the manifest.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Manifest, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut manifest = parse(&contents, ManifestOrigin::File(path.to_path_buf()))?;

    if let (Some(workdir), Some(parent)) = (manifest.workdir.as_deref(), path.parent()) {
        if !Path::new(workdir).is_absolute() {
            manifest.workdir = Some(parent.join(workdir).to_string_lossy().into_owned());
        }
    }
    Ok(manifest)
}
