//! The remote hash authority.
//!
//! [`HashOracle`] is the seam the lifecycle talks to. [`RegistryIndex`]
//! answers from a live provider registry, [`MemoryOracle`] from registered
//! fixtures.

pub mod errors;
pub mod hash;
pub mod index;
pub mod memory;
pub mod transport;

pub use errors::{RegistryError, TransportError};
pub use index::RegistryIndex;
pub use memory::{MemoryOracle, Release};
pub use transport::{HttpTransport, Transport};

use crate::address::ProviderAddress;
use std::fmt;
use std::str::FromStr;

/// Target platform, written `os_arch`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Platform {
    os: String,
    arch: String,
}

impl Platform {
    pub fn parse(raw: &str) -> Result<Self, RegistryError> {
        match raw.trim().split_once('_') {
            Some((os, arch))
                if !os.is_empty()
                    && !arch.is_empty()
                    && !arch.contains('_')
                    && raw.trim().chars().all(|c| c.is_ascii_alphanumeric() || c == '_') =>
            {
                Ok(Self {
                    os: os.to_ascii_lowercase(),
                    arch: arch.to_ascii_lowercase(),
                })
            }
            _ => Err(RegistryError::InvalidPlatform(raw.to_string())),
        }
    }

    pub fn parse_all<S: AsRef<str>>(raw: &[S]) -> Result<Vec<Self>, RegistryError> {
        raw.iter().map(|p| Self::parse(p.as_ref())).collect()
    }

    pub fn os(&self) -> &str {
        &self.os
    }

    pub fn arch(&self) -> &str {
        &self.arch
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.os, self.arch)
    }
}

impl FromStr for Platform {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Source of the canonical hash set for a provider release.
///
/// The returned list is in the oracle's canonical order. Callers compare
/// and write it as-is.
pub trait HashOracle {
    fn get_hashes(
        &self,
        address: &ProviderAddress,
        version: &str,
        platforms: &[Platform],
    ) -> Result<Vec<String>, RegistryError>;
}

impl<O: HashOracle + ?Sized> HashOracle for &O {
    fn get_hashes(
        &self,
        address: &ProviderAddress,
        version: &str,
        platforms: &[Platform],
    ) -> Result<Vec<String>, RegistryError> {
        (**self).get_hashes(address, version, platforms)
    }
}

impl<O: HashOracle + ?Sized> HashOracle for Box<O> {
    fn get_hashes(
        &self,
        address: &ProviderAddress,
        version: &str,
        platforms: &[Platform],
    ) -> Result<Vec<String>, RegistryError> {
        (**self).get_hashes(address, version, platforms)
    }
}
