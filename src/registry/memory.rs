use crate::address::ProviderAddress;
use crate::registry::errors::RegistryError;
use crate::registry::{HashOracle, Platform};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Published hashes of one provider release.
#[derive(Debug, Clone, Default)]
pub struct Release {
    packages: BTreeMap<Platform, String>,
    checksums: BTreeMap<String, String>,
}

impl Release {
    pub fn new() -> Self {
        Self::default()
    }

    /// `h1:` hash of the package built for `platform`.
    pub fn package(mut self, platform: Platform, h1: impl Into<String>) -> Self {
        self.packages.insert(platform, h1.into());
        self
    }

    /// A `SHA256SUMS` entry: `zh:` hash of a release file.
    pub fn checksum(mut self, file_name: impl Into<String>, zh: impl Into<String>) -> Self {
        self.checksums.insert(file_name.into(), zh.into());
        self
    }
}

/// Hash oracle answering from registered releases.
///
/// Follows the same rules as the live registry: `h1:` hashes for the
/// requested platforms, `zh:` hashes for every release file, sorted.
#[derive(Debug, Clone, Default)]
pub struct MemoryOracle {
    releases: HashMap<(ProviderAddress, String), Release>,
}

impl MemoryOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, address: ProviderAddress, version: impl Into<String>, release: Release) {
        self.releases.insert((address, version.into()), release);
    }

    pub fn with_release(
        mut self,
        address: ProviderAddress,
        version: impl Into<String>,
        release: Release,
    ) -> Self {
        self.insert(address, version, release);
        self
    }
}

impl HashOracle for MemoryOracle {
    fn get_hashes(
        &self,
        address: &ProviderAddress,
        version: &str,
        platforms: &[Platform],
    ) -> Result<Vec<String>, RegistryError> {
        if platforms.is_empty() {
            return Err(RegistryError::NoPlatforms);
        }

        let release = self
            .releases
            .get(&(address.clone(), version.to_string()))
            .ok_or_else(|| RegistryError::UnknownVersion {
                provider: address.for_display(),
                version: version.to_string(),
            })?;

        let mut hashes: BTreeSet<String> = release.checksums.values().cloned().collect();
        for platform in platforms {
            let h1 = release
                .packages
                .get(platform)
                .ok_or_else(|| RegistryError::UnknownPlatform {
                    provider: address.for_display(),
                    version: version.to_string(),
                    platform: platform.to_string(),
                })?;
            hashes.insert(h1.clone());
        }

        Ok(hashes.into_iter().collect())
    }
}
