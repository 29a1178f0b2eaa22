use crate::address::ProviderAddress;
use crate::cache;
use crate::registry::errors::{RegistryError, TransportError};
use crate::registry::hash::{package_hash, parse_sha256sums, sha256_hex};
use crate::registry::transport::Transport;
use crate::registry::{HashOracle, Platform};
use serde::Deserialize;
use std::collections::BTreeSet;
use tracing::debug;
use url::Url;

/// Download metadata for one platform package.
#[derive(Debug, Clone, Deserialize)]
struct PackageMetadata {
    filename: String,
    download_url: String,
    shasums_url: String,
    shasum: String,
}

/// Hash oracle backed by the provider registry protocol.
///
/// For each platform the `download` endpoint names the package archive and
/// the release's `SHA256SUMS` document. Every `SHA256SUMS` entry becomes a
/// `zh:` hash; every requested package is downloaded, verified and turned
/// into an `h1:` hash. The result is the sorted union.
#[derive(Debug, Clone)]
pub struct RegistryIndex<T> {
    transport: T,
}

impl<T: Transport> RegistryIndex<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    fn download_endpoint(
        address: &ProviderAddress,
        version: &str,
        platform: &Platform,
    ) -> Result<Url, RegistryError> {
        let raw = format!(
            "https://{}/v1/providers/{}/{}/{}/download/{}/{}",
            address.hostname(),
            address.namespace(),
            address.type_name(),
            version,
            platform.os(),
            platform.arch()
        );
        Url::parse(&raw).map_err(|source| RegistryError::Url { url: raw, source })
    }

    fn fetch_metadata(
        &self,
        address: &ProviderAddress,
        version: &str,
        platform: &Platform,
    ) -> Result<(Url, PackageMetadata), RegistryError> {
        let endpoint = Self::download_endpoint(address, version, platform)?;
        let body = self.transport.get(&endpoint).map_err(|err| {
            if err.is_not_found() {
                RegistryError::UnknownPlatform {
                    provider: address.for_display(),
                    version: version.to_string(),
                    platform: platform.to_string(),
                }
            } else {
                err.into()
            }
        })?;

        let metadata = serde_json::from_slice(&body).map_err(|source| RegistryError::Metadata {
            url: endpoint.to_string(),
            source,
        })?;
        Ok((endpoint, metadata))
    }

    fn fetch(&self, url: &Url) -> Result<Vec<u8>, TransportError> {
        debug!(%url, "fetching");
        self.transport.get(url)
    }
}

impl<T: Transport> HashOracle for RegistryIndex<T> {
    fn get_hashes(
        &self,
        address: &ProviderAddress,
        version: &str,
        platforms: &[Platform],
    ) -> Result<Vec<String>, RegistryError> {
        if platforms.is_empty() {
            return Err(RegistryError::NoPlatforms);
        }

        let mut hashes = BTreeSet::new();
        let mut seen_shasums: Vec<Url> = Vec::new();

        for platform in platforms {
            let (endpoint, metadata) = self.fetch_metadata(address, version, platform)?;

            let shasums_url = join(&endpoint, &metadata.shasums_url)?;
            if !seen_shasums.contains(&shasums_url) {
                let body = self.fetch(&shasums_url)?;
                let text = String::from_utf8_lossy(&body);
                hashes.extend(parse_sha256sums(&text)?.iter().map(|entry| entry.zh_hash()));
                seen_shasums.push(shasums_url);
            }

            let download_url = join(&endpoint, &metadata.download_url)?;
            let expected = metadata.shasum.to_ascii_lowercase();
            let h1 = cache::get_or_compute(&expected, || {
                let archive = self.fetch(&download_url)?;
                let actual = sha256_hex(&archive);
                if actual != expected {
                    return Err(RegistryError::ChecksumMismatch {
                        file: metadata.filename.clone(),
                        expected: expected.clone(),
                        actual,
                    });
                }
                package_hash(&metadata.filename, &archive)
            })?;

            debug!(provider = %address, version, %platform, %h1, "computed package hash");
            hashes.insert(h1);
        }

        Ok(hashes.into_iter().collect())
    }
}

fn join(base: &Url, reference: &str) -> Result<Url, RegistryError> {
    base.join(reference).map_err(|source| RegistryError::Url {
        url: reference.to_string(),
        source,
    })
}
