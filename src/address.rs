//! Provider address normalization.
//!
//! A provider can be spelled `namespace/type` or `hostname/namespace/type`.
//! Both spellings resolve to the same [`ProviderAddress`], which is what the
//! lock file locator and the registry oracle compare against.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Hostname assumed when a provider is written without one.
pub const DEFAULT_REGISTRY_HOST: &str = "registry.terraform.io";

const RESERVED_TYPE_PREFIX: &str = "terraform-provider-";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid provider address {input:?}: expected \"namespace/type\" or \"hostname/namespace/type\", found {segments} segment(s)")]
    SegmentCount { input: String, segments: usize },

    #[error("invalid provider address {input:?}: {part} must not be empty")]
    EmptySegment { input: String, part: &'static str },

    #[error("invalid provider address {input:?}: {part} {value:?} contains invalid character {ch:?}")]
    InvalidCharacter {
        input: String,
        part: &'static str,
        value: String,
        ch: char,
    },

    #[error("invalid provider address {input:?}: type must not start with \"terraform-provider-\"")]
    ReservedTypePrefix { input: String },
}

/// Canonical identity of a provider.
///
/// All three parts are lower-cased on resolution, so equality is total and
/// independent of how the provider was spelled.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProviderAddress {
    hostname: String,
    namespace: String,
    type_name: String,
}

impl ProviderAddress {
    /// Resolve a user-supplied or lock-file provider string.
    pub fn parse(raw: &str) -> Result<Self, AddressError> {
        let input = raw.trim();
        let parts: Vec<&str> = input.split('/').collect();

        let (hostname, namespace, type_name) = match parts.as_slice() {
            [namespace, type_name] => (DEFAULT_REGISTRY_HOST, *namespace, *type_name),
            [hostname, namespace, type_name] => (*hostname, *namespace, *type_name),
            _ => {
                return Err(AddressError::SegmentCount {
                    input: input.to_string(),
                    segments: parts.len(),
                })
            }
        };

        let hostname = normalize_part(input, "hostname", hostname, is_hostname_char)?;
        let namespace = normalize_part(input, "namespace", namespace, is_name_char)?;
        let type_name = normalize_part(input, "type", type_name, is_name_char)?;

        if type_name.starts_with(RESERVED_TYPE_PREFIX) {
            return Err(AddressError::ReservedTypePrefix {
                input: input.to_string(),
            });
        }

        Ok(Self {
            hostname,
            namespace,
            type_name,
        })
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn is_default_host(&self) -> bool {
        self.hostname == DEFAULT_REGISTRY_HOST
    }

    /// Short form used in human-facing messages: the hostname is dropped
    /// when it is the default registry.
    pub fn for_display(&self) -> String {
        if self.is_default_host() {
            format!("{}/{}", self.namespace, self.type_name)
        } else {
            self.to_string()
        }
    }
}

impl fmt::Display for ProviderAddress {
    /// Fully-qualified form, as `terraform init` writes it in block labels.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.hostname, self.namespace, self.type_name)
    }
}

impl FromStr for ProviderAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn normalize_part(
    input: &str,
    part: &'static str,
    value: &str,
    allowed: fn(char) -> bool,
) -> Result<String, AddressError> {
    if value.is_empty() {
        return Err(AddressError::EmptySegment {
            input: input.to_string(),
            part,
        });
    }

    if let Some(ch) = value.chars().find(|ch| !allowed(*ch)) {
        return Err(AddressError::InvalidCharacter {
            input: input.to_string(),
            part,
            value: value.to_string(),
            ch,
        });
    }

    Ok(value.to_ascii_lowercase())
}

fn is_name_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '-' || ch == '_'
}

fn is_hostname_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '-' || ch == '.' || ch == ':'
}
