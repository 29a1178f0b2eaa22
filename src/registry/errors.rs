use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },
}

impl TransportError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, TransportError::Status { status: 404, .. })
    }
}

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("invalid platform {0:?}: expected \"os_arch\", e.g. \"linux_amd64\"")]
    InvalidPlatform(String),

    #[error("no platforms requested")]
    NoPlatforms,

    #[error("provider {provider} has no version {version:?}")]
    UnknownVersion { provider: String, version: String },

    #[error("provider {provider} {version} is not available for {platform}")]
    UnknownPlatform {
        provider: String,
        version: String,
        platform: String,
    },

    #[error("invalid registry URL {url:?}: {source}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid download metadata from {url}: {source}")]
    Metadata {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed SHA256SUMS line {line}: {content:?}")]
    MalformedChecksums { line: usize, content: String },

    #[error("checksum mismatch for {file}: registry says {expected}, downloaded {actual}")]
    ChecksumMismatch {
        file: String,
        expected: String,
        actual: String,
    },

    #[error("invalid package archive {file}: {source}")]
    Archive {
        file: String,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("failed to read {entry} from {file}: {source}")]
    ArchiveIo {
        file: String,
        entry: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Transport(#[from] TransportError),
}
