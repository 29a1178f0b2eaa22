use crate::registry::errors::TransportError;
use std::time::Duration;
use url::Url;

/// "Do a request, get a response." Retries and backoff belong to
/// implementations, not to callers.
pub trait Transport {
    fn get(&self, url: &Url) -> Result<Vec<u8>, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn get(&self, url: &Url) -> Result<Vec<u8>, TransportError> {
        (**self).get(url)
    }
}

/// Blocking HTTP transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("lock-patcher/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(TransportError::Client)?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::blocking::Client) -> Self {
        Self { client }
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &Url) -> Result<Vec<u8>, TransportError> {
        let request_err = |source| TransportError::Request {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url.clone()).send().map_err(request_err)?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.bytes().map_err(request_err)?.to_vec())
    }
}
