//! Thumbnail byte fetching over HTTP.

use async_trait::async_trait;

use crate::config::Config;
use crate::error::{Error, Result};

/// Transport capability used by the worker to fetch raw thumbnail bytes.
///
/// The provided implementation is [`HttpFetcher`]; tests and embedders with
/// unusual transports can inject their own through
/// [`ThumbnailDownloader::with_fetcher`](crate::ThumbnailDownloader::with_fetcher).
#[async_trait]
pub trait ByteFetcher: Send + Sync + 'static {
    /// Fetch the raw bytes behind `url`.
    ///
    /// May block indefinitely on network I/O; the worker imposes no timeout.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Plain HTTP GET fetcher built on reqwest.
///
/// The response status is deliberately not validated: a non-2xx body is
/// returned like any other and left for the decoder to reject. The body is
/// streamed chunk by chunk and accumulated into a growable buffer.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a fetcher whose client is derived from `config` (currently the
    /// User-Agent header).
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .build()?;
        Ok(Self { client })
    }

    /// Wrap an existing reqwest client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ByteFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let parsed = url::Url::parse(url).map_err(|e| Error::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let mut response = self.client.get(parsed).send().await?;

        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            bytes.extend_from_slice(&chunk);
        }
        Ok(bytes)
    }
}
