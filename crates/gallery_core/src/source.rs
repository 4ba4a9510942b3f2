//! Remote asset fetching.

use crate::error::FetchError;
use async_trait::async_trait;
use bytes::Bytes;
use sphere_layout::AssetRef;
use std::time::Duration;

/// Fetch primitive behind the image cache: one attempt, raw bytes out.
#[async_trait]
pub trait AssetSource: Send + Sync + 'static {
    async fn fetch(&self, url: &AssetRef) -> Result<Bytes, FetchError>;
}

/// [`AssetSource`] over HTTP(S). No retries; a non-2xx status is a failure.
#[derive(Debug, Clone)]
pub struct HttpAssetSource {
    client: reqwest::Client,
}

impl HttpAssetSource {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("sphere-cinema/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl AssetSource for HttpAssetSource {
    async fn fetch(&self, url: &AssetRef) -> Result<Bytes, FetchError> {
        let request_error = |e: reqwest::Error| FetchError::Request {
            url: url.to_string(),
            reason: e.to_string(),
        };

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(request_error)?;
        tracing::debug!(url = %url, bytes = body.len(), "Fetched asset");
        Ok(body)
    }
}
