#[cfg(feature = "ehttp")]
pub mod ehttp;

#[cfg(feature = "fs")]
pub mod file;

#[cfg(feature = "reqwest")]
pub mod reqwest;

#[cfg(all(feature = "fs", feature = "reqwest"))]
pub mod hybrid;

use async_trait::async_trait;
use std::sync::Arc;

/// Byte transport used to fetch tree files.
#[async_trait]
pub trait ResourceClient: Send + Sync {
    async fn get(&self, url: &str) -> Result<Vec<u8>, ResourceError>;

    async fn get_text(&self, url: &str) -> Result<String, ResourceError> {
        let bytes = self.get(url).await?;
        String::from_utf8(bytes).map_err(|err| ResourceError::Other(format!("{url}: {err}")))
    }
}

#[async_trait]
impl<C: ResourceClient> ResourceClient for Arc<C> {
    async fn get(&self, url: &str) -> Result<Vec<u8>, ResourceError> {
        (**self).get(url).await
    }

    async fn get_text(&self, url: &str) -> Result<String, ResourceError> {
        (**self).get_text(url).await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Unexpected HTTP status code: {0}")]
    Status(u16),

    #[error("File error: {0}")]
    File(#[from] std::io::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Other(String),

    #[error("Unsupported scheme: {0}")]
    Unsupported(String),
}

impl ResourceError {
    /// Error for a non-success HTTP status. A missing node file is `NotFound`.
    #[cfg(any(feature = "reqwest", feature = "ehttp"))]
    pub(crate) fn from_status(url: &str, status: u16) -> Self {
        match status {
            404 => ResourceError::NotFound(url.to_string()),
            status => ResourceError::Status(status),
        }
    }
}
