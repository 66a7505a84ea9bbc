use super::file::FileClient;
use super::{ResourceClient, ResourceError};
use async_trait::async_trait;

/// Serves `file://` urls from disk and hands everything else to `inner`.
pub struct HybridClient<T: ResourceClient> {
    file_client: FileClient,
    inner: T,
}

impl<T: ResourceClient> HybridClient<T> {
    pub fn new(inner: T) -> Self {
        Self {
            file_client: FileClient,
            inner,
        }
    }
}

#[async_trait]
impl<T: ResourceClient> ResourceClient for HybridClient<T> {
    async fn get(&self, url: &str) -> Result<Vec<u8>, ResourceError> {
        if url.starts_with("file://") {
            self.file_client.get(url).await
        } else {
            self.inner.get(url).await
        }
    }
}
