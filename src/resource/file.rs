use super::{ResourceClient, ResourceError};
use async_trait::async_trait;

/// Reads tree files from the local disk through `file://` urls.
#[derive(Clone, Debug, Default)]
pub struct FileClient;

#[async_trait]
impl ResourceClient for FileClient {
    async fn get(&self, url: &str) -> Result<Vec<u8>, ResourceError> {
        let Some(path) = url.strip_prefix("file://") else {
            return Err(ResourceError::Unsupported(
                "This client supports only file:// urls.".to_string(),
            ));
        };

        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(ResourceError::NotFound(path.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }
}
