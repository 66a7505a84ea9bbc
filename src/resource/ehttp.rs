use super::{ResourceClient, ResourceError};
use async_trait::async_trait;

/// Fetches through `ehttp`, which also works from the browser main thread.
#[derive(Clone, Debug, Default)]
pub struct EhttpClient;

#[async_trait]
impl ResourceClient for EhttpClient {
    async fn get(&self, url: &str) -> Result<Vec<u8>, ResourceError> {
        let (tx, rx) = futures::channel::oneshot::channel();

        ehttp::fetch(ehttp::Request::get(url), move |res| {
            let _ = tx.send(res);
        });

        let response = rx
            .await
            .map_err(|_| ResourceError::Network("channel closed".to_string()))?;
        let response = response.map_err(ResourceError::Network)?;

        if response.ok {
            Ok(response.bytes)
        } else {
            Err(ResourceError::from_status(url, response.status))
        }
    }
}
