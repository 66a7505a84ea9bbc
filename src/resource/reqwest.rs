use super::{ResourceClient, ResourceError};
use async_trait::async_trait;

/// Fetches tree files over HTTP(S).
#[derive(Clone, Debug, Default)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResourceClient for ReqwestClient {
    async fn get(&self, url: &str) -> Result<Vec<u8>, ResourceError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ResourceError::Network(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(ResourceError::from_status(url, resp.status().as_u16()));
        }
        Ok(resp
            .bytes()
            .await
            .map_err(|e| ResourceError::Network(e.to_string()))?
            .to_vec())
    }
}
