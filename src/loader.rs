use crate::metadata::{MetadataError, TreeMetadata};
use crate::octree::{DecodeError, Node, NodePath, SpatialRegion};
use crate::resource::{ResourceClient, ResourceError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum LoadNodeError {
    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),
}

/// Produces decoded nodes for the query engine.
///
/// Dropping the returned future cancels the request; the engine relies on this and
/// never expects a callback from a dropped request.
#[async_trait]
pub trait NodeSource: Send + Sync {
    async fn load_node(
        &self,
        path: &NodePath,
        region: &SpatialRegion,
    ) -> Result<Node, LoadNodeError>;
}

/// Fetches node files laid out as `<base_url>/<node path>` and decodes them.
#[derive(Debug)]
pub struct NodeLoader<C> {
    base_url: String,
    client: C,
    bytes_downloaded: AtomicU64,
}

impl<C: ResourceClient> NodeLoader<C> {
    pub fn new(base_url: impl Into<String>, client: C) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            client,
            bytes_downloaded: AtomicU64::new(0),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn node_url(&self, path: &NodePath) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Total payload bytes fetched so far.
    pub fn bytes_downloaded(&self) -> u64 {
        self.bytes_downloaded.load(Ordering::Relaxed)
    }

    /// Names of the trees served under the base url.
    pub async fn supported_trees(&self) -> Result<Vec<String>, ResourceError> {
        let url = format!("{}/supported_trees", self.base_url);
        let listing = self.client.get_text(&url).await?;
        Ok(listing
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect())
    }

    pub async fn load_metadata(&self, tree_name: &str) -> Result<TreeMetadata, MetadataError> {
        let url = format!("{}/{}/metadata.ini", self.base_url, tree_name);
        let text = self.client.get_text(&url).await?;
        debug!(tree = tree_name, "Received tree metadata");
        TreeMetadata::parse(&text)
    }
}

#[async_trait]
impl<C: ResourceClient> NodeSource for NodeLoader<C> {
    async fn load_node(
        &self,
        path: &NodePath,
        region: &SpatialRegion,
    ) -> Result<Node, LoadNodeError> {
        let bytes = self.client.get(&self.node_url(path)).await?;
        self.bytes_downloaded.fetch_add(bytes.len() as u64, Ordering::Relaxed);

        Ok(Node::decode(path.clone(), *region, &bytes)?)
    }
}
