pub use crate::cache::{CacheStats, LruCache, NodeCache};
pub use crate::frustum::{Classification, FrustumPlanes};
pub use crate::loader::{NodeLoader, NodeSource};
pub use crate::metadata::{TreeInfo, TreeMetadata, Viewpoint};
pub use crate::octree::{Node, NodePath, NodeSnapshot, PointRecord, SpatialRegion};
pub use crate::point::PointData;
pub use crate::query::{
    FrustumQuerier, FrustumQuery, Generation, QueryConfig, QueryEvent, QueryObserver,
    QuerySnapshot, QueryState, QueryStats, TriggerReason,
};
pub use crate::resource::ResourceClient;

// Error types
pub use crate::loader::LoadNodeError;
pub use crate::metadata::MetadataError;
pub use crate::octree::{DecodeError, InvalidRegion};
pub use crate::query::ConfigError;
pub use crate::resource::ResourceError;
