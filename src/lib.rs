//! Streaming of disk-resident point cloud octrees.
//!
//! Nodes are fetched on demand through a [`NodeSource`](loader::NodeSource), kept in
//! a bounded [`NodeCache`](cache::NodeCache) and selected by a
//! [`FrustumQuerier`](query::FrustumQuerier) that keeps the number of nodes needed
//! for a view close to a budget.

pub mod cache;
pub mod frustum;
pub mod loader;
pub mod metadata;
pub mod octree;
pub mod point;
pub mod prelude;
pub mod query;
pub mod resource;
