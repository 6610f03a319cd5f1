//! Graph store adapter.
//!
//! Thin read-only interface over the external property graph: the
//! [`GraphStore`] trait the traversal strategies consume, a neo4rs-backed
//! implementation with bounded pooling and retry, and an in-memory
//! implementation for tests and offline fixtures.

pub mod client;
pub mod error;
pub mod memory;
pub mod queries;
pub mod retry;
pub mod store;

pub use client::{GraphConfig, Neo4jStore};
pub use error::GraphError;
pub use memory::MemoryGraph;
pub use retry::{RetryConfig, RetryPolicy};
pub use store::{DocRef, EntityHit, GraphStore, NeighborRow};
