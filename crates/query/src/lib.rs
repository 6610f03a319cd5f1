//! Graph-augmented retrieval: traversal strategies, result merging, and the
//! per-query orchestrator.

pub mod candidate;
pub mod engine;
pub mod merge;
pub mod strategies;

pub use candidate::{Candidate, PathExplanation, RankedResult, Strategy};
pub use engine::{
    DEFAULT_MAX_DEPTH, DEFAULT_TOP_K, EngineConfig, MAX_DEPTH_CEILING, RetrievalEngine,
    RetrievalError, RetrievalRequest, RetrievalResponse, TOP_K_CEILING,
};
pub use merge::merge_and_rank;
pub use strategies::{
    DIRECT_SCORE, EXPANSION_SCORE, MULTIHOP_BASE_SCORE, direct_search, multihop_traversal,
    relationship_expansion,
};
