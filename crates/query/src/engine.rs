//! Retrieval orchestrator.
//!
//! Runs entity extraction, the three traversal strategies, and the merger as
//! a per-query state machine. No state survives across queries.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, warn};

use extract::Extractor;
use graph::{GraphError, GraphStore};

use crate::candidate::{Candidate, PathExplanation, RankedResult};
use crate::merge::merge_and_rank;
use crate::strategies;

pub const DEFAULT_MAX_DEPTH: usize = 3;
pub const MAX_DEPTH_CEILING: usize = 5;
pub const DEFAULT_TOP_K: usize = 10;
pub const TOP_K_CEILING: usize = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct RetrievalRequest {
    pub query: String,
    #[serde(default = "default_use_graph")]
    pub use_graph: bool,
    pub max_graph_depth: Option<usize>,
    pub top_k: Option<usize>,
}

fn default_use_graph() -> bool {
    true
}

#[derive(Debug, Clone, Serialize)]
pub struct RetrievalResponse {
    pub results: Vec<RankedResult>,
    pub graph_paths: Vec<PathExplanation>,
    pub took_ms: u64,
}

/// Typed errors surfaced to callers. Strategy-local failures (a single
/// timeout, tagger degradation) are absorbed and never appear here.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("invalid request: {0}")]
    InvalidInput(String),

    /// The message stays free of connection detail; the source is for logs.
    #[error("graph store unavailable")]
    GraphUnavailable(#[source] GraphError),

    #[error("all traversal strategies timed out")]
    AllStrategiesTimedOut,
}

impl RetrievalError {
    /// Service-side failures are worth retrying; invalid input is not.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, RetrievalError::InvalidInput(_))
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Per-strategy time budget; a strategy over budget contributes nothing.
    pub strategy_timeout: Duration,
    pub default_max_depth: usize,
    pub default_top_k: usize,
    /// Row cap passed to every graph store call.
    pub fetch_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            strategy_timeout: Duration::from_secs(5),
            default_max_depth: DEFAULT_MAX_DEPTH,
            default_top_k: DEFAULT_TOP_K,
            fetch_limit: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QueryState {
    Received,
    EntitiesExtracted,
    StrategiesRun,
    Merged,
    Returned,
    Failed,
}

impl QueryState {
    fn as_str(self) -> &'static str {
        match self {
            QueryState::Received => "received",
            QueryState::EntitiesExtracted => "entities_extracted",
            QueryState::StrategiesRun => "strategies_run",
            QueryState::Merged => "merged",
            QueryState::Returned => "returned",
            QueryState::Failed => "failed",
        }
    }
}

fn transition(state: &mut QueryState, next: QueryState) {
    debug!(from = state.as_str(), to = next.as_str(), "query state");
    *state = next;
}

pub struct RetrievalEngine {
    store: Arc<dyn GraphStore>,
    extractor: Extractor,
    config: EngineConfig,
}

impl RetrievalEngine {
    pub fn new(store: Arc<dyn GraphStore>, extractor: Extractor, config: EngineConfig) -> Self {
        Self {
            store,
            extractor,
            config,
        }
    }

    /// Answer one retrieval query.
    ///
    /// An empty result list is a valid answer; `Err` means the query could
    /// not be answered at all.
    pub async fn retrieve(
        &self,
        request: &RetrievalRequest,
    ) -> Result<RetrievalResponse, RetrievalError> {
        let started = Instant::now();
        let mut state = QueryState::Received;

        if !request.use_graph {
            // Graph retrieval disabled by the caller: an empty contribution,
            // produced without touching the store.
            transition(&mut state, QueryState::Returned);
            return Ok(Self::empty_response(started));
        }

        let (depth, top_k) = match self.validate(request) {
            Ok(bounds) => bounds,
            Err(e) => {
                transition(&mut state, QueryState::Failed);
                return Err(e);
            }
        };

        let mentions = self.extractor.extract(&request.query).await;
        transition(&mut state, QueryState::EntitiesExtracted);
        debug!(mentions = mentions.len(), "extracted query entities");

        if mentions.is_empty() {
            transition(&mut state, QueryState::Returned);
            return Ok(Self::empty_response(started));
        }

        let budget = self.config.strategy_timeout;
        let limit = self.config.fetch_limit;
        let store = self.store.as_ref();
        let (direct, expanded, multihop) = tokio::join!(
            timeout(budget, strategies::direct_search(store, &mentions, limit)),
            timeout(budget, strategies::relationship_expansion(store, &mentions, limit)),
            timeout(
                budget,
                strategies::multihop_traversal(store, &mentions, depth, limit)
            ),
        );
        transition(&mut state, QueryState::StrategiesRun);

        let mut candidates: Vec<Candidate> = Vec::new();
        let mut timeouts = 0usize;
        let mut failures: Vec<GraphError> = Vec::new();
        for (name, outcome) in [
            ("direct", direct),
            ("expanded", expanded),
            ("multihop", multihop),
        ] {
            match outcome {
                Ok(Ok(mut list)) => candidates.append(&mut list),
                Ok(Err(e)) => {
                    warn!(strategy = name, error = %e, "strategy failed, treating as empty");
                    failures.push(e);
                }
                Err(_) => {
                    warn!(
                        strategy = name,
                        budget_ms = budget.as_millis() as u64,
                        "strategy timed out, treating as empty"
                    );
                    timeouts += 1;
                }
            }
        }

        if timeouts == 3 {
            transition(&mut state, QueryState::Failed);
            return Err(RetrievalError::AllStrategiesTimedOut);
        }
        if timeouts + failures.len() == 3 {
            transition(&mut state, QueryState::Failed);
            // At least one hard store failure when nothing succeeded.
            let source = failures.pop().unwrap_or(GraphError::Connection(
                "no strategy completed".to_string(),
            ));
            return Err(RetrievalError::GraphUnavailable(source));
        }

        let results = merge_and_rank(candidates, top_k);
        transition(&mut state, QueryState::Merged);

        let graph_paths: Vec<PathExplanation> =
            results.iter().flat_map(|r| r.paths.iter().cloned()).collect();
        transition(&mut state, QueryState::Returned);

        Ok(RetrievalResponse {
            results,
            graph_paths,
            took_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Liveness of the underlying store, for health checks.
    pub async fn ping(&self) -> Result<(), GraphError> {
        self.store.ping().await
    }

    /// Validate before any graph access. Too-small values are client errors;
    /// too-large values clamp to their documented ceilings.
    fn validate(&self, request: &RetrievalRequest) -> Result<(usize, usize), RetrievalError> {
        if request.query.trim().is_empty() {
            return Err(RetrievalError::InvalidInput(
                "query text must not be empty".to_string(),
            ));
        }
        let depth = request
            .max_graph_depth
            .unwrap_or(self.config.default_max_depth);
        if depth == 0 {
            return Err(RetrievalError::InvalidInput(
                "max_graph_depth must be at least 1".to_string(),
            ));
        }
        let top_k = request.top_k.unwrap_or(self.config.default_top_k);
        if top_k == 0 {
            return Err(RetrievalError::InvalidInput(
                "top_k must be at least 1".to_string(),
            ));
        }
        Ok((depth.min(MAX_DEPTH_CEILING), top_k.min(TOP_K_CEILING)))
    }

    fn empty_response(started: Instant) -> RetrievalResponse {
        RetrievalResponse {
            results: Vec::new(),
            graph_paths: Vec::new(),
            took_ms: started.elapsed().as_millis() as u64,
        }
    }
}
