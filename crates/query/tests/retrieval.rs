//! End-to-end retrieval tests over an in-memory graph store.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use extract::{EntityId, EntityKind, Extractor, RelationKind};
use graph::{DocRef, EntityHit, GraphError, GraphStore, MemoryGraph, NeighborRow};
use query::{
    EngineConfig, RetrievalEngine, RetrievalError, RetrievalRequest, Strategy,
};

fn request(query: &str) -> RetrievalRequest {
    RetrievalRequest {
        query: query.to_string(),
        use_graph: true,
        max_graph_depth: None,
        top_k: None,
    }
}

fn engine_over(store: Arc<dyn GraphStore>) -> RetrievalEngine {
    RetrievalEngine::new(store, Extractor::pattern_only(), EngineConfig::default())
}

/// One visa category requiring one requirement satisfied by one document
/// kind, each referenced by its own chunk.
fn skilled_worker_graph() -> MemoryGraph {
    let mut g = MemoryGraph::new();
    let visa = g.add_entity("Skilled Worker visa", EntityKind::VisaCategory);
    let job = g.add_entity("Job offer", EntityKind::Requirement);
    let cos = g.add_entity("Certificate of Sponsorship", EntityKind::DocumentKind);
    g.relate(&visa, RelationKind::Requires, &job);
    g.relate(&job, RelationKind::SatisfiedBy, &cos);
    g.attach_document("chunk_001", &visa);
    g.attach_document("chunk_002", &job);
    g.attach_document("chunk_003", &cos);
    g
}

#[tokio::test]
async fn skilled_worker_scenario_ranks_by_strongest_evidence() {
    let engine = engine_over(Arc::new(skilled_worker_graph()));

    let response = engine
        .retrieve(&request("What documents are needed for the Skilled Worker visa?"))
        .await
        .unwrap();

    let ids: Vec<&str> = response.results.iter().map(|r| r.doc_id.as_str()).collect();
    assert_eq!(ids, vec!["chunk_001", "chunk_002", "chunk_003"]);

    // Direct match on the visa entity.
    assert_eq!(response.results[0].score, 1.0);
    assert!(response.results[0].strategies.contains(&Strategy::Direct));

    // The requirement is reached by expansion (0.8) and by a 1-hop multihop
    // path (0.6); the stronger evidence wins.
    assert_eq!(response.results[1].score, 0.8);
    assert!(response.results[1].strategies.contains(&Strategy::Expanded));
    assert!(response.results[1].strategies.contains(&Strategy::Multihop));

    // The document kind is only reachable two hops out.
    assert_eq!(response.results[2].score, 0.6 / 2.0);
    assert_eq!(response.results[2].hop_count, 2);

    // Explainability: the two-hop path spells out the traversal.
    let two_hop = response
        .graph_paths
        .iter()
        .find(|p| p.document_id == "chunk_003")
        .unwrap();
    assert_eq!(
        two_hop.traversal_path,
        vec!["Skilled Worker visa", "Job offer", "Certificate of Sponsorship"]
    );
    assert_eq!(
        two_hop.relationship_types,
        vec![RelationKind::Requires, RelationKind::SatisfiedBy]
    );
}

#[tokio::test]
async fn repeated_queries_are_idempotent() {
    let engine = engine_over(Arc::new(skilled_worker_graph()));
    let req = request("Skilled Worker visa requirements");

    let first = engine.retrieve(&req).await.unwrap();
    let second = engine.retrieve(&req).await.unwrap();

    assert_eq!(
        serde_json::to_value(&first.results).unwrap(),
        serde_json::to_value(&second.results).unwrap()
    );
    assert_eq!(
        serde_json::to_value(&first.graph_paths).unwrap(),
        serde_json::to_value(&second.graph_paths).unwrap()
    );
}

#[tokio::test]
async fn two_cycle_terminates_at_full_depth() {
    let mut g = MemoryGraph::new();
    let a = g.add_entity("Graduate visa", EntityKind::VisaCategory);
    let b = g.add_entity("Skilled Worker visa", EntityKind::VisaCategory);
    g.relate(&a, RelationKind::CanTransitionTo, &b);
    g.relate(&b, RelationKind::CanTransitionTo, &a);
    g.attach_document("chunk_a", &a);
    g.attach_document("chunk_b", &b);

    let engine = engine_over(Arc::new(g));
    let mut req = request("Can I switch from a Graduate visa?");
    req.max_graph_depth = Some(5);

    let response = engine.retrieve(&req).await.unwrap();

    // Finite output: the seed's own document via direct search plus the
    // transition target one hop out; the back-edge is never re-walked.
    let ids: Vec<&str> = response.results.iter().map(|r| r.doc_id.as_str()).collect();
    assert_eq!(ids, vec!["chunk_a", "chunk_b"]);
    assert!(response.results.iter().all(|r| r.hop_count <= 1));
}

#[tokio::test]
async fn top_k_one_is_deterministic_over_equal_scores() {
    let mut g = MemoryGraph::new();
    let visa = g.add_entity("Student visa", EntityKind::VisaCategory);
    g.attach_document("chunk_b", &visa);
    g.attach_document("chunk_a", &visa);
    g.attach_document("chunk_c", &visa);

    let engine = engine_over(Arc::new(g));
    let mut req = request("Student visa rules");
    req.top_k = Some(1);

    for _ in 0..3 {
        let response = engine.retrieve(&req).await.unwrap();
        assert_eq!(response.results.len(), 1);
        assert_eq!(response.results[0].doc_id, "chunk_a");
    }
}

#[tokio::test]
async fn oversized_bounds_clamp_instead_of_failing() {
    let engine = engine_over(Arc::new(skilled_worker_graph()));
    let mut req = request("Skilled Worker visa");
    req.max_graph_depth = Some(10);
    req.top_k = Some(200);

    let response = engine.retrieve(&req).await.unwrap();
    assert!(!response.results.is_empty());
}

/// Counts store calls so tests can assert the store was never touched.
struct CountingStore {
    inner: MemoryGraph,
    calls: AtomicUsize,
}

impl CountingStore {
    fn new(inner: MemoryGraph) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl GraphStore for CountingStore {
    async fn match_entities(
        &self,
        mentions: &[String],
        limit: usize,
    ) -> Result<Vec<EntityHit>, GraphError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.match_entities(mentions, limit).await
    }

    async fn documents_for_entities(
        &self,
        entity_ids: &[EntityId],
        limit: usize,
    ) -> Result<Vec<DocRef>, GraphError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.documents_for_entities(entity_ids, limit).await
    }

    async fn outgoing_neighbors(
        &self,
        entity_ids: &[EntityId],
        relations: &[RelationKind],
    ) -> Result<Vec<NeighborRow>, GraphError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.outgoing_neighbors(entity_ids, relations).await
    }

    async fn ping(&self) -> Result<(), GraphError> {
        self.inner.ping().await
    }
}

#[tokio::test]
async fn invalid_input_makes_no_store_calls() {
    let store = Arc::new(CountingStore::new(skilled_worker_graph()));
    let engine = engine_over(store.clone());

    let err = engine.retrieve(&request("   ")).await.unwrap_err();
    assert!(matches!(err, RetrievalError::InvalidInput(_)));
    assert!(!err.is_retryable());

    let mut req = request("Skilled Worker visa");
    req.top_k = Some(0);
    assert!(matches!(
        engine.retrieve(&req).await.unwrap_err(),
        RetrievalError::InvalidInput(_)
    ));

    let mut req = request("Skilled Worker visa");
    req.max_graph_depth = Some(0);
    assert!(matches!(
        engine.retrieve(&req).await.unwrap_err(),
        RetrievalError::InvalidInput(_)
    ));

    assert_eq!(store.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn graph_disabled_returns_empty_without_store_access() {
    let store = Arc::new(CountingStore::new(skilled_worker_graph()));
    let engine = engine_over(store.clone());

    let mut req = request("Skilled Worker visa");
    req.use_graph = false;

    let response = engine.retrieve(&req).await.unwrap();
    assert!(response.results.is_empty());
    assert!(response.graph_paths.is_empty());
    assert_eq!(store.calls.load(Ordering::SeqCst), 0);
}

/// Never answers; every strategy times out against it.
struct StallingStore;

#[async_trait]
impl GraphStore for StallingStore {
    async fn match_entities(
        &self,
        _mentions: &[String],
        _limit: usize,
    ) -> Result<Vec<EntityHit>, GraphError> {
        std::future::pending().await
    }

    async fn documents_for_entities(
        &self,
        _entity_ids: &[EntityId],
        _limit: usize,
    ) -> Result<Vec<DocRef>, GraphError> {
        std::future::pending().await
    }

    async fn outgoing_neighbors(
        &self,
        _entity_ids: &[EntityId],
        _relations: &[RelationKind],
    ) -> Result<Vec<NeighborRow>, GraphError> {
        std::future::pending().await
    }

    async fn ping(&self) -> Result<(), GraphError> {
        Ok(())
    }
}

#[tokio::test]
async fn all_strategies_timing_out_is_a_retryable_error() {
    let config = EngineConfig {
        strategy_timeout: Duration::from_millis(50),
        ..EngineConfig::default()
    };
    let engine = RetrievalEngine::new(Arc::new(StallingStore), Extractor::pattern_only(), config);

    let err = engine
        .retrieve(&request("Skilled Worker visa"))
        .await
        .unwrap_err();
    assert!(matches!(err, RetrievalError::AllStrategiesTimedOut));
    assert!(err.is_retryable());
}

/// Entity and document lookups answer; neighbor expansion hangs.
struct SlowNeighborsStore(MemoryGraph);

#[async_trait]
impl GraphStore for SlowNeighborsStore {
    async fn match_entities(
        &self,
        mentions: &[String],
        limit: usize,
    ) -> Result<Vec<EntityHit>, GraphError> {
        self.0.match_entities(mentions, limit).await
    }

    async fn documents_for_entities(
        &self,
        entity_ids: &[EntityId],
        limit: usize,
    ) -> Result<Vec<DocRef>, GraphError> {
        self.0.documents_for_entities(entity_ids, limit).await
    }

    async fn outgoing_neighbors(
        &self,
        _entity_ids: &[EntityId],
        _relations: &[RelationKind],
    ) -> Result<Vec<NeighborRow>, GraphError> {
        std::future::pending().await
    }

    async fn ping(&self) -> Result<(), GraphError> {
        self.0.ping().await
    }
}

#[tokio::test]
async fn single_strategy_timeout_is_absorbed() {
    let config = EngineConfig {
        strategy_timeout: Duration::from_millis(100),
        ..EngineConfig::default()
    };
    let engine = RetrievalEngine::new(
        Arc::new(SlowNeighborsStore(skilled_worker_graph())),
        Extractor::pattern_only(),
        config,
    );

    let response = engine
        .retrieve(&request("Skilled Worker visa"))
        .await
        .unwrap();

    // Direct search still answers; the traversal strategies contribute
    // nothing.
    let ids: Vec<&str> = response.results.iter().map(|r| r.doc_id.as_str()).collect();
    assert_eq!(ids, vec!["chunk_001"]);
    assert_eq!(response.results[0].strategies, vec![Strategy::Direct]);
}

/// Entity and document lookups answer; neighbor expansion errors out.
struct BrokenNeighborsStore(MemoryGraph);

#[async_trait]
impl GraphStore for BrokenNeighborsStore {
    async fn match_entities(
        &self,
        mentions: &[String],
        limit: usize,
    ) -> Result<Vec<EntityHit>, GraphError> {
        self.0.match_entities(mentions, limit).await
    }

    async fn documents_for_entities(
        &self,
        entity_ids: &[EntityId],
        limit: usize,
    ) -> Result<Vec<DocRef>, GraphError> {
        self.0.documents_for_entities(entity_ids, limit).await
    }

    async fn outgoing_neighbors(
        &self,
        _entity_ids: &[EntityId],
        _relations: &[RelationKind],
    ) -> Result<Vec<NeighborRow>, GraphError> {
        Err(GraphError::Connection("connection reset".to_string()))
    }

    async fn ping(&self) -> Result<(), GraphError> {
        self.0.ping().await
    }
}

#[tokio::test]
async fn single_strategy_failure_is_absorbed() {
    let engine = engine_over(Arc::new(BrokenNeighborsStore(skilled_worker_graph())));

    let response = engine
        .retrieve(&request("Skilled Worker visa"))
        .await
        .unwrap();

    // Expansion and multi-hop both hit the broken neighbor lookup; their
    // failures are logged and dropped while direct search still answers.
    let ids: Vec<&str> = response.results.iter().map(|r| r.doc_id.as_str()).collect();
    assert_eq!(ids, vec!["chunk_001"]);
    assert_eq!(response.results[0].strategies, vec![Strategy::Direct]);
}

/// Every call fails the way a dead bolt connection does.
struct FailingStore;

#[async_trait]
impl GraphStore for FailingStore {
    async fn match_entities(
        &self,
        _mentions: &[String],
        _limit: usize,
    ) -> Result<Vec<EntityHit>, GraphError> {
        Err(GraphError::Connection("connection refused".to_string()))
    }

    async fn documents_for_entities(
        &self,
        _entity_ids: &[EntityId],
        _limit: usize,
    ) -> Result<Vec<DocRef>, GraphError> {
        Err(GraphError::Connection("connection refused".to_string()))
    }

    async fn outgoing_neighbors(
        &self,
        _entity_ids: &[EntityId],
        _relations: &[RelationKind],
    ) -> Result<Vec<NeighborRow>, GraphError> {
        Err(GraphError::Connection("connection refused".to_string()))
    }

    async fn ping(&self) -> Result<(), GraphError> {
        Err(GraphError::Connection("connection refused".to_string()))
    }
}

#[tokio::test]
async fn unreachable_store_surfaces_as_retryable_service_error() {
    let engine = engine_over(Arc::new(FailingStore));

    let err = engine
        .retrieve(&request("Skilled Worker visa"))
        .await
        .unwrap_err();
    assert!(matches!(err, RetrievalError::GraphUnavailable(_)));
    assert!(err.is_retryable());
    // Internal connection detail stays out of the caller-facing message.
    assert_eq!(err.to_string(), "graph store unavailable");
}

#[tokio::test]
async fn no_matches_is_an_empty_success() {
    let engine = engine_over(Arc::new(skilled_worker_graph()));

    let response = engine
        .retrieve(&request("rules for the Innovator Founder visa"))
        .await
        .unwrap();
    assert!(response.results.is_empty());
    assert!(response.graph_paths.is_empty());
}
