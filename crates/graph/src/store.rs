//! Read-only contract the traversal strategies depend on.

use async_trait::async_trait;
use serde::Serialize;

use extract::{EntityId, EntityKind, RelationKind};

use crate::error::GraphError;

/// An entity matched in the graph, projected to what retrieval needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityHit {
    pub id: EntityId,
    pub text: String,
    pub kind: EntityKind,
}

/// A document referencing an entity through a `CONTAINS_ENTITY` edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocRef {
    pub doc_id: String,
    pub entity_id: EntityId,
}

/// One directed hop from a known entity to a neighbor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborRow {
    pub source_id: EntityId,
    pub relation: RelationKind,
    pub neighbor: EntityHit,
}

/// The graph store as the retrieval core sees it: a handful of read-only
/// lookups over an external property graph. The core never writes through
/// this interface.
///
/// Implementations must return rows in a deterministic order (sorted by
/// identifier) so that repeated queries over an unchanged graph produce
/// identical rankings.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Match query mentions against entity display text, case-insensitive
    /// substring containment.
    async fn match_entities(
        &self,
        mentions: &[String],
        limit: usize,
    ) -> Result<Vec<EntityHit>, GraphError>;

    /// Resolve documents referencing any of the given entities, traversed
    /// from the entity side of the containment edge.
    async fn documents_for_entities(
        &self,
        entity_ids: &[EntityId],
        limit: usize,
    ) -> Result<Vec<DocRef>, GraphError>;

    /// One directed hop along the given relationship kinds, in their stored
    /// direction only.
    async fn outgoing_neighbors(
        &self,
        entity_ids: &[EntityId],
        relations: &[RelationKind],
    ) -> Result<Vec<NeighborRow>, GraphError>;

    /// Cheap liveness probe.
    async fn ping(&self) -> Result<(), GraphError>;
}
