//! In-memory implementation of [`GraphStore`].
//!
//! Backs the retrieval tests (the original suite exercised the query logic
//! against a mocked driver the same way) and small offline fixtures. Row
//! ordering mirrors the ORDER BY clauses of the Cypher queries.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;

use extract::{Entity, EntityId, EntityKind, RelationKind};

use crate::error::GraphError;
use crate::store::{DocRef, EntityHit, GraphStore, NeighborRow};

#[derive(Debug, Default)]
pub struct MemoryGraph {
    entities: BTreeMap<EntityId, Entity>,
    edges: BTreeSet<(EntityId, RelationKind, EntityId)>,
    /// (doc_id, entity_id) containment pairs.
    docs: BTreeSet<(String, EntityId)>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_entity(&mut self, text: &str, kind: EntityKind) -> EntityId {
        let entity = Entity::new(text, kind, "mem", "mem");
        let id = entity.id.clone();
        self.entities.insert(id.clone(), entity);
        id
    }

    pub fn relate(&mut self, source: &EntityId, relation: RelationKind, target: &EntityId) {
        self.edges.insert((source.clone(), relation, target.clone()));
    }

    pub fn attach_document(&mut self, doc_id: &str, entity: &EntityId) {
        self.docs.insert((doc_id.to_string(), entity.clone()));
    }

    fn hit(&self, id: &EntityId) -> Option<EntityHit> {
        self.entities.get(id).map(|e| EntityHit {
            id: e.id.clone(),
            text: e.text.clone(),
            kind: e.kind,
        })
    }
}

#[async_trait]
impl GraphStore for MemoryGraph {
    async fn match_entities(
        &self,
        mentions: &[String],
        limit: usize,
    ) -> Result<Vec<EntityHit>, GraphError> {
        let lowered: Vec<String> = mentions.iter().map(|m| m.to_lowercase()).collect();
        let hits = self
            .entities
            .values()
            .filter(|e| {
                let text = e.text.to_lowercase();
                lowered.iter().any(|m| text.contains(m.as_str()))
            })
            .map(|e| EntityHit {
                id: e.id.clone(),
                text: e.text.clone(),
                kind: e.kind,
            })
            .take(limit)
            .collect();
        Ok(hits)
    }

    async fn documents_for_entities(
        &self,
        entity_ids: &[EntityId],
        limit: usize,
    ) -> Result<Vec<DocRef>, GraphError> {
        let wanted: BTreeSet<&EntityId> = entity_ids.iter().collect();
        let refs = self
            .docs
            .iter()
            .filter(|(_, entity_id)| wanted.contains(entity_id))
            .map(|(doc_id, entity_id)| DocRef {
                doc_id: doc_id.clone(),
                entity_id: entity_id.clone(),
            })
            .take(limit)
            .collect();
        Ok(refs)
    }

    async fn outgoing_neighbors(
        &self,
        entity_ids: &[EntityId],
        relations: &[RelationKind],
    ) -> Result<Vec<NeighborRow>, GraphError> {
        let sources: BTreeSet<&EntityId> = entity_ids.iter().collect();
        let wanted: BTreeSet<RelationKind> = relations.iter().copied().collect();

        let mut rows = Vec::new();
        for (source, relation, target) in &self.edges {
            if !sources.contains(source) || !wanted.contains(relation) {
                continue;
            }
            let neighbor = self.hit(target).ok_or_else(|| {
                GraphError::MalformedRow(format!("dangling edge target '{target}'"))
            })?;
            rows.push(NeighborRow {
                source_id: source.clone(),
                relation: *relation,
                neighbor,
            });
        }
        rows.sort_by(|a, b| {
            (&a.source_id, &a.neighbor.id, a.relation.as_str())
                .cmp(&(&b.source_id, &b.neighbor.id, b.relation.as_str()))
        });
        Ok(rows)
    }

    async fn ping(&self) -> Result<(), GraphError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (MemoryGraph, EntityId, EntityId, EntityId) {
        let mut g = MemoryGraph::new();
        let visa = g.add_entity("Skilled Worker visa", EntityKind::VisaCategory);
        let job = g.add_entity("Job offer", EntityKind::Requirement);
        let cos = g.add_entity("Certificate of Sponsorship", EntityKind::DocumentKind);
        g.relate(&visa, RelationKind::Requires, &job);
        g.relate(&job, RelationKind::SatisfiedBy, &cos);
        g.attach_document("chunk_001", &visa);
        g.attach_document("chunk_002", &job);
        (g, visa, job, cos)
    }

    #[tokio::test]
    async fn matching_is_case_insensitive_substring() {
        let (g, visa, _, _) = fixture();
        let hits = g
            .match_entities(&["skilled worker VISA".to_string()], 10)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, visa);

        let hits = g.match_entities(&["worker".to_string()], 10).await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn neighbors_follow_stored_direction_only() {
        let (g, visa, job, _) = fixture();

        let out = g
            .outgoing_neighbors(std::slice::from_ref(&visa), &RelationKind::TRAVERSAL)
            .await
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].relation, RelationKind::Requires);
        assert_eq!(out[0].neighbor.id, job);

        // The reverse direction must not come back.
        let back = g
            .outgoing_neighbors(std::slice::from_ref(&job), &[RelationKind::Requires])
            .await
            .unwrap();
        assert!(back.is_empty());
    }

    #[tokio::test]
    async fn documents_resolve_from_the_entity_side() {
        let (g, visa, job, cos) = fixture();
        let refs = g
            .documents_for_entities(&[visa, job, cos], 10)
            .await
            .unwrap();
        let docs: Vec<&str> = refs.iter().map(|r| r.doc_id.as_str()).collect();
        assert_eq!(docs, vec!["chunk_001", "chunk_002"]);
    }
}
