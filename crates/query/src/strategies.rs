//! The three candidate-generation strategies.
//!
//! Each is read-only against the graph store and independent of the others;
//! the orchestrator runs them concurrently. Raw scores are fixed per
//! strategy: direct matches score highest, one-hop expansion strictly lower,
//! multi-hop decaying with distance.

use std::collections::{BTreeMap, BTreeSet};

use extract::{EntityId, Mention, RelationKind};
use graph::{GraphError, GraphStore};

use crate::candidate::{Candidate, Strategy};

pub const DIRECT_SCORE: f64 = 1.0;
pub const EXPANSION_SCORE: f64 = 0.8;
pub const MULTIHOP_BASE_SCORE: f64 = 0.6;

fn mention_texts(mentions: &[Mention]) -> Vec<String> {
    mentions.iter().map(|m| m.text.clone()).collect()
}

/// Direct entity search: mentions matched against entity display text, then
/// documents referencing the matched entities. No relationship traversal.
pub async fn direct_search(
    store: &dyn GraphStore,
    mentions: &[Mention],
    limit: usize,
) -> Result<Vec<Candidate>, GraphError> {
    if mentions.is_empty() {
        return Ok(Vec::new());
    }

    let hits = store.match_entities(&mention_texts(mentions), limit).await?;
    if hits.is_empty() {
        return Ok(Vec::new());
    }

    let text_by_id: BTreeMap<&EntityId, &str> =
        hits.iter().map(|h| (&h.id, h.text.as_str())).collect();
    let ids: Vec<EntityId> = hits.iter().map(|h| h.id.clone()).collect();
    let refs = store.documents_for_entities(&ids, limit).await?;

    let mut matched_by_doc: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for doc_ref in refs {
        if let Some(text) = text_by_id.get(&doc_ref.entity_id) {
            matched_by_doc
                .entry(doc_ref.doc_id)
                .or_default()
                .push((*text).to_string());
        }
    }

    Ok(matched_by_doc
        .into_iter()
        .map(|(doc_id, matched)| Candidate {
            doc_id,
            strategy: Strategy::Direct,
            raw_score: DIRECT_SCORE,
            hop_count: 0,
            entities: matched,
            relations: Vec::new(),
        })
        .collect())
}

/// Relationship expansion: exactly one directed hop from each matched entity
/// along the fixed relationship set, then documents referencing the
/// neighbors.
pub async fn relationship_expansion(
    store: &dyn GraphStore,
    mentions: &[Mention],
    limit: usize,
) -> Result<Vec<Candidate>, GraphError> {
    if mentions.is_empty() {
        return Ok(Vec::new());
    }

    let hits = store.match_entities(&mention_texts(mentions), limit).await?;
    if hits.is_empty() {
        return Ok(Vec::new());
    }

    let source_text: BTreeMap<EntityId, String> = hits
        .iter()
        .map(|h| (h.id.clone(), h.text.clone()))
        .collect();
    let ids: Vec<EntityId> = hits.iter().map(|h| h.id.clone()).collect();

    let rows = store.outgoing_neighbors(&ids, &RelationKind::TRAVERSAL).await?;
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let mut neighbor_ids: Vec<EntityId> = Vec::new();
    for row in &rows {
        if !neighbor_ids.contains(&row.neighbor.id) {
            neighbor_ids.push(row.neighbor.id.clone());
        }
    }
    let refs = store.documents_for_entities(&neighbor_ids, limit).await?;

    let mut docs_by_entity: BTreeMap<EntityId, Vec<String>> = BTreeMap::new();
    for doc_ref in refs {
        docs_by_entity
            .entry(doc_ref.entity_id)
            .or_default()
            .push(doc_ref.doc_id);
    }

    let mut candidates = Vec::new();
    for row in &rows {
        let Some(source) = source_text.get(&row.source_id) else {
            continue;
        };
        let Some(doc_ids) = docs_by_entity.get(&row.neighbor.id) else {
            continue;
        };
        for doc_id in doc_ids {
            candidates.push(Candidate {
                doc_id: doc_id.clone(),
                strategy: Strategy::Expanded,
                raw_score: EXPANSION_SCORE,
                hop_count: 1,
                entities: vec![source.clone(), row.neighbor.text.clone()],
                relations: vec![row.relation],
            });
        }
    }
    Ok(candidates)
}

/// Bounded breadth-first traversal from the matched entities.
///
/// BFS arrival order makes the first path to an entity its shortest, so a
/// later, longer path never overwrites it. The visited set doubles as the
/// cycle guard: immigration graphs do contain cycles (visa A can transition
/// to visa B and back), and the depth bound alone is not what terminates
/// them.
pub async fn multihop_traversal(
    store: &dyn GraphStore,
    mentions: &[Mention],
    max_depth: usize,
    limit: usize,
) -> Result<Vec<Candidate>, GraphError> {
    if mentions.is_empty() || max_depth == 0 {
        return Ok(Vec::new());
    }

    let hits = store.match_entities(&mention_texts(mentions), limit).await?;
    if hits.is_empty() {
        return Ok(Vec::new());
    }

    struct Arrival {
        hop: usize,
        entities: Vec<String>,
        relations: Vec<RelationKind>,
    }

    let mut visited: BTreeSet<EntityId> = hits.iter().map(|h| h.id.clone()).collect();
    let mut frontier: Vec<(EntityId, Vec<String>, Vec<RelationKind>)> = hits
        .iter()
        .map(|h| (h.id.clone(), vec![h.text.clone()], Vec::new()))
        .collect();
    let mut reached: BTreeMap<EntityId, Arrival> = BTreeMap::new();

    for hop in 1..=max_depth {
        if frontier.is_empty() {
            break;
        }
        let paths: BTreeMap<EntityId, (Vec<String>, Vec<RelationKind>)> = frontier
            .iter()
            .map(|(id, entities, relations)| (id.clone(), (entities.clone(), relations.clone())))
            .collect();
        let ids: Vec<EntityId> = frontier.iter().map(|(id, _, _)| id.clone()).collect();

        let rows = store.outgoing_neighbors(&ids, &RelationKind::TRAVERSAL).await?;

        let mut next = Vec::new();
        for row in rows {
            if visited.contains(&row.neighbor.id) {
                continue;
            }
            let Some((path_entities, path_relations)) = paths.get(&row.source_id) else {
                continue;
            };
            let mut entities = path_entities.clone();
            entities.push(row.neighbor.text.clone());
            let mut relations = path_relations.clone();
            relations.push(row.relation);

            visited.insert(row.neighbor.id.clone());
            reached.insert(
                row.neighbor.id.clone(),
                Arrival {
                    hop,
                    entities: entities.clone(),
                    relations: relations.clone(),
                },
            );
            next.push((row.neighbor.id, entities, relations));
        }
        frontier = next;
    }

    if reached.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<EntityId> = reached.keys().cloned().collect();
    let refs = store.documents_for_entities(&ids, limit).await?;

    let mut candidates = Vec::new();
    for doc_ref in refs {
        let Some(arrival) = reached.get(&doc_ref.entity_id) else {
            continue;
        };
        candidates.push(Candidate {
            doc_id: doc_ref.doc_id,
            strategy: Strategy::Multihop,
            raw_score: MULTIHOP_BASE_SCORE / arrival.hop as f64,
            hop_count: arrival.hop,
            entities: arrival.entities.clone(),
            relations: arrival.relations.clone(),
        });
    }
    Ok(candidates)
}
