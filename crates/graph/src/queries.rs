//! Cypher text for the read-only retrieval queries.
//!
//! Relationship types cannot be parameterized in Cypher, so the neighbor
//! query is built from the closed [`RelationKind`] set; no caller-controlled
//! string ever reaches the query text. Every query carries an ORDER BY so
//! results are deterministic across runs.

use extract::RelationKind;

pub const PING: &str = "RETURN 1";

/// Case-insensitive substring match of mentions against entity display text.
pub const MATCH_ENTITIES: &str = "\
UNWIND $mentions AS mention
MATCH (e:Entity)
WHERE toLower(e.text) CONTAINS toLower(mention)
RETURN DISTINCT e.id AS id, e.text AS text, e.type AS kind
ORDER BY id
LIMIT $limit";

/// Documents referencing the given entities via containment edges.
pub const DOCUMENTS_FOR_ENTITIES: &str = "\
MATCH (d:Document)-[:CONTAINS_ENTITY]->(e:Entity)
WHERE e.id IN $entity_ids
RETURN DISTINCT d.id AS doc_id, e.id AS entity_id
ORDER BY doc_id, entity_id
LIMIT $limit";

/// One directed hop along the given relationship kinds.
pub fn outgoing_neighbors(relations: &[RelationKind]) -> String {
    let types: Vec<&str> = relations.iter().map(|r| r.as_str()).collect();
    format!(
        "MATCH (e:Entity)-[r:{}]->(n:Entity)\n\
         WHERE e.id IN $entity_ids\n\
         RETURN e.id AS source_id, type(r) AS relation,\n\
                n.id AS neighbor_id, n.text AS neighbor_text, n.type AS neighbor_kind\n\
         ORDER BY source_id, neighbor_id, relation",
        types.join("|")
    )
}
