//! Neo4j-backed implementation of the graph store contract.

use async_trait::async_trait;
use neo4rs::{ConfigBuilder, Graph, Query};
use serde::{Deserialize, Serialize};

use extract::{EntityId, EntityKind, RelationKind};

use crate::error::GraphError;
use crate::queries;
use crate::retry::{RetryConfig, RetryPolicy};
use crate::store::{DocRef, EntityHit, GraphStore, NeighborRow};

/// Connection settings for the graph database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub database: String,
    /// Bounded pool, sized independently of request concurrency.
    pub max_connections: usize,
    pub fetch_size: usize,
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password: "neo4j".to_string(),
            database: "neo4j".to_string(),
            max_connections: 8,
            fetch_size: 200,
            retry: RetryConfig::default(),
        }
    }
}

/// Read-only client over the external graph database.
pub struct Neo4jStore {
    graph: Graph,
    retry: RetryPolicy,
}

impl Neo4jStore {
    /// Connect and verify the connection.
    ///
    /// neo4rs pools lazily: building the `Graph` does not establish a bolt
    /// connection, so we ping immediately to fail fast when the database is
    /// unreachable instead of hanging on the first real query.
    pub async fn connect(config: &GraphConfig) -> Result<Self, GraphError> {
        let neo4j_config = ConfigBuilder::default()
            .uri(&config.uri)
            .user(&config.user)
            .password(&config.password)
            .db(config.database.as_str())
            .max_connections(config.max_connections)
            .fetch_size(config.fetch_size)
            .build()
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        let graph = Graph::connect(neo4j_config)
            .await
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        graph
            .run(Query::new(queries::PING.to_string()))
            .await
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        Ok(Self {
            graph,
            retry: RetryPolicy::new(&config.retry),
        })
    }

    /// Execute a query expression and collect its rows, retrying transient
    /// failures within the configured budget.
    async fn run_query<B>(&self, name: &str, build: B) -> Result<Vec<neo4rs::Row>, GraphError>
    where
        B: Fn() -> Query,
    {
        self.retry
            .retry_if(
                name,
                || async {
                    let mut result = self
                        .graph
                        .execute(build())
                        .await
                        .map_err(|e| GraphError::QueryFailed(e.to_string()))?;

                    let mut rows = Vec::new();
                    while let Some(row) = result
                        .next()
                        .await
                        .map_err(|e| GraphError::QueryFailed(e.to_string()))?
                    {
                        rows.push(row);
                    }
                    Ok(rows)
                },
                GraphError::is_retryable,
            )
            .await
    }
}

fn get_string(row: &neo4rs::Row, field: &str) -> Result<String, GraphError> {
    row.get::<String>(field)
        .map_err(|_| GraphError::MalformedRow(format!("missing field '{field}'")))
}

fn entity_hit(row: &neo4rs::Row, id_field: &str, text_field: &str, kind_field: &str) -> Result<EntityHit, GraphError> {
    let kind_tag = get_string(row, kind_field)?;
    let kind = EntityKind::from_tag(&kind_tag)
        .ok_or_else(|| GraphError::MalformedRow(format!("unknown entity kind '{kind_tag}'")))?;
    Ok(EntityHit {
        id: EntityId::from_raw(get_string(row, id_field)?),
        text: get_string(row, text_field)?,
        kind,
    })
}

#[async_trait]
impl GraphStore for Neo4jStore {
    async fn match_entities(
        &self,
        mentions: &[String],
        limit: usize,
    ) -> Result<Vec<EntityHit>, GraphError> {
        if mentions.is_empty() {
            return Ok(Vec::new());
        }

        let rows = self
            .run_query("match_entities", || {
                Query::new(queries::MATCH_ENTITIES.to_string())
                    .param("mentions", mentions.to_vec())
                    .param("limit", limit as i64)
            })
            .await?;

        rows.iter()
            .map(|row| entity_hit(row, "id", "text", "kind"))
            .collect()
    }

    async fn documents_for_entities(
        &self,
        entity_ids: &[EntityId],
        limit: usize,
    ) -> Result<Vec<DocRef>, GraphError> {
        if entity_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<String> = entity_ids.iter().map(|id| id.as_str().to_string()).collect();

        let rows = self
            .run_query("documents_for_entities", || {
                Query::new(queries::DOCUMENTS_FOR_ENTITIES.to_string())
                    .param("entity_ids", ids.clone())
                    .param("limit", limit as i64)
            })
            .await?;

        rows.iter()
            .map(|row| {
                Ok(DocRef {
                    doc_id: get_string(row, "doc_id")?,
                    entity_id: EntityId::from_raw(get_string(row, "entity_id")?),
                })
            })
            .collect()
    }

    async fn outgoing_neighbors(
        &self,
        entity_ids: &[EntityId],
        relations: &[RelationKind],
    ) -> Result<Vec<NeighborRow>, GraphError> {
        if entity_ids.is_empty() || relations.is_empty() {
            return Ok(Vec::new());
        }
        let cypher = queries::outgoing_neighbors(relations);
        let ids: Vec<String> = entity_ids.iter().map(|id| id.as_str().to_string()).collect();

        let rows = self
            .run_query("outgoing_neighbors", || {
                Query::new(cypher.clone()).param("entity_ids", ids.clone())
            })
            .await?;

        rows.iter()
            .map(|row| {
                let relation_name = get_string(row, "relation")?;
                let relation = RelationKind::from_str(&relation_name).ok_or_else(|| {
                    GraphError::MalformedRow(format!("unknown relationship type '{relation_name}'"))
                })?;
                Ok(NeighborRow {
                    source_id: EntityId::from_raw(get_string(row, "source_id")?),
                    relation,
                    neighbor: entity_hit(row, "neighbor_id", "neighbor_text", "neighbor_kind")?,
                })
            })
            .collect()
    }

    async fn ping(&self) -> Result<(), GraphError> {
        self.graph
            .run(Query::new(queries::PING.to_string()))
            .await
            .map_err(|e| GraphError::Connection(e.to_string()))
    }
}
