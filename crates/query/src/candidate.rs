use extract::RelationKind;
use serde::Serialize;

/// Which traversal strategy produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Direct,
    Expanded,
    Multihop,
}

impl Strategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::Direct => "direct",
            Strategy::Expanded => "expanded",
            Strategy::Multihop => "multihop",
        }
    }
}

/// One explainable traversal path that led to a document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathExplanation {
    pub document_id: String,
    pub strategy: Strategy,
    pub graph_score: f64,
    pub hop_count: usize,
    /// Entity display texts along the path, query match first.
    pub traversal_path: Vec<String>,
    pub relationship_types: Vec<RelationKind>,
}

/// Ephemeral per-query record produced by one strategy. Never persisted.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub doc_id: String,
    pub strategy: Strategy,
    pub raw_score: f64,
    pub hop_count: usize,
    pub entities: Vec<String>,
    pub relations: Vec<RelationKind>,
}

impl Candidate {
    pub fn explanation(&self) -> PathExplanation {
        PathExplanation {
            document_id: self.doc_id.clone(),
            strategy: self.strategy,
            graph_score: self.raw_score,
            hop_count: self.hop_count,
            traversal_path: self.entities.clone(),
            relationship_types: self.relations.clone(),
        }
    }
}

/// Merged output unit: one document with its strongest evidence and every
/// distinct path that reached it.
#[derive(Debug, Clone, Serialize)]
pub struct RankedResult {
    pub doc_id: String,
    pub score: f64,
    /// Minimum hop count over all contributing candidates.
    pub hop_count: usize,
    pub strategies: Vec<Strategy>,
    pub paths: Vec<PathExplanation>,
}
