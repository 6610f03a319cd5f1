use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed set of node kinds the retrieval core understands.
///
/// Anything else coming back from the graph is a data error, not a new kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    VisaCategory,
    Requirement,
    DocumentKind,
    Organization,
    Country,
}

impl EntityKind {
    /// Tag stored in the graph's `type` property.
    pub fn tag(self) -> &'static str {
        match self {
            EntityKind::VisaCategory => "visa_category",
            EntityKind::Requirement => "requirement",
            EntityKind::DocumentKind => "document_kind",
            EntityKind::Organization => "organization",
            EntityKind::Country => "country",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "visa_category" => Some(EntityKind::VisaCategory),
            "requirement" => Some(EntityKind::Requirement),
            "document_kind" => Some(EntityKind::DocumentKind),
            "organization" => Some(EntityKind::Organization),
            "country" => Some(EntityKind::Country),
            _ => None,
        }
    }
}

/// Closed set of relationship kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationKind {
    Requires,
    SatisfiedBy,
    DependsOn,
    AppliesIf,
    CanTransitionTo,
    /// Document-containment edge: (Document)-[:CONTAINS_ENTITY]->(Entity).
    ContainsEntity,
}

impl RelationKind {
    /// Fixed, ordered set followed by relationship expansion and multi-hop
    /// traversal. Any change to the graph's relationship vocabulary has to
    /// be reflected here.
    pub const TRAVERSAL: [RelationKind; 5] = [
        RelationKind::Requires,
        RelationKind::SatisfiedBy,
        RelationKind::DependsOn,
        RelationKind::AppliesIf,
        RelationKind::CanTransitionTo,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RelationKind::Requires => "REQUIRES",
            RelationKind::SatisfiedBy => "SATISFIED_BY",
            RelationKind::DependsOn => "DEPENDS_ON",
            RelationKind::AppliesIf => "APPLIES_IF",
            RelationKind::CanTransitionTo => "CAN_TRANSITION_TO",
            RelationKind::ContainsEntity => "CONTAINS_ENTITY",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "REQUIRES" => Some(RelationKind::Requires),
            "SATISFIED_BY" => Some(RelationKind::SatisfiedBy),
            "DEPENDS_ON" => Some(RelationKind::DependsOn),
            "APPLIES_IF" => Some(RelationKind::AppliesIf),
            "CAN_TRANSITION_TO" => Some(RelationKind::CanTransitionTo),
            "CONTAINS_ENTITY" => Some(RelationKind::ContainsEntity),
            _ => None,
        }
    }

    /// Documented direction for each traversal kind as fixed configuration:
    /// `(source kind, target kind)`. Traversal always follows the stored
    /// direction of the edge, never the reverse.
    ///
    /// `ContainsEntity` is not a traversal kind (its source is a document,
    /// not an entity) and returns `None`.
    pub fn traversal_endpoints(self) -> Option<(EntityKind, EntityKind)> {
        match self {
            RelationKind::Requires => Some((EntityKind::VisaCategory, EntityKind::Requirement)),
            RelationKind::SatisfiedBy => Some((EntityKind::Requirement, EntityKind::DocumentKind)),
            RelationKind::DependsOn => Some((EntityKind::Requirement, EntityKind::Requirement)),
            RelationKind::AppliesIf => Some((EntityKind::VisaCategory, EntityKind::Country)),
            RelationKind::CanTransitionTo => {
                Some((EntityKind::VisaCategory, EntityKind::VisaCategory))
            }
            RelationKind::ContainsEntity => None,
        }
    }
}

/// Stable entity identifier, derived purely from normalized text and kind so
/// that re-extracting the same mention always yields the same id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn derive(text: &str, kind: EntityKind) -> Self {
        let slug = normalize(text).replace(' ', "_");
        EntityId(format!("{}:{}", kind.tag(), slug))
    }

    /// Wrap an identifier that already lives in the graph.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        EntityId(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalize entity text: lowercase, trim, strip punctuation, collapse runs
/// of whitespace to a single space.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_was_space = true;
    for c in text.trim().to_lowercase().chars() {
        if c.is_whitespace() {
            if !last_was_space {
                out.push(' ');
                last_was_space = true;
            }
        } else if c.is_alphanumeric() || c == '-' {
            out.push(c);
            last_was_space = false;
        }
        // other punctuation is dropped
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}

/// A typed span of text denoting a domain concept, as stored in the graph.
///
/// Created by the ingestion pipeline; read-only from the retrieval core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub text: String,
    pub kind: EntityKind,
    pub chunk_id: String,
    pub doc_id: String,
    pub created_at: DateTime<Utc>,
}

impl Entity {
    pub fn new(
        text: impl Into<String>,
        kind: EntityKind,
        chunk_id: impl Into<String>,
        doc_id: impl Into<String>,
    ) -> Self {
        let text = text.into();
        Self {
            id: EntityId::derive(&text, kind),
            text,
            kind,
            chunk_id: chunk_id.into(),
            doc_id: doc_id.into(),
            created_at: Utc::now(),
        }
    }
}

/// A candidate entity mention found in query text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mention {
    pub text: String,
    pub kind: EntityKind,
}

impl Mention {
    pub fn new(text: impl Into<String>, kind: EntityKind) -> Self {
        Self {
            text: text.into(),
            kind,
        }
    }
}
