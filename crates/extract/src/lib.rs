//! Query-time entity recognition.
//!
//! Extraction is pure text analysis: a statistical tagger (when configured)
//! followed by domain pattern rules, with case-insensitive deduplication
//! that preserves first-seen casing and order. No graph access happens here.

pub mod patterns;
pub mod schema;
pub mod tagger;

pub use schema::{Entity, EntityId, EntityKind, Mention, RelationKind, normalize};
pub use tagger::{EntityTagger, RemoteTagger, TaggedSpan};

use std::collections::HashSet;
use std::sync::Arc;

use tracing::warn;

pub struct Extractor {
    tagger: Option<Arc<dyn EntityTagger>>,
}

impl Extractor {
    /// Extractor that only applies domain pattern rules.
    pub fn pattern_only() -> Self {
        Self { tagger: None }
    }

    pub fn with_tagger(tagger: Arc<dyn EntityTagger>) -> Self {
        Self {
            tagger: Some(tagger),
        }
    }

    /// Extract candidate entity mentions from query text.
    ///
    /// Empty or whitespace-only text yields an empty list, not an error.
    /// A failing tagger degrades to pattern-only extraction.
    pub async fn extract(&self, query_text: &str) -> Vec<Mention> {
        if query_text.trim().is_empty() {
            return Vec::new();
        }

        let mut mentions: Vec<Mention> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut push = |mention: Mention, mentions: &mut Vec<Mention>| {
            let key = schema::normalize(&mention.text);
            if !key.is_empty() && seen.insert(key) {
                mentions.push(mention);
            }
        };

        if let Some(tagger) = &self.tagger {
            match tagger.tag(query_text).await {
                Ok(spans) => {
                    for span in spans {
                        if let Some(kind) = tagger::kind_for_label(&span.label) {
                            push(Mention::new(span.text, kind), &mut mentions);
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "statistical tagger unavailable, falling back to pattern rules");
                }
            }
        }

        for mention in patterns::pattern_mentions(query_text) {
            push(mention, &mut mentions);
        }

        mentions
    }
}
