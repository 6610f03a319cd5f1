//! Pluggable statistical named-entity tagger.
//!
//! The core only depends on the [`EntityTagger`] trait; the concrete model
//! lives behind an HTTP endpoint and can be swapped without touching the
//! entity data model or its identifier derivation.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::schema::EntityKind;

/// NER labels the retrieval core cares about. Everything else the model
/// emits is discarded before graph matching.
pub const LABEL_WHITELIST: &[&str] = &["ORG", "GPE", "LOC", "DATE", "MONEY"];

/// A labeled span produced by the statistical model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaggedSpan {
    pub text: String,
    pub label: String,
}

/// Map a whitelisted NER label onto the closed entity-kind set.
///
/// Dates and monetary amounts only matter as requirement values (maintenance
/// funds, deadlines), so both map to `Requirement`.
pub fn kind_for_label(label: &str) -> Option<EntityKind> {
    match label {
        "ORG" => Some(EntityKind::Organization),
        "GPE" | "LOC" => Some(EntityKind::Country),
        "DATE" | "MONEY" => Some(EntityKind::Requirement),
        _ => None,
    }
}

#[async_trait]
pub trait EntityTagger: Send + Sync {
    /// Tag free text, returning labeled spans in text order.
    async fn tag(&self, text: &str) -> Result<Vec<TaggedSpan>>;
}

/// Tagger backed by a remote NER service.
#[derive(Clone)]
pub struct RemoteTagger {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct TagRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct TagResponse {
    spans: Vec<TaggedSpan>,
}

impl RemoteTagger {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl EntityTagger for RemoteTagger {
    async fn tag(&self, text: &str) -> Result<Vec<TaggedSpan>> {
        let url = format!("{}/tag", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&TagRequest { text })
            .send()
            .await
            .context("Failed to send request to NER service")?;

        if !response.status().is_success() {
            anyhow::bail!("NER service request failed: {}", response.status());
        }

        let tagged: TagResponse = response
            .json()
            .await
            .context("Failed to parse NER service response")?;

        Ok(tagged.spans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitelist_labels_map_to_kinds() {
        for label in LABEL_WHITELIST {
            assert!(kind_for_label(label).is_some(), "label {label} has no kind");
        }
    }

    #[test]
    fn irrelevant_labels_are_discarded() {
        assert_eq!(kind_for_label("PERSON"), None);
        assert_eq!(kind_for_label("CARDINAL"), None);
    }
}
