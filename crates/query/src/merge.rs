//! Merges the raw candidate lists from all strategies into one ranking.

use std::collections::BTreeMap;

use crate::candidate::{Candidate, PathExplanation, RankedResult, Strategy};

/// Group candidates by document, score each document by its strongest
/// evidence, and order deterministically.
///
/// The merged score is the maximum raw score, not a sum: a document
/// reachable both directly and via a weak multi-hop path ranks by its best
/// path, never inflated by redundant weak ones. Ties break by lower minimum
/// hop count, then document id, so repeated runs over an unchanged graph
/// produce identical output.
pub fn merge_and_rank(
    candidates: impl IntoIterator<Item = Candidate>,
    top_k: usize,
) -> Vec<RankedResult> {
    struct Accum {
        score: f64,
        min_hop: usize,
        strategies: Vec<Strategy>,
        paths: Vec<PathExplanation>,
    }

    let mut by_doc: BTreeMap<String, Accum> = BTreeMap::new();
    for candidate in candidates {
        let explanation = candidate.explanation();
        let acc = by_doc
            .entry(candidate.doc_id.clone())
            .or_insert_with(|| Accum {
                score: f64::NEG_INFINITY,
                min_hop: usize::MAX,
                strategies: Vec::new(),
                paths: Vec::new(),
            });
        acc.score = acc.score.max(candidate.raw_score);
        acc.min_hop = acc.min_hop.min(candidate.hop_count);
        if !acc.strategies.contains(&candidate.strategy) {
            acc.strategies.push(candidate.strategy);
        }
        if !acc.paths.contains(&explanation) {
            acc.paths.push(explanation);
        }
    }

    let mut results: Vec<RankedResult> = by_doc
        .into_iter()
        .map(|(doc_id, acc)| RankedResult {
            doc_id,
            score: acc.score,
            hop_count: acc.min_hop,
            strategies: acc.strategies,
            paths: acc.paths,
        })
        .collect();

    results.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.hop_count.cmp(&b.hop_count))
            .then_with(|| a.doc_id.cmp(&b.doc_id))
    });
    results.truncate(top_k);
    results
}
