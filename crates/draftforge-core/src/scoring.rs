//! Retrieval scoring: hybrid merging, explanations, diversification.
//!
//! Everything in this module is a deterministic pure function of its
//! inputs. Relevance explanations in particular are templated from the
//! score band, overlapping terms, and item metadata — never produced by
//! a generation call — so retrieval stays side-effect-free and safely
//! repeatable within one orchestration run.
//!
//! # Hybrid Scoring
//!
//! 1. Compute the semantic similarity in `[0, 1]` per candidate.
//! 2. Compute a normalized keyword-overlap score (body-weighted 0.7,
//!    title-weighted 0.3).
//! 3. Merge: `score = semantic_weight × semantic + keyword_weight ×
//!    keyword`, with the weights normalized to sum to 1.
//! 4. Sort by score (desc), id (asc) for deterministic ties.

use std::collections::BTreeSet;

use crate::models::{ContentItem, RetrievalResult};

/// Human-readable label for a similarity score.
pub fn score_band(similarity: f64) -> &'static str {
    if similarity > 0.9 {
        "very high semantic similarity"
    } else if similarity > 0.8 {
        "high semantic similarity"
    } else if similarity > 0.7 {
        "good semantic similarity"
    } else {
        "moderate semantic similarity"
    }
}

fn terms(text: &str) -> BTreeSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 1)
        .map(|t| t.to_string())
        .collect()
}

/// Terms shared between a query and an item, in sorted order.
pub fn shared_terms(query: &str, item: &ContentItem) -> Vec<String> {
    let query_terms = terms(query);
    let mut item_terms = terms(&item.text);
    item_terms.extend(terms(&item.title));
    query_terms.intersection(&item_terms).cloned().collect()
}

/// Normalized keyword-overlap score in `[0, 1]`.
///
/// Fraction of query terms present in the body (weight 0.7) and in the
/// title (weight 0.3). Returns 0 for an empty query.
pub fn keyword_overlap(query: &str, item: &ContentItem) -> f64 {
    let query_terms = terms(query);
    if query_terms.is_empty() {
        return 0.0;
    }
    let body_terms = terms(&item.text);
    let title_terms = terms(&item.title);

    let body_hits = query_terms.iter().filter(|t| body_terms.contains(*t)).count();
    let title_hits = query_terms
        .iter()
        .filter(|t| title_terms.contains(*t))
        .count();

    let n = query_terms.len() as f64;
    (body_hits as f64 / n) * 0.7 + (title_hits as f64 / n) * 0.3
}

/// Weighted semantic + keyword merge.
///
/// Callers are expected to pass weights that sum to 1; anything else is
/// normalized here rather than rejected.
pub fn combine_hybrid(
    semantic: f64,
    keyword: f64,
    semantic_weight: f64,
    keyword_weight: f64,
) -> f64 {
    let total = semantic_weight + keyword_weight;
    let (sw, kw) = if total > f64::EPSILON {
        (semantic_weight / total, keyword_weight / total)
    } else {
        (0.5, 0.5)
    };
    sw * semantic + kw * keyword
}

/// Templated relevance explanation for a retrieval hit.
///
/// Deterministic given the query, item, and score: band, up to three
/// shared terms (sorted), content type, and a brand-alignment note when
/// the stored score warrants one.
pub fn relevance_explanation(query: &str, item: &ContentItem, similarity: f64) -> String {
    let mut parts: Vec<String> = vec![score_band(similarity).to_string()];

    let shared = shared_terms(query, item);
    if !shared.is_empty() {
        let sample: Vec<&str> = shared.iter().take(3).map(|s| s.as_str()).collect();
        parts.push(format!("shared terms: {}", sample.join(", ")));
    }

    parts.push(format!("content type: {}", item.content_type));

    if let Some(score) = item.brand_voice_score {
        if score > 0.8 {
            parts.push("strong brand voice alignment".to_string());
        } else if score > 0.6 {
            parts.push("good brand voice alignment".to_string());
        }
    }

    format!(
        "Relevant due to {} (score: {:.3})",
        parts.join(", "),
        similarity
    )
}

fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count() as f64;
    let union = a.union(b).count() as f64;
    intersection / union
}

/// How much two items duplicate each other, in `[0, 1]`.
///
/// Equal blend of title-term and tag overlap; near-identical titles or
/// tag sets push this toward 1.
pub fn duplication(a: &ContentItem, b: &ContentItem) -> f64 {
    let title_overlap = jaccard(&terms(&a.title), &terms(&b.title));
    let tags_a: BTreeSet<String> = a.tags.iter().map(|t| t.to_lowercase()).collect();
    let tags_b: BTreeSet<String> = b.tags.iter().map(|t| t.to_lowercase()).collect();
    let tag_overlap = jaccard(&tags_a, &tags_b);
    (title_overlap + tag_overlap) / 2.0
}

/// Greedy result diversification.
///
/// Re-ranks `candidates` (assumed sorted descending by score) so the
/// final set of `k` is not dominated by near-identical items: each round
/// picks the candidate with the highest score discounted by its worst
/// duplication against already-selected items. Ties break by id.
pub fn diversify(candidates: Vec<RetrievalResult>, k: usize) -> Vec<RetrievalResult> {
    if candidates.len() <= 1 {
        return candidates;
    }

    let mut remaining = candidates;
    let mut selected: Vec<RetrievalResult> = Vec::with_capacity(k);

    while selected.len() < k && !remaining.is_empty() {
        let mut best_idx = 0;
        let mut best_adjusted = f64::NEG_INFINITY;

        for (i, cand) in remaining.iter().enumerate() {
            let max_dup = selected
                .iter()
                .map(|s| duplication(&cand.content, &s.content))
                .fold(0.0f64, f64::max);
            let adjusted = cand.similarity_score * (1.0 - 0.5 * max_dup);
            let better = adjusted > best_adjusted + f64::EPSILON
                || ((adjusted - best_adjusted).abs() <= f64::EPSILON
                    && cand.content.id < remaining[best_idx].content.id);
            if better {
                best_adjusted = adjusted;
                best_idx = i;
            }
        }

        selected.push(remaining.remove(best_idx));
    }

    selected
}

/// Sort hits descending by score, ascending by id on ties.
pub fn sort_results(results: &mut [RetrievalResult]) {
    results.sort_by(|a, b| {
        b.similarity_score
            .partial_cmp(&a.similarity_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.content.id.cmp(&b.content.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContentType;

    fn make_item(id: &str, title: &str, text: &str, tags: &[&str]) -> ContentItem {
        ContentItem {
            id: id.to_string(),
            title: title.to_string(),
            text: text.to_string(),
            content_type: ContentType::BlogPost,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            metadata: Default::default(),
            brand_voice_score: None,
        }
    }

    fn make_result(item: ContentItem, score: f64) -> RetrievalResult {
        RetrievalResult {
            content: item,
            similarity_score: score,
            relevance_explanation: String::new(),
            matched_collection: "content".into(),
        }
    }

    #[test]
    fn test_score_bands() {
        assert_eq!(score_band(0.95), "very high semantic similarity");
        assert_eq!(score_band(0.85), "high semantic similarity");
        assert_eq!(score_band(0.75), "good semantic similarity");
        assert_eq!(score_band(0.4), "moderate semantic similarity");
    }

    #[test]
    fn test_keyword_overlap_full_match() {
        let item = make_item("a", "Solar panel costs", "Solar panel costs explained", &[]);
        let overlap = keyword_overlap("solar panel costs", &item);
        assert!((overlap - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_keyword_overlap_disjoint() {
        let item = make_item("a", "Email tips", "Newsletter subject lines", &[]);
        assert_eq!(keyword_overlap("solar panels", &item), 0.0);
    }

    #[test]
    fn test_keyword_overlap_empty_query() {
        let item = make_item("a", "Title", "Body", &[]);
        assert_eq!(keyword_overlap("", &item), 0.0);
    }

    #[test]
    fn test_combine_hybrid_normalizes_weights() {
        // Weights 6 + 4 behave like 0.6 + 0.4.
        let a = combine_hybrid(1.0, 0.0, 6.0, 4.0);
        let b = combine_hybrid(1.0, 0.0, 0.6, 0.4);
        assert!((a - b).abs() < 1e-9);
        assert!((a - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_combine_hybrid_zero_weights_fall_back_to_even() {
        let score = combine_hybrid(0.8, 0.4, 0.0, 0.0);
        assert!((score - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_explanation_is_deterministic() {
        let item = make_item("a", "Solar ROI", "Commercial solar ROI data", &[]);
        let e1 = relevance_explanation("solar roi analysis", &item, 0.83);
        let e2 = relevance_explanation("solar roi analysis", &item, 0.83);
        assert_eq!(e1, e2);
        assert!(e1.contains("high semantic similarity"));
        assert!(e1.contains("roi"));
        assert!(e1.contains("0.830"));
    }

    #[test]
    fn test_explanation_notes_brand_alignment() {
        let mut item = make_item("a", "Solar ROI", "Commercial solar ROI data", &[]);
        item.brand_voice_score = Some(0.92);
        let e = relevance_explanation("solar", &item, 0.75);
        assert!(e.contains("strong brand voice alignment"));
    }

    #[test]
    fn test_duplication_identical_vs_distinct() {
        let a = make_item("a", "Solar panel costs", "x", &["solar", "costs"]);
        let b = make_item("b", "Solar panel costs", "y", &["solar", "costs"]);
        let c = make_item("c", "Email marketing tips", "z", &["email"]);
        assert!((duplication(&a, &b) - 1.0).abs() < 1e-9);
        assert_eq!(duplication(&a, &c), 0.0);
    }

    #[test]
    fn test_diversify_demotes_near_duplicates() {
        let near_dup_1 = make_result(
            make_item("a", "Solar panel costs", "x", &["solar"]),
            0.95,
        );
        let near_dup_2 = make_result(
            make_item("b", "Solar panel costs", "y", &["solar"]),
            0.94,
        );
        let distinct = make_result(
            make_item("c", "Wind turbine maintenance", "z", &["wind"]),
            0.80,
        );

        let out = diversify(vec![near_dup_1, near_dup_2, distinct], 2);
        let ids: Vec<&str> = out.iter().map(|r| r.content.id.as_str()).collect();
        // 0.94 × (1 − 0.5) = 0.47 < 0.80, so the distinct item wins slot 2.
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_diversify_keeps_order_without_duplicates() {
        let r1 = make_result(make_item("a", "Alpha topic", "x", &["a"]), 0.9);
        let r2 = make_result(make_item("b", "Beta subject", "y", &["b"]), 0.8);
        let out = diversify(vec![r1, r2], 2);
        let ids: Vec<&str> = out.iter().map(|r| r.content.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_sort_results_ties_break_by_id() {
        let mut results = vec![
            make_result(make_item("b", "t", "x", &[]), 0.8),
            make_result(make_item("a", "t", "x", &[]), 0.8),
            make_result(make_item("c", "t", "x", &[]), 0.9),
        ];
        sort_results(&mut results);
        let ids: Vec<&str> = results.iter().map(|r| r.content.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }
}
