//! Demo corpus seeding.
//!
//! A small curated set of green-tech marketing content: general items
//! for the content collection and high-scoring exemplars for the
//! brand-voice collection. `forge seed` loads it so search, analysis,
//! and generation have something real to work against out of the box.

use std::collections::BTreeMap;

use draftforge_core::error::EngineError;
use draftforge_core::models::{ContentItem, ContentType};

use crate::config::RetrievalConfig;
use crate::index::EmbeddingIndex;

fn item(
    id: &str,
    title: &str,
    text: &str,
    content_type: ContentType,
    tags: &[&str],
    author: &str,
    brand_voice_score: Option<f64>,
) -> ContentItem {
    let mut metadata = BTreeMap::new();
    metadata.insert("author".to_string(), serde_json::json!(author));
    ContentItem {
        id: id.to_string(),
        title: title.to_string(),
        text: text.to_string(),
        content_type,
        tags: tags.iter().map(|t| t.to_string()).collect(),
        metadata,
        brand_voice_score,
    }
}

/// General content corpus.
pub fn demo_content() -> Vec<ContentItem> {
    vec![
        item(
            "solar-roi-study",
            "Commercial Solar ROI: A Three-Year Study",
            "Our analysis of 120 commercial solar installations shows an average payback \
             period of 4.2 years, with operating-cost reductions of 32% in the first year. \
             The data demonstrates that mid-size manufacturers achieve the fastest returns, \
             driven by daytime-heavy load profiles. Schedule an assessment to model your \
             facility's numbers.",
            ContentType::BlogPost,
            &["solar", "roi", "case-study"],
            "maya",
            Some(0.91),
        ),
        item(
            "solar-install-guide",
            "What a Commercial Solar Installation Actually Involves",
            "From structural survey to grid interconnection, a commercial solar panel \
             installation runs eight to twelve weeks. This guide walks through permitting, \
             racking, inverter selection, and commissioning so facilities teams know what \
             to expect at every stage.",
            ContentType::BlogPost,
            &["solar", "installation", "guide"],
            "maya",
            Some(0.84),
        ),
        item(
            "storage-economics",
            "Battery Storage Economics for Peak Shaving",
            "Pairing storage with existing solar improves demand-charge savings by 18-25% \
             in our customer data. The research covers sizing strategy, degradation \
             assumptions, and the incentive landscape for commercial batteries.",
            ContentType::BlogPost,
            &["storage", "economics"],
            "elliot",
            Some(0.87),
        ),
        item(
            "heat-pump-social",
            "Heat Pumps Beat Gas on Cost",
            "Industrial heat pumps now undercut gas boilers on total cost of ownership in \
             most climates. The opportunity: 40% lower heating costs with a 5-year payback. \
             What's keeping your facility on gas? #Sustainability #Innovation",
            ContentType::SocialMedia,
            &["heat-pumps", "electrification"],
            "elliot",
            Some(0.82),
        ),
        item(
            "newsletter-incentives",
            "This Month in Clean Energy Incentives",
            "Three new commercial incentive programs opened this month. This newsletter \
             summarizes eligibility, deadlines, and stacking rules, with worked examples \
             showing how each changes project economics. Reply to get the full analysis \
             for your region.",
            ContentType::EmailNewsletter,
            &["incentives", "newsletter"],
            "maya",
            Some(0.88),
        ),
        item(
            "monitoring-product",
            "GridSight Energy Monitoring Platform",
            "GridSight gives facilities teams real-time visibility into consumption, \
             generation, and demand charges. Built for portfolios: roll up 200 sites into \
             one dashboard, set alerts on anomalies, and export auditor-ready reports.",
            ContentType::ProductDescription,
            &["monitoring", "product"],
            "priya",
            Some(0.79),
        ),
        item(
            "email-marketing-tips",
            "Email Marketing Tips for B2B Campaigns",
            "Subject lines under fifty characters, one clear call to action, and send-time \
             testing remain the highest-leverage tactics for B2B email campaigns. These \
             tips come from our last twelve months of campaign data.",
            ContentType::EmailNewsletter,
            &["email", "marketing"],
            "priya",
            None,
        ),
    ]
}

/// High-scoring brand-voice exemplars.
pub fn demo_brand_examples() -> Vec<ContentItem> {
    vec![
        item(
            "voice-flagship-post",
            "Why Sustainability Is an Operating Advantage",
            "Sustainable operations are not a branding exercise; they are a measurable \
             operating advantage. Our research across 300 facilities shows energy-efficient \
             retrofits delivering 28% cost reductions with proven, bankable returns. The \
             opportunity ahead: treat every kilowatt-hour as an investment decision.",
            ContentType::BlogPost,
            &["brand-voice", "sustainability"],
            "maya",
            Some(0.96),
        ),
        item(
            "voice-data-led",
            "The Numbers Behind Net-Zero Commitments",
            "Net-zero pledges succeed when they are built on data: baseline analysis, \
             quantified milestones, and transparent reporting. Our study of 85 corporate \
             programs demonstrates that measurable targets double delivery rates.",
            ContentType::BlogPost,
            &["brand-voice", "data"],
            "maya",
            Some(0.94),
        ),
        item(
            "voice-solution-social",
            "Your Roof Is an Asset",
            "Every flat commercial roof is an underused asset. Solar turns it into a \
             revenue line: proven technology, predictable returns, measurable impact. \
             Learn more about what your square footage could deliver.",
            ContentType::SocialMedia,
            &["brand-voice", "solar"],
            "elliot",
            Some(0.92),
        ),
        item(
            "voice-optimistic-email",
            "The Grid of 2030 Is Being Built Now",
            "The future grid is cleaner, smarter, and more resilient — and the buildout is \
             an opportunity for every facilities leader reading this. This issue covers \
             the growth areas where early movers achieve the strongest advantages.",
            ContentType::EmailNewsletter,
            &["brand-voice", "grid"],
            "priya",
            Some(0.9),
        ),
    ]
}

/// Create the configured collections and load the demo corpus.
///
/// Returns (content items written, brand exemplars written).
pub async fn seed(
    index: &EmbeddingIndex,
    retrieval: &RetrievalConfig,
) -> Result<(usize, usize), EngineError> {
    index
        .create_collection(&retrieval.content_collection)
        .await?;
    index.create_collection(&retrieval.brand_collection).await?;

    let content = demo_content();
    let content_report = index
        .upsert(&retrieval.content_collection, &content)
        .await?;

    let examples = demo_brand_examples();
    let brand_report = index
        .upsert(&retrieval.brand_collection, &examples)
        .await?;

    Ok((content_report.written, brand_report.written))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_corpus_ids_are_unique() {
        let mut ids: Vec<String> = demo_content()
            .iter()
            .chain(demo_brand_examples().iter())
            .map(|i| i.id.clone())
            .collect();
        let total = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), total);
    }

    #[test]
    fn brand_examples_all_clear_the_floor() {
        let floor = RetrievalConfig::default().brand_example_floor;
        for example in demo_brand_examples() {
            assert!(example.brand_voice_score.unwrap() >= floor);
        }
    }
}
