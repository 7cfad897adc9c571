//! Distribution agent: per-platform adaptation and publish fan-out.
//!
//! Planning is deterministic — a platform specification table drives
//! length targets, format adjustments, hashtags, scheduling hints, and
//! a simple performance prediction. Execution delegates to external
//! [`PlatformClient`](crate::platforms::PlatformClient) collaborators,
//! capturing each branch's outcome independently so one platform's
//! failure never aborts the others.

use std::time::Duration;

use serde::Serialize;
use serde_json::json;
use tracing::warn;

use draftforge_core::models::{ContentType, Platform, PublishResult};

use crate::platforms::PlatformRegistry;

/// Hard platform constraints and presentation defaults.
#[derive(Debug, Clone, Copy)]
pub struct PlatformSpec {
    pub max_length: usize,
    pub optimal_length: usize,
    pub max_hashtags: usize,
}

/// Static specification table for the supported platforms.
pub fn platform_spec(platform: Platform) -> PlatformSpec {
    match platform {
        Platform::Twitter => PlatformSpec {
            max_length: 280,
            optimal_length: 200,
            max_hashtags: 3,
        },
        Platform::Linkedin => PlatformSpec {
            max_length: 3000,
            optimal_length: 1500,
            max_hashtags: 5,
        },
        Platform::Facebook => PlatformSpec {
            max_length: 2200,
            optimal_length: 500,
            max_hashtags: 3,
        },
        Platform::Email => PlatformSpec {
            max_length: 5000,
            optimal_length: 800,
            max_hashtags: 0,
        },
        Platform::Blog | Platform::Website => PlatformSpec {
            max_length: 20000,
            optimal_length: 4000,
            max_hashtags: 0,
        },
    }
}

/// Posting-cadence recommendation for a platform.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleHint {
    pub best_days: &'static str,
    pub best_times: &'static str,
    pub frequency: &'static str,
}

fn schedule_for(platform: Platform) -> ScheduleHint {
    match platform {
        Platform::Linkedin => ScheduleHint {
            best_days: "Tuesday-Thursday",
            best_times: "8-10 AM, 12-2 PM",
            frequency: "3-5 posts per week",
        },
        Platform::Twitter => ScheduleHint {
            best_days: "Monday-Friday",
            best_times: "9 AM, 12 PM, 3 PM",
            frequency: "1-3 posts per day",
        },
        Platform::Facebook => ScheduleHint {
            best_days: "Tuesday-Saturday",
            best_times: "9 AM, 1 PM",
            frequency: "1-2 posts per day",
        },
        Platform::Email => ScheduleHint {
            best_days: "Tuesday-Thursday",
            best_times: "10 AM, 2 PM",
            frequency: "weekly newsletter",
        },
        Platform::Blog | Platform::Website => ScheduleHint {
            best_days: "Monday-Friday",
            best_times: "business hours",
            frequency: "regular posting",
        },
    }
}

/// Deterministic engagement/conversion estimate for adapted content.
#[derive(Debug, Clone, Serialize)]
pub struct PerformancePrediction {
    pub engagement_rate: f64,
    pub conversion_rate: f64,
    pub has_data_points: bool,
    pub has_call_to_action: bool,
    pub optimal_length: bool,
}

fn predict_performance(content: &str, platform: Platform) -> PerformancePrediction {
    let (base_engagement, base_conversion) = match platform {
        Platform::Linkedin => (0.045, 0.034),
        Platform::Twitter => (0.063, 0.019),
        Platform::Facebook => (0.038, 0.021),
        Platform::Email => (0.185, 0.042),
        Platform::Blog | Platform::Website => (0.040, 0.025),
    };

    let has_data = content.chars().any(|c| c.is_ascii_digit());
    let lower = content.to_lowercase();
    let has_cta = ["contact", "learn more", "schedule", "reply"]
        .iter()
        .any(|phrase| lower.contains(phrase));
    let optimal = (200..=800).contains(&content.chars().count());

    let mut multiplier = 1.0;
    if has_data {
        multiplier += 0.15;
    }
    if has_cta {
        multiplier += 0.10;
    }
    if optimal {
        multiplier += 0.05;
    }

    PerformancePrediction {
        engagement_rate: base_engagement * multiplier,
        conversion_rate: base_conversion * multiplier,
        has_data_points: has_data,
        has_call_to_action: has_cta,
        optimal_length: optimal,
    }
}

/// Adaptation instructions for one platform.
#[derive(Debug, Clone, Serialize)]
pub struct PlatformPlan {
    pub platform: Platform,
    /// The content after platform length adaptation.
    pub adapted_content: String,
    pub target_length: usize,
    pub format_adjustments: Vec<String>,
    pub hashtags: Vec<String>,
    pub schedule: ScheduleHint,
    pub prediction: PerformancePrediction,
}

pub struct DistributionAgent {
    registry: PlatformRegistry,
    publish_timeout: Duration,
}

impl DistributionAgent {
    pub fn new(registry: PlatformRegistry, publish_timeout: Duration) -> Self {
        Self {
            registry,
            publish_timeout,
        }
    }

    /// Default platform selection for a content type, used when the
    /// request names none.
    pub fn default_platforms(content_type: ContentType) -> Vec<Platform> {
        match content_type {
            ContentType::BlogPost => vec![Platform::Blog, Platform::Linkedin, Platform::Email],
            ContentType::SocialMedia => {
                vec![Platform::Linkedin, Platform::Twitter, Platform::Facebook]
            }
            ContentType::EmailNewsletter => vec![Platform::Email],
            ContentType::ProductDescription => vec![Platform::Blog, Platform::Linkedin],
            ContentType::LandingPage => vec![Platform::Website],
        }
    }

    /// Produce per-platform adaptation instructions.
    pub fn plan_distribution(&self, content: &str, platforms: &[Platform]) -> Vec<PlatformPlan> {
        platforms
            .iter()
            .map(|&platform| {
                let spec = platform_spec(platform);
                let adapted = adapt_length(content, spec.max_length);
                PlatformPlan {
                    platform,
                    prediction: predict_performance(&adapted, platform),
                    target_length: spec.optimal_length,
                    format_adjustments: format_adjustments(platform, content),
                    hashtags: hashtags_for(platform, spec.max_hashtags),
                    schedule: schedule_for(platform),
                    adapted_content: adapted,
                }
            })
            .collect()
    }

    /// Publish each plan through its platform client.
    ///
    /// Fan-out with independent per-branch error capture: the result
    /// list always has one entry per plan, and a failed or missing
    /// client marks only its own entry.
    pub async fn execute_distribution(&self, plans: &[PlatformPlan]) -> Vec<PublishResult> {
        let mut results = Vec::with_capacity(plans.len());

        for plan in plans {
            let result = match self.registry.find(plan.platform) {
                None => PublishResult {
                    platform: plan.platform,
                    success: false,
                    error: Some(format!("no client registered for {}", plan.platform)),
                    metadata: json!({}),
                },
                Some(client) => {
                    match tokio::time::timeout(
                        self.publish_timeout,
                        client.publish(&plan.adapted_content),
                    )
                    .await
                    {
                        Ok(Ok(metadata)) => PublishResult {
                            platform: plan.platform,
                            success: true,
                            error: None,
                            metadata,
                        },
                        Ok(Err(e)) => PublishResult {
                            platform: plan.platform,
                            success: false,
                            error: Some(e.to_string()),
                            metadata: json!({}),
                        },
                        Err(_) => PublishResult {
                            platform: plan.platform,
                            success: false,
                            error: Some(format!(
                                "publish timed out after {}s",
                                self.publish_timeout.as_secs()
                            )),
                            metadata: json!({}),
                        },
                    }
                }
            };

            if let Some(error) = &result.error {
                warn!(platform = %plan.platform, error, "publish failed");
            }
            results.push(result);
        }

        results
    }
}

fn adapt_length(content: &str, max_length: usize) -> String {
    if content.chars().count() <= max_length {
        return content.to_string();
    }
    let prefix: String = content.chars().take(max_length.saturating_sub(1)).collect();
    format!("{}…", prefix.trim_end())
}

fn format_adjustments(platform: Platform, content: &str) -> Vec<String> {
    match platform {
        Platform::Twitter => {
            let mut adjustments = vec!["Lead with a compelling hook".to_string()];
            if content.chars().count() > 280 {
                adjustments.push("Split into a thread of linked posts".to_string());
            }
            adjustments
        }
        Platform::Linkedin => vec![
            "Professional tone with business focus".to_string(),
            "Add a call-to-action for engagement".to_string(),
        ],
        Platform::Facebook => vec![
            "Community-focused language".to_string(),
            "Include a question to drive engagement".to_string(),
        ],
        Platform::Email => vec![
            "Add a subject line under 50 characters".to_string(),
            "Expand with additional context and resources".to_string(),
        ],
        Platform::Blog | Platform::Website => {
            vec!["Structure with headers for readability".to_string()]
        }
    }
}

fn hashtags_for(platform: Platform, max: usize) -> Vec<String> {
    let pool: &[&str] = match platform {
        Platform::Twitter => &["#GreenTech", "#Sustainability", "#CleanEnergy"],
        Platform::Linkedin => &["#Sustainability", "#BusinessStrategy", "#Innovation"],
        Platform::Facebook => &["#Sustainability", "#GreenBusiness"],
        _ => &[],
    };
    pool.iter().take(max).map(|s| s.to_string()).collect()
}
