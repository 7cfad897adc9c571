//! Specialized reasoning agents.
//!
//! Each agent performs one stateless sub-task within the generation
//! pipeline: [`strategy`] plans and drafts, [`brand`] scores voice
//! consistency, [`distribution`] adapts content per platform and
//! invokes publishing collaborators. The coordinator owns sequencing
//! and failure classification; agents only report their own outcome.

pub mod brand;
pub mod distribution;
pub mod strategy;

pub use brand::{BrandAnalysis, BrandConsistencyAgent};
pub use distribution::{DistributionAgent, PlatformPlan};
pub use strategy::{ContentStrategy, ContentStrategyAgent, Draft};
