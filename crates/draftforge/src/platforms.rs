//! Publishing client trait and registry.
//!
//! Actual platform integrations (WordPress, LinkedIn, mail providers)
//! live outside this engine; the [`PlatformClient`] trait is the
//! boundary the distribution agent invokes. A configurable in-process
//! [`SimulatedClient`] ships for demos and tests.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

use draftforge_core::models::Platform;

/// A publishing destination the distribution agent can invoke.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// The platform this client publishes to.
    fn platform(&self) -> Platform;

    /// Publish adapted content. Returns platform-specific metadata
    /// (post id, URL, scheduling info) on success.
    async fn publish(&self, content: &str) -> Result<Value>;
}

/// Registry of publishing clients, one per platform.
pub struct PlatformRegistry {
    clients: Vec<Box<dyn PlatformClient>>,
}

impl PlatformRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            clients: Vec::new(),
        }
    }

    /// Create a registry with simulated clients for every platform.
    pub fn simulated() -> Self {
        let mut registry = Self::new();
        for platform in [
            Platform::Linkedin,
            Platform::Twitter,
            Platform::Facebook,
            Platform::Email,
            Platform::Blog,
            Platform::Website,
        ] {
            registry.register(Box::new(SimulatedClient::new(platform)));
        }
        registry
    }

    /// Register a client.
    pub fn register(&mut self, client: Box<dyn PlatformClient>) {
        self.clients.push(client);
    }

    /// Find a client by platform.
    pub fn find(&self, platform: Platform) -> Option<&dyn PlatformClient> {
        self.clients
            .iter()
            .find(|c| c.platform() == platform)
            .map(|c| c.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }
}

impl Default for PlatformRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// In-process client that acknowledges publishes without any network
/// call. `failing()` builds one that always errors, for exercising the
/// fan-out's per-branch error capture.
pub struct SimulatedClient {
    platform: Platform,
    fail: bool,
}

impl SimulatedClient {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            fail: false,
        }
    }

    pub fn failing(platform: Platform) -> Self {
        Self {
            platform,
            fail: true,
        }
    }
}

#[async_trait]
impl PlatformClient for SimulatedClient {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn publish(&self, content: &str) -> Result<Value> {
        if self.fail {
            anyhow::bail!("{} rejected the publish request", self.platform);
        }
        Ok(json!({
            "post_id": format!("sim-{}-{}", self.platform, content.len()),
            "characters": content.len(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_finds_by_platform() {
        let registry = PlatformRegistry::simulated();
        assert_eq!(registry.len(), 6);
        assert!(registry.find(Platform::Twitter).is_some());

        let empty = PlatformRegistry::new();
        assert!(empty.find(Platform::Twitter).is_none());
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn simulated_client_success_and_failure() {
        let ok = SimulatedClient::new(Platform::Blog);
        let meta = ok.publish("hello").await.unwrap();
        assert_eq!(meta["characters"], 5);

        let bad = SimulatedClient::failing(Platform::Blog);
        assert!(bad.publish("hello").await.is_err());
    }
}
