//! Agent card discovery
//!
//! Each agent publishes a card at `<base>/.well-known/agent-card.json` naming its
//! streaming task endpoint. Cards are fetched once per base address and kept for
//! the lifetime of the cache.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use url::Url;

use super::error::DiscoveryError;

/// Well-known location of the card, relative to the agent base address.
pub const AGENT_CARD_PATH: &str = ".well-known/agent-card.json";

/// Agent descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCard {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub endpoints: AgentEndpoints,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentEndpoints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub send_subscribe: Option<String>,
}

impl AgentCard {
    /// The streaming task endpoint, validated as an absolute URL
    pub fn send_subscribe_url(&self) -> Result<Url, String> {
        let endpoint = self
            .endpoints
            .send_subscribe
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| "no sendSubscribe endpoint".to_string())?;

        Url::parse(endpoint).map_err(|e| format!("sendSubscribe endpoint {endpoint:?}: {e}"))
    }
}

/// Card URL for an agent base address
pub fn card_url(base_address: &str) -> Result<Url, url::ParseError> {
    let mut base = Url::parse(base_address)?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(AGENT_CARD_PATH)
}

/// Process-wide card cache keyed by base address.
///
/// No invalidation: a card is fetched at most once per address, except when two
/// first lookups race, in which case both fetch and the last one is kept.
#[derive(Clone)]
pub struct CardCache {
    http: reqwest::Client,
    cards: Arc<Mutex<HashMap<String, AgentCard>>>,
}

impl CardCache {
    pub fn new(http: reqwest::Client) -> Self {
        CardCache {
            http,
            cards: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Cached card, if any
    pub fn cached(&self, base_address: &str) -> Option<AgentCard> {
        self.cards
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(base_address)
            .cloned()
    }

    /// Resolve the card for `base_address`, fetching it on first use.
    pub async fn get(&self, base_address: &str) -> Result<AgentCard, DiscoveryError> {
        if let Some(card) = self.cached(base_address) {
            return Ok(card);
        }

        let card = self.fetch(base_address).await?;
        self.cards
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(base_address.to_string(), card.clone());
        Ok(card)
    }

    async fn fetch(&self, base_address: &str) -> Result<AgentCard, DiscoveryError> {
        let url = card_url(base_address).map_err(|source| DiscoveryError::InvalidAddress {
            address: base_address.to_string(),
            source,
        })?;
        let transport = |source| DiscoveryError::Transport {
            address: base_address.to_string(),
            source,
        };

        ::log::info!("[A2A] Fetching agent card {url}");
        let response = self.http.get(url).send().await.map_err(transport)?;

        if !response.status().is_success() {
            return Err(DiscoveryError::Status {
                address: base_address.to_string(),
                status: response.status().as_u16(),
            });
        }

        let card: AgentCard = response.json().await.map_err(transport)?;
        card.send_subscribe_url()
            .map_err(|reason| DiscoveryError::InvalidCard {
                address: base_address.to_string(),
                reason,
            })?;

        ::log::info!(
            "[A2A] Discovered agent {} v{} at {base_address}",
            card.name,
            card.version
        );
        Ok(card)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_url() {
        assert_eq!(
            card_url("http://localhost:3001").unwrap().as_str(),
            "http://localhost:3001/.well-known/agent-card.json"
        );
        assert_eq!(
            card_url("http://host/agents/weather").unwrap().as_str(),
            "http://host/agents/weather/.well-known/agent-card.json"
        );
        assert!(card_url("not a url").is_err());
    }

    #[test]
    fn test_send_subscribe_validation() {
        let card: AgentCard = serde_json::from_str(
            r#"{"name": "weather", "version": "1.0", "endpoints": {"sendSubscribe": "http://localhost:3001/a2a/sendSubscribe"}}"#,
        )
        .unwrap();
        assert_eq!(
            card.send_subscribe_url().unwrap().path(),
            "/a2a/sendSubscribe"
        );

        let blank: AgentCard =
            serde_json::from_str(r#"{"name": "x", "endpoints": {"sendSubscribe": "  "}}"#).unwrap();
        assert!(blank.send_subscribe_url().is_err());

        let relative: AgentCard =
            serde_json::from_str(r#"{"endpoints": {"sendSubscribe": "/a2a/sendSubscribe"}}"#).unwrap();
        assert!(relative.send_subscribe_url().is_err());

        let missing: AgentCard = serde_json::from_str(r#"{"name": "x"}"#).unwrap();
        assert!(missing.send_subscribe_url().is_err());
    }
}
