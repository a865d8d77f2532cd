//! Thin HTTP client over the REST endpoints.
//!
//! Transport plumbing stays inside reqwest; this facade only posts
//! statements and hands the body to the envelope parser.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use tracing::debug;

use cymap_core::{MapContext, ResultSet};

use crate::envelope;

/// Configuration for connecting to the REST endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct RestConfig {
    pub base_url: String,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:7474".to_string(),
            user: None,
            password: None,
        }
    }
}

/// Client for the legacy REST protocol.
#[derive(Clone)]
pub struct RestClient {
    config: RestConfig,
    client: reqwest::Client,
}

impl RestClient {
    pub fn new(config: RestConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            config: RestConfig {
                base_url: config.base_url.trim_end_matches('/').to_string(),
                ..config
            },
            client,
        })
    }

    /// Create a client with default settings (localhost:7474, no auth).
    pub fn with_defaults() -> Result<Self> {
        Self::new(RestConfig::default())
    }

    /// Run a statement through the transactional commit endpoint and
    /// return the first (usually only) result set.
    pub async fn cypher(&self, statement: &str, parameters: JsonValue) -> Result<ResultSet> {
        let url = format!("{}/db/data/transaction/commit", self.config.base_url);
        let body = json!({
            "statements": [{"statement": statement, "parameters": parameters}]
        });
        let response = self.post(&url, body).await?;
        let mut sets = envelope::parse_transactional(response)
            .context("Failed to decode transactional result envelope")?;
        if sets.is_empty() {
            Ok(ResultSet::empty())
        } else {
            Ok(sets.swap_remove(0))
        }
    }

    /// Run a statement through the classic cypher endpoint, for servers
    /// predating the transactional API.
    pub async fn cypher_classic(&self, statement: &str, parameters: JsonValue) -> Result<ResultSet> {
        let url = format!("{}/db/data/cypher", self.config.base_url);
        let body = json!({"query": statement, "params": parameters});
        let response = self.post(&url, body).await?;
        envelope::parse_classic(response).context("Failed to decode classic result envelope")
    }

    /// Run a statement and map the result rows onto `T`.
    pub async fn query_as<T: DeserializeOwned>(
        &self,
        statement: &str,
        parameters: JsonValue,
        ctx: &MapContext,
    ) -> Result<Vec<T>> {
        let set = self.cypher(statement, parameters).await?;
        set.map_rows(ctx).context("Failed to map result rows")
    }

    async fn post(&self, url: &str, body: JsonValue) -> Result<JsonValue> {
        debug!(url, "posting cypher statement");

        let mut request = self.client.post(url).json(&body);
        if let Some(user) = &self.config.user {
            request = request.basic_auth(user, self.config.password.as_deref());
        }

        let response = request.send().await.context("REST request failed")?;
        let status = response.status();
        let body: JsonValue = response
            .json()
            .await
            .context("REST response was not JSON")?;
        if !status.is_success() {
            anyhow::bail!("REST endpoint returned {}: {}", status, body);
        }
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_builds_client_and_trims_base_url() {
        let client = RestClient::new(RestConfig {
            base_url: "http://graph.example.com:7474/".to_string(),
            ..RestConfig::default()
        })
        .unwrap();
        assert_eq!(client.config.base_url, "http://graph.example.com:7474");
    }

    #[test]
    fn test_with_defaults_succeeds() {
        assert!(RestClient::with_defaults().is_ok());
    }
}
