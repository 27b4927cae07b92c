use std::{collections::HashMap, time::Duration};

use anyhow::{Error, Result, anyhow};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::VaultConfig;

pub type Secrets = HashMap<String, String>;

/// One-shot secret loader for a Vault-style key/value store.
pub struct VaultClient {
    http_client: Client,
    url: String,
    token: String,
}

impl VaultClient {
    pub fn new(config: &VaultConfig) -> Result<Self, Error> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|_| anyhow!("Failed to create HTTP client"))?;

        let url = format!(
            "{}/v1/{}",
            config.vault_addr.trim_end_matches('/'),
            config.vault_secret_path.trim_start_matches('/')
        );

        Ok(Self {
            http_client,
            url,
            token: config.vault_token.clone(),
        })
    }

    /// Fetches every secret under the configured path. Only string values are
    /// returned; anything else is skipped.
    pub async fn load_secrets(&self) -> Result<Secrets, Error> {
        info!(url = %self.url, "Loading secrets from Vault");

        let response = self
            .http_client
            .get(&self.url)
            .header("X-Vault-Token", &self.token)
            .send()
            .await
            .map_err(|e| anyhow!("Vault request failed: {}", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| anyhow!("Failed to read Vault response: {}", e))?;

        if status != StatusCode::OK {
            debug!(%status, body = %body, "Vault returned an error response");
            return Err(anyhow!("Vault error: {}", status));
        }

        let payload: Value = serde_json::from_str(&body)
            .map_err(|e| anyhow!("Failed to parse Vault response: {}", e))?;

        let data = payload
            .get("data")
            .and_then(Value::as_object)
            .ok_or_else(|| anyhow!("'data' field not found in Vault response"))?;

        let mut secrets = Secrets::with_capacity(data.len());

        for (key, value) in data {
            match value.as_str() {
                Some(value) => {
                    secrets.insert(key.clone(), value.to_string());
                    debug!(secret = %key, "Secret loaded");
                }
                None => {
                    warn!(secret = %key, "Skipping secret, value is not a string");
                }
            }
        }

        info!(count = secrets.len(), "Secrets loaded from Vault");

        Ok(secrets)
    }
}
