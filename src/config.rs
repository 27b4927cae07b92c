use std::{collections::HashMap, env, time::Duration};

use anyhow::{Error, Result, anyhow};
use dotenvy::dotenv;
use serde::Deserialize;

use crate::{clients::vault::Secrets, models::retry::RetryPolicy};

pub const EXCHANGE_NAME: &str = "comment_notifications";
pub const QUEUE_NAME: &str = "comment_notifications_queue";

/// Location of the secret store. Read from the process environment only, since
/// it is needed before any secret is available.
#[derive(Clone, Deserialize)]
pub struct VaultConfig {
    pub vault_addr: String,
    pub vault_token: String,
    pub vault_secret_path: String,
}

impl VaultConfig {
    pub fn load() -> Result<Self, Error> {
        dotenv().ok();

        envy::from_env::<Self>()
            .map_err(|e| anyhow!("Invalid or missing vault environment variable: {}", e))
    }
}

#[derive(Clone, Deserialize)]
pub struct Config {
    pub rabbitmq_uri: String,

    #[serde(default = "default_retry_delay_ms")]
    pub rabbitmq_retry_delay_ms: u64,

    #[serde(default = "default_max_retries")]
    pub rabbitmq_max_retries: u32,

    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_user: String,
    pub smtp_password: String,
    pub email_from: String,
    pub email_to: String,
}

fn default_retry_delay_ms() -> u64 {
    5000
}

fn default_max_retries() -> u32 {
    10
}

impl Config {
    /// Builds the runtime configuration from the process environment overlaid
    /// with `secrets`. The process environment itself is left untouched.
    pub fn from_env_with_secrets(secrets: &Secrets) -> Result<Self, Error> {
        dotenv().ok();

        Self::from_vars(env::vars().chain(secrets.iter().map(|(k, v)| (k.clone(), v.clone()))))
    }

    /// Later pairs win over earlier ones. Keys are matched case-insensitively.
    pub fn from_vars<I>(vars: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let merged: HashMap<String, String> = vars
            .into_iter()
            .map(|(key, value)| (key.to_uppercase(), value))
            .collect();

        envy::from_iter::<_, Self>(merged)
            .map_err(|e| anyhow!("Invalid or missing configuration value: {}", e))
    }

    pub fn consumer_config(&self) -> ConsumerConfig {
        ConsumerConfig {
            broker_uri: self.rabbitmq_uri.clone(),
            exchange_name: EXCHANGE_NAME.to_string(),
            queue_name: QUEUE_NAME.to_string(),
            retry_delay: Duration::from_millis(self.rabbitmq_retry_delay_ms),
            max_retries: self.rabbitmq_max_retries,
        }
    }

    pub fn smtp_config(&self) -> SmtpConfig {
        SmtpConfig {
            host: self.smtp_host.clone(),
            port: self.smtp_port,
            user: self.smtp_user.clone(),
            password: self.smtp_password.clone(),
            from: self.email_from.clone(),
            to: self.email_to.clone(),
        }
    }
}

/// Connection parameters for the consumption loop. Immutable once built.
#[derive(Clone, Debug)]
pub struct ConsumerConfig {
    pub broker_uri: String,
    pub exchange_name: String,
    pub queue_name: String,
    pub retry_delay: Duration,
    pub max_retries: u32,
}

impl ConsumerConfig {
    pub fn new(broker_uri: impl Into<String>, retry_delay: Duration, max_retries: u32) -> Self {
        Self {
            broker_uri: broker_uri.into(),
            exchange_name: EXCHANGE_NAME.to_string(),
            queue_name: QUEUE_NAME.to_string(),
            retry_delay,
            max_retries,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.retry_delay)
    }
}

#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub from: String,
    pub to: String,
}
