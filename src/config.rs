//! Configuration management for Herald.
//!
//! Settings come from an optional YAML file, then `HERALD__*` environment
//! variables override the scalar settings, for example
//! `HERALD__REDIS__URL=redis://cache:6379/`. Limits are only read from the
//! file, because environment keys lose the case of message types.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::error::{HeraldError, Result};
use crate::ratelimit::policy::{default_rules, policies_from_rules};
use crate::ratelimit::{Policy, PolicyRule};
use crate::store::RedisStoreConfig;

/// Prefix of the environment variables read by [`HeraldConfig::load`].
pub const ENV_PREFIX: &str = "HERALD";

/// Main configuration for the Herald service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeraldConfig {
    /// Counter store configuration
    #[serde(default)]
    pub redis: RedisConfig,

    /// Message delivery configuration
    #[serde(default)]
    pub notifier: NotifierConfig,

    /// Rate policy per message type
    #[serde(default = "default_rules")]
    pub limits: HashMap<String, PolicyRule>,
}

impl Default for HeraldConfig {
    fn default() -> Self {
        Self {
            redis: RedisConfig::default(),
            notifier: NotifierConfig::default(),
            limits: default_rules(),
        }
    }
}

/// Redis connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Upper bound for a single Redis command in milliseconds
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            command_timeout_ms: default_command_timeout_ms(),
        }
    }
}

impl RedisConfig {
    /// Settings for the Redis counter store.
    pub fn store_config(&self) -> RedisStoreConfig {
        RedisStoreConfig {
            command_timeout: Duration::from_millis(self.command_timeout_ms),
        }
    }
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379/".to_string()
}

fn default_command_timeout_ms() -> u64 {
    500
}

/// Message delivery configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    /// Address every notification is sent from
    #[serde(default = "default_sender")]
    pub sender: String,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            sender: default_sender(),
        }
    }
}

fn default_sender() -> String {
    "notifications@localhost".to_string()
}

/// Scalar settings that may be overridden from the environment.
#[derive(Debug, Default, Deserialize)]
struct EnvOverrides {
    #[serde(default)]
    redis: RedisOverrides,
    #[serde(default)]
    notifier: NotifierOverrides,
}

#[derive(Debug, Default, Deserialize)]
struct RedisOverrides {
    url: Option<String>,
    command_timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct NotifierOverrides {
    sender: Option<String>,
}

impl HeraldConfig {
    /// Load configuration from a file path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading configuration");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: HeraldConfig = serde_yaml::from_str(yaml)
            .map_err(|e| HeraldError::Config(format!("Failed to parse configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load the optional file at `path`, then apply `HERALD__*` overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        let overrides: EnvOverrides = ::config::Config::builder()
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        config.apply(overrides);

        config.validate()?;
        Ok(config)
    }

    fn apply(&mut self, overrides: EnvOverrides) {
        if let Some(url) = overrides.redis.url {
            self.redis.url = url;
        }
        if let Some(timeout) = overrides.redis.command_timeout_ms {
            self.redis.command_timeout_ms = timeout;
        }
        if let Some(sender) = overrides.notifier.sender {
            self.notifier.sender = sender;
        }
    }

    /// Check every setting that the type system does not.
    pub fn validate(&self) -> Result<()> {
        if self.limits.is_empty() {
            return Err(HeraldError::Config(
                "at least one message type must be configured".to_string(),
            ));
        }
        if self.redis.command_timeout_ms == 0 {
            return Err(HeraldError::Config(
                "redis.command_timeout_ms must be positive".to_string(),
            ));
        }
        policies_from_rules(&self.limits)?;
        Ok(())
    }

    /// Validated policies, keyed by message type.
    pub fn policies(&self) -> Result<HashMap<String, Policy>> {
        policies_from_rules(&self.limits)
    }
}
