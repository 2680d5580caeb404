//! Rate policies per message type.
//!
//! A [`Policy`] is the validated, immutable form used by the limiters. A
//! [`PolicyRule`] is its configuration-file representation:
//!
//! ```yaml
//! limits:
//!   Status:
//!     max_hits: 2
//!     window: minute
//!   News:
//!     max_hits: 1
//!     window: hour
//!     window_units: 24
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::error::{HeraldError, Result};

/// Status updates about the user's account.
pub const STATUS: &str = "Status";
/// Daily news digest.
pub const NEWS: &str = "News";
/// Marketing campaigns.
pub const MARKETING: &str = "Marketing";

/// Time unit of a policy window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Second,
    Minute,
    Hour,
    Day,
}

impl TimeUnit {
    /// Get the duration of one unit.
    pub fn duration(&self) -> Duration {
        match self {
            TimeUnit::Second => Duration::from_secs(1),
            TimeUnit::Minute => Duration::from_secs(60),
            TimeUnit::Hour => Duration::from_secs(3600),
            TimeUnit::Day => Duration::from_secs(86400),
        }
    }
}

/// Maximum hits allowed for one user within a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    max_hits: u64,
    window: Duration,
}

impl Policy {
    /// Create a policy.
    ///
    /// # Errors
    /// Returns a configuration error if `max_hits` or `window` is zero, or
    /// if `max_hits` does not fit a store counter (`i64`).
    pub fn new(max_hits: u64, window: Duration) -> Result<Self> {
        if max_hits == 0 {
            return Err(HeraldError::Config(
                "policy max_hits must be positive".to_string(),
            ));
        }
        if i64::try_from(max_hits).is_err() {
            return Err(HeraldError::Config(format!(
                "policy max_hits must not exceed {}",
                i64::MAX
            )));
        }
        if window.is_zero() {
            return Err(HeraldError::Config(
                "policy window must be positive".to_string(),
            ));
        }
        Ok(Self { max_hits, window })
    }

    /// Number of calls allowed before throttling starts.
    pub fn max_hits(&self) -> u64 {
        self.max_hits
    }

    /// Lifetime of a counter once its expiry is attached.
    pub fn window(&self) -> Duration {
        self.window
    }
}

/// A policy as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRule {
    /// Number of messages allowed per window
    pub max_hits: u64,
    /// Unit of the window
    pub window: TimeUnit,
    /// How many units make up the window
    #[serde(default = "default_window_units")]
    pub window_units: u32,
}

fn default_window_units() -> u32 {
    1
}

impl PolicyRule {
    /// Create a rule spanning `window_units` of `window`.
    pub fn new(max_hits: u64, window: TimeUnit, window_units: u32) -> Self {
        Self {
            max_hits,
            window,
            window_units,
        }
    }

    /// Validate the rule and turn it into a [`Policy`].
    pub fn to_policy(&self) -> Result<Policy> {
        Policy::new(self.max_hits, self.window.duration() * self.window_units)
    }
}

/// The business rules shipped with the service.
pub fn default_rules() -> HashMap<String, PolicyRule> {
    HashMap::from([
        (STATUS.to_string(), PolicyRule::new(2, TimeUnit::Minute, 1)),
        (NEWS.to_string(), PolicyRule::new(1, TimeUnit::Hour, 24)),
        (MARKETING.to_string(), PolicyRule::new(3, TimeUnit::Hour, 1)),
    ])
}

/// Validate every rule of a table.
///
/// # Errors
/// Returns a configuration error naming the first invalid message type.
pub fn policies_from_rules(rules: &HashMap<String, PolicyRule>) -> Result<HashMap<String, Policy>> {
    rules
        .iter()
        .map(|(message_type, rule)| {
            rule.to_policy()
                .map(|policy| (message_type.clone(), policy))
                .map_err(|e| HeraldError::Config(format!("limit {:?}: {}", message_type, e)))
        })
        .collect()
}
