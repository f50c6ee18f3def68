//! Broadcaster configuration

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::policy::InvariantPolicy;
use crate::protocol::{
    DEFAULT_LOCAL_NAME, SONAR_IDENTITY_CHARACTERISTIC_UUID, SONAR_KEEPALIVE_CHARACTERISTIC_UUID,
    SONAR_SERVICE_UUID,
};

// ----------------------------------------------------------------------------
// Configuration
// ----------------------------------------------------------------------------

/// Configuration for the BLE broadcaster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadcasterConfig {
    /// UUID of the advertised GATT service
    pub service_uuid: Uuid,
    /// UUID of the identity characteristic
    pub identity_characteristic_uuid: Uuid,
    /// UUID of the keepalive characteristic
    pub keepalive_characteristic_uuid: Uuid,
    /// Local name advertised when `include_local_name` is set
    pub local_name: String,
    /// Whether the advertisement carries the local name. Off by default so the
    /// advertisement only exposes the service UUID.
    pub include_local_name: bool,
    /// Panic or log on invariant violations
    pub invariant_policy: InvariantPolicy,
    /// Period in milliseconds of the keepalive sent by the event pump, if any
    pub keepalive_interval_ms: Option<u64>,
}

impl Default for BroadcasterConfig {
    fn default() -> Self {
        Self {
            service_uuid: SONAR_SERVICE_UUID,
            identity_characteristic_uuid: SONAR_IDENTITY_CHARACTERISTIC_UUID,
            keepalive_characteristic_uuid: SONAR_KEEPALIVE_CHARACTERISTIC_UUID,
            local_name: DEFAULT_LOCAL_NAME.to_string(),
            include_local_name: false,
            invariant_policy: InvariantPolicy::default(),
            keepalive_interval_ms: None,
        }
    }
}

impl BroadcasterConfig {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document; missing keys fall back to defaults
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Load configuration from a TOML file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Keepalive period as a `Duration`, ignoring a zero period
    pub fn keepalive_interval(&self) -> Option<Duration> {
        self.keepalive_interval_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }

    /// Set the local name used when name advertising is enabled
    pub fn with_local_name(mut self, name: String) -> Self {
        self.local_name = name;
        self
    }

    /// Enable or disable the local name in the advertisement
    pub fn with_include_local_name(mut self, enabled: bool) -> Self {
        self.include_local_name = enabled;
        self
    }

    /// Set the invariant policy
    pub fn with_invariant_policy(mut self, policy: InvariantPolicy) -> Self {
        self.invariant_policy = policy;
        self
    }

    /// Set the keepalive period used by the event pump
    pub fn with_keepalive_interval(mut self, interval: Duration) -> Self {
        let ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self.keepalive_interval_ms = Some(ms);
        self
    }
}
