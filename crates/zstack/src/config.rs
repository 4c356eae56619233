//! Driver and network configuration.
//!
//! Both structures load from YAML. A combined file looks like:
//!
//! ```yaml
//! network:
//!   pan_id: 0x1a62
//!   extended_pan_id: 0xdddddddddddddddd
//!   network_key: [1, 3, 5, 7, 9, 11, 13, 15, 0, 2, 4, 6, 8, 10, 12, 13]
//!   channel: 11
//! driver:
//!   attempt_timeout_ms: 5000
//!   concurrency: 16
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use zstack_protocol::{ExtendedPanId, NetworkKey, PanId};

use crate::error::ConfigError;

/// Lowest and highest 2.4 GHz Zigbee channels.
pub const MIN_CHANNEL: u8 = 11;
pub const MAX_CHANNEL: u8 = 26;

/// Desired network parameters for the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfiguration {
    pub pan_id: PanId,
    pub extended_pan_id: ExtendedPanId,
    pub network_key: NetworkKey,
    pub channel: u8,
}

impl NetworkConfiguration {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_CHANNEL..=MAX_CHANNEL).contains(&self.channel) {
            return Err(ConfigError::Invalid(format!(
                "channel {} outside {}..={}",
                self.channel, MIN_CHANNEL, MAX_CHANNEL
            )));
        }
        Ok(())
    }
}

/// Tunables of the driver itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZStackConfig {
    /// Timeout of a single attempt of a retried bootstrap step.
    pub attempt_timeout_ms: u64,
    /// Attempts per retried bootstrap step.
    pub attempts: u32,
    /// Attempts while waiting for the adapter to come out of reset.
    pub reset_attempts: u32,
    /// Concurrent node operations allowed at once.
    pub concurrency: usize,
    /// Number of AF transaction ids in circulation (at most 256).
    pub transaction_ids: usize,
    /// Hop limit of outgoing data requests.
    pub radius: u8,
    /// Capacity of the event queue.
    pub event_capacity: usize,
}

impl Default for ZStackConfig {
    fn default() -> Self {
        ZStackConfig {
            attempt_timeout_ms: 5_000,
            attempts: 5,
            reset_attempts: 18,
            concurrency: 16,
            transaction_ids: 256,
            radius: 0x20,
            event_capacity: 64,
        }
    }
}

impl ZStackConfig {
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.transaction_ids == 0 || self.transaction_ids > 256 {
            return Err(ConfigError::Invalid(format!(
                "transaction_ids must be within 1..=256, got {}",
                self.transaction_ids
            )));
        }
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid("concurrency must be non-zero".into()));
        }
        if self.attempts == 0 || self.reset_attempts == 0 {
            return Err(ConfigError::Invalid("attempt budgets must be non-zero".into()));
        }
        if self.event_capacity == 0 {
            return Err(ConfigError::Invalid("event_capacity must be non-zero".into()));
        }
        Ok(())
    }
}

/// A complete configuration file: network parameters plus driver tunables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverConfig {
    pub network: NetworkConfiguration,
    #[serde(default)]
    pub driver: ZStackConfig,
}

impl DriverConfig {
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let config: DriverConfig = serde_yaml::from_str(text)?;
        config.network.validate()?;
        config.driver.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }
}
