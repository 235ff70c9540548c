//! Topology timing configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TopologyError};

/// Protocol timing, in whole seconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologyConfig {
    /// Gateway Hello beacon period
    pub hello_interval_secs: u64,

    /// Delay between hearing the parent and re-broadcasting its Hello
    pub hello_relay_delay_secs: u64,

    /// Silence from the parent after which a node becomes orphan
    pub parent_timeout_secs: u64,

    /// Delay before the first liveness round
    pub liveness_initial_delay_secs: u64,

    /// Period of liveness rounds
    pub liveness_round_interval_secs: u64,

    /// Confirmation window of a liveness round
    pub liveness_timeout_secs: u64,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        TopologyConfig {
            hello_interval_secs: 10,
            hello_relay_delay_secs: 1,
            parent_timeout_secs: 20,
            liveness_initial_delay_secs: 1,
            liveness_round_interval_secs: 21,
            liveness_timeout_secs: 20,
        }
    }
}

impl TopologyConfig {
    pub fn hello_interval(&self) -> Duration {
        Duration::from_secs(self.hello_interval_secs)
    }

    pub fn hello_relay_delay(&self) -> Duration {
        Duration::from_secs(self.hello_relay_delay_secs)
    }

    pub fn parent_timeout(&self) -> Duration {
        Duration::from_secs(self.parent_timeout_secs)
    }

    pub fn liveness_initial_delay(&self) -> Duration {
        Duration::from_secs(self.liveness_initial_delay_secs)
    }

    pub fn liveness_round_interval(&self) -> Duration {
        Duration::from_secs(self.liveness_round_interval_secs)
    }

    pub fn liveness_timeout(&self) -> Duration {
        Duration::from_secs(self.liveness_timeout_secs)
    }

    /// Check the timing is usable
    ///
    /// The prune window must close before the next round opens: a new
    /// round re-arms the prune timer and would otherwise keep pushing the
    /// prune out forever.
    pub fn validate(&self) -> Result<()> {
        let intervals = [
            ("hello_interval_secs", self.hello_interval_secs),
            ("hello_relay_delay_secs", self.hello_relay_delay_secs),
            ("parent_timeout_secs", self.parent_timeout_secs),
            ("liveness_round_interval_secs", self.liveness_round_interval_secs),
            ("liveness_timeout_secs", self.liveness_timeout_secs),
        ];

        for (name, value) in intervals {
            if value == 0 {
                return Err(TopologyError::InvalidConfig(format!(
                    "{} must be greater than zero",
                    name
                )));
            }
        }

        if self.liveness_timeout_secs >= self.liveness_round_interval_secs {
            return Err(TopologyError::InvalidConfig(format!(
                "liveness_timeout_secs ({}) must be shorter than liveness_round_interval_secs ({})",
                self.liveness_timeout_secs, self.liveness_round_interval_secs
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = TopologyConfig::default();

        assert!(config.validate().is_ok());
        assert_eq!(config.hello_interval(), Duration::from_secs(10));
        assert_eq!(config.parent_timeout(), Duration::from_secs(20));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = TopologyConfig {
            hello_interval_secs: 0,
            ..Default::default()
        };

        assert!(matches!(
            config.validate(),
            Err(TopologyError::InvalidConfig(msg)) if msg.contains("hello_interval_secs")
        ));
    }

    #[test]
    fn test_prune_window_must_fit_in_round() {
        let config = TopologyConfig {
            liveness_round_interval_secs: 20,
            liveness_timeout_secs: 20,
            ..Default::default()
        };

        assert!(config.validate().is_err());
    }
}
