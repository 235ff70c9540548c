//! Engine configuration

use std::time::Duration;

use canopy_topology::TopologyConfig;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Tree formation and liveness timing
    pub topology: TopologyConfig,

    /// Period of sensor application reports
    pub app_report_interval_secs: u64,

    /// Probes a mobile terminal sends per report
    pub probe_burst: u32,

    /// Seed for light readings; entropy when unset
    pub rng_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            topology: TopologyConfig::default(),
            app_report_interval_secs: 5,
            probe_burst: 5,
            rng_seed: None,
        }
    }
}

impl EngineConfig {
    pub fn app_report_interval(&self) -> Duration {
        Duration::from_secs(self.app_report_interval_secs)
    }

    pub fn validate(&self) -> Result<()> {
        self.topology.validate()?;

        if self.app_report_interval_secs == 0 {
            return Err(CoreError::InvalidConfig(
                "app_report_interval_secs must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}
