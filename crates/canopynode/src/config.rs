use anyhow::{Context, Result};
use canopy_core::EngineConfig;
use canopy_protocol::{NodeAddress, NodeRole, SensorCapability};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::controller::ControllerConfig;

/// Deployment configuration: the nodes, the radio links between them and
/// the protocol timing they all share
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub nodes: Vec<NodeConfig>,
    pub links: Vec<LinkConfig>,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(skip)]
    config_file_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    #[serde(with = "hex_address")]
    pub address: NodeAddress,
    pub role: NodeRole,
    #[serde(default)]
    pub capability: SensorCapability,
}

/// Symmetric radio link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkConfig {
    #[serde(with = "hex_address")]
    pub a: NodeAddress,
    #[serde(with = "hex_address")]
    pub b: NodeAddress,
    /// Received signal strength in dBm, higher is better
    pub signal_strength: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let config_path = config_path.unwrap_or_else(Self::default_config_path);

        if !config_path.exists() {
            anyhow::bail!(
                "Configuration file not found: {}\nRun with --init to create a new configuration",
                config_path.display()
            );
        }

        let contents =
            fs::read_to_string(&config_path).context("Failed to read configuration file")?;

        let mut config: Config =
            serde_yaml::from_str(&contents).context("Failed to parse configuration file")?;

        config.validate()?;
        config.config_file_path = config_path;

        Ok(config)
    }

    /// Create and save the default three-tier deployment
    pub fn create_default(config_path: Option<PathBuf>) -> Result<Self> {
        let config_path = config_path.unwrap_or_else(Self::default_config_path);

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut config = Self::three_tier();
        config.config_file_path = config_path.clone();

        let yaml = serde_yaml::to_string(&config)?;
        fs::write(&config_path, yaml)?;

        Ok(config)
    }

    /// One gateway, two subgateways and one sensor of each capability
    pub fn three_tier() -> Self {
        let node = |id: u8, role: NodeRole, capability: SensorCapability| NodeConfig {
            address: NodeAddress::from_node_id(id),
            role,
            capability,
        };
        let link = |a: u8, b: u8, signal_strength: i32| LinkConfig {
            a: NodeAddress::from_node_id(a),
            b: NodeAddress::from_node_id(b),
            signal_strength,
        };

        Config {
            nodes: vec![
                node(1, NodeRole::Gateway, SensorCapability::None),
                node(2, NodeRole::Subgateway, SensorCapability::None),
                node(3, NodeRole::Subgateway, SensorCapability::None),
                node(4, NodeRole::Sensor, SensorCapability::LightSensor),
                node(5, NodeRole::Sensor, SensorCapability::LightBulb),
                node(6, NodeRole::Sensor, SensorCapability::IrrigationSystem),
                node(7, NodeRole::Sensor, SensorCapability::MobileTerminal),
            ],
            links: vec![
                link(1, 2, -40),
                link(1, 3, -45),
                link(2, 3, -70),
                link(2, 4, -50),
                link(2, 5, -55),
                link(2, 7, -60),
                link(3, 6, -50),
                link(5, 6, -75),
            ],
            engine: EngineConfig::default(),
            controller: ControllerConfig::default(),
            logging: LoggingConfig::default(),
            config_file_path: PathBuf::new(),
        }
    }

    /// Check the deployment is consistent
    pub fn validate(&self) -> Result<()> {
        self.engine
            .validate()
            .context("Invalid engine configuration")?;

        let mut seen = HashSet::new();
        for node in &self.nodes {
            if node.address.is_null() {
                anyhow::bail!("Node address must not be the null address");
            }
            if !seen.insert(node.address) {
                anyhow::bail!("Duplicate node address: {}", node.address);
            }
            if node.role != NodeRole::Sensor && node.capability != SensorCapability::None {
                anyhow::bail!(
                    "Node {} is a {} and cannot have capability {}",
                    node.address,
                    node.role,
                    node.capability
                );
            }
        }

        let gateways = self
            .nodes
            .iter()
            .filter(|n| n.role == NodeRole::Gateway)
            .count();
        if gateways != 1 {
            anyhow::bail!("Deployment needs exactly one gateway, found {}", gateways);
        }

        for link in &self.links {
            for end in [link.a, link.b] {
                if !seen.contains(&end) {
                    anyhow::bail!("Link references unknown node {}", end);
                }
            }
            if link.a == link.b {
                anyhow::bail!("Link from {} to itself", link.a);
            }
        }

        Ok(())
    }

    pub fn gateway(&self) -> Option<&NodeConfig> {
        self.nodes.iter().find(|n| n.role == NodeRole::Gateway)
    }

    pub fn config_path(&self) -> &Path {
        &self.config_file_path
    }

    fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("canopynode")
            .join("deployment.yaml")
    }
}

mod hex_address {
    use canopy_protocol::NodeAddress;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(address: &NodeAddress, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&address.to_hex())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NodeAddress, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NodeAddress::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_deployment_is_valid() {
        let config = Config::three_tier();

        assert!(config.validate().is_ok());
        assert_eq!(
            config.gateway().map(|g| g.address),
            Some(NodeAddress::from_node_id(1))
        );
    }

    #[test]
    fn test_create_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("deployment.yaml");

        let created = Config::create_default(Some(path.clone())).unwrap();
        let loaded = Config::load(Some(path.clone())).unwrap();

        assert_eq!(loaded.nodes, created.nodes);
        assert_eq!(loaded.links, created.links);
        assert_eq!(loaded.engine, created.engine);
        assert_eq!(loaded.config_path(), path.as_path());

        let yaml = fs::read_to_string(&path).unwrap();
        assert!(yaml.contains("0100000000000000"));
        assert!(yaml.contains("light_sensor"));
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(Some(dir.path().join("absent.yaml"))).unwrap_err();

        assert!(err.to_string().contains("--init"));
    }

    #[test]
    fn test_minimal_yaml_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("deployment.yaml");
        fs::write(
            &path,
            r#"
nodes:
  - address: "0100.0000.0000.0000"
    role: gateway
  - address: "0200000000000000"
    role: sensor
    capability: light_bulb
links:
  - a: "0100000000000000"
    b: "0200000000000000"
    signal_strength: -42
"#,
        )
        .unwrap();

        let config = Config::load(Some(path)).unwrap();

        assert_eq!(config.nodes[1].capability, SensorCapability::LightBulb);
        assert_eq!(config.engine.topology.hello_interval_secs, 10);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.links[0].signal_strength, -42);
    }

    #[test]
    fn test_invalid_deployments_rejected() {
        let mut config = Config::three_tier();
        config.nodes.push(config.nodes[1].clone());
        assert!(config.validate().is_err());

        let mut config = Config::three_tier();
        config.nodes[1].capability = SensorCapability::LightBulb;
        assert!(config.validate().is_err());

        let mut config = Config::three_tier();
        config.links.push(LinkConfig {
            a: NodeAddress::from_node_id(1),
            b: NodeAddress::from_node_id(42),
            signal_strength: -40,
        });
        assert!(config.validate().is_err());

        let mut config = Config::three_tier();
        config.nodes.retain(|n| n.role != NodeRole::Gateway);
        assert!(config.validate().is_err());

        let mut config = Config::three_tier();
        config.engine.topology.liveness_timeout_secs = 30;
        assert!(config.validate().is_err());
    }
}
