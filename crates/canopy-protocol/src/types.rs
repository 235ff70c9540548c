//! Core protocol types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ProtocolError, Result};

/// Size of a node address in bytes (8 bytes, link-layer address width)
pub const NODE_ADDRESS_SIZE: usize = 8;

/// Link-layer address of a node in the Canopy tree
///
/// Compared by exact byte equality. The all-zero address is reserved as the
/// "no node" sentinel.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct NodeAddress([u8; NODE_ADDRESS_SIZE]);

impl NodeAddress {
    /// The null sentinel address
    pub const NULL: NodeAddress = NodeAddress([0u8; NODE_ADDRESS_SIZE]);

    /// Create a NodeAddress from a byte array
    pub const fn from_bytes(bytes: [u8; NODE_ADDRESS_SIZE]) -> Self {
        NodeAddress(bytes)
    }

    /// Address whose first byte is `id` and the rest zero, the way
    /// simulated motes are numbered
    pub const fn from_node_id(id: u8) -> Self {
        let mut bytes = [0u8; NODE_ADDRESS_SIZE];
        bytes[0] = id;
        NodeAddress(bytes)
    }

    /// Get the bytes of this address
    pub fn as_bytes(&self) -> &[u8; NODE_ADDRESS_SIZE] {
        &self.0
    }

    /// Check whether this is the null sentinel
    pub fn is_null(&self) -> bool {
        self.0 == [0u8; NODE_ADDRESS_SIZE]
    }

    /// Convert to a plain hex string (16 digits)
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex, ignoring `.` group separators
    pub fn from_hex(s: &str) -> Result<Self> {
        let digits: String = s.chars().filter(|c| *c != '.').collect();
        let bytes =
            hex::decode(&digits).map_err(|e| ProtocolError::InvalidAddress(e.to_string()))?;

        if bytes.len() != NODE_ADDRESS_SIZE {
            return Err(ProtocolError::InvalidAddress(format!(
                "expected {} bytes, got {}",
                NODE_ADDRESS_SIZE,
                bytes.len()
            )));
        }

        let mut arr = [0u8; NODE_ADDRESS_SIZE];
        arr.copy_from_slice(&bytes);
        Ok(NodeAddress(arr))
    }
}

impl fmt::Debug for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeAddress({})", self)
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}{:02x}.{:02x}{:02x}.{:02x}{:02x}.{:02x}{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]
        )
    }
}

impl FromStr for NodeAddress {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        NodeAddress::from_hex(s)
    }
}

/// Tier of a node in the tree
///
/// The wire value is also the node's rank: a lower rank is closer to the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum NodeRole {
    Gateway = 0,
    Subgateway = 1,
    Sensor = 2,
}

impl NodeRole {
    pub fn from_i32(value: i32) -> Result<Self> {
        match value {
            0 => Ok(NodeRole::Gateway),
            1 => Ok(NodeRole::Subgateway),
            2 => Ok(NodeRole::Sensor),
            _ => Err(ProtocolError::InvalidRole(value)),
        }
    }

    pub fn to_i32(self) -> i32 {
        self as i32
    }

    /// Rank used for parent selection (lower is better)
    pub fn rank(self) -> i32 {
        self.to_i32()
    }

    pub fn name(&self) -> &'static str {
        match self {
            NodeRole::Gateway => "gateway",
            NodeRole::Subgateway => "subgateway",
            NodeRole::Sensor => "sensor",
        }
    }
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Control-plane category of a packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum MessageCategory {
    Null = 0,
    /// Periodic beacon for neighbor discovery and liveness proof
    Hello = 1,
    /// Registers the sender as a child of the recipient
    HelloAck = 2,
    /// Sent to a former parent after re-parenting elsewhere
    ChildDisconnect = 3,
    Application = 4,
}

impl MessageCategory {
    pub fn from_i32(value: i32) -> Result<Self> {
        match value {
            0 => Ok(MessageCategory::Null),
            1 => Ok(MessageCategory::Hello),
            2 => Ok(MessageCategory::HelloAck),
            3 => Ok(MessageCategory::ChildDisconnect),
            4 => Ok(MessageCategory::Application),
            _ => Err(ProtocolError::InvalidMessageCategory(value)),
        }
    }

    pub fn to_i32(self) -> i32 {
        self as i32
    }
}

/// Application-level category of a packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum AppCategory {
    None = 0,
    /// Light reading travelling up to the gateway
    LightLevel = 1,
    /// Turn light bulbs on for `value` seconds
    LightOn = 2,
    /// Turn irrigation on for `value` seconds
    IrrigationOn = 3,
    /// Irrigation state report (1 = on, 0 = off)
    IrrigationAck = 4,
    /// Mobile terminal probing for a light sensor; `value` is the phase
    MobileLightProbe = 5,
}

impl AppCategory {
    pub fn from_i32(value: i32) -> Result<Self> {
        match value {
            0 => Ok(AppCategory::None),
            1 => Ok(AppCategory::LightLevel),
            2 => Ok(AppCategory::LightOn),
            3 => Ok(AppCategory::IrrigationOn),
            4 => Ok(AppCategory::IrrigationAck),
            5 => Ok(AppCategory::MobileLightProbe),
            _ => Err(ProtocolError::InvalidAppCategory(value)),
        }
    }

    pub fn to_i32(self) -> i32 {
        self as i32
    }
}

/// What a Sensor node is wired to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum SensorCapability {
    #[default]
    None = 0,
    IrrigationSystem = 1,
    MobileTerminal = 2,
    LightSensor = 3,
    LightBulb = 4,
}

impl SensorCapability {
    pub fn from_i32(value: i32) -> Result<Self> {
        match value {
            0 => Ok(SensorCapability::None),
            1 => Ok(SensorCapability::IrrigationSystem),
            2 => Ok(SensorCapability::MobileTerminal),
            3 => Ok(SensorCapability::LightSensor),
            4 => Ok(SensorCapability::LightBulb),
            _ => Err(ProtocolError::InvalidCapability(value)),
        }
    }

    pub fn to_i32(self) -> i32 {
        self as i32
    }

    pub fn name(&self) -> &'static str {
        match self {
            SensorCapability::None => "none",
            SensorCapability::IrrigationSystem => "irrigation_system",
            SensorCapability::MobileTerminal => "mobile_terminal",
            SensorCapability::LightSensor => "light_sensor",
            SensorCapability::LightBulb => "light_bulb",
        }
    }
}

impl fmt::Display for SensorCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
