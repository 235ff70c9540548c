//! Fixed-size wire format
//!
//! Every packet travels as one 24-byte record, little-endian, no length
//! field and no header. The receiver trusts the length reported by the
//! transport:
//! - Role (4 bytes): sender rank, i32
//! - Message Category (4 bytes): i32
//! - Application Category (4 bytes): i32
//! - Value (4 bytes): i32
//! - Origin (8 bytes): node address

use bincode::Options;
use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, Result};
use crate::message::Packet;
use crate::types::{AppCategory, MessageCategory, NodeAddress, NodeRole, NODE_ADDRESS_SIZE};

/// Encoded size of a packet: 4 * 4 + 8 = 24 bytes
pub const PACKET_SIZE: usize = 4 * 4 + NODE_ADDRESS_SIZE;

/// Raw record as it sits on the air
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct WireRecord {
    role: i32,
    msgcat: i32,
    appcat: i32,
    value: i32,
    origin: [u8; NODE_ADDRESS_SIZE],
}

impl From<&Packet> for WireRecord {
    fn from(packet: &Packet) -> Self {
        WireRecord {
            role: packet.role.to_i32(),
            msgcat: packet.msgcat.to_i32(),
            appcat: packet.appcat.to_i32(),
            value: packet.value,
            origin: *packet.origin.as_bytes(),
        }
    }
}

impl TryFrom<WireRecord> for Packet {
    type Error = ProtocolError;

    fn try_from(record: WireRecord) -> Result<Self> {
        Ok(Packet {
            role: NodeRole::from_i32(record.role)?,
            msgcat: MessageCategory::from_i32(record.msgcat)?,
            appcat: AppCategory::from_i32(record.appcat)?,
            value: record.value,
            origin: NodeAddress::from_bytes(record.origin),
        })
    }
}

fn wire_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .allow_trailing_bytes()
}

/// Serialize a packet to its 24-byte wire form
pub fn encode(packet: &Packet) -> Result<Vec<u8>> {
    let bytes = wire_options()
        .serialize(&WireRecord::from(packet))
        .map_err(|e| ProtocolError::SerializationFailed(e.to_string()))?;

    debug_assert_eq!(bytes.len(), PACKET_SIZE, "Packet size mismatch");

    Ok(bytes)
}

/// Deserialize a packet from bytes
///
/// Trailing bytes beyond the fixed record are ignored.
pub fn decode(bytes: &[u8]) -> Result<Packet> {
    if bytes.len() < PACKET_SIZE {
        return Err(ProtocolError::FrameTooShort {
            size: bytes.len(),
            min: PACKET_SIZE,
        });
    }

    let record: WireRecord = wire_options()
        .deserialize(&bytes[..PACKET_SIZE])
        .map_err(|e| ProtocolError::DeserializationFailed(e.to_string()))?;

    Packet::try_from(record)
}
