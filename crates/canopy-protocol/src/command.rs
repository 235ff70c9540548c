//! Operator command line
//!
//! An operator (or the gateway controller) injects application packets with
//! a pipe-delimited line: `rank|msgcat|appcat|value|hex-address`, optionally
//! prefixed by the `[2clie]` serial token. Parsing never fails: missing or
//! unparsable fields keep their default value.

use std::fmt;

use crate::message::Packet;
use crate::types::{AppCategory, MessageCategory, NodeAddress, NodeRole, NODE_ADDRESS_SIZE};

/// Serial token marking a line sent from the controller to the gateway
pub const CLIENT_TOKEN: &str = "[2clie]";

/// Serial token marking a line sent from the gateway to the controller
pub const SERVER_TOKEN: &str = "[2serv]";

/// A parsed operator command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorCommand {
    pub role: NodeRole,
    pub msgcat: MessageCategory,
    pub appcat: AppCategory,
    pub value: i32,
    pub address: NodeAddress,
}

impl Default for OperatorCommand {
    fn default() -> Self {
        OperatorCommand {
            role: NodeRole::Gateway,
            msgcat: MessageCategory::Null,
            appcat: AppCategory::None,
            value: 0,
            address: NodeAddress::NULL,
        }
    }
}

impl OperatorCommand {
    /// Build an application command addressed to `address`
    pub fn application(appcat: AppCategory, value: i32, address: NodeAddress) -> Self {
        OperatorCommand {
            role: NodeRole::Gateway,
            msgcat: MessageCategory::Application,
            appcat,
            value,
            address,
        }
    }

    /// Parse a command line
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let line = line.strip_prefix(CLIENT_TOKEN).unwrap_or(line);

        let mut command = OperatorCommand::default();
        let mut fields = line.split('|');

        if let Some(field) = fields.next() {
            command.role = NodeRole::from_i32(leading_int(field)).unwrap_or(command.role);
        }
        if let Some(field) = fields.next() {
            command.msgcat =
                MessageCategory::from_i32(leading_int(field)).unwrap_or(command.msgcat);
        }
        if let Some(field) = fields.next() {
            command.appcat = AppCategory::from_i32(leading_int(field)).unwrap_or(command.appcat);
        }
        if let Some(field) = fields.next() {
            command.value = leading_int(field);
        }
        if let Some(field) = fields.next() {
            command.address = lenient_address(field);
        }

        command
    }

    pub fn is_application(&self) -> bool {
        self.msgcat == MessageCategory::Application
    }

    /// Packet this command injects when executed by a node of `role`
    pub fn to_packet(&self, role: NodeRole) -> Packet {
        Packet::application(role, self.appcat, self.value)
    }

    /// Render as a command line (without the serial token)
    pub fn to_line(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}",
            self.role.to_i32(),
            self.msgcat.to_i32(),
            self.appcat.to_i32(),
            self.value,
            self.address.to_hex()
        )
    }
}

impl fmt::Display for OperatorCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", CLIENT_TOKEN, self.to_line())
    }
}

/// Parse an optional sign followed by leading decimal digits; anything else is 0
fn leading_int(field: &str) -> i32 {
    let field = field.trim();
    let (negative, digits) = match field.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, field.strip_prefix('+').unwrap_or(field)),
    };

    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let magnitude = digits[..end].parse::<i64>().unwrap_or(0);
    let value = if negative { -magnitude } else { magnitude };

    value.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

/// Read up to eight hex byte pairs; bad or missing pairs become zero
fn lenient_address(field: &str) -> NodeAddress {
    let digits: Vec<char> = field.trim().chars().filter(|c| *c != '.').collect();
    let mut bytes = [0u8; NODE_ADDRESS_SIZE];

    for (i, byte) in bytes.iter_mut().enumerate() {
        let pair: String = digits.iter().skip(2 * i).take(2).collect();
        *byte = u8::from_str_radix(&pair, 16).unwrap_or(0);
    }

    NodeAddress::from_bytes(bytes)
}
