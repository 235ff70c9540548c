//! Line protocol between the gateway and its controller
//!
//! The gateway reports each surfaced event as one line: the `[2serv]` token
//! followed by a JSON object. The controller answers with `[2clie]` command
//! lines (see [`OperatorCommand`]).

use canopy_protocol::command::{CLIENT_TOKEN, SERVER_TOKEN};
use canopy_protocol::{GatewayEvent, OperatorCommand};
use serde_json::json;

/// Render a surfaced event as a `[2serv]` line (without newline)
pub fn server_line(event: &GatewayEvent) -> String {
    let body = json!({
        "rank": event.role.to_i32(),
        "msgcat": event.msgcat.to_i32(),
        "appcat": event.appcat.to_i32(),
        "value": event.value,
        "src": event.origin.to_string(),
    });
    format!("{}{}", SERVER_TOKEN, body)
}

/// Parse an operator line, if it looks like one
///
/// Blank lines and lines carrying the server token are not commands.
pub fn client_line(line: &str) -> Option<OperatorCommand> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(SERVER_TOKEN) {
        return None;
    }
    if !line.starts_with(CLIENT_TOKEN) && !line.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    Some(OperatorCommand::parse(line))
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_protocol::{AppCategory, NodeAddress, NodeRole, Packet};

    #[test]
    fn test_server_line() {
        let packet = Packet::application(NodeRole::Sensor, AppCategory::LightLevel, 7);
        let event = GatewayEvent::from_packet(&packet, NodeAddress::from_node_id(2));

        let line = server_line(&event);

        assert!(line.starts_with("[2serv]{"));
        let body: serde_json::Value = serde_json::from_str(&line["[2serv]".len()..]).unwrap();
        assert_eq!(body["rank"], 2);
        assert_eq!(body["msgcat"], 4);
        assert_eq!(body["appcat"], 1);
        assert_eq!(body["value"], 7);
        assert_eq!(body["src"], "0200.0000.0000.0000");
    }

    #[test]
    fn test_client_line() {
        let command = client_line("[2clie]0|4|2|2|0200000000000000\n").unwrap();
        assert_eq!(command.appcat, AppCategory::LightOn);

        assert!(client_line("0|4|3|10|").is_some());
        assert!(client_line("").is_none());
        assert!(client_line("   ").is_none());
        assert!(client_line("[2serv]{}").is_none());
        assert!(client_line("hello").is_none());
    }
}
