//! Shared protocol command type used by the feed and the watcher.
//!
//! A `Command` is either a catalog request (`FUTURES`) or an order-book
//! subscription (`SUBSCRIBE`) with a list of `(instrument, depth)` pairs.
//! Keep-alive pings are raw `PING` datagrams, not commands. Commands travel
//! as JSON over the TCP command port; the catalog reply is a JSON array of [`Instrument`](crate::instrument::Instrument).
use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use crate::instrument::InstrumentId;

/// Header value for catalog requests.
pub const FUTURES: &str = "FUTURES";
/// Header value for order-book subscriptions.
pub const SUBSCRIBE: &str = "SUBSCRIBE";
/// Transport kind for streamed data.
pub const CONNECTION: &str = "udp";

/// One subscription entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBookInstrument {
    /// Instrument to stream.
    pub instrument_id: InstrumentId,
    /// Number of levels per side.
    pub depth: u32,
}

impl OrderBookInstrument {
    /// Builds a subscription entry.
    pub fn new(instrument_id: InstrumentId, depth: u32) -> Self {
        Self { instrument_id, depth }
    }
}

/// Command payload sent from the watcher to the feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Command {
    /// Command kind: `FUTURES` or `SUBSCRIBE`.
    pub header: String,
    /// Transport protocol name for streamed data.
    pub connection: String,
    /// IP address to stream to (empty for `FUTURES`).
    pub address: String,
    /// Port to stream to, as a string (empty for `FUTURES`).
    pub port: String,
    /// Order books to stream (empty unless `SUBSCRIBE`).
    pub instruments: Vec<OrderBookInstrument>,
}

impl Command {
    /// Creates a catalog request.
    pub fn futures() -> Self {
        Command {
            header: String::from(FUTURES),
            connection: String::new(),
            address: String::new(),
            port: String::new(),
            instruments: Vec::new(),
        }
    }

    /// Creates an order-book subscription.
    pub fn subscribe(address: &str, port: &str, instruments: Vec<OrderBookInstrument>) -> Self {
        Command {
            header: String::from(SUBSCRIBE),
            connection: String::from(CONNECTION),
            address: String::from(address),
            port: String::from(port),
            instruments,
        }
    }

    /// `true` for a catalog request.
    pub fn is_futures(&self) -> bool {
        self.header == FUTURES
    }

    /// `true` for a subscription.
    pub fn is_subscribe(&self) -> bool {
        self.header == SUBSCRIBE
    }

    /// Build the UDP socket address from the fields.
    pub fn get_udp_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.address, self.port).parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscription_carries_depth_and_target() {
        let cmd = Command::subscribe(
            "127.0.0.1",
            "55555",
            vec![OrderBookInstrument::new(InstrumentId::new("FUTSI1226000"), 1)],
        );
        let json = serde_json::to_string(&cmd).unwrap();
        let back: Command = serde_json::from_str(&json).unwrap();

        assert!(back.is_subscribe());
        assert!(!back.is_futures());
        assert_eq!(back.instruments[0].depth, 1);
        assert_eq!(back.get_udp_addr().unwrap().port(), 55555);
        assert!(json.contains("\"instrument_id\":\"FUTSI1226000\""));
    }

    #[test]
    fn catalog_request_has_no_target() {
        let cmd = Command::futures();
        assert!(cmd.is_futures());
        assert!(cmd.get_udp_addr().is_err());
    }
}
