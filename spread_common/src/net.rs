//! Shared networking constants and helpers used by the feed and the watcher.

/// TCP port for the command channel (catalog requests and subscriptions).
pub const COMMAND_PORT: u16 = 8080;
/// UDP port for order-book frames and pings.
pub const DATA_PORT: u16 = 8081;
/// Literal payload of a keep-alive datagram.
pub const PING_BYTES: &[u8] = b"PING";
/// Largest UDP frame either side will produce or accept.
pub const MAX_FRAME: usize = 4096;

/// Helper to format an address with a port like "ip:port".
pub fn addr(ip: &str, port: u16) -> String {
    format!("{}:{}", ip, port)
}

/// Bincode configuration used for every order-book frame on the wire.
pub fn frame_config() -> bincode::config::Configuration {
    bincode::config::standard()
}
