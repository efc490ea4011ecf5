use crate::model::ping_monitor::PingMonitor;
use log::{debug, warn};
use spread_common::net::PING_BYTES;
use std::net::UdpSocket;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Instant;

/// UDP listener that receives PING datagrams from subscribed clients and
/// refreshes the shared `PingMonitor` for the sender.
pub struct UdpPingListener;

impl UdpPingListener {
    /// Spawn a background thread that reads UDP packets from `socket` and,
    /// when a `PING` is observed, refreshes `ping_monitor` for the sender.
    pub fn start(socket: Arc<UdpSocket>, ping_monitor: Arc<Mutex<PingMonitor>>) {
        thread::spawn(move || {
            let mut buf = [0u8; 128];
            loop {
                match socket.recv_from(&mut buf) {
                    Ok((size, addr)) if &buf[..size] == PING_BYTES => {
                        debug!("Received ping from {}", addr);
                        match ping_monitor.lock() {
                            Ok(mut monitor) => monitor.touch(addr, Instant::now()),
                            Err(e) => warn!("Ping monitor unavailable: {}", e),
                        }
                    }
                    Ok((size, addr)) => debug!("Ignoring {} byte datagram from {}", size, addr),
                    Err(e) => debug!("UDP receive error: {}", e),
                }
            }
        });
    }
}
