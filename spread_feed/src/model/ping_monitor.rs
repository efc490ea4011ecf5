//! Keep-alive tracker for subscribed UDP clients.
//!
//! A client is registered when it subscribes and refreshed by every `PING`
//! datagram it sends from its data socket. `expire` removes and returns the
//! clients that stayed silent longer than the timeout; their streams are
//! then closed by the main loop. Time is taken from the monotonic clock.
//!
//! The monitor is not synchronized; the feed shares it behind a `Mutex`.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Last keep-alive per client address.
pub struct PingMonitor {
    last_seen: HashMap<SocketAddr, Instant>,
    timeout: Duration,
}

impl PingMonitor {
    /// Monitor that expires clients after `timeout` of silence.
    pub fn new(timeout: Duration) -> Self {
        Self {
            last_seen: HashMap::new(),
            timeout,
        }
    }

    /// Records activity from `addr` at `now`.
    pub fn touch(&mut self, addr: SocketAddr, now: Instant) {
        self.last_seen.insert(addr, now);
    }

    /// Removes and returns every client silent for longer than the timeout.
    pub fn expire(&mut self, now: Instant) -> Vec<SocketAddr> {
        let timeout = self.timeout;
        let mut expired = Vec::new();
        self.last_seen.retain(|addr, seen| {
            let alive = now.saturating_duration_since(*seen) <= timeout;
            if !alive {
                expired.push(*addr);
            }
            alive
        });
        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    #[test]
    fn silent_clients_expire_once() {
        let start = Instant::now();
        let mut monitor = PingMonitor::new(Duration::from_secs(5));
        monitor.touch(client(1), start);
        monitor.touch(client(2), start);
        monitor.touch(client(2), start + Duration::from_secs(4));

        let expired = monitor.expire(start + Duration::from_secs(6));

        assert_eq!(expired, vec![client(1)]);
        assert!(monitor.expire(start + Duration::from_secs(6)).is_empty());
        assert_eq!(monitor.expire(start + Duration::from_secs(10)), vec![client(2)]);
    }

    #[test]
    fn ping_after_expiry_registers_again() {
        let start = Instant::now();
        let mut monitor = PingMonitor::new(Duration::from_secs(1));
        monitor.touch(client(3), start);
        assert_eq!(monitor.expire(start + Duration::from_secs(2)), vec![client(3)]);

        monitor.touch(client(3), start + Duration::from_secs(3));
        assert!(monitor.expire(start + Duration::from_secs(3)).is_empty());
    }
}
