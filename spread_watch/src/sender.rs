//! Sending commands to the order-book feed.
//!
//! Commands go out as one JSON document per TCP connection; the write half is
//! closed afterwards so the feed knows the command is complete. A background
//! thread keeps the UDP subscription alive with periodic `PING`s.
use log::{debug, error, info};
use spread_common::SpreadError;
use spread_common::command::Command;
use spread_common::net::PING_BYTES;
use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream, UdpSocket};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// PING interval in milliseconds used by the background thread.
const INTERVAL_MS: u64 = 2000;
/// Upper bound on a command reply.
const MAX_REPLY: u64 = 1 << 20;

/// Helper type for sending commands to the feed.
pub struct CommandSender;

impl CommandSender {
    /// Writes `command` to `stream` and closes the write half.
    pub fn send_command(stream: &mut TcpStream, command: &Command) -> Result<(), SpreadError> {
        let payload = serde_json::to_vec(command)?;
        debug!(
            "Sending {} command with {} instrument(s)",
            command.header,
            command.instruments.len()
        );
        stream.write_all(&payload)?;
        stream.flush()?;
        stream.shutdown(Shutdown::Write)?;
        Ok(())
    }

    /// Sends `command` to `server_address` and returns the raw reply bytes.
    pub fn request(server_address: &str, command: &Command) -> Result<Vec<u8>, SpreadError> {
        let mut stream = TcpStream::connect(server_address)?;
        stream.set_read_timeout(Some(Duration::from_secs(10)))?;
        Self::send_command(&mut stream, command)?;

        let mut reply = Vec::new();
        stream.take(MAX_REPLY).read_to_end(&mut reply)?;
        Ok(reply)
    }

    /// Spawns the keep-alive thread. It stops once `shutdown` is set.
    pub fn start_ping_thread(
        socket: Arc<UdpSocket>,
        target_addr: String,
        shutdown: Arc<AtomicBool>,
    ) -> std::io::Result<JoinHandle<()>> {
        info!("Ping thread started. Target: {}", target_addr);
        thread::Builder::new().name("ping".into()).spawn(move || {
            let interval = Duration::from_millis(INTERVAL_MS);
            while !shutdown.load(Ordering::Relaxed) {
                match socket.send_to(PING_BYTES, &target_addr) {
                    Ok(_) => debug!("PING sent to {}", target_addr),
                    Err(ref e) if e.kind() == ErrorKind::ConnectionReset => {}
                    Err(e) => {
                        error!("PING THREAD ERROR: Failed to send PING: {}", e);
                    }
                }
                thread::sleep(interval);
            }
            info!("Ping thread stopping...");
        })
    }
}
