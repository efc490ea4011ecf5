//! Order-book subscription to the feed.
//!
//! [`QuoteStream`] is what the dispatch loop consumes: a blocking source of
//! order-book events that ends with `Ok(None)` on shutdown and fails with
//! `SpreadError::Subscription` when the subscription cannot be kept.
//! [`UdpQuoteStream`] subscribes over the TCP command port and then reads
//! bincode frames from its UDP socket.
use std::io::ErrorKind;
use std::net::{TcpStream, UdpSocket};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use spread_common::book::OrderBookEvent;
use spread_common::command::{Command, OrderBookInstrument};
use spread_common::instrument::InstrumentTriple;
use spread_common::net::{MAX_FRAME, PING_BYTES, addr};
use spread_common::{Result, SpreadError};

use crate::sender::CommandSender;

/// Levels per side requested for every leg.
pub const DEPTH: u32 = 1;

/// How often a blocked read wakes up to look at the shutdown flag.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Blocking source of order-book events.
pub trait QuoteStream {
    /// Next event, `Ok(None)` once shutdown was requested.
    fn next_event(&mut self) -> Result<Option<OrderBookEvent>>;
}

/// Where and how to subscribe.
#[derive(Debug, Clone)]
pub struct SubscriptionConfig {
    /// Feed host.
    pub server_ip: String,
    /// Feed TCP command port.
    pub command_port: u16,
    /// Feed UDP data port; pings go here.
    pub data_port: u16,
    /// Local UDP port; `0` picks a free one.
    pub listen_port: u16,
    /// Silence after which the subscription counts as lost.
    pub idle_timeout: Duration,
}

/// UDP order-book stream for the three tracked legs.
pub struct UdpQuoteStream {
    socket: Arc<UdpSocket>,
    shutdown: Arc<AtomicBool>,
    idle_timeout: Duration,
    last_frame: Instant,
    buf: Vec<u8>,
}

impl UdpQuoteStream {
    /// Binds the data socket, subscribes `legs` at [`DEPTH`] and starts the
    /// keep-alive thread. Every failure is reported as `Subscription`.
    pub fn subscribe(
        config: &SubscriptionConfig,
        legs: &InstrumentTriple,
        shutdown: Arc<AtomicBool>,
    ) -> Result<Self> {
        Self::try_subscribe(config, legs, shutdown)
            .map_err(|e| SpreadError::Subscription(e.to_string()))
    }

    fn try_subscribe(
        config: &SubscriptionConfig,
        legs: &InstrumentTriple,
        shutdown: Arc<AtomicBool>,
    ) -> Result<Self> {
        let mut listen_port = config.listen_port;
        if listen_port == config.data_port {
            warn!(
                "--listen-port={} matches the feed data port. A free local port will be selected.",
                listen_port
            );
            listen_port = 0;
        }
        let socket = UdpSocket::bind(addr("0.0.0.0", listen_port))?;
        socket.set_read_timeout(Some(POLL_INTERVAL))?;
        let local = socket.local_addr()?;
        info!("UDP order-book socket listening on: {}", local);

        let command_address = addr(&config.server_ip, config.command_port);
        let instruments = legs
            .iter()
            .map(|(_, id)| OrderBookInstrument::new(id.clone(), DEPTH))
            .collect();
        let mut tcp_stream = TcpStream::connect(&command_address)?;
        // The feed streams to the address the command arrives from.
        let reply_ip = tcp_stream.local_addr()?.ip();
        let command = Command::subscribe(
            &reply_ip.to_string(),
            &local.port().to_string(),
            instruments,
        );
        CommandSender::send_command(&mut tcp_stream, &command)?;
        info!("Subscribed to order books on {}", command_address);

        let socket = Arc::new(socket);
        CommandSender::start_ping_thread(
            Arc::clone(&socket),
            addr(&config.server_ip, config.data_port),
            Arc::clone(&shutdown),
        )?;

        Ok(Self::from_socket(socket, shutdown, config.idle_timeout))
    }

    /// Stream over an already bound socket. The socket needs a read timeout
    /// for shutdown and idle checks to run.
    fn from_socket(
        socket: Arc<UdpSocket>,
        shutdown: Arc<AtomicBool>,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            socket,
            shutdown,
            idle_timeout,
            last_frame: Instant::now(),
            buf: vec![0u8; MAX_FRAME],
        }
    }
}

impl QuoteStream for UdpQuoteStream {
    fn next_event(&mut self) -> Result<Option<OrderBookEvent>> {
        loop {
            if self.shutdown.load(Ordering::Relaxed) {
                info!("Order-book stream stopping...");
                return Ok(None);
            }
            // Only decoded frames count as activity; pings and garbage do not.
            if self.last_frame.elapsed() > self.idle_timeout {
                return Err(SpreadError::Subscription(format!(
                    "no order-book frames for {:?}",
                    self.idle_timeout
                )));
            }
            match self.socket.recv(&mut self.buf) {
                Ok(size) => {
                    let frame = &self.buf[..size];
                    if frame == PING_BYTES {
                        continue;
                    }
                    match OrderBookEvent::from_frame(frame) {
                        Ok(event) => {
                            self.last_frame = Instant::now();
                            return Ok(Some(event));
                        }
                        Err(e) => debug!("Skipping undecodable frame ({} bytes): {}", size, e),
                    }
                }
                Err(e)
                    if matches!(
                        e.kind(),
                        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::ConnectionReset
                    ) => {}
                Err(e) => return Err(SpreadError::Subscription(e.to_string())),
            }
        }
    }
}

impl Drop for UdpQuoteStream {
    fn drop(&mut self) {
        // The ping thread shares the flag; stop it with the stream.
        self.shutdown.store(true, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spread_common::book::{PriceLevel, Quotation};
    use spread_common::instrument::InstrumentId;
    use std::io::Read;
    use std::net::{SocketAddr, TcpListener};
    use std::thread;

    fn loopback_stream(idle_timeout: Duration) -> (UdpQuoteStream, SocketAddr, Arc<AtomicBool>) {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        socket.set_read_timeout(Some(Duration::from_millis(50))).unwrap();
        let target = socket.local_addr().unwrap();
        let shutdown = Arc::new(AtomicBool::new(false));
        let stream =
            UdpQuoteStream::from_socket(Arc::new(socket), Arc::clone(&shutdown), idle_timeout);
        (stream, target, shutdown)
    }

    fn frame(id: &str) -> Vec<u8> {
        OrderBookEvent {
            figi: InstrumentId::new(id),
            depth: 1,
            bids: vec![PriceLevel::new(Quotation::new(95, 0), 1)],
            asks: vec![PriceLevel::new(Quotation::new(95, 50_000_000), 1)],
            time_ms: 0,
        }
        .to_frame()
        .unwrap()
    }

    #[test]
    fn shutdown_flag_ends_the_stream() {
        let (mut stream, _, shutdown) = loopback_stream(Duration::from_secs(5));
        shutdown.store(true, Ordering::Relaxed);
        assert!(matches!(stream.next_event(), Ok(None)));
    }

    #[test]
    fn silence_is_a_subscription_failure() {
        let (mut stream, _, _) = loopback_stream(Duration::from_millis(200));
        assert!(matches!(stream.next_event(), Err(SpreadError::Subscription(_))));
    }

    #[test]
    fn pings_and_garbage_are_skipped() {
        let (mut stream, target, _) = loopback_stream(Duration::from_secs(5));
        let feed = UdpSocket::bind("127.0.0.1:0").unwrap();
        feed.send_to(PING_BYTES, target).unwrap();
        feed.send_to(b"\xff\xff\xff\xffgarbage", target).unwrap();
        feed.send_to(&frame("FUTSI1226000"), target).unwrap();

        let event = stream.next_event().unwrap().unwrap();
        assert_eq!(event.figi, InstrumentId::new("FUTSI1226000"));
    }

    #[test]
    fn undecodable_flood_still_times_out() {
        let (mut stream, target, _) = loopback_stream(Duration::from_millis(300));
        let stop = Arc::new(AtomicBool::new(false));
        let flood = {
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                let feed = UdpSocket::bind("127.0.0.1:0").unwrap();
                while !stop.load(Ordering::Relaxed) {
                    let _ = feed.send_to(b"\xff\xff\xff\xffgarbage", target);
                    thread::sleep(Duration::from_millis(10));
                }
            })
        };

        let started = Instant::now();
        let outcome = stream.next_event();
        stop.store(true, Ordering::Relaxed);
        flood.join().unwrap();

        assert!(matches!(outcome, Err(SpreadError::Subscription(_))));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn subscribe_sends_command_and_pings_from_data_socket() {
        let commands = TcpListener::bind("127.0.0.1:0").unwrap();
        let data = UdpSocket::bind("127.0.0.1:0").unwrap();
        data.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        let config = SubscriptionConfig {
            server_ip: "127.0.0.1".into(),
            command_port: commands.local_addr().unwrap().port(),
            data_port: data.local_addr().unwrap().port(),
            listen_port: 0,
            idle_timeout: Duration::from_secs(5),
        };
        let feed = thread::spawn(move || {
            let (mut conn, _) = commands.accept().unwrap();
            let mut body = Vec::new();
            conn.read_to_end(&mut body).unwrap();
            serde_json::from_slice::<Command>(&body).unwrap()
        });
        let legs = InstrumentTriple::new("SI".into(), "CNY".into(), "UCNY".into());

        let stream =
            UdpQuoteStream::subscribe(&config, &legs, Arc::new(AtomicBool::new(false))).unwrap();
        let command = feed.join().unwrap();

        assert!(command.is_subscribe());
        assert_eq!(command.address, "127.0.0.1");
        let local = stream.socket.local_addr().unwrap();
        assert_eq!(command.port, local.port().to_string());
        assert_eq!(command.instruments.len(), 3);
        assert!(command.instruments.iter().all(|i| i.depth == DEPTH));

        let mut buf = [0u8; 16];
        let (size, from) = data.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..size], PING_BYTES);
        assert_eq!(from.port(), local.port());
    }

    #[test]
    fn unreachable_feed_fails_subscription() {
        let config = SubscriptionConfig {
            server_ip: "127.0.0.1".into(),
            command_port: 1,
            data_port: 1,
            listen_port: 0,
            idle_timeout: Duration::from_secs(1),
        };
        let legs = InstrumentTriple::new("SI".into(), "CNY".into(), "UCNY".into());
        let outcome = UdpQuoteStream::subscribe(&config, &legs, Arc::new(AtomicBool::new(false)));
        assert!(matches!(outcome, Err(SpreadError::Subscription(_))));
    }
}
