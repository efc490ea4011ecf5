//! Order-book feed server.
//!
//! Plays the role of the exchange for the spread watcher: it publishes a
//! catalog of listed futures and streams synthetic top-of-book updates for
//! the live ones. Internally it wires together:
//!
//! - `Catalog` — quarterly SI, CNY and UCNY contracts around today's date.
//! - `CommandReceiver` — TCP command port; answers `FUTURES` with the JSON
//!   catalog and turns `SUBSCRIBE` into a stream request carrying the client's
//!   UDP `SocketAddr`.
//! - `BookGenerator` — random-walk order books broadcast to every subscriber
//!   through `crossbeam_channel` senders.
//! - Per-client stream task — filters books by the client's subscription and
//!   sends bincode frames to the client's address.
//! - `UdpPingListener` + `PingMonitor` — keep-alive; a client that stops
//!   sending `PING` has its stream closed.
//!
//! Crossbeam `select!` multiplexes new subscriptions and keep-alive timeouts
//! in the main loop. Any error of a single client stream is logged and ends
//! that stream only.
#![warn(missing_docs)]
use crate::args::Args;
use crate::model::book_generator::{BookGenerator, MAX_DEPTH};
use crate::model::catalog::Catalog;
use crate::model::ping_monitor::PingMonitor;
use crate::receiver::CommandReceiver;
use crate::stream::{Subscriptions, handle_client_stream};
use crate::udp_listener::UdpPingListener;
use chrono::Utc;
use clap::Parser;
use crossbeam_channel::{Sender, select, unbounded};
use log::{debug, error, info, warn};
use spread_common::Result;
use spread_common::SpreadError;
use spread_common::command::Command;
use spread_common::net::{COMMAND_PORT, DATA_PORT, addr};
use std::collections::HashMap;
use std::net::{SocketAddr, UdpSocket};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

mod args;
pub mod model;
mod receiver;
mod stream;
mod udp_listener;

fn main() -> Result<(), SpreadError> {
    init_logger();
    let args = Args::parse();

    let now = Utc::now();
    let catalog = Catalog::quarterly(now.date_naive());
    let live = catalog.live(now);
    for listing in &live {
        info!(
            "Listing {} ({}) expiring {}",
            listing.instrument.ticker,
            listing.instrument.figi,
            listing
                .instrument
                .expiration_date
                .map(|d| d.to_rfc3339())
                .unwrap_or_default()
        );
    }

    let udp_socket = Arc::new(UdpSocket::bind(addr(&args.bind_ip, DATA_PORT))?);
    info!("UDP socket created on: {}", udp_socket.local_addr()?);
    let ping_monitor = Arc::new(Mutex::new(PingMonitor::new(Duration::from_secs(
        args.ping_timeout_secs,
    ))));
    UdpPingListener::start(Arc::clone(&udp_socket), Arc::clone(&ping_monitor));

    let (stop_tx, stop_rx) = unbounded::<SocketAddr>();
    start_ping_monitor(Arc::clone(&ping_monitor), stop_tx);

    let (cmd_tx, cmd_rx) = unbounded::<(Command, SocketAddr)>();
    let receiver = CommandReceiver::new(&addr(&args.bind_ip, COMMAND_PORT), catalog.instruments())?;
    thread::spawn(move || {
        if let Err(e) = receiver.receive_loop_with_channel(cmd_tx) {
            error!("Receiver loop failed: {:?}", e);
        };
    });

    let subscription_tx = BookGenerator::new(&live, args.empty_side_probability)
        .start(Duration::from_millis(args.tick_ms));
    let mut active_streams: HashMap<SocketAddr, Sender<()>> = HashMap::new();

    loop {
        select! {
            recv(cmd_rx) -> msg => if let Ok((cmd, target_udp_addr)) = msg {
                let subscriptions = accepted_subscriptions(&catalog, &cmd, Utc::now());
                if subscriptions.is_empty() {
                    warn!("Subscription from {} names no live instrument", target_udp_addr);
                    continue;
                }

                let (shutdown_tx, shutdown_rx) = unbounded::<()>();
                let (client_data_tx, client_data_rx) = unbounded();
                if let Err(e) = subscription_tx.send(client_data_tx) {
                    error!("Failed to subscribe client: {}", e);
                    continue;
                }
                if let Some(previous) = active_streams.insert(target_udp_addr, shutdown_tx) {
                    let _ = previous.send(());
                }
                if let Ok(mut monitor) = ping_monitor.lock() {
                    monitor.touch(target_udp_addr, Instant::now());
                }

                let socket_clone = Arc::clone(&udp_socket);
                thread::spawn(move || {
                    if let Err(e) = handle_client_stream(
                        socket_clone,
                        target_udp_addr,
                        subscriptions,
                        client_data_rx,
                        shutdown_rx,
                    ) {
                        error!("Client stream error: {:?}", e);
                    }
                });
                info!("A stream has been created for the client on a UDP address: {}", target_udp_addr);
            },

            recv(stop_rx) -> expired => if let Ok(client_addr) = expired {
                if let Some(shutdown_tx) = active_streams.remove(&client_addr) {
                    let _ = shutdown_tx.send(());
                    info!("Stream for {} closed: ping timeout", client_addr);
                } else {
                    debug!("Ping timeout for {} without an active stream", client_addr);
                }
            }
        }
    }
}

/// Subscribed instruments the catalog lists as live, with depth clamped to
/// what the generator produces.
fn accepted_subscriptions(
    catalog: &Catalog,
    cmd: &Command,
    now: chrono::DateTime<Utc>,
) -> Subscriptions {
    let mut accepted = Subscriptions::new();
    for requested in &cmd.instruments {
        match catalog.find(&requested.instrument_id) {
            Some(listing) if listing.is_live(now) => {
                let depth = (requested.depth as usize).clamp(1, MAX_DEPTH);
                accepted.insert(requested.instrument_id.clone(), depth);
            }
            _ => warn!("Ignoring subscription to unknown instrument {}", requested.instrument_id),
        }
    }
    accepted
}

fn start_ping_monitor(ping_monitor: Arc<Mutex<PingMonitor>>, stop_tx: Sender<SocketAddr>) {
    thread::spawn(move || {
        let check_interval = Duration::from_secs(1);

        loop {
            thread::sleep(check_interval);
            let timed_out_clients = match ping_monitor.lock() {
                Ok(mut monitor) => monitor.expire(Instant::now()),
                Err(e) => {
                    error!("Ping monitor poisoned: {}", e);
                    return;
                }
            };
            for client_addr in timed_out_clients {
                if let Err(e) = stop_tx.send(client_addr) {
                    error!("Error sending timeout notification: {}", e);
                }
            }
        }
    });
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use spread_common::command::OrderBookInstrument;
    use spread_common::instrument::InstrumentId;

    #[test]
    fn subscriptions_keep_live_instruments_only() {
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 9, 0, 0).unwrap();
        let catalog = Catalog::quarterly(now.date_naive());
        let cmd = Command::subscribe(
            "127.0.0.1",
            "40000",
            vec![
                OrderBookInstrument::new(InstrumentId::new("FUTSI1226000"), 0),
                OrderBookInstrument::new(InstrumentId::new("FUTCNY122600"), 50),
                OrderBookInstrument::new(InstrumentId::new("FUTSI0926000"), 1),
                OrderBookInstrument::new(InstrumentId::new("FUTBR1226000"), 1),
            ],
        );

        let accepted = accepted_subscriptions(&catalog, &cmd, now);

        assert_eq!(accepted.len(), 2);
        assert_eq!(accepted[&InstrumentId::new("FUTSI1226000")], 1);
        assert_eq!(accepted[&InstrumentId::new("FUTCNY122600")], MAX_DEPTH);
    }
}
