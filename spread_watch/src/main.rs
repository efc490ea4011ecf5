//! Spread Watcher: tracks the top of book of three correlated futures and
//! shows two cross-instrument ratios in real time:
//!
//! - `OPEN  = bid(A) / ask(B) / ask(C)` — sell A, buy B and C;
//! - `CLOSE = ask(A) / bid(B) / bid(C)` — the mirror trade.
//!
//! Startup runs in two phases. First the legs are resolved to their
//! front-month futures on a short-lived thread; any failure there aborts the
//! process. Then a single `order-book-stream` thread subscribes to the three
//! order books at depth 1 and, for each update, replaces the instrument's
//! snapshot, recomputes both ratios and hands the text to the display
//! thread without waiting for it.
//!
//! Usage example (CLI):
//! ```bash
//! spread_watch --server-ip 192.168.0.10 --prefix-a FUTSI --prefix-b FUTCNY --prefix-c FUTUCNY
//! ```
//!
//! The watcher never reconnects: a lost subscription is shown, logged, and
//! turned into a non-zero exit so an outer supervisor can restart it.
#![warn(missing_docs)]
mod args;
mod dispatch;
mod engine;
mod model;
mod resolver;
mod sender;
mod sink;
mod source;
mod store;

use crate::args::Args;
use crate::dispatch::Dispatcher;
use crate::engine::RatioEngine;
use crate::resolver::{CatalogResolver, resolve_blocking};
use crate::sink::{ChannelSink, ConsoleDisplay};
use crate::source::UdpQuoteStream;
use crate::store::SnapshotStore;
use clap::Parser;
use log::{error, info, warn};
use spread_common::Result;
use spread_common::SpreadError;
use spread_common::instrument::InstrumentTriple;
use spread_common::net::addr;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread;

fn main() -> Result<(), SpreadError> {
    init_logger();
    let args = Args::parse();
    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || {
            info!("Ctrl+C received. Shutting down watcher...");
            shutdown.store(true, Ordering::SeqCst);
        })
        .map_err(|e| SpreadError::Format(format!("Error setting Ctrl+C handler: {}", e)))?;
    }

    let prefixes = args.prefixes();
    let resolver = CatalogResolver::new(addr(&args.server_ip(), args.command_port));
    let instruments = match resolve_blocking(resolver, prefixes.clone()) {
        Ok(instruments) => instruments,
        Err(e) => {
            error!("Failed to fetch instruments: {}", e);
            return Err(e);
        }
    };
    for (leg, instrument) in instruments.iter() {
        info!(
            "Closest future for {}: Ticker: {} | FIGI: {} | Expiration: {}",
            prefixes.get(leg),
            instrument.ticker,
            instrument.figi,
            instrument
                .expiration_date
                .map(|d| d.to_rfc3339())
                .unwrap_or_default()
        );
    }

    let title = format!(
        "{}/{}/{}",
        instruments.a.ticker, instruments.b.ticker, instruments.c.ticker
    );
    let legs: InstrumentTriple = instruments.map(|i| i.figi);

    let (sink, display_rx) = ChannelSink::new(args.sink_capacity);
    let display = ConsoleDisplay::new(title).spawn(display_rx)?;

    let store = Arc::new(SnapshotStore::new(legs.clone()));
    let stream_store = Arc::clone(&store);
    let subscription = args.subscription();
    let stream_shutdown = Arc::clone(&shutdown);
    let stream = thread::Builder::new()
        .name("order-book-stream".into())
        .spawn(move || {
            let mut dispatcher =
                Dispatcher::new(stream_store, RatioEngine::new(legs.clone()), sink);
            match UdpQuoteStream::subscribe(&subscription, &legs, stream_shutdown) {
                Ok(stream) => dispatcher.run(stream),
                Err(e) => Err(dispatcher.fail(e)),
            }
        })?;

    let outcome = stream
        .join()
        .map_err(|_| SpreadError::Subscription("order-book stream thread panicked".into()))?;
    if display.join().is_err() {
        warn!("Display thread panicked");
    }
    log_last_snapshots(&store);

    match outcome {
        Ok(()) => {
            info!("Watcher stopped");
            Ok(())
        }
        Err(e) => {
            error!("Order-book stream terminated: {}", e);
            Err(e)
        }
    }
}

fn log_last_snapshots(store: &SnapshotStore) {
    for (leg, id) in store.legs().iter() {
        match store.get(id) {
            Ok(Some(s)) => info!("Leg {} ({}) last updated at {}", leg, id, s.received_at),
            Ok(None) => info!("Leg {} ({}) never updated", leg, id),
            Err(e) => warn!("Snapshot store unavailable: {}", e),
        }
    }
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}
