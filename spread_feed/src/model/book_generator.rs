//! Order-book generator and event broadcasting.
//!
//! The `BookGenerator` runs a background thread that moves a synthetic mid
//! price for every live listing and broadcasts one `OrderBookEvent` per
//! listing per tick to all subscribers over `crossbeam_channel`. New client
//! tasks register by sending a `Sender<OrderBookEvent>` to the channel
//! returned by `BookGenerator::start`.
//!
//! - Mid prices follow a small random walk in whole ticks and never drop
//!   below ten ticks.
//! - The spread is one or two ticks; deeper levels step away one tick each.
//! - With a small probability one side of a book is published empty.
//! - Broadcast is best-effort: a subscriber whose channel is closed is dropped.
use std::thread;
use std::time::Duration;

use chrono::Utc;
use crossbeam_channel::{Sender, unbounded};
use log::{debug, info};
use rand::Rng;
use spread_common::book::{OrderBookEvent, PriceLevel, Quotation};
use spread_common::instrument::InstrumentId;

use crate::model::catalog::ListedFuture;

/// Levels generated per side; subscribers get a prefix of these.
pub const MAX_DEPTH: usize = 5;

/// Walk state of one instrument.
struct Book {
    figi: InstrumentId,
    mid_nanos: i64,
    tick_nanos: i64,
}

/// Background market data generator that broadcasts to subscribers.
pub struct BookGenerator {
    books: Vec<Book>,
    empty_side_probability: f64,
}

impl BookGenerator {
    /// Generator for `listings`, starting at their reference prices.
    pub fn new(listings: &[ListedFuture], empty_side_probability: f64) -> Self {
        let books = listings
            .iter()
            .map(|l| Book {
                figi: l.instrument.figi.clone(),
                mid_nanos: l.reference_nanos,
                tick_nanos: l.tick_nanos,
            })
            .collect();
        Self {
            books,
            empty_side_probability: if empty_side_probability.is_nan() {
                0.0
            } else {
                empty_side_probability.clamp(0.0, 1.0)
            },
        }
    }

    /// Advances every book by one step and returns the resulting events.
    pub fn step<R: Rng>(&mut self, rng: &mut R) -> Vec<OrderBookEvent> {
        let time_ms = Utc::now().timestamp_millis();
        let empty_p = self.empty_side_probability;

        self.books
            .iter_mut()
            .map(|book| {
                let tick = book.tick_nanos;
                book.mid_nanos = (book.mid_nanos + tick * rng.random_range(-3..=3)).max(10 * tick);
                let half_spread = tick * rng.random_range(1..=2);
                let best_bid = book.mid_nanos - half_spread;
                let best_ask = book.mid_nanos + half_spread;

                let mut bids: Vec<PriceLevel> = (0..MAX_DEPTH as i64)
                    .map(|i| {
                        PriceLevel::new(
                            Quotation::from_nanos(best_bid - i * tick),
                            rng.random_range(1..=500),
                        )
                    })
                    .collect();
                let mut asks: Vec<PriceLevel> = (0..MAX_DEPTH as i64)
                    .map(|i| {
                        PriceLevel::new(
                            Quotation::from_nanos(best_ask + i * tick),
                            rng.random_range(1..=500),
                        )
                    })
                    .collect();

                if rng.random_bool(empty_p) {
                    if rng.random_bool(0.5) {
                        bids.clear();
                    } else {
                        asks.clear();
                    }
                }

                OrderBookEvent {
                    figi: book.figi.clone(),
                    depth: MAX_DEPTH as u32,
                    bids,
                    asks,
                    time_ms,
                }
            })
            .collect()
    }

    /// Start the generator thread and return a channel for registering subscribers.
    ///
    /// Every `tick` each registered channel receives one event per listing.
    pub fn start(mut self, tick: Duration) -> Sender<Sender<OrderBookEvent>> {
        let (subscribe_tx, subscribe_rx) = unbounded::<Sender<OrderBookEvent>>();

        thread::spawn(move || {
            let mut clients: Vec<Sender<OrderBookEvent>> = Vec::new();
            let mut rng = rand::rng();
            info!(
                "Book generator started for {} instruments (Thread ID: {:?})",
                self.books.len(),
                thread::current().id()
            );

            loop {
                while let Ok(new_client_tx) = subscribe_rx.try_recv() {
                    clients.push(new_client_tx);
                    debug!("Generator: New client added. Total clients: {}", clients.len());
                }

                for event in self.step(&mut rng) {
                    clients.retain(|client_tx| client_tx.send(event.clone()).is_ok());
                }

                thread::sleep(tick);
            }
        });
        subscribe_tx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::catalog::Catalog;
    use chrono::NaiveDate;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn listings() -> Vec<ListedFuture> {
        let catalog = Catalog::quarterly(NaiveDate::from_ymd_opt(2026, 10, 16).unwrap());
        catalog.listings()[3..6].to_vec()
    }

    #[test]
    fn books_are_sorted_and_uncrossed() {
        let mut generator = BookGenerator::new(&listings(), 0.0);
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..200 {
            for event in generator.step(&mut rng) {
                assert_eq!(event.bids.len(), MAX_DEPTH);
                assert_eq!(event.asks.len(), MAX_DEPTH);
                let bid = event.best_bid().unwrap().price.to_decimal().unwrap();
                let ask = event.best_ask().unwrap().price.to_decimal().unwrap();
                assert!(bid < ask);
                let deepest = event.bids[MAX_DEPTH - 1].price;
                assert!(deepest.units > 0 || deepest.nano > 0);
                for pair in event.bids.windows(2) {
                    assert!(pair[0].price.to_decimal().unwrap() > pair[1].price.to_decimal().unwrap());
                }
            }
        }
    }

    #[test]
    fn certain_empty_side_clears_exactly_one_side() {
        let mut generator = BookGenerator::new(&listings(), 1.0);
        let mut rng = StdRng::seed_from_u64(11);

        for event in generator.step(&mut rng) {
            assert!(event.bids.is_empty() != event.asks.is_empty());
        }
    }

    #[test]
    fn nan_probability_never_empties_a_side() {
        let mut generator = BookGenerator::new(&listings(), f64::NAN);
        let mut rng = StdRng::seed_from_u64(3);

        for _ in 0..20 {
            for event in generator.step(&mut rng) {
                assert_eq!(event.bids.len(), MAX_DEPTH);
                assert_eq!(event.asks.len(), MAX_DEPTH);
            }
        }
    }

    #[test]
    fn subscribers_receive_every_listing() {
        let subscribe = BookGenerator::new(&listings(), 0.0).start(Duration::from_millis(5));
        let (tx, rx) = unbounded();
        subscribe.send(tx).unwrap();

        let mut seen = std::collections::HashSet::new();
        while seen.len() < 3 {
            let event = rx.recv_timeout(Duration::from_secs(2)).unwrap();
            seen.insert(event.figi);
        }
    }
}
