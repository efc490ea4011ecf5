//! Stream dispatch loop.
//!
//! Every inbound order-book event goes through the same three steps, one
//! event at a time and in arrival order: replace the instrument's snapshot,
//! recompute both ratios, publish the result. The loop never retries; it
//! reports a terminal status and hands the failure back to its supervisor.
use std::sync::Arc;

use chrono::Utc;
use log::{debug, error, info, warn};
use spread_common::book::OrderBookEvent;
use spread_common::{Result, SpreadError};

use crate::engine::RatioEngine;
use crate::model::ratio::RatioStatus;
use crate::model::snapshot::OrderBookSnapshot;
use crate::sink::ResultSink;
use crate::source::QuoteStream;
use crate::store::SnapshotStore;

/// Owns the store, the engine and the sink for the lifetime of one stream.
pub struct Dispatcher<S: ResultSink> {
    store: Arc<SnapshotStore>,
    engine: RatioEngine,
    sink: S,
    applied: u64,
    with_ratios: u64,
    all_seen: bool,
}

impl<S: ResultSink> Dispatcher<S> {
    /// Wires the loop together.
    pub fn new(store: Arc<SnapshotStore>, engine: RatioEngine, sink: S) -> Self {
        Self {
            store,
            engine,
            sink,
            applied: 0,
            with_ratios: 0,
            all_seen: false,
        }
    }

    /// Consumes `stream` until shutdown or failure.
    pub fn run<Q: QuoteStream>(&mut self, mut stream: Q) -> Result<()> {
        self.sink.publish(RatioStatus::Uninitialized.to_string());

        loop {
            match stream.next_event() {
                Ok(Some(event)) => {
                    if let Some(status) = self.handle_event(&event) {
                        self.sink.publish(status.to_string());
                    }
                }
                Ok(None) => {
                    info!(
                        "Stream closed after {} order-book updates ({} with ratios)",
                        self.applied, self.with_ratios
                    );
                    return Ok(());
                }
                Err(e) => return Err(self.fail(e)),
            }
        }
    }

    /// Applies one event and recomputes. `None` when the event was skipped.
    pub fn handle_event(&mut self, event: &OrderBookEvent) -> Option<RatioStatus> {
        let snapshot = OrderBookSnapshot::from_event(event, Utc::now());
        match self.store.update(&event.figi, snapshot) {
            Ok(()) => self.applied += 1,
            Err(SpreadError::UnknownInstrument(id)) => {
                warn!("Ignoring order book for untracked instrument {}", id);
                return None;
            }
            Err(e) => return Some(RatioStatus::Error(e.to_string())),
        }

        if !self.all_seen {
            match self.store.all_present(&self.store.tracked_ids()) {
                Ok(true) => {
                    info!("Order books received for all three legs");
                    self.all_seen = true;
                }
                Ok(false) => {}
                Err(e) => warn!("Snapshot store unavailable: {}", e),
            }
        }

        let status = self.engine.recompute(&self.store);
        if status.is_ratios() {
            self.with_ratios += 1;
        }
        match &status {
            RatioStatus::Error(reason) => warn!("Ratio recomputation failed: {}", reason),
            other => debug!("{} -> {:?}", event.figi, other),
        }
        Some(status)
    }

    /// Publishes a terminal status for `err` and turns it into a subscription failure.
    pub fn fail(&self, err: SpreadError) -> SpreadError {
        error!("Error watching order books: {}", err);
        self.sink.publish(format!("Error watching order books: {}", err));
        match err {
            SpreadError::Subscription(_) => err,
            other => SpreadError::Subscription(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spread_common::book::{PriceLevel, Quotation};
    use spread_common::instrument::{InstrumentId, InstrumentTriple};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct RecordingSink(Arc<Mutex<Vec<String>>>);

    impl RecordingSink {
        fn texts(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    impl ResultSink for RecordingSink {
        fn publish(&self, text: String) {
            self.0.lock().unwrap().push(text);
        }
    }

    /// Replays scripted results, then either ends or fails.
    struct ScriptedStream {
        events: VecDeque<OrderBookEvent>,
        failure: Option<SpreadError>,
    }

    impl QuoteStream for ScriptedStream {
        fn next_event(&mut self) -> Result<Option<OrderBookEvent>> {
            if let Some(event) = self.events.pop_front() {
                return Ok(Some(event));
            }
            match self.failure.take() {
                Some(e) => Err(e),
                None => Ok(None),
            }
        }
    }

    fn legs() -> InstrumentTriple {
        InstrumentTriple::new("SI".into(), "CNY".into(), "UCNY".into())
    }

    fn event(id: &str, bid: (i64, i32), ask: (i64, i32)) -> OrderBookEvent {
        OrderBookEvent {
            figi: InstrumentId::new(id),
            depth: 1,
            bids: vec![PriceLevel::new(Quotation::new(bid.0, bid.1), 3)],
            asks: vec![PriceLevel::new(Quotation::new(ask.0, ask.1), 4)],
            time_ms: 0,
        }
    }

    fn dispatcher(sink: RecordingSink) -> Dispatcher<RecordingSink> {
        Dispatcher::new(
            Arc::new(SnapshotStore::new(legs())),
            RatioEngine::new(legs()),
            sink,
        )
    }

    #[test]
    fn publishes_status_for_every_event() {
        let sink = RecordingSink::default();
        let stream = ScriptedStream {
            events: VecDeque::from(vec![
                event("SI", (95, 0), (95, 50_000_000)),
                event("CNY", (7, 790_000_000), (7, 800_000_000)),
                event("UCNY", (12, 80_000_000), (12, 100_000_000)),
            ]),
            failure: None,
        };

        dispatcher(sink.clone()).run(stream).unwrap();

        let texts = sink.texts();
        assert_eq!(texts.len(), 4);
        assert_eq!(texts[0], "Initializing...");
        assert_eq!(texts[1], "No data or incomplete data");
        assert_eq!(texts[2], "No data or incomplete data");
        assert_eq!(
            texts[3],
            "OPEN:  95.000 / 7.800 / 12.100 = 1.0066\nCLOSE: 95.050 / 7.790 / 12.080 = 1.0101"
        );
    }

    #[test]
    fn untracked_instrument_is_skipped() {
        let sink = RecordingSink::default();
        let mut dispatcher = dispatcher(sink.clone());
        assert!(dispatcher.handle_event(&event("BR", (80, 0), (81, 0))).is_none());
        assert_eq!(
            dispatcher.handle_event(&event("SI", (95, 0), (95, 1))),
            Some(RatioStatus::Incomplete)
        );
    }

    #[test]
    fn decode_failure_is_published_and_loop_continues() {
        let sink = RecordingSink::default();
        let stream = ScriptedStream {
            events: VecDeque::from(vec![
                event("SI", (95, 0), (95, 50_000_000)),
                event("CNY", (7, 790_000_000), (7, 800_000_000)),
                event("UCNY", (12, 2_000_000_000), (12, 100_000_000)),
                event("UCNY", (12, 80_000_000), (12, 100_000_000)),
            ]),
            failure: None,
        };

        dispatcher(sink.clone()).run(stream).unwrap();

        let texts = sink.texts();
        assert!(texts[3].starts_with("Error: "), "{}", texts[3]);
        assert!(texts[3].contains("leg C bid"));
        assert!(texts[4].starts_with("OPEN:"));
    }

    #[test]
    fn stream_failure_is_reported_and_terminal() {
        let sink = RecordingSink::default();
        let stream = ScriptedStream {
            events: VecDeque::from(vec![event("SI", (95, 0), (95, 50_000_000))]),
            failure: Some(SpreadError::Io(std::io::Error::other("connection reset"))),
        };

        let err = dispatcher(sink.clone()).run(stream).unwrap_err();

        assert!(matches!(err, SpreadError::Subscription(_)));
        assert!(err.is_fatal());
        let texts = sink.texts();
        assert!(
            texts
                .last()
                .unwrap()
                .starts_with("Error watching order books: ")
        );
    }
}
