//! Result sink and the console display that consumes it.
//!
//! The stream loop publishes through [`ResultSink`] and never waits for the
//! display. [`ChannelSink`] buffers a handful of texts in a bounded channel
//! and, when the display falls behind, evicts the oldest pending text so the
//! newest value always gets through.
use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use log::{debug, info, warn};

/// Receiver of formatted ratio reports and status texts.
pub trait ResultSink: Send {
    /// Hands `text` over for rendering. Must not block on the consumer.
    fn publish(&self, text: String);
}

/// Bounded, drop-oldest hand-off to a display thread.
///
/// The sink owns a receiver of its own channel for eviction, so the channel
/// never disconnects: once the display is gone, texts pile up to `capacity`
/// and older ones are evicted like with a slow display.
pub struct ChannelSink {
    tx: Sender<String>,
    backlog: Receiver<String>,
    dropped: AtomicU64,
}

impl ChannelSink {
    /// Creates a sink with room for `capacity` pending texts and the receiver
    /// the display should read from.
    pub fn new(capacity: usize) -> (Self, Receiver<String>) {
        let (tx, rx) = bounded(capacity.max(1));
        let sink = Self {
            tx,
            backlog: rx.clone(),
            dropped: AtomicU64::new(0),
        };
        (sink, rx)
    }

    /// Number of texts evicted because the display was behind.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl ResultSink for ChannelSink {
    fn publish(&self, text: String) {
        let mut pending = text;
        loop {
            match self.tx.try_send(pending) {
                Ok(()) => return,
                Err(TrySendError::Full(text)) => {
                    if self.backlog.try_recv().is_ok() {
                        self.dropped.fetch_add(1, Ordering::Relaxed);
                    }
                    pending = text;
                }
                // `backlog` keeps the channel connected.
                Err(TrySendError::Disconnected(_)) => return,
            }
        }
    }
}

impl Drop for ChannelSink {
    fn drop(&mut self) {
        let dropped = self.dropped();
        if dropped > 0 {
            info!("Display skipped {} stale results", dropped);
        }
    }
}

/// Renders published texts to a terminal.
pub struct ConsoleDisplay {
    title: String,
    last: Option<String>,
}

impl ConsoleDisplay {
    /// Creates a display headed by `title`.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            last: None,
        }
    }

    /// Writes `text` under the title unless it repeats the previous text.
    /// Returns whether anything was written.
    pub fn render<W: Write>(&mut self, out: &mut W, text: &str) -> io::Result<bool> {
        if self.last.as_deref() == Some(text) {
            return Ok(false);
        }
        writeln!(out, "== {} ==", self.title)?;
        writeln!(out, "{}", text)?;
        writeln!(out)?;
        out.flush()?;
        self.last = Some(text.to_string());
        Ok(true)
    }

    /// Runs the display on its own thread until every sender is dropped.
    pub fn spawn(mut self, rx: Receiver<String>) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("display".into())
            .spawn(move || {
                let stdout = io::stdout();
                for text in rx.iter() {
                    let mut out = stdout.lock();
                    if let Err(e) = self.render(&mut out, &text) {
                        warn!("Failed to render result: {}", e);
                    }
                }
                debug!("Display stopping...");
            })
    }
}
