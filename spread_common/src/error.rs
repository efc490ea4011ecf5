//! Error types shared between the feed and the watcher.
//!
//! `SpreadError` covers both the plumbing failures (I/O, serialization,
//! channels, locks) and the domain taxonomy of the watcher: resolution and
//! subscription failures are fatal, decode failures are reported and
//! survived, unknown instruments are skipped.
use std::io;
use std::sync::PoisonError;

use thiserror::Error;

/// Unified error type shared by every crate of the workspace.
#[derive(Error, Debug)]
pub enum SpreadError {
    /// I/O error originating from the standard library or sockets.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Generic formatting/validation error with a human-readable message.
    #[error("Format error: {0}")]
    Format(String),

    /// One of the legs could not be mapped to a live instrument. Fatal to startup.
    #[error("Instrument resolution failed: {0}")]
    Resolution(String),

    /// The order-book subscription failed or was lost. Fatal to the stream loop.
    #[error("Subscription failed: {0}")]
    Subscription(String),

    /// Malformed price fields in an otherwise well-formed order book.
    #[error("Decode error: {0}")]
    Decode(String),

    /// An event arrived for an instrument that is not one of the tracked legs.
    #[error("Unknown instrument: {0}")]
    UnknownInstrument(String),

    /// Failure while decoding with `bincode` (invalid or truncated frames, etc.).
    #[error("Bincode deserialization error: {0}")]
    BincodeDecode(#[from] bincode::error::DecodeError),

    /// Failure while encoding with `bincode`.
    #[error("Bincode serialization error: {0}")]
    BincodeEncode(#[from] bincode::error::EncodeError),

    /// Failure while encoding/decoding JSON via serde_json.
    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    /// Channel send failed (e.g., receiver dropped); contains a short context string.
    #[error("Channel send failed: {0}")]
    ChannelSend(String),

    /// Channel receive failed (e.g., sender closed); contains a short context string.
    #[error("Channel receive failed: {0}")]
    ChannelRecv(String),

    /// A poisoned mutex/lock was encountered.
    #[error("Mutex Lock Poisoned: {0}")]
    MutexLock(String),
}

impl SpreadError {
    /// `true` for the two failures that terminate execution.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SpreadError::Resolution(_) | SpreadError::Subscription(_))
    }
}

impl<T> From<PoisonError<T>> for SpreadError {
    fn from(err: PoisonError<T>) -> Self {
        SpreadError::MutexLock(err.to_string())
    }
}
