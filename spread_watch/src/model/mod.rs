//! Data model of the watcher.
//!
//! - `snapshot` — latest top-of-book state of one instrument.
//! - `ratio` — open/close ratio values and the status published to the sink.
pub mod ratio;
pub mod snapshot;
