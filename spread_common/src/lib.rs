//!
//! Common types and utilities shared by the order-book feed and the spread watcher.
//!
//! This crate aggregates:
//! - `error` — unified error type `SpreadError` used across the workspace.
//! - `result` — handy `Result<T, SpreadError>` alias.
//! - `instrument` — instrument ids, the fixed leg triple and front-month selection.
//! - `book` — fixed-point prices and order-book events as they travel on the wire.
//! - `command` — TCP command payloads exchanged between watcher and feed.
//! - `net` — networking constants and small helpers.
#![warn(missing_docs)]
pub mod book;
pub mod command;
pub mod error;
pub mod instrument;
pub mod net;
pub mod result;

pub use book::{OrderBookEvent, PriceLevel, Quotation};
pub use command::Command;
pub use error::SpreadError;
pub use instrument::{Instrument, InstrumentId, InstrumentTriple, Leg, LegPrefixes, LegSet};
pub use result::Result;
