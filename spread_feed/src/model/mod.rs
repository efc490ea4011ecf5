//! Domain models and utilities for the order-book feed.
//!
//! This module groups the data the command receiver, the streaming tasks and
//! the background generator share:
//! - `catalog` — listed futures and their synthetic price parameters.
//! - `book_generator` — background order-book generator and broadcasting.
//! - `ping_monitor` — in-memory keep-alive tracker for client timeouts.

pub mod book_generator;
pub mod catalog;
pub mod ping_monitor;
