//! Command-line arguments for the spread watcher.
//!
//! This module defines the CLI interface using `clap`. See `main` for end-to-end usage.
use std::time::Duration;

use clap::Parser;
use spread_common::instrument::LegPrefixes;
use spread_common::net::{COMMAND_PORT, DATA_PORT};

use crate::source::SubscriptionConfig;

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Feed IP address (IPv4 or IPv6) serving the catalog and order books.
    #[clap(long, default_value = "127.0.0.1")]
    pub server_ip: String,

    /// Feed TCP command port.
    #[clap(long, default_value_t = COMMAND_PORT)]
    pub command_port: u16,

    /// Feed UDP data port, target of the keep-alive pings.
    #[clap(long, default_value_t = DATA_PORT)]
    pub data_port: u16,

    /// Local UDP port to bind for receiving order books; 0 picks a free port.
    #[clap(long, default_value_t = 0)]
    pub listen_port: u16,

    /// FIGI prefix of leg A, the dividend of both ratios.
    #[clap(long, default_value = "FUTSI")]
    pub prefix_a: String,

    /// FIGI prefix of leg B.
    #[clap(long, default_value = "FUTCNY")]
    pub prefix_b: String,

    /// FIGI prefix of leg C.
    #[clap(long, default_value = "FUTUCNY")]
    pub prefix_c: String,

    /// Results buffered for the display before the oldest are dropped.
    #[clap(long, default_value_t = 16)]
    pub sink_capacity: usize,

    /// Seconds without order-book frames before the subscription counts as lost.
    #[clap(long, default_value_t = 15)]
    pub idle_timeout_secs: u64,
}

impl Args {
    /// Server IP with whitespace and stray quotes removed.
    pub fn server_ip(&self) -> String {
        self.server_ip.trim().replace('"', "")
    }

    /// Leg prefixes in formula order.
    pub fn prefixes(&self) -> LegPrefixes {
        LegPrefixes::new(
            self.prefix_a.trim().to_string(),
            self.prefix_b.trim().to_string(),
            self.prefix_c.trim().to_string(),
        )
    }

    /// Subscription settings for the order-book stream.
    pub fn subscription(&self) -> SubscriptionConfig {
        SubscriptionConfig {
            server_ip: self.server_ip(),
            command_port: self.command_port,
            data_port: self.data_port,
            listen_port: self.listen_port,
            idle_timeout: Duration::from_secs(self.idle_timeout_secs),
        }
    }
}
