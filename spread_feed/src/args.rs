//! Command-line arguments for the order-book feed.
use clap::Parser;

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Interface to bind the command and data ports on.
    #[clap(long, default_value = "0.0.0.0")]
    pub bind_ip: String,

    /// Milliseconds between order-book updates of each instrument.
    #[clap(long, default_value_t = 250)]
    pub tick_ms: u64,

    /// Seconds without PING after which a client stream is closed.
    #[clap(long, default_value_t = 5)]
    pub ping_timeout_secs: u64,

    /// Chance that a published book has one side empty.
    #[clap(long, default_value_t = 0.01, value_parser = parse_probability)]
    pub empty_side_probability: f64,
}

fn parse_probability(value: &str) -> Result<f64, String> {
    let p: f64 = value.trim().parse().map_err(|e| format!("{}", e))?;
    if !(0.0..=1.0).contains(&p) {
        return Err(format!("{} is not a probability between 0 and 1", value));
    }
    Ok(p)
}
