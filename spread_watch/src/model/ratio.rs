//! Ratio values and the status text handed to the result sink.
use std::fmt;

use rust_decimal::Decimal;
use spread_common::instrument::LegSet;

/// Digits kept when a ratio is shown.
pub const DISPLAY_DP: u32 = 4;
/// Digits kept when an input price is shown.
pub const PRICE_DP: u32 = 3;

/// Both directional ratios with the six prices they were built from.
///
/// Values keep full precision; rounding happens only on display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatioResult {
    /// bid(A), ask(B), ask(C).
    pub open_inputs: LegSet<Decimal>,
    /// bid(A) / ask(B) / ask(C).
    pub open_value: Decimal,
    /// ask(A), bid(B), bid(C).
    pub close_inputs: LegSet<Decimal>,
    /// ask(A) / bid(B) / bid(C).
    pub close_value: Decimal,
}

impl RatioResult {
    /// Open ratio rounded for display.
    pub fn open_rounded(&self) -> Decimal {
        self.open_value.round_dp(DISPLAY_DP)
    }

    /// Close ratio rounded for display.
    pub fn close_rounded(&self) -> Decimal {
        self.close_value.round_dp(DISPLAY_DP)
    }
}

/// Outcome of one recomputation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RatioStatus {
    /// Nothing computed yet.
    Uninitialized,
    /// At least one leg or side is missing.
    Incomplete,
    /// Both ratios are available.
    Ratios(RatioResult),
    /// Price data could not be decoded.
    Error(String),
}

impl RatioStatus {
    /// `true` when numeric ratios are available.
    pub fn is_ratios(&self) -> bool {
        matches!(self, RatioStatus::Ratios(_))
    }
}

impl fmt::Display for RatioStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RatioStatus::Uninitialized => f.write_str("Initializing..."),
            RatioStatus::Incomplete => f.write_str("No data or incomplete data"),
            RatioStatus::Error(reason) => write!(f, "Error: {}", reason),
            RatioStatus::Ratios(r) => {
                let (o, c) = (&r.open_inputs, &r.close_inputs);
                writeln!(
                    f,
                    "OPEN:  {:.3} / {:.3} / {:.3} = {:.4}",
                    o.a.round_dp(PRICE_DP),
                    o.b.round_dp(PRICE_DP),
                    o.c.round_dp(PRICE_DP),
                    r.open_rounded()
                )?;
                write!(
                    f,
                    "CLOSE: {:.3} / {:.3} / {:.3} = {:.4}",
                    c.a.round_dp(PRICE_DP),
                    c.b.round_dp(PRICE_DP),
                    c.c.round_dp(PRICE_DP),
                    r.close_rounded()
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn report_has_two_lines_with_all_prices() {
        let status = RatioStatus::Ratios(RatioResult {
            open_inputs: LegSet::new(dec("95"), dec("7.8"), dec("12.1")),
            open_value: dec("1.00656918838737"),
            close_inputs: LegSet::new(dec("95.05"), dec("7.79"), dec("12.08")),
            close_value: dec("1.01006129440869"),
        });

        assert_eq!(
            status.to_string(),
            "OPEN:  95.000 / 7.800 / 12.100 = 1.0066\nCLOSE: 95.050 / 7.790 / 12.080 = 1.0101"
        );
    }

    #[test]
    fn status_texts() {
        assert_eq!(RatioStatus::Uninitialized.to_string(), "Initializing...");
        assert_eq!(RatioStatus::Incomplete.to_string(), "No data or incomplete data");
        assert_eq!(
            RatioStatus::Error("leg B ask: bad nano".into()).to_string(),
            "Error: leg B ask: bad nano"
        );
        assert!(!RatioStatus::Incomplete.is_ratios());
    }
}
