//! Startup resolution of the three legs to live futures.
//!
//! The feed publishes its catalog of listed futures; for every leg the
//! resolver keeps the contracts whose FIGI starts with the configured prefix
//! and picks the nearest one that has not expired yet.
use std::thread;

use chrono::{DateTime, Utc};
use log::info;
use spread_common::command::Command;
use spread_common::instrument::{Instrument, LegPrefixes, LegSet, select_front_month};
use spread_common::{Result, SpreadError};

use crate::sender::CommandSender;

/// Maps leg prefixes to concrete instruments.
pub trait InstrumentResolver: Send {
    /// Resolves all three legs or fails with `SpreadError::Resolution`.
    fn resolve(&self, prefixes: &LegPrefixes) -> Result<LegSet<Instrument>>;
}

/// Resolver backed by the feed's `FUTURES` catalog.
pub struct CatalogResolver {
    server_address: String,
}

impl CatalogResolver {
    /// Resolver querying the command port at `server_address` ("ip:port").
    pub fn new(server_address: impl Into<String>) -> Self {
        Self {
            server_address: server_address.into(),
        }
    }

    fn fetch_catalog(&self) -> Result<Vec<Instrument>> {
        let reply = CommandSender::request(&self.server_address, &Command::futures())?;
        Ok(serde_json::from_slice(&reply)?)
    }
}

impl InstrumentResolver for CatalogResolver {
    fn resolve(&self, prefixes: &LegPrefixes) -> Result<LegSet<Instrument>> {
        let catalog = self.fetch_catalog().map_err(|e| {
            SpreadError::Resolution(format!(
                "catalog request to {} failed: {}",
                self.server_address, e
            ))
        })?;
        info!("Catalog lists {} futures", catalog.len());
        resolve_from_catalog(&catalog, prefixes, Utc::now())
    }
}

/// Front-month pick for every leg out of `catalog`.
pub fn resolve_from_catalog(
    catalog: &[Instrument],
    prefixes: &LegPrefixes,
    now: DateTime<Utc>,
) -> Result<LegSet<Instrument>> {
    prefixes.clone().try_map(|leg, prefix| {
        select_front_month(catalog, &prefix, now)
            .cloned()
            .ok_or_else(|| {
                SpreadError::Resolution(format!(
                    "no active future found for {} (leg {})",
                    prefix, leg
                ))
            })
    })
}

/// Runs `resolver` on a short-lived thread and waits for it.
pub fn resolve_blocking<R>(resolver: R, prefixes: LegPrefixes) -> Result<LegSet<Instrument>>
where
    R: InstrumentResolver + 'static,
{
    let handle = thread::Builder::new()
        .name("instrument-resolver".into())
        .spawn(move || resolver.resolve(&prefixes))?;
    handle
        .join()
        .map_err(|_| SpreadError::Resolution("resolver thread panicked".into()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use spread_common::instrument::InstrumentId;

    fn future(figi: &str, ticker: &str, y: i32, m: u32) -> Instrument {
        Instrument {
            figi: InstrumentId::new(figi),
            ticker: ticker.into(),
            class_code: "SPBFUT".into(),
            expiration_date: Some(Utc.with_ymd_and_hms(y, m, 18, 15, 0, 0).unwrap()),
        }
    }

    fn catalog() -> Vec<Instrument> {
        vec![
            future("FUTSI0926000", "SiU6", 2026, 9),
            future("FUTSI1226000", "SiZ6", 2026, 12),
            future("FUTCNY122600", "CRZ6", 2026, 12),
            future("FUTUCNY12260", "UCZ6", 2026, 12),
            future("FUTUCNY03270", "UCH7", 2027, 3),
        ]
    }

    struct FixedResolver(Vec<Instrument>);

    impl InstrumentResolver for FixedResolver {
        fn resolve(&self, prefixes: &LegPrefixes) -> Result<LegSet<Instrument>> {
            let now = Utc.with_ymd_and_hms(2026, 10, 16, 0, 0, 0).unwrap();
            resolve_from_catalog(&self.0, prefixes, now)
        }
    }

    #[test]
    fn resolves_every_leg_to_its_front_month() {
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 0, 0, 0).unwrap();
        let legs = resolve_from_catalog(&catalog(), &LegPrefixes::default(), now).unwrap();

        assert_eq!(legs.a.ticker, "SiZ6");
        assert_eq!(legs.b.ticker, "CRZ6");
        assert_eq!(legs.c.ticker, "UCZ6");
    }

    #[test]
    fn missing_leg_is_a_resolution_failure() {
        let now = Utc.with_ymd_and_hms(2027, 1, 10, 0, 0, 0).unwrap();
        let err = resolve_from_catalog(&catalog(), &LegPrefixes::default(), now).unwrap_err();

        assert!(err.is_fatal());
        assert!(err.to_string().contains("FUTSI"), "{err}");
    }

    #[test]
    fn blocking_resolution_returns_thread_result() {
        let legs = resolve_blocking(FixedResolver(catalog()), LegPrefixes::default()).unwrap();
        assert_eq!(legs.a.figi, InstrumentId::new("FUTSI1226000"));
    }

    #[test]
    fn unreachable_catalog_fails_resolution() {
        let resolver = CatalogResolver::new("127.0.0.1:1");
        let err = resolver.resolve(&LegPrefixes::default()).unwrap_err();
        assert!(matches!(err, SpreadError::Resolution(_)));
    }
}
