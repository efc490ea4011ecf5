//! Synthetic futures catalog.
//!
//! Lists quarterly contracts for three underlyings (USD/RUB, CNY/RUB and
//! USD/CNY) around a reference date: the quarter that just expired and the
//! next three. Contracts expire on the third Thursday of March, June,
//! September and December at 15:50 UTC.
use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc, Weekday};
use spread_common::book::NANO;
use spread_common::instrument::{Instrument, InstrumentId};

/// Trading class of every listed contract.
pub const CLASS_CODE: &str = "SPBFUT";

/// Underlying with its FIGI stem, ticker stem and price model.
struct Underlying {
    figi_stem: &'static str,
    ticker_stem: &'static str,
    reference_nanos: i64,
    tick_nanos: i64,
}

const UNDERLYINGS: [Underlying; 3] = [
    Underlying {
        figi_stem: "FUTSI",
        ticker_stem: "Si",
        reference_nanos: 95_000 * NANO,
        tick_nanos: NANO,
    },
    Underlying {
        figi_stem: "FUTCNY",
        ticker_stem: "CR",
        reference_nanos: 13 * NANO,
        tick_nanos: NANO / 1_000,
    },
    Underlying {
        figi_stem: "FUTUCNY",
        ticker_stem: "UC",
        reference_nanos: 7_300_000_000,
        tick_nanos: NANO / 10_000,
    },
];

/// A listed contract and the parameters its synthetic book is driven by.
#[derive(Debug, Clone)]
pub struct ListedFuture {
    /// Catalog record served to clients.
    pub instrument: Instrument,
    /// Starting mid price in billionths.
    pub reference_nanos: i64,
    /// Minimum price step in billionths.
    pub tick_nanos: i64,
}

impl ListedFuture {
    /// `true` while the contract trades at `now`.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.instrument.expiration_date.is_some_and(|exp| exp >= now)
    }
}

/// All contracts the feed knows about.
#[derive(Debug, Clone)]
pub struct Catalog {
    listings: Vec<ListedFuture>,
}

impl Catalog {
    /// Quarterly listings around `today`.
    pub fn quarterly(today: NaiveDate) -> Self {
        let mut year = today.year();
        let mut month = (today.month0() / 3) * 3 + 3;
        // step back one quarter so an expired contract is listed too
        if month == 3 {
            year -= 1;
            month = 12;
        } else {
            month -= 3;
        }

        let mut listings = Vec::new();
        for _ in 0..4 {
            if let Some(expiration) = quarterly_expiration(year, month) {
                for u in &UNDERLYINGS {
                    listings.push(ListedFuture {
                        instrument: Instrument {
                            figi: InstrumentId::new(format!(
                                "{:0<12}",
                                format!("{}{:02}{:02}", u.figi_stem, month, year % 100)
                            )),
                            ticker: format!(
                                "{}{}{}",
                                u.ticker_stem,
                                month_code(month),
                                year % 10
                            ),
                            class_code: CLASS_CODE.to_string(),
                            expiration_date: Some(expiration),
                        },
                        reference_nanos: u.reference_nanos,
                        tick_nanos: u.tick_nanos,
                    });
                }
            }
            month += 3;
            if month > 12 {
                month = 3;
                year += 1;
            }
        }
        Self { listings }
    }

    /// Every listing, expired ones included.
    pub fn listings(&self) -> &[ListedFuture] {
        &self.listings
    }

    /// Catalog records as served to clients.
    pub fn instruments(&self) -> Vec<Instrument> {
        self.listings.iter().map(|l| l.instrument.clone()).collect()
    }

    /// Listings that still trade at `now`.
    pub fn live(&self, now: DateTime<Utc>) -> Vec<ListedFuture> {
        self.listings
            .iter()
            .filter(|l| l.is_live(now))
            .cloned()
            .collect()
    }

    /// Listing for `figi`, if any.
    pub fn find(&self, figi: &InstrumentId) -> Option<&ListedFuture> {
        self.listings.iter().find(|l| &l.instrument.figi == figi)
    }
}

fn quarterly_expiration(year: i32, month: u32) -> Option<DateTime<Utc>> {
    let day = NaiveDate::from_weekday_of_month_opt(year, month, Weekday::Thu, 3)?;
    let at = day.and_hms_opt(15, 50, 0)?;
    Some(Utc.from_utc_datetime(&at))
}

fn month_code(month: u32) -> char {
    match month {
        3 => 'H',
        6 => 'M',
        9 => 'U',
        _ => 'Z',
    }
}
