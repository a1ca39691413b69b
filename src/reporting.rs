//! Income reporting
//!
//! Point-in-time folds over the access ledger and the restroom log. The
//! dashboard itself lives elsewhere; this module only aggregates amounts and
//! renders a plain-text daily summary.

use std::io;

use chrono::{Datelike, NaiveDate};
use rusty_money::{Money, MoneyError, iso::Currency};
use smallvec::SmallVec;
use tabled::{
    builder::Builder,
    settings::{Alignment, Style, object::Columns},
};
use thiserror::Error;

use crate::{
    ledger::Ledger,
    restroom::{RestroomError, RestroomLog},
};

/// Errors that can occur while aggregating or rendering reports.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Wrapped money arithmetic or currency mismatch error.
    #[error(transparent)]
    Money(#[from] MoneyError),

    /// Error bubbled up from restroom aggregation.
    #[error(transparent)]
    Restroom(#[from] RestroomError),

    /// IO error while writing a rendered report.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Total parking income billed on a given day.
///
/// Only closed records count; open stays have not been billed yet. Records
/// are filtered by their departure date.
///
/// # Errors
///
/// Returns [`ReportError::Money`] if summation fails.
pub fn parking_income_on<'a>(
    ledger: &Ledger<'a>,
    date: NaiveDate,
) -> Result<Money<'a, Currency>, ReportError> {
    sum_billed(ledger, |departed| departed == date)
}

/// Total parking income billed in a given calendar month.
///
/// # Errors
///
/// Returns [`ReportError::Money`] if summation fails.
pub fn parking_income_in_month<'a>(
    ledger: &Ledger<'a>,
    year: i32,
    month: u32,
) -> Result<Money<'a, Currency>, ReportError> {
    sum_billed(ledger, |departed| {
        departed.year() == year && departed.month() == month
    })
}

/// Number of vehicles that departed on a given day.
pub fn departures_on(ledger: &Ledger<'_>, date: NaiveDate) -> usize {
    ledger
        .records()
        .filter(|(_, record)| {
            record
                .departed_at()
                .is_some_and(|departed| departed.date_naive() == date)
        })
        .count()
}

/// Number of vehicles currently inside.
pub fn occupancy(ledger: &Ledger<'_>) -> usize {
    ledger.open_count()
}

/// Free spaces left in the lot, when the ledger knows its capacity.
pub fn available_spaces(ledger: &Ledger<'_>) -> Option<usize> {
    ledger.available_spaces()
}

fn sum_billed<'a>(
    ledger: &Ledger<'a>,
    keep: impl Fn(NaiveDate) -> bool,
) -> Result<Money<'a, Currency>, ReportError> {
    let total = ledger
        .records()
        .filter(|(_, record)| {
            record
                .departed_at()
                .is_some_and(|departed| keep(departed.date_naive()))
        })
        .filter_map(|(_, record)| record.billed())
        .try_fold(Money::from_minor(0, ledger.currency()), |acc, billed| {
            acc.add(billed.amount())
        })?;

    Ok(total)
}

/// One day of income across the parking lot and the restrooms.
#[derive(Debug, Clone)]
pub struct DailySummary<'a> {
    date: NaiveDate,
    parking_income: Money<'a, Currency>,
    departures: usize,
    restroom_income: Money<'a, Currency>,
    restroom_visits: usize,
    total: Money<'a, Currency>,
}

impl<'a> DailySummary<'a> {
    /// Aggregate one day of income from the ledger and the restroom log.
    ///
    /// # Errors
    ///
    /// Returns a [`ReportError`] if summation fails, including when ledger
    /// and log bill in different currencies.
    pub fn collect(
        ledger: &Ledger<'a>,
        restroom: &RestroomLog<'a>,
        date: NaiveDate,
    ) -> Result<Self, ReportError> {
        let parking_income = parking_income_on(ledger, date)?;
        let restroom_income = restroom.income_on(date)?;
        let total = parking_income.add(restroom_income)?;

        Ok(Self {
            date,
            parking_income,
            departures: departures_on(ledger, date),
            restroom_income,
            restroom_visits: restroom.visits_on(date),
            total,
        })
    }

    /// The day covered by the summary.
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Parking income billed on the day.
    pub fn parking_income(&self) -> Money<'a, Currency> {
        self.parking_income
    }

    /// Vehicles that departed on the day.
    pub fn departures(&self) -> usize {
        self.departures
    }

    /// Restroom income charged on the day.
    pub fn restroom_income(&self) -> Money<'a, Currency> {
        self.restroom_income
    }

    /// Restroom visits charged on the day.
    pub fn restroom_visits(&self) -> usize {
        self.restroom_visits
    }

    /// Combined parking and restroom income.
    pub fn total(&self) -> Money<'a, Currency> {
        self.total
    }

    /// Write the summary as a two-column table.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Io`] if writing fails.
    pub fn write_to(&self, mut out: impl io::Write) -> Result<(), ReportError> {
        let rows: SmallVec<[(String, String); 6]> = SmallVec::from_iter([
            ("Date".to_owned(), self.date.to_string()),
            ("Parking income".to_owned(), self.parking_income.to_string()),
            ("Departures".to_owned(), self.departures.to_string()),
            (
                "Restroom income".to_owned(),
                self.restroom_income.to_string(),
            ),
            (
                "Restroom visits".to_owned(),
                self.restroom_visits.to_string(),
            ),
            ("Total income".to_owned(), self.total.to_string()),
        ]);

        let mut builder = Builder::default();
        for (label, value) in rows {
            builder.push_record([label, value]);
        }

        let mut table = builder.build();
        table
            .with(Style::sharp())
            .modify(Columns::last(), Alignment::right());

        writeln!(out, "{table}")?;

        Ok(())
    }
}
