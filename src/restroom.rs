//! Restroom billing
//!
//! Restroom access is billed up front with a fixed fee per visit; there is
//! no open/close cycle and nothing to assess on exit. The log snapshots the
//! fee amount at visit time, so later fee edits do not rewrite past income.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rusty_money::{Money, MoneyError, iso::Currency};
use slotmap::{SlotMap, new_key_type};
use thiserror::Error;

new_key_type! {
    /// Restroom Fee Key
    pub struct RestroomFeeKey;
}

/// Errors raised by restroom operations.
#[derive(Debug, Error, PartialEq)]
pub enum RestroomError {
    /// The fee key is not registered with this log.
    #[error("unknown restroom fee")]
    UnknownFee(RestroomFeeKey),

    /// The fee has been retired and can no longer be charged.
    #[error("restroom fee is no longer active")]
    InactiveFee(RestroomFeeKey),

    /// A fee's currency differs from the log currency (expected, actual).
    #[error("expected currency {expected}, got {actual}")]
    CurrencyMismatch {
        /// The log currency.
        expected: &'static str,
        /// The offending currency.
        actual: &'static str,
    },

    /// Wrapped money arithmetic error.
    #[error(transparent)]
    Money(#[from] MoneyError),
}

/// A fixed fee charged per restroom visit.
#[derive(Debug, Clone, PartialEq)]
pub struct RestroomFee<'a> {
    name: String,
    amount: Money<'a, Currency>,
    active: bool,
}

impl<'a> RestroomFee<'a> {
    /// Create an active fee.
    pub fn new(name: impl Into<String>, amount: Money<'a, Currency>) -> Self {
        Self {
            name: name.into(),
            amount,
            active: true,
        }
    }

    /// The fee's display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The amount charged per visit.
    pub fn amount(&self) -> Money<'a, Currency> {
        self.amount
    }

    /// Whether the fee can still be charged.
    pub fn is_active(&self) -> bool {
        self.active
    }
}

/// One paid restroom visit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RestroomVisit<'a> {
    at: DateTime<Utc>,
    fee: RestroomFeeKey,
    amount: Money<'a, Currency>,
}

impl<'a> RestroomVisit<'a> {
    /// When the visit was charged.
    pub fn at(&self) -> DateTime<Utc> {
        self.at
    }

    /// The fee charged.
    pub fn fee(&self) -> RestroomFeeKey {
        self.fee
    }

    /// The amount charged, as snapshotted at visit time.
    pub fn amount(&self) -> Money<'a, Currency> {
        self.amount
    }
}

/// Fee catalogue and visit log for the restrooms.
#[derive(Debug)]
pub struct RestroomLog<'a> {
    currency: &'static Currency,
    fees: SlotMap<RestroomFeeKey, RestroomFee<'a>>,
    visits: Vec<RestroomVisit<'a>>,
}

impl<'a> RestroomLog<'a> {
    /// Create an empty log billing in the given currency.
    pub fn new(currency: &'static Currency) -> Self {
        Self {
            currency,
            fees: SlotMap::with_key(),
            visits: Vec::new(),
        }
    }

    /// Register a fee in the catalogue.
    ///
    /// # Errors
    ///
    /// Returns [`RestroomError::CurrencyMismatch`] if the fee amount is not
    /// in the log currency.
    pub fn add_fee(&mut self, fee: RestroomFee<'a>) -> Result<RestroomFeeKey, RestroomError> {
        let fee_currency = fee.amount().currency();
        if fee_currency != self.currency {
            return Err(RestroomError::CurrencyMismatch {
                expected: self.currency.iso_alpha_code,
                actual: fee_currency.iso_alpha_code,
            });
        }

        Ok(self.fees.insert(fee))
    }

    /// Look up a fee in the catalogue.
    pub fn fee(&self, key: RestroomFeeKey) -> Option<&RestroomFee<'a>> {
        self.fees.get(key)
    }

    /// Retire a fee so it can no longer be charged. Past visits keep their
    /// snapshotted amounts.
    ///
    /// # Errors
    ///
    /// Returns [`RestroomError::UnknownFee`] if the key is not registered.
    pub fn retire_fee(&mut self, key: RestroomFeeKey) -> Result<(), RestroomError> {
        let fee = self.fees.get_mut(key).ok_or(RestroomError::UnknownFee(key))?;
        fee.active = false;

        Ok(())
    }

    /// Charge one visit at the given fee.
    ///
    /// # Errors
    ///
    /// - [`RestroomError::UnknownFee`]: the fee key is not registered.
    /// - [`RestroomError::InactiveFee`]: the fee has been retired.
    pub fn record_visit(
        &mut self,
        fee: RestroomFeeKey,
        at: DateTime<Utc>,
    ) -> Result<RestroomVisit<'a>, RestroomError> {
        let catalogue_fee = self.fees.get(fee).ok_or(RestroomError::UnknownFee(fee))?;

        if !catalogue_fee.is_active() {
            return Err(RestroomError::InactiveFee(fee));
        }

        let visit = RestroomVisit {
            at,
            fee,
            amount: catalogue_fee.amount(),
        };
        self.visits.push(visit);

        Ok(visit)
    }

    /// All recorded visits, oldest first.
    pub fn visits(&self) -> &[RestroomVisit<'a>] {
        &self.visits
    }

    /// Number of visits on a given day.
    pub fn visits_on(&self, date: NaiveDate) -> usize {
        self.visits
            .iter()
            .filter(|visit| visit.at().date_naive() == date)
            .count()
    }

    /// Total income for a given day.
    ///
    /// # Errors
    ///
    /// Returns [`RestroomError::Money`] if summation fails.
    pub fn income_on(&self, date: NaiveDate) -> Result<Money<'a, Currency>, RestroomError> {
        self.sum_visits(|visit| visit.at().date_naive() == date)
    }

    /// Total income for a given calendar month.
    ///
    /// # Errors
    ///
    /// Returns [`RestroomError::Money`] if summation fails.
    pub fn income_in_month(
        &self,
        year: i32,
        month: u32,
    ) -> Result<Money<'a, Currency>, RestroomError> {
        self.sum_visits(|visit| visit.at().year() == year && visit.at().month() == month)
    }

    /// The currency the log bills in.
    pub fn currency(&self) -> &'static Currency {
        self.currency
    }

    fn sum_visits(
        &self,
        keep: impl Fn(&RestroomVisit<'a>) -> bool,
    ) -> Result<Money<'a, Currency>, RestroomError> {
        let total = self
            .visits
            .iter()
            .filter(|visit| keep(visit))
            .try_fold(Money::from_minor(0, self.currency), |acc, visit| {
                acc.add(visit.amount())
            })?;

        Ok(total)
    }
}
