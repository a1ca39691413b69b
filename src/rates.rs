//! Rate tables

use rust_decimal::Decimal;
use rusty_money::{Money, iso::Currency};
use slotmap::new_key_type;
use thiserror::Error;

new_key_type! {
    /// Tariff Key
    pub struct TariffKey;
}

/// Errors raised while building a rate table.
#[derive(Debug, Error, PartialEq)]
pub enum RateTableError {
    /// A step's threshold is not strictly greater than the previous one (step index).
    #[error("step {index} does not increase the threshold of the previous step")]
    ThresholdsNotIncreasing {
        /// Index of the offending step.
        index: usize,
    },

    /// A step's currency differs from the table currency (index, step currency, table currency).
    #[error("step {0} has currency {1}, but table has currency {2}")]
    CurrencyMismatch(usize, &'static str, &'static str),
}

/// One tier of a rate table: from `threshold_minutes` onwards, the stay
/// costs `amount`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateStep<'a> {
    threshold_minutes: u64,
    amount: Money<'a, Currency>,
}

impl<'a> RateStep<'a> {
    /// Create a new rate step.
    pub fn new(threshold_minutes: u64, amount: Money<'a, Currency>) -> Self {
        Self {
            threshold_minutes,
            amount,
        }
    }

    /// Elapsed minutes at which this tier starts to apply.
    pub fn threshold_minutes(&self) -> u64 {
        self.threshold_minutes
    }

    /// Amount charged for a stay inside this tier.
    pub fn amount(&self) -> Money<'a, Currency> {
        self.amount
    }
}

/// An ordered step function from elapsed minutes to an amount due.
///
/// Thresholds are strictly increasing; lookup selects the last step whose
/// threshold is at or below the elapsed time.
#[derive(Debug, Clone, PartialEq)]
pub struct RateTable<'a> {
    steps: Vec<RateStep<'a>>,
    currency: &'static Currency,
}

impl<'a> RateTable<'a> {
    /// Create a rate table from the given steps.
    ///
    /// An empty table is valid: lookups on it find no tier, and the fee
    /// evaluator treats that as a zero amount.
    ///
    /// # Errors
    ///
    /// - [`RateTableError::ThresholdsNotIncreasing`]: thresholds are not strictly increasing.
    /// - [`RateTableError::CurrencyMismatch`]: a step amount uses a different currency.
    pub fn new(
        steps: impl Into<Vec<RateStep<'a>>>,
        currency: &'static Currency,
    ) -> Result<Self, RateTableError> {
        let steps = steps.into();

        for (index, step) in steps.iter().enumerate() {
            let step_currency = step.amount().currency();
            if step_currency != currency {
                return Err(RateTableError::CurrencyMismatch(
                    index,
                    step_currency.iso_alpha_code,
                    currency.iso_alpha_code,
                ));
            }
        }

        for (index, pair) in steps.windows(2).enumerate() {
            if let [prev, next] = pair
                && next.threshold_minutes() <= prev.threshold_minutes()
            {
                return Err(RateTableError::ThresholdsNotIncreasing { index: index + 1 });
            }
        }

        Ok(RateTable { steps, currency })
    }

    /// The tier that applies after `elapsed_minutes`: the last step whose
    /// threshold is at or below the elapsed time.
    ///
    /// Returns `None` when the table is empty or the elapsed time is below
    /// every threshold.
    pub fn tier(&self, elapsed_minutes: u64) -> Option<&RateStep<'a>> {
        self.steps
            .iter()
            .take_while(|step| step.threshold_minutes() <= elapsed_minutes)
            .last()
    }

    /// Amount for a stay of `elapsed_minutes`, if any tier applies.
    pub fn amount_for(&self, elapsed_minutes: u64) -> Option<Money<'a, Currency>> {
        self.tier(elapsed_minutes).map(RateStep::amount)
    }

    /// The steps of the table, in threshold order.
    pub fn steps(&self) -> &[RateStep<'a>] {
        &self.steps
    }

    /// Number of steps in the table.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Check whether the table has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The currency of all step amounts.
    pub fn currency(&self) -> &'static Currency {
        self.currency
    }
}

/// A gate tariff: how a non-subscribed stay is billed.
#[derive(Debug, Clone, PartialEq)]
pub enum Tariff<'a> {
    /// Tiered billing over elapsed minutes.
    Stepped(RateTable<'a>),

    /// Per-block billing: every started block of `block_minutes` costs
    /// `amount`, so the total grows without bound for long stays.
    HourlyBlock {
        /// Size of one billing block in minutes.
        block_minutes: u64,
        /// Amount charged per started block.
        amount: Money<'a, Currency>,
    },

    /// Flat amount per stay regardless of elapsed time (used for motorcycles
    /// and similar day-rate vehicles).
    DailyFlat(Money<'a, Currency>),
}

impl<'a> Tariff<'a> {
    /// Amount for a stay of `elapsed_minutes`, if the tariff produces one.
    ///
    /// A zero block size bills per started minute.
    pub fn amount_for(&self, elapsed_minutes: u64) -> Option<Money<'a, Currency>> {
        match self {
            Tariff::Stepped(table) => table.amount_for(elapsed_minutes),
            Tariff::HourlyBlock {
                block_minutes,
                amount,
            } => {
                let block = (*block_minutes).max(1);
                let blocks = Decimal::from(elapsed_minutes.div_ceil(block));

                Some(Money::from_decimal(*amount.amount() * blocks, amount.currency()))
            }
            Tariff::DailyFlat(amount) => Some(*amount),
        }
    }

    /// The currency of the tariff's amounts.
    pub fn currency(&self) -> &'a Currency {
        match self {
            Tariff::Stepped(table) => table.currency(),
            Tariff::HourlyBlock { amount, .. } => amount.currency(),
            Tariff::DailyFlat(amount) => amount.currency(),
        }
    }
}
