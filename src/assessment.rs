//! Fee assessment
//!
//! The evaluator is a pure function of its inputs: timestamps, an optional
//! tariff, and an optional subscription policy. It never reaches into shared
//! state, so every billing rule can be exercised directly in tests.

use chrono::{DateTime, TimeDelta, Utc};
use rusty_money::{Money, iso::Currency};
use thiserror::Error;

use crate::{
    policies::{BillingKind, SubscriptionPolicy},
    rates::Tariff,
};

/// Errors raised while assessing a stay.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssessmentError {
    /// The departure timestamp precedes the entry timestamp.
    #[error("departure {departed_at} precedes entry {entered_at}")]
    ExitBeforeEntry {
        /// When the vehicle entered.
        entered_at: DateTime<Utc>,
        /// The (earlier) departure timestamp.
        departed_at: DateTime<Utc>,
    },
}

/// Whole elapsed minutes between entry and departure, rounded up.
///
/// A 61-second stay counts as 2 minutes; a zero-length stay counts as 0.
///
/// # Errors
///
/// Returns [`AssessmentError::ExitBeforeEntry`] when `departed_at` precedes
/// `entered_at`. Clock skew must be handled by the caller; a negative stay is
/// never billed.
pub fn elapsed_minutes(
    entered_at: DateTime<Utc>,
    departed_at: DateTime<Utc>,
) -> Result<u64, AssessmentError> {
    let elapsed = departed_at.signed_duration_since(entered_at);

    if elapsed < TimeDelta::zero() {
        return Err(AssessmentError::ExitBeforeEntry {
            entered_at,
            departed_at,
        });
    }

    Ok(elapsed.num_milliseconds().unsigned_abs().div_ceil(60_000))
}

/// The outcome of evaluating one stay: elapsed time and the amount due.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Assessment<'a> {
    elapsed_minutes: u64,
    amount: Money<'a, Currency>,
}

impl<'a> Assessment<'a> {
    /// Create an assessment from its parts.
    pub fn new(elapsed_minutes: u64, amount: Money<'a, Currency>) -> Self {
        Self {
            elapsed_minutes,
            amount,
        }
    }

    /// Elapsed whole minutes of the stay, rounded up.
    pub fn elapsed_minutes(&self) -> u64 {
        self.elapsed_minutes
    }

    /// Amount due for the stay.
    pub fn amount(&self) -> Money<'a, Currency> {
        self.amount
    }

    /// The elapsed time split into whole hours and leftover minutes.
    pub fn elapsed_hours_minutes(&self) -> (u64, u64) {
        (self.elapsed_minutes / 60, self.elapsed_minutes % 60)
    }

    /// The elapsed time formatted as zero-padded `HH:MM`.
    pub fn format_elapsed(&self) -> String {
        let (hours, minutes) = self.elapsed_hours_minutes();
        format!("{hours:02}:{minutes:02}")
    }
}

/// Evaluate the fee for one stay.
///
/// Billing precedence:
///
/// 1. an active [`BillingKind::Monthly`] policy bills nothing;
/// 2. an active [`BillingKind::Daily`] policy bills its flat amount (zero
///    when none is configured);
/// 3. otherwise the tariff decides: stepped tier lookup or daily-flat amount.
///
/// Missing rate data fails open: no tariff, an empty table, or an elapsed
/// time below every threshold all bill zero. Downstream reporting sums
/// amounts unconditionally and relies on this, so it is deliberate policy
/// rather than an error.
///
/// # Errors
///
/// Returns [`AssessmentError::ExitBeforeEntry`] when `departed_at` precedes
/// `entered_at`.
pub fn assess<'a>(
    entered_at: DateTime<Utc>,
    departed_at: DateTime<Utc>,
    tariff: Option<&Tariff<'a>>,
    policy: Option<&SubscriptionPolicy<'a>>,
    currency: &'static Currency,
) -> Result<Assessment<'a>, AssessmentError> {
    let elapsed = elapsed_minutes(entered_at, departed_at)?;
    let zero = Money::from_minor(0, currency);

    if let Some(policy) = policy.filter(|policy| policy.is_active()) {
        match policy.billing() {
            BillingKind::Monthly => return Ok(Assessment::new(elapsed, zero)),
            BillingKind::Daily => {
                return Ok(Assessment::new(elapsed, policy.amount().unwrap_or(zero)));
            }
            BillingKind::Hourly => {}
        }
    }

    let amount = tariff
        .and_then(|tariff| tariff.amount_for(elapsed))
        .unwrap_or(zero);

    Ok(Assessment::new(elapsed, amount))
}
