//! Tariff Fixtures
//!
//! YAML shape:
//!
//! ```yaml
//! currency: USD
//! tariffs:
//!   standard:
//!     steps:
//!       - minutes: 0
//!         amount: "1.00"
//!       - minutes: 60
//!         amount: "2.00"
//!   hourly:
//!     block:
//!       minutes: 60
//!       amount: "1.00"
//!   motorcycle:
//!     daily-flat: "5.00"
//! ```

use rustc_hash::FxHashMap;
use rusty_money::iso::Currency;
use serde::Deserialize;

use crate::{
    fixtures::{FixtureError, parse_amount},
    rates::{RateStep, RateTable, Tariff},
};

/// Top-level tariff fixture from YAML.
#[derive(Debug, Deserialize)]
pub struct TariffsFixture {
    /// ISO currency code shared by every amount in the file
    pub currency: String,

    /// Tariff definitions keyed by name
    pub tariffs: FxHashMap<String, TariffFixture>,
}

/// A single tariff definition: a stepped rate table, an hourly block, or a
/// daily flat amount — exactly one of the three.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TariffFixture {
    /// Steps of a stepped tariff
    pub steps: Option<Vec<RateStepFixture>>,

    /// Block size and per-block amount of an hourly-block tariff
    pub block: Option<BlockFixture>,

    /// Flat amount of a daily-flat tariff
    pub daily_flat: Option<String>,
}

/// Per-block billing definition of an hourly-block tariff.
#[derive(Debug, Deserialize)]
pub struct BlockFixture {
    /// Size of one billing block in minutes
    pub minutes: u64,

    /// Amount charged per started block, as a decimal string
    pub amount: String,
}

/// One step of a stepped tariff.
#[derive(Debug, Deserialize)]
pub struct RateStepFixture {
    /// Elapsed minutes at which the tier starts
    pub minutes: u64,

    /// Amount charged inside the tier, as a decimal string
    pub amount: String,
}

impl TariffFixture {
    pub(crate) fn into_tariff(
        self,
        name: &str,
        currency: &'static Currency,
    ) -> Result<Tariff<'static>, FixtureError> {
        match (self.steps, self.block, self.daily_flat) {
            (Some(steps), None, None) => {
                let steps = steps
                    .into_iter()
                    .map(|step| Ok(RateStep::new(step.minutes, parse_amount(&step.amount, currency)?)))
                    .collect::<Result<Vec<_>, FixtureError>>()?;

                Ok(Tariff::Stepped(RateTable::new(steps, currency)?))
            }
            (None, Some(block), None) => Ok(Tariff::HourlyBlock {
                block_minutes: block.minutes,
                amount: parse_amount(&block.amount, currency)?,
            }),
            (None, None, Some(raw)) => Ok(Tariff::DailyFlat(parse_amount(&raw, currency)?)),
            _ => Err(FixtureError::InvalidTariff(name.to_owned())),
        }
    }
}
