//! Fixtures
//!
//! Loads tariffs and subscription policies from YAML files, the same way
//! the gate operator configures them on disk. Files live under the fixture
//! base path in `tariffs/` and `policies/` subdirectories.

use std::{fs, io, path::PathBuf, str::FromStr};

use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use rusty_money::{Money, iso, iso::Currency};
use thiserror::Error;

use crate::{
    plates::PlateError,
    policies::{PolicyBook, PolicyError},
    rates::{RateTableError, Tariff},
};

pub mod policies;
pub mod tariffs;

/// Fixture Parsing Errors
#[derive(Debug, Error)]
pub enum FixtureError {
    /// IO error reading fixture files
    #[error("Failed to read fixture file: {0}")]
    Io(#[from] io::Error),

    /// YAML parsing error
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// Unknown currency code
    #[error("Unknown currency code: {0}")]
    UnknownCurrency(String),

    /// Invalid decimal amount
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// A tariff must define exactly one billing shape
    #[error("Tariff {0} must define exactly one of `steps`, `block` or `daily-flat`")]
    InvalidTariff(String),

    /// Currency mismatch between fixture files
    #[error("Currency mismatch: expected {0}, found {1}")]
    CurrencyMismatch(String, String),

    /// Invalid plate in a policy fixture
    #[error(transparent)]
    Plate(#[from] PlateError),

    /// Duplicate or otherwise invalid policy registration
    #[error(transparent)]
    Policy(#[from] PolicyError),

    /// Invalid rate table in a tariff fixture
    #[error(transparent)]
    RateTable(#[from] RateTableError),
}

/// Fixture
#[derive(Debug)]
pub struct Fixture<'a> {
    /// Base path for fixture files
    base_path: PathBuf,

    /// Currency shared by every loaded file
    currency: Option<&'static Currency>,

    /// Loaded tariffs by name
    tariffs: FxHashMap<String, Tariff<'a>>,

    /// Loaded subscription policies
    policies: PolicyBook<'a>,
}

impl<'a> Fixture<'a> {
    /// Create a new empty fixture with default base path
    pub fn new() -> Self {
        Self::with_base_path("./fixtures")
    }

    /// Create a new empty fixture with custom base path
    pub fn with_base_path(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            currency: None,
            tariffs: FxHashMap::default(),
            policies: PolicyBook::new(),
        }
    }

    /// Load tariffs from a YAML fixture file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, the currency is
    /// unknown or inconsistent with earlier files, or a tariff is malformed.
    pub fn load_tariffs(&mut self, name: &str) -> Result<&mut Self, FixtureError> {
        let file_path = self.base_path.join("tariffs").join(format!("{name}.yml"));
        let contents = fs::read_to_string(&file_path)?;
        let fixture: tariffs::TariffsFixture = serde_norway::from_str(&contents)?;

        let currency = self.set_currency(&fixture.currency)?;

        for (key, tariff_fixture) in fixture.tariffs {
            let tariff = tariff_fixture.into_tariff(&key, currency)?;
            self.tariffs.insert(key, tariff);
        }

        Ok(self)
    }

    /// Load subscription policies from a YAML fixture file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, the currency is
    /// unknown or inconsistent with earlier files, a plate is invalid, or a
    /// plate appears twice.
    pub fn load_policies(&mut self, name: &str) -> Result<&mut Self, FixtureError> {
        let file_path = self.base_path.join("policies").join(format!("{name}.yml"));
        let contents = fs::read_to_string(&file_path)?;
        let fixture: policies::PoliciesFixture = serde_norway::from_str(&contents)?;

        let currency = self.set_currency(&fixture.currency)?;

        for policy_fixture in fixture.policies {
            let policy = policy_fixture.into_policy(currency)?;
            self.policies.register(policy)?;
        }

        Ok(self)
    }

    /// The currency shared by the loaded files, once one has been loaded.
    pub fn currency(&self) -> Option<&'static Currency> {
        self.currency
    }

    /// Look up a loaded tariff by its fixture key.
    pub fn tariff(&self, name: &str) -> Option<&Tariff<'a>> {
        self.tariffs.get(name)
    }

    /// Iterate over the loaded tariffs.
    pub fn tariffs(&self) -> impl Iterator<Item = (&str, &Tariff<'a>)> {
        self.tariffs
            .iter()
            .map(|(name, tariff)| (name.as_str(), tariff))
    }

    /// The loaded subscription policies.
    pub fn policy_book(&self) -> &PolicyBook<'a> {
        &self.policies
    }

    fn set_currency(&mut self, code: &str) -> Result<&'static Currency, FixtureError> {
        let currency =
            iso::find(code).ok_or_else(|| FixtureError::UnknownCurrency(code.to_owned()))?;

        match self.currency {
            Some(existing) if existing != currency => Err(FixtureError::CurrencyMismatch(
                existing.iso_alpha_code.to_string(),
                currency.iso_alpha_code.to_string(),
            )),
            _ => {
                self.currency = Some(currency);
                Ok(currency)
            }
        }
    }
}

impl Default for Fixture<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a decimal amount string like `"5.00"` into [`Money`].
pub(crate) fn parse_amount(
    raw: &str,
    currency: &'static Currency,
) -> Result<Money<'static, Currency>, FixtureError> {
    match Decimal::from_str(raw.trim()) {
        Ok(amount) => Ok(Money::from_decimal(amount, currency)),
        Err(_) => Err(FixtureError::InvalidAmount(raw.to_owned())),
    }
}
