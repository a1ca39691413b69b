//! Policy Fixtures
//!
//! YAML shape:
//!
//! ```yaml
//! currency: USD
//! policies:
//!   - plate: P40807
//!     billing: monthly
//!     owner: "J. Morales"
//!   - plate: C55123
//!     billing: daily
//!     amount: "5.00"
//!     active: false
//! ```

use rusty_money::iso::Currency;
use serde::Deserialize;

use crate::{
    fixtures::{FixtureError, parse_amount},
    plates::Plate,
    policies::{BillingKind, SubscriptionPolicy},
};

/// Top-level policy fixture from YAML.
#[derive(Debug, Deserialize)]
pub struct PoliciesFixture {
    /// ISO currency code shared by every amount in the file
    pub currency: String,

    /// Policy definitions
    pub policies: Vec<PolicyFixture>,
}

/// A single subscription policy definition.
#[derive(Debug, Deserialize)]
pub struct PolicyFixture {
    /// Raw plate; normalised on load
    pub plate: String,

    /// Billing kind: `hourly`, `daily` or `monthly`
    pub billing: BillingKind,

    /// Flat amount for daily billing, as a decimal string
    pub amount: Option<String>,

    /// Owner's name
    pub owner: Option<String>,

    /// Whether the policy currently applies; defaults to true
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl PolicyFixture {
    pub(crate) fn into_policy(
        self,
        currency: &'static Currency,
    ) -> Result<SubscriptionPolicy<'static>, FixtureError> {
        let plate = Plate::new(&self.plate)?;
        let amount = self
            .amount
            .as_deref()
            .map(|raw| parse_amount(raw, currency))
            .transpose()?;

        let mut policy = SubscriptionPolicy::new(plate, self.billing, amount);

        if let Some(owner) = self.owner {
            policy = policy.with_owner(owner);
        }
        if !self.active {
            policy.deactivate();
        }

        Ok(policy)
    }
}
