//! Subscription policies

use rustc_hash::FxHashMap;
use rusty_money::{Money, iso::Currency};
use serde::Deserialize;
use slotmap::{SlotMap, new_key_type};
use thiserror::Error;

use crate::plates::Plate;

new_key_type! {
    /// Policy Key
    pub struct PolicyKey;
}

/// How a subscribed plate is billed on departure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BillingKind {
    /// No override: the gate tariff applies.
    Hourly,

    /// Flat amount per departure, regardless of elapsed time.
    Daily,

    /// Paid monthly up front: departures cost nothing.
    Monthly,
}

/// Errors raised while registering policies.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    /// A policy for this plate is already registered.
    #[error("a policy for plate {0} is already registered")]
    DuplicatePlate(String),
}

/// A flat-billing override for one plate.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionPolicy<'a> {
    plate: Plate,
    billing: BillingKind,
    amount: Option<Money<'a, Currency>>,
    owner: Option<String>,
    active: bool,
}

impl<'a> SubscriptionPolicy<'a> {
    /// Create an active policy for the given plate.
    ///
    /// `amount` is the flat amount for [`BillingKind::Daily`] policies; it is
    /// ignored for monthly and hourly billing.
    pub fn new(plate: Plate, billing: BillingKind, amount: Option<Money<'a, Currency>>) -> Self {
        Self {
            plate,
            billing,
            amount,
            owner: None,
            active: true,
        }
    }

    /// Attach the owner's name to the policy.
    #[must_use]
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// The plate this policy covers.
    pub fn plate(&self) -> &Plate {
        &self.plate
    }

    /// The billing kind of the policy.
    pub fn billing(&self) -> BillingKind {
        self.billing
    }

    /// The flat amount, when one is configured.
    pub fn amount(&self) -> Option<Money<'a, Currency>> {
        self.amount
    }

    /// The owner's name, when recorded.
    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    /// Whether the policy currently applies.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Whether the policy replaces the gate tariff entirely (daily or
    /// monthly billing).
    pub fn overrides_tariff(&self) -> bool {
        matches!(self.billing, BillingKind::Daily | BillingKind::Monthly)
    }

    /// Stop the policy from applying to future departures.
    pub fn deactivate(&mut self) {
        self.active = false;
    }
}

/// Registered subscription policies, at most one per plate.
#[derive(Debug, Default)]
pub struct PolicyBook<'a> {
    policies: SlotMap<PolicyKey, SubscriptionPolicy<'a>>,
    by_plate: FxHashMap<String, PolicyKey>,
}

impl<'a> PolicyBook<'a> {
    /// Create an empty policy book.
    pub fn new() -> Self {
        Self {
            policies: SlotMap::with_key(),
            by_plate: FxHashMap::default(),
        }
    }

    /// Register a policy.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::DuplicatePlate`] if a policy for the same plate
    /// is already registered, whether or not it is still active.
    pub fn register(&mut self, policy: SubscriptionPolicy<'a>) -> Result<PolicyKey, PolicyError> {
        let plate = policy.plate().as_str().to_owned();

        if self.by_plate.contains_key(&plate) {
            return Err(PolicyError::DuplicatePlate(plate));
        }

        let key = self.policies.insert(policy);
        self.by_plate.insert(plate, key);

        Ok(key)
    }

    /// The active policy for a plate, if any.
    ///
    /// Deactivated policies are never returned.
    pub fn active_for(&self, plate: &Plate) -> Option<&SubscriptionPolicy<'a>> {
        self.by_plate
            .get(plate.as_str())
            .and_then(|key| self.policies.get(*key))
            .filter(|policy| policy.is_active())
    }

    /// Look up a policy by key.
    pub fn get(&self, key: PolicyKey) -> Option<&SubscriptionPolicy<'a>> {
        self.policies.get(key)
    }

    /// Mutable access to a policy, e.g. to deactivate it.
    pub fn get_mut(&mut self, key: PolicyKey) -> Option<&mut SubscriptionPolicy<'a>> {
        self.policies.get_mut(key)
    }

    /// Iterate over all registered policies.
    pub fn iter(&self) -> impl Iterator<Item = (PolicyKey, &SubscriptionPolicy<'a>)> {
        self.policies.iter()
    }

    /// Number of registered policies.
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    /// Check whether no policies are registered.
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::iso;
    use testresult::TestResult;

    use super::*;

    fn monthly_policy<'a>() -> Result<SubscriptionPolicy<'a>, crate::plates::PlateError> {
        Ok(SubscriptionPolicy::new(
            Plate::new("P40807")?,
            BillingKind::Monthly,
            Some(Money::from_minor(30_000, iso::USD)),
        ))
    }

    #[test]
    fn register_and_look_up_by_plate() -> TestResult {
        let mut book = PolicyBook::new();
        book.register(monthly_policy()?)?;

        let found = book.active_for(&Plate::new("p40807")?);

        assert_eq!(found.map(SubscriptionPolicy::billing), Some(BillingKind::Monthly));

        Ok(())
    }

    #[test]
    fn second_policy_for_same_plate_is_rejected() -> TestResult {
        let mut book = PolicyBook::new();
        book.register(monthly_policy()?)?;

        let result = book.register(SubscriptionPolicy::new(
            Plate::new("P40807")?,
            BillingKind::Daily,
            Some(Money::from_minor(500, iso::USD)),
        ));

        assert_eq!(result, Err(PolicyError::DuplicatePlate("P40807".into())));

        Ok(())
    }

    #[test]
    fn deactivated_policy_is_not_returned() -> TestResult {
        let mut book = PolicyBook::new();
        let key = book.register(monthly_policy()?)?;

        if let Some(policy) = book.get_mut(key) {
            policy.deactivate();
        }

        assert!(book.active_for(&Plate::new("P40807")?).is_none());

        Ok(())
    }

    #[test]
    fn hourly_policies_do_not_override_the_tariff() -> TestResult {
        let policy = SubscriptionPolicy::new(Plate::new("C123")?, BillingKind::Hourly, None);

        assert!(!policy.overrides_tariff());
        assert!(monthly_policy()?.overrides_tariff());

        Ok(())
    }
}
