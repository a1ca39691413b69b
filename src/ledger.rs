//! Access ledger
//!
//! Owns the open/close lifecycle of access records. The ledger keeps an
//! index of open records by plate, so checking a vehicle in is an atomic
//! check-then-insert under `&mut self`: a second open record for the same
//! plate can never be created.

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use rusty_money::iso::Currency;
use slotmap::{SlotMap, new_key_type};
use thiserror::Error;

use crate::{
    assessment::{Assessment, AssessmentError, assess},
    plates::Plate,
    policies::SubscriptionPolicy,
    rates::{Tariff, TariffKey},
};

new_key_type! {
    /// Access Record Key
    pub struct RecordKey;
}

/// Errors raised by ledger operations.
#[derive(Debug, Error, PartialEq)]
pub enum LedgerError {
    /// An open record already exists for this plate.
    #[error("an open record already exists for plate {plate}")]
    DuplicateOpenRecord {
        /// The plate with the existing open record.
        plate: String,
    },

    /// The tariff key is not registered with this ledger.
    #[error("unknown tariff")]
    UnknownTariff(TariffKey),

    /// The record key does not exist in this ledger.
    #[error("unknown access record")]
    UnknownRecord(RecordKey),

    /// The record was already closed by an earlier departure.
    #[error("access record is already closed")]
    AlreadyClosed(RecordKey),

    /// The record has not been closed yet.
    #[error("access record is still open")]
    StillOpen(RecordKey),

    /// An amount's currency differs from the ledger currency (expected, actual).
    #[error("expected currency {expected}, got {actual}")]
    CurrencyMismatch {
        /// The ledger currency.
        expected: &'static str,
        /// The offending currency.
        actual: &'static str,
    },

    /// Error bubbled up from fee assessment.
    #[error(transparent)]
    Assessment(#[from] AssessmentError),
}

/// One open/close cycle of occupancy, subject to fee evaluation on close.
#[derive(Debug, Clone)]
pub struct AccessRecord<'a> {
    plate: Plate,
    entered_at: DateTime<Utc>,
    departed_at: Option<DateTime<Utc>>,
    tariff: Option<TariffKey>,
    open: bool,
    billed: Option<Assessment<'a>>,
}

impl<'a> AccessRecord<'a> {
    /// The plate of the vehicle.
    pub fn plate(&self) -> &Plate {
        &self.plate
    }

    /// When the vehicle entered.
    pub fn entered_at(&self) -> DateTime<Utc> {
        self.entered_at
    }

    /// When the vehicle departed, once the record is closed.
    pub fn departed_at(&self) -> Option<DateTime<Utc>> {
        self.departed_at
    }

    /// The tariff assigned at check-in, if any.
    pub fn tariff(&self) -> Option<TariffKey> {
        self.tariff
    }

    /// Whether the vehicle is still inside.
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// The assessment stored when the record was closed.
    pub fn billed(&self) -> Option<Assessment<'a>> {
        self.billed
    }
}

/// The access ledger: registered tariffs plus every access record.
#[derive(Debug)]
pub struct Ledger<'a> {
    currency: &'static Currency,
    capacity: Option<usize>,
    tariffs: SlotMap<TariffKey, Tariff<'a>>,
    records: SlotMap<RecordKey, AccessRecord<'a>>,
    open_by_plate: FxHashMap<String, RecordKey>,
}

impl<'a> Ledger<'a> {
    /// Create an empty ledger billing in the given currency, with no
    /// configured lot capacity.
    pub fn new(currency: &'static Currency) -> Self {
        Self {
            currency,
            capacity: None,
            tariffs: SlotMap::with_key(),
            records: SlotMap::with_key(),
            open_by_plate: FxHashMap::default(),
        }
    }

    /// Create a ledger for a lot with a known number of spaces.
    ///
    /// Capacity is informational: it drives the available-space display and
    /// is never enforced at check-in, since the barrier has already let the
    /// vehicle through by the time the record is opened.
    pub fn with_capacity(currency: &'static Currency, capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::new(currency)
        }
    }

    /// Register a tariff with the ledger.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::CurrencyMismatch`] if the tariff's amounts are
    /// not in the ledger currency.
    pub fn add_tariff(&mut self, tariff: Tariff<'a>) -> Result<TariffKey, LedgerError> {
        let tariff_currency = tariff.currency();
        if tariff_currency != self.currency {
            return Err(LedgerError::CurrencyMismatch {
                expected: self.currency.iso_alpha_code,
                actual: tariff_currency.iso_alpha_code,
            });
        }

        Ok(self.tariffs.insert(tariff))
    }

    /// Look up a registered tariff.
    pub fn tariff(&self, key: TariffKey) -> Option<&Tariff<'a>> {
        self.tariffs.get(key)
    }

    /// Open an access record for an arriving vehicle.
    ///
    /// Subscribed vehicles whose policy replaces the gate tariff (see
    /// [`SubscriptionPolicy::overrides_tariff`]) are checked in without one.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::DuplicateOpenRecord`]: an open record already exists
    ///   for this plate.
    /// - [`LedgerError::UnknownTariff`]: the tariff key is not registered.
    pub fn check_in(
        &mut self,
        plate: Plate,
        entered_at: DateTime<Utc>,
        tariff: Option<TariffKey>,
    ) -> Result<RecordKey, LedgerError> {
        if let Some(tariff) = tariff
            && !self.tariffs.contains_key(tariff)
        {
            return Err(LedgerError::UnknownTariff(tariff));
        }

        if self.open_by_plate.contains_key(plate.as_str()) {
            return Err(LedgerError::DuplicateOpenRecord {
                plate: plate.as_str().to_owned(),
            });
        }

        let index_entry = plate.as_str().to_owned();
        let key = self.records.insert(AccessRecord {
            plate,
            entered_at,
            departed_at: None,
            tariff,
            open: true,
            billed: None,
        });
        self.open_by_plate.insert(index_entry, key);

        Ok(key)
    }

    /// Assess an open record as if the vehicle departed at `now`, without
    /// closing it. This backs the departure screen, which shows the amount
    /// before the exit is confirmed.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::UnknownRecord`]: no such record.
    /// - [`LedgerError::AlreadyClosed`]: the record was already closed.
    /// - [`LedgerError::CurrencyMismatch`]: the policy amount is not in the
    ///   ledger currency.
    /// - [`LedgerError::Assessment`]: `now` precedes the entry time.
    pub fn preview(
        &self,
        key: RecordKey,
        now: DateTime<Utc>,
        policy: Option<&SubscriptionPolicy<'a>>,
    ) -> Result<Assessment<'a>, LedgerError> {
        let record = self.records.get(key).ok_or(LedgerError::UnknownRecord(key))?;

        if !record.open {
            return Err(LedgerError::AlreadyClosed(key));
        }

        self.evaluate(record, now, policy)
    }

    /// Close an open record: the one-time OPEN → CLOSED transition.
    ///
    /// The fee is assessed first; only then are the departure time, the
    /// closed state, and the billed assessment persisted on the record.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::UnknownRecord`]: no such record.
    /// - [`LedgerError::AlreadyClosed`]: the record was already closed.
    /// - [`LedgerError::CurrencyMismatch`]: the policy amount is not in the
    ///   ledger currency.
    /// - [`LedgerError::Assessment`]: `departed_at` precedes the entry time.
    pub fn check_out(
        &mut self,
        key: RecordKey,
        departed_at: DateTime<Utc>,
        policy: Option<&SubscriptionPolicy<'a>>,
    ) -> Result<Assessment<'a>, LedgerError> {
        let record = self.records.get(key).ok_or(LedgerError::UnknownRecord(key))?;

        if !record.open {
            return Err(LedgerError::AlreadyClosed(key));
        }

        let assessment = self.evaluate(record, departed_at, policy)?;
        let plate = record.plate.as_str().to_owned();

        let record = self
            .records
            .get_mut(key)
            .ok_or(LedgerError::UnknownRecord(key))?;
        record.departed_at = Some(departed_at);
        record.open = false;
        record.billed = Some(assessment);

        self.open_by_plate.remove(&plate);

        Ok(assessment)
    }

    /// Re-assess a closed record from its stored timestamps.
    ///
    /// With the same policy, this always reproduces the amount stored at
    /// check-out.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::UnknownRecord`]: no such record.
    /// - [`LedgerError::StillOpen`]: the record has not been closed yet.
    /// - [`LedgerError::CurrencyMismatch`]: the policy amount is not in the
    ///   ledger currency.
    /// - [`LedgerError::Assessment`]: the stored departure precedes the entry.
    pub fn assessment_for(
        &self,
        key: RecordKey,
        policy: Option<&SubscriptionPolicy<'a>>,
    ) -> Result<Assessment<'a>, LedgerError> {
        let record = self.records.get(key).ok_or(LedgerError::UnknownRecord(key))?;
        let departed_at = record.departed_at.ok_or(LedgerError::StillOpen(key))?;

        self.evaluate(record, departed_at, policy)
    }

    /// The open record for a plate, if the vehicle is currently inside.
    pub fn open_record_for(&self, plate: &Plate) -> Option<RecordKey> {
        self.open_by_plate.get(plate.as_str()).copied()
    }

    /// Look up an access record.
    pub fn record(&self, key: RecordKey) -> Option<&AccessRecord<'a>> {
        self.records.get(key)
    }

    /// Iterate over all access records.
    pub fn records(&self) -> impl Iterator<Item = (RecordKey, &AccessRecord<'a>)> {
        self.records.iter()
    }

    /// Number of vehicles currently inside.
    pub fn open_count(&self) -> usize {
        self.open_by_plate.len()
    }

    /// The configured number of spaces in the lot, when known.
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Free spaces left in the lot, when a capacity is configured.
    ///
    /// Saturates at zero when more vehicles are inside than the lot
    /// nominally holds.
    pub fn available_spaces(&self) -> Option<usize> {
        self.capacity
            .map(|capacity| capacity.saturating_sub(self.open_count()))
    }

    /// Total number of access records, open and closed.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check whether the ledger has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The currency the ledger bills in.
    pub fn currency(&self) -> &'static Currency {
        self.currency
    }

    fn evaluate(
        &self,
        record: &AccessRecord<'a>,
        departed_at: DateTime<Utc>,
        policy: Option<&SubscriptionPolicy<'a>>,
    ) -> Result<Assessment<'a>, LedgerError> {
        if let Some(amount) = policy.and_then(SubscriptionPolicy::amount) {
            let amount_currency = amount.currency();
            if amount_currency != self.currency {
                return Err(LedgerError::CurrencyMismatch {
                    expected: self.currency.iso_alpha_code,
                    actual: amount_currency.iso_alpha_code,
                });
            }
        }

        let tariff = record.tariff.and_then(|key| self.tariffs.get(key));

        Ok(assess(
            record.entered_at,
            departed_at,
            tariff,
            policy,
            self.currency,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;
    use rusty_money::{Money, iso};
    use testresult::TestResult;

    use crate::rates::{RateStep, RateTable};

    use super::*;

    fn ledger_with_tariff<'a>() -> TestResult<(Ledger<'a>, TariffKey)> {
        let mut ledger = Ledger::new(iso::USD);
        let table = RateTable::new(
            [
                RateStep::new(0, Money::from_minor(100, iso::USD)),
                RateStep::new(60, Money::from_minor(200, iso::USD)),
            ],
            iso::USD,
        )?;
        let key = ledger.add_tariff(Tariff::Stepped(table))?;

        Ok((ledger, key))
    }

    #[test]
    fn check_in_then_out_bills_the_current_tier() -> TestResult {
        let (mut ledger, tariff) = ledger_with_tariff()?;
        let entered: DateTime<Utc> = "2026-08-25T09:00:00Z".parse()?;
        let departed: DateTime<Utc> = "2026-08-25T10:15:00Z".parse()?;

        let key = ledger.check_in(Plate::new("P40807")?, entered, Some(tariff))?;
        let assessment = ledger.check_out(key, departed, None)?;

        assert_eq!(assessment.elapsed_minutes(), 75);
        assert_eq!(assessment.amount(), Money::from_minor(200, iso::USD));

        let record = match ledger.record(key) {
            Some(record) => record,
            None => panic!("record must exist after check-out"),
        };
        assert!(!record.is_open());
        assert_eq!(record.departed_at(), Some(departed));
        assert_eq!(record.billed(), Some(assessment));

        Ok(())
    }

    #[test]
    fn duplicate_open_record_is_rejected() -> TestResult {
        let (mut ledger, tariff) = ledger_with_tariff()?;
        let entered: DateTime<Utc> = "2026-08-25T09:00:00Z".parse()?;

        ledger.check_in(Plate::new("P40807")?, entered, Some(tariff))?;
        let second = ledger.check_in(Plate::new(" p40807 ")?, entered, Some(tariff));

        assert_eq!(
            second,
            Err(LedgerError::DuplicateOpenRecord {
                plate: "P40807".into(),
            })
        );

        Ok(())
    }

    #[test]
    fn plate_can_reenter_after_departure() -> TestResult {
        let (mut ledger, tariff) = ledger_with_tariff()?;
        let entered: DateTime<Utc> = "2026-08-25T09:00:00Z".parse()?;
        let departed: DateTime<Utc> = "2026-08-25T09:30:00Z".parse()?;
        let reentered: DateTime<Utc> = "2026-08-25T14:00:00Z".parse()?;

        let first = ledger.check_in(Plate::new("P40807")?, entered, Some(tariff))?;
        ledger.check_out(first, departed, None)?;

        let second = ledger.check_in(Plate::new("P40807")?, reentered, Some(tariff));

        assert!(second.is_ok(), "re-entry after departure must be allowed");
        assert_eq!(ledger.len(), 2);

        Ok(())
    }

    #[test]
    fn closing_twice_is_rejected() -> TestResult {
        let (mut ledger, tariff) = ledger_with_tariff()?;
        let entered: DateTime<Utc> = "2026-08-25T09:00:00Z".parse()?;
        let departed: DateTime<Utc> = "2026-08-25T09:30:00Z".parse()?;

        let key = ledger.check_in(Plate::new("P40807")?, entered, Some(tariff))?;
        ledger.check_out(key, departed, None)?;

        assert_eq!(
            ledger.check_out(key, departed, None),
            Err(LedgerError::AlreadyClosed(key))
        );

        Ok(())
    }

    #[test]
    fn reassessment_of_a_closed_record_is_idempotent() -> TestResult {
        let (mut ledger, tariff) = ledger_with_tariff()?;
        let entered: DateTime<Utc> = "2026-08-25T09:00:00Z".parse()?;
        let departed: DateTime<Utc> = "2026-08-25T11:45:00Z".parse()?;

        let key = ledger.check_in(Plate::new("P40807")?, entered, Some(tariff))?;
        let billed = ledger.check_out(key, departed, None)?;

        assert_eq!(ledger.assessment_for(key, None)?, billed);
        assert_eq!(ledger.assessment_for(key, None)?, billed);

        Ok(())
    }

    #[test]
    fn preview_does_not_close_the_record() -> TestResult {
        let (mut ledger, tariff) = ledger_with_tariff()?;
        let entered: DateTime<Utc> = "2026-08-25T09:00:00Z".parse()?;
        let now: DateTime<Utc> = "2026-08-25T09:20:00Z".parse()?;

        let key = ledger.check_in(Plate::new("P40807")?, entered, Some(tariff))?;
        let preview = ledger.preview(key, now, None)?;

        assert_eq!(preview.amount(), Money::from_minor(100, iso::USD));
        assert_eq!(ledger.open_count(), 1);

        Ok(())
    }

    #[test]
    fn unknown_tariff_key_is_rejected_at_check_in() -> TestResult {
        let (mut ledger, _) = ledger_with_tariff()?;
        let entered: DateTime<Utc> = "2026-08-25T09:00:00Z".parse()?;

        // The null key is never handed out by the ledger.
        let result = ledger.check_in(Plate::new("P40807")?, entered, Some(TariffKey::default()));

        assert!(matches!(result, Err(LedgerError::UnknownTariff(_))));

        Ok(())
    }

    #[test]
    fn foreign_currency_tariff_is_rejected() -> TestResult {
        let mut ledger = Ledger::new(iso::USD);
        let table = RateTable::new(
            [RateStep::new(0, Money::from_minor(100, iso::GBP))],
            iso::GBP,
        )?;

        assert_eq!(
            ledger.add_tariff(Tariff::Stepped(table)),
            Err(LedgerError::CurrencyMismatch {
                expected: iso::USD.iso_alpha_code,
                actual: iso::GBP.iso_alpha_code,
            })
        );

        Ok(())
    }

    #[test]
    fn available_spaces_track_open_records_without_gating_entry() -> TestResult {
        let mut ledger = Ledger::with_capacity(iso::USD, 2);
        let table = RateTable::new(
            [RateStep::new(0, Money::from_minor(100, iso::USD))],
            iso::USD,
        )?;
        let tariff = ledger.add_tariff(Tariff::Stepped(table))?;
        let entered: DateTime<Utc> = "2026-08-25T09:00:00Z".parse()?;

        assert_eq!(ledger.capacity(), Some(2));
        assert_eq!(ledger.available_spaces(), Some(2));

        let first = ledger.check_in(Plate::new("P40807")?, entered, Some(tariff))?;
        ledger.check_in(Plate::new("C55123")?, entered, Some(tariff))?;
        assert_eq!(ledger.available_spaces(), Some(0));

        // Capacity is informational; the gate still admits a third vehicle.
        ledger.check_in(Plate::new("M777")?, entered, Some(tariff))?;
        assert_eq!(ledger.available_spaces(), Some(0));

        ledger.check_out(first, "2026-08-25T09:30:00Z".parse()?, None)?;
        assert_eq!(ledger.available_spaces(), Some(0));

        // A ledger without a configured capacity reports nothing.
        assert_eq!(Ledger::new(iso::USD).available_spaces(), None);

        Ok(())
    }

    #[test]
    fn open_record_is_discoverable_by_plate() -> TestResult {
        let (mut ledger, tariff) = ledger_with_tariff()?;
        let entered: DateTime<Utc> = "2026-08-25T09:00:00Z".parse()?;

        let key = ledger.check_in(Plate::new("P40807")?, entered, Some(tariff))?;

        assert_eq!(ledger.open_record_for(&Plate::new("p40807")?), Some(key));
        assert_eq!(ledger.open_record_for(&Plate::new("OTHER")?), None);

        Ok(())
    }
}
