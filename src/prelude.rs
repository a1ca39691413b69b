//! Tollgate prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    assessment::{Assessment, AssessmentError, assess, elapsed_minutes},
    fixtures::{Fixture, FixtureError},
    ledger::{AccessRecord, Ledger, LedgerError, RecordKey},
    plates::{Plate, PlateError},
    policies::{BillingKind, PolicyBook, PolicyError, PolicyKey, SubscriptionPolicy},
    rates::{RateStep, RateTable, RateTableError, Tariff, TariffKey},
    reporting::{
        DailySummary, ReportError, available_spaces, departures_on, occupancy,
        parking_income_in_month, parking_income_on,
    },
    restroom::{RestroomError, RestroomFee, RestroomFeeKey, RestroomLog, RestroomVisit},
};
