//! Integration test walking one full day at the gate.
//!
//! Covers the whole billing surface end to end:
//!
//! 1. A pay-per-stay car on the standard stepped tariff
//!    (0 min -> $1.00, 60 min -> $2.00, 120 min -> $3.00).
//! 2. A motorcycle on the daily-flat tariff ($5.00 per stay).
//! 3. A monthly subscriber who never pays on departure.
//! 4. A daily subscriber who pays a flat $5.00 per departure.
//! 5. Restroom visits at a fixed $0.50 fee.
//!
//! The daily summary at the end must add up: $3.00 + $5.00 + $0.00 + $5.00
//! parking plus 2 x $0.50 restroom = $14.00.

use chrono::{DateTime, NaiveDate, Utc};
use rusty_money::{Money, iso};
use testresult::TestResult;

use tollgate::prelude::*;

fn standard_table<'a>() -> Result<RateTable<'a>, RateTableError> {
    RateTable::new(
        [
            RateStep::new(0, Money::from_minor(100, iso::USD)),
            RateStep::new(60, Money::from_minor(200, iso::USD)),
            RateStep::new(120, Money::from_minor(300, iso::USD)),
        ],
        iso::USD,
    )
}

#[test]
fn one_full_day_at_the_gate() -> TestResult {
    let mut ledger = Ledger::new(iso::USD);
    let standard = ledger.add_tariff(Tariff::Stepped(standard_table()?))?;
    let motorcycle = ledger.add_tariff(Tariff::DailyFlat(Money::from_minor(500, iso::USD)))?;

    let mut policies = PolicyBook::new();
    policies.register(SubscriptionPolicy::new(
        Plate::new("P40807")?,
        BillingKind::Monthly,
        None,
    ))?;
    policies.register(SubscriptionPolicy::new(
        Plate::new("C55123")?,
        BillingKind::Daily,
        Some(Money::from_minor(500, iso::USD)),
    ))?;

    let morning: DateTime<Utc> = "2026-08-25T08:00:00Z".parse()?;

    // Subscribers whose policy replaces the tariff check in without one.
    let tariff_for = |plate: &Plate| match policies.active_for(plate) {
        Some(policy) if policy.overrides_tariff() => None,
        _ => Some(standard),
    };

    // 1. Pay-per-stay car, 200 minutes -> top tier, $3.00.
    let car = Plate::new("P8E98")?;
    let car_record = ledger.check_in(car.clone(), morning, tariff_for(&car))?;
    let car_bill = ledger.check_out(
        car_record,
        "2026-08-25T11:20:00Z".parse()?,
        policies.active_for(&car),
    )?;
    assert_eq!(car_bill.elapsed_minutes(), 200);
    assert_eq!(car_bill.amount(), Money::from_minor(300, iso::USD));

    // 2. Motorcycle on the daily-flat tariff, elapsed time irrelevant.
    let moto = Plate::new("M777")?;
    let moto_record = ledger.check_in(moto.clone(), morning, Some(motorcycle))?;
    let moto_bill = ledger.check_out(
        moto_record,
        "2026-08-25T20:00:00Z".parse()?,
        policies.active_for(&moto),
    )?;
    assert_eq!(moto_bill.amount(), Money::from_minor(500, iso::USD));

    // 3. Monthly subscriber, 14 hours inside, pays nothing.
    let monthly = Plate::new("P40807")?;
    let monthly_record = ledger.check_in(
        monthly.clone(),
        "2026-08-25T09:00:00Z".parse()?,
        tariff_for(&monthly),
    )?;
    let monthly_bill = ledger.check_out(
        monthly_record,
        "2026-08-25T23:00:00Z".parse()?,
        policies.active_for(&monthly),
    )?;
    assert_eq!(monthly_bill.elapsed_minutes(), 14 * 60);
    assert_eq!(monthly_bill.amount(), Money::from_minor(0, iso::USD));

    // 4. Daily subscriber pays the flat amount, not the tariff.
    let daily = Plate::new("C55123")?;
    let daily_record = ledger.check_in(daily.clone(), morning, tariff_for(&daily))?;
    let daily_bill = ledger.check_out(
        daily_record,
        "2026-08-25T08:10:00Z".parse()?,
        policies.active_for(&daily),
    )?;
    assert_eq!(daily_bill.amount(), Money::from_minor(500, iso::USD));

    // 5. Restroom visits.
    let mut restroom = RestroomLog::new(iso::USD);
    let fee = restroom.add_fee(RestroomFee::new("Standard", Money::from_minor(50, iso::USD)))?;
    restroom.record_visit(fee, "2026-08-25T10:05:00Z".parse()?)?;
    restroom.record_visit(fee, "2026-08-25T15:30:00Z".parse()?)?;

    let date: NaiveDate = "2026-08-25".parse()?;
    let summary = DailySummary::collect(&ledger, &restroom, date)?;

    assert_eq!(summary.parking_income(), Money::from_minor(1300, iso::USD));
    assert_eq!(summary.departures(), 4);
    assert_eq!(summary.restroom_income(), Money::from_minor(100, iso::USD));
    assert_eq!(summary.total(), Money::from_minor(1400, iso::USD));

    Ok(())
}

#[test]
fn the_gate_refuses_a_second_open_stay() -> TestResult {
    let mut ledger = Ledger::new(iso::USD);
    let tariff = ledger.add_tariff(Tariff::Stepped(standard_table()?))?;
    let morning: DateTime<Utc> = "2026-08-25T08:00:00Z".parse()?;

    let key = ledger.check_in(Plate::new("P40807")?, morning, Some(tariff))?;

    // Differently-typed plate, same vehicle.
    let second = ledger.check_in(Plate::new("  p40807")?, morning, Some(tariff));
    assert!(
        matches!(second, Err(LedgerError::DuplicateOpenRecord { .. })),
        "second open stay must be rejected, got {second:?}"
    );

    // After departure the plate may enter again.
    ledger.check_out(key, "2026-08-25T09:00:00Z".parse()?, None)?;
    ledger.check_in(Plate::new("P40807")?, "2026-08-25T12:00:00Z".parse()?, Some(tariff))?;

    Ok(())
}

#[test]
fn closed_records_reassess_to_the_stored_amount() -> TestResult {
    let mut ledger = Ledger::new(iso::USD);
    let tariff = ledger.add_tariff(Tariff::Stepped(standard_table()?))?;

    let key = ledger.check_in(
        Plate::new("P40807")?,
        "2026-08-25T08:00:00Z".parse()?,
        Some(tariff),
    )?;
    let billed = ledger.check_out(key, "2026-08-25T09:00:00Z".parse()?, None)?;

    assert_eq!(billed.amount(), Money::from_minor(200, iso::USD));
    assert_eq!(ledger.assessment_for(key, None)?, billed);
    assert_eq!(ledger.assessment_for(key, None)?, billed);

    Ok(())
}

#[test]
fn departure_before_entry_is_an_explicit_error() -> TestResult {
    let mut ledger = Ledger::new(iso::USD);
    let tariff = ledger.add_tariff(Tariff::Stepped(standard_table()?))?;

    let key = ledger.check_in(
        Plate::new("P40807")?,
        "2026-08-25T08:00:00Z".parse()?,
        Some(tariff),
    )?;

    let result = ledger.check_out(key, "2026-08-25T07:00:00Z".parse()?, None);

    assert!(
        matches!(
            result,
            Err(LedgerError::Assessment(
                AssessmentError::ExitBeforeEntry { .. }
            ))
        ),
        "skewed departure must be rejected, got {result:?}"
    );

    // The failed departure must not have closed the record.
    let Some(record) = ledger.record(key) else {
        panic!("record missing after failed departure");
    };
    assert!(record.is_open());

    Ok(())
}
