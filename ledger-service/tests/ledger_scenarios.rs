/// End-to-end ledger scenarios
///
/// Covers:
/// - The monthly fee lifecycle (pending -> partial -> paid) month by month
/// - FIFO settlement of untargeted payments across pending months
/// - Carry-forward propagation when an old month is settled late
/// - Retry-safety and the error taxonomy at the service boundary
/// - Optimistic locking at the store boundary
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use ledger_service::{
    reconcile_chain, BillingPeriod, LedgerError, LedgerService, LedgerStore, LedgerUpdate,
    MemoryLedgerStore, MonthlyRecord, PaymentEvent, PaymentMode, PaymentType, PaymentStatus,
    RecordPayment, RegisterPatient, Statement,
};
use rust_decimal::Decimal;
use uuid::Uuid;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn money(value: i64) -> Decimal {
    Decimal::from(value)
}

async fn service_with_patient(patient_id: &str, monthly_fee: i64) -> LedgerService {
    let service = LedgerService::new(Arc::new(MemoryLedgerStore::new()));
    service
        .register_patient(RegisterPatient {
            id: patient_id.to_string(),
            name: "Asha Verma".to_string(),
            phone: Some("9876500001".to_string()),
            admission_date: date(2025, 1, 2),
            monthly_fee: money(monthly_fee),
        })
        .await
        .expect("patient registers");
    service
}

fn pay(patient_id: &str, amount: i64, paid_on: NaiveDate, period: Option<BillingPeriod>) -> RecordPayment {
    RecordPayment {
        patient_id: patient_id.to_string(),
        period,
        amount: money(amount),
        payment_date: paid_on,
        payment_mode: PaymentMode::Upi,
        payment_type: PaymentType::FeePayment,
        notes: None,
    }
}

fn month_of<'a>(statement: &'a Statement, period: BillingPeriod) -> &'a MonthlyRecord {
    &statement
        .months
        .iter()
        .find(|m| m.record.period() == period)
        .expect("month present")
        .record
}

// =============================================================================
// PURE ENGINE - the dated fee lifecycle scenario
// =============================================================================

#[test]
fn test_monthly_fee_lifecycle_scenario() {
    // Month 1/2025: fee 1000, nothing paid yet.
    let jan = BillingPeriod::new(2025, 1);
    let feb = BillingPeriod::new(2025, 2);
    let mut records = vec![MonthlyRecord::open(
        "P0001",
        jan,
        money(1000),
        Decimal::ZERO,
        date(2025, 1, 10),
        Utc::now(),
    )];
    let mut events: Vec<PaymentEvent> = Vec::new();

    let outcome = reconcile_chain(records.clone(), &events, date(2025, 1, 5));
    let m1 = outcome.records.first().expect("january present");
    assert_eq!(m1.total_amount, money(1000));
    assert_eq!(m1.payment_status, PaymentStatus::Pending);

    // Payment of 400 arrives.
    events.push(PaymentEvent {
        id: Uuid::new_v4(),
        patient_id: "P0001".to_string(),
        amount: money(400),
        payment_date: date(2025, 1, 6),
        payment_mode: PaymentMode::Cash,
        payment_type: PaymentType::PartialPayment,
        applied_period: Some(jan),
        notes: None,
        created_at: Utc::now(),
    });
    let outcome = reconcile_chain(outcome.records, &events, date(2025, 1, 7));
    let m1 = outcome.records.first().expect("january present");
    assert_eq!(m1.amount_paid, money(400));
    assert_eq!(m1.amount_pending, money(600));
    assert_eq!(m1.payment_status, PaymentStatus::Partial);

    // Payment of 600 settles the month; February opens with no carry.
    events.push(PaymentEvent {
        id: Uuid::new_v4(),
        patient_id: "P0001".to_string(),
        amount: money(600),
        payment_date: date(2025, 1, 8),
        payment_mode: PaymentMode::Cash,
        payment_type: PaymentType::FeePayment,
        applied_period: Some(jan),
        notes: None,
        created_at: Utc::now(),
    });
    records = outcome.records;
    records.push(MonthlyRecord::open(
        "P0001",
        feb,
        money(1000),
        Decimal::ZERO,
        date(2025, 2, 10),
        Utc::now(),
    ));
    let outcome = reconcile_chain(records, &events, date(2025, 2, 1));

    let m1 = outcome
        .records
        .iter()
        .find(|r| r.period() == jan)
        .expect("january present");
    let m2 = outcome
        .records
        .iter()
        .find(|r| r.period() == feb)
        .expect("february present");
    assert_eq!(m1.amount_pending, Decimal::ZERO);
    assert_eq!(m1.payment_status, PaymentStatus::Paid);
    assert_eq!(m1.carry_forward_to_next, Decimal::ZERO);
    assert_eq!(m2.carry_forward_from_previous, Decimal::ZERO);
}

// =============================================================================
// SERVICE - FIFO settlement and carry propagation
// =============================================================================

#[tokio::test]
async fn test_untargeted_payment_settles_oldest_months_first() {
    let service = service_with_patient("P0001", 0).await;
    let m1 = BillingPeriod::new(2099, 1);
    let m2 = BillingPeriod::new(2099, 2);

    service
        .set_monthly_fee("P0001", m1, money(100), Decimal::ZERO)
        .await
        .expect("fee set");
    service
        .set_monthly_fee("P0001", m2, money(50), Decimal::ZERO)
        .await
        .expect("fee set");

    let statement = service
        .record_payment(pay("P0001", 120, date(2099, 2, 15), None))
        .await
        .expect("payment recorded");

    assert_eq!(month_of(&statement, m1).amount_pending, Decimal::ZERO);
    assert_eq!(month_of(&statement, m1).payment_status, PaymentStatus::Paid);
    assert_eq!(month_of(&statement, m2).amount_paid, money(20));
    assert_eq!(month_of(&statement, m2).amount_pending, money(30));
    assert_eq!(month_of(&statement, m2).payment_status, PaymentStatus::Partial);
    assert_eq!(statement.summary.balance_due, money(30));
}

#[tokio::test]
async fn test_settling_old_month_collapses_future_carry() {
    let service = service_with_patient("P0002", 100).await;
    let m1 = BillingPeriod::new(2099, 1);
    let m2 = BillingPeriod::new(2099, 2);

    service
        .set_monthly_fee("P0002", m1, money(100), Decimal::ZERO)
        .await
        .expect("fee set");
    let statement = service.open_period("P0002", m2).await.expect("period opens");

    // January unpaid: its 100 carries into February on top of the default fee.
    assert_eq!(month_of(&statement, m2).carry_forward_from_previous, money(100));
    assert_eq!(month_of(&statement, m2).amount_pending, money(200));

    let statement = service
        .record_payment(pay("P0002", 100, date(2099, 3, 1), Some(m1)))
        .await
        .expect("payment recorded");

    assert_eq!(month_of(&statement, m1).amount_pending, Decimal::ZERO);
    assert_eq!(month_of(&statement, m2).carry_forward_from_previous, Decimal::ZERO);
    assert_eq!(month_of(&statement, m2).amount_pending, money(100));
    assert_eq!(month_of(&statement, m2).payment_status, PaymentStatus::Pending);
}

#[tokio::test]
async fn test_advance_payment_books_against_payment_month() {
    let service = service_with_patient("P0003", 0).await;

    let statement = service
        .record_payment(pay("P0003", 500, date(2099, 4, 12), None))
        .await
        .expect("payment recorded");

    let april = BillingPeriod::new(2099, 4);
    let record = month_of(&statement, april);
    assert_eq!(record.amount_paid, money(500));
    assert_eq!(record.amount_pending, money(-500));
    assert_eq!(record.payment_status, PaymentStatus::Paid);
    // Credit does not leak into carry-forward.
    assert_eq!(record.carry_forward_to_next, Decimal::ZERO);
    assert_eq!(statement.summary.balance_due, money(-500));
}

#[tokio::test]
async fn test_fee_edit_ripples_like_a_payment() {
    let service = service_with_patient("P0004", 0).await;
    let m1 = BillingPeriod::new(2099, 1);
    let m2 = BillingPeriod::new(2099, 2);

    service
        .set_monthly_fee("P0004", m1, money(300), Decimal::ZERO)
        .await
        .expect("fee set");
    service
        .set_monthly_fee("P0004", m2, money(100), Decimal::ZERO)
        .await
        .expect("fee set");

    // Raising January's fee raises February's carry-in.
    let statement = service
        .set_monthly_fee("P0004", m1, money(450), money(50))
        .await
        .expect("fee updated");
    assert_eq!(month_of(&statement, m1).total_amount, money(500));
    assert_eq!(month_of(&statement, m2).carry_forward_from_previous, money(500));
    assert_eq!(statement.summary.balance_due, money(600));
}

// =============================================================================
// SERVICE - retries, validation, and the error taxonomy
// =============================================================================

#[tokio::test]
async fn test_recompute_is_idempotent() {
    let service = service_with_patient("P0005", 0).await;
    let m1 = BillingPeriod::new(2099, 1);

    service
        .set_monthly_fee("P0005", m1, money(750), money(25))
        .await
        .expect("fee set");
    service
        .record_payment(pay("P0005", 200, date(2099, 1, 5), None))
        .await
        .expect("payment recorded");

    let first = service.recompute_month("P0005", m1).await.expect("recompute");
    let second = service.recompute_month("P0005", m1).await.expect("recompute");

    assert_eq!(first.months.len(), second.months.len());
    for (a, b) in first.months.iter().zip(second.months.iter()) {
        assert_eq!(a.record, b.record);
    }
}

#[tokio::test]
async fn test_rejected_payment_leaves_ledger_untouched() {
    let service = service_with_patient("P0006", 0).await;
    let m1 = BillingPeriod::new(2099, 1);
    service
        .set_monthly_fee("P0006", m1, money(100), Decimal::ZERO)
        .await
        .expect("fee set");
    let before = service.get_statement("P0006").await.expect("statement");

    let err = service
        .record_payment(pay("P0006", 0, date(2099, 1, 5), None))
        .await
        .expect_err("zero payment rejected");
    assert!(matches!(err, LedgerError::InvalidAmount(_)));

    let err = service
        .record_payment(pay("P0006", 50, date(2099, 1, 5), Some(BillingPeriod::new(2099, 13))))
        .await
        .expect_err("month 13 rejected");
    assert!(matches!(err, LedgerError::InvalidPeriod(_)));

    let after = service.get_statement("P0006").await.expect("statement");
    assert_eq!(before.patient.version, after.patient.version);
    for (a, b) in before.months.iter().zip(after.months.iter()) {
        assert_eq!(a.record, b.record);
        assert_eq!(a.payments.len(), b.payments.len());
    }
}

#[tokio::test]
async fn test_unknown_patient_is_not_found() {
    let service = LedgerService::new(Arc::new(MemoryLedgerStore::new()));

    let err = service
        .record_payment(pay("P9999", 100, date(2099, 1, 5), None))
        .await
        .expect_err("unknown patient");
    assert!(matches!(err, LedgerError::PatientNotFound(_)));

    let err = service.get_statement("P9999").await.expect_err("unknown patient");
    assert!(matches!(err, LedgerError::PatientNotFound(_)));
}

#[tokio::test]
async fn test_remove_patient_cascades_to_ledger() {
    let service = service_with_patient("P0007", 100).await;
    service
        .record_payment(pay("P0007", 100, date(2099, 1, 5), None))
        .await
        .expect("payment recorded");

    service.remove_patient("P0007").await.expect("patient removed");

    let err = service.get_statement("P0007").await.expect_err("ledger gone");
    assert!(matches!(err, LedgerError::PatientNotFound(_)));
}

// =============================================================================
// STORE - optimistic locking
// =============================================================================

#[tokio::test]
async fn test_stale_commit_is_rejected_as_locked() {
    let store = MemoryLedgerStore::new();

    let now = Utc::now();
    let patient = ledger_service::Patient {
        id: "P0008".to_string(),
        name: "Ravi Kumar".to_string(),
        phone: None,
        admission_date: date(2025, 1, 2),
        monthly_fee: money(100),
        version: 0,
        created_at: now,
        updated_at: now,
    };
    store.insert_patient(&patient).await.expect("patient inserted");

    let update = LedgerUpdate {
        patient_id: "P0008".to_string(),
        expected_version: 0,
        records: Vec::new(),
        new_events: Vec::new(),
    };
    store.commit_ledger(update.clone()).await.expect("first commit wins");

    // Same expected version again: the chain moved underneath us.
    let err = store
        .commit_ledger(update)
        .await
        .expect_err("stale version rejected");
    assert!(matches!(err, LedgerError::RecordLocked(_)));
}
