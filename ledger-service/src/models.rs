use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{LedgerError, LedgerResult};
use crate::status::PaymentStatus;

/// Ledger configuration bounds
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Earliest billable year
    pub min_year: i32,
    /// Latest billable year
    pub max_year: i32,
    /// Day of the billing month fees fall due (clamped to month length)
    pub due_day: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            min_year: 2000,
            max_year: 2100,
            due_day: 10,
        }
    }
}

/// Calendar month a fee record belongs to
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
pub struct BillingPeriod {
    pub year: i32,
    pub month: u32,
}

impl BillingPeriod {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    /// Period containing the given calendar date
    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The next calendar month
    pub fn next(&self) -> Self {
        if self.month >= 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    pub fn first_day(&self) -> LedgerResult<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).ok_or_else(|| {
            LedgerError::InvalidPeriod(format!("{}/{} is not a calendar month", self.month, self.year))
        })
    }

    pub fn days_in_month(&self) -> LedgerResult<u32> {
        let first = self.first_day()?;
        let next_first = self.next().first_day()?;
        Ok(next_first.signed_duration_since(first).num_days() as u32)
    }

    /// Due date for this period, `due_day` clamped to the month length
    pub fn due_date(&self, due_day: u32) -> LedgerResult<NaiveDate> {
        let day = due_day.clamp(1, self.days_in_month()?);
        NaiveDate::from_ymd_opt(self.year, self.month, day).ok_or_else(|| {
            LedgerError::InvalidPeriod(format!("{}/{} is not a calendar month", self.month, self.year))
        })
    }
}

impl std::fmt::Display for BillingPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.month, self.year)
    }
}

/// Patient registered with the center
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Patient {
    /// Opaque identifier, e.g. "P0042"
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub admission_date: NaiveDate,
    /// Default fee seeded into explicitly opened billing periods
    pub monthly_fee: Decimal,
    /// Optimistic concurrency token for the patient's whole record chain
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// How a payment was made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "payment_mode", rename_all = "snake_case")]
pub enum PaymentMode {
    Cash,
    Card,
    BankTransfer,
    Upi,
    Cheque,
}

/// What a payment is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "payment_type", rename_all = "snake_case")]
pub enum PaymentType {
    FeePayment,
    AdvancePayment,
    PartialPayment,
}

/// Append-only payment ledger entry
///
/// Immutable once created; corrections are new offsetting events, never edits.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentEvent {
    pub id: Uuid,
    pub patient_id: String,
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    pub payment_mode: PaymentMode,
    #[serde(rename = "type")]
    pub payment_type: PaymentType,
    /// Target month, if the payer named one; `None` settles FIFO
    pub applied_period: Option<BillingPeriod>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One month of fees for a patient
///
/// `total_amount`, `amount_paid`, `amount_pending`, `carry_forward_to_next`
/// and `payment_status` are caches of the reconciliation; every mutation
/// rewrites them from scratch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MonthlyRecord {
    pub id: Uuid,
    pub patient_id: String,
    pub month: u32,
    pub year: i32,
    pub monthly_fee: Decimal,
    pub other_fees: Decimal,
    pub total_amount: Decimal,
    pub amount_paid: Decimal,
    pub amount_pending: Decimal,
    pub carry_forward_from_previous: Decimal,
    pub carry_forward_to_next: Decimal,
    pub due_date: NaiveDate,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MonthlyRecord {
    /// Open a record for a billing period with zeroed reconciliation caches
    pub fn open(
        patient_id: &str,
        period: BillingPeriod,
        monthly_fee: Decimal,
        other_fees: Decimal,
        due_date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            patient_id: patient_id.to_string(),
            month: period.month,
            year: period.year,
            monthly_fee,
            other_fees,
            total_amount: Decimal::ZERO,
            amount_paid: Decimal::ZERO,
            amount_pending: Decimal::ZERO,
            carry_forward_from_previous: Decimal::ZERO,
            carry_forward_to_next: Decimal::ZERO,
            due_date,
            payment_status: PaymentStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn period(&self) -> BillingPeriod {
        BillingPeriod {
            year: self.year,
            month: self.month,
        }
    }
}

/// Validate a billing period against the configured bounds
pub fn validate_period(period: BillingPeriod, config: &LedgerConfig) -> LedgerResult<()> {
    if !(1..=12).contains(&period.month) {
        return Err(LedgerError::InvalidPeriod(format!(
            "month {} is not in 1..=12",
            period.month
        )));
    }
    if period.year < config.min_year || period.year > config.max_year {
        return Err(LedgerError::InvalidPeriod(format!(
            "year {} is outside {}..={}",
            period.year, config.min_year, config.max_year
        )));
    }
    Ok(())
}

/// Validate a monthly record's inputs
///
/// Monetary inputs must be non-negative and the period must be a real month
/// inside the configured year bounds.
pub fn validate_monthly_record(record: &MonthlyRecord, config: &LedgerConfig) -> LedgerResult<()> {
    for (field, value) in [
        ("monthly_fee", record.monthly_fee),
        ("other_fees", record.other_fees),
        ("carry_forward_from_previous", record.carry_forward_from_previous),
    ] {
        if value < Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(format!(
                "{} must not be negative, got {}",
                field, value
            )));
        }
    }
    validate_period(record.period(), config)
}

/// Validate a payment amount; payments must be strictly positive
pub fn validate_payment_amount(amount: Decimal) -> LedgerResult<()> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidAmount(format!(
            "payment amount must be positive, got {}",
            amount
        )));
    }
    Ok(())
}

/// Rescale a monetary amount to two fractional digits
pub fn to_money(amount: Decimal) -> Decimal {
    amount.round_dp(2)
}
