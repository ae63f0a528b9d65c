use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Fee lifecycle status for a monthly record
///
/// Derived entirely from the reconciled amounts, the due date and the current
/// date. The stored column is a cache of this derivation; nothing else may
/// set a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Partial,
    Paid,
    Overdue,
}

/// Derive the fee lifecycle status for one monthly record
///
/// Fully settled months are `paid` regardless of the due date. Overdue is an
/// overlay on pending/partial, evaluated against `today`, not a separately
/// persisted branch.
pub fn derive_status(
    amount_pending: Decimal,
    amount_paid: Decimal,
    due_date: NaiveDate,
    today: NaiveDate,
) -> PaymentStatus {
    if amount_pending <= Decimal::ZERO {
        PaymentStatus::Paid
    } else if today > due_date {
        PaymentStatus::Overdue
    } else if amount_paid > Decimal::ZERO {
        PaymentStatus::Partial
    } else {
        PaymentStatus::Pending
    }
}
