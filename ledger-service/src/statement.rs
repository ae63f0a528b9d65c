//! Patient statement assembly
//!
//! A statement is the read model of a ledger: the chronological record chain
//! with each month's settled payments embedded, plus closing totals.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{BillingPeriod, MonthlyRecord, Patient, PaymentEvent, PaymentMode, PaymentType};
use crate::reconcile::ReconcileOutcome;

/// Payment as it appears inside a monthly statement
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatementPayment {
    pub id: Uuid,
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    pub payment_mode: PaymentMode,
    #[serde(rename = "type")]
    pub payment_type: PaymentType,
    /// Portion of the payment settled against this month
    pub applied_amount: Decimal,
    pub notes: Option<String>,
}

/// One month of the statement
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatementMonth {
    pub record: MonthlyRecord,
    pub payments: Vec<StatementPayment>,
}

/// Closing totals across the whole chain
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatementSummary {
    pub total_billed: Decimal,
    pub total_paid: Decimal,
    /// Closing balance, the last month's pending amount; negative is credit
    pub balance_due: Decimal,
    /// Untargeted money no month could absorb
    pub unallocated_credit: Decimal,
}

/// Full ledger statement for one patient
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Statement {
    pub patient: Patient,
    pub months: Vec<StatementMonth>,
    pub summary: StatementSummary,
}

/// Assemble a statement from a reconciled chain and the payment history
pub(crate) fn build_statement(
    patient: Patient,
    outcome: &ReconcileOutcome,
    events: &[PaymentEvent],
) -> Statement {
    let by_id: HashMap<Uuid, &PaymentEvent> = events.iter().map(|e| (e.id, e)).collect();

    let mut per_month: HashMap<BillingPeriod, Vec<StatementPayment>> = HashMap::new();
    let mut allocated_ids: Vec<Uuid> = Vec::new();

    for allocation in &outcome.allocations {
        let Some(event) = by_id.get(&allocation.event_id) else {
            continue;
        };
        allocated_ids.push(event.id);
        per_month
            .entry(allocation.period)
            .or_default()
            .push(StatementPayment {
                id: event.id,
                amount: event.amount,
                payment_date: event.payment_date,
                payment_mode: event.payment_mode,
                payment_type: event.payment_type,
                applied_amount: allocation.amount,
                notes: event.notes.clone(),
            });
    }

    // Events nothing absorbed (pure credit) are shown on the month of their
    // payment date when it exists, else on the last month of the chain.
    let last_period = outcome.records.last().map(MonthlyRecord::period);
    for event in events {
        if allocated_ids.contains(&event.id) {
            continue;
        }
        let date_period = BillingPeriod::containing(event.payment_date);
        let home = if outcome.records.iter().any(|r| r.period() == date_period) {
            Some(date_period)
        } else {
            last_period
        };
        if let Some(period) = home {
            per_month.entry(period).or_default().push(StatementPayment {
                id: event.id,
                amount: event.amount,
                payment_date: event.payment_date,
                payment_mode: event.payment_mode,
                payment_type: event.payment_type,
                applied_amount: Decimal::ZERO,
                notes: event.notes.clone(),
            });
        }
    }

    let months: Vec<StatementMonth> = outcome
        .records
        .iter()
        .map(|record| StatementMonth {
            record: record.clone(),
            payments: per_month.remove(&record.period()).unwrap_or_default(),
        })
        .collect();

    let total_billed: Decimal = outcome.records.iter().map(|r| r.total_amount).sum();
    let total_paid: Decimal = outcome.records.iter().map(|r| r.amount_paid).sum();
    let balance_due = outcome
        .records
        .last()
        .map(|r| r.amount_pending)
        .unwrap_or(Decimal::ZERO);

    Statement {
        patient,
        months,
        summary: StatementSummary {
            total_billed,
            total_paid,
            balance_due,
            unallocated_credit: outcome.unallocated,
        },
    }
}
