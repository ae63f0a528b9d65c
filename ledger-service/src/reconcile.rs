//! Payment reconciliation for a patient's record chain
//!
//! Recomputes every derived amount from scratch: month totals, paid and
//! pending amounts, carry-forward between consecutive months, and the fee
//! lifecycle status. Payments that name a target month count fully toward
//! that month; payments without a target are drawn down FIFO, oldest unpaid
//! month first. Carry-forward changes propagate down the chain until a
//! month's carry-forward is unchanged (fixed point).

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::{to_money, BillingPeriod, MonthlyRecord, PaymentEvent};
use crate::status::derive_status;

/// Portion of one payment settled against one month
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    pub event_id: Uuid,
    pub period: BillingPeriod,
    pub amount: Decimal,
}

/// Result of reconciling a patient's full record chain
#[derive(Debug)]
pub struct ReconcileOutcome {
    /// The chain in chronological order with all caches rewritten
    pub records: Vec<MonthlyRecord>,
    /// How each payment was settled across months
    pub allocations: Vec<Allocation>,
    /// Untargeted money no month could absorb
    pub unallocated: Decimal,
    /// Periods whose cached values changed relative to the input
    pub changed: Vec<BillingPeriod>,
}

/// Reconcile a patient's record chain against the full payment history
///
/// Pure computation; the chronologically first month reconciles with an
/// opening carry of zero. Idempotent: reconciling an already reconciled
/// chain changes nothing.
pub fn reconcile_chain(
    mut records: Vec<MonthlyRecord>,
    events: &[PaymentEvent],
    today: NaiveDate,
) -> ReconcileOutcome {
    records.sort_by_key(MonthlyRecord::period);

    let mut ordered: Vec<&PaymentEvent> = events.iter().collect();
    ordered.sort_by_key(|e| (e.payment_date, e.created_at, e.id));

    let known: HashSet<BillingPeriod> = records.iter().map(MonthlyRecord::period).collect();

    let mut targeted: HashMap<BillingPeriod, Decimal> = HashMap::new();
    let mut allocations: Vec<Allocation> = Vec::new();
    let mut pool: VecDeque<(Uuid, Decimal)> = VecDeque::new();
    let mut unallocated = Decimal::ZERO;

    for event in ordered {
        let amount = to_money(event.amount);
        match event.applied_period {
            Some(period) if known.contains(&period) => {
                *targeted.entry(period).or_default() += amount;
                allocations.push(Allocation {
                    event_id: event.id,
                    period,
                    amount,
                });
            }
            Some(_) => {
                // Target month was removed by administrative correction; the
                // money stays visible as unallocated credit.
                unallocated += amount;
            }
            None => pool.push_back((event.id, amount)),
        }
    }

    let mut changed = Vec::new();
    let mut carry = Decimal::ZERO;

    for record in &mut records {
        let period = record.period();
        let total = to_money(record.monthly_fee) + to_money(record.other_fees);
        let mut paid = targeted.get(&period).copied().unwrap_or(Decimal::ZERO);
        let mut owed = total + carry - paid;

        // FIFO settlement: untargeted payments fill the oldest debt first.
        while owed > Decimal::ZERO {
            let Some((event_id, remaining)) = pool.front_mut() else {
                break;
            };
            let slice = (*remaining).min(owed);
            allocations.push(Allocation {
                event_id: *event_id,
                period,
                amount: slice,
            });
            paid += slice;
            owed -= slice;
            *remaining -= slice;
            if *remaining <= Decimal::ZERO {
                pool.pop_front();
            }
        }

        let pending = total + carry - paid;
        let carry_out = pending.max(Decimal::ZERO);
        let status = derive_status(pending, paid, record.due_date, today);

        let dirty = record.total_amount != total
            || record.carry_forward_from_previous != carry
            || record.amount_paid != paid
            || record.amount_pending != pending
            || record.carry_forward_to_next != carry_out
            || record.payment_status != status;

        record.total_amount = total;
        record.carry_forward_from_previous = carry;
        record.amount_paid = paid;
        record.amount_pending = pending;
        record.carry_forward_to_next = carry_out;
        record.payment_status = status;

        if dirty {
            changed.push(period);
        }
        carry = carry_out;
    }

    unallocated += pool.iter().map(|(_, remaining)| *remaining).sum::<Decimal>();

    ReconcileOutcome {
        records,
        allocations,
        unallocated,
        changed,
    }
}

/// Oldest month still carrying a positive pending amount
pub fn oldest_pending(records: &[MonthlyRecord]) -> Option<BillingPeriod> {
    records
        .iter()
        .find(|r| r.amount_pending > Decimal::ZERO)
        .map(MonthlyRecord::period)
}
