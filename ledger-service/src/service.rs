//! Ledger command/query boundary
//!
//! Every mutation loads the patient's full chain, reruns reconciliation and
//! commits the changed records plus any appended payment events as one
//! atomic update. A version conflict surfaces as `RecordLocked`; callers
//! retry the whole operation.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{
    to_money, validate_monthly_record, validate_payment_amount, validate_period, BillingPeriod,
    LedgerConfig, MonthlyRecord, Patient, PaymentEvent, PaymentMode, PaymentType,
};
use crate::reconcile::{oldest_pending, reconcile_chain, ReconcileOutcome};
use crate::statement::{build_statement, Statement};
use crate::store::{LedgerStore, LedgerUpdate};

/// Command to register a patient on admission
#[derive(Debug, Clone)]
pub struct RegisterPatient {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub admission_date: NaiveDate,
    pub monthly_fee: Decimal,
}

/// Command to record a payment against a patient's ledger
#[derive(Debug, Clone)]
pub struct RecordPayment {
    pub patient_id: String,
    /// Target month; `None` settles the oldest pending month first
    pub period: Option<BillingPeriod>,
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    pub payment_mode: PaymentMode,
    pub payment_type: PaymentType,
    pub notes: Option<String>,
}

/// Ledger service
pub struct LedgerService {
    store: Arc<dyn LedgerStore>,
    config: LedgerConfig,
}

impl LedgerService {
    /// Create a new ledger service over the given store
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self::with_config(store, LedgerConfig::default())
    }

    pub fn with_config(store: Arc<dyn LedgerStore>, config: LedgerConfig) -> Self {
        Self { store, config }
    }

    /// Register a patient
    pub async fn register_patient(&self, cmd: RegisterPatient) -> LedgerResult<Patient> {
        if cmd.monthly_fee < Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(format!(
                "monthly_fee must not be negative, got {}",
                cmd.monthly_fee
            )));
        }
        let now = Utc::now();
        let patient = Patient {
            id: cmd.id,
            name: cmd.name,
            phone: cmd.phone,
            admission_date: cmd.admission_date,
            monthly_fee: to_money(cmd.monthly_fee),
            version: 0,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_patient(&patient).await?;
        info!(patient_id = %patient.id, "Patient registered");
        Ok(patient)
    }

    pub async fn get_patient(&self, patient_id: &str) -> LedgerResult<Patient> {
        self.store
            .fetch_patient(patient_id)
            .await?
            .ok_or_else(|| LedgerError::PatientNotFound(patient_id.to_string()))
    }

    pub async fn list_patients(&self) -> LedgerResult<Vec<Patient>> {
        self.store.list_patients().await
    }

    /// Remove a patient; cascades to records and payment history
    pub async fn remove_patient(&self, patient_id: &str) -> LedgerResult<()> {
        if !self.store.remove_patient(patient_id).await? {
            return Err(LedgerError::PatientNotFound(patient_id.to_string()));
        }
        info!(patient_id = %patient_id, "Patient removed");
        Ok(())
    }

    /// Fetch a patient's statement: the reconciled chain with embedded
    /// payments. Read-only; statuses are re-derived against today's date.
    pub async fn get_statement(&self, patient_id: &str) -> LedgerResult<Statement> {
        let snapshot = self.store.load_ledger(patient_id).await?;
        let today = Utc::now().date_naive();
        let outcome = reconcile_chain(snapshot.records, &snapshot.events, today);
        Ok(build_statement(snapshot.patient, &outcome, &snapshot.events))
    }

    /// Raw append-only payment history for a patient, oldest first
    pub async fn payment_history(&self, patient_id: &str) -> LedgerResult<Vec<PaymentEvent>> {
        let snapshot = self.store.load_ledger(patient_id).await?;
        let mut events = snapshot.events;
        events.sort_by_key(|e| (e.payment_date, e.created_at, e.id));
        Ok(events)
    }

    /// Record a payment and return the updated statement
    pub async fn record_payment(&self, cmd: RecordPayment) -> LedgerResult<Statement> {
        validate_payment_amount(cmd.amount)?;
        if let Some(period) = cmd.period {
            validate_period(period, &self.config)?;
        }

        let snapshot = self.store.load_ledger(&cmd.patient_id).await?;
        let now = Utc::now();
        let today = now.date_naive();
        let mut records = snapshot.records;
        let mut events = snapshot.events;
        let mut created: Vec<BillingPeriod> = Vec::new();

        let target = match cmd.period {
            Some(period) => Some(period),
            None => {
                let current = reconcile_chain(records.clone(), &events, today);
                if oldest_pending(&current.records).is_some() {
                    // FIFO settlement across the pending months
                    None
                } else {
                    // Nothing is owed; book an advance against the payment month
                    Some(BillingPeriod::containing(cmd.payment_date))
                }
            }
        };

        if let Some(period) = target {
            validate_period(period, &self.config)?;
            self.ensure_record(&mut records, &mut created, &cmd.patient_id, period, None, now)?;
        }

        let event = PaymentEvent {
            id: Uuid::new_v4(),
            patient_id: cmd.patient_id.clone(),
            amount: to_money(cmd.amount),
            payment_date: cmd.payment_date,
            payment_mode: cmd.payment_mode,
            payment_type: cmd.payment_type,
            applied_period: target,
            notes: cmd.notes,
            created_at: now,
        };
        events.push(event.clone());

        let outcome = reconcile_chain(records, &events, today);
        info!(
            patient_id = %cmd.patient_id,
            amount = %event.amount,
            target = %target.map(|p| p.to_string()).unwrap_or_else(|| "fifo".to_string()),
            "Recording payment"
        );
        self.persist(&snapshot.patient, outcome, vec![event], created, now, &events)
            .await
    }

    /// Set a month's fee inputs; ripples carry-forward like a payment does
    pub async fn set_monthly_fee(
        &self,
        patient_id: &str,
        period: BillingPeriod,
        monthly_fee: Decimal,
        other_fees: Decimal,
    ) -> LedgerResult<Statement> {
        validate_period(period, &self.config)?;
        for (field, value) in [("monthly_fee", monthly_fee), ("other_fees", other_fees)] {
            if value < Decimal::ZERO {
                return Err(LedgerError::InvalidAmount(format!(
                    "{} must not be negative, got {}",
                    field, value
                )));
            }
        }

        let snapshot = self.store.load_ledger(patient_id).await?;
        let now = Utc::now();
        let mut records = snapshot.records;
        let mut touched = vec![period];

        let mut created = Vec::new();
        self.ensure_record(&mut records, &mut created, patient_id, period, None, now)?;
        touched.extend(created);
        if let Some(record) = records.iter_mut().find(|r| r.period() == period) {
            record.monthly_fee = to_money(monthly_fee);
            record.other_fees = to_money(other_fees);
        }

        let outcome = reconcile_chain(records, &snapshot.events, now.date_naive());
        debug!(patient_id = %patient_id, period = %period, "Monthly fee updated");
        self.persist(&snapshot.patient, outcome, Vec::new(), touched, now, &snapshot.events)
            .await
    }

    /// Open a billing period explicitly, seeding the patient's default fee
    ///
    /// Opening an already-open period is a no-op, so retries are safe.
    pub async fn open_period(
        &self,
        patient_id: &str,
        period: BillingPeriod,
    ) -> LedgerResult<Statement> {
        validate_period(period, &self.config)?;

        let snapshot = self.store.load_ledger(patient_id).await?;
        let now = Utc::now();
        let mut records = snapshot.records;
        let mut created = Vec::new();

        self.ensure_record(
            &mut records,
            &mut created,
            patient_id,
            period,
            Some(snapshot.patient.monthly_fee),
            now,
        )?;

        let outcome = reconcile_chain(records, &snapshot.events, now.date_naive());
        if created.is_empty() {
            return Ok(build_statement(snapshot.patient, &outcome, &snapshot.events));
        }
        info!(patient_id = %patient_id, period = %period, "Billing period opened");
        self.persist(&snapshot.patient, outcome, Vec::new(), created, now, &snapshot.events)
            .await
    }

    /// Recompute a month (and everything downstream) from scratch
    ///
    /// Administrative correction entry point; idempotent.
    pub async fn recompute_month(
        &self,
        patient_id: &str,
        period: BillingPeriod,
    ) -> LedgerResult<Statement> {
        validate_period(period, &self.config)?;

        let snapshot = self.store.load_ledger(patient_id).await?;
        let now = Utc::now();
        let outcome = reconcile_chain(snapshot.records, &snapshot.events, now.date_naive());

        if outcome.changed.is_empty() {
            return Ok(build_statement(snapshot.patient, &outcome, &snapshot.events));
        }
        debug!(patient_id = %patient_id, period = %period, "Ledger recomputed");
        self.persist(&snapshot.patient, outcome, Vec::new(), Vec::new(), now, &snapshot.events)
            .await
    }

    /// Lazily create a record for `period` when the chain does not have one
    fn ensure_record(
        &self,
        records: &mut Vec<MonthlyRecord>,
        created: &mut Vec<BillingPeriod>,
        patient_id: &str,
        period: BillingPeriod,
        seed_fee: Option<Decimal>,
        now: DateTime<Utc>,
    ) -> LedgerResult<()> {
        if records.iter().any(|r| r.period() == period) {
            return Ok(());
        }
        let due_date = period.due_date(self.config.due_day)?;
        let record = MonthlyRecord::open(
            patient_id,
            period,
            seed_fee.unwrap_or(Decimal::ZERO),
            Decimal::ZERO,
            due_date,
            now,
        );
        validate_monthly_record(&record, &self.config)?;
        records.push(record);
        created.push(period);
        Ok(())
    }

    /// Commit the changed slice of the chain and build the statement
    async fn persist(
        &self,
        patient: &Patient,
        mut outcome: ReconcileOutcome,
        new_events: Vec<PaymentEvent>,
        force: Vec<BillingPeriod>,
        now: DateTime<Utc>,
        all_events: &[PaymentEvent],
    ) -> LedgerResult<Statement> {
        let mut to_persist = Vec::new();
        for record in &mut outcome.records {
            let period = record.period();
            if outcome.changed.contains(&period) || force.contains(&period) {
                record.updated_at = now;
                to_persist.push(record.clone());
            }
        }

        self.store
            .commit_ledger(LedgerUpdate {
                patient_id: patient.id.clone(),
                expected_version: patient.version,
                records: to_persist,
                new_events,
            })
            .await?;

        let mut committed = patient.clone();
        committed.version += 1;
        committed.updated_at = now;
        Ok(build_statement(committed, &outcome, all_events))
    }
}
