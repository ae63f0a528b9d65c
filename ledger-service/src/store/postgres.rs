// Postgres-backed ledger store
//
// Mutations lock the patient row (SELECT ... FOR UPDATE) and check the
// ledger version before touching the record chain, so two concurrent
// payments to the same patient serialize instead of losing an update.
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use tracing::debug;
use uuid::Uuid;

use database_layer::{DatabasePool, TransactionManager};

use crate::error::{LedgerError, LedgerResult};
use crate::models::{BillingPeriod, MonthlyRecord, Patient, PaymentEvent, PaymentMode, PaymentType};
use crate::status::PaymentStatus;
use crate::store::{LedgerSnapshot, LedgerStore, LedgerUpdate};

/// Ledger store over the shared Postgres pool
pub struct PostgresLedgerStore {
    pool: DatabasePool,
    transactions: TransactionManager,
}

impl PostgresLedgerStore {
    pub fn new(pool: DatabasePool) -> Self {
        let transactions = TransactionManager::new(pool.clone());
        Self { pool, transactions }
    }
}

fn persist_err(err: sqlx::Error) -> LedgerError {
    LedgerError::PersistenceFailure(err.to_string())
}

#[derive(FromRow)]
struct PatientRow {
    id: String,
    name: String,
    phone: Option<String>,
    admission_date: NaiveDate,
    monthly_fee: Decimal,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PatientRow> for Patient {
    fn from(row: PatientRow) -> Self {
        Patient {
            id: row.id,
            name: row.name,
            phone: row.phone,
            admission_date: row.admission_date,
            monthly_fee: row.monthly_fee,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct RecordRow {
    id: Uuid,
    patient_id: String,
    month: i32,
    year: i32,
    monthly_fee: Decimal,
    other_fees: Decimal,
    total_amount: Decimal,
    amount_paid: Decimal,
    amount_pending: Decimal,
    carry_forward_from_previous: Decimal,
    carry_forward_to_next: Decimal,
    due_date: NaiveDate,
    payment_status: PaymentStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RecordRow> for MonthlyRecord {
    type Error = LedgerError;

    fn try_from(row: RecordRow) -> Result<Self, Self::Error> {
        let month = u32::try_from(row.month).map_err(|_| {
            LedgerError::PersistenceFailure(format!(
                "corrupt monthly record {}: month {}",
                row.id, row.month
            ))
        })?;
        Ok(MonthlyRecord {
            id: row.id,
            patient_id: row.patient_id,
            month,
            year: row.year,
            monthly_fee: row.monthly_fee,
            other_fees: row.other_fees,
            total_amount: row.total_amount,
            amount_paid: row.amount_paid,
            amount_pending: row.amount_pending,
            carry_forward_from_previous: row.carry_forward_from_previous,
            carry_forward_to_next: row.carry_forward_to_next,
            due_date: row.due_date,
            payment_status: row.payment_status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct EventRow {
    id: Uuid,
    patient_id: String,
    amount: Decimal,
    payment_date: NaiveDate,
    payment_mode: PaymentMode,
    #[sqlx(rename = "type")]
    payment_type: PaymentType,
    applied_month: Option<i32>,
    applied_year: Option<i32>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for PaymentEvent {
    type Error = LedgerError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let applied_period = match (row.applied_month, row.applied_year) {
            (Some(month), Some(year)) => {
                let month = u32::try_from(month).map_err(|_| {
                    LedgerError::PersistenceFailure(format!(
                        "corrupt payment {}: month {}",
                        row.id, month
                    ))
                })?;
                Some(BillingPeriod::new(year, month))
            }
            (None, None) => None,
            _ => {
                return Err(LedgerError::PersistenceFailure(format!(
                    "corrupt payment {}: half-specified target period",
                    row.id
                )))
            }
        };
        Ok(PaymentEvent {
            id: row.id,
            patient_id: row.patient_id,
            amount: row.amount,
            payment_date: row.payment_date,
            payment_mode: row.payment_mode,
            payment_type: row.payment_type,
            applied_period,
            notes: row.notes,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    async fn insert_patient(&self, patient: &Patient) -> LedgerResult<()> {
        sqlx::query(
            r#"
            INSERT INTO patients (
                id, name, phone, admission_date, monthly_fee, version,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(&patient.id)
        .bind(&patient.name)
        .bind(&patient.phone)
        .bind(patient.admission_date)
        .bind(patient.monthly_fee)
        .bind(patient.version)
        .bind(patient.created_at)
        .bind(patient.updated_at)
        .execute(self.pool.pool())
        .await
        .map_err(persist_err)?;

        debug!(patient_id = %patient.id, "Patient registered");
        Ok(())
    }

    async fn fetch_patient(&self, patient_id: &str) -> LedgerResult<Option<Patient>> {
        let row = sqlx::query_as::<_, PatientRow>(
            r#"
            SELECT id, name, phone, admission_date, monthly_fee, version,
                   created_at, updated_at
            FROM patients
            WHERE id = $1
            "#,
        )
        .bind(patient_id)
        .fetch_optional(self.pool.pool())
        .await
        .map_err(persist_err)?;

        Ok(row.map(Patient::from))
    }

    async fn list_patients(&self) -> LedgerResult<Vec<Patient>> {
        let rows = sqlx::query_as::<_, PatientRow>(
            r#"
            SELECT id, name, phone, admission_date, monthly_fee, version,
                   created_at, updated_at
            FROM patients
            ORDER BY id ASC
            "#,
        )
        .fetch_all(self.pool.pool())
        .await
        .map_err(persist_err)?;

        Ok(rows.into_iter().map(Patient::from).collect())
    }

    async fn remove_patient(&self, patient_id: &str) -> LedgerResult<bool> {
        let result = sqlx::query("DELETE FROM patients WHERE id = $1")
            .bind(patient_id)
            .execute(self.pool.pool())
            .await
            .map_err(persist_err)?;

        Ok(result.rows_affected() > 0)
    }

    async fn load_ledger(&self, patient_id: &str) -> LedgerResult<LedgerSnapshot> {
        let patient = self
            .fetch_patient(patient_id)
            .await?
            .ok_or_else(|| LedgerError::PatientNotFound(patient_id.to_string()))?;

        let record_rows = sqlx::query_as::<_, RecordRow>(
            r#"
            SELECT id, patient_id, month, year, monthly_fee, other_fees,
                   total_amount, amount_paid, amount_pending,
                   carry_forward_from_previous, carry_forward_to_next,
                   due_date, payment_status, created_at, updated_at
            FROM patient_monthly_records
            WHERE patient_id = $1
            ORDER BY year ASC, month ASC
            "#,
        )
        .bind(patient_id)
        .fetch_all(self.pool.pool())
        .await
        .map_err(persist_err)?;

        let event_rows = sqlx::query_as::<_, EventRow>(
            r#"
            SELECT id, patient_id, amount, payment_date, payment_mode, type,
                   applied_month, applied_year, notes, created_at
            FROM patient_payment_history
            WHERE patient_id = $1
            ORDER BY payment_date ASC, created_at ASC
            "#,
        )
        .bind(patient_id)
        .fetch_all(self.pool.pool())
        .await
        .map_err(persist_err)?;

        let records = record_rows
            .into_iter()
            .map(MonthlyRecord::try_from)
            .collect::<LedgerResult<Vec<_>>>()?;
        let events = event_rows
            .into_iter()
            .map(PaymentEvent::try_from)
            .collect::<LedgerResult<Vec<_>>>()?;

        Ok(LedgerSnapshot {
            patient,
            records,
            events,
        })
    }

    async fn commit_ledger(&self, update: LedgerUpdate) -> LedgerResult<()> {
        let mut tx = self.transactions.begin().await?;

        let version = sqlx::query_scalar::<_, i64>(
            "SELECT version FROM patients WHERE id = $1 FOR UPDATE",
        )
        .bind(&update.patient_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(persist_err)?
        .ok_or_else(|| LedgerError::PatientNotFound(update.patient_id.clone()))?;

        if version != update.expected_version {
            // Dropping the transaction rolls it back; nothing was written.
            return Err(LedgerError::RecordLocked(update.patient_id.clone()));
        }

        for record in &update.records {
            sqlx::query(
                r#"
                INSERT INTO patient_monthly_records (
                    id, patient_id, month, year, monthly_fee, other_fees,
                    total_amount, amount_paid, amount_pending,
                    carry_forward_from_previous, carry_forward_to_next,
                    due_date, payment_status, created_at, updated_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
                ON CONFLICT (patient_id, month, year) DO UPDATE SET
                    monthly_fee = EXCLUDED.monthly_fee,
                    other_fees = EXCLUDED.other_fees,
                    total_amount = EXCLUDED.total_amount,
                    amount_paid = EXCLUDED.amount_paid,
                    amount_pending = EXCLUDED.amount_pending,
                    carry_forward_from_previous = EXCLUDED.carry_forward_from_previous,
                    carry_forward_to_next = EXCLUDED.carry_forward_to_next,
                    due_date = EXCLUDED.due_date,
                    payment_status = EXCLUDED.payment_status,
                    updated_at = EXCLUDED.updated_at
                "#,
            )
            .bind(record.id)
            .bind(&record.patient_id)
            .bind(record.month as i32)
            .bind(record.year)
            .bind(record.monthly_fee)
            .bind(record.other_fees)
            .bind(record.total_amount)
            .bind(record.amount_paid)
            .bind(record.amount_pending)
            .bind(record.carry_forward_from_previous)
            .bind(record.carry_forward_to_next)
            .bind(record.due_date)
            .bind(record.payment_status)
            .bind(record.created_at)
            .bind(record.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(persist_err)?;
        }

        for event in &update.new_events {
            sqlx::query(
                r#"
                INSERT INTO patient_payment_history (
                    id, patient_id, amount, payment_date, payment_mode, type,
                    applied_month, applied_year, notes, created_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(event.id)
            .bind(&event.patient_id)
            .bind(event.amount)
            .bind(event.payment_date)
            .bind(event.payment_mode)
            .bind(event.payment_type)
            .bind(event.applied_period.map(|p| p.month as i32))
            .bind(event.applied_period.map(|p| p.year))
            .bind(&event.notes)
            .bind(event.created_at)
            .execute(&mut *tx)
            .await
            .map_err(persist_err)?;
        }

        sqlx::query("UPDATE patients SET version = version + 1, updated_at = $2 WHERE id = $1")
            .bind(&update.patient_id)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await
            .map_err(persist_err)?;

        tx.commit().await.map_err(persist_err)?;

        debug!(
            patient_id = %update.patient_id,
            records = update.records.len(),
            events = update.new_events.len(),
            "Ledger update committed"
        );
        Ok(())
    }
}
