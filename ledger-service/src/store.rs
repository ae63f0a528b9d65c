//! Persistence port for the ledger
//!
//! The service receives a `LedgerStore` at construction instead of reaching
//! for a process-wide pool, so tests can substitute the in-memory
//! implementation and production wires up Postgres.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::error::LedgerResult;
use crate::models::{MonthlyRecord, Patient, PaymentEvent};

pub use memory::MemoryLedgerStore;
pub use postgres::PostgresLedgerStore;

/// A patient's full ledger as read in one snapshot
#[derive(Debug, Clone)]
pub struct LedgerSnapshot {
    pub patient: Patient,
    pub records: Vec<MonthlyRecord>,
    pub events: Vec<PaymentEvent>,
}

/// One atomic mutation of a patient's ledger
///
/// Applied only if the patient's ledger version still equals
/// `expected_version`; otherwise the commit fails with `RecordLocked` and
/// nothing is written.
#[derive(Debug, Clone)]
pub struct LedgerUpdate {
    pub patient_id: String,
    pub expected_version: i64,
    /// Records to insert or overwrite, keyed by (patient_id, month, year)
    pub records: Vec<MonthlyRecord>,
    /// Payment events to append
    pub new_events: Vec<PaymentEvent>,
}

/// Storage port for patients and their ledgers
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn insert_patient(&self, patient: &Patient) -> LedgerResult<()>;

    async fn fetch_patient(&self, patient_id: &str) -> LedgerResult<Option<Patient>>;

    async fn list_patients(&self) -> LedgerResult<Vec<Patient>>;

    /// Delete a patient and cascade to records and payment history
    async fn remove_patient(&self, patient_id: &str) -> LedgerResult<bool>;

    /// Load the patient's whole ledger; fails with `PatientNotFound`
    async fn load_ledger(&self, patient_id: &str) -> LedgerResult<LedgerSnapshot>;

    /// Atomically apply an update to the patient's ledger
    ///
    /// The whole record chain commits or nothing does; a version mismatch
    /// fails with `RecordLocked`.
    async fn commit_ledger(&self, update: LedgerUpdate) -> LedgerResult<()>;
}
