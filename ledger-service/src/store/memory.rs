// In-memory ledger store for tests and local development
use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{MonthlyRecord, Patient, PaymentEvent};
use crate::store::{LedgerSnapshot, LedgerStore, LedgerUpdate};

#[derive(Debug, Clone)]
struct StoredLedger {
    patient: Patient,
    records: Vec<MonthlyRecord>,
    events: Vec<PaymentEvent>,
}

/// Mutex-guarded map with the same commit semantics as the Postgres store
#[derive(Default)]
pub struct MemoryLedgerStore {
    ledgers: Mutex<HashMap<String, StoredLedger>>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn insert_patient(&self, patient: &Patient) -> LedgerResult<()> {
        let mut ledgers = self.ledgers.lock().await;
        if ledgers.contains_key(&patient.id) {
            return Err(LedgerError::PersistenceFailure(format!(
                "patient {} already registered",
                patient.id
            )));
        }
        ledgers.insert(
            patient.id.clone(),
            StoredLedger {
                patient: patient.clone(),
                records: Vec::new(),
                events: Vec::new(),
            },
        );
        Ok(())
    }

    async fn fetch_patient(&self, patient_id: &str) -> LedgerResult<Option<Patient>> {
        let ledgers = self.ledgers.lock().await;
        Ok(ledgers.get(patient_id).map(|l| l.patient.clone()))
    }

    async fn list_patients(&self) -> LedgerResult<Vec<Patient>> {
        let ledgers = self.ledgers.lock().await;
        let mut patients: Vec<Patient> = ledgers.values().map(|l| l.patient.clone()).collect();
        patients.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(patients)
    }

    async fn remove_patient(&self, patient_id: &str) -> LedgerResult<bool> {
        let mut ledgers = self.ledgers.lock().await;
        Ok(ledgers.remove(patient_id).is_some())
    }

    async fn load_ledger(&self, patient_id: &str) -> LedgerResult<LedgerSnapshot> {
        let ledgers = self.ledgers.lock().await;
        let ledger = ledgers
            .get(patient_id)
            .ok_or_else(|| LedgerError::PatientNotFound(patient_id.to_string()))?;
        let mut records = ledger.records.clone();
        records.sort_by_key(MonthlyRecord::period);
        Ok(LedgerSnapshot {
            patient: ledger.patient.clone(),
            records,
            events: ledger.events.clone(),
        })
    }

    async fn commit_ledger(&self, update: LedgerUpdate) -> LedgerResult<()> {
        let mut ledgers = self.ledgers.lock().await;
        let ledger = ledgers
            .get_mut(&update.patient_id)
            .ok_or_else(|| LedgerError::PatientNotFound(update.patient_id.clone()))?;

        if ledger.patient.version != update.expected_version {
            return Err(LedgerError::RecordLocked(update.patient_id.clone()));
        }

        for record in update.records {
            match ledger
                .records
                .iter_mut()
                .find(|r| r.period() == record.period())
            {
                Some(existing) => *existing = record,
                None => ledger.records.push(record),
            }
        }
        ledger.events.extend(update.new_events);
        ledger.patient.version += 1;
        ledger.patient.updated_at = chrono::Utc::now();
        Ok(())
    }
}
