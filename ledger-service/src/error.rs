use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid period: {0}")]
    InvalidPeriod(String),

    #[error("Patient not found: {0}")]
    PatientNotFound(String),

    #[error("Ledger for patient {0} was modified concurrently, retry the operation")]
    RecordLocked(String),

    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

impl From<database_layer::DatabaseError> for LedgerError {
    fn from(err: database_layer::DatabaseError) -> Self {
        LedgerError::PersistenceFailure(err.to_string())
    }
}
