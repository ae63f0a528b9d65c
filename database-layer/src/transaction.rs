// Transaction management for multi-row ledger updates
use crate::connection::DatabasePool;
use crate::error::{DatabaseError, DatabaseResult};
use sqlx::{Postgres, Transaction};
use tracing::debug;

/// Transaction manager over the shared pool
///
/// Ledger mutations span several rows (the edited month plus every month the
/// carry-forward propagates into); they must commit or roll back as a unit.
pub struct TransactionManager {
    pool: DatabasePool,
}

impl TransactionManager {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// Begin a new transaction
    pub async fn begin(&self) -> DatabaseResult<Transaction<'_, Postgres>> {
        debug!("Beginning transaction");

        let tx = self
            .pool
            .pool()
            .begin()
            .await
            .map_err(|e| DatabaseError::QueryFailed(format!("Failed to begin transaction: {}", e)))?;

        Ok(tx)
    }
}
