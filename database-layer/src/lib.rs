//! Database layer for CareLedger Engine
//!
//! Provides the shared PostgreSQL plumbing used by the ledger crates:
//! - Connection pooling with health checks
//! - Transaction management for multi-row ledger updates
//! - Common database error types

pub mod connection;
pub mod error;
pub mod transaction;

pub use connection::*;
pub use error::*;
pub use transaction::*;
