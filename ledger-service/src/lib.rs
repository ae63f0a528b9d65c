//! Patient fee ledger for CareLedger Engine
//!
//! Provides the monthly fee ledger and payment reconciliation core:
//! - Monthly fee records per patient with carry-forward between months
//! - Append-only payment history with FIFO settlement of untargeted payments
//! - Derived fee lifecycle status (pending / partial / paid / overdue)
//! - Statement assembly for the billing screens
//! - Storage port with Postgres and in-memory implementations

pub mod error;
pub mod models;
pub mod reconcile;
pub mod service;
pub mod statement;
pub mod status;
pub mod store;

pub use error::*;
pub use models::*;
pub use reconcile::*;
pub use service::*;
pub use statement::*;
pub use status::*;
pub use store::*;
