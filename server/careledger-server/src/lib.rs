//! CareLedger Engine HTTP server
//!
//! Thin axum layer over the ledger service: decodes requests into command
//! service calls, encodes statements and payment history as JSON, and maps
//! the ledger error taxonomy onto HTTP statuses.

pub mod error;
pub mod handlers;
pub mod openapi;
pub mod routes;
pub mod server;

pub use error::*;
pub use server::CareLedgerServer;
