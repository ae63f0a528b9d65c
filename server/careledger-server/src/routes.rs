pub mod paths {
    pub mod health {
        pub const HEALTH: &str = "/health";
    }

    pub mod patients {
        pub const PATIENTS: &str = "/api/patients";
        pub const PATIENT_BY_ID: &str = "/api/patients/:id";
    }

    pub mod ledger {
        pub const STATEMENT: &str = "/api/patients/:id/statement";
        pub const PAYMENTS: &str = "/api/patients/:id/payments";
        pub const RECORD: &str = "/api/patients/:id/records/:year/:month";
        pub const RECORD_FEES: &str = "/api/patients/:id/records/:year/:month/fees";
        pub const RECORD_RECOMPUTE: &str = "/api/patients/:id/records/:year/:month/recompute";
    }

    pub mod docs {
        pub const OPENAPI: &str = "/api/openapi.json";
    }
}

use axum::http::{header, HeaderValue, Method};
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::{
    handlers::{health, ledger, patients},
    openapi,
    server::CareLedgerServer,
};

/// Create health check routes
pub fn health_routes() -> Router<CareLedgerServer> {
    Router::new().route(paths::health::HEALTH, get(health::health_check))
}

/// Create patient registry routes
pub fn patient_routes() -> Router<CareLedgerServer> {
    Router::new()
        .route(paths::patients::PATIENTS, get(patients::list_patients))
        .route(paths::patients::PATIENTS, post(patients::create_patient))
        .route(paths::patients::PATIENT_BY_ID, get(patients::get_patient))
        .route(paths::patients::PATIENT_BY_ID, delete(patients::delete_patient))
}

/// Create fee ledger routes
pub fn ledger_routes() -> Router<CareLedgerServer> {
    Router::new()
        .route(paths::ledger::STATEMENT, get(ledger::get_statement))
        .route(paths::ledger::PAYMENTS, get(ledger::list_payments))
        .route(paths::ledger::PAYMENTS, post(ledger::record_payment))
        .route(paths::ledger::RECORD, post(ledger::open_period))
        .route(paths::ledger::RECORD_FEES, put(ledger::set_fees))
        .route(paths::ledger::RECORD_RECOMPUTE, post(ledger::recompute_month))
}

/// Assemble the full application router with CORS and tracing layers
pub fn create_router(server: CareLedgerServer) -> Router {
    let origins: Vec<HeaderValue> = server
        .config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .allow_credentials(true);

    Router::new()
        .merge(health_routes())
        .merge(patient_routes())
        .merge(ledger_routes())
        .route(paths::docs::OPENAPI, get(openapi::openapi_json))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(server)
}
