//! OpenAPI documentation for the CareLedger API

use axum::Json;
use utoipa::OpenApi;

use crate::error::ErrorDetail;
use crate::handlers::{health, ledger, patients};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "CareLedger Engine API",
        description = "Patient fee ledger and payment reconciliation API"
    ),
    paths(
        health::health_check,
        patients::create_patient,
        patients::list_patients,
        patients::get_patient,
        patients::delete_patient,
        ledger::get_statement,
        ledger::list_payments,
        ledger::record_payment,
        ledger::set_fees,
        ledger::open_period,
        ledger::recompute_month,
    ),
    components(schemas(
        ErrorDetail,
        health::HealthResponse,
        patients::CreatePatientRequest,
        patients::DeletePatientResponse,
        ledger::RecordPaymentRequest,
        ledger::SetFeesRequest,
        ledger_service::Patient,
        ledger_service::MonthlyRecord,
        ledger_service::PaymentEvent,
        ledger_service::PaymentMode,
        ledger_service::PaymentType,
        ledger_service::PaymentStatus,
        ledger_service::BillingPeriod,
        ledger_service::Statement,
        ledger_service::StatementMonth,
        ledger_service::StatementPayment,
        ledger_service::StatementSummary,
    )),
    tags(
        (name = "health", description = "Service health"),
        (name = "patients", description = "Patient registry"),
        (name = "ledger", description = "Fee ledger and payments")
    )
)]
pub struct ApiDoc;

/// Serve the OpenAPI document
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
