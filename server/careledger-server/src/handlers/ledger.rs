use axum::extract::{Path, State};
use axum::Json;
use chrono::NaiveDate;
use ledger_service::{BillingPeriod, PaymentEvent, PaymentMode, PaymentType, RecordPayment, Statement};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::{api_success, ApiError, ApiResponse};
use crate::server::CareLedgerServer;

/// Request body for recording a payment
#[derive(Debug, Deserialize, ToSchema)]
pub struct RecordPaymentRequest {
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    pub payment_mode: PaymentMode,
    #[serde(rename = "type")]
    pub payment_type: PaymentType,
    /// Target month; omit month and year to settle the oldest dues first
    pub month: Option<u32>,
    pub year: Option<i32>,
    pub notes: Option<String>,
}

/// Request body for setting a month's fee inputs
#[derive(Debug, Deserialize, ToSchema)]
pub struct SetFeesRequest {
    pub monthly_fee: Decimal,
    pub other_fees: Decimal,
}

/// Fetch a patient's full ledger statement
#[utoipa::path(
    get,
    path = "/api/patients/{id}/statement",
    tag = "ledger",
    params(("id" = String, Path, description = "Patient identifier")),
    responses(
        (status = 200, description = "Ledger statement", body = Statement),
        (status = 404, description = "Patient not found")
    )
)]
pub async fn get_statement(
    State(server): State<CareLedgerServer>,
    Path(patient_id): Path<String>,
) -> Result<Json<ApiResponse<Statement>>, ApiError> {
    let statement = server.ledger.get_statement(&patient_id).await?;
    Ok(Json(api_success(statement)))
}

/// List a patient's payment history
#[utoipa::path(
    get,
    path = "/api/patients/{id}/payments",
    tag = "ledger",
    params(("id" = String, Path, description = "Patient identifier")),
    responses(
        (status = 200, description = "Payment history, oldest first", body = [PaymentEvent]),
        (status = 404, description = "Patient not found")
    )
)]
pub async fn list_payments(
    State(server): State<CareLedgerServer>,
    Path(patient_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<PaymentEvent>>>, ApiError> {
    let payments = server.ledger.payment_history(&patient_id).await?;
    Ok(Json(api_success(payments)))
}

/// Record a payment against a patient's ledger
#[utoipa::path(
    post,
    path = "/api/patients/{id}/payments",
    tag = "ledger",
    params(("id" = String, Path, description = "Patient identifier")),
    request_body = RecordPaymentRequest,
    responses(
        (status = 200, description = "Updated statement", body = Statement),
        (status = 400, description = "Invalid payment"),
        (status = 404, description = "Patient not found"),
        (status = 409, description = "Concurrent ledger modification, retry")
    )
)]
pub async fn record_payment(
    State(server): State<CareLedgerServer>,
    Path(patient_id): Path<String>,
    Json(req): Json<RecordPaymentRequest>,
) -> Result<Json<ApiResponse<Statement>>, ApiError> {
    let period = match (req.month, req.year) {
        (Some(month), Some(year)) => Some(BillingPeriod::new(year, month)),
        (None, None) => None,
        _ => {
            return Err(ApiError::BadRequest(
                "month and year must be provided together".to_string(),
            ))
        }
    };

    let statement = server
        .ledger
        .record_payment(RecordPayment {
            patient_id,
            period,
            amount: req.amount,
            payment_date: req.payment_date,
            payment_mode: req.payment_mode,
            payment_type: req.payment_type,
            notes: req.notes,
        })
        .await?;
    Ok(Json(api_success(statement)))
}

/// Set a month's fee inputs
#[utoipa::path(
    put,
    path = "/api/patients/{id}/records/{year}/{month}/fees",
    tag = "ledger",
    params(
        ("id" = String, Path, description = "Patient identifier"),
        ("year" = i32, Path, description = "Billing year"),
        ("month" = u32, Path, description = "Billing month (1-12)")
    ),
    request_body = SetFeesRequest,
    responses(
        (status = 200, description = "Updated statement", body = Statement),
        (status = 400, description = "Invalid fees or period"),
        (status = 404, description = "Patient not found"),
        (status = 409, description = "Concurrent ledger modification, retry")
    )
)]
pub async fn set_fees(
    State(server): State<CareLedgerServer>,
    Path((patient_id, year, month)): Path<(String, i32, u32)>,
    Json(req): Json<SetFeesRequest>,
) -> Result<Json<ApiResponse<Statement>>, ApiError> {
    let statement = server
        .ledger
        .set_monthly_fee(
            &patient_id,
            BillingPeriod::new(year, month),
            req.monthly_fee,
            req.other_fees,
        )
        .await?;
    Ok(Json(api_success(statement)))
}

/// Open a billing period, seeding the patient's default fee
#[utoipa::path(
    post,
    path = "/api/patients/{id}/records/{year}/{month}",
    tag = "ledger",
    params(
        ("id" = String, Path, description = "Patient identifier"),
        ("year" = i32, Path, description = "Billing year"),
        ("month" = u32, Path, description = "Billing month (1-12)")
    ),
    responses(
        (status = 200, description = "Updated statement", body = Statement),
        (status = 400, description = "Invalid period"),
        (status = 404, description = "Patient not found")
    )
)]
pub async fn open_period(
    State(server): State<CareLedgerServer>,
    Path((patient_id, year, month)): Path<(String, i32, u32)>,
) -> Result<Json<ApiResponse<Statement>>, ApiError> {
    let statement = server
        .ledger
        .open_period(&patient_id, BillingPeriod::new(year, month))
        .await?;
    Ok(Json(api_success(statement)))
}

/// Administrative recompute of a month and everything downstream
#[utoipa::path(
    post,
    path = "/api/patients/{id}/records/{year}/{month}/recompute",
    tag = "ledger",
    params(
        ("id" = String, Path, description = "Patient identifier"),
        ("year" = i32, Path, description = "Billing year"),
        ("month" = u32, Path, description = "Billing month (1-12)")
    ),
    responses(
        (status = 200, description = "Recomputed statement", body = Statement),
        (status = 404, description = "Patient not found")
    )
)]
pub async fn recompute_month(
    State(server): State<CareLedgerServer>,
    Path((patient_id, year, month)): Path<(String, i32, u32)>,
) -> Result<Json<ApiResponse<Statement>>, ApiError> {
    let statement = server
        .ledger
        .recompute_month(&patient_id, BillingPeriod::new(year, month))
        .await?;
    Ok(Json(api_success(statement)))
}
