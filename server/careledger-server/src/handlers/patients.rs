use axum::extract::{Path, State};
use axum::Json;
use chrono::NaiveDate;
use ledger_service::{Patient, RegisterPatient};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{api_success, ApiError, ApiResponse};
use crate::server::CareLedgerServer;

/// Request body for registering a patient
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePatientRequest {
    /// Opaque patient identifier
    #[schema(example = "P0042")]
    pub id: String,
    #[schema(example = "Asha Verma")]
    pub name: String,
    pub phone: Option<String>,
    pub admission_date: NaiveDate,
    /// Default fee seeded into explicitly opened billing periods
    pub monthly_fee: Decimal,
}

/// Response for a patient deletion
#[derive(Debug, Serialize, ToSchema)]
pub struct DeletePatientResponse {
    pub deleted: bool,
    pub patient_id: String,
}

/// Register a patient
#[utoipa::path(
    post,
    path = "/api/patients",
    tag = "patients",
    request_body = CreatePatientRequest,
    responses(
        (status = 200, description = "Patient registered", body = Patient),
        (status = 400, description = "Invalid patient data")
    )
)]
pub async fn create_patient(
    State(server): State<CareLedgerServer>,
    Json(req): Json<CreatePatientRequest>,
) -> Result<Json<ApiResponse<Patient>>, ApiError> {
    let patient = server
        .ledger
        .register_patient(RegisterPatient {
            id: req.id,
            name: req.name,
            phone: req.phone,
            admission_date: req.admission_date,
            monthly_fee: req.monthly_fee,
        })
        .await?;
    Ok(Json(api_success(patient)))
}

/// List registered patients
#[utoipa::path(
    get,
    path = "/api/patients",
    tag = "patients",
    responses(
        (status = 200, description = "Registered patients", body = [Patient])
    )
)]
pub async fn list_patients(
    State(server): State<CareLedgerServer>,
) -> Result<Json<ApiResponse<Vec<Patient>>>, ApiError> {
    let patients = server.ledger.list_patients().await?;
    Ok(Json(api_success(patients)))
}

/// Get a patient by identifier
#[utoipa::path(
    get,
    path = "/api/patients/{id}",
    tag = "patients",
    params(("id" = String, Path, description = "Patient identifier")),
    responses(
        (status = 200, description = "Patient", body = Patient),
        (status = 404, description = "Patient not found")
    )
)]
pub async fn get_patient(
    State(server): State<CareLedgerServer>,
    Path(patient_id): Path<String>,
) -> Result<Json<ApiResponse<Patient>>, ApiError> {
    let patient = server.ledger.get_patient(&patient_id).await?;
    Ok(Json(api_success(patient)))
}

/// Remove a patient; cascades to the ledger
#[utoipa::path(
    delete,
    path = "/api/patients/{id}",
    tag = "patients",
    params(("id" = String, Path, description = "Patient identifier")),
    responses(
        (status = 200, description = "Patient removed", body = DeletePatientResponse),
        (status = 404, description = "Patient not found")
    )
)]
pub async fn delete_patient(
    State(server): State<CareLedgerServer>,
    Path(patient_id): Path<String>,
) -> Result<Json<ApiResponse<DeletePatientResponse>>, ApiError> {
    server.ledger.remove_patient(&patient_id).await?;
    Ok(Json(api_success(DeletePatientResponse {
        deleted: true,
        patient_id,
    })))
}
