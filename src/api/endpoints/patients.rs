//! Patient registration endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::{Patient, PatientRegistration};
use crate::validation::validate_registration;

/// `POST /api/patients`: register the patient details of a signed-up user.
pub async fn register(
    State(ctx): State<ApiContext>,
    payload: Result<Json<PatientRegistration>, JsonRejection>,
) -> Result<(StatusCode, Json<Patient>), ApiError> {
    let Json(registration) = payload?;
    validate_registration(&registration)?;

    let patient = ctx.patients.register_patient(&registration)?;
    Ok((StatusCode::CREATED, Json(patient)))
}

/// `GET /api/patients/by-user/:user_id`: most recent registration of a user.
pub async fn by_user(
    State(ctx): State<ApiContext>,
    Path(user_id): Path<String>,
) -> Result<Json<Patient>, ApiError> {
    Ok(Json(ctx.patients.get_patient(&user_id)?))
}
