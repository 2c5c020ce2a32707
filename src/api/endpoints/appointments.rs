//! Appointment endpoints.
//!
//! - `GET /api/appointments`: admin summary (counts plus newest-first listing)
//! - `POST /api/appointments`: book a new appointment
//! - `GET /api/appointments/:id`: single appointment
//! - `PATCH /api/appointments/:id`: schedule or cancel

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::appointment::AppointmentSummary;
use crate::models::{Appointment, AppointmentUpdate, NewAppointment};
use crate::validation::{validate_new_appointment, validate_update};

pub async fn summary(State(ctx): State<ApiContext>) -> Result<Json<AppointmentSummary>, ApiError> {
    Ok(Json(ctx.appointments.fetch_summary()?))
}

pub async fn create(
    State(ctx): State<ApiContext>,
    payload: Result<Json<NewAppointment>, JsonRejection>,
) -> Result<(StatusCode, Json<Appointment>), ApiError> {
    let Json(new) = payload?;
    validate_new_appointment(&new)?;

    let appointment = ctx.appointments.create_appointment(&new)?;
    Ok((StatusCode::CREATED, Json(appointment)))
}

pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<Appointment>, ApiError> {
    Ok(Json(ctx.appointments.get_appointment(&id)?))
}

/// Rules applied depend on the target status.
pub async fn update(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    payload: Result<Json<AppointmentUpdate>, JsonRejection>,
) -> Result<Json<Appointment>, ApiError> {
    let Json(update) = payload?;
    validate_update(&update)?;

    Ok(Json(ctx.appointments.update_appointment(&id, &update)?))
}
