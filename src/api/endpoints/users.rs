//! Sign-up endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::{NewUser, User};
use crate::validation::validate_new_user;

/// `POST /api/users`: create a user, or return the one already holding the email.
pub async fn create(
    State(ctx): State<ApiContext>,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> Result<Json<User>, ApiError> {
    let Json(user) = payload?;
    validate_new_user(&user)?;

    let created = ctx.patients.create_user(&user)?;
    Ok(Json(created))
}

/// `GET /api/users/:id`
pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(ctx.patients.get_user(&id)?))
}
