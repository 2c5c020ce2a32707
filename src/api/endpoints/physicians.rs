use axum::Json;
use serde::Serialize;

use crate::models::physician::{roster, Physician};

#[derive(Serialize)]
pub struct PhysiciansResponse {
    pub physicians: Vec<Physician>,
}

/// `GET /api/physicians`: roster for the physician pickers.
pub async fn list() -> Json<PhysiciansResponse> {
    Json(PhysiciansResponse {
        physicians: roster(),
    })
}
