//! API router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! Routes are nested under `/api/`; unknown paths get a JSON 404.

use axum::routing::get;
use axum::Router;

use crate::api::endpoints;
use crate::api::error::ApiError;
use crate::api::middleware;
use crate::api::types::ApiContext;

/// Build the API router over a shared context.
///
/// NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
pub fn api_router(ctx: ApiContext) -> Router {
    let routes = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/physicians", get(endpoints::physicians::list))
        .route("/users", axum::routing::post(endpoints::users::create))
        .route("/users/:id", get(endpoints::users::detail))
        .route("/patients", axum::routing::post(endpoints::patients::register))
        .route(
            "/patients/by-user/:user_id",
            get(endpoints::patients::by_user),
        )
        .route(
            "/appointments",
            get(endpoints::appointments::summary).post(endpoints::appointments::create),
        )
        .route(
            "/appointments/:id",
            get(endpoints::appointments::detail).patch(endpoints::appointments::update),
        )
        .with_state(ctx);

    Router::new()
        .nest("/api", routes)
        .fallback(not_found)
        .layer(axum::middleware::from_fn(middleware::access::log_request))
}

async fn not_found() -> ApiError {
    ApiError::NotFound("No such route".into())
}
