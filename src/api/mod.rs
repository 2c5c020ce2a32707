//! JSON HTTP API over the appointment and patient boundaries.
//!
//! Routes are nested under `/api/`. Every request passes through the
//! access logger; there is no authentication layer.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{serve, serve_with_shutdown, ServerError};
pub use types::ApiContext;
