//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: backend selection (in-memory or Postgres) and the transfer engine
//! - `routes/`: HTTP routes + handlers (one file per resource)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use stockroom_infra::AppConfig;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(config: &AppConfig) -> anyhow::Result<Router> {
    let services = services::build_services(config).await?;
    Ok(build_app_with_services(config.jwt_secret.clone(), services))
}

/// Build the router over already-wired services.
pub fn build_app_with_services(jwt_secret: String, services: services::AppServices) -> Router {
    let jwt = Arc::new(stockroom_auth::Hs256JwtValidator::new(jwt_secret.into_bytes()));
    let auth_state = middleware::AuthState { jwt };

    // Protected routes: require a verified bearer token.
    let protected = routes::router()
        .layer(Extension(Arc::new(services)))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
        .layer(ServiceBuilder::new())
}
