use axum::{Router, routing::get};

pub mod clients;
pub mod products;
pub mod system;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/products", products::router())
        .nest("/clients", clients::router())
}
