use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};

use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> impl IntoResponse {
    Json(serde_json::json!({
        "principal_id": principal.principal_id().to_string(),
        "backend": services.backend(),
    }))
}
