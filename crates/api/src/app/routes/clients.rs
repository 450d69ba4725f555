use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use stockroom_core::{ClientId, ProductId};

use crate::app::{dto, errors};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_client))
        .route("/:id", get(get_client).put(update_client).delete(delete_client))
        .route("/:id/stock/:product_id", get(get_client_stock))
}

pub async fn create_client(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::ClientRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::body_rejection(rejection),
    };
    match services.create_client(body.into_new()).await {
        Ok(client) => (StatusCode::CREATED, Json(dto::client_to_json(client))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_client(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let client_id: ClientId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::invalid_id("client"),
    };
    match services.get_client(client_id).await {
        Ok(Some(client)) => (StatusCode::OK, Json(dto::client_to_json(client))).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "client not found"),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn update_client(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<dto::ClientRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::body_rejection(rejection),
    };
    let client_id: ClientId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::invalid_id("client"),
    };
    match services.update_client(client_id, body.into_update()).await {
        Ok(client) => (StatusCode::OK, Json(dto::client_to_json(client))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn delete_client(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let client_id: ClientId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::invalid_id("client"),
    };
    match services.delete_client(client_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// Committed ledger row for one (client, product) pair.
pub async fn get_client_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Path((id, product_id)): Path<(String, String)>,
) -> axum::response::Response {
    let client_id: ClientId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::invalid_id("client"),
    };
    let product_id: ProductId = match product_id.parse() {
        Ok(v) => v,
        Err(_) => return errors::invalid_id("product"),
    };
    match services.get_client_stock(client_id, product_id).await {
        Ok(Some(stock)) => (StatusCode::OK, Json(dto::client_stock_to_json(stock))).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "no stock held"),
        Err(e) => errors::store_error_to_response(e),
    }
}
