use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use stockroom_core::{ClientId, ProductId};
use stockroom_inventory::StockTransfer;

use crate::app::{dto, errors};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_product))
        .route("/:id", get(get_product).put(update_product).delete(delete_product))
        .route("/:id/transfer", post(transfer_stock))
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::ProductRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::body_rejection(rejection),
    };
    match services.create_product(body.into_new()).await {
        Ok(product) => (StatusCode::CREATED, Json(dto::product_to_json(product))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let product_id: ProductId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::invalid_id("product"),
    };
    match services.get_product(product_id).await {
        Ok(Some(product)) => (StatusCode::OK, Json(dto::product_to_json(product))).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "product not found"),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<dto::ProductRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::body_rejection(rejection),
    };
    let product_id: ProductId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::invalid_id("product"),
    };
    match services.update_product(product_id, body.into_update()).await {
        Ok(product) => (StatusCode::OK, Json(dto::product_to_json(product))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let product_id: ProductId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::invalid_id("product"),
    };
    match services.delete_product(product_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// Move stock from the product into a client's ledger.
pub async fn transfer_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<dto::TransferRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::body_rejection(rejection),
    };
    let product_id: ProductId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::invalid_id("product"),
    };
    let client_id: ClientId = match body.client_id.parse() {
        Ok(v) => v,
        Err(_) => return errors::invalid_id("client"),
    };

    let Some(quantity) = body.integer_quantity() else {
        return errors::invalid_quantity();
    };

    let request = StockTransfer::new(product_id, client_id, quantity);
    match services.transfer(request).await {
        Ok(receipt) => (StatusCode::OK, Json(dto::transfer_to_json(receipt))).into_response(),
        Err(e) => errors::transfer_error_to_response(e),
    }
}
