use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use stockroom_infra::{StoreError, TransferError};

pub fn transfer_error_to_response(err: TransferError) -> axum::response::Response {
    let message = err.to_string();
    match err {
        TransferError::InvalidQuantity(_) => {
            json_error(StatusCode::BAD_REQUEST, "invalid_quantity", message)
        }
        TransferError::ProductNotFound(_) => {
            json_error(StatusCode::NOT_FOUND, "product_not_found", message)
        }
        TransferError::ClientNotFound(_) => {
            json_error(StatusCode::NOT_FOUND, "client_not_found", message)
        }
        TransferError::InsufficientStock { .. } => {
            json_error(StatusCode::CONFLICT, "insufficient_stock", message)
        }
        TransferError::TransactionFailure(_) => {
            json_error(StatusCode::SERVICE_UNAVAILABLE, "transaction_failure", message)
        }
    }
}

pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    match err {
        StoreError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        StoreError::Invalid(e) => json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string()),
        StoreError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        StoreError::Constraint(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "constraint_violation", msg)
        }
        StoreError::Timeout(msg) => json_error(StatusCode::SERVICE_UNAVAILABLE, "timeout", msg),
        StoreError::LockNotHeld(msg) | StoreError::Backend(msg) => {
            tracing::error!(error = %msg, "store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", msg)
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Malformed or mistyped request bodies get the same error envelope as
/// everything else.
pub fn body_rejection(rejection: JsonRejection) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_body", rejection.body_text())
}

pub fn invalid_quantity() -> axum::response::Response {
    json_error(
        StatusCode::BAD_REQUEST,
        "invalid_quantity",
        "quantity must be a positive integer",
    )
}

pub fn invalid_id(what: &str) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_id", format!("invalid {what} id"))
}

#[cfg(test)]
mod tests {
    use stockroom_core::{ClientId, DomainError, ProductId};

    use super::*;

    #[test]
    fn transfer_outcomes_map_to_distinct_statuses() {
        let cases = [
            (TransferError::InvalidQuantity(0), StatusCode::BAD_REQUEST),
            (TransferError::ProductNotFound(ProductId::new()), StatusCode::NOT_FOUND),
            (TransferError::ClientNotFound(ClientId::new()), StatusCode::NOT_FOUND),
            (
                TransferError::InsufficientStock { available: 1, requested: 2 },
                StatusCode::CONFLICT,
            ),
            (
                TransferError::TransactionFailure(StoreError::Timeout("lock".into())),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(transfer_error_to_response(err).status(), status);
        }
    }

    #[test]
    fn store_validation_is_a_bad_request() {
        let resp = store_error_to_response(StoreError::Invalid(DomainError::validation("name")));
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            store_error_to_response(StoreError::Conflict("held".into())).status(),
            StatusCode::CONFLICT
        );
    }
}
