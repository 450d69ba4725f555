use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use stockroom_auth::JwtValidator;

use crate::context::PrincipalContext;

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
}

pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = extract_bearer(req.headers())?;

    let claims = state.jwt.validate(token, Utc::now()).map_err(|e| {
        tracing::debug!(error = %e, "bearer token rejected");
        StatusCode::UNAUTHORIZED
    })?;

    req.extensions_mut().insert(PrincipalContext::new(claims.sub));

    Ok(next.run(req).await)
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, StatusCode> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let header = header.to_str().map_err(|_| StatusCode::UNAUTHORIZED)?;

    let header = header
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token = header.trim();
    if token.is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(token)
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderValue, header::AUTHORIZATION};

    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        h
    }

    #[test]
    fn bearer_token_is_extracted() {
        assert_eq!(extract_bearer(&headers("Bearer abc.def")), Ok("abc.def"));
    }

    #[test]
    fn missing_or_malformed_header_is_unauthorized() {
        assert_eq!(extract_bearer(&HeaderMap::new()), Err(StatusCode::UNAUTHORIZED));
        assert_eq!(extract_bearer(&headers("Basic abc")), Err(StatusCode::UNAUTHORIZED));
        assert_eq!(extract_bearer(&headers("Bearer   ")), Err(StatusCode::UNAUTHORIZED));
    }
}
