use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use backoffice_authz::{JwtValidator, RequestMeta};

use crate::context::{CallerContext, TenantContext};

const FORWARDED_FOR: &str = "x-forwarded-for";
const REAL_IP: &str = "x-real-ip";
const IP_LOCATION: &str = "x-ip-location";

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
        tracing::debug!(error = %e, "rejecting bearer token");
        StatusCode::UNAUTHORIZED
    })?;

    let meta = request_meta(req.headers());
    req.extensions_mut()
        .insert(TenantContext::new(claims.tenant_id));
    req.extensions_mut().insert(CallerContext::new(claims.sub));
    req.extensions_mut().insert(meta);

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

/// Client address and location as reported by the fronting proxy.
pub fn request_meta(headers: &HeaderMap) -> RequestMeta {
    let ip = header(headers, FORWARDED_FOR)
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .or_else(|| header(headers, REAL_IP))
        .map(str::to_string);

    RequestMeta {
        ip,
        ip_location: header(headers, IP_LOCATION).map(str::to_string),
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
