//! Universal chain stages: panic recovery, request logging, and
//! security headers. These run for every route, including the health
//! check and static assets.

use std::any::Any;
use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request},
    http::{HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{error, info};

use crate::render;

/// Harden every response before it leaves the server.
pub async fn security_headers(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;

    let headers = response.headers_mut();
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        header::X_XSS_PROTECTION,
        HeaderValue::from_static("1; mode=block"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("deny"));

    response
}

/// Record method, URL, and remote address for every request, whatever
/// its outcome. The entry line is written before delegating so a
/// request that panics downstream is still on record.
pub async fn log_requests(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let remote = client_ip(&req).unwrap_or_else(|| "-".to_string());

    info!(%method, %uri, remote = %remote, "request");

    let response = next.run(req).await;

    info!(
        %method,
        %uri,
        remote = %remote,
        status = response.status().as_u16(),
        "response"
    );
    response
}

/// Client address from X-Forwarded-For (reverse proxy) or the connection.
fn client_ip(req: &Request) -> Option<String> {
    if let Some(forwarded_for) = req.headers().get("x-forwarded-for") {
        if let Ok(value) = forwarded_for.to_str() {
            if let Some(first_ip) = value.split(',').next() {
                let ip = first_ip.trim();
                if !ip.is_empty() {
                    return Some(ip.to_string());
                }
            }
        }
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
}

/// Convert an escaped panic from any inner stage into a generic server
/// error. The connection is closed rather than reused, since the
/// response stream state after a panic is unknown.
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "non-string panic payload"
    };
    error!(panic = %detail, "request handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        [(header::CONNECTION, HeaderValue::from_static("close"))],
        render::error_page("Internal Server Error"),
    )
        .into_response()
}
