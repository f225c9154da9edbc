use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use tracing::info;
use uuid::Uuid;

pub static REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Logs each request and tags it with an `x-request-id`, keeping one the client sent.
pub async fn logging_middleware(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(&REQUEST_ID)
        .cloned()
        .or_else(|| HeaderValue::from_str(&Uuid::new_v4().to_string()).ok());

    if let Some(id) = &request_id {
        request.headers_mut().insert(REQUEST_ID.clone(), id.clone());
    }

    let method = request.method().clone();
    let uri = request.uri().clone();
    let client_ip = get_client_ip(&request);
    let id = request_id
        .as_ref()
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();

    info!(
        target: "snaplink::middleware",
        request_id = %id,
        method = %method,
        uri = %uri,
        client_ip = %client_ip,
        "Incoming request"
    );

    let mut response = next.run(request).await;

    info!(
        target: "snaplink::middleware",
        request_id = %id,
        method = %method,
        uri = %uri,
        status = %response.status(),
        "Request completed"
    );

    if let Some(id) = request_id {
        response.headers_mut().insert(REQUEST_ID.clone(), id);
    }

    response
}

fn get_client_ip(request: &Request) -> String {
    if let Some(first_ip) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
    {
        return first_ip.trim().to_string();
    }

    if let Some(ip) = request.headers().get("x-real-ip").and_then(|v| v.to_str().ok()) {
        return ip.to_string();
    }

    request
        .extensions()
        .get::<axum::extract::ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
