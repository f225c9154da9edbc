use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::SystemTime;
use validator::Validate;

use crate::error::{LinkError, LinkResult};
use crate::remote_log::{LogLevel, RemoteLogger};
use crate::resolver::{RedirectResolver, Resolution};
use crate::response::{HealthResponse, LinkStatsResponse, ShortenResponse};
use crate::shortener::ShorteningService;
use crate::store::LinkStore;

/// Shared application state
pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub store: Arc<dyn LinkStore>,
    pub shortener: ShorteningService,
    pub resolver: RedirectResolver,
    pub remote_log: RemoteLogger,
    pub started_at: SystemTime,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct CreateShortUrlRequest {
    #[validate(length(max = 2048, message = "URL must be at most 2048 characters"))]
    pub url: Option<String>,
    /// Lifetime in minutes
    pub visibility: Option<i64>,
    pub code: Option<String>,
}

/// Create a short URL
pub async fn create_short_url(
    State(state): State<SharedState>,
    payload: Result<Json<CreateShortUrlRequest>, JsonRejection>,
) -> LinkResult<impl IntoResponse> {
    let Json(payload) = payload?;
    payload.validate()?;

    let result = state.shortener.shorten(
        payload.url.as_deref(),
        payload.visibility,
        payload.code.as_deref(),
    );

    match &result {
        Ok(link) => state.remote_log.log(
            LogLevel::Info,
            "handler",
            format!("Created short link {}", link.short_code),
        ),
        Err(LinkError::CodeConflict(code)) => {
            tracing::warn!(code = %code, "Rejected duplicate short code");
            state.remote_log.log(
                LogLevel::Warn,
                "handler",
                format!("Short code {} already in use", code),
            );
        }
        Err(e) => state.remote_log.log(LogLevel::Warn, "handler", e.to_string()),
    }

    Ok(Json(ShortenResponse::from(result?)))
}

/// Redirect a short code to its destination
pub async fn redirect(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    headers: HeaderMap,
) -> LinkResult<impl IntoResponse> {
    let referrer = headers
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok());

    match state.resolver.resolve(&code, referrer)? {
        Resolution::Redirect(url) => Ok((StatusCode::FOUND, [(header::LOCATION, url)])),
        Resolution::NotFound => Err(LinkError::NotFound(code)),
        Resolution::Expired => {
            state.remote_log.log(
                LogLevel::Info,
                "service",
                format!("Evicted expired link {}", code),
            );
            Err(LinkError::Expired(code))
        }
    }
}

/// Stats for every stored link, newest first.
pub async fn list_links(State(state): State<SharedState>) -> LinkResult<impl IntoResponse> {
    let links: Vec<LinkStatsResponse> = state
        .shortener
        .links()?
        .into_iter()
        .map(|record| {
            let expired = state.shortener.is_expired(&record);
            let short_url = state.shortener.short_url(&record.code);
            LinkStatsResponse::new(record, short_url, expired)
        })
        .collect();

    Ok(Json(links))
}

/// Stats for a short code. Does not count as a visit.
pub async fn get_link(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> LinkResult<impl IntoResponse> {
    let record = state.shortener.link(&code)?;
    let expired = state.shortener.is_expired(&record);
    let short_url = state.shortener.short_url(&record.code);

    Ok(Json(LinkStatsResponse::new(record, short_url, expired)))
}

pub async fn delete_link(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> LinkResult<impl IntoResponse> {
    state.shortener.remove(&code)?;
    state
        .remote_log
        .log(LogLevel::Info, "handler", format!("Deleted short link {}", code));

    Ok(StatusCode::NO_CONTENT)
}

/// Health check endpoint
pub async fn health_check(State(state): State<SharedState>) -> LinkResult<impl IntoResponse> {
    let links = state.store.len()?;
    Ok(Json(HealthResponse::healthy(state.started_at, links)))
}
