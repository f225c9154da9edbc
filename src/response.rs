use crate::store::{ClickEvent, LinkRecord};
use crate::shortener::ShortLink;
use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortenResponse {
    pub short_url: String,
    pub short_code: String,
    pub expires_at: i64,
}

impl From<ShortLink> for ShortenResponse {
    fn from(link: ShortLink) -> Self {
        Self {
            short_url: link.short_url,
            short_code: link.short_code,
            expires_at: link.expires_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkStatsResponse {
    pub code: String,
    pub original_url: String,
    pub short_url: String,
    pub created_at: i64,
    pub expires_at: i64,
    pub visits: u64,
    pub expired: bool,
    pub clicks: Vec<ClickEvent>,
}

impl LinkStatsResponse {
    pub fn new(record: LinkRecord, short_url: String, expired: bool) -> Self {
        Self {
            code: record.code,
            original_url: record.original_url,
            short_url,
            created_at: record.created_at,
            expires_at: record.expires_at,
            visits: record.visits,
            expired,
            clicks: record.clicks,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub links: usize,
}

impl HealthResponse {
    pub fn healthy(started_at: SystemTime, links: usize) -> Self {
        let now = SystemTime::now();
        Self {
            status: "healthy".to_string(),
            timestamp: now.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: now.duration_since(started_at).unwrap_or_default().as_secs(),
            links,
        }
    }
}
