use crate::clock::Clock;
use crate::error::LinkResult;
use crate::store::{ClickEvent, LinkStore, Visit};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Redirect(String),
    NotFound,
    /// The link had expired and has now been evicted.
    Expired,
}

/// Turns short codes back into destinations, counting visits on the way.
#[derive(Clone)]
pub struct RedirectResolver {
    store: Arc<dyn LinkStore>,
    clock: Arc<dyn Clock>,
}

impl RedirectResolver {
    pub fn new(store: Arc<dyn LinkStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn resolve(&self, code: &str, referrer: Option<&str>) -> LinkResult<Resolution> {
        let now = self.clock.now_millis();

        let resolution = match self.store.visit(code, now, ClickEvent::new(now, referrer))? {
            Visit::Missing => {
                tracing::debug!(code = %code, "Short code not found");
                Resolution::NotFound
            }
            Visit::Expired(record) => {
                tracing::info!(
                    code = %code,
                    expires_at = record.expires_at,
                    visits = record.visits,
                    "Evicted expired link"
                );
                Resolution::Expired
            }
            Visit::Followed(record) => {
                tracing::debug!(code = %code, visits = record.visits, "Redirecting");
                Resolution::Redirect(record.original_url)
            }
        };

        Ok(resolution)
    }
}
