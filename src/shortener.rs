use crate::clock::Clock;
use crate::code;
use crate::error::{LinkError, LinkResult};
use crate::store::{LinkRecord, LinkStore};
use serde::Serialize;
use std::sync::Arc;
use validator::ValidateUrl;

pub const DEFAULT_VALIDITY_MINUTES: i64 = 30;
const MILLIS_PER_MINUTE: i64 = 60_000;

/// A freshly created short link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortLink {
    pub short_code: String,
    pub short_url: String,
    pub expires_at: i64,
}

/// Validates creation requests and reserves codes in the link store.
#[derive(Clone)]
pub struct ShorteningService {
    store: Arc<dyn LinkStore>,
    clock: Arc<dyn Clock>,
    base_url: String,
    default_validity_minutes: i64,
}

impl ShorteningService {
    pub fn new(store: Arc<dyn LinkStore>, clock: Arc<dyn Clock>, base_url: &str) -> Self {
        Self {
            store,
            clock,
            base_url: base_url.trim_end_matches('/').to_string(),
            default_validity_minutes: DEFAULT_VALIDITY_MINUTES,
        }
    }

    pub fn with_default_validity(mut self, minutes: i64) -> Self {
        if minutes > 0 {
            self.default_validity_minutes = minutes;
        }
        self
    }

    pub fn short_url(&self, code: &str) -> String {
        format!("{}/{}", self.base_url, code)
    }

    /// Creates a short link for `url`, valid for `validity_minutes`.
    ///
    /// A missing or non-positive validity falls back to the service default.
    /// A supplied `code` is used as-is; a clash with a live link is reported
    /// as [`LinkError::CodeConflict`] rather than retried.
    pub fn shorten(
        &self,
        url: Option<&str>,
        validity_minutes: Option<i64>,
        code: Option<&str>,
    ) -> LinkResult<ShortLink> {
        let url = url.map(str::trim).filter(|u| !u.is_empty()).ok_or(LinkError::MissingUrl)?;
        // The URL parser quietly drops tabs and newlines; the stored string must
        // survive as a Location header verbatim.
        if url.chars().any(char::is_control) || !url.validate_url() {
            return Err(LinkError::InvalidUrl(url.to_string()));
        }

        let code = match code.filter(|c| !c.is_empty()) {
            Some(requested) => {
                code::validate_custom_code(requested)?;
                requested.to_string()
            }
            None => code::generate(),
        };

        let validity = validity_minutes
            .filter(|minutes| *minutes > 0)
            .unwrap_or(self.default_validity_minutes);

        let now = self.clock.now_millis();
        let expires_at = now.saturating_add(validity.saturating_mul(MILLIS_PER_MINUTE));

        let record = LinkRecord::new(code.clone(), url.to_string(), now, expires_at);
        self.store.put(record, now)?;

        tracing::info!(code = %code, url = %url, expires_at, "Created short link");

        Ok(ShortLink {
            short_url: self.short_url(&code),
            short_code: code,
            expires_at,
        })
    }

    /// Returns the stored record without counting a visit.
    pub fn link(&self, code: &str) -> LinkResult<LinkRecord> {
        self.store
            .get(code)?
            .ok_or_else(|| LinkError::NotFound(code.to_string()))
    }

    /// Every stored link, newest first.
    pub fn links(&self) -> LinkResult<Vec<LinkRecord>> {
        let mut records = self.store.list()?;
        records.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.code.cmp(&b.code))
        });
        Ok(records)
    }

    pub fn remove(&self, code: &str) -> LinkResult<()> {
        if self.store.delete(code)? {
            tracing::info!(code = %code, "Deleted short link");
            Ok(())
        } else {
            Err(LinkError::NotFound(code.to_string()))
        }
    }

    pub fn is_expired(&self, record: &LinkRecord) -> bool {
        record.is_expired_at(self.clock.now_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::MemoryStore;
    use tokio_test::{assert_err, assert_ok};

    const T0: i64 = 1_700_000_000_000;

    fn service() -> (ShorteningService, Arc<MemoryStore>, ManualClock) {
        let store = Arc::new(MemoryStore::default());
        let clock = ManualClock::new(T0);
        let service = ShorteningService::new(
            store.clone(),
            Arc::new(clock.clone()),
            "http://localhost:5000/",
        );
        (service, store, clock)
    }

    #[test]
    fn test_shorten_with_generated_code() {
        let (service, store, _) = service();

        let link = assert_ok!(service.shorten(Some("https://example.com"), Some(30), None));
        assert_eq!(link.short_code.len(), code::CODE_LENGTH);
        assert!(link.short_code.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(link.short_url, format!("http://localhost:5000/{}", link.short_code));
        assert_eq!(link.expires_at, T0 + 1_800_000);

        let stored = store.get(&link.short_code).unwrap().unwrap();
        assert_eq!(stored.original_url, "https://example.com");
        assert_eq!(stored.created_at, T0);
        assert_eq!(stored.visits, 0);
    }

    #[test]
    fn test_validity_defaults() {
        let (service, _, _) = service();

        for validity in [None, Some(0), Some(-5)] {
            let link = service.shorten(Some("https://example.com"), validity, None).unwrap();
            assert_eq!(link.expires_at, T0 + 30 * 60_000);
        }

        let link = service.shorten(Some("https://example.com"), Some(1), None).unwrap();
        assert_eq!(link.expires_at, T0 + 60_000);
    }

    #[test]
    fn test_configured_default_validity() {
        let (service, _, _) = service();
        let service = service.with_default_validity(90);

        let link = service.shorten(Some("https://example.com"), None, None).unwrap();
        assert_eq!(link.expires_at, T0 + 90 * 60_000);
    }

    #[test]
    fn test_huge_validity_saturates() {
        let (service, _, _) = service();

        let link = service
            .shorten(Some("https://example.com"), Some(i64::MAX), None)
            .unwrap();
        assert_eq!(link.expires_at, i64::MAX);
    }

    #[test]
    fn test_missing_url_leaves_store_untouched() {
        let (service, store, _) = service();

        for url in [None, Some(""), Some("   ")] {
            assert_eq!(
                assert_err!(service.shorten(url, Some(30), Some("abc123"))),
                LinkError::MissingUrl
            );
        }
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_invalid_url_rejected() {
        let (service, store, _) = service();

        let err = assert_err!(service.shorten(Some("not a url"), None, None));
        assert!(matches!(err, LinkError::InvalidUrl(_)));
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_control_characters_rejected() {
        let (service, store, _) = service();

        for url in ["https://example.com/a\nb", "https://example.com/\tx", "https://exa\rmple.com"] {
            let err = assert_err!(service.shorten(Some(url), None, Some("nl")));
            assert_eq!(err, LinkError::InvalidUrl(url.to_string()));
        }
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_links_newest_first() {
        let (service, _, clock) = service();

        service.shorten(Some("https://one.com"), None, Some("one")).unwrap();
        clock.advance_millis(10);
        service.shorten(Some("https://two.com"), None, Some("two")).unwrap();
        clock.advance_millis(10);
        service.shorten(Some("https://three.com"), None, Some("three")).unwrap();

        let codes: Vec<String> = service.links().unwrap().into_iter().map(|r| r.code).collect();
        assert_eq!(codes, vec!["three", "two", "one"]);
    }

    #[test]
    fn test_custom_code_used_verbatim() {
        let (service, _, _) = service();

        let link = service
            .shorten(Some("https://example.com"), None, Some("MyLink42"))
            .unwrap();
        assert_eq!(link.short_code, "MyLink42");
        assert_eq!(link.short_url, "http://localhost:5000/MyLink42");
    }

    #[test]
    fn test_empty_custom_code_generates_one() {
        let (service, _, _) = service();

        let link = service.shorten(Some("https://example.com"), None, Some("")).unwrap();
        assert_eq!(link.short_code.len(), code::CODE_LENGTH);
    }

    #[test]
    fn test_invalid_custom_code() {
        let (service, store, _) = service();

        let err = assert_err!(service.shorten(Some("https://example.com"), None, Some("no/slash")));
        assert_eq!(err, LinkError::InvalidCode("no/slash".to_string()));
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_conflict_keeps_first_record() {
        let (service, store, clock) = service();

        service.shorten(Some("https://first.com"), Some(10), Some("dup")).unwrap();
        clock.advance_minutes(5);

        let err = assert_err!(service.shorten(Some("https://second.com"), Some(60), Some("dup")));
        assert_eq!(err, LinkError::CodeConflict("dup".to_string()));

        let stored = store.get("dup").unwrap().unwrap();
        assert_eq!(stored.original_url, "https://first.com");
        assert_eq!(stored.expires_at, T0 + 10 * 60_000);
    }

    #[test]
    fn test_expired_code_can_be_reclaimed() {
        let (service, store, clock) = service();

        service.shorten(Some("https://first.com"), Some(1), Some("dup")).unwrap();
        clock.advance_minutes(2);

        assert_ok!(service.shorten(Some("https://second.com"), Some(1), Some("dup")));
        assert_eq!(store.get("dup").unwrap().unwrap().original_url, "https://second.com");
    }

    #[test]
    fn test_link_and_remove() {
        let (service, _, _) = service();
        service.shorten(Some("https://example.com"), None, Some("abc")).unwrap();

        assert_eq!(service.link("abc").unwrap().original_url, "https://example.com");
        assert_ok!(service.remove("abc"));
        assert_eq!(
            assert_err!(service.remove("abc")),
            LinkError::NotFound("abc".to_string())
        );
        assert_err!(service.link("abc"));
    }
}
