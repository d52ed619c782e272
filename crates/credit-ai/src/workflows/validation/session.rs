use chrono::{DateTime, Duration, Utc};
use std::sync::Mutex;

/// Tokens are treated as expired this long before their nominal expiry so
/// an in-flight request never crosses the boundary with a stale bearer.
const EXPIRY_MARGIN_MINUTES: i64 = 5;

#[derive(Debug, Clone)]
struct CachedCredential {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Process-lifetime cache for the upstream platform's bearer token.
///
/// One instance is owned by the service wiring and shared with the platform
/// client; last write wins under the mutex, which is acceptable because a
/// redundant refresh is idempotent. Callers pass `now` explicitly so expiry
/// behavior is verifiable under a controlled clock.
#[derive(Debug, Default)]
pub struct SessionStore {
    slot: Mutex<Option<CachedCredential>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached token while it is still inside the safety margin;
    /// `None` forces the caller down the refresh path.
    pub fn valid_token(&self, now: DateTime<Utc>) -> Option<String> {
        let guard = self.slot.lock().expect("session mutex poisoned");
        guard.as_ref().and_then(|credential| {
            let cutoff = credential.expires_at - Duration::minutes(EXPIRY_MARGIN_MINUTES);
            (now < cutoff).then(|| credential.token.clone())
        })
    }

    /// Overwrites the cached credential unconditionally.
    pub fn store(&self, token: impl Into<String>, ttl_seconds: i64, now: DateTime<Utc>) {
        let credential = CachedCredential {
            token: token.into(),
            expires_at: now + Duration::seconds(ttl_seconds),
        };
        let mut guard = self.slot.lock().expect("session mutex poisoned");
        *guard = Some(credential);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    #[test]
    fn empty_store_reports_no_token() {
        let store = SessionStore::new();
        assert!(store.valid_token(epoch()).is_none());
    }

    #[test]
    fn token_is_valid_until_margin_before_expiry() {
        let store = SessionStore::new();
        let now = epoch();
        store.store("bearer-1", 3600, now);

        // 54 minutes in: still inside the one-hour ttl minus the margin.
        let just_before = now + Duration::minutes(54);
        assert_eq!(store.valid_token(just_before), Some("bearer-1".to_string()));

        // 55 minutes in: the five-minute margin has been reached.
        let at_margin = now + Duration::minutes(55);
        assert!(store.valid_token(at_margin).is_none());
    }

    #[test]
    fn store_overwrites_previous_credential() {
        let store = SessionStore::new();
        let now = epoch();
        store.store("bearer-1", 60, now);
        store.store("bearer-2", 3600, now);
        assert_eq!(store.valid_token(now), Some("bearer-2".to_string()));
    }

    #[test]
    fn short_ttl_inside_margin_is_never_valid() {
        let store = SessionStore::new();
        let now = epoch();
        store.store("bearer-1", 120, now);
        assert!(store.valid_token(now).is_none());
    }
}
