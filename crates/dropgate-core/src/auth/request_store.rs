use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};

use super::cookie::{credential_cookies, parse_cookie_header, SetCookie};
use super::credentials::{CredentialStore, SessionCredentials, ACCESS_COOKIE, REFRESH_COOKIE};

/// Server-side credential store for a single request/response pair.
///
/// Reads come from the incoming `Cookie` header. Writes never touch the
/// request; they are queued as `Set-Cookie` entries for whatever response the
/// caller finally produces, and shadow the incoming values for the rest of
/// the evaluation.
#[derive(Default)]
pub struct RequestCookieStore {
    incoming: HashMap<String, String>,
    secure: bool,
    pending: Mutex<Vec<SetCookie>>,
}

impl RequestCookieStore {
    /// Build from a raw `Cookie` header. `secure` marks an HTTPS connection.
    pub fn from_cookie_header(header: Option<&str>, secure: bool) -> Self {
        let pairs = header.map(parse_cookie_header).unwrap_or_default();
        Self::from_pairs(pairs, secure)
    }

    pub fn from_pairs<I, K, V>(pairs: I, secure: bool) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut incoming = HashMap::new();
        for (name, value) in pairs {
            // First occurrence wins, like a browser-ordered Cookie header.
            incoming.entry(name.into()).or_insert_with(|| value.into());
        }
        Self {
            incoming,
            secure,
            pending: Mutex::new(Vec::new()),
        }
    }

    pub fn is_secure(&self) -> bool {
        self.secure
    }

    /// Current value of a cookie, taking this evaluation's writes into account.
    pub fn cookie(&self, name: &str) -> Option<String> {
        let pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(set) = pending.iter().rev().find(|c| c.name == name) {
            return (!set.is_removal()).then(|| set.value.clone());
        }
        self.incoming.get(name).filter(|v| !v.is_empty()).cloned()
    }

    /// Queue a cookie for the response, replacing any earlier write of the same name.
    pub fn set_cookie(&self, cookie: SetCookie) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending.retain(|c| c.name != cookie.name);
        pending.push(cookie);
    }

    /// Cookies written during this evaluation, in write order.
    pub fn pending_cookies(&self) -> Vec<SetCookie> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl fmt::Debug for RequestCookieStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.incoming.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("RequestCookieStore")
            .field("incoming", &names)
            .field("secure", &self.secure)
            .field("pending", &self.pending_cookies())
            .finish()
    }
}

impl CredentialStore for RequestCookieStore {
    fn access_token(&self) -> Option<String> {
        self.cookie(ACCESS_COOKIE)
    }

    fn refresh_token(&self) -> Option<String> {
        self.cookie(REFRESH_COOKIE)
    }

    fn store(&self, credentials: &SessionCredentials) {
        for cookie in credential_cookies(credentials, self.secure) {
            self.set_cookie(cookie);
        }
    }

    fn clear(&self) {
        self.set_cookie(SetCookie::removal(ACCESS_COOKIE).secure(self.secure));
        self.set_cookie(SetCookie::removal(REFRESH_COOKIE).secure(self.secure));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_incoming_cookies() {
        let store = RequestCookieStore::from_cookie_header(
            Some("accessToken=acc; refreshToken=ref; theme=dark"),
            false,
        );
        assert_eq!(store.access_token().as_deref(), Some("acc"));
        assert_eq!(store.refresh_token().as_deref(), Some("ref"));
        assert!(store.pending_cookies().is_empty());
    }

    #[test]
    fn test_missing_header_has_no_credentials() {
        let store = RequestCookieStore::from_cookie_header(None, false);
        assert_eq!(store.access_token(), None);
        assert_eq!(store.refresh_token(), None);
    }

    #[test]
    fn test_empty_cookie_value_counts_as_absent() {
        let store = RequestCookieStore::from_cookie_header(Some("accessToken="), false);
        assert_eq!(store.access_token(), None);
    }

    #[test]
    fn test_store_shadows_incoming_and_queues_set_cookie() {
        let store = RequestCookieStore::from_pairs([("accessToken", "old"), ("refreshToken", "r0")], true);
        store.store(&SessionCredentials::new("new", "r1"));

        assert_eq!(store.access_token().as_deref(), Some("new"));
        assert_eq!(store.refresh_token().as_deref(), Some("r1"));

        let pending = store.pending_cookies();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].name, "accessToken");
        assert_eq!(pending[0].max_age, Some(7200));
        assert!(pending[0].secure);
        assert_eq!(pending[1].name, "refreshToken");
        assert_eq!(pending[1].max_age, Some(604800));
    }

    #[test]
    fn test_second_rotation_replaces_first() {
        let store = RequestCookieStore::default();
        store.store(&SessionCredentials::new("a1", "r1"));
        store.store(&SessionCredentials::new("a2", "r2"));
        let pending = store.pending_cookies();
        assert_eq!(pending.len(), 2);
        assert_eq!(store.access_token().as_deref(), Some("a2"));
    }

    #[test]
    fn test_clear_hides_incoming() {
        let store = RequestCookieStore::from_pairs([("accessToken", "acc")], false);
        store.clear();
        assert_eq!(store.access_token(), None);
        assert!(store.pending_cookies().iter().all(|c| c.is_removal()));
    }
}
