//! Cookie header parsing and `Set-Cookie` rendering.

use std::fmt;

use super::credentials::{
    SessionCredentials, ACCESS_COOKIE, ACCESS_TOKEN_TTL_SECS, REFRESH_COOKIE,
    REFRESH_TOKEN_TTL_SECS,
};

/// Date used to expire a cookie immediately.
pub const EPOCH_EXPIRES: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SameSite {
    #[default]
    Lax,
    Strict,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Lax => "Lax",
            SameSite::Strict => "Strict",
            SameSite::None => "None",
        }
    }
}

/// A cookie to be sent back to the browser in a `Set-Cookie` header.
#[derive(Clone, PartialEq, Eq)]
pub struct SetCookie {
    pub name: String,
    pub value: String,
    pub path: String,
    pub max_age: Option<i64>,
    pub same_site: SameSite,
    pub secure: bool,
}

impl SetCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            path: "/".to_string(),
            max_age: None,
            same_site: SameSite::Lax,
            secure: false,
        }
    }

    pub fn max_age(mut self, secs: i64) -> Self {
        self.max_age = Some(secs);
        self
    }

    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// A cookie that deletes `name` on the client.
    pub fn removal(name: impl Into<String>) -> Self {
        Self::new(name, "").max_age(0)
    }

    pub fn is_removal(&self) -> bool {
        self.max_age.is_some_and(|age| age <= 0)
    }

    /// Render as a `Set-Cookie` header value.
    pub fn header_value(&self) -> String {
        let mut out = format!(
            "{}={}; Path={}",
            urlencoding::encode(&self.name),
            urlencoding::encode(&self.value),
            self.path
        );
        if let Some(age) = self.max_age {
            out.push_str(&format!("; Max-Age={}", age.max(0)));
            if age <= 0 {
                out.push_str(&format!("; Expires={}", EPOCH_EXPIRES));
            }
        }
        out.push_str("; SameSite=");
        out.push_str(self.same_site.as_str());
        if self.secure {
            out.push_str("; Secure");
        }
        out
    }
}

impl fmt::Display for SetCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.header_value())
    }
}

impl fmt::Debug for SetCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetCookie")
            .field("name", &self.name)
            .field("value", &"<redacted>")
            .field("path", &self.path)
            .field("max_age", &self.max_age)
            .field("same_site", &self.same_site)
            .field("secure", &self.secure)
            .finish()
    }
}

/// The two cookies written when a credential pair is issued or rotated.
pub fn credential_cookies(credentials: &SessionCredentials, secure: bool) -> [SetCookie; 2] {
    [
        SetCookie::new(ACCESS_COOKIE, credentials.access_token.as_str())
            .max_age(ACCESS_TOKEN_TTL_SECS)
            .secure(secure),
        SetCookie::new(REFRESH_COOKIE, credentials.refresh_token.as_str())
            .max_age(REFRESH_TOKEN_TTL_SECS)
            .secure(secure),
    ]
}

/// Split a `Cookie` request header into decoded `(name, value)` pairs.
///
/// Malformed fragments (no `=`) are skipped.
pub fn parse_cookie_header(header: &str) -> Vec<(String, String)> {
    header
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((decode(name), decode(value.trim())))
        })
        .collect()
}

/// Look up a single cookie in a `Cookie` request header.
pub fn get_cookie(header: &str, name: &str) -> Option<String> {
    parse_cookie_header(header)
        .into_iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v)
}

fn decode(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}
