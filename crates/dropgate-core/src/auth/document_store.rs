use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::cookie::SameSite;
use super::credentials::{
    CredentialStore, SessionCredentials, ACCESS_COOKIE, ACCESS_TOKEN_TTL_SECS, REFRESH_COOKIE,
    REFRESH_TOKEN_TTL_SECS,
};

/// Cookie jar file name in the cache directory
pub const COOKIE_JAR_FILE: &str = "cookies.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct JarEntry {
    value: String,
    expires: Option<DateTime<Utc>>,
    path: String,
    secure: bool,
}

impl JarEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires.is_some_and(|at| at <= now)
    }
}

/// Client-side credential store modelled on `document.cookie`.
///
/// Entries carry an absolute expiry and are invisible once it passes. When
/// created with [`DocumentCookieStore::persistent`] every write is flushed to
/// a JSON file so a CLI session survives between runs.
pub struct DocumentCookieStore {
    secure: bool,
    jar: Mutex<BTreeMap<String, JarEntry>>,
    path: Option<PathBuf>,
}

impl DocumentCookieStore {
    /// In-memory jar. `secure` mirrors an HTTPS page origin.
    pub fn new(secure: bool) -> Self {
        Self {
            secure,
            jar: Mutex::new(BTreeMap::new()),
            path: None,
        }
    }

    /// Jar backed by a file, loading any unexpired cookies already saved there.
    pub fn persistent(path: impl Into<PathBuf>, secure: bool) -> Result<Self> {
        let path = path.into();
        let mut jar: BTreeMap<String, JarEntry> = BTreeMap::new();
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .context("Failed to read cookie jar file")?;
            jar = serde_json::from_str(&contents).context("Failed to parse cookie jar file")?;
            let now = Utc::now();
            jar.retain(|_, entry| !entry.is_expired(now));
            debug!(path = %path.display(), cookies = jar.len(), "Loaded cookie jar");
        }
        Ok(Self {
            secure,
            jar: Mutex::new(jar),
            path: Some(path),
        })
    }

    /// Set a cookie, optionally expiring after `lifetime`. No lifetime means a
    /// session cookie.
    pub fn set_cookie(&self, name: &str, value: &str, lifetime: Option<Duration>) {
        let entry = JarEntry {
            value: value.to_string(),
            expires: lifetime.map(|d| Utc::now() + d),
            path: "/".to_string(),
            secure: self.secure,
        };
        self.jar_mut().insert(name.to_string(), entry);
        self.flush();
    }

    pub fn get_cookie(&self, name: &str) -> Option<String> {
        let now = Utc::now();
        let jar = self.jar_mut();
        jar.get(name)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.value.clone())
    }

    pub fn clear_cookie(&self, name: &str) {
        self.jar_mut().remove(name);
        self.flush();
    }

    /// The `name=value; name=value` string a page script would see.
    pub fn document_cookie(&self) -> String {
        let now = Utc::now();
        let jar = self.jar_mut();
        jar.iter()
            .filter(|(_, entry)| !entry.is_expired(now))
            .map(|(name, entry)| {
                format!(
                    "{}={}",
                    urlencoding::encode(name),
                    urlencoding::encode(&entry.value)
                )
            })
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Serialised form of one entry as it would be assigned to `document.cookie`.
    pub fn cookie_assignment(&self, name: &str) -> Option<String> {
        let jar = self.jar_mut();
        let entry = jar.get(name)?;
        let mut out = format!(
            "{}={}",
            urlencoding::encode(name),
            urlencoding::encode(&entry.value)
        );
        if let Some(expires) = entry.expires {
            out.push_str(&format!(
                "; Expires={}",
                expires.format("%a, %d %b %Y %H:%M:%S GMT")
            ));
        }
        out.push_str(&format!("; Path={}; SameSite={}", entry.path, SameSite::Lax.as_str()));
        if entry.secure {
            out.push_str("; Secure");
        }
        Some(out)
    }

    /// Persist the jar now. Writes through [`set_cookie`](Self::set_cookie)
    /// already do this; exposed for callers that want the error.
    pub fn save(&self) -> Result<()> {
        let Some(ref path) = self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&*self.jar_mut())?;
        std::fs::write(path, contents).context("Failed to write cookie jar file")?;
        Ok(())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn flush(&self) {
        if let Err(e) = self.save() {
            warn!(error = %e, "Failed to persist cookie jar");
        }
    }

    fn jar_mut(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, JarEntry>> {
        self.jar.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for DocumentCookieStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.jar_mut().keys().cloned().collect();
        f.debug_struct("DocumentCookieStore")
            .field("secure", &self.secure)
            .field("cookies", &names)
            .field("path", &self.path)
            .finish()
    }
}

impl CredentialStore for DocumentCookieStore {
    fn access_token(&self) -> Option<String> {
        self.get_cookie(ACCESS_COOKIE)
    }

    fn refresh_token(&self) -> Option<String> {
        self.get_cookie(REFRESH_COOKIE)
    }

    fn store(&self, credentials: &SessionCredentials) {
        self.set_cookie(
            ACCESS_COOKIE,
            &credentials.access_token,
            Some(Duration::seconds(ACCESS_TOKEN_TTL_SECS)),
        );
        self.set_cookie(
            REFRESH_COOKIE,
            &credentials.refresh_token,
            Some(Duration::seconds(REFRESH_TOKEN_TTL_SECS)),
        );
    }

    fn clear(&self) {
        debug!("Clearing session cookies");
        self.clear_cookie(ACCESS_COOKIE);
        self.clear_cookie(REFRESH_COOKIE);
    }
}
