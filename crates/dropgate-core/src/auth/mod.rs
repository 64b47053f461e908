//! Session credentials and where they live.
//!
//! This module provides:
//! - `SessionCredentials`: the access/refresh bearer pair
//! - `CredentialStore`: the capability the request client reads and rotates
//! - `RequestCookieStore`: server-side store backed by the incoming `Cookie`
//!   header, recording rotations as `Set-Cookie` entries
//! - `DocumentCookieStore`: client-side `document.cookie`-style jar, optionally
//!   persisted to disk between runs
//!
//! Access credentials live for 2 hours, refresh credentials for 7 days.

pub mod cookie;
pub mod credentials;
pub mod document_store;
pub mod request_store;

pub use cookie::{SameSite, SetCookie};
pub use credentials::{
    CredentialStore, ExecutionContext, SessionCredentials, ACCESS_COOKIE, ACCESS_TOKEN_TTL_SECS,
    REFRESH_COOKIE, REFRESH_TOKEN_TTL_SECS,
};
pub use document_store::DocumentCookieStore;
pub use request_store::RequestCookieStore;
