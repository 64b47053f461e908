//! REST client for the marketplace backend.
//!
//! This module provides the `ApiClient` for calling the backend API with
//! bearer credentials taken from a `CredentialStore`. In a browser-like
//! execution context a 401 triggers one credential refresh followed by a
//! single retry of the original call.
//!
//! Endpoints used by the auth flow live in `endpoints`.

pub mod body;
pub mod client;
pub mod endpoints;
pub mod error;

pub use body::ResponseBody;
pub use client::{ApiClient, RequestOptions};
pub use endpoints::{REFRESH_TOKENS_PATH, SIGN_IN_PATH, USERS_ME_PATH};
pub use error::ApiError;
