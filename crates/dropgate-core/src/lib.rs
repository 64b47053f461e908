//! Core library for dropgate.
//!
//! This crate holds everything the delivery marketplace front-end needs to
//! talk to its backend and to guard page navigations:
//!
//! - `api`: the `ApiClient` with bearer attachment and refresh-and-retry
//! - `auth`: session credentials and the two cookie-backed credential stores
//! - `gate`: route classification and the edge `Gatekeeper`
//! - `context`: the explicitly passed `AppContext` (alerts, identity)
//! - `config`: layered configuration (file, `.env`, environment)
//! - `models`: identity and auth request/response types

pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod gate;
pub mod models;

pub use api::{ApiClient, ApiError, RequestOptions, ResponseBody};
pub use auth::{
    CredentialStore, DocumentCookieStore, ExecutionContext, RequestCookieStore, SessionCredentials,
    SetCookie,
};
pub use config::Config;
pub use context::{Alert, AlertKind, AppContext};
pub use gate::{GateDecision, GateRequest, GateResponse, Gatekeeper, RouteClass};
pub use models::Identity;
