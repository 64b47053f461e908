//! Edge gatekeeping for page navigations.
//!
//! Every navigation is classified by path (`routes`) and then evaluated by
//! the `Gatekeeper`, which looks up the caller's identity with their session
//! cookies, rotates credentials when the access credential has expired, and
//! decides between passing the request through and redirecting it.

pub mod gatekeeper;
pub mod routes;

pub use gatekeeper::{role_gate, GateDecision, GateRequest, GateResponse, Gatekeeper};
pub use routes::{sign_in_location, RouteClass, RouteTable, AUTH_PAGES, SIGN_IN_PAGE};
