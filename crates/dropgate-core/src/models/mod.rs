//! Data models exchanged with the marketplace backend.
//!
//! - `Identity`: the signed-in user returned by `/users/me`
//! - Auth payloads: sign-in, sign-up, email verification and refresh

pub mod auth;
pub mod identity;

pub use auth::{
    MessageResponse, RefreshRequest, SignInRequest, SignInResponse, SignUpRequest, UserRole,
    VerifyEmailRequest,
};
pub use identity::Identity;
