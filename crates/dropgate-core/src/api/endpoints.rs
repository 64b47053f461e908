//! Backend endpoints used by the auth flow.

use tracing::info;

use crate::models::{
    Identity, MessageResponse, SignInRequest, SignInResponse, SignUpRequest, VerifyEmailRequest,
};
use crate::auth::SessionCredentials;

use super::{ApiClient, ApiError, RequestOptions};

/// Identity of the bearer of the access credential
pub const USERS_ME_PATH: &str = "/users/me";

/// Credential rotation; body `{refreshToken}`
pub const REFRESH_TOKENS_PATH: &str = "/auth/refresh-tokens";

pub const SIGN_IN_PATH: &str = "/auth/sign-in";

pub const SIGN_UP_PATH: &str = "/users";

pub const VERIFY_EMAIL_PATH: &str = "/users/verify-email";

impl ApiClient {
    /// Fetch the identity for the current access credential.
    pub async fn current_identity(&self) -> Result<Identity, ApiError> {
        self.get(USERS_ME_PATH, RequestOptions::default()).await
    }

    /// Sign in and store the issued credential pair. Returns the backend's
    /// greeting message.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<String, ApiError> {
        let request = SignInRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        let response: SignInResponse = self
            .post(SIGN_IN_PATH, &request, RequestOptions::default())
            .await?;

        self.credentials().store(&SessionCredentials::new(
            response.access_token,
            response.refresh_token,
        ));
        info!("Signed in");

        Ok(response.message.unwrap_or_else(|| "Signed in".to_string()))
    }

    /// Register a new vendor or agent account. Verification follows by email.
    pub async fn sign_up(&self, request: &SignUpRequest) -> Result<String, ApiError> {
        let response: MessageResponse = self
            .post(SIGN_UP_PATH, request, RequestOptions::default())
            .await?;
        Ok(response
            .message
            .unwrap_or_else(|| "Account created".to_string()))
    }

    /// Confirm an email address with the 6-digit code sent at sign-up.
    pub async fn verify_email(&self, email: &str, code: &str) -> Result<String, ApiError> {
        let request = VerifyEmailRequest {
            email: email.trim().to_string(),
            code: code.trim().to_string(),
        };
        let response: MessageResponse = self
            .post(VERIFY_EMAIL_PATH, &request, RequestOptions::default())
            .await?;
        Ok(response
            .message
            .unwrap_or_else(|| "Email verified".to_string()))
    }
}
