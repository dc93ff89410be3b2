use tracing::{debug, info, warn};

use crate::error::{PortalError, PortalResult};
use crate::http::{Binding, EndpointCategory};
use crate::models::{Envelope, LoginCredentials, LoginResponse, Patient};

const LOGIN_FAILED: &str = "Login failed";
const TOKEN_VALIDATION_FAILED: &str = "Token validation failed";
const TOKEN_INVALID: &str = "Token invalid or expired";

/// Login and token verification against the auth backend.
#[derive(Debug, Clone)]
pub struct AuthService {
    binding: Binding,
}

impl AuthService {
    pub fn new(binding: Binding) -> Self {
        Self { binding }
    }

    pub fn has_token(&self) -> bool {
        self.binding.tokens().has_token()
    }

    /// Logs in and persists the returned access token.
    pub async fn login(&self, credentials: &LoginCredentials) -> PortalResult<LoginResponse> {
        debug!(email = %credentials.email, "Logging in");

        let envelope: Envelope<LoginResponse> = self
            .binding
            .post_json(EndpointCategory::Login, "/patients/login", credentials)
            .await
            .map_err(|f| f.normalize(LOGIN_FAILED))?;
        let response = envelope.into_data(LOGIN_FAILED)?;

        self.binding.tokens().set(&response.access_token)?;
        info!(patient_id = %response.patient.id, "Logged in");

        Ok(response)
    }

    /// Verifies the persisted token and returns its patient. The token is
    /// removed whenever verification fails.
    pub async fn validate_token(&self) -> PortalResult<Patient> {
        let result = self.verify().await;

        if let Err(e) = &result {
            debug!("Token validation failed: {}", e);
            self.discard_token();
        }

        result
    }

    async fn verify(&self) -> PortalResult<Patient> {
        if !self.has_token() {
            return Err(PortalError::TokenMissing);
        }

        let envelope: Envelope<Patient> = self
            .binding
            .post(EndpointCategory::Token, "/verify-token")
            .await
            .map_err(|f| f.normalize(TOKEN_VALIDATION_FAILED))?;

        if !envelope.is_success() {
            return Err(PortalError::TokenRejected(TOKEN_INVALID.to_string()));
        }

        envelope.into_data(TOKEN_VALIDATION_FAILED)
    }

    /// Logout is client-local: the token is dropped, nothing is sent.
    pub fn logout(&self) -> PortalResult<()> {
        self.binding.tokens().clear()
    }

    fn discard_token(&self) {
        if let Err(e) = self.binding.tokens().clear() {
            warn!("Failed to remove rejected token: {}", e);
        }
    }
}
