//! Error types for the EcoHealth core library.
//!
//! Every failure a view can see is a [`PortalError`]. Services collapse
//! transport and server failures into one normalized message, stores record
//! that message verbatim (see [`PortalError::message`]), and the CLI prints
//! it through [`CliErrorDisplay`].
//!
//! # Error Codes Reference
//!
//! | Code Range | Category | Description |
//! |------------|----------|-------------|
//! | E1001-E1099 | Validation | Client-side form checks, nothing sent |
//! | E2001-E2099 | Api | Transport, server-reported and authorization errors |
//! | E3001-E3099 | Session | Missing user, missing or rejected token, token storage |
//! | E4001-E4099 | Directory | Doctor/profile join failures |
//! | E5001-E5099 | Recording | Voice recorder misuse |
//! | E6001-E6099 | Config | Configuration file and value errors |
//! | E9001-E9099 | General | Internal, IO and serialization errors |

use std::fmt;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum PortalError {
    // ========================================================================
    // Validation Errors (E1001-E1099)
    // ========================================================================
    /// A form field failed a client-side check
    #[error("[E1001] Invalid {field}: {message}")]
    ValidationError { field: String, message: String },

    /// The form carries nothing to send
    #[error("[E1002] {0}")]
    NothingToSubmit(String),

    // ========================================================================
    // Api Errors (E2001-E2099)
    // ========================================================================
    /// The request never produced a response
    #[error("[E2001] Network error: {0}")]
    Transport(String),

    /// The backend answered with a non-success status
    #[error("[E2002] Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// The backend answered 401
    #[error("[E2003] Unauthorized: {0}")]
    Unauthorized(String),

    /// The response body did not have the expected shape
    #[error("[E2004] Unexpected response: {0}")]
    Decode(String),

    /// The backend envelope reported a non-success status
    #[error("[E2005] Request rejected: {0}")]
    Rejected(String),

    // ========================================================================
    // Session Errors (E3001-E3099)
    // ========================================================================
    #[error("[E3001] User not authenticated")]
    NotAuthenticated,

    #[error("[E3002] No token found")]
    TokenMissing,

    #[error("[E3003] {0}")]
    TokenRejected(String),

    #[error("[E3004] Token storage failed: {0}")]
    TokenStorage(String),

    // ========================================================================
    // Directory Errors (E4001-E4099)
    // ========================================================================
    /// The roster cannot be joined to the profile without guessing
    #[error(
        "[E4001] Ambiguous doctor join: {assignments} assignment(s) against {roster} roster entries without identifiers"
    )]
    AmbiguousDoctorJoin { assignments: usize, roster: usize },

    /// A profile assignment names a doctor the roster does not contain
    #[error("[E4002] No roster entry for doctor {0}")]
    UnmatchedDoctor(String),

    // ========================================================================
    // Recording Errors (E5001-E5099)
    // ========================================================================
    #[error("[E5001] Recorder error: {0}")]
    Recording(String),

    // ========================================================================
    // Configuration Errors (E6001-E6099)
    // ========================================================================
    #[error("[E6001] Missing required configuration: {0}")]
    MissingConfig(String),

    #[error("[E6002] Invalid configuration value for '{key}': {message}")]
    InvalidConfigValue { key: String, message: String },

    #[error("[E6003] Failed to parse configuration: {0}")]
    ConfigParseError(String),

    // ========================================================================
    // General Errors (E9001-E9099)
    // ========================================================================
    #[error("[E9001] Internal error: {0}")]
    Internal(String),

    #[error("[E9002] IO error: {0}")]
    IoError(String),

    #[error("[E9003] Serialization error: {0}")]
    SerializationError(String),
}

/// Result type alias for portal operations.
pub type PortalResult<T> = Result<T, PortalError>;

impl PortalError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        PortalError::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }

    /// The bare, user-facing message without the error code.
    ///
    /// This is the string stores keep in their `error` slot.
    pub fn message(&self) -> String {
        match self {
            PortalError::ValidationError { message, .. } => message.clone(),
            PortalError::NothingToSubmit(m)
            | PortalError::Transport(m)
            | PortalError::Unauthorized(m)
            | PortalError::Decode(m)
            | PortalError::Rejected(m)
            | PortalError::TokenRejected(m) => m.clone(),
            PortalError::Server { message, .. } => message.clone(),
            PortalError::NotAuthenticated => "User not authenticated".to_string(),
            PortalError::TokenMissing => "No token found".to_string(),
            other => {
                let rendered = other.to_string();
                match rendered.split_once("] ") {
                    Some((_, rest)) => rest.to_string(),
                    None => rendered,
                }
            }
        }
    }

    /// HTTP status carried by the error, if it came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            PortalError::Server { status, .. } => Some(*status),
            PortalError::Unauthorized(_) => Some(401),
            _ => None,
        }
    }

    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            PortalError::ValidationError { .. } | PortalError::NothingToSubmit(_)
        )
    }

    pub fn is_api_error(&self) -> bool {
        matches!(
            self,
            PortalError::Transport(_)
                | PortalError::Server { .. }
                | PortalError::Unauthorized(_)
                | PortalError::Decode(_)
                | PortalError::Rejected(_)
        )
    }

    pub fn is_session_error(&self) -> bool {
        matches!(
            self,
            PortalError::NotAuthenticated
                | PortalError::TokenMissing
                | PortalError::TokenRejected(_)
                | PortalError::TokenStorage(_)
        )
    }

    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            PortalError::MissingConfig(_)
                | PortalError::InvalidConfigValue { .. }
                | PortalError::ConfigParseError(_)
        )
    }

    /// Forced re-authentication is the worst outcome any error can have.
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            PortalError::Unauthorized(_)
                | PortalError::NotAuthenticated
                | PortalError::TokenMissing
                | PortalError::TokenRejected(_)
        )
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            PortalError::ValidationError { .. } => "E1001",
            PortalError::NothingToSubmit(_) => "E1002",
            PortalError::Transport(_) => "E2001",
            PortalError::Server { .. } => "E2002",
            PortalError::Unauthorized(_) => "E2003",
            PortalError::Decode(_) => "E2004",
            PortalError::Rejected(_) => "E2005",
            PortalError::NotAuthenticated => "E3001",
            PortalError::TokenMissing => "E3002",
            PortalError::TokenRejected(_) => "E3003",
            PortalError::TokenStorage(_) => "E3004",
            PortalError::AmbiguousDoctorJoin { .. } => "E4001",
            PortalError::UnmatchedDoctor(_) => "E4002",
            PortalError::Recording(_) => "E5001",
            PortalError::MissingConfig(_) => "E6001",
            PortalError::InvalidConfigValue { .. } => "E6002",
            PortalError::ConfigParseError(_) => "E6003",
            PortalError::Internal(_) => "E9001",
            PortalError::IoError(_) => "E9002",
            PortalError::SerializationError(_) => "E9003",
        }
    }

    pub fn user_suggestion(&self) -> Option<&'static str> {
        match self {
            PortalError::Unauthorized(_)
            | PortalError::NotAuthenticated
            | PortalError::TokenMissing
            | PortalError::TokenRejected(_) => Some("Run 'ecohealth login' to sign in again"),
            PortalError::Transport(_) => {
                Some("Check that the backend URLs in your configuration are reachable")
            }
            PortalError::AmbiguousDoctorJoin { .. } => Some(
                "Use '--join first-entry' to pair every assignment with the first roster doctor",
            ),
            PortalError::MissingConfig(_) | PortalError::InvalidConfigValue { .. } => {
                Some("Set ECOHEALTH_AUTH_URL, ECOHEALTH_CHAT_URL and ECOHEALTH_FEEDBACK_URL or edit ecohealth.toml")
            }
            _ => None,
        }
    }

    /// Log this error with a severity matching its category.
    pub fn log(&self) {
        let code = self.error_code();
        if self.is_validation_error() || self.requires_login() {
            warn!(error_code = %code, "{}", self);
        } else {
            error!(
                error_code = %code,
                suggestion = self.user_suggestion(),
                "{}",
                self
            );
        }
    }
}

// ============================================================================
// From trait implementations for seamless error propagation
// ============================================================================

impl From<reqwest::Error> for PortalError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            PortalError::Decode(err.to_string())
        } else if err.is_builder() {
            PortalError::Internal(err.to_string())
        } else {
            PortalError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for PortalError {
    fn from(err: serde_json::Error) -> Self {
        PortalError::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for PortalError {
    fn from(err: std::io::Error) -> Self {
        PortalError::IoError(err.to_string())
    }
}

impl From<config::ConfigError> for PortalError {
    fn from(err: config::ConfigError) -> Self {
        match err {
            config::ConfigError::NotFound(key) => PortalError::InvalidConfigValue {
                key,
                message: "Key not found".to_string(),
            },
            config::ConfigError::FileParse { uri, cause } => PortalError::ConfigParseError(
                format!("Failed to parse {}: {}", uri.unwrap_or_default(), cause),
            ),
            config::ConfigError::Type {
                origin,
                unexpected,
                expected,
                key,
            } => PortalError::InvalidConfigValue {
                key: key.unwrap_or_else(|| origin.map(|o| o.to_string()).unwrap_or_default()),
                message: format!("Expected {}, got {}", expected, unexpected),
            },
            _ => PortalError::ConfigParseError(err.to_string()),
        }
    }
}

// ============================================================================
// User-friendly error formatting for CLI
// ============================================================================

pub struct CliErrorDisplay<'a> {
    error: &'a PortalError,
    show_suggestion: bool,
}

impl<'a> CliErrorDisplay<'a> {
    pub fn new(error: &'a PortalError) -> Self {
        Self {
            error,
            show_suggestion: true,
        }
    }

    pub fn without_suggestion(mut self) -> Self {
        self.show_suggestion = false;
        self
    }
}

impl<'a> fmt::Display for CliErrorDisplay<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.error)?;

        if self.show_suggestion {
            if let Some(suggestion) = self.error.user_suggestion() {
                writeln!(f)?;
                writeln!(f, "  Suggestion: {}", suggestion)?;
            }
        }

        Ok(())
    }
}
