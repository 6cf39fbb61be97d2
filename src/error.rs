use crate::backend::{AccountId, BackendError};
use thiserror::Error;

pub type SessionResult<T> = Result<T, SessionError>;

/// Session layer errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Bad email/password or endpoint rejected by the backend
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Custom provider submitted without an endpoint
    #[error("Missing IMAP endpoint")]
    MissingEndpoint,

    /// Provider name not present in the provider table
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    /// External OAuth flow failed or never started
    #[error("OAuth login failed: {0}")]
    OAuth(String),

    /// Backend call rejected or timed out
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(#[from] BackendError),

    /// Account is not part of the active set
    #[error("Unknown account: {0}")]
    UnknownAccount(AccountId),

    /// Operation not valid in the current state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Durable storage failure
    #[error("Storage error: {0}")]
    Storage(String),
}

impl SessionError {
    /// Create a new OAuth error
    pub fn oauth<S: Into<String>>(msg: S) -> Self {
        SessionError::OAuth(msg.into())
    }

    /// Create a new invalid state error
    pub fn invalid_state<S: Into<String>>(msg: S) -> Self {
        SessionError::InvalidState(msg.into())
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        SessionError::Config(msg.into())
    }

    /// Create a new storage error
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        SessionError::Storage(msg.into())
    }

    /// Errors the login form shows inline next to the credential fields
    pub fn is_credential_error(&self) -> bool {
        matches!(
            self,
            SessionError::InvalidCredentials | SessionError::MissingEndpoint
        )
    }

    /// Check if the user can simply try again
    pub fn is_recoverable(&self) -> bool {
        match self {
            SessionError::InvalidCredentials => true,
            SessionError::MissingEndpoint => true,
            SessionError::UnknownProvider(_) => false,
            SessionError::OAuth(_) => true,
            SessionError::BackendUnavailable(_) => true,
            SessionError::UnknownAccount(_) => false,
            SessionError::InvalidState(_) => true,
            SessionError::Config(_) => false,
            SessionError::Storage(_) => false,
        }
    }

    /// Text shown to the user
    pub fn user_message(&self) -> String {
        match self {
            SessionError::InvalidCredentials => "Invalid credentials".to_string(),
            SessionError::MissingEndpoint => "Please enter the IMAP URL.".to_string(),
            SessionError::OAuth(_) => "OAuth login failed.".to_string(),
            SessionError::BackendUnavailable(_) => {
                "Something went wrong talking to the mail server. Try refreshing.".to_string()
            }
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_errors_are_inline() {
        assert!(SessionError::InvalidCredentials.is_credential_error());
        assert!(SessionError::MissingEndpoint.is_credential_error());
        assert!(!SessionError::oauth("denied").is_credential_error());
    }

    #[test]
    fn test_user_messages() {
        assert_eq!(
            SessionError::InvalidCredentials.user_message(),
            "Invalid credentials"
        );
        assert_eq!(
            SessionError::oauth("browser closed").user_message(),
            "OAuth login failed."
        );
        let err: SessionError = BackendError::Timeout.into();
        assert!(err.is_recoverable());
        assert!(err.user_message().contains("refreshing"));
    }
}
