//! Login flow state machine.
//!
//! Credential branch: `ProviderSelect -> CredentialEntry -> Submitting`, then
//! `Success` or back to `CredentialEntry` with an error. OAuth branch:
//! `ProviderSelect -> ExternalAuthPending`, left only through a push event
//! (or the user backing out).

pub mod providers;

pub use providers::Provider;

use crate::backend::AccountId;
use crate::error::{SessionError, SessionResult};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginStep {
    ProviderSelect,
    CredentialEntry,
    Submitting,
    ExternalAuthPending(Provider),
    Success(AccountId),
}

/// What the caller must do after a provider was chosen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderAction {
    /// Show the credential form
    EnterCredentials,
    /// Call `LoginUserWithOAuth` with the provider name
    StartOAuth(Provider),
}

/// Credentials to hand to `LoginUser`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRequest {
    pub endpoint: String,
    pub email: String,
    pub password: String,
}

/// End of one login attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Success(AccountId),
    Failure(SessionError),
}

#[derive(Debug, Clone)]
pub struct LoginFlow {
    step: LoginStep,
    provider: Option<Provider>,
    endpoint: String,
    email: String,
    password: String,
    error: Option<SessionError>,
}

impl Default for LoginFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl LoginFlow {
    pub fn new() -> Self {
        Self {
            step: LoginStep::ProviderSelect,
            provider: None,
            endpoint: String::new(),
            email: String::new(),
            password: String::new(),
            error: None,
        }
    }

    fn expect_step(&self, expected: &LoginStep) -> SessionResult<()> {
        if &self.step == expected {
            Ok(())
        } else {
            Err(SessionError::invalid_state(format!(
                "login is at {:?}, not {:?}",
                self.step, expected
            )))
        }
    }

    /// Pick a provider. After a success this starts over for another account.
    pub fn choose_provider(&mut self, provider: Provider) -> SessionResult<ProviderAction> {
        if matches!(self.step, LoginStep::Success(_)) {
            *self = Self::new();
        }
        self.expect_step(&LoginStep::ProviderSelect)?;
        self.provider = Some(provider);
        self.error = None;

        if provider.uses_oauth() {
            info!("Starting external login with {}", provider);
            self.step = LoginStep::ExternalAuthPending(provider);
            return Ok(ProviderAction::StartOAuth(provider));
        }

        self.endpoint = provider.endpoint().unwrap_or_default();
        self.step = LoginStep::CredentialEntry;
        debug!("Credential entry for {}", provider);
        Ok(ProviderAction::EnterCredentials)
    }

    /// Only editable for the Custom provider
    pub fn set_endpoint(&mut self, endpoint: &str) -> SessionResult<()> {
        self.expect_step(&LoginStep::CredentialEntry)?;
        if !self.needs_endpoint() {
            return Err(SessionError::invalid_state("endpoint is fixed by the provider"));
        }
        self.endpoint = endpoint.to_string();
        self.error = None;
        Ok(())
    }

    pub fn set_email(&mut self, email: &str) -> SessionResult<()> {
        self.expect_step(&LoginStep::CredentialEntry)?;
        self.email = email.to_string();
        self.error = None;
        Ok(())
    }

    pub fn set_password(&mut self, password: &str) -> SessionResult<()> {
        self.expect_step(&LoginStep::CredentialEntry)?;
        self.password = password.to_string();
        self.error = None;
        Ok(())
    }

    /// Return to provider selection, dropping everything typed so far
    pub fn back(&mut self) -> SessionResult<()> {
        match self.step {
            LoginStep::CredentialEntry
            | LoginStep::ExternalAuthPending(_)
            | LoginStep::Success(_) => {
                *self = Self::new();
                Ok(())
            }
            _ => Err(SessionError::invalid_state(format!(
                "cannot go back from {:?}",
                self.step
            ))),
        }
    }

    /// Validate the form and move to `Submitting`
    pub fn begin_submit(&mut self) -> SessionResult<LoginRequest> {
        self.expect_step(&LoginStep::CredentialEntry)?;
        let endpoint = self.endpoint.trim().to_string();
        if endpoint.is_empty() {
            self.error = Some(SessionError::MissingEndpoint);
            return Err(SessionError::MissingEndpoint);
        }

        self.step = LoginStep::Submitting;
        Ok(LoginRequest {
            endpoint,
            email: self.email.trim().to_string(),
            password: self.password.clone(),
        })
    }

    /// Apply the backend's answer to a credential submission
    pub fn complete_submit(&mut self, result: SessionResult<AccountId>) -> SessionResult<LoginOutcome> {
        self.expect_step(&LoginStep::Submitting)?;
        self.password.clear();
        match result {
            Ok(account) => {
                info!("Login succeeded for account {}", account);
                self.step = LoginStep::Success(account);
                self.error = None;
                Ok(LoginOutcome::Success(account))
            }
            Err(err) => {
                warn!("Login failed: {}", err);
                self.step = LoginStep::CredentialEntry;
                self.error = Some(err.clone());
                Ok(LoginOutcome::Failure(err))
            }
        }
    }

    /// The external flow could not be started
    pub fn oauth_start_failed(&mut self, err: SessionError) {
        if matches!(self.step, LoginStep::ExternalAuthPending(_)) {
            warn!("External login did not start: {}", err);
            self.step = LoginStep::ProviderSelect;
            self.error = Some(err);
        }
    }

    /// Push-driven completion. Returns false if no external login was pending.
    pub fn oauth_succeeded(&mut self, account: AccountId) -> bool {
        if !self.is_oauth_pending() {
            return false;
        }
        info!("External login succeeded for account {}", account);
        self.step = LoginStep::Success(account);
        self.error = None;
        true
    }

    /// Push-driven failure. Returns false if no external login was pending.
    pub fn oauth_failed(&mut self) -> bool {
        if !self.is_oauth_pending() {
            return false;
        }
        warn!("External login failed");
        self.step = LoginStep::ProviderSelect;
        self.error = Some(SessionError::oauth("provider reported failure"));
        true
    }

    pub fn step(&self) -> &LoginStep {
        &self.step
    }

    pub fn provider(&self) -> Option<Provider> {
        self.provider
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn error(&self) -> Option<&SessionError> {
        self.error.as_ref()
    }

    /// Inline error text for the form
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(|e| e.user_message())
    }

    pub fn needs_endpoint(&self) -> bool {
        self.provider.map(|p| p.needs_endpoint()).unwrap_or(false)
    }

    pub fn is_oauth_pending(&self) -> bool {
        matches!(self.step, LoginStep::ExternalAuthPending(_))
    }
}
