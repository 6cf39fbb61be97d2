//! Boundary to the remote mail backend.
//!
//! The backend is reachable only through asynchronous request/response calls
//! ([`MailBackend`]) and unsolicited push notifications ([`PushSource`]). All
//! protocol work (IMAP, OAuth token exchange) happens on the far side.

pub mod error;
pub mod mock;
pub mod types;

pub use error::{BackendError, BackendResult};
pub use mock::{MockBackend, MockCall};
pub use types::*;

use async_trait::async_trait;

/// Request/response calls. One call yields exactly one eventual response.
#[async_trait(?Send)]
pub trait MailBackend {
    /// Known account handles
    async fn get_account_ids(&self) -> BackendResult<Vec<AccountId>>;

    /// Liveness check for one account
    async fn is_logged_in(&self, account: AccountId) -> BackendResult<bool>;

    /// Credential login. `None` is the backend's failure sentinel.
    async fn login_user(
        &self,
        endpoint: &str,
        email: &str,
        password: &str,
    ) -> BackendResult<Option<AccountId>>;

    /// Start an out-of-band OAuth flow. `true` only means the flow started.
    async fn login_user_with_oauth(&self, provider: &str) -> BackendResult<bool>;

    async fn logout_user(&self, account: AccountId) -> BackendResult<()>;

    async fn get_mailboxes(&self, account: AccountId) -> BackendResult<Vec<String>>;

    async fn get_emails_for_mailbox(
        &self,
        account: AccountId,
        mailbox: &str,
        offset: usize,
        limit: usize,
    ) -> BackendResult<Vec<MessageSummary>>;

    /// Renderable HTML body
    async fn get_email_body(
        &self,
        account: AccountId,
        mailbox: &str,
        uid: u32,
    ) -> BackendResult<String>;

    /// Async trigger; the result arrives as `MailboxesUpdated`
    async fn update_mailboxes(&self, account: AccountId) -> BackendResult<()>;

    /// Async trigger; the result arrives as `MessagesUpdated`
    async fn update_messages(&self, account: AccountId, mailbox: &str) -> BackendResult<()>;
}

/// Backend-initiated notifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushEvent {
    OAuthSuccess(AccountId),
    OAuthFailure,
    UserLoggedOut(AccountId),
    MailboxesUpdated(AccountId),
    MessagesUpdated(AccountId, String),
}

impl PushEvent {
    pub fn topic(&self) -> PushTopic {
        match self {
            PushEvent::OAuthSuccess(_) => PushTopic::OAuthSuccess,
            PushEvent::OAuthFailure => PushTopic::OAuthFailure,
            PushEvent::UserLoggedOut(_) => PushTopic::UserLoggedOut,
            PushEvent::MailboxesUpdated(_) => PushTopic::MailboxesUpdated,
            PushEvent::MessagesUpdated(_, _) => PushTopic::MessagesUpdated,
        }
    }
}

/// Push channel names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PushTopic {
    OAuthSuccess,
    OAuthFailure,
    UserLoggedOut,
    MailboxesUpdated,
    MessagesUpdated,
}

impl PushTopic {
    pub const ALL: [PushTopic; 5] = [
        PushTopic::OAuthSuccess,
        PushTopic::OAuthFailure,
        PushTopic::UserLoggedOut,
        PushTopic::MailboxesUpdated,
        PushTopic::MessagesUpdated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PushTopic::OAuthSuccess => "OAuthSuccess",
            PushTopic::OAuthFailure => "OAuthFailure",
            PushTopic::UserLoggedOut => "UserLoggedOut",
            PushTopic::MailboxesUpdated => "MailboxesUpdated",
            PushTopic::MessagesUpdated => "MessagesUpdated",
        }
    }
}

pub type PushHandler = Box<dyn Fn(PushEvent)>;

/// Cancels one subscription when called
pub type Unsubscribe = Box<dyn FnOnce()>;

/// Push channel registration
pub trait PushSource {
    fn subscribe(&self, topic: PushTopic, handler: PushHandler) -> Unsubscribe;
}

/// Everything the session needs from the far side
pub trait Backend: MailBackend + PushSource {}

impl<T: MailBackend + PushSource> Backend for T {}
