use crate::backend::{AccountId, BackendResult, MailboxRef, MessageKey};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// What a click on another message does while a body is still loading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyFetchPolicy {
    /// Clicks are ignored until the pending body lands
    #[default]
    IgnoreWhilePending,
    /// The new selection wins; the pending body is discarded when it lands
    Supersede,
}

/// Staleness token captured when a body request is issued
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyToken {
    pub id: u64,
    pub key: MessageKey,
}

/// Body pane state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyState {
    Empty,
    Loading { token: u64 },
    Loaded { html: String },
    Failed { reason: String },
}

/// Result of a message click
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageSelection {
    /// Already selected, or ignored while a body is pending
    Unchanged,
    /// Served from the body cache
    Cached,
    /// Caller must fetch the body and hand it back with this token
    Fetch(BodyToken),
}

/// Active mailbox, active message and body loading state
#[derive(Debug, Clone)]
pub struct SelectionController {
    policy: BodyFetchPolicy,
    mailbox: Option<MailboxRef>,
    message: Option<MessageKey>,
    body: BodyState,
    next_token: u64,
}

impl Default for SelectionController {
    fn default() -> Self {
        Self::new(BodyFetchPolicy::default())
    }
}

impl SelectionController {
    pub fn new(policy: BodyFetchPolicy) -> Self {
        Self {
            policy,
            mailbox: None,
            message: None,
            body: BodyState::Empty,
            next_token: 0,
        }
    }

    /// Select a mailbox. Returns false if it already was selected.
    pub fn select_mailbox(&mut self, mailbox: MailboxRef) -> bool {
        if self.mailbox.as_ref() == Some(&mailbox) {
            return false;
        }
        debug!("Selecting mailbox {}", mailbox);
        self.mailbox = Some(mailbox);
        self.message = None;
        self.body = BodyState::Empty;
        true
    }

    /// Select a message, optionally with a body already in the cache
    pub fn select_message(&mut self, key: MessageKey, cached: Option<String>) -> MessageSelection {
        if self.message.as_ref() == Some(&key) {
            return MessageSelection::Unchanged;
        }
        if self.is_loading() && self.policy == BodyFetchPolicy::IgnoreWhilePending {
            debug!("Ignoring selection of {} while a body is loading", key);
            return MessageSelection::Unchanged;
        }

        self.message = Some(key.clone());
        if let Some(html) = cached {
            self.body = BodyState::Loaded { html };
            return MessageSelection::Cached;
        }

        self.next_token += 1;
        self.body = BodyState::Loading {
            token: self.next_token,
        };
        MessageSelection::Fetch(BodyToken {
            id: self.next_token,
            key,
        })
    }

    /// Apply a body response. Returns false if the selection moved on since
    /// the token was issued and the result was discarded.
    pub fn complete_body(&mut self, token: &BodyToken, result: BackendResult<String>) -> bool {
        let current = matches!(self.body, BodyState::Loading { token: t } if t == token.id)
            && self.message.as_ref() == Some(&token.key);
        if !current {
            debug!("Discarding stale body for {}", token.key);
            return false;
        }

        self.body = match result {
            Ok(html) => BodyState::Loaded { html },
            Err(err) => BodyState::Failed {
                reason: err.to_string(),
            },
        };
        true
    }

    /// Drop any selection belonging to `account`. Pending bodies for it are
    /// discarded when they land.
    pub fn clear_account(&mut self, account: AccountId) -> bool {
        let owns_mailbox = self.mailbox.as_ref().map(|m| m.account) == Some(account);
        let owns_message = self.message.as_ref().map(|m| m.account) == Some(account);
        if !owns_mailbox && !owns_message {
            return false;
        }
        if owns_mailbox {
            self.mailbox = None;
        }
        self.message = None;
        self.body = BodyState::Empty;
        true
    }

    pub fn selected_mailbox(&self) -> Option<&MailboxRef> {
        self.mailbox.as_ref()
    }

    pub fn selected_message(&self) -> Option<&MessageKey> {
        self.message.as_ref()
    }

    pub fn body(&self) -> &BodyState {
        &self.body
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.body, BodyState::Loading { .. })
    }

    pub fn is_selected(&self, mailbox: &MailboxRef) -> bool {
        self.mailbox.as_ref() == Some(mailbox)
    }
}
