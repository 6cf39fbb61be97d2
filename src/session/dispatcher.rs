//! Push event subscription and routing.
//!
//! Handlers registered with the backend only forward events into a channel;
//! the session drains that channel on its own loop and asks [`plan`] what each
//! event means against the current state.

use super::accounts::AccountRegistry;
use super::cache::MessagePageCache;
use super::selection::SelectionController;
use crate::backend::{AccountId, MailboxRef, PushEvent, PushSource, PushTopic, Unsubscribe};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Cancellation callbacks for a set of subscriptions, run in reverse
/// registration order on dispose or drop
#[derive(Default)]
pub struct SubscriptionScope {
    cancels: Vec<(PushTopic, Unsubscribe)>,
}

impl SubscriptionScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, topic: PushTopic, cancel: Unsubscribe) {
        self.cancels.push((topic, cancel));
    }

    /// Run every cancellation callback. Returns how many ran.
    pub fn dispose(&mut self) -> usize {
        let count = self.cancels.len();
        while let Some((topic, cancel)) = self.cancels.pop() {
            debug!("Unsubscribing from {}", topic.as_str());
            cancel();
        }
        count
    }

    pub fn len(&self) -> usize {
        self.cancels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cancels.is_empty()
    }
}

impl Drop for SubscriptionScope {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Owns the session's push subscriptions
#[derive(Default)]
pub struct EventDispatcher {
    scope: Option<SubscriptionScope>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to every push topic, forwarding events into `sender`.
    /// Returns false if already started.
    pub fn start<S: PushSource + ?Sized>(
        &mut self,
        source: &S,
        sender: mpsc::UnboundedSender<PushEvent>,
    ) -> bool {
        if self.scope.is_some() {
            debug!("Event dispatcher already started");
            return false;
        }

        let mut scope = SubscriptionScope::new();
        for topic in PushTopic::ALL {
            let sender = sender.clone();
            let cancel = source.subscribe(
                topic,
                Box::new(move |event| {
                    if sender.send(event).is_err() {
                        debug!("Push event dropped, session receiver closed");
                    }
                }),
            );
            scope.push(topic, cancel);
        }
        info!("Subscribed to {} push topics", scope.len());
        self.scope = Some(scope);
        true
    }

    /// Tear down every subscription made by `start`
    pub fn dispose(&mut self) -> usize {
        match self.scope.take() {
            Some(mut scope) => {
                let count = scope.dispose();
                info!("Disposed {} push subscriptions", count);
                count
            }
            None => 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.scope.is_some()
    }
}

/// What a push event requires of the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Stale or irrelevant target
    Ignore,
    /// External login finished for this account
    CompleteOAuth(AccountId),
    OAuthFailed,
    /// Backend logged the account out; purge it
    AccountLoggedOut(AccountId),
    /// Refetch the account's mailbox list
    RefreshCatalog(AccountId),
    /// Head refresh of a cached mailbox; `visible` when it is the one on screen
    InvalidateMailbox { mailbox: MailboxRef, visible: bool },
}

/// Decide what `event` means against the current session state
pub fn plan(
    event: &PushEvent,
    accounts: &AccountRegistry,
    cache: &MessagePageCache,
    selection: &SelectionController,
    oauth_pending: bool,
) -> Dispatch {
    match event {
        PushEvent::OAuthSuccess(account) if oauth_pending => Dispatch::CompleteOAuth(*account),
        PushEvent::OAuthFailure if oauth_pending => Dispatch::OAuthFailed,
        PushEvent::OAuthSuccess(_) | PushEvent::OAuthFailure => {
            debug!("OAuth result with no login pending, ignoring");
            Dispatch::Ignore
        }
        PushEvent::UserLoggedOut(account) => {
            if accounts.is_active(*account) {
                Dispatch::AccountLoggedOut(*account)
            } else {
                debug!("Redundant logout for account {}", account);
                Dispatch::Ignore
            }
        }
        PushEvent::MailboxesUpdated(account) => {
            if accounts.is_active(*account) {
                Dispatch::RefreshCatalog(*account)
            } else {
                debug!("Mailbox update for inactive account {}", account);
                Dispatch::Ignore
            }
        }
        PushEvent::MessagesUpdated(account, name) => {
            let mailbox = MailboxRef::new(*account, name.clone());
            if !accounts.is_active(*account) || !cache.has_mailbox(&mailbox) {
                debug!("Message update for unopened mailbox {}", mailbox);
                return Dispatch::Ignore;
            }
            let visible = selection.is_selected(&mailbox);
            Dispatch::InvalidateMailbox { mailbox, visible }
        }
    }
}
