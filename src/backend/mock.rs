//! Scriptable in-memory backend for tests and the demo command

use super::{
    AccountId, Address, BackendError, BackendResult, Envelope, MailBackend, MessageKey,
    MessageSummary, PushEvent, PushHandler, PushSource, PushTopic, Unsubscribe,
};
use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::rc::{Rc, Weak};
use tokio::sync::oneshot;

/// Which backend call a [`MockCall`] was
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    GetAccountIds,
    IsLoggedIn,
    LoginUser,
    LoginUserWithOAuth,
    LogoutUser,
    GetMailboxes,
    GetEmailsForMailbox,
    GetEmailBody,
    UpdateMailboxes,
    UpdateMessages,
}

/// Record of a call made to the mock backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    GetAccountIds,
    IsLoggedIn(AccountId),
    LoginUser { endpoint: String, email: String },
    LoginUserWithOAuth(String),
    LogoutUser(AccountId),
    GetMailboxes(AccountId),
    GetEmailsForMailbox {
        account: AccountId,
        mailbox: String,
        offset: usize,
        limit: usize,
    },
    GetEmailBody {
        account: AccountId,
        mailbox: String,
        uid: u32,
    },
    UpdateMailboxes(AccountId),
    UpdateMessages(AccountId, String),
}

impl MockCall {
    pub fn kind(&self) -> CallKind {
        match self {
            MockCall::GetAccountIds => CallKind::GetAccountIds,
            MockCall::IsLoggedIn(_) => CallKind::IsLoggedIn,
            MockCall::LoginUser { .. } => CallKind::LoginUser,
            MockCall::LoginUserWithOAuth(_) => CallKind::LoginUserWithOAuth,
            MockCall::LogoutUser(_) => CallKind::LogoutUser,
            MockCall::GetMailboxes(_) => CallKind::GetMailboxes,
            MockCall::GetEmailsForMailbox { .. } => CallKind::GetEmailsForMailbox,
            MockCall::GetEmailBody { .. } => CallKind::GetEmailBody,
            MockCall::UpdateMailboxes(_) => CallKind::UpdateMailboxes,
            MockCall::UpdateMessages(_, _) => CallKind::UpdateMessages,
        }
    }
}

/// Holds back the next response of one call kind until released
pub struct Gate {
    sender: Option<oneshot::Sender<()>>,
}

impl Gate {
    pub fn release(mut self) {
        if let Some(sender) = self.sender.take() {
            let _ = sender.send(());
        }
    }
}

#[derive(Debug, Clone)]
struct MockAccount {
    endpoint: String,
    email: String,
    password: String,
    logged_in: bool,
    mailboxes: Vec<String>,
    /// Newest first, the order the backend lists them
    messages: HashMap<String, Vec<MessageSummary>>,
    bodies: HashMap<(String, u32), String>,
}

#[derive(Debug, Default)]
struct MockState {
    accounts: BTreeMap<AccountId, MockAccount>,
    next_id: i64,
    oauth_providers: Vec<String>,
    failures: HashMap<CallKind, BackendError>,
}

struct Subscriber {
    id: u64,
    topic: PushTopic,
    handler: Rc<dyn Fn(PushEvent)>,
}

/// In-memory mail backend
pub struct MockBackend {
    state: RefCell<MockState>,
    calls: RefCell<Vec<MockCall>>,
    gates: RefCell<HashMap<CallKind, VecDeque<oneshot::Receiver<()>>>>,
    subscribers: Rc<RefCell<Vec<Subscriber>>>,
    next_subscriber: Cell<u64>,
    auto_emit: Cell<bool>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Create an empty backend. Trigger calls emit their push events.
    pub fn new() -> Self {
        Self {
            state: RefCell::new(MockState::default()),
            calls: RefCell::new(Vec::new()),
            gates: RefCell::new(HashMap::new()),
            subscribers: Rc::new(RefCell::new(Vec::new())),
            next_subscriber: Cell::new(0),
            auto_emit: Cell::new(true),
        }
    }

    /// Backend with one Gmail-like account, a handful of mailboxes and messages
    pub fn with_demo_data() -> (Self, AccountId) {
        let backend = Self::new();
        let account = backend.add_account("imap.gmail.com:993", "demo@example.com", "demo");
        backend.set_mailboxes(
            account,
            &[
                "[Gmail]",
                "[Gmail]/All Mail",
                "[Gmail]/Drafts",
                "Receipts",
                "[Gmail]/Sent Mail",
                "INBOX",
                "[Gmail]/Trash",
            ],
        );
        backend.generate_messages(account, "INBOX", 45);
        backend.generate_messages(account, "[Gmail]/Sent Mail", 8);
        (backend, account)
    }

    /// Register credentials for an account that is already logged in
    pub fn add_account(&self, endpoint: &str, email: &str, password: &str) -> AccountId {
        let mut state = self.state.borrow_mut();
        let id = AccountId::new(state.next_id);
        state.next_id += 1;
        state.accounts.insert(
            id,
            MockAccount {
                endpoint: endpoint.to_string(),
                email: email.to_string(),
                password: password.to_string(),
                logged_in: true,
                mailboxes: vec!["INBOX".to_string()],
                messages: HashMap::new(),
                bodies: HashMap::new(),
            },
        );
        id
    }

    pub fn set_logged_in(&self, account: AccountId, logged_in: bool) {
        if let Some(acc) = self.state.borrow_mut().accounts.get_mut(&account) {
            acc.logged_in = logged_in;
        }
    }

    pub fn set_mailboxes(&self, account: AccountId, mailboxes: &[&str]) {
        if let Some(acc) = self.state.borrow_mut().accounts.get_mut(&account) {
            acc.mailboxes = mailboxes.iter().map(|m| m.to_string()).collect();
        }
    }

    /// Deliver `count` new messages to the head of a mailbox. Returns their UIDs.
    pub fn generate_messages(&self, account: AccountId, mailbox: &str, count: usize) -> Vec<u32> {
        let mut state = self.state.borrow_mut();
        let Some(acc) = state.accounts.get_mut(&account) else {
            return Vec::new();
        };
        let list = acc.messages.entry(mailbox.to_string()).or_default();
        let mut next_uid = list.first().map(|m| m.uid + 1).unwrap_or(1);
        let base = Utc
            .with_ymd_and_hms(2024, 11, 1, 9, 0, 0)
            .single()
            .unwrap_or_else(Utc::now);

        let mut uids = Vec::with_capacity(count);
        for _ in 0..count {
            let uid = next_uid;
            next_uid += 1;
            let envelope = Envelope {
                date: Some(base + Duration::hours(uid as i64)),
                subject: format!("Message {} in {}", uid, mailbox),
                from: vec![Address::new(
                    format!("Sender {}", uid % 5),
                    &format!("sender{}@example.com", uid % 5),
                )],
                sender: Vec::new(),
                message_id: format!("<{}.{}@example.com>", mailbox, uid),
            };
            list.insert(0, MessageSummary::new(uid, mailbox, envelope));
            uids.push(uid);
        }
        uids
    }

    pub fn set_body(&self, key: &MessageKey, html: &str) {
        if let Some(acc) = self.state.borrow_mut().accounts.get_mut(&key.account) {
            acc.bodies
                .insert((key.mailbox.clone(), key.uid), html.to_string());
        }
    }

    /// Providers for which `LoginUserWithOAuth` starts a flow
    pub fn allow_oauth(&self, provider: &str) {
        self.state
            .borrow_mut()
            .oauth_providers
            .push(provider.to_string());
    }

    /// Finish an external OAuth flow: creates the account and pushes `OAuthSuccess`
    pub fn complete_oauth(&self, email: &str) -> AccountId {
        let account = self.add_account("imap.gmail.com:993", email, "");
        self.emit(PushEvent::OAuthSuccess(account));
        account
    }

    /// Make the next call of `kind` fail with `error`
    pub fn fail_next(&self, kind: CallKind, error: BackendError) {
        self.state.borrow_mut().failures.insert(kind, error);
    }

    /// Hold the next call of `kind` until the returned gate is released
    pub fn gate(&self, kind: CallKind) -> Gate {
        let (sender, receiver) = oneshot::channel();
        self.gates
            .borrow_mut()
            .entry(kind)
            .or_default()
            .push_back(receiver);
        Gate {
            sender: Some(sender),
        }
    }

    /// Whether trigger calls (logout, update) emit their push events
    pub fn set_auto_emit(&self, enabled: bool) {
        self.auto_emit.set(enabled);
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.borrow().clone()
    }

    pub fn call_count(&self, kind: CallKind) -> usize {
        self.calls.borrow().iter().filter(|c| c.kind() == kind).count()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }

    /// Deliver a push event to every subscriber of its topic
    pub fn emit(&self, event: PushEvent) {
        let topic = event.topic();
        let handlers: Vec<Rc<dyn Fn(PushEvent)>> = self
            .subscribers
            .borrow()
            .iter()
            .filter(|s| s.topic == topic)
            .map(|s| s.handler.clone())
            .collect();
        for handler in handlers {
            handler(event.clone());
        }
    }

    async fn enter(&self, call: MockCall) -> BackendResult<()> {
        let kind = call.kind();
        self.calls.borrow_mut().push(call);

        let gate = self
            .gates
            .borrow_mut()
            .get_mut(&kind)
            .and_then(|queue| queue.pop_front());
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        match self.state.borrow_mut().failures.remove(&kind) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn with_live_account<T>(
        &self,
        account: AccountId,
        f: impl FnOnce(&mut MockAccount) -> T,
    ) -> BackendResult<T> {
        let mut state = self.state.borrow_mut();
        match state.accounts.get_mut(&account) {
            Some(acc) if acc.logged_in => Ok(f(acc)),
            _ => Err(BackendError::rejected(format!(
                "account {} is not logged in",
                account
            ))),
        }
    }
}

#[async_trait(?Send)]
impl MailBackend for MockBackend {
    async fn get_account_ids(&self) -> BackendResult<Vec<AccountId>> {
        self.enter(MockCall::GetAccountIds).await?;
        Ok(self.state.borrow().accounts.keys().copied().collect())
    }

    async fn is_logged_in(&self, account: AccountId) -> BackendResult<bool> {
        self.enter(MockCall::IsLoggedIn(account)).await?;
        Ok(self
            .state
            .borrow()
            .accounts
            .get(&account)
            .map(|a| a.logged_in)
            .unwrap_or(false))
    }

    async fn login_user(
        &self,
        endpoint: &str,
        email: &str,
        password: &str,
    ) -> BackendResult<Option<AccountId>> {
        self.enter(MockCall::LoginUser {
            endpoint: endpoint.to_string(),
            email: email.to_string(),
        })
        .await?;

        let mut state = self.state.borrow_mut();
        let found = state.accounts.iter_mut().find(|(_, acc)| {
            acc.endpoint == endpoint && acc.email == email && acc.password == password
        });
        Ok(found.map(|(id, acc)| {
            acc.logged_in = true;
            *id
        }))
    }

    async fn login_user_with_oauth(&self, provider: &str) -> BackendResult<bool> {
        self.enter(MockCall::LoginUserWithOAuth(provider.to_string()))
            .await?;
        Ok(self
            .state
            .borrow()
            .oauth_providers
            .iter()
            .any(|p| p == provider))
    }

    async fn logout_user(&self, account: AccountId) -> BackendResult<()> {
        self.enter(MockCall::LogoutUser(account)).await?;
        self.set_logged_in(account, false);
        if self.auto_emit.get() {
            self.emit(PushEvent::UserLoggedOut(account));
        }
        Ok(())
    }

    async fn get_mailboxes(&self, account: AccountId) -> BackendResult<Vec<String>> {
        self.enter(MockCall::GetMailboxes(account)).await?;
        self.with_live_account(account, |acc| acc.mailboxes.clone())
    }

    async fn get_emails_for_mailbox(
        &self,
        account: AccountId,
        mailbox: &str,
        offset: usize,
        limit: usize,
    ) -> BackendResult<Vec<MessageSummary>> {
        self.enter(MockCall::GetEmailsForMailbox {
            account,
            mailbox: mailbox.to_string(),
            offset,
            limit,
        })
        .await?;
        self.with_live_account(account, |acc| {
            acc.messages
                .get(mailbox)
                .map(|list| list.iter().skip(offset).take(limit).cloned().collect())
                .unwrap_or_default()
        })
    }

    async fn get_email_body(
        &self,
        account: AccountId,
        mailbox: &str,
        uid: u32,
    ) -> BackendResult<String> {
        self.enter(MockCall::GetEmailBody {
            account,
            mailbox: mailbox.to_string(),
            uid,
        })
        .await?;
        self.with_live_account(account, |acc| {
            acc.bodies
                .get(&(mailbox.to_string(), uid))
                .cloned()
                .unwrap_or_else(|| format!("<p>Body of message {} in {}</p>", uid, mailbox))
        })
    }

    async fn update_mailboxes(&self, account: AccountId) -> BackendResult<()> {
        self.enter(MockCall::UpdateMailboxes(account)).await?;
        self.with_live_account(account, |_| ())?;
        if self.auto_emit.get() {
            self.emit(PushEvent::MailboxesUpdated(account));
        }
        Ok(())
    }

    async fn update_messages(&self, account: AccountId, mailbox: &str) -> BackendResult<()> {
        self.enter(MockCall::UpdateMessages(account, mailbox.to_string()))
            .await?;
        self.with_live_account(account, |_| ())?;
        if self.auto_emit.get() {
            self.emit(PushEvent::MessagesUpdated(account, mailbox.to_string()));
        }
        Ok(())
    }
}

impl PushSource for MockBackend {
    fn subscribe(&self, topic: PushTopic, handler: PushHandler) -> Unsubscribe {
        let id = self.next_subscriber.get();
        self.next_subscriber.set(id + 1);
        self.subscribers.borrow_mut().push(Subscriber {
            id,
            topic,
            handler: Rc::from(handler),
        });

        let subscribers: Weak<RefCell<Vec<Subscriber>>> = Rc::downgrade(&self.subscribers);
        Box::new(move || {
            if let Some(subscribers) = subscribers.upgrade() {
                subscribers.borrow_mut().retain(|s| s.id != id);
            }
        })
    }
}
