//! The mail session: owns the account registry, mailbox catalog, page cache,
//! selection and login flow, performs the suspending backend calls, and
//! applies push events to them.
//!
//! Everything runs on one thread. Component state sits in `RefCell`s that are
//! only borrowed between suspension points; in-flight work is tracked with
//! tickets and tokens so late responses can be told apart from current ones.

pub mod accounts;
pub mod cache;
pub mod catalog;
pub mod dispatcher;
pub mod display;
pub mod selection;
pub mod view;

pub use accounts::{AccountRegistry, LoginStatus};
pub use cache::{FetchKind, FetchOutcome, MessagePageCache, PageState, PageTicket};
pub use catalog::{MailboxCatalog, MailboxEntry, MailboxKind, MailboxNormalizer};
pub use dispatcher::{Dispatch, EventDispatcher, SubscriptionScope};
pub use selection::{BodyFetchPolicy, BodyState, BodyToken, MessageSelection, SelectionController};
pub use view::{AppView, FileStore, KeyValueStore, MemoryStore, ViewState};

use crate::backend::{AccountId, Backend, BackendError, MailboxRef, MessageKey, MessageSummary, PushEvent};
use crate::config::SessionConfig;
use crate::error::{SessionError, SessionResult};
use crate::login::{LoginFlow, LoginOutcome, LoginStep, Provider, ProviderAction};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Change notifications for the UI layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    ViewChanged(AppView),
    AccountsChanged,
    CatalogChanged,
    /// Only sent for the mailbox currently on screen
    MessagesChanged(MailboxRef),
    BodyChanged,
    LoginChanged,
}

/// Result of a page request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageFetch {
    /// A fetch was already in flight for the mailbox; nothing new was sent
    Coalesced,
    /// Mailbox was never opened, nothing to refresh
    Skipped,
    Completed(FetchOutcome),
}

struct SessionInner {
    backend: Rc<dyn Backend>,
    config: SessionConfig,
    accounts: RefCell<AccountRegistry>,
    catalog: RefCell<MailboxCatalog>,
    cache: RefCell<MessagePageCache>,
    selection: RefCell<SelectionController>,
    login: RefCell<LoginFlow>,
    /// An external login was started and its result push is still due
    oauth_pending: Cell<bool>,
    view: RefCell<ViewState>,
    dispatcher: RefCell<EventDispatcher>,
    events_tx: mpsc::UnboundedSender<PushEvent>,
    events_rx: RefCell<Option<mpsc::UnboundedReceiver<PushEvent>>>,
    updates_tx: mpsc::UnboundedSender<SessionUpdate>,
    updates_rx: RefCell<Option<mpsc::UnboundedReceiver<SessionUpdate>>>,
    running: watch::Sender<bool>,
}

/// Handle to the session. Clones share state.
#[derive(Clone)]
pub struct Session {
    inner: Rc<SessionInner>,
}

impl Session {
    pub fn new(backend: Rc<dyn Backend>, config: SessionConfig, store: Box<dyn KeyValueStore>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        let (running, _) = watch::channel(false);

        let inner = SessionInner {
            accounts: RefCell::new(AccountRegistry::new()),
            catalog: RefCell::new(MailboxCatalog::new(config.normalizer())),
            cache: RefCell::new(MessagePageCache::new(config.page_size, config.body_cache_ttl())),
            selection: RefCell::new(SelectionController::new(config.body_fetch_policy)),
            login: RefCell::new(LoginFlow::new()),
            oauth_pending: Cell::new(false),
            view: RefCell::new(ViewState::restore(store)),
            dispatcher: RefCell::new(EventDispatcher::new()),
            events_tx,
            events_rx: RefCell::new(Some(events_rx)),
            updates_tx,
            updates_rx: RefCell::new(Some(updates_rx)),
            running,
            backend,
            config,
        };
        Self {
            inner: Rc::new(inner),
        }
    }

    /// Session whose view persists under `config.state_dir`, or the user
    /// config directory when unset
    pub fn from_config(backend: Rc<dyn Backend>, config: SessionConfig) -> SessionResult<Self> {
        let store = FileStore::in_dir(config.state_dir.as_deref())?;
        debug!("View state at {}", store.path().display());
        Ok(Self::new(backend, config, Box::new(store)))
    }

    /// Session with default config and a volatile view store
    pub fn in_memory(backend: Rc<dyn Backend>) -> Self {
        Self::new(backend, SessionConfig::default(), Box::new(MemoryStore::new()))
    }

    /// Receiver for change notifications. Can be taken once.
    pub fn take_updates(&self) -> Option<mpsc::UnboundedReceiver<SessionUpdate>> {
        self.inner.updates_rx.borrow_mut().take()
    }

    fn notify(&self, update: SessionUpdate) {
        if self.inner.updates_tx.send(update).is_err() {
            debug!("Update receiver dropped");
        }
    }

    // Lifecycle

    /// Subscribe to push events. Returns false if already started.
    pub fn start(&self) -> bool {
        let started = self
            .inner
            .dispatcher
            .borrow_mut()
            .start(&*self.inner.backend, self.inner.events_tx.clone());
        if started {
            self.inner.running.send_replace(true);
        }
        started
    }

    /// Unsubscribe every push handler and stop the event and sync loops
    pub fn dispose(&self) {
        let count = self.inner.dispatcher.borrow_mut().dispose();
        self.inner.running.send_replace(false);
        debug!("Session disposed, {} subscriptions removed", count);
    }

    pub fn is_started(&self) -> bool {
        self.inner.dispatcher.borrow().is_active()
    }

    /// Apply every push event received so far. Returns how many were handled.
    pub async fn process_pending_events(&self) -> usize {
        let mut handled = 0;
        loop {
            let next = match self.inner.events_rx.borrow_mut().as_mut() {
                Some(rx) => rx.try_recv().ok(),
                None => None,
            };
            let Some(event) = next else {
                break;
            };
            self.handle_event(event).await;
            handled += 1;
        }
        handled
    }

    /// Apply push events as they arrive until the session is disposed
    pub async fn run_events(&self) {
        let Some(mut rx) = self.inner.events_rx.borrow_mut().take() else {
            warn!("Event loop already running");
            return;
        };
        let mut running = self.inner.running.subscribe();

        loop {
            if !*running.borrow() {
                break;
            }
            tokio::select! {
                event = rx.recv() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => break,
                },
                changed = running.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        *self.inner.events_rx.borrow_mut() = Some(rx);
        debug!("Event loop stopped");
    }

    /// Apply one push event
    pub async fn handle_event(&self, event: PushEvent) {
        let decision = dispatcher::plan(
            &event,
            &self.inner.accounts.borrow(),
            &self.inner.cache.borrow(),
            &self.inner.selection.borrow(),
            self.inner.oauth_pending.get(),
        );
        debug!("Push {:?}: {:?}", event, decision);

        match decision {
            Dispatch::Ignore => {}
            Dispatch::CompleteOAuth(account) => {
                self.inner.oauth_pending.set(false);
                self.inner.login.borrow_mut().oauth_succeeded(account);
                self.notify(SessionUpdate::LoginChanged);
                self.adopt_account(account).await;
            }
            Dispatch::OAuthFailed => {
                self.inner.oauth_pending.set(false);
                self.inner.login.borrow_mut().oauth_failed();
                self.notify(SessionUpdate::LoginChanged);
            }
            Dispatch::AccountLoggedOut(account) => {
                info!("Backend logged out account {}", account);
                self.forget_account(account);
            }
            Dispatch::RefreshCatalog(account) => {
                if let Err(e) = self.refresh_catalog(account).await {
                    warn!("Background mailbox refresh for {} failed: {}", account, e);
                }
            }
            Dispatch::InvalidateMailbox { mailbox, visible } => {
                debug!("Invalidating {} (visible: {})", mailbox, visible);
                if let Err(e) = self.invalidate(&mailbox).await {
                    warn!("Background refresh of {} failed: {}", mailbox, e);
                }
            }
        }
    }

    // Accounts

    /// Reconcile with the backend's account list, dropping accounts that
    /// fail the liveness check, then load their catalogs
    pub async fn initialize(&self) -> SessionResult<Vec<AccountId>> {
        let ids = match self.inner.backend.get_account_ids().await {
            Ok(ids) => ids,
            Err(e) => {
                warn!("Could not list accounts: {}", e);
                self.set_view(AppView::Login);
                return Err(e.into());
            }
        };

        let mut live = Vec::with_capacity(ids.len());
        for id in ids {
            match self.inner.backend.is_logged_in(id).await {
                Ok(true) => live.push(id),
                Ok(false) => info!("Account {} is no longer logged in, dropping it", id),
                Err(e) => warn!("Liveness check for account {} failed, dropping it: {}", id, e),
            }
        }

        let previous = self.inner.accounts.borrow().active_ids();
        for id in previous.iter().filter(|id| !live.contains(id)) {
            self.inner.catalog.borrow_mut().remove_account(*id);
            self.inner.cache.borrow_mut().purge_account(*id);
            self.inner.selection.borrow_mut().clear_account(*id);
        }
        self.inner.accounts.borrow_mut().reset(live.iter().copied());
        info!("Initialized with {} active account(s)", live.len());
        self.notify(SessionUpdate::AccountsChanged);

        if live.is_empty() {
            self.set_view(AppView::Login);
            return Ok(live);
        }

        for id in &live {
            if let Err(e) = self.refresh_catalog(*id).await {
                warn!("Initial mailbox load for {} failed: {}", id, e);
            }
        }
        Ok(live)
    }

    /// Credential login. The backend's failure sentinel is `InvalidCredentials`.
    pub async fn login(&self, endpoint: &str, email: &str, password: &str) -> SessionResult<AccountId> {
        let account = self
            .inner
            .backend
            .login_user(endpoint, email, password)
            .await?
            .ok_or(SessionError::InvalidCredentials)?;
        self.adopt_account(account).await;
        Ok(account)
    }

    /// Start the external login flow. Completion arrives as a push event.
    pub async fn login_with_oauth(&self, provider: &str) -> SessionResult<()> {
        let started = self
            .inner
            .backend
            .login_user_with_oauth(provider)
            .await
            .map_err(|e| SessionError::oauth(e.to_string()))?;
        if !started {
            return Err(SessionError::oauth(format!("{} login did not start", provider)));
        }
        info!("External login with {} started", provider);
        self.inner.oauth_pending.set(true);
        Ok(())
    }

    /// Log an account out. Local state is cleared right away; a backend
    /// failure is logged and does not bring the account back.
    pub async fn logout(&self, account: AccountId) -> SessionResult<()> {
        if !self.inner.accounts.borrow().is_active(account) {
            return Err(SessionError::UnknownAccount(account));
        }
        self.forget_account(account);
        if let Err(e) = self.inner.backend.logout_user(account).await {
            warn!("Backend logout for {} failed, cleared locally anyway: {}", account, e);
        }
        Ok(())
    }

    async fn adopt_account(&self, account: AccountId) {
        let newly_active = self.inner.accounts.borrow_mut().activate(account);
        if newly_active {
            self.inner.cache.borrow_mut().purge_account(account);
        }
        info!("Account {} active", account);
        self.notify(SessionUpdate::AccountsChanged);
        self.set_view(AppView::Mail);
        self.bootstrap(account).await;
    }

    /// Post-login kick: trigger server-side updates and load the catalog
    pub async fn bootstrap(&self, account: AccountId) {
        if let Err(e) = self.inner.backend.update_mailboxes(account).await {
            warn!("Mailbox update trigger for {} failed: {}", account, e);
        }
        if let Err(e) = self.refresh_catalog(account).await {
            warn!("Mailbox load for {} failed: {}", account, e);
            return;
        }
        for mailbox in self.mailbox_refs(account) {
            if let Err(e) = self.inner.backend.update_messages(account, &mailbox.name).await {
                warn!("Message update trigger for {} failed: {}", mailbox, e);
            }
        }
    }

    /// Purge everything keyed to `account`, including in-flight bookkeeping
    fn forget_account(&self, account: AccountId) {
        self.inner.accounts.borrow_mut().deactivate(account);
        self.inner.catalog.borrow_mut().remove_account(account);
        let purged = self.inner.cache.borrow_mut().purge_account(account);
        let cleared = self.inner.selection.borrow_mut().clear_account(account);
        debug!("Forgot account {}: {} cached mailbox(es) purged", account, purged);

        self.notify(SessionUpdate::AccountsChanged);
        self.notify(SessionUpdate::CatalogChanged);
        if cleared {
            self.notify(SessionUpdate::BodyChanged);
        }

        if !self.inner.accounts.borrow().has_active() {
            *self.inner.login.borrow_mut() = LoginFlow::new();
            self.notify(SessionUpdate::LoginChanged);
            self.set_view(AppView::Login);
        }
    }

    // Catalog

    /// Replace one account's catalog slice with the backend's mailbox list
    pub async fn refresh_catalog(&self, account: AccountId) -> SessionResult<()> {
        if !self.inner.accounts.borrow().is_active(account) {
            return Err(SessionError::UnknownAccount(account));
        }
        let names = self.inner.backend.get_mailboxes(account).await?;
        if !self.inner.accounts.borrow().is_active(account) {
            debug!("Discarding mailbox list for logged out account {}", account);
            return Ok(());
        }

        let changed = self.inner.catalog.borrow_mut().replace_account(account, &names);
        let keep = self.mailbox_refs(account);
        self.inner.cache.borrow_mut().retain_mailboxes(account, &keep);

        let orphaned = self
            .inner
            .selection
            .borrow()
            .selected_mailbox()
            .map(|m| m.account == account && !keep.contains(m))
            .unwrap_or(false);
        if orphaned {
            self.inner.selection.borrow_mut().clear_account(account);
            self.notify(SessionUpdate::BodyChanged);
        }

        debug!("Catalog for {}: {} mailbox(es)", account, keep.len());
        if changed {
            self.notify(SessionUpdate::CatalogChanged);
        }
        Ok(())
    }

    /// Manual refresh of every active account's catalog. All accounts are
    /// tried; the first failure is returned.
    pub async fn refresh_all(&self) -> SessionResult<()> {
        let mut first_error = None;
        for account in self.active_accounts() {
            if let Err(e) = self.refresh_catalog(account).await {
                warn!("Refresh of {} failed: {}", account, e);
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn mailbox_refs(&self, account: AccountId) -> Vec<MailboxRef> {
        self.inner
            .catalog
            .borrow()
            .entries_for(account)
            .iter()
            .map(|e| e.mailbox.clone())
            .collect()
    }

    // Messages and selection

    /// Show a mailbox. Loads its first page if nothing is cached yet.
    /// Returns false when it already was selected.
    pub async fn select_mailbox(&self, mailbox: MailboxRef) -> SessionResult<bool> {
        if !self.inner.accounts.borrow().is_active(mailbox.account) {
            return Err(SessionError::UnknownAccount(mailbox.account));
        }
        if !self.inner.selection.borrow_mut().select_mailbox(mailbox.clone()) {
            return Ok(false);
        }
        self.notify(SessionUpdate::MessagesChanged(mailbox.clone()));
        self.notify(SessionUpdate::BodyChanged);

        if self.inner.cache.borrow().cursor(&mailbox) == 0 {
            if let PageFetch::Completed(FetchOutcome::Failed(e)) = self.fetch_next_page(&mailbox).await? {
                warn!("Initial load of {} failed: {}", mailbox, e);
            }
        }
        Ok(true)
    }

    /// Fetch the page at the mailbox's cursor, or join the fetch in flight
    pub async fn fetch_next_page(&self, mailbox: &MailboxRef) -> SessionResult<PageFetch> {
        if !self.inner.accounts.borrow().is_active(mailbox.account) {
            return Err(SessionError::UnknownAccount(mailbox.account));
        }
        let ticket = self.inner.cache.borrow_mut().begin_next_page(mailbox);
        match ticket {
            Some(ticket) => Ok(PageFetch::Completed(self.run_page(ticket).await)),
            None => Ok(PageFetch::Coalesced),
        }
    }

    /// Refetch a mailbox's head after the server reported changes. Merges by
    /// key, so the cached count never drops and nothing is duplicated.
    pub async fn invalidate(&self, mailbox: &MailboxRef) -> SessionResult<PageFetch> {
        if !self.inner.accounts.borrow().is_active(mailbox.account) {
            return Err(SessionError::UnknownAccount(mailbox.account));
        }
        if !self.inner.cache.borrow().has_mailbox(mailbox) {
            return Ok(PageFetch::Skipped);
        }
        let ticket = self.inner.cache.borrow_mut().begin_refresh(mailbox);
        match ticket {
            Some(ticket) => Ok(PageFetch::Completed(self.run_page(ticket).await)),
            None => Ok(PageFetch::Coalesced),
        }
    }

    /// Run a ticket to completion, then pay any refresh that became owed
    /// while it was in flight
    async fn run_page(&self, ticket: PageTicket) -> FetchOutcome {
        let outcome = self.fetch_ticket(&ticket).await;

        loop {
            let owed = {
                let mut cache = self.inner.cache.borrow_mut();
                if cache.is_stale(&ticket.mailbox) {
                    cache.begin_refresh(&ticket.mailbox)
                } else {
                    None
                }
            };
            let Some(refresh) = owed else {
                break;
            };
            debug!("Paying owed refresh for {}", refresh.mailbox);
            self.fetch_ticket(&refresh).await;
        }
        outcome
    }

    async fn fetch_ticket(&self, ticket: &PageTicket) -> FetchOutcome {
        let result = self
            .inner
            .backend
            .get_emails_for_mailbox(
                ticket.mailbox.account,
                &ticket.mailbox.name,
                ticket.offset,
                ticket.limit,
            )
            .await;
        let outcome = self.inner.cache.borrow_mut().complete(ticket, result);

        let visible = self.inner.selection.borrow().is_selected(&ticket.mailbox);
        if visible && !matches!(outcome, FetchOutcome::Discarded) {
            self.notify(SessionUpdate::MessagesChanged(ticket.mailbox.clone()));
        }
        outcome
    }

    /// Show a message body, from the body cache when fresh
    pub async fn select_message(&self, key: MessageKey) -> SessionResult<MessageSelection> {
        if !self.inner.accounts.borrow().is_active(key.account) {
            return Err(SessionError::UnknownAccount(key.account));
        }
        let cached = self
            .inner
            .cache
            .borrow()
            .bodies()
            .get(&key)
            .map(str::to_string);
        let selection = self
            .inner
            .selection
            .borrow_mut()
            .select_message(key.clone(), cached);

        if selection != MessageSelection::Unchanged {
            self.notify(SessionUpdate::BodyChanged);
        }
        let MessageSelection::Fetch(token) = selection.clone() else {
            return Ok(selection);
        };

        let result = self
            .inner
            .backend
            .get_email_body(key.account, &key.mailbox, key.uid)
            .await;
        if let Ok(html) = &result {
            if self.inner.accounts.borrow().is_active(key.account) {
                self.inner
                    .cache
                    .borrow_mut()
                    .bodies_mut()
                    .insert(key.clone(), html.clone());
            }
        }
        if let Err(e) = &result {
            warn!("Body fetch for {} failed: {}", key, e);
        }

        if self.inner.selection.borrow_mut().complete_body(&token, result) {
            self.notify(SessionUpdate::BodyChanged);
        }
        Ok(selection)
    }

    // Login flow

    /// Pick a provider on the login screen. OAuth providers start the
    /// external flow immediately.
    pub async fn choose_provider(&self, provider: Provider) -> SessionResult<ProviderAction> {
        let action = self.inner.login.borrow_mut().choose_provider(provider)?;
        self.notify(SessionUpdate::LoginChanged);

        if let ProviderAction::StartOAuth(provider) = action {
            if let Err(e) = self.login_with_oauth(provider.name()).await {
                self.inner.login.borrow_mut().oauth_start_failed(e.clone());
                self.notify(SessionUpdate::LoginChanged);
                return Err(e);
            }
        }
        Ok(action)
    }

    /// Edit the login form
    pub fn with_login<R>(&self, f: impl FnOnce(&mut LoginFlow) -> R) -> R {
        let result = f(&mut self.inner.login.borrow_mut());
        self.notify(SessionUpdate::LoginChanged);
        result
    }

    /// Leave the current login step. Backing out of an external login
    /// drops its pending result.
    pub fn back_to_providers(&self) -> SessionResult<()> {
        let was_pending = self.inner.login.borrow().is_oauth_pending();
        self.with_login(|flow| flow.back())?;
        if was_pending {
            self.inner.oauth_pending.set(false);
        }
        Ok(())
    }

    /// Submit the credential form
    pub async fn submit_login(&self) -> SessionResult<LoginOutcome> {
        let request = self.inner.login.borrow_mut().begin_submit();
        self.notify(SessionUpdate::LoginChanged);
        let request = request?;

        let result = self
            .login(&request.endpoint, &request.email, &request.password)
            .await;
        let outcome = self.inner.login.borrow_mut().complete_submit(result)?;
        self.notify(SessionUpdate::LoginChanged);
        Ok(outcome)
    }

    // Background sync

    /// Trigger server-side mailbox and message updates for every active
    /// account. Results arrive as push events. Returns triggers sent.
    pub async fn sync_tick(&self) -> usize {
        let mut sent = 0;
        for account in self.active_accounts() {
            match self.inner.backend.update_mailboxes(account).await {
                Ok(()) => sent += 1,
                Err(e) => warn!("Mailbox update trigger for {} failed: {}", account, e),
            }
            for mailbox in self.mailbox_refs(account) {
                match self.inner.backend.update_messages(account, &mailbox.name).await {
                    Ok(()) => sent += 1,
                    Err(e) => warn!("Message update trigger for {} failed: {}", mailbox, e),
                }
            }
        }
        debug!("Sync tick sent {} trigger(s)", sent);
        sent
    }

    /// Run `sync_tick` every `sync_interval_secs` until the session is disposed
    pub async fn run_periodic_sync(&self) {
        let mut running = self.inner.running.subscribe();
        let mut interval = tokio::time::interval(self.inner.config.sync_interval());
        // First tick fires immediately; login already bootstrapped
        interval.tick().await;

        loop {
            if !*running.borrow() {
                break;
            }
            tokio::select! {
                _ = interval.tick() => {
                    self.sync_tick().await;
                }
                changed = running.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        debug!("Periodic sync stopped");
    }

    // Accessors

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    pub fn view(&self) -> AppView {
        self.inner.view.borrow().current()
    }

    pub fn set_view(&self, view: AppView) {
        if self.inner.view.borrow_mut().set(view) {
            info!("View changed to {}", view.as_str());
            self.notify(SessionUpdate::ViewChanged(view));
        }
    }

    pub fn active_accounts(&self) -> Vec<AccountId> {
        self.inner.accounts.borrow().active_ids()
    }

    pub fn is_account_active(&self, account: AccountId) -> bool {
        self.inner.accounts.borrow().is_active(account)
    }

    /// Flattened catalog across all active accounts
    pub fn mailboxes(&self) -> Vec<MailboxEntry> {
        self.inner.catalog.borrow().iter().cloned().collect()
    }

    pub fn inbox(&self, account: AccountId) -> Option<MailboxRef> {
        self.inner
            .catalog
            .borrow()
            .inbox(account)
            .map(|e| e.mailbox.clone())
    }

    pub fn messages(&self, mailbox: &MailboxRef) -> Vec<MessageSummary> {
        self.inner
            .cache
            .borrow()
            .messages(mailbox)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn cursor(&self, mailbox: &MailboxRef) -> usize {
        self.inner.cache.borrow().cursor(mailbox)
    }

    pub fn page_state(&self, mailbox: &MailboxRef) -> PageState {
        self.inner.cache.borrow().state(mailbox)
    }

    pub fn is_cached(&self, mailbox: &MailboxRef) -> bool {
        self.inner.cache.borrow().has_mailbox(mailbox)
    }

    pub fn cached_mailbox_count(&self) -> usize {
        self.inner.cache.borrow().mailbox_count()
    }

    pub fn last_error(&self, mailbox: &MailboxRef) -> Option<BackendError> {
        self.inner.cache.borrow().last_error(mailbox).cloned()
    }

    pub fn selected_mailbox(&self) -> Option<MailboxRef> {
        self.inner.selection.borrow().selected_mailbox().cloned()
    }

    pub fn selected_message(&self) -> Option<MessageKey> {
        self.inner.selection.borrow().selected_message().cloned()
    }

    pub fn body(&self) -> BodyState {
        self.inner.selection.borrow().body().clone()
    }

    pub fn is_body_loading(&self) -> bool {
        self.inner.selection.borrow().is_loading()
    }

    pub fn login_step(&self) -> LoginStep {
        self.inner.login.borrow().step().clone()
    }

    pub fn login_flow(&self) -> LoginFlow {
        self.inner.login.borrow().clone()
    }
}
