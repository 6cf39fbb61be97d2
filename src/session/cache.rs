//! Per-mailbox paginated message cache.
//!
//! Each mailbox keeps an ordered map keyed by UID. Insertion position follows
//! the order the backend listed messages in, so a head refresh can slot newly
//! arrived messages in front of the ones already cached. The page cursor is
//! the number of cached summaries and is never stored separately.

use crate::backend::{AccountId, BackendError, BackendResult, MailboxRef, MessageKey, MessageSummary};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Why a page is being requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    /// Next page at the cursor (initial load, scroll)
    NextPage,
    /// Head refetch after the server reported changes
    Refresh,
}

/// Fetch bookkeeping for one mailbox
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    Idle,
    Fetching { ticket: u64, kind: FetchKind },
    /// Server reported changes; a head refresh is owed once `in_flight`
    /// (a fetch that started before the report) has landed.
    Stale { in_flight: Option<u64> },
}

impl PageState {
    fn in_flight(&self) -> Option<u64> {
        match self {
            PageState::Idle => None,
            PageState::Fetching { ticket, .. } => Some(*ticket),
            PageState::Stale { in_flight } => *in_flight,
        }
    }
}

/// A page request handed out by the cache. Must be returned through
/// [`MessagePageCache::complete`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTicket {
    pub id: u64,
    pub mailbox: MailboxRef,
    pub offset: usize,
    pub limit: usize,
    pub kind: FetchKind,
}

/// Result of applying a page response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Merged { added: usize, returned: usize },
    /// Backend failed; cached state kept as last known good
    Failed(BackendError),
    /// Response belongs to a purged mailbox or superseded ticket
    Discarded,
}

#[derive(Debug, Clone)]
struct MailboxPages {
    messages: IndexMap<u32, MessageSummary>,
    state: PageState,
    last_error: Option<BackendError>,
}

impl Default for MailboxPages {
    fn default() -> Self {
        Self {
            messages: IndexMap::new(),
            state: PageState::Idle,
            last_error: None,
        }
    }
}

impl MailboxPages {
    /// Merge a backend page by key. Returns the number of new entries.
    fn merge(&mut self, mailbox: &MailboxRef, offset: usize, page: Vec<MessageSummary>) -> usize {
        let mut anchor = offset.min(self.messages.len());
        let mut added = 0;
        for summary in page {
            if summary.mailbox_name != mailbox.name {
                warn!(
                    "Dropping summary uid {} listed under {} while fetching {}",
                    summary.uid, summary.mailbox_name, mailbox
                );
                continue;
            }
            match self.messages.get_index_of(&summary.uid) {
                Some(index) => anchor = index + 1,
                None => {
                    self.messages.shift_insert(anchor, summary.uid, summary);
                    anchor += 1;
                    added += 1;
                }
            }
        }
        added
    }
}

#[derive(Debug, Clone)]
struct CachedBody {
    html: String,
    fetched_at: Instant,
}

/// Session-scoped message bodies with a freshness window
#[derive(Debug, Clone)]
pub struct BodyCache {
    ttl: Duration,
    entries: HashMap<MessageKey, CachedBody>,
}

impl BodyCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, key: &MessageKey) -> Option<&str> {
        self.entries
            .get(key)
            .filter(|b| b.fetched_at.elapsed() < self.ttl)
            .map(|b| b.html.as_str())
    }

    pub fn insert(&mut self, key: MessageKey, html: String) {
        self.entries.insert(
            key,
            CachedBody {
                html,
                fetched_at: Instant::now(),
            },
        );
    }

    pub fn purge_account(&mut self, account: AccountId) {
        self.entries.retain(|key, _| key.account != account);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Message summaries per (account, mailbox), retained for the session
#[derive(Debug, Clone)]
pub struct MessagePageCache {
    page_size: usize,
    mailboxes: HashMap<MailboxRef, MailboxPages>,
    next_ticket: u64,
    bodies: BodyCache,
}

impl MessagePageCache {
    pub fn new(page_size: usize, body_ttl: Duration) -> Self {
        Self {
            page_size: page_size.max(1),
            mailboxes: HashMap::new(),
            next_ticket: 0,
            bodies: BodyCache::new(body_ttl),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    fn issue(&mut self, mailbox: &MailboxRef, offset: usize, kind: FetchKind) -> PageTicket {
        self.next_ticket += 1;
        PageTicket {
            id: self.next_ticket,
            mailbox: mailbox.clone(),
            offset,
            limit: self.page_size,
            kind,
        }
    }

    /// Start fetching the page at the cursor. Returns `None` when a fetch is
    /// already in flight for this mailbox (the call coalesces into it). A
    /// mailbox with an owed refresh gets its head refetched first.
    pub fn begin_next_page(&mut self, mailbox: &MailboxRef) -> Option<PageTicket> {
        let pages = self.mailboxes.entry(mailbox.clone()).or_default();
        let (offset, kind) = match pages.state {
            PageState::Idle => (pages.messages.len(), FetchKind::NextPage),
            PageState::Stale { in_flight: None } => (0, FetchKind::Refresh),
            PageState::Fetching { .. } | PageState::Stale { in_flight: Some(_) } => {
                debug!("Page fetch for {} already in flight, coalescing", mailbox);
                return None;
            }
        };
        let ticket = self.issue(mailbox, offset, kind);
        if let Some(pages) = self.mailboxes.get_mut(mailbox) {
            pages.state = PageState::Fetching {
                ticket: ticket.id,
                kind,
            };
        }
        Some(ticket)
    }

    /// Start a head refetch for a mailbox the server reported as changed.
    /// Mailboxes that were never opened have nothing to refresh. If a fetch is
    /// in flight the mailbox is marked stale and `None` is returned; the caller
    /// refreshes once that fetch completes.
    pub fn begin_refresh(&mut self, mailbox: &MailboxRef) -> Option<PageTicket> {
        let pages = self.mailboxes.get_mut(mailbox)?;
        match pages.state {
            PageState::Idle | PageState::Stale { in_flight: None } => {}
            PageState::Fetching { ticket, .. } => {
                debug!("{} changed during fetch {}, refresh owed", mailbox, ticket);
                pages.state = PageState::Stale {
                    in_flight: Some(ticket),
                };
                return None;
            }
            PageState::Stale { in_flight: Some(_) } => return None,
        }
        let ticket = self.issue(mailbox, 0, FetchKind::Refresh);
        if let Some(pages) = self.mailboxes.get_mut(mailbox) {
            pages.state = PageState::Fetching {
                ticket: ticket.id,
                kind: FetchKind::Refresh,
            };
        }
        Some(ticket)
    }

    /// Apply a page response
    pub fn complete(
        &mut self,
        ticket: &PageTicket,
        result: BackendResult<Vec<MessageSummary>>,
    ) -> FetchOutcome {
        let Some(pages) = self.mailboxes.get_mut(&ticket.mailbox) else {
            debug!("Discarding page {} for purged mailbox {}", ticket.id, ticket.mailbox);
            return FetchOutcome::Discarded;
        };
        if pages.state.in_flight() != Some(ticket.id) {
            debug!("Discarding superseded page {} for {}", ticket.id, ticket.mailbox);
            return FetchOutcome::Discarded;
        }

        pages.state = match pages.state {
            PageState::Stale { .. } => PageState::Stale { in_flight: None },
            _ => PageState::Idle,
        };

        match result {
            Ok(page) => {
                let returned = page.len();
                let added = pages.merge(&ticket.mailbox, ticket.offset, page);
                pages.last_error = None;
                debug!(
                    "{} page at offset {}: {} returned, {} new, cursor {}",
                    ticket.mailbox,
                    ticket.offset,
                    returned,
                    added,
                    pages.messages.len()
                );
                FetchOutcome::Merged { added, returned }
            }
            Err(err) => {
                warn!("Page fetch for {} failed: {}", ticket.mailbox, err);
                pages.last_error = Some(err.clone());
                FetchOutcome::Failed(err)
            }
        }
    }

    /// Forget every mailbox, message and body of an account, including
    /// in-flight bookkeeping, so late responses are discarded.
    pub fn purge_account(&mut self, account: AccountId) -> usize {
        let before = self.mailboxes.len();
        self.mailboxes.retain(|mailbox, _| mailbox.account != account);
        self.bodies.purge_account(account);
        before - self.mailboxes.len()
    }

    /// Drop mailboxes of `account` that are no longer in `keep`
    pub fn retain_mailboxes(&mut self, account: AccountId, keep: &[MailboxRef]) {
        self.mailboxes
            .retain(|mailbox, _| mailbox.account != account || keep.contains(mailbox));
    }

    /// Page cursor: cached message count, next fetch offset
    pub fn cursor(&self, mailbox: &MailboxRef) -> usize {
        self.mailboxes
            .get(mailbox)
            .map(|p| p.messages.len())
            .unwrap_or(0)
    }

    pub fn state(&self, mailbox: &MailboxRef) -> PageState {
        self.mailboxes
            .get(mailbox)
            .map(|p| p.state)
            .unwrap_or(PageState::Idle)
    }

    pub fn is_fetching(&self, mailbox: &MailboxRef) -> bool {
        self.state(mailbox).in_flight().is_some()
    }

    pub fn is_stale(&self, mailbox: &MailboxRef) -> bool {
        matches!(self.state(mailbox), PageState::Stale { .. })
    }

    pub fn has_mailbox(&self, mailbox: &MailboxRef) -> bool {
        self.mailboxes.contains_key(mailbox)
    }

    pub fn messages(&self, mailbox: &MailboxRef) -> Vec<&MessageSummary> {
        self.mailboxes
            .get(mailbox)
            .map(|p| p.messages.values().collect())
            .unwrap_or_default()
    }

    pub fn summary(&self, key: &MessageKey) -> Option<&MessageSummary> {
        self.mailboxes
            .get(&key.mailbox_ref())
            .and_then(|p| p.messages.get(&key.uid))
    }

    pub fn last_error(&self, mailbox: &MailboxRef) -> Option<&BackendError> {
        self.mailboxes
            .get(mailbox)
            .and_then(|p| p.last_error.as_ref())
    }

    pub fn mailbox_count(&self) -> usize {
        self.mailboxes.len()
    }

    pub fn bodies(&self) -> &BodyCache {
        &self.bodies
    }

    pub fn bodies_mut(&mut self) -> &mut BodyCache {
        &mut self.bodies
    }
}
