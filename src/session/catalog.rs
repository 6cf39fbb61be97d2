//! Mailbox catalog: one flattened, selectable list of mailboxes across all
//! active accounts, with display labels and canonical ordering.

use crate::backend::{AccountId, MailboxRef};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Hierarchy separators servers commonly use after a namespace marker
const SEPARATORS: &[char] = &['/', '.'];

/// Mailbox classification used for icon and sort priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MailboxKind {
    Inbox,
    Sent,
    Trash,
    Drafts,
    Other,
}

impl MailboxKind {
    /// Classify a mailbox by its raw name and display label
    pub fn classify(name: &str, label: &str) -> Self {
        if name.eq_ignore_ascii_case("INBOX") {
            return MailboxKind::Inbox;
        }
        match label.to_lowercase().as_str() {
            "inbox" => MailboxKind::Inbox,
            "sent" | "sent mail" | "sent items" | "sent messages" => MailboxKind::Sent,
            "trash" | "bin" | "deleted items" | "deleted messages" => MailboxKind::Trash,
            "drafts" => MailboxKind::Drafts,
            _ => MailboxKind::Other,
        }
    }

    /// Position in the canonical order; `None` sorts alphabetically after
    pub fn rank(&self) -> Option<usize> {
        match self {
            MailboxKind::Inbox => Some(0),
            MailboxKind::Sent => Some(1),
            MailboxKind::Trash => Some(2),
            MailboxKind::Drafts => Some(3),
            MailboxKind::Other => None,
        }
    }

    /// Icon name, open variant when selected
    pub fn icon(&self, selected: bool) -> &'static str {
        match (self, selected) {
            (MailboxKind::Inbox, false) => "envelope",
            (MailboxKind::Inbox, true) => "envelope-open",
            (MailboxKind::Sent, false) => "paper-plane",
            (MailboxKind::Sent, true) => "paper-plane-solid",
            (MailboxKind::Trash, false) => "trash-can",
            (MailboxKind::Trash, true) => "trash-alt",
            (MailboxKind::Drafts, false) => "file",
            (MailboxKind::Drafts, true) => "file-solid",
            (MailboxKind::Other, false) => "folder",
            (MailboxKind::Other, true) => "folder-open",
        }
    }
}

/// Turns backend mailbox names into display labels
#[derive(Debug, Clone)]
pub struct MailboxNormalizer {
    markers: Vec<String>,
}

impl Default for MailboxNormalizer {
    fn default() -> Self {
        Self::new(vec!["[Gmail]".to_string(), "[Google Mail]".to_string()])
    }
}

impl MailboxNormalizer {
    pub fn new(markers: Vec<String>) -> Self {
        Self { markers }
    }

    /// Whether `name` is a bare namespace grouping with no messages of its own
    pub fn is_namespace_marker(&self, name: &str) -> bool {
        self.markers.iter().any(|m| m == name)
    }

    /// Display label for a mailbox, or `None` if the entry must be elided
    pub fn label(&self, name: &str) -> Option<String> {
        if self.is_namespace_marker(name) {
            return None;
        }
        if name.eq_ignore_ascii_case("INBOX") {
            return Some("Inbox".to_string());
        }
        for marker in &self.markers {
            if let Some(rest) = name.strip_prefix(marker.as_str()) {
                let rest = rest.trim_start_matches(SEPARATORS);
                if !rest.is_empty() {
                    return Some(rest.to_string());
                }
            }
        }
        Some(name.to_string())
    }
}

/// One selectable catalog entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailboxEntry {
    pub mailbox: MailboxRef,
    pub label: String,
    pub kind: MailboxKind,
}

impl MailboxEntry {
    pub fn account(&self) -> AccountId {
        self.mailbox.account
    }

    pub fn name(&self) -> &str {
        &self.mailbox.name
    }
}

fn canonical_order(a: &MailboxEntry, b: &MailboxEntry) -> Ordering {
    match (a.kind.rank(), b.kind.rank()) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.label.cmp(&b.label)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a
            .label
            .to_lowercase()
            .cmp(&b.label.to_lowercase())
            .then_with(|| a.mailbox.name.cmp(&b.mailbox.name)),
    }
}

/// Per-account slices of the catalog, flattened in account order
#[derive(Debug, Clone, Default)]
pub struct MailboxCatalog {
    normalizer: MailboxNormalizer,
    slices: IndexMap<AccountId, Vec<MailboxEntry>>,
}

impl MailboxCatalog {
    pub fn new(normalizer: MailboxNormalizer) -> Self {
        Self {
            normalizer,
            slices: IndexMap::new(),
        }
    }

    /// Replace one account's slice with a freshly fetched name list.
    /// Returns true when the visible slice changed.
    pub fn replace_account(&mut self, account: AccountId, names: &[String]) -> bool {
        let mut entries: Vec<MailboxEntry> = Vec::with_capacity(names.len());
        for name in names {
            let Some(label) = self.normalizer.label(name) else {
                continue;
            };
            if entries.iter().any(|e| e.mailbox.name == *name) {
                continue;
            }
            entries.push(MailboxEntry {
                kind: MailboxKind::classify(name, &label),
                mailbox: MailboxRef::new(account, name.clone()),
                label,
            });
        }
        entries.sort_by(canonical_order);

        let changed = self.slices.get(&account) != Some(&entries);
        self.slices.insert(account, entries);
        changed
    }

    /// Drop an account's slice. Returns true if it existed.
    pub fn remove_account(&mut self, account: AccountId) -> bool {
        self.slices.shift_remove(&account).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MailboxEntry> {
        self.slices.values().flatten()
    }

    pub fn entries_for(&self, account: AccountId) -> &[MailboxEntry] {
        self.slices
            .get(&account)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn find(&self, mailbox: &MailboxRef) -> Option<&MailboxEntry> {
        self.entries_for(mailbox.account)
            .iter()
            .find(|e| e.mailbox == *mailbox)
    }

    pub fn contains(&self, mailbox: &MailboxRef) -> bool {
        self.find(mailbox).is_some()
    }

    /// The account's inbox, if it has one
    pub fn inbox(&self, account: AccountId) -> Option<&MailboxEntry> {
        self.entries_for(account)
            .iter()
            .find(|e| e.kind == MailboxKind::Inbox)
    }

    pub fn len(&self) -> usize {
        self.slices.values().map(|v| v.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
