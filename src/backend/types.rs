use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque account handle issued by the backend at login
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(i64);

impl AccountId {
    pub fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A mailbox as seen by one account
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MailboxRef {
    pub account: AccountId,
    pub name: String,
}

impl MailboxRef {
    pub fn new<S: Into<String>>(account: AccountId, name: S) -> Self {
        Self {
            account,
            name: name.into(),
        }
    }

    /// Key for the message with `uid` in this mailbox
    pub fn message(&self, uid: u32) -> MessageKey {
        MessageKey {
            account: self.account,
            mailbox: self.name.clone(),
            uid,
        }
    }
}

impl fmt::Display for MailboxRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.account, self.name)
    }
}

/// Unique message key. UIDs only compare within one mailbox.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageKey {
    pub account: AccountId,
    pub mailbox: String,
    pub uid: u32,
}

impl MessageKey {
    pub fn mailbox_ref(&self) -> MailboxRef {
        MailboxRef::new(self.account, self.mailbox.clone())
    }
}

impl fmt::Display for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}#{}", self.account, self.mailbox, self.uid)
    }
}

/// Envelope address
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Address {
    pub personal_name: String,
    pub mailbox_name: String,
    pub host_name: String,
}

impl Address {
    pub fn new<S: Into<String>>(personal_name: S, email: &str) -> Self {
        let (mailbox_name, host_name) = match email.split_once('@') {
            Some((local, host)) => (local.to_string(), host.to_string()),
            None => (email.to_string(), String::new()),
        };
        Self {
            personal_name: personal_name.into(),
            mailbox_name,
            host_name,
        }
    }

    pub fn email(&self) -> String {
        if self.host_name.is_empty() {
            self.mailbox_name.clone()
        } else {
            format!("{}@{}", self.mailbox_name, self.host_name)
        }
    }
}

/// Message metadata independent of body content
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Envelope {
    pub date: Option<DateTime<Utc>>,
    pub subject: String,
    pub from: Vec<Address>,
    pub sender: Vec<Address>,
    pub message_id: String,
}

/// Message summary as listed by `GetEmailsForMailbox`. Carries no body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSummary {
    pub uid: u32,
    #[serde(default)]
    pub envelope: Option<Envelope>,
    pub mailbox_name: String,
}

impl MessageSummary {
    pub fn new<S: Into<String>>(uid: u32, mailbox_name: S, envelope: Envelope) -> Self {
        Self {
            uid,
            envelope: Some(envelope),
            mailbox_name: mailbox_name.into(),
        }
    }

    pub fn key(&self, account: AccountId) -> MessageKey {
        MessageKey {
            account,
            mailbox: self.mailbox_name.clone(),
            uid: self.uid,
        }
    }

    pub fn subject(&self) -> &str {
        self.envelope
            .as_ref()
            .map(|e| e.subject.as_str())
            .unwrap_or("")
    }

    pub fn date(&self) -> Option<DateTime<Utc>> {
        self.envelope.as_ref().and_then(|e| e.date)
    }
}
