//! Formatting for message list rows

use crate::backend::{Address, MessageSummary};
use chrono::{DateTime, Utc};

const UNKNOWN_SENDER: &str = "Unknown Sender";

fn address_display(address: &Address) -> Option<String> {
    if !address.personal_name.trim().is_empty() {
        return Some(address.personal_name.trim().to_string());
    }
    let email = address.email();
    if email.is_empty() {
        None
    } else {
        Some(email)
    }
}

/// Name shown in the sender column
pub fn sender_display(summary: &MessageSummary) -> String {
    let Some(envelope) = summary.envelope.as_ref() else {
        return UNKNOWN_SENDER.to_string();
    };
    let named = envelope
        .sender
        .first()
        .filter(|a| !a.personal_name.trim().is_empty())
        .or_else(|| {
            envelope
                .from
                .first()
                .filter(|a| !a.personal_name.trim().is_empty())
        });
    named
        .or_else(|| envelope.sender.first())
        .or_else(|| envelope.from.first())
        .and_then(address_display)
        .unwrap_or_else(|| UNKNOWN_SENDER.to_string())
}

/// Numeric short date, e.g. `3/7/24`
pub fn format_short_date(date: Option<DateTime<Utc>>) -> String {
    date.map(|d| d.format("%-m/%-d/%y").to_string())
        .unwrap_or_default()
}
