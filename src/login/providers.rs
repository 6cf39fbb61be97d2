use crate::error::{SessionError, SessionResult};
use serde::{Deserialize, Serialize};

/// Mail providers offered on the login screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provider {
    Gmail,
    Outlook,
    Yahoo,
    ICloud,
    Aol,
    Custom,
}

impl Provider {
    pub const ALL: [Provider; 6] = [
        Provider::Gmail,
        Provider::Outlook,
        Provider::Yahoo,
        Provider::ICloud,
        Provider::Aol,
        Provider::Custom,
    ];

    /// Name passed to the backend and shown on the provider button
    pub fn name(&self) -> &'static str {
        match self {
            Provider::Gmail => "Gmail",
            Provider::Outlook => "Outlook.com",
            Provider::Yahoo => "Yahoo",
            Provider::ICloud => "iCloud",
            Provider::Aol => "AOL",
            Provider::Custom => "Custom",
        }
    }

    pub fn from_name(name: &str) -> SessionResult<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.name().eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| SessionError::UnknownProvider(name.to_string()))
    }

    /// IMAP server and port, `None` for Custom
    pub fn imap_server(&self) -> Option<(&'static str, u16)> {
        match self {
            Provider::Gmail => Some(("imap.gmail.com", 993)),
            Provider::Outlook => Some(("outlook.office365.com", 993)),
            Provider::Yahoo => Some(("imap.mail.yahoo.com", 993)),
            Provider::ICloud => Some(("imap.mail.me.com", 993)),
            Provider::Aol => Some(("imap.aol.com", 993)),
            Provider::Custom => None,
        }
    }

    /// Endpoint string handed to `LoginUser`
    pub fn endpoint(&self) -> Option<String> {
        self.imap_server()
            .map(|(host, port)| format!("{}:{}", host, port))
    }

    /// Login goes through the external browser flow
    pub fn uses_oauth(&self) -> bool {
        matches!(self, Provider::Gmail | Provider::Outlook)
    }

    /// User types the endpoint themselves
    pub fn needs_endpoint(&self) -> bool {
        matches!(self, Provider::Custom)
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
