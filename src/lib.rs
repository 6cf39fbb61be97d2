pub mod backend;
pub mod cli;
pub mod config;
pub mod error;
pub mod login;
pub mod session;

pub use config::SessionConfig;
pub use error::{SessionError, SessionResult};
pub use session::{Session, SessionUpdate};
