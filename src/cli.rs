use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::rc::Rc;

use crate::backend::{MockBackend, PushEvent};
use crate::config::SessionConfig;
use crate::login::Provider;
use crate::session::display::{format_short_date, sender_display};
use crate::session::{BodyState, Session};

/// Mailview - multi-account mail session engine
#[derive(Parser)]
#[command(name = "mailview")]
#[command(about = "Session and sync layer for a multi-account mail viewer")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Configuration file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the number of messages fetched per page
    #[arg(long, global = true)]
    pub page_size: Option<usize>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// List the built-in mail providers
    Providers,

    /// Print the effective configuration as TOML
    Config,

    /// Run a session against the in-memory backend
    Demo,
}

/// Command-line interface handler
pub struct CliHandler {
    config: SessionConfig,
}

impl CliHandler {
    /// Load the config file and apply command-line overrides
    pub fn new(config_path: Option<PathBuf>, page_size: Option<usize>) -> Result<Self> {
        let mut config = SessionConfig::load_or_default(config_path.as_deref())?;
        if let Some(page_size) = page_size {
            config.page_size = page_size;
        }
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Handle CLI commands
    pub async fn handle_command(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Providers => self.handle_providers(),
            Commands::Config => self.handle_config(),
            Commands::Demo => self.handle_demo().await,
        }
    }

    fn handle_providers(&self) -> Result<()> {
        println!("Mail providers");
        println!("==============\n");
        for provider in Provider::ALL {
            let endpoint = provider
                .endpoint()
                .unwrap_or_else(|| "(enter IMAP URL)".to_string());
            let method = if provider.uses_oauth() { "OAuth" } else { "password" };
            println!("  {:<12} {:<28} {}", provider.name(), endpoint, method);
        }
        Ok(())
    }

    fn handle_config(&self) -> Result<()> {
        if let Some(path) = SessionConfig::default_path() {
            println!("# default location: {}", path.display());
        }
        print!("{}", self.config.to_toml()?);
        Ok(())
    }

    async fn handle_demo(&self) -> Result<()> {
        let (backend, account) = MockBackend::with_demo_data();
        backend.set_logged_in(account, false);
        let backend = Rc::new(backend);

        let session = Session::from_config(backend.clone(), self.config.clone())?;
        println!("Restored view: {}", session.view().as_str());
        session.start();

        let accounts = session.initialize().await?;
        println!("Accounts after startup: {}", accounts.len());
        println!("View: {}", session.view().as_str());

        session.choose_provider(Provider::Custom).await?;
        session.with_login(|flow| -> Result<()> {
            flow.set_endpoint("imap.gmail.com:993")?;
            flow.set_email("demo@example.com")?;
            flow.set_password("demo")?;
            Ok(())
        })?;
        let outcome = session.submit_login().await?;
        println!("Login: {:?}", outcome);
        session.process_pending_events().await;

        println!("\nMailboxes");
        for entry in session.mailboxes() {
            println!("  [{}] {}", entry.kind.icon(false), entry.label);
        }

        let inbox = session
            .inbox(account)
            .ok_or_else(|| anyhow!("demo account has no inbox"))?;
        session.select_mailbox(inbox.clone()).await?;
        print_page(&session, &inbox, 5);

        let arrived = backend.generate_messages(account, &inbox.name, 3);
        println!("\n{} new message(s) arrived on the server", arrived.len());
        backend.emit(PushEvent::MessagesUpdated(account, inbox.name.clone()));
        session.process_pending_events().await;
        print_page(&session, &inbox, 5);

        if let Some(first) = session.messages(&inbox).first() {
            session.select_message(first.key(account)).await?;
            if let BodyState::Loaded { html } = session.body() {
                println!("\nBody of {}: {}", first.uid, html);
            }
        }

        session.logout(account).await?;
        session.process_pending_events().await;
        println!("\nLogged out. View: {}", session.view().as_str());
        session.dispose();
        Ok(())
    }
}

fn print_page(session: &Session, mailbox: &crate::backend::MailboxRef, rows: usize) {
    println!("\n{} ({} cached)", mailbox, session.cursor(mailbox));
    for summary in session.messages(mailbox).iter().take(rows) {
        println!(
            "  {:>4}  {:<10} {:<12} {}",
            summary.uid,
            format_short_date(summary.date()),
            sender_display(summary),
            summary.subject()
        );
    }
}
