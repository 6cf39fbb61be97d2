use mailview::backend::mock::CallKind;
use mailview::backend::{AccountId, BackendError, MailboxRef, MockBackend, MockCall, PushEvent};
use mailview::session::{
    AppView, BodyFetchPolicy, BodyState, FetchOutcome, FileStore, MemoryStore, MessageSelection,
    PageFetch, PageState,
};
use mailview::{Session, SessionConfig, SessionError, SessionUpdate};
use std::collections::HashSet;
use std::rc::Rc;
use tempfile::TempDir;
use tokio::sync::oneshot;

/// Backend where only account 7 is still logged in
fn backend_with_account_seven() -> (Rc<MockBackend>, AccountId) {
    let backend = MockBackend::new();
    for i in 0..7 {
        let id = backend.add_account("imap.example.com:993", &format!("user{}@example.com", i), "pw");
        backend.set_logged_in(id, false);
    }
    let account = backend.add_account("imap.example.com:993", "seven@example.com", "pw");
    assert_eq!(account, AccountId::new(7));
    (Rc::new(backend), account)
}

async fn started_session(backend: &Rc<MockBackend>) -> Session {
    let session = Session::in_memory(backend.clone());
    session.start();
    session.initialize().await.unwrap();
    session
}

fn assert_no_duplicates(session: &Session, mailbox: &MailboxRef) {
    let uids: Vec<u32> = session.messages(mailbox).iter().map(|m| m.uid).collect();
    let unique: HashSet<u32> = uids.iter().copied().collect();
    assert_eq!(uids.len(), unique.len(), "duplicate uids in {:?}", uids);
    assert_eq!(session.cursor(mailbox), uids.len());
}

fn drain(rx: &mut tokio::sync::mpsc::UnboundedReceiver<SessionUpdate>) -> Vec<SessionUpdate> {
    let mut updates = Vec::new();
    while let Ok(update) = rx.try_recv() {
        updates.push(update);
    }
    updates
}

/// Account 7 INBOX: first page gives 20, a push with 3 new messages gives 23
#[tokio::test]
async fn test_push_refresh_merges_new_messages() {
    let (backend, account) = backend_with_account_seven();
    backend.generate_messages(account, "INBOX", 40);
    let session = started_session(&backend).await;
    assert_eq!(session.active_accounts(), vec![account]);

    let inbox = MailboxRef::new(account, "INBOX");
    assert!(session.select_mailbox(inbox.clone()).await.unwrap());
    assert_eq!(session.cursor(&inbox), 20);

    backend.generate_messages(account, "INBOX", 3);
    backend.clear_calls();
    backend.emit(PushEvent::MessagesUpdated(account, "INBOX".to_string()));
    assert_eq!(session.process_pending_events().await, 1);

    assert_eq!(
        backend.calls(),
        vec![MockCall::GetEmailsForMailbox {
            account,
            mailbox: "INBOX".to_string(),
            offset: 0,
            limit: 20,
        }]
    );
    assert_eq!(session.cursor(&inbox), 23);
    let head: Vec<u32> = session.messages(&inbox).iter().take(4).map(|m| m.uid).collect();
    assert_eq!(head, vec![43, 42, 41, 40]);
    assert_no_duplicates(&session, &inbox);
}

#[tokio::test]
async fn test_concurrent_page_requests_coalesce() {
    let (backend, account) = backend_with_account_seven();
    backend.generate_messages(account, "INBOX", 30);
    let session = started_session(&backend).await;
    let inbox = MailboxRef::new(account, "INBOX");

    backend.clear_calls();
    let gate = backend.gate(CallKind::GetEmailsForMailbox);
    let (first, second, _) = tokio::join!(
        session.fetch_next_page(&inbox),
        session.fetch_next_page(&inbox),
        async {
            tokio::task::yield_now().await;
            gate.release();
        }
    );

    let results = [first.unwrap(), second.unwrap()];
    assert!(results.contains(&PageFetch::Completed(FetchOutcome::Merged {
        added: 20,
        returned: 20
    })));
    assert!(results.contains(&PageFetch::Coalesced));
    assert_eq!(backend.call_count(CallKind::GetEmailsForMailbox), 1);
}

#[tokio::test]
async fn test_paging_never_duplicates() {
    let (backend, account) = backend_with_account_seven();
    backend.generate_messages(account, "INBOX", 50);
    let session = started_session(&backend).await;
    let inbox = MailboxRef::new(account, "INBOX");

    for round in 0..6 {
        if round % 2 == 1 {
            // Arrivals shift server offsets under the cursor
            backend.generate_messages(account, "INBOX", 4);
        }
        session.fetch_next_page(&inbox).await.unwrap();
        assert_no_duplicates(&session, &inbox);
    }
}

#[tokio::test]
async fn test_invalidate_then_page_never_shrinks() {
    let (backend, account) = backend_with_account_seven();
    backend.generate_messages(account, "INBOX", 25);
    let session = started_session(&backend).await;
    let inbox = MailboxRef::new(account, "INBOX");

    session.fetch_next_page(&inbox).await.unwrap();
    let before = session.cursor(&inbox);

    backend.generate_messages(account, "INBOX", 2);
    session.invalidate(&inbox).await.unwrap();
    let after_invalidate = session.cursor(&inbox);
    assert!(after_invalidate >= before);

    session.fetch_next_page(&inbox).await.unwrap();
    assert!(session.cursor(&inbox) >= after_invalidate);
    assert_eq!(session.cursor(&inbox), 27);
    assert_no_duplicates(&session, &inbox);
}

#[tokio::test]
async fn test_invalidate_of_unopened_mailbox_is_skipped() {
    let (backend, account) = backend_with_account_seven();
    let session = started_session(&backend).await;
    let inbox = MailboxRef::new(account, "INBOX");

    backend.clear_calls();
    assert_eq!(session.invalidate(&inbox).await.unwrap(), PageFetch::Skipped);
    backend.emit(PushEvent::MessagesUpdated(account, "INBOX".to_string()));
    session.process_pending_events().await;
    assert_eq!(backend.call_count(CallKind::GetEmailsForMailbox), 0);
}

#[tokio::test]
async fn test_change_during_fetch_refreshes_after() {
    let (backend, account) = backend_with_account_seven();
    backend.generate_messages(account, "INBOX", 30);
    let session = started_session(&backend).await;
    let inbox = MailboxRef::new(account, "INBOX");

    backend.clear_calls();
    let gate = backend.gate(CallKind::GetEmailsForMailbox);
    let (page, refresh) = tokio::join!(session.fetch_next_page(&inbox), async {
        tokio::task::yield_now().await;
        let refresh = session.invalidate(&inbox).await;
        gate.release();
        refresh
    });

    assert!(matches!(
        page.unwrap(),
        PageFetch::Completed(FetchOutcome::Merged { .. })
    ));
    assert_eq!(refresh.unwrap(), PageFetch::Coalesced);
    // The owed head refresh ran once the first page landed
    assert_eq!(backend.call_count(CallKind::GetEmailsForMailbox), 2);
    assert_eq!(session.page_state(&inbox), PageState::Idle);
    assert_no_duplicates(&session, &inbox);
}

#[tokio::test]
async fn test_select_mailbox_twice_fetches_once() {
    let (backend, account) = backend_with_account_seven();
    backend.generate_messages(account, "INBOX", 5);
    let session = started_session(&backend).await;
    let inbox = MailboxRef::new(account, "INBOX");

    backend.clear_calls();
    let (first, second) = tokio::join!(
        session.select_mailbox(inbox.clone()),
        session.select_mailbox(inbox.clone())
    );
    // Exactly one of the two calls changed the selection
    assert_ne!(first.unwrap(), second.unwrap());
    assert!(!session.select_mailbox(inbox.clone()).await.unwrap());
    assert_eq!(backend.call_count(CallKind::GetEmailsForMailbox), 1);
}

#[tokio::test]
async fn test_switching_mailboxes_reuses_cache() {
    let (backend, account) = backend_with_account_seven();
    backend.set_mailboxes(account, &["INBOX", "Sent"]);
    backend.generate_messages(account, "INBOX", 5);
    backend.generate_messages(account, "Sent", 5);
    let session = started_session(&backend).await;
    let inbox = MailboxRef::new(account, "INBOX");
    let sent = MailboxRef::new(account, "Sent");

    session.select_mailbox(inbox.clone()).await.unwrap();
    session.select_mailbox(sent.clone()).await.unwrap();
    backend.clear_calls();
    session.select_mailbox(inbox.clone()).await.unwrap();

    assert_eq!(backend.call_count(CallKind::GetEmailsForMailbox), 0);
    assert_eq!(session.cursor(&inbox), 5);
    assert_eq!(session.selected_mailbox(), Some(inbox));
}

/// Under the supersede policy, selecting A then B while A's body is in flight shows B
#[tokio::test]
async fn test_late_body_does_not_overwrite_newer_selection() {
    let (backend, account) = backend_with_account_seven();
    backend.generate_messages(account, "INBOX", 5);
    let config = SessionConfig {
        body_fetch_policy: BodyFetchPolicy::Supersede,
        ..SessionConfig::default()
    };
    let session = Session::new(backend.clone(), config, Box::new(MemoryStore::new()));
    session.start();
    session.initialize().await.unwrap();
    let inbox = MailboxRef::new(account, "INBOX");
    session.select_mailbox(inbox.clone()).await.unwrap();

    let a = inbox.message(1);
    let b = inbox.message(2);
    backend.set_body(&a, "<p>A</p>");
    backend.set_body(&b, "<p>B</p>");

    let gate_a = backend.gate(CallKind::GetEmailBody);
    let (b_done_tx, b_done_rx) = oneshot::channel::<()>();
    let (first, second, _) = tokio::join!(
        session.select_message(a.clone()),
        async {
            tokio::task::yield_now().await;
            let result = session.select_message(b.clone()).await;
            let _ = b_done_tx.send(());
            result
        },
        async {
            let _ = b_done_rx.await;
            gate_a.release();
        }
    );

    assert!(matches!(first.unwrap(), MessageSelection::Fetch(_)));
    assert!(matches!(second.unwrap(), MessageSelection::Fetch(_)));
    assert_eq!(session.selected_message(), Some(b));
    assert_eq!(
        session.body(),
        BodyState::Loaded {
            html: "<p>B</p>".to_string()
        }
    );
    assert_eq!(backend.call_count(CallKind::GetEmailBody), 2);
    assert!(!session.is_body_loading());
}

/// By default a click while a body is loading does nothing
#[tokio::test]
async fn test_click_while_loading_is_ignored_by_default() {
    let (backend, account) = backend_with_account_seven();
    backend.generate_messages(account, "INBOX", 5);
    let session = started_session(&backend).await;
    let inbox = MailboxRef::new(account, "INBOX");

    let gate = backend.gate(CallKind::GetEmailBody);
    let (first, second) = tokio::join!(session.select_message(inbox.message(1)), async {
        tokio::task::yield_now().await;
        let second = session.select_message(inbox.message(2)).await;
        gate.release();
        second
    });

    assert!(matches!(first.unwrap(), MessageSelection::Fetch(_)));
    assert_eq!(second.unwrap(), MessageSelection::Unchanged);
    assert_eq!(session.selected_message(), Some(inbox.message(1)));
    assert_eq!(backend.call_count(CallKind::GetEmailBody), 1);
    assert!(!session.is_body_loading());

    // Once the body landed the next click goes through
    assert!(matches!(
        session.select_message(inbox.message(2)).await.unwrap(),
        MessageSelection::Fetch(_)
    ));
}

#[tokio::test]
async fn test_reselecting_message_uses_body_cache() {
    let (backend, account) = backend_with_account_seven();
    backend.generate_messages(account, "INBOX", 5);
    let session = started_session(&backend).await;
    let inbox = MailboxRef::new(account, "INBOX");

    session.select_message(inbox.message(1)).await.unwrap();
    assert_eq!(
        session.select_message(inbox.message(1)).await.unwrap(),
        MessageSelection::Unchanged
    );
    session.select_message(inbox.message(2)).await.unwrap();
    assert_eq!(
        session.select_message(inbox.message(1)).await.unwrap(),
        MessageSelection::Cached
    );
    assert_eq!(backend.call_count(CallKind::GetEmailBody), 2);
}

#[tokio::test]
async fn test_body_failure_shows_placeholder() {
    let (backend, account) = backend_with_account_seven();
    let session = started_session(&backend).await;
    let inbox = MailboxRef::new(account, "INBOX");

    session.select_message(inbox.message(1)).await.unwrap();
    backend.fail_next(CallKind::GetEmailBody, BackendError::Timeout);
    session.select_message(inbox.message(2)).await.unwrap();

    assert!(matches!(session.body(), BodyState::Failed { .. }));
}

/// Logout purges the account, and later pushes for it do nothing
#[tokio::test]
async fn test_logout_purges_and_ignores_defunct_pushes() {
    let (backend, account) = backend_with_account_seven();
    backend.generate_messages(account, "INBOX", 25);
    let session = started_session(&backend).await;
    let inbox = MailboxRef::new(account, "INBOX");
    session.select_mailbox(inbox.clone()).await.unwrap();
    session.select_message(inbox.message(25)).await.unwrap();

    session.logout(account).await.unwrap();
    assert!(!session.is_account_active(account));
    assert!(!session.is_cached(&inbox));
    assert_eq!(session.cursor(&inbox), 0);
    assert!(session.mailboxes().is_empty());
    assert_eq!(session.selected_mailbox(), None);
    assert_eq!(session.body(), BodyState::Empty);
    assert_eq!(session.view(), AppView::Login);

    backend.clear_calls();
    backend.emit(PushEvent::MessagesUpdated(account, "INBOX".to_string()));
    backend.emit(PushEvent::MailboxesUpdated(account));
    // Includes the backend's own redundant UserLoggedOut
    assert!(session.process_pending_events().await >= 2);
    assert!(backend.calls().is_empty());
    assert!(!session.is_cached(&inbox));
}

#[tokio::test]
async fn test_logout_discards_in_flight_page() {
    let (backend, account) = backend_with_account_seven();
    backend.generate_messages(account, "INBOX", 25);
    let session = started_session(&backend).await;
    let inbox = MailboxRef::new(account, "INBOX");

    let gate = backend.gate(CallKind::GetEmailsForMailbox);
    let (page, _) = tokio::join!(session.fetch_next_page(&inbox), async {
        tokio::task::yield_now().await;
        session.logout(account).await.unwrap();
        gate.release();
    });

    assert_eq!(
        page.unwrap(),
        PageFetch::Completed(FetchOutcome::Discarded)
    );
    assert_eq!(session.cursor(&inbox), 0);
    assert_eq!(session.cached_mailbox_count(), 0);
}

#[tokio::test]
async fn test_logout_survives_backend_failure() {
    let (backend, account) = backend_with_account_seven();
    let session = started_session(&backend).await;

    backend.fail_next(CallKind::LogoutUser, BackendError::unavailable("down"));
    session.logout(account).await.unwrap();
    assert!(!session.is_account_active(account));
    assert!(matches!(
        session.logout(account).await,
        Err(SessionError::UnknownAccount(_))
    ));
}

#[tokio::test]
async fn test_backend_logout_push_purges_account() {
    let (backend, account) = backend_with_account_seven();
    let session = started_session(&backend).await;

    backend.emit(PushEvent::UserLoggedOut(account));
    session.process_pending_events().await;
    assert!(!session.is_account_active(account));
    assert_eq!(session.view(), AppView::Login);
}

#[tokio::test]
async fn test_gmail_namespace_hidden_from_catalog() {
    let (backend, account) = backend_with_account_seven();
    backend.set_mailboxes(account, &["[Gmail]", "[Gmail]/All Mail", "INBOX"]);
    let session = started_session(&backend).await;

    let entries = session.mailboxes();
    assert!(entries.iter().all(|e| e.name() != "[Gmail]"));
    let all_mail = entries
        .iter()
        .find(|e| e.name() == "[Gmail]/All Mail")
        .unwrap();
    assert_eq!(all_mail.label, "All Mail");
    assert_eq!(entries[0].label, "Inbox");
    assert_eq!(all_mail.account(), account);
}

#[tokio::test]
async fn test_catalog_refresh_is_idempotent() {
    let (backend, account) = backend_with_account_seven();
    backend.set_mailboxes(account, &["INBOX", "Sent", "Trash"]);
    let session = started_session(&backend).await;

    session.refresh_all().await.unwrap();
    backend.emit(PushEvent::MailboxesUpdated(account));
    session.process_pending_events().await;
    session.refresh_catalog(account).await.unwrap();
    assert_eq!(session.mailboxes().len(), 3);
}

#[tokio::test]
async fn test_removed_mailbox_is_dropped_from_cache() {
    let (backend, account) = backend_with_account_seven();
    backend.set_mailboxes(account, &["INBOX", "Receipts"]);
    backend.generate_messages(account, "Receipts", 3);
    let session = started_session(&backend).await;
    let receipts = MailboxRef::new(account, "Receipts");
    session.select_mailbox(receipts.clone()).await.unwrap();

    backend.set_mailboxes(account, &["INBOX"]);
    session.refresh_catalog(account).await.unwrap();
    assert!(!session.is_cached(&receipts));
    assert_eq!(session.selected_mailbox(), None);
}

#[tokio::test]
async fn test_refresh_all_reports_failure_but_keeps_catalog() {
    let (backend, account) = backend_with_account_seven();
    let session = started_session(&backend).await;

    backend.fail_next(CallKind::GetMailboxes, BackendError::Timeout);
    let result = session.refresh_all().await;
    assert!(matches!(result, Err(SessionError::BackendUnavailable(_))));
    assert_eq!(session.mailboxes().len(), 1);
    assert!(session.inbox(account).is_some());
}

#[tokio::test]
async fn test_background_failure_keeps_last_known_good() {
    let (backend, account) = backend_with_account_seven();
    backend.generate_messages(account, "INBOX", 10);
    let session = started_session(&backend).await;
    let inbox = MailboxRef::new(account, "INBOX");
    session.select_mailbox(inbox.clone()).await.unwrap();

    backend.fail_next(CallKind::GetEmailsForMailbox, BackendError::Timeout);
    backend.emit(PushEvent::MessagesUpdated(account, "INBOX".to_string()));
    session.process_pending_events().await;

    assert_eq!(session.cursor(&inbox), 10);
    assert_eq!(session.last_error(&inbox), Some(BackendError::Timeout));
}

#[tokio::test]
async fn test_updates_only_for_visible_mailbox() {
    let (backend, account) = backend_with_account_seven();
    backend.set_mailboxes(account, &["INBOX", "Sent"]);
    backend.generate_messages(account, "INBOX", 3);
    backend.generate_messages(account, "Sent", 3);
    let session = started_session(&backend).await;
    let mut updates = session.take_updates().unwrap();
    let inbox = MailboxRef::new(account, "INBOX");
    let sent = MailboxRef::new(account, "Sent");

    session.fetch_next_page(&sent).await.unwrap();
    session.select_mailbox(inbox.clone()).await.unwrap();
    drain(&mut updates);

    backend.emit(PushEvent::MessagesUpdated(account, "Sent".to_string()));
    session.process_pending_events().await;
    assert!(!drain(&mut updates).contains(&SessionUpdate::MessagesChanged(sent.clone())));
    assert_eq!(session.cursor(&sent), 3);

    backend.emit(PushEvent::MessagesUpdated(account, "INBOX".to_string()));
    session.process_pending_events().await;
    assert!(drain(&mut updates).contains(&SessionUpdate::MessagesChanged(inbox)));
}

#[tokio::test]
async fn test_initialize_drops_inactive_accounts() {
    let backend = Rc::new(MockBackend::new());
    let errored = backend.add_account("imap.example.com:993", "a@example.com", "pw");
    let logged_out = backend.add_account("imap.example.com:993", "b@example.com", "pw");
    let live = backend.add_account("imap.example.com:993", "c@example.com", "pw");
    backend.set_logged_in(logged_out, false);
    backend.fail_next(CallKind::IsLoggedIn, BackendError::Timeout);

    let session = Session::in_memory(backend.clone());
    assert_eq!(session.initialize().await.unwrap(), vec![live]);
    assert!(!session.is_account_active(errored));
    assert_eq!(session.mailboxes().len(), 1);
}

#[tokio::test]
async fn test_startup_with_no_accounts_shows_login() {
    let backend = Rc::new(MockBackend::new());
    let session = Session::in_memory(backend.clone());
    session.set_view(AppView::Mail);

    assert!(session.initialize().await.unwrap().is_empty());
    assert_eq!(session.view(), AppView::Login);
}

#[tokio::test]
async fn test_view_persists_across_sessions() {
    let temp_dir = TempDir::new().unwrap();
    let (backend, account) = backend_with_account_seven();
    backend.set_logged_in(account, false);

    let store = FileStore::in_dir(Some(temp_dir.path())).unwrap();
    let session = Session::new(backend.clone(), SessionConfig::default(), Box::new(store));
    session.initialize().await.unwrap();
    assert_eq!(session.view(), AppView::Login);
    session
        .login("imap.example.com:993", "seven@example.com", "pw")
        .await
        .unwrap();
    assert_eq!(session.view(), AppView::Mail);
    drop(session);

    let store = FileStore::in_dir(Some(temp_dir.path())).unwrap();
    let restored = Session::new(backend.clone(), SessionConfig::default(), Box::new(store));
    assert_eq!(restored.view(), AppView::Mail);
    restored.initialize().await.unwrap();
    assert_eq!(restored.view(), AppView::Mail);
}

#[tokio::test]
async fn test_state_dir_from_config_is_honored() {
    let temp_dir = TempDir::new().unwrap();
    let (backend, account) = backend_with_account_seven();
    backend.set_logged_in(account, false);
    let config = SessionConfig {
        state_dir: Some(temp_dir.path().to_path_buf()),
        ..SessionConfig::default()
    };

    let session = Session::from_config(backend.clone(), config.clone()).unwrap();
    session.initialize().await.unwrap();
    session
        .login("imap.example.com:993", "seven@example.com", "pw")
        .await
        .unwrap();
    assert!(temp_dir.path().join("state.toml").exists());
    drop(session);

    let restored = Session::from_config(backend.clone(), config).unwrap();
    assert_eq!(restored.view(), AppView::Mail);
}

#[tokio::test]
async fn test_login_bootstraps_account() {
    let (backend, account) = backend_with_account_seven();
    backend.set_mailboxes(account, &["INBOX", "Sent"]);
    backend.set_logged_in(account, false);
    let session = started_session(&backend).await;
    assert!(session.active_accounts().is_empty());

    backend.clear_calls();
    let logged_in = session
        .login("imap.example.com:993", "seven@example.com", "pw")
        .await
        .unwrap();
    assert_eq!(logged_in, account);
    assert_eq!(backend.call_count(CallKind::UpdateMailboxes), 1);
    assert_eq!(backend.call_count(CallKind::GetMailboxes), 1);
    assert_eq!(backend.call_count(CallKind::UpdateMessages), 2);
    assert_eq!(session.mailboxes().len(), 2);

    // Trigger results arrive as pushes; nothing is cached so only the catalog refreshes
    session.process_pending_events().await;
    assert_eq!(backend.call_count(CallKind::GetEmailsForMailbox), 0);
}
