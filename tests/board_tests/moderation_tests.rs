//! Tests for moderation
//!
//! These tests verify:
//! - Mute / unmute and their effect on writing
//! - Reporting posts once, and the report email
//! - Console commands and their privilege check
//! - The audit log: format, order and unique keys

#[path = "../common/mod.rs"]
mod common;

use chrono::Duration;
use common::TestBoard;
use larigot::board::MuteDuration;
use larigot::notify::Sent;
use larigot::{AuthError, ErrorKind, Identity, LarigotError, ValidationError};

/// A thread by alice with one reply by bob; returns (thread id, reply id)
fn seed(t: &TestBoard) -> (u64, u64) {
    let alice = t.writer("alice");
    let bob = t.writer("bob");
    let created = t
        .board
        .create_thread(&alice, "general", "Hello", "opening post")
        .unwrap();
    let reply = t.board.reply(&bob, created.thread.id, "a reply").unwrap();
    (created.thread.id, reply.id)
}

// =============================================================================
// Mute Tests
// =============================================================================

#[test]
fn test_muted_user_cannot_write() {
    let t = TestBoard::new();
    let (thread_id, _) = seed(&t);

    t.board.mute("bob", MuteDuration::Permanent).unwrap();
    let bob = t.identity("bob");
    let err = t.board.reply(&bob, thread_id, "still here").unwrap_err();
    assert!(matches!(err, LarigotError::Unauthorized(AuthError::Muted(_))));
    assert_eq!(err.to_string(), "You are currently muted (permanently muted)");

    t.board.unmute("bob").unwrap();
    let bob = t.identity("bob");
    t.board.reply(&bob, thread_id, "back again").unwrap();
}

#[test]
fn test_temporary_mute_expires() {
    let t = TestBoard::new();
    let (thread_id, _) = seed(&t);

    t.board.mute("bob", MuteDuration::Days(1)).unwrap();
    assert!(t.identity("bob").is_muted());

    t.clock.advance(Duration::hours(23));
    assert!(t.identity("bob").is_muted());

    t.clock.advance(Duration::hours(1));
    let bob = t.identity("bob");
    assert!(!bob.is_muted());
    t.board.reply(&bob, thread_id, "free").unwrap();
}

#[test]
fn test_invalid_mute_duration() {
    let t = TestBoard::new();
    t.login("bob");

    let err = t.board.mute("bob", MuteDuration::Days(0)).unwrap_err();
    assert!(matches!(err, LarigotError::Validation(ValidationError::MuteDuration(_))));
    let err = t.board.mute("bob", MuteDuration::Days(i64::MAX)).unwrap_err();
    assert!(matches!(err, LarigotError::Validation(ValidationError::MuteDuration(_))));
    assert!(!t.identity("bob").is_muted());
}

// =============================================================================
// Report Tests
// =============================================================================

#[test]
fn test_post_can_be_reported_once() {
    let t = TestBoard::new();
    let (thread_id, reply_id) = seed(&t);
    let carol = t.login("carol");

    let post = t.board.report(&carol, reply_id, "spam", "10.0.0.1").unwrap();
    assert_eq!(post.reports, 1);

    let err = t.board.report(&carol, reply_id, "spam again", "10.0.0.1").unwrap_err();
    assert!(matches!(err, LarigotError::AlreadyReported));
    assert_eq!(err.kind(), ErrorKind::Rejected);
    assert_eq!(err.to_string(), "Post has already been reported. Thank you.");

    let view = t.board.view_thread(thread_id).unwrap();
    let reported: Vec<u32> = view.posts.iter().map(|p| p.reports).collect();
    assert_eq!(reported, vec![0, 1]);
    // Notifications are off by default
    assert!(t.notifier.sent().is_empty());
}

#[test]
fn test_report_requires_login() {
    let t = TestBoard::new();
    let (thread_id, reply_id) = seed(&t);

    let err = t
        .board
        .report(&Identity::anonymous(), reply_id, "spam", "")
        .unwrap_err();
    assert!(matches!(err, LarigotError::Unauthorized(AuthError::NotLoggedIn)));
    assert!(!t.board.view_thread(thread_id).unwrap().posts[1].is_reported());
}

#[test]
fn test_report_missing_post() {
    let t = TestBoard::new();
    let carol = t.login("carol");
    let err = t.board.report(&carol, 99, "spam", "").unwrap_err();
    assert!(matches!(err, LarigotError::NotFound("post")));
}

#[test]
fn test_report_sends_email_to_moderators() {
    let t = TestBoard::with(|b| b.notifications_enabled(true));
    let alice = t.board.register("alice", "a@example.org", common::PASSWORD).unwrap();
    t.board.verify(&alice.token).unwrap();
    t.board.login("alice", common::PASSWORD, "fp-alice").unwrap();
    t.board.take_post_nudge("alice").unwrap();
    let alice = t.identity("alice");
    let created = t
        .board
        .create_thread(&alice, "general", "Hello", "opening post")
        .unwrap();

    t.board
        .report(&alice, created.post.id, "off topic", "192.0.2.7")
        .unwrap();
    let last = t.notifier.sent().pop().unwrap();
    assert_eq!(
        last,
        Sent::Report {
            post_id: created.post.id,
            reporter: "alice".to_string(),
            reason: "off topic".to_string(),
            network_info: "192.0.2.7".to_string(),
        }
    );
}

#[test]
fn test_failed_report_email_keeps_the_report() {
    let t = TestBoard::with(|b| b.notifications_enabled(true));
    t.board.register("alice", "a@example.org", common::PASSWORD).unwrap();
    let token = match t.notifier.sent().pop() {
        Some(Sent::Registration { token, .. }) => token,
        other => panic!("unexpected notification {:?}", other),
    };
    t.board.verify(&token).unwrap();
    t.board.login("alice", common::PASSWORD, "fp-alice").unwrap();
    t.board.take_post_nudge("alice").unwrap();
    let alice = t.identity("alice");
    let created = t.board.create_thread(&alice, "general", "Hi", "text").unwrap();

    t.notifier.set_failing(true);
    let err = t.board.report(&alice, created.post.id, "why", "").unwrap_err();
    assert!(matches!(err, LarigotError::Notification(_)));
    assert!(t.board.view_thread(created.thread.id).unwrap().posts[0].is_reported());
}

// =============================================================================
// Console Tests
// =============================================================================

#[test]
fn test_console_requires_moderator() {
    let t = TestBoard::new();
    let alice = t.login("alice");

    let err = t.board.console_command(&alice, "read").unwrap_err();
    assert!(matches!(err, LarigotError::Unauthorized(AuthError::InsufficientPrivilege)));
    // Rejected commands are not logged
    assert!(t.board.read_recent_commands(10).unwrap().is_empty());
}

#[test]
fn test_console_mute_and_unmute() {
    let t = TestBoard::new();
    t.login("bob");
    let moddy = t.login("moddy");

    let out = t.board.console_command(&moddy, "mute bob 3").unwrap();
    assert_eq!(out, "Muted bob until 2024-01-04T12:00:00Z");
    assert!(t.identity("bob").is_muted());

    let out = t.board.console_command(&moddy, "mute bob permanent").unwrap();
    assert_eq!(out, "Muted bob permanently");
    assert!(t.identity("bob").mute.unwrap().is_permanent());

    let out = t.board.console_command(&moddy, "unmute bob").unwrap();
    assert_eq!(out, "Unmuted bob");
    assert!(!t.identity("bob").is_muted());
}

#[test]
fn test_console_thread_commands() {
    let t = TestBoard::new();
    let (thread_id, _) = seed(&t);
    let moddy = t.login("moddy");

    let out = t
        .board
        .console_command(&moddy, &format!("lock {}", thread_id))
        .unwrap();
    assert_eq!(out, format!("Locked thread {}", thread_id));
    assert!(t.board.view_thread(thread_id).unwrap().thread.locked);

    t.board
        .console_command(&moddy, &format!("unlock {}", thread_id))
        .unwrap();
    assert!(!t.board.view_thread(thread_id).unwrap().thread.locked);

    t.board
        .console_command(&moddy, &format!("archive {}", thread_id))
        .unwrap();
    assert!(t.board.view_thread(thread_id).unwrap().thread.archived);

    let err = t.board.console_command(&moddy, "lock 999").unwrap_err();
    assert!(matches!(err, LarigotError::NotFound("thread")));
    let err = t.board.console_command(&moddy, "lock abc").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn test_console_rejects_unknown_commands() {
    let t = TestBoard::new();
    let moddy = t.login("moddy");

    for command in ["frobnicate", "mute bob", "mute bob 0", "unmute", "log"] {
        let err = t.board.console_command(&moddy, command).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation, "{}", command);
    }
    // Failed commands are still audited
    assert_eq!(t.board.read_recent_commands(100).unwrap().len(), 5);
}

#[test]
fn test_audit_log_format_and_order() {
    let t = TestBoard::new();
    let moddy = t.login("moddy");
    let root = t.login("root");

    t.board.console_command(&moddy, "log first note").unwrap();
    t.clock.advance(Duration::seconds(1));
    t.board.console_command(&root, "log second note").unwrap();

    let records = t.board.read_recent_commands(10).unwrap();
    let entries: Vec<&str> = records.iter().map(|r| r.entry.as_str()).collect();
    assert_eq!(
        entries,
        vec!["root/Admin:log second note", "moddy/Mod:log first note"]
    );
    assert_eq!(records[1].time, "2024-01-01T12:00:00.000000000Z");
    assert_eq!(records[0].time, "2024-01-01T12:00:01.000000000Z");

    let out = t.board.console_command(&root, "read 2 notime").unwrap();
    // A command is logged after it runs
    assert_eq!(out, "root/Admin:log second note\nmoddy/Mod:log first note");

    let out = t.board.console_command(&root, "read 1").unwrap();
    assert_eq!(out, "2024-01-01T12:00:01.000000001Z root/Admin:read 2 notime");
}

#[test]
fn test_audit_log_keys_are_unique_at_the_same_instant() {
    let t = TestBoard::new();
    let moddy = t.login("moddy");

    for i in 0..5 {
        t.board.log(&moddy, &format!("note {}", i)).unwrap();
    }
    let records = t.board.read_recent_commands(10).unwrap();
    assert_eq!(records.len(), 5);
    assert_eq!(records[0].entry, "moddy/Mod:note 4");
    assert_eq!(records[0].time, "2024-01-01T12:00:00.000000004Z");
    assert_eq!(records[4].entry, "moddy/Mod:note 0");
}

#[test]
fn test_internal_identity_runs_console() {
    let t = TestBoard::new();
    t.login("bob");

    t.board
        .console_command(&Identity::internal(), "mute bob 2")
        .unwrap();
    let records = t.board.read_recent_commands(1).unwrap();
    assert_eq!(records[0].entry, "*internal*/Admin:mute bob 2");
}
