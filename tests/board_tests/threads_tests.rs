//! Tests for threads and posts
//!
//! These tests verify:
//! - CreateThread / ViewThread round trip and the owned-thread index
//! - Reply ordering and last-modified maintenance
//! - Subforum listing order
//! - Title and text validation
//! - Authorization (anonymous, muted, subforum privilege, locked threads)
//! - Concurrent replies get distinct, increasing post ids
//! - Listings and thread views skip records their indices point at but
//!   that no longer exist

#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;
use std::thread;

use chrono::Duration;
use common::TestBoard;
use larigot::board::schema::Schema;
use larigot::board::{validate_title, MuteDuration, MAX_TITLE_LEN};
use larigot::clock::Clock;
use larigot::model::Privilege;
use larigot::store::{encode_id, BucketPath, BucketWrite};
use larigot::{AuthError, ErrorKind, Identity, LarigotError, ValidationError};

// =============================================================================
// Create / View Tests
// =============================================================================

#[test]
fn test_create_then_view_thread() {
    let t = TestBoard::new();
    let alice = t.writer("alice");

    let created = t
        .board
        .create_thread(&alice, "general", "  Hello world  ", "first post")
        .unwrap();
    assert_eq!(created.thread.title, "Hello world");
    assert_eq!(created.post.index, 1);
    assert!(created.post.is_opening());

    let view = t.board.view_thread(created.thread.id).unwrap();
    assert_eq!(view.thread.author, "alice");
    assert!(!view.thread.locked);
    assert!(!view.thread.archived);
    assert_eq!(view.posts.len(), 1);
    assert_eq!(view.posts[0].text, "first post");
    assert_eq!(view.posts[0].thread, created.thread.id);
    assert_eq!(view.posts[0].reports, 0);

    let activity = t.board.search_by_user("alice").unwrap();
    let owned: Vec<u64> = activity.threads.iter().map(|h| h.thread.id).collect();
    assert_eq!(owned, vec![created.thread.id]);
}

#[test]
fn test_thread_ids_and_post_ids_are_sequential() {
    let t = TestBoard::new();
    let alice = t.writer("alice");

    let first = t.board.create_thread(&alice, "general", "One", "a").unwrap();
    let second = t.board.create_thread(&alice, "offtopic", "Two", "b").unwrap();

    assert_eq!(first.thread.id, 1);
    assert_eq!(second.thread.id, 2);
    assert_eq!(first.post.id, 1);
    assert_eq!(second.post.id, 2);
}

#[test]
fn test_unknown_subforum_is_not_found() {
    let t = TestBoard::new();
    let alice = t.writer("alice");

    let err = t
        .board
        .create_thread(&alice, "nowhere", "Title", "text")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_view_missing_thread_is_not_found() {
    let t = TestBoard::new();
    let err = t.board.view_thread(42).unwrap_err();
    assert!(matches!(err, LarigotError::NotFound("thread")));
}

// =============================================================================
// Reply Tests
// =============================================================================

#[test]
fn test_replies_keep_creation_order_and_bump_last_modified() {
    let t = TestBoard::new();
    let alice = t.writer("alice");
    let bob = t.writer("bob");

    let created = t.board.create_thread(&alice, "general", "Chat", "post 0").unwrap();
    let mut last_reply_time = created.post.time;
    for i in 1..=5 {
        t.clock.advance(Duration::minutes(3));
        let author = if i % 2 == 0 { &alice } else { &bob };
        let post = t
            .board
            .reply(author, created.thread.id, &format!("post {}", i))
            .unwrap();
        assert_eq!(post.index, i + 1);
        last_reply_time = post.time;
    }

    let view = t.board.view_thread(created.thread.id).unwrap();
    assert_eq!(view.posts.len(), 6);
    let texts: Vec<&str> = view.posts.iter().map(|p| p.text.as_str()).collect();
    assert_eq!(texts, vec!["post 0", "post 1", "post 2", "post 3", "post 4", "post 5"]);
    assert!(view.posts.windows(2).all(|w| w[0].id < w[1].id));
    assert_eq!(view.thread.last_modified, last_reply_time);
    assert_eq!(last_reply_time, t.clock.now());
}

#[test]
fn test_reply_to_missing_thread() {
    let t = TestBoard::new();
    let alice = t.writer("alice");
    let err = t.board.reply(&alice, 99, "hello").unwrap_err();
    assert!(matches!(err, LarigotError::NotFound("thread")));
}

#[test]
fn test_empty_reply_is_rejected() {
    let t = TestBoard::new();
    let alice = t.writer("alice");
    let created = t.board.create_thread(&alice, "general", "Chat", "hi").unwrap();

    let err = t.board.reply(&alice, created.thread.id, " \n\t ").unwrap_err();
    assert!(matches!(err, LarigotError::Validation(ValidationError::PostEmpty)));
    assert_eq!(t.board.view_thread(created.thread.id).unwrap().posts.len(), 1);
}

#[test]
fn test_concurrent_replies_get_distinct_increasing_ids() {
    let t = TestBoard::new();
    let alice = t.writer("alice");
    let bob = t.writer("bob");
    let a = t.board.create_thread(&alice, "general", "A", "a").unwrap().thread.id;
    let b = t.board.create_thread(&bob, "general", "B", "b").unwrap().thread.id;

    let board = Arc::new(t.board);
    let spawn = |caller: Identity, thread_id: u64| {
        let board = Arc::clone(&board);
        thread::spawn(move || {
            (0..10)
                .map(|i| board.reply(&caller, thread_id, &format!("r{}", i)).unwrap().id)
                .collect::<Vec<u64>>()
        })
    };
    let h1 = spawn(alice, a);
    let h2 = spawn(bob, b);
    let ids1 = h1.join().unwrap();
    let ids2 = h2.join().unwrap();

    assert!(ids1.windows(2).all(|w| w[0] < w[1]));
    assert!(ids2.windows(2).all(|w| w[0] < w[1]));

    let mut all: Vec<u64> = ids1.into_iter().chain(ids2).collect();
    all.sort_unstable();
    // Posts 1 and 2 are the opening posts
    assert_eq!(all, (3..=22).collect::<Vec<u64>>());
}

// =============================================================================
// Listing Tests
// =============================================================================

#[test]
fn test_listing_orders_by_last_activity() {
    let t = TestBoard::new();
    let alice = t.writer("alice");

    let t1 = t.board.create_thread(&alice, "general", "T1", "x").unwrap().thread.id;
    t.clock.advance(Duration::seconds(1));
    let t2 = t.board.create_thread(&alice, "general", "T2", "x").unwrap().thread.id;
    t.clock.advance(Duration::seconds(1));
    let t3 = t.board.create_thread(&alice, "general", "T3", "x").unwrap().thread.id;
    t.clock.advance(Duration::seconds(1));
    t.board.reply(&alice, t1, "bump").unwrap();

    let order: Vec<u64> = t
        .board
        .list_subforum_threads("general")
        .unwrap()
        .iter()
        .map(|th| th.id)
        .collect();
    assert_eq!(order, vec![t1, t3, t2]);
}

#[test]
fn test_listing_ties_put_later_thread_first() {
    let t = TestBoard::new();
    let alice = t.writer("alice");

    let t1 = t.board.create_thread(&alice, "general", "T1", "x").unwrap().thread.id;
    let t2 = t.board.create_thread(&alice, "general", "T2", "x").unwrap().thread.id;

    let order: Vec<u64> = t
        .board
        .list_subforum_threads("general")
        .unwrap()
        .iter()
        .map(|th| th.id)
        .collect();
    assert_eq!(order, vec![t2, t1]);
}

#[test]
fn test_listing_is_per_subforum() {
    let t = TestBoard::new();
    let alice = t.writer("alice");
    t.board.create_thread(&alice, "general", "Here", "x").unwrap();
    t.board.create_thread(&alice, "offtopic", "There", "x").unwrap();

    let general = t.board.list_subforum_threads("general").unwrap();
    assert_eq!(general.len(), 1);
    assert_eq!(general[0].title, "Here");
    assert!(t.board.list_subforum_threads("news").unwrap().is_empty());
    assert!(matches!(
        t.board.list_subforum_threads("missing"),
        Err(LarigotError::NotFound("subforum"))
    ));
}

// =============================================================================
// Validation Tests
// =============================================================================

#[test]
fn test_title_validation() {
    assert_eq!(validate_title(""), Err(ValidationError::TitleEmpty));
    assert_eq!(validate_title("   "), Err(ValidationError::TitleEmpty));
    assert_eq!(
        validate_title(&"a".repeat(MAX_TITLE_LEN + 1)),
        Err(ValidationError::TitleTooLong)
    );
    assert_eq!(
        validate_title(&"a".repeat(MAX_TITLE_LEN)),
        Ok("a".repeat(MAX_TITLE_LEN))
    );
    assert_eq!(
        validate_title("line one\nline two"),
        Err(ValidationError::TitleIllegalCharacter)
    );
    assert_eq!(
        validate_title("tab\there"),
        Err(ValidationError::TitleIllegalCharacter)
    );
    assert!(validate_title("Ünïcödé, punctuation! (and) \"quotes\"?").is_ok());
    assert!(validate_title("日本語のタイトル").is_ok());
}

#[test]
fn test_invalid_title_writes_nothing() {
    let t = TestBoard::new();
    let alice = t.writer("alice");
    let before = t.board.engine().committed_version();

    let err = t
        .board
        .create_thread(&alice, "general", "bad\u{0007}title", "text")
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(t.board.engine().committed_version(), before);
    assert!(t.board.list_subforum_threads("general").unwrap().is_empty());
}

// =============================================================================
// Authorization Tests
// =============================================================================

#[test]
fn test_anonymous_cannot_post() {
    let t = TestBoard::new();
    let err = t
        .board
        .create_thread(&Identity::anonymous(), "general", "Title", "text")
        .unwrap_err();
    assert!(matches!(err, LarigotError::Unauthorized(AuthError::NotLoggedIn)));
}

#[test]
fn test_muted_user_cannot_post() {
    let t = TestBoard::new();
    t.writer("alice");
    t.board.mute("alice", MuteDuration::Days(2)).unwrap();
    let alice = t.identity("alice");
    assert!(alice.is_muted());

    let err = t
        .board
        .create_thread(&alice, "general", "Title", "text")
        .unwrap_err();
    assert!(matches!(err, LarigotError::Unauthorized(AuthError::Muted(_))));
    assert_eq!(err.kind(), ErrorKind::Unauthorized);

    // The mute expires with time
    t.clock.advance(Duration::days(2) + Duration::seconds(1));
    let alice = t.identity("alice");
    assert!(!alice.is_muted());
    t.board.create_thread(&alice, "general", "Title", "text").unwrap();
}

#[test]
fn test_subforum_privileges() {
    let t = TestBoard::new();
    let alice = t.writer("alice");
    let moddy = t.writer("moddy");
    assert_eq!(moddy.privilege, Privilege::Mod);

    let err = t
        .board
        .create_thread(&alice, "news", "Announcement", "text")
        .unwrap_err();
    assert!(matches!(err, LarigotError::Unauthorized(AuthError::InsufficientPrivilege)));
    let news = t.board.create_thread(&moddy, "news", "Announcement", "text").unwrap();
    t.board.reply(&alice, news.thread.id, "anyone may reply here").unwrap();

    let staff = t.board.create_thread(&alice, "staff", "Question", "text").unwrap();
    let err = t.board.reply(&alice, staff.thread.id, "me again").unwrap_err();
    assert!(matches!(err, LarigotError::Unauthorized(AuthError::InsufficientPrivilege)));
    t.board.reply(&moddy, staff.thread.id, "answer").unwrap();
}

#[test]
fn test_locked_thread_only_accepts_privileged_replies() {
    let t = TestBoard::new();
    let alice = t.writer("alice");
    let moddy = t.writer("moddy");
    let id = t.board.create_thread(&alice, "general", "Heated", "text").unwrap().thread.id;

    let locked = t.board.set_thread_locked(id, true).unwrap();
    assert!(locked.locked);

    let err = t.board.reply(&alice, id, "but wait").unwrap_err();
    assert!(matches!(err, LarigotError::Unauthorized(AuthError::ThreadLocked)));
    t.board.reply(&moddy, id, "closing note").unwrap();

    t.board.set_thread_locked(id, false).unwrap();
    t.board.reply(&alice, id, "thanks").unwrap();
    assert_eq!(t.board.view_thread(id).unwrap().posts.len(), 3);
}

#[test]
fn test_archive_flag_is_stored() {
    let t = TestBoard::new();
    let alice = t.writer("alice");
    let id = t.board.create_thread(&alice, "general", "Old", "text").unwrap().thread.id;

    t.board.set_thread_archived(id, true).unwrap();
    let view = t.board.view_thread(id).unwrap();
    assert!(view.thread.archived);
    assert!(!view.thread.locked);
    assert_eq!(t.board.list_subforum_threads("general").unwrap().len(), 1);

    assert!(matches!(
        t.board.set_thread_archived(77, true),
        Err(LarigotError::NotFound("thread"))
    ));
}

// =============================================================================
// Dangling Reference Tests
// =============================================================================

/// Delete one record behind the board's back, leaving its index entries
fn delete_record(t: &TestBoard, bucket: impl Fn(&Schema) -> &BucketPath, id: u64) {
    let schema = Schema::new();
    t.board
        .engine()
        .update(|tx| tx.remove(bucket(&schema), encode_id(id).as_bytes()))
        .unwrap();
}

#[test]
fn test_listing_skips_missing_thread() {
    let t = TestBoard::new();
    let alice = t.writer("alice");
    let first = t.board.create_thread(&alice, "general", "First", "a").unwrap();
    let gone = t.board.create_thread(&alice, "general", "Gone", "b").unwrap();
    t.clock.advance(Duration::seconds(1));
    let last = t.board.create_thread(&alice, "general", "Last", "c").unwrap();

    delete_record(&t, |s| &s.all_threads, gone.thread.id);

    let ids: Vec<u64> = t
        .board
        .list_subforum_threads("general")
        .unwrap()
        .iter()
        .map(|th| th.id)
        .collect();
    assert_eq!(ids, vec![last.thread.id, first.thread.id]);
}

#[test]
fn test_view_thread_skips_missing_post() {
    let t = TestBoard::new();
    let alice = t.writer("alice");
    let created = t.board.create_thread(&alice, "general", "Holes", "opening").unwrap();
    let id = created.thread.id;
    let gone = t.board.reply(&alice, id, "deleted reply").unwrap();
    t.board.reply(&alice, id, "kept reply").unwrap();

    delete_record(&t, |s| &s.posts, gone.id);

    let view = t.board.view_thread(id).unwrap();
    let texts: Vec<&str> = view.posts.iter().map(|p| p.text.as_str()).collect();
    assert_eq!(texts, vec!["opening", "kept reply"]);
    assert_eq!(view.posts[1].index, 3);
}

#[test]
fn test_view_thread_with_every_post_missing() {
    let t = TestBoard::new();
    let alice = t.writer("alice");
    let created = t.board.create_thread(&alice, "general", "Empty", "only post").unwrap();

    delete_record(&t, |s| &s.posts, created.post.id);

    let view = t.board.view_thread(created.thread.id).unwrap();
    assert_eq!(view.thread.title, "Empty");
    assert!(view.posts.is_empty());
}

// =============================================================================
// Persistence Tests
// =============================================================================

#[test]
fn test_threads_survive_reopen() {
    let t = TestBoard::new();
    let alice = t.writer("alice");
    let id = t.board.create_thread(&alice, "general", "Durable", "text").unwrap().thread.id;
    t.board.reply(&alice, id, "reply").unwrap();

    let t = t.reopen();
    let view = t.board.view_thread(id).unwrap();
    assert_eq!(view.posts.len(), 2);
    let alice = t.identity("alice");
    assert_eq!(alice.username, "alice");
    let next = t.board.create_thread(&alice, "general", "Next", "text").unwrap();
    assert_eq!(next.thread.id, id + 1);
    assert_eq!(next.post.id, 3);
}
