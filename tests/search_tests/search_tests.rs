//! Tests for keyword search and the indexing pipeline
//!
//! These tests verify:
//! - Posts become searchable once the worker catches up
//! - `+required` / `-excluded` query syntax and ranking
//! - Result limit
//! - Rebuild when the index file is missing, unreadable or incomplete
//! - Lost updates and unclean exits force a rebuild at the next start
//! - Reindexing alongside the worker
//! - Search by user, including dangling index entries

#[path = "../common/mod.rs"]
mod common;

use std::fs;
use std::sync::atomic::Ordering;
use std::thread;

use common::TestBoard;
use larigot::board::schema::Schema;
use larigot::config::StoreOptions;
use larigot::search::{IndexTask, SearchIndex};
use larigot::store::{encode_id, BucketWrite};
use larigot::{Board, LarigotError};
use tempfile::TempDir;

fn post_ids(t: &TestBoard, query: &str) -> Vec<u64> {
    t.board
        .keyword_search(query)
        .unwrap()
        .into_iter()
        .map(|h| h.post.id)
        .collect()
}

fn sorted(mut ids: Vec<u64>) -> Vec<u64> {
    ids.sort_unstable();
    ids
}

/// Three single-post threads; returns their post ids
fn seed(t: &TestBoard) -> [u64; 3] {
    let alice = t.writer("alice");
    let a = t.board.create_thread(&alice, "general", "A", "rust and gemini").unwrap();
    let b = t.board.create_thread(&alice, "general", "B", "rust only").unwrap();
    let c = t.board.create_thread(&alice, "general", "C", "gemini only").unwrap();
    t.settle();
    [a.post.id, b.post.id, c.post.id]
}

// =============================================================================
// Query Tests
// =============================================================================

#[test]
fn test_posts_become_searchable() {
    let t = TestBoard::new();
    let alice = t.writer("alice");
    let created = t
        .board
        .create_thread(&alice, "general", "Ownership", "Borrowing rules in Rust")
        .unwrap();
    t.settle();

    let hits = t.board.keyword_search("borrowing").unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].post.id, created.post.id);
    assert_eq!(hits[0].thread_title, "Ownership");
    assert!(hits[0].score > 0.0);

    // Case-insensitive, and the author is searchable too
    assert_eq!(post_ids(&t, "RUST"), vec![created.post.id]);
    assert_eq!(post_ids(&t, "alice"), vec![created.post.id]);
    assert!(post_ids(&t, "python").is_empty());

    let stats = t.board.pipeline().stats();
    assert_eq!(stats.indexed.load(Ordering::Relaxed), 1);
    assert_eq!(stats.lost(), 0);
}

#[test]
fn test_required_and_excluded_terms() {
    let t = TestBoard::new();
    let [both, rust, gemini] = seed(&t);

    assert_eq!(post_ids(&t, "+rust -gemini"), vec![rust]);
    assert_eq!(post_ids(&t, "+rust +gemini"), vec![both]);
    assert_eq!(sorted(post_ids(&t, "+gemini")), vec![both, gemini]);
    assert_eq!(post_ids(&t, "only -rust"), vec![gemini]);
}

#[test]
fn test_more_matching_terms_rank_higher() {
    let t = TestBoard::new();
    let [both, rust, gemini] = seed(&t);

    let ids = post_ids(&t, "rust gemini");
    assert_eq!(ids[0], both);
    assert_eq!(sorted(ids), sorted(vec![both, rust, gemini]));
}

#[test]
fn test_empty_queries_match_nothing() {
    let t = TestBoard::new();
    seed(&t);

    assert!(post_ids(&t, "").is_empty());
    assert!(post_ids(&t, "   ").is_empty());
    assert!(post_ids(&t, "-rust").is_empty());
}

#[test]
fn test_result_limit() {
    let t = TestBoard::with(|b| b.search_result_limit(3));
    let alice = t.writer("alice");
    let created = t.board.create_thread(&alice, "general", "Capsules", "gemini").unwrap();
    for i in 0..5 {
        t.board
            .reply(&alice, created.thread.id, &format!("gemini reply {}", i))
            .unwrap();
    }
    t.settle();

    assert_eq!(t.board.keyword_search("gemini").unwrap().len(), 3);
}

#[test]
fn test_replies_are_indexed() {
    let t = TestBoard::new();
    let alice = t.writer("alice");
    let bob = t.writer("bob");
    let created = t.board.create_thread(&alice, "general", "Q", "question").unwrap();
    let reply = t.board.reply(&bob, created.thread.id, "the answer").unwrap();
    t.settle();

    let hits = t.board.keyword_search("answer").unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].post.id, reply.id);
    assert_eq!(hits[0].post.author, "bob");
    assert_eq!(hits[0].thread_title, "Q");
}

// =============================================================================
// Rebuild Tests
// =============================================================================

#[test]
fn test_missing_index_is_rebuilt() {
    let t = TestBoard::new();
    let [both, rust, _] = seed(&t);

    let t = t.reopen_after(|config| {
        fs::remove_file(config.data_dir.join(&config.search_file)).unwrap();
    });

    assert_eq!(t.board.search_index().doc_count().unwrap(), 3);
    assert_eq!(sorted(post_ids(&t, "rust")), vec![both, rust]);
}

#[test]
fn test_unreadable_index_is_rebuilt() {
    let t = TestBoard::new();
    let [both, _, gemini] = seed(&t);

    let t = t.reopen_after(|config| {
        fs::write(
            config.data_dir.join(&config.search_file),
            b"this is not a transaction log",
        )
        .unwrap();
    });

    assert_eq!(t.board.search_index().doc_count().unwrap(), 3);
    assert_eq!(sorted(post_ids(&t, "gemini")), vec![both, gemini]);
}

#[test]
fn test_incomplete_index_is_rebuilt() {
    let t = TestBoard::new();
    let [both, rust, _] = seed(&t);

    // Keep the file but leave it unmarked, with one post missing
    let t = t.reopen_after(|config| {
        let index = SearchIndex::open(config.search_options(), 10).unwrap();
        assert!(index.is_ready().unwrap());
        index
            .index(&IndexTask {
                post_id: rust,
                thread_id: 0,
                author: "nobody".to_string(),
                text: "replaced".to_string(),
            })
            .unwrap();
        index.set_ready(false).unwrap();
        index.close().unwrap();
    });

    // Reindexing a post replaces it, so the count is unchanged
    assert_eq!(t.board.search_index().doc_count().unwrap(), 3);
    assert_eq!(sorted(post_ids(&t, "rust")), vec![both, rust]);
    assert!(post_ids(&t, "replaced").is_empty());
}

#[test]
fn test_ready_marker_is_unset_while_running() {
    let t = TestBoard::new();
    seed(&t);
    assert!(!t.board.search_index().is_ready().unwrap());

    let t = t.reopen_after(|config| {
        let index = SearchIndex::open(config.search_options(), 10).unwrap();
        assert!(index.is_ready().unwrap());
        index.close().unwrap();
    });
    assert!(!t.board.search_index().is_ready().unwrap());
}

/// Copy the store files of a live board, as a crash would leave them
fn crash_image(t: &TestBoard) -> TempDir {
    let image = TempDir::new().unwrap();
    for file in [&t.config.store_file, &t.config.search_file] {
        fs::copy(t.config.data_dir.join(file), image.path().join(file)).unwrap();
    }
    image
}

fn open_image(t: &TestBoard, image: &TempDir) -> Board {
    let mut config = t.config.clone();
    config.data_dir = image.path().to_path_buf();
    Board::open_with(config, t.notifier.clone(), t.clock.clone()).unwrap()
}

#[test]
fn test_unclean_exit_forces_rebuild() {
    let t = TestBoard::new();
    let [both, rust, _] = seed(&t);

    let image = crash_image(&t);
    let board = open_image(&t, &image);
    let mut ids: Vec<u64> = board
        .keyword_search("rust")
        .unwrap()
        .into_iter()
        .map(|h| h.post.id)
        .collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![both, rust]);
    assert_eq!(board.search_index().doc_count().unwrap(), 3);
    board.close().unwrap();
}

#[test]
fn test_update_lost_after_shutdown_survives_unclean_exit() {
    let t = TestBoard::new();
    seed(&t);
    let alice = t.identity("alice");

    t.board.pipeline().shutdown().unwrap();
    assert!(t.board.search_index().is_ready().unwrap());
    let late = t.board.create_thread(&alice, "general", "Late", "zeppelin").unwrap();
    assert!(!t.board.search_index().is_ready().unwrap());

    let image = crash_image(&t);
    let board = open_image(&t, &image);
    let hits = board.keyword_search("zeppelin").unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].post.id, late.post.id);
    board.close().unwrap();
}

#[test]
fn test_lost_update_forces_rebuild() {
    let t = TestBoard::new();
    seed(&t);
    let alice = t.identity("alice");

    t.board.pipeline().shutdown().unwrap();
    let late = t.board.create_thread(&alice, "general", "Late", "zeppelin").unwrap();
    assert_eq!(t.board.pipeline().stats().dropped.load(Ordering::Relaxed), 1);
    assert!(post_ids(&t, "zeppelin").is_empty());

    let t = t.reopen();
    assert_eq!(post_ids(&t, "zeppelin"), vec![late.post.id]);
}

#[test]
fn test_reindex_counts_every_post() {
    let t = TestBoard::new();
    seed(&t);
    assert_eq!(t.board.reindex().unwrap(), 3);
    assert_eq!(t.board.search_index().doc_count().unwrap(), 3);
}

#[test]
fn test_reindex_forgives_earlier_losses() {
    let t = TestBoard::new();
    seed(&t);
    let alice = t.identity("alice");

    t.board.pipeline().shutdown().unwrap();
    t.board.create_thread(&alice, "general", "Late", "zeppelin").unwrap();
    assert_eq!(t.board.pipeline().stats().lost(), 1);

    assert_eq!(t.board.reindex().unwrap(), 4);
    assert_eq!(t.board.pipeline().stats().lost(), 0);
    assert_eq!(post_ids(&t, "zeppelin").len(), 1);

    let t = t.reopen_after(|config| {
        let index = SearchIndex::open(config.search_options(), 10).unwrap();
        assert!(index.is_ready().unwrap());
        index.close().unwrap();
    });
    assert_eq!(post_ids(&t, "zeppelin").len(), 1);
}

#[test]
fn test_reindex_while_posting() {
    let t = TestBoard::new();
    let alice = t.writer("alice");
    let thread = t.board.create_thread(&alice, "general", "Busy", "opening").unwrap();

    thread::scope(|s| {
        s.spawn(|| {
            for i in 0..20 {
                t.board
                    .reply(&alice, thread.thread.id, &format!("reply number{}", i))
                    .unwrap();
            }
        });
        s.spawn(|| {
            for _ in 0..3 {
                t.board.reindex().unwrap();
            }
        });
    });
    t.settle();

    assert_eq!(t.board.search_index().doc_count().unwrap(), 21);
    assert_eq!(post_ids(&t, "number19").len(), 1);
    assert_eq!(t.board.pipeline().stats().lost(), 0);
}

#[test]
fn test_index_replaces_earlier_version_of_a_post() {
    let dir = TempDir::new().unwrap();
    let index = SearchIndex::open(StoreOptions::new(dir.path().join("k.db")), 10).unwrap();

    let mut task = IndexTask {
        post_id: 7,
        thread_id: 1,
        author: "alice".to_string(),
        text: "old words".to_string(),
    };
    index.index(&task).unwrap();
    task.text = "new words".to_string();
    index.index(&task).unwrap();

    assert!(index.search("old").unwrap().is_empty());
    let hits = index.search("new").unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!((hits[0].post_id, hits[0].thread_id), (7, 1));
    assert_eq!(index.doc_count().unwrap(), 1);
    assert!(!index.is_ready().unwrap());
    index.close().unwrap();
}

// =============================================================================
// Search By User Tests
// =============================================================================

#[test]
fn test_search_by_user() {
    let t = TestBoard::new();
    let alice = t.writer("alice");
    let bob = t.writer("bob");

    let mine = t
        .board
        .create_thread(&alice, "general", "Alice's thread", "opening words")
        .unwrap();
    let theirs = t
        .board
        .create_thread(&bob, "offtopic", "Bob's thread", "bob opens")
        .unwrap();
    let reply = t.board.reply(&alice, theirs.thread.id, "alice replies").unwrap();
    t.board.reply(&alice, mine.thread.id, "and to herself").unwrap();

    let activity = t.board.search_by_user("alice").unwrap();

    assert_eq!(activity.threads.len(), 1);
    assert_eq!(activity.threads[0].thread.id, mine.thread.id);
    assert_eq!(activity.threads[0].excerpt.as_deref(), Some("opening words"));

    // Newest first; opening posts are listed only as threads
    let titles: Vec<&str> = activity.posts.iter().map(|p| p.thread_title.as_str()).collect();
    assert_eq!(titles, vec!["Alice's thread", "Bob's thread"]);
    assert_eq!(activity.posts[1].post.id, reply.id);
    assert_eq!(activity.posts[1].thread_author, "bob");
    assert!(activity.posts.iter().all(|p| !p.post.is_opening()));
}

#[test]
fn test_search_by_user_skips_missing_records() {
    let t = TestBoard::new();
    let alice = t.writer("alice");
    let bob = t.writer("bob");
    let schema = Schema::new();

    let gone_thread = t.board.create_thread(&alice, "general", "Gone", "vanishes").unwrap();
    let emptied = t.board.create_thread(&alice, "general", "Emptied", "opening lost").unwrap();
    let kept = t.board.create_thread(&alice, "general", "Kept", "still here").unwrap();
    let theirs = t.board.create_thread(&bob, "offtopic", "Bob's", "bob opens").unwrap();
    let lost_reply = t.board.reply(&alice, theirs.thread.id, "lost reply").unwrap();
    let orphan = t.board.reply(&alice, gone_thread.thread.id, "orphaned reply").unwrap();
    let kept_reply = t.board.reply(&alice, theirs.thread.id, "kept reply").unwrap();

    t.board
        .engine()
        .update(|tx| {
            tx.remove(&schema.all_threads, encode_id(gone_thread.thread.id).as_bytes())?;
            tx.remove(&schema.posts, encode_id(emptied.post.id).as_bytes())?;
            tx.remove(&schema.posts, encode_id(lost_reply.id).as_bytes())
        })
        .unwrap();

    let activity = t.board.search_by_user("alice").unwrap();

    let threads: Vec<(u64, Option<&str>)> = activity
        .threads
        .iter()
        .map(|h| (h.thread.id, h.excerpt.as_deref()))
        .collect();
    assert_eq!(
        threads,
        vec![(kept.thread.id, Some("still here")), (emptied.thread.id, None)]
    );

    // The orphaned reply's thread is gone, the lost reply's record is gone
    let posts: Vec<u64> = activity.posts.iter().map(|p| p.post.id).collect();
    assert_eq!(posts, vec![kept_reply.id]);
    assert_ne!(orphan.id, kept_reply.id);
}

#[test]
fn test_search_by_unknown_user() {
    let t = TestBoard::new();
    assert!(matches!(
        t.board.search_by_user("ghost"),
        Err(LarigotError::NotFound("user"))
    ));
}
