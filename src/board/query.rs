//! Read/query layer
//!
//! Every read runs in one read transaction. References to records that no
//! longer exist are skipped and logged, never surfaced as errors.

use crate::error::{LarigotError, Result};
use crate::model::{Post, Thread};
use super::repo::Records;
use super::Board;

/// A thread with its posts, oldest first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadView {
    pub thread: Thread,
    pub posts: Vec<Post>,
}

/// A thread started by the searched user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadHit {
    pub thread: Thread,
    /// Text of the opening post, if it still exists
    pub excerpt: Option<String>,
}

/// A reply written by the searched user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostHit {
    pub post: Post,
    pub thread_title: String,
    pub thread_author: String,
}

/// Everything a user has written, newest first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserActivity {
    pub threads: Vec<ThreadHit>,
    pub posts: Vec<PostHit>,
}

/// A keyword search match
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordHit {
    pub post: Post,
    pub thread_title: String,
    pub score: f64,
}

impl Board {
    /// Threads of a subforum, most recently active first
    ///
    /// Ties on `last_modified` put the later-created thread first.
    pub fn list_subforum_threads(&self, subforum_id: &str) -> Result<Vec<Thread>> {
        if self.config.subforum(subforum_id).is_none() {
            return Err(LarigotError::NotFound("subforum"));
        }

        let mut threads = self.engine.view(|tx| {
            let records = Records::new(&self.schema, tx);
            let mut threads = Vec::new();
            for id in records.ids(&self.schema.subforum(subforum_id))? {
                match records.thread(id)? {
                    Some(thread) => threads.push(thread),
                    None => tracing::warn!(
                        "Subforum {} lists missing thread {}",
                        subforum_id,
                        id
                    ),
                }
            }
            Ok(threads)
        })?;

        threads.sort_by(|a, b| {
            b.last_modified
                .cmp(&a.last_modified)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(threads)
    }

    /// A thread and its posts in position order
    pub fn view_thread(&self, thread_id: u64) -> Result<ThreadView> {
        self.engine.view(|tx| {
            let records = Records::new(&self.schema, tx);
            let thread = records
                .thread(thread_id)?
                .ok_or(LarigotError::NotFound("thread"))?;

            let mut posts = Vec::new();
            for id in records.ids(&self.schema.thread_posts(thread_id))? {
                match records.post(id)? {
                    Some(post) => posts.push(post),
                    None => tracing::warn!("Thread {} lists missing post {}", thread_id, id),
                }
            }
            Ok(ThreadView { thread, posts })
        })
    }

    /// Threads started and replies written by a user, newest first
    ///
    /// Opening posts appear only under `threads`.
    pub fn search_by_user(&self, username: &str) -> Result<UserActivity> {
        self.engine.view(|tx| {
            let schema = &self.schema;
            let records = Records::new(schema, tx);
            if records.user(username)?.is_none() {
                return Err(LarigotError::NotFound("user"));
            }

            let mut threads = Vec::new();
            for id in records.ids_rev(&schema.threads_of(username))? {
                let Some(thread) = records.thread(id)? else {
                    tracing::warn!("{} owns missing thread {}", username, id);
                    continue;
                };
                let excerpt = match records.first_id(&schema.thread_posts(id))? {
                    Some(post_id) => records.post(post_id)?.map(|p| p.text),
                    None => None,
                };
                threads.push(ThreadHit { thread, excerpt });
            }

            let mut posts = Vec::new();
            for id in records.ids_rev(&schema.posts_of(username))? {
                let Some(post) = records.post(id)? else {
                    tracing::warn!("{} authored missing post {}", username, id);
                    continue;
                };
                if post.is_opening() {
                    continue;
                }
                let Some(thread) = records.thread(post.thread)? else {
                    tracing::warn!("Post {} belongs to missing thread {}", id, post.thread);
                    continue;
                };
                posts.push(PostHit {
                    post,
                    thread_title: thread.title,
                    thread_author: thread.author,
                });
            }

            Ok(UserActivity { threads, posts })
        })
    }

    /// Ranked keyword search over post text and authors
    pub fn keyword_search(&self, query: &str) -> Result<Vec<KeywordHit>> {
        let hits = self.index.search(query)?;
        self.engine.view(|tx| {
            let records = Records::new(&self.schema, tx);
            let mut out = Vec::with_capacity(hits.len());
            for hit in hits {
                let Some(post) = records.post(hit.post_id)? else {
                    tracing::warn!("Search index lists missing post {}", hit.post_id);
                    continue;
                };
                let thread_title = records
                    .thread(hit.thread_id)?
                    .map(|t| t.title)
                    .unwrap_or_default();
                out.push(KeywordHit {
                    post,
                    thread_title,
                    score: hit.score,
                });
            }
            Ok(out)
        })
    }
}
