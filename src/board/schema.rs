//! Bucket layout of the board store
//!
//! ```text
//! users                    username        -> User
//! validation               token           -> username
//! certfp                   fingerprint     -> username
//! subforums/<id>           seq             -> thread id
//! allthreads               thread id       -> Thread
//! allthreads/<thread id>   seq (position)  -> post id
//! threadtosubforum         thread id       -> subforum id
//! posts                    post id         -> Post
//! userthreads/<username>   seq             -> thread id
//! userposts/<username>     seq             -> post id
//! console                  RFC 3339 nanos  -> "actor/Privilege:command"
//! ```
//! Every id, seq and position key is 16 lowercase hex digits; list values
//! hold ids in the same form.

use crate::store::{encode_id, BucketPath};

pub const USERS: &str = "users";
pub const VALIDATION: &str = "validation";
pub const CERTFP: &str = "certfp";
pub const SUBFORUMS: &str = "subforums";
pub const ALL_THREADS: &str = "allthreads";
pub const THREAD_TO_SUBFORUM: &str = "threadtosubforum";
pub const POSTS: &str = "posts";
pub const USER_THREADS: &str = "userthreads";
pub const USER_POSTS: &str = "userposts";
pub const CONSOLE: &str = "console";

/// Resolved bucket paths
#[derive(Debug, Clone)]
pub struct Schema {
    pub users: BucketPath,
    pub validation: BucketPath,
    pub certfp: BucketPath,
    pub subforums: BucketPath,
    pub all_threads: BucketPath,
    pub thread_to_subforum: BucketPath,
    pub posts: BucketPath,
    pub user_threads: BucketPath,
    pub user_posts: BucketPath,
    pub console: BucketPath,
}

impl Schema {
    pub fn new() -> Self {
        Self {
            users: BucketPath::root(USERS),
            validation: BucketPath::root(VALIDATION),
            certfp: BucketPath::root(CERTFP),
            subforums: BucketPath::root(SUBFORUMS),
            all_threads: BucketPath::root(ALL_THREADS),
            thread_to_subforum: BucketPath::root(THREAD_TO_SUBFORUM),
            posts: BucketPath::root(POSTS),
            user_threads: BucketPath::root(USER_THREADS),
            user_posts: BucketPath::root(USER_POSTS),
            console: BucketPath::root(CONSOLE),
        }
    }

    /// Every root bucket
    pub fn roots(&self) -> [&BucketPath; 10] {
        [
            &self.users,
            &self.validation,
            &self.certfp,
            &self.subforums,
            &self.all_threads,
            &self.thread_to_subforum,
            &self.posts,
            &self.user_threads,
            &self.user_posts,
            &self.console,
        ]
    }

    /// Thread list of one subforum
    pub fn subforum(&self, id: &str) -> BucketPath {
        self.subforums.child(id)
    }

    /// Ordered post list of one thread
    pub fn thread_posts(&self, thread_id: u64) -> BucketPath {
        self.all_threads.child(encode_id(thread_id))
    }

    /// Threads started by a user
    pub fn threads_of(&self, username: &str) -> BucketPath {
        self.user_threads.child(username)
    }

    /// Posts written by a user
    pub fn posts_of(&self, username: &str) -> BucketPath {
        self.user_posts.child(username)
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::new()
    }
}
