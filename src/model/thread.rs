//! Thread record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A thread; its ordered post list lives in the nested `posts` bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    pub id: u64,
    pub title: String,
    pub author: String,
    pub last_modified: DateTime<Utc>,
    pub locked: bool,
    pub archived: bool,
}

impl Thread {
    pub fn new(id: u64, title: String, author: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title,
            author,
            last_modified: now,
            locked: false,
            archived: false,
        }
    }
}
