//! Post record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A post; ids come from one global sequence shared by all threads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: u64,
    pub text: String,
    pub author: String,
    pub time: DateTime<Utc>,
    /// Owning thread id
    pub thread: u64,
    /// Position within the thread, starting at 1 for the opening post
    pub index: u64,
    pub archived: bool,
    /// 0 or 1
    pub reports: u32,
}

impl Post {
    /// Position of the thread-opening post
    pub const OPENING_INDEX: u64 = 1;

    pub fn is_opening(&self) -> bool {
        self.index == Self::OPENING_INDEX
    }

    pub fn is_reported(&self) -> bool {
        self.reports > 0
    }
}
