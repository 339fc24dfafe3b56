//! Static forum definitions

use serde::{Deserialize, Serialize};

use super::Privilege;

/// A named group of subforums
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Forum {
    pub name: String,
    #[serde(default)]
    pub subforums: Vec<Subforum>,
}

/// A subforum; only its thread list lives in the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subforum {
    pub name: String,
    pub id: String,
    /// Minimum privilege to start a thread
    #[serde(default)]
    pub thread_privilege: Privilege,
    /// Minimum privilege to reply
    #[serde(default)]
    pub reply_privilege: Privilege,
}

impl Forum {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            subforums: Vec::new(),
        }
    }

    /// Add a subforum open to everyone
    pub fn subforum(mut self, name: impl Into<String>, id: impl Into<String>) -> Self {
        self.subforums.push(Subforum::new(name, id));
        self
    }

    /// Add a subforum with explicit privileges
    pub fn with_subforum(mut self, subforum: Subforum) -> Self {
        self.subforums.push(subforum);
        self
    }
}

impl Subforum {
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            thread_privilege: Privilege::User,
            reply_privilege: Privilege::User,
        }
    }

    pub fn thread_privilege(mut self, privilege: Privilege) -> Self {
        self.thread_privilege = privilege;
        self
    }

    pub fn reply_privilege(mut self, privilege: Privilege) -> Self {
        self.reply_privilege = privilege;
        self
    }
}
