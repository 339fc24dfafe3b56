//! Configuration for larigot
//!
//! Centralized configuration with sensible defaults. Loading from a file is
//! left to the caller; every type here derives `Deserialize` for that purpose.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{LarigotError, Result};
use crate::model::{Forum, Privilege, Subforum};

/// Main configuration for a board instance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── board.db       (transaction log holding every record)
    ///     └── keywords.db    (full-text index, rebuilt when missing)
    pub data_dir: PathBuf,

    /// File name of the primary store inside `data_dir`
    pub store_file: String,

    /// File name of the full-text index inside `data_dir`
    pub search_file: String,

    // -------------------------------------------------------------------------
    // WAL Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: how often to fsync the log
    pub wal_sync_strategy: WalSyncStrategy,

    /// Log size (in bytes) above which the log is rewritten as a checkpoint
    pub compaction_threshold: u64,

    // -------------------------------------------------------------------------
    // Search Configuration
    // -------------------------------------------------------------------------
    /// Capacity of the indexing queue
    pub index_queue_capacity: usize,

    /// How long a submitter waits on a full indexing queue (milliseconds)
    pub index_enqueue_timeout_ms: u64,

    /// Maximum number of keyword search hits returned
    pub search_result_limit: usize,

    // -------------------------------------------------------------------------
    // Board Configuration
    // -------------------------------------------------------------------------
    /// Forum name shown on the home page
    pub forum_name: String,

    /// Whether registration and report emails are sent.
    /// When disabled, new accounts are verified immediately.
    pub notifications_enabled: bool,

    /// Minimum privilege allowed to reply to a locked thread
    pub reply_to_locked: Privilege,

    /// Argon2 cost parameters for password hashing
    pub password_cost: PasswordCost,

    /// Static username -> privilege table
    pub privileges: Vec<PrivilegeGrant>,

    /// Forum tree; subforums are defined here, not in the store
    pub forums: Vec<Forum>,
}

/// WAL sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WalSyncStrategy {
    /// fsync after every write (safest, slowest)
    EveryWrite,

    /// fsync after N uncommitted entries (balanced durability/performance)
    EveryNEntries { count: usize },
}

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordCost {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of passes
    pub iterations: u32,
    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for PasswordCost {
    fn default() -> Self {
        Self {
            memory_kib: 19 * 1024, // 19 MiB
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl PasswordCost {
    /// Minimal cost, for tests and benchmarks only
    pub fn fast() -> Self {
        Self {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        }
    }
}

/// One row of the static privilege table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivilegeGrant {
    pub username: String,
    pub privilege: Privilege,
}

/// Default wait for a store file held by another handle
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(1);

/// Options for one engine file
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Path of the log file
    pub path: PathBuf,
    /// Sync strategy for appends
    pub sync: WalSyncStrategy,
    /// Compaction threshold in bytes
    pub compaction_threshold: u64,
    /// How long `Engine::open` waits for another holder to release the file
    pub lock_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./larigot_data"),
            store_file: "board.db".to_string(),
            search_file: "keywords.db".to_string(),
            wal_sync_strategy: WalSyncStrategy::EveryWrite,
            compaction_threshold: 64 * 1024 * 1024, // 64 MB
            index_queue_capacity: 64,
            index_enqueue_timeout_ms: 50,
            search_result_limit: 10,
            forum_name: String::new(),
            notifications_enabled: false,
            reply_to_locked: Privilege::Mod,
            password_cost: PasswordCost::default(),
            privileges: Vec::new(),
            forums: Vec::new(),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check the load-time invariants of the static configuration:
    /// unique forum names, unique subforum ids, and no username listed
    /// with two different privilege levels.
    pub fn validate(&self) -> Result<()> {
        let mut forum_names = HashSet::new();
        let mut subforum_ids = HashSet::new();

        for forum in &self.forums {
            if !forum_names.insert(forum.name.as_str()) {
                return Err(LarigotError::Config(format!(
                    "Duplicate forum name: {}",
                    forum.name
                )));
            }
            for sub in &forum.subforums {
                if !subforum_ids.insert(sub.id.as_str()) {
                    return Err(LarigotError::Config(format!(
                        "Duplicate subforum id: {}",
                        sub.id
                    )));
                }
            }
        }

        for (i, grant) in self.privileges.iter().enumerate() {
            let conflict = self.privileges[..i]
                .iter()
                .any(|g| g.username == grant.username && g.privilege != grant.privilege);
            if conflict {
                return Err(LarigotError::Config(format!(
                    "User {} is listed with two privilege levels",
                    grant.username
                )));
            }
        }

        if self.index_queue_capacity == 0 {
            return Err(LarigotError::Config(
                "index_queue_capacity must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Privilege of a username; unlisted users are ordinary users
    pub fn privilege_of(&self, username: &str) -> Privilege {
        self.privileges
            .iter()
            .find(|g| g.username == username)
            .map(|g| g.privilege)
            .unwrap_or_default()
    }

    /// Look up a subforum by id
    pub fn subforum(&self, id: &str) -> Option<&Subforum> {
        self.forums
            .iter()
            .flat_map(|f| f.subforums.iter())
            .find(|s| s.id == id)
    }

    /// Every configured subforum id, in configuration order
    pub fn subforum_ids(&self) -> impl Iterator<Item = &str> {
        self.forums
            .iter()
            .flat_map(|f| f.subforums.iter())
            .map(|s| s.id.as_str())
    }

    /// Engine options for the primary store
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            path: self.data_dir.join(&self.store_file),
            sync: self.wal_sync_strategy,
            compaction_threshold: self.compaction_threshold,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    /// Engine options for the full-text index
    pub fn search_options(&self) -> StoreOptions {
        StoreOptions {
            path: self.data_dir.join(&self.search_file),
            sync: WalSyncStrategy::EveryNEntries { count: 100 },
            compaction_threshold: self.compaction_threshold,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    /// Enqueue timeout as a Duration
    pub fn index_enqueue_timeout(&self) -> Duration {
        Duration::from_millis(self.index_enqueue_timeout_ms)
    }
}

impl StoreOptions {
    /// Options for a log at `path` with default sync and compaction settings
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            sync: WalSyncStrategy::EveryWrite,
            compaction_threshold: 64 * 1024 * 1024,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    /// Set how long opening waits for the file lock
    pub fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the WAL sync strategy
    pub fn wal_sync_strategy(mut self, strategy: WalSyncStrategy) -> Self {
        self.config.wal_sync_strategy = strategy;
        self
    }

    /// Set the compaction threshold (in bytes)
    pub fn compaction_threshold(mut self, bytes: u64) -> Self {
        self.config.compaction_threshold = bytes;
        self
    }

    /// Set the indexing queue capacity
    pub fn index_queue_capacity(mut self, capacity: usize) -> Self {
        self.config.index_queue_capacity = capacity;
        self
    }

    /// Set the enqueue timeout on a full indexing queue (in milliseconds)
    pub fn index_enqueue_timeout_ms(mut self, ms: u64) -> Self {
        self.config.index_enqueue_timeout_ms = ms;
        self
    }

    /// Set the maximum number of keyword search hits
    pub fn search_result_limit(mut self, limit: usize) -> Self {
        self.config.search_result_limit = limit;
        self
    }

    /// Set the forum name
    pub fn forum_name(mut self, name: impl Into<String>) -> Self {
        self.config.forum_name = name.into();
        self
    }

    /// Enable or disable outbound notifications
    pub fn notifications_enabled(mut self, enabled: bool) -> Self {
        self.config.notifications_enabled = enabled;
        self
    }

    /// Set the minimum privilege that may reply to locked threads
    pub fn reply_to_locked(mut self, privilege: Privilege) -> Self {
        self.config.reply_to_locked = privilege;
        self
    }

    /// Set the password hashing cost
    pub fn password_cost(mut self, cost: PasswordCost) -> Self {
        self.config.password_cost = cost;
        self
    }

    /// Grant a privilege level to a username
    pub fn privilege(mut self, username: impl Into<String>, privilege: Privilege) -> Self {
        self.config.privileges.push(PrivilegeGrant {
            username: username.into(),
            privilege,
        });
        self
    }

    /// Add a forum with its subforums
    pub fn forum(mut self, forum: Forum) -> Self {
        self.config.forums.push(forum);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
