//! Board Module
//!
//! The bulletin-board core: identity resolution, the write paths that keep
//! records and their indices consistent, and the read/query layer.
//!
//! ## Responsibilities
//! - One read-write transaction per logical write (thread, reply, account,
//!   moderation), covering the primary record and every index it touches
//! - Tolerant reads that skip dangling index entries
//! - Feeding the keyword index after each committed post
//!
//! ## Layout
//! See [`schema`] for the bucket layout.

mod identity;
mod moderation;
mod password;
mod query;
mod repo;
pub mod schema;
mod threads;
mod users;

pub use identity::{fingerprint, Identity, INTERNAL_USERNAME};
pub use moderation::{CommandRecord, MuteDuration, DEFAULT_READ_COUNT};
pub use password::{hash_password, verify_password};
pub use query::{KeywordHit, PostHit, ThreadHit, ThreadView, UserActivity};
pub use threads::{validate_text, validate_title, NewThread, MAX_TITLE_LEN};
pub use users::{validate_password, validate_username, Registration, MAX_USERNAME_LEN, MIN_PASSWORD_LEN};

use std::fs;
use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::engine::Engine;
use crate::error::Result;
use crate::model::Post;
use crate::notify::{Notifier, NullNotifier};
use crate::search::{self, IndexPipeline, IndexTask, SearchIndex};
use crate::store::{codec, BucketRead, BucketWrite};
use schema::Schema;

/// A running board: the store, the keyword index and the collaborators
pub struct Board {
    config: Config,
    schema: Schema,
    engine: Engine,
    index: Arc<SearchIndex>,
    pipeline: IndexPipeline,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
}

impl Board {
    /// Open a board with the system clock and no notifications
    pub fn open(config: Config) -> Result<Self> {
        Self::open_with(config, Arc::new(NullNotifier), Arc::new(SystemClock))
    }

    /// Open a board with explicit collaborators
    ///
    /// On startup:
    /// 1. Validate the static configuration
    /// 2. Open the store and create any missing bucket
    /// 3. Open the keyword index, rebuilding it if missing or not marked
    ///    ready (an unclean exit or a lost update)
    /// 4. Start the indexing worker, which clears the marker until close
    pub fn open_with(
        config: Config,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.data_dir)?;

        let schema = Schema::new();
        let engine = Engine::open(config.store_options())?;
        ensure_schema(&engine, &schema, &config)?;

        let (index, needs_rebuild) =
            SearchIndex::open_or_reset(config.search_options(), config.search_result_limit)?;
        let index = Arc::new(index);
        if needs_rebuild {
            rebuild_index(&engine, &schema, &index)?;
        }

        let pipeline = IndexPipeline::start(
            Arc::clone(&index),
            config.index_queue_capacity,
            config.index_enqueue_timeout(),
        )?;

        tracing::info!(
            "Board opened at {} ({} subforums)",
            config.data_dir.display(),
            config.subforum_ids().count()
        );

        Ok(Self {
            config,
            schema,
            engine,
            index,
            pipeline,
            notifier,
            clock,
        })
    }

    /// Rebuild the keyword index from every stored post
    ///
    /// The indexing worker waits until the rebuild is done.
    pub fn reindex(&self) -> Result<u64> {
        self.pipeline
            .run_exclusive(|| rebuild_index(&self.engine, &self.schema, &self.index))
    }

    /// Queue a committed post for indexing
    fn enqueue_index(&self, post: &Post) {
        self.pipeline.submit(index_task(post));
    }

    /// Stop the indexing worker and sync both files
    pub fn close(self) -> Result<()> {
        let Board {
            engine,
            index,
            pipeline,
            ..
        } = self;

        pipeline.shutdown()?;
        drop(pipeline);
        match Arc::try_unwrap(index) {
            Ok(index) => index.close()?,
            Err(_) => tracing::warn!("Search index still shared at close"),
        }
        engine.close()?;
        tracing::info!("Board closed");
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The primary store
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// The keyword index
    pub fn search_index(&self) -> &SearchIndex {
        &self.index
    }

    /// The indexing pipeline
    pub fn pipeline(&self) -> &IndexPipeline {
        &self.pipeline
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }
}

/// Create every root bucket and one thread list per configured subforum
fn ensure_schema(engine: &Engine, schema: &Schema, config: &Config) -> Result<()> {
    engine.update(|tx| {
        for bucket in schema.roots() {
            tx.create_bucket_if_not_exists(bucket)?;
        }
        for id in config.subforum_ids() {
            tx.create_bucket_if_not_exists(&schema.subforum(id))?;
        }
        Ok(())
    })
}

fn rebuild_index(engine: &Engine, schema: &Schema, index: &SearchIndex) -> Result<u64> {
    engine.view(|tx| {
        let total = tx.record_count(&schema.posts)?;
        let tasks = tx
            .cursor(&schema.posts)?
            .forward()
            .map(|(_, raw)| codec::decode::<Post>(&raw).map(|p| index_task(&p)));
        search::rebuild(index, total, tasks)
    })
}

fn index_task(post: &Post) -> IndexTask {
    IndexTask {
        post_id: post.id,
        thread_id: post.thread,
        author: post.author.clone(),
        text: post.text.clone(),
    }
}

impl std::fmt::Debug for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Board")
            .field("data_dir", &self.config.data_dir)
            .field("committed_version", &self.engine.committed_version())
            .finish()
    }
}
