//! Typed repositories over the board buckets
//!
//! Call sites go through these instead of touching raw keys.

use crate::engine::WriteTxn;
use crate::error::Result;
use crate::model::{Post, Thread, User};
use crate::store::keys::parse_id_bytes;
use crate::store::{encode_id, BucketPath, BucketRead, BucketWrite};
use super::schema::Schema;

/// Read access to board records
pub(crate) struct Records<'t, T> {
    schema: &'t Schema,
    tx: &'t T,
}

impl<'t, T: BucketRead> Records<'t, T> {
    pub fn new(schema: &'t Schema, tx: &'t T) -> Self {
        Self { schema, tx }
    }

    pub fn user(&self, username: &str) -> Result<Option<User>> {
        self.tx.read_record(&self.schema.users, username.as_bytes())
    }

    pub fn thread(&self, id: u64) -> Result<Option<Thread>> {
        self.tx
            .read_record(&self.schema.all_threads, encode_id(id).as_bytes())
    }

    pub fn post(&self, id: u64) -> Result<Option<Post>> {
        self.tx.read_record(&self.schema.posts, encode_id(id).as_bytes())
    }

    /// Subforum a thread was started in
    pub fn subforum_of(&self, thread_id: u64) -> Result<Option<String>> {
        Ok(self
            .tx
            .read(&self.schema.thread_to_subforum, encode_id(thread_id).as_bytes())?
            .and_then(|raw| String::from_utf8(raw).ok()))
    }

    /// Username bound to a certificate fingerprint
    pub fn bound_username(&self, fingerprint: &str) -> Result<Option<String>> {
        Ok(self
            .tx
            .read(&self.schema.certfp, fingerprint.as_bytes())?
            .and_then(|raw| String::from_utf8(raw).ok()))
    }

    /// Ids stored in an id list, oldest first
    pub fn ids(&self, list: &BucketPath) -> Result<Vec<u64>> {
        Ok(self.tx.cursor(list)?.forward().filter_map(|e| decode_entry(list, e)).collect())
    }

    /// Ids stored in an id list, newest first
    pub fn ids_rev(&self, list: &BucketPath) -> Result<Vec<u64>> {
        Ok(self.tx.cursor(list)?.backward().filter_map(|e| decode_entry(list, e)).collect())
    }

    /// First id of a list
    pub fn first_id(&self, list: &BucketPath) -> Result<Option<u64>> {
        Ok(self.tx.cursor(list)?.first().and_then(|e| decode_entry(list, e)))
    }
}

fn decode_entry(list: &BucketPath, (key, value): (Vec<u8>, Vec<u8>)) -> Option<u64> {
    let id = parse_id_bytes(&value);
    if id.is_none() {
        tracing::warn!(
            "Malformed id {:?} under key {:?} in {}",
            String::from_utf8_lossy(&value),
            String::from_utf8_lossy(&key),
            list
        );
    }
    id
}

/// Write access to board records
pub(crate) struct RecordsMut<'t, 'e> {
    schema: &'t Schema,
    tx: &'t mut WriteTxn<'e>,
}

impl<'t, 'e> RecordsMut<'t, 'e> {
    pub fn new(schema: &'t Schema, tx: &'t mut WriteTxn<'e>) -> Self {
        Self { schema, tx }
    }

    /// Reads that see this transaction's own writes
    pub fn read(&self) -> Records<'_, WriteTxn<'e>> {
        Records::new(self.schema, self.tx)
    }

    pub fn txn(&mut self) -> &mut WriteTxn<'e> {
        self.tx
    }

    pub fn put_user(&mut self, user: &User) -> Result<()> {
        self.tx
            .write_record(&self.schema.users, user.username.as_bytes(), user)
    }

    pub fn put_thread(&mut self, thread: &Thread) -> Result<()> {
        self.tx
            .write_record(&self.schema.all_threads, encode_id(thread.id).as_bytes(), thread)
    }

    pub fn put_post(&mut self, post: &Post) -> Result<()> {
        self.tx
            .write_record(&self.schema.posts, encode_id(post.id).as_bytes(), post)
    }

    /// Append an id to a list under the list's next sequence; returns the
    /// position used
    pub fn append(&mut self, list: &BucketPath, id: u64) -> Result<u64> {
        let seq = self.tx.next_sequence(list)?;
        self.tx.write(
            list,
            encode_id(seq).as_bytes(),
            encode_id(id).into_bytes(),
        )?;
        Ok(seq)
    }

    /// Create a post in `thread_id` and update every index that lists it
    ///
    /// The post gets the next global id and the next position in the
    /// thread; the author's post list gets the id appended.
    pub fn append_post(
        &mut self,
        thread_id: u64,
        author: &str,
        text: &str,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<Post> {
        let schema = self.schema;
        let id = self.tx.next_sequence(&schema.posts)?;
        let index = self.append(&schema.thread_posts(thread_id), id)?;

        let post = Post {
            id,
            text: text.to_string(),
            author: author.to_string(),
            time: now,
            thread: thread_id,
            index,
            archived: false,
            reports: 0,
        };
        self.put_post(&post)?;
        self.append(&schema.posts_of(author), id)?;
        Ok(post)
    }
}
