//! Thread and post write paths

use crate::error::{AuthError, LarigotError, Result, ValidationError};
use crate::model::{Post, Privilege, Thread};
use crate::store::{encode_id, BucketWrite};
use super::identity::Identity;
use super::repo::RecordsMut;
use super::Board;

/// Maximum title length in characters
pub const MAX_TITLE_LEN: usize = 96;

/// Result of starting a thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewThread {
    pub thread: Thread,
    /// The opening post
    pub post: Post,
}

/// Trim and check a thread title
pub fn validate_title(title: &str) -> std::result::Result<String, ValidationError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ValidationError::TitleEmpty);
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(ValidationError::TitleTooLong);
    }
    if !title.chars().all(is_title_char) {
        return Err(ValidationError::TitleIllegalCharacter);
    }
    Ok(title.to_string())
}

/// Post text must have something besides whitespace
pub fn validate_text(text: &str) -> std::result::Result<(), ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::PostEmpty);
    }
    Ok(())
}

fn is_title_char(c: char) -> bool {
    c.is_alphanumeric()
        || is_combining_mark(c)
        || (c.is_whitespace() && !c.is_control() && !matches!(c, '\u{2028}' | '\u{2029}'))
        || is_punctuation(c)
}

fn is_combining_mark(c: char) -> bool {
    matches!(c,
        '\u{0300}'..='\u{036F}'
        | '\u{1AB0}'..='\u{1AFF}'
        | '\u{1DC0}'..='\u{1DFF}'
        | '\u{20D0}'..='\u{20FF}'
        | '\u{FE20}'..='\u{FE2F}')
}

fn is_punctuation(c: char) -> bool {
    c.is_ascii_punctuation()
        || matches!(c,
            '\u{00A1}'..='\u{00BF}'
            | '\u{00D7}'
            | '\u{00F7}'
            | '\u{2010}'..='\u{2027}'
            | '\u{2030}'..='\u{205E}')
}

impl Board {
    /// Reject callers that may not write at all
    pub(crate) fn authorize_writer(&self, caller: &Identity) -> Result<()> {
        if caller.is_anonymous() {
            return Err(AuthError::NotLoggedIn.into());
        }
        if let Some(status) = caller.mute {
            return Err(AuthError::Muted(status).into());
        }
        Ok(())
    }

    /// Start a thread in a subforum with its opening post
    pub fn create_thread(
        &self,
        caller: &Identity,
        subforum_id: &str,
        title: &str,
        text: &str,
    ) -> Result<NewThread> {
        let subforum = self
            .config
            .subforum(subforum_id)
            .ok_or(LarigotError::NotFound("subforum"))?;
        self.authorize_writer(caller)?;
        if !caller.privilege.is(subforum.thread_privilege) {
            return Err(AuthError::InsufficientPrivilege.into());
        }
        let title = validate_title(title)?;
        validate_text(text)?;

        let created = self.engine.update(|tx| {
            let now = self.clock.now();
            let schema = &self.schema;
            let mut records = RecordsMut::new(schema, tx);

            let thread_id = records.txn().next_sequence(&schema.all_threads)?;
            let thread = Thread::new(thread_id, title.clone(), caller.username.clone(), now);
            records.put_thread(&thread)?;
            records
                .txn()
                .create_bucket_if_not_exists(&schema.thread_posts(thread_id))?;
            records.append(&schema.threads_of(&caller.username), thread_id)?;

            let post = records.append_post(thread_id, &caller.username, text, now)?;

            records.append(&schema.subforum(&subforum.id), thread_id)?;
            records.txn().write(
                &schema.thread_to_subforum,
                encode_id(thread_id).as_bytes(),
                subforum.id.clone().into_bytes(),
            )?;

            Ok(NewThread { thread, post })
        })?;

        tracing::info!(
            "{} started thread {} in {}",
            caller.username,
            created.thread.id,
            subforum.id
        );
        self.enqueue_index(&created.post);
        Ok(created)
    }

    /// Reply to an existing thread
    pub fn reply(&self, caller: &Identity, thread_id: u64, text: &str) -> Result<Post> {
        self.authorize_writer(caller)?;
        validate_text(text)?;

        let post = self.engine.update(|tx| {
            let now = self.clock.now();
            let mut records = RecordsMut::new(&self.schema, tx);

            let mut thread = records
                .read()
                .thread(thread_id)?
                .ok_or(LarigotError::NotFound("thread"))?;

            match records.read().subforum_of(thread_id)? {
                Some(id) => {
                    let required = self
                        .config
                        .subforum(&id)
                        .map_or(Privilege::User, |s| s.reply_privilege);
                    if !caller.privilege.is(required) {
                        return Err(AuthError::InsufficientPrivilege.into());
                    }
                }
                None => tracing::warn!("Thread {} has no subforum entry", thread_id),
            }

            if thread.locked && !caller.privilege.is(self.config.reply_to_locked) {
                return Err(AuthError::ThreadLocked.into());
            }

            thread.last_modified = now;
            records.put_thread(&thread)?;
            records.append_post(thread_id, &caller.username, text, now)
        })?;

        tracing::debug!("{} replied to thread {} as post {}", caller.username, thread_id, post.id);
        self.enqueue_index(&post);
        Ok(post)
    }

    /// Lock or unlock a thread
    pub fn set_thread_locked(&self, thread_id: u64, locked: bool) -> Result<Thread> {
        self.update_thread(thread_id, |t| t.locked = locked)
    }

    /// Archive or unarchive a thread
    pub fn set_thread_archived(&self, thread_id: u64, archived: bool) -> Result<Thread> {
        self.update_thread(thread_id, |t| t.archived = archived)
    }

    fn update_thread(&self, thread_id: u64, change: impl FnOnce(&mut Thread)) -> Result<Thread> {
        self.engine.update(|tx| {
            let mut records = RecordsMut::new(&self.schema, tx);
            let mut thread = records
                .read()
                .thread(thread_id)?
                .ok_or(LarigotError::NotFound("thread"))?;
            change(&mut thread);
            records.put_thread(&thread)?;
            Ok(thread)
        })
    }
}
