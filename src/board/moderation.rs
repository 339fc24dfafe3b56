//! Moderation: mute, report, console commands and the audit log

use std::str::FromStr;

use chrono::{Duration, SecondsFormat};

use crate::error::{AuthError, LarigotError, Result, ValidationError};
use crate::model::{MuteState, Post, Privilege};
use crate::store::{BucketRead, BucketWrite};
use super::identity::Identity;
use super::repo::RecordsMut;
use super::Board;

/// Entries returned by `read` when no count is given
pub const DEFAULT_READ_COUNT: usize = 32;

/// How long a mute lasts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MuteDuration {
    Permanent,
    Days(i64),
}

impl FromStr for MuteDuration {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s == "permanent" {
            return Ok(MuteDuration::Permanent);
        }
        match s.parse::<i64>() {
            Ok(days) if days > 0 => Ok(MuteDuration::Days(days)),
            Ok(_) => Err(ValidationError::MuteDuration(
                "day count must be positive".to_string(),
            )),
            Err(_) => Err(ValidationError::MuteDuration(format!(
                "expected \"permanent\" or a number of days, got {:?}",
                s
            ))),
        }
    }
}

/// One audit log entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRecord {
    /// RFC 3339 timestamp with nanoseconds
    pub time: String,
    /// `actor/Privilege:command`
    pub entry: String,
}

impl Board {
    /// Mute a user; returns the stored state
    pub fn mute(&self, target: &str, duration: MuteDuration) -> Result<MuteState> {
        let state = match duration {
            MuteDuration::Permanent => MuteState::Permanent,
            MuteDuration::Days(days) if days > 0 => {
                let until = Duration::try_days(days)
                    .and_then(|d| self.clock.now().checked_add_signed(d))
                    .ok_or_else(|| {
                        ValidationError::MuteDuration(format!("{} days is out of range", days))
                    })?;
                MuteState::Until(until)
            }
            MuteDuration::Days(_) => {
                return Err(ValidationError::MuteDuration(
                    "day count must be positive".to_string(),
                )
                .into())
            }
        };

        self.write_mute(target, state)?;
        tracing::info!("Muted {} ({})", target, state.to_stored());
        Ok(state)
    }

    /// Clear a user's mute
    pub fn unmute(&self, target: &str) -> Result<()> {
        self.write_mute(target, MuteState::Unmuted)?;
        tracing::info!("Unmuted {}", target);
        Ok(())
    }

    fn write_mute(&self, target: &str, state: MuteState) -> Result<()> {
        self.engine.update(|tx| {
            let mut records = RecordsMut::new(&self.schema, tx);
            let mut user = records
                .read()
                .user(target)?
                .ok_or(LarigotError::NotFound("user"))?;
            user.mute = state.to_stored();
            records.put_user(&user)
        })
    }

    /// Report a post to the moderators
    ///
    /// A post can be reported once; the second report is `AlreadyReported`.
    /// The report email is sent after the commit and its failure does not
    /// undo the report.
    pub fn report(
        &self,
        caller: &Identity,
        post_id: u64,
        reason: &str,
        network_info: &str,
    ) -> Result<Post> {
        if caller.is_anonymous() {
            return Err(AuthError::NotLoggedIn.into());
        }

        let post = self.engine.update(|tx| {
            let mut records = RecordsMut::new(&self.schema, tx);
            let mut post = records
                .read()
                .post(post_id)?
                .ok_or(LarigotError::NotFound("post"))?;
            if post.is_reported() {
                return Err(LarigotError::AlreadyReported);
            }
            post.reports = 1;
            records.put_post(&post)?;
            Ok(post)
        })?;

        tracing::info!("{} reported post {}", caller.username, post_id);

        if self.config.notifications_enabled {
            self.notifier
                .send_report_email(&post, &caller.username, reason, network_info)
                .map_err(LarigotError::Notification)?;
        }
        Ok(post)
    }

    /// Run a moderator console command
    ///
    /// Every authorized command is written to the audit log, whether it
    /// succeeded or not.
    pub fn console_command(&self, caller: &Identity, command: &str) -> Result<String> {
        if !caller.privilege.is(Privilege::Mod) {
            return Err(AuthError::InsufficientPrivilege.into());
        }

        let command = command.trim();
        let result = self.run_command(command);
        if let Err(e) = self.log(caller, command) {
            tracing::error!("Failed to record console command {:?}: {}", command, e);
        }
        result
    }

    fn run_command(&self, command: &str) -> Result<String> {
        let mut words = command.split_whitespace();
        let name = words.next().unwrap_or_default();
        let args: Vec<&str> = words.collect();

        match (name, args.as_slice()) {
            ("mute", [user, duration]) => {
                let duration: MuteDuration = duration.parse()?;
                match self.mute(user, duration)? {
                    MuteState::Until(t) => Ok(format!(
                        "Muted {} until {}",
                        user,
                        t.to_rfc3339_opts(SecondsFormat::Secs, true)
                    )),
                    _ => Ok(format!("Muted {} permanently", user)),
                }
            }
            ("unmute", [user]) => {
                self.unmute(user)?;
                Ok(format!("Unmuted {}", user))
            }
            ("read", rest) => {
                let mut count = DEFAULT_READ_COUNT;
                let mut with_time = true;
                for arg in rest {
                    if *arg == "notime" {
                        with_time = false;
                    } else {
                        count = arg.parse().map_err(|_| {
                            ValidationError::BadInput(format!("not a count: {:?}", arg))
                        })?;
                    }
                }
                let lines: Vec<String> = self
                    .read_recent_commands(count)?
                    .into_iter()
                    .map(|r| {
                        if with_time {
                            format!("{} {}", r.time, r.entry)
                        } else {
                            r.entry
                        }
                    })
                    .collect();
                Ok(lines.join("\n"))
            }
            ("log", text) if !text.is_empty() => Ok("Logged".to_string()),
            ("lock", [id]) => {
                let thread = self.set_thread_locked(parse_thread_id(id)?, true)?;
                Ok(format!("Locked thread {}", thread.id))
            }
            ("unlock", [id]) => {
                let thread = self.set_thread_locked(parse_thread_id(id)?, false)?;
                Ok(format!("Unlocked thread {}", thread.id))
            }
            ("archive", [id]) => {
                let thread = self.set_thread_archived(parse_thread_id(id)?, true)?;
                Ok(format!("Archived thread {}", thread.id))
            }
            ("unarchive", [id]) => {
                let thread = self.set_thread_archived(parse_thread_id(id)?, false)?;
                Ok(format!("Unarchived thread {}", thread.id))
            }
            _ => Err(ValidationError::BadInput(format!("unknown command: {}", command)).into()),
        }
    }

    /// Append a line to the audit log
    pub fn log(&self, actor: &Identity, text: &str) -> Result<()> {
        let entry = format!("{}/{}:{}", actor.username, actor.privilege, text);
        self.engine.update(|tx| {
            let console = &self.schema.console;
            let mut at = self.clock.now();
            // Keys must be unique; step past entries written in the same nanosecond.
            let key = loop {
                let key = at.to_rfc3339_opts(SecondsFormat::Nanos, true);
                if tx.read(console, key.as_bytes())?.is_none() {
                    break key;
                }
                at += Duration::nanoseconds(1);
            };
            tx.write(console, key.as_bytes(), entry.clone().into_bytes())
        })
    }

    /// Newest audit log entries first
    pub fn read_recent_commands(&self, count: usize) -> Result<Vec<CommandRecord>> {
        self.engine.view(|tx| {
            Ok(tx
                .cursor(&self.schema.console)?
                .backward()
                .take(count)
                .map(|(key, value)| CommandRecord {
                    time: String::from_utf8_lossy(&key).into_owned(),
                    entry: String::from_utf8_lossy(&value).into_owned(),
                })
                .collect())
        })
    }
}

fn parse_thread_id(raw: &str) -> Result<u64> {
    raw.parse()
        .map_err(|_| ValidationError::BadInput(format!("not a thread id: {:?}", raw)).into())
}
