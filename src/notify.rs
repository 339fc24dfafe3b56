//! Notification collaborator
//!
//! Email delivery lives outside the core. A failed notification is reported
//! to the caller but never rolls back the write that triggered it.

use parking_lot::Mutex;

use crate::model::Post;

/// Outbound notifications
pub trait Notifier: Send + Sync {
    /// Deliver the verification token for a new account
    fn send_registration_email(&self, username: &str, address: &str, token: &str) -> Result<(), String>;

    /// Tell the moderators about a reported post
    fn send_report_email(
        &self,
        post: &Post,
        reporter: &str,
        reason: &str,
        network_info: &str,
    ) -> Result<(), String>;
}

/// Drops every notification
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn send_registration_email(&self, _: &str, _: &str, _: &str) -> Result<(), String> {
        Ok(())
    }

    fn send_report_email(&self, _: &Post, _: &str, _: &str, _: &str) -> Result<(), String> {
        Ok(())
    }
}

/// Writes notifications to the log instead of sending them
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send_registration_email(&self, username: &str, address: &str, token: &str) -> Result<(), String> {
        tracing::info!(
            username,
            address,
            "Registration email: verify at /verify/{}/",
            token
        );
        Ok(())
    }

    fn send_report_email(
        &self,
        post: &Post,
        reporter: &str,
        reason: &str,
        network_info: &str,
    ) -> Result<(), String> {
        tracing::info!(
            post = post.id,
            thread = post.thread,
            reporter,
            network_info,
            "Report: {}",
            reason
        );
        Ok(())
    }
}

/// A notification captured by [`RecordingNotifier`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Registration {
        username: String,
        address: String,
        token: String,
    },
    Report {
        post_id: u64,
        reporter: String,
        reason: String,
        network_info: String,
    },
}

/// Keeps every notification in memory; can be told to fail
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Sent>>,
    fail: Mutex<bool>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent sends fail
    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock() = fail;
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().clone()
    }

    fn record(&self, message: Sent) -> Result<(), String> {
        if *self.fail.lock() {
            return Err("mail server unavailable".to_string());
        }
        self.sent.lock().push(message);
        Ok(())
    }
}

impl Notifier for RecordingNotifier {
    fn send_registration_email(&self, username: &str, address: &str, token: &str) -> Result<(), String> {
        self.record(Sent::Registration {
            username: username.to_string(),
            address: address.to_string(),
            token: token.to_string(),
        })
    }

    fn send_report_email(
        &self,
        post: &Post,
        reporter: &str,
        reason: &str,
        network_info: &str,
    ) -> Result<(), String> {
        self.record(Sent::Report {
            post_id: post.id,
            reporter: reporter.to_string(),
            reason: reason.to_string(),
            network_info: network_info.to_string(),
        })
    }
}
