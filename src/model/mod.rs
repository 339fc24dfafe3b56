//! Entity Model
//!
//! Records stored in the board's buckets plus the static forum definitions.
//!
//! ## Entities
//! - [`User`]: keyed by username in `users`
//! - [`Thread`]: keyed by 16-digit hex id in `allthreads`
//! - [`Post`]: keyed by 16-digit hex id in `posts`
//! - [`Forum`] / [`Subforum`]: configuration only; the store holds just the
//!   subforum's thread-membership list
//!
//! All records are bincode-encoded through [`crate::store::codec`].

mod forum;
mod post;
mod privilege;
mod thread;
mod user;

pub use forum::{Forum, Subforum};
pub use post::Post;
pub use privilege::Privilege;
pub use thread::Thread;
pub use user::{format_duration, MuteState, MuteStatus, User, PERMANENT_MUTE};

/// Render a username with its privilege prefix, e.g. `[Mod]alice`
pub fn display_username(username: &str, privilege: Privilege) -> String {
    match privilege {
        Privilege::User => username.to_string(),
        other => format!("[{}]{}", other, username),
    }
}
