//! Identity resolution
//!
//! A caller is identified only by the SHA-256 fingerprint of the client
//! certificate presented on the connection.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use sha2::{Digest, Sha256};

use crate::model::{display_username, MuteStatus, Privilege};
use super::repo::Records;
use super::Board;

/// Username used by the admin binary
pub const INTERNAL_USERNAME: &str = "*internal*";

/// Who is calling, as far as the board can tell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Empty for anonymous callers
    pub username: String,
    pub privilege: Privilege,
    /// Active mute, if any
    pub mute: Option<MuteStatus>,
}

impl Identity {
    /// No certificate, or a certificate not bound to any account
    pub fn anonymous() -> Self {
        Self {
            username: String::new(),
            privilege: Privilege::User,
            mute: None,
        }
    }

    /// The operator running the admin binary
    pub fn internal() -> Self {
        Self {
            username: INTERNAL_USERNAME.to_string(),
            privilege: Privilege::Admin,
            mute: None,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.username.is_empty()
    }

    pub fn is_muted(&self) -> bool {
        self.mute.is_some()
    }

    /// Username with its privilege prefix
    pub fn display_name(&self) -> String {
        display_username(&self.username, self.privilege)
    }
}

/// Fingerprint of a DER-encoded client certificate: base64 of its SHA-256
pub fn fingerprint(der: &[u8]) -> String {
    STANDARD.encode(Sha256::digest(der))
}

impl Board {
    /// Resolve a certificate fingerprint to an identity
    ///
    /// Never fails: a missing binding, a binding to a missing user, an
    /// unreadable mute value or an engine error all degrade to a weaker
    /// identity and are logged.
    pub fn resolve(&self, fingerprint: Option<&str>) -> Identity {
        let Some(fingerprint) = fingerprint else {
            return Identity::anonymous();
        };

        let found = self.engine.view(|tx| {
            let records = Records::new(&self.schema, tx);
            let Some(username) = records.bound_username(fingerprint)? else {
                return Ok(None);
            };
            match records.user(&username)? {
                Some(user) => Ok(Some(user)),
                None => {
                    tracing::warn!(
                        "Fingerprint bound to {} but the user record is missing",
                        username
                    );
                    Ok(None)
                }
            }
        });

        let user = match found {
            Ok(Some(user)) => user,
            Ok(None) => return Identity::anonymous(),
            Err(e) => {
                tracing::error!("Identity lookup failed: {}", e);
                return Identity::anonymous();
            }
        };

        let mute = match user.mute_state() {
            Ok(state) => state.status_at(self.clock.now()),
            Err(e) => {
                tracing::warn!(
                    "Unreadable mute value {:?} for {}: {}",
                    user.mute,
                    user.username,
                    e
                );
                None
            }
        };

        Identity {
            privilege: self.config.privilege_of(&user.username),
            username: user.username,
            mute,
        }
    }
}
