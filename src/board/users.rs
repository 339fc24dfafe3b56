//! Account write paths: registration, verification, login, logout

use rand::Rng;

use crate::error::{AuthError, LarigotError, Result, ValidationError};
use crate::model::User;
use crate::store::{encode_id, BucketRead, BucketWrite};
use super::password::{hash_password, verify_password};
use super::repo::{Records, RecordsMut};
use super::Board;

/// Maximum username length in characters
pub const MAX_USERNAME_LEN: usize = 24;

/// Minimum password length in characters
pub const MIN_PASSWORD_LEN: usize = 8;

/// Outcome of a registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub username: String,
    /// Verification token; empty when the account was verified immediately
    pub token: String,
    pub verified: bool,
}

/// Trim and check a username
pub fn validate_username(username: &str) -> std::result::Result<String, ValidationError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(ValidationError::UsernameEmpty);
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(ValidationError::UsernameTooLong);
    }
    if !username.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(ValidationError::UsernameIllegalCharacter);
    }
    Ok(username.to_string())
}

/// Check a password's length
pub fn validate_password(password: &str) -> std::result::Result<(), ValidationError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort);
    }
    Ok(())
}

impl Board {
    /// Create an account
    ///
    /// The account is committed before the registration email is sent; a
    /// failed email is reported as `Notification` but the account stays.
    pub fn register(&self, username: &str, email: &str, password: &str) -> Result<Registration> {
        let username = validate_username(username)?;
        validate_password(password)?;

        // Slow on purpose: keep it outside the write lock.
        let password_hash = hash_password(password, self.config.password_cost)?;
        let verified = !self.config.notifications_enabled;
        let token = if verified {
            String::new()
        } else {
            encode_id(rand::thread_rng().gen())
        };

        self.engine.update(|tx| {
            let schema = &self.schema;
            let folded = username.to_lowercase();
            let taken = tx
                .cursor(&schema.users)?
                .forward()
                .any(|(key, _)| String::from_utf8_lossy(&key).to_lowercase() == folded);
            if taken {
                return Err(ValidationError::UserAlreadyExists.into());
            }

            let mut records = RecordsMut::new(schema, tx);
            records.put_user(&User {
                username: username.clone(),
                password_hash: password_hash.clone(),
                verified,
                email: email.trim().to_string(),
                mute: String::new(),
                post_nudge_shown: false,
            })?;

            let tx = records.txn();
            tx.create_bucket_if_not_exists(&schema.threads_of(&username))?;
            tx.create_bucket_if_not_exists(&schema.posts_of(&username))?;
            if !verified {
                tx.write(&schema.validation, token.as_bytes(), username.clone().into_bytes())?;
            }
            Ok(())
        })?;

        tracing::info!("Registered user {}", username);

        if !verified {
            self.notifier
                .send_registration_email(&username, email.trim(), &token)
                .map_err(LarigotError::Notification)?;
        }

        Ok(Registration {
            username,
            token,
            verified,
        })
    }

    /// Redeem a verification token; returns the verified username
    pub fn verify(&self, token: &str) -> Result<String> {
        self.engine.update(|tx| {
            let schema = &self.schema;
            let username = tx
                .read(&schema.validation, token.as_bytes())?
                .and_then(|raw| String::from_utf8(raw).ok())
                .ok_or(LarigotError::NotFound("verification code"))?;

            let mut records = RecordsMut::new(schema, tx);
            let mut user = records
                .read()
                .user(&username)?
                .ok_or(LarigotError::NotFound("user"))?;
            user.verified = true;
            records.put_user(&user)?;
            records.txn().remove(&schema.validation, token.as_bytes())?;

            tracing::info!("Verified user {}", username);
            Ok(username)
        })
    }

    /// Bind a certificate fingerprint to an account
    ///
    /// A fingerprint binds to one user at a time (the last login wins); a user
    /// may be bound from several fingerprints.
    pub fn login(&self, username: &str, password: &str, fingerprint: &str) -> Result<()> {
        let username = username.trim();
        let user = self
            .engine
            .view(|tx| Records::new(&self.schema, tx).user(username))?
            .ok_or(AuthError::BadCredentials)?;

        if !user.verified {
            return Err(AuthError::NotVerified.into());
        }
        if !verify_password(password, &user.password_hash)? {
            tracing::debug!("Failed login for {}", username);
            return Err(AuthError::BadCredentials.into());
        }

        self.engine.update(|tx| {
            tx.write(
                &self.schema.certfp,
                fingerprint.as_bytes(),
                user.username.clone().into_bytes(),
            )
        })?;

        tracing::info!("{} logged in", user.username);
        Ok(())
    }

    /// Remove a fingerprint binding; absent bindings are fine
    pub fn logout(&self, fingerprint: &str) -> Result<()> {
        self.engine
            .update(|tx| tx.remove(&self.schema.certfp, fingerprint.as_bytes()))
    }

    /// Look up an account
    pub fn user(&self, username: &str) -> Result<Option<User>> {
        self.engine
            .view(|tx| Records::new(&self.schema, tx).user(username))
    }

    /// Mark the one-time posting notice as shown
    ///
    /// Returns true if this call flipped the flag, i.e. the notice should be
    /// shown now instead of performing the post.
    pub fn take_post_nudge(&self, username: &str) -> Result<bool> {
        self.engine.update(|tx| {
            let mut records = RecordsMut::new(&self.schema, tx);
            let mut user = records
                .read()
                .user(username)?
                .ok_or(LarigotError::NotFound("user"))?;
            if user.post_nudge_shown {
                return Ok(false);
            }
            user.post_nudge_shown = true;
            records.put_user(&user)?;
            Ok(true)
        })
    }
}
