//! Privilege levels

use std::fmt;

use serde::{Deserialize, Serialize};

/// Ordered rank checked with an "at least" comparison
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum Privilege {
    #[default]
    User = 0,
    Mod = 1,
    Admin = 2,
}

impl Privilege {
    /// All levels, lowest first
    pub const ALL: [Privilege; 3] = [Privilege::User, Privilege::Mod, Privilege::Admin];

    /// True if `self` is at least `required`
    pub fn is(self, required: Privilege) -> bool {
        self >= required
    }
}

impl fmt::Display for Privilege {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Privilege::User => "User",
            Privilege::Mod => "Mod",
            Privilege::Admin => "Admin",
        };
        f.write_str(name)
    }
}
