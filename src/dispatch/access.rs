//! Access levels and the permission gate
//!
//! A small closed ladder of privilege levels. A user and a chat each carry
//! one; the effective level of an invocation is the greater of the two, and
//! a command runs iff the effective level reaches its required level. Plain
//! integer comparisons, no role sets.

use strum::{Display, EnumIter, EnumString};

/// Ordered privilege ladder. The numeric values are stored in the database,
/// so variants must keep their discriminants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum AccessLevel {
    Guest = 0,
    Trusted = 1,
    Moderator = 2,
    Admin = 3,
}

impl AccessLevel {
    /// Maps a stored integer onto the ladder, clamping unknown values down.
    pub fn from_i64(value: i64) -> Self {
        match value {
            v if v >= 3 => AccessLevel::Admin,
            2 => AccessLevel::Moderator,
            1 => AccessLevel::Trusted,
            _ => AccessLevel::Guest,
        }
    }

    pub fn as_i64(self) -> i64 {
        self as i64
    }
}

/// Effective level for a (user, chat) pair: the maximum of the two.
pub fn effective_level(user_level: i64, chat_level: i64) -> i64 {
    user_level.max(chat_level)
}

/// Permitted iff the effective level reaches the required one
/// (boundary at equality: permitted).
pub fn is_permitted(effective: i64, required: i64) -> bool {
    effective >= required
}
