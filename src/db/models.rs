//! Database row types for all tables.
//! These correspond 1:1 to the SQLite schema defined in migrations.rs.

use chrono::{DateTime, Utc};

/// User record in the users table
#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
}

/// Per-user presence record in the profiles table
#[derive(Debug, Clone)]
pub struct PresenceRow {
    pub user_id: i64,
    pub is_online: bool,
    pub last_seen: DateTime<Utc>,
}

/// Friend-request lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
}

impl RequestStatus {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "accepted" => Some(Self::Accepted),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }
}

/// Friend relationship record. One row per unordered user pair; the
/// per-direction unread flags mark whether that party has unseen messages.
#[derive(Debug, Clone)]
pub struct FriendRequestRow {
    pub id: i64,
    pub from_user: i64,
    pub to_user: i64,
    pub status: RequestStatus,
    pub unread_for_from: bool,
    pub unread_for_to: bool,
    pub created_at: DateTime<Utc>,
}

/// Chat message record. Immutable after insert except the is_read flag.
#[derive(Debug, Clone)]
pub struct MessageRow {
    pub id: i64,
    pub sender: i64,
    pub receiver: i64,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub is_read: bool,
}
