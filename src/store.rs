//! Message store adapter: the narrow persistence interface the real-time
//! core consumes. Wraps the shared SQLite connection; every call runs on
//! the blocking pool so socket workers are never stalled by the database.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

use crate::db::models::{FriendRequestRow, MessageRow, PresenceRow, RequestStatus, UserRow};
use crate::db::DbPool;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),
    #[error("database task cancelled")]
    TaskJoin,
    #[error("database lock poisoned")]
    LockPoisoned,
    #[error("no such user: {0}")]
    UnknownUser(i64),
    #[error("no such friend request: {0}")]
    UnknownRequest(i64),
    #[error("friend request already exists for this pair")]
    DuplicateRequest,
    #[error("friend request {0} is not pending")]
    NotPending(i64),
}

/// Concrete store over the shared SQLite pool. Cloned freely; the
/// underlying connection is shared.
#[derive(Clone)]
pub struct ChatStore {
    db: DbPool,
}

impl ChatStore {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Run `f` with the locked connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.lock().map_err(|_| StoreError::LockPoisoned)?;
            f(&conn)
        })
        .await
        .map_err(|_| StoreError::TaskJoin)?
    }

    pub async fn user_by_id(&self, id: i64) -> Result<Option<UserRow>, StoreError> {
        self.with_conn(move |conn| {
            let row = conn
                .query_row(
                    "SELECT id, username FROM users WHERE id = ?1",
                    params![id],
                    |row| {
                        Ok(UserRow {
                            id: row.get(0)?,
                            username: row.get(1)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
        .await
    }

    /// Persist a chat message. Fails (foreign key) if either party does not
    /// exist; the caller must not broadcast unless this returns Ok.
    pub async fn create_message(
        &self,
        sender: i64,
        receiver: i64,
        content: String,
    ) -> Result<MessageRow, StoreError> {
        self.with_conn(move |conn| {
            let now = Utc::now();
            conn.execute(
                "INSERT INTO messages (sender, receiver, content, timestamp, is_read)
                 VALUES (?1, ?2, ?3, ?4, 0)",
                params![sender, receiver, content, now],
            )?;
            Ok(MessageRow {
                id: conn.last_insert_rowid(),
                sender,
                receiver,
                content,
                timestamp: now,
                is_read: false,
            })
        })
        .await
    }

    /// All users with an accepted friend relationship to `user_id`,
    /// whichever direction the original request went.
    pub async fn accepted_friends(&self, user_id: i64) -> Result<Vec<UserRow>, StoreError> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT u.id, u.username
                 FROM friend_requests r
                 JOIN users u ON u.id = CASE WHEN r.from_user = ?1 THEN r.to_user ELSE r.from_user END
                 WHERE r.status = 'accepted' AND (r.from_user = ?1 OR r.to_user = ?1)",
            )?;
            let friends = stmt
                .query_map(params![user_id], |row| {
                    Ok(UserRow {
                        id: row.get(0)?,
                        username: row.get(1)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(friends)
        })
        .await
    }

    /// Fetch the presence record for a user, creating a default offline
    /// row if none exists yet.
    pub async fn get_or_create_presence(&self, user_id: i64) -> Result<PresenceRow, StoreError> {
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO profiles (user_id, is_online, last_seen)
                 VALUES (?1, 0, ?2)",
                params![user_id, Utc::now()],
            )?;
            let row = conn.query_row(
                "SELECT user_id, is_online, last_seen FROM profiles WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok(PresenceRow {
                        user_id: row.get(0)?,
                        is_online: row.get(1)?,
                        last_seen: row.get(2)?,
                    })
                },
            )?;
            Ok(row)
        })
        .await
    }

    /// Update a user's persisted online flag and last-seen timestamp.
    /// Returns false when no presence row exists (caller logs and moves on).
    pub async fn set_presence(
        &self,
        user_id: i64,
        is_online: bool,
        last_seen: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        self.with_conn(move |conn| {
            let updated = conn.execute(
                "UPDATE profiles SET is_online = ?2, last_seen = ?3 WHERE user_id = ?1",
                params![user_id, is_online, last_seen],
            )?;
            Ok(updated > 0)
        })
        .await
    }

    /// Flip the unread flag toward `receiver` on the pair's accepted
    /// relationship. Single conditional UPDATE per direction, so two
    /// concurrent messages cannot lose the transition. Returns true only
    /// on a false→true flip (which is what triggers the dot broadcast).
    pub async fn flag_unread(&self, sender: i64, receiver: i64) -> Result<bool, StoreError> {
        self.with_conn(move |conn| {
            let flipped_to = conn.execute(
                "UPDATE friend_requests SET unread_for_to = 1
                 WHERE from_user = ?1 AND to_user = ?2 AND status = 'accepted' AND unread_for_to = 0",
                params![sender, receiver],
            )?;
            let flipped_from = conn.execute(
                "UPDATE friend_requests SET unread_for_from = 1
                 WHERE from_user = ?2 AND to_user = ?1 AND status = 'accepted' AND unread_for_from = 0",
                params![sender, receiver],
            )?;
            Ok(flipped_to > 0 || flipped_from > 0)
        })
        .await
    }

    /// Acknowledge a conversation: mark messages from `friend_id` to
    /// `user_id` as read and clear the unread flag toward `user_id`.
    /// Clearing broadcasts nothing.
    pub async fn mark_conversation_read(
        &self,
        user_id: i64,
        friend_id: i64,
    ) -> Result<(), StoreError> {
        self.with_conn(move |conn| {
            conn.execute(
                "UPDATE messages SET is_read = 1 WHERE sender = ?2 AND receiver = ?1 AND is_read = 0",
                params![user_id, friend_id],
            )?;
            conn.execute(
                "UPDATE friend_requests SET unread_for_from = 0
                 WHERE from_user = ?1 AND to_user = ?2",
                params![user_id, friend_id],
            )?;
            conn.execute(
                "UPDATE friend_requests SET unread_for_to = 0
                 WHERE from_user = ?2 AND to_user = ?1",
                params![user_id, friend_id],
            )?;
            Ok(())
        })
        .await
    }

    /// Create a pending friend request. At most one relationship record
    /// may exist per unordered pair, whichever way it was initiated.
    pub async fn create_friend_request(
        &self,
        from_user: i64,
        to_user: i64,
    ) -> Result<FriendRequestRow, StoreError> {
        self.with_conn(move |conn| {
            let target_exists: bool = conn.query_row(
                "SELECT COUNT(*) FROM users WHERE id = ?1",
                params![to_user],
                |row| row.get::<_, i64>(0).map(|c| c > 0),
            )?;
            if !target_exists {
                return Err(StoreError::UnknownUser(to_user));
            }

            let existing: i64 = conn.query_row(
                "SELECT COUNT(*) FROM friend_requests
                 WHERE (from_user = ?1 AND to_user = ?2) OR (from_user = ?2 AND to_user = ?1)",
                params![from_user, to_user],
                |row| row.get(0),
            )?;
            if existing > 0 {
                return Err(StoreError::DuplicateRequest);
            }

            let now = Utc::now();
            conn.execute(
                "INSERT INTO friend_requests (from_user, to_user, status, created_at)
                 VALUES (?1, ?2, 'pending', ?3)",
                params![from_user, to_user, now],
            )?;
            Ok(FriendRequestRow {
                id: conn.last_insert_rowid(),
                from_user,
                to_user,
                status: RequestStatus::Pending,
                unread_for_from: false,
                unread_for_to: false,
                created_at: now,
            })
        })
        .await
    }

    /// Transition a pending request to accepted and return the row.
    pub async fn accept_friend_request(
        &self,
        request_id: i64,
    ) -> Result<FriendRequestRow, StoreError> {
        self.with_conn(move |conn| {
            let updated = conn.execute(
                "UPDATE friend_requests SET status = 'accepted'
                 WHERE id = ?1 AND status = 'pending'",
                params![request_id],
            )?;
            if updated == 0 {
                let exists: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM friend_requests WHERE id = ?1",
                    params![request_id],
                    |row| row.get(0),
                )?;
                return Err(if exists > 0 {
                    StoreError::NotPending(request_id)
                } else {
                    StoreError::UnknownRequest(request_id)
                });
            }

            let row = conn.query_row(
                "SELECT id, from_user, to_user, status, unread_for_from, unread_for_to, created_at
                 FROM friend_requests WHERE id = ?1",
                params![request_id],
                |row| {
                    let status: String = row.get(3)?;
                    Ok(FriendRequestRow {
                        id: row.get(0)?,
                        from_user: row.get(1)?,
                        to_user: row.get(2)?,
                        status: RequestStatus::from_str(&status)
                            .unwrap_or(RequestStatus::Pending),
                        unread_for_from: row.get(4)?,
                        unread_for_to: row.get(5)?,
                        created_at: row.get(6)?,
                    })
                },
            )?;
            Ok(row)
        })
        .await
    }
}
