//! Session state store
//!
//! Maps each user to the conversion direction they selected but have not yet
//! fulfilled with an upload. Absence means no direction is pending.

use crate::runtime::SessionStore;
use crate::state_machine::Direction;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use tokio::sync::RwLock;

/// Messaging-platform user identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub i64);

/// Chat a reply is delivered to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// In-process session store.
///
/// Entries live for the process lifetime; there is no eviction.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    pending: RwLock<HashMap<UserId, Direction>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of users with a pending direction
    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.pending.read().await.len()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, user: UserId) -> Option<Direction> {
        self.pending.read().await.get(&user).copied()
    }

    async fn set(&self, user: UserId, direction: Direction) {
        self.pending.write().await.insert(user, direction);
    }

    async fn clear(&self, user: UserId) {
        self.pending.write().await.remove(&user);
    }
}
