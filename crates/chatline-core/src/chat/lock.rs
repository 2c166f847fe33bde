//! Per-chat generation locks.
//!
//! At most one generation runs against a given chat at a time, across all
//! requests handled by this process. A second request for the same chat
//! waits for the first to finish, up to a timeout, and then gives up with
//! `ChatError::Busy`. Requests for different chats never contend.

use std::sync::Arc;
use std::time::Duration;

use chatline_types::error::ChatError;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Registry of per-chat mutexes, keyed by chat id.
///
/// Entries are created on first use and removed when the last guard for a
/// chat is dropped and nobody else is waiting on it.
#[derive(Default)]
pub struct ChatLocks {
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl ChatLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait up to `timeout` for exclusive access to `chat_id`.
    pub async fn acquire(
        self: &Arc<Self>,
        chat_id: Uuid,
        timeout: Duration,
    ) -> Result<ChatLockGuard, ChatError> {
        // Clone the mutex out so no DashMap shard guard is held across await.
        let mutex = self.locks.entry(chat_id).or_default().clone();

        let guard = tokio::time::timeout(timeout, mutex.lock_owned())
            .await
            .map_err(|_| {
                tracing::warn!(chat_id = %chat_id, ?timeout, "Timed out waiting for chat lock");
                ChatError::Busy
            })?;

        Ok(ChatLockGuard {
            chat_id,
            guard: Some(guard),
            locks: Arc::clone(self),
        })
    }

    /// Whether a generation currently holds the lock for `chat_id`.
    pub fn is_locked(&self, chat_id: &Uuid) -> bool {
        let Some(mutex) = self.locks.get(chat_id).map(|m| Arc::clone(m.value())) else {
            return false;
        };
        mutex.try_lock().is_err()
    }

    /// Number of chats with a live lock entry.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Exclusive access to one chat. Released on drop.
pub struct ChatLockGuard {
    chat_id: Uuid,
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<ChatLocks>,
}

#[cfg(test)]
impl ChatLockGuard {
    pub fn chat_id(&self) -> Uuid {
        self.chat_id
    }
}

impl std::fmt::Debug for ChatLockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatLockGuard")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

impl Drop for ChatLockGuard {
    fn drop(&mut self) {
        // Release first: the guard itself holds a strong reference.
        drop(self.guard.take());
        self.locks
            .locks
            .remove_if(&self.chat_id, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}
