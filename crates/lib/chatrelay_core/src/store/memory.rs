//! In-process message store.
//!
//! Backs the `--memory-store` development mode and the test suites. Can be
//! switched offline to exercise store-failure paths.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{MessageStore, PersistenceError, new_message_id};
use crate::models::{Message, Role};

#[derive(Debug, Default)]
struct Log {
    messages: Vec<Message>,
    last_created_at: Option<DateTime<Utc>>,
}

/// Message store kept in memory for the lifetime of the process.
#[derive(Debug)]
pub struct MemoryMessageStore {
    log: RwLock<Log>,
    available: AtomicBool,
}

impl Default for MemoryMessageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryMessageStore {
    pub fn new() -> Self {
        Self {
            log: RwLock::new(Log::default()),
            available: AtomicBool::new(true),
        }
    }

    /// Simulate an outage: while unavailable every operation fails.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Every stored message in insertion order.
    pub async fn all(&self) -> Vec<Message> {
        self.log.read().await.messages.clone()
    }

    pub async fn len(&self) -> usize {
        self.log.read().await.messages.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn ensure_available(&self) -> Result<(), PersistenceError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(PersistenceError::Unavailable("memory store is offline".into()))
        }
    }
}

#[async_trait]
impl MessageStore for MemoryMessageStore {
    async fn insert(
        &self,
        role: Role,
        content: &str,
        email: &str,
    ) -> Result<Message, PersistenceError> {
        self.ensure_available()?;
        if content.is_empty() {
            return Err(PersistenceError::Rejected("content must not be empty".into()));
        }

        let mut log = self.log.write().await;
        // Wall clock can step backwards; created_at must not.
        let now = Utc::now();
        let created_at = match log.last_created_at {
            Some(last) if last > now => last,
            _ => now,
        };
        log.last_created_at = Some(created_at);

        let message = Message {
            id: new_message_id(),
            role,
            content: content.to_string(),
            email: email.to_string(),
            created_at,
        };
        log.messages.push(message.clone());
        Ok(message)
    }

    async fn list_by_email(&self, email: &str) -> Result<Vec<Message>, PersistenceError> {
        self.ensure_available()?;
        let log = self.log.read().await;
        // Insertion order is already chronological.
        Ok(log
            .messages
            .iter()
            .filter(|m| m.email == email)
            .cloned()
            .collect())
    }

    async fn health_check(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "memory"
    }
}
