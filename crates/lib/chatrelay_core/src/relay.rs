//! Fetch and send flows.
//!
//! [`ChatRelay`] validates input, normalizes the email and sequences the
//! store and provider calls. The HTTP layer only maps its errors.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error};

use crate::email::normalize_required;
use crate::models::{Message, Role};
use crate::provider::ResponseGenerator;
use crate::store::{MessageStore, PersistenceError};

/// Errors surfaced to callers of the relay. Provider failures never appear
/// here; they are absorbed by [`ResponseGenerator`].
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("{0}")]
    InvalidInput(String),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Both messages written by one send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Exchange {
    pub user_message: Message,
    pub ai_message: Message,
}

/// Orchestrates the store and the response generator.
#[derive(Clone)]
pub struct ChatRelay {
    store: Arc<dyn MessageStore>,
    generator: ResponseGenerator,
}

impl ChatRelay {
    pub fn new(store: Arc<dyn MessageStore>, generator: ResponseGenerator) -> Self {
        Self { store, generator }
    }

    pub fn store(&self) -> &Arc<dyn MessageStore> {
        &self.store
    }

    /// Conversation history for `email`, oldest first.
    pub async fn history(&self, email: &str) -> Result<Vec<Message>, RelayError> {
        let email = require_email(email)?;
        debug!(store = self.store.name(), %email, "fetching history");
        Ok(self.store.list_by_email(&email).await?)
    }

    /// Persist the user message, generate a reply, persist the reply.
    ///
    /// The two inserts are independent: if the second fails the user message
    /// stays stored without a reply.
    pub async fn send(&self, content: &str, email: &str) -> Result<Exchange, RelayError> {
        if content.trim().is_empty() {
            return Err(RelayError::InvalidInput(
                "Message content cannot be empty".into(),
            ));
        }
        let email = require_email(email)?;

        let user_message = self.store.insert(Role::User, content, &email).await?;

        // Raw content, untrimmed.
        let reply = self.generator.reply(content).await;
        debug!(source = ?reply.source, %email, "reply generated");

        let ai_message = self
            .store
            .insert(Role::Assistant, &reply.text, &email)
            .await
            .inspect_err(|e| {
                error!(
                    user_message_id = %user_message.id,
                    error = %e,
                    "reply not persisted; user message stored without a reply"
                );
            })?;

        Ok(Exchange {
            user_message,
            ai_message,
        })
    }
}

fn require_email(raw: &str) -> Result<String, RelayError> {
    normalize_required(raw).ok_or_else(|| RelayError::InvalidInput("Email is required".into()))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::provider::{APOLOGY_MESSAGE, ChatProvider, ProviderError};
    use crate::store::memory::MemoryMessageStore;

    struct Fixed {
        reply: Option<&'static str>,
        calls: AtomicUsize,
    }

    impl Fixed {
        fn new(reply: Option<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ChatProvider for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn generate(&self, _instruction: &str, _message: &str) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply
                .map(str::to_string)
                .ok_or_else(|| ProviderError::Timeout("deadline elapsed".into()))
        }
    }

    /// Store that accepts a fixed number of inserts, then rejects.
    struct Flaky {
        inner: MemoryMessageStore,
        accept: usize,
        seen: AtomicUsize,
    }

    #[async_trait]
    impl MessageStore for Flaky {
        async fn insert(
            &self,
            role: Role,
            content: &str,
            email: &str,
        ) -> Result<Message, PersistenceError> {
            if self.seen.fetch_add(1, Ordering::SeqCst) >= self.accept {
                return Err(PersistenceError::Rejected("disk full".into()));
            }
            self.inner.insert(role, content, email).await
        }

        async fn list_by_email(&self, email: &str) -> Result<Vec<Message>, PersistenceError> {
            self.inner.list_by_email(email).await
        }

        async fn health_check(&self) -> bool {
            true
        }

        fn name(&self) -> &str {
            "flaky"
        }
    }

    fn relay_with(
        store: Arc<dyn MessageStore>,
        primary: Option<&'static str>,
        secondary: Option<&'static str>,
    ) -> (ChatRelay, Arc<Fixed>, Arc<Fixed>) {
        let p = Fixed::new(primary);
        let s = Fixed::new(secondary);
        let relay = ChatRelay::new(store, ResponseGenerator::new(p.clone(), s.clone()));
        (relay, p, s)
    }

    #[tokio::test]
    async fn send_persists_user_then_assistant() {
        let store = Arc::new(MemoryMessageStore::new());
        let (relay, _, _) = relay_with(store.clone(), Some("Hi!"), None);

        let exchange = relay.send("Hello", "  A@X.com ").await.unwrap();

        assert_eq!(exchange.user_message.role, Role::User);
        assert_eq!(exchange.user_message.content, "Hello");
        assert_eq!(exchange.user_message.email, "a@x.com");
        assert_eq!(exchange.ai_message.role, Role::Assistant);
        assert_eq!(exchange.ai_message.content, "Hi!");
        assert_eq!(exchange.ai_message.email, "a@x.com");
        assert!(exchange.ai_message.created_at >= exchange.user_message.created_at);
        assert_eq!(store.all().await, vec![exchange.user_message, exchange.ai_message]);
    }

    #[tokio::test]
    async fn secondary_reply_is_stored_when_primary_fails() {
        let store = Arc::new(MemoryMessageStore::new());
        let (relay, _, _) = relay_with(store.clone(), None, Some("from mistral"));

        let exchange = relay.send("Hello", "a@x.com").await.unwrap();
        assert_eq!(exchange.ai_message.content, "from mistral");
    }

    #[tokio::test]
    async fn apology_is_stored_when_both_providers_fail() {
        let store = Arc::new(MemoryMessageStore::new());
        let (relay, _, _) = relay_with(store.clone(), None, None);

        let exchange = relay.send("Hello", "a@x.com").await.unwrap();
        assert_eq!(exchange.ai_message.content, APOLOGY_MESSAGE);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn blank_input_has_no_side_effects() {
        let store = Arc::new(MemoryMessageStore::new());
        let (relay, p, _) = relay_with(store.clone(), Some("Hi"), None);

        for (content, email) in [("   ", "a@x.com"), ("Hello", " \t"), ("", "")] {
            let err = relay.send(content, email).await.unwrap_err();
            assert!(matches!(err, RelayError::InvalidInput(_)));
        }
        assert!(matches!(
            relay.history("  ").await,
            Err(RelayError::InvalidInput(_))
        ));
        assert!(store.is_empty().await);
        assert_eq!(p.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn user_insert_failure_skips_generation() {
        let store = Arc::new(MemoryMessageStore::new());
        store.set_available(false);
        let (relay, p, s) = relay_with(store.clone(), Some("Hi"), Some("Hi"));

        let err = relay.send("Hello", "a@x.com").await.unwrap_err();
        assert!(matches!(err, RelayError::Persistence(_)));
        assert_eq!(p.calls.load(Ordering::SeqCst), 0);
        assert_eq!(s.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn reply_insert_failure_leaves_user_message() {
        let store = Arc::new(Flaky {
            inner: MemoryMessageStore::new(),
            accept: 1,
            seen: AtomicUsize::new(0),
        });
        let (relay, _, _) = relay_with(store.clone(), Some("Hi"), None);

        let err = relay.send("Hello", "a@x.com").await.unwrap_err();
        assert!(matches!(
            err,
            RelayError::Persistence(PersistenceError::Rejected(_))
        ));

        let stored = store.inner.all().await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].role, Role::User);
    }

    #[tokio::test]
    async fn history_uses_normalized_partition() {
        let store = Arc::new(MemoryMessageStore::new());
        let (relay, _, _) = relay_with(store, Some("Hi"), None);

        relay.send("Hello", "A@X.com").await.unwrap();
        relay.send("Other", "b@x.com").await.unwrap();

        let history = relay.history(" a@x.COM ").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "Hello");
        assert_eq!(history[1].role, Role::Assistant);
        assert!(history.iter().all(|m| m.email == "a@x.com"));
    }

    #[tokio::test]
    async fn history_surfaces_store_failure() {
        let store = Arc::new(MemoryMessageStore::new());
        store.set_available(false);
        let (relay, _, _) = relay_with(store, Some("Hi"), None);

        assert!(matches!(
            relay.history("a@x.com").await,
            Err(RelayError::Persistence(PersistenceError::Unavailable(_)))
        ));
    }
}
