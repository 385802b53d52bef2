//! Primary/secondary fallback over two [`ChatProvider`]s.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::gemini::GeminiProvider;
use super::mistral::MistralProvider;
use super::{APOLOGY_MESSAGE, ChatProvider, ProviderError, SYSTEM_INSTRUCTION};
use crate::config::RelayConfig;

/// Which tier produced a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplySource {
    Primary,
    Secondary,
    /// Both providers failed; the text is [`APOLOGY_MESSAGE`].
    Fallback,
}

/// Generated reply text tagged with its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub source: ReplySource,
}

/// Answers user messages, trying each provider exactly once in order.
#[derive(Clone)]
pub struct ResponseGenerator {
    primary: Arc<dyn ChatProvider>,
    secondary: Arc<dyn ChatProvider>,
}

impl ResponseGenerator {
    pub fn new(primary: Arc<dyn ChatProvider>, secondary: Arc<dyn ChatProvider>) -> Self {
        Self { primary, secondary }
    }

    /// Gemini first, Mistral second, both with the configured timeout.
    pub fn from_config(config: &RelayConfig) -> Result<Self, ProviderError> {
        let primary = GeminiProvider::new(&config.gemini, config.provider_timeout)?;
        let secondary = MistralProvider::new(&config.mistral, config.provider_timeout)?;
        Ok(Self::new(Arc::new(primary), Arc::new(secondary)))
    }

    /// Reply text for `message`. Never fails.
    pub async fn get_response(&self, message: &str) -> String {
        self.reply(message).await.text
    }

    /// Like [`get_response`](Self::get_response), but reports which tier answered.
    pub async fn reply(&self, message: &str) -> Reply {
        if let Ok(text) = attempt(self.primary.as_ref(), message).await {
            return Reply {
                text,
                source: ReplySource::Primary,
            };
        }

        info!(
            provider = self.secondary.name(),
            "falling back to secondary provider"
        );
        if let Ok(text) = attempt(self.secondary.as_ref(), message).await {
            return Reply {
                text,
                source: ReplySource::Secondary,
            };
        }

        error!(
            primary = self.primary.name(),
            secondary = self.secondary.name(),
            "all providers failed, replying with apology"
        );
        Reply {
            text: APOLOGY_MESSAGE.to_string(),
            source: ReplySource::Fallback,
        }
    }
}

/// One call to one provider. Failures are logged here and returned as data.
async fn attempt(provider: &dyn ChatProvider, message: &str) -> Result<String, ProviderError> {
    debug!(provider = provider.name(), "calling provider");
    let result = match provider.generate(SYSTEM_INSTRUCTION, message).await {
        Ok(text) if text.trim().is_empty() => Err(ProviderError::Empty),
        other => other,
    };
    match &result {
        Ok(text) => info!(provider = provider.name(), chars = text.len(), "provider responded"),
        Err(e) => warn!(
            provider = provider.name(),
            category = e.category(),
            error = %e,
            "provider call failed"
        ),
    }
    result
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;

    /// Provider with a canned outcome that records what it was sent.
    struct Scripted {
        name: &'static str,
        reply: Option<&'static str>,
        calls: AtomicUsize,
        seen: Mutex<Vec<(String, String)>>,
    }

    impl Scripted {
        fn ok(name: &'static str, reply: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                reply: Some(reply),
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn failing(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                reply: None,
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChatProvider for Scripted {
        fn name(&self) -> &str {
            self.name
        }

        async fn generate(
            &self,
            instruction: &str,
            message: &str,
        ) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen
                .lock()
                .unwrap()
                .push((instruction.to_string(), message.to_string()));
            match self.reply {
                Some(text) => Ok(text.to_string()),
                None => Err(ProviderError::Status {
                    status: 503,
                    body: "overloaded".into(),
                }),
            }
        }
    }

    #[tokio::test]
    async fn primary_success_skips_secondary() {
        let primary = Scripted::ok("p", "from primary");
        let secondary = Scripted::ok("s", "from secondary");
        let generator = ResponseGenerator::new(primary.clone(), secondary.clone());

        let reply = generator.reply("hi").await;
        assert_eq!(reply.text, "from primary");
        assert_eq!(reply.source, ReplySource::Primary);
        assert_eq!(primary.calls(), 1);
        assert_eq!(secondary.calls(), 0);
    }

    #[tokio::test]
    async fn primary_failure_falls_back_to_secondary() {
        let primary = Scripted::failing("p");
        let secondary = Scripted::ok("s", "from secondary");
        let generator = ResponseGenerator::new(primary.clone(), secondary.clone());

        let reply = generator.reply("hi").await;
        assert_eq!(reply.text, "from secondary");
        assert_eq!(reply.source, ReplySource::Secondary);
        assert_eq!(primary.calls(), 1);
        assert_eq!(secondary.calls(), 1);
    }

    #[tokio::test]
    async fn both_failing_yields_apology() {
        let primary = Scripted::failing("p");
        let secondary = Scripted::failing("s");
        let generator = ResponseGenerator::new(primary.clone(), secondary.clone());

        assert_eq!(generator.get_response("hi").await, APOLOGY_MESSAGE);
        assert_eq!(primary.calls(), 1);
        assert_eq!(secondary.calls(), 1);
    }

    #[tokio::test]
    async fn blank_primary_reply_counts_as_failure() {
        let primary = Scripted::ok("p", "   ");
        let secondary = Scripted::ok("s", "real answer");
        let generator = ResponseGenerator::new(primary, secondary);

        let reply = generator.reply("hi").await;
        assert_eq!(reply.source, ReplySource::Secondary);
        assert_eq!(reply.text, "real answer");
    }

    #[tokio::test]
    async fn both_providers_get_identical_instruction_and_message() {
        let primary = Scripted::failing("p");
        let secondary = Scripted::ok("s", "ok");
        let generator = ResponseGenerator::new(primary.clone(), secondary.clone());

        generator.get_response("  raw message  ").await;

        let p = primary.seen.lock().unwrap().clone();
        let s = secondary.seen.lock().unwrap().clone();
        assert_eq!(p, s);
        assert_eq!(p[0].0, SYSTEM_INSTRUCTION);
        assert_eq!(p[0].1, "  raw message  ");
    }
}
