//! Generative-AI providers and the two-tier fallback.
//!
//! Each provider implements [`ChatProvider`]. [`ResponseGenerator`] tries the
//! primary provider, then the secondary, and finally answers with
//! [`APOLOGY_MESSAGE`], so callers always get text back.

pub mod gemini;
pub mod generator;
pub mod mistral;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use thiserror::Error;

pub use generator::{Reply, ReplySource, ResponseGenerator};

/// Reply stored when neither provider produced text.
pub const APOLOGY_MESSAGE: &str = "I'm sorry, I'm having trouble connecting to the AI service right now. Please try again later.";

/// Connect phase budget, independent of the per-request timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Formatting contract sent to every provider. Both providers must receive
/// the same bytes so replies look alike whichever one answers.
pub const SYSTEM_INSTRUCTION: &str = r#"You are a helpful AI assistant. Provide clear, natural, and well-structured responses.

CRITICAL: Choose the RIGHT format for each type of question!

DEFAULT FORMAT (Use 90% of the time):
Write in NATURAL PARAGRAPHS like you're having a conversation. Use this for:
- Advice (relationships, life, career, personal topics)
- Explanations and opinions
- Stories or examples
- General "how to" questions
- Any conversational topic

Add blank lines between paragraphs for readability. NO lists or numbering needed!

USE NUMBERED LISTS ONLY when:
- Giving technical step-by-step instructions (coding, recipes, procedures)
- Listing features, specifications, or distinct items to compare
- Order and sequence truly matter (do step 1, then step 2, etc.)

For lists: Start with a brief intro, then number main points (1. 2. 3.) with dashes (-) for sub-points.

FORMATTING RULES - EXTREMELY IMPORTANT:
- ABSOLUTELY NO MARKDOWN SYMBOLS: Never use asterisks (*), double asterisks (**), underscores (_), double underscores (__), hashtags (#), or ANY markdown formatting
- Use plain text only - no bold at all , italic, heading, or any special markers
- For emphasis: Use CAPITAL LETTERS or "quotation marks" instead of markdown
- Short paragraphs (2-4 sentences each)
- Blank lines between paragraphs
- Natural, conversational tone
- If highlighting technical terms or concepts, use quotation marks like "RNN" or capital letters

EXAMPLE - Advice/General (PARAGRAPHS):
"Proposing is such a special moment! The most important thing is making sure you both feel ready and have talked about your future together.

Think about what would be meaningful to her. Maybe propose somewhere special to your relationship—where you first met, her favorite place, or somewhere that holds memories for both of you. The location is less important than the genuine feeling behind it.

Make it personal to your relationship. Speak from your heart about why you love her and want to spend your life together. It doesn't need to be a perfect speech, just honest and sincere.

If you're getting a ring, try to match her style or ask someone close to her for guidance. You can also propose first and pick the ring together later if you're unsure.

Most importantly, be yourself. The best proposals feel authentic to the couple, whether they're grand or intimate. Trust your instincts and let your love show through!"

EXAMPLE - Technical (NUMBERED LIST):
"Here's how to create a React component:

1. Import React at the top of your file
2. Define your function component with a capital letter
3. Return JSX inside parentheses
4. Export the component at the bottom

Example: function MyComponent() returns your JSX code."

TONE:
- Warm and friendly
- Clear and helpful
- Natural flow, not robotic
- Match the question's vibe"#;

/// Errors from a single provider attempt. Never escapes [`ResponseGenerator`].
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Provider returned no text")]
    Empty,

    #[error("Client setup failed: {0}")]
    Setup(String),
}

impl ProviderError {
    /// Short, stable label for logs.
    pub fn category(&self) -> &'static str {
        match self {
            ProviderError::Timeout(_) => "timeout",
            ProviderError::Transport(_) => "transport",
            ProviderError::Status { .. } => "status",
            ProviderError::Malformed(_) => "malformed",
            ProviderError::Empty => "empty",
            ProviderError::Setup(_) => "setup",
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProviderError::Timeout(e.to_string())
        } else if e.is_decode() {
            ProviderError::Malformed(e.to_string())
        } else {
            ProviderError::Transport(e.to_string())
        }
    }
}

/// A generative-text backend.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Provider identifier for logging.
    fn name(&self) -> &str;

    /// Generate a reply to `message` under `instruction`. How the instruction
    /// is delivered is up to the provider's protocol.
    async fn generate(&self, instruction: &str, message: &str) -> Result<String, ProviderError>;
}

/// HTTP client shared by a provider for its lifetime.
pub fn http_client(timeout: Duration) -> Result<Client, ProviderError> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(CONNECT_TIMEOUT.min(timeout))
        .build()
        .map_err(|e| ProviderError::Setup(e.to_string()))
}

/// Turn non-2xx responses into [`ProviderError::Status`].
async fn check_status(resp: Response) -> Result<Response, ProviderError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let body = resp
        .text()
        .await
        .unwrap_or_else(|_| "<no body>".to_string());
    Err(ProviderError::Status { status, body })
}

/// Reject replies that carry no visible text.
fn non_empty(text: String) -> Result<String, ProviderError> {
    if text.trim().is_empty() {
        Err(ProviderError::Empty)
    } else {
        Ok(text)
    }
}
