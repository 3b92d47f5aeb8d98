//! Conversation state and the respond loop.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tokio::time::Instant;

use crate::config::ChatConfig;

use super::cleanup::{APOLOGY, clean_response, fallback_response};
use super::prompt::{build_prompt, window};
use super::{ChatError, ErrorKind, SamplingParams, TextGenerator, Turn};

/// Turns of one caller plus the time of its last exchange.
#[derive(Debug)]
struct Conversation {
    turns: Vec<Turn>,
    last_used: Instant,
}

impl Conversation {
    fn new() -> Self {
        Self {
            turns: Vec::new(),
            last_used: Instant::now(),
        }
    }
}

/// Chat service holding one independent conversation per caller key.
///
/// Keys are opaque; the HTTP layer derives them from the caller's cookies.
/// Each conversation keeps every turn, but only the last `history_window`
/// turns are replayed into the prompt. Conversations nobody has used for a
/// while are dropped by [`ChatEngine::cleanup_idle`].
#[derive(Debug)]
pub struct ChatEngine {
    generator: Arc<dyn TextGenerator>,
    system_prompt: String,
    sampling: SamplingParams,
    history_window: usize,
    generation_timeout: Duration,
    conversations: RwLock<HashMap<String, Conversation>>,
}

impl ChatEngine {
    #[must_use]
    pub fn new(generator: Arc<dyn TextGenerator>, config: &ChatConfig) -> Self {
        Self {
            generator,
            system_prompt: config.system_prompt.clone(),
            sampling: SamplingParams::from(config),
            history_window: config.history_window,
            generation_timeout: Duration::from_secs(config.generation_timeout_secs),
            conversations: RwLock::new(HashMap::new()),
        }
    }

    /// Generate a reply to `input` within the conversation `key`.
    ///
    /// Recoverable failures never surface: the caller gets [`APOLOGY`] and
    /// the history is left untouched. Only [`ErrorKind::Fatal`] errors are
    /// returned.
    pub async fn respond(&self, key: &str, input: &str) -> Result<String, ChatError> {
        let prompt = {
            let guard = self
                .conversations
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            let history = guard.get(key).map_or(&[][..], |c| c.turns.as_slice());
            build_prompt(
                &self.system_prompt,
                window(history, self.history_window),
                input,
            )
        };

        tracing::debug!(
            conversation = %key,
            prompt_chars = prompt.len(),
            "Generating reply"
        );

        let generated = tokio::time::timeout(
            self.generation_timeout,
            self.generator.generate(&prompt, &self.sampling),
        )
        .await
        .unwrap_or_else(|_| Err(ChatError::Timeout(self.generation_timeout)));

        let raw = match generated {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::Recoverable => {
                tracing::warn!(conversation = %key, error = %e, "Generation failed, apologising");
                return Ok(APOLOGY.to_string());
            }
            Err(e) => return Err(e),
        };

        let reply = clean_response(&raw).unwrap_or_else(|| {
            tracing::debug!(conversation = %key, raw = %raw, "Unusable output, using fallback");
            pick_fallback()
        });

        let mut guard = self
            .conversations
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let conversation = guard
            .entry(key.to_string())
            .or_insert_with(Conversation::new);
        conversation.turns.push(Turn::user(input));
        conversation.turns.push(Turn::assistant(reply.clone()));
        conversation.last_used = Instant::now();

        Ok(reply)
    }

    /// Clear the conversation `key`. Idempotent.
    pub fn reset(&self, key: &str) {
        self.conversations
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    /// All turns of conversation `key`, oldest first.
    #[must_use]
    pub fn history(&self, key: &str) -> Vec<Turn> {
        self.conversations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .map(|c| c.turns.clone())
            .unwrap_or_default()
    }

    /// Drop every conversation without an exchange in the last `max_idle`.
    ///
    /// Returns the number of conversations removed.
    pub fn cleanup_idle(&self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let mut guard = self
            .conversations
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = guard.len();
        guard.retain(|_, c| now.saturating_duration_since(c.last_used) < max_idle);
        before - guard.len()
    }

    /// Number of conversations with at least one exchange.
    #[must_use]
    pub fn conversation_count(&self) -> usize {
        self.conversations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

fn pick_fallback() -> String {
    fallback_response(&mut rand::thread_rng()).to_string()
}
