//! Post-processing of raw model output.
//!
//! Small chat models ramble: they continue into an invented next user turn,
//! echo role labels and template tokens, and start code blocks they never
//! finish. Cleanup keeps the first answer, removes template debris and caps
//! the length so replies stay conversational.

use rand::Rng;
use rand::seq::SliceRandom;

use super::prompt::{ASSISTANT_MARKER, END_OF_TURN, SYSTEM_MARKER, USER_MARKER};

/// Replies longer than this are shortened.
pub const MAX_REPLY_CHARS: usize = 250;
/// Sentences kept when shortening.
pub const MAX_REPLY_SENTENCES: usize = 2;
/// Shorter replies are replaced by a fallback.
pub const MIN_REPLY_CHARS: usize = 2;

const ELLIPSIS: &str = "...";
const CODE_FENCE: &str = "```";

/// Markers after which the model is writing a turn that is not its own.
const TURN_BOUNDARIES: [&str; 3] = [END_OF_TURN, USER_MARKER, SYSTEM_MARKER];

const ARTIFACTS: [&str; 9] = [
    USER_MARKER,
    ASSISTANT_MARKER,
    SYSTEM_MARKER,
    END_OF_TURN,
    "<|endoftext|>",
    "User:",
    "Assistant:",
    "<pad>",
    "<unk>",
];

/// Reply used when a generation call fails.
pub const APOLOGY: &str = "I'm having trouble processing that. Could you try rephrasing?";

/// Canned replies used when the model fails or produces nothing usable.
pub const FALLBACK_RESPONSES: &[&str] = &[
    "That's interesting! Tell me more.",
    "I see. What else would you like to talk about?",
    "Could you elaborate on that?",
    "I'm listening. Please continue.",
    "What do you think about it?",
    "I'd love to hear more about your thoughts.",
    APOLOGY,
];

/// Clean raw model output into a reply.
///
/// Returns `None` when nothing of at least [`MIN_REPLY_CHARS`] survives, in
/// which case the caller substitutes a [`fallback_response`].
#[must_use]
pub fn clean_response(raw: &str) -> Option<String> {
    let mut text = cut_at_turn_boundary(raw).to_string();
    for artifact in ARTIFACTS {
        text = text.replace(artifact, "");
    }
    if let Some(fence) = text.find(CODE_FENCE) {
        text.truncate(fence);
    }

    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let reply = limit_length(&collapsed);

    (reply.chars().count() >= MIN_REPLY_CHARS).then_some(reply)
}

/// Pick a fallback reply uniformly at random.
pub fn fallback_response<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    FALLBACK_RESPONSES
        .choose(rng)
        .copied()
        .unwrap_or(FALLBACK_RESPONSES[0])
}

fn cut_at_turn_boundary(raw: &str) -> &str {
    let text = raw.trim_start();
    let text = text.strip_prefix(ASSISTANT_MARKER).unwrap_or(text);
    let end = TURN_BOUNDARIES
        .iter()
        .filter_map(|marker| text.find(marker))
        .min()
        .unwrap_or(text.len());
    &text[..end]
}

/// Shorten `text` past [`MAX_REPLY_CHARS`]: to its first sentences when they
/// fit, otherwise to a hard cut ending in an ellipsis.
fn limit_length(text: &str) -> String {
    if text.chars().count() <= MAX_REPLY_CHARS {
        return text.to_string();
    }

    if let Some(end) = sentence_end(text, MAX_REPLY_SENTENCES) {
        let head = &text[..end];
        if head.chars().count() <= MAX_REPLY_CHARS {
            return head.to_string();
        }
    }

    let head: String = text
        .chars()
        .take(MAX_REPLY_CHARS - ELLIPSIS.len())
        .collect();
    format!("{}{ELLIPSIS}", head.trim_end())
}

/// Byte offset just past the `n`-th sentence terminator, if there is one.
///
/// A terminator is `.`, `!` or `?` followed by whitespace or end of text.
fn sentence_end(text: &str, n: usize) -> Option<usize> {
    let mut seen = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((idx, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        if chars.peek().is_none_or(|(_, next)| next.is_whitespace()) {
            seen += 1;
            if seen == n {
                return Some(idx + c.len_utf8());
            }
        }
    }
    None
}
