//! Chat-template prompt formatting (Zephyr / TinyLlama style).
//!
//! ```text
//! <|system|>
//! {system}</s>
//! <|user|>
//! {turn}</s>
//! <|assistant|>
//! {turn}</s>
//! <|user|>
//! {input}</s>
//! <|assistant|>
//! ```

use super::{Role, Turn};

pub const SYSTEM_MARKER: &str = "<|system|>";
pub const USER_MARKER: &str = "<|user|>";
pub const ASSISTANT_MARKER: &str = "<|assistant|>";
pub const END_OF_TURN: &str = "</s>";

/// Build the prompt for `input`, replaying `history` (already windowed) as
/// context and leaving an open assistant turn for the model to complete.
#[must_use]
pub fn build_prompt(system: &str, history: &[Turn], input: &str) -> String {
    let mut prompt = String::new();
    push_turn(&mut prompt, SYSTEM_MARKER, system);

    for turn in history {
        let marker = match turn.role {
            Role::User => USER_MARKER,
            Role::Assistant => ASSISTANT_MARKER,
        };
        push_turn(&mut prompt, marker, &turn.content);
    }

    push_turn(&mut prompt, USER_MARKER, input);
    prompt.push_str(ASSISTANT_MARKER);
    prompt.push('\n');
    prompt
}

fn push_turn(prompt: &mut String, marker: &str, content: &str) {
    prompt.push_str(marker);
    prompt.push('\n');
    prompt.push_str(content);
    prompt.push_str(END_OF_TURN);
    prompt.push('\n');
}

/// The most recent `window` turns of `history`.
#[must_use]
pub fn window(history: &[Turn], window: usize) -> &[Turn] {
    &history[history.len().saturating_sub(window)..]
}
