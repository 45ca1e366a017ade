//! Token counting
//!
//! This module provides token counting utilities using tiktoken's cl100k_base encoding,
//! which is compatible with most modern LLMs. Backends that expose a native
//! counting endpoint may override `BackendClient::count_tokens`; everything else
//! falls back to [`count_prompt_tokens`], which counts the prompt the way it is
//! sent: one user message plus chat framing.

use crate::message::Message;
use std::sync::LazyLock;
use tiktoken_rs::{cl100k_base, CoreBPE};

/// Global tokenizer instance (initialized once, thread-safe)
static TOKENIZER: LazyLock<CoreBPE> = LazyLock::new(|| {
    cl100k_base().expect("cl100k_base tokenizer is a compile-time constant and should never fail")
});

/// Token counter for estimating prompt size
///
/// Uses tiktoken's cl100k_base encoding for token estimation across modern LLMs.
/// This is a zero-cost wrapper around the global tokenizer instance.
#[derive(Debug, Clone, Copy)]
pub struct TokenCounter;

impl TokenCounter {
    /// Create a new token counter
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Count tokens in a string
    #[must_use]
    pub fn count_tokens(&self, text: &str) -> usize {
        TOKENIZER.encode_with_special_tokens(text).len()
    }

    /// Count tokens in a message (includes role overhead)
    #[must_use]
    pub fn count_message_tokens(&self, message: &Message) -> usize {
        const MESSAGE_OVERHEAD: usize = 6; // role + separators
        self.count_tokens(&message.content) + MESSAGE_OVERHEAD
    }

    /// Count total tokens in a conversation
    #[must_use]
    pub fn count_conversation_tokens(&self, messages: &[Message]) -> usize {
        const CONVERSATION_OVERHEAD: usize = 3; // start/end tokens
        messages
            .iter()
            .map(|m| self.count_message_tokens(m))
            .sum::<usize>()
            + CONVERSATION_OVERHEAD
    }
}

impl Default for TokenCounter {
    fn default() -> Self {
        Self::new()
    }
}

static COUNTER: TokenCounter = TokenCounter::new();

/// Count tokens in raw text
#[must_use]
pub fn count_tokens(text: &str) -> usize {
    COUNTER.count_tokens(text)
}

/// Count a prompt sent as a single user message, framing included
#[must_use]
pub fn count_prompt_tokens(prompt: &str) -> usize {
    COUNTER.count_conversation_tokens(&[Message::user(prompt)])
}
