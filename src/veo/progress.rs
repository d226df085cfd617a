//! Cosmetic progress messages shown while the remote job runs.
//!
//! The poll loop asks a [`MessageSource`] for one message per iteration.
//! Production code picks at random from a fixed pool; tests inject a
//! deterministic sequence.

use rand::seq::IndexedRandom;

/// The fixed pool of progress messages.
pub const PROGRESS_MESSAGES: &[&str] = &[
    "Warming up the digital director...",
    "Studying the light in your image...",
    "Sketching the first frames...",
    "Teaching the pixels to move...",
    "Composing the soundscape...",
    "Rendering motion, frame by frame...",
    "Polishing the final cut...",
    "Almost there, adding the finishing touches...",
];

/// Produces one progress message per poll iteration.
pub trait MessageSource: Send {
    fn next_message(&mut self) -> String;
}

/// Picks a random message from [`PROGRESS_MESSAGES`] on every call.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomMessages;

impl MessageSource for RandomMessages {
    fn next_message(&mut self) -> String {
        PROGRESS_MESSAGES
            .choose(&mut rand::rng())
            .copied()
            .unwrap_or("Generating video...")
            .to_string()
    }
}

/// Yields messages in order, wrapping around at the end.
#[derive(Debug, Clone)]
pub struct CyclingMessages {
    messages: Vec<String>,
    index: usize,
}

impl CyclingMessages {
    /// An empty list falls back to the built-in pool.
    pub fn new(messages: Vec<String>) -> Self {
        let messages = if messages.is_empty() {
            PROGRESS_MESSAGES.iter().map(|m| m.to_string()).collect()
        } else {
            messages
        };
        Self { messages, index: 0 }
    }
}

impl Default for CyclingMessages {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl MessageSource for CyclingMessages {
    fn next_message(&mut self) -> String {
        let message = self.messages[self.index % self.messages.len()].clone();
        self.index = self.index.wrapping_add(1);
        message
    }
}
