use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Consecutive correct answers that master a card within a session.
pub const DEFAULT_MASTERY_THRESHOLD: u32 = 2;
/// How long an interval-policy card answered correctly in a learning
/// session waits before it returns.
pub const DEFAULT_LEARNING_REQUEUE_DELAY: Duration = Duration::from_secs(20);
/// Answers closer together than this are treated as one.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SessionConfig {
    pub mastery_threshold: u32,
    pub learning_requeue_delay: Duration,
    pub debounce: Duration,
    /// Shuffle blitz/learning queues before the first card.
    pub shuffle: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mastery_threshold: DEFAULT_MASTERY_THRESHOLD,
            learning_requeue_delay: DEFAULT_LEARNING_REQUEUE_DELAY,
            debounce: DEFAULT_DEBOUNCE,
            shuffle: true,
        }
    }
}

impl SessionConfig {
    pub fn with_mastery_threshold(mut self, threshold: u32) -> Self {
        self.mastery_threshold = threshold.max(1);
        self
    }

    pub fn with_requeue_delay(mut self, delay: Duration) -> Self {
        self.learning_requeue_delay = delay;
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn without_shuffle(mut self) -> Self {
        self.shuffle = false;
        self
    }
}
