//! Token estimation and tool-result truncation.

use std::sync::Arc;

pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> usize;
}

/// Approximates tokens from the character count.
#[derive(Debug, Clone)]
pub struct CharacterEstimator {
    chars_per_token: usize,
}

impl CharacterEstimator {
    pub fn new(chars_per_token: usize) -> Self {
        Self {
            chars_per_token: chars_per_token.max(1),
        }
    }
}

impl Default for CharacterEstimator {
    fn default() -> Self {
        Self::new(4)
    }
}

impl TokenCounter for CharacterEstimator {
    fn count(&self, text: &str) -> usize {
        text.chars().count().div_ceil(self.chars_per_token)
    }
}

/// Single token ceiling for tool results entering the conversation.
#[derive(Clone)]
pub struct TruncationPolicy {
    ceiling: usize,
    counter: Arc<dyn TokenCounter>,
}

impl TruncationPolicy {
    pub fn new(ceiling: usize) -> Self {
        Self::with_counter(ceiling, Arc::new(CharacterEstimator::default()))
    }

    pub fn with_counter(ceiling: usize, counter: Arc<dyn TokenCounter>) -> Self {
        Self { ceiling, counter }
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// Return `text` unchanged while it fits the ceiling, otherwise its first
    /// `ceiling` characters.
    pub fn apply(&self, text: String) -> String {
        let tokens = self.counter.count(&text);
        if tokens <= self.ceiling {
            return text;
        }

        tracing::debug!(tokens, ceiling = self.ceiling, "Truncating tool result");
        match text.char_indices().nth(self.ceiling) {
            Some((end, _)) => text[..end].to_string(),
            None => text,
        }
    }
}

impl std::fmt::Debug for TruncationPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TruncationPolicy")
            .field("ceiling", &self.ceiling)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One token per character
    struct PerChar;

    impl TokenCounter for PerChar {
        fn count(&self, text: &str) -> usize {
            text.chars().count()
        }
    }

    #[test]
    fn test_character_estimator() {
        let estimator = CharacterEstimator::default();

        assert_eq!(estimator.count(""), 0);
        assert_eq!(estimator.count("abcd"), 1);
        assert_eq!(estimator.count("abcde"), 2);
        assert_eq!(estimator.count("ééééé"), 2);
    }

    #[test]
    fn test_within_ceiling_unchanged() {
        let policy = TruncationPolicy::new(10);
        let text = "x".repeat(40);

        assert_eq!(policy.apply(text.clone()), text);
    }

    #[test]
    fn test_over_ceiling_cut_to_ceiling_chars() {
        let policy = TruncationPolicy::new(10);
        let truncated = policy.apply("x".repeat(41));

        assert_eq!(truncated.chars().count(), 10);
    }

    #[test]
    fn test_cut_respects_char_boundaries() {
        let policy = TruncationPolicy::with_counter(3, Arc::new(PerChar));

        assert_eq!(policy.apply("héllo".to_string()), "hél");
    }
}
