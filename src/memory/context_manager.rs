//! Context Window Management
//!
//! Decides which part of the stored history is forwarded to the model.

use crate::models::{ModelMessage, Turn};

/// Configuration for context window management
#[derive(Debug, Clone)]
pub struct ContextConfig {
    /// Number of most recent turns forwarded to the model (3 exchanges)
    pub recent_turns: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self { recent_turns: 6 }
    }
}

/// Builds the recency window for LLM requests
pub struct ContextManager {
    config: ContextConfig,
}

impl ContextManager {
    pub fn new() -> Self {
        Self {
            config: ContextConfig::default(),
        }
    }

    pub fn with_config(config: ContextConfig) -> Self {
        Self { config }
    }

    /// Most recent turns, oldest first, never more than `recent_turns`
    pub fn recent_window<'a>(&self, history: &'a [Turn]) -> &'a [Turn] {
        let start = history.len().saturating_sub(self.config.recent_turns);
        &history[start..]
    }

    /// Recency window converted to model messages
    pub fn prepare_context_for_llm(&self, history: &[Turn]) -> Vec<ModelMessage> {
        self.recent_window(history)
            .iter()
            .map(ModelMessage::from)
            .collect()
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }
}

impl Default for ContextManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn history(len: usize) -> Vec<Turn> {
        (0..len)
            .map(|i| {
                if i % 2 == 0 {
                    Turn::user(format!("Question {}", i))
                } else {
                    Turn::assistant(format!("Answer {}", i))
                }
            })
            .collect()
    }

    #[test]
    fn test_window_never_exceeds_six() {
        let manager = ContextManager::new();
        for len in 0..=10 {
            let turns = history(len);
            assert_eq!(manager.recent_window(&turns).len(), len.min(6));
        }
    }

    #[test]
    fn test_window_keeps_latest_turns() {
        let manager = ContextManager::new();
        let turns = history(10);
        let context = manager.prepare_context_for_llm(&turns);

        assert_eq!(context.len(), 6);
        assert_eq!(context[0], ModelMessage::User("Question 4".to_string()));
        assert_eq!(context[5], ModelMessage::Assistant("Answer 9".to_string()));
    }

    #[test]
    fn test_custom_window() {
        let manager = ContextManager::with_config(ContextConfig { recent_turns: 2 });
        assert_eq!(manager.recent_window(&history(5)).len(), 2);
        assert_eq!(manager.config().recent_turns, 2);
    }
}
