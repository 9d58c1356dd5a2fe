//! Conversation history storage
//!
//! Keeps a bounded, ordered list of turns per conversation id.

use crate::models::Turn;
use crate::Result;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::debug;

/// Maximum turns kept per conversation (5 exchanges)
pub const MAX_STORED_TURNS: usize = 10;

/// Conversation history for one conversation id
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    turns: VecDeque<Turn>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self {
            turns: VecDeque::new(),
        }
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push_back(turn);
    }

    /// Iterate over all turns, oldest first
    pub fn turns(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    pub fn turn_count(&self) -> usize {
        self.turns.len()
    }

    /// Drop oldest turns until at most `keep_count` remain
    pub fn trim_to_recent(&mut self, keep_count: usize) {
        while self.turns.len() > keep_count {
            self.turns.pop_front();
        }
    }
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new()
    }
}

/// Trait for conversation persistence
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Turns for `id`, oldest first; empty when the id is unknown
    async fn get(&self, id: &str) -> Result<Vec<Turn>>;

    /// Append `turns` in order, then keep only the most recent ones
    async fn append(&self, id: &str, turns: Vec<Turn>) -> Result<()>;

    /// Remove the conversation entirely; unknown ids are not an error
    async fn delete(&self, id: &str) -> Result<()>;

    /// Exclusive guard for one conversation, held for a whole exchange
    async fn lock(&self, id: &str) -> OwnedMutexGuard<()>;
}

/// Process-memory store, lost on restart
pub struct InMemoryConversationStore {
    histories: Arc<RwLock<HashMap<String, ConversationHistory>>>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    max_turns: usize,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::with_capacity(MAX_STORED_TURNS)
    }

    pub fn with_capacity(max_turns: usize) -> Self {
        Self {
            histories: Arc::new(RwLock::new(HashMap::new())),
            locks: Mutex::new(HashMap::new()),
            max_turns,
        }
    }

    pub async fn conversation_count(&self) -> usize {
        self.histories.read().await.len()
    }

    /// Lock slots currently tracked, held or idle
    pub async fn lock_slot_count(&self) -> usize {
        self.locks.lock().await.len()
    }
}

impl Default for InMemoryConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn get(&self, id: &str) -> Result<Vec<Turn>> {
        let histories = self.histories.read().await;
        Ok(histories
            .get(id)
            .map(|h| h.turns().cloned().collect())
            .unwrap_or_default())
    }

    async fn append(&self, id: &str, turns: Vec<Turn>) -> Result<()> {
        let mut histories = self.histories.write().await;
        let history = histories
            .entry(id.to_string())
            .or_insert_with(ConversationHistory::new);

        for turn in turns {
            history.push(turn);
        }
        history.trim_to_recent(self.max_turns);

        debug!(conversation_id = id, turns = history.turn_count(), "History updated");
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let removed = self.histories.write().await.remove(id).is_some();
        prune_idle_slots(&mut *self.locks.lock().await);
        debug!(conversation_id = id, removed, "History deleted");
        Ok(())
    }

    async fn lock(&self, id: &str) -> OwnedMutexGuard<()> {
        let slot = {
            let mut locks = self.locks.lock().await;
            prune_idle_slots(&mut locks);
            locks
                .entry(id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        slot.lock_owned().await
    }
}

/// Drop slots nobody holds or waits on; a holder or waiter keeps its own clone
fn prune_idle_slots(locks: &mut HashMap<String, Arc<Mutex<()>>>) {
    locks.retain(|_, slot| Arc::strong_count(slot) > 1);
}
