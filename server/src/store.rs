//! Persistence seam for session state
//!
//! The serving path treats durable storage as a write-only side channel: a
//! new session claims a generated id, and every accepted move upserts the
//! full session document. Nothing reads the store while serving, so a store
//! failure never affects the in-memory game.

use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use shared::{Board, Color};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::Mutex;

/// The per-session document shape, upserted on every accepted move.
///
/// Field names follow the stored document format: `board`, `currentPlayer`,
/// `gameOver`, `winner`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    pub board: Board,
    pub current_player: Color,
    pub game_over: bool,
    pub winner: Option<Color>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Durable upsert of session state, plus id generation for new sessions.
///
/// Creating a game is an insert-and-return-generated-id operation against
/// the external store; the id then keys every later upsert.
#[async_trait]
pub trait GameStore: Send + Sync {
    /// Inserts an empty session document and returns its generated id.
    async fn create_game(&self) -> Result<String, StoreError>;

    /// Writes the full session document for `game_id`, inserting or
    /// replacing as needed.
    async fn upsert(&self, game_id: &str, record: GameRecord) -> Result<(), StoreError>;
}

/// In-process store used as the default backend and in tests.
///
/// Ids are 24 lowercase hex characters, the same shape as the object ids
/// a document store would hand out.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, Option<GameRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a stored document back. Test-only accessor; the serving path
    /// never reads from the store.
    pub async fn get(&self, game_id: &str) -> Option<GameRecord> {
        self.records.lock().await.get(game_id).cloned().flatten()
    }

    fn generate_id() -> String {
        let mut rng = rand::thread_rng();
        (0..12).map(|_| format!("{:02x}", rng.gen::<u8>())).collect()
    }
}

#[async_trait]
impl GameStore for MemoryStore {
    async fn create_game(&self) -> Result<String, StoreError> {
        let mut records = self.records.lock().await;

        // Regenerate on the off chance of a collision with a live id
        let mut id = Self::generate_id();
        while records.contains_key(&id) {
            id = Self::generate_id();
        }

        records.insert(id.clone(), None);
        Ok(id)
    }

    async fn upsert(&self, game_id: &str, record: GameRecord) -> Result<(), StoreError> {
        self.records
            .lock()
            .await
            .insert(game_id.to_string(), Some(record));
        Ok(())
    }
}
