//! Process-wide mapping from session id to live game session
//!
//! The registry is owned by the coordinator task for the lifetime of the
//! process; every mutation happens on that task, so lookups never observe a
//! half-inserted or half-removed entry.

use crate::session::GameSession;
use crate::store::{GameStore, StoreError};
use log::info;
use shared::Board;
use std::collections::HashMap;
use std::sync::Arc;

pub struct SessionRegistry {
    sessions: HashMap<String, GameSession>,
    store: Arc<dyn GameStore>,
}

impl SessionRegistry {
    pub fn new(store: Arc<dyn GameStore>) -> Self {
        Self {
            sessions: HashMap::new(),
            store,
        }
    }

    /// Creates a new empty session under a store-generated id.
    ///
    /// Returns the id and the session's initial board.
    pub async fn create_session(&mut self) -> Result<(String, Board), StoreError> {
        let game_id = self.store.create_game().await?;
        let session = GameSession::new(game_id.clone(), Arc::clone(&self.store));
        let board = session.board().clone();

        info!("Created session {}", game_id);
        self.sessions.insert(game_id.clone(), session);

        Ok((game_id, board))
    }

    /// Looks up a live session. Never creates; an id that was removed (or
    /// never existed) is an ordinary `None`.
    pub fn lookup_mut(&mut self, game_id: &str) -> Option<&mut GameSession> {
        self.sessions.get_mut(game_id)
    }

    /// Removes a session. Idempotent; removing an absent id is a no-op.
    pub fn remove(&mut self, game_id: &str) {
        if self.sessions.remove(game_id).is_some() {
            info!("Removed session {}", game_id);
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
