//! One authoritative match: board, turn order and terminal state
//!
//! The session is the only code that mutates a board. Moves are attributed
//! to the session's own `current_player`, never to a client-claimed seat,
//! so turn order only ever advances on the server's schedule.

use crate::store::{GameRecord, GameStore};
use log::{debug, info, warn};
use shared::{Board, Color};
use std::sync::Arc;

/// A single in-progress or finished match, keyed by its session id.
pub struct GameSession {
    id: String,
    board: Board,
    current_player: Color,
    game_over: bool,
    winner: Option<Color>,
    store: Arc<dyn GameStore>,
}

impl GameSession {
    /// Creates an empty session. Red moves first.
    pub fn new(id: String, store: Arc<dyn GameStore>) -> Self {
        Self {
            id,
            board: Board::new(),
            current_player: Color::Red,
            game_over: false,
            winner: None,
            store,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn current_player(&self) -> Color {
        self.current_player
    }

    pub fn is_over(&self) -> bool {
        self.game_over
    }

    pub fn winner(&self) -> Option<Color> {
        self.winner
    }

    /// Attempts to drop the current player's piece in `col`.
    ///
    /// Returns `false` without any state change when the game is already
    /// over, the column is out of range, or the column is full. On an
    /// accepted move the piece either completes a run of four (the session
    /// becomes terminal with `current_player` as winner) or the turn flips.
    ///
    /// Every accepted move is upserted to the store before returning.
    /// Persistence is best-effort: an upsert failure is logged and the
    /// in-memory state stays authoritative.
    pub async fn attempt_move(&mut self, col: usize) -> bool {
        if self.game_over {
            debug!("session {}: move after game over ignored", self.id);
            return false;
        }

        let mover = self.current_player;
        let row = match self.board.drop_piece(col, mover) {
            Some(row) => row,
            None => {
                debug!("session {}: illegal move in column {}", self.id, col);
                return false;
            }
        };

        if self.board.has_run_of_four(row, col, mover) {
            self.game_over = true;
            self.winner = Some(mover);
            info!("session {}: {:?} wins", self.id, mover);
        } else {
            self.current_player = mover.other();
        }

        self.save().await;
        true
    }

    /// Snapshot of the session in the persisted document shape.
    pub fn record(&self) -> GameRecord {
        GameRecord {
            board: self.board.clone(),
            current_player: self.current_player,
            game_over: self.game_over,
            winner: self.winner,
        }
    }

    async fn save(&self) {
        if let Err(e) = self.store.upsert(&self.id, self.record()).await {
            warn!("session {}: failed to persist state: {}", self.id, e);
        }
    }
}
