//! Realtime coordinator: maps connection events to session calls and fans
//! resulting state out to rooms
//!
//! One coordinator task owns the session registry and the rooms for the
//! whole process. Every inbound event arrives on a single channel, so
//! handling runs to completion per event before the next one is processed;
//! the store calls are the only await points. This serializes all session
//! mutation without locks and gives each room a single broadcast order.

use crate::registry::SessionRegistry;
use crate::rooms::{ConnId, PacketSender, Rooms};
use crate::store::GameStore;
use log::{debug, error, info};
use shared::{ClientPacket, Color, ServerPacket};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Messages sent from connection tasks to the coordinator.
#[derive(Debug)]
pub enum CoordinatorMessage {
    /// A connection was accepted; `sender` is its outbound channel.
    Connected { conn: ConnId, sender: PacketSender },
    /// A decoded packet arrived from a connection.
    EventReceived { conn: ConnId, packet: ClientPacket },
    /// The connection's socket closed or failed.
    Disconnected { conn: ConnId },
}

pub struct Coordinator {
    registry: SessionRegistry,
    rooms: Rooms,
    rx: mpsc::UnboundedReceiver<CoordinatorMessage>,
}

impl Coordinator {
    /// Creates the coordinator and the sender half connection tasks use to
    /// reach it.
    pub fn new(store: Arc<dyn GameStore>) -> (Self, mpsc::UnboundedSender<CoordinatorMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let coordinator = Self {
            registry: SessionRegistry::new(store),
            rooms: Rooms::new(),
            rx,
        };
        (coordinator, tx)
    }

    /// Processes events until every sender half is dropped.
    pub async fn run(mut self) {
        while let Some(message) = self.rx.recv().await {
            self.handle_message(message).await;
        }
        info!("Coordinator inbox closed, stopping");
    }

    async fn handle_message(&mut self, message: CoordinatorMessage) {
        match message {
            CoordinatorMessage::Connected { conn, sender } => {
                debug!("Connection {} registered", conn);
                self.rooms.register(conn, sender);
            }
            CoordinatorMessage::EventReceived { conn, packet } => {
                self.handle_event(conn, packet).await;
            }
            CoordinatorMessage::Disconnected { conn } => {
                info!("Connection {} disconnected", conn);
                self.rooms.unregister(conn);
            }
        }
    }

    async fn handle_event(&mut self, conn: ConnId, packet: ClientPacket) {
        match packet {
            ClientPacket::CreateGame => self.on_create(conn).await,
            ClientPacket::JoinGame { game_id } => self.on_join(conn, &game_id),
            ClientPacket::Move { game_id, col } => self.on_move(&game_id, col).await,
        }
    }

    /// Creates a session, joins the creator to its room and tells only the
    /// creator about the new game.
    async fn on_create(&mut self, conn: ConnId) {
        let (game_id, board) = match self.registry.create_session().await {
            Ok(created) => created,
            Err(e) => {
                // The creator never hears back; session creation is the one
                // operation that cannot proceed without the store.
                error!("Failed to create session: {}", e);
                return;
            }
        };

        self.rooms.join(&game_id, conn);
        self.rooms
            .send_to(conn, ServerPacket::GameCreated { game_id, board });
    }

    /// Joins a second participant: the requester is seated as Yellow, every
    /// connection already in the room as Red, and the whole room then gets a
    /// turn-state snapshot so both sides agree on whose move it is.
    fn on_join(&mut self, conn: ConnId, game_id: &str) {
        let (board, current_player) = match self.registry.lookup_mut(game_id) {
            Some(session) => (session.board().clone(), session.current_player()),
            None => {
                debug!("Join for unknown session {}", game_id);
                self.rooms.send_to(conn, ServerPacket::GameNotFound);
                return;
            }
        };

        self.rooms.join(game_id, conn);

        self.rooms.send_to(
            conn,
            ServerPacket::StartGame {
                game_id: game_id.to_string(),
                board: board.clone(),
                current_player,
                player_color: Color::Yellow,
            },
        );
        self.rooms.broadcast_except(
            game_id,
            &ServerPacket::StartGame {
                game_id: game_id.to_string(),
                board: board.clone(),
                current_player,
                player_color: Color::Red,
            },
            Some(conn),
        );
        self.rooms.broadcast(
            game_id,
            &ServerPacket::Move {
                board,
                current_player,
            },
        );
    }

    /// Applies a move and broadcasts the result.
    ///
    /// A move for an unknown session is dropped without feedback (assumed
    /// stale, not a user action), and a rejected move broadcasts nothing.
    /// A terminal move additionally emits the outcome and then destroys the
    /// session and its room.
    async fn on_move(&mut self, game_id: &str, col: usize) {
        let session = match self.registry.lookup_mut(game_id) {
            Some(session) => session,
            None => {
                debug!("Dropped move for unknown session {}", game_id);
                return;
            }
        };

        if !session.attempt_move(col).await {
            return;
        }

        let board = session.board().clone();
        let current_player = session.current_player();
        let outcome = if session.is_over() {
            session.winner()
        } else {
            None
        };

        self.rooms.broadcast(
            game_id,
            &ServerPacket::Move {
                board,
                current_player,
            },
        );

        if let Some(winner) = outcome {
            self.rooms
                .broadcast(game_id, &ServerPacket::GameOver { winner });
            self.registry.remove(game_id);
            self.rooms.drop_room(game_id);
        }
    }
}
