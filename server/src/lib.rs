//! # Connect Four Game Server Library
//!
//! Authoritative server for two-player Connect Four over a persistent
//! connection. One client creates a session, a second joins it by id, and
//! the server owns board state, turn order and win detection, broadcasting
//! every change to both participants.
//!
//! ## Architecture
//!
//! All game state is mutated by a single coordinator task fed by one
//! channel, so handling of an event runs to completion before the next
//! event is processed. Per-session ordering, registry atomicity and a
//! consistent broadcast order per room fall out of that serialization
//! without any locking; the only await points are the calls into the
//! persistence store.
//!
//! ## Module Organization
//!
//! ### Coordinator Module (`coordinator`)
//! Maps inbound connection events (create/join/move/disconnect) to registry
//! and session calls, and fans resulting state out to the right room.
//!
//! ### Session Module (`session`)
//! One match: board, turn state, terminal state, and the best-effort
//! persistence of every accepted move.
//!
//! ### Registry Module (`registry`)
//! The id-to-session map for the process lifetime.
//!
//! ### Rooms Module (`rooms`)
//! Explicit room membership and broadcast primitives over per-connection
//! outbound channels.
//!
//! ### Store Module (`store`)
//! The persistence seam: id generation and durable upserts, write-only in
//! the serving path.
//!
//! ### Network Module (`network`)
//! TCP accept loop, per-connection reader/writer tasks and the
//! length-prefixed frame codec.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::Server;
//! use server::store::MemoryStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::new("127.0.0.1:3002", Arc::new(MemoryStore::new())).await?;
//!     server.run().await
//! }
//! ```
//!
//! ## Error Philosophy
//!
//! Nothing a client does terminates the process. Illegal moves are silent
//! no-ops, a stale move for a vanished session is dropped, joining an
//! unknown id answers `GameNotFound`, persistence failures are logged while
//! in-memory state stays authoritative, and transport failures only ever
//! close the one connection involved.

pub mod coordinator;
pub mod network;
pub mod registry;
pub mod rooms;
pub mod session;
pub mod store;
