//! Wire protocol and game rules shared between the server and its clients

mod game;

pub use game::{Board, Color, COLS, ROWS};

use serde::{Deserialize, Serialize};

/// Frames larger than this are a protocol violation, not a real packet.
pub const MAX_FRAME_LEN: usize = 64 * 1024;

/// Number of bytes in the length prefix that precedes every packet.
pub const FRAME_HEADER_LEN: usize = 4;

/// Events a client sends to the server.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum ClientPacket {
    /// Create a new game session; the sender becomes the Red seat.
    CreateGame,
    /// Join an existing session by id; the sender becomes the Yellow seat.
    JoinGame { game_id: String },
    /// Drop a piece in column `col` (0-6) of the identified session.
    Move { game_id: String, col: usize },
}

/// Events the server sends to clients.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum ServerPacket {
    /// Sent to the creator only, once its session exists.
    GameCreated { game_id: String, board: Board },
    /// Sent to every room member when a second participant joins.
    /// `player_color` identifies the recipient's own seat and is the only
    /// field that differs between recipients.
    StartGame {
        game_id: String,
        board: Board,
        current_player: Color,
        player_color: Color,
    },
    /// Broadcast to the whole room after every accepted move.
    Move { board: Board, current_player: Color },
    /// Broadcast to the whole room when a run of four completes.
    GameOver { winner: Color },
    /// Sent to a joiner that named an unknown session id.
    GameNotFound,
}

/// Encodes a packet as a length-prefixed bincode frame.
///
/// The prefix is a 4-byte little-endian payload length; the receiver reads
/// the header, then exactly that many payload bytes.
pub fn encode_frame<T: Serialize>(packet: &T) -> Result<Vec<u8>, bincode::Error> {
    let payload = bincode::serialize(packet)?;
    let mut frame = Vec::with_capacity(FRAME_HEADER_LEN + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Decodes the payload length from a frame header.
pub fn frame_len(header: [u8; FRAME_HEADER_LEN]) -> usize {
    u32::from_le_bytes(header) as usize
}

/// Decodes a packet from the payload bytes of one frame.
pub fn decode_packet<'a, T: Deserialize<'a>>(payload: &'a [u8]) -> Result<T, bincode::Error> {
    bincode::deserialize(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_packet_roundtrip() {
        let packets = vec![
            ClientPacket::CreateGame,
            ClientPacket::JoinGame {
                game_id: "abc123".to_string(),
            },
            ClientPacket::Move {
                game_id: "abc123".to_string(),
                col: 3,
            },
        ];

        for packet in packets {
            let frame = encode_frame(&packet).unwrap();
            let len = frame_len(frame[..FRAME_HEADER_LEN].try_into().unwrap());
            assert_eq!(len, frame.len() - FRAME_HEADER_LEN);

            let decoded: ClientPacket = decode_packet(&frame[FRAME_HEADER_LEN..]).unwrap();
            match (&packet, &decoded) {
                (ClientPacket::CreateGame, ClientPacket::CreateGame) => {}
                (ClientPacket::JoinGame { game_id: a }, ClientPacket::JoinGame { game_id: b }) => {
                    assert_eq!(a, b)
                }
                (
                    ClientPacket::Move { game_id: a, col: c1 },
                    ClientPacket::Move { game_id: b, col: c2 },
                ) => {
                    assert_eq!(a, b);
                    assert_eq!(c1, c2);
                }
                _ => panic!("Packet type mismatch after roundtrip"),
            }
        }
    }

    #[test]
    fn test_server_packet_roundtrip() {
        let mut board = Board::new();
        board.drop_piece(3, Color::Red);

        let packet = ServerPacket::StartGame {
            game_id: "abc123".to_string(),
            board: board.clone(),
            current_player: Color::Yellow,
            player_color: Color::Red,
        };

        let frame = encode_frame(&packet).unwrap();
        let decoded: ServerPacket = decode_packet(&frame[FRAME_HEADER_LEN..]).unwrap();

        match decoded {
            ServerPacket::StartGame {
                game_id,
                board: b,
                current_player,
                player_color,
            } => {
                assert_eq!(game_id, "abc123");
                assert_eq!(b, board);
                assert_eq!(current_player, Color::Yellow);
                assert_eq!(player_color, Color::Red);
            }
            _ => panic!("Packet type mismatch after roundtrip"),
        }
    }

    #[test]
    fn test_full_board_frame_fits_sanity_cap() {
        let mut board = Board::new();
        for col in 0..COLS {
            for _ in 0..ROWS {
                board.drop_piece(col, Color::Red);
            }
        }

        let packet = ServerPacket::Move {
            board,
            current_player: Color::Yellow,
        };
        let frame = encode_frame(&packet).unwrap();

        assert!(frame.len() - FRAME_HEADER_LEN <= MAX_FRAME_LEN);
    }
}
