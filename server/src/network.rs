//! TCP transport: accept loop, per-connection tasks and frame codec
//!
//! Each accepted connection gets a reader task that decodes frames into
//! coordinator messages and a writer task that drains the connection's
//! outbound channel onto the socket. Transport failures are always scoped
//! to one connection; nothing here can take the server down.

use crate::coordinator::{Coordinator, CoordinatorMessage};
use crate::rooms::ConnId;
use crate::store::GameStore;
use log::{error, info, warn};
use shared::{decode_packet, encode_frame, frame_len, ClientPacket, FRAME_HEADER_LEN, MAX_FRAME_LEN};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// The listening server: owns the coordinator and hands accepted sockets
/// their connection tasks.
pub struct Server {
    listener: TcpListener,
    coordinator: Coordinator,
    coordinator_tx: mpsc::UnboundedSender<CoordinatorMessage>,
}

impl Server {
    pub async fn new(addr: &str, store: Arc<dyn GameStore>) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(addr).await?;
        info!("Server listening on {}", listener.local_addr()?);

        let (coordinator, coordinator_tx) = Coordinator::new(store);

        Ok(Self {
            listener,
            coordinator,
            coordinator_tx,
        })
    }

    /// The bound address, useful when binding to port 0.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Runs the coordinator and the accept loop until the process exits.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let Server {
            listener,
            coordinator,
            coordinator_tx,
        } = self;

        tokio::spawn(coordinator.run());

        let mut next_conn_id: ConnId = 1;
        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    let conn = next_conn_id;
                    next_conn_id += 1;
                    info!("Accepted connection {} from {}", conn, addr);
                    spawn_connection(conn, stream, coordinator_tx.clone());
                }
                Err(e) => {
                    // Transient accept failures should not kill the server
                    warn!("Failed to accept connection: {}", e);
                }
            }
        }
    }
}

/// Wires one socket into the coordinator: registers its outbound channel,
/// then runs the reader and writer halves as independent tasks.
fn spawn_connection(
    conn: ConnId,
    stream: TcpStream,
    coordinator_tx: mpsc::UnboundedSender<CoordinatorMessage>,
) {
    let (read_half, write_half) = stream.into_split();

    let (packet_tx, packet_rx) = mpsc::unbounded_channel();
    if coordinator_tx
        .send(CoordinatorMessage::Connected {
            conn,
            sender: packet_tx,
        })
        .is_err()
    {
        error!("Coordinator is gone, dropping connection {}", conn);
        return;
    }

    tokio::spawn(write_loop(conn, write_half, packet_rx));

    tokio::spawn(async move {
        let mut reader = read_half;
        while let Some(packet) = read_client_packet(conn, &mut reader).await {
            if coordinator_tx
                .send(CoordinatorMessage::EventReceived { conn, packet })
                .is_err()
            {
                break;
            }
        }

        // EOF, a decode failure or an oversized frame all end the
        // connection the same way
        let _ = coordinator_tx.send(CoordinatorMessage::Disconnected { conn });
    });
}

/// Drains a connection's outbound channel onto its socket.
///
/// Ends when the coordinator unregisters the connection (channel closed) or
/// the socket write fails.
async fn write_loop<W>(
    conn: ConnId,
    mut writer: W,
    mut packet_rx: mpsc::UnboundedReceiver<shared::ServerPacket>,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(packet) = packet_rx.recv().await {
        let frame = match encode_frame(&packet) {
            Ok(frame) => frame,
            Err(e) => {
                error!("Failed to encode packet for connection {}: {}", conn, e);
                continue;
            }
        };

        if let Err(e) = writer.write_all(&frame).await {
            warn!("Write to connection {} failed: {}", conn, e);
            break;
        }
    }
}

/// Reads and decodes one length-prefixed frame.
///
/// Returns `None` on EOF, an oversized frame or a payload that does not
/// decode; all three close the connection.
async fn read_client_packet<R>(conn: ConnId, reader: &mut R) -> Option<ClientPacket>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; FRAME_HEADER_LEN];
    reader.read_exact(&mut header).await.ok()?;

    let len = frame_len(header);
    if len > MAX_FRAME_LEN {
        warn!(
            "Connection {} sent an oversized frame ({} bytes), closing",
            conn, len
        );
        return None;
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await.ok()?;

    match decode_packet(&payload) {
        Ok(packet) => Some(packet),
        Err(e) => {
            warn!("Connection {} sent an undecodable frame: {}", conn, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use shared::ServerPacket;

    #[tokio::test]
    async fn test_read_client_packet() {
        let frame = encode_frame(&ClientPacket::JoinGame {
            game_id: "abc".to_string(),
        })
        .unwrap();
        let mut reader = tokio_test::io::Builder::new().read(&frame).build();

        let packet = read_client_packet(1, &mut reader).await;
        match packet {
            Some(ClientPacket::JoinGame { game_id }) => assert_eq!(game_id, "abc"),
            other => panic!("Expected JoinGame, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_read_two_packets_from_one_stream() {
        let mut bytes = encode_frame(&ClientPacket::CreateGame).unwrap();
        bytes.extend(
            encode_frame(&ClientPacket::Move {
                game_id: "abc".to_string(),
                col: 4,
            })
            .unwrap(),
        );
        let mut reader = tokio_test::io::Builder::new().read(&bytes).build();

        assert!(matches!(
            read_client_packet(1, &mut reader).await,
            Some(ClientPacket::CreateGame)
        ));
        assert!(matches!(
            read_client_packet(1, &mut reader).await,
            Some(ClientPacket::Move { col: 4, .. })
        ));
    }

    #[tokio::test]
    async fn test_eof_yields_none() {
        let mut reader = tokio_test::io::Builder::new().build();
        assert!(read_client_packet(1, &mut reader).await.is_none());
    }

    #[tokio::test]
    async fn test_oversized_frame_is_refused() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&((MAX_FRAME_LEN as u32) + 1).to_le_bytes());
        let mut reader = tokio_test::io::Builder::new().read(&bytes).build();

        assert!(read_client_packet(1, &mut reader).await.is_none());
    }

    #[tokio::test]
    async fn test_undecodable_payload_is_refused() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&4u32.to_le_bytes());
        bytes.extend_from_slice(&[0xff, 0xff, 0xff, 0xff]);
        let mut reader = tokio_test::io::Builder::new().read(&bytes).build();

        let packet: Option<ClientPacket> = read_client_packet(1, &mut reader).await;
        assert!(packet.is_none());
    }

    #[tokio::test]
    async fn test_server_binds_ephemeral_port() {
        let server = Server::new("127.0.0.1:0", Arc::new(MemoryStore::new()))
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();
        assert_ne!(addr.port(), 0);
    }

    #[tokio::test]
    async fn test_write_loop_frames_packets() {
        let frame = encode_frame(&ServerPacket::GameNotFound).unwrap();
        let writer = tokio_test::io::Builder::new().write(&frame).build();

        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(ServerPacket::GameNotFound).unwrap();
        drop(tx);

        // The mock writer asserts the exact bytes written
        write_loop(1, writer, rx).await;
    }
}
