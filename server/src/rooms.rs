//! Room membership and broadcast fan-out
//!
//! A room is the set of connections playing one session, named by the
//! session id. Membership lives here, not in the game session: the
//! coordinator joins connections to rooms and fans server packets out to
//! them, while sessions know nothing about connections.

use log::debug;
use shared::ServerPacket;
use std::collections::HashMap;
use tokio::sync::mpsc;

/// Identifies one client connection for the lifetime of its socket.
pub type ConnId = u64;

/// Outbound handle for one connection; the network layer drains the other
/// end onto the socket.
pub type PacketSender = mpsc::UnboundedSender<ServerPacket>;

#[derive(Default)]
pub struct Rooms {
    /// Outbound channel per live connection
    connections: HashMap<ConnId, PacketSender>,
    /// Members per room, in arrival order
    rooms: HashMap<String, Vec<ConnId>>,
    /// Which room each connection currently occupies, if any
    membership: HashMap<ConnId, String>,
}

impl Rooms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a freshly accepted connection's outbound channel.
    pub fn register(&mut self, conn: ConnId, sender: PacketSender) {
        self.connections.insert(conn, sender);
    }

    /// Drops a connection: leaves its room (if any) and forgets its sender.
    pub fn unregister(&mut self, conn: ConnId) {
        if let Some(game_id) = self.membership.remove(&conn) {
            if let Some(members) = self.rooms.get_mut(&game_id) {
                members.retain(|&m| m != conn);
                if members.is_empty() {
                    self.rooms.remove(&game_id);
                }
            }
        }
        self.connections.remove(&conn);
    }

    /// Adds a connection to the room for `game_id`.
    ///
    /// A connection belongs to at most one room; joining another room moves
    /// it. Joining the same room twice is a no-op.
    pub fn join(&mut self, game_id: &str, conn: ConnId) {
        if let Some(current) = self.membership.get(&conn) {
            if current == game_id {
                return;
            }
            let leaving = current.clone();
            self.membership.remove(&conn);
            if let Some(members) = self.rooms.get_mut(&leaving) {
                members.retain(|&m| m != conn);
                if members.is_empty() {
                    self.rooms.remove(&leaving);
                }
            }
        }

        self.rooms.entry(game_id.to_string()).or_default().push(conn);
        self.membership.insert(conn, game_id.to_string());
    }

    /// Members of a room in arrival order; empty for an unknown room.
    pub fn members(&self, game_id: &str) -> &[ConnId] {
        self.rooms.get(game_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Sends a packet to a single connection.
    pub fn send_to(&self, conn: ConnId, packet: ServerPacket) {
        if let Some(sender) = self.connections.get(&conn) {
            // A closed channel means the connection died mid-flight; the
            // disconnect cleanup will catch up with it.
            if sender.send(packet).is_err() {
                debug!("Dropped packet for closed connection {}", conn);
            }
        }
    }

    /// Sends a packet to every member of a room.
    pub fn broadcast(&self, game_id: &str, packet: &ServerPacket) {
        self.broadcast_except(game_id, packet, None);
    }

    /// Sends a packet to every member of a room except `exclude`.
    pub fn broadcast_except(&self, game_id: &str, packet: &ServerPacket, exclude: Option<ConnId>) {
        for &conn in self.members(game_id) {
            if Some(conn) == exclude {
                continue;
            }
            self.send_to(conn, packet.clone());
        }
    }

    /// Forgets a room and its memberships. The connections stay registered.
    pub fn drop_room(&mut self, game_id: &str) {
        if let Some(members) = self.rooms.remove(game_id) {
            for conn in members {
                self.membership.remove(&conn);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn connect(rooms: &mut Rooms, conn: ConnId) -> UnboundedReceiver<ServerPacket> {
        let (tx, rx) = mpsc::unbounded_channel();
        rooms.register(conn, tx);
        rx
    }

    fn recv_count(rx: &mut UnboundedReceiver<ServerPacket>) -> usize {
        let mut count = 0;
        while rx.try_recv().is_ok() {
            count += 1;
        }
        count
    }

    #[test]
    fn test_send_to_registered_connection() {
        let mut rooms = Rooms::new();
        let mut rx = connect(&mut rooms, 1);

        rooms.send_to(1, ServerPacket::GameNotFound);

        assert!(matches!(rx.try_recv(), Ok(ServerPacket::GameNotFound)));
    }

    #[test]
    fn test_broadcast_reaches_whole_room() {
        let mut rooms = Rooms::new();
        let mut rx1 = connect(&mut rooms, 1);
        let mut rx2 = connect(&mut rooms, 2);
        let mut rx3 = connect(&mut rooms, 3);

        rooms.join("game-a", 1);
        rooms.join("game-a", 2);

        rooms.broadcast("game-a", &ServerPacket::GameNotFound);

        assert_eq!(recv_count(&mut rx1), 1);
        assert_eq!(recv_count(&mut rx2), 1);
        // Connection 3 never joined the room
        assert_eq!(recv_count(&mut rx3), 0);
    }

    #[test]
    fn test_broadcast_except_skips_sender() {
        let mut rooms = Rooms::new();
        let mut rx1 = connect(&mut rooms, 1);
        let mut rx2 = connect(&mut rooms, 2);

        rooms.join("game-a", 1);
        rooms.join("game-a", 2);

        rooms.broadcast_except("game-a", &ServerPacket::GameNotFound, Some(2));

        assert_eq!(recv_count(&mut rx1), 1);
        assert_eq!(recv_count(&mut rx2), 0);
    }

    #[test]
    fn test_members_in_arrival_order() {
        let mut rooms = Rooms::new();
        let _rx2 = connect(&mut rooms, 2);
        let _rx1 = connect(&mut rooms, 1);

        rooms.join("game-a", 2);
        rooms.join("game-a", 1);

        assert_eq!(rooms.members("game-a"), &[2, 1]);
        assert_eq!(rooms.members("unknown"), &[] as &[ConnId]);
    }

    #[test]
    fn test_joining_again_is_a_no_op() {
        let mut rooms = Rooms::new();
        let _rx = connect(&mut rooms, 1);

        rooms.join("game-a", 1);
        rooms.join("game-a", 1);

        assert_eq!(rooms.members("game-a"), &[1]);
    }

    #[test]
    fn test_joining_another_room_moves_the_connection() {
        let mut rooms = Rooms::new();
        let _rx = connect(&mut rooms, 1);

        rooms.join("game-a", 1);
        rooms.join("game-b", 1);

        assert_eq!(rooms.members("game-a"), &[] as &[ConnId]);
        assert_eq!(rooms.members("game-b"), &[1]);
    }

    #[test]
    fn test_unregister_leaves_room() {
        let mut rooms = Rooms::new();
        let _rx1 = connect(&mut rooms, 1);
        let mut rx2 = connect(&mut rooms, 2);

        rooms.join("game-a", 1);
        rooms.join("game-a", 2);
        rooms.unregister(1);

        assert_eq!(rooms.members("game-a"), &[2]);

        rooms.broadcast("game-a", &ServerPacket::GameNotFound);
        assert_eq!(recv_count(&mut rx2), 1);
    }

    #[test]
    fn test_drop_room_keeps_connections() {
        let mut rooms = Rooms::new();
        let mut rx = connect(&mut rooms, 1);

        rooms.join("game-a", 1);
        rooms.drop_room("game-a");

        assert_eq!(rooms.members("game-a"), &[] as &[ConnId]);

        // Direct sends still work; the connection can join a new room
        rooms.send_to(1, ServerPacket::GameNotFound);
        assert_eq!(recv_count(&mut rx), 1);
        rooms.join("game-b", 1);
        assert_eq!(rooms.members("game-b"), &[1]);
    }

    #[test]
    fn test_send_to_closed_channel_is_harmless() {
        let mut rooms = Rooms::new();
        let rx = connect(&mut rooms, 1);
        drop(rx);

        rooms.join("game-a", 1);
        rooms.broadcast("game-a", &ServerPacket::GameNotFound);
    }
}
