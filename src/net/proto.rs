use crate::{
    entity::{EntityId, LookComp},
    world::{Chunk, IntVec3, Vec3f},
};

/// Which end of the connection a codec sits on. Decides which half of the
/// packet id space it accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Server,
    Client,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    // Client to server
    C00Join {
        username: String,
    },
    C01PlayerPosition {
        position: Vec3f,
        look: LookComp,
    },
    C02BlockDig {
        position: IntVec3,
        hit: Vec3f,
    },
    C03BlockInteraction {
        position: IntVec3,
        hit: Vec3f,
    },
    C04HeldItem {
        slot: u8,
    },

    // Server to client
    S00Play {
        entity_id: EntityId,
        position: Vec3f,
        look: LookComp,
        chunks: Vec<Chunk>,
        /// JSON snapshot of the player's inventory.
        inventory: String,
    },
    S01LoadChunks {
        chunks: Vec<Chunk>,
    },
    S02UnloadChunks {
        origins: Vec<IntVec3>,
    },
    S03BlockUpdate {
        position: IntVec3,
        block: String,
    },
    S04EntityCreate {
        entity_id: EntityId,
        kind: String,
        position: Vec3f,
        look: LookComp,
    },
    S05EntityDelete {
        entity_id: EntityId,
    },
    S06EntityPosition {
        entity_id: EntityId,
        position: Vec3f,
        look: LookComp,
    },
    S07KeepAlive {
        timestamp: i64,
    },
}

impl Packet {
    pub fn id(&self) -> i32 {
        match self {
            Packet::C00Join { .. } => 0x00,
            Packet::C01PlayerPosition { .. } => 0x01,
            Packet::C02BlockDig { .. } => 0x02,
            Packet::C03BlockInteraction { .. } => 0x03,
            Packet::C04HeldItem { .. } => 0x04,

            Packet::S00Play { .. } => 0x00,
            Packet::S01LoadChunks { .. } => 0x01,
            Packet::S02UnloadChunks { .. } => 0x02,
            Packet::S03BlockUpdate { .. } => 0x03,
            Packet::S04EntityCreate { .. } => 0x04,
            Packet::S05EntityDelete { .. } => 0x05,
            Packet::S06EntityPosition { .. } => 0x06,
            Packet::S07KeepAlive { .. } => 0x07,
        }
    }

    /// The side that sends this packet.
    pub fn sender(&self) -> Side {
        match self {
            Packet::C00Join { .. }
            | Packet::C01PlayerPosition { .. }
            | Packet::C02BlockDig { .. }
            | Packet::C03BlockInteraction { .. }
            | Packet::C04HeldItem { .. } => Side::Client,
            _ => Side::Server,
        }
    }
}
