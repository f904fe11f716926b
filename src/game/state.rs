use std::{
    collections::BTreeSet,
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::{Duration, Instant},
};

use log::{debug, info, trace, warn};

use crate::{
    entity::{EntityBuilder, EntityId, LookComp, PhysicsComp, PLAYER_AABB},
    lerp::lerp_system,
    model::Inventory,
    net::Packet,
    physics::{frame_system, tick_system},
    world::{Dimension, IntVec3, Vec3f},
};

use super::{ClientEvent, RenderHook};

const LOCAL_PLAYER_KIND: &str = "mc:local_player";

/// Client-side view of the world, mutated only from the main loop.
pub struct GameState {
    world: Arc<RwLock<Dimension>>,
    player_id: Option<EntityId>,
    inventory: Inventory,
    lerp_delay: Duration,
    connected: bool,
}

impl GameState {
    pub fn new(world: Arc<RwLock<Dimension>>, lerp_delay: Duration) -> GameState {
        GameState {
            world,
            player_id: None,
            inventory: Inventory::default(),
            lerp_delay,
            connected: true,
        }
    }

    pub fn world(&self) -> &Arc<RwLock<Dimension>> {
        &self.world
    }

    pub fn read_world(&self) -> RwLockReadGuard<'_, Dimension> {
        self.world.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_world(&self) -> RwLockWriteGuard<'_, Dimension> {
        self.world.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn player_id(&self) -> Option<EntityId> {
        self.player_id
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn player_position(&self) -> Option<Vec3f> {
        let id = self.player_id?;
        self.read_world().entities.positions.get(&id).copied()
    }

    /// Applies one queued event. Returns the chunks that need a new mesh.
    pub fn handle_event(
        &mut self,
        event: ClientEvent,
        now: Instant,
        hook: &mut dyn RenderHook,
    ) -> Vec<IntVec3> {
        match event {
            ClientEvent::Network(packet) => self.handle_packet(packet, now, hook),
            ClientEvent::MeshReady { origin, mesh } => {
                if self.read_world().chunks.has_chunk(&origin) {
                    hook.mesh_ready(origin, &mesh);
                } else {
                    trace!("Discarding stale mesh for {:?}", origin);
                }
                Vec::new()
            }
            ClientEvent::Disconnected => {
                info!("Disconnected from server");
                self.connected = false;
                Vec::new()
            }
        }
    }

    fn handle_packet(&mut self, packet: Packet, now: Instant, hook: &mut dyn RenderHook) -> Vec<IntVec3> {
        match packet {
            Packet::S00Play {
                entity_id,
                position,
                look,
                chunks,
                inventory,
            } => {
                match Inventory::from_snapshot(&inventory) {
                    Ok(inventory) => self.inventory = inventory,
                    Err(err) => warn!("Ignoring malformed inventory snapshot: {}", err),
                }

                let mut dim = self.write_world();
                let origins: Vec<IntVec3> = chunks.iter().map(|c| c.origin()).collect();
                for chunk in chunks {
                    dim.insert_chunk(chunk);
                }

                match PhysicsComp::new(PLAYER_AABB) {
                    Ok(physics) => {
                        dim.entities.spawn(
                            EntityBuilder::new(LOCAL_PLAYER_KIND)
                                .id(entity_id)
                                .position(position)
                                .physics(physics)
                                .look(look),
                        );
                    }
                    Err(err) => warn!("Cannot create local player: {}", err),
                }
                drop(dim);

                info!("Joined as {} at {:?}", entity_id, position);
                self.player_id = Some(entity_id);
                origins
            }
            Packet::S01LoadChunks { chunks } => {
                let mut dim = self.write_world();
                let origins: Vec<IntVec3> = chunks.iter().map(|c| c.origin()).collect();
                for chunk in chunks {
                    dim.insert_chunk(chunk);
                }
                origins
            }
            Packet::S02UnloadChunks { origins } => {
                let mut dim = self.write_world();
                for origin in origins {
                    dim.remove_chunk(&origin, |chunk| hook.chunk_removed(chunk.origin()));
                }
                Vec::new()
            }
            Packet::S03BlockUpdate { position, block } => {
                if !self.write_world().set_block_at(position, &block) {
                    debug!("Block update for unloaded chunk at {:?}", position);
                    return Vec::new();
                }
                affected_chunks(position)
            }
            Packet::S04EntityCreate {
                entity_id,
                kind,
                position,
                look,
            } => {
                let mut dim = self.write_world();
                if Some(entity_id) != self.player_id && !dim.entities.contains(&entity_id) {
                    dim.entities.spawn(
                        EntityBuilder::new(&kind)
                            .id(entity_id)
                            .position(position)
                            .look(look)
                            .lerp(),
                    );
                    if let Some(lerp) = dim.entities.lerps.get_mut(&entity_id) {
                        lerp.new_target(position, now);
                    }
                }
                Vec::new()
            }
            Packet::S05EntityDelete { entity_id } => {
                self.write_world().entities.remove(&entity_id);
                Vec::new()
            }
            Packet::S06EntityPosition {
                entity_id,
                position,
                look,
            } => {
                let mut dim = self.write_world();
                if let Some(lerp) = dim.entities.lerps.get_mut(&entity_id) {
                    lerp.new_target(position, now);
                    dim.entities.looks.insert(entity_id, look);
                }
                Vec::new()
            }
            Packet::S07KeepAlive { timestamp } => {
                trace!("Keep-alive {}", timestamp);
                Vec::new()
            }
            other => {
                debug!("Server sent client packet #{}", other.id());
                Vec::new()
            }
        }
    }

    /// Per-frame update: local physics and remote interpolation.
    pub fn frame(&mut self, delta: f32, now: Instant) {
        let mut dim = self.write_world();
        frame_system(&mut dim, delta);
        lerp_system(&mut dim.entities, now, self.lerp_delay);
    }

    /// Fixed-rate update. Returns the position report for the server once
    /// the player has joined.
    pub fn tick(&mut self) -> Option<Packet> {
        let mut dim = self.write_world();
        tick_system(&mut dim.entities);

        let id = self.player_id?;
        let position = *dim.entities.positions.get(&id)?;
        let look: LookComp = dim.entities.looks.get(&id).copied().unwrap_or_default();
        Some(Packet::C01PlayerPosition { position, look })
    }
}

/// The chunk holding `pos` plus any neighbor chunk sharing a face with it.
fn affected_chunks(pos: IntVec3) -> Vec<IntVec3> {
    let mut origins = BTreeSet::new();
    origins.insert(pos.chunk_origin());
    for offset in [
        IntVec3::new(1, 0, 0),
        IntVec3::new(-1, 0, 0),
        IntVec3::new(0, 1, 0),
        IntVec3::new(0, -1, 0),
        IntVec3::new(0, 0, 1),
        IntVec3::new(0, 0, -1),
    ] {
        origins.insert((pos + offset).chunk_origin());
    }
    origins.into_iter().collect()
}
