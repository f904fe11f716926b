use std::{
    net::SocketAddr,
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use dashmap::DashSet;
use futures::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use log::{debug, info, trace, warn};
use tokio::{
    io,
    net::TcpStream,
    select,
    sync::{mpsc, oneshot},
    time::{self, Instant},
};
use tokio_util::codec::Framed;

use crate::{
    entity::{Component, EntityBuilder, LookComp},
    interest::{required_columns, InterestState},
    model::Player,
    net::{Packet, Side, VoxelCodec},
    server::{Audience, ServerHandler},
    world::{is_solid, BlockFace, ChunkPos, IntVec3, Vec3f, AIR},
};

pub const PLAYER_KIND: &str = "mc:player";

type PacketSink = SplitSink<Framed<TcpStream, VoxelCodec>, Packet>;
type PacketStream = SplitStream<Framed<TcpStream, VoxelCodec>>;

/// Server-side state of one connection. The handler itself runs the
/// inbound side; outbound packets go through a bounded queue drained by a
/// separate writer task. The writer first flushes the join backlog, so
/// `Play` always precedes any broadcast.
pub struct ClientHandler {
    server: Arc<ServerHandler>,
    peer: SocketAddr,
    outbound_tx: mpsc::Sender<Packet>,
    backlog_tx: Option<oneshot::Sender<Vec<Packet>>>,
    player: Option<Player>,
    interest: InterestState,
    loaded: Arc<DashSet<IntVec3>>,
}

impl ClientHandler {
    pub async fn run(server: Arc<ServerHandler>, socket: TcpStream, peer: SocketAddr) {
        let (sink, stream) = Framed::new(socket, VoxelCodec::new(Side::Server)).split();
        let (outbound_tx, outbound_rx) = mpsc::channel::<Packet>(server.config.outbound_capacity.max(1));

        let (backlog_tx, backlog_rx) = oneshot::channel::<Vec<Packet>>();

        let keep_alive = Duration::from_secs(server.config.keep_alive_secs.max(1));
        tokio::spawn(run_writer(sink, backlog_rx, outbound_rx, keep_alive, peer));

        let mut handler = ClientHandler {
            server,
            peer,
            outbound_tx,
            backlog_tx: Some(backlog_tx),
            player: None,
            interest: InterestState::new(),
            loaded: Arc::new(DashSet::new()),
        };
        handler.loop_until_disconnect(stream).await;
    }

    async fn loop_until_disconnect(&mut self, mut stream: PacketStream) {
        while let Some(packet_in) = stream.next().await {
            match packet_in {
                Ok(packet) => {
                    if let Err(err) = self.handle_packet(packet).await {
                        warn!("Handling packet from {} failed: {}", self.peer, err);
                        break;
                    }
                }
                Err(err) => {
                    warn!("Client {} receive failed: {}", self.peer, err);
                    break;
                }
            }
        }

        self.disconnect().await;
    }

    async fn handle_packet(&mut self, packet: Packet) -> io::Result<()> {
        trace!("Received {:?}", packet.id());

        if self.player.is_none() {
            return match packet {
                Packet::C00Join { username } => self.join(username).await,
                _ => {
                    debug!("Ignoring packet #{} from {} before join", packet.id(), self.peer);
                    Ok(())
                }
            };
        }

        match packet {
            Packet::C00Join { .. } => {
                debug!("{} tried to join twice", self.peer);
            }
            Packet::C01PlayerPosition { position, look } => {
                if !position.is_in_world() || !look.is_finite() {
                    return Err(invalid_data(format!("Position {:?} is outside the world", position)));
                }
                self.move_player(position, look).await?;
            }
            Packet::C02BlockDig { position, .. } => {
                if !position.is_in_world() {
                    return Err(invalid_data(format!("Block {:?} is outside the world", position)));
                }
                self.dig_block(position).await?;
            }
            Packet::C03BlockInteraction { position, hit } => {
                if !position.is_in_world() || !hit.is_finite() {
                    return Err(invalid_data(format!("Block {:?} is outside the world", position)));
                }
                self.place_block(position, hit).await?;
            }
            Packet::C04HeldItem { slot } => {
                if let Some(player) = self.player.as_mut() {
                    if !player.inventory.select(slot as usize) {
                        debug!("{} selected invalid slot {}", player.username, slot);
                    }
                }
            }
            _ => {
                trace!("Received unhandled packet: {:?}", packet.id());
            }
        }

        Ok(())
    }

    async fn join(&mut self, username: String) -> io::Result<()> {
        let [x, y, z] = self.server.config.spawn;
        let player = Player::new(&username, Vec3f::new(x, y, z));
        let entity_id = player.entity_id;

        let column = player.chunk_pos();
        let radius = self.server.config.load_radius();
        self.server.ensure_columns(required_columns(column, radius)).await?;
        let diff = self.interest.update(column, radius).unwrap_or_default();
        for origin in &diff.load {
            self.loaded.insert(*origin);
        }
        let chunks = self.server.collect_chunks(&diff.load);

        let inventory = player
            .inventory
            .snapshot()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

        let backlog_tx = self
            .backlog_tx
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "Join backlog already sent"))?;
        let (position, look) = (player.position, player.look);

        // Snapshot, spawn and registration happen under one lock, so every
        // later entity change is either in the snapshot or routed to us.
        let handed_over = {
            let mut dim = self.server.write_world();
            let mut backlog = vec![Packet::S00Play {
                entity_id,
                position,
                look,
                chunks,
                inventory,
            }];
            backlog.extend(
                dim.entities
                    .query(&[Component::Position])
                    .into_iter()
                    .map(|id| Packet::S04EntityCreate {
                        entity_id: id,
                        kind: dim.entities.kind(&id).unwrap_or_default().to_string(),
                        position: dim.entities.positions[&id],
                        look: dim.entities.looks.get(&id).copied().unwrap_or_default(),
                    }),
            );
            dim.entities.spawn(
                EntityBuilder::new(PLAYER_KIND)
                    .id(entity_id)
                    .position(position)
                    .look(look),
            );
            self.server
                .add_client(entity_id, self.outbound_tx.clone(), self.loaded.clone());
            backlog_tx.send(backlog).is_ok()
        };
        self.player = Some(player);

        if !handed_over {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "Client writer has stopped"));
        }
        self.server
            .send_broadcast(
                Audience::AllExcept(entity_id),
                Packet::S04EntityCreate {
                    entity_id,
                    kind: PLAYER_KIND.to_string(),
                    position,
                    look,
                },
            )
            .await?;

        info!("{} joined with entity id {}", username, entity_id);
        Ok(())
    }

    async fn move_player(&mut self, position: Vec3f, look: LookComp) -> io::Result<()> {
        let entity_id = match self.player.as_mut() {
            Some(player) => {
                player.position = position;
                player.look = look;
                player.entity_id
            }
            None => return Ok(()),
        };

        {
            let mut dim = self.server.write_world();
            if let Some(pos) = dim.entities.positions.get_mut(&entity_id) {
                *pos = position;
            }
            dim.entities.looks.insert(entity_id, look);
        }

        self.update_chunks(ChunkPos::from_position(position)).await?;
        self.server
            .send_broadcast(
                Audience::AllExcept(entity_id),
                Packet::S06EntityPosition {
                    entity_id,
                    position,
                    look,
                },
            )
            .await
    }

    async fn update_chunks(&mut self, center: ChunkPos) -> io::Result<()> {
        if self.interest.column() == Some(center) {
            return Ok(());
        }

        let radius = self.server.config.load_radius();
        self.server.ensure_columns(required_columns(center, radius)).await?;
        let diff = match self.interest.update(center, radius) {
            Some(diff) => diff,
            None => return Ok(()),
        };
        debug!(
            "{} entered column {:?}: loading {}, unloading {}",
            self.peer,
            center,
            diff.load.len(),
            diff.unload.len()
        );

        for origin in &diff.load {
            self.loaded.insert(*origin);
        }
        for origin in &diff.unload {
            self.loaded.remove(origin);
        }

        if !diff.load.is_empty() {
            let chunks = self.server.collect_chunks(&diff.load);
            self.send_packet(Packet::S01LoadChunks { chunks }).await?;
        }
        if !diff.unload.is_empty() {
            self.send_packet(Packet::S02UnloadChunks {
                origins: diff.unload,
            })
            .await?;
        }
        Ok(())
    }

    async fn dig_block(&mut self, position: IntVec3) -> io::Result<()> {
        let changed = {
            let mut dim = self.server.write_world();
            is_solid(dim.get_block_at(position)) && dim.set_block_at(position, AIR)
        };

        if changed {
            self.change_block(position, AIR).await?;
        }
        Ok(())
    }

    async fn place_block(&mut self, position: IntVec3, hit: Vec3f) -> io::Result<()> {
        let target = position.offset(BlockFace::from_subvoxel(hit));
        let (item, blocked) = match self.player.as_ref() {
            Some(player) => {
                let held = player.inventory.held();
                if !held.is_present() || !self.server.registry.contains(&held.item) {
                    return Ok(());
                }
                (held.item.clone(), player.intersects_block(target))
            }
            None => return Ok(()),
        };

        if blocked {
            // Resync the requester, it may have predicted the placement
            let current = self.server.read_world().get_block_at(target).to_string();
            debug!("Rejected placement at {:?} inside the player", target);
            return self
                .send_packet(Packet::S03BlockUpdate {
                    position: target,
                    block: current,
                })
                .await;
        }

        let placed = {
            let mut dim = self.server.write_world();
            is_solid(dim.get_block_at(position))
                && !is_solid(dim.get_block_at(target))
                && dim.set_block_at(target, &item)
        };

        if placed {
            if let Some(player) = self.player.as_mut() {
                player.inventory.held_mut().take_one();
            }
            self.change_block(target, &item).await?;
        }
        Ok(())
    }

    async fn change_block(&self, position: IntVec3, block: &str) -> io::Result<()> {
        self.server
            .send_broadcast(
                Audience::Watching(position.chunk_origin()),
                Packet::S03BlockUpdate {
                    position,
                    block: block.to_string(),
                },
            )
            .await
    }

    async fn send_packet(&self, packet: Packet) -> io::Result<()> {
        self.outbound_tx
            .send(packet)
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "Client writer has stopped"))
    }

    async fn disconnect(&mut self) {
        let player = match self.player.take() {
            Some(player) => player,
            None => {
                debug!("Connection with {} closed before join", self.peer);
                return;
            }
        };

        self.server.remove_client(&player.entity_id);
        self.server.write_world().entities.remove(&player.entity_id);

        let result = self
            .server
            .send_broadcast(
                Audience::AllExcept(player.entity_id),
                Packet::S05EntityDelete {
                    entity_id: player.entity_id,
                },
            )
            .await;
        if let Err(err) = result {
            warn!("Failed to announce leave of {}: {}", player.username, err);
        }
        info!("{} left the game", player.username);
    }
}

async fn run_writer(
    mut sink: PacketSink,
    backlog_rx: oneshot::Receiver<Vec<Packet>>,
    mut outbound_rx: mpsc::Receiver<Packet>,
    keep_alive: Duration,
    peer: SocketAddr,
) {
    // Nothing is written before the join completes
    let backlog = match backlog_rx.await {
        Ok(backlog) => backlog,
        Err(_) => Vec::new(),
    };
    for packet in backlog {
        if let Err(err) = sink.feed(packet).await {
            warn!("Client {} send failed: {}", peer, err);
            return;
        }
    }
    if let Err(err) = sink.flush().await {
        warn!("Client {} send failed: {}", peer, err);
        return;
    }

    let mut keep_alive_interval = time::interval_at(Instant::now() + keep_alive, keep_alive);

    loop {
        select! {
            packet_out = outbound_rx.recv() => {
                let packet = match packet_out {
                    Some(packet) => packet,
                    None => break,
                };
                if let Err(err) = sink.send(packet).await {
                    warn!("Client {} send failed: {}", peer, err);
                    break;
                }
            }
            _ = keep_alive_interval.tick() => {
                if let Err(err) = sink.send(Packet::S07KeepAlive { timestamp: unix_millis() }).await {
                    warn!("Client {} keep-alive failed: {}", peer, err);
                    break;
                }
            }
        }
    }

    if let Err(err) = sink.close().await {
        debug!("Closing connection with {} failed: {}", peer, err);
    }
}

fn invalid_data(message: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message)
}

fn unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
