use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use dashmap::{DashMap, DashSet};
use log::{debug, info, trace};
use tokio::{io, net::TcpListener, sync::mpsc, task};

use crate::{
    client::ClientHandler,
    config::ServerConfig,
    entity::EntityId,
    net::Packet,
    world::{gen::TerrainGenerator, BlockRegistry, Chunk, ChunkPos, Dimension, IntVec3},
};

/// Who receives a broadcast packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    AllExcept(EntityId),
    /// Clients that currently hold the chunk with this origin.
    Watching(IntVec3),
}

#[derive(Debug)]
struct Broadcast {
    audience: Audience,
    packet: Packet,
}

struct ClientEntry {
    tx: mpsc::Sender<Packet>,
    loaded: Arc<DashSet<IntVec3>>,
}

impl ClientEntry {
    fn is_in(&self, id: &EntityId, audience: Audience) -> bool {
        match audience {
            Audience::AllExcept(except) => *id != except,
            Audience::Watching(origin) => self.loaded.contains(&origin),
        }
    }
}

pub struct ServerHandler {
    pub config: Arc<ServerConfig>,
    pub world: Arc<RwLock<Dimension>>,
    pub generator: Arc<TerrainGenerator>,
    pub registry: Arc<BlockRegistry>,
    broadcast_tx: mpsc::Sender<Broadcast>,
    clients: DashMap<EntityId, ClientEntry>,
}

impl ServerHandler {
    pub fn start(
        config: Arc<ServerConfig>,
        world: Arc<RwLock<Dimension>>,
        generator: Arc<TerrainGenerator>,
        registry: Arc<BlockRegistry>,
    ) -> Arc<ServerHandler> {
        let (broadcast_tx, broadcast_rx) = mpsc::channel::<Broadcast>(config.outbound_capacity.max(1));

        let handler = Arc::new(ServerHandler {
            config,
            world,
            generator,
            registry,
            broadcast_tx,
            clients: DashMap::new(),
        });

        let h = handler.clone();
        tokio::spawn(async move {
            h.run_broker_loop(broadcast_rx).await;
        });

        handler
    }

    pub async fn bind(config: &ServerConfig) -> io::Result<TcpListener> {
        TcpListener::bind((config.address.as_str(), config.port)).await
    }

    /// Accepts connections until the listener fails.
    pub async fn listen(self: Arc<Self>, listener: TcpListener) -> io::Result<()> {
        info!("Listening on {}", listener.local_addr()?);
        loop {
            let (socket, addr) = listener.accept().await?;
            debug!("Accepted connection from {}", addr);

            let server = self.clone();
            tokio::spawn(async move {
                ClientHandler::run(server, socket, addr).await;
            });
        }
    }

    pub fn read_world(&self) -> RwLockReadGuard<'_, Dimension> {
        self.world.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write_world(&self) -> RwLockWriteGuard<'_, Dimension> {
        self.world.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_client(&self, id: EntityId, tx: mpsc::Sender<Packet>, loaded: Arc<DashSet<IntVec3>>) {
        self.clients.insert(id, ClientEntry { tx, loaded });
    }

    pub fn remove_client(&self, id: &EntityId) {
        self.clients.remove(id);
    }

    pub fn num_clients(&self) -> usize {
        self.clients.len()
    }

    pub async fn send_broadcast(&self, audience: Audience, packet: Packet) -> io::Result<()> {
        match self.broadcast_tx.send(Broadcast { audience, packet }).await {
            Ok(_) => Ok(()),
            Err(e) => Err(io::Error::new(io::ErrorKind::Other, e.to_string())),
        }
    }

    async fn run_broker_loop(&self, mut rx: mpsc::Receiver<Broadcast>) {
        while let Some(Broadcast { audience, packet }) = rx.recv().await {
            let targets: Vec<(EntityId, mpsc::Sender<Packet>)> = self
                .clients
                .iter()
                .filter(|c| c.is_in(c.key(), audience))
                .map(|c| (*c.key(), c.tx.clone()))
                .collect();

            trace!("Routing packet #{} to {} clients", packet.id(), targets.len());
            for (id, tx) in targets {
                if tx.send(packet.clone()).await.is_err() {
                    debug!("Client {} went away during broadcast", id);
                }
            }
        }
    }

    /// Generates any missing column under the writer lock, off the async
    /// runtime.
    pub async fn ensure_columns(&self, columns: Vec<ChunkPos>) -> io::Result<()> {
        let missing: Vec<ChunkPos> = {
            let dim = self.read_world();
            columns
                .into_iter()
                .filter(|c| !dim.chunks.has_chunk(&c.chunk_origin(0)))
                .collect()
        };
        if missing.is_empty() {
            return Ok(());
        }

        let world = self.world.clone();
        let generator = self.generator.clone();
        task::spawn_blocking(move || {
            let mut dim = world.write().unwrap_or_else(PoisonError::into_inner);
            for column in missing {
                generator.ensure_column(&mut dim.chunks, column);
            }
        })
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }

    /// Copies the chunks so they can be serialized without holding the lock.
    pub fn collect_chunks(&self, origins: &[IntVec3]) -> Vec<Chunk> {
        let dim = self.read_world();
        origins
            .iter()
            .filter_map(|origin| dim.chunks.get_chunk(origin).cloned())
            .collect()
    }
}
