pub mod mesh;
pub mod state;

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
    time::Duration,
};

use flume::Receiver;
use futures::{SinkExt, StreamExt};
use log::{debug, info, warn};
use tokio::{
    io,
    net::TcpStream,
    sync::mpsc,
    time::{self, Instant},
};
use tokio_util::codec::Framed;

use crate::{
    config::ClientConfig,
    net::{Packet, Side, VoxelCodec},
    world::{BlockRegistry, Dimension, IntVec3},
};

use self::{
    mesh::{ChunkMesh, MeshWorkers},
    state::GameState,
};

pub const FRAMES_PER_SECOND: u32 = 60;
const FRAMES_PER_TICK: u32 = 3;

/// Everything the main loop consumes, in arrival order.
#[derive(Debug)]
pub enum ClientEvent {
    Network(Packet),
    MeshReady { origin: IntVec3, mesh: ChunkMesh },
    Disconnected,
}

/// Seam to the render layer. GPU upload and drawing live behind it.
pub trait RenderHook {
    fn mesh_ready(&mut self, origin: IntVec3, mesh: &ChunkMesh);

    /// Called for every chunk leaving the world, so attached resources can
    /// be released.
    fn chunk_removed(&mut self, origin: IntVec3);
}

/// Keeps face counts instead of GPU buffers.
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    meshes: HashMap<IntVec3, usize>,
}

impl HeadlessRenderer {
    pub fn new() -> HeadlessRenderer {
        Default::default()
    }

    pub fn num_meshes(&self) -> usize {
        self.meshes.len()
    }

    pub fn num_faces(&self) -> usize {
        self.meshes.values().sum()
    }
}

impl RenderHook for HeadlessRenderer {
    fn mesh_ready(&mut self, origin: IntVec3, mesh: &ChunkMesh) {
        self.meshes.insert(origin, mesh.len());
    }

    fn chunk_removed(&mut self, origin: IntVec3) {
        self.meshes.remove(&origin);
    }
}

pub struct GameClient {
    state: GameState,
    events_rx: Receiver<ClientEvent>,
    outbound_tx: mpsc::Sender<Packet>,
    mesher: MeshWorkers,
}

impl GameClient {
    /// Connects and sends the join request. The reply arrives through the
    /// event queue like every other packet.
    pub async fn connect(
        addr: &str,
        username: &str,
        config: &ClientConfig,
        registry: Arc<BlockRegistry>,
    ) -> io::Result<GameClient> {
        let socket = TcpStream::connect(addr).await?;
        info!("Connected to {}", socket.peer_addr()?);
        let (mut sink, mut stream) = Framed::new(socket, VoxelCodec::new(Side::Client)).split();

        let (events_tx, events_rx) = flume::bounded::<ClientEvent>(config.event_capacity.max(1));
        let (outbound_tx, mut outbound_rx) = mpsc::channel::<Packet>(64);

        let reader_tx = events_tx.clone();
        tokio::spawn(async move {
            while let Some(packet_in) = stream.next().await {
                match packet_in {
                    Ok(packet) => {
                        if reader_tx.send_async(ClientEvent::Network(packet)).await.is_err() {
                            return;
                        }
                    }
                    Err(err) => {
                        warn!("Server receive failed: {}", err);
                        break;
                    }
                }
            }
            let _ = reader_tx.send_async(ClientEvent::Disconnected).await;
        });

        tokio::spawn(async move {
            while let Some(packet) = outbound_rx.recv().await {
                if let Err(err) = sink.send(packet).await {
                    warn!("Server send failed: {}", err);
                    break;
                }
            }
            let _ = sink.close().await;
        });

        let world = Arc::new(RwLock::new(Dimension::new()));
        let mesher = MeshWorkers::start(world.clone(), registry, events_tx, config.mesh_threads);
        let state = GameState::new(world, Duration::from_millis(config.lerp_delay_ms));

        let client = GameClient {
            state,
            events_rx,
            outbound_tx,
            mesher,
        };
        client
            .send(Packet::C00Join {
                username: username.to_string(),
            })
            .await?;
        Ok(client)
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub async fn send(&self, packet: Packet) -> io::Result<()> {
        self.outbound_tx
            .send(packet)
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "Connection writer has stopped"))
    }

    /// Drains every queued event without blocking. Returns how many were
    /// handled.
    pub fn process_events(&mut self, hook: &mut dyn RenderHook) -> usize {
        let mut handled = 0;
        loop {
            let event = match self.events_rx.try_recv() {
                Ok(event) => event,
                Err(_) => break,
            };
            let now = std::time::Instant::now();
            for origin in self.state.handle_event(event, now, hook) {
                self.mesher.request(origin);
            }
            handled += 1;
        }
        handled
    }

    /// Waits for the next event, then drains the rest of the queue.
    pub async fn wait_events(&mut self, hook: &mut dyn RenderHook) -> usize {
        let event = match self.events_rx.recv_async().await {
            Ok(event) => event,
            Err(_) => return 0,
        };
        for origin in self.state.handle_event(event, std::time::Instant::now(), hook) {
            self.mesher.request(origin);
        }
        1 + self.process_events(hook)
    }

    /// Runs the frame loop until the server goes away.
    pub async fn run(mut self, hook: &mut dyn RenderHook) -> io::Result<()> {
        let frame_time = Duration::from_secs(1) / FRAMES_PER_SECOND;
        let mut frames = time::interval(frame_time);
        let mut last_frame = Instant::now();
        let mut frame_count: u64 = 0;

        while self.state.is_connected() {
            frames.tick().await;
            let now = Instant::now();
            let delta = (now - last_frame).as_secs_f32();
            last_frame = now;

            self.process_events(hook);
            self.state.frame(delta, now.into_std());

            frame_count += 1;
            if frame_count % FRAMES_PER_TICK as u64 == 0 {
                if let Some(report) = self.state.tick() {
                    self.send(report).await?;
                }
            }
            if frame_count % (FRAMES_PER_SECOND as u64 * 5) == 0 {
                debug!(
                    "Frame {}: player at {:?}, {} chunks loaded",
                    frame_count,
                    self.state.player_position(),
                    self.state.read_world().chunks.len()
                );
            }
        }

        info!("Client loop finished after {} frames", frame_count);
        Ok(())
    }
}
