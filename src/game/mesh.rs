use std::{
    sync::{Arc, PoisonError, RwLock},
    thread,
};

use flume::Sender;
use log::{debug, trace};

use crate::world::{BlockFace, BlockRegistry, ChunkMap, Dimension, IntVec3, AIR};

use super::ClientEvent;

#[derive(Debug, Clone, PartialEq)]
pub struct Face {
    /// World position of the block owning the face.
    pub pos: IntVec3,
    pub face: BlockFace,
    pub block: String,
}

/// Visible faces of one chunk, ready to be handed to the render layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChunkMesh {
    pub faces: Vec<Face>,
}

impl ChunkMesh {
    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }
}

/// Collects every block face of the chunk at `origin` that borders air or a
/// different transparent block. Returns `None` if the chunk is not loaded.
pub fn build_mesh(chunks: &ChunkMap, origin: IntVec3, registry: &BlockRegistry) -> Option<ChunkMesh> {
    let chunk = chunks.get_chunk(&origin)?;
    let mut mesh = ChunkMesh::default();

    for x in 0..16 {
        for y in 0..16 {
            for z in 0..16 {
                let local = IntVec3::new(x, y, z);
                let block = chunk.get_block(local);
                if block == AIR {
                    continue;
                }

                let pos = origin + local;
                for face in BlockFace::ALL {
                    let neighbor = chunks.get_block_at_optimized(pos + face.direction(), Some(chunk));
                    let visible = neighbor == AIR || (neighbor != block && registry.is_transparent(neighbor));
                    if visible {
                        mesh.faces.push(Face {
                            pos,
                            face,
                            block: block.to_string(),
                        });
                    }
                }
            }
        }
    }

    Some(mesh)
}

/// Background mesh builders. Jobs read the world under the read lock and
/// post their results to the client event queue.
pub struct MeshWorkers {
    job_tx: Sender<IntVec3>,
}

impl MeshWorkers {
    pub fn start(
        world: Arc<RwLock<Dimension>>,
        registry: Arc<BlockRegistry>,
        events: Sender<ClientEvent>,
        num_threads: usize,
    ) -> MeshWorkers {
        let (job_tx, job_rx) = flume::unbounded::<IntVec3>();

        for _ in 0..num_threads.max(1) {
            let world = world.clone();
            let registry = registry.clone();
            let rx = job_rx.clone();
            let events = events.clone();

            thread::spawn(move || {
                while let Ok(origin) = rx.recv() {
                    let mesh = {
                        let dim = world.read().unwrap_or_else(PoisonError::into_inner);
                        build_mesh(&dim.chunks, origin, &registry)
                    };
                    let mesh = match mesh {
                        Some(mesh) => mesh,
                        None => {
                            trace!("Chunk {:?} vanished before meshing", origin);
                            continue;
                        }
                    };
                    if events.send(ClientEvent::MeshReady { origin, mesh }).is_err() {
                        break;
                    }
                }
                debug!("Mesh worker stopped");
            });
        }

        MeshWorkers { job_tx }
    }

    pub fn request(&self, origin: IntVec3) {
        if self.job_tx.send(origin).is_err() {
            debug!("Mesh workers are gone, dropping job for {:?}", origin);
        }
    }
}
