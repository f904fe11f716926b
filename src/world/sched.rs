use std::{
    collections::HashSet,
    sync::{Arc, PoisonError, RwLock},
    thread,
};

use flume::{Receiver, Sender};
use log::{debug, warn};

use super::{gen::TerrainGenerator, Chunk, ChunkPos, Dimension};

/// Worker pool producing chunk columns off the world lock. Finished columns
/// are inserted by the thread that requested them.
pub struct GenerationScheduler {
    request_tx: Sender<ChunkPos>,
    result_rx: Receiver<Vec<Chunk>>,
}

impl GenerationScheduler {
    pub fn start(generator: Arc<TerrainGenerator>, num_threads: usize) -> GenerationScheduler {
        let (request_tx, request_rx) = flume::unbounded::<ChunkPos>();
        let (result_tx, result_rx) = flume::unbounded::<Vec<Chunk>>();

        for _ in 0..num_threads.max(1) {
            let generator = generator.clone();
            let rx = request_rx.clone();
            let tx = result_tx.clone();

            thread::spawn(move || {
                while let Ok(pos) = rx.recv() {
                    if tx.send(generator.generate_column(pos)).is_err() {
                        break;
                    }
                }
            });
        }

        GenerationScheduler {
            request_tx,
            result_rx,
        }
    }

    /// Generates every missing column within `r` of `center` and inserts it
    /// into `world`. Blocks until all requested columns are in.
    pub fn pregenerate(&self, world: &RwLock<Dimension>, center: ChunkPos, r: i32) -> usize {
        let missing: HashSet<ChunkPos> = {
            let dim = world.read().unwrap_or_else(PoisonError::into_inner);
            (-r..=r)
                .flat_map(|x| (-r..=r).map(move |z| ChunkPos::new(center.x + x, center.z + z)))
                .filter(|pos| !dim.chunks.has_chunk(&pos.chunk_origin(0)))
                .collect()
        };

        for pos in &missing {
            if self.request_tx.send(*pos).is_err() {
                warn!("Generation workers are gone");
                return 0;
            }
        }

        let mut done = 0;
        while done < missing.len() {
            let column = match self.result_rx.recv() {
                Ok(column) => column,
                Err(_) => break,
            };
            let mut dim = world.write().unwrap_or_else(PoisonError::into_inner);
            for chunk in column {
                dim.insert_chunk(chunk);
            }
            done += 1;
        }

        debug!("Pregenerated {} columns around {:?}", done, center);
        done
    }
}
