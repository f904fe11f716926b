pub mod block;
pub mod chunk;
pub mod gen;
mod math;
pub mod sched;

use std::collections::HashMap;

pub use block::{is_solid, BlockRegistry, BlockType, AIR};
pub use chunk::Chunk;
pub use math::{
    ceil_f32, floor_div, floor_f32, floor_rem, BlockFace, ChunkPos, IntVec3, Vec3f, CHUNK_SIZE,
    WORLD_LIMIT,
};

use crate::entity::Entities;

/// Sparse map from chunk origin to chunk. Absent chunks read as air and
/// ignore writes.
#[derive(Debug, Default)]
pub struct ChunkMap {
    chunks: HashMap<IntVec3, Chunk>,
}

impl ChunkMap {
    pub fn new() -> ChunkMap {
        ChunkMap {
            chunks: HashMap::with_capacity(64),
        }
    }

    pub fn get_block_at(&self, pos: IntVec3) -> &str {
        match self.chunks.get(&pos.chunk_origin()) {
            Some(chunk) => chunk.get_block(pos.chunk_local()),
            None => AIR,
        }
    }

    /// Same result as `get_block_at`, skipping the map lookup when `guess`
    /// contains `pos`. `guess` must be a chunk of this map.
    pub fn get_block_at_optimized<'a>(&'a self, pos: IntVec3, guess: Option<&'a Chunk>) -> &'a str {
        match guess {
            Some(chunk) if chunk.contains(pos) => chunk.get_block(pos - chunk.origin()),
            _ => self.get_block_at(pos),
        }
    }

    /// Returns false if the owning chunk is not loaded.
    pub fn set_block_at(&mut self, pos: IntVec3, name: &str) -> bool {
        match self.chunks.get_mut(&pos.chunk_origin()) {
            Some(chunk) => {
                chunk.set_block(pos.chunk_local(), name);
                true
            }
            None => false,
        }
    }

    pub fn get_chunk_containing(&self, pos: IntVec3) -> Option<&Chunk> {
        self.chunks.get(&pos.chunk_origin())
    }

    pub fn get_chunk(&self, origin: &IntVec3) -> Option<&Chunk> {
        self.chunks.get(origin)
    }

    pub fn has_chunk(&self, origin: &IntVec3) -> bool {
        self.chunks.contains_key(origin)
    }

    pub fn insert_chunk(&mut self, chunk: Chunk) -> Option<Chunk> {
        self.chunks.insert(chunk.origin(), chunk)
    }

    pub fn remove_chunk(&mut self, origin: &IntVec3) -> Option<Chunk> {
        self.chunks.remove(origin)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }
}

/// A loaded world: voxels plus the entities living in it.
#[derive(Debug, Default)]
pub struct Dimension {
    pub chunks: ChunkMap,
    pub entities: Entities,
}

impl Dimension {
    pub fn new() -> Dimension {
        Dimension {
            chunks: ChunkMap::new(),
            entities: Entities::new(),
        }
    }

    pub fn get_block_at(&self, pos: IntVec3) -> &str {
        self.chunks.get_block_at(pos)
    }

    pub fn get_block_at_optimized<'a>(&'a self, pos: IntVec3, guess: Option<&'a Chunk>) -> &'a str {
        self.chunks.get_block_at_optimized(pos, guess)
    }

    pub fn set_block_at(&mut self, pos: IntVec3, name: &str) -> bool {
        self.chunks.set_block_at(pos, name)
    }

    pub fn get_chunk_containing(&self, pos: IntVec3) -> Option<&Chunk> {
        self.chunks.get_chunk_containing(pos)
    }

    pub fn insert_chunk(&mut self, chunk: Chunk) {
        self.chunks.insert_chunk(chunk);
    }

    /// Removes a chunk and hands it to `on_removed` so the caller can release
    /// whatever it attached to it.
    pub fn remove_chunk<F>(&mut self, origin: &IntVec3, on_removed: F) -> bool
    where
        F: FnOnce(Chunk),
    {
        match self.chunks.remove_chunk(origin) {
            Some(chunk) => {
                on_removed(chunk);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_dimension() -> Dimension {
        let mut dim = Dimension::new();
        for origin in [
            IntVec3::new(0, 0, 0),
            IntVec3::new(-16, 0, 0),
            IntVec3::new(0, -16, -16),
        ] {
            let mut chunk = Chunk::new(origin);
            for i in 0..16 {
                chunk.set_block(IntVec3::new(i, (i * 3) % 16, 15 - i), "mc:stone");
                chunk.set_block(IntVec3::new(15 - i, i, (i * 5) % 16), "mc:dirt");
            }
            dim.insert_chunk(chunk);
        }
        dim
    }

    #[test]
    fn missing_chunk_reads_air_and_ignores_writes() {
        let mut dim = Dimension::new();
        assert_eq!(dim.get_block_at(IntVec3::new(5, 5, 5)), AIR);
        assert!(!dim.set_block_at(IntVec3::new(5, 5, 5), "mc:stone"));
        assert!(dim.chunks.is_empty());
    }

    #[test]
    fn world_access_crosses_chunk_boundaries() {
        let mut dim = test_dimension();
        assert!(dim.set_block_at(IntVec3::new(-1, 0, 0), "mc:grass"));
        assert!(dim.set_block_at(IntVec3::new(0, 0, 0), "mc:cobblestone"));
        assert!(dim.set_block_at(IntVec3::new(3, -1, -1), "mc:glass"));

        assert_eq!(dim.get_block_at(IntVec3::new(-1, 0, 0)), "mc:grass");
        assert_eq!(dim.get_block_at(IntVec3::new(0, 0, 0)), "mc:cobblestone");
        assert_eq!(dim.get_block_at(IntVec3::new(3, -1, -1)), "mc:glass");

        let chunk = dim.get_chunk_containing(IntVec3::new(-1, 0, 0)).unwrap();
        assert_eq!(chunk.origin(), IntVec3::new(-16, 0, 0));
        assert_eq!(chunk.get_block(IntVec3::new(15, 0, 0)), "mc:grass");
    }

    #[test]
    fn optimized_lookup_matches_plain_lookup() {
        let dim = test_dimension();
        let mut guesses: Vec<Option<&Chunk>> = dim.chunks.iter().map(Some).collect();
        guesses.push(None);

        for guess in guesses {
            for x in -20..20 {
                for y in -20..20 {
                    for z in (-20..20).step_by(3) {
                        let pos = IntVec3::new(x, y, z);
                        assert_eq!(
                            dim.get_block_at_optimized(pos, guess),
                            dim.get_block_at(pos),
                            "pos {:?}",
                            pos
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn remove_chunk_runs_hook() {
        let mut dim = test_dimension();
        let mut removed = Vec::new();
        assert!(dim.remove_chunk(&IntVec3::new(-16, 0, 0), |c| removed.push(c.origin())));
        assert!(!dim.remove_chunk(&IntVec3::new(-16, 0, 0), |c| removed.push(c.origin())));
        assert_eq!(removed, vec![IntVec3::new(-16, 0, 0)]);
        assert_eq!(dim.get_block_at(IntVec3::new(-1, 0, 0)), AIR);
    }
}
