use log::debug;
use noise::{NoiseFn, Seedable, SuperSimplex};

use crate::config::WorldConfig;

use super::{Chunk, ChunkMap, ChunkPos, IntVec3, CHUNK_SIZE};

/// Vertical chunks per column; the world spans y in `0..256`.
pub const SECTIONS_PER_COLUMN: i32 = 16;

/// Black-box terrain producer: a fractal noise heightmap filled with
/// stone, dirt and a grass top layer.
pub struct TerrainGenerator {
    config: WorldConfig,
    noise: SuperSimplex,
}

impl TerrainGenerator {
    pub fn new(config: WorldConfig) -> TerrainGenerator {
        debug!("Using seed {} for world generation", config.seed);

        TerrainGenerator {
            noise: SuperSimplex::new().set_seed(config.seed),
            config,
        }
    }

    /// Produces all chunks of a column, bottom to top.
    pub fn generate_column(&self, pos: ChunkPos) -> Vec<Chunk> {
        let base = pos.chunk_origin(0);

        let mut heightmap = [[0i32; 16]; 16];
        for (x, row) in heightmap.iter_mut().enumerate() {
            for (z, height) in row.iter_mut().enumerate() {
                *height = self.terrain_height(base.x + x as i32, base.z + z as i32);
            }
        }

        (0..SECTIONS_PER_COLUMN)
            .map(|section| {
                let mut chunk = Chunk::new(pos.chunk_origin(section));
                let base_y = section * CHUNK_SIZE;
                for x in 0..16 {
                    for z in 0..16 {
                        let height = heightmap[x as usize][z as usize];
                        for y in 0..16 {
                            let block = Self::determine_block(base_y + y, height);
                            chunk.set_block(IntVec3::new(x, y, z), block);
                        }
                    }
                }
                chunk
            })
            .collect()
    }

    /// Generates the column into `chunks` unless it is already present.
    pub fn ensure_column(&self, chunks: &mut ChunkMap, pos: ChunkPos) -> bool {
        if chunks.has_chunk(&pos.chunk_origin(0)) {
            return false;
        }
        for chunk in self.generate_column(pos) {
            chunks.insert_chunk(chunk);
        }
        true
    }

    fn determine_block(y: i32, height: i32) -> &'static str {
        if y < height - 3 {
            "mc:stone"
        } else if y < height {
            "mc:dirt"
        } else if y == height {
            "mc:grass"
        } else {
            ""
        }
    }

    pub fn terrain_height(&self, x: i32, z: i32) -> i32 {
        let noise_val = self.sample_noise_fractal(x, z);
        let height = (noise_val * self.config.amplitude) as i32 + self.config.base_height;
        height.clamp(1, SECTIONS_PER_COLUMN * CHUNK_SIZE - 1)
    }

    fn sample_noise_fractal(&self, x: i32, z: i32) -> f64 {
        let mut result = 0.0;
        let mut denom = 0.0;
        let mut scale = self.config.scale;

        let mut amplitude = 1.0;
        for _ in 0..self.config.octaves {
            result += amplitude * self.noise.get([x as f64 * scale, z as f64 * scale]);
            denom += amplitude;

            scale *= self.config.lacunarity;
            amplitude *= self.config.falloff;
        }

        if denom == 0.0 {
            0.0
        } else {
            result / denom
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::AIR;

    #[test]
    fn column_is_layered() {
        let gen = TerrainGenerator::new(WorldConfig::default());
        let pos = ChunkPos::new(-2, 3);
        let chunks = gen.generate_column(pos);
        assert_eq!(chunks.len(), SECTIONS_PER_COLUMN as usize);

        let mut map = ChunkMap::new();
        for chunk in chunks {
            map.insert_chunk(chunk);
        }

        let (x, z) = (-32 + 5, 48 + 9);
        let height = gen.terrain_height(x, z);
        assert_eq!(map.get_block_at(IntVec3::new(x, height, z)), "mc:grass");
        assert_eq!(map.get_block_at(IntVec3::new(x, height - 1, z)), "mc:dirt");
        assert_eq!(map.get_block_at(IntVec3::new(x, height - 4, z)), "mc:stone");
        assert_eq!(map.get_block_at(IntVec3::new(x, height + 1, z)), AIR);
    }

    #[test]
    fn generation_is_deterministic() {
        let a = TerrainGenerator::new(WorldConfig::default());
        let b = TerrainGenerator::new(WorldConfig::default());
        assert_eq!(a.generate_column(ChunkPos::new(1, 1)), b.generate_column(ChunkPos::new(1, 1)));
    }

    #[test]
    fn ensure_column_only_generates_once() {
        let gen = TerrainGenerator::new(WorldConfig::default());
        let mut map = ChunkMap::new();
        assert!(gen.ensure_column(&mut map, ChunkPos::new(0, 0)));
        assert!(!gen.ensure_column(&mut map, ChunkPos::new(0, 0)));
        assert_eq!(map.len(), SECTIONS_PER_COLUMN as usize);
    }
}
