use crate::error::BatchError;

use super::{block::AIR, math::IntVec3};

pub const CHUNK_VOLUME: usize = 16 * 16 * 16;

/// A 16x16x16 group of blocks. Each voxel is an index into a per-chunk
/// palette of block names, packed at 4, 8 or 16 bits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    origin: IntVec3,
    palette: Vec<String>,
    data: Vec<u8>,
    bits: usize,
}

impl Chunk {
    pub fn new(origin: IntVec3) -> Chunk {
        debug_assert_eq!(origin, origin.chunk_origin(), "unaligned chunk origin");
        Chunk {
            origin,
            palette: vec![AIR.to_string()],
            data: vec![0; CHUNK_VOLUME / 2],
            bits: 4,
        }
    }

    /// Rebuilds a chunk from its serialized parts, rejecting anything that
    /// would make `get_block` misbehave.
    pub fn from_raw_parts(
        origin: IntVec3,
        bits: usize,
        palette: Vec<String>,
        data: Vec<u8>,
    ) -> Result<Chunk, BatchError> {
        if origin != origin.chunk_origin() {
            return Err(BatchError::UnalignedOrigin(origin));
        }
        if bits != 4 && bits != 8 && bits != 16 {
            return Err(BatchError::InvalidPaletteBits(bits));
        }
        if palette.is_empty() || palette[0] != AIR || palette.len() > 1 << bits {
            return Err(BatchError::InvalidPalette(palette.len()));
        }
        let expected = CHUNK_VOLUME * bits / 8;
        if data.len() != expected {
            return Err(BatchError::InvalidDataLength {
                expected,
                actual: data.len(),
            });
        }

        let chunk = Chunk {
            origin,
            palette,
            data,
            bits,
        };
        for idx in 0..CHUNK_VOLUME {
            let palette_idx = chunk.read_index(idx);
            if palette_idx >= chunk.palette.len() {
                return Err(BatchError::IndexOutOfPalette(palette_idx));
            }
        }
        Ok(chunk)
    }

    pub fn origin(&self) -> IntVec3 {
        self.origin
    }

    pub fn bits_per_index(&self) -> usize {
        self.bits
    }

    pub fn palette(&self) -> &[String] {
        &self.palette
    }

    pub fn raw_data(&self) -> &[u8] {
        &self.data
    }

    /// Whether the world position lies inside this chunk's volume.
    pub fn contains(&self, pos: IntVec3) -> bool {
        let rel = pos - self.origin;
        (0..16).contains(&rel.x) && (0..16).contains(&rel.y) && (0..16).contains(&rel.z)
    }

    pub fn get_block(&self, local: IntVec3) -> &str {
        let idx = Self::voxel_index(local);
        &self.palette[self.read_index(idx)]
    }

    pub fn set_block(&mut self, local: IntVec3, name: &str) {
        let idx = Self::voxel_index(local);
        let palette_idx = match self.palette.iter().position(|p| p == name) {
            Some(i) => i,
            None => {
                if self.palette.len() >= 1 << self.bits {
                    self.migrate();
                }
                self.palette.push(name.to_string());
                self.palette.len() - 1
            }
        };
        self.write_index(idx, palette_idx);
    }

    fn voxel_index(local: IntVec3) -> usize {
        assert!(
            (0..16).contains(&local.x) && (0..16).contains(&local.y) && (0..16).contains(&local.z),
            "local coordinate {:?} out of chunk bounds",
            local
        );
        (local.x * 256 + local.y * 16 + local.z) as usize
    }

    fn read_index(&self, idx: usize) -> usize {
        match self.bits {
            4 => {
                let byte = self.data[idx / 2];
                if idx % 2 == 0 {
                    (byte & 0x0f) as usize
                } else {
                    (byte >> 4) as usize
                }
            }
            8 => self.data[idx] as usize,
            16 => u16::from_le_bytes([self.data[idx * 2], self.data[idx * 2 + 1]]) as usize,
            _ => unreachable!("invalid number of palette bits"),
        }
    }

    fn write_index(&mut self, idx: usize, value: usize) {
        match self.bits {
            4 => {
                let byte = &mut self.data[idx / 2];
                if idx % 2 == 0 {
                    *byte = (*byte & 0xf0) | value as u8;
                } else {
                    *byte = (*byte & 0x0f) | (value as u8) << 4;
                }
            }
            8 => self.data[idx] = value as u8,
            16 => {
                let bytes = (value as u16).to_le_bytes();
                self.data[idx * 2] = bytes[0];
                self.data[idx * 2 + 1] = bytes[1];
            }
            _ => unreachable!("invalid number of palette bits"),
        }
    }

    /// Widens every packed index to the next bit width.
    fn migrate(&mut self) {
        let next_bits = match self.bits {
            4 => 8,
            8 => 16,
            _ => panic!("palette overflow: more than 65536 block types in one chunk"),
        };

        let indices: Vec<usize> = (0..CHUNK_VOLUME).map(|i| self.read_index(i)).collect();
        self.bits = next_bits;
        self.data = vec![0; CHUNK_VOLUME * next_bits / 8];
        for (i, value) in indices.into_iter().enumerate() {
            self.write_index(i, value);
        }
    }
}
