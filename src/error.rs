use std::io;

use thiserror::Error;

use crate::world::IntVec3;

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Failed to decompress chunk batch: {0}")]
    Decompress(#[source] io::Error),
    #[error("Chunk batch truncated")]
    Truncated,
    #[error("Chunk batch has {0} trailing bytes")]
    TrailingBytes(usize),
    #[error("Malformed chunk batch: {0}")]
    Malformed(#[source] io::Error),
    #[error("Chunk origin {0:?} is not aligned to the chunk grid")]
    UnalignedOrigin(IntVec3),
    #[error("Unsupported palette width of {0} bits")]
    InvalidPaletteBits(usize),
    #[error("Invalid palette with {0} entries")]
    InvalidPalette(usize),
    #[error("Chunk data has {actual} bytes, expected {expected}")]
    InvalidDataLength { expected: usize, actual: usize },
    #[error("Packed index {0} is outside the palette")]
    IndexOutOfPalette(usize),
}

impl From<BatchError> for io::Error {
    fn from(err: BatchError) -> Self {
        io::Error::new(io::ErrorKind::InvalidData, err)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum EntityError {
    #[error("Bounding box {0:?} must be positive on every axis")]
    InvalidBoundingBox([f32; 3]),
}

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("Malformed inventory snapshot: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Selected slot {selected} is not a hotbar slot of {slots} slots")]
    InvalidSelection { selected: usize, slots: usize },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to access config file: {0}")]
    Io(#[from] io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}
