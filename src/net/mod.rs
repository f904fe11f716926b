pub mod batch;
pub mod buffer;
pub mod codec;
pub mod proto;
mod zlib;

pub use self::codec::VoxelCodec;
pub use self::proto::{Packet, Side};
