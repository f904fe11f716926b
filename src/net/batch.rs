use std::io;

use bytes::{Buf, BytesMut};

use crate::{error::BatchError, world::Chunk};

use super::{
    buffer::{ReadBufExt, WriteBuffer},
    zlib,
};

/// Serializes chunks in order as
/// `count, (origin, bits, palette_len, palette..., data)...` and
/// zlib-compresses the whole stream.
pub fn encode_batch<'a, I>(chunks: I) -> io::Result<Vec<u8>>
where
    I: IntoIterator<Item = &'a Chunk>,
    I::IntoIter: ExactSizeIterator,
{
    let chunks = chunks.into_iter();
    let mut buf = WriteBuffer::new();
    buf.write_varint(chunks.len() as i32);

    for chunk in chunks {
        buf.write_int_vec(chunk.origin());
        buf.write_u8(chunk.bits_per_index() as u8);
        buf.write_varint(chunk.palette().len() as i32);
        for name in chunk.palette() {
            buf.write_string(name);
        }
        buf.write_byte_array(chunk.raw_data());
    }

    zlib::compress(buf.data())
}

pub fn decode_batch(data: &[u8]) -> Result<Vec<Chunk>, BatchError> {
    let mut buf = zlib::decompress(data).map_err(BatchError::Decompress)?;

    let count = read(buf.read_var_int())?;
    let mut chunks = Vec::with_capacity(count.clamp(0, 1024) as usize);
    for _ in 0..count {
        chunks.push(decode_chunk(&mut buf)?);
    }

    if buf.has_remaining() {
        return Err(BatchError::TrailingBytes(buf.remaining()));
    }
    Ok(chunks)
}

fn decode_chunk(buf: &mut BytesMut) -> Result<Chunk, BatchError> {
    let origin = read(buf.read_int_vec())?;
    let bits = read(buf.read_u8())? as usize;

    let palette_len = read(buf.read_var_int())?;
    if !(1..=1 << 16).contains(&palette_len) {
        return Err(BatchError::InvalidPalette(palette_len.max(0) as usize));
    }
    let mut palette = Vec::with_capacity(palette_len as usize);
    for _ in 0..palette_len {
        palette.push(read(buf.read_string())?);
    }

    let data = read(buf.read_byte_array())?;
    Chunk::from_raw_parts(origin, bits, palette, data)
}

fn read<T>(result: io::Result<T>) -> Result<T, BatchError> {
    result.map_err(|err| match err.kind() {
        io::ErrorKind::UnexpectedEof => BatchError::Truncated,
        _ => BatchError::Malformed(err),
    })
}
