use std::io::{self, Read, Write};

use bytes::BytesMut;
use flate2::{read::ZlibDecoder, write::ZlibEncoder, Compression};

pub fn compress(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

pub fn decompress(data: &[u8]) -> io::Result<BytesMut> {
    let mut out_vec = Vec::new();
    let mut decoder = ZlibDecoder::new(data);
    decoder.read_to_end(&mut out_vec)?;
    Ok(BytesMut::from(&out_vec[..]))
}
