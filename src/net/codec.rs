use std::io;

use bytes::{Buf, BufMut, BytesMut};
use log::trace;
use tokio_util::codec::{Decoder, Encoder};

use super::{
    batch::{decode_batch, encode_batch},
    buffer::{ReadBufExt, WriteBuffer},
    proto::{Packet, Side},
};

/// Chunk batches dominate packet sizes; a full join batch stays well below this.
const MAX_PACKET_LEN: usize = 64 * 1024 * 1024;

enum DecoderState {
    Header,
    Body(usize),
}

/// Frames packets as `varint length, varint id, payload`. A codec decodes
/// the packets the opposite side sends and encodes its own.
pub struct VoxelCodec {
    side: Side,
    decoder_state: DecoderState,
}

impl VoxelCodec {
    pub fn new(side: Side) -> VoxelCodec {
        VoxelCodec {
            side,
            decoder_state: DecoderState::Header,
        }
    }

    fn decode_client_packet(packet_id: i32, buf: &mut BytesMut) -> io::Result<Packet> {
        Ok(match packet_id {
            0x00 => Packet::C00Join {
                username: buf.read_string()?,
            },
            0x01 => Packet::C01PlayerPosition {
                position: buf.read_vec()?,
                look: buf.read_look()?,
            },
            0x02 => Packet::C02BlockDig {
                position: buf.read_int_vec()?,
                hit: buf.read_vec()?,
            },
            0x03 => Packet::C03BlockInteraction {
                position: buf.read_int_vec()?,
                hit: buf.read_vec()?,
            },
            0x04 => Packet::C04HeldItem {
                slot: buf.read_u8()?,
            },
            _ => return Err(unknown_packet(packet_id)),
        })
    }

    fn decode_server_packet(packet_id: i32, buf: &mut BytesMut) -> io::Result<Packet> {
        Ok(match packet_id {
            0x00 => Packet::S00Play {
                entity_id: buf.read_uuid()?,
                position: buf.read_vec()?,
                look: buf.read_look()?,
                chunks: decode_batch(&buf.read_byte_array()?)?,
                inventory: buf.read_string()?,
            },
            0x01 => Packet::S01LoadChunks {
                chunks: decode_batch(&buf.read_byte_array()?)?,
            },
            0x02 => {
                let count = buf.read_var_int()?;
                let mut origins = Vec::new();
                for _ in 0..count {
                    origins.push(buf.read_int_vec()?);
                }
                Packet::S02UnloadChunks { origins }
            }
            0x03 => Packet::S03BlockUpdate {
                position: buf.read_int_vec()?,
                block: buf.read_string()?,
            },
            0x04 => Packet::S04EntityCreate {
                entity_id: buf.read_uuid()?,
                kind: buf.read_string()?,
                position: buf.read_vec()?,
                look: buf.read_look()?,
            },
            0x05 => Packet::S05EntityDelete {
                entity_id: buf.read_uuid()?,
            },
            0x06 => Packet::S06EntityPosition {
                entity_id: buf.read_uuid()?,
                position: buf.read_vec()?,
                look: buf.read_look()?,
            },
            0x07 => Packet::S07KeepAlive {
                timestamp: buf.read_i64()?,
            },
            _ => return Err(unknown_packet(packet_id)),
        })
    }

    fn encode_payload(packet: &Packet, buf: &mut WriteBuffer) -> io::Result<()> {
        match packet {
            Packet::C00Join { username } => buf.write_string(username),
            Packet::C01PlayerPosition { position, look } => {
                buf.write_vec(*position);
                buf.write_look(*look);
            }
            Packet::C02BlockDig { position, hit } | Packet::C03BlockInteraction { position, hit } => {
                buf.write_int_vec(*position);
                buf.write_vec(*hit);
            }
            Packet::C04HeldItem { slot } => buf.write_u8(*slot),

            Packet::S00Play {
                entity_id,
                position,
                look,
                chunks,
                inventory,
            } => {
                buf.write_uuid(*entity_id);
                buf.write_vec(*position);
                buf.write_look(*look);
                buf.write_byte_array(&encode_batch(chunks)?);
                buf.write_string(inventory);
            }
            Packet::S01LoadChunks { chunks } => buf.write_byte_array(&encode_batch(chunks)?),
            Packet::S02UnloadChunks { origins } => {
                buf.write_varint(origins.len() as i32);
                for origin in origins {
                    buf.write_int_vec(*origin);
                }
            }
            Packet::S03BlockUpdate { position, block } => {
                buf.write_int_vec(*position);
                buf.write_string(block);
            }
            Packet::S04EntityCreate {
                entity_id,
                kind,
                position,
                look,
            } => {
                buf.write_uuid(*entity_id);
                buf.write_string(kind);
                buf.write_vec(*position);
                buf.write_look(*look);
            }
            Packet::S05EntityDelete { entity_id } => buf.write_uuid(*entity_id),
            Packet::S06EntityPosition {
                entity_id,
                position,
                look,
            } => {
                buf.write_uuid(*entity_id);
                buf.write_vec(*position);
                buf.write_look(*look);
            }
            Packet::S07KeepAlive { timestamp } => buf.write_i64(*timestamp),
        }
        Ok(())
    }
}

fn unknown_packet(packet_id: i32) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("Unknown packet id {:#04x}", packet_id),
    )
}

impl Decoder for VoxelCodec {
    type Item = Packet;

    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decoder_state {
            DecoderState::Header => {
                if !src.has_complete_var_int() {
                    if src.len() >= 5 {
                        return Err(io::Error::new(
                            io::ErrorKind::InvalidData,
                            "Malformed packet length",
                        ));
                    }
                    return Ok(None);
                }

                let packet_len = src.read_var_int()?;
                if packet_len <= 0 || packet_len as usize > MAX_PACKET_LEN {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("Packet of length {} not allowed.", packet_len),
                    ));
                }

                self.decoder_state = DecoderState::Body(packet_len as usize);
                self.decode(src)
            }
            DecoderState::Body(packet_len) => {
                if src.remaining() < packet_len {
                    src.reserve(packet_len - src.remaining());
                    return Ok(None);
                }
                self.decoder_state = DecoderState::Header;

                let mut payload = src.split_to(packet_len);
                let packet_id = payload.read_var_int()?;
                trace!("Decoding packet #{} with length {}", packet_id, packet_len);

                let packet = match self.side {
                    Side::Server => Self::decode_client_packet(packet_id, &mut payload),
                    Side::Client => Self::decode_server_packet(packet_id, &mut payload),
                }
                .map_err(|err| match err.kind() {
                    io::ErrorKind::UnexpectedEof => io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("Packet #{} is truncated", packet_id),
                    ),
                    _ => err,
                })?;

                if payload.has_remaining() {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("Packet #{} has {} trailing bytes", packet_id, payload.remaining()),
                    ));
                }
                Ok(Some(packet))
            }
        }
    }
}

impl Encoder<Packet> for VoxelCodec {
    type Error = io::Error;

    fn encode(&mut self, packet: Packet, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if packet.sender() != self.side {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{:?} cannot send packet #{}", self.side, packet.id()),
            ));
        }

        let mut body = WriteBuffer::new();
        body.write_varint(packet.id());
        Self::encode_payload(&packet, &mut body)?;

        let mut header = WriteBuffer::new();
        header.write_varint(body.len() as i32);

        dst.reserve(header.len() + body.len());
        dst.put_slice(header.data());
        dst.put_slice(body.data());
        trace!("Encoded packet #{} with length {}", packet.id(), body.len());
        Ok(())
    }
}
