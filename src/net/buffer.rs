use std::io;

use bytes::{Buf, BytesMut};
use uuid::Uuid;

use crate::{
    entity::LookComp,
    world::{IntVec3, Vec3f},
};

/// Big-endian payload writer. Strings and byte arrays are prefixed with
/// their length as a varint.
#[derive(Debug, Default)]
pub struct WriteBuffer {
    buf: Vec<u8>,
}

impl WriteBuffer {
    pub fn new() -> WriteBuffer {
        WriteBuffer { buf: Vec::new() }
    }

    pub fn write_varint(&mut self, value: i32) {
        let mut value = value as u32;
        loop {
            let mut cur_byte = (value & 0x7f) as u8;
            value >>= 7;
            if value != 0 {
                cur_byte |= 0x80;
            }
            self.buf.push(cur_byte);
            if value == 0 {
                break;
            }
        }
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_i32(&mut self, value: i32) {
        self.write_bytes(&value.to_be_bytes());
    }

    pub fn write_i64(&mut self, value: i64) {
        self.write_bytes(&value.to_be_bytes());
    }

    pub fn write_f32(&mut self, value: f32) {
        self.write_bytes(&value.to_be_bytes());
    }

    pub fn write_string(&mut self, value: &str) {
        self.write_byte_array(value.as_bytes());
    }

    pub fn write_byte_array(&mut self, value: &[u8]) {
        self.write_varint(value.len() as i32);
        self.write_bytes(value);
    }

    pub fn write_uuid(&mut self, value: Uuid) {
        self.write_bytes(value.as_bytes());
    }

    pub fn write_int_vec(&mut self, value: IntVec3) {
        self.write_i32(value.x);
        self.write_i32(value.y);
        self.write_i32(value.z);
    }

    pub fn write_vec(&mut self, value: Vec3f) {
        self.write_f32(value.x);
        self.write_f32(value.y);
        self.write_f32(value.z);
    }

    pub fn write_look(&mut self, value: LookComp) {
        self.write_f32(value.yaw);
        self.write_f32(value.azimuth);
        self.write_f32(value.elevation());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn data(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

fn eof() -> io::Error {
    io::Error::new(io::ErrorKind::UnexpectedEof, "payload ended early")
}

fn invalid(msg: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.to_string())
}

/// Checked reads matching `WriteBuffer`. Running out of bytes is an
/// `UnexpectedEof` error instead of a panic.
pub trait ReadBufExt {
    fn has_complete_var_int(&self) -> bool;
    fn read_var_int(&mut self) -> io::Result<i32>;
    fn read_u8(&mut self) -> io::Result<u8>;
    fn read_i32(&mut self) -> io::Result<i32>;
    fn read_i64(&mut self) -> io::Result<i64>;
    fn read_f32(&mut self) -> io::Result<f32>;
    fn read_byte_array(&mut self) -> io::Result<Vec<u8>>;
    fn read_string(&mut self) -> io::Result<String>;
    fn read_uuid(&mut self) -> io::Result<Uuid>;
    fn read_int_vec(&mut self) -> io::Result<IntVec3>;
    fn read_vec(&mut self) -> io::Result<Vec3f>;
    fn read_look(&mut self) -> io::Result<LookComp>;
}

impl ReadBufExt for BytesMut {
    fn has_complete_var_int(&self) -> bool {
        self.iter().take(5).any(|byte| byte & 0x80 == 0)
    }

    fn read_var_int(&mut self) -> io::Result<i32> {
        let mut result = 0u32;
        for i in 0..5 {
            if !self.has_remaining() {
                return Err(eof());
            }
            let byte = self.get_u8();
            result |= ((byte & 0x7f) as u32) << (i * 7);

            if byte & 0x80 == 0 {
                return Ok(result as i32);
            }
        }
        Err(invalid("VarInt too long"))
    }

    fn read_u8(&mut self) -> io::Result<u8> {
        if self.remaining() < 1 {
            return Err(eof());
        }
        Ok(self.get_u8())
    }

    fn read_i32(&mut self) -> io::Result<i32> {
        if self.remaining() < 4 {
            return Err(eof());
        }
        Ok(self.get_i32())
    }

    fn read_i64(&mut self) -> io::Result<i64> {
        if self.remaining() < 8 {
            return Err(eof());
        }
        Ok(self.get_i64())
    }

    fn read_f32(&mut self) -> io::Result<f32> {
        if self.remaining() < 4 {
            return Err(eof());
        }
        Ok(self.get_f32())
    }

    fn read_byte_array(&mut self) -> io::Result<Vec<u8>> {
        let len = self.read_var_int()?;
        if len < 0 {
            return Err(invalid("negative length"));
        }
        let len = len as usize;
        if self.remaining() < len {
            return Err(eof());
        }
        Ok(self.split_to(len).to_vec())
    }

    fn read_string(&mut self) -> io::Result<String> {
        let data = self.read_byte_array()?;
        String::from_utf8(data).map_err(|_| invalid("invalid string received"))
    }

    fn read_uuid(&mut self) -> io::Result<Uuid> {
        if self.remaining() < 16 {
            return Err(eof());
        }
        let mut bytes = [0u8; 16];
        self.copy_to_slice(&mut bytes);
        Ok(Uuid::from_bytes(bytes))
    }

    fn read_int_vec(&mut self) -> io::Result<IntVec3> {
        Ok(IntVec3::new(self.read_i32()?, self.read_i32()?, self.read_i32()?))
    }

    fn read_vec(&mut self) -> io::Result<Vec3f> {
        Ok(Vec3f::new(self.read_f32()?, self.read_f32()?, self.read_f32()?))
    }

    fn read_look(&mut self) -> io::Result<LookComp> {
        Ok(LookComp::new(self.read_f32()?, self.read_f32()?, self.read_f32()?))
    }
}
