//! On-flash layout of a log record.
//!
//! ```text
//! [flags:1]
//! [flags & 0x01: encoder timestamp:u32, enc1:i16, enc2:i16]
//! [flags & 0x02: imu timestamp:u32, accel:3, gyro:3, mag:3, euler:3, linear accel:3,
//!                gravity:3, quaternion w,x,y,z:4, temperature:1  (i16 each)]
//! ```
//!
//! All multi-byte fields are little-endian. There is no padding between fields.

use crate::error::Error;
use crate::geometry::ERASED;

pub const FLAG_ENCODER: u8 = 0x01;
pub const FLAG_IMU: u8 = 0x02;
pub const FLAGS_MASK: u8 = FLAG_ENCODER | FLAG_IMU;

/// Erased flash, marks the end of the log.
pub const SENTINEL: u8 = ERASED;

pub const FLAGS_LEN: usize = 1;
pub const TIMESTAMP_LEN: usize = 4;
pub const SAMPLE_LEN: usize = 2;

/// Number of i16 samples in an IMU block, see [`crate::record::Channel::FIELD_ORDER`].
pub const IMU_SAMPLES: usize = 6 * 3 + 4 + 1;

pub const ENCODER_BLOCK_LEN: usize = TIMESTAMP_LEN + 2 * SAMPLE_LEN;
pub const IMU_BLOCK_LEN: usize = TIMESTAMP_LEN + IMU_SAMPLES * SAMPLE_LEN;
pub const MAX_RECORD_LEN: usize = FLAGS_LEN + ENCODER_BLOCK_LEN + IMU_BLOCK_LEN;

// The sentinel must never be a legal flags value
const _: () = assert!(SENTINEL & !FLAGS_MASK != 0);
const _: () = assert!(MAX_RECORD_LEN == 59);

/// Total record length announced by `flags`, including the flags byte itself.
pub const fn record_len(flags: u8) -> usize {
    let mut len = FLAGS_LEN;
    if flags & FLAG_ENCODER != 0 {
        len += ENCODER_BLOCK_LEN;
    }
    if flags & FLAG_IMU != 0 {
        len += IMU_BLOCK_LEN;
    }
    len
}

/// Rejects the sentinel and flags with undefined bits.
pub fn check_flags(flags: u8) -> Result<u8, Error> {
    if flags == SENTINEL {
        return Err(Error::EndOfLog);
    }
    if flags & !FLAGS_MASK != 0 {
        return Err(Error::InvalidFlags(flags));
    }
    Ok(flags)
}

/// Little-endian packer over a buffer whose length was checked up front.
pub(crate) struct Packer<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> Packer<'a> {
    pub(crate) fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    fn put<const N: usize>(&mut self, bytes: [u8; N]) {
        self.buf[self.pos..self.pos + N].copy_from_slice(&bytes);
        self.pos += N;
    }

    pub(crate) fn put_u8(&mut self, value: u8) {
        self.put(value.to_le_bytes());
    }

    pub(crate) fn put_u32(&mut self, value: u32) {
        self.put(value.to_le_bytes());
    }

    pub(crate) fn put_i16(&mut self, value: i16) {
        self.put(value.to_le_bytes());
    }

    pub(crate) fn put_f32(&mut self, value: f32) {
        self.put(value.to_le_bytes());
    }

    pub(crate) fn put_i16s(&mut self, values: &[i16]) {
        for &value in values {
            self.put_i16(value);
        }
    }
}

/// Little-endian reader that never reads past the end of its slice.
pub(crate) struct Unpacker<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Unpacker<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], Error> {
        let bytes = self
            .buf
            .get(self.pos..self.pos + N)
            .ok_or(Error::TruncatedRecord)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        self.pos += N;
        Ok(out)
    }

    pub(crate) fn get_u8(&mut self) -> Result<u8, Error> {
        self.take().map(u8::from_le_bytes)
    }

    pub(crate) fn get_u32(&mut self) -> Result<u32, Error> {
        self.take().map(u32::from_le_bytes)
    }

    pub(crate) fn get_i16(&mut self) -> Result<i16, Error> {
        self.take().map(i16::from_le_bytes)
    }

    pub(crate) fn get_f32(&mut self) -> Result<f32, Error> {
        self.take().map(f32::from_le_bytes)
    }

    pub(crate) fn get_i16s(&mut self, out: &mut [i16]) -> Result<(), Error> {
        for value in out {
            *value = self.get_i16()?;
        }
        Ok(())
    }
}
