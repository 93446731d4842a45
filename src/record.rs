use crate::error::Error;
use crate::raw::{self, FLAG_ENCODER, FLAG_IMU, MAX_RECORD_LEN, Packer, Unpacker};
use core::ops::Deref;

pub type Vec3 = [i16; 3];
/// Quaternion components in w, x, y, z order.
pub type Quat = [i16; 4];

/// Sensor channels of an IMU block, in the order they are stored.
#[derive(strum::Display, strum::IntoStaticStr, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    Accel,
    Gyro,
    #[strum(serialize = "Magnet")]
    Mag,
    Euler,
    #[strum(serialize = "LinAccel")]
    LinearAccel,
    Gravity,
    Quaternion,
    #[strum(serialize = "Temp")]
    Temperature,
}

impl Channel {
    pub const FIELD_ORDER: [Channel; 8] = [
        Channel::Accel,
        Channel::Gyro,
        Channel::Mag,
        Channel::Euler,
        Channel::LinearAccel,
        Channel::Gravity,
        Channel::Quaternion,
        Channel::Temperature,
    ];

    /// Number of i16 samples the channel carries.
    pub const fn width(self) -> usize {
        match self {
            Channel::Quaternion => 4,
            Channel::Temperature => 1,
            _ => 3,
        }
    }

    /// Sensor LSBs per physical unit.
    pub const fn scale(self) -> f32 {
        match self {
            Channel::Gyro | Channel::Euler | Channel::Mag => 16.0,
            Channel::Accel | Channel::LinearAccel | Channel::Gravity => 100.0,
            Channel::Quaternion => 16384.0,
            Channel::Temperature => 16.0,
        }
    }

    pub fn to_physical(self, raw: i16) -> f32 {
        raw as f32 / self.scale()
    }

    /// Decimal places used when printing physical values.
    pub const fn precision(self) -> usize {
        match self {
            Channel::Quaternion => 4,
            _ => 2,
        }
    }

    /// Column prefix in CSV output.
    pub const fn column(self) -> &'static str {
        match self {
            Channel::Accel => "acc",
            Channel::Gyro => "gyr",
            Channel::Mag => "mag",
            Channel::Euler => "eul",
            Channel::LinearAccel => "lin",
            Channel::Gravity => "grav",
            Channel::Quaternion => "quat",
            Channel::Temperature => "temp",
        }
    }

    /// Axis suffixes for the channel's samples.
    pub const fn axes(self) -> &'static [&'static str] {
        match self {
            Channel::Quaternion => &["w", "x", "y", "z"],
            Channel::Temperature => &[""],
            _ => &["x", "y", "z"],
        }
    }

    fn scaled<const N: usize>(self, raw: [i16; N]) -> [f32; N] {
        raw.map(|value| self.to_physical(value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EncoderBlock {
    pub timestamp: u32,
    pub enc1: i16,
    pub enc2: i16,
}

/// Raw BNO055 readings plus temperature, all in sensor LSBs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ImuBlock {
    pub timestamp: u32,
    pub accel: Vec3,
    pub gyro: Vec3,
    pub mag: Vec3,
    pub euler: Vec3,
    pub linear_accel: Vec3,
    pub gravity: Vec3,
    pub quaternion: Quat,
    pub temperature: i16,
}

impl ImuBlock {
    pub fn channel(&self, channel: Channel) -> &[i16] {
        match channel {
            Channel::Accel => &self.accel,
            Channel::Gyro => &self.gyro,
            Channel::Mag => &self.mag,
            Channel::Euler => &self.euler,
            Channel::LinearAccel => &self.linear_accel,
            Channel::Gravity => &self.gravity,
            Channel::Quaternion => &self.quaternion,
            Channel::Temperature => core::slice::from_ref(&self.temperature),
        }
    }

    pub fn channel_mut(&mut self, channel: Channel) -> &mut [i16] {
        match channel {
            Channel::Accel => &mut self.accel,
            Channel::Gyro => &mut self.gyro,
            Channel::Mag => &mut self.mag,
            Channel::Euler => &mut self.euler,
            Channel::LinearAccel => &mut self.linear_accel,
            Channel::Gravity => &mut self.gravity,
            Channel::Quaternion => &mut self.quaternion,
            Channel::Temperature => core::slice::from_mut(&mut self.temperature),
        }
    }
}

/// One snapshot of sensor state. A block is only present if its source produced a new sample
/// since the previous record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LogRecord {
    pub encoder: Option<EncoderBlock>,
    pub imu: Option<ImuBlock>,
}

impl LogRecord {
    pub const fn flags(&self) -> u8 {
        let mut flags = 0;
        if self.encoder.is_some() {
            flags |= FLAG_ENCODER;
        }
        if self.imu.is_some() {
            flags |= FLAG_IMU;
        }
        flags
    }

    pub const fn encoded_len(&self) -> usize {
        raw::record_len(self.flags())
    }

    pub const fn is_empty(&self) -> bool {
        self.encoder.is_none() && self.imu.is_none()
    }

    /// Latest timestamp of the present blocks.
    pub fn timestamp(&self) -> Option<u32> {
        let encoder = self.encoder.map(|block| block.timestamp);
        let imu = self.imu.map(|block| block.timestamp);
        encoder.max(imu)
    }

    /// Writes the record into `buf` and returns the number of bytes used.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
        let len = self.encoded_len();
        if buf.len() < len {
            return Err(Error::BufferTooSmall);
        }
        Ok(self.pack(&mut buf[..len]))
    }

    pub fn to_bytes(&self) -> EncodedRecord {
        let mut buf = [0u8; MAX_RECORD_LEN];
        let len = self.pack(&mut buf[..self.encoded_len()]);
        EncodedRecord { buf, len }
    }

    // `buf` is exactly `encoded_len()` bytes long
    fn pack(&self, buf: &mut [u8]) -> usize {
        let mut packer = Packer::new(buf);
        packer.put_u8(self.flags());

        if let Some(encoder) = &self.encoder {
            packer.put_u32(encoder.timestamp);
            packer.put_i16(encoder.enc1);
            packer.put_i16(encoder.enc2);
        }

        if let Some(imu) = &self.imu {
            packer.put_u32(imu.timestamp);
            for channel in Channel::FIELD_ORDER {
                packer.put_i16s(imu.channel(channel));
            }
        }

        packer.position()
    }

    /// Decodes one record from the start of `buf` and returns it with the number of bytes it
    /// occupied. Trailing bytes are ignored.
    pub fn decode(buf: &[u8]) -> Result<(Self, usize), Error> {
        let mut unpacker = Unpacker::new(buf);
        let flags = raw::check_flags(unpacker.get_u8().map_err(|_| Error::EndOfLog)?)?;
        if buf.len() < raw::record_len(flags) {
            return Err(Error::TruncatedRecord);
        }

        let mut record = LogRecord::default();

        if flags & FLAG_ENCODER != 0 {
            record.encoder = Some(EncoderBlock {
                timestamp: unpacker.get_u32()?,
                enc1: unpacker.get_i16()?,
                enc2: unpacker.get_i16()?,
            });
        }

        if flags & FLAG_IMU != 0 {
            let mut imu = ImuBlock {
                timestamp: unpacker.get_u32()?,
                ..Default::default()
            };
            for channel in Channel::FIELD_ORDER {
                unpacker.get_i16s(imu.channel_mut(channel))?;
            }
            record.imu = Some(imu);
        }

        Ok((record, unpacker.position()))
    }

    pub fn to_physical(&self) -> PhysicalRecord {
        PhysicalRecord {
            encoder: self.encoder,
            imu: self.imu.as_ref().map(PhysicalImu::from),
        }
    }
}

/// Fixed size buffer holding one encoded record.
#[derive(Clone, Copy)]
pub struct EncodedRecord {
    buf: [u8; MAX_RECORD_LEN],
    len: usize,
}

impl Deref for EncodedRecord {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

impl AsRef<[u8]> for EncodedRecord {
    fn as_ref(&self) -> &[u8] {
        self
    }
}

impl core::fmt::Debug for EncodedRecord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// An IMU block converted to physical units with [`Channel::scale`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PhysicalImu {
    pub timestamp: u32,
    pub accel: [f32; 3],
    pub gyro: [f32; 3],
    pub mag: [f32; 3],
    pub euler: [f32; 3],
    pub linear_accel: [f32; 3],
    pub gravity: [f32; 3],
    pub quaternion: [f32; 4],
    /// Degrees Celsius
    pub temperature: f32,
}

impl From<&ImuBlock> for PhysicalImu {
    fn from(raw: &ImuBlock) -> Self {
        Self {
            timestamp: raw.timestamp,
            accel: Channel::Accel.scaled(raw.accel),
            gyro: Channel::Gyro.scaled(raw.gyro),
            mag: Channel::Mag.scaled(raw.mag),
            euler: Channel::Euler.scaled(raw.euler),
            linear_accel: Channel::LinearAccel.scaled(raw.linear_accel),
            gravity: Channel::Gravity.scaled(raw.gravity),
            quaternion: Channel::Quaternion.scaled(raw.quaternion),
            temperature: Channel::Temperature.to_physical(raw.temperature),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PhysicalRecord {
    pub encoder: Option<EncoderBlock>,
    pub imu: Option<PhysicalImu>,
}
