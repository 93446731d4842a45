//! Interfaces to the sensors feeding the log. Register level drivers live outside this crate and
//! plug in through these traits.

use crate::error::Error;
use crate::quadrature::QuadratureCounter;
use crate::record::{Channel, EncoderBlock, ImuBlock};

/// A 9-axis IMU with fusion output, e.g. a BNO055.
pub trait ImuSource {
    type Error;

    /// Fills `out` with the raw samples of `channel`. `out` is exactly [`Channel::width`] long.
    fn read_raw(&mut self, channel: Channel, out: &mut [i16]) -> Result<(), Self::Error>;

    /// Time of the current sample in milliseconds.
    fn timestamp(&mut self) -> u32;
}

/// One time bring-up of a sensor before logging starts.
pub trait SensorInit {
    type Error;

    fn init(&mut self) -> Result<(), Self::Error>;
}

/// Reads every channel of `source` in field order. Any failing read fails the whole sample.
pub fn sample_imu<S: ImuSource>(source: &mut S) -> Result<ImuBlock, Error> {
    let mut block = ImuBlock {
        timestamp: source.timestamp(),
        ..Default::default()
    };

    for channel in Channel::FIELD_ORDER {
        source
            .read_raw(channel, block.channel_mut(channel))
            .map_err(|_| Error::Sensor)?;
    }

    Ok(block)
}

/// Snapshot of both wheel encoders. Counts outside the `i16` range wrap.
pub fn sample_encoders(
    timestamp: u32,
    left: &QuadratureCounter,
    right: &QuadratureCounter,
) -> EncoderBlock {
    EncoderBlock {
        timestamp,
        enc1: left.count() as i16,
        enc2: right.count() as i16,
    }
}
