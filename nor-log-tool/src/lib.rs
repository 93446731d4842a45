//! Host side decoding of `nor-logger` flash images.

pub mod error;
pub mod image;

use std::fmt;
use std::io;

use nor_logger::print::{self, Format};
use nor_logger::{AppendLog, Geometry};

pub use error::Error;
pub use image::FlashImage;

/// Resolves the log region inside an image of `image_len` bytes. The region starts at `base`
/// (default 0) and spans `size` bytes (default: up to the end of the image).
pub fn region(image_len: usize, base: Option<u32>, size: Option<u32>) -> Result<Geometry, Error> {
    let base = base.unwrap_or(0);
    let size = match size {
        Some(size) => size,
        None => (image_len as u64).saturating_sub(base as u64) as u32,
    };

    if base as u64 + size as u64 > image_len as u64 {
        return Err(Error::RegionOutsideImage {
            base,
            size,
            image: image_len,
        });
    }

    Ok(Geometry::new(base, size)?)
}

/// Writes every record of the log in `geometry` to `out`, returns the number of records.
pub fn dump_image<W: io::Write>(
    image: &mut FlashImage,
    geometry: Geometry,
    format: Format,
    out: &mut W,
) -> Result<usize, Error> {
    let mut log = AppendLog::new(image, geometry)?;

    let mut adapter = IoAdapter { out, error: None };
    match print::dump(&mut log, &mut adapter, format) {
        Ok(count) => Ok(count),
        Err(e) => Err(adapter.error.take().map_or(e.into(), Error::IoError)),
    }
}

/// Forwards formatted text to an [`io::Write`], keeping the I/O error that `fmt::Error` drops.
struct IoAdapter<'a, W> {
    out: &'a mut W,
    error: Option<io::Error>,
}

impl<W: io::Write> fmt::Write for IoAdapter<'_, W> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.out.write_all(s.as_bytes()).map_err(|e| {
            self.error = Some(e);
            fmt::Error
        })
    }
}

/// Summary of a stored log.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LogStats {
    pub records: usize,
    pub encoder_blocks: usize,
    pub imu_blocks: usize,
    /// Bytes from the region start to the end of the last readable record
    pub bytes_used: usize,
    pub region_size: usize,
    pub first_timestamp: Option<u32>,
    pub last_timestamp: Option<u32>,
    /// Address of a malformed record that ended the scan early
    pub truncated_at: Option<u32>,
}

impl fmt::Display for LogStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Records:    {} ({} encoder, {} imu)",
            self.records, self.encoder_blocks, self.imu_blocks
        )?;
        writeln!(
            f,
            "Used:       {} of {} bytes",
            self.bytes_used, self.region_size
        )?;
        match (self.first_timestamp, self.last_timestamp) {
            (Some(first), Some(last)) => writeln!(f, "Timestamps: {first} .. {last}")?,
            _ => writeln!(f, "Timestamps: -")?,
        }
        if let Some(address) = self.truncated_at {
            writeln!(f, "Truncated at {address:#08x}")?;
        }
        Ok(())
    }
}

/// Walks the log in `geometry` and collects a [`LogStats`].
pub fn stats(image: &mut FlashImage, geometry: Geometry) -> Result<LogStats, Error> {
    let mut log = AppendLog::new(image, geometry)?;
    let mut stats = LogStats {
        region_size: geometry.size() as usize,
        ..Default::default()
    };

    let mut scanner = log.scan();
    while let Some(item) = scanner.next() {
        match item {
            Ok(record) => {
                stats.records += 1;
                stats.encoder_blocks += record.encoder.is_some() as usize;
                stats.imu_blocks += record.imu.is_some() as usize;
                if let Some(timestamp) = record.timestamp() {
                    stats.first_timestamp.get_or_insert(timestamp);
                    stats.last_timestamp = Some(timestamp);
                }
            }
            Err(nor_logger::Error::TruncatedRecord | nor_logger::Error::InvalidFlags(_)) => {
                stats.truncated_at = Some(scanner.position());
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }
    stats.bytes_used = (scanner.position() - geometry.base()) as usize;

    Ok(stats)
}
