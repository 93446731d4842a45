//! Text renderings of decoded records.

use crate::error::Error;
use crate::log::AppendLog;
use crate::platform::BlockDevice;
use crate::record::{Channel, EncoderBlock, ImuBlock, LogRecord};
use core::fmt::Write;

/// Output format of [`dump`].
#[derive(strum::Display, strum::EnumString, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Format {
    #[default]
    Text,
    Csv,
}

const LABEL_WIDTH: usize = 12;

/// Multi-line description of one record.
///
/// ```text
/// Sample 0:
///   Encoder:    ts=12345 enc1=100 enc2=-50
///   IMU ts:     12400
///   Accel:      1.00 2.00 -9.81
///   ...
///   Temp:       25.00 C
/// ```
pub fn write_human<W: Write>(out: &mut W, index: usize, record: &LogRecord) -> Result<(), Error> {
    writeln!(out, "Sample {index}:")?;

    if let Some(EncoderBlock {
        timestamp,
        enc1,
        enc2,
    }) = record.encoder
    {
        write_label(out, "Encoder")?;
        writeln!(out, "ts={timestamp} enc1={enc1} enc2={enc2}")?;
    }

    if let Some(imu) = &record.imu {
        write_label(out, "IMU ts")?;
        writeln!(out, "{}", imu.timestamp)?;

        for channel in Channel::FIELD_ORDER {
            write_label(out, channel.into())?;
            let precision = channel.precision();
            for (i, &raw) in imu.channel(channel).iter().enumerate() {
                if i > 0 {
                    out.write_char(' ')?;
                }
                write!(out, "{:.precision$}", channel.to_physical(raw))?;
            }
            if channel == Channel::Temperature {
                out.write_str(" C")?;
            }
            out.write_char('\n')?;
        }
    }

    Ok(())
}

fn write_label<W: Write>(out: &mut W, label: &str) -> Result<(), Error> {
    write!(out, "  {label}:")?;
    for _ in label.len() + 1..LABEL_WIDTH {
        out.write_char(' ')?;
    }
    Ok(())
}

pub fn write_csv_header<W: Write>(out: &mut W) -> Result<(), Error> {
    out.write_str("index,enc_ts,enc1,enc2,imu_ts")?;
    for channel in Channel::FIELD_ORDER {
        for axis in channel.axes() {
            if axis.is_empty() {
                write!(out, ",{}", channel.column())?;
            } else {
                write!(out, ",{}_{axis}", channel.column())?;
            }
        }
    }
    out.write_char('\n')?;
    Ok(())
}

/// One CSV line in the column order of [`write_csv_header`]. Cells of absent blocks stay empty.
pub fn write_csv_row<W: Write>(out: &mut W, index: usize, record: &LogRecord) -> Result<(), Error> {
    write!(out, "{index}")?;

    match record.encoder {
        Some(encoder) => write!(out, ",{},{},{}", encoder.timestamp, encoder.enc1, encoder.enc2)?,
        None => out.write_str(",,,")?,
    }

    match &record.imu {
        Some(imu) => write_csv_imu(out, imu)?,
        None => {
            out.write_char(',')?;
            for channel in Channel::FIELD_ORDER {
                for _ in 0..channel.width() {
                    out.write_char(',')?;
                }
            }
        }
    }

    out.write_char('\n')?;
    Ok(())
}

fn write_csv_imu<W: Write>(out: &mut W, imu: &ImuBlock) -> Result<(), Error> {
    write!(out, ",{}", imu.timestamp)?;
    for channel in Channel::FIELD_ORDER {
        let precision = channel.precision();
        for &raw in imu.channel(channel) {
            write!(out, ",{:.precision$}", channel.to_physical(raw))?;
        }
    }
    Ok(())
}

/// Prints every record of `log` and returns how many were printed.
///
/// A malformed record ends the dump. In text format a closing line names the address where
/// the log stopped being readable.
pub fn dump<D, W>(log: &mut AppendLog<D>, out: &mut W, format: Format) -> Result<usize, Error>
where
    D: BlockDevice,
    W: Write,
{
    if format == Format::Csv {
        write_csv_header(out)?;
    }

    let mut count = 0;
    let mut scanner = log.scan();
    while let Some(item) = scanner.next() {
        match item {
            Ok(record) => {
                match format {
                    Format::Text => write_human(out, count, &record)?,
                    Format::Csv => write_csv_row(out, count, &record)?,
                }
                count += 1;
            }
            Err(Error::TruncatedRecord | Error::InvalidFlags(_)) => {
                if format == Format::Text {
                    writeln!(out, "Log truncated at {:#08x}", scanner.position())?;
                }
                break;
            }
            Err(e) => return Err(e),
        }
    }

    if format == Format::Text {
        writeln!(out, "{count} samples")?;
    }

    Ok(count)
}
