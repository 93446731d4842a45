use thiserror::Error;

/// Errors that can occur while driving the flash or walking the log. Marked as non-exhaustive
/// to allow for future additions without breaking the API.
///
/// `BusTimeout`, `Bus` and `Flash` leave the device in an unknown state. An [`AppendLog`] that
/// sees one of them refuses further appends with `Faulted` until it is reset.
///
/// [`AppendLog`]: crate::log::AppendLog
#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Error {
    /// A program or erase did not clear the busy flag within its bound
    #[error("device busy timeout")]
    BusTimeout,

    /// The SPI transfer itself failed
    #[error("bus transfer failed")]
    Bus,

    /// The internal error value is returned from the wrapped `NorFlash` implementation
    #[error("internal flash error")]
    Flash,

    /// The accessed range is not inside the device
    #[error("address out of bounds")]
    OutOfBounds,

    /// Page programs have to start at a page aligned address
    #[error("unaligned address")]
    Unaligned,

    /// A single page program may not cross the end of the page
    #[error("page program crosses page boundary")]
    PageOverflow,

    /// The log region has to start on a sector boundary and span whole sectors of the device
    #[error("invalid log region")]
    InvalidRegion,

    /// The output buffer cannot hold the encoded record
    #[error("buffer too small")]
    BufferTooSmall,

    /// The flags byte reads as erased flash
    #[error("end of log")]
    EndOfLog,

    /// Fewer bytes are available than the flags byte announces
    #[error("truncated record")]
    TruncatedRecord,

    /// The flags byte has bits set that no block is assigned to
    #[error("invalid flags: {0:#04x}")]
    InvalidFlags(u8),

    /// The record does not fit into the remaining log region
    #[error("log full")]
    LogFull,

    /// An earlier flash failure left the device in an unknown state
    #[error("log faulted, reset required")]
    Faulted,

    /// A sensor collaborator failed during setup or sampling
    #[error("sensor error")]
    Sensor,

    /// Writing decoded output failed
    #[error("output formatting failed")]
    Format,
}

impl From<core::fmt::Error> for Error {
    fn from(_: core::fmt::Error) -> Self {
        Error::Format
    }
}

impl Error {
    /// Errors after which the device state has to be treated as unknown.
    pub fn is_device_fault(&self) -> bool {
        matches!(self, Error::BusTimeout | Error::Bus | Error::Flash)
    }
}
