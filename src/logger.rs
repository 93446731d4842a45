use crate::error::Error;
use crate::log::AppendLog;
use crate::platform::BlockDevice;
use crate::print::{self, Format};
use crate::record::{EncoderBlock, ImuBlock, LogRecord};
use crate::sensor::SensorInit;
use core::cell::Cell;
use core::fmt;
#[cfg(feature = "defmt")]
use defmt::{trace, warn};
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::RawMutex;

/// Most recent sample of every source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Snapshot {
    pub encoder: Option<EncoderBlock>,
    pub imu: Option<ImuBlock>,
}

/// Snapshot written by the sampling contexts and copied out by the logging context. The lock
/// is held only for the copy, never while encoding or talking to the flash.
pub struct SharedSnapshot<M: RawMutex> {
    inner: Mutex<M, Cell<Snapshot>>,
}

impl<M: RawMutex> SharedSnapshot<M> {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(Cell::new(Snapshot {
                encoder: None,
                imu: None,
            })),
        }
    }

    pub fn update_encoder(&self, block: EncoderBlock) {
        self.inner.lock(|cell| {
            let mut snapshot = cell.get();
            snapshot.encoder = Some(block);
            cell.set(snapshot);
        });
    }

    pub fn update_imu(&self, block: ImuBlock) {
        self.inner.lock(|cell| {
            let mut snapshot = cell.get();
            snapshot.imu = Some(block);
            cell.set(snapshot);
        });
    }

    /// Copy of the current contents.
    pub fn take(&self) -> Snapshot {
        self.inner.lock(Cell::get)
    }
}

impl<M: RawMutex> Default for SharedSnapshot<M> {
    fn default() -> Self {
        Self::new()
    }
}

/// Operator commands, usually read line by line from a serial console.
#[derive(strum::Display, strum::EnumString, Debug, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    Start,
    Erase,
    Dump,
    Stop,
}

impl Command {
    /// Parses a console line, surrounding whitespace is ignored.
    pub fn parse(line: &str) -> Option<Self> {
        line.trim().parse().ok()
    }
}

#[derive(strum::Display, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LoggerState {
    /// Waiting for `start` or `erase`
    Idle,
    /// Sensors get initialized, the log is cleared first if `erase` is set
    Setup { erase: bool },
    /// Sampling and appending
    Main,
}

/// Outcome of [`Logger::handle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Transition {
    Ignored,
    Changed(LoggerState),
    /// The caller should print the log with [`Logger::dump`]
    Dump,
}

/// Drives an [`AppendLog`] from a [`SharedSnapshot`].
///
/// Each [`tick`](Self::tick) appends one record holding only the blocks whose timestamp moved
/// since the last successful append.
pub struct Logger<D> {
    log: AppendLog<D>,
    state: LoggerState,
    last_encoder: Option<u32>,
    last_imu: Option<u32>,
}

impl<D: BlockDevice> Logger<D> {
    pub fn new(log: AppendLog<D>) -> Self {
        Self {
            log,
            state: LoggerState::Idle,
            last_encoder: None,
            last_imu: None,
        }
    }

    pub fn state(&self) -> LoggerState {
        self.state
    }

    pub fn log(&self) -> &AppendLog<D> {
        &self.log
    }

    pub fn log_mut(&mut self) -> &mut AppendLog<D> {
        &mut self.log
    }

    pub fn into_inner(self) -> AppendLog<D> {
        self.log
    }

    pub fn handle(&mut self, command: Command) -> Transition {
        let next = match (self.state, command) {
            (LoggerState::Idle, Command::Start) => LoggerState::Setup { erase: false },
            (LoggerState::Idle, Command::Erase) => LoggerState::Setup { erase: true },
            (LoggerState::Idle, Command::Dump) => return Transition::Dump,
            (LoggerState::Main, Command::Stop) => LoggerState::Idle,
            _ => {
                #[cfg(feature = "defmt")]
                trace!("logger: {} ignored in {}", command, self.state);
                return Transition::Ignored;
            }
        };

        #[cfg(feature = "defmt")]
        trace!("logger: {} -> {}", self.state, next);

        #[cfg(feature = "debug-logs")]
        println!("Logger: {} -> {next}", self.state);

        self.state = next;
        Transition::Changed(next)
    }

    /// Brings up the sensors and enters `Main`. Only valid in `Setup`, returns `Ok(false)`
    /// otherwise.
    ///
    /// On failure the logger stays in `Setup` so the step can be retried.
    pub fn setup<S: SensorInit>(&mut self, sensors: &mut S) -> Result<bool, Error> {
        let LoggerState::Setup { erase } = self.state else {
            return Ok(false);
        };

        sensors.init().map_err(|_| Error::Sensor)?;
        if erase {
            self.log.reset()?;
        }

        self.last_encoder = None;
        self.last_imu = None;
        self.state = LoggerState::Main;
        Ok(true)
    }

    /// Appends the blocks of `shared` that changed since the last append.
    ///
    /// Returns the number of bytes written, `None` if nothing changed or the logger is not in
    /// `Main`.
    pub fn tick<M: RawMutex>(&mut self, shared: &SharedSnapshot<M>) -> Result<Option<usize>, Error> {
        if self.state != LoggerState::Main {
            return Ok(None);
        }

        let snapshot = shared.take();
        let record = LogRecord {
            encoder: snapshot
                .encoder
                .filter(|block| Some(block.timestamp) != self.last_encoder),
            imu: snapshot
                .imu
                .filter(|block| Some(block.timestamp) != self.last_imu),
        };

        if record.is_empty() {
            return Ok(None);
        }

        let written = match self.log.append_record(&record) {
            Ok(written) => written,
            Err(e) => {
                #[cfg(feature = "defmt")]
                warn!("logger: append failed: {}", e);
                return Err(e);
            }
        };

        if let Some(encoder) = record.encoder {
            self.last_encoder = Some(encoder.timestamp);
        }
        if let Some(imu) = record.imu {
            self.last_imu = Some(imu.timestamp);
        }

        Ok(Some(written))
    }

    /// Prints every stored record, see [`print::dump`].
    pub fn dump<W: fmt::Write>(&mut self, out: &mut W, format: Format) -> Result<usize, Error> {
        print::dump(&mut self.log, out, format)
    }
}
