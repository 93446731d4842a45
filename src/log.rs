use crate::error::Error;
use crate::geometry::Geometry;
use crate::merge::MergeWriter;
use crate::platform::BlockDevice;
use crate::raw::{self, MAX_RECORD_LEN, SENTINEL};
use crate::record::LogRecord;
#[cfg(feature = "defmt")]
use defmt::{trace, warn};

/// Append-only sequence of log records inside a region of the flash device.
///
/// The write cursor only moves forward. The log ends at the first byte that reads as erased
/// flash, which is what [`scan`](Self::scan) and [`open`](Self::open) rely on.
pub struct AppendLog<D> {
    writer: MergeWriter<D>,
    geometry: Geometry,
    cursor: u32,
    faulted: bool,
}

impl<D: BlockDevice> AppendLog<D> {
    /// Starts a log at the beginning of the region, ignoring anything already stored there.
    pub fn new(device: D, geometry: Geometry) -> Result<Self, Error> {
        geometry.validate_for(device.capacity())?;

        Ok(Self {
            writer: MergeWriter::new(device),
            geometry,
            cursor: geometry.base(),
            faulted: false,
        })
    }

    /// Continues an existing log. The cursor is placed behind the last well formed record.
    pub fn open(device: D, geometry: Geometry) -> Result<Self, Error> {
        let mut log = Self::new(device, geometry)?;

        let mut scanner = log.scan();
        for item in scanner.by_ref() {
            match item {
                Ok(_) => {}
                Err(Error::TruncatedRecord | Error::InvalidFlags(_)) => break,
                Err(e) => return Err(e),
            }
        }
        let cursor = scanner.position();

        #[cfg(feature = "defmt")]
        trace!("open: cursor @{:#08x}", cursor);

        log.cursor = cursor;
        Ok(log)
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Absolute flash address the next record is written to.
    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    /// Bytes used by records so far.
    pub fn len(&self) -> usize {
        (self.cursor - self.geometry.base()) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.cursor == self.geometry.base()
    }

    pub fn remaining(&self) -> usize {
        (self.geometry.end() - self.cursor) as usize
    }

    pub fn is_faulted(&self) -> bool {
        self.faulted
    }

    pub fn device(&self) -> &D {
        self.writer.device()
    }

    pub fn device_mut(&mut self) -> &mut D {
        self.writer.device_mut()
    }

    pub fn into_inner(self) -> D {
        self.writer.into_inner()
    }

    /// Writes `record` at the cursor and advances the cursor by its length.
    ///
    /// A record that does not fit into the remaining region is rejected before any flash
    /// access. After a device failure every further append fails with `Faulted` until
    /// [`reset`](Self::reset) succeeds.
    pub fn append(&mut self, record: &[u8]) -> Result<(), Error> {
        if self.faulted {
            return Err(Error::Faulted);
        }
        if record.is_empty() {
            return Ok(());
        }
        if record.len() > self.remaining() {
            return Err(Error::LogFull);
        }

        #[cfg(feature = "defmt")]
        trace!("append @{:#08x}: [{}]", self.cursor, record.len());

        #[cfg(feature = "debug-logs")]
        println!("AppendLog: append @{:#08x} [{}]", self.cursor, record.len());

        match self.writer.write_fast(self.cursor, record) {
            Ok(_) => {
                self.cursor += record.len() as u32;
                Ok(())
            }
            Err(e) if e.is_device_fault() => {
                #[cfg(feature = "defmt")]
                warn!("append failed, log faulted");
                self.faulted = true;
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Encodes and appends `record`, returns the number of bytes written.
    pub fn append_record(&mut self, record: &LogRecord) -> Result<usize, Error> {
        let bytes = record.to_bytes();
        self.append(&bytes)?;
        Ok(bytes.len())
    }

    /// Iterates over the stored records starting at the beginning of the region.
    pub fn scan(&mut self) -> Scanner<'_, D> {
        Scanner {
            position: self.geometry.base(),
            end: self.geometry.end(),
            writer: &mut self.writer,
            done: false,
        }
    }

    /// Erases the whole region and moves the cursor back to its start.
    pub fn reset(&mut self) -> Result<(), Error> {
        #[cfg(feature = "defmt")]
        trace!("reset: {} sectors", self.geometry.size() as usize / crate::geometry::SECTOR_SIZE);

        let device = self.writer.device_mut();
        let result = if self.geometry.base() == 0 && self.geometry.end() as usize == device.capacity()
        {
            device.erase_all()
        } else {
            self.geometry
                .sectors()
                .try_for_each(|sector| device.erase_sector(sector))
        };

        match result {
            Ok(()) => {
                self.cursor = self.geometry.base();
                self.faulted = false;
                Ok(())
            }
            Err(e) => {
                self.faulted = true;
                Err(e)
            }
        }
    }
}

/// Lazy walk over the records of an [`AppendLog`].
///
/// Ends at the first erased flags byte or at the end of the region. A malformed record or a
/// flash error is yielded once as `Err`, after which the iterator is exhausted.
pub struct Scanner<'a, D> {
    writer: &'a mut MergeWriter<D>,
    position: u32,
    end: u32,
    done: bool,
}

impl<D: BlockDevice> Scanner<'_, D> {
    /// Address of the next record to be read. After the scan ended this is where the log ends.
    pub fn position(&self) -> u32 {
        self.position
    }

    fn read_next(&mut self) -> Result<Option<LogRecord>, Error> {
        if self.position >= self.end {
            return Ok(None);
        }

        let mut buf = [0u8; MAX_RECORD_LEN];
        self.writer.read(self.position, &mut buf[..1])?;
        if buf[0] == SENTINEL {
            return Ok(None);
        }

        let flags = raw::check_flags(buf[0])?;
        let len = raw::record_len(flags);
        if self.position as u64 + len as u64 > self.end as u64 {
            return Err(Error::TruncatedRecord);
        }

        self.writer.read(self.position + 1, &mut buf[1..len])?;
        let (record, used) = LogRecord::decode(&buf[..len])?;
        self.position += used as u32;
        Ok(Some(record))
    }
}

impl<D: BlockDevice> Iterator for Scanner<'_, D> {
    type Item = Result<LogRecord, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.read_next() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
