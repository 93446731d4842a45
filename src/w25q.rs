//! Winbond W25Qxx serial NOR flash over SPI.
//!
//! The driver owns whatever implements [`SpiDevice`]. To keep using the bus handle elsewhere
//! pass `&mut spi` instead, `embedded-hal` implements the trait for mutable references.

use crate::error::Error;
use crate::geometry::{SECTOR_SIZE, sector_address};
use crate::platform::{BlockDevice, check_program, check_range, check_sector};
#[cfg(feature = "defmt")]
use defmt::{trace, warn};
use embedded_hal::delay::DelayNs;
use embedded_hal::spi::{Operation, SpiDevice};

const READ_DATA: u8 = 0x03;
const PAGE_PROGRAM: u8 = 0x02;
const SECTOR_ERASE: u8 = 0x20;
const WRITE_ENABLE: u8 = 0x06;
const WRITE_DISABLE: u8 = 0x04;
const READ_STATUS_1: u8 = 0x05;
const ENABLE_RESET: u8 = 0x66;
const RESET_DEVICE: u8 = 0x99;
const JEDEC_ID: u8 = 0x9F;

const STATUS_BUSY: u8 = 0x01;
const STATUS_WEL: u8 = 0x02;

pub const W25Q16JV_CAPACITY: usize = 0x200000;
pub const W25Q32JV_CAPACITY: usize = 0x400000;

/// Largest chip reachable with 3-byte addresses.
pub const MAX_CAPACITY: usize = 1 << 24;

/// Busy-wait bounds. Program and erase latencies are taken from the W25Q16JV/W25Q32JV
/// datasheets with margin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct W25qConfig {
    pub program_timeout_ms: u32,
    pub erase_timeout_ms: u32,
    pub write_enable_timeout_ms: u32,
    pub poll_interval_ms: u32,
}

impl Default for W25qConfig {
    fn default() -> Self {
        Self {
            program_timeout_ms: 100,
            erase_timeout_ms: 4000,
            write_enable_timeout_ms: 10,
            poll_interval_ms: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct JedecId {
    pub manufacturer: u8,
    pub memory_type: u8,
    pub capacity: u8,
}

impl JedecId {
    /// Capacity in bytes, encoded by the chip as a power of two. `None` for codes that do not
    /// fit a `usize`, e.g. the `0xFF` a floating bus reads back.
    pub fn capacity_bytes(&self) -> Option<usize> {
        1usize.checked_shl(self.capacity as u32)
    }
}

pub struct W25q<SPI, D> {
    spi: SPI,
    delay: D,
    capacity: usize,
    config: W25qConfig,
}

/// Command byte followed by the 24-bit address, most significant byte first.
fn address_frame(command: u8, address: u32) -> [u8; 4] {
    let [_, high, mid, low] = address.to_be_bytes();
    [command, high, mid, low]
}

impl<SPI, D> W25q<SPI, D>
where
    SPI: SpiDevice,
    D: DelayNs,
{
    pub fn new(spi: SPI, delay: D, capacity: usize) -> Result<Self, Error> {
        Self::with_config(spi, delay, capacity, W25qConfig::default())
    }

    /// Fails with `InvalidRegion` unless `capacity` is a non-zero multiple of the sector size
    /// and at most [`MAX_CAPACITY`].
    pub fn with_config(
        spi: SPI,
        delay: D,
        capacity: usize,
        config: W25qConfig,
    ) -> Result<Self, Error> {
        if capacity == 0 || capacity > MAX_CAPACITY || !capacity.is_multiple_of(SECTOR_SIZE) {
            return Err(Error::InvalidRegion);
        }

        Ok(Self {
            spi,
            delay,
            capacity,
            config,
        })
    }

    /// Gives back the bus and delay handles.
    pub fn release(self) -> (SPI, D) {
        (self.spi, self.delay)
    }

    pub fn config(&self) -> &W25qConfig {
        &self.config
    }

    pub fn jedec_id(&mut self) -> Result<JedecId, Error> {
        let mut id = [0u8; 3];
        self.spi
            .transaction(&mut [Operation::Write(&[JEDEC_ID]), Operation::Read(&mut id)])
            .map_err(|_| Error::Bus)?;
        Ok(JedecId {
            manufacturer: id[0],
            memory_type: id[1],
            capacity: id[2],
        })
    }

    pub fn read_status(&mut self) -> Result<u8, Error> {
        let mut status = [0u8; 1];
        self.spi
            .transaction(&mut [
                Operation::Write(&[READ_STATUS_1]),
                Operation::Read(&mut status),
            ])
            .map_err(|_| Error::Bus)?;
        Ok(status[0])
    }

    /// Sends write enable and waits until the chip reports the write enable latch.
    pub fn enable_write(&mut self) -> Result<(), Error> {
        self.command(WRITE_ENABLE)?;
        let timeout = self.config.write_enable_timeout_ms;
        self.poll_status(timeout, |status| status & STATUS_WEL != 0)
    }

    /// Clears the write enable latch and waits until the chip reports it cleared.
    pub fn disable_write(&mut self) -> Result<(), Error> {
        self.command(WRITE_DISABLE)?;
        let timeout = self.config.write_enable_timeout_ms;
        self.poll_status(timeout, |status| status & STATUS_WEL == 0)
    }

    /// Two-command software reset. Aborts any operation in progress.
    pub fn reset(&mut self) -> Result<(), Error> {
        #[cfg(feature = "defmt")]
        trace!("w25q: reset");

        self.command(ENABLE_RESET)?;
        self.delay.delay_ms(5);
        self.command(RESET_DEVICE)?;
        self.delay.delay_ms(1);
        Ok(())
    }

    fn command(&mut self, command: u8) -> Result<(), Error> {
        self.spi.write(&[command]).map_err(|_| Error::Bus)
    }

    fn wait_ready(&mut self, timeout_ms: u32) -> Result<(), Error> {
        self.poll_status(timeout_ms, |status| status & STATUS_BUSY == 0)
    }

    fn poll_status(&mut self, timeout_ms: u32, done: impl Fn(u8) -> bool) -> Result<(), Error> {
        let step = self.config.poll_interval_ms.max(1);
        let mut elapsed = 0;
        loop {
            if done(self.read_status()?) {
                return Ok(());
            }
            if elapsed >= timeout_ms {
                #[cfg(feature = "defmt")]
                warn!("w25q: busy timeout after {} ms", elapsed);
                return Err(Error::BusTimeout);
            }
            self.delay.delay_ms(step);
            elapsed += step;
        }
    }
}

impl<SPI, D> BlockDevice for W25q<SPI, D>
where
    SPI: SpiDevice,
    D: DelayNs,
{
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<(), Error> {
        check_range(self.capacity, address, buf.len())?;
        if buf.is_empty() {
            return Ok(());
        }

        let frame = address_frame(READ_DATA, address);
        self.spi
            .transaction(&mut [Operation::Write(&frame), Operation::Read(buf)])
            .map_err(|_| Error::Bus)
    }

    fn program_page(
        &mut self,
        page_address: u32,
        offset: usize,
        data: &[u8],
    ) -> Result<(), Error> {
        check_program(self.capacity, page_address, offset, data.len())?;
        if data.is_empty() {
            return Ok(());
        }

        #[cfg(feature = "defmt")]
        trace!("w25q: program @{:#08x}+{}: [{}]", page_address, offset, data.len());

        self.enable_write()?;
        let frame = address_frame(PAGE_PROGRAM, page_address + offset as u32);
        self.spi
            .transaction(&mut [Operation::Write(&frame), Operation::Write(data)])
            .map_err(|_| Error::Bus)?;
        let timeout = self.config.program_timeout_ms;
        self.wait_ready(timeout)
    }

    fn erase_sector(&mut self, sector: u32) -> Result<(), Error> {
        check_sector(self.capacity, sector)?;

        #[cfg(feature = "defmt")]
        trace!("w25q: erase sector {}", sector);

        self.enable_write()?;
        self.spi
            .write(&address_frame(SECTOR_ERASE, sector_address(sector)))
            .map_err(|_| Error::Bus)?;
        let timeout = self.config.erase_timeout_ms;
        self.wait_ready(timeout)
    }
}
