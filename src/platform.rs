use crate::error::Error;
use crate::geometry::{ERASED, PAGE_SIZE, SECTOR_SIZE, sector_address};
use alloc::vec;
use embedded_storage::nor_flash::{NorFlash, ReadNorFlash};
#[cfg(feature = "defmt")]
use defmt::trace;

/// Raw access to a NOR flash address space. Programming can only clear bits, so callers must
/// erase the containing sector before programming bytes that need a 0 -> 1 transition.
///
/// All operations block until the device finished the physical operation. Implementations
/// report a busy-wait that runs out of time as [`Error::BusTimeout`].
pub trait BlockDevice {
    /// Size of the address space in bytes.
    fn capacity(&self) -> usize;

    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<(), Error>;

    /// Programs `data` into the page at `page_address`, starting `offset` bytes into the page.
    fn program_page(&mut self, page_address: u32, offset: usize, data: &[u8])
    -> Result<(), Error>;

    /// Sets all bytes of the sector to [`ERASED`].
    fn erase_sector(&mut self, sector: u32) -> Result<(), Error>;

    fn erase_all(&mut self) -> Result<(), Error> {
        for sector in 0..self.sector_count() {
            self.erase_sector(sector)?;
        }
        Ok(())
    }

    fn sector_count(&self) -> u32 {
        (self.capacity() / SECTOR_SIZE) as u32
    }
}

impl<T: BlockDevice + ?Sized> BlockDevice for &mut T {
    fn capacity(&self) -> usize {
        T::capacity(self)
    }

    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<(), Error> {
        T::read(self, address, buf)
    }

    fn program_page(
        &mut self,
        page_address: u32,
        offset: usize,
        data: &[u8],
    ) -> Result<(), Error> {
        T::program_page(self, page_address, offset, data)
    }

    fn erase_sector(&mut self, sector: u32) -> Result<(), Error> {
        T::erase_sector(self, sector)
    }

    fn erase_all(&mut self) -> Result<(), Error> {
        T::erase_all(self)
    }
}

/// Fails with `OutOfBounds` unless `[address, address + len)` is inside the device.
pub fn check_range(capacity: usize, address: u32, len: usize) -> Result<(), Error> {
    match (address as usize).checked_add(len) {
        Some(end) if end <= capacity => Ok(()),
        _ => Err(Error::OutOfBounds),
    }
}

/// Shared argument validation for [`BlockDevice::program_page`] implementations.
pub fn check_program(
    capacity: usize,
    page_address: u32,
    offset: usize,
    len: usize,
) -> Result<(), Error> {
    if !(page_address as usize).is_multiple_of(PAGE_SIZE) {
        return Err(Error::Unaligned);
    }
    if offset.saturating_add(len) > PAGE_SIZE {
        return Err(Error::PageOverflow);
    }
    check_range(capacity, page_address, PAGE_SIZE)
}

/// Shared argument validation for [`BlockDevice::erase_sector`] implementations.
pub fn check_sector(capacity: usize, sector: u32) -> Result<(), Error> {
    check_range(capacity, sector_address(sector), SECTOR_SIZE)
}

pub trait AlignedOps: NorFlash {
    fn align_read_floor(size: usize) -> usize {
        align_floor(size, Self::READ_SIZE)
    }

    fn align_read_ceil(size: usize) -> usize {
        align_ceil(size, Self::READ_SIZE)
    }

    fn align_write_floor(size: usize) -> usize {
        align_floor(size, Self::WRITE_SIZE)
    }

    fn align_write_ceil(size: usize) -> usize {
        align_ceil(size, Self::WRITE_SIZE)
    }
}

#[inline(always)]
const fn align_ceil(size: usize, alignment: usize) -> usize {
    if alignment.is_power_of_two() {
        size.saturating_add(alignment - 1) & !(alignment - 1)
    } else {
        size.saturating_add(alignment - 1) / alignment * alignment
    }
}

#[inline(always)]
const fn align_floor(size: usize, alignment: usize) -> usize {
    if alignment.is_power_of_two() {
        size & !(alignment - 1)
    } else {
        size / alignment * alignment
    }
}

impl<T: NorFlash> AlignedOps for T {}

/// Exposes any `embedded-storage` NOR flash (on-chip flash, other SPI chip drivers) as a
/// [`BlockDevice`]. Unaligned accesses are widened to the backend's read and write
/// granularity. Widened programs are padded with [`ERASED`], which leaves the padding bytes
/// untouched on the chip.
pub struct NorFlashDevice<F> {
    inner: F,
}

impl<F: NorFlash> NorFlashDevice<F> {
    pub fn new(inner: F) -> Self {
        Self { inner }
    }

    pub fn inner(&mut self) -> &mut F {
        &mut self.inner
    }

    pub fn into_inner(self) -> F {
        self.inner
    }
}

impl<F: NorFlash> BlockDevice for NorFlashDevice<F> {
    fn capacity(&self) -> usize {
        ReadNorFlash::capacity(&self.inner)
    }

    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<(), Error> {
        check_range(self.capacity(), address, buf.len())?;

        let start = F::align_read_floor(address as usize);
        let end = F::align_read_ceil(address as usize + buf.len());
        if start == address as usize && end == start + buf.len() {
            return ReadNorFlash::read(&mut self.inner, address, buf).map_err(|_| Error::Flash);
        }

        let mut scratch = vec![0u8; end - start];
        ReadNorFlash::read(&mut self.inner, start as u32, &mut scratch)
            .map_err(|_| Error::Flash)?;
        let skip = address as usize - start;
        buf.copy_from_slice(&scratch[skip..skip + buf.len()]);
        Ok(())
    }

    fn program_page(
        &mut self,
        page_address: u32,
        offset: usize,
        data: &[u8],
    ) -> Result<(), Error> {
        check_program(self.capacity(), page_address, offset, data.len())?;
        if data.is_empty() {
            return Ok(());
        }

        #[cfg(feature = "defmt")]
        trace!("program_page @{:#08x}+{}: [{}]", page_address, offset, data.len());

        let address = page_address as usize + offset;
        let start = F::align_write_floor(address);
        let end = F::align_write_ceil(address + data.len());
        if start == address && end == address + data.len() {
            return self
                .inner
                .write(address as u32, data)
                .map_err(|_| Error::Flash);
        }

        let mut buf = vec![ERASED; end - start];
        let skip = address - start;
        buf[skip..skip + data.len()].copy_from_slice(data);
        self.inner
            .write(start as u32, &buf)
            .map_err(|_| Error::Flash)
    }

    fn erase_sector(&mut self, sector: u32) -> Result<(), Error> {
        check_sector(self.capacity(), sector)?;
        if !SECTOR_SIZE.is_multiple_of(F::ERASE_SIZE) {
            return Err(Error::Unaligned);
        }

        #[cfg(feature = "defmt")]
        trace!("erase_sector: {}", sector);

        let from = sector_address(sector);
        self.inner
            .erase(from, from + SECTOR_SIZE as u32)
            .map_err(|_| Error::Flash)
    }
}
