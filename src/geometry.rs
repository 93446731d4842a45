use crate::error::Error;
use core::ops::Range;

/// Smallest programmable unit.
pub const PAGE_SIZE: usize = 256;
/// Smallest erasable unit.
pub const SECTOR_SIZE: usize = 0x1000;
pub const PAGES_PER_SECTOR: usize = SECTOR_SIZE / PAGE_SIZE;
/// Value of every byte after an erase.
pub const ERASED: u8 = 0xFF;

pub const DEFAULT_LOG_BASE: u32 = 0x000000;
pub const DEFAULT_LOG_SIZE: u32 = 0x200000;

const _: () = assert!(
    PAGES_PER_SECTOR * PAGE_SIZE == SECTOR_SIZE,
    "Sector size must be a whole number of pages"
);

/// Index of the sector containing `address`.
#[inline(always)]
pub const fn sector_of(address: u32) -> u32 {
    address / SECTOR_SIZE as u32
}

/// First address of `sector`.
#[inline(always)]
pub const fn sector_address(sector: u32) -> u32 {
    sector * SECTOR_SIZE as u32
}

/// First address of the page containing `address`.
#[inline(always)]
pub const fn page_floor(address: u32) -> u32 {
    address & !(PAGE_SIZE as u32 - 1)
}

/// The log region inside the flash device. Both ends sit on sector boundaries so that
/// resetting the log never touches data outside of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Geometry {
    base: u32,
    size: u32,
}

impl Geometry {
    pub const fn new(base: u32, size: u32) -> Result<Self, Error> {
        if base % SECTOR_SIZE as u32 != 0 {
            return Err(Error::InvalidRegion);
        }
        if size == 0 || size % SECTOR_SIZE as u32 != 0 {
            return Err(Error::InvalidRegion);
        }
        if base.checked_add(size).is_none() {
            return Err(Error::InvalidRegion);
        }

        Ok(Self { base, size })
    }

    /// Checks that the region fits into a device of `capacity` bytes.
    pub fn validate_for(&self, capacity: usize) -> Result<(), Error> {
        if self.end() as usize > capacity {
            return Err(Error::InvalidRegion);
        }
        Ok(())
    }

    pub const fn base(&self) -> u32 {
        self.base
    }

    pub const fn size(&self) -> u32 {
        self.size
    }

    /// First address past the region.
    pub const fn end(&self) -> u32 {
        self.base + self.size
    }

    /// Sector indices covered by the region.
    pub const fn sectors(&self) -> Range<u32> {
        sector_of(self.base)..sector_of(self.end())
    }

    /// Whether `[address, address + len)` lies completely inside the region.
    pub fn contains(&self, address: u32, len: usize) -> bool {
        address >= self.base && (address as u64 + len as u64) <= self.end() as u64
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            base: DEFAULT_LOG_BASE,
            size: DEFAULT_LOG_SIZE,
        }
    }
}
