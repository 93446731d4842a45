use std::fs;
use std::path::Path;

use nor_logger::geometry::{sector_address, ERASED, SECTOR_SIZE};
use nor_logger::platform::{check_program, check_range, check_sector, BlockDevice};

use crate::error::Error;

/// A raw dump of the flash chip, held in memory.
///
/// Behaves like the real chip: programming can only clear bits and erasing sets a sector back
/// to `0xFF`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashImage {
    data: Vec<u8>,
}

impl FlashImage {
    /// A fully erased image of `size` bytes.
    pub fn erased(size: usize) -> Result<Self, Error> {
        Self::from_bytes(vec![ERASED; size])
    }

    pub fn from_bytes(data: Vec<u8>) -> Result<Self, Error> {
        if data.is_empty() || data.len() % SECTOR_SIZE != 0 {
            return Err(Error::InvalidImageSize(data.len()));
        }
        Ok(Self { data })
    }

    /// Reads an image as written by a flash programmer, e.g. `flashrom -r`.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        Self::from_bytes(fs::read(path)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        fs::write(path, &self.data)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

impl BlockDevice for FlashImage {
    fn capacity(&self) -> usize {
        self.data.len()
    }

    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<(), nor_logger::Error> {
        check_range(self.data.len(), address, buf.len())?;
        let start = address as usize;
        buf.copy_from_slice(&self.data[start..start + buf.len()]);
        Ok(())
    }

    fn program_page(
        &mut self,
        page_address: u32,
        offset: usize,
        data: &[u8],
    ) -> Result<(), nor_logger::Error> {
        check_program(self.data.len(), page_address, offset, data.len())?;
        let start = page_address as usize + offset;
        for (byte, &value) in self.data[start..start + data.len()].iter_mut().zip(data) {
            *byte &= value;
        }
        Ok(())
    }

    fn erase_sector(&mut self, sector: u32) -> Result<(), nor_logger::Error> {
        check_sector(self.data.len(), sector)?;
        let start = sector_address(sector) as usize;
        self.data[start..start + SECTOR_SIZE].fill(ERASED);
        Ok(())
    }
}
