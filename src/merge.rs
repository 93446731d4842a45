use crate::error::Error;
use crate::geometry::{ERASED, PAGE_SIZE, SECTOR_SIZE, page_floor, sector_address, sector_of};
use crate::platform::{BlockDevice, check_range};
use crate::raw::{Packer, Unpacker};
use alloc::boxed::Box;
use alloc::vec;
use core::cmp;
#[cfg(feature = "defmt")]
use defmt::trace;

/// How [`MergeWriter::write_fast`] ended up storing the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WriteMode {
    /// The target bytes were erased and got programmed in place.
    Programmed,
    /// At least one target byte was already written, the containing sector was merged.
    Merged,
}

/// Turns writes of arbitrary length at arbitrary offsets into sector
/// read-modify-erase-rewrite cycles, so bytes can take any value including 0 -> 1
/// transitions that plain programming cannot do.
///
/// Holds one sector sized snapshot buffer which is reused for every merge.
pub struct MergeWriter<D> {
    device: D,
    snapshot: Box<[u8]>,
}

impl<D: BlockDevice> MergeWriter<D> {
    /// Takes ownership of the device.
    pub fn new(device: D) -> Self {
        Self {
            device,
            snapshot: vec![ERASED; SECTOR_SIZE].into_boxed_slice(),
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn into_inner(self) -> D {
        self.device
    }

    pub fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<(), Error> {
        self.device.read(address, buf)
    }

    pub fn read_byte(&mut self, address: u32) -> Result<u8, Error> {
        let mut buf = [0u8; 1];
        self.device.read(address, &mut buf)?;
        Unpacker::new(&buf).get_u8()
    }

    /// Overwrites one byte, merging the containing sector.
    pub fn write_byte(&mut self, address: u32, value: u8) -> Result<(), Error> {
        self.write(address, &[value])
    }

    /// Reads a little-endian `f32` stored by [`write_f32`](Self::write_f32).
    pub fn read_f32(&mut self, address: u32) -> Result<f32, Error> {
        let mut buf = [0u8; 4];
        self.device.read(address, &mut buf)?;
        Unpacker::new(&buf).get_f32()
    }

    /// Stores `value` as 4 little-endian bytes. Can overwrite a previously stored value.
    pub fn write_f32(&mut self, address: u32, value: f32) -> Result<(), Error> {
        let mut buf = [0u8; 4];
        Packer::new(&mut buf).put_f32(value);
        self.write(address, &buf)
    }

    /// Stores `data` at `address`. Every sector touched by the range is read, patched, erased and
    /// reprogrammed in ascending order. Bytes outside the range keep their previous value.
    ///
    /// The first failing flash operation aborts the write. Sectors after the failing one are
    /// left untouched, the failing sector itself is in an unknown state.
    pub fn write(&mut self, address: u32, data: &[u8]) -> Result<(), Error> {
        if data.is_empty() {
            return Ok(());
        }
        check_range(self.device.capacity(), address, data.len())?;

        let end = address as usize + data.len();
        let mut cursor = address as usize;
        let mut consumed = 0;
        while cursor < end {
            let sector = sector_of(cursor as u32);
            let sector_start = sector_address(sector) as usize;
            let chunk = cmp::min(end, sector_start + SECTOR_SIZE) - cursor;

            self.merge_sector(
                sector,
                cursor - sector_start,
                &data[consumed..consumed + chunk],
            )?;

            cursor += chunk;
            consumed += chunk;
        }

        Ok(())
    }

    /// Programs `data` directly if every target byte still reads as erased, skipping the erase
    /// cycle. Falls back to [`write`](Self::write) when the range spans more than one sector or
    /// any target byte was already written.
    pub fn write_fast(&mut self, address: u32, data: &[u8]) -> Result<WriteMode, Error> {
        if data.is_empty() {
            return Ok(WriteMode::Programmed);
        }
        check_range(self.device.capacity(), address, data.len())?;

        let last = address + (data.len() - 1) as u32;
        if sector_of(address) != sector_of(last) {
            self.write(address, data)?;
            return Ok(WriteMode::Merged);
        }

        let target = &mut self.snapshot[..data.len()];
        self.device.read(address, target)?;
        if target.iter().any(|&b| b != ERASED) {
            self.write(address, data)?;
            return Ok(WriteMode::Merged);
        }

        self.program_span(address, data)?;
        Ok(WriteMode::Programmed)
    }

    fn merge_sector(&mut self, sector: u32, offset: usize, patch: &[u8]) -> Result<(), Error> {
        #[cfg(feature = "defmt")]
        trace!(
            "merge_sector: {} @{}: [{}]",
            sector,
            offset,
            patch.len()
        );

        #[cfg(feature = "debug-logs")]
        println!("  MergeWriter: merge sector {sector} @{offset:#05x} [{}]", patch.len());

        let base = sector_address(sector);
        self.device.read(base, &mut self.snapshot)?;
        self.snapshot[offset..offset + patch.len()].copy_from_slice(patch);

        self.device.erase_sector(sector)?;

        for (index, page) in self.snapshot.chunks(PAGE_SIZE).enumerate() {
            // erase already left these bytes at their final value
            if page.iter().all(|&b| b == ERASED) {
                continue;
            }
            self.device
                .program_page(base + (index * PAGE_SIZE) as u32, 0, page)?;
        }

        Ok(())
    }

    fn program_span(&mut self, mut address: u32, mut data: &[u8]) -> Result<(), Error> {
        while !data.is_empty() {
            let page = page_floor(address);
            let offset = (address - page) as usize;
            let chunk = cmp::min(data.len(), PAGE_SIZE - offset);

            self.device.program_page(page, offset, &data[..chunk])?;

            address += chunk as u32;
            data = &data[chunk..];
        }
        Ok(())
    }
}

impl<'a, D: BlockDevice> MergeWriter<&'a mut D> {
    /// Borrows the device instead of owning it. The caller keeps it once the writer is dropped.
    pub fn borrowed(device: &'a mut D) -> Self {
        MergeWriter::new(device)
    }
}
