#![allow(dead_code)]

// filename according to https://doc.rust-lang.org/book/ch11-03-test-organization.html
use embedded_storage::nor_flash::{
    ErrorType, NorFlash, NorFlashError, NorFlashErrorKind, ReadNorFlash,
};
use nor_logger::error::Error;
use nor_logger::geometry::{PAGE_SIZE, SECTOR_SIZE, sector_address};
use nor_logger::platform::{self, BlockDevice};

// Write granularity reported through the embedded-storage traits
pub const WORD_SIZE: usize = 4;

/// In-memory NOR flash. Programming ANDs the new value into the old one, erasing sets a whole
/// sector to 0xFF. Every operation is recorded, and operation number `fail_after_operation`
/// and all after it fail.
#[derive(Default)]
pub struct Flash {
    pub buf: Vec<u8>,
    pub fail_after_operation: usize,
    pub operations: Vec<Operation>,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Operation {
    Read { address: u32, len: usize },
    Program { address: u32, len: usize },
    Erase { sector: u32 },
}

impl Flash {
    pub fn new(sectors: usize) -> Self {
        Self {
            buf: vec![0xffu8; SECTOR_SIZE * sectors],
            fail_after_operation: usize::MAX,
            ..Default::default()
        }
    }

    pub fn new_with_fault(sectors: usize, fail_after_operation: usize) -> Self {
        Self {
            fail_after_operation,
            ..Self::new(sectors)
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn bytes(&self, address: u32, len: usize) -> &[u8] {
        &self.buf[address as usize..address as usize + len]
    }

    /// Fills the whole chip with a pattern that differs in every byte.
    pub fn fill_pattern(&mut self) {
        for (i, b) in self.buf.iter_mut().enumerate() {
            *b = (i % 251) as u8;
        }
    }

    pub fn disable_faults(&mut self) {
        self.fail_after_operation = usize::MAX;
    }

    pub fn fail_after(&mut self, operations: usize) {
        self.fail_after_operation = self.operations.len() + operations;
    }

    pub fn clear_operations(&mut self) {
        self.operations.clear();
    }

    pub fn erases(&self) -> usize {
        self.operations
            .iter()
            .filter(|op| matches!(op, Operation::Erase { .. }))
            .count()
    }

    pub fn programs(&self) -> usize {
        self.operations
            .iter()
            .filter(|op| matches!(op, Operation::Program { .. }))
            .count()
    }

    pub fn dump_operations(&self) {
        println!("Operations:");
        for op in &self.operations {
            println!("  {:?}", op);
        }
    }

    fn record(&mut self, op: Operation) -> bool {
        if self.operations.len() >= self.fail_after_operation {
            println!("    flash: FAULT {op:?}");
            return false;
        }
        self.operations.push(op);
        true
    }

    fn and_into(&mut self, address: usize, data: &[u8]) {
        // NOR flash can only flip bits from 1 to 0
        for (i, &val) in data.iter().enumerate() {
            self.buf[address + i] &= val;
        }
    }
}

impl BlockDevice for Flash {
    fn capacity(&self) -> usize {
        self.buf.len()
    }

    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<(), Error> {
        platform::check_range(self.buf.len(), address, buf.len())?;
        println!(
            "    flash: read:    0x{address:06X}[0x{:04X}] #{:>2}",
            buf.len(),
            self.operations.len()
        );
        if !self.record(Operation::Read {
            address,
            len: buf.len(),
        }) {
            return Err(Error::Bus);
        }

        buf.copy_from_slice(self.bytes(address, buf.len()));
        Ok(())
    }

    fn program_page(
        &mut self,
        page_address: u32,
        offset: usize,
        data: &[u8],
    ) -> Result<(), Error> {
        platform::check_program(self.buf.len(), page_address, offset, data.len())?;
        let address = page_address + offset as u32;
        println!(
            "    flash: program: 0x{address:06X}[0x{:04X}] #{:>2}",
            data.len(),
            self.operations.len()
        );
        if !self.record(Operation::Program {
            address,
            len: data.len(),
        }) {
            return Err(Error::BusTimeout);
        }

        self.and_into(address as usize, data);
        Ok(())
    }

    fn erase_sector(&mut self, sector: u32) -> Result<(), Error> {
        platform::check_sector(self.buf.len(), sector)?;
        println!(
            "    flash: erase:   sector {sector} #{:>2}",
            self.operations.len()
        );
        if !self.record(Operation::Erase { sector }) {
            return Err(Error::BusTimeout);
        }

        let start = sector_address(sector) as usize;
        self.buf[start..start + SECTOR_SIZE].fill(0xff);
        Ok(())
    }
}

#[derive(Debug)]
pub struct FlashError;

impl NorFlashError for FlashError {
    fn kind(&self) -> NorFlashErrorKind {
        NorFlashErrorKind::Other
    }
}

impl ErrorType for Flash {
    type Error = FlashError;
}

impl ReadNorFlash for Flash {
    const READ_SIZE: usize = WORD_SIZE;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        assert!(offset.is_multiple_of(Self::READ_SIZE as _));
        assert!(bytes.len().is_multiple_of(Self::READ_SIZE));

        if !self.record(Operation::Read {
            address: offset,
            len: bytes.len(),
        }) {
            return Err(FlashError);
        }

        let offset = offset as usize;
        bytes.copy_from_slice(&self.buf[offset..offset + bytes.len()]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.buf.len()
    }
}

impl NorFlash for Flash {
    const WRITE_SIZE: usize = WORD_SIZE;

    const ERASE_SIZE: usize = SECTOR_SIZE;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        assert!(from.is_multiple_of(Self::ERASE_SIZE as _));
        assert!(to.is_multiple_of(Self::ERASE_SIZE as _));

        for sector in from / SECTOR_SIZE as u32..to / SECTOR_SIZE as u32 {
            if !self.record(Operation::Erase { sector }) {
                return Err(FlashError);
            }
            let start = sector_address(sector) as usize;
            self.buf[start..start + SECTOR_SIZE].fill(0xff);
        }
        Ok(())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        assert!(offset.is_multiple_of(Self::WRITE_SIZE as _));
        assert!(bytes.len().is_multiple_of(Self::WRITE_SIZE));
        assert!(!bytes.is_empty());
        // writes never span more than one chip page
        assert_eq!(
            offset as usize / PAGE_SIZE,
            (offset as usize + bytes.len() - 1) / PAGE_SIZE
        );

        if !self.record(Operation::Program {
            address: offset,
            len: bytes.len(),
        }) {
            return Err(FlashError);
        }

        self.and_into(offset as usize, bytes);
        Ok(())
    }
}
