#![doc = include_str!("../README.md")]
#![cfg_attr(not(target_arch = "x86_64"), no_std)]

extern crate alloc;

pub mod error;
pub mod geometry;
pub mod log;
pub mod logger;
pub mod merge;
pub mod platform;
pub mod print;
pub mod quadrature;
pub mod raw;
pub mod record;
pub mod sensor;
pub mod w25q;

pub use error::Error;
pub use geometry::Geometry;
pub use log::{AppendLog, Scanner};
pub use logger::{Command, Logger, LoggerState, SharedSnapshot, Snapshot, Transition};
pub use merge::{MergeWriter, WriteMode};
pub use platform::{BlockDevice, NorFlashDevice};
pub use print::Format;
pub use quadrature::QuadratureCounter;
pub use record::{Channel, EncoderBlock, ImuBlock, LogRecord, PhysicalRecord};
pub use w25q::{W25q, W25qConfig};
