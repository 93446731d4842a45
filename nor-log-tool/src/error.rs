use thiserror::Error;

/// Errors that can occur while loading a flash image or decoding the log inside it.
#[derive(Error, Debug)]
pub enum Error {
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("log error: {0}")]
    LogError(#[from] nor_logger::Error),

    #[error("invalid image size {0}: must be a non-zero multiple of 4096 bytes")]
    InvalidImageSize(usize),

    #[error("log region {base:#x}+{size:#x} does not fit into an image of {image:#x} bytes")]
    RegionOutsideImage { base: u32, size: u32, image: usize },
}
