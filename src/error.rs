use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("accelerator setup failed: {0}")]
    AcceleratorSetup(String),
    #[error("accelerator device error: {0}")]
    Device(String),
    #[error("worker pool failure: {0}")]
    Worker(String),
    #[error("cannot write {}: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("GIF encoding failed: {0}")]
    Encode(#[from] gif::EncodingError),
    #[error("still image export failed: {0}")]
    Image(#[from] image::ImageError),
}

impl Error {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Config(_) => 2,
            _ => 1,
        }
    }
}
