use thiserror::Error;

#[derive(Error, Debug)]
pub enum QuiltError {
    #[error("Invalid arguments: {0}")]
    ArgumentError(String),

    #[error("Failed to load image {path}: {reason}")]
    DecodeError { path: String, reason: String },

    #[error("Invalid quilt layout: {0}")]
    InvalidLayout(String),

    #[error(
        "View {path} is {found_width}x{found_height}x{found_channels}, expected {expected_width}x{expected_height}x{expected_channels}"
    )]
    InconsistentView {
        path: String,
        expected_width: u32,
        expected_height: u32,
        expected_channels: u32,
        found_width: u32,
        found_height: u32,
        found_channels: u32,
    },

    #[error("The number of input images ({found}) is lower than the expected quilt size ({expected})")]
    IncompleteQuilt { found: usize, expected: usize },

    #[error("No compute device available: {0}")]
    DeviceUnavailable(String),

    #[error("Failed to allocate device texture: {0}")]
    DeviceAllocation(String),

    #[error("Device transfer failed: {0}")]
    TransferError(String),

    #[error("Compute kernel error: {0}")]
    KernelError(String),

    #[error("Failed to store {path}: {reason}")]
    EncodeError { path: String, reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, QuiltError>;
