//! Error type for geometry and PVS file handling.

/// Failures reading or writing the files the tree is built from or cached to.
#[derive(Debug, thiserror::Error)]
pub enum BspError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The binary geometry file is truncated or its counts don't add up
    #[error("malformed geometry file: {0}")]
    MalformedGeometry(String),
    /// The PVS text file doesn't describe this tree's leaves
    #[error("malformed PVS file: {0}")]
    MalformedPvs(String),
}

pub type Result<T> = std::result::Result<T, BspError>;
