use thiserror::Error;
use std::io;
use std::path::PathBuf;

/// Custom error types for the pathology annotator
#[derive(Error, Debug)]
pub enum AnnotatorError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Failed to read configuration from {path}: {source}")]
    ConfigRead {
        source: io::Error,
        path: PathBuf,
    },

    #[error("Failed to load configuration from {path}: {source}")]
    ConfigLoad {
        source: toml::de::Error,
        path: PathBuf,
    },

    #[error("Unreadable input image {path}: {reason}")]
    UnreadableInput {
        path: PathBuf,
        reason: String,
    },

    #[error("Image has zero-sized dimensions ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    #[error("Dimension mismatch: mask is {mask:?}, intensity field is {field:?}")]
    DimensionMismatch {
        mask: (u32, u32),
        field: (u32, u32),
    },

    #[error("Non-finite arrow geometry from {start:?} to {end:?}")]
    NonFiniteGeometry {
        start: (f32, f32),
        end: (f32, f32),
    },

    #[error("Rendering error: {0}")]
    Render(String),

    #[error("CSV output error: {0}")]
    CsvOutput(#[from] csv::Error),

    #[error("Invalid input path: {0}")]
    InvalidPath(PathBuf),
}

/// Type alias for Result with our custom error type
pub type Result<T> = std::result::Result<T, AnnotatorError>;

/// Reject images with a zero width or height before any stage touches them.
pub fn ensure_non_empty(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(AnnotatorError::EmptyImage { width, height });
    }
    Ok(())
}
