//! Error types for devapps-core

/// Errors raised by registries, the codec and launch requests.
///
/// None of these reach the caller of the method channel directly: the
/// engine recovers from them by omitting fields or answering `false`.
#[derive(Debug, thiserror::Error)]
pub enum AppsError {
    #[error("Package not found: {0}")]
    NotFound(String),

    #[error("Image has no intrinsic size ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    #[error("Failed to rasterize image: {0}")]
    Render(String),

    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Launch failed: {0}")]
    Launch(String),
}

pub type Result<T> = std::result::Result<T, AppsError>;
