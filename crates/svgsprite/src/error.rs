//! Error types for svgsprite

use std::fmt;
use std::io;
use std::sync::Arc;

/// Result type alias for svgsprite operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for sprite cache operations
///
/// Cloneable so a single rasterization outcome can be handed to every
/// request waiting on the same key.
#[derive(Debug, Clone)]
pub enum Error {
    /// SVG content is empty or whitespace only
    EmptyContent,

    /// Requested texture size has a zero side
    InvalidDimensions {
        /// Requested width in pixels
        width: u32,
        /// Requested height in pixels
        height: u32,
    },

    /// Render scale is not a positive finite number
    InvalidScale(f32),

    /// The rasterizer could not produce a texture
    Rasterization(String),

    /// Configuration value rejected
    InvalidConfig(String),

    /// I/O error while reading configuration
    Io(Arc<io::Error>),

    /// Configuration could not be parsed
    Parse(String),

    /// Cache has been shut down
    Closed,
}

impl Error {
    /// Build a rasterization error from any displayable cause
    pub fn rasterization(cause: impl fmt::Display) -> Self {
        Error::Rasterization(cause.to_string())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::EmptyContent => write!(f, "SVG content is empty"),
            Error::InvalidDimensions { width, height } => {
                write!(f, "Invalid texture size: {}x{}", width, height)
            }
            Error::InvalidScale(scale) => write!(f, "Invalid render scale: {}", scale),
            Error::Rasterization(msg) => write!(f, "Rasterization failed: {}", msg),
            Error::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Parse(msg) => write!(f, "Parse error: {}", msg),
            Error::Closed => write!(f, "Sprite cache is closed"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(Arc::new(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Parse(err.to_string())
    }
}
