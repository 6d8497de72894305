//! Error types shared by every hybridboot crate

use thiserror::Error;

/// The main error type for hybridboot operations
///
/// Only fatal conditions are errors. A bad signature, a checksum mismatch or a
/// broken extended chain is carried as data in the decoded structures instead.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error against a backing file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Positioned I/O failure with the offending address
    #[error("{context} at byte offset {offset}: {source}")]
    IoAt {
        context: &'static str,
        offset: u64,
        #[source]
        source: std::io::Error,
    },

    /// Invalid partition table structure that prevents building or decoding
    #[error("Invalid zone table: {0}")]
    InvalidZoneTable(String),

    /// The input is not an image we can work with
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    /// El Torito boot catalog problems
    #[error("Invalid boot catalog: {0}")]
    InvalidCatalog(String),

    /// Malformed disk dump text
    #[error("{file}: line {line}: invalid import data: {content}")]
    ImportParse {
        file: String,
        line: usize,
        content: String,
    },

    /// Option out of its accepted range
    #[error("Invalid option: {0}")]
    InvalidOption(String),

    /// A size or count derived from disk data exceeds a hard limit
    #[error("Limit exceeded: {0}")]
    LimitExceeded(String),

    /// Generic error with custom message
    #[error("{0}")]
    Custom(String),
}

/// Result type alias for hybridboot operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a custom error from a string
    pub fn custom(msg: impl Into<String>) -> Self {
        Error::Custom(msg.into())
    }

    /// Create an invalid zone table error
    pub fn invalid_zone_table(msg: impl Into<String>) -> Self {
        Error::InvalidZoneTable(msg.into())
    }

    /// Create an invalid image error
    pub fn invalid_image(msg: impl Into<String>) -> Self {
        Error::InvalidImage(msg.into())
    }

    /// Create an invalid boot catalog error
    pub fn invalid_catalog(msg: impl Into<String>) -> Self {
        Error::InvalidCatalog(msg.into())
    }

    /// Create an invalid option error
    pub fn invalid_option(msg: impl Into<String>) -> Self {
        Error::InvalidOption(msg.into())
    }

    /// Create a limit exceeded error
    pub fn limit_exceeded(msg: impl Into<String>) -> Self {
        Error::LimitExceeded(msg.into())
    }

    /// Wrap an I/O error with the operation and byte offset it failed at
    pub fn io_at(context: &'static str, offset: u64, source: std::io::Error) -> Self {
        Error::IoAt {
            context,
            offset,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_parse_message_names_line() {
        let err = Error::ImportParse {
            file: "dump.txt".to_string(),
            line: 7,
            content: "garbage".to_string(),
        };
        assert_eq!(err.to_string(), "dump.txt: line 7: invalid import data: garbage");
    }

    #[test]
    fn test_io_at_message() {
        let err = Error::io_at(
            "read",
            4096,
            std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "short read"),
        );
        assert!(err.to_string().contains("read at byte offset 4096"));
    }
}
