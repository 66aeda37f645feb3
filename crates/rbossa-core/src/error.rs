//! Error types for rbossa-core
//!
//! One error enum covers the whole shell: validation and gating failures that
//! are reported next to the command that raised them, and I/O failures that
//! propagate out of transfers after their resources have been released.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum Error {
    // Validation errors
    /// Wrong argument count or badly formed argument
    #[error("{0}")]
    Usage(String),

    /// Token is not an integer literal
    #[error("Invalid number \"{0}\"")]
    InvalidNumber(String),

    /// Value parsed but does not fit the expected range
    #[error("{0} is out of range")]
    OutOfRange(String),

    /// PIO line name or operation could not be decoded
    #[error("{0}")]
    HardwareDecode(String),

    // Gating errors
    /// Command needs a device and none is attached
    #[error("No device connected.  Use \"connect\" or \"scan\" first")]
    NotConnected,

    /// Command needs flash support and the attached device has none
    #[error("Flash on device is not supported")]
    FlashUnsupported,

    // Dispatch errors
    /// No command registered under this name
    #[error("Unknown command \"{0}\"")]
    UnknownCommand(String),

    /// Input line could not be split into tokens
    #[error("Malformed command line: {0}")]
    MalformedLine(String),

    // File errors
    /// Host file could not be opened
    #[error("Unable to open \"{}\": {source}", .path.display())]
    FileOpen {
        /// File that failed to open
        path: PathBuf,
        /// Underlying OS error
        #[source]
        source: io::Error,
    },

    /// Read, write or seek on an open host file failed
    #[error("File I/O error: {source}")]
    FileIo {
        /// Underlying OS error
        #[source]
        source: io::Error,
    },

    /// Host file accepted fewer bytes than were handed to it
    #[error("Short file write: {written} of {expected} bytes")]
    FileShort {
        /// Bytes offered to the file
        expected: usize,
        /// Bytes the file accepted
        written: usize,
    },

    // Device errors
    /// Transport to the target failed
    #[error("Device transport error: {0}")]
    Transport(String),

    /// Flash driver reported a failure
    #[error("Flash error: {0}")]
    Flash(String),

    /// Writing to the console failed
    #[error("Console output failed: {0}")]
    Console(#[from] io::Error),
}

impl Error {
    /// Whether this error is an argument validation failure
    ///
    /// Validation failures are reported with a pointer to the command's help.
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            Self::Usage(_) | Self::InvalidNumber(_) | Self::OutOfRange(_) | Self::HardwareDecode(_)
        )
    }

    /// OS error code carried by file errors, if any
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::FileOpen { source, .. } | Self::FileIo { source } => source.raw_os_error(),
            _ => None,
        }
    }

    pub(crate) fn file_io(source: io::Error) -> Self {
        Self::FileIo { source }
    }
}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_classification() {
        assert!(Error::Usage("x".into()).is_usage());
        assert!(Error::InvalidNumber("x".into()).is_usage());
        assert!(Error::OutOfRange("x".into()).is_usage());
        assert!(Error::HardwareDecode("x".into()).is_usage());
        assert!(!Error::NotConnected.is_usage());
        assert!(!Error::FlashUnsupported.is_usage());
        assert!(!Error::FileShort { expected: 2, written: 1 }.is_usage());
    }

    #[test]
    fn test_file_error_code() {
        let err = Error::FileOpen {
            path: PathBuf::from("/nonexistent"),
            source: io::Error::from_raw_os_error(2),
        };
        assert_eq!(err.code(), Some(2));
        assert_eq!(Error::NotConnected.code(), None);
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            Error::InvalidNumber("12x".into()).to_string(),
            "Invalid number \"12x\""
        );
        assert_eq!(
            Error::FileShort { expected: 1024, written: 10 }.to_string(),
            "Short file write: 10 of 1024 bytes"
        );
    }
}
