//! Error types for SAM-BA monitor operations

use thiserror::Error;

/// SAM-BA specific errors
#[derive(Debug, Error)]
pub enum SambaError {
    /// Failed to open the port
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Nothing answered the mode switch
    #[error("No SAM-BA monitor responded")]
    NoResponse,

    /// Monitor answered with something unexpected
    #[error("Invalid response {response:?} to {command}")]
    InvalidResponse {
        /// Command that was sent
        command: String,
        /// Bytes that came back
        response: Vec<u8>,
    },

    /// I/O error during communication
    #[error("I/O error: {0}")]
    IoError(String),

    /// Timeout during communication
    #[error("Communication timeout")]
    Timeout,

    /// Serial port error
    #[error("Serial port error: {0}")]
    SerialError(#[from] serialport::Error),
}

impl SambaError {
    /// Whether this error means no monitor is present on the port
    pub fn is_no_device(&self) -> bool {
        matches!(
            self,
            SambaError::NoResponse | SambaError::Timeout | SambaError::InvalidResponse { .. }
        )
    }
}

/// Result type for SAM-BA operations
pub type Result<T> = core::result::Result<T, SambaError>;

impl From<std::io::Error> for SambaError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::TimedOut => SambaError::Timeout,
            _ => SambaError::IoError(e.to_string()),
        }
    }
}

impl From<SambaError> for rbossa_core::Error {
    fn from(e: SambaError) -> Self {
        rbossa_core::Error::Transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_mapping() {
        let err = SambaError::from(std::io::Error::from(std::io::ErrorKind::TimedOut));
        assert!(matches!(err, SambaError::Timeout));
        assert!(err.is_no_device());

        let err = SambaError::from(std::io::Error::from(std::io::ErrorKind::BrokenPipe));
        assert!(!err.is_no_device());
    }

    #[test]
    fn test_into_core() {
        let err: rbossa_core::Error = SambaError::Timeout.into();
        assert_eq!(err.to_string(), "Device transport error: Communication timeout");
    }
}
