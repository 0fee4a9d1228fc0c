//! # Error Handling
//!
//! Errors surfaced by the framing engine and the thin layers built on it.
//!
//! Most unusual input is *not* an error here: PDU fields are never range
//! checked (out-of-range values are truncated to 16 bits) and reply problems
//! are first reported as a [`ReplyClass`](crate::reply::ReplyClass). A
//! `ModbusError` appears when a caller asks for a result that cannot be
//! produced, e.g. the payload of a reply that failed its checksum.
//!
//! ## Error Categories
//!
//! - **Configuration**: unsupported envelope kind, unreadable config file.
//!   Fatal, never retried.
//! - **No data**: reply too short or missing framing markers.
//! - **Checksum mismatch**: CRC-16 or LRC verification failed.
//! - **Exception**: the device rejected the request with an exception code.
//! - **Transport**: failures reported by the external sender, passed through
//!   untouched.
//!
//! ```rust
//! use modbus_adu::{ModbusError, ModbusResult};
//!
//! fn handle(result: ModbusResult<u16>) {
//!     match result {
//!         Ok(value) => println!("value: {}", value),
//!         Err(error) if error.is_recoverable() => println!("retry: {}", error),
//!         Err(error) => println!("giving up: {}", error),
//!     }
//! }
//! ```

use thiserror::Error;

use crate::protocol::ModbusException;

/// Result type alias for engine operations
pub type ModbusResult<T> = Result<T, ModbusError>;

/// Error types for ADU framing and reply interpretation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModbusError {
    /// I/O related errors (config files, sender implementations)
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Failure reported by the external frame sender
    ///
    /// The engine never inspects these; they are propagated as-is.
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// Configuration errors
    ///
    /// Raised for an envelope kind outside the four defined ones and for
    /// malformed configuration documents.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Function code outside the eight supported ones
    #[error("Invalid function code: {code}")]
    InvalidFunction { code: u8 },

    /// Invalid data value
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// Frame structure errors (bad hex digits in an ASCII frame, etc.)
    #[error("Frame error: {message}")]
    Frame { message: String },

    /// Reply too short or missing expected markers
    #[error("No usable reply data: {message}")]
    NoData { message: String },

    /// Checksum validation failure (CRC-16 for RTU/Over-TCP, LRC for ASCII)
    #[error("Checksum validation failed: expected={expected:04X}, actual={actual:04X}")]
    ChecksumMismatch { expected: u16, actual: u16 },

    /// Modbus exception response
    ///
    /// # Standard Exception Codes
    /// - 0x01: Illegal Function
    /// - 0x02: Illegal Data Address
    /// - 0x03: Illegal Data Value
    /// - 0x04: Slave Device Failure
    /// - 0x05: Acknowledge
    /// - 0x06: Slave Device Busy
    /// - 0x08: Memory Parity Error
    /// - 0x0A: Gateway Path Unavailable
    /// - 0x0B: Gateway Target Device Failed to Respond
    #[error("Modbus exception: function={function:02X}, code={code:02X} ({message})")]
    Exception { function: u8, code: u8, message: String },
}

impl ModbusError {
    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io { message: message.into() }
    }

    /// Create a new transport error
    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self::Transport { message: message.into() }
    }

    /// Create a new configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration { message: message.into() }
    }

    /// Configuration error for an envelope kind code outside 1..=4
    pub fn unsupported_envelope(code: u8) -> Self {
        Self::configuration(format!("unsupported envelope kind: {}", code))
    }

    /// Create an invalid function error
    pub fn invalid_function(code: u8) -> Self {
        Self::InvalidFunction { code }
    }

    /// Create an invalid data error
    pub fn invalid_data<S: Into<String>>(message: S) -> Self {
        Self::InvalidData { message: message.into() }
    }

    /// Create a frame error
    pub fn frame<S: Into<String>>(message: S) -> Self {
        Self::Frame { message: message.into() }
    }

    /// Create a no-data error
    pub fn no_data<S: Into<String>>(message: S) -> Self {
        Self::NoData { message: message.into() }
    }

    /// Create a checksum mismatch error
    ///
    /// LRC values are widened to `u16`.
    pub fn checksum_mismatch(expected: u16, actual: u16) -> Self {
        Self::ChecksumMismatch { expected, actual }
    }

    /// Create a Modbus exception error
    ///
    /// Maps standard exception codes to human-readable messages.
    pub fn exception(function: u8, code: u8) -> Self {
        let message = match ModbusException::from_u8(code) {
            Some(exception) => exception.name(),
            None => "Unknown Exception",
        }
        .to_string();

        Self::Exception { function, code, message }
    }

    /// Check if the error is recoverable (can retry)
    ///
    /// ```rust
    /// use modbus_adu::ModbusError;
    ///
    /// assert!(ModbusError::checksum_mismatch(0x1234, 0x4321).is_recoverable());
    /// assert!(!ModbusError::unsupported_envelope(9).is_recoverable());
    /// ```
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Io { .. } => true,
            Self::Transport { .. } => true,
            Self::NoData { .. } => true,
            Self::ChecksumMismatch { .. } => true,
            Self::Exception { code, .. } => {
                ModbusException::from_u8(*code).map_or(false, ModbusException::is_transient)
            }
            _ => false,
        }
    }

    /// Check if the error came from the sender rather than the reply content
    pub fn is_transport_error(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::Transport { .. })
    }

    /// Check if the error is a protocol issue
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidFunction { .. }
                | Self::Exception { .. }
                | Self::Frame { .. }
                | Self::NoData { .. }
                | Self::ChecksumMismatch { .. }
        )
    }
}

impl From<std::io::Error> for ModbusError {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string())
    }
}

impl From<serde_json::Error> for ModbusError {
    fn from(err: serde_json::Error) -> Self {
        Self::configuration(format!("JSON error: {}", err))
    }
}

impl From<serde_yaml::Error> for ModbusError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::configuration(format!("YAML error: {}", err))
    }
}

impl From<hex::FromHexError> for ModbusError {
    fn from(err: hex::FromHexError) -> Self {
        Self::frame(format!("invalid ASCII hex: {}", err))
    }
}
