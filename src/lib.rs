//! # Modbus ADU - Frame Builder and Reply Interpreter
//!
//! Builds Modbus request frames and interprets reply frames without touching
//! any port or socket. A PDU (device id, function code, payload) is wrapped in
//! one of four envelopes; replies are classified, verified and stripped back
//! down to their data bytes.
//!
//! ## Envelopes
//!
//! | Code | Envelope | Layout |
//! |------|----------|--------|
//! | 1 | RTU | `PDU CRC-lo CRC-hi` |
//! | 2 | TCP / UDP | `txn(2) 00 00 len(2) PDU` |
//! | 3 | Over-TCP | `txn(2) 00 00 len(2) PDU CRC-lo CRC-hi` |
//! | 4 | ASCII | `':' HEX(PDU LRC) CR LF` |
//!
//! ## Supported Function Codes
//!
//! | Code | Function | Builder | Client |
//! |------|----------|---------|--------|
//! | 0x01 | Read Coils | ✅ | ✅ |
//! | 0x02 | Read Discrete Inputs | ✅ | ✅ |
//! | 0x03 | Read Holding Registers | ✅ | ✅ |
//! | 0x04 | Read Input Registers | ✅ | ✅ |
//! | 0x05 | Write Single Coil | ✅ | ✅ |
//! | 0x06 | Write Single Register | ✅ | ✅ |
//! | 0x0F | Write Multiple Coils | ✅ | ✅ |
//! | 0x10 | Write Multiple Registers | ✅ | ✅ |
//!
//! ## Quick Start
//!
//! ```rust
//! use modbus_adu::{pdu, EnvelopeFramer, EnvelopeKind, ReplyInterpreter, TransactionCounter};
//!
//! let framer = EnvelopeFramer::with_sequence(TransactionCounter::new());
//! let frame = framer.wrap(EnvelopeKind::Rtu, &pdu::read_holding_registers(10, 1, 3));
//! assert_eq!(frame, [10u8, 3, 0, 1, 0, 3, 0x55, 0x70]);
//!
//! let reply = [0x01, 0x03, 0x02, 0x12, 0x34, 0xB5, 0x33];
//! let value = ReplyInterpreter::new().interpret_u16(&reply, EnvelopeKind::Rtu)?;
//! assert_eq!(value, 0x1234);
//! # Ok::<(), modbus_adu::ModbusError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   Application   │
//! └─────────────────┘
//!          │
//! ┌─────────────────┐    ┌─────────────────┐
//! │    AduClient    │───►│   FrameSender   │  (serial / socket, external)
//! └─────────────────┘    └─────────────────┘
//!          │
//! ┌─────────────────┐    ┌─────────────────┐
//! │  PDU Builder    │    │ Reply           │
//! │  Envelope Framer│    │ Interpreter     │
//! └─────────────────┘    └─────────────────┘
//!          │                       │
//! ┌─────────────────────────────────────────┐
//! │  Checksum Engine   Transaction Counter  │
//! └─────────────────────────────────────────┘
//! ```

/// Core error types and result handling
pub mod error;

/// Function codes, exception codes and frame constants
pub mod protocol;

/// Frames, PDU builders and typed requests
pub mod pdu;

/// CRC-16 and LRC
pub mod checksum;

/// Transaction id sources
pub mod transaction;

/// Envelope framing
pub mod envelope;

/// Reply classification and stripping
pub mod reply;

/// Transport collaborator trait
pub mod transport;

/// Request/reply client
pub mod client;

/// Engine configuration
pub mod config;

/// Formatting and packet logging helpers
pub mod utils;

// Re-export main types for convenience
pub use error::{ModbusError, ModbusResult};
pub use protocol::{ModbusException, ModbusFunction};
pub use pdu::{Frame, ModbusRequest, Operation};
pub use transaction::{TransactionCounter, TransactionIdSource};
pub use envelope::{EnvelopeFramer, EnvelopeKind};
pub use reply::{ReplyClass, ReplyInterpreter};
pub use transport::{FrameSender, TransportStats};
pub use client::{AduClient, ModbusClient};
pub use config::EngineConfig;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library information
pub fn info() -> String {
    format!("Modbus ADU v{} - Modbus RTU/TCP/ASCII frame builder and reply interpreter", VERSION)
}
