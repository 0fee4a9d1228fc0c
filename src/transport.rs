//! # Frame Sender
//!
//! The engine performs no I/O. Serial ports, TCP and UDP sockets live behind
//! [`FrameSender`], implemented outside this crate: it accepts an opaque
//! request frame and returns the raw reply frame. Transport failures are
//! reported as `ModbusError::Io`/`ModbusError::Transport` and are never
//! inspected by the engine.
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use modbus_adu::pdu::Frame;
//! use modbus_adu::transport::FrameSender;
//! use modbus_adu::ModbusResult;
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl FrameSender for Echo {
//!     async fn send(&mut self, frame: &Frame) -> ModbusResult<Frame> {
//!         Ok(frame.clone())
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::error::ModbusResult;
use crate::pdu::Frame;

/// Transport collaborator: sends one frame, returns the reply frame
#[async_trait]
pub trait FrameSender: Send + Sync {
    /// Send `frame` and wait for the reply
    async fn send(&mut self, frame: &Frame) -> ModbusResult<Frame>;
}

#[async_trait]
impl<T: FrameSender + ?Sized> FrameSender for Box<T> {
    async fn send(&mut self, frame: &Frame) -> ModbusResult<Frame> {
        (**self).send(frame).await
    }
}

/// Exchange statistics kept by [`AduClient`](crate::client::AduClient)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportStats {
    pub requests_sent: u64,
    pub replies_received: u64,
    pub errors: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
}
