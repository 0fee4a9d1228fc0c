//! # Envelope Framer
//!
//! Wraps a PDU into one of the four wire envelopes.
//!
//! | Envelope | Layout |
//! |----------|--------|
//! | RTU      | `id, fc, ..., crcLo, crcHi` |
//! | TCP/UDP  | `txnHi, txnLo, 0x00, 0x00, lenHi, lenLo, id, fc, ...` |
//! | Over-TCP | `txnHi, txnLo, 0x00, 0x00, lenHi, lenLo, id, fc, ..., crcLo, crcHi` |
//! | ASCII    | `':', hex(id), hex(fc), hex(...), hex(lrc), CR, LF` |
//!
//! The TCP-based envelopes take their transaction id from the framer's
//! [`TransactionIdSource`]. The `wrap_*` free functions are pure and take the
//! id explicitly.
//!
//! ```rust
//! use modbus_adu::envelope::{EnvelopeFramer, EnvelopeKind};
//! use modbus_adu::pdu;
//! use modbus_adu::transaction::TransactionCounter;
//!
//! let framer = EnvelopeFramer::with_sequence(TransactionCounter::new());
//! let frame = framer.wrap(EnvelopeKind::Tcp, &pdu::read_holding_registers(1, 0, 2));
//! assert_eq!(frame, [0u8, 1, 0, 0, 0, 6, 1, 3, 0, 0, 0, 2]);
//! ```

use std::fmt;
use std::str::FromStr;
use bytes::{BufMut, BytesMut};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::checksum;
use crate::error::{ModbusError, ModbusResult};
use crate::pdu::{Frame, ModbusRequest};
use crate::protocol::{
    ModbusFunction, ASCII_CR, ASCII_LF, ASCII_START, COMPACT_TCP_HEADER_SIZE, TCP_HEADER_SIZE,
};
use crate::transaction::{global_counter, TransactionCounter, TransactionIdSource};
use crate::utils::logging::log_packet;

/// On-the-wire envelope of a frame
///
/// The numeric codes (1-4) are the ones used by configuration files and the
/// demo driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[repr(u8)]
pub enum EnvelopeKind {
    /// Raw PDU followed by CRC-16
    #[default]
    Rtu = 1,
    /// 6-byte header, no checksum
    #[serde(alias = "udp")]
    Tcp = 2,
    /// TCP/UDP header around a CRC-checked PDU
    OverTcp = 3,
    /// `:` + hex characters + LRC + CR LF
    Ascii = 4,
}

impl EnvelopeKind {
    /// All envelope kinds, in code order
    pub const ALL: [EnvelopeKind; 4] = [
        EnvelopeKind::Rtu,
        EnvelopeKind::Tcp,
        EnvelopeKind::OverTcp,
        EnvelopeKind::Ascii,
    ];

    /// Convert from the numeric code
    pub fn from_u8(code: u8) -> ModbusResult<Self> {
        match code {
            1 => Ok(EnvelopeKind::Rtu),
            2 => Ok(EnvelopeKind::Tcp),
            3 => Ok(EnvelopeKind::OverTcp),
            4 => Ok(EnvelopeKind::Ascii),
            _ => Err(ModbusError::unsupported_envelope(code)),
        }
    }

    /// Numeric code
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Whether a transaction id is consumed when framing
    pub fn uses_transaction_id(self) -> bool {
        matches!(self, EnvelopeKind::Tcp | EnvelopeKind::OverTcp)
    }

    /// Whether a CRC-16 trailer is carried
    pub fn uses_crc(self) -> bool {
        matches!(self, EnvelopeKind::Rtu | EnvelopeKind::OverTcp)
    }

    fn label(self) -> &'static str {
        match self {
            EnvelopeKind::Rtu => "RTU",
            EnvelopeKind::Tcp => "TCP",
            EnvelopeKind::OverTcp => "OVER-TCP",
            EnvelopeKind::Ascii => "ASCII",
        }
    }
}

impl TryFrom<u8> for EnvelopeKind {
    type Error = ModbusError;

    fn try_from(code: u8) -> ModbusResult<Self> {
        Self::from_u8(code)
    }
}

impl FromStr for EnvelopeKind {
    type Err = ModbusError;

    fn from_str(s: &str) -> ModbusResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "rtu" | "1" => Ok(EnvelopeKind::Rtu),
            "tcp" | "udp" | "2" => Ok(EnvelopeKind::Tcp),
            "over-tcp" | "overtcp" | "rtu-over-tcp" | "3" => Ok(EnvelopeKind::OverTcp),
            "ascii" | "4" => Ok(EnvelopeKind::Ascii),
            other => Err(ModbusError::configuration(format!("unsupported envelope kind: {}", other))),
        }
    }
}

impl fmt::Display for EnvelopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// RTU: PDU followed by its CRC-16, low byte first
pub fn wrap_rtu(pdu: &[u8]) -> Frame {
    checksum::apply_crc(pdu)
}

/// TCP/UDP: 6-byte header followed by the PDU, no checksum
pub fn wrap_tcp(transaction_id: u16, pdu: &[u8]) -> Frame {
    let mut frame = BytesMut::with_capacity(TCP_HEADER_SIZE + pdu.len());
    frame.put_u16(transaction_id);
    frame.put_u16(0); // protocol id
    frame.put_u16(pdu.len() as u16);
    frame.put_slice(pdu);
    frame.into()
}

/// Over-TCP: the CRC-checked PDU wrapped in the TCP/UDP header
///
/// The length field counts the two CRC bytes.
pub fn wrap_over_tcp(transaction_id: u16, pdu: &[u8]) -> Frame {
    wrap_tcp(transaction_id, &checksum::apply_crc(pdu))
}

/// Length-optimized TCP header
///
/// Single-value writes (FC5, FC6) get a 4-byte header without the length
/// field; every other function code gets the standard 6-byte header.
pub fn wrap_compact_tcp(transaction_id: u16, pdu: &[u8]) -> Frame {
    let single_write = pdu
        .get(1)
        .and_then(|&code| ModbusFunction::from_u8(code).ok())
        .map_or(false, ModbusFunction::is_single_write);
    if !single_write {
        return wrap_tcp(transaction_id, pdu);
    }

    let mut frame = BytesMut::with_capacity(COMPACT_TCP_HEADER_SIZE + pdu.len());
    frame.put_u16(transaction_id);
    frame.put_u16(0);
    frame.put_slice(pdu);
    frame.into()
}

/// ASCII: `:` + uppercase hex of `PDU || LRC` + CR LF
pub fn wrap_ascii(pdu: &[u8]) -> Frame {
    let body = hex::encode_upper(checksum::apply_lrc(pdu));
    let mut frame = BytesMut::with_capacity(body.len() + 3);
    frame.put_u8(ASCII_START);
    frame.put_slice(body.as_bytes());
    frame.put_u8(ASCII_CR);
    frame.put_u8(ASCII_LF);
    frame.into()
}

/// Decode a wire-form ASCII frame back to its PDU
///
/// Strips the delimiter and terminator, hex-decodes the body, verifies and
/// strips the LRC.
pub fn decode_ascii(frame: &[u8]) -> ModbusResult<Frame> {
    let body = ascii_body(frame)
        .ok_or_else(|| ModbusError::no_data("ASCII frame missing ':' delimiter or CR LF"))?;
    let raw = hex::decode(body)?;
    let (&actual, pdu) = raw
        .split_last()
        .ok_or_else(|| ModbusError::no_data("ASCII frame has no LRC"))?;
    let expected = checksum::lrc(pdu);
    if expected != actual {
        return Err(ModbusError::checksum_mismatch(expected as u16, actual as u16));
    }
    Ok(Frame::from(pdu))
}

/// Hex body between `:` and CR LF
fn ascii_body(frame: &[u8]) -> Option<&[u8]> {
    let rest = frame.strip_prefix(&[ASCII_START])?;
    rest.strip_suffix(&[ASCII_CR, ASCII_LF])
}

/// Convert a wire-form ASCII reply to the compact form `':' raw.. lrc CR LF`
///
/// Returns `None` when `frame` is not a well-formed hex envelope, which
/// includes frames already in compact form: the function code byte of a
/// compact body never falls in the ASCII hex digit range.
pub(crate) fn ascii_to_compact(frame: &[u8]) -> Option<Frame> {
    let body = ascii_body(frame)?;
    if body.is_empty() || !body.iter().all(u8::is_ascii_hexdigit) {
        return None;
    }
    let raw = hex::decode(body).ok()?;
    let mut compact = BytesMut::with_capacity(raw.len() + 3);
    compact.put_u8(ASCII_START);
    compact.put_slice(&raw);
    compact.put_u8(ASCII_CR);
    compact.put_u8(ASCII_LF);
    Some(compact.into())
}

/// Wraps PDUs into envelopes, drawing transaction ids from `S`
///
/// `EnvelopeFramer::new()` uses the process-wide counter; use
/// [`with_sequence`](EnvelopeFramer::with_sequence) to inject another source.
#[derive(Debug, Clone)]
pub struct EnvelopeFramer<S = &'static TransactionCounter> {
    sequence: S,
    compact_tcp_header: bool,
    packet_logging: bool,
}

impl EnvelopeFramer {
    /// Framer backed by the process-wide transaction counter
    pub fn new() -> Self {
        Self::with_sequence(global_counter())
    }
}

impl Default for EnvelopeFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: TransactionIdSource> EnvelopeFramer<S> {
    /// Framer with an injected transaction id source
    pub fn with_sequence(sequence: S) -> Self {
        Self {
            sequence,
            compact_tcp_header: false,
            packet_logging: false,
        }
    }

    /// Use the length-optimized header for TCP/UDP single-value writes
    pub fn compact_tcp_header(mut self, enabled: bool) -> Self {
        self.compact_tcp_header = enabled;
        self
    }

    /// Enable or disable packet dumps at `trace` level
    pub fn packet_logging(mut self, enabled: bool) -> Self {
        self.packet_logging = enabled;
        self
    }

    /// The transaction id source
    pub fn sequence(&self) -> &S {
        &self.sequence
    }

    /// Wrap `pdu` in the envelope `kind`
    pub fn wrap(&self, kind: EnvelopeKind, pdu: &[u8]) -> Frame {
        let frame = match kind {
            EnvelopeKind::Rtu => wrap_rtu(pdu),
            EnvelopeKind::Tcp if self.compact_tcp_header => {
                wrap_compact_tcp(self.sequence.next_transaction_id(), pdu)
            }
            EnvelopeKind::Tcp => wrap_tcp(self.sequence.next_transaction_id(), pdu),
            EnvelopeKind::OverTcp => wrap_over_tcp(self.sequence.next_transaction_id(), pdu),
            EnvelopeKind::Ascii => wrap_ascii(pdu),
        };

        debug!(envelope = %kind, pdu_len = pdu.len(), frame_len = frame.len(), "built frame");
        if self.packet_logging {
            log_packet("send", &frame, kind.label(), pdu.first().copied());
        }
        frame
    }

    /// Wrap `pdu` using a numeric envelope code
    ///
    /// Codes outside 1..=4 are a configuration error and consume no
    /// transaction id.
    pub fn wrap_code(&self, code: u8, pdu: &[u8]) -> ModbusResult<Frame> {
        Ok(self.wrap(EnvelopeKind::from_u8(code)?, pdu))
    }

    /// Wrap the length-optimized TCP variant regardless of configuration
    pub fn wrap_compact_tcp(&self, pdu: &[u8]) -> Frame {
        wrap_compact_tcp(self.sequence.next_transaction_id(), pdu)
    }

    /// Build the PDU of `request` and wrap it
    pub fn encode(&self, kind: EnvelopeKind, request: &ModbusRequest) -> Frame {
        self.wrap(kind, &request.to_pdu())
    }
}
