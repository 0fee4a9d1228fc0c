//! # Reply Interpreter
//!
//! Inverse of the envelope framer: classifies a reply received under a given
//! [`EnvelopeKind`], strips the envelope down to the PDU and the PDU down to
//! its data.
//!
//! Classification runs in a fixed order:
//!
//! 1. length/shape check (NoData)
//! 2. exception check on the function code high bit (DeviceException)
//! 3. checksum verification (ChecksumError, or NoData for a missing `:`)
//! 4. otherwise Success
//!
//! ASCII replies are accepted in wire form (`:` + hex + CR LF) and in the
//! compact form `:` + raw bytes + LRC + CR LF; wire-form replies are
//! hex-decoded first.
//!
//! ```rust
//! use modbus_adu::envelope::EnvelopeKind;
//! use modbus_adu::reply::{self, ReplyClass};
//!
//! let rtu = [0x01, 0x03, 0x02, 0x12, 0x34, 0xB5, 0x33];
//! assert_eq!(reply::classify(&rtu, EnvelopeKind::Rtu), ReplyClass::Success);
//!
//! let pdu = reply::strip_to_pdu(&rtu, EnvelopeKind::Rtu).unwrap();
//! let data = reply::strip_to_data(&pdu).unwrap();
//! assert_eq!(reply::decode_u16(&data), Some(0x1234));
//! ```

use std::fmt;
use tracing::{debug, warn};

use crate::checksum;
use crate::envelope::{ascii_to_compact, EnvelopeKind};
use crate::error::{ModbusError, ModbusResult};
use crate::pdu::Frame;
use crate::protocol::{
    ModbusException, ModbusFunction, ASCII_CR, ASCII_LF, ASCII_START, CRC_SIZE, EXCEPTION_FLAG, TCP_HEADER_SIZE,
};
use crate::utils::logging::log_packet;

/// Outcome of classifying a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplyClass {
    /// Well-formed reply with a valid checksum
    Success,
    /// The device rejected the request with this exception code
    DeviceException(u8),
    /// Too short or missing expected markers
    NoData,
    /// CRC-16 or LRC mismatch
    ChecksumError,
}

impl ReplyClass {
    /// Check for [`ReplyClass::Success`]
    pub fn is_success(self) -> bool {
        self == ReplyClass::Success
    }

    /// Exception code of a device exception
    pub fn exception_code(self) -> Option<u8> {
        match self {
            ReplyClass::DeviceException(code) => Some(code),
            _ => None,
        }
    }
}

impl fmt::Display for ReplyClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplyClass::Success => f.write_str("success"),
            ReplyClass::DeviceException(code) => write!(f, "device exception 0x{:02X}", code),
            ReplyClass::NoData => f.write_str("no data"),
            ReplyClass::ChecksumError => f.write_str("checksum error"),
        }
    }
}

/// Detailed classification, kept private; callers see `ReplyClass` or `ModbusError`
enum Verdict {
    Success,
    Exception { function: u8, code: u8 },
    NoData(&'static str),
    Checksum { expected: u16, actual: u16 },
}

impl Verdict {
    fn class(&self) -> ReplyClass {
        match *self {
            Verdict::Success => ReplyClass::Success,
            Verdict::Exception { code, .. } => ReplyClass::DeviceException(code),
            Verdict::NoData(_) => ReplyClass::NoData,
            Verdict::Checksum { .. } => ReplyClass::ChecksumError,
        }
    }
}

/// Offset of the function code byte for each envelope
fn function_offset(kind: EnvelopeKind) -> usize {
    match kind {
        EnvelopeKind::Rtu => 1,
        EnvelopeKind::Tcp | EnvelopeKind::OverTcp => TCP_HEADER_SIZE + 1,
        EnvelopeKind::Ascii => 2,
    }
}

/// Minimum reply length before any other check
fn minimum_length(kind: EnvelopeKind) -> usize {
    match kind {
        EnvelopeKind::Tcp => 3,
        EnvelopeKind::Rtu | EnvelopeKind::OverTcp => 4,
        EnvelopeKind::Ascii => 6,
    }
}

/// Reply interpreter
///
/// The default interpreter is lenient: the TCP length field is not compared
/// with the buffer, and a compact-form ASCII reply needs no trailing CR LF.
/// A wire-form ASCII reply is only recognised with its CR LF; without it the
/// hex characters are checked as raw bytes and fail the LRC. `strict_length`
/// turns both checks on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplyInterpreter {
    strict_length: bool,
    packet_logging: bool,
}

impl ReplyInterpreter {
    /// Lenient interpreter
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject replies whose TCP length field or ASCII terminator is inconsistent
    pub fn strict_length(mut self, enabled: bool) -> Self {
        self.strict_length = enabled;
        self
    }

    /// Enable or disable packet dumps at `trace` level
    pub fn packet_logging(mut self, enabled: bool) -> Self {
        self.packet_logging = enabled;
        self
    }

    /// Classify `reply` as received under `kind`
    pub fn classify(&self, reply: &[u8], kind: EnvelopeKind) -> ReplyClass {
        self.evaluate(reply, kind).class()
    }

    /// Strip envelope overhead, returning the PDU (device id onwards)
    ///
    /// Does not classify; returns `None` for input too short for `kind`.
    pub fn strip_to_pdu(&self, reply: &[u8], kind: EnvelopeKind) -> Option<Frame> {
        match kind {
            EnvelopeKind::Rtu if reply.len() > CRC_SIZE => {
                Some(Frame::from(&reply[..reply.len() - CRC_SIZE]))
            }
            EnvelopeKind::Tcp if reply.len() > TCP_HEADER_SIZE => {
                self.length_consistent(reply).then(|| Frame::from(&reply[TCP_HEADER_SIZE..]))
            }
            EnvelopeKind::OverTcp if reply.len() > TCP_HEADER_SIZE + CRC_SIZE => {
                self.length_consistent(reply)
                    .then(|| Frame::from(&reply[TCP_HEADER_SIZE..reply.len() - CRC_SIZE]))
            }
            EnvelopeKind::Ascii => {
                let compact = ascii_to_compact(reply).unwrap_or_else(|| Frame::from(reply));
                // ':' in front, LRC + CR + LF behind
                if compact.len() <= 4 || !self.terminated(&compact) {
                    return None;
                }
                Some(compact.slice(1, compact.len() - 3))
            }
            _ => None,
        }
    }

    /// Classify, strip and return the reply data
    ///
    /// Classifications other than success map to [`ModbusError`] values.
    pub fn interpret(&self, reply: &[u8], kind: EnvelopeKind) -> ModbusResult<Frame> {
        match self.evaluate(reply, kind) {
            Verdict::Success => {
                let pdu = self
                    .strip_to_pdu(reply, kind)
                    .ok_or_else(|| ModbusError::no_data("reply has no PDU"))?;
                strip_to_data(&pdu).ok_or_else(|| ModbusError::no_data("reply PDU has no data"))
            }
            Verdict::Exception { function, code } => Err(ModbusError::exception(function, code)),
            Verdict::NoData(reason) => Err(ModbusError::no_data(reason)),
            Verdict::Checksum { expected, actual } => Err(ModbusError::checksum_mismatch(expected, actual)),
        }
    }

    /// Interpret `reply` and decode the first data word
    pub fn interpret_u16(&self, reply: &[u8], kind: EnvelopeKind) -> ModbusResult<u16> {
        let data = self.interpret(reply, kind)?;
        decode_u16(&data).ok_or_else(|| ModbusError::no_data("reply data shorter than 2 bytes"))
    }

    fn evaluate(&self, reply: &[u8], kind: EnvelopeKind) -> Verdict {
        if self.packet_logging {
            log_packet("recv", reply, &kind.to_string(), None);
        }

        let compact = match kind {
            EnvelopeKind::Ascii => ascii_to_compact(reply),
            _ => None,
        };
        let frame = compact.as_deref().unwrap_or(reply);

        let verdict = self.check(frame, kind);
        match &verdict {
            Verdict::Checksum { expected, actual } => {
                warn!(envelope = %kind, expected, actual, "reply checksum mismatch")
            }
            Verdict::Exception { function, code } => {
                let exception = ModbusException::from_u8(*code)
                    .map_or_else(|| format!("unknown (0x{:02X})", code), |exception| exception.to_string());
                debug!(envelope = %kind, function, %exception, "device exception reply")
            }
            verdict => debug!(envelope = %kind, class = %verdict.class(), "classified reply"),
        }
        verdict
    }

    fn check(&self, frame: &[u8], kind: EnvelopeKind) -> Verdict {
        if frame.len() < minimum_length(kind) {
            return Verdict::NoData("reply too short");
        }
        if matches!(kind, EnvelopeKind::Tcp | EnvelopeKind::OverTcp) && !self.length_consistent(frame) {
            return Verdict::NoData("TCP length field does not match reply length");
        }
        if kind == EnvelopeKind::Ascii && !self.terminated(frame) {
            return Verdict::NoData("ASCII reply missing CR LF");
        }

        let offset = function_offset(kind);
        let function = match frame.get(offset) {
            Some(&function) => function,
            None => return Verdict::NoData("reply has no function code"),
        };
        if function & EXCEPTION_FLAG != 0 {
            return match frame.get(offset + 1) {
                Some(&code) => Verdict::Exception { function: function & !EXCEPTION_FLAG, code },
                None => Verdict::NoData("exception reply has no exception code"),
            };
        }

        match kind {
            EnvelopeKind::Tcp => Verdict::Success,
            EnvelopeKind::Rtu => verify_crc(frame),
            EnvelopeKind::OverTcp => {
                let body = &frame[TCP_HEADER_SIZE..];
                if body.len() < 4 {
                    return Verdict::NoData("Over-TCP reply too short for CRC");
                }
                verify_crc(body)
            }
            EnvelopeKind::Ascii => {
                if frame[0] != ASCII_START {
                    return Verdict::NoData("ASCII reply missing ':' delimiter");
                }
                let lrc_at = frame.len() - 3;
                let expected = checksum::lrc(&frame[1..lrc_at]);
                let actual = frame[lrc_at];
                if expected == actual {
                    Verdict::Success
                } else {
                    Verdict::Checksum { expected: expected as u16, actual: actual as u16 }
                }
            }
        }
    }

    /// TCP length field agrees with the buffer (always true unless strict)
    fn length_consistent(&self, frame: &[u8]) -> bool {
        if !self.strict_length {
            return true;
        }
        frame.len() >= TCP_HEADER_SIZE
            && u16::from_be_bytes([frame[4], frame[5]]) as usize == frame.len() - TCP_HEADER_SIZE
    }

    /// ASCII frame ends in CR LF (always true unless strict)
    fn terminated(&self, frame: &[u8]) -> bool {
        !self.strict_length || frame.ends_with(&[ASCII_CR, ASCII_LF])
    }
}

fn verify_crc(frame: &[u8]) -> Verdict {
    if checksum::verify_crc(frame) {
        return Verdict::Success;
    }
    let expected = checksum::crc16(&frame[..frame.len() - CRC_SIZE]);
    let actual = checksum::trailing_crc(frame).unwrap_or_default();
    Verdict::Checksum { expected, actual }
}

/// Classify `reply` with a lenient interpreter
pub fn classify(reply: &[u8], kind: EnvelopeKind) -> ReplyClass {
    ReplyInterpreter::new().classify(reply, kind)
}

/// Strip envelope overhead with a lenient interpreter
pub fn strip_to_pdu(reply: &[u8], kind: EnvelopeKind) -> Option<Frame> {
    ReplyInterpreter::new().strip_to_pdu(reply, kind)
}

/// Strip device id, function code and (except for FC5/FC6) the byte count
///
/// Returns `None` for exception PDUs and when no data byte would remain.
pub fn strip_to_data(pdu: &[u8]) -> Option<Frame> {
    let function = *pdu.get(1)?;
    if function & EXCEPTION_FLAG != 0 {
        return None;
    }
    let single_write = ModbusFunction::from_u8(function).map_or(false, ModbusFunction::is_single_write);
    let skip = if single_write { 2 } else { 3 };
    if pdu.len() <= skip {
        return None;
    }
    Some(Frame::from(&pdu[skip..]))
}

/// First two data bytes as a big-endian `u16`
pub fn decode_u16(data: &[u8]) -> Option<u16> {
    match data {
        [high, low, ..] => Some(u16::from_be_bytes([*high, *low])),
        _ => None,
    }
}

/// All complete big-endian words of `data`; a trailing odd byte is ignored
pub fn decode_registers(data: &[u8]) -> Vec<u16> {
    data.chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect()
}

/// Unpack `count` bits, least significant bit of each byte first
///
/// Bits beyond the end of `data` read as `false`.
pub fn decode_bits(data: &[u8], count: usize) -> Vec<bool> {
    (0..count)
        .map(|i| data.get(i / 8).map_or(false, |byte| byte & (1 << (i % 8)) != 0))
        .collect()
}
