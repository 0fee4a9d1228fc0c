//! # PDU Builder
//!
//! Produces the protocol-data-unit skeleton for the eight supported
//! operations. No checksum and no envelope is applied here; see
//! [`envelope`](crate::envelope) for that.
//!
//! ## Layouts
//!
//! ```text
//! FC 1-6 : [id, fc, addrHi, addrLo, valueHi, valueLo]
//! FC 15  : [id, 15, addrHi, addrLo, countHi, countLo, byteCount, bits...]
//! FC 16  : [id, 16, addrHi, addrLo, countHi, countLo, byteCount, regHi, regLo, ...]
//! ```
//!
//! Address, count and value fields are never range checked. Anything outside
//! `0..=65535` is truncated to its low 16 bits so that non-conforming devices
//! can still be addressed.
//!
//! ```rust
//! use modbus_adu::pdu;
//!
//! let frame = pdu::read_holding_registers(10, 1, 3);
//! assert_eq!(frame, [10u8, 3, 0, 1, 0, 3]);
//! ```

use std::fmt;
use std::ops::Deref;
use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{ModbusError, ModbusResult};
use crate::protocol::{DeviceId, FieldValue, ModbusFunction};
use crate::utils::format;

/// Immutable byte sequence holding a PDU or a complete ADU
///
/// Every transform in the engine returns a new `Frame`; clones share the
/// underlying buffer.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Frame(Bytes);

impl Frame {
    /// Wrap an existing buffer
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// Borrow the frame content
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume the frame, returning the shared buffer
    pub fn into_bytes(self) -> Bytes {
        self.0
    }

    /// Zero-copy sub-frame
    pub(crate) fn slice(&self, start: usize, end: usize) -> Frame {
        Frame(self.0.slice(start..end))
    }
}

impl Deref for Frame {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Frame {
    fn from(bytes: Vec<u8>) -> Self {
        Self(Bytes::from(bytes))
    }
}

impl From<&[u8]> for Frame {
    fn from(bytes: &[u8]) -> Self {
        Self(Bytes::copy_from_slice(bytes))
    }
}

impl From<Bytes> for Frame {
    fn from(bytes: Bytes) -> Self {
        Self(bytes)
    }
}

impl From<BytesMut> for Frame {
    fn from(bytes: BytesMut) -> Self {
        Self(bytes.freeze())
    }
}

impl PartialEq<[u8]> for Frame {
    fn eq(&self, other: &[u8]) -> bool {
        self.as_bytes() == other
    }
}

impl PartialEq<&[u8]> for Frame {
    fn eq(&self, other: &&[u8]) -> bool {
        self.as_bytes() == *other
    }
}

impl PartialEq<Vec<u8>> for Frame {
    fn eq(&self, other: &Vec<u8>) -> bool {
        self.as_bytes() == other.as_slice()
    }
}

impl<const N: usize> PartialEq<[u8; N]> for Frame {
    fn eq(&self, other: &[u8; N]) -> bool {
        self.as_bytes() == other.as_slice()
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame[{}]", format::bytes_to_hex(&self.0))
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format::bytes_to_hex(&self.0))
    }
}

/// Low 16 bits of a caller-supplied field
#[inline]
fn field(value: FieldValue) -> u16 {
    value as u16
}

/// Build the fixed 6-byte skeleton shared by function codes 1 to 6
pub fn six_byte_command(
    device_id: DeviceId,
    function: ModbusFunction,
    address: FieldValue,
    value: FieldValue,
) -> Frame {
    let mut pdu = BytesMut::with_capacity(6);
    pdu.put_u8(device_id);
    pdu.put_u8(function.to_u8());
    pdu.put_u16(field(address));
    pdu.put_u16(field(value));
    pdu.into()
}

/// Read Coils (0x01)
pub fn read_coils(device_id: DeviceId, first_coil: FieldValue, count: FieldValue) -> Frame {
    six_byte_command(device_id, ModbusFunction::ReadCoils, first_coil, count)
}

/// Read Discrete Inputs (0x02)
pub fn read_discrete_inputs(device_id: DeviceId, first_input: FieldValue, count: FieldValue) -> Frame {
    six_byte_command(device_id, ModbusFunction::ReadDiscreteInputs, first_input, count)
}

/// Read Holding Registers (0x03)
pub fn read_holding_registers(device_id: DeviceId, first_register: FieldValue, count: FieldValue) -> Frame {
    six_byte_command(device_id, ModbusFunction::ReadHoldingRegisters, first_register, count)
}

/// Read Input Registers (0x04)
pub fn read_input_registers(device_id: DeviceId, first_register: FieldValue, count: FieldValue) -> Frame {
    six_byte_command(device_id, ModbusFunction::ReadInputRegisters, first_register, count)
}

/// Write Single Coil (0x05)
///
/// `value` is written verbatim; standard devices expect `0xFF00` for ON and
/// `0x0000` for OFF.
pub fn write_single_coil(device_id: DeviceId, address: FieldValue, value: FieldValue) -> Frame {
    six_byte_command(device_id, ModbusFunction::WriteSingleCoil, address, value)
}

/// Write Single Register (0x06)
pub fn write_single_register(device_id: DeviceId, address: FieldValue, value: FieldValue) -> Frame {
    six_byte_command(device_id, ModbusFunction::WriteSingleRegister, address, value)
}

/// Write Multiple Registers (0x10)
///
/// Register count and byte count are derived from `values`.
pub fn write_multiple_registers(device_id: DeviceId, first_register: FieldValue, values: &[FieldValue]) -> Frame {
    let mut pdu = BytesMut::with_capacity(7 + values.len() * 2);
    pdu.put_u8(device_id);
    pdu.put_u8(ModbusFunction::WriteMultipleRegisters.to_u8());
    pdu.put_u16(field(first_register));
    pdu.put_u16(values.len() as u16);
    pdu.put_u8((values.len() * 2) as u8);
    for &value in values {
        pdu.put_u16(field(value));
    }
    pdu.into()
}

/// Write Multiple Registers (0x10) from register values already packed big-endian
///
/// The register count is `packed.len() / 2`; the bytes are copied unchanged.
pub fn write_multiple_registers_raw(device_id: DeviceId, first_register: FieldValue, packed: &[u8]) -> Frame {
    let mut pdu = BytesMut::with_capacity(7 + packed.len());
    pdu.put_u8(device_id);
    pdu.put_u8(ModbusFunction::WriteMultipleRegisters.to_u8());
    pdu.put_u16(field(first_register));
    pdu.put_u16((packed.len() / 2) as u16);
    pdu.put_u8(packed.len() as u8);
    pdu.put_slice(packed);
    pdu.into()
}

/// Write Multiple Coils (0x0F)
///
/// A coil is ON when its value is strictly positive. The data section is
/// always `len / 8 + 1` bytes, one more than needed when the coil count is a
/// multiple of eight; devices in the field depend on that layout.
pub fn write_multiple_coils(device_id: DeviceId, first_coil: FieldValue, values: &[FieldValue]) -> Frame {
    let byte_count = values.len() / 8 + 1;
    let mut bits = vec![0u8; byte_count];
    for (index, &value) in values.iter().enumerate() {
        if value > 0 {
            bits[index / 8] |= 1 << (index % 8);
        }
    }

    let mut pdu = BytesMut::with_capacity(7 + byte_count);
    pdu.put_u8(device_id);
    pdu.put_u8(ModbusFunction::WriteMultipleCoils.to_u8());
    pdu.put_u16(field(first_coil));
    pdu.put_u16(values.len() as u16);
    pdu.put_u8(byte_count as u8);
    pdu.put_slice(&bits);
    pdu.into()
}

/// One of the supported operations with its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    ReadCoils { address: FieldValue, count: FieldValue },
    ReadDiscreteInputs { address: FieldValue, count: FieldValue },
    ReadHoldingRegisters { address: FieldValue, count: FieldValue },
    ReadInputRegisters { address: FieldValue, count: FieldValue },
    WriteSingleCoil { address: FieldValue, value: FieldValue },
    WriteSingleRegister { address: FieldValue, value: FieldValue },
    WriteMultipleCoils { address: FieldValue, values: Vec<FieldValue> },
    WriteMultipleRegisters { address: FieldValue, values: Vec<FieldValue> },
    /// FC16 with register data already packed big-endian
    WriteMultipleRegistersRaw { address: FieldValue, packed: Bytes },
}

/// Typed request addressed to one device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModbusRequest {
    pub device_id: DeviceId,
    pub operation: Operation,
}

impl ModbusRequest {
    /// Create a new request
    pub fn new(device_id: DeviceId, operation: Operation) -> Self {
        Self { device_id, operation }
    }

    /// Build a request from a raw function code, an address and a value list
    ///
    /// FC15 and FC16 take every value; the other codes use the first value,
    /// or zero when the list is empty.
    pub fn from_parts(
        device_id: DeviceId,
        code: u8,
        address: FieldValue,
        values: &[FieldValue],
    ) -> ModbusResult<Self> {
        let first = values.first().copied().unwrap_or(0);
        let operation = match ModbusFunction::from_u8(code)? {
            ModbusFunction::ReadCoils => Operation::ReadCoils { address, count: first },
            ModbusFunction::ReadDiscreteInputs => Operation::ReadDiscreteInputs { address, count: first },
            ModbusFunction::ReadHoldingRegisters => Operation::ReadHoldingRegisters { address, count: first },
            ModbusFunction::ReadInputRegisters => Operation::ReadInputRegisters { address, count: first },
            ModbusFunction::WriteSingleCoil => Operation::WriteSingleCoil { address, value: first },
            ModbusFunction::WriteSingleRegister => Operation::WriteSingleRegister { address, value: first },
            ModbusFunction::WriteMultipleCoils => Operation::WriteMultipleCoils {
                address,
                values: values.to_vec(),
            },
            ModbusFunction::WriteMultipleRegisters => Operation::WriteMultipleRegisters {
                address,
                values: values.to_vec(),
            },
        };
        Ok(Self::new(device_id, operation))
    }

    /// Function code of this request
    pub fn function(&self) -> ModbusFunction {
        match self.operation {
            Operation::ReadCoils { .. } => ModbusFunction::ReadCoils,
            Operation::ReadDiscreteInputs { .. } => ModbusFunction::ReadDiscreteInputs,
            Operation::ReadHoldingRegisters { .. } => ModbusFunction::ReadHoldingRegisters,
            Operation::ReadInputRegisters { .. } => ModbusFunction::ReadInputRegisters,
            Operation::WriteSingleCoil { .. } => ModbusFunction::WriteSingleCoil,
            Operation::WriteSingleRegister { .. } => ModbusFunction::WriteSingleRegister,
            Operation::WriteMultipleCoils { .. } => ModbusFunction::WriteMultipleCoils,
            Operation::WriteMultipleRegisters { .. }
            | Operation::WriteMultipleRegistersRaw { .. } => ModbusFunction::WriteMultipleRegisters,
        }
    }

    /// Build the PDU for this request
    pub fn to_pdu(&self) -> Frame {
        let id = self.device_id;
        match &self.operation {
            Operation::ReadCoils { address, count }
            | Operation::ReadDiscreteInputs { address, count }
            | Operation::ReadHoldingRegisters { address, count }
            | Operation::ReadInputRegisters { address, count } => {
                six_byte_command(id, self.function(), *address, *count)
            }
            Operation::WriteSingleCoil { address, value }
            | Operation::WriteSingleRegister { address, value } => {
                six_byte_command(id, self.function(), *address, *value)
            }
            Operation::WriteMultipleCoils { address, values } => write_multiple_coils(id, *address, values),
            Operation::WriteMultipleRegisters { address, values } => write_multiple_registers(id, *address, values),
            Operation::WriteMultipleRegistersRaw { address, packed } => {
                write_multiple_registers_raw(id, *address, packed)
            }
        }
    }
}

impl TryFrom<(DeviceId, u8, FieldValue, &[FieldValue])> for ModbusRequest {
    type Error = ModbusError;

    fn try_from(parts: (DeviceId, u8, FieldValue, &[FieldValue])) -> ModbusResult<Self> {
        Self::from_parts(parts.0, parts.1, parts.2, parts.3)
    }
}
