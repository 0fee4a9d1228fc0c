//! Request/reply helper built on the framing engine
//!
//! One call builds the PDU, wraps it in the configured envelope, hands it to
//! the [`FrameSender`] and interprets the reply. There are no retries and no
//! connection handling; errors are returned to the caller as-is.

use async_trait::async_trait;
use tracing::debug;

use crate::envelope::{EnvelopeFramer, EnvelopeKind};
use crate::error::{ModbusError, ModbusResult};
use crate::pdu::{Frame, ModbusRequest, Operation};
use crate::protocol::DeviceId;
use crate::reply::{decode_bits, decode_registers, ReplyInterpreter};
use crate::transaction::{TransactionCounter, TransactionIdSource};
use crate::transport::{FrameSender, TransportStats};

/// Client operations, one per supported function code
#[async_trait]
pub trait ModbusClient: Send + Sync {
    /// Read coils (function code 0x01)
    async fn read_01(&mut self, device_id: DeviceId, address: u16, quantity: u16) -> ModbusResult<Vec<bool>>;

    /// Read discrete inputs (function code 0x02)
    async fn read_02(&mut self, device_id: DeviceId, address: u16, quantity: u16) -> ModbusResult<Vec<bool>>;

    /// Read holding registers (function code 0x03)
    async fn read_03(&mut self, device_id: DeviceId, address: u16, quantity: u16) -> ModbusResult<Vec<u16>>;

    /// Read input registers (function code 0x04)
    async fn read_04(&mut self, device_id: DeviceId, address: u16, quantity: u16) -> ModbusResult<Vec<u16>>;

    /// Write single coil (function code 0x05)
    async fn write_05(&mut self, device_id: DeviceId, address: u16, value: bool) -> ModbusResult<()>;

    /// Write single register (function code 0x06)
    async fn write_06(&mut self, device_id: DeviceId, address: u16, value: u16) -> ModbusResult<()>;

    /// Write multiple coils (function code 0x0F)
    async fn write_0f(&mut self, device_id: DeviceId, address: u16, values: &[bool]) -> ModbusResult<()>;

    /// Write multiple registers (function code 0x10)
    async fn write_10(&mut self, device_id: DeviceId, address: u16, values: &[u16]) -> ModbusResult<()>;

    /// Get exchange statistics
    fn get_stats(&self) -> TransportStats;

    async fn read_coils(&mut self, device_id: DeviceId, address: u16, quantity: u16) -> ModbusResult<Vec<bool>> {
        self.read_01(device_id, address, quantity).await
    }

    async fn read_discrete_inputs(&mut self, device_id: DeviceId, address: u16, quantity: u16) -> ModbusResult<Vec<bool>> {
        self.read_02(device_id, address, quantity).await
    }

    async fn read_holding_registers(&mut self, device_id: DeviceId, address: u16, quantity: u16) -> ModbusResult<Vec<u16>> {
        self.read_03(device_id, address, quantity).await
    }

    async fn read_input_registers(&mut self, device_id: DeviceId, address: u16, quantity: u16) -> ModbusResult<Vec<u16>> {
        self.read_04(device_id, address, quantity).await
    }

    async fn write_single_coil(&mut self, device_id: DeviceId, address: u16, value: bool) -> ModbusResult<()> {
        self.write_05(device_id, address, value).await
    }

    async fn write_single_register(&mut self, device_id: DeviceId, address: u16, value: u16) -> ModbusResult<()> {
        self.write_06(device_id, address, value).await
    }

    async fn write_multiple_coils(&mut self, device_id: DeviceId, address: u16, values: &[bool]) -> ModbusResult<()> {
        self.write_0f(device_id, address, values).await
    }

    async fn write_multiple_registers(&mut self, device_id: DeviceId, address: u16, values: &[u16]) -> ModbusResult<()> {
        self.write_10(device_id, address, values).await
    }
}

/// Client over any [`FrameSender`] and envelope kind
pub struct AduClient<T: FrameSender, S: TransactionIdSource = &'static TransactionCounter> {
    sender: T,
    framer: EnvelopeFramer<S>,
    interpreter: ReplyInterpreter,
    envelope: EnvelopeKind,
    stats: TransportStats,
}

impl<T: FrameSender> AduClient<T> {
    /// Client using the process-wide transaction counter
    pub fn new(sender: T, envelope: EnvelopeKind) -> Self {
        Self::with_parts(sender, envelope, EnvelopeFramer::new(), ReplyInterpreter::new())
    }
}

impl<T: FrameSender, S: TransactionIdSource> AduClient<T, S> {
    /// Client with an explicitly configured framer and interpreter
    pub fn with_parts(
        sender: T,
        envelope: EnvelopeKind,
        framer: EnvelopeFramer<S>,
        interpreter: ReplyInterpreter,
    ) -> Self {
        Self {
            sender,
            framer,
            interpreter,
            envelope,
            stats: TransportStats::default(),
        }
    }

    /// Envelope used for every request
    pub fn envelope(&self) -> EnvelopeKind {
        self.envelope
    }

    /// Get a reference to the underlying sender
    pub fn sender(&self) -> &T {
        &self.sender
    }

    /// Get a mutable reference to the underlying sender
    pub fn sender_mut(&mut self) -> &mut T {
        &mut self.sender
    }

    /// Send `request` and return the reply data (byte count already stripped)
    pub async fn execute(&mut self, request: &ModbusRequest) -> ModbusResult<Frame> {
        let frame = self.framer.encode(self.envelope, request);
        debug!(device = request.device_id, function = %request.function(), envelope = %self.envelope, "sending request");

        self.stats.requests_sent += 1;
        self.stats.bytes_sent += frame.len() as u64;

        let reply = match self.sender.send(&frame).await {
            Ok(reply) => reply,
            Err(error) => {
                self.stats.errors += 1;
                return Err(error);
            }
        };
        self.stats.replies_received += 1;
        self.stats.bytes_received += reply.len() as u64;

        self.interpreter.interpret(&reply, self.envelope).map_err(|error| {
            self.stats.errors += 1;
            error
        })
    }

    async fn read_bits(&mut self, device_id: DeviceId, operation: Operation, quantity: u16) -> ModbusResult<Vec<bool>> {
        let data = self.execute(&ModbusRequest::new(device_id, operation)).await?;
        if data.len() * 8 < quantity as usize {
            return Err(ModbusError::frame("Incomplete bit data"));
        }
        Ok(decode_bits(&data, quantity as usize))
    }

    async fn read_words(&mut self, device_id: DeviceId, operation: Operation, quantity: u16) -> ModbusResult<Vec<u16>> {
        let data = self.execute(&ModbusRequest::new(device_id, operation)).await?;
        let mut registers = decode_registers(&data);
        if registers.len() < quantity as usize {
            return Err(ModbusError::frame("Incomplete register data"));
        }
        registers.truncate(quantity as usize);
        Ok(registers)
    }

    async fn write(&mut self, device_id: DeviceId, operation: Operation) -> ModbusResult<()> {
        self.execute(&ModbusRequest::new(device_id, operation)).await?;
        Ok(())
    }
}

#[async_trait]
impl<T: FrameSender, S: TransactionIdSource> ModbusClient for AduClient<T, S> {
    async fn read_01(&mut self, device_id: DeviceId, address: u16, quantity: u16) -> ModbusResult<Vec<bool>> {
        let operation = Operation::ReadCoils { address: address.into(), count: quantity.into() };
        self.read_bits(device_id, operation, quantity).await
    }

    async fn read_02(&mut self, device_id: DeviceId, address: u16, quantity: u16) -> ModbusResult<Vec<bool>> {
        let operation = Operation::ReadDiscreteInputs { address: address.into(), count: quantity.into() };
        self.read_bits(device_id, operation, quantity).await
    }

    async fn read_03(&mut self, device_id: DeviceId, address: u16, quantity: u16) -> ModbusResult<Vec<u16>> {
        let operation = Operation::ReadHoldingRegisters { address: address.into(), count: quantity.into() };
        self.read_words(device_id, operation, quantity).await
    }

    async fn read_04(&mut self, device_id: DeviceId, address: u16, quantity: u16) -> ModbusResult<Vec<u16>> {
        let operation = Operation::ReadInputRegisters { address: address.into(), count: quantity.into() };
        self.read_words(device_id, operation, quantity).await
    }

    async fn write_05(&mut self, device_id: DeviceId, address: u16, value: bool) -> ModbusResult<()> {
        let value = if value { 0xFF00 } else { 0x0000 };
        self.write(device_id, Operation::WriteSingleCoil { address: address.into(), value }).await
    }

    async fn write_06(&mut self, device_id: DeviceId, address: u16, value: u16) -> ModbusResult<()> {
        self.write(device_id, Operation::WriteSingleRegister { address: address.into(), value: value.into() }).await
    }

    async fn write_0f(&mut self, device_id: DeviceId, address: u16, values: &[bool]) -> ModbusResult<()> {
        let values = values.iter().map(|&on| on as i32).collect();
        self.write(device_id, Operation::WriteMultipleCoils { address: address.into(), values }).await
    }

    async fn write_10(&mut self, device_id: DeviceId, address: u16, values: &[u16]) -> ModbusResult<()> {
        let values = values.iter().map(|&value| value.into()).collect();
        self.write(device_id, Operation::WriteMultipleRegisters { address: address.into(), values }).await
    }

    fn get_stats(&self) -> TransportStats {
        self.stats.clone()
    }
}
