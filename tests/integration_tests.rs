//! Integration Tests for the Modbus ADU engine
//!
//! Builder, framer, interpreter and client working together against a
//! simulated device that speaks every envelope.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use modbus_adu::checksum::{crc16, verify_crc};
use modbus_adu::envelope::{decode_ascii, wrap_ascii, wrap_over_tcp, wrap_rtu, wrap_tcp};
use modbus_adu::reply::{classify, strip_to_data, strip_to_pdu};
use modbus_adu::*;

/// Simulated device holding 16 registers and 16 coils
///
/// Decodes requests in the configured envelope and answers in the same one,
/// echoing the transaction id of TCP-style requests.
#[derive(Debug)]
pub struct SimulatedDevice {
    kind: EnvelopeKind,
    device_id: u8,
    registers: [u16; 16],
    coils: [bool; 16],
    requests: Vec<Frame>,
}

impl SimulatedDevice {
    pub fn new(kind: EnvelopeKind, device_id: u8) -> Self {
        let mut registers = [0u16; 16];
        for (index, register) in registers.iter_mut().enumerate() {
            *register = 0x0100 + index as u16;
        }
        Self {
            kind,
            device_id,
            registers,
            coils: [false; 16],
            requests: Vec::new(),
        }
    }

    fn request_pdu(&self, frame: &[u8]) -> ModbusResult<(u16, Vec<u8>)> {
        match self.kind {
            EnvelopeKind::Rtu => {
                if !verify_crc(frame) {
                    return Err(ModbusError::transport("device saw a bad CRC"));
                }
                Ok((0, frame[..frame.len() - 2].to_vec()))
            }
            EnvelopeKind::Tcp => Ok((u16::from_be_bytes([frame[0], frame[1]]), frame[6..].to_vec())),
            EnvelopeKind::OverTcp => {
                if !verify_crc(&frame[6..]) {
                    return Err(ModbusError::transport("device saw a bad CRC"));
                }
                Ok((u16::from_be_bytes([frame[0], frame[1]]), frame[6..frame.len() - 2].to_vec()))
            }
            EnvelopeKind::Ascii => Ok((0, decode_ascii(frame)?.to_vec())),
        }
    }

    fn respond(&mut self, pdu: &[u8]) -> Vec<u8> {
        let address = u16::from_be_bytes([pdu[2], pdu[3]]) as usize;
        let field = u16::from_be_bytes([pdu[4], pdu[5]]);
        let function = pdu[1];

        match function {
            0x01 => {
                let count = field as usize;
                let mut packed = vec![0u8; (count + 7) / 8];
                for bit in 0..count {
                    if self.coils[address + bit] {
                        packed[bit / 8] |= 1 << (bit % 8);
                    }
                }
                let mut reply = vec![self.device_id, function, packed.len() as u8];
                reply.extend(packed);
                reply
            }
            0x03 | 0x04 => {
                let count = field as usize;
                if address + count > self.registers.len() {
                    return vec![self.device_id, function | 0x80, 0x02];
                }
                let mut reply = vec![self.device_id, function, (count * 2) as u8];
                for register in &self.registers[address..address + count] {
                    reply.extend_from_slice(&register.to_be_bytes());
                }
                reply
            }
            0x05 => {
                self.coils[address] = field == 0xFF00;
                pdu.to_vec()
            }
            0x06 => {
                self.registers[address] = field;
                pdu.to_vec()
            }
            0x0F => {
                for bit in 0..field as usize {
                    self.coils[address + bit] = pdu[7 + bit / 8] & (1 << (bit % 8)) != 0;
                }
                pdu[..6].to_vec()
            }
            0x10 => {
                for index in 0..field as usize {
                    let offset = 7 + index * 2;
                    self.registers[address + index] = u16::from_be_bytes([pdu[offset], pdu[offset + 1]]);
                }
                pdu[..6].to_vec()
            }
            _ => vec![self.device_id, function | 0x80, 0x01],
        }
    }
}

#[async_trait]
impl FrameSender for SimulatedDevice {
    async fn send(&mut self, frame: &Frame) -> ModbusResult<Frame> {
        self.requests.push(frame.clone());
        let (transaction_id, pdu) = self.request_pdu(frame)?;
        let reply = self.respond(&pdu);
        Ok(match self.kind {
            EnvelopeKind::Rtu => wrap_rtu(&reply),
            EnvelopeKind::Tcp => wrap_tcp(transaction_id, &reply),
            EnvelopeKind::OverTcp => wrap_over_tcp(transaction_id, &reply),
            EnvelopeKind::Ascii => wrap_ascii(&reply),
        })
    }
}

/// Transaction id source returning a fixed id, for deterministic TCP frames
struct FixedIds(u16);

impl TransactionIdSource for FixedIds {
    fn next_transaction_id(&self) -> u16 {
        self.0
    }
}

/// Transaction id source replaying a script and recording each draw
struct ScriptedIds(Mutex<Vec<u16>>);

impl TransactionIdSource for ScriptedIds {
    fn next_transaction_id(&self) -> u16 {
        let mut ids = self.0.lock().unwrap();
        ids.remove(0)
    }
}

fn strict_client(kind: EnvelopeKind) -> AduClient<SimulatedDevice, TransactionCounter> {
    AduClient::with_parts(
        SimulatedDevice::new(kind, 7),
        kind,
        EnvelopeFramer::with_sequence(TransactionCounter::new()),
        ReplyInterpreter::new().strict_length(true),
    )
}

/// Read Holding Registers for device 10 in an RTU envelope
#[tokio::test]
async fn test_read_holding_registers_rtu_frame() {
    let framer = EnvelopeFramer::new();
    let frame = framer.wrap(EnvelopeKind::Rtu, &pdu::read_holding_registers(10, 1, 3));

    assert_eq!(frame, [10u8, 3, 0, 1, 0, 3, 0x55, 0x70]);
    assert_eq!(crc16(&frame[..6]), 0x7055);
    assert!(verify_crc(&frame));
}

/// Write Multiple Coils packs bits LSB first and only sets positive values
#[tokio::test]
async fn test_write_multiple_coils_frame() {
    let pdu = pdu::write_multiple_coils(1, 0, &[1, 0, 1]);
    assert_eq!(pdu, [1u8, 15, 0, 0, 0, 3, 1, 0x05]);

    let frame = wrap_rtu(&pdu);
    assert_eq!(&frame[8..], &[0x4F, 0x54]);

    // Negative values count as off
    assert_eq!(pdu::write_multiple_coils(1, 0, &[-1, 2, 0]), [1u8, 15, 0, 0, 0, 3, 1, 0x02]);
}

/// ASCII frame of `[1,3,0,0,0,1]` matches the literal wire bytes
#[tokio::test]
async fn test_ascii_literal_bytes() {
    let frame = EnvelopeFramer::new().wrap(EnvelopeKind::Ascii, &pdu::read_holding_registers(1, 0, 1));
    let expected = [
        0x3A, b'0', b'1', b'0', b'3', b'0', b'0', b'0', b'0', b'0', b'0', b'0', b'1', b'F', b'B', 0x0D, 0x0A,
    ];
    assert_eq!(frame, expected);
    assert_eq!(decode_ascii(&frame).unwrap(), [1u8, 3, 0, 0, 0, 1]);
}

/// Short replies are NoData and 0x83 is a device exception in every envelope
#[tokio::test]
async fn test_reply_classification_rules() {
    for kind in EnvelopeKind::ALL {
        assert_eq!(classify(&[], kind), ReplyClass::NoData);
        assert_eq!(classify(&[0x01, 0x03], kind), ReplyClass::NoData);
    }

    let rtu = wrap_rtu(&[0x01, 0x83, 0x02]);
    assert_eq!(classify(&rtu, EnvelopeKind::Rtu), ReplyClass::DeviceException(0x02));

    let tcp = wrap_tcp(9, &[0x01, 0x83, 0x02]);
    assert_eq!(classify(&tcp, EnvelopeKind::Tcp), ReplyClass::DeviceException(0x02));

    let over_tcp = wrap_over_tcp(9, &[0x01, 0x83, 0x02]);
    assert_eq!(classify(&over_tcp, EnvelopeKind::OverTcp), ReplyClass::DeviceException(0x02));

    let ascii = wrap_ascii(&[0x01, 0x83, 0x02]);
    assert_eq!(classify(&ascii, EnvelopeKind::Ascii), ReplyClass::DeviceException(0x02));
}

/// Every function code survives an RTU build, strip and data extraction
#[tokio::test]
async fn test_rtu_round_trip_all_functions() {
    let requests = [
        ModbusRequest::from_parts(3, 0x01, 4, &[10]).unwrap(),
        ModbusRequest::from_parts(3, 0x02, 4, &[10]).unwrap(),
        ModbusRequest::from_parts(3, 0x03, 4, &[2]).unwrap(),
        ModbusRequest::from_parts(3, 0x04, 4, &[2]).unwrap(),
        ModbusRequest::from_parts(3, 0x05, 4, &[0xFF00]).unwrap(),
        ModbusRequest::from_parts(3, 0x06, 4, &[0x1234]).unwrap(),
        ModbusRequest::from_parts(3, 0x0F, 4, &[1, 1, 0, 1]).unwrap(),
        ModbusRequest::from_parts(3, 0x10, 4, &[1, 2, 3]).unwrap(),
    ];

    let framer = EnvelopeFramer::new();
    for request in &requests {
        let pdu = request.to_pdu();
        let frame = framer.encode(EnvelopeKind::Rtu, request);

        assert_eq!(classify(&frame, EnvelopeKind::Rtu), ReplyClass::Success, "{}", request.function());
        assert_eq!(strip_to_pdu(&frame, EnvelopeKind::Rtu).unwrap(), pdu);
        assert!(strip_to_data(&pdu).is_some());
    }
}

/// Injected id source makes TCP frames deterministic
#[tokio::test]
async fn test_injected_transaction_ids() {
    let framer = EnvelopeFramer::with_sequence(FixedIds(0x1234));
    let pdu = pdu::write_single_register(1, 1, 3);

    let tcp = framer.wrap(EnvelopeKind::Tcp, &pdu);
    assert_eq!(tcp, [0x12u8, 0x34, 0, 0, 0, 6, 1, 6, 0, 1, 0, 3]);

    let over_tcp = framer.wrap(EnvelopeKind::OverTcp, &pdu);
    assert_eq!(&over_tcp[..6], &[0x12, 0x34, 0, 0, 0, 8]);
    assert_eq!(&over_tcp[12..], &[0x98, 0x0B]);

    let compact = framer.wrap_compact_tcp(&pdu);
    assert_eq!(compact, [0x12u8, 0x34, 0, 0, 1, 6, 0, 1, 0, 3]);
}

/// Only TCP-style envelopes draw from the id source
#[tokio::test]
async fn test_rtu_and_ascii_consume_no_ids() {
    let framer = EnvelopeFramer::with_sequence(ScriptedIds(Mutex::new(vec![5, 6])));
    let pdu = pdu::read_coils(1, 0, 8);

    framer.wrap(EnvelopeKind::Rtu, &pdu);
    framer.wrap(EnvelopeKind::Ascii, &pdu);
    let first = framer.wrap(EnvelopeKind::Tcp, &pdu);
    let second = framer.wrap(EnvelopeKind::OverTcp, &pdu);

    assert_eq!(&first[..2], &[0, 5]);
    assert_eq!(&second[..2], &[0, 6]);
    assert!(framer.wrap_code(9, &pdu).is_err());
}

/// Concurrent framers sharing one counter never hand out the same id
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_transaction_ids() {
    let counter = Arc::new(TransactionCounter::new());
    let mut handles = Vec::new();

    for task in 0..8u8 {
        let framer = EnvelopeFramer::with_sequence(Arc::clone(&counter));
        handles.push(tokio::spawn(async move {
            let pdu = pdu::read_input_registers(task, 0, 1);
            (0..250)
                .map(|_| {
                    let frame = framer.wrap(EnvelopeKind::Tcp, &pdu);
                    u16::from_be_bytes([frame[0], frame[1]])
                })
                .collect::<Vec<_>>()
        }));
    }

    let mut seen = HashSet::new();
    for handle in handles {
        for id in handle.await.unwrap() {
            assert!(seen.insert(id), "duplicate transaction id {id}");
        }
    }
    assert_eq!(seen.len(), 2000);
    assert_eq!(counter.current(), 2000);
}

/// Client reads and writes against the simulated device in every envelope
#[tokio::test]
async fn test_client_against_simulated_device() {
    for kind in EnvelopeKind::ALL {
        let mut client = strict_client(kind);

        let registers = client.read_holding_registers(7, 2, 3).await.unwrap();
        assert_eq!(registers, vec![0x0102, 0x0103, 0x0104], "{kind}");

        client.write_single_register(7, 2, 0xBEEF).await.unwrap();
        client.write_multiple_registers(7, 3, &[0x0A0B, 0x0C0D]).await.unwrap();
        let registers = client.read_input_registers(7, 2, 3).await.unwrap();
        assert_eq!(registers, vec![0xBEEF, 0x0A0B, 0x0C0D], "{kind}");

        client.write_multiple_coils(7, 0, &[true, false, true, true]).await.unwrap();
        client.write_single_coil(7, 1, true).await.unwrap();
        let coils = client.read_coils(7, 0, 5).await.unwrap();
        assert_eq!(coils, vec![true, true, true, true, false], "{kind}");

        let stats = client.get_stats();
        assert_eq!(stats.requests_sent, 7);
        assert_eq!(stats.replies_received, 7);
        assert_eq!(stats.errors, 0);
    }
}

/// Device exceptions surface as `ModbusError::Exception`
#[tokio::test]
async fn test_client_device_exception() {
    let mut client = strict_client(EnvelopeKind::OverTcp);

    let result = client.read_holding_registers(7, 14, 4).await;
    match result {
        Err(ModbusError::Exception { function, code, .. }) => {
            assert_eq!(function, 0x03);
            assert_eq!(code, 0x02);
        }
        other => panic!("expected exception, got {other:?}"),
    }
    assert_eq!(client.get_stats().errors, 1);
}

/// TCP transaction ids on the wire increase by one per request
#[tokio::test]
async fn test_client_tcp_ids_increase() {
    let mut client = strict_client(EnvelopeKind::Tcp);
    for _ in 0..3 {
        client.read_coils(7, 0, 1).await.unwrap();
    }

    let ids: Vec<u16> = client
        .sender()
        .requests
        .iter()
        .map(|frame| u16::from_be_bytes([frame[0], frame[1]]))
        .collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

/// Engine config drives the framer and interpreter
#[tokio::test]
async fn test_engine_config_from_yaml() {
    let config = EngineConfig::from_yaml_str("envelope: tcp\ncompact_tcp_header: true\nstrict_length_check: true\n").unwrap();
    assert_eq!(config.envelope, EnvelopeKind::Tcp);

    let frame = config.framer().wrap(config.envelope, &pdu::write_single_coil(1, 10, 0xFF00));
    assert_eq!(frame.len(), 10);

    // Length field says 6 but only 5 PDU bytes follow
    let truncated = [0u8, 1, 0, 0, 0, 6, 1, 3, 2, 0x12, 0x34];
    assert_eq!(config.interpreter().classify(&truncated, EnvelopeKind::Tcp), ReplyClass::NoData);
    assert_eq!(ReplyInterpreter::new().classify(&truncated, EnvelopeKind::Tcp), ReplyClass::Success);
}
