//! # Checksum Engine
//!
//! The two integrity checks used by the serial envelopes:
//!
//! - **CRC-16** (RTU and Over-TCP): table driven, reflected polynomial
//!   `0xA001`, initial value `0xFFFF`, appended low byte first.
//! - **LRC** (ASCII): two's complement of the 8-bit sum of all bytes,
//!   appended as a single byte.
//!
//! All functions are pure and take borrowed input; the `apply_*` variants
//! return a new [`Frame`].

use bytes::{BufMut, BytesMut};

use crate::pdu::Frame;
use crate::protocol::CRC_SIZE;

/// CRC-16/MODBUS lookup table (reflected polynomial 0xA001)
static CRC_TABLE: [u16; 256] = [
    0x0000, 0xC0C1, 0xC181, 0x0140, 0xC301, 0x03C0, 0x0280, 0xC241,
    0xC601, 0x06C0, 0x0780, 0xC741, 0x0500, 0xC5C1, 0xC481, 0x0440,
    0xCC01, 0x0CC0, 0x0D80, 0xCD41, 0x0F00, 0xCFC1, 0xCE81, 0x0E40,
    0x0A00, 0xCAC1, 0xCB81, 0x0B40, 0xC901, 0x09C0, 0x0880, 0xC841,
    0xD801, 0x18C0, 0x1980, 0xD941, 0x1B00, 0xDBC1, 0xDA81, 0x1A40,
    0x1E00, 0xDEC1, 0xDF81, 0x1F40, 0xDD01, 0x1DC0, 0x1C80, 0xDC41,
    0x1400, 0xD4C1, 0xD581, 0x1540, 0xD701, 0x17C0, 0x1680, 0xD641,
    0xD201, 0x12C0, 0x1380, 0xD341, 0x1100, 0xD1C1, 0xD081, 0x1040,
    0xF001, 0x30C0, 0x3180, 0xF141, 0x3300, 0xF3C1, 0xF281, 0x3240,
    0x3600, 0xF6C1, 0xF781, 0x3740, 0xF501, 0x35C0, 0x3480, 0xF441,
    0x3C00, 0xFCC1, 0xFD81, 0x3D40, 0xFF01, 0x3FC0, 0x3E80, 0xFE41,
    0xFA01, 0x3AC0, 0x3B80, 0xFB41, 0x3900, 0xF9C1, 0xF881, 0x3840,
    0x2800, 0xE8C1, 0xE981, 0x2940, 0xEB01, 0x2BC0, 0x2A80, 0xEA41,
    0xEE01, 0x2EC0, 0x2F80, 0xEF41, 0x2D00, 0xEDC1, 0xEC81, 0x2C40,
    0xE401, 0x24C0, 0x2580, 0xE541, 0x2700, 0xE7C1, 0xE681, 0x2640,
    0x2200, 0xE2C1, 0xE381, 0x2340, 0xE101, 0x21C0, 0x2080, 0xE041,
    0xA001, 0x60C0, 0x6180, 0xA141, 0x6300, 0xA3C1, 0xA281, 0x6240,
    0x6600, 0xA6C1, 0xA781, 0x6740, 0xA501, 0x65C0, 0x6480, 0xA441,
    0x6C00, 0xACC1, 0xAD81, 0x6D40, 0xAF01, 0x6FC0, 0x6E80, 0xAE41,
    0xAA01, 0x6AC0, 0x6B80, 0xAB41, 0x6900, 0xA9C1, 0xA881, 0x6840,
    0x7800, 0xB8C1, 0xB981, 0x7940, 0xBB01, 0x7BC0, 0x7A80, 0xBA41,
    0xBE01, 0x7EC0, 0x7F80, 0xBF41, 0x7D00, 0xBDC1, 0xBC81, 0x7C40,
    0xB401, 0x74C0, 0x7580, 0xB541, 0x7700, 0xB7C1, 0xB681, 0x7640,
    0x7200, 0xB2C1, 0xB381, 0x7340, 0xB101, 0x71C0, 0x7080, 0xB041,
    0x5000, 0x90C1, 0x9181, 0x5140, 0x9301, 0x53C0, 0x5280, 0x9241,
    0x9601, 0x56C0, 0x5780, 0x9741, 0x5500, 0x95C1, 0x9481, 0x5440,
    0x9C01, 0x5CC0, 0x5D80, 0x9D41, 0x5F00, 0x9FC1, 0x9E81, 0x5E40,
    0x5A00, 0x9AC1, 0x9B81, 0x5B40, 0x9901, 0x59C0, 0x5880, 0x9841,
    0x8801, 0x48C0, 0x4980, 0x8941, 0x4B00, 0x8BC1, 0x8A81, 0x4A40,
    0x4E00, 0x8EC1, 0x8F81, 0x4F40, 0x8D01, 0x4DC0, 0x4C80, 0x8C41,
    0x4400, 0x84C1, 0x8581, 0x4540, 0x8701, 0x47C0, 0x4680, 0x8641,
    0x8201, 0x42C0, 0x4380, 0x8341, 0x4100, 0x81C1, 0x8081, 0x4040,
];

/// Calculate the CRC-16 of `data`
///
/// The result goes on the wire low byte first, i.e. `crc16(..).to_le_bytes()`.
pub fn crc16(data: &[u8]) -> u16 {
    data.iter().fold(0xFFFF, |crc, &byte| {
        (crc >> 8) ^ CRC_TABLE[((crc ^ byte as u16) & 0xFF) as usize]
    })
}

/// Return `data` followed by its CRC-16, low byte first
pub fn apply_crc(data: &[u8]) -> Frame {
    let mut frame = BytesMut::with_capacity(data.len() + CRC_SIZE);
    frame.put_slice(data);
    frame.put_u16_le(crc16(data));
    frame.into()
}

/// CRC-16 carried in the last two bytes of `frame`
///
/// `None` when the frame is too short to carry one.
pub fn trailing_crc(frame: &[u8]) -> Option<u16> {
    let split = frame.len().checked_sub(CRC_SIZE)?;
    Some(u16::from_le_bytes([frame[split], frame[split + 1]]))
}

/// Verify the trailing CRC-16 of `frame`
///
/// Frames shorter than the CRC itself never verify.
pub fn verify_crc(frame: &[u8]) -> bool {
    match trailing_crc(frame) {
        Some(actual) => crc16(&frame[..frame.len() - CRC_SIZE]) == actual,
        None => false,
    }
}

/// Calculate the LRC of `data`: negated wrapping 8-bit sum
pub fn lrc(data: &[u8]) -> u8 {
    data.iter()
        .fold(0u8, |sum, &byte| sum.wrapping_add(byte))
        .wrapping_neg()
}

/// Return `data` followed by its LRC byte
pub fn apply_lrc(data: &[u8]) -> Frame {
    let mut frame = BytesMut::with_capacity(data.len() + 1);
    frame.put_slice(data);
    frame.put_u8(lrc(data));
    frame.into()
}

/// Verify the trailing LRC byte of `frame`
pub fn verify_lrc(frame: &[u8]) -> bool {
    match frame.split_last() {
        Some((&actual, data)) => lrc(data) == actual,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crc::{Crc, CRC_16_MODBUS};

    #[test]
    fn test_crc_known_vectors() {
        let cases: [(&[u8], u16); 4] = [
            (&[0x01, 0x03, 0x00, 0x00, 0x00, 0x02], 0x0BC4),
            (&[0x0A, 0x03, 0x00, 0x01, 0x00, 0x03], 0x7055),
            (&[0x01, 0x06, 0x00, 0x01, 0x00, 0x03], 0x0B98),
            (&[0x11, 0x03, 0x00, 0x6B, 0x00, 0x03], 0x8776),
        ];
        for (data, expected) in cases {
            assert_eq!(crc16(data), expected, "CRC mismatch for {:02X?}", data);
        }
    }

    #[test]
    fn test_crc_table_matches_reference_algorithm() {
        let reference = Crc::<u16>::new(&CRC_16_MODBUS);
        for byte in 0..=255u8 {
            let data = [byte, byte.wrapping_mul(31), 0x5A];
            assert_eq!(crc16(&data), reference.checksum(&data));
        }
    }

    #[test]
    fn test_apply_crc_low_byte_first() {
        let frame = apply_crc(&[0x01, 0x03, 0x00, 0x00, 0x00, 0x02]);
        assert_eq!(frame, [0x01u8, 0x03, 0x00, 0x00, 0x00, 0x02, 0xC4, 0x0B]);
        assert!(verify_crc(&frame));
        assert_eq!(trailing_crc(&frame), Some(0x0BC4));
    }

    #[test]
    fn test_verify_crc_rejects_corruption() {
        let mut frame = apply_crc(&[0x0A, 0x03, 0x00, 0x01, 0x00, 0x03]).to_vec();
        frame[3] ^= 0x01;
        assert!(!verify_crc(&frame));

        assert!(!verify_crc(&[0x01]));
        assert!(!verify_crc(&[]));
    }

    #[test]
    fn test_empty_input_crc() {
        assert_eq!(crc16(&[]), 0xFFFF);
        assert_eq!(apply_crc(&[]), [0xFFu8, 0xFF]);
        assert!(verify_crc(&[0xFF, 0xFF]));
    }

    #[test]
    fn test_lrc() {
        assert_eq!(lrc(&[0x01, 0x03, 0x00, 0x00, 0x00, 0x01]), 0xFB);
        assert_eq!(lrc(&[0x01, 0x03, 0x00, 0x00, 0x00, 0x02]), 0xFA);
        // sum wraps modulo 256
        assert_eq!(lrc(&[0xFF, 0xFF, 0x02]), 0x00);
        assert_eq!(lrc(&[]), 0x00);
    }

    #[test]
    fn test_apply_and_verify_lrc() {
        let frame = apply_lrc(&[0x01, 0x03, 0x00, 0x00, 0x00, 0x01]);
        assert_eq!(frame, [0x01u8, 0x03, 0x00, 0x00, 0x00, 0x01, 0xFB]);
        assert!(verify_lrc(&frame));
        assert!(!verify_lrc(&[0x01, 0x03, 0x00, 0x00, 0x00, 0x01, 0xFC]));
        assert!(!verify_lrc(&[]));
    }
}
