//! Rendering helpers for frames
//!
//! Used by packet logging, `Frame`'s `Display` impl and the demo binary.

/// Formatting and display utilities
pub mod format {
    use crate::protocol::{ASCII_CR, ASCII_LF};

    /// Format byte array as hex string
    pub fn bytes_to_hex(bytes: &[u8]) -> String {
        bytes.iter()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Format byte array as zero-padded decimal values
    pub fn bytes_to_dec(bytes: &[u8]) -> String {
        bytes.iter()
            .map(|b| format!("{:02}", b))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Render an ASCII envelope as text, spelling out the terminator
    ///
    /// `:010300000001FB\r\n` becomes `:010300000001FB<CR><LF>`.
    pub fn ascii_frame_to_text(frame: &[u8]) -> String {
        frame.iter()
            .map(|&b| match b {
                ASCII_CR => "<CR>".to_string(),
                ASCII_LF => "<LF>".to_string(),
                b if b.is_ascii_graphic() => (b as char).to_string(),
                b => format!("<{:02X}>", b),
            })
            .collect()
    }
}

/// Packet logging through `tracing`
pub mod logging {
    use tracing::trace;
    use super::format;

    /// Log packet with direction and envelope name
    pub fn log_packet(direction: &str, data: &[u8], envelope: &str, device_id: Option<u8>) {
        let hex_string = format::bytes_to_hex(data);
        match device_id {
            Some(id) => trace!("[MODBUS-{}] {} device:{} {}", envelope, direction, id, hex_string),
            None => trace!("[MODBUS-{}] {} {}", envelope, direction, hex_string),
        }
    }
}
