//! Engine configuration
//!
//! Loaded from JSON or YAML. Every field has a default, so an empty document
//! is a valid configuration:
//!
//! ```yaml
//! envelope: tcp
//! compact_tcp_header: false
//! strict_length_check: true
//! packet_logging: true
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::envelope::{EnvelopeFramer, EnvelopeKind};
use crate::error::{ModbusError, ModbusResult};
use crate::reply::ReplyInterpreter;

/// Settings shared by the framer, the interpreter and the demo
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Envelope used by the client and the demo
    pub envelope: EnvelopeKind,
    /// Use the 4-byte header for single writes in TCP frames
    pub compact_tcp_header: bool,
    /// Reject replies whose TCP length field or ASCII terminator is wrong
    pub strict_length_check: bool,
    /// Trace every frame built or interpreted
    pub packet_logging: bool,
}

impl EngineConfig {
    /// Parse a JSON document
    pub fn from_json_str(contents: &str) -> ModbusResult<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    /// Parse a YAML document
    pub fn from_yaml_str(contents: &str) -> ModbusResult<Self> {
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Load from a `.json`, `.yaml` or `.yml` file
    pub fn from_path(path: impl AsRef<Path>) -> ModbusResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        let config = match extension.as_deref() {
            Some("json") => Self::from_json_str(&contents)?,
            Some("yaml") | Some("yml") => Self::from_yaml_str(&contents)?,
            _ => {
                return Err(ModbusError::configuration(format!(
                    "unrecognised config file extension: {}",
                    path.display()
                )))
            }
        };
        debug!(path = %path.display(), envelope = %config.envelope, "loaded engine config");
        Ok(config)
    }

    /// Framer on the process-wide transaction counter
    pub fn framer(&self) -> EnvelopeFramer {
        EnvelopeFramer::new()
            .compact_tcp_header(self.compact_tcp_header)
            .packet_logging(self.packet_logging)
    }

    /// Interpreter honouring `strict_length_check` and `packet_logging`
    pub fn interpreter(&self) -> ReplyInterpreter {
        ReplyInterpreter::new()
            .strict_length(self.strict_length_check)
            .packet_logging(self.packet_logging)
    }
}
