//! Dispatcher configuration.
//!
//! Loaded from TOML, usually as one table of a larger server config file:
//!
//! ```toml
//! log_packets = "missing"
//!
//! [special_opcodes]
//! ping = 7
//! token = 172
//! login = 112
//! character_selection = 105
//!
//! [opcode_names]
//! 7 = "PingReq"
//! 172 = "GetPlayerTokenReq"
//! ```

use crate::error::ConfigError;
use crate::opcode::{OpcodeTable, SpecialOpcodes};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Which packets get written to the log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PacketLogMode {
    /// No packet logging
    Off,
    /// Log packets that have no registered handler
    #[default]
    Missing,
    /// Log unhandled packets and trace every dispatched one
    All,
}

impl PacketLogMode {
    pub fn logs_unhandled(self) -> bool {
        matches!(self, PacketLogMode::Missing | PacketLogMode::All)
    }

    pub fn logs_handled(self) -> bool {
        self == PacketLogMode::All
    }
}

/// Read-only settings consulted by the dispatcher.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchConfig {
    #[serde(default)]
    pub log_packets: PacketLogMode,

    #[serde(default)]
    pub special_opcodes: SpecialOpcodes,

    /// Opcode names for diagnostics, keyed by the decimal opcode
    #[serde(default)]
    pub opcode_names: BTreeMap<String, String>,
}

impl DispatchConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: DispatchConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        info!(
            "📋 Loaded dispatch configuration from {} (log_packets = {:?})",
            path.display(),
            config.log_packets
        );
        Ok(config)
    }

    /// Rejects special opcodes that are reserved or collide with each other.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let special = self.special_opcodes.as_array();

        if let Some(op) = special.iter().find(|op| !op.is_valid()) {
            return Err(ConfigError::Invalid(format!(
                "special opcode {op} is reserved"
            )));
        }

        for (i, op) in special.iter().enumerate() {
            if special[i + 1..].contains(op) {
                return Err(ConfigError::Invalid(format!(
                    "special opcode {op} is assigned more than once"
                )));
            }
        }

        if let Some(key) = self.opcode_names.keys().find(|key| key.parse::<u32>().is_err()) {
            return Err(ConfigError::Invalid(format!(
                "opcode name key '{key}' is not an opcode"
            )));
        }

        Ok(())
    }

    /// Name table built from `opcode_names`. Keys that are not opcodes are skipped.
    pub fn opcode_table(&self) -> OpcodeTable {
        self.opcode_names
            .iter()
            .filter_map(|(key, name)| key.parse::<u32>().ok().map(|op| (op, name.clone())))
            .collect()
    }
}
