//! Opcode identifiers, per-handler opcode metadata and the opcode name oracle.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Numeric identifier of a message kind on the wire.
///
/// `0` is reserved as "invalid / unregistered" and is never accepted by the
/// handler registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Opcode(pub u32);

impl Opcode {
    /// The reserved invalid opcode.
    pub const INVALID: Opcode = Opcode(0);

    /// Returns the raw numeric value.
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Returns `true` unless this is the reserved invalid opcode.
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl From<u32> for Opcode {
    fn from(value: u32) -> Self {
        Opcode(value)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Declarative opcode metadata attached to a handler type.
///
/// Declared once per handler through
/// [`OpcodeHandler::OPCODES`](crate::handler::OpcodeHandler::OPCODES) so the
/// registry can read it without constructing the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcodes {
    pub value: u32,
    pub disabled: bool,
}

impl Opcodes {
    /// Enabled metadata for the given opcode.
    pub const fn new(value: u32) -> Self {
        Self {
            value,
            disabled: false,
        }
    }

    /// Metadata that keeps the handler out of the registry.
    pub const fn disabled(value: u32) -> Self {
        Self {
            value,
            disabled: true,
        }
    }

    pub const fn opcode(&self) -> Opcode {
        Opcode(self.value)
    }
}

/// The opcodes the admission policy treats specially.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialOpcodes {
    /// Keep-alive; admitted in every session state
    #[serde(default = "default_ping")]
    pub ping: Opcode,
    /// Token acquisition; only while waiting for a token
    #[serde(default = "default_token")]
    pub token: Opcode,
    /// Login; only while waiting for login
    #[serde(default = "default_login")]
    pub login: Opcode,
    /// Initial character selection; only while picking a character
    #[serde(default = "default_character_selection")]
    pub character_selection: Opcode,
}

fn default_ping() -> Opcode {
    Opcode(7)
}

fn default_token() -> Opcode {
    Opcode(172)
}

fn default_login() -> Opcode {
    Opcode(112)
}

fn default_character_selection() -> Opcode {
    Opcode(105)
}

impl Default for SpecialOpcodes {
    fn default() -> Self {
        Self {
            ping: default_ping(),
            token: default_token(),
            login: default_login(),
            character_selection: default_character_selection(),
        }
    }
}

impl SpecialOpcodes {
    pub(crate) fn as_array(&self) -> [Opcode; 4] {
        [self.ping, self.token, self.login, self.character_selection]
    }
}

/// Translates opcodes to human-readable names for diagnostics.
///
/// Implementations must be total: unknown opcodes map to a placeholder.
pub trait OpcodeNames: Send + Sync {
    fn name_of(&self, opcode: Opcode) -> String;
}

impl<F> OpcodeNames for F
where
    F: Fn(Opcode) -> String + Send + Sync,
{
    fn name_of(&self, opcode: Opcode) -> String {
        self(opcode)
    }
}

/// Table-backed [`OpcodeNames`] implementation.
#[derive(Debug, Clone, Default)]
pub struct OpcodeTable {
    names: HashMap<Opcode, String>,
}

impl OpcodeTable {
    /// Name reported for opcodes missing from the table.
    pub const UNKNOWN: &'static str = "UNKNOWN";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, opcode: impl Into<Opcode>, name: impl Into<String>) -> Self {
        self.names.insert(opcode.into(), name.into());
        self
    }

    pub fn insert(&mut self, opcode: impl Into<Opcode>, name: impl Into<String>) {
        self.names.insert(opcode.into(), name.into());
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(u32, S)> for OpcodeTable {
    fn from_iter<I: IntoIterator<Item = (u32, S)>>(iter: I) -> Self {
        Self {
            names: iter
                .into_iter()
                .map(|(op, name)| (Opcode(op), name.into()))
                .collect(),
        }
    }
}

impl OpcodeNames for OpcodeTable {
    fn name_of(&self, opcode: Opcode) -> String {
        self.names
            .get(&opcode)
            .cloned()
            .unwrap_or_else(|| Self::UNKNOWN.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_opcode() {
        assert!(!Opcode::INVALID.is_valid());
        assert!(Opcode(1).is_valid());
        assert_eq!(Opcode::from(42).value(), 42);
        assert_eq!(Opcode(99999).to_string(), "99999");
    }

    #[test]
    fn test_opcodes_metadata() {
        let enabled = Opcodes::new(12);
        assert!(!enabled.disabled);
        assert_eq!(enabled.opcode(), Opcode(12));
        assert!(Opcodes::disabled(12).disabled);
    }

    #[test]
    fn test_opcode_table_is_total() {
        let table = OpcodeTable::new().with_name(7u32, "PingReq");
        assert_eq!(table.name_of(Opcode(7)), "PingReq");
        assert_eq!(table.name_of(Opcode(99999)), OpcodeTable::UNKNOWN);
    }

    #[test]
    fn test_closure_name_oracle() {
        let names = |op: Opcode| format!("Op{}", op);
        assert_eq!(names.name_of(Opcode(3)), "Op3");
    }

    #[test]
    fn test_special_opcodes_default_distinct() {
        let special = SpecialOpcodes::default();
        let mut all = special.as_array().to_vec();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), 4);
        assert!(all.iter().all(|op| op.is_valid()));
    }
}
