//! Packet handler contracts and handler discovery.
//!
//! A handler type declares its opcode once, next to its implementation, via
//! [`OpcodeHandler`]. Handler types are grouped into families; a
//! [`HandlerFamily`] enumerates its members as [`HandlerRegistration`]s, which
//! pair the metadata with a factory so the registry can inspect the opcode
//! before anything is constructed.
//!
//! ```rust
//! use packet_dispatch::{
//!     handler_family, GameSession, HandlerError, OpcodeHandler, Opcodes, PacketHandler,
//! };
//!
//! #[derive(Default)]
//! struct PingHandler;
//!
//! impl PacketHandler for PingHandler {
//!     fn handle(
//!         &self,
//!         _session: &dyn GameSession,
//!         _header: &[u8],
//!         _payload: &[u8],
//!     ) -> Result<(), HandlerError> {
//!         Ok(())
//!     }
//! }
//!
//! impl OpcodeHandler for PingHandler {
//!     const OPCODES: Opcodes = Opcodes::new(7);
//!
//!     fn create() -> Result<Self, HandlerError> {
//!         Ok(PingHandler)
//!     }
//! }
//!
//! handler_family!(pub GameHandlers => [PingHandler]);
//! ```

use crate::error::HandlerError;
use crate::opcode::Opcodes;
use crate::session::GameSession;
use std::fmt;
use std::sync::Arc;

/// Processes one decoded packet for a session.
///
/// A single instance is shared by every session, so implementations must not
/// keep per-session state and must tolerate concurrent calls.
pub trait PacketHandler: Send + Sync + 'static {
    fn handle(
        &self,
        session: &dyn GameSession,
        header: &[u8],
        payload: &[u8],
    ) -> Result<(), HandlerError>;
}

/// A handler type with statically declared opcode metadata.
pub trait OpcodeHandler: PacketHandler + Sized {
    /// Opcode this handler serves and whether it is enabled.
    const OPCODES: Opcodes;

    /// Zero-argument constructor used during registration.
    fn create() -> Result<Self, HandlerError>;
}

/// Builds a shared handler instance.
pub type HandlerFactory = fn() -> Result<Arc<dyn PacketHandler>, HandlerError>;

/// One candidate handler type offered to the registry.
#[derive(Clone, Copy)]
pub struct HandlerRegistration {
    type_name: &'static str,
    opcodes: Option<Opcodes>,
    factory: HandlerFactory,
}

impl HandlerRegistration {
    /// Registration for an [`OpcodeHandler`] type.
    pub fn of<T: OpcodeHandler>() -> Self {
        Self {
            type_name: short_type_name::<T>(),
            opcodes: Some(T::OPCODES),
            factory: create_shared::<T>,
        }
    }

    /// Registration assembled by hand, e.g. for handlers without metadata.
    pub fn new(type_name: &'static str, opcodes: Option<Opcodes>, factory: HandlerFactory) -> Self {
        Self {
            type_name,
            opcodes,
            factory,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn opcodes(&self) -> Option<Opcodes> {
        self.opcodes
    }

    pub(crate) fn instantiate(&self) -> Result<Arc<dyn PacketHandler>, HandlerError> {
        (self.factory)()
    }
}

impl fmt::Debug for HandlerRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistration")
            .field("type_name", &self.type_name)
            .field("opcodes", &self.opcodes)
            .finish_non_exhaustive()
    }
}

fn create_shared<T: OpcodeHandler>() -> Result<Arc<dyn PacketHandler>, HandlerError> {
    T::create().map(|handler| Arc::new(handler) as Arc<dyn PacketHandler>)
}

fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}

/// A set of handler types discovered together (e.g. one per server role).
pub trait HandlerFamily {
    /// Family name used in diagnostics.
    fn name() -> &'static str;

    /// Every handler type belonging to the family, in declaration order.
    fn handler_types() -> Vec<HandlerRegistration>;
}

/// Declares a [`HandlerFamily`] from a list of [`OpcodeHandler`] types.
///
/// Types are offered to the registry in the order listed, so with duplicate
/// opcodes the last one listed wins.
#[macro_export]
macro_rules! handler_family {
    ($vis:vis $family:ident => [$($handler:ty),* $(,)?]) => {
        $vis struct $family;

        impl $crate::HandlerFamily for $family {
            fn name() -> &'static str {
                stringify!($family)
            }

            fn handler_types() -> ::std::vec::Vec<$crate::HandlerRegistration> {
                ::std::vec![$($crate::HandlerRegistration::of::<$handler>()),*]
            }
        }
    };
}
