//! # Packet Dispatch - State-Gated Packet Routing
//!
//! Routes framed inbound messages to their handlers for a long-lived,
//! session-oriented game server. A packet only reaches its handler when the
//! owning session is in a state where that opcode is legal, and interceptors
//! get a chance to inspect, rewrite or cancel it first.
//!
//! ## Message Flow
//!
//! 1. The transport calls [`PacketDispatcher::handle`] with the session, opcode, header and payload
//! 2. The handler registry is consulted; unknown opcodes are optionally logged and dropped
//! 3. The [`AdmissionPolicy`] checks the opcode against the session state
//! 4. Interceptors on the [`InterceptorBus`] may rewrite the payload or cancel
//! 5. The handler runs with the original header and the (possibly rewritten) payload
//!
//! ## Handler Registration
//!
//! Handler types declare their opcode through [`OpcodeHandler`] and are
//! grouped into families with [`handler_family!`]:
//!
//! ```rust
//! use packet_dispatch::*;
//! use packet_dispatch::handler_family;
//! use std::sync::Arc;
//!
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
//! handler_family!(GameHandlers => [PingHandler]);
//!
//! let dispatcher = PacketDispatcher::new::<GameHandlers>(Arc::new(DispatchConfig::default()));
//! assert!(dispatcher.is_registered(Opcode(7)));
//! ```
//!
//! ## Error Handling
//!
//! `handle` never fails. Inadmissible and cancelled packets are dropped
//! silently, handler errors and panics are logged at warn level, and banned
//! sessions are closed. The returned [`DispatchOutcome`] reports which of
//! these happened.
//!
//! ## Thread Safety
//!
//! The dispatcher is `Send + Sync` and `handle` may run concurrently for any
//! mix of sessions. Handler instances are shared by every session.

pub use admission::{Admission, AdmissionPolicy};
pub use config::{DispatchConfig, PacketLogMode};
pub use dispatcher::{DispatchOutcome, PacketDispatcher};
pub use error::{ConfigError, HandlerError, RegistrationError};
pub use handler::{
    HandlerFactory, HandlerFamily, HandlerRegistration, OpcodeHandler, PacketHandler,
};
pub use intercept::{InterceptorBus, PacketInterceptor, ReceivePacketEvent};
pub use logging::{setup_logging, LoggingSettings};
pub use opcode::{Opcode, OpcodeNames, OpcodeTable, Opcodes, SpecialOpcodes};
pub use registry::HandlerRegistry;
pub use session::{GameSession, SessionState};

pub mod admission;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod intercept;
pub mod logging;
pub mod opcode;
pub mod registry;
pub mod session;
