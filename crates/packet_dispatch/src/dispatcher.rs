//! The per-packet entry point.
//!
//! [`PacketDispatcher::handle`] is called by transport threads for every
//! framed message. It looks up the handler, gates the packet on the session
//! state, runs the interceptors and finally invokes the handler. Nothing that
//! goes wrong along the way escapes: errors and panics are logged and the
//! call returns a [`DispatchOutcome`] describing what happened.

use crate::admission::{Admission, AdmissionPolicy};
use crate::config::DispatchConfig;
use crate::error::{HandlerError, RegistrationError};
use crate::handler::{HandlerFamily, HandlerRegistration, PacketHandler};
use crate::intercept::{InterceptorBus, ReceivePacketEvent};
use crate::opcode::{Opcode, OpcodeNames};
use crate::registry::HandlerRegistry;
use crate::session::GameSession;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What happened to a single inbound packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The handler ran and returned `Ok`
    Handled,
    /// The handler returned an error or panicked; already logged
    Failed(HandlerError),
    /// The session state does not admit this opcode
    Dropped,
    /// The session is banned and was closed
    Closed,
    /// An interceptor cancelled the packet
    Cancelled,
    /// No handler is registered for the opcode
    Unhandled,
}

impl DispatchOutcome {
    /// `true` if the handler was invoked, whether or not it succeeded.
    pub fn reached_handler(&self) -> bool {
        matches!(self, DispatchOutcome::Handled | DispatchOutcome::Failed(_))
    }
}

/// Routes inbound packets of one handler family to their handlers.
///
/// Built once per server role and shared (typically behind an `Arc`) by all
/// transport threads.
pub struct PacketDispatcher {
    registry: HandlerRegistry,
    policy: AdmissionPolicy,
    interceptors: InterceptorBus,
    config: Arc<DispatchConfig>,
    names: Arc<dyn OpcodeNames>,
}

impl PacketDispatcher {
    /// Creates a dispatcher and registers every handler of family `F`.
    ///
    /// Opcode names for diagnostics come from the configuration's name table
    /// until replaced with [`with_opcode_names`](Self::with_opcode_names).
    pub fn new<F: HandlerFamily>(config: Arc<DispatchConfig>) -> Self {
        let dispatcher = Self {
            registry: HandlerRegistry::new(),
            policy: AdmissionPolicy::new(config.special_opcodes),
            interceptors: InterceptorBus::new(),
            names: Arc::new(config.opcode_table()),
            config,
        };
        dispatcher.register_handlers::<F>();
        dispatcher
    }

    /// Replaces the opcode name oracle used in log lines.
    pub fn with_opcode_names(mut self, names: Arc<dyn OpcodeNames>) -> Self {
        self.names = names;
        self
    }

    /// Registers every handler of another family.
    pub fn register_handlers<F: HandlerFamily>(&self) {
        self.registry.register_family::<F>();
    }

    /// Registers a single handler after construction.
    ///
    /// Same rules as family registration; replaces any handler already
    /// registered for the opcode.
    pub fn register_packet_handler(
        &self,
        registration: HandlerRegistration,
    ) -> Result<Opcode, RegistrationError> {
        self.registry.register(registration)
    }

    /// Interceptors run for every admitted packet.
    pub fn interceptors(&self) -> &InterceptorBus {
        &self.interceptors
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn handler_count(&self) -> usize {
        self.registry.len()
    }

    pub fn is_registered(&self, opcode: Opcode) -> bool {
        self.registry.contains(opcode)
    }

    /// Registered opcodes in ascending order.
    pub fn registered_opcodes(&self) -> Vec<Opcode> {
        self.registry.opcodes()
    }

    /// Dispatches one inbound packet. Never panics and never fails.
    pub fn handle(
        &self,
        session: &dyn GameSession,
        opcode: Opcode,
        header: &[u8],
        payload: &[u8],
    ) -> DispatchOutcome {
        let Some(handler) = self.registry.get(opcode) else {
            if self.config.log_packets.logs_unhandled() {
                info!(
                    opcode = opcode.value(),
                    "Unhandled packet ({}): {}",
                    opcode,
                    self.names.name_of(opcode)
                );
            }
            return DispatchOutcome::Unhandled;
        };

        match catch_unwind(AssertUnwindSafe(|| {
            self.admit_and_invoke(handler.as_ref(), session, opcode, header, payload)
        })) {
            Ok(outcome) => outcome,
            Err(panic_info) => {
                let error = HandlerError::from_panic(panic_info);
                warn!(opcode = opcode.value(), error = %error, "Unable to handle packet.");
                DispatchOutcome::Failed(error)
            }
        }
    }

    /// Everything after the handler lookup. Runs under `catch_unwind`, so a
    /// panicking session, interceptor or handler cannot escape `handle`.
    fn admit_and_invoke(
        &self,
        handler: &dyn PacketHandler,
        session: &dyn GameSession,
        opcode: Opcode,
        header: &[u8],
        payload: &[u8],
    ) -> DispatchOutcome {
        match self.policy.decide(opcode, session.state()) {
            Admission::Allow => {}
            Admission::Drop => return DispatchOutcome::Dropped,
            Admission::Close => {
                session.close();
                return DispatchOutcome::Closed;
            }
        }

        let mut event = ReceivePacketEvent::new(session, opcode, payload.to_vec());
        if !self.interceptors.publish(&mut event) {
            return DispatchOutcome::Cancelled;
        }
        let payload = event.into_payload();

        if self.config.log_packets.logs_handled() {
            debug!(
                opcode = opcode.value(),
                "Dispatching packet ({}): {}",
                opcode,
                self.names.name_of(opcode)
            );
        }

        match handler.handle(session, header, &payload) {
            Ok(()) => DispatchOutcome::Handled,
            Err(error) => {
                warn!(opcode = opcode.value(), error = %error, "Unable to handle packet.");
                DispatchOutcome::Failed(error)
            }
        }
    }
}

impl std::fmt::Debug for PacketDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacketDispatcher")
            .field("registry", &self.registry)
            .field("policy", &self.policy)
            .field("interceptors", &self.interceptors)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
