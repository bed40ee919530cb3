//! Opcode to handler mapping.

use crate::error::{HandlerError, RegistrationError};
use crate::handler::{HandlerFamily, HandlerRegistration, PacketHandler};
use crate::opcode::Opcode;
use dashmap::DashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};

/// Holds at most one handler per opcode.
///
/// Filled when the dispatcher is built; later registrations are still
/// accepted and follow the same rules. On an opcode collision the most
/// recent registration replaces the previous handler.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: DashMap<Opcode, Arc<dyn PacketHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry populated from every member of `F`.
    pub fn for_family<F: HandlerFamily>() -> Self {
        let registry = Self::new();
        registry.register_family::<F>();
        registry
    }

    /// Registers every member of `F`, skipping the ones that are rejected.
    pub fn register_family<F: HandlerFamily>(&self) {
        for registration in F::handler_types() {
            // Rejections are already reported by `register`.
            let _ = self.register(registration);
        }

        debug!(
            family = F::name(),
            handlers = self.len(),
            "Registered {} {} handlers",
            self.len(),
            F::name()
        );
    }

    /// Validates the metadata, constructs the handler and stores it.
    ///
    /// Metadata rejections are returned silently; construction failures
    /// (factory error or panic) are logged at warn level with the type name.
    pub fn register(&self, registration: HandlerRegistration) -> Result<Opcode, RegistrationError> {
        let type_name = registration.type_name();
        let opcodes = registration
            .opcodes()
            .ok_or(RegistrationError::MissingMetadata(type_name))?;

        let opcode = opcodes.opcode();
        if opcodes.disabled {
            return Err(RegistrationError::Disabled { type_name, opcode });
        }
        if !opcode.is_valid() {
            return Err(RegistrationError::InvalidOpcode(type_name));
        }

        let handler = catch_unwind(AssertUnwindSafe(|| registration.instantiate()))
            .unwrap_or_else(|panic_info| Err(HandlerError::from_panic(panic_info)))
            .map_err(|source| {
                warn!(
                    handler = type_name,
                    error = %source,
                    "Unable to register handler {}.",
                    type_name
                );
                RegistrationError::Construction { type_name, source }
            })?;

        if self.handlers.insert(opcode, handler).is_some() {
            debug!(%opcode, handler = type_name, "Replaced existing handler for opcode {}", opcode);
        }
        Ok(opcode)
    }

    /// Returns the handler registered for `opcode`, if any.
    ///
    /// The handler is cloned out so no map lock is held while it runs.
    pub fn get(&self, opcode: Opcode) -> Option<Arc<dyn PacketHandler>> {
        self.handlers.get(&opcode).map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, opcode: Opcode) -> bool {
        self.handlers.contains_key(&opcode)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Registered opcodes in ascending order.
    pub fn opcodes(&self) -> Vec<Opcode> {
        let mut opcodes: Vec<Opcode> = self.handlers.iter().map(|entry| *entry.key()).collect();
        opcodes.sort_unstable();
        opcodes
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("opcodes", &self.opcodes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::OpcodeHandler;
    use crate::opcode::Opcodes;
    use crate::session::GameSession;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static ACCEPTED_BUILT: AtomicUsize = AtomicUsize::new(0);
    static REJECTED_BUILT: AtomicUsize = AtomicUsize::new(0);

    macro_rules! test_handler {
        ($name:ident, $opcodes:expr, $counter:ident) => {
            struct $name;

            impl PacketHandler for $name {
                fn handle(
                    &self,
                    _: &dyn GameSession,
                    _: &[u8],
                    _: &[u8],
                ) -> Result<(), HandlerError> {
                    Ok(())
                }
            }

            impl OpcodeHandler for $name {
                const OPCODES: Opcodes = $opcodes;

                fn create() -> Result<Self, HandlerError> {
                    $counter.fetch_add(1, Ordering::SeqCst);
                    Ok($name)
                }
            }
        };
    }

    test_handler!(MoveHandler, Opcodes::new(300), ACCEPTED_BUILT);
    test_handler!(ChatHandler, Opcodes::new(301), ACCEPTED_BUILT);
    test_handler!(OldChatHandler, Opcodes::disabled(301), REJECTED_BUILT);
    test_handler!(ZeroHandler, Opcodes::new(0), REJECTED_BUILT);

    struct ExplodingHandler;

    impl PacketHandler for ExplodingHandler {
        fn handle(&self, _: &dyn GameSession, _: &[u8], _: &[u8]) -> Result<(), HandlerError> {
            Ok(())
        }
    }

    impl OpcodeHandler for ExplodingHandler {
        const OPCODES: Opcodes = Opcodes::new(302);

        fn create() -> Result<Self, HandlerError> {
            panic!("constructor exploded");
        }
    }

    crate::handler_family!(
        MixedFamily => [MoveHandler, ExplodingHandler, ChatHandler, OldChatHandler, ZeroHandler]
    );

    #[test]
    fn test_family_skips_rejected_handlers() {
        let registry = HandlerRegistry::for_family::<MixedFamily>();
        assert_eq!(registry.opcodes(), vec![Opcode(300), Opcode(301)]);
        assert!(registry.get(Opcode(302)).is_none());
        assert!(registry.get(Opcode::INVALID).is_none());
    }

    #[test]
    fn test_rejections_are_reported() {
        let registry = HandlerRegistry::new();

        assert!(matches!(
            registry.register(HandlerRegistration::of::<OldChatHandler>()),
            Err(RegistrationError::Disabled { opcode: Opcode(301), .. })
        ));
        assert!(matches!(
            registry.register(HandlerRegistration::of::<ZeroHandler>()),
            Err(RegistrationError::InvalidOpcode("ZeroHandler"))
        ));
        assert!(matches!(
            registry.register(HandlerRegistration::of::<ExplodingHandler>()),
            Err(RegistrationError::Construction {
                type_name: "ExplodingHandler",
                source: HandlerError::Panicked(_),
            })
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_disabled_handler_is_never_constructed() {
        let registry = HandlerRegistry::for_family::<MixedFamily>();
        let _ = registry.register(HandlerRegistration::of::<OldChatHandler>());
        let _ = registry.register(HandlerRegistration::of::<ZeroHandler>());
        assert_eq!(REJECTED_BUILT.load(Ordering::SeqCst), 0);
        assert!(ACCEPTED_BUILT.load(Ordering::SeqCst) >= 2);
    }

    #[test]
    fn test_missing_metadata_is_skipped() {
        fn factory() -> Result<Arc<dyn PacketHandler>, HandlerError> {
            Ok(Arc::new(MoveHandler))
        }
        let registry = HandlerRegistry::new();
        let result = registry.register(HandlerRegistration::new("Unannotated", None, factory));
        assert!(matches!(result, Err(RegistrationError::MissingMetadata("Unannotated"))));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_last_registration_wins() {
        struct First;
        struct Second;

        impl PacketHandler for First {
            fn handle(&self, _: &dyn GameSession, _: &[u8], _: &[u8]) -> Result<(), HandlerError> {
                Err(HandlerError::Rejected("first".into()))
            }
        }

        impl PacketHandler for Second {
            fn handle(&self, _: &dyn GameSession, _: &[u8], _: &[u8]) -> Result<(), HandlerError> {
                Err(HandlerError::Rejected("second".into()))
            }
        }

        fn first() -> Result<Arc<dyn PacketHandler>, HandlerError> {
            Ok(Arc::new(First))
        }
        fn second() -> Result<Arc<dyn PacketHandler>, HandlerError> {
            Ok(Arc::new(Second))
        }

        struct Session;
        impl GameSession for Session {
            fn state(&self) -> crate::SessionState {
                crate::SessionState::Active
            }
            fn close(&self) {}
        }

        let registry = HandlerRegistry::new();
        registry
            .register(HandlerRegistration::new("First", Some(Opcodes::new(50)), first))
            .unwrap();
        registry
            .register(HandlerRegistration::new("Second", Some(Opcodes::new(50)), second))
            .unwrap();

        assert_eq!(registry.len(), 1);
        let handler = registry.get(Opcode(50)).unwrap();
        assert_eq!(
            handler.handle(&Session, &[], &[]),
            Err(HandlerError::Rejected("second".into()))
        );
    }
}
