//! Packet interception hook.
//!
//! Interceptors see every admitted packet before its handler runs. They may
//! replace the payload or cancel the packet; the header is never exposed.

use crate::opcode::Opcode;
use crate::session::GameSession;
use arc_swap::ArcSwap;
use std::fmt;
use std::sync::Arc;

/// A received packet on its way to a handler.
pub struct ReceivePacketEvent<'a> {
    session: &'a dyn GameSession,
    opcode: Opcode,
    payload: Vec<u8>,
    cancelled: bool,
}

impl<'a> ReceivePacketEvent<'a> {
    pub fn new(session: &'a dyn GameSession, opcode: Opcode, payload: Vec<u8>) -> Self {
        Self {
            session,
            opcode,
            payload,
            cancelled: false,
        }
    }

    pub fn session(&self) -> &'a dyn GameSession {
        self.session
    }

    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Replaces the bytes the handler will receive.
    pub fn set_payload(&mut self, payload: impl Into<Vec<u8>>) {
        self.payload = payload.into();
    }

    /// Stops the packet from reaching its handler. Cannot be undone.
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub(crate) fn into_payload(self) -> Vec<u8> {
        self.payload
    }
}

impl fmt::Debug for ReceivePacketEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReceivePacketEvent")
            .field("opcode", &self.opcode)
            .field("payload_len", &self.payload.len())
            .field("cancelled", &self.cancelled)
            .finish()
    }
}

/// Observer of admitted packets.
pub trait PacketInterceptor: Send + Sync + 'static {
    fn on_receive(&self, event: &mut ReceivePacketEvent<'_>);
}

impl<F> PacketInterceptor for F
where
    F: Fn(&mut ReceivePacketEvent<'_>) + Send + Sync + 'static,
{
    fn on_receive(&self, event: &mut ReceivePacketEvent<'_>) {
        self(event)
    }
}

/// Ordered list of interceptors.
///
/// Subscribing swaps in a new list, so publishing never takes a lock and a
/// packet already in flight keeps the list it started with.
#[derive(Default)]
pub struct InterceptorBus {
    subscribers: ArcSwap<Vec<Arc<dyn PacketInterceptor>>>,
}

impl InterceptorBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an interceptor; it runs after every earlier subscriber.
    pub fn subscribe<I: PacketInterceptor>(&self, interceptor: I) {
        let interceptor: Arc<dyn PacketInterceptor> = Arc::new(interceptor);
        self.subscribers.rcu(|current| {
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push(Arc::clone(&interceptor));
            next
        });
    }

    /// Appends a closure interceptor.
    pub fn on_receive<F>(&self, interceptor: F)
    where
        F: Fn(&mut ReceivePacketEvent<'_>) + Send + Sync + 'static,
    {
        self.subscribe(interceptor);
    }

    /// Removes every interceptor.
    pub fn clear(&self) {
        self.subscribers.store(Arc::new(Vec::new()));
    }

    pub fn len(&self) -> usize {
        self.subscribers.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.load().is_empty()
    }

    /// Runs every subscriber in order against `event`.
    ///
    /// Returns `true` if the packet should continue to its handler.
    pub fn publish(&self, event: &mut ReceivePacketEvent<'_>) -> bool {
        let subscribers = self.subscribers.load();
        for subscriber in subscribers.iter() {
            subscriber.on_receive(event);
        }
        !event.is_cancelled()
    }
}

impl fmt::Debug for InterceptorBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorBus")
            .field("subscribers", &self.len())
            .finish()
    }
}
