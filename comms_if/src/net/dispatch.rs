//! # Packet dispatch
//!
//! Inbound packets are routed to handler callbacks by packet type. The
//! registry is built during setup, before the socket exists, and is then
//! moved into the socket where the receive thread drives it.
//!
//! Handlers reach their collaborators through closure capture, so the
//! registry itself stays free of knowledge about the rest of the system.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::HashMap;

use log::{debug, error};

use crate::packet::{Packet, PacketType};

// ------------------------------------------------------------------------------------------------
// TYPES
// ------------------------------------------------------------------------------------------------

/// Result type returned by packet handlers.
pub type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

type Handler = Box<dyn Fn(&Packet) -> HandlerResult + Send + Sync>;

type EventListener = Box<dyn Fn(SockEvent) + Send + Sync>;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Connection lifecycle events reported to event listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SockEvent {
    /// The connection has been established.
    Opened,

    /// The connection has been closed. Always fired exactly once, whatever
    /// the cause of the close.
    Closed,

    /// The connection is being closed because of an unrecoverable error.
    /// Fired before the matching `Closed` event.
    Errored,
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Routes inbound packets to handlers registered per packet type.
#[derive(Default)]
pub struct PacketRegistry {
    handlers: HashMap<PacketType, Vec<Handler>>,
    listeners: Vec<EventListener>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl PacketRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for the given packet type.
    ///
    /// Handlers are invoked in registration order. A handler returning an
    /// error is logged and does not stop later handlers from running.
    ///
    /// `Disconnect` and `DisconnectAck` packets are consumed by the socket's
    /// shutdown handshake and are never dispatched here.
    pub fn add_handler<F>(&mut self, packet_type: PacketType, handler: F)
    where
        F: Fn(&Packet) -> HandlerResult + Send + Sync + 'static,
    {
        self.handlers
            .entry(packet_type)
            .or_insert_with(Vec::new)
            .push(Box::new(handler));
    }

    /// Register a listener for connection lifecycle events.
    pub fn add_event_listener<F>(&mut self, listener: F)
    where
        F: Fn(SockEvent) + Send + Sync + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    /// Number of handlers registered for the given packet type.
    pub fn handler_count(&self, packet_type: PacketType) -> usize {
        self.handlers.get(&packet_type).map_or(0, Vec::len)
    }

    /// Dispatch a packet to all handlers registered for its type.
    pub(crate) fn dispatch(&self, packet: &Packet) {
        let packet_type = packet.packet_type();

        let handlers = match self.handlers.get(&packet_type) {
            Some(h) => h,
            None => {
                debug!("No handler registered for {:?} packet, dropping", packet_type);
                return;
            }
        };

        for (i, handler) in handlers.iter().enumerate() {
            if let Err(e) = handler(packet) {
                error!("Handler {} for {:?} packet failed: {}", i, packet_type, e);
            }
        }
    }

    /// Notify all event listeners of a connection event.
    pub(crate) fn notify(&self, event: SockEvent) {
        for listener in self.listeners.iter() {
            listener(event);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_handlers_run_in_registration_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut registry = PacketRegistry::new();

        for tag in 0..3usize {
            let order = order.clone();
            registry.add_handler(PacketType::Msg, move |_| {
                order.lock().unwrap().push(tag);
                Ok(())
            });
        }

        registry.dispatch(&Packet::Msg(String::from("hi")));

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_failing_handler_does_not_stop_later_handlers() {
        let second_ran = Arc::new(AtomicUsize::new(0));
        let mut registry = PacketRegistry::new();

        registry.add_handler(PacketType::StopServer, |_| Err("broken handler".into()));

        let counter = second_ran.clone();
        registry.add_handler(PacketType::StopServer, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        registry.dispatch(&Packet::StopServer);

        assert_eq!(second_ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dispatch_without_handlers_is_a_noop() {
        let registry = PacketRegistry::new();

        // Must not panic
        registry.dispatch(&Packet::Camera(vec![1, 2, 3]));
    }

    #[test]
    fn test_handlers_only_see_their_own_type() {
        let msg_count = Arc::new(AtomicUsize::new(0));
        let mut registry = PacketRegistry::new();

        let counter = msg_count.clone();
        registry.add_handler(PacketType::Msg, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        registry.dispatch(&Packet::StopServer);
        registry.dispatch(&Packet::Msg(String::from("one")));

        assert_eq!(msg_count.load(Ordering::SeqCst), 1);
        assert_eq!(registry.handler_count(PacketType::Msg), 1);
        assert_eq!(registry.handler_count(PacketType::Camera), 0);
    }

    #[test]
    fn test_event_listeners() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut registry = PacketRegistry::new();

        let log = events.clone();
        registry.add_event_listener(move |e| log.lock().unwrap().push(e));

        registry.notify(SockEvent::Opened);
        registry.notify(SockEvent::Errored);
        registry.notify(SockEvent::Closed);

        assert_eq!(
            *events.lock().unwrap(),
            vec![SockEvent::Opened, SockEvent::Errored, SockEvent::Closed]
        );
    }
}
