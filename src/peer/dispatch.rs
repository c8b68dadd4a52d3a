use std::collections::HashMap;
use std::net::SocketAddr;

use bytes::Bytes;
use tracing::debug;

use super::error::PeerError;
use super::message::{Frame, MessageId};

/// Handles the payload of one message id on an established session.
///
/// Returning an error closes the session. Closures of the matching shape
/// implement this trait, so simple handlers need no type of their own.
pub trait MessageHandler: Send {
    fn handle(&mut self, peer: SocketAddr, payload: &Bytes) -> Result<(), PeerError>;
}

impl<F> MessageHandler for F
where
    F: FnMut(SocketAddr, &Bytes) -> Result<(), PeerError> + Send,
{
    fn handle(&mut self, peer: SocketAddr, payload: &Bytes) -> Result<(), PeerError> {
        self(peer, payload)
    }
}

/// Fallback handler: logs the message and drops it.
#[derive(Debug, Default, Clone, Copy)]
pub struct IgnoreUnrecognized;

impl MessageHandler for IgnoreUnrecognized {
    fn handle(&mut self, peer: SocketAddr, payload: &Bytes) -> Result<(), PeerError> {
        debug!(%peer, len = payload.len(), "ignoring unrecognized message");
        Ok(())
    }
}

/// What [`Dispatcher::dispatch`] did with a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatched {
    KeepAlive,
    /// A registered handler took the message.
    Handled(u8),
    /// No handler was registered; the fallback took it.
    Unrecognized(u8),
}

/// Routes framed messages to handlers by message id.
///
/// # Examples
///
/// ```
/// use seedling::peer::{Dispatched, Dispatcher, Frame, MessageId, PeerError};
/// use bytes::Bytes;
/// use std::net::SocketAddr;
///
/// let mut dispatcher = Dispatcher::new();
/// dispatcher.register(
///     MessageId::Have,
///     |_peer: SocketAddr, payload: &Bytes| -> Result<(), PeerError> {
///         assert_eq!(payload.len(), 4);
///         Ok(())
///     },
/// );
///
/// let peer = "127.0.0.1:6881".parse().unwrap();
/// let have = Frame::Message { id: 4, payload: Bytes::from_static(&[0, 0, 0, 7]) };
/// assert_eq!(dispatcher.dispatch(peer, &have).unwrap(), Dispatched::Handled(4));
///
/// let unknown = Frame::Message { id: 42, payload: Bytes::new() };
/// assert_eq!(dispatcher.dispatch(peer, &unknown).unwrap(), Dispatched::Unrecognized(42));
/// ```
pub struct Dispatcher {
    handlers: HashMap<u8, Box<dyn MessageHandler>>,
    fallback: Box<dyn MessageHandler>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            fallback: Box::new(IgnoreUnrecognized),
        }
    }

    /// Registers a handler for a standard message id, replacing any earlier one.
    pub fn register<H>(&mut self, id: MessageId, handler: H)
    where
        H: MessageHandler + 'static,
    {
        self.register_raw(id as u8, handler);
    }

    /// Registers a handler for an arbitrary id, including non-standard ones.
    pub fn register_raw<H>(&mut self, id: u8, handler: H)
    where
        H: MessageHandler + 'static,
    {
        self.handlers.insert(id, Box::new(handler));
    }

    /// Replaces the handler used for ids with no registered handler.
    pub fn with_fallback<H>(mut self, handler: H) -> Self
    where
        H: MessageHandler + 'static,
    {
        self.fallback = Box::new(handler);
        self
    }

    pub fn is_registered(&self, id: u8) -> bool {
        self.handlers.contains_key(&id)
    }

    pub fn dispatch(&mut self, peer: SocketAddr, frame: &Frame) -> Result<Dispatched, PeerError> {
        let (id, payload) = match frame {
            Frame::KeepAlive => return Ok(Dispatched::KeepAlive),
            Frame::Message { id, payload } => (*id, payload),
        };

        match self.handlers.get_mut(&id) {
            Some(handler) => {
                handler.handle(peer, payload)?;
                Ok(Dispatched::Handled(id))
            }
            None => {
                debug!(%peer, id, "no handler registered");
                self.fallback.handle(peer, payload)?;
                Ok(Dispatched::Unrecognized(id))
            }
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}
