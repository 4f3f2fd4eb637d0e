use crate::core::packet::Packet;
use crate::error::{constants, ProtocolError, Result};
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, RwLock};

type HandlerFn = dyn Fn(&Packet) -> Result<Packet> + Send + Sync + 'static;

/// Packet dispatcher keyed by wire tag.
///
/// Registration is open-ended over the tag space: new command tags can be
/// added without touching the codec, and a packet whose tag has no handler
/// is reported as [`ProtocolError::Unhandled`] rather than dropped.
pub struct Dispatcher {
    handlers: Arc<RwLock<HashMap<u8, Box<HandlerFn>>>>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register the handler for a wire tag, replacing any previous one.
    pub fn register<F>(&self, tag: u8, handler: F) -> Result<()>
    where
        F: Fn(&Packet) -> Result<Packet> + Send + Sync + 'static,
    {
        let mut handlers = self
            .handlers
            .write()
            .map_err(|_| ProtocolError::Custom(constants::ERR_DISPATCHER_WRITE_LOCK.to_string()))?;

        handlers.insert(tag, Box::new(handler));
        Ok(())
    }

    /// Route a decoded packet to its handler and return the response.
    pub fn dispatch(&self, packet: &Packet) -> Result<Packet> {
        let tag = packet.tag();

        let handlers = self
            .handlers
            .read()
            .map_err(|_| ProtocolError::Custom(constants::ERR_DISPATCHER_READ_LOCK.to_string()))?;

        let handler = handlers.get(&tag).ok_or(ProtocolError::Unhandled(tag))?;

        // A panicking handler must not poison the registry lock.
        catch_unwind(AssertUnwindSafe(|| handler(packet)))
            .unwrap_or_else(|_| Err(ProtocolError::Custom(constants::ERR_HANDLER_PANIC.to_string())))
    }
}
