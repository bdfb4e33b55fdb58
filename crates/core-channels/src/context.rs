//! Protocol contexts.
//!
//! One context per protocol, lazily initialized on first use. A
//! context owns its client and is driven by a periodic poll tick from
//! the event loop (50 ms for CA, 100 ms for PVA); polling never
//! blocks. Initialization failure is reported once, after which every
//! subscribe still succeeds structurally but the affected channels
//! never connect.

use std::time::Duration;

use core_events::ProtocolEvent;
use core_pv::PvProtocol;
use tracing::{info, warn};

use crate::client::{ClientError, ProtocolClient};

pub const CA_POLL_INTERVAL: Duration = Duration::from_millis(50);
pub const PVA_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Builds the protocol client on first use.
pub type ClientFactory = Box<dyn FnMut() -> Result<Box<dyn ProtocolClient>, ClientError>>;

pub struct ProtocolContext {
    protocol: PvProtocol,
    factory: ClientFactory,
    client: Option<Box<dyn ProtocolClient>>,
    init_failed: bool,
}

impl ProtocolContext {
    pub fn new(protocol: PvProtocol, factory: ClientFactory) -> Self {
        Self {
            protocol,
            factory,
            client: None,
            init_failed: false,
        }
    }

    /// Idempotent lazy initialization. Returns whether the context is
    /// usable; failure is logged once and remembered.
    pub fn ensure_initialized(&mut self) -> bool {
        if self.client.is_some() {
            return true;
        }
        if self.init_failed {
            return false;
        }
        match (self.factory)() {
            Ok(client) => {
                info!(target: "channels.context", protocol = ?self.protocol,
                    "protocol context initialized");
                self.client = Some(client);
                true
            }
            Err(error) => {
                warn!(target: "channels.context", protocol = ?self.protocol, %error,
                    "protocol context unavailable");
                self.init_failed = true;
                false
            }
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.client.is_some()
    }

    pub fn protocol(&self) -> PvProtocol {
        self.protocol
    }

    pub fn client_mut(&mut self) -> Option<&mut dyn ProtocolClient> {
        match self.client {
            Some(ref mut client) => Some(client.as_mut()),
            None => None,
        }
    }

    /// Drain pending client events. Empty when uninitialized.
    pub fn poll(&mut self) -> Vec<ProtocolEvent> {
        match self.client.as_deref_mut() {
            Some(client) => client.poll(),
            None => Vec::new(),
        }
    }
}
