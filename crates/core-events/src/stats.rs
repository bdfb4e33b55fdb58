//! Aggregate runtime statistics.
//!
//! Relaxed atomic counters (no locking, `fetch_add` relaxed) covering
//! channel lifecycles, protocol traffic and display-object churn. The
//! statistics view captures a [`StatsSnapshot`] each tick; per-channel
//! rates live on the channel manager, not here.

use std::sync::atomic::{AtomicU64, Ordering::Relaxed};

pub static CHANNELS_CREATED: AtomicU64 = AtomicU64::new(0);
pub static CHANNELS_DESTROYED: AtomicU64 = AtomicU64::new(0);
pub static CHANNELS_CONNECTED: AtomicU64 = AtomicU64::new(0);
pub static CHANNELS_DISCONNECTED: AtomicU64 = AtomicU64::new(0);
pub static CA_EVENTS: AtomicU64 = AtomicU64::new(0);
pub static PVA_EVENTS: AtomicU64 = AtomicU64::new(0);
pub static UPDATES_REQUESTED: AtomicU64 = AtomicU64::new(0);
pub static UPDATES_EXECUTED: AtomicU64 = AtomicU64::new(0);
pub static DISPLAY_OBJECTS_STARTED: AtomicU64 = AtomicU64::new(0);
pub static DISPLAY_OBJECTS_STOPPED: AtomicU64 = AtomicU64::new(0);

pub fn register_channel_created() {
    CHANNELS_CREATED.fetch_add(1, Relaxed);
}

pub fn register_channel_destroyed() {
    CHANNELS_DESTROYED.fetch_add(1, Relaxed);
}

pub fn register_channel_connected() {
    CHANNELS_CONNECTED.fetch_add(1, Relaxed);
}

pub fn register_channel_disconnected() {
    CHANNELS_DISCONNECTED.fetch_add(1, Relaxed);
}

pub fn register_ca_event() {
    CA_EVENTS.fetch_add(1, Relaxed);
}

pub fn register_pva_event() {
    PVA_EVENTS.fetch_add(1, Relaxed);
}

pub fn register_update_requested() {
    UPDATES_REQUESTED.fetch_add(1, Relaxed);
}

pub fn register_update_executed() {
    UPDATES_EXECUTED.fetch_add(1, Relaxed);
}

pub fn register_display_object_started() {
    DISPLAY_OBJECTS_STARTED.fetch_add(1, Relaxed);
}

pub fn register_display_object_stopped() {
    DISPLAY_OBJECTS_STOPPED.fetch_add(1, Relaxed);
}

/// Point-in-time view of every counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub channels_created: u64,
    pub channels_destroyed: u64,
    pub channels_connected: u64,
    pub channels_disconnected: u64,
    pub ca_events: u64,
    pub pva_events: u64,
    pub updates_requested: u64,
    pub updates_executed: u64,
    pub display_objects_started: u64,
    pub display_objects_stopped: u64,
}

impl StatsSnapshot {
    pub fn capture() -> Self {
        Self {
            channels_created: CHANNELS_CREATED.load(Relaxed),
            channels_destroyed: CHANNELS_DESTROYED.load(Relaxed),
            channels_connected: CHANNELS_CONNECTED.load(Relaxed),
            channels_disconnected: CHANNELS_DISCONNECTED.load(Relaxed),
            ca_events: CA_EVENTS.load(Relaxed),
            pva_events: PVA_EVENTS.load(Relaxed),
            updates_requested: UPDATES_REQUESTED.load(Relaxed),
            updates_executed: UPDATES_EXECUTED.load(Relaxed),
            display_objects_started: DISPLAY_OBJECTS_STARTED.load(Relaxed),
            display_objects_stopped: DISPLAY_OBJECTS_STOPPED.load(Relaxed),
        }
    }

    /// Channels currently alive according to the lifecycle counters.
    pub fn live_channels(&self) -> u64 {
        self.channels_created.saturating_sub(self.channels_destroyed)
    }
}
