//! Core event types and channel helpers for the PV runtime.
//!
//! Two kinds of traffic meet here. Protocol events carry deep-copied
//! channel payloads from transport threads toward the UI loop; loop
//! events (poll ticks, coordinator ticks, shutdown) drive the single
//! consumer. Both ride tokio mpsc channels: protocol traffic on
//! unbounded per-client queues drained by the poll ticks, loop events
//! on one bounded channel sized by `EVENT_CHANNEL_CAP`.

mod protocol;
pub mod stats;

use std::time::Duration;

use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;

pub use protocol::{
    ClientChannelId, ControlInfoUpdate, ProtocolEvent, ProtocolEventKind, ValueKind, ValueUpdate,
};

/// Capacity of the main loop channel. A single consumer drains it; the
/// bound exists so a runaway producer parks instead of ballooning
/// memory.
pub const EVENT_CHANNEL_CAP: usize = 8192;

/// Top-level event enum consumed by the central runtime loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Drive the Channel Access context's poll.
    CaPoll,
    /// Drive the PVAccess context's poll.
    PvaPoll,
    /// Heartbeat for the update coordinator; the coordinator decides
    /// internally whether a repaint pass is due.
    CoordinatorTick,
    Shutdown,
}

/// Trait implemented by any async event producer. Implementors hold
/// their configuration and spawn one background task that pushes
/// `Event`s into the shared channel. A task must terminate promptly
/// when `tx.send(..)` fails (consumer dropped).
pub trait AsyncEventSource: Send + 'static {
    /// Stable identifier used for logging.
    fn name(&self) -> &'static str;
    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()>;
}

/// Registry of event sources, spawned together at startup.
#[derive(Default)]
pub struct EventSourceRegistry {
    sources: Vec<Box<dyn AsyncEventSource>>,
}

impl EventSourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<S: AsyncEventSource>(&mut self, src: S) {
        self.sources.push(Box::new(src));
    }

    /// Spawn all registered sources, returning their JoinHandles. Call
    /// after constructing the primary runtime channel and before the
    /// loop begins consuming. During shutdown the caller drops its
    /// final `Sender` clone before awaiting the handles so sources
    /// observe the closed channel and exit cooperatively.
    pub fn spawn_all(&mut self, tx: &Sender<Event>) -> Vec<JoinHandle<()>> {
        let mut out = Vec::with_capacity(self.sources.len());
        for src in self.sources.drain(..) {
            let name = src.name();
            tracing::info!(target: "runtime.events", source = name, "spawning event source");
            out.push(src.spawn(tx.clone()));
        }
        out
    }
}

/// Periodic source emitting a fixed event at a fixed interval. The
/// poll cadences (CA 50 ms, PVA 100 ms) and the coordinator heartbeat
/// are all instances of this.
pub struct TickEventSource {
    name: &'static str,
    interval: Duration,
    event: Event,
}

impl TickEventSource {
    pub fn new(name: &'static str, interval: Duration, event: Event) -> Self {
        Self {
            name,
            interval,
            event,
        }
    }
}

impl AsyncEventSource for TickEventSource {
    fn name(&self) -> &'static str {
        self.name
    }

    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()> {
        let Self {
            interval, event, ..
        } = *self;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if tx.send(event.clone()).await.is_err() {
                    break;
                }
            }
        })
    }
}

/// Helper result type for channel plumbing.
pub type EventResult<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::mpsc;

    struct MockOnceSource;

    impl AsyncEventSource for MockOnceSource {
        fn name(&self) -> &'static str {
            "mock_once"
        }
        fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()> {
            tokio::spawn(async move {
                let _ = tx.send(Event::Shutdown).await;
            })
        }
    }

    #[tokio::test]
    async fn registry_spawns_and_emits() {
        let (tx, mut rx) = mpsc::channel::<Event>(8);
        let mut reg = EventSourceRegistry::new();
        reg.register(MockOnceSource);
        reg.register(TickEventSource::new(
            "ca_poll",
            Duration::from_millis(10),
            Event::CaPoll,
        ));
        let handles = reg.spawn_all(&tx);

        let mut got_shutdown = false;
        let mut got_poll = false;
        let start = std::time::Instant::now();
        while start.elapsed() < Duration::from_millis(200) && (!got_shutdown || !got_poll) {
            if let Ok(Some(ev)) = tokio::time::timeout(Duration::from_millis(20), rx.recv()).await
            {
                match ev {
                    Event::Shutdown => got_shutdown = true,
                    Event::CaPoll => got_poll = true,
                    _ => {}
                }
            }
        }
        assert!(got_shutdown, "expected mock source to emit");
        assert!(got_poll, "expected tick source to emit poll events");

        drop(tx);
        drop(rx);
        for handle in handles {
            let _ = tokio::time::timeout(Duration::from_millis(50), handle).await;
        }
    }

    #[tokio::test]
    async fn tick_source_exits_on_channel_drop() {
        let (tx, rx) = mpsc::channel::<Event>(1);
        let mut reg = EventSourceRegistry::new();
        reg.register(TickEventSource::new(
            "coordinator",
            Duration::from_millis(1),
            Event::CoordinatorTick,
        ));
        let handles = reg.spawn_all(&tx);
        drop(tx);
        drop(rx);
        for handle in handles {
            tokio::time::timeout(Duration::from_millis(100), handle)
                .await
                .expect("tick task should observe channel closure")
                .expect("tick task should exit cleanly");
        }
    }
}
