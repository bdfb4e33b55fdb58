//! Startup phase timing, enabled by `QTEDM_TIMING_DIAGNOSTICS=1`.

use std::time::Instant;

use tracing::info;

pub struct StartupTiming {
    enabled: bool,
    start: Instant,
}

impl StartupTiming {
    pub fn from_env() -> Self {
        let enabled = std::env::var("QTEDM_TIMING_DIAGNOSTICS")
            .map(|value| value == "1")
            .unwrap_or(false);
        Self {
            enabled,
            start: Instant::now(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.start.elapsed().as_millis()
    }

    /// Stamp a named phase.
    pub fn mark(&self, phase: &str) {
        if !self.enabled {
            return;
        }
        info!(target: "timing", elapsed_ms = self.elapsed_ms() as u64, phase, "startup mark");
    }

    /// Stamp a named phase with a count (widgets loaded, channels
    /// created, ...).
    pub fn mark_count(&self, phase: &str, count: usize) {
        if !self.enabled {
            return;
        }
        info!(target: "timing", elapsed_ms = self.elapsed_ms() as u64, phase, count,
            "startup mark");
    }
}
