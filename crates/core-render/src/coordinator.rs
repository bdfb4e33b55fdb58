//! The batching repaint coordinator.
//!
//! `request_update` appends to a pending set deduplicated by widget
//! identity. A heartbeat drives `tick`; when the current interval has
//! elapsed the pending set is drained and every widget in it repaints
//! exactly once. Composite re-order requests ride the same tick so
//! bursts of visibility flips coalesce into one stacking pass.
//!
//! Adaptive throttling: a pass arriving more than `LATE_THRESHOLD_MS`
//! past its due time counts as late; five consecutive late passes
//! raise the interval by 50 ms (1000 ms ceiling), one hundred
//! consecutive on-time passes lower it by 50 ms (100 ms floor).

use std::collections::HashSet;
use std::time::{Duration, Instant};

use tracing::{debug, trace};

/// Identity of a widget instance within one runtime session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WidgetId(pub u64);

pub const BASE_INTERVAL_MS: u64 = 200;
pub const MIN_INTERVAL_MS: u64 = 100;
pub const MAX_INTERVAL_MS: u64 = 1000;
pub const LATE_THRESHOLD_MS: u64 = 50;
pub const LATE_COUNT_THRESHOLD: u32 = 5;
pub const ON_TIME_COUNT_THRESHOLD: u32 = 100;
const INTERVAL_STEP_MS: u64 = 50;

/// Result of one heartbeat.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickOutcome {
    /// Did a repaint pass fire?
    pub fired: bool,
    /// Widgets to repaint, in request order, each at most once.
    pub repaint: Vec<WidgetId>,
    /// Composites whose child stacking must be recomputed.
    pub reorder: Vec<WidgetId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CoordinatorMetricsSnapshot {
    pub passes_fired: u64,
    pub widgets_repainted: u64,
    pub escalations: u64,
    pub recoveries: u64,
}

#[derive(Debug)]
pub struct UpdateCoordinator {
    pending: Vec<WidgetId>,
    pending_set: HashSet<WidgetId, ahash::RandomState>,
    reorders: Vec<WidgetId>,
    reorder_set: HashSet<WidgetId, ahash::RandomState>,

    base_interval: Duration,
    current_interval: Duration,
    next_due: Option<Instant>,
    late_ticks: u32,
    on_time_ticks: u32,

    metrics: CoordinatorMetricsSnapshot,
}

impl Default for UpdateCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl UpdateCoordinator {
    pub fn new() -> Self {
        Self::with_base_interval(Duration::from_millis(BASE_INTERVAL_MS))
    }

    pub fn with_base_interval(base: Duration) -> Self {
        let base = base.max(Duration::from_millis(10));
        Self {
            pending: Vec::new(),
            pending_set: HashSet::default(),
            reorders: Vec::new(),
            reorder_set: HashSet::default(),
            base_interval: base,
            current_interval: base,
            next_due: None,
            late_ticks: 0,
            on_time_ticks: 0,
            metrics: CoordinatorMetricsSnapshot::default(),
        }
    }

    /// Queue a repaint. Repeat requests for the same widget before the
    /// next pass are coalesced.
    pub fn request_update(&mut self, widget: WidgetId) {
        if self.pending_set.insert(widget) {
            self.pending.push(widget);
        }
    }

    /// Queue a stacking recomputation for a composite, coalesced to
    /// the next pass.
    pub fn request_reorder(&mut self, composite: WidgetId) {
        if self.reorder_set.insert(composite) {
            self.reorders.push(composite);
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn current_interval(&self) -> Duration {
        self.current_interval
    }

    pub fn is_throttled(&self) -> bool {
        self.current_interval > self.base_interval
    }

    /// Drop adaptive state and return to the base cadence.
    pub fn reset_throttling(&mut self) {
        self.current_interval = self.base_interval;
        self.late_ticks = 0;
        self.on_time_ticks = 0;
        self.next_due = None;
    }

    pub fn metrics_snapshot(&self) -> CoordinatorMetricsSnapshot {
        self.metrics
    }

    /// Heartbeat. Fires a repaint pass when the current interval has
    /// elapsed; otherwise returns an empty outcome. The heartbeat may
    /// run much faster than the repaint cadence.
    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        let due = match self.next_due {
            None => {
                self.next_due = Some(now + self.current_interval);
                return TickOutcome::default();
            }
            Some(due) => due,
        };
        if now < due {
            return TickOutcome::default();
        }

        self.observe_lateness(now - due);
        self.next_due = Some(now + self.current_interval);

        let repaint = std::mem::take(&mut self.pending);
        self.pending_set.clear();
        let reorder = std::mem::take(&mut self.reorders);
        self.reorder_set.clear();

        self.metrics.passes_fired += 1;
        self.metrics.widgets_repainted += repaint.len() as u64;
        trace!(target: "render.coordinator",
            repaint = repaint.len(), reorder = reorder.len(), "repaint pass");

        TickOutcome {
            fired: true,
            repaint,
            reorder,
        }
    }

    fn observe_lateness(&mut self, lateness: Duration) {
        if lateness > Duration::from_millis(LATE_THRESHOLD_MS) {
            self.late_ticks += 1;
            self.on_time_ticks = 0;
            if self.late_ticks >= LATE_COUNT_THRESHOLD {
                self.late_ticks = 0;
                let raised = (self.current_interval + Duration::from_millis(INTERVAL_STEP_MS))
                    .min(Duration::from_millis(MAX_INTERVAL_MS));
                if raised != self.current_interval {
                    self.metrics.escalations += 1;
                    debug!(target: "render.coordinator",
                        interval_ms = raised.as_millis() as u64,
                        "consistently late, raising repaint interval");
                    self.current_interval = raised;
                }
            }
        } else {
            self.on_time_ticks += 1;
            self.late_ticks = 0;
            if self.on_time_ticks >= ON_TIME_COUNT_THRESHOLD {
                self.on_time_ticks = 0;
                let floor = self.base_interval.max(Duration::from_millis(MIN_INTERVAL_MS));
                let lowered = self
                    .current_interval
                    .saturating_sub(Duration::from_millis(INTERVAL_STEP_MS))
                    .max(floor.min(self.current_interval));
                if lowered != self.current_interval {
                    self.metrics.recoveries += 1;
                    debug!(target: "render.coordinator",
                        interval_ms = lowered.as_millis() as u64,
                        "recovered, lowering repaint interval");
                    self.current_interval = lowered;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fire_once(c: &mut UpdateCoordinator, t: &mut Instant, lateness_ms: u64) -> TickOutcome {
        // First tick after construction only arms the schedule.
        if c.next_due.is_none() {
            c.tick(*t);
        }
        *t += c.current_interval() + Duration::from_millis(lateness_ms);
        c.tick(*t)
    }

    #[test]
    fn requests_are_deduplicated_and_drained_once() {
        let mut c = UpdateCoordinator::new();
        let mut t = Instant::now();
        c.request_update(WidgetId(1));
        c.request_update(WidgetId(2));
        c.request_update(WidgetId(1));
        let out = fire_once(&mut c, &mut t, 0);
        assert!(out.fired);
        assert_eq!(out.repaint, vec![WidgetId(1), WidgetId(2)]);
        assert_eq!(c.pending_count(), 0);

        let out = fire_once(&mut c, &mut t, 0);
        assert!(out.fired);
        assert!(out.repaint.is_empty());
    }

    #[test]
    fn no_fire_before_interval() {
        let mut c = UpdateCoordinator::new();
        let t = Instant::now();
        c.tick(t); // arm
        let out = c.tick(t + Duration::from_millis(50));
        assert!(!out.fired);
    }

    #[test]
    fn five_late_passes_raise_interval() {
        let mut c = UpdateCoordinator::new();
        let mut t = Instant::now();
        for _ in 0..4 {
            fire_once(&mut c, &mut t, 80);
            assert!(!c.is_throttled());
        }
        fire_once(&mut c, &mut t, 80);
        assert!(c.is_throttled());
        assert_eq!(c.current_interval(), Duration::from_millis(250));
        assert_eq!(c.metrics_snapshot().escalations, 1);
    }

    #[test]
    fn interval_is_capped_at_the_ceiling() {
        let mut c = UpdateCoordinator::new();
        let mut t = Instant::now();
        // 25 escalations' worth of late passes; cap is 1000 ms.
        for _ in 0..(25 * LATE_COUNT_THRESHOLD) {
            fire_once(&mut c, &mut t, 200);
        }
        assert_eq!(c.current_interval(), Duration::from_millis(MAX_INTERVAL_MS));
    }

    #[test]
    fn on_time_passes_recover_toward_base() {
        let mut c = UpdateCoordinator::new();
        let mut t = Instant::now();
        for _ in 0..LATE_COUNT_THRESHOLD {
            fire_once(&mut c, &mut t, 80);
        }
        assert_eq!(c.current_interval(), Duration::from_millis(250));
        for _ in 0..ON_TIME_COUNT_THRESHOLD {
            fire_once(&mut c, &mut t, 0);
        }
        assert_eq!(c.current_interval(), Duration::from_millis(200));
        assert!(!c.is_throttled());
        assert_eq!(c.metrics_snapshot().recoveries, 1);
    }

    #[test]
    fn a_late_pass_resets_the_recovery_streak() {
        let mut c = UpdateCoordinator::new();
        let mut t = Instant::now();
        for _ in 0..LATE_COUNT_THRESHOLD {
            fire_once(&mut c, &mut t, 80);
        }
        for _ in 0..(ON_TIME_COUNT_THRESHOLD - 1) {
            fire_once(&mut c, &mut t, 0);
        }
        fire_once(&mut c, &mut t, 80); // resets on-time streak
        for _ in 0..(ON_TIME_COUNT_THRESHOLD - 1) {
            fire_once(&mut c, &mut t, 0);
        }
        assert!(c.is_throttled(), "streak must restart after a late pass");
    }

    #[test]
    fn reorders_ride_the_same_pass() {
        let mut c = UpdateCoordinator::new();
        let mut t = Instant::now();
        c.request_reorder(WidgetId(9));
        c.request_reorder(WidgetId(9));
        let out = fire_once(&mut c, &mut t, 0);
        assert_eq!(out.reorder, vec![WidgetId(9)]);
    }

    #[test]
    fn reset_returns_to_base() {
        let mut c = UpdateCoordinator::new();
        let mut t = Instant::now();
        for _ in 0..(3 * LATE_COUNT_THRESHOLD) {
            fire_once(&mut c, &mut t, 200);
        }
        assert!(c.is_throttled());
        c.reset_throttling();
        assert!(!c.is_throttled());
        assert_eq!(c.current_interval(), Duration::from_millis(BASE_INTERVAL_MS));
    }
}
