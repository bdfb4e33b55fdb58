//! Repaint coordination.
//!
//! Widgets never repaint directly on data changes; they report a
//! `needs-repaint` intent and the [`UpdateCoordinator`] batches those
//! into fixed-cadence passes, throttling adaptively when passes run
//! late. The only widgets exempt from coordination are the ones whose
//! visual rate is intrinsic to correctness (strip-chart time axis,
//! cartesian plots); those repaint on their own schedule.

mod coordinator;

pub use coordinator::{
    CoordinatorMetricsSnapshot, TickOutcome, UpdateCoordinator, WidgetId, BASE_INTERVAL_MS,
    LATE_COUNT_THRESHOLD, LATE_THRESHOLD_MS, MAX_INTERVAL_MS, MIN_INTERVAL_MS,
    ON_TIME_COUNT_THRESHOLD,
};
