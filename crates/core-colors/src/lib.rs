//! Color and limit utilities shared by the widget runtimes.
//!
//! Holds the fixed 65-entry display palette (display files reference
//! colors by index), the alarm-severity color mapping, PV limit
//! resolution, and numeric formatting helpers.

mod format;
mod limits;
mod palette;

pub use format::{format_general, format_with_precision};
pub use limits::{LimitSource, PvLimits, ResolvedLimits, MAX_PRECISION};
pub use palette::{
    alarm_color_for_severity, index_for_color, palette, Rgb, ALARM_COLOR_COUNT, PALETTE_SIZE,
};
