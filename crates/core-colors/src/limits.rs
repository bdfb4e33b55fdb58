//! PV limit resolution.
//!
//! Each of {low, high, precision} carries a source selector. `Channel`
//! means "use the server-reported control info when it has arrived";
//! until then (and for `Default`/`User`) the stored default applies.
//! Precision is clamped to 0..=17 at resolution time.

use tracing::warn;

/// Where a limit value comes from at render time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LimitSource {
    #[default]
    Channel,
    Default,
    User,
}

pub const MAX_PRECISION: i16 = 17;

/// Per-widget limit configuration, as parsed from the display file or
/// edited by the user at runtime.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PvLimits {
    pub low_source: LimitSource,
    pub low_default: f64,
    pub high_source: LimitSource,
    pub high_default: f64,
    pub precision_source: LimitSource,
    pub precision_default: i16,
}

impl Default for PvLimits {
    fn default() -> Self {
        Self {
            low_source: LimitSource::Channel,
            low_default: 0.0,
            high_source: LimitSource::Channel,
            high_default: 1.0,
            precision_source: LimitSource::Channel,
            precision_default: 0,
        }
    }
}

/// Limits after resolution against (possibly absent) control info.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedLimits {
    pub low: f64,
    pub high: f64,
    pub precision: i16,
}

impl PvLimits {
    /// Resolve against server control info. `channel` fields are `None`
    /// until control info has been received, in which case the stored
    /// defaults stand in even for `LimitSource::Channel`.
    pub fn resolve(
        &self,
        channel_low: Option<f64>,
        channel_high: Option<f64>,
        channel_precision: Option<i16>,
    ) -> ResolvedLimits {
        let low = match (self.low_source, channel_low) {
            (LimitSource::Channel, Some(value)) => value,
            _ => self.low_default,
        };
        let high = match (self.high_source, channel_high) {
            (LimitSource::Channel, Some(value)) => value,
            _ => self.high_default,
        };
        let precision = match (self.precision_source, channel_precision) {
            (LimitSource::Channel, Some(value)) => value,
            _ => self.precision_default,
        };
        ResolvedLimits {
            low,
            high,
            precision: clamp_precision(precision),
        }
    }
}

/// Clamp a precision to the supported fractional-digit range.
pub(crate) fn clamp_precision(precision: i16) -> i16 {
    if !(0..=MAX_PRECISION).contains(&precision) {
        warn!(target: "colors.limits", precision, "precision out of range, clamping");
        return precision.clamp(0, MAX_PRECISION);
    }
    precision
}
