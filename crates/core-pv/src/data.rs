//! The cached per-channel snapshot delivered to subscribers.

use std::time::SystemTime;

use crate::types::{AlarmSeverity, FieldType};

/// Server-reported display metadata from a control-info request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ControlInfo {
    pub display_low: f64,
    pub display_high: f64,
    /// Negative means "not reported".
    pub precision: i16,
    pub units: String,
    pub enum_strings: Vec<String>,
}

/// Cached channel values and metadata, stored in several formats at
/// once so subscribers pick whichever view they need. The `is_*` /
/// `has_*` flags say which fields are currently meaningful.
///
/// Invariant: `connected == false` implies `has_value == false`.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelData {
    pub connected: bool,

    pub native_field_type: Option<FieldType>,
    pub native_element_count: usize,

    pub numeric_value: f64,
    pub string_value: String,
    pub enum_value: u16,
    pub array_values: Vec<f64>,
    pub char_array: Vec<u8>,

    pub severity: AlarmSeverity,
    pub status: i16,
    pub timestamp: Option<SystemTime>,

    pub control: ControlInfo,
    pub has_control_info: bool,
    pub has_units: bool,
    pub has_precision: bool,

    pub has_value: bool,
    pub is_numeric: bool,
    pub is_string: bool,
    pub is_enum: bool,
    pub is_char_array: bool,
    pub is_array: bool,
}

impl Default for ChannelData {
    fn default() -> Self {
        Self {
            connected: false,
            native_field_type: None,
            native_element_count: 0,
            numeric_value: 0.0,
            string_value: String::new(),
            enum_value: 0,
            array_values: Vec::new(),
            char_array: Vec::new(),
            severity: AlarmSeverity::None,
            status: 0,
            timestamp: None,
            control: ControlInfo::default(),
            has_control_info: false,
            has_units: false,
            has_precision: false,
            has_value: false,
            is_numeric: false,
            is_string: false,
            is_enum: false,
            is_char_array: false,
            is_array: false,
        }
    }
}

impl ChannelData {
    /// Clear value state on disconnect. Control info is dropped too;
    /// it is re-requested on reconnect since the server may have
    /// changed underneath us.
    pub fn mark_disconnected(&mut self) {
        self.connected = false;
        self.has_value = false;
        self.has_control_info = false;
        self.has_units = false;
        self.has_precision = false;
    }

    /// Reset the per-event type flags before decoding a new payload.
    pub fn clear_value_flags(&mut self) {
        self.is_numeric = false;
        self.is_string = false;
        self.is_enum = false;
        self.is_char_array = false;
        self.is_array = false;
        self.array_values.clear();
        self.char_array.clear();
    }

    /// Server-reported limits for `PvLimits::resolve`, present only
    /// once control info has been received.
    pub fn channel_limits(&self) -> (Option<f64>, Option<f64>, Option<i16>) {
        if !self.has_control_info {
            return (None, None, None);
        }
        let precision = (self.control.precision >= 0).then_some(self.control.precision);
        (
            Some(self.control.display_low),
            Some(self.control.display_high),
            precision,
        )
    }

    /// Label for the current enum ordinal, when one is known.
    pub fn enum_label(&self) -> Option<&str> {
        self.control
            .enum_strings
            .get(self.enum_value as usize)
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disconnect_clears_value_visibility() {
        let mut data = ChannelData {
            connected: true,
            has_value: true,
            has_control_info: true,
            ..ChannelData::default()
        };
        data.mark_disconnected();
        assert!(!data.connected);
        assert!(!data.has_value);
        assert!(!data.has_control_info);
    }

    #[test]
    fn channel_limits_absent_without_control_info() {
        let data = ChannelData::default();
        assert_eq!(data.channel_limits(), (None, None, None));
    }

    #[test]
    fn channel_limits_skip_unreported_precision() {
        let mut data = ChannelData::default();
        data.control.display_low = -5.0;
        data.control.display_high = 5.0;
        data.control.precision = -1;
        data.has_control_info = true;
        assert_eq!(data.channel_limits(), (Some(-5.0), Some(5.0), None));
    }

    #[test]
    fn enum_label_lookup() {
        let mut data = ChannelData::default();
        data.control.enum_strings = vec!["Off".into(), "On".into()];
        data.enum_value = 1;
        assert_eq!(data.enum_label(), Some("On"));
        data.enum_value = 5;
        assert_eq!(data.enum_label(), None);
    }
}
