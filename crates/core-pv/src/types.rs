//! Field types, request types, severities, channel keys.

use std::fmt;

use bitflags::bitflags;

/// Native field type reported by the server on connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Char,
    Short,
    Long,
    Float,
    Double,
    Enum,
    String,
}

impl FieldType {
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            FieldType::Char
                | FieldType::Short
                | FieldType::Long
                | FieldType::Float
                | FieldType::Double
        )
    }

    pub fn is_enum(self) -> bool {
        self == FieldType::Enum
    }
}

/// Payload shape requested when subscribing. Control-info requests are
/// separate one-shot gets and do not participate in channel keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestType {
    TimeDouble,
    TimeFloat,
    TimeLong,
    TimeShort,
    TimeChar,
    TimeEnum,
    TimeString,
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequestType::TimeDouble => "time_double",
            RequestType::TimeFloat => "time_float",
            RequestType::TimeLong => "time_long",
            RequestType::TimeShort => "time_short",
            RequestType::TimeChar => "time_char",
            RequestType::TimeEnum => "time_enum",
            RequestType::TimeString => "time_string",
        };
        f.write_str(name)
    }
}

bitflags! {
    /// Event classes a subscription asks the server for.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct MonitorMask: u8 {
        const VALUE = 0b0001;
        const ALARM = 0b0010;
        const LOG   = 0b0100;
    }
}

impl Default for MonitorMask {
    fn default() -> Self {
        MonitorMask::VALUE | MonitorMask::ALARM
    }
}

/// Alarm severity 0..=3. Raw values outside the range collapse to
/// `Invalid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum AlarmSeverity {
    #[default]
    None,
    Minor,
    Major,
    Invalid,
}

impl AlarmSeverity {
    pub fn from_raw(raw: i16) -> Self {
        match raw {
            0 => AlarmSeverity::None,
            1 => AlarmSeverity::Minor,
            2 => AlarmSeverity::Major,
            _ => AlarmSeverity::Invalid,
        }
    }

    pub fn as_i16(self) -> i16 {
        match self {
            AlarmSeverity::None => 0,
            AlarmSeverity::Minor => 1,
            AlarmSeverity::Major => 2,
            AlarmSeverity::Invalid => 3,
        }
    }
}

/// Identity of a shared channel. Two subscribers share a channel only
/// when all three parts match; the same PV requested as a string and
/// as a double yields two channels.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelKey {
    /// Raw reference text, trimmed (protocol prefix included for PVA).
    pub pv_name: String,
    pub requested_type: RequestType,
    /// 0 means "native count".
    pub element_count: usize,
}

impl ChannelKey {
    pub fn new(pv_name: impl Into<String>, requested_type: RequestType, element_count: usize) -> Self {
        Self {
            pv_name: pv_name.into(),
            requested_type,
            element_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_round_trip_and_saturation() {
        assert_eq!(AlarmSeverity::from_raw(0), AlarmSeverity::None);
        assert_eq!(AlarmSeverity::from_raw(2), AlarmSeverity::Major);
        assert_eq!(AlarmSeverity::from_raw(9), AlarmSeverity::Invalid);
        assert_eq!(AlarmSeverity::from_raw(-1), AlarmSeverity::Invalid);
        assert_eq!(AlarmSeverity::Major.as_i16(), 2);
    }

    #[test]
    fn keys_distinguish_type_and_count() {
        let a = ChannelKey::new("R2", RequestType::TimeString, 1);
        let b = ChannelKey::new("R2", RequestType::TimeDouble, 1);
        let c = ChannelKey::new("R2", RequestType::TimeDouble, 8);
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_eq!(b, ChannelKey::new("R2", RequestType::TimeDouble, 1));
    }

    #[test]
    fn default_monitor_mask_covers_value_and_alarm() {
        let mask = MonitorMask::default();
        assert!(mask.contains(MonitorMask::VALUE));
        assert!(mask.contains(MonitorMask::ALARM));
        assert!(!mask.contains(MonitorMask::LOG));
    }

    #[test]
    fn numeric_field_types() {
        assert!(FieldType::Double.is_numeric());
        assert!(FieldType::Char.is_numeric());
        assert!(!FieldType::Enum.is_numeric());
        assert!(!FieldType::String.is_numeric());
        assert!(FieldType::Enum.is_enum());
    }
}
