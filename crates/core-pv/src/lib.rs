//! Shared PV data model.
//!
//! Everything both sides of the channel manager agree on lives here:
//! PV reference parsing (protocol prefix plus optional structure
//! path), field and request types, alarm severity, the cached
//! [`ChannelData`] snapshot delivered to subscribers, and structure
//! navigation for PVA payloads.

mod data;
mod protocol;
mod pva;
mod types;

pub use data::{ChannelData, ControlInfo};
pub use protocol::{FieldPath, PathSegment, PvProtocol, PvReference};
pub use pva::{
    navigate, read_section, NavError, NtAlarm, NtControl, NtDisplay, NtEnumValue, PvaValue,
};
pub use types::{AlarmSeverity, ChannelKey, FieldType, MonitorMask, RequestType};
