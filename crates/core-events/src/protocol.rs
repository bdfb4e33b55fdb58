//! Marshaled protocol events.
//!
//! Transport callbacks run on their own threads and their buffers are
//! only valid inside the callback, so every payload here is an owned
//! deep copy. Events carry the client-side channel id; the dispatcher
//! re-validates that id against the live channel map before touching
//! state, since a channel can be destroyed between enqueue and
//! dequeue.

use std::time::SystemTime;

use core_pv::{FieldType, PvaValue};

/// Client-side channel identity, allocated by the owning context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientChannelId(pub u64);

/// One decoded, owned value event.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueUpdate {
    pub kind: ValueKind,
    pub severity: i16,
    pub status: i16,
    pub timestamp: Option<SystemTime>,
}

/// The payload shapes a subscription can deliver. Scalar numeric
/// variants keep their native width so the cache can record what the
/// server actually sent; arrays arrive widened to f64 except for char
/// arrays, which double as long strings.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueKind {
    Double(f64),
    Float(f32),
    Long(i32),
    Short(i16),
    Char(u8),
    Enum(u16),
    String(String),
    DoubleArray(Vec<f64>),
    CharArray(Vec<u8>),
    /// A PVA structure payload, navigated client-side.
    Structure(PvaValue),
}

/// One-shot control-info responses.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlInfoUpdate {
    Numeric {
        display_low: f64,
        display_high: f64,
        precision: i16,
        units: String,
    },
    Enum {
        strings: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolEventKind {
    Connection {
        connected: bool,
        native_type: Option<FieldType>,
        native_count: usize,
    },
    Value(ValueUpdate),
    ControlInfo(ControlInfoUpdate),
    AccessRights {
        can_read: bool,
        can_write: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolEvent {
    pub channel: ClientChannelId,
    pub kind: ProtocolEventKind,
}

impl ProtocolEvent {
    pub fn connection(
        channel: ClientChannelId,
        connected: bool,
        native_type: Option<FieldType>,
        native_count: usize,
    ) -> Self {
        Self {
            channel,
            kind: ProtocolEventKind::Connection {
                connected,
                native_type,
                native_count,
            },
        }
    }

    pub fn value(channel: ClientChannelId, update: ValueUpdate) -> Self {
        Self {
            channel,
            kind: ProtocolEventKind::Value(update),
        }
    }

    pub fn control_info(channel: ClientChannelId, update: ControlInfoUpdate) -> Self {
        Self {
            channel,
            kind: ProtocolEventKind::ControlInfo(update),
        }
    }

    pub fn access_rights(channel: ClientChannelId, can_read: bool, can_write: bool) -> Self {
        Self {
            channel,
            kind: ProtocolEventKind::AccessRights {
                can_read,
                can_write,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_tag_the_channel() {
        let id = ClientChannelId(7);
        let ev = ProtocolEvent::access_rights(id, true, false);
        assert_eq!(ev.channel, id);
        assert!(matches!(
            ev.kind,
            ProtocolEventKind::AccessRights {
                can_read: true,
                can_write: false
            }
        ));
    }

    #[test]
    fn value_update_is_owned_data() {
        let update = ValueUpdate {
            kind: ValueKind::DoubleArray(vec![1.0, 2.0]),
            severity: 0,
            status: 0,
            timestamp: Some(SystemTime::UNIX_EPOCH),
        };
        let ev = ProtocolEvent::value(ClientChannelId(1), update.clone());
        assert_eq!(ev.kind, ProtocolEventKind::Value(update));
    }
}
