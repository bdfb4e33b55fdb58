//! In-process PV host.
//!
//! A thread-safe registry of named PVs standing in for the server
//! population a network client would reach. Channels attach to names;
//! names the host serves connect (asynchronously, through the same
//! queue-and-poll path as everything else), names it does not serve
//! stay connecting forever, which is exactly the state machine widgets
//! observe against an absent IOC. Mutations may come from any thread;
//! every event payload is an owned deep copy.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime};

use core_events::{
    ClientChannelId, ControlInfoUpdate, ProtocolEvent, ValueKind, ValueUpdate,
};
use core_pv::{FieldType, PvaValue, RequestType};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::trace;

use crate::client::{ClientError, ProtocolClient, PutValue, SubscribeRequest};

/// The value a simulated PV currently holds.
#[derive(Debug, Clone, PartialEq)]
pub enum SimValue {
    Number(f64),
    Numbers(Vec<f64>),
    Text(String),
    EnumOrdinal(u16),
    Chars(Vec<u8>),
    /// A PVA structure, served whole; navigation is client-side.
    Structure(PvaValue),
}

/// One simulated PV.
#[derive(Debug, Clone, PartialEq)]
pub struct SimPv {
    pub value: SimValue,
    pub severity: i16,
    pub status: i16,
    pub read_access: bool,
    pub write_access: bool,
    pub display_low: f64,
    pub display_high: f64,
    pub precision: i16,
    pub units: String,
    pub enum_strings: Vec<String>,
}

impl SimPv {
    pub fn numeric(value: f64) -> Self {
        Self::with_value(SimValue::Number(value))
    }

    pub fn numeric_array(values: Vec<f64>) -> Self {
        Self::with_value(SimValue::Numbers(values))
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::with_value(SimValue::Text(value.into()))
    }

    pub fn enumerated(ordinal: u16, labels: Vec<String>) -> Self {
        let mut pv = Self::with_value(SimValue::EnumOrdinal(ordinal));
        pv.enum_strings = labels;
        pv
    }

    pub fn char_wave(bytes: Vec<u8>) -> Self {
        Self::with_value(SimValue::Chars(bytes))
    }

    pub fn structure(value: PvaValue) -> Self {
        Self::with_value(SimValue::Structure(value))
    }

    fn with_value(value: SimValue) -> Self {
        Self {
            value,
            severity: 0,
            status: 0,
            read_access: true,
            write_access: false,
            display_low: 0.0,
            display_high: 0.0,
            precision: -1,
            units: String::new(),
            enum_strings: Vec::new(),
        }
    }

    pub fn writable(mut self, write_access: bool) -> Self {
        self.write_access = write_access;
        self
    }

    pub fn with_limits(mut self, low: f64, high: f64, precision: i16) -> Self {
        self.display_low = low;
        self.display_high = high;
        self.precision = precision;
        self
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = units.into();
        self
    }

    pub fn with_severity(mut self, severity: i16) -> Self {
        self.severity = severity;
        self
    }

    fn field_type(&self) -> FieldType {
        match &self.value {
            SimValue::Number(_) | SimValue::Numbers(_) | SimValue::Structure(_) => {
                FieldType::Double
            }
            SimValue::Text(_) => FieldType::String,
            SimValue::EnumOrdinal(_) => FieldType::Enum,
            SimValue::Chars(_) => FieldType::Char,
        }
    }

    fn element_count(&self) -> usize {
        match &self.value {
            SimValue::Numbers(values) => values.len().max(1),
            SimValue::Chars(bytes) => bytes.len().max(1),
            _ => 1,
        }
    }
}

struct Attachment {
    pv_name: String,
    channel: ClientChannelId,
    sender: UnboundedSender<ProtocolEvent>,
    monitor: Option<SubscribeRequest>,
}

#[derive(Default)]
struct HostInner {
    pvs: HashMap<String, SimPv>,
    attachments: Vec<Attachment>,
}

/// Shared PV registry. Cloning shares the registry.
#[derive(Clone, Default)]
pub struct SimHost {
    inner: Arc<Mutex<HostInner>>,
}

impl SimHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve (or replace) a PV. Attached channels connect immediately.
    pub fn define_pv(&self, name: impl Into<String>, pv: SimPv) {
        let name = name.into();
        let mut inner = self.inner.lock().expect("sim host poisoned");
        inner.pvs.insert(name.clone(), pv);
        notify_connection(&mut inner, &name, true);
        push_monitor_events(&mut inner, &name);
    }

    /// Withdraw a PV. Attached channels observe a disconnect and stay
    /// attached, ready for a later `define_pv`.
    pub fn remove_pv(&self, name: &str) {
        let mut inner = self.inner.lock().expect("sim host poisoned");
        if inner.pvs.remove(name).is_some() {
            notify_connection(&mut inner, name, false);
        }
    }

    pub fn set_number(&self, name: &str, value: f64) {
        self.mutate(name, |pv| pv.value = SimValue::Number(value));
    }

    pub fn set_numbers(&self, name: &str, values: Vec<f64>) {
        self.mutate(name, |pv| pv.value = SimValue::Numbers(values));
    }

    pub fn set_text(&self, name: &str, value: impl Into<String>) {
        let value = value.into();
        self.mutate(name, move |pv| pv.value = SimValue::Text(value));
    }

    pub fn set_enum_ordinal(&self, name: &str, ordinal: u16) {
        self.mutate(name, |pv| pv.value = SimValue::EnumOrdinal(ordinal));
    }

    pub fn set_structure(&self, name: &str, value: PvaValue) {
        self.mutate(name, move |pv| pv.value = SimValue::Structure(value));
    }

    pub fn set_severity(&self, name: &str, severity: i16) {
        self.mutate(name, move |pv| pv.severity = severity);
    }

    pub fn set_write_access(&self, name: &str, write_access: bool) {
        let mut inner = self.inner.lock().expect("sim host poisoned");
        let Some(pv) = inner.pvs.get_mut(name) else {
            return;
        };
        pv.write_access = write_access;
        let (read, write) = (pv.read_access, pv.write_access);
        for attachment in inner.attachments.iter().filter(|a| a.pv_name == name) {
            let _ = attachment
                .sender
                .send(ProtocolEvent::access_rights(attachment.channel, read, write));
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner
            .lock()
            .expect("sim host poisoned")
            .pvs
            .contains_key(name)
    }

    /// Spawn a client bound to this host.
    pub fn client(&self) -> SimClient {
        let (tx, rx) = unbounded_channel();
        SimClient {
            host: self.clone(),
            tx,
            rx,
            names: HashMap::new(),
        }
    }

    fn mutate(&self, name: &str, apply: impl FnOnce(&mut SimPv)) {
        let mut inner = self.inner.lock().expect("sim host poisoned");
        let Some(pv) = inner.pvs.get_mut(name) else {
            return;
        };
        apply(pv);
        push_monitor_events(&mut inner, name);
    }
}

fn notify_connection(inner: &mut HostInner, name: &str, connected: bool) {
    let info = inner
        .pvs
        .get(name)
        .map(|pv| (pv.field_type(), pv.element_count(), pv.read_access, pv.write_access));
    for attachment in inner.attachments.iter().filter(|a| a.pv_name == name) {
        if connected {
            let (field_type, count, read, write) = info.expect("connected pv present");
            let _ = attachment.sender.send(ProtocolEvent::connection(
                attachment.channel,
                true,
                Some(field_type),
                count,
            ));
            let _ = attachment
                .sender
                .send(ProtocolEvent::access_rights(attachment.channel, read, write));
        } else {
            let _ = attachment.sender.send(ProtocolEvent::connection(
                attachment.channel,
                false,
                None,
                0,
            ));
        }
    }
}

fn push_monitor_events(inner: &mut HostInner, name: &str) {
    let Some(pv) = inner.pvs.get(name) else {
        return;
    };
    let pv = pv.clone();
    for attachment in inner.attachments.iter().filter(|a| a.pv_name == name) {
        let Some(request) = attachment.monitor else {
            continue;
        };
        let update = value_update(&pv, request);
        let _ = attachment
            .sender
            .send(ProtocolEvent::value(attachment.channel, update));
    }
}

/// Convert the held value into the requested payload shape, the way a
/// server converts between native and requested DBR types.
fn value_update(pv: &SimPv, request: SubscribeRequest) -> ValueUpdate {
    let count = if request.element_count == 0 {
        pv.element_count()
    } else {
        request.element_count
    };
    let kind = match (&pv.value, request.requested_type) {
        (SimValue::Structure(value), _) => ValueKind::Structure(value.clone()),
        (SimValue::Number(x), RequestType::TimeDouble) => ValueKind::Double(*x),
        (SimValue::Number(x), RequestType::TimeFloat) => ValueKind::Float(*x as f32),
        (SimValue::Number(x), RequestType::TimeLong) => ValueKind::Long(*x as i32),
        (SimValue::Number(x), RequestType::TimeShort) => ValueKind::Short(*x as i16),
        (SimValue::Number(x), RequestType::TimeChar) => ValueKind::Char(*x as u8),
        (SimValue::Number(x), RequestType::TimeEnum) => ValueKind::Enum(*x as u16),
        (SimValue::Number(x), RequestType::TimeString) => ValueKind::String(x.to_string()),
        (SimValue::Numbers(values), requested) => {
            if count <= 1 {
                let first = values.first().copied().unwrap_or(0.0);
                return value_update(
                    &SimPv {
                        value: SimValue::Number(first),
                        ..pv.clone()
                    },
                    SubscribeRequest {
                        requested_type: requested,
                        element_count: 1,
                        mask: request.mask,
                    },
                );
            }
            ValueKind::DoubleArray(values.iter().copied().take(count).collect())
        }
        (SimValue::Text(s), RequestType::TimeString) => ValueKind::String(s.clone()),
        (SimValue::Text(s), _) => ValueKind::Double(s.trim().parse().unwrap_or(0.0)),
        (SimValue::EnumOrdinal(i), RequestType::TimeEnum) => ValueKind::Enum(*i),
        (SimValue::EnumOrdinal(i), RequestType::TimeString) => {
            let label = pv
                .enum_strings
                .get(*i as usize)
                .cloned()
                .unwrap_or_else(|| i.to_string());
            ValueKind::String(label)
        }
        (SimValue::EnumOrdinal(i), _) => ValueKind::Double(f64::from(*i)),
        (SimValue::Chars(bytes), RequestType::TimeChar) if count > 1 => {
            ValueKind::CharArray(bytes.iter().copied().take(count).collect())
        }
        (SimValue::Chars(bytes), RequestType::TimeString) => {
            let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
            ValueKind::String(String::from_utf8_lossy(&bytes[..end]).into_owned())
        }
        (SimValue::Chars(bytes), _) => {
            ValueKind::Double(f64::from(bytes.first().copied().unwrap_or(0)))
        }
    };
    ValueUpdate {
        kind,
        severity: pv.severity,
        status: pv.status,
        timestamp: Some(SystemTime::now()),
    }
}

fn control_info(pv: &SimPv) -> ControlInfoUpdate {
    if pv.field_type().is_enum() {
        ControlInfoUpdate::Enum {
            strings: pv.enum_strings.clone(),
        }
    } else {
        ControlInfoUpdate::Numeric {
            display_low: pv.display_low,
            display_high: pv.display_high,
            precision: pv.precision,
            units: pv.units.clone(),
        }
    }
}

/// One protocol context's client, bound to a [`SimHost`].
pub struct SimClient {
    host: SimHost,
    tx: UnboundedSender<ProtocolEvent>,
    rx: UnboundedReceiver<ProtocolEvent>,
    names: HashMap<ClientChannelId, String>,
}

impl ProtocolClient for SimClient {
    fn create_channel(
        &mut self,
        id: ClientChannelId,
        name: &str,
        _request_path: &str,
    ) -> Result<(), ClientError> {
        if name.trim().is_empty() {
            return Err(ClientError::CreateFailed(name.to_string()));
        }
        let mut inner = self.host.inner.lock().expect("sim host poisoned");
        let attachment = Attachment {
            pv_name: name.to_string(),
            channel: id,
            sender: self.tx.clone(),
            monitor: None,
        };
        // Served names connect right away, through the queue; absent
        // names stay attached and silent until a later define_pv.
        if let Some(pv) = inner.pvs.get(name) {
            let _ = attachment.sender.send(ProtocolEvent::connection(
                id,
                true,
                Some(pv.field_type()),
                pv.element_count(),
            ));
            let _ = attachment.sender.send(ProtocolEvent::access_rights(
                id,
                pv.read_access,
                pv.write_access,
            ));
        }
        inner.attachments.push(attachment);
        self.names.insert(id, name.to_string());
        trace!(target: "channels.sim", name, id = id.0, "channel attached");
        Ok(())
    }

    fn clear_channel(&mut self, id: ClientChannelId) {
        let mut inner = self.host.inner.lock().expect("sim host poisoned");
        inner.attachments.retain(|a| a.channel != id);
        self.names.remove(&id);
    }

    fn subscribe(
        &mut self,
        id: ClientChannelId,
        request: SubscribeRequest,
    ) -> Result<(), ClientError> {
        let mut inner = self.host.inner.lock().expect("sim host poisoned");
        let Some(attachment) = inner.attachments.iter_mut().find(|a| a.channel == id) else {
            return Err(ClientError::UnknownChannel(id.0));
        };
        attachment.monitor = Some(request);
        let name = attachment.pv_name.clone();
        // Monitors deliver the current value immediately on creation.
        if let Some(pv) = inner.pvs.get(&name) {
            let update = value_update(pv, request);
            let sender = inner
                .attachments
                .iter()
                .find(|a| a.channel == id)
                .map(|a| a.sender.clone())
                .expect("attachment just seen");
            let _ = sender.send(ProtocolEvent::value(id, update));
        }
        Ok(())
    }

    fn request_control_info(&mut self, id: ClientChannelId) -> Result<(), ClientError> {
        let inner = self.host.inner.lock().expect("sim host poisoned");
        let Some(attachment) = inner.attachments.iter().find(|a| a.channel == id) else {
            return Err(ClientError::UnknownChannel(id.0));
        };
        if let Some(pv) = inner.pvs.get(&attachment.pv_name) {
            let _ = attachment
                .sender
                .send(ProtocolEvent::control_info(id, control_info(pv)));
        }
        Ok(())
    }

    fn put(&mut self, id: ClientChannelId, value: PutValue) -> Result<(), ClientError> {
        let name = self
            .names
            .get(&id)
            .cloned()
            .ok_or(ClientError::UnknownChannel(id.0))?;
        let mut inner = self.host.inner.lock().expect("sim host poisoned");
        let Some(pv) = inner.pvs.get_mut(&name) else {
            return Err(ClientError::PutRejected(format!("{name}: not connected")));
        };
        if !pv.write_access {
            return Err(ClientError::PutRejected(format!("{name}: no write access")));
        }
        let next = match value {
            PutValue::Double(x) => SimValue::Number(x),
            PutValue::Text(s) => match &pv.value {
                // Writing a string to an enum PV selects by label.
                SimValue::EnumOrdinal(_) => {
                    let ordinal = pv
                        .enum_strings
                        .iter()
                        .position(|label| *label == s)
                        .map(|i| i as u16);
                    match ordinal {
                        Some(i) => SimValue::EnumOrdinal(i),
                        None => {
                            return Err(ClientError::PutRejected(format!(
                                "{name}: no choice {s:?}"
                            )))
                        }
                    }
                }
                _ => SimValue::Text(s),
            },
            PutValue::EnumOrdinal(i) => SimValue::EnumOrdinal(i),
            PutValue::CharArray(bytes) => SimValue::Chars(bytes),
            PutValue::DoubleArray(values) => SimValue::Numbers(values),
        };
        pv.value = next;
        push_monitor_events(&mut inner, &name);
        Ok(())
    }

    fn poll(&mut self) -> Vec<ProtocolEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn wait_connected(&mut self, id: ClientChannelId, timeout: Duration) -> bool {
        let Some(name) = self.names.get(&id).cloned() else {
            return false;
        };
        let deadline = Instant::now() + timeout;
        loop {
            if self.host.contains(&name) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }
}
