//! The shared channel manager.
//!
//! Widgets monitoring the same PV with the same requested type and
//! element count share one protocol channel; a different type or
//! count against the same name is a separate channel. Subscribers are
//! fanned out on the UI thread only, and never while internal state
//! is borrowed, so a callback may freely subscribe or drop its own
//! handle mid-fan-out.
//!
//! Notification gating per channel: an update reaches subscribers only
//! if something observable changed (numeric value, string value, enum
//! ordinal or severity) and at least [`MIN_NOTIFY_INTERVAL`] has
//! passed since the previous delivery; the first value after a
//! connect is always delivered. Gated values still land in the cache
//! and a pending flag guarantees the final value of a burst goes out
//! on a later flush, so the last value is never lost.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use std::sync::Arc;
use std::time::{Duration, Instant};

use core_audit::AuditLogger;
use core_events::{
    stats, ClientChannelId, ControlInfoUpdate, ProtocolEvent, ProtocolEventKind, ValueKind,
    ValueUpdate,
};
use core_pv::{
    navigate, read_section, AlarmSeverity, ChannelData, ChannelKey, FieldType, MonitorMask,
    NtAlarm, NtDisplay, NtEnumValue, PvProtocol, PvReference, PvaValue, RequestType,
};
use tracing::{debug, trace, warn};

use crate::client::{ClientError, PutValue, SubscribeRequest};
use crate::context::{ClientFactory, ProtocolContext};
use crate::sim::SimHost;

/// Minimum interval between subscriber notifications per channel
/// (10 Hz ceiling on widget-visible updates).
pub const MIN_NOTIFY_INTERVAL: Duration = Duration::from_millis(100);

/// Bounded connect wait for the temporary-channel put path.
const PUT_CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

type ValueCallback = Box<dyn FnMut(&ChannelData)>;
type ConnectionCallback = Box<dyn FnMut(bool, &ChannelData)>;
type AccessCallback = Box<dyn FnMut(bool, bool)>;

/// Callbacks one subscriber registers. The value callback is
/// mandatory; the others are optional.
#[derive(Default)]
pub struct SubscriberCallbacks {
    value: Option<ValueCallback>,
    connection: Option<ConnectionCallback>,
    access: Option<AccessCallback>,
}

impl SubscriberCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_value(mut self, callback: impl FnMut(&ChannelData) + 'static) -> Self {
        self.value = Some(Box::new(callback));
        self
    }

    pub fn on_connection(mut self, callback: impl FnMut(bool, &ChannelData) + 'static) -> Self {
        self.connection = Some(Box::new(callback));
        self
    }

    pub fn on_access_rights(mut self, callback: impl FnMut(bool, bool) + 'static) -> Self {
        self.access = Some(Box::new(callback));
        self
    }
}

/// Summary row for the statistics view.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSummary {
    pub pv_name: String,
    pub connected: bool,
    pub writable: bool,
    pub subscriber_count: usize,
    pub update_count: u64,
    pub updates_per_second: f64,
    pub severity: AlarmSeverity,
}

#[derive(Debug, Clone, PartialEq)]
struct LastSent {
    numeric: f64,
    string: String,
    enum_value: u16,
    severity: AlarmSeverity,
}

struct SubscriberEntry {
    id: u64,
    callbacks: Rc<RefCell<SubscriberCallbacks>>,
}

struct Channel {
    id: u64,
    key: ChannelKey,
    reference: PvReference,
    connected: bool,
    subscribed: bool,
    control_info_requested: bool,
    create_failed: bool,
    nav_error_logged: bool,
    can_read: bool,
    can_write: bool,
    cached: ChannelData,
    subscribers: Vec<SubscriberEntry>,
    update_count: u64,
    last_notify: Option<Instant>,
    last_sent: Option<LastSent>,
    notify_pending: bool,
}

impl Channel {
    fn new(id: u64, key: ChannelKey, reference: PvReference) -> Self {
        Self {
            id,
            key,
            reference,
            connected: false,
            subscribed: false,
            control_info_requested: false,
            create_failed: false,
            nav_error_logged: false,
            can_read: false,
            can_write: false,
            cached: ChannelData::default(),
            subscribers: Vec::new(),
            update_count: 0,
            last_notify: None,
            last_sent: None,
            notify_pending: false,
        }
    }
}

struct ManagerInner {
    ca: ProtocolContext,
    pva: ProtocolContext,
    channels: HashMap<u64, Channel, ahash::RandomState>,
    key_index: HashMap<ChannelKey, u64, ahash::RandomState>,
    sub_index: HashMap<u64, u64, ahash::RandomState>,
    next_channel_id: u64,
    next_subscription_id: u64,
    audit: Arc<AuditLogger>,
    display_file: Option<String>,
    rate_window_start: Option<Instant>,
}

impl ManagerInner {
    fn context_mut(&mut self, protocol: PvProtocol) -> &mut ProtocolContext {
        match protocol {
            PvProtocol::Ca => &mut self.ca,
            PvProtocol::Pva => &mut self.pva,
        }
    }
}

/// Construction parameters for a [`ChannelHub`].
pub struct HubConfig {
    pub audit: Arc<AuditLogger>,
    pub ca_factory: ClientFactory,
    pub pva_factory: ClientFactory,
}

/// Outcome of a put, for callers that care why a write went nowhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Written,
    Rejected,
}

impl PutOutcome {
    pub fn written(self) -> bool {
        self == PutOutcome::Written
    }
}

/// UI-thread handle to the shared channel manager. Clones share state.
#[derive(Clone)]
pub struct ChannelHub {
    inner: Rc<RefCell<ManagerInner>>,
}

/// RAII subscription token. Dropping (or `reset`) removes the
/// subscriber; the last subscriber leaving a channel destroys it.
#[derive(Default)]
pub struct SubscriptionHandle {
    id: u64,
    owner: Weak<RefCell<ManagerInner>>,
}

impl SubscriptionHandle {
    pub fn is_valid(&self) -> bool {
        self.id != 0
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Explicitly release the subscription.
    pub fn reset(&mut self) {
        if self.id == 0 {
            return;
        }
        if let Some(inner) = self.owner.upgrade() {
            ChannelHub::unsubscribe(&inner, self.id);
        }
        self.id = 0;
        self.owner = Weak::new();
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.reset();
    }
}

impl ChannelHub {
    pub fn new(config: HubConfig) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ManagerInner {
                ca: ProtocolContext::new(PvProtocol::Ca, config.ca_factory),
                pva: ProtocolContext::new(PvProtocol::Pva, config.pva_factory),
                channels: HashMap::default(),
                key_index: HashMap::default(),
                sub_index: HashMap::default(),
                next_channel_id: 1,
                next_subscription_id: 1,
                audit: config.audit,
                display_file: None,
                rate_window_start: None,
            })),
        }
    }

    /// Hub whose both protocol contexts talk to the given in-process
    /// host.
    pub fn with_sim_host(host: SimHost, audit: Arc<AuditLogger>) -> Self {
        let ca_host = host.clone();
        let pva_host = host;
        Self::new(HubConfig {
            audit,
            ca_factory: Box::new(move || Ok(Box::new(ca_host.client()))),
            pva_factory: Box::new(move || Ok(Box::new(pva_host.client()))),
        })
    }

    /// Display file recorded on audit lines for subsequent puts.
    pub fn set_display_file(&self, display_file: Option<String>) {
        self.inner.borrow_mut().display_file = display_file;
    }

    /// Subscribe to a channel. If another subscriber already holds a
    /// channel with the same key they share it, and a connected
    /// channel replays its cached state synchronously before this
    /// returns so the widget never flashes a false "disconnected".
    pub fn subscribe(
        &self,
        pv_name: &str,
        requested_type: RequestType,
        element_count: usize,
        callbacks: SubscriberCallbacks,
    ) -> SubscriptionHandle {
        let trimmed = pv_name.trim();
        if trimmed.is_empty() || callbacks.value.is_none() {
            return SubscriptionHandle::default();
        }

        let (sub_id, replay) = {
            let mut inner = self.inner.borrow_mut();
            let key = ChannelKey::new(trimmed, requested_type, element_count);
            let channel_id = match inner.key_index.get(&key) {
                Some(&id) => id,
                None => Self::create_channel(&mut inner, key.clone()),
            };

            let sub_id = inner.next_subscription_id;
            inner.next_subscription_id += 1;
            let entry = SubscriberEntry {
                id: sub_id,
                callbacks: Rc::new(RefCell::new(callbacks)),
            };
            let channel = inner.channels.get_mut(&channel_id).expect("channel exists");
            let replay = channel.connected.then(|| {
                (
                    entry.callbacks.clone(),
                    channel.cached.clone(),
                    channel.can_read,
                    channel.can_write,
                )
            });
            channel.subscribers.push(entry);
            inner.sub_index.insert(sub_id, channel_id);
            (sub_id, replay)
        };

        // Synchronous replay happens without the borrow held.
        if let Some((callbacks, data, can_read, can_write)) = replay {
            let mut callbacks = callbacks.borrow_mut();
            if let Some(cb) = callbacks.connection.as_mut() {
                cb(true, &data);
            }
            if let Some(cb) = callbacks.access.as_mut() {
                cb(can_read, can_write);
            }
            if data.has_value {
                if let Some(cb) = callbacks.value.as_mut() {
                    cb(&data);
                }
            }
        }

        SubscriptionHandle {
            id: sub_id,
            owner: Rc::downgrade(&self.inner),
        }
    }

    fn create_channel(inner: &mut ManagerInner, key: ChannelKey) -> u64 {
        let id = inner.next_channel_id;
        inner.next_channel_id += 1;
        let reference = PvReference::parse(&key.pv_name);
        let mut channel = Channel::new(id, key.clone(), reference.clone());

        let ctx = inner.context_mut(reference.protocol);
        if ctx.ensure_initialized() {
            let request_path = reference.path.request_path();
            if let Some(client) = ctx.client_mut() {
                if let Err(error) =
                    client.create_channel(ClientChannelId(id), &reference.name, &request_path)
                {
                    warn!(target: "channels.manager", pv = %key.pv_name, %error,
                        "channel create failed");
                    channel.create_failed = true;
                }
            }
        }
        // An unavailable context still yields a structural channel
        // that simply never connects.

        stats::register_channel_created();
        inner.key_index.insert(key, id);
        inner.channels.insert(id, channel);
        id
    }

    fn unsubscribe(inner: &Rc<RefCell<ManagerInner>>, sub_id: u64) {
        let mut inner = inner.borrow_mut();
        let Some(channel_id) = inner.sub_index.remove(&sub_id) else {
            return;
        };
        let mut destroy = false;
        if let Some(channel) = inner.channels.get_mut(&channel_id) {
            channel.subscribers.retain(|entry| entry.id != sub_id);
            destroy = channel.subscribers.is_empty();
        }
        if destroy {
            Self::destroy_channel(&mut inner, channel_id);
        }
    }

    fn destroy_channel(inner: &mut ManagerInner, channel_id: u64) {
        let Some(channel) = inner.channels.remove(&channel_id) else {
            return;
        };
        inner.key_index.remove(&channel.key);
        if channel.connected {
            stats::register_channel_disconnected();
        }
        let ctx = inner.context_mut(channel.reference.protocol);
        if let Some(client) = ctx.client_mut() {
            client.clear_channel(ClientChannelId(channel_id));
        }
        stats::register_channel_destroyed();
        debug!(target: "channels.manager", pv = %channel.key.pv_name, "channel destroyed");
    }

    /// Drain and apply the protocol context's pending events, then
    /// flush any rate-deferred notifications that have aged out.
    pub fn dispatch(&self, protocol: PvProtocol, now: Instant) {
        let events = self.inner.borrow_mut().context_mut(protocol).poll();
        for event in events {
            self.apply_event(protocol, event, now);
        }
        self.flush_pending(now);
    }

    fn apply_event(&self, protocol: PvProtocol, event: ProtocolEvent, now: Instant) {
        // Membership check: the channel may have died between enqueue
        // and dequeue; its remaining events are dropped here.
        let channel_id = event.channel.0;
        if !self.inner.borrow().channels.contains_key(&channel_id) {
            trace!(target: "channels.manager", channel = channel_id, "event for dead channel");
            return;
        }
        match event.kind {
            ProtocolEventKind::Connection {
                connected,
                native_type,
                native_count,
            } => self.handle_connection(channel_id, connected, native_type, native_count),
            ProtocolEventKind::Value(update) => {
                match protocol {
                    PvProtocol::Ca => stats::register_ca_event(),
                    PvProtocol::Pva => stats::register_pva_event(),
                }
                self.handle_value(channel_id, update, now);
            }
            ProtocolEventKind::ControlInfo(update) => self.handle_control_info(channel_id, update),
            ProtocolEventKind::AccessRights {
                can_read,
                can_write,
            } => self.handle_access_rights(channel_id, can_read, can_write),
        }
    }

    fn handle_connection(
        &self,
        channel_id: u64,
        connected: bool,
        native_type: Option<FieldType>,
        native_count: usize,
    ) {
        let fan_out = {
            let mut inner = self.inner.borrow_mut();
            let Some(channel) = inner.channels.get_mut(&channel_id) else {
                return;
            };
            let was_connected = channel.connected;
            channel.connected = connected;
            channel.cached.connected = connected;

            if connected {
                if !was_connected {
                    stats::register_channel_connected();
                }
                channel.cached.native_field_type = native_type;
                channel.cached.native_element_count = native_count;
                // Fresh connection: the next value must reach
                // subscribers regardless of earlier gating state.
                channel.last_sent = None;
                channel.last_notify = None;
                channel.notify_pending = false;

                let key = channel.key.clone();
                let needs_subscribe = !channel.subscribed;
                let needs_control_info = !channel.control_info_requested
                    && native_type.is_some_and(|t| t.is_numeric() || t.is_enum());
                let protocol = channel.reference.protocol;
                if needs_subscribe {
                    let count = if key.element_count == 0 {
                        native_count.max(1)
                    } else {
                        key.element_count
                    };
                    let request = SubscribeRequest {
                        requested_type: key.requested_type,
                        element_count: count,
                        mask: MonitorMask::default(),
                    };
                    let outcome = inner
                        .context_mut(protocol)
                        .client_mut()
                        .map(|client| client.subscribe(ClientChannelId(channel_id), request));
                    match outcome {
                        Some(Ok(())) => {
                            if let Some(channel) = inner.channels.get_mut(&channel_id) {
                                channel.subscribed = true;
                            }
                        }
                        Some(Err(error)) => warn!(target: "channels.manager",
                            pv = %key.pv_name, %error, "subscribe failed"),
                        None => {}
                    }
                }
                if needs_control_info {
                    let outcome = inner
                        .context_mut(protocol)
                        .client_mut()
                        .map(|client| client.request_control_info(ClientChannelId(channel_id)));
                    match outcome {
                        Some(Ok(())) => {
                            if let Some(channel) = inner.channels.get_mut(&channel_id) {
                                channel.control_info_requested = true;
                            }
                        }
                        Some(Err(error)) => warn!(target: "channels.manager",
                            pv = %key.pv_name, %error, "control info request failed"),
                        None => {}
                    }
                }
            } else {
                if was_connected {
                    stats::register_channel_disconnected();
                }
                let channel = inner.channels.get_mut(&channel_id).expect("channel exists");
                channel.cached.mark_disconnected();
                channel.subscribed = false;
                channel.control_info_requested = false;
                channel.notify_pending = false;
            }

            let channel = inner.channels.get(&channel_id).expect("channel exists");
            (
                channel.cached.clone(),
                collect_subscribers(channel),
            )
        };

        let (data, subscribers) = fan_out;
        for (sub_id, callbacks) in subscribers {
            if !self.subscriber_live(sub_id) {
                continue;
            }
            if let Some(cb) = callbacks.borrow_mut().connection.as_mut() {
                cb(connected, &data);
            }
        }
    }

    fn handle_value(&self, channel_id: u64, update: ValueUpdate, now: Instant) {
        let fan_out = {
            let mut inner = self.inner.borrow_mut();
            let Some(channel) = inner.channels.get_mut(&channel_id) else {
                return;
            };
            if !decode_value(channel, update) {
                return;
            }

            // Change gate: skip fan-out when nothing observable moved.
            let data = &channel.cached;
            let changed = match &channel.last_sent {
                None => true,
                Some(last) => {
                    data.severity != last.severity
                        || (data.is_numeric && data.numeric_value != last.numeric)
                        || (data.is_string && data.string_value != last.string)
                        || (data.is_enum && data.enum_value != last.enum_value)
                }
            };
            if !changed {
                return;
            }

            // Rate gate: cache is current either way; a deferred flush
            // delivers the tail of a burst.
            if let Some(last_notify) = channel.last_notify {
                if now.duration_since(last_notify) < MIN_NOTIFY_INTERVAL {
                    channel.notify_pending = true;
                    return;
                }
            }

            channel.notify_pending = false;
            mark_notified(channel, now);
            (channel.cached.clone(), collect_subscribers(channel))
        };

        let (data, subscribers) = fan_out;
        self.fan_out_value(&data, subscribers);
    }

    fn handle_control_info(&self, channel_id: u64, update: ControlInfoUpdate) {
        let fan_out = {
            let mut inner = self.inner.borrow_mut();
            let Some(channel) = inner.channels.get_mut(&channel_id) else {
                return;
            };
            let data = &mut channel.cached;
            match update {
                ControlInfoUpdate::Numeric {
                    display_low,
                    display_high,
                    precision,
                    units,
                } => {
                    data.control.display_low = display_low;
                    data.control.display_high = display_high;
                    data.control.precision = precision;
                    data.has_precision = precision >= 0;
                    data.has_units = !units.trim().is_empty();
                    data.control.units = units;
                    data.has_control_info = true;
                }
                ControlInfoUpdate::Enum { strings } => {
                    data.control.enum_strings = strings;
                    data.has_control_info = true;
                    // Backfill the label for the ordinal already held.
                    if data.is_enum {
                        if let Some(label) = data.enum_label() {
                            data.string_value = label.to_string();
                            data.is_string = true;
                        }
                    }
                }
            }
            if !data.has_value {
                return;
            }
            (channel.cached.clone(), collect_subscribers(channel))
        };

        // Control info re-notifies outside the gates so limits and
        // labels reach widgets promptly.
        let (data, subscribers) = fan_out;
        self.fan_out_value(&data, subscribers);
    }

    fn handle_access_rights(&self, channel_id: u64, can_read: bool, can_write: bool) {
        let fan_out = {
            let mut inner = self.inner.borrow_mut();
            let Some(channel) = inner.channels.get_mut(&channel_id) else {
                return;
            };
            let changed = channel.can_read != can_read || channel.can_write != can_write;
            channel.can_read = can_read;
            channel.can_write = can_write;
            if !changed {
                return;
            }
            collect_subscribers(channel)
        };

        for (sub_id, callbacks) in fan_out {
            if !self.subscriber_live(sub_id) {
                continue;
            }
            if let Some(cb) = callbacks.borrow_mut().access.as_mut() {
                cb(can_read, can_write);
            }
        }
    }

    /// Deliver rate-deferred values whose interval has elapsed.
    pub fn flush_pending(&self, now: Instant) {
        let ready: Vec<(ChannelData, Vec<(u64, Rc<RefCell<SubscriberCallbacks>>)>)> = {
            let mut inner = self.inner.borrow_mut();
            let ids: Vec<u64> = inner
                .channels
                .values()
                .filter(|channel| {
                    channel.notify_pending
                        && channel.cached.has_value
                        && channel
                            .last_notify
                            .is_none_or(|t| now.duration_since(t) >= MIN_NOTIFY_INTERVAL)
                })
                .map(|channel| channel.id)
                .collect();
            ids.into_iter()
                .filter_map(|id| {
                    let channel = inner.channels.get_mut(&id)?;
                    channel.notify_pending = false;
                    mark_notified(channel, now);
                    Some((channel.cached.clone(), collect_subscribers(channel)))
                })
                .collect()
        };
        for (data, subscribers) in ready {
            self.fan_out_value(&data, subscribers);
        }
    }

    fn fan_out_value(
        &self,
        data: &ChannelData,
        subscribers: Vec<(u64, Rc<RefCell<SubscriberCallbacks>>)>,
    ) {
        for (sub_id, callbacks) in subscribers {
            if !self.subscriber_live(sub_id) {
                continue;
            }
            if let Some(cb) = callbacks.borrow_mut().value.as_mut() {
                cb(data);
            }
        }
    }

    fn subscriber_live(&self, sub_id: u64) -> bool {
        self.inner.borrow().sub_index.contains_key(&sub_id)
    }

    // ---- put path -------------------------------------------------

    pub fn put_double(&self, pv_name: &str, value: f64, widget_type: &str) -> PutOutcome {
        self.put(pv_name, PutValue::Double(value), widget_type)
    }

    pub fn put_text(&self, pv_name: &str, value: &str, widget_type: &str) -> PutOutcome {
        self.put(pv_name, PutValue::Text(value.to_string()), widget_type)
    }

    pub fn put_enum(&self, pv_name: &str, ordinal: u16, widget_type: &str) -> PutOutcome {
        self.put(pv_name, PutValue::EnumOrdinal(ordinal), widget_type)
    }

    pub fn put_char_array(&self, pv_name: &str, value: &[u8], widget_type: &str) -> PutOutcome {
        self.put(pv_name, PutValue::CharArray(value.to_vec()), widget_type)
    }

    /// Array put; empty arrays are rejected outright.
    pub fn put_double_array(
        &self,
        pv_name: &str,
        values: &[f64],
        widget_type: &str,
    ) -> PutOutcome {
        if values.is_empty() {
            return PutOutcome::Rejected;
        }
        self.put(pv_name, PutValue::DoubleArray(values.to_vec()), widget_type)
    }

    fn put(&self, pv_name: &str, value: PutValue, widget_type: &str) -> PutOutcome {
        let trimmed = pv_name.trim();
        if trimmed.is_empty() {
            return PutOutcome::Rejected;
        }
        let audit_value = audit_rendering(&value);

        let (outcome, audit, display_file) = {
            let mut inner = self.inner.borrow_mut();
            let reference = PvReference::parse(trimmed);
            if !inner.context_mut(reference.protocol).ensure_initialized() {
                return PutOutcome::Rejected;
            }

            // Route through any connected channel for this name.
            let existing = inner
                .channels
                .values()
                .find(|channel| channel.reference.raw == trimmed && channel.connected)
                .map(|channel| channel.id);

            let result = match existing {
                Some(channel_id) => {
                    let ctx = inner.context_mut(reference.protocol);
                    match ctx.client_mut() {
                        Some(client) => client.put(ClientChannelId(channel_id), value),
                        None => Err(ClientError::ContextUnavailable),
                    }
                }
                None => Self::put_via_temporary_channel(&mut inner, &reference, value),
            };

            match result {
                Ok(()) => (
                    PutOutcome::Written,
                    inner.audit.clone(),
                    inner.display_file.clone(),
                ),
                Err(error) => {
                    debug!(target: "channels.put", pv = trimmed, %error, "put rejected");
                    return PutOutcome::Rejected;
                }
            }
        };

        if let Some(audit_value) = audit_value {
            audit.log_put(trimmed, &audit_value, widget_type, display_file.as_deref());
        }
        outcome
    }

    /// No connected channel exists: create one just for this write,
    /// wait for the connection with a bounded timeout, put, close.
    /// Only ever invoked from UI-initiated user actions.
    fn put_via_temporary_channel(
        inner: &mut ManagerInner,
        reference: &PvReference,
        value: PutValue,
    ) -> Result<(), ClientError> {
        let temp_id = inner.next_channel_id;
        inner.next_channel_id += 1;
        let request_path = reference.path.request_path();
        let ctx = inner.context_mut(reference.protocol);
        let Some(client) = ctx.client_mut() else {
            return Err(ClientError::ContextUnavailable);
        };
        client.create_channel(ClientChannelId(temp_id), &reference.name, &request_path)?;
        let result = if client.wait_connected(ClientChannelId(temp_id), PUT_CONNECT_TIMEOUT) {
            client.put(ClientChannelId(temp_id), value)
        } else {
            Err(ClientError::PutRejected(format!(
                "{}: connect timeout",
                reference.raw
            )))
        };
        client.clear_channel(ClientChannelId(temp_id));
        result
    }

    // ---- statistics ----------------------------------------------

    pub fn unique_channel_count(&self) -> usize {
        self.inner.borrow().channels.len()
    }

    pub fn total_subscription_count(&self) -> usize {
        self.inner
            .borrow()
            .channels
            .values()
            .map(|channel| channel.subscribers.len())
            .sum()
    }

    pub fn connected_channel_count(&self) -> usize {
        self.inner
            .borrow()
            .channels
            .values()
            .filter(|channel| channel.connected)
            .count()
    }

    /// Per-channel summaries sorted case-insensitively by name.
    pub fn channel_summaries(&self) -> Vec<ChannelSummary> {
        let inner = self.inner.borrow();
        let elapsed = inner
            .rate_window_start
            .map(|start| start.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        let mut summaries: Vec<ChannelSummary> = inner
            .channels
            .values()
            .map(|channel| ChannelSummary {
                pv_name: channel.key.pv_name.clone(),
                connected: channel.connected,
                writable: channel.can_write,
                subscriber_count: channel.subscribers.len(),
                update_count: channel.update_count,
                updates_per_second: if elapsed > 0.0 {
                    channel.update_count as f64 / elapsed
                } else {
                    0.0
                },
                severity: channel.cached.severity,
            })
            .collect();
        summaries.sort_by(|a, b| {
            a.pv_name
                .to_lowercase()
                .cmp(&b.pv_name.to_lowercase())
        });
        summaries
    }

    /// Restart the per-channel rate window.
    pub fn reset_update_counters(&self) {
        let mut inner = self.inner.borrow_mut();
        for channel in inner.channels.values_mut() {
            channel.update_count = 0;
        }
        inner.rate_window_start = Some(Instant::now());
    }

    pub fn elapsed_seconds_since_reset(&self) -> f64 {
        self.inner
            .borrow()
            .rate_window_start
            .map(|start| start.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

fn collect_subscribers(channel: &Channel) -> Vec<(u64, Rc<RefCell<SubscriberCallbacks>>)> {
    channel
        .subscribers
        .iter()
        .map(|entry| (entry.id, entry.callbacks.clone()))
        .collect()
}

fn mark_notified(channel: &mut Channel, now: Instant) {
    channel.last_notify = Some(now);
    channel.last_sent = Some(LastSent {
        numeric: channel.cached.numeric_value,
        string: channel.cached.string_value.clone(),
        enum_value: channel.cached.enum_value,
        severity: channel.cached.severity,
    });
    channel.update_count += 1;
}

fn audit_rendering(value: &PutValue) -> Option<String> {
    match value {
        PutValue::Double(x) => Some(x.to_string()),
        PutValue::Text(s) => Some(s.clone()),
        PutValue::EnumOrdinal(i) => Some(i.to_string()),
        PutValue::CharArray(bytes) => {
            let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
            Some(String::from_utf8_lossy(&bytes[..end]).into_owned())
        }
        PutValue::DoubleArray(_) => None,
    }
}

/// Fold one decoded payload into the cache. Returns false when the
/// payload could not be interpreted (the cache is left untouched
/// apart from alarm state).
fn decode_value(channel: &mut Channel, update: ValueUpdate) -> bool {
    let data = &mut channel.cached;
    data.severity = AlarmSeverity::from_raw(update.severity);
    data.status = update.status;
    data.timestamp = update.timestamp;
    data.clear_value_flags();

    match update.kind {
        ValueKind::Double(x) => {
            data.numeric_value = x;
            data.is_numeric = true;
        }
        ValueKind::Float(x) => {
            data.numeric_value = f64::from(x);
            data.is_numeric = true;
        }
        ValueKind::Long(x) => {
            data.numeric_value = f64::from(x);
            data.is_numeric = true;
        }
        ValueKind::Short(x) => {
            data.numeric_value = f64::from(x);
            data.is_numeric = true;
        }
        ValueKind::Char(x) => {
            data.numeric_value = f64::from(x);
            data.is_numeric = true;
        }
        ValueKind::Enum(ordinal) => {
            data.enum_value = ordinal;
            data.numeric_value = f64::from(ordinal);
            data.is_enum = true;
            data.is_numeric = true;
            if data.has_control_info {
                if let Some(label) = data.enum_label() {
                    data.string_value = label.to_string();
                    data.is_string = true;
                }
            }
        }
        ValueKind::String(text) => {
            data.string_value = text;
            data.is_string = true;
        }
        ValueKind::DoubleArray(values) => {
            data.numeric_value = values.first().copied().unwrap_or(0.0);
            data.is_numeric = true;
            data.is_array = true;
            data.array_values = values;
        }
        ValueKind::CharArray(bytes) => {
            let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
            data.string_value = String::from_utf8_lossy(&bytes[..end]).into_owned();
            data.is_string = true;
            data.is_char_array = true;
            data.char_array = bytes;
        }
        ValueKind::Structure(payload) => {
            if !decode_structure(channel, &payload) {
                channel.cached.has_value = false;
                return false;
            }
        }
    }
    channel.cached.has_value = true;
    true
}

/// Interpret a PVA structure payload: navigate the configured field
/// path, unwrap normative-type conventions, and lift alarm/display
/// sections into the cache. A bad path is a configuration error:
/// reported once, then the channel simply never presents a value.
fn decode_structure(channel: &mut Channel, payload: &PvaValue) -> bool {
    let node = match navigate(payload, &channel.reference.path) {
        Ok(node) => node,
        Err(error) => {
            if !channel.nav_error_logged {
                channel.nav_error_logged = true;
                warn!(target: "channels.manager", pv = %channel.key.pv_name, %error,
                    "structure path does not resolve");
            }
            return false;
        }
    };

    // Alarm and display travel with the payload for PVA.
    if let Some(alarm) = read_section::<NtAlarm>(payload, "alarm") {
        channel.cached.severity = AlarmSeverity::from_raw(alarm.severity);
        channel.cached.status = alarm.status;
    }
    if let Some(display) = read_section::<NtDisplay>(payload, "display") {
        let data = &mut channel.cached;
        data.control.display_low = display.limit_low;
        data.control.display_high = display.limit_high;
        if let Some(precision) = display.precision {
            data.control.precision = precision;
            data.has_precision = true;
        }
        data.has_units = !display.units.trim().is_empty();
        data.control.units = display.units;
        data.has_control_info = true;
    }

    // Normative types wrap the interesting part in a `value` field.
    let value_node = node.get("value").unwrap_or(node);

    let data = &mut channel.cached;
    if let Some(number) = value_node.as_f64() {
        data.numeric_value = number;
        data.is_numeric = true;
        return true;
    }
    if let Some(text) = value_node.as_str() {
        data.string_value = text.to_string();
        data.is_string = true;
        return true;
    }
    if let Some(items) = value_node.as_array() {
        let values: Vec<f64> = items.iter().filter_map(|item| item.as_f64()).collect();
        if values.len() == items.len() {
            data.numeric_value = values.first().copied().unwrap_or(0.0);
            data.is_numeric = true;
            data.is_array = true;
            data.array_values = values;
            return true;
        }
    }
    // NTEnum: { "index": i, "choices": [...] }.
    if value_node.get("index").is_some() {
        if let Ok(enum_value) =
            serde_json::from_value::<NtEnumValue>(value_node.clone())
        {
            let ordinal = enum_value.index.max(0) as u16;
            data.enum_value = ordinal;
            data.numeric_value = f64::from(ordinal);
            data.is_enum = true;
            data.is_numeric = true;
            if !enum_value.choices.is_empty() {
                data.control.enum_strings = enum_value.choices;
                data.has_control_info = true;
            }
            if let Some(label) = data.enum_label() {
                data.string_value = label.to_string();
                data.is_string = true;
            }
            return true;
        }
    }

    if !channel.nav_error_logged {
        channel.nav_error_logged = true;
        warn!(target: "channels.manager", pv = %channel.key.pv_name,
            "structure node is not a scalar, array, string or enum");
    }
    false
}
