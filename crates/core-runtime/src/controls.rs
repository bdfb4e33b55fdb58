//! Control widget runtimes: sliders, wheel switches, text entries,
//! choice buttons, menus, message buttons.
//!
//! Controls reflect the server value like monitors do, and add an
//! activation path back to the PV. A write goes out only when the
//! channel is connected, the server granted write access and the
//! value passes the widget's own validity rule; otherwise the
//! activation is ignored silently and the widget snaps back to the
//! last server value on its next update.

use std::cell::RefCell;
use std::rc::Rc;

use core_channels::{ChannelHub, SubscriberCallbacks, SubscriptionHandle};
use core_colors::{PvLimits, ResolvedLimits};
use core_pv::{AlarmSeverity, ChannelData, FieldType, RequestType};
use core_render::{UpdateCoordinator, WidgetId};
use tracing::trace;

/// Widget-visible state shared by the numeric and text controls.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlState {
    pub connected: bool,
    pub severity: AlarmSeverity,
    pub write_access: bool,
    pub value: f64,
    pub text: String,
    pub has_value: bool,
    pub limits: ResolvedLimits,
}

impl ControlState {
    fn disconnected(limits: &PvLimits) -> Self {
        Self {
            connected: false,
            severity: AlarmSeverity::Invalid,
            write_access: false,
            value: 0.0,
            text: String::new(),
            has_value: false,
            limits: limits.resolve(None, None, None),
        }
    }
}

struct ControlInner {
    widget_id: WidgetId,
    channel: String,
    limits: PvLimits,
    state: ControlState,
    native_char_array: bool,
    coordinator: Rc<RefCell<UpdateCoordinator>>,
}

impl ControlInner {
    fn apply_connection(&mut self, connected: bool, data: &ChannelData) {
        if connected {
            self.state.connected = true;
            self.state.severity = AlarmSeverity::None;
            self.native_char_array = data.native_field_type == Some(FieldType::Char)
                && data.native_element_count > 1;
        } else {
            let limits = self.limits;
            self.state = ControlState::disconnected(&limits);
            self.native_char_array = false;
        }
        self.coordinator.borrow_mut().request_update(self.widget_id);
    }

    fn apply_value(&mut self, data: &ChannelData) {
        if !self.state.connected {
            return;
        }
        let (low, high, precision) = data.channel_limits();
        self.state.limits = self.limits.resolve(low, high, precision);
        self.state.severity = data.severity;
        if data.is_numeric && data.numeric_value.is_finite() {
            self.state.value = data.numeric_value;
            self.state.has_value = true;
        }
        if data.is_string {
            self.state.text = data.string_value.clone();
            self.state.has_value = true;
        }
        self.coordinator.borrow_mut().request_update(self.widget_id);
    }

    fn apply_access(&mut self, can_write: bool) {
        if self.state.write_access != can_write {
            self.state.write_access = can_write;
            self.coordinator.borrow_mut().request_update(self.widget_id);
        }
    }
}

fn subscribe_control(
    hub: &ChannelHub,
    inner: &Rc<RefCell<ControlInner>>,
    requested_type: RequestType,
) -> SubscriptionHandle {
    let channel = inner.borrow().channel.clone();
    if channel.is_empty() {
        return SubscriptionHandle::default();
    }
    let value_inner = inner.clone();
    let conn_inner = inner.clone();
    let access_inner = inner.clone();
    let callbacks = SubscriberCallbacks::new()
        .on_value(move |data| value_inner.borrow_mut().apply_value(data))
        .on_connection(move |connected, data| {
            conn_inner.borrow_mut().apply_connection(connected, data);
        })
        .on_access_rights(move |_, can_write| access_inner.borrow_mut().apply_access(can_write));
    hub.subscribe(&channel, requested_type, 1, callbacks)
}

/// Slider, wheel switch and numeric text entry share one runtime; the
/// kind name only flavors audit records and logs.
pub struct NumericControlRuntime {
    inner: Rc<RefCell<ControlInner>>,
    kind_name: &'static str,
    hub: Option<ChannelHub>,
    handle: SubscriptionHandle,
    started: bool,
}

impl NumericControlRuntime {
    pub fn new(
        widget_id: WidgetId,
        kind_name: &'static str,
        channel: &str,
        limits: PvLimits,
        coordinator: Rc<RefCell<UpdateCoordinator>>,
    ) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ControlInner {
                widget_id,
                channel: channel.trim().to_string(),
                limits,
                state: ControlState::disconnected(&limits),
                native_char_array: false,
                coordinator,
            })),
            kind_name,
            hub: None,
            handle: SubscriptionHandle::default(),
            started: false,
        }
    }

    pub fn start(&mut self, hub: &ChannelHub) {
        if self.started {
            return;
        }
        self.started = true;
        core_events::stats::register_display_object_started();
        self.handle = subscribe_control(hub, &self.inner, RequestType::TimeDouble);
        self.hub = Some(hub.clone());
    }

    pub fn stop(&mut self) {
        if !self.started {
            return;
        }
        self.started = false;
        core_events::stats::register_display_object_stopped();
        self.handle.reset();
        self.hub = None;
        let mut inner = self.inner.borrow_mut();
        let limits = inner.limits;
        inner.state = ControlState::disconnected(&limits);
    }

    pub fn state(&self) -> ControlState {
        self.inner.borrow().state.clone()
    }

    /// User moved the control to `value`.
    pub fn activate(&self, value: f64) {
        let Some(hub) = self.hub.as_ref() else {
            return;
        };
        let (channel, allowed) = {
            let inner = self.inner.borrow();
            (
                inner.channel.clone(),
                inner.state.connected && inner.state.write_access && value.is_finite(),
            )
        };
        if !allowed {
            trace!(target: "runtime.widget", kind = self.kind_name, channel = %channel,
                "activation ignored");
            return;
        }
        hub.put_double(&channel, value, self.kind_name);
    }
}

/// String text entry. Char-array PVs get the text as a long string.
pub struct TextEntryRuntime {
    inner: Rc<RefCell<ControlInner>>,
    hub: Option<ChannelHub>,
    handle: SubscriptionHandle,
    started: bool,
}

impl TextEntryRuntime {
    pub fn new(
        widget_id: WidgetId,
        channel: &str,
        limits: PvLimits,
        coordinator: Rc<RefCell<UpdateCoordinator>>,
    ) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ControlInner {
                widget_id,
                channel: channel.trim().to_string(),
                limits,
                state: ControlState::disconnected(&limits),
                native_char_array: false,
                coordinator,
            })),
            hub: None,
            handle: SubscriptionHandle::default(),
            started: false,
        }
    }

    pub fn start(&mut self, hub: &ChannelHub) {
        if self.started {
            return;
        }
        self.started = true;
        core_events::stats::register_display_object_started();
        self.handle = subscribe_control(hub, &self.inner, RequestType::TimeString);
        self.hub = Some(hub.clone());
    }

    pub fn stop(&mut self) {
        if !self.started {
            return;
        }
        self.started = false;
        core_events::stats::register_display_object_stopped();
        self.handle.reset();
        self.hub = None;
        let mut inner = self.inner.borrow_mut();
        let limits = inner.limits;
        inner.state = ControlState::disconnected(&limits);
    }

    pub fn state(&self) -> ControlState {
        self.inner.borrow().state.clone()
    }

    /// Numeric entry flavor: parsed values go out as doubles under
    /// the same guards, plus finiteness.
    pub fn activate_numeric(&self, value: f64) {
        let Some(hub) = self.hub.as_ref() else {
            return;
        };
        let (channel, allowed) = {
            let inner = self.inner.borrow();
            (
                inner.channel.clone(),
                inner.state.connected && inner.state.write_access && value.is_finite(),
            )
        };
        if !allowed {
            return;
        }
        hub.put_double(&channel, value, "TextEntry");
    }

    pub fn activate_text(&self, text: &str) {
        let Some(hub) = self.hub.as_ref() else {
            return;
        };
        let (channel, allowed, char_array) = {
            let inner = self.inner.borrow();
            (
                inner.channel.clone(),
                inner.state.connected && inner.state.write_access,
                inner.native_char_array,
            )
        };
        if !allowed {
            return;
        }
        if char_array {
            hub.put_char_array(&channel, text.as_bytes(), "TextEntry");
        } else {
            hub.put_text(&channel, text, "TextEntry");
        }
    }
}

/// Widget-visible state of an enum-backed control.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChoiceState {
    pub connected: bool,
    pub severity: AlarmSeverity,
    pub write_access: bool,
    /// -1 until the first value arrives.
    pub ordinal: i32,
    pub labels: Vec<String>,
}

struct ChoiceInner {
    widget_id: WidgetId,
    channel: String,
    state: ChoiceState,
    coordinator: Rc<RefCell<UpdateCoordinator>>,
}

/// Choice buttons and option menus: enum subscribe, label cache,
/// bounds-checked ordinal writes.
pub struct ChoiceRuntime {
    inner: Rc<RefCell<ChoiceInner>>,
    kind_name: &'static str,
    hub: Option<ChannelHub>,
    handle: SubscriptionHandle,
    started: bool,
}

impl ChoiceRuntime {
    pub fn new(
        widget_id: WidgetId,
        kind_name: &'static str,
        channel: &str,
        coordinator: Rc<RefCell<UpdateCoordinator>>,
    ) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ChoiceInner {
                widget_id,
                channel: channel.trim().to_string(),
                state: ChoiceState {
                    ordinal: -1,
                    ..ChoiceState::default()
                },
                coordinator,
            })),
            kind_name,
            hub: None,
            handle: SubscriptionHandle::default(),
            started: false,
        }
    }

    pub fn start(&mut self, hub: &ChannelHub) {
        if self.started {
            return;
        }
        self.started = true;
        core_events::stats::register_display_object_started();
        let channel = self.inner.borrow().channel.clone();
        if !channel.is_empty() {
            let value_inner = self.inner.clone();
            let conn_inner = self.inner.clone();
            let access_inner = self.inner.clone();
            let callbacks = SubscriberCallbacks::new()
                .on_value(move |data| {
                    let mut inner = value_inner.borrow_mut();
                    if !inner.state.connected {
                        return;
                    }
                    inner.state.severity = data.severity;
                    if data.is_enum {
                        inner.state.ordinal = i32::from(data.enum_value);
                    }
                    if data.has_control_info && !data.control.enum_strings.is_empty() {
                        inner.state.labels = data.control.enum_strings.clone();
                    }
                    let id = inner.widget_id;
                    inner.coordinator.borrow_mut().request_update(id);
                })
                .on_connection(move |connected, _| {
                    let mut inner = conn_inner.borrow_mut();
                    if connected {
                        inner.state.connected = true;
                        inner.state.severity = AlarmSeverity::None;
                    } else {
                        inner.state = ChoiceState {
                            ordinal: -1,
                            severity: AlarmSeverity::Invalid,
                            ..ChoiceState::default()
                        };
                    }
                    let id = inner.widget_id;
                    inner.coordinator.borrow_mut().request_update(id);
                })
                .on_access_rights(move |_, can_write| {
                    let mut inner = access_inner.borrow_mut();
                    inner.state.write_access = can_write;
                    let id = inner.widget_id;
                    inner.coordinator.borrow_mut().request_update(id);
                });
            self.handle = hub.subscribe(&channel, RequestType::TimeEnum, 1, callbacks);
        }
        self.hub = Some(hub.clone());
    }

    pub fn stop(&mut self) {
        if !self.started {
            return;
        }
        self.started = false;
        core_events::stats::register_display_object_stopped();
        self.handle.reset();
        self.hub = None;
        self.inner.borrow_mut().state = ChoiceState {
            ordinal: -1,
            ..ChoiceState::default()
        };
    }

    pub fn state(&self) -> ChoiceState {
        self.inner.borrow().state.clone()
    }

    /// User picked choice `ordinal`. Out-of-range ordinals (including
    /// `labels.len()`) and negatives are rejected.
    pub fn activate(&self, ordinal: i32) {
        let Some(hub) = self.hub.as_ref() else {
            return;
        };
        let (channel, allowed) = {
            let inner = self.inner.borrow();
            let in_range =
                ordinal >= 0 && (ordinal as usize) < inner.state.labels.len();
            (
                inner.channel.clone(),
                inner.state.connected && inner.state.write_access && in_range,
            )
        };
        if !allowed {
            return;
        }
        hub.put_enum(&channel, ordinal as u16, self.kind_name);
    }
}

/// Message button: optional press and release writes.
pub struct MessageButtonRuntime {
    inner: Rc<RefCell<ControlInner>>,
    press_value: String,
    release_value: String,
    hub: Option<ChannelHub>,
    handle: SubscriptionHandle,
    started: bool,
}

impl MessageButtonRuntime {
    pub fn new(
        widget_id: WidgetId,
        channel: &str,
        press_value: &str,
        release_value: &str,
        coordinator: Rc<RefCell<UpdateCoordinator>>,
    ) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ControlInner {
                widget_id,
                channel: channel.trim().to_string(),
                limits: PvLimits::default(),
                state: ControlState::disconnected(&PvLimits::default()),
                native_char_array: false,
                coordinator,
            })),
            press_value: press_value.to_string(),
            release_value: release_value.to_string(),
            hub: None,
            handle: SubscriptionHandle::default(),
            started: false,
        }
    }

    pub fn start(&mut self, hub: &ChannelHub) {
        if self.started {
            return;
        }
        self.started = true;
        core_events::stats::register_display_object_started();
        self.handle = subscribe_control(hub, &self.inner, RequestType::TimeString);
        self.hub = Some(hub.clone());
    }

    pub fn stop(&mut self) {
        if !self.started {
            return;
        }
        self.started = false;
        core_events::stats::register_display_object_stopped();
        self.handle.reset();
        self.hub = None;
        let mut inner = self.inner.borrow_mut();
        let limits = inner.limits;
        inner.state = ControlState::disconnected(&limits);
    }

    pub fn state(&self) -> ControlState {
        self.inner.borrow().state.clone()
    }

    pub fn press(&self) {
        self.send(&self.press_value);
    }

    pub fn release(&self) {
        self.send(&self.release_value);
    }

    fn send(&self, value: &str) {
        if value.is_empty() {
            return;
        }
        let Some(hub) = self.hub.as_ref() else {
            return;
        };
        let (channel, allowed) = {
            let inner = self.inner.borrow();
            (
                inner.channel.clone(),
                inner.state.connected && inner.state.write_access,
            )
        };
        if !allowed {
            return;
        }
        hub.put_text(&channel, value, "MessageButton");
    }
}
