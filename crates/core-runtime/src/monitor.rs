//! Single-channel monitor runtime: meters, bars, scales.

use std::cell::RefCell;
use std::rc::Rc;

use core_channels::{ChannelHub, SubscriberCallbacks, SubscriptionHandle};
use core_colors::{PvLimits, ResolvedLimits};
use core_pv::{AlarmSeverity, ChannelData, RequestType};
use core_render::{UpdateCoordinator, WidgetId};
use tracing::warn;

use crate::dynamics::VISIBILITY_EPSILON;

/// Widget-visible state of a numeric monitor.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorState {
    pub connected: bool,
    pub severity: AlarmSeverity,
    pub value: f64,
    pub has_value: bool,
    /// Resolved against the widget's limit configuration.
    pub limits: ResolvedLimits,
}

impl MonitorState {
    fn disconnected(limits: &PvLimits) -> Self {
        Self {
            connected: false,
            severity: AlarmSeverity::Invalid,
            value: 0.0,
            has_value: false,
            limits: limits.resolve(None, None, None),
        }
    }
}

struct MonitorInner {
    widget_id: WidgetId,
    kind_name: &'static str,
    channel: String,
    limits: PvLimits,
    state: MonitorState,
    mismatch_logged: bool,
    coordinator: Rc<RefCell<UpdateCoordinator>>,
}

/// Runtime for one meter/bar/scale.
pub struct MonitorRuntime {
    inner: Rc<RefCell<MonitorInner>>,
    handle: SubscriptionHandle,
    started: bool,
}

impl MonitorRuntime {
    pub fn new(
        widget_id: WidgetId,
        kind_name: &'static str,
        channel: &str,
        limits: PvLimits,
        coordinator: Rc<RefCell<UpdateCoordinator>>,
    ) -> Self {
        Self {
            inner: Rc::new(RefCell::new(MonitorInner {
                widget_id,
                kind_name,
                channel: channel.trim().to_string(),
                limits,
                state: MonitorState::disconnected(&limits),
                mismatch_logged: false,
                coordinator,
            })),
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
        if channel.is_empty() {
            return;
        }
        let value_inner = self.inner.clone();
        let conn_inner = self.inner.clone();
        let callbacks = SubscriberCallbacks::new()
            .on_value(move |data| Self::handle_value(&value_inner, data))
            .on_connection(move |connected, data| {
                Self::handle_connection(&conn_inner, connected, data);
            });
        self.handle = hub.subscribe(&channel, RequestType::TimeDouble, 1, callbacks);
    }

    pub fn stop(&mut self) {
        if !self.started {
            return;
        }
        self.started = false;
        core_events::stats::register_display_object_stopped();
        self.handle.reset();
        let mut inner = self.inner.borrow_mut();
        inner.state = MonitorState::disconnected(&inner.limits);
        inner.mismatch_logged = false;
    }

    pub fn state(&self) -> MonitorState {
        self.inner.borrow().state.clone()
    }

    fn handle_connection(inner: &Rc<RefCell<MonitorInner>>, connected: bool, data: &ChannelData) {
        let mut inner = inner.borrow_mut();
        if connected {
            // A monitor bound to a non-numeric field stays visually
            // disconnected; the subscription is kept alive so a later
            // server change is noticed.
            let numeric = data
                .native_field_type
                .is_some_and(|t| t.is_numeric() || t.is_enum());
            if !numeric {
                if !inner.mismatch_logged {
                    inner.mismatch_logged = true;
                    warn!(target: "runtime.widget", kind = inner.kind_name,
                        channel = %inner.channel, "monitor channel is not numeric");
                }
                let limits = inner.limits;
                inner.state = MonitorState::disconnected(&limits);
            } else {
                inner.state.connected = true;
                inner.state.severity = AlarmSeverity::None;
            }
        } else {
            let limits = inner.limits;
            inner.state = MonitorState::disconnected(&limits);
        }
        inner
            .coordinator
            .borrow_mut()
            .request_update(inner.widget_id);
    }

    fn handle_value(inner: &Rc<RefCell<MonitorInner>>, data: &ChannelData) {
        let mut inner = inner.borrow_mut();
        if !inner.state.connected {
            return;
        }
        core_events::stats::register_update_requested();

        let (low, high, precision) = data.channel_limits();
        let limits = inner.limits.resolve(low, high, precision);
        let mut changed = limits != inner.state.limits;
        inner.state.limits = limits;

        if data.severity != inner.state.severity {
            inner.state.severity = data.severity;
            changed = true;
        }

        // Non-finite samples update nothing but alarm state.
        if data.is_numeric && data.numeric_value.is_finite() {
            let value = data.numeric_value;
            if !inner.state.has_value
                || (value - inner.state.value).abs() > VISIBILITY_EPSILON
            {
                inner.state.value = value;
                inner.state.has_value = true;
                changed = true;
            }
        }

        if changed {
            core_events::stats::register_update_executed();
            inner
                .coordinator
                .borrow_mut()
                .request_update(inner.widget_id);
        }
    }
}
