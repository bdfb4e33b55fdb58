//! The shared multi-channel dynamic core.
//!
//! Shapes, text, images and composites all derive connected /
//! severity / visible from up to five channels and an optional calc
//! expression. Channels are needed only when at least one slot names
//! a PV *and* a mode is dynamic; otherwise the widget is pinned to
//! connected, visible, severity none without touching the network.
//!
//! State rules on every event:
//! * no channels configured: connected, severity none, visible;
//! * any configured channel disconnected: not connected, severity
//!   invalid, still visible (the widget paints its "not connected"
//!   presentation rather than hiding);
//! * all connected: severity from slot 0, visibility by mode.

use std::cell::RefCell;
use std::rc::Rc;

use core_calc::{normalize_legacy_operators, CalcProgram, INPUT_COUNT};
use core_channels::{ChannelHub, SubscriberCallbacks, SubscriptionHandle};
use core_model::{GraphicAttrs, VisibilityMode, GRAPHIC_CHANNEL_COUNT};
use core_pv::{AlarmSeverity, ChannelData, RequestType};
use core_render::{UpdateCoordinator, WidgetId};
use tracing::warn;

/// Visibility comparisons treat anything within this of zero as zero.
pub const VISIBILITY_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, Default)]
struct Slot {
    name: String,
    connected: bool,
    has_value: bool,
    value: f64,
    severity: i16,
    status: i16,
    hopr: f64,
    lopr: f64,
    precision: i16,
    element_count: usize,
}

/// Widget-visible result of the dynamic evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DynamicState {
    pub connected: bool,
    pub severity: AlarmSeverity,
    pub visible: bool,
}

impl Default for DynamicState {
    fn default() -> Self {
        Self {
            connected: false,
            severity: AlarmSeverity::None,
            visible: true,
        }
    }
}

struct CoreInner {
    attrs: GraphicAttrs,
    widget_id: WidgetId,
    kind_name: &'static str,
    calc: Option<CalcProgram>,
    calc_failed: bool,
    slots: [Slot; GRAPHIC_CHANNEL_COUNT],
    state: DynamicState,
    coordinator: Rc<RefCell<UpdateCoordinator>>,
    on_state: Option<Box<dyn FnMut(DynamicState)>>,
}

/// The shared core. Subscription callbacks hold clones, so the core
/// outlives `stop()` only until the handles drop.
pub struct DynamicCore {
    inner: Rc<RefCell<CoreInner>>,
    handles: Vec<SubscriptionHandle>,
    channels_needed: bool,
    started: bool,
}

impl DynamicCore {
    pub fn new(
        widget_id: WidgetId,
        kind_name: &'static str,
        attrs: GraphicAttrs,
        coordinator: Rc<RefCell<UpdateCoordinator>>,
    ) -> Self {
        Self {
            inner: Rc::new(RefCell::new(CoreInner {
                attrs,
                widget_id,
                kind_name,
                calc: None,
                calc_failed: false,
                slots: Default::default(),
                state: DynamicState::default(),
                coordinator,
                on_state: None,
            })),
            handles: Vec::new(),
            channels_needed: false,
            started: false,
        }
    }

    /// Observer invoked after each state recomputation (composites
    /// hook their visibility policy here).
    pub fn set_state_observer(&self, observer: impl FnMut(DynamicState) + 'static) {
        self.inner.borrow_mut().on_state = Some(Box::new(observer));
    }

    pub fn state(&self) -> DynamicState {
        self.inner.borrow().state
    }

    pub fn channels_needed(&self) -> bool {
        self.channels_needed
    }

    /// Primary-slot metadata for widgets that display it.
    pub fn primary_value(&self) -> Option<f64> {
        let inner = self.inner.borrow();
        inner.slots[0].has_value.then_some(inner.slots[0].value)
    }

    pub fn start(&mut self, hub: &ChannelHub) {
        if self.started {
            return;
        }
        self.started = true;

        {
            let mut inner = self.inner.borrow_mut();
            let needed = inner.attrs.is_dynamic();
            self.channels_needed = needed;
            inner.calc = None;
            inner.calc_failed = false;

            if inner.attrs.visibility_mode == VisibilityMode::Calc {
                let raw = inner.attrs.calc.trim().to_string();
                if !raw.is_empty() {
                    match CalcProgram::compile(&normalize_legacy_operators(&raw)) {
                        Ok(program) => inner.calc = Some(program),
                        Err(error) => {
                            inner.calc_failed = true;
                            warn!(target: "runtime.widget", kind = inner.kind_name,
                                expr = %raw, %error, "visibility expression rejected");
                        }
                    }
                }
            }
        }

        if !self.channels_needed {
            // Pin the widget to its live defaults; no subscriptions.
            let mut inner = self.inner.borrow_mut();
            Self::apply_state(
                &mut inner,
                DynamicState {
                    connected: true,
                    severity: AlarmSeverity::None,
                    visible: true,
                },
            );
            return;
        }

        for slot_index in 0..GRAPHIC_CHANNEL_COUNT {
            let name = self
                .inner
                .borrow()
                .attrs
                .channel(slot_index)
                .trim()
                .to_string();
            if name.is_empty() {
                continue;
            }
            {
                let mut inner = self.inner.borrow_mut();
                inner.slots[slot_index].name = name.clone();
            }
            let value_core = self.inner.clone();
            let conn_core = self.inner.clone();
            let callbacks = SubscriberCallbacks::new()
                .on_value(move |data| {
                    Self::handle_value(&value_core, slot_index, data);
                })
                .on_connection(move |connected, _| {
                    Self::handle_connection(&conn_core, slot_index, connected);
                });
            let handle = hub.subscribe(&name, RequestType::TimeDouble, 1, callbacks);
            self.handles.push(handle);
        }
        Self::evaluate(&self.inner);
    }

    pub fn stop(&mut self) {
        if !self.started {
            return;
        }
        self.started = false;
        self.handles.clear();
        let mut inner = self.inner.borrow_mut();
        inner.calc = None;
        inner.calc_failed = false;
        for slot in &mut inner.slots {
            *slot = Slot::default();
        }
        inner.state = DynamicState::default();
    }

    fn handle_connection(inner: &Rc<RefCell<CoreInner>>, slot_index: usize, connected: bool) {
        {
            let mut inner = inner.borrow_mut();
            let slot = &mut inner.slots[slot_index];
            slot.connected = connected;
            slot.has_value = false;
            slot.value = 0.0;
            slot.severity = 0;
            slot.status = 0;
        }
        Self::evaluate(inner);
    }

    fn handle_value(inner: &Rc<RefCell<CoreInner>>, slot_index: usize, data: &ChannelData) {
        {
            let mut inner = inner.borrow_mut();
            let slot = &mut inner.slots[slot_index];
            slot.value = data.numeric_value;
            slot.severity = data.severity.as_i16();
            slot.status = data.status;
            slot.has_value = data.has_value;
            slot.element_count = data.native_element_count;
            if data.has_control_info {
                slot.hopr = data.control.display_high;
                slot.lopr = data.control.display_low;
                slot.precision = data.control.precision;
            }
        }
        Self::evaluate(inner);
    }

    fn evaluate(inner: &Rc<RefCell<CoreInner>>) {
        let mut borrowed = inner.borrow_mut();
        let mut any_channels = false;
        let mut all_connected = true;
        for slot in &borrowed.slots {
            if slot.name.is_empty() {
                continue;
            }
            any_channels = true;
            if !slot.connected {
                all_connected = false;
                break;
            }
        }

        let next = if !any_channels {
            DynamicState {
                connected: true,
                severity: AlarmSeverity::None,
                visible: true,
            }
        } else if !all_connected {
            DynamicState {
                connected: false,
                severity: AlarmSeverity::Invalid,
                visible: true,
            }
        } else {
            let severity = AlarmSeverity::from_raw(borrowed.slots[0].severity);
            let visible = match borrowed.attrs.visibility_mode {
                VisibilityMode::Static => true,
                VisibilityMode::IfNotZero => borrowed.slots[0].value.abs() > VISIBILITY_EPSILON,
                VisibilityMode::IfZero => borrowed.slots[0].value.abs() <= VISIBILITY_EPSILON,
                VisibilityMode::Calc => match evaluate_calc(&borrowed) {
                    Some(result) => result.abs() > VISIBILITY_EPSILON,
                    None => false,
                },
            };
            DynamicState {
                connected: true,
                severity,
                visible,
            }
        };

        Self::apply_state(&mut borrowed, next);
        // Run the observer outside the borrow: it may re-enter the
        // coordinator or the hub.
        let observer = borrowed.on_state.take();
        let state = borrowed.state;
        drop(borrowed);
        if let Some(mut observer) = observer {
            observer(state);
            inner.borrow_mut().on_state = Some(observer);
        }
    }

    fn apply_state(inner: &mut CoreInner, next: DynamicState) {
        if inner.state != next {
            inner.state = next;
            inner
                .coordinator
                .borrow_mut()
                .request_update(inner.widget_id);
        }
    }
}

/// Populate the twelve calc inputs: A..D are slots 0..3, E and F are
/// reserved zeros, then G=element count, H=hopr, I=status,
/// J=severity, K=precision, L=lopr, all from slot 0.
fn evaluate_calc(inner: &CoreInner) -> Option<f64> {
    if inner.calc_failed {
        return None;
    }
    let program = inner.calc.as_ref()?;
    let mut args = [0.0; INPUT_COUNT];
    for (slot_index, arg) in args.iter_mut().enumerate().take(4) {
        *arg = inner.slots[slot_index].value;
    }
    let primary = &inner.slots[0];
    args[6] = primary.element_count.max(1) as f64;
    args[7] = primary.hopr;
    args[8] = f64::from(primary.status);
    args[9] = f64::from(primary.severity);
    args[10] = f64::from(primary.precision.max(0));
    args[11] = primary.lopr;
    let result = program.eval(&args);
    result.is_finite().then_some(result)
}
