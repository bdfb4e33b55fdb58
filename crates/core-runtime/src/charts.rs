//! Monitor-only widgets with buffers: text monitors, byte monitors,
//! strip charts, cartesian plots, heatmaps.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use core_channels::{ChannelHub, SubscriberCallbacks, SubscriptionHandle};
use core_colors::format_with_precision;
use core_model::{CartesianConfig, HeatmapConfig, StripChartConfig, StripChartUnits};
use core_pv::{AlarmSeverity, ChannelData, RequestType};
use core_render::{UpdateCoordinator, WidgetId};

// ---------------------------------------------------------------------
// Text monitor
// ---------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextMonitorState {
    pub connected: bool,
    pub severity: AlarmSeverity,
    pub text: String,
}

/// Displays the channel's string rendering; numeric channels are
/// formatted with the resolved precision.
pub struct TextMonitorRuntime {
    inner: Rc<RefCell<TextMonitorInner>>,
    handle: SubscriptionHandle,
    started: bool,
}

struct TextMonitorInner {
    widget_id: WidgetId,
    channel: String,
    precision_default: i16,
    state: TextMonitorState,
    coordinator: Rc<RefCell<UpdateCoordinator>>,
}

impl TextMonitorRuntime {
    pub fn new(
        widget_id: WidgetId,
        channel: &str,
        precision_default: i16,
        coordinator: Rc<RefCell<UpdateCoordinator>>,
    ) -> Self {
        Self {
            inner: Rc::new(RefCell::new(TextMonitorInner {
                widget_id,
                channel: channel.trim().to_string(),
                precision_default,
                state: TextMonitorState {
                    severity: AlarmSeverity::Invalid,
                    ..TextMonitorState::default()
                },
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
            .on_value(move |data| {
                let mut inner = value_inner.borrow_mut();
                if !inner.state.connected {
                    return;
                }
                inner.state.severity = data.severity;
                let text = render_text(&inner, data);
                inner.state.text = text;
                let id = inner.widget_id;
                inner.coordinator.borrow_mut().request_update(id);
            })
            .on_connection(move |connected, _| {
                let mut inner = conn_inner.borrow_mut();
                inner.state.connected = connected;
                if !connected {
                    inner.state.text.clear();
                    inner.state.severity = AlarmSeverity::Invalid;
                } else {
                    inner.state.severity = AlarmSeverity::None;
                }
                let id = inner.widget_id;
                inner.coordinator.borrow_mut().request_update(id);
            });
        self.handle = hub.subscribe(&channel, RequestType::TimeString, 1, callbacks);
    }

    pub fn stop(&mut self) {
        if !self.started {
            return;
        }
        self.started = false;
        core_events::stats::register_display_object_stopped();
        self.handle.reset();
        let mut inner = self.inner.borrow_mut();
        inner.state = TextMonitorState {
            severity: AlarmSeverity::Invalid,
            ..TextMonitorState::default()
        };
    }

    pub fn state(&self) -> TextMonitorState {
        self.inner.borrow().state.clone()
    }
}

fn render_text(inner: &TextMonitorInner, data: &ChannelData) -> String {
    if data.is_string {
        return data.string_value.clone();
    }
    if data.is_numeric {
        let precision = if data.has_precision {
            data.control.precision
        } else {
            inner.precision_default
        };
        return format_with_precision(data.numeric_value, precision);
    }
    String::new()
}

// ---------------------------------------------------------------------
// Byte monitor
// ---------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ByteState {
    pub connected: bool,
    pub severity: AlarmSeverity,
    pub bits: u32,
}

/// Shows a bit window of an integer channel.
pub struct ByteRuntime {
    inner: Rc<RefCell<ByteInner>>,
    handle: SubscriptionHandle,
    started: bool,
}

struct ByteInner {
    widget_id: WidgetId,
    channel: String,
    state: ByteState,
    coordinator: Rc<RefCell<UpdateCoordinator>>,
}

impl ByteRuntime {
    pub fn new(
        widget_id: WidgetId,
        channel: &str,
        coordinator: Rc<RefCell<UpdateCoordinator>>,
    ) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ByteInner {
                widget_id,
                channel: channel.trim().to_string(),
                state: ByteState::default(),
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
            .on_value(move |data| {
                let mut inner = value_inner.borrow_mut();
                if !inner.state.connected || !data.is_numeric {
                    return;
                }
                inner.state.severity = data.severity;
                inner.state.bits = data.numeric_value.max(0.0) as u32;
                let id = inner.widget_id;
                inner.coordinator.borrow_mut().request_update(id);
            })
            .on_connection(move |connected, _| {
                let mut inner = conn_inner.borrow_mut();
                inner.state.connected = connected;
                if !connected {
                    inner.state.bits = 0;
                    inner.state.severity = AlarmSeverity::Invalid;
                }
                let id = inner.widget_id;
                inner.coordinator.borrow_mut().request_update(id);
            });
        self.handle = hub.subscribe(&channel, RequestType::TimeLong, 1, callbacks);
    }

    pub fn stop(&mut self) {
        if !self.started {
            return;
        }
        self.started = false;
        core_events::stats::register_display_object_stopped();
        self.handle.reset();
        self.inner.borrow_mut().state = ByteState::default();
    }

    pub fn state(&self) -> ByteState {
        self.inner.borrow().state.clone()
    }

    /// The bit window `[start_bit, end_bit]` of the current value.
    pub fn bit(&self, index: u8) -> bool {
        (self.inner.borrow().state.bits >> index) & 1 == 1
    }
}

// ---------------------------------------------------------------------
// Strip chart
// ---------------------------------------------------------------------

/// Fixed-capacity ring of samples. Overwrites the oldest once full.
#[derive(Debug, Clone)]
pub struct SampleRing {
    samples: Vec<f64>,
    capacity: usize,
    next: usize,
    filled: bool,
}

impl SampleRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
            capacity: capacity.max(2),
            next: 0,
            filled: false,
        }
    }

    pub fn push(&mut self, sample: f64) {
        if self.samples.len() < self.capacity {
            self.samples.push(sample);
            if self.samples.len() == self.capacity {
                self.filled = true;
            }
        } else {
            self.samples[self.next] = sample;
            self.filled = true;
        }
        self.next = (self.next + 1) % self.capacity;
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples oldest-first.
    pub fn ordered(&self) -> Vec<f64> {
        if !self.filled {
            return self.samples.clone();
        }
        let mut out = Vec::with_capacity(self.samples.len());
        out.extend_from_slice(&self.samples[self.next..]);
        out.extend_from_slice(&self.samples[..self.next]);
        out
    }
}

struct PenRuntime {
    #[allow(dead_code)]
    handle: SubscriptionHandle,
    latest: Rc<RefCell<Option<f64>>>,
    ring: SampleRing,
}

/// Strip chart: one ring per pen, sized from the configured time span
/// and the sampling period. Time-axis correctness makes this widget
/// repaint on its own schedule instead of through the coordinator.
pub struct StripChartRuntime {
    config: StripChartConfig,
    sample_period: Duration,
    pens: Vec<PenRuntime>,
    started: bool,
}

impl StripChartRuntime {
    pub fn new(config: StripChartConfig, sample_period: Duration) -> Self {
        Self {
            config,
            sample_period: sample_period.max(Duration::from_millis(100)),
            pens: Vec::new(),
            started: false,
        }
    }

    /// Ring capacity covering the configured span at the sample rate.
    pub fn ring_capacity(&self) -> usize {
        let span = match self.config.units {
            StripChartUnits::Milliseconds => self.config.period / 1000.0,
            StripChartUnits::Seconds => self.config.period,
            StripChartUnits::Minutes => self.config.period * 60.0,
        };
        let samples = (span / self.sample_period.as_secs_f64()).ceil() as usize;
        samples.max(2)
    }

    pub fn start(&mut self, hub: &ChannelHub) {
        if self.started {
            return;
        }
        self.started = true;
        core_events::stats::register_display_object_started();
        let capacity = self.ring_capacity();
        for pen in &self.config.pens {
            let channel = pen.channel.trim();
            if channel.is_empty() {
                continue;
            }
            let latest: Rc<RefCell<Option<f64>>> = Rc::new(RefCell::new(None));
            let sink = latest.clone();
            let callbacks = SubscriberCallbacks::new().on_value(move |data| {
                if data.is_numeric && data.numeric_value.is_finite() {
                    *sink.borrow_mut() = Some(data.numeric_value);
                }
            });
            let handle = hub.subscribe(channel, RequestType::TimeDouble, 1, callbacks);
            self.pens.push(PenRuntime {
                handle,
                latest,
                ring: SampleRing::new(capacity),
            });
        }
    }

    pub fn stop(&mut self) {
        if !self.started {
            return;
        }
        self.started = false;
        core_events::stats::register_display_object_stopped();
        self.pens.clear();
    }

    /// Record one sample per pen from the latest delivered values.
    /// Driven by the chart's own timer.
    pub fn sample(&mut self) {
        for pen in &mut self.pens {
            if let Some(value) = *pen.latest.borrow() {
                pen.ring.push(value);
            }
        }
    }

    pub fn pen_count(&self) -> usize {
        self.pens.len()
    }

    pub fn pen_samples(&self, pen_index: usize) -> Vec<f64> {
        self.pens
            .get(pen_index)
            .map(|pen| pen.ring.ordered())
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------
// Cartesian plot
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct TraceBuffer {
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
}

struct TraceRuntime {
    #[allow(dead_code)]
    x_handle: SubscriptionHandle,
    #[allow(dead_code)]
    y_handle: SubscriptionHandle,
    buffer: Rc<RefCell<TraceBuffer>>,
}

/// Cartesian plot: per-trace x/y buffers. Array channels replace the
/// whole buffer; scalar channels append with an erase-oldest cap.
/// Like the strip chart, it repaints on its own schedule.
pub struct CartesianRuntime {
    config: CartesianConfig,
    point_cap: usize,
    traces: Vec<TraceRuntime>,
    started: bool,
}

impl CartesianRuntime {
    pub fn new(config: CartesianConfig) -> Self {
        let point_cap = config.count.trim().parse::<usize>().unwrap_or(0).max(1);
        Self {
            config,
            point_cap,
            traces: Vec::new(),
            started: false,
        }
    }

    pub fn start(&mut self, hub: &ChannelHub) {
        if self.started {
            return;
        }
        self.started = true;
        core_events::stats::register_display_object_started();
        for trace in &self.config.traces {
            let buffer: Rc<RefCell<TraceBuffer>> = Rc::new(RefCell::new(TraceBuffer::default()));
            let cap = self.point_cap;
            let x_handle = Self::subscribe_axis(hub, &trace.x_channel, buffer.clone(), cap, true);
            let y_handle = Self::subscribe_axis(hub, &trace.y_channel, buffer.clone(), cap, false);
            self.traces.push(TraceRuntime {
                x_handle,
                y_handle,
                buffer,
            });
        }
    }

    fn subscribe_axis(
        hub: &ChannelHub,
        channel: &str,
        buffer: Rc<RefCell<TraceBuffer>>,
        cap: usize,
        is_x: bool,
    ) -> SubscriptionHandle {
        let channel = channel.trim();
        if channel.is_empty() {
            return SubscriptionHandle::default();
        }
        let callbacks = SubscriberCallbacks::new().on_value(move |data| {
            let mut buffer = buffer.borrow_mut();
            let axis = if is_x { &mut buffer.xs } else { &mut buffer.ys };
            if data.is_array {
                *axis = data.array_values.clone();
            } else if data.is_numeric && data.numeric_value.is_finite() {
                axis.push(data.numeric_value);
                if axis.len() > cap {
                    axis.remove(0);
                }
            }
        });
        hub.subscribe(channel, RequestType::TimeDouble, 0, callbacks)
    }

    pub fn stop(&mut self) {
        if !self.started {
            return;
        }
        self.started = false;
        core_events::stats::register_display_object_stopped();
        self.traces.clear();
    }

    pub fn trace_count(&self) -> usize {
        self.traces.len()
    }

    pub fn trace(&self, index: usize) -> TraceBuffer {
        self.traces
            .get(index)
            .map(|trace| trace.buffer.borrow().clone())
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------
// Heatmap
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct HeatmapState {
    pub width: usize,
    pub height: usize,
    /// Row-major, `width * height` cells once both dimensions are
    /// known.
    pub cells: Vec<f64>,
}

struct HeatmapInner {
    state: HeatmapState,
    data: Vec<f64>,
}

impl HeatmapInner {
    /// Rebuild cells when data or either dimension moves. Data is
    /// truncated or zero-padded to fit.
    fn rebuild(&mut self) {
        let size = self.state.width * self.state.height;
        let mut cells = self.data.clone();
        cells.resize(size, 0.0);
        self.state.cells = cells;
    }
}

/// 2-D intensity display. The X/Y dimensions may be numeric literals
/// or PVs (camera geometry published at runtime).
pub struct HeatmapRuntime {
    config: HeatmapConfig,
    inner: Rc<RefCell<HeatmapInner>>,
    handles: Vec<SubscriptionHandle>,
    started: bool,
}

impl HeatmapRuntime {
    pub fn new(config: HeatmapConfig) -> Self {
        Self {
            config,
            inner: Rc::new(RefCell::new(HeatmapInner {
                state: HeatmapState::default(),
                data: Vec::new(),
            })),
            handles: Vec::new(),
            started: false,
        }
    }

    pub fn start(&mut self, hub: &ChannelHub) {
        if self.started {
            return;
        }
        self.started = true;
        core_events::stats::register_display_object_started();

        for (source, is_width) in [
            (self.config.width_source.clone(), true),
            (self.config.height_source.clone(), false),
        ] {
            let source = source.trim().to_string();
            if let Ok(literal) = source.parse::<usize>() {
                let mut inner = self.inner.borrow_mut();
                if is_width {
                    inner.state.width = literal;
                } else {
                    inner.state.height = literal;
                }
                inner.rebuild();
                continue;
            }
            if source.is_empty() {
                continue;
            }
            let dim_inner = self.inner.clone();
            let callbacks = SubscriberCallbacks::new().on_value(move |data| {
                if !data.is_numeric || !data.numeric_value.is_finite() {
                    return;
                }
                let mut inner = dim_inner.borrow_mut();
                let value = data.numeric_value.max(0.0) as usize;
                if is_width {
                    inner.state.width = value;
                } else {
                    inner.state.height = value;
                }
                inner.rebuild();
            });
            self.handles
                .push(hub.subscribe(&source, RequestType::TimeDouble, 1, callbacks));
        }

        let data_channel = self.config.data_channel.trim().to_string();
        if !data_channel.is_empty() {
            let data_inner = self.inner.clone();
            let callbacks = SubscriberCallbacks::new().on_value(move |data| {
                let mut inner = data_inner.borrow_mut();
                if data.is_array {
                    inner.data = data.array_values.clone();
                } else if data.is_numeric {
                    inner.data = vec![data.numeric_value];
                }
                inner.rebuild();
            });
            self.handles
                .push(hub.subscribe(&data_channel, RequestType::TimeDouble, 0, callbacks));
        }
    }

    pub fn stop(&mut self) {
        if !self.started {
            return;
        }
        self.started = false;
        core_events::stats::register_display_object_stopped();
        self.handles.clear();
        let mut inner = self.inner.borrow_mut();
        inner.state = HeatmapState::default();
        inner.data.clear();
    }

    pub fn state(&self) -> HeatmapState {
        self.inner.borrow().state.clone()
    }
}
