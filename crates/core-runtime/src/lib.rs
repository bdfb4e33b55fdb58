//! Per-widget runtime state machines.
//!
//! A runtime is attached to a widget when its display enters execute
//! mode and detached when it leaves. It owns the widget's channel
//! subscriptions, folds raw channel data into widget-visible state
//! (connected, severity, value, write access, labels, limits), and
//! reports repaint intents to the update coordinator. Runtimes never
//! block and never touch the network directly; everything flows
//! through the channel hub.

mod charts;
mod commands;
mod composite;
mod controls;
mod dynamics;
mod graphic;
mod monitor;
mod session;

pub use charts::{
    ByteRuntime, ByteState, CartesianRuntime, HeatmapRuntime, HeatmapState, SampleRing,
    StripChartRuntime, TextMonitorRuntime, TextMonitorState, TraceBuffer,
};
pub use commands::{
    ActivationModifiers, DisplayRequest, RelatedDisplayRuntime, ShellCommandRuntime,
};
pub use composite::{CompositeRuntime, CompositeRuntimeState};
pub use controls::{
    ChoiceRuntime, ChoiceState, ControlState, MessageButtonRuntime, NumericControlRuntime,
    TextEntryRuntime,
};
pub use dynamics::{DynamicCore, DynamicState, VISIBILITY_EPSILON};
pub use graphic::{paint_color, GraphicRuntime};
pub use monitor::{MonitorRuntime, MonitorState};
pub use session::{DisplaySession, RuntimeContext, WidgetRuntime};
