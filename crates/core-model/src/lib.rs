//! Display model.
//!
//! A display is an owned tree: the root owns its widgets, composites
//! own their children, and a widget's identity is its position in that
//! tree. Widget kind is a closed set expressed as a tagged variant;
//! every per-kind operation (execute-mode cascade, z-order
//! classification, channel extraction) is one match over the variant.

mod attrs;
mod channels;
mod composite;
mod display;
mod edit;
mod geometry;
mod widget;

pub use attrs::{BasicAttrs, ColorMode, FillStyle, GraphicAttrs, LineStyle, VisibilityMode,
    GRAPHIC_CHANNEL_COUNT};
pub use channels::collect_channels;
pub use composite::{
    classify, stacking_order, Composite, CompositeVisibility, Layer, resolve_composite_visibility,
};
pub use display::{Display, WidgetPath};
pub use edit::{
    group_widgets, lower_widget, move_widget, place_widget, raise_widget, remove_widget,
    ungroup_composite,
};
pub use widget::{
    BarConfig, BarDirection, ByteConfig, CartesianConfig, CartesianTrace, ChoiceButtonConfig,
    ChoiceStacking, HeatmapConfig, ImageConfig, MenuConfig, MessageButtonConfig, MeterConfig,
    MonitorLabel, PlotAxisRange, RelatedDisplayConfig, RelatedDisplayEntry, RelatedDisplayMode,
    ScaleConfig, ShellCommandConfig, ShellCommandEntry, SliderConfig, StripChartConfig,
    StripChartPen, StripChartUnits, TextConfig, TextEntryConfig, TextMonitorConfig,
    WheelSwitchConfig, Widget, WidgetKind,
};
pub use geometry::Rect;
