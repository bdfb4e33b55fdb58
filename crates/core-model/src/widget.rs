//! Widget variants and their per-kind configuration.
//!
//! The kind set is closed; operations over widgets are single matches
//! rather than a class hierarchy. Configuration structs hold exactly
//! what the display file records and the runtimes consume.

use core_colors::PvLimits;

use crate::attrs::{BasicAttrs, ColorMode, GraphicAttrs};
use crate::composite::Composite;
use crate::geometry::Rect;

/// Whether a monitor draws its limit/channel labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MonitorLabel {
    #[default]
    None,
    NoDecorations,
    Outline,
    Limits,
    Channel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BarDirection {
    Up,
    Down,
    #[default]
    Right,
    Left,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextConfig {
    pub text: String,
    pub basic: BasicAttrs,
    pub dynamic: GraphicAttrs,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ImageConfig {
    pub image_name: String,
    pub dynamic: GraphicAttrs,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeterConfig {
    pub channel: String,
    pub color: usize,
    pub background: usize,
    pub color_mode: ColorMode,
    pub label: MonitorLabel,
    pub limits: PvLimits,
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            channel: String::new(),
            color: 14,
            background: 0,
            color_mode: ColorMode::Static,
            label: MonitorLabel::None,
            limits: PvLimits::default(),
        }
    }
}

/// Bar monitors deliberately pair a track at `background` darkened by
/// 10 % with a fill at `color`; the low contrast is a convention, not
/// an accident.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BarConfig {
    pub channel: String,
    pub color: usize,
    pub background: usize,
    pub color_mode: ColorMode,
    pub label: MonitorLabel,
    pub direction: BarDirection,
    pub limits: PvLimits,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScaleConfig {
    pub channel: String,
    pub color: usize,
    pub background: usize,
    pub color_mode: ColorMode,
    pub label: MonitorLabel,
    pub direction: BarDirection,
    pub limits: PvLimits,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextMonitorConfig {
    pub channel: String,
    pub color: usize,
    pub background: usize,
    pub color_mode: ColorMode,
    pub limits: PvLimits,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ByteConfig {
    pub channel: String,
    pub color: usize,
    pub background: usize,
    pub color_mode: ColorMode,
    pub direction: BarDirection,
    pub start_bit: u8,
    pub end_bit: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StripChartUnits {
    Milliseconds,
    #[default]
    Seconds,
    Minutes,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StripChartPen {
    pub channel: String,
    pub color: usize,
    pub limits: PvLimits,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StripChartConfig {
    pub title: String,
    pub color: usize,
    pub background: usize,
    pub period: f64,
    pub units: StripChartUnits,
    pub pens: Vec<StripChartPen>,
}

impl Default for StripChartConfig {
    fn default() -> Self {
        Self {
            title: String::new(),
            color: 14,
            background: 0,
            period: 60.0,
            units: StripChartUnits::Seconds,
            pens: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlotAxisRange {
    pub minimum: f64,
    pub maximum: f64,
    /// False means autoscale from the data.
    pub user_specified: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CartesianTrace {
    pub x_channel: String,
    pub y_channel: String,
    pub color: usize,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CartesianConfig {
    pub title: String,
    pub color: usize,
    pub background: usize,
    /// Point budget; a PV name here sizes the buffers dynamically.
    pub count: String,
    pub traces: Vec<CartesianTrace>,
    pub x_range: PlotAxisRange,
    pub y_range: PlotAxisRange,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct HeatmapConfig {
    pub data_channel: String,
    /// X/Y dimension sources; numeric literals or PV references.
    pub width_source: String,
    pub height_source: String,
    pub color: usize,
    pub background: usize,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SliderConfig {
    pub channel: String,
    pub color: usize,
    pub background: usize,
    pub color_mode: ColorMode,
    pub label: MonitorLabel,
    pub direction: BarDirection,
    pub step: f64,
    pub limits: PvLimits,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct WheelSwitchConfig {
    pub channel: String,
    pub color: usize,
    pub background: usize,
    pub color_mode: ColorMode,
    pub format: String,
    pub limits: PvLimits,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextEntryConfig {
    pub channel: String,
    pub color: usize,
    pub background: usize,
    pub color_mode: ColorMode,
    pub limits: PvLimits,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChoiceStacking {
    #[default]
    Row,
    Column,
    RowColumn,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChoiceButtonConfig {
    pub channel: String,
    pub color: usize,
    pub background: usize,
    pub color_mode: ColorMode,
    pub stacking: ChoiceStacking,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MenuConfig {
    pub channel: String,
    pub color: usize,
    pub background: usize,
    pub color_mode: ColorMode,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MessageButtonConfig {
    pub channel: String,
    pub color: usize,
    pub background: usize,
    pub color_mode: ColorMode,
    pub label: String,
    /// Value written on press; empty means "no press write".
    pub press_value: String,
    /// Value written on release; empty means "no release write".
    pub release_value: String,
}

/// How a related display replaces or augments the current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelatedDisplayMode {
    #[default]
    AddWindow,
    Replace,
    NewWindow,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RelatedDisplayEntry {
    pub label: String,
    pub display_file: String,
    pub args: String,
    pub mode: RelatedDisplayMode,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RelatedDisplayConfig {
    pub label: String,
    pub color: usize,
    pub background: usize,
    pub entries: Vec<RelatedDisplayEntry>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShellCommandEntry {
    pub label: String,
    pub command: String,
    pub args: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShellCommandConfig {
    pub label: String,
    pub color: usize,
    pub background: usize,
    pub entries: Vec<ShellCommandEntry>,
}

/// The closed set of widget kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetKind {
    Rectangle(BasicAttrs, GraphicAttrs),
    Oval(BasicAttrs, GraphicAttrs),
    Arc(BasicAttrs, GraphicAttrs),
    Line(BasicAttrs, GraphicAttrs),
    Polyline(BasicAttrs, GraphicAttrs, Vec<(i32, i32)>),
    Polygon(BasicAttrs, GraphicAttrs, Vec<(i32, i32)>),
    Text(TextConfig),
    Image(ImageConfig),
    Meter(MeterConfig),
    Bar(BarConfig),
    Scale(ScaleConfig),
    TextMonitor(TextMonitorConfig),
    Byte(ByteConfig),
    StripChart(StripChartConfig),
    CartesianPlot(CartesianConfig),
    Heatmap(HeatmapConfig),
    Slider(SliderConfig),
    WheelSwitch(WheelSwitchConfig),
    TextEntry(TextEntryConfig),
    ChoiceButton(ChoiceButtonConfig),
    Menu(MenuConfig),
    MessageButton(MessageButtonConfig),
    RelatedDisplay(RelatedDisplayConfig),
    ShellCommand(ShellCommandConfig),
    Composite(Composite),
}

/// A placed widget.
#[derive(Debug, Clone, PartialEq)]
pub struct Widget {
    pub geometry: Rect,
    pub kind: WidgetKind,
}

impl Widget {
    pub fn new(geometry: Rect, kind: WidgetKind) -> Self {
        Self { geometry, kind }
    }

    /// Stable name of the kind, used for logging and audit records.
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            WidgetKind::Rectangle(..) => "Rectangle",
            WidgetKind::Oval(..) => "Oval",
            WidgetKind::Arc(..) => "Arc",
            WidgetKind::Line(..) => "Line",
            WidgetKind::Polyline(..) => "Polyline",
            WidgetKind::Polygon(..) => "Polygon",
            WidgetKind::Text(_) => "Text",
            WidgetKind::Image(_) => "Image",
            WidgetKind::Meter(_) => "Meter",
            WidgetKind::Bar(_) => "Bar",
            WidgetKind::Scale(_) => "Scale",
            WidgetKind::TextMonitor(_) => "TextMonitor",
            WidgetKind::Byte(_) => "Byte",
            WidgetKind::StripChart(_) => "StripChart",
            WidgetKind::CartesianPlot(_) => "CartesianPlot",
            WidgetKind::Heatmap(_) => "Heatmap",
            WidgetKind::Slider(_) => "Slider",
            WidgetKind::WheelSwitch(_) => "WheelSwitch",
            WidgetKind::TextEntry(_) => "TextEntry",
            WidgetKind::ChoiceButton(_) => "ChoiceButton",
            WidgetKind::Menu(_) => "Menu",
            WidgetKind::MessageButton(_) => "MessageButton",
            WidgetKind::RelatedDisplay(_) => "RelatedDisplay",
            WidgetKind::ShellCommand(_) => "ShellCommand",
            WidgetKind::Composite(_) => "Composite",
        }
    }

    /// The dynamic attribute block, for kinds that carry one.
    pub fn graphic_attrs(&self) -> Option<&GraphicAttrs> {
        match &self.kind {
            WidgetKind::Rectangle(_, attrs)
            | WidgetKind::Oval(_, attrs)
            | WidgetKind::Arc(_, attrs)
            | WidgetKind::Line(_, attrs)
            | WidgetKind::Polyline(_, attrs, _)
            | WidgetKind::Polygon(_, attrs, _) => Some(attrs),
            WidgetKind::Text(config) => Some(&config.dynamic),
            WidgetKind::Image(config) => Some(&config.dynamic),
            WidgetKind::Composite(composite) => composite.dynamic.as_ref(),
            _ => None,
        }
    }
}
