//! Block tree to model mapping.
//!
//! Malformed values are configuration errors: logged with the
//! offending construct and replaced by defaults, never fatal. Unknown
//! element blocks are skipped the same way.

use tracing::warn;

use core_colors::{PvLimits, PALETTE_SIZE};
use core_model::{
    BarConfig, BasicAttrs, ByteConfig, CartesianConfig, CartesianTrace, ChoiceButtonConfig,
    Composite, Display, GraphicAttrs, HeatmapConfig, ImageConfig, MenuConfig, MessageButtonConfig,
    MeterConfig, PlotAxisRange, Rect, RelatedDisplayConfig, RelatedDisplayEntry, ScaleConfig,
    ShellCommandConfig, ShellCommandEntry, SliderConfig, StripChartConfig, StripChartPen,
    TextConfig, TextEntryConfig, TextMonitorConfig, WheelSwitchConfig, Widget, WidgetKind,
};

use crate::keywords::*;
use crate::node::Block;
use crate::parse::AdlError;

pub(crate) fn display_from_blocks(blocks: &[Block]) -> Result<Display, AdlError> {
    let mut display = Display::default();
    let mut saw_header = false;

    for block in blocks {
        match block.name.as_str() {
            "file" => {
                saw_header = true;
                if let Some(name) = block.pair("name") {
                    display.file_name = name.to_string();
                }
                if let Some(version) = block.pair("version") {
                    display.version = version.parse().unwrap_or_else(|_| {
                        warn!(target: "adl.read", version, "bad version number");
                        Display::default().version
                    });
                }
            }
            "display" => {
                saw_header = true;
                if let Some(object) = block.child("object") {
                    display.geometry = rect_from(object);
                }
                display.color = color_index(block.pair("clr"), display.color);
                display.background = color_index(block.pair("bclr"), display.background);
            }
            _ => {
                if let Some(widget) = widget_from_block(block) {
                    display.widgets.push(widget);
                }
            }
        }
    }

    if !saw_header {
        return Err(AdlError::MissingHeader);
    }
    Ok(display)
}

fn widget_from_block(block: &Block) -> Option<Widget> {
    let geometry = block.child("object").map(rect_from).unwrap_or_default();
    let kind = match block.name.as_str() {
        "rectangle" => WidgetKind::Rectangle(basic_from(block), dynamic_from(block)),
        "oval" => WidgetKind::Oval(basic_from(block), dynamic_from(block)),
        "arc" => WidgetKind::Arc(basic_from(block), dynamic_from(block)),
        "line" => WidgetKind::Line(basic_from(block), dynamic_from(block)),
        "polyline" => {
            WidgetKind::Polyline(basic_from(block), dynamic_from(block), block.points.clone())
        }
        "polygon" => {
            WidgetKind::Polygon(basic_from(block), dynamic_from(block), block.points.clone())
        }
        "text" => WidgetKind::Text(TextConfig {
            text: text_of(block, "textix"),
            basic: basic_from(block),
            dynamic: dynamic_from(block),
        }),
        "image" => WidgetKind::Image(ImageConfig {
            image_name: text_of(block, "image name"),
            dynamic: dynamic_from(block),
        }),
        "meter" => {
            let (channel, color, background) = monitor_from(block);
            WidgetKind::Meter(MeterConfig {
                channel,
                color,
                background,
                color_mode: color_mode_from_str(block.pair("clrmod").unwrap_or("static")),
                label: label_from_str(block.pair("label").unwrap_or("none")),
                limits: limits_from(block),
            })
        }
        "bar" => {
            let (channel, color, background) = monitor_from(block);
            WidgetKind::Bar(BarConfig {
                channel,
                color,
                background,
                color_mode: color_mode_from_str(block.pair("clrmod").unwrap_or("static")),
                label: label_from_str(block.pair("label").unwrap_or("none")),
                direction: direction_from_str(block.pair("direction").unwrap_or("right")),
                limits: limits_from(block),
            })
        }
        "indicator" => {
            let (channel, color, background) = monitor_from(block);
            WidgetKind::Scale(ScaleConfig {
                channel,
                color,
                background,
                color_mode: color_mode_from_str(block.pair("clrmod").unwrap_or("static")),
                label: label_from_str(block.pair("label").unwrap_or("none")),
                direction: direction_from_str(block.pair("direction").unwrap_or("right")),
                limits: limits_from(block),
            })
        }
        "text update" => {
            let (channel, color, background) = monitor_from(block);
            WidgetKind::TextMonitor(TextMonitorConfig {
                channel,
                color,
                background,
                color_mode: color_mode_from_str(block.pair("clrmod").unwrap_or("static")),
                limits: limits_from(block),
            })
        }
        "byte" => {
            let (channel, color, background) = monitor_from(block);
            WidgetKind::Byte(ByteConfig {
                channel,
                color,
                background,
                color_mode: color_mode_from_str(block.pair("clrmod").unwrap_or("static")),
                direction: direction_from_str(block.pair("direction").unwrap_or("right")),
                start_bit: int_of(block, "sbit", 15) as u8,
                end_bit: int_of(block, "ebit", 0) as u8,
            })
        }
        "strip chart" => {
            let (title, color, background) = plotcom_from(block);
            WidgetKind::StripChart(StripChartConfig {
                title,
                color,
                background,
                period: float_of(block, "period", 60.0),
                units: units_from_str(block.pair("units").unwrap_or("second")),
                pens: block
                    .indexed_children("pen")
                    .into_iter()
                    .map(|pen| StripChartPen {
                        channel: text_of(pen, "chan"),
                        color: color_index(pen.pair("clr"), 14),
                        limits: limits_from(pen),
                    })
                    .collect(),
            })
        }
        "cartesian plot" => {
            let (title, color, background) = plotcom_from(block);
            WidgetKind::CartesianPlot(CartesianConfig {
                title,
                color,
                background,
                count: text_of(block, "count"),
                traces: block
                    .indexed_children("trace")
                    .into_iter()
                    .map(|trace| CartesianTrace {
                        x_channel: text_of(trace, "xdata"),
                        y_channel: text_of(trace, "ydata"),
                        color: color_index(trace.pair("data_clr"), 14),
                    })
                    .collect(),
                x_range: axis_from(block.child("x_axis")),
                y_range: axis_from(block.child("y_axis")),
            })
        }
        "heatmap" => WidgetKind::Heatmap(HeatmapConfig {
            data_channel: text_of(block, "data_chan"),
            width_source: text_of(block, "width_src"),
            height_source: text_of(block, "height_src"),
            color: color_index(block.pair("clr"), 14),
            background: color_index(block.pair("bclr"), 0),
        }),
        "valuator" => {
            let (channel, color, background) = control_from(block);
            WidgetKind::Slider(SliderConfig {
                channel,
                color,
                background,
                color_mode: color_mode_from_str(block.pair("clrmod").unwrap_or("static")),
                label: label_from_str(block.pair("label").unwrap_or("none")),
                direction: direction_from_str(block.pair("direction").unwrap_or("right")),
                step: float_of(block, "dPrecision", 1.0),
                limits: limits_from(block),
            })
        }
        "wheel switch" => {
            let (channel, color, background) = control_from(block);
            WidgetKind::WheelSwitch(WheelSwitchConfig {
                channel,
                color,
                background,
                color_mode: color_mode_from_str(block.pair("clrmod").unwrap_or("static")),
                format: text_of(block, "format"),
                limits: limits_from(block),
            })
        }
        "text entry" => {
            let (channel, color, background) = control_from(block);
            WidgetKind::TextEntry(TextEntryConfig {
                channel,
                color,
                background,
                color_mode: color_mode_from_str(block.pair("clrmod").unwrap_or("static")),
                limits: limits_from(block),
            })
        }
        "choice button" => {
            let (channel, color, background) = control_from(block);
            WidgetKind::ChoiceButton(ChoiceButtonConfig {
                channel,
                color,
                background,
                color_mode: color_mode_from_str(block.pair("clrmod").unwrap_or("static")),
                stacking: stacking_from_str(block.pair("stacking").unwrap_or("row")),
            })
        }
        "menu" => {
            let (channel, color, background) = control_from(block);
            WidgetKind::Menu(MenuConfig {
                channel,
                color,
                background,
                color_mode: color_mode_from_str(block.pair("clrmod").unwrap_or("static")),
            })
        }
        "message button" => {
            let (channel, color, background) = control_from(block);
            WidgetKind::MessageButton(MessageButtonConfig {
                channel,
                color,
                background,
                color_mode: color_mode_from_str(block.pair("clrmod").unwrap_or("static")),
                label: text_of(block, "label"),
                press_value: text_of(block, "press_msg"),
                release_value: text_of(block, "release_msg"),
            })
        }
        "related display" => WidgetKind::RelatedDisplay(RelatedDisplayConfig {
            label: text_of(block, "label"),
            color: color_index(block.pair("clr"), 14),
            background: color_index(block.pair("bclr"), 4),
            entries: block
                .indexed_children("display")
                .into_iter()
                .map(|entry| RelatedDisplayEntry {
                    label: text_of(entry, "label"),
                    display_file: text_of(entry, "name"),
                    args: text_of(entry, "args"),
                    mode: display_mode_from_str(entry.pair("policy").unwrap_or("add window")),
                })
                .collect(),
        }),
        "shell command" => WidgetKind::ShellCommand(ShellCommandConfig {
            label: text_of(block, "label"),
            color: color_index(block.pair("clr"), 14),
            background: color_index(block.pair("bclr"), 4),
            entries: block
                .indexed_children("command")
                .into_iter()
                .map(|entry| ShellCommandEntry {
                    label: text_of(entry, "label"),
                    command: text_of(entry, "name"),
                    args: text_of(entry, "args"),
                })
                .collect(),
        }),
        "composite" => {
            let children = block
                .child("children")
                .map(|children| {
                    children
                        .children
                        .iter()
                        .filter_map(widget_from_block)
                        .collect()
                })
                .unwrap_or_default();
            WidgetKind::Composite(Composite {
                name: text_of(block, "composite name"),
                composite_file: text_of(block, "composite file"),
                dynamic: block
                    .child("dynamic attribute")
                    .is_some()
                    .then(|| dynamic_from(block)),
                children,
            })
        }
        other => {
            warn!(target: "adl.read", element = other, "unknown element, skipped");
            return None;
        }
    };
    Some(Widget::new(geometry, kind))
}

fn rect_from(object: &Block) -> Rect {
    Rect::new(
        int_of(object, "x", 0),
        int_of(object, "y", 0),
        int_of(object, "width", 0).max(0) as u32,
        int_of(object, "height", 0).max(0) as u32,
    )
}

fn basic_from(block: &Block) -> BasicAttrs {
    let Some(basic) = block.child("basic attribute") else {
        return BasicAttrs::default();
    };
    BasicAttrs {
        color: color_index(basic.pair("clr"), 14),
        style: line_style_from_str(basic.pair("style").unwrap_or("solid")),
        fill: fill_style_from_str(basic.pair("fill").unwrap_or("solid")),
        line_width: int_of(basic, "width", 0).max(0) as u32,
    }
}

fn dynamic_from(block: &Block) -> GraphicAttrs {
    let Some(dynamic) = block.child("dynamic attribute") else {
        return GraphicAttrs::default();
    };
    let mut attrs = GraphicAttrs {
        color_mode: color_mode_from_str(dynamic.pair("clr").unwrap_or("static")),
        visibility_mode: visibility_from_str(dynamic.pair("vis").unwrap_or("static")),
        calc: text_of(dynamic, "calc"),
        ..GraphicAttrs::default()
    };
    for (slot, key) in ["chan", "chanB", "chanC", "chanD", "chanE"].iter().enumerate() {
        if let Some(name) = dynamic.pair(key) {
            attrs.channels[slot] = name.to_string();
        }
    }
    attrs
}

fn monitor_from(block: &Block) -> (String, usize, usize) {
    channel_block_from(block, "monitor")
}

fn control_from(block: &Block) -> (String, usize, usize) {
    channel_block_from(block, "control")
}

fn channel_block_from(block: &Block, name: &str) -> (String, usize, usize) {
    let Some(inner) = block.child(name) else {
        return (String::new(), 14, 0);
    };
    (
        text_of(inner, "chan"),
        color_index(inner.pair("clr"), 14),
        color_index(inner.pair("bclr"), 0),
    )
}

fn plotcom_from(block: &Block) -> (String, usize, usize) {
    let Some(inner) = block.child("plotcom") else {
        return (String::new(), 14, 0);
    };
    (
        text_of(inner, "title"),
        color_index(inner.pair("clr"), 14),
        color_index(inner.pair("bclr"), 0),
    )
}

fn limits_from(block: &Block) -> PvLimits {
    let Some(limits) = block.child("limits") else {
        return PvLimits::default();
    };
    let defaults = PvLimits::default();
    PvLimits {
        low_source: limit_source_from_str(limits.pair("loprSrc").unwrap_or("channel")),
        low_default: limits
            .pair("loprDefault")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.low_default),
        high_source: limit_source_from_str(limits.pair("hoprSrc").unwrap_or("channel")),
        high_default: limits
            .pair("hoprDefault")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.high_default),
        precision_source: limit_source_from_str(limits.pair("precSrc").unwrap_or("channel")),
        precision_default: limits
            .pair("precDefault")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.precision_default),
    }
}

fn axis_from(block: Option<&Block>) -> PlotAxisRange {
    let Some(axis) = block else {
        return PlotAxisRange::default();
    };
    PlotAxisRange {
        minimum: float_of(axis, "minRange", 0.0),
        maximum: float_of(axis, "maxRange", 0.0),
        user_specified: axis.pair("rangeStyle") == Some("user-specified"),
    }
}

fn text_of(block: &Block, key: &str) -> String {
    block.pair(key).unwrap_or_default().to_string()
}

fn int_of(block: &Block, key: &str, default: i32) -> i32 {
    match block.pair(key) {
        None => default,
        Some(text) => text.parse().unwrap_or_else(|_| {
            warn!(target: "adl.read", key, value = text, "bad integer");
            default
        }),
    }
}

fn float_of(block: &Block, key: &str, default: f64) -> f64 {
    match block.pair(key) {
        None => default,
        Some(text) => text.parse().unwrap_or_else(|_| {
            warn!(target: "adl.read", key, value = text, "bad number");
            default
        }),
    }
}

fn color_index(value: Option<&str>, default: usize) -> usize {
    let Some(text) = value else {
        return default;
    };
    match text.parse::<usize>() {
        Ok(index) if index < PALETTE_SIZE => index,
        _ => {
            warn!(target: "adl.read", value = text, "bad color index");
            default
        }
    }
}
