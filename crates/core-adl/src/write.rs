//! Canonical display file writer.
//!
//! Tab indentation, one entry per line, fixed key order, defaults
//! omitted. Multi-word block and key names are quoted; string values
//! are always quoted with `\`, `"` and control characters escaped.

use core_colors::PvLimits;
use core_model::{
    BasicAttrs, Composite, Display, GraphicAttrs, PlotAxisRange, Widget, WidgetKind,
};

use crate::keywords::*;

struct Writer {
    out: String,
    indent: usize,
}

impl Writer {
    fn new() -> Self {
        Self {
            out: String::new(),
            indent: 0,
        }
    }

    fn name_token(name: &str) -> String {
        if name.contains(' ') {
            format!("\"{name}\"")
        } else {
            name.to_string()
        }
    }

    fn begin(&mut self, name: &str) {
        self.push_indent();
        self.out.push_str(&Self::name_token(name));
        self.out.push_str(" {\n");
        self.indent += 1;
    }

    fn end(&mut self) {
        self.indent -= 1;
        self.push_indent();
        self.out.push_str("}\n");
    }

    fn pair_bare(&mut self, key: &str, value: impl std::fmt::Display) {
        self.push_indent();
        self.out.push_str(&Self::name_token(key));
        self.out.push('=');
        self.out.push_str(&value.to_string());
        self.out.push('\n');
    }

    fn pair_str(&mut self, key: &str, value: &str) {
        self.push_indent();
        self.out.push_str(&Self::name_token(key));
        self.out.push_str("=\"");
        self.out.push_str(&escape(value));
        self.out.push_str("\"\n");
    }

    fn point(&mut self, x: i32, y: i32) {
        self.push_indent();
        self.out.push_str(&format!("({x},{y})\n"));
    }

    fn push_indent(&mut self) {
        for _ in 0..self.indent {
            self.out.push('\t');
        }
    }
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}

/// Serialize a display to its canonical text form.
pub fn write_display(display: &Display) -> String {
    let mut w = Writer::new();

    w.begin("file");
    w.pair_str("name", &display.file_name);
    w.pair_bare("version", format_args!("{:06}", display.version));
    w.end();

    w.begin("display");
    write_object(&mut w, &display.geometry.into_tuple());
    w.pair_bare("clr", display.color);
    w.pair_bare("bclr", display.background);
    w.end();

    for widget in &display.widgets {
        write_widget(&mut w, widget);
    }
    w.out
}

trait RectExt {
    fn into_tuple(self) -> (i32, i32, u32, u32);
}

impl RectExt for core_model::Rect {
    fn into_tuple(self) -> (i32, i32, u32, u32) {
        (self.x, self.y, self.width, self.height)
    }
}

fn write_object(w: &mut Writer, rect: &(i32, i32, u32, u32)) {
    w.begin("object");
    w.pair_bare("x", rect.0);
    w.pair_bare("y", rect.1);
    w.pair_bare("width", rect.2);
    w.pair_bare("height", rect.3);
    w.end();
}

fn write_basic(w: &mut Writer, basic: &BasicAttrs) {
    if *basic == BasicAttrs::default() {
        return;
    }
    w.begin("basic attribute");
    w.pair_bare("clr", basic.color);
    w.pair_str("style", line_style_to_str(basic.style));
    w.pair_str("fill", fill_style_to_str(basic.fill));
    w.pair_bare("width", basic.line_width);
    w.end();
}

fn write_dynamic(w: &mut Writer, attrs: &GraphicAttrs) {
    if *attrs == GraphicAttrs::default() {
        return;
    }
    w.begin("dynamic attribute");
    w.pair_str("clr", color_mode_to_str(attrs.color_mode));
    w.pair_str("vis", visibility_to_str(attrs.visibility_mode));
    if !attrs.calc.is_empty() {
        w.pair_str("calc", &attrs.calc);
    }
    for (slot, key) in ["chan", "chanB", "chanC", "chanD", "chanE"].iter().enumerate() {
        if !attrs.channels[slot].is_empty() {
            w.pair_str(key, &attrs.channels[slot]);
        }
    }
    w.end();
}

fn write_channel_block(w: &mut Writer, name: &str, chan: &str, clr: usize, bclr: usize) {
    w.begin(name);
    w.pair_str("chan", chan);
    w.pair_bare("clr", clr);
    w.pair_bare("bclr", bclr);
    w.end();
}

fn write_plotcom(w: &mut Writer, title: &str, clr: usize, bclr: usize) {
    w.begin("plotcom");
    w.pair_str("title", title);
    w.pair_bare("clr", clr);
    w.pair_bare("bclr", bclr);
    w.end();
}

fn write_limits(w: &mut Writer, limits: &PvLimits) {
    if *limits == PvLimits::default() {
        return;
    }
    w.begin("limits");
    w.pair_str("loprSrc", limit_source_to_str(limits.low_source));
    w.pair_bare("loprDefault", limits.low_default);
    w.pair_str("hoprSrc", limit_source_to_str(limits.high_source));
    w.pair_bare("hoprDefault", limits.high_default);
    w.pair_str("precSrc", limit_source_to_str(limits.precision_source));
    w.pair_bare("precDefault", limits.precision_default);
    w.end();
}

fn write_axis(w: &mut Writer, name: &str, axis: &PlotAxisRange) {
    if *axis == PlotAxisRange::default() {
        return;
    }
    w.begin(name);
    w.pair_str(
        "rangeStyle",
        if axis.user_specified {
            "user-specified"
        } else {
            "auto-scale"
        },
    );
    w.pair_bare("minRange", axis.minimum);
    w.pair_bare("maxRange", axis.maximum);
    w.end();
}

fn write_composite(w: &mut Writer, widget: &Widget, composite: &Composite) {
    w.begin("composite");
    write_object(w, &widget.geometry.into_tuple());
    if !composite.name.is_empty() {
        w.pair_str("composite name", &composite.name);
    }
    if !composite.composite_file.is_empty() {
        w.pair_str("composite file", &composite.composite_file);
    }
    if let Some(attrs) = &composite.dynamic {
        write_dynamic(w, attrs);
    }
    w.begin("children");
    for child in &composite.children {
        write_widget(w, child);
    }
    w.end();
    w.end();
}

fn write_widget(w: &mut Writer, widget: &Widget) {
    let rect = widget.geometry.into_tuple();
    match &widget.kind {
        WidgetKind::Rectangle(basic, attrs) => {
            w.begin("rectangle");
            write_object(w, &rect);
            write_basic(w, basic);
            write_dynamic(w, attrs);
            w.end();
        }
        WidgetKind::Oval(basic, attrs) => {
            w.begin("oval");
            write_object(w, &rect);
            write_basic(w, basic);
            write_dynamic(w, attrs);
            w.end();
        }
        WidgetKind::Arc(basic, attrs) => {
            w.begin("arc");
            write_object(w, &rect);
            write_basic(w, basic);
            write_dynamic(w, attrs);
            w.end();
        }
        WidgetKind::Line(basic, attrs) => {
            w.begin("line");
            write_object(w, &rect);
            write_basic(w, basic);
            write_dynamic(w, attrs);
            w.end();
        }
        WidgetKind::Polyline(basic, attrs, points) => {
            w.begin("polyline");
            write_object(w, &rect);
            write_basic(w, basic);
            write_dynamic(w, attrs);
            w.begin("points");
            for (x, y) in points {
                w.point(*x, *y);
            }
            w.end();
            w.end();
        }
        WidgetKind::Polygon(basic, attrs, points) => {
            w.begin("polygon");
            write_object(w, &rect);
            write_basic(w, basic);
            write_dynamic(w, attrs);
            w.begin("points");
            for (x, y) in points {
                w.point(*x, *y);
            }
            w.end();
            w.end();
        }
        WidgetKind::Text(config) => {
            w.begin("text");
            write_object(w, &rect);
            write_basic(w, &config.basic);
            write_dynamic(w, &config.dynamic);
            w.pair_str("textix", &config.text);
            w.end();
        }
        WidgetKind::Image(config) => {
            w.begin("image");
            write_object(w, &rect);
            write_dynamic(w, &config.dynamic);
            w.pair_str("image name", &config.image_name);
            w.end();
        }
        WidgetKind::Meter(config) => {
            w.begin("meter");
            write_object(w, &rect);
            write_channel_block(w, "monitor", &config.channel, config.color, config.background);
            w.pair_str("clrmod", color_mode_to_str(config.color_mode));
            w.pair_str("label", label_to_str(config.label));
            write_limits(w, &config.limits);
            w.end();
        }
        WidgetKind::Bar(config) => {
            w.begin("bar");
            write_object(w, &rect);
            write_channel_block(w, "monitor", &config.channel, config.color, config.background);
            w.pair_str("clrmod", color_mode_to_str(config.color_mode));
            w.pair_str("label", label_to_str(config.label));
            w.pair_str("direction", direction_to_str(config.direction));
            write_limits(w, &config.limits);
            w.end();
        }
        WidgetKind::Scale(config) => {
            w.begin("indicator");
            write_object(w, &rect);
            write_channel_block(w, "monitor", &config.channel, config.color, config.background);
            w.pair_str("clrmod", color_mode_to_str(config.color_mode));
            w.pair_str("label", label_to_str(config.label));
            w.pair_str("direction", direction_to_str(config.direction));
            write_limits(w, &config.limits);
            w.end();
        }
        WidgetKind::TextMonitor(config) => {
            w.begin("text update");
            write_object(w, &rect);
            write_channel_block(w, "monitor", &config.channel, config.color, config.background);
            w.pair_str("clrmod", color_mode_to_str(config.color_mode));
            write_limits(w, &config.limits);
            w.end();
        }
        WidgetKind::Byte(config) => {
            w.begin("byte");
            write_object(w, &rect);
            write_channel_block(w, "monitor", &config.channel, config.color, config.background);
            w.pair_str("clrmod", color_mode_to_str(config.color_mode));
            w.pair_str("direction", direction_to_str(config.direction));
            w.pair_bare("sbit", config.start_bit);
            w.pair_bare("ebit", config.end_bit);
            w.end();
        }
        WidgetKind::StripChart(config) => {
            w.begin("strip chart");
            write_object(w, &rect);
            write_plotcom(w, &config.title, config.color, config.background);
            w.pair_bare("period", config.period);
            w.pair_str("units", units_to_str(config.units));
            for (index, pen) in config.pens.iter().enumerate() {
                w.begin(&format!("pen[{index}]"));
                w.pair_str("chan", &pen.channel);
                w.pair_bare("clr", pen.color);
                write_limits(w, &pen.limits);
                w.end();
            }
            w.end();
        }
        WidgetKind::CartesianPlot(config) => {
            w.begin("cartesian plot");
            write_object(w, &rect);
            write_plotcom(w, &config.title, config.color, config.background);
            if !config.count.is_empty() {
                w.pair_str("count", &config.count);
            }
            for (index, trace) in config.traces.iter().enumerate() {
                w.begin(&format!("trace[{index}]"));
                w.pair_str("xdata", &trace.x_channel);
                w.pair_str("ydata", &trace.y_channel);
                w.pair_bare("data_clr", trace.color);
                w.end();
            }
            write_axis(w, "x_axis", &config.x_range);
            write_axis(w, "y_axis", &config.y_range);
            w.end();
        }
        WidgetKind::Heatmap(config) => {
            w.begin("heatmap");
            write_object(w, &rect);
            w.pair_str("data_chan", &config.data_channel);
            w.pair_str("width_src", &config.width_source);
            w.pair_str("height_src", &config.height_source);
            w.pair_bare("clr", config.color);
            w.pair_bare("bclr", config.background);
            w.end();
        }
        WidgetKind::Slider(config) => {
            w.begin("valuator");
            write_object(w, &rect);
            write_channel_block(w, "control", &config.channel, config.color, config.background);
            w.pair_str("clrmod", color_mode_to_str(config.color_mode));
            w.pair_str("label", label_to_str(config.label));
            w.pair_str("direction", direction_to_str(config.direction));
            w.pair_bare("dPrecision", config.step);
            write_limits(w, &config.limits);
            w.end();
        }
        WidgetKind::WheelSwitch(config) => {
            w.begin("wheel switch");
            write_object(w, &rect);
            write_channel_block(w, "control", &config.channel, config.color, config.background);
            w.pair_str("clrmod", color_mode_to_str(config.color_mode));
            if !config.format.is_empty() {
                w.pair_str("format", &config.format);
            }
            write_limits(w, &config.limits);
            w.end();
        }
        WidgetKind::TextEntry(config) => {
            w.begin("text entry");
            write_object(w, &rect);
            write_channel_block(w, "control", &config.channel, config.color, config.background);
            w.pair_str("clrmod", color_mode_to_str(config.color_mode));
            write_limits(w, &config.limits);
            w.end();
        }
        WidgetKind::ChoiceButton(config) => {
            w.begin("choice button");
            write_object(w, &rect);
            write_channel_block(w, "control", &config.channel, config.color, config.background);
            w.pair_str("clrmod", color_mode_to_str(config.color_mode));
            w.pair_str("stacking", stacking_to_str(config.stacking));
            w.end();
        }
        WidgetKind::Menu(config) => {
            w.begin("menu");
            write_object(w, &rect);
            write_channel_block(w, "control", &config.channel, config.color, config.background);
            w.pair_str("clrmod", color_mode_to_str(config.color_mode));
            w.end();
        }
        WidgetKind::MessageButton(config) => {
            w.begin("message button");
            write_object(w, &rect);
            write_channel_block(w, "control", &config.channel, config.color, config.background);
            w.pair_str("clrmod", color_mode_to_str(config.color_mode));
            w.pair_str("label", &config.label);
            w.pair_str("press_msg", &config.press_value);
            w.pair_str("release_msg", &config.release_value);
            w.end();
        }
        WidgetKind::RelatedDisplay(config) => {
            w.begin("related display");
            write_object(w, &rect);
            for (index, entry) in config.entries.iter().enumerate() {
                w.begin(&format!("display[{index}]"));
                w.pair_str("label", &entry.label);
                w.pair_str("name", &entry.display_file);
                w.pair_str("args", &entry.args);
                w.pair_str("policy", display_mode_to_str(entry.mode));
                w.end();
            }
            w.pair_bare("clr", config.color);
            w.pair_bare("bclr", config.background);
            w.pair_str("label", &config.label);
            w.end();
        }
        WidgetKind::ShellCommand(config) => {
            w.begin("shell command");
            write_object(w, &rect);
            for (index, entry) in config.entries.iter().enumerate() {
                w.begin(&format!("command[{index}]"));
                w.pair_str("label", &entry.label);
                w.pair_str("name", &entry.command);
                w.pair_str("args", &entry.args);
                w.end();
            }
            w.pair_bare("clr", config.color);
            w.pair_bare("bclr", config.background);
            w.pair_str("label", &config.label);
            w.end();
        }
        WidgetKind::Composite(composite) => write_composite(w, widget, composite),
    }
}
