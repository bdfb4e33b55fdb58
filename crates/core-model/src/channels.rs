//! Channel extraction across the widget tree (Find-PV support).

use crate::widget::{Widget, WidgetKind};

fn push(out: &mut Vec<String>, name: &str) {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return;
    }
    if !out.iter().any(|existing| existing == trimmed) {
        out.push(trimmed.to_string());
    }
}

/// A heatmap dimension source is either a numeric literal or a PV.
fn push_if_pv(out: &mut Vec<String>, source: &str) {
    let trimmed = source.trim();
    if trimmed.is_empty() || trimmed.parse::<f64>().is_ok() {
        return;
    }
    push(out, trimmed);
}

fn collect_widget(widget: &Widget, out: &mut Vec<String>) {
    if let Some(attrs) = widget.graphic_attrs() {
        for channel in &attrs.channels {
            push(out, channel);
        }
    }
    match &widget.kind {
        WidgetKind::Meter(c) => push(out, &c.channel),
        WidgetKind::Bar(c) => push(out, &c.channel),
        WidgetKind::Scale(c) => push(out, &c.channel),
        WidgetKind::TextMonitor(c) => push(out, &c.channel),
        WidgetKind::Byte(c) => push(out, &c.channel),
        WidgetKind::StripChart(c) => {
            for pen in &c.pens {
                push(out, &pen.channel);
            }
        }
        WidgetKind::CartesianPlot(c) => {
            push_if_pv(out, &c.count);
            for trace in &c.traces {
                push(out, &trace.x_channel);
                push(out, &trace.y_channel);
            }
        }
        WidgetKind::Heatmap(c) => {
            push(out, &c.data_channel);
            push_if_pv(out, &c.width_source);
            push_if_pv(out, &c.height_source);
        }
        WidgetKind::Slider(c) => push(out, &c.channel),
        WidgetKind::WheelSwitch(c) => push(out, &c.channel),
        WidgetKind::TextEntry(c) => push(out, &c.channel),
        WidgetKind::ChoiceButton(c) => push(out, &c.channel),
        WidgetKind::Menu(c) => push(out, &c.channel),
        WidgetKind::MessageButton(c) => push(out, &c.channel),
        WidgetKind::Composite(composite) => {
            for child in &composite.children {
                collect_widget(child, out);
            }
        }
        _ => {}
    }
}

/// Every distinct channel referenced by the widget list, in first-seen
/// order. Graphic-attribute slots and per-pen/per-trace channels are
/// included; numeric dimension literals are not.
pub fn collect_channels(widgets: &[Widget]) -> Vec<String> {
    let mut out = Vec::new();
    for widget in widgets {
        collect_widget(widget, &mut out);
    }
    out
}
