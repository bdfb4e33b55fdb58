//! Display sessions: runtime lifecycles for a whole widget tree.
//!
//! Entering execute mode walks the display parent-first, attaching
//! the matching runtime to every widget through one variant match.
//! Leaving execute mode stops runtimes in reverse order and resets
//! their state to disconnected/invalid.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use core_channels::ChannelHub;
use core_model::{Display, Widget, WidgetKind, WidgetPath};
use core_render::{UpdateCoordinator, WidgetId};
use tracing::info;

use crate::charts::{
    ByteRuntime, CartesianRuntime, HeatmapRuntime, StripChartRuntime, TextMonitorRuntime,
};
use crate::commands::{RelatedDisplayRuntime, ShellCommandRuntime};
use crate::composite::CompositeRuntime;
use crate::controls::{
    ChoiceRuntime, MessageButtonRuntime, NumericControlRuntime, TextEntryRuntime,
};
use crate::graphic::GraphicRuntime;
use crate::monitor::MonitorRuntime;

/// Default strip-chart sampling cadence.
const STRIP_CHART_SAMPLE_PERIOD: Duration = Duration::from_secs(1);

/// Shared services a session hands to its runtimes.
#[derive(Clone)]
pub struct RuntimeContext {
    pub hub: ChannelHub,
    pub coordinator: Rc<RefCell<UpdateCoordinator>>,
}

/// One runtime per widget kind. Related displays and shell commands
/// have no channel lifecycle, so start/stop are no-ops for them.
pub enum WidgetRuntime {
    Graphic(GraphicRuntime),
    Monitor(MonitorRuntime),
    TextMonitor(TextMonitorRuntime),
    Byte(ByteRuntime),
    StripChart(StripChartRuntime),
    Cartesian(CartesianRuntime),
    Heatmap(HeatmapRuntime),
    NumericControl(NumericControlRuntime),
    TextEntry(TextEntryRuntime),
    Choice(ChoiceRuntime),
    MessageButton(MessageButtonRuntime),
    RelatedDisplay(RelatedDisplayRuntime),
    ShellCommand(ShellCommandRuntime),
    Composite(CompositeRuntime),
}

impl WidgetRuntime {
    fn start(&mut self, hub: &ChannelHub) {
        match self {
            WidgetRuntime::Graphic(runtime) => runtime.start(hub),
            WidgetRuntime::Monitor(runtime) => runtime.start(hub),
            WidgetRuntime::TextMonitor(runtime) => runtime.start(hub),
            WidgetRuntime::Byte(runtime) => runtime.start(hub),
            WidgetRuntime::StripChart(runtime) => runtime.start(hub),
            WidgetRuntime::Cartesian(runtime) => runtime.start(hub),
            WidgetRuntime::Heatmap(runtime) => runtime.start(hub),
            WidgetRuntime::NumericControl(runtime) => runtime.start(hub),
            WidgetRuntime::TextEntry(runtime) => runtime.start(hub),
            WidgetRuntime::Choice(runtime) => runtime.start(hub),
            WidgetRuntime::MessageButton(runtime) => runtime.start(hub),
            WidgetRuntime::RelatedDisplay(_) | WidgetRuntime::ShellCommand(_) => {}
            WidgetRuntime::Composite(runtime) => runtime.start(hub),
        }
    }

    fn stop(&mut self) {
        match self {
            WidgetRuntime::Graphic(runtime) => runtime.stop(),
            WidgetRuntime::Monitor(runtime) => runtime.stop(),
            WidgetRuntime::TextMonitor(runtime) => runtime.stop(),
            WidgetRuntime::Byte(runtime) => runtime.stop(),
            WidgetRuntime::StripChart(runtime) => runtime.stop(),
            WidgetRuntime::Cartesian(runtime) => runtime.stop(),
            WidgetRuntime::Heatmap(runtime) => runtime.stop(),
            WidgetRuntime::NumericControl(runtime) => runtime.stop(),
            WidgetRuntime::TextEntry(runtime) => runtime.stop(),
            WidgetRuntime::Choice(runtime) => runtime.stop(),
            WidgetRuntime::MessageButton(runtime) => runtime.stop(),
            WidgetRuntime::RelatedDisplay(_) | WidgetRuntime::ShellCommand(_) => {}
            WidgetRuntime::Composite(runtime) => runtime.stop(),
        }
    }
}

struct SessionEntry {
    path: WidgetPath,
    widget_id: WidgetId,
    runtime: WidgetRuntime,
}

/// All runtimes for one loaded display.
pub struct DisplaySession {
    display: Display,
    ctx: RuntimeContext,
    entries: Vec<SessionEntry>,
    executing: bool,
}

impl DisplaySession {
    pub fn new(display: Display, ctx: RuntimeContext, first_widget_id: u64) -> Self {
        let mut entries = Vec::new();
        let mut next_id = first_widget_id;
        for (path, widget) in display.walk() {
            let widget_id = WidgetId(next_id);
            next_id += 1;
            let runtime = build_runtime(widget, widget_id, &ctx);
            entries.push(SessionEntry {
                path,
                widget_id,
                runtime,
            });
        }
        Self {
            display,
            ctx,
            entries,
            executing: false,
        }
    }

    pub fn display(&self) -> &Display {
        &self.display
    }

    pub fn widget_count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_executing(&self) -> bool {
        self.executing
    }

    /// Toggle execute mode for the whole tree. Parent-first on start
    /// (a composite records its policy before its children attach),
    /// reverse order on stop.
    pub fn set_execute(&mut self, execute: bool) {
        if execute == self.executing {
            return;
        }
        self.executing = execute;
        if execute {
            info!(target: "runtime.session", file = %self.display.file_name,
                widgets = self.entries.len(), "entering execute mode");
            for entry in &mut self.entries {
                entry.runtime.start(&self.ctx.hub);
            }
        } else {
            info!(target: "runtime.session", file = %self.display.file_name,
                "leaving execute mode");
            for entry in self.entries.iter_mut().rev() {
                entry.runtime.stop();
            }
        }
    }

    pub fn runtime_at(&self, path: &[usize]) -> Option<&WidgetRuntime> {
        self.entries
            .iter()
            .find(|entry| entry.path == path)
            .map(|entry| &entry.runtime)
    }

    pub fn widget_id_at(&self, path: &[usize]) -> Option<WidgetId> {
        self.entries
            .iter()
            .find(|entry| entry.path == path)
            .map(|entry| entry.widget_id)
    }

    /// Effective visibility of a widget: its own runtime state gated
    /// by every ancestor composite's children-visibility.
    pub fn effective_visibility(&self, path: &[usize]) -> bool {
        for prefix_len in 1..path.len() {
            let prefix = &path[..prefix_len];
            if let Some(WidgetRuntime::Composite(composite)) = self.runtime_at(prefix) {
                if !composite.children_visible() {
                    return false;
                }
            }
        }
        match self.runtime_at(path) {
            Some(WidgetRuntime::Graphic(runtime)) => runtime.state().visible,
            Some(WidgetRuntime::Composite(runtime)) => {
                runtime.state().visibility.composite_visible
            }
            Some(_) => true,
            None => false,
        }
    }
}

fn build_runtime(widget: &Widget, widget_id: WidgetId, ctx: &RuntimeContext) -> WidgetRuntime {
    let coordinator = ctx.coordinator.clone();
    match &widget.kind {
        WidgetKind::Rectangle(basic, attrs)
        | WidgetKind::Oval(basic, attrs)
        | WidgetKind::Arc(basic, attrs)
        | WidgetKind::Line(basic, attrs)
        | WidgetKind::Polyline(basic, attrs, _)
        | WidgetKind::Polygon(basic, attrs, _) => WidgetRuntime::Graphic(GraphicRuntime::new(
            widget_id,
            widget.kind_name(),
            attrs.clone(),
            basic.color,
            coordinator,
        )),
        WidgetKind::Text(config) => WidgetRuntime::Graphic(GraphicRuntime::new(
            widget_id,
            widget.kind_name(),
            config.dynamic.clone(),
            config.basic.color,
            coordinator,
        )),
        WidgetKind::Image(config) => WidgetRuntime::Graphic(GraphicRuntime::new(
            widget_id,
            widget.kind_name(),
            config.dynamic.clone(),
            0,
            coordinator,
        )),
        WidgetKind::Meter(config) => WidgetRuntime::Monitor(MonitorRuntime::new(
            widget_id,
            widget.kind_name(),
            &config.channel,
            config.limits,
            coordinator,
        )),
        WidgetKind::Bar(config) => WidgetRuntime::Monitor(MonitorRuntime::new(
            widget_id,
            widget.kind_name(),
            &config.channel,
            config.limits,
            coordinator,
        )),
        WidgetKind::Scale(config) => WidgetRuntime::Monitor(MonitorRuntime::new(
            widget_id,
            widget.kind_name(),
            &config.channel,
            config.limits,
            coordinator,
        )),
        WidgetKind::TextMonitor(config) => WidgetRuntime::TextMonitor(TextMonitorRuntime::new(
            widget_id,
            &config.channel,
            config.limits.precision_default,
            coordinator,
        )),
        WidgetKind::Byte(config) => {
            WidgetRuntime::Byte(ByteRuntime::new(widget_id, &config.channel, coordinator))
        }
        WidgetKind::StripChart(config) => WidgetRuntime::StripChart(StripChartRuntime::new(
            config.clone(),
            STRIP_CHART_SAMPLE_PERIOD,
        )),
        WidgetKind::CartesianPlot(config) => {
            WidgetRuntime::Cartesian(CartesianRuntime::new(config.clone()))
        }
        WidgetKind::Heatmap(config) => {
            WidgetRuntime::Heatmap(HeatmapRuntime::new(config.clone()))
        }
        WidgetKind::Slider(config) => WidgetRuntime::NumericControl(NumericControlRuntime::new(
            widget_id,
            widget.kind_name(),
            &config.channel,
            config.limits,
            coordinator,
        )),
        WidgetKind::WheelSwitch(config) => {
            WidgetRuntime::NumericControl(NumericControlRuntime::new(
                widget_id,
                widget.kind_name(),
                &config.channel,
                config.limits,
                coordinator,
            ))
        }
        WidgetKind::TextEntry(config) => WidgetRuntime::TextEntry(TextEntryRuntime::new(
            widget_id,
            &config.channel,
            config.limits,
            coordinator,
        )),
        WidgetKind::ChoiceButton(config) => WidgetRuntime::Choice(ChoiceRuntime::new(
            widget_id,
            widget.kind_name(),
            &config.channel,
            coordinator,
        )),
        WidgetKind::Menu(config) => WidgetRuntime::Choice(ChoiceRuntime::new(
            widget_id,
            widget.kind_name(),
            &config.channel,
            coordinator,
        )),
        WidgetKind::MessageButton(config) => {
            WidgetRuntime::MessageButton(MessageButtonRuntime::new(
                widget_id,
                &config.channel,
                &config.press_value,
                &config.release_value,
                coordinator,
            ))
        }
        WidgetKind::RelatedDisplay(config) => {
            WidgetRuntime::RelatedDisplay(RelatedDisplayRuntime::new(config.clone()))
        }
        WidgetKind::ShellCommand(config) => {
            WidgetRuntime::ShellCommand(ShellCommandRuntime::new(config.clone()))
        }
        WidgetKind::Composite(composite) => WidgetRuntime::Composite(CompositeRuntime::new(
            widget_id,
            composite.dynamic.clone(),
            true,
            coordinator,
        )),
    }
}
