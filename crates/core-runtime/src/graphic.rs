//! Graphic-element runtime: shapes, text, images.

use std::cell::RefCell;
use std::rc::Rc;

use core_channels::ChannelHub;
use core_colors::{alarm_color_for_severity, palette, Rgb};
use core_model::{ColorMode, GraphicAttrs};
use core_render::{UpdateCoordinator, WidgetId};

use crate::dynamics::{DynamicCore, DynamicState};

/// Paint color decision shared by every graphic element: white when
/// not connected, the severity color in alarm mode, the configured
/// palette color otherwise.
pub fn paint_color(state: DynamicState, color_mode: ColorMode, static_color: usize) -> Rgb {
    if !state.connected {
        return Rgb::WHITE;
    }
    match color_mode {
        ColorMode::Alarm => alarm_color_for_severity(state.severity.as_i16()),
        ColorMode::Static | ColorMode::Discrete => palette()
            .get(static_color)
            .copied()
            .unwrap_or(Rgb::WHITE),
    }
}

/// Runtime for one shape, text or image element.
pub struct GraphicRuntime {
    core: DynamicCore,
    color_mode: ColorMode,
    static_color: usize,
}

impl GraphicRuntime {
    pub fn new(
        widget_id: WidgetId,
        kind_name: &'static str,
        attrs: GraphicAttrs,
        static_color: usize,
        coordinator: Rc<RefCell<UpdateCoordinator>>,
    ) -> Self {
        let color_mode = attrs.color_mode;
        Self {
            core: DynamicCore::new(widget_id, kind_name, attrs, coordinator),
            color_mode,
            static_color,
        }
    }

    pub fn start(&mut self, hub: &ChannelHub) {
        self.core.start(hub);
    }

    pub fn stop(&mut self) {
        self.core.stop();
    }

    pub fn state(&self) -> DynamicState {
        self.core.state()
    }

    pub fn channels_needed(&self) -> bool {
        self.core.channels_needed()
    }

    /// The color this element paints with right now.
    pub fn current_color(&self) -> Rgb {
        paint_color(self.core.state(), self.color_mode, self.static_color)
    }
}
