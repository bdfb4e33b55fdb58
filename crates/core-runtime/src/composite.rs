//! Composite runtime: channel-gated visibility over a child subtree.
//!
//! The composite evaluates its five channel slots exactly like a
//! graphic element, then feeds the result through the channel-gating
//! truth table. While its channels are configured but not yet
//! connected it paints a white placeholder over its extents and all
//! children are forced hidden; on (re)connection it asks to be raised
//! so a freshly painted sibling cannot occlude it.

use std::cell::RefCell;
use std::rc::Rc;

use core_channels::ChannelHub;
use core_model::{resolve_composite_visibility, CompositeVisibility, GraphicAttrs};
use core_render::{UpdateCoordinator, WidgetId};

use crate::dynamics::{DynamicCore, DynamicState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompositeRuntimeState {
    /// Raw channel evaluation (all-connected, severity, rule result).
    pub dynamic: DynamicState,
    /// After the gating policy.
    pub visibility: CompositeVisibility,
}

pub struct CompositeRuntime {
    widget_id: WidgetId,
    core: Option<DynamicCore>,
    has_channel: bool,
    design_visible: bool,
    state: Rc<RefCell<CompositeRuntimeState>>,
    coordinator: Rc<RefCell<UpdateCoordinator>>,
    started: bool,
}

impl CompositeRuntime {
    pub fn new(
        widget_id: WidgetId,
        dynamic: Option<GraphicAttrs>,
        design_visible: bool,
        coordinator: Rc<RefCell<UpdateCoordinator>>,
    ) -> Self {
        let has_channel = dynamic.as_ref().is_some_and(GraphicAttrs::has_channel);
        let core = dynamic.map(|attrs| {
            DynamicCore::new(widget_id, "Composite", attrs, coordinator.clone())
        });
        let initial = CompositeRuntimeState {
            dynamic: DynamicState::default(),
            visibility: resolve_composite_visibility(false, has_channel, false, design_visible, true),
        };
        Self {
            widget_id,
            core,
            has_channel,
            design_visible,
            state: Rc::new(RefCell::new(initial)),
            coordinator,
            started: false,
        }
    }

    pub fn start(&mut self, hub: &ChannelHub) {
        if self.started {
            return;
        }
        self.started = true;
        core_events::stats::register_display_object_started();

        let state = self.state.clone();
        let coordinator = self.coordinator.clone();
        let widget_id = self.widget_id;
        let has_channel = self.has_channel;
        let design_visible = self.design_visible;

        // Apply the execute-mode policy before any event arrives:
        // configured-but-unconnected channels start in the
        // placeholder presentation.
        {
            let mut state = state.borrow_mut();
            state.visibility = resolve_composite_visibility(
                true,
                has_channel,
                false,
                design_visible,
                true,
            );
        }

        match self.core.as_mut() {
            Some(core) => {
                let observer_state = state;
                core.set_state_observer(move |dynamic: DynamicState| {
                    let mut state = observer_state.borrow_mut();
                    let was_visible = state.visibility.composite_visible
                        && state.visibility.children_visible;
                    state.dynamic = dynamic;
                    state.visibility = resolve_composite_visibility(
                        true,
                        has_channel,
                        dynamic.connected,
                        design_visible,
                        dynamic.visible,
                    );
                    let now_visible = state.visibility.composite_visible
                        && state.visibility.children_visible;
                    if !was_visible && now_visible {
                        // Raise above freshly drawn siblings.
                        coordinator.borrow_mut().request_reorder(widget_id);
                    }
                    coordinator.borrow_mut().request_update(widget_id);
                });
                core.start(hub);
            }
            None => {
                let mut state = state.borrow_mut();
                state.dynamic = DynamicState {
                    connected: true,
                    ..DynamicState::default()
                };
                state.visibility = resolve_composite_visibility(
                    true,
                    false,
                    false,
                    design_visible,
                    true,
                );
            }
        }
    }

    pub fn stop(&mut self) {
        if !self.started {
            return;
        }
        self.started = false;
        core_events::stats::register_display_object_stopped();
        if let Some(core) = self.core.as_mut() {
            core.stop();
        }
        let mut state = self.state.borrow_mut();
        state.dynamic = DynamicState::default();
        state.visibility = resolve_composite_visibility(
            false,
            self.has_channel,
            false,
            self.design_visible,
            true,
        );
    }

    pub fn state(&self) -> CompositeRuntimeState {
        *self.state.borrow()
    }

    /// True while the white not-yet-connected placeholder covers the
    /// composite's extents.
    pub fn paints_placeholder(&self) -> bool {
        self.state.borrow().visibility.paint_placeholder
    }

    pub fn children_visible(&self) -> bool {
        self.state.borrow().visibility.children_visible
    }
}
