//! Composites: owning containers with channel-gated visibility and a
//! three-layer stacking discipline.

use crate::attrs::{ColorMode, GraphicAttrs, VisibilityMode};
use crate::geometry::Rect;
use crate::widget::{Widget, WidgetKind};

/// An owning container. Children keep display-absolute coordinates;
/// the composite's own bounds are the union of the children's, and may
/// be tightened on edit.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Composite {
    pub name: String,
    /// Optional source file this composite was expanded from.
    pub composite_file: String,
    pub dynamic: Option<GraphicAttrs>,
    pub children: Vec<Widget>,
}

impl Composite {
    /// Union of the children's bounding boxes; `None` when empty.
    pub fn bounds_from_children(&self) -> Option<Rect> {
        let mut rects = self.children.iter().map(|child| child.geometry);
        let first = rects.next()?;
        Some(rects.fold(first, |acc, rect| acc.union(&rect)))
    }

    /// True when any of the five channel slots names a PV.
    pub fn has_channel(&self) -> bool {
        self.dynamic
            .as_ref()
            .is_some_and(GraphicAttrs::has_channel)
    }
}

/// Stacking layer of a child within its composite. Layers are raised
/// bottom-to-top in declaration order: static graphics first, dynamic
/// graphics above them, interactive widgets on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Layer {
    StaticGraphic,
    DynamicGraphic,
    Interactive,
}

/// A graphic counts as dynamic for stacking when either mode is
/// non-static or any channel is named. This is looser than the
/// "channels needed" rule on purpose: a channel with static modes
/// still reorders above plain decoration.
fn graphic_is_dynamic(attrs: &GraphicAttrs) -> bool {
    attrs.has_channel()
        || attrs.color_mode != ColorMode::Static
        || attrs.visibility_mode != VisibilityMode::Static
}

/// Does this subtree contain any dynamic graphic? Controls and
/// monitors are ignored: they sort into the interactive layer of
/// whichever composite directly owns them and say nothing about their
/// ancestors.
fn contains_dynamic_graphic(widget: &Widget) -> bool {
    match &widget.kind {
        WidgetKind::Composite(composite) => {
            composite
                .dynamic
                .as_ref()
                .is_some_and(graphic_is_dynamic)
                || composite.children.iter().any(contains_dynamic_graphic)
        }
        _ => widget.graphic_attrs().is_some_and(graphic_is_dynamic),
    }
}

/// Classify one child for stacking.
pub fn classify(widget: &Widget) -> Layer {
    match &widget.kind {
        WidgetKind::Rectangle(..)
        | WidgetKind::Oval(..)
        | WidgetKind::Arc(..)
        | WidgetKind::Line(..)
        | WidgetKind::Polyline(..)
        | WidgetKind::Polygon(..)
        | WidgetKind::Text(_)
        | WidgetKind::Image(_) => {
            if widget.graphic_attrs().is_some_and(graphic_is_dynamic) {
                Layer::DynamicGraphic
            } else {
                Layer::StaticGraphic
            }
        }
        WidgetKind::Composite(_) => {
            if contains_dynamic_graphic(widget) {
                Layer::DynamicGraphic
            } else {
                Layer::StaticGraphic
            }
        }
        _ => Layer::Interactive,
    }
}

/// Stacking order for a child list: indices bucketed by layer, with
/// declaration order preserved inside each bucket so later
/// declarations paint on top of earlier ones.
pub fn stacking_order(children: &[Widget]) -> Vec<usize> {
    let mut order: Vec<usize> = Vec::with_capacity(children.len());
    for layer in [Layer::StaticGraphic, Layer::DynamicGraphic, Layer::Interactive] {
        order.extend(
            children
                .iter()
                .enumerate()
                .filter(|(_, child)| classify(child) == layer)
                .map(|(index, _)| index),
        );
    }
    order
}

/// Resolved visibility for a composite and its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompositeVisibility {
    pub composite_visible: bool,
    pub children_visible: bool,
    /// Paint a white rectangle over the extents (channels configured
    /// but not yet connected).
    pub paint_placeholder: bool,
}

/// The channel-gating truth table.
///
/// | execute | has channel | connected | result |
/// |---|---|---|---|
/// | no  | -   | -   | design visibility, children shown |
/// | yes | no  | -   | design visibility for both |
/// | yes | yes | no  | composite at design visibility, children hidden, placeholder |
/// | yes | yes | yes | both iff design AND runtime visible |
pub fn resolve_composite_visibility(
    execute: bool,
    has_channel: bool,
    all_connected: bool,
    design_visible: bool,
    runtime_visible: bool,
) -> CompositeVisibility {
    if !execute {
        return CompositeVisibility {
            composite_visible: design_visible,
            children_visible: true,
            paint_placeholder: false,
        };
    }
    if !has_channel {
        return CompositeVisibility {
            composite_visible: design_visible,
            children_visible: design_visible,
            paint_placeholder: false,
        };
    }
    if !all_connected {
        return CompositeVisibility {
            composite_visible: design_visible,
            children_visible: false,
            paint_placeholder: true,
        };
    }
    let show = design_visible && runtime_visible;
    CompositeVisibility {
        composite_visible: show,
        children_visible: show,
        paint_placeholder: false,
    }
}
