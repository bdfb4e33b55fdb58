//! The root widget collection for one panel.

use tracing::warn;

use crate::geometry::Rect;
use crate::widget::{Widget, WidgetKind};

/// Position of a widget inside the display tree: an index per nesting
/// level. A widget's identity is exactly this path.
pub type WidgetPath = Vec<usize>;

#[derive(Debug, Clone, PartialEq)]
pub struct Display {
    pub file_name: String,
    pub version: u32,
    pub geometry: Rect,
    /// Palette indices of the display's foreground and background.
    pub color: usize,
    pub background: usize,
    pub widgets: Vec<Widget>,
}

impl Default for Display {
    fn default() -> Self {
        Self {
            file_name: String::new(),
            version: 30122,
            geometry: Rect::new(0, 0, 400, 300),
            color: 14,
            background: 4,
            widgets: Vec::new(),
        }
    }
}

impl Display {
    /// Depth-first traversal yielding each widget with its path.
    pub fn walk(&self) -> Vec<(WidgetPath, &Widget)> {
        let mut out = Vec::new();
        for (index, widget) in self.widgets.iter().enumerate() {
            walk_into(widget, vec![index], &mut out);
        }
        out
    }

    pub fn widget_at(&self, path: &[usize]) -> Option<&Widget> {
        let (&first, rest) = path.split_first()?;
        let mut widget = self.widgets.get(first)?;
        for &index in rest {
            let WidgetKind::Composite(composite) = &widget.kind else {
                return None;
            };
            widget = composite.children.get(index)?;
        }
        Some(widget)
    }

    /// Check the geometry invariant: every widget's bounding box lies
    /// within the display. Violations are reported and tolerated; the
    /// offending widget still loads.
    pub fn validate_geometry(&self) -> Vec<String> {
        let bounds = Rect::new(0, 0, self.geometry.width, self.geometry.height);
        let mut problems = Vec::new();
        for (path, widget) in self.walk() {
            if !bounds.contains_rect(&widget.geometry) {
                let message = format!(
                    "{} at {:?} escapes the display bounds {:?}",
                    widget.kind_name(),
                    path,
                    bounds
                );
                warn!(target: "model.display", %message, "geometry check");
                problems.push(message);
            }
        }
        problems
    }

    /// Tighten every composite's bounds to the union of its children.
    pub fn tighten_composites(&mut self) {
        for widget in &mut self.widgets {
            tighten(widget);
        }
    }
}

fn walk_into<'w>(widget: &'w Widget, path: WidgetPath, out: &mut Vec<(WidgetPath, &'w Widget)>) {
    out.push((path.clone(), widget));
    if let WidgetKind::Composite(composite) = &widget.kind {
        for (index, child) in composite.children.iter().enumerate() {
            let mut child_path = path.clone();
            child_path.push(index);
            walk_into(child, child_path, out);
        }
    }
}

fn tighten(widget: &mut Widget) {
    if let WidgetKind::Composite(composite) = &mut widget.kind {
        for child in &mut composite.children {
            tighten(child);
        }
        if let Some(bounds) = composite.bounds_from_children() {
            widget.geometry = bounds;
        }
    }
}
