//! Edit-mode operations on a display.
//!
//! These are the model halves of the editor interactions: placing,
//! moving and deleting widgets, reordering within a parent, and
//! grouping a selection into a composite (or dissolving one). The
//! display owns its widgets throughout; operations work on tree paths
//! and keep the composite-bounds invariant by re-tightening after
//! structural changes.

use crate::composite::Composite;
use crate::display::Display;
use crate::geometry::Rect;
use crate::widget::{Widget, WidgetKind};

fn children_of<'d>(display: &'d mut Display, parent: &[usize]) -> Option<&'d mut Vec<Widget>> {
    if parent.is_empty() {
        return Some(&mut display.widgets);
    }
    let (&first, rest) = parent.split_first()?;
    let mut widget = display.widgets.get_mut(first)?;
    for &index in rest {
        let WidgetKind::Composite(composite) = &mut widget.kind else {
            return None;
        };
        widget = composite.children.get_mut(index)?;
    }
    match &mut widget.kind {
        WidgetKind::Composite(composite) => Some(&mut composite.children),
        _ => None,
    }
}

/// Append a widget under `parent` (empty path = the display root).
/// Returns the new widget's path.
pub fn place_widget(
    display: &mut Display,
    parent: &[usize],
    widget: Widget,
) -> Option<Vec<usize>> {
    let children = children_of(display, parent)?;
    children.push(widget);
    let index = children.len() - 1;
    display.tighten_composites();
    let mut path = parent.to_vec();
    path.push(index);
    Some(path)
}

/// Remove the widget at `path`, returning it.
pub fn remove_widget(display: &mut Display, path: &[usize]) -> Option<Widget> {
    let (&last, parent) = path.split_last()?;
    let children = children_of(display, parent)?;
    if last >= children.len() {
        return None;
    }
    let removed = children.remove(last);
    display.tighten_composites();
    Some(removed)
}

/// Translate the widget at `path` (and, for composites, every
/// descendant) by the given offsets.
pub fn move_widget(display: &mut Display, path: &[usize], dx: i32, dy: i32) -> bool {
    let (&last, parent) = match path.split_last() {
        Some(split) => split,
        None => return false,
    };
    let Some(children) = children_of(display, parent) else {
        return false;
    };
    let Some(widget) = children.get_mut(last) else {
        return false;
    };
    translate(widget, dx, dy);
    display.tighten_composites();
    true
}

fn translate(widget: &mut Widget, dx: i32, dy: i32) {
    widget.geometry = widget.geometry.translated(dx, dy);
    match &mut widget.kind {
        WidgetKind::Composite(composite) => {
            for child in &mut composite.children {
                translate(child, dx, dy);
            }
        }
        WidgetKind::Polyline(_, _, points) | WidgetKind::Polygon(_, _, points) => {
            for (x, y) in points {
                *x += dx;
                *y += dy;
            }
        }
        _ => {}
    }
}

/// Move the widget at `path` one slot later in its parent's
/// declaration order (later declarations paint on top).
pub fn raise_widget(display: &mut Display, path: &[usize]) -> bool {
    shift_widget(display, path, 1)
}

/// Move the widget at `path` one slot earlier.
pub fn lower_widget(display: &mut Display, path: &[usize]) -> bool {
    shift_widget(display, path, -1)
}

fn shift_widget(display: &mut Display, path: &[usize], delta: isize) -> bool {
    let (&last, parent) = match path.split_last() {
        Some(split) => split,
        None => return false,
    };
    let Some(children) = children_of(display, parent) else {
        return false;
    };
    let target = last as isize + delta;
    if last >= children.len() || target < 0 || target as usize >= children.len() {
        return false;
    }
    children.swap(last, target as usize);
    true
}

/// Group sibling widgets (indices into `parent`'s child list) into a
/// new composite appended at the end of that list. Bounds come from
/// the grouped children. Returns the composite's path.
pub fn group_widgets(
    display: &mut Display,
    parent: &[usize],
    mut indices: Vec<usize>,
) -> Option<Vec<usize>> {
    indices.sort_unstable();
    indices.dedup();
    let children = children_of(display, parent)?;
    if indices.is_empty() || indices.iter().any(|&index| index >= children.len()) {
        return None;
    }

    let mut grouped = Vec::with_capacity(indices.len());
    // Back-to-front so earlier removals do not shift later indices;
    // reverse after to preserve declaration order inside the group.
    for &index in indices.iter().rev() {
        grouped.push(children.remove(index));
    }
    grouped.reverse();

    let composite = Composite {
        children: grouped,
        ..Composite::default()
    };
    let bounds = composite.bounds_from_children().unwrap_or_default();
    children.push(Widget::new(bounds, WidgetKind::Composite(composite)));
    let index = children.len() - 1;
    display.tighten_composites();
    let mut path = parent.to_vec();
    path.push(index);
    Some(path)
}

/// Dissolve the composite at `path`, splicing its children into the
/// parent at the composite's position. Returns how many children were
/// released.
pub fn ungroup_composite(display: &mut Display, path: &[usize]) -> Option<usize> {
    let (&last, parent) = path.split_last()?;
    let children = children_of(display, parent)?;
    let widget = children.get(last)?;
    let WidgetKind::Composite(_) = &widget.kind else {
        return None;
    };
    let Widget {
        kind: WidgetKind::Composite(composite),
        ..
    } = children.remove(last)
    else {
        unreachable!("kind checked above");
    };
    let count = composite.children.len();
    for (offset, child) in composite.children.into_iter().enumerate() {
        children.insert(last + offset, child);
    }
    display.tighten_composites();
    Some(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs::{BasicAttrs, GraphicAttrs};

    fn shape(rect: Rect) -> Widget {
        Widget::new(
            rect,
            WidgetKind::Rectangle(BasicAttrs::default(), GraphicAttrs::default()),
        )
    }

    fn display_with(widgets: Vec<Widget>) -> Display {
        Display {
            widgets,
            ..Display::default()
        }
    }

    #[test]
    fn place_and_remove_round_trip() {
        let mut display = display_with(vec![]);
        let path = place_widget(&mut display, &[], shape(Rect::new(1, 2, 3, 4))).unwrap();
        assert_eq!(path, vec![0]);
        assert_eq!(display.widgets.len(), 1);
        let removed = remove_widget(&mut display, &path).unwrap();
        assert_eq!(removed.geometry, Rect::new(1, 2, 3, 4));
        assert!(display.widgets.is_empty());
    }

    #[test]
    fn move_translates_composite_children_and_points() {
        let composite = Composite {
            children: vec![shape(Rect::new(10, 10, 5, 5))],
            ..Composite::default()
        };
        let mut display = display_with(vec![
            Widget::new(Rect::new(10, 10, 5, 5), WidgetKind::Composite(composite)),
            Widget::new(
                Rect::new(0, 0, 10, 10),
                WidgetKind::Polygon(
                    BasicAttrs::default(),
                    GraphicAttrs::default(),
                    vec![(0, 0), (10, 0), (5, 10)],
                ),
            ),
        ]);
        assert!(move_widget(&mut display, &[0], 5, -3));
        assert_eq!(display.widgets[0].geometry, Rect::new(15, 7, 5, 5));
        let WidgetKind::Composite(composite) = &display.widgets[0].kind else {
            panic!("composite expected");
        };
        assert_eq!(composite.children[0].geometry, Rect::new(15, 7, 5, 5));

        assert!(move_widget(&mut display, &[1], 1, 1));
        let WidgetKind::Polygon(_, _, points) = &display.widgets[1].kind else {
            panic!("polygon expected");
        };
        assert_eq!(points, &vec![(1, 1), (11, 1), (6, 11)]);
    }

    #[test]
    fn raise_and_lower_swap_declaration_order() {
        let mut display = display_with(vec![
            shape(Rect::new(0, 0, 1, 1)),
            shape(Rect::new(1, 0, 1, 1)),
            shape(Rect::new(2, 0, 1, 1)),
        ]);
        assert!(raise_widget(&mut display, &[0]));
        assert_eq!(display.widgets[1].geometry.x, 0);
        assert!(lower_widget(&mut display, &[1]));
        assert_eq!(display.widgets[0].geometry.x, 0);
        assert!(!raise_widget(&mut display, &[2]), "already topmost");
        assert!(!lower_widget(&mut display, &[0]), "already bottom");
    }

    #[test]
    fn group_collects_selection_preserving_order() {
        let mut display = display_with(vec![
            shape(Rect::new(0, 0, 10, 10)),
            shape(Rect::new(20, 0, 10, 10)),
            shape(Rect::new(40, 0, 10, 10)),
        ]);
        let path = group_widgets(&mut display, &[], vec![2, 0]).unwrap();
        assert_eq!(path, vec![1]);
        assert_eq!(display.widgets.len(), 2);
        let WidgetKind::Composite(composite) = &display.widgets[1].kind else {
            panic!("composite expected");
        };
        assert_eq!(composite.children.len(), 2);
        assert_eq!(composite.children[0].geometry.x, 0);
        assert_eq!(composite.children[1].geometry.x, 40);
        // Bounds tightened to the union of the grouped children.
        assert_eq!(display.widgets[1].geometry, Rect::new(0, 0, 50, 10));
    }

    #[test]
    fn ungroup_splices_children_in_place() {
        let mut display = display_with(vec![
            shape(Rect::new(0, 0, 1, 1)),
            Widget::new(
                Rect::new(10, 10, 20, 20),
                WidgetKind::Composite(Composite {
                    children: vec![shape(Rect::new(10, 10, 5, 5)), shape(Rect::new(20, 10, 5, 5))],
                    ..Composite::default()
                }),
            ),
            shape(Rect::new(50, 50, 1, 1)),
        ]);
        assert_eq!(ungroup_composite(&mut display, &[1]), Some(2));
        assert_eq!(display.widgets.len(), 4);
        assert_eq!(display.widgets[1].geometry.x, 10);
        assert_eq!(display.widgets[2].geometry.x, 20);
        assert_eq!(display.widgets[3].geometry.x, 50);
        // Non-composites cannot be ungrouped.
        assert_eq!(ungroup_composite(&mut display, &[0]), None);
    }

    #[test]
    fn invalid_paths_are_rejected() {
        let mut display = display_with(vec![shape(Rect::new(0, 0, 1, 1))]);
        assert!(remove_widget(&mut display, &[5]).is_none());
        assert!(!move_widget(&mut display, &[0, 1], 1, 1));
        assert!(group_widgets(&mut display, &[], vec![9]).is_none());
        assert!(place_widget(&mut display, &[0], shape(Rect::default())).is_none());
    }
}
