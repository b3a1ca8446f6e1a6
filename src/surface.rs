//! Rendered menu boxes.
//!
//! A [`MenuSurface`] is whatever the host draws a menu, a sub-menu panel or
//! a sub-menu row into. The state machines only ever measure it, move it
//! and toggle its visibility.

use std::cell::{Cell, RefCell};

use crate::geometry::{Edges, Length, Offsets, Point, Rect, Size};

/// Identifier of a node in the host's element tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

pub trait MenuSurface {
    /// Lift or apply the `display: none` suppression.
    fn set_displayed(&self, displayed: bool);

    /// Current bounding box in viewport coordinates. Zero-sized while the
    /// surface is not displayed or not attached.
    fn bounds(&self) -> Rect;

    fn margins(&self) -> Edges {
        Edges::default()
    }

    /// Replace all inline offsets. Sides set to `None` are cleared.
    fn set_offsets(&self, offsets: &Offsets);

    /// Toggle the visible styling (the fade-in target state).
    fn set_revealed(&self, revealed: bool);

    /// Highlight a row whose sub-menu is open.
    fn set_active(&self, _active: bool) {}

    /// Whether `node` is this surface or one of its descendants.
    fn contains(&self, node: NodeId) -> bool;
}

/// In-memory surface with a fixed natural size.
///
/// Measures like a browser box: nothing while hidden, otherwise its origin
/// shifted by any pixel `top`/`left` offset.
#[derive(Debug)]
pub struct HeadlessSurface {
    id: NodeId,
    origin: Cell<Point>,
    size: Cell<Size>,
    margins: Cell<Edges>,
    descendants: RefCell<Vec<NodeId>>,
    displayed: Cell<bool>,
    revealed: Cell<bool>,
    active: Cell<bool>,
    offsets: Cell<Offsets>,
    style_writes: Cell<usize>,
}

impl HeadlessSurface {
    pub fn new(id: NodeId, size: Size) -> Self {
        Self {
            id,
            origin: Cell::new(Point::default()),
            size: Cell::new(size),
            margins: Cell::new(Edges::default()),
            descendants: RefCell::new(Vec::new()),
            displayed: Cell::new(false),
            revealed: Cell::new(false),
            active: Cell::new(false),
            offsets: Cell::new(Offsets::default()),
            style_writes: Cell::new(0),
        }
    }

    pub fn with_origin(self, origin: Point) -> Self {
        self.origin.set(origin);
        self
    }

    pub fn with_margins(self, margins: Edges) -> Self {
        self.margins.set(margins);
        self
    }

    pub fn with_descendant(self, node: NodeId) -> Self {
        self.descendants.borrow_mut().push(node);
        self
    }

    /// Start out displayed, like an always-present row.
    pub fn displayed(self) -> Self {
        self.displayed.set(true);
        self
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn set_origin(&self, origin: Point) {
        self.origin.set(origin);
    }

    pub fn set_size(&self, size: Size) {
        self.size.set(size);
    }

    pub fn is_displayed(&self) -> bool {
        self.displayed.get()
    }

    pub fn is_revealed(&self) -> bool {
        self.revealed.get()
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    pub fn offsets(&self) -> Offsets {
        self.offsets.get()
    }

    /// Number of style mutations applied so far.
    pub fn style_writes(&self) -> usize {
        self.style_writes.get()
    }

    fn touch(&self) {
        self.style_writes.set(self.style_writes.get() + 1);
    }
}

impl MenuSurface for HeadlessSurface {
    fn set_displayed(&self, displayed: bool) {
        self.touch();
        self.displayed.set(displayed);
    }

    fn bounds(&self) -> Rect {
        if !self.displayed.get() {
            return Rect::default();
        }
        let offsets = self.offsets.get();
        let mut origin = self.origin.get();
        if let Some(Length::Px(top)) = offsets.top {
            origin.y += top;
        }
        if let Some(Length::Px(left)) = offsets.left {
            origin.x += left;
        }
        Rect::from_origin_size(origin, self.size.get())
    }

    fn margins(&self) -> Edges {
        self.margins.get()
    }

    fn set_offsets(&self, offsets: &Offsets) {
        self.touch();
        self.offsets.set(*offsets);
    }

    fn set_revealed(&self, revealed: bool) {
        self.touch();
        self.revealed.set(revealed);
    }

    fn set_active(&self, active: bool) {
        self.touch();
        self.active.set(active);
    }

    fn contains(&self, node: NodeId) -> bool {
        node == self.id || self.descendants.borrow().contains(&node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hidden_surface_measures_empty() {
        let surface = HeadlessSurface::new(NodeId(1), Size::new(200.0, 300.0));
        assert!(surface.bounds().is_empty());

        surface.set_displayed(true);
        assert_eq!(surface.bounds(), Rect::new(0.0, 0.0, 200.0, 300.0));
    }

    #[test]
    fn pixel_offsets_move_the_box() {
        let surface = HeadlessSurface::new(NodeId(1), Size::new(200.0, 300.0))
            .with_origin(Point::new(5.0, 5.0))
            .displayed();
        surface.set_offsets(&Offsets {
            top: Some(Length::Px(10.0)),
            left: Some(Length::Px(20.0)),
            ..Default::default()
        });
        assert_eq!(surface.bounds().origin(), Point::new(25.0, 15.0));
    }

    #[test]
    fn contains_self_and_descendants() {
        let surface =
            HeadlessSurface::new(NodeId(1), Size::new(10.0, 10.0)).with_descendant(NodeId(7));
        assert!(surface.contains(NodeId(1)));
        assert!(surface.contains(NodeId(7)));
        assert!(!surface.contains(NodeId(2)));
    }
}
