//! Plain geometry shared by the positioning engine and menu surfaces.
//!
//! Coordinates are logical pixels with the origin at the top-left corner of
//! the viewport, y growing downwards.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// True when either dimension is zero or not a number.
    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

/// Axis-aligned box, as returned by a bounding-box measurement.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn from_origin_size(origin: Point, size: Size) -> Self {
        Self::new(origin.x, origin.y, size.width, size.height)
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn origin(&self) -> Point {
        Point::new(self.left, self.top)
    }

    pub fn is_empty(&self) -> bool {
        self.size().is_empty()
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left && point.x < self.right() && point.y >= self.top && point.y < self.bottom()
    }
}

/// Per-side lengths, used for margins.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Edges {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Edges {
    pub fn vertical(&self) -> f64 {
        self.top + self.bottom
    }
}

/// A single inline offset value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Length {
    Px(f64),
    /// Percentage of the containing box (100.0 == "100%").
    Percent(f64),
}

/// Inline position offsets applied to a menu box, relative to its default
/// box position. A side set to `None` is left unset.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Offsets {
    pub top: Option<Length>,
    pub right: Option<Length>,
    pub bottom: Option<Length>,
    pub left: Option<Length>,
}

impl Offsets {
    /// Default collapsed position of a top-level menu (`top: 0; left: 0`).
    pub fn collapsed() -> Self {
        Self {
            top: Some(Length::Px(0.0)),
            left: Some(Length::Px(0.0)),
            ..Default::default()
        }
    }

    /// Default position of a sub-menu panel, just right of its row
    /// (`top: 0; left: 100%`).
    pub fn beside_parent() -> Self {
        Self {
            top: Some(Length::Px(0.0)),
            left: Some(Length::Percent(100.0)),
            ..Default::default()
        }
    }
}
