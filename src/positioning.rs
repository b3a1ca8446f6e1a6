//! Viewport-aware menu placement.
//!
//! Pure functions: callers measure, these decide where the box goes. Results
//! are offsets relative to the box's default position, never absolute screen
//! coordinates.

use tracing::trace;

use crate::geometry::{Length, Offsets, Point, Rect, Size};

/// Placement of a top-level menu.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MenuPlacement {
    pub top: f64,
    pub left: f64,
}

impl MenuPlacement {
    pub fn offsets(&self) -> Offsets {
        Offsets {
            top: Some(Length::Px(self.top)),
            left: Some(Length::Px(self.left)),
            ..Default::default()
        }
    }
}

/// Compute where a top-level menu anchored at `anchor` must render.
///
/// `bounds` is the menu box measured at its default position. Per axis the
/// box is flipped to the other side of the anchor when it would overflow,
/// centered when the flip goes negative and the box fits the viewport, and
/// pinned to 0 otherwise.
///
/// Returns `None` when `bounds` has no measurable size.
pub fn place_menu(anchor: Point, bounds: Rect, viewport: Size) -> Option<MenuPlacement> {
    if bounds.is_empty() {
        return None;
    }

    let y = fit_axis(anchor.y, bounds.height, viewport.height);
    let x = fit_axis(anchor.x, bounds.width, viewport.width);

    let placement = MenuPlacement {
        top: y - bounds.top,
        left: x - bounds.left,
    };
    trace!(?anchor, ?bounds, ?viewport, ?placement, "placed menu");
    Some(placement)
}

fn fit_axis(start: f64, extent: f64, available: f64) -> f64 {
    let mut pos = start;
    if pos + extent > available {
        pos -= extent;
    }
    if pos < 0.0 {
        pos = if extent < available {
            (available - extent) / 2.0
        } else {
            0.0
        };
    }
    pos
}

/// Layout direction of the parent menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextDirection {
    #[default]
    Ltr,
    Rtl,
}

/// Side of the parent row a sub-menu opens on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// `left: 100%`
    Right,
    /// `right: 100%`
    Left,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VerticalAlign {
    /// Offset of the panel top from the row top.
    Top(f64),
    /// Offset of the panel bottom from the row bottom.
    Bottom(f64),
}

/// Placement of a sub-menu panel relative to its parent row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubMenuPlacement {
    pub vertical: VerticalAlign,
    pub side: Side,
}

impl SubMenuPlacement {
    pub fn offsets(&self) -> Offsets {
        let mut offsets = Offsets::default();
        match self.vertical {
            VerticalAlign::Top(top) => offsets.top = Some(Length::Px(top)),
            VerticalAlign::Bottom(bottom) => offsets.bottom = Some(Length::Px(bottom)),
        }
        match self.side {
            Side::Right => offsets.left = Some(Length::Percent(100.0)),
            Side::Left => offsets.right = Some(Length::Percent(100.0)),
        }
        offsets
    }
}

/// Compute where a sub-menu panel of size `panel` opens next to `row`.
///
/// Horizontally the panel opens away from the reading direction when that
/// side has room, otherwise on the other side. Vertically it aligns with
/// the row top; when that overflows the viewport bottom it aligns with the
/// row bottom, unless the row sits so high that the panel would then cross
/// the viewport top. In that case it is stacked upward by as many whole
/// `row_height` steps as there are above the row, or downward when the row
/// is clipped above the viewport top.
///
/// A non-positive `row_height` falls back to the row's own height.
pub fn place_sub_menu(
    row: Rect,
    panel: Size,
    viewport: Size,
    row_height: f64,
    direction: TextDirection,
) -> SubMenuPlacement {
    let vertical = if row.top + panel.height > viewport.height {
        if row.bottom() < panel.height {
            VerticalAlign::Top(stack_offset(row, row_height))
        } else {
            VerticalAlign::Bottom(0.0)
        }
    } else {
        VerticalAlign::Top(0.0)
    };

    let side = match direction {
        TextDirection::Ltr => {
            if row.right() + panel.width < viewport.width {
                Side::Right
            } else {
                Side::Left
            }
        }
        TextDirection::Rtl => {
            if row.left - panel.width < 0.0 {
                Side::Right
            } else {
                Side::Left
            }
        }
    };

    let placement = SubMenuPlacement { vertical, side };
    trace!(?row, ?panel, ?viewport, row_height, ?placement, "placed sub-menu");
    placement
}

/// Upward shift of `floor(row.top / step)` whole steps. A row clipped above
/// the viewport top gives a positive (downward) offset.
fn stack_offset(row: Rect, row_height: f64) -> f64 {
    let step = if row_height > 0.0 {
        row_height
    } else {
        row.height
    };
    if step <= 0.0 {
        return 0.0;
    }
    let offset = -(row.top / step).floor() * step;
    // no negative zero in style output
    if offset == 0.0 {
        0.0
    } else {
        offset
    }
}
