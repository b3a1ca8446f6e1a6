use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;

use tracing::{debug, trace};

use super::hover::{HoverSchedule, SubMenuState};
use crate::components::menu_item::SubMenuEntry;
use crate::config::MenuOptions;
use crate::geometry::{Offsets, Rect};
use crate::host::MenuHost;
use crate::positioning::{place_sub_menu, TextDirection};
use crate::scheduler::Scheduler;
use crate::surface::MenuSurface;
use crate::viewport::Viewport;

/// Description of a nested menu opened by hovering its row.
#[derive(Debug, Clone)]
pub struct SubMenu {
    title: String,
    disabled: bool,
    hover_delay: Duration,
    direction: TextDirection,
}

impl SubMenu {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            disabled: false,
            hover_delay: MenuOptions::default().hover_delay,
            direction: TextDirection::Ltr,
        }
    }

    /// Build from menu content, falling back to `options` for anything the
    /// entry leaves unset.
    pub fn from_entry(entry: &SubMenuEntry, options: &MenuOptions) -> Self {
        let direction = if entry.rtl || options.rtl {
            TextDirection::Rtl
        } else {
            TextDirection::Ltr
        };
        Self {
            title: entry.title.clone(),
            disabled: entry.disabled,
            hover_delay: entry.hover_delay.unwrap_or(options.hover_delay),
            direction,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    pub fn with_hover_delay(mut self, delay: Duration) -> Self {
        self.hover_delay = delay;
        self
    }

    pub fn with_direction(mut self, direction: TextDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Attach to the rendered `row` and its `panel`.
    pub fn mount(
        self,
        host: &MenuHost,
        row: Rc<dyn MenuSurface>,
        panel: Rc<dyn MenuSurface>,
    ) -> MountedSubMenu {
        self.mount_inner(host, row, panel, None)
    }

    /// Like [`SubMenu::mount`], but hover is ignored while `parent_open`
    /// returns false.
    pub(crate) fn mount_within(
        self,
        host: &MenuHost,
        row: Rc<dyn MenuSurface>,
        panel: Rc<dyn MenuSurface>,
        parent_open: impl Fn() -> bool + 'static,
    ) -> MountedSubMenu {
        self.mount_inner(host, row, panel, Some(Box::new(parent_open)))
    }

    fn mount_inner(
        self,
        host: &MenuHost,
        row: Rc<dyn MenuSurface>,
        panel: Rc<dyn MenuSurface>,
        parent_open: Option<ParentGate>,
    ) -> MountedSubMenu {
        panel.set_offsets(&Offsets::beside_parent());
        let inner = Rc::new(SubMenuInner {
            state: RefCell::new(SubMenuState::new(self.disabled)),
            title: self.title,
            hover_delay: self.hover_delay,
            direction: self.direction,
            row,
            panel,
            parent_open,
            viewport: host.viewport.clone(),
            scheduler: host.scheduler.clone(),
        });
        trace!(title = %inner.title, "mounted sub-menu");
        MountedSubMenu { inner }
    }
}

type ParentGate = Box<dyn Fn() -> bool>;

pub(crate) struct SubMenuInner {
    title: String,
    hover_delay: Duration,
    direction: TextDirection,
    row: Rc<dyn MenuSurface>,
    panel: Rc<dyn MenuSurface>,
    parent_open: Option<ParentGate>,
    viewport: Rc<Viewport>,
    scheduler: Rc<dyn Scheduler>,
    state: RefCell<SubMenuState>,
}

impl SubMenuInner {
    fn parent_is_open(&self) -> bool {
        self.parent_open.as_ref().map_or(true, |parent_open| parent_open())
    }

    fn pointer_enter(self: &Rc<Self>) {
        let pending_close = self.state.borrow_mut().schedule.take_close();
        if let Some(handle) = pending_close {
            trace!(title = %self.title, "cancelled sub-menu close");
            self.scheduler.cancel(handle);
        }

        {
            let state = self.state.borrow();
            if !state.mounted
                || state.disabled
                || state.open
                || state.schedule.open_timer().is_some()
            {
                return;
            }
        }
        if !self.parent_is_open() {
            trace!(title = %self.title, "parent menu hidden, ignoring hover");
            return;
        }

        let weak = Rc::downgrade(self);
        let handle = self.scheduler.set_timeout(
            self.hover_delay,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.open_timer_fired();
                }
            }),
        );

        let mut state = self.state.borrow_mut();
        // an immediate scheduler has already opened it
        if state.mounted && !state.open {
            state.schedule.arm_open(handle);
            trace!(title = %self.title, delay = ?self.hover_delay, "armed sub-menu open");
        }
    }

    fn pointer_leave(self: &Rc<Self>) {
        let pending_open = self.state.borrow_mut().schedule.take_open();
        if let Some(handle) = pending_open {
            trace!(title = %self.title, "cancelled sub-menu open");
            self.scheduler.cancel(handle);
        }

        {
            let state = self.state.borrow();
            if !state.mounted || !state.open || state.schedule.close_timer().is_some() {
                return;
            }
        }

        let weak = Rc::downgrade(self);
        let handle = self.scheduler.set_timeout(
            self.hover_delay,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.close_timer_fired();
                }
            }),
        );

        let mut state = self.state.borrow_mut();
        if state.mounted && state.open {
            state.schedule.arm_close(handle);
            trace!(title = %self.title, delay = ?self.hover_delay, "armed sub-menu close");
        }
    }

    fn open_timer_fired(self: &Rc<Self>) {
        let cycle = {
            let mut state = self.state.borrow_mut();
            state.schedule.take_open();
            if !state.mounted || state.disabled || state.open || !self.parent_is_open() {
                return;
            }
            state.open = true;
            state.cycle += 1;
            state.cycle
        };
        debug!(title = %self.title, "opening sub-menu");
        self.row.set_active(true);

        let weak = Rc::downgrade(self);
        let handle = self.scheduler.request_frame(Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.place(cycle);
            }
        }));

        let mut state = self.state.borrow_mut();
        if state.is_current(cycle) && state.placed_cycle != cycle {
            state.placement = Some(handle);
        }
    }

    fn close_timer_fired(&self) {
        self.state.borrow_mut().schedule.take_close();
        self.close_now();
    }

    /// Measure and position the panel, then reveal it.
    fn place(&self, cycle: u64) {
        let cached_row_height = {
            let mut state = self.state.borrow_mut();
            if !state.is_current(cycle) {
                return;
            }
            // this frame is running, nothing left to cancel
            state.placement = None;
            state.placed_cycle = cycle;
            state.row_height
        };

        let row = self.row.bounds();
        let panel = self.panel.bounds();
        if row.is_empty() || panel.is_empty() {
            debug!(title = %self.title, "sub-menu box unmeasurable, keeping default position");
        } else {
            let row_height = match cached_row_height {
                Some(height) => height,
                None => {
                    let measured = self.measure_row_height(row);
                    self.state.borrow_mut().row_height = measured;
                    measured.unwrap_or(0.0)
                }
            };
            let placement = place_sub_menu(
                row,
                panel.size(),
                self.viewport.size(),
                row_height,
                self.direction,
            );
            self.panel.set_offsets(&placement.offsets());
        }
        self.panel.set_revealed(true);
    }

    fn measure_row_height(&self, row: Rect) -> Option<f64> {
        let height = (row.height + self.row.margins().vertical()).ceil();
        (height > 0.0).then_some(height)
    }

    fn close_now(&self) {
        let placement = {
            let mut state = self.state.borrow_mut();
            if !state.mounted || !state.open {
                return;
            }
            state.open = false;
            state.cycle += 1;
            state.placement.take()
        };
        if let Some(handle) = placement {
            self.scheduler.cancel(handle);
        }
        debug!(title = %self.title, "closing sub-menu");
        self.panel.set_revealed(false);
        self.panel.set_offsets(&Offsets::beside_parent());
        self.row.set_active(false);
    }

    fn cancel_timers(&self) {
        let timers: Vec<_> = self.state.borrow_mut().schedule.take_all().collect();
        for handle in timers {
            self.scheduler.cancel(handle);
        }
    }

    /// Close right away, as part of the parent menu hiding.
    pub(crate) fn close(&self) {
        self.cancel_timers();
        self.close_now();
    }

    fn set_disabled(&self, disabled: bool) {
        self.state.borrow_mut().disabled = disabled;
        if disabled {
            self.cancel_timers();
        }
    }

    fn unmount(&self) {
        let (timers, placement) = {
            let mut state = self.state.borrow_mut();
            if !state.mounted {
                return;
            }
            state.mounted = false;
            state.cycle += 1;
            let timers: Vec<_> = state.schedule.take_all().collect();
            (timers, state.placement.take())
        };
        for handle in timers.into_iter().chain(placement) {
            self.scheduler.cancel(handle);
        }
        trace!(title = %self.title, "unmounted sub-menu");
    }
}

/// A sub-menu attached to its row. Dropping it cancels every pending timer
/// and frame.
pub struct MountedSubMenu {
    inner: Rc<SubMenuInner>,
}

impl MountedSubMenu {
    pub fn title(&self) -> &str {
        &self.inner.title
    }

    pub fn pointer_enter(&self) {
        self.inner.pointer_enter();
    }

    pub fn pointer_leave(&self) {
        self.inner.pointer_leave();
    }

    pub fn set_disabled(&self, disabled: bool) {
        self.inner.set_disabled(disabled);
    }

    pub fn close(&self) {
        self.inner.close();
    }

    pub fn is_open(&self) -> bool {
        self.inner.state.borrow().open
    }

    pub fn is_disabled(&self) -> bool {
        self.inner.state.borrow().disabled
    }

    pub fn schedule(&self) -> HoverSchedule {
        self.inner.state.borrow().schedule
    }

    /// Row height measured on the first open, if it has happened.
    pub fn row_height(&self) -> Option<f64> {
        self.inner.state.borrow().row_height
    }

    pub(crate) fn downgrade(&self) -> Weak<SubMenuInner> {
        Rc::downgrade(&self.inner)
    }
}

impl Drop for MountedSubMenu {
    fn drop(&mut self) {
        self.inner.unmount();
    }
}
