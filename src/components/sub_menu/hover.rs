use crate::scheduler::TaskHandle;

/// Debounce timers of one sub-menu. At most one of the two is armed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HoverSchedule {
    open: Option<TaskHandle>,
    close: Option<TaskHandle>,
}

impl HoverSchedule {
    pub fn open_timer(&self) -> Option<TaskHandle> {
        self.open
    }

    pub fn close_timer(&self) -> Option<TaskHandle> {
        self.close
    }

    pub fn is_idle(&self) -> bool {
        self.open.is_none() && self.close.is_none()
    }

    pub fn arm_open(&mut self, handle: TaskHandle) {
        debug_assert!(self.close.is_none(), "close timer still armed");
        self.open = Some(handle);
    }

    pub fn arm_close(&mut self, handle: TaskHandle) {
        debug_assert!(self.open.is_none(), "open timer still armed");
        self.close = Some(handle);
    }

    pub fn take_open(&mut self) -> Option<TaskHandle> {
        self.open.take()
    }

    pub fn take_close(&mut self) -> Option<TaskHandle> {
        self.close.take()
    }

    /// Disarm both timers, returning whichever were armed.
    pub fn take_all(&mut self) -> impl Iterator<Item = TaskHandle> {
        [self.open.take(), self.close.take()].into_iter().flatten()
    }
}

/// State of one sub-menu.
#[derive(Debug)]
pub struct SubMenuState {
    pub open: bool,
    pub disabled: bool,
    pub mounted: bool,
    pub schedule: HoverSchedule,
    /// Pending placement frame and the open cycle it belongs to.
    pub placement: Option<TaskHandle>,
    pub cycle: u64,
    /// Last open cycle whose placement frame already ran.
    pub placed_cycle: u64,
    /// Row height, measured on the first open.
    pub row_height: Option<f64>,
}

impl SubMenuState {
    pub fn new(disabled: bool) -> Self {
        Self {
            open: false,
            disabled,
            mounted: true,
            schedule: HoverSchedule::default(),
            placement: None,
            cycle: 0,
            placed_cycle: 0,
            row_height: None,
        }
    }

    /// Whether a placement frame for `cycle` may still apply.
    pub fn is_current(&self, cycle: u64) -> bool {
        self.mounted && self.open && self.cycle == cycle
    }
}
