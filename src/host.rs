use std::rc::Rc;

use crate::bus::MenuContext;
use crate::geometry::Size;
use crate::scheduler::Scheduler;
use crate::viewport::Viewport;

/// Everything a mounted menu needs from the application root.
#[derive(Clone)]
pub struct MenuHost {
    pub context: Rc<MenuContext>,
    pub viewport: Rc<Viewport>,
    pub scheduler: Rc<dyn Scheduler>,
}

impl MenuHost {
    pub fn new(
        context: Rc<MenuContext>,
        viewport: Rc<Viewport>,
        scheduler: Rc<dyn Scheduler>,
    ) -> Self {
        Self {
            context,
            viewport,
            scheduler,
        }
    }

    /// Fresh context and viewport around `scheduler`.
    pub fn with_scheduler(viewport_size: Size, scheduler: Rc<dyn Scheduler>) -> Self {
        Self::new(
            MenuContext::new(),
            Rc::new(Viewport::new(viewport_size)),
            scheduler,
        )
    }
}
