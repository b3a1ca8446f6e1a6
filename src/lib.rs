pub mod bus;
pub mod components;
pub mod config;
pub mod error;
pub mod geometry;
pub mod host;
pub mod positioning;
pub mod scheduler;
pub mod surface;
pub mod viewport;

// Re-export commonly used items
pub use bus::{HideReason, HideRequest, MenuContext, MenuData, MenuId, ShowRequest};
pub use components::context_menu::{ContextMenu, HideEvent, MountedMenu, MouseLeaveEvent};
pub use components::menu_item::{MenuEntry, MenuItem, SubMenuEntry};
pub use components::sub_menu::{MountedSubMenu, SubMenu};
pub use components::trigger::ContextMenuTrigger;
pub use config::{Config, MenuOptions};
pub use error::{ConfigError, MenuError};
pub use host::MenuHost;

/// Convenience prelude for applications embedding menus
pub mod prelude {
    pub use crate::bus::{HideReason, MenuContext, MenuData, MenuId};
    pub use crate::components::context_menu::{
        ContextMenu, HideEvent, MountedMenu, MouseLeaveEvent, VisibilityState,
    };
    pub use crate::components::menu_item::{ItemClick, MenuEntry, MenuItem, SubMenuEntry};
    pub use crate::components::sub_menu::{MountedSubMenu, SubMenu};
    pub use crate::components::trigger::ContextMenuTrigger;
    pub use crate::config::MenuOptions;
    pub use crate::geometry::{Point, Rect, Size};
    pub use crate::host::MenuHost;
    pub use crate::scheduler::{CalloopScheduler, ImmediateScheduler, ManualScheduler, Scheduler};
    pub use crate::surface::{HeadlessSurface, MenuSurface, NodeId};
    pub use crate::viewport::{keycodes, Viewport, ViewportEvent};
}
