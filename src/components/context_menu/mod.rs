mod context_menu;
mod state;

pub use context_menu::{ContextMenu, HideEvent, MountedMenu, MouseLeaveEvent};
pub use state::{ContextMenuState, Teardown, VisibilityState};
