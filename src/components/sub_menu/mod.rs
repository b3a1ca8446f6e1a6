mod hover;
mod sub_menu;

pub use hover::{HoverSchedule, SubMenuState};
pub(crate) use sub_menu::SubMenuInner;
pub use sub_menu::{MountedSubMenu, SubMenu};
