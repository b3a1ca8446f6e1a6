pub mod context_menu;
pub mod menu_item;
pub mod sub_menu;
pub mod trigger;
