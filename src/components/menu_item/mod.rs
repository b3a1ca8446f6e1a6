mod data;

pub use data::{
    entry_at, merge_data, ClickHandler, ItemClick, MenuEntry, MenuItem, SubMenuEntry,
};
