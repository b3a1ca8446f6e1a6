use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use crate::bus::MenuData;
use crate::surface::NodeId;

/// Delivered to an item's click handler.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemClick {
    pub label: String,
    /// Item data merged with the data of the show request that opened the
    /// menu; the show request wins on conflicting keys.
    pub data: MenuData,
    /// Node the opening trigger originated from.
    pub target: Option<NodeId>,
}

pub type ClickHandler = Rc<dyn Fn(&ItemClick)>;

/// A selectable leaf row.
#[derive(Clone, Default)]
pub struct MenuItem {
    pub label: String,
    pub data: MenuData,
    pub disabled: bool,
    /// Keep the menu open after this item is selected.
    pub prevent_close: bool,
    pub on_click: Option<ClickHandler>,
}

impl fmt::Debug for MenuItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MenuItem")
            .field("label", &self.label)
            .field("data", &self.data)
            .field("disabled", &self.disabled)
            .field("prevent_close", &self.prevent_close)
            .finish()
    }
}

impl MenuItem {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Default::default()
        }
    }

    pub fn with_data(mut self, data: MenuData) -> Self {
        self.data = data;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    pub fn prevent_close(mut self) -> Self {
        self.prevent_close = true;
        self
    }

    pub fn on_click(mut self, handler: impl Fn(&ItemClick) + 'static) -> Self {
        self.on_click = Some(Rc::new(handler));
        self
    }
}

/// A row that opens a nested menu on hover.
#[derive(Debug, Clone, Default)]
pub struct SubMenuEntry {
    pub title: String,
    pub disabled: bool,
    /// Overrides the configured hover delay.
    pub hover_delay: Option<Duration>,
    pub rtl: bool,
    pub entries: Vec<MenuEntry>,
}

impl SubMenuEntry {
    pub fn new(title: impl Into<String>, entries: Vec<MenuEntry>) -> Self {
        Self {
            title: title.into(),
            entries,
            ..Default::default()
        }
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    pub fn with_hover_delay(mut self, delay: Duration) -> Self {
        self.hover_delay = Some(delay);
        self
    }

    pub fn rtl(mut self) -> Self {
        self.rtl = true;
        self
    }
}

/// Content of a menu, one variant per kind of row.
#[derive(Debug, Clone)]
pub enum MenuEntry {
    Item(MenuItem),
    SubMenu(SubMenuEntry),
    Divider,
}

impl MenuEntry {
    pub fn item(label: impl Into<String>) -> Self {
        Self::Item(MenuItem::new(label))
    }

    pub fn sub_menu(title: impl Into<String>, entries: Vec<MenuEntry>) -> Self {
        Self::SubMenu(SubMenuEntry::new(title, entries))
    }

    pub fn divider() -> Self {
        Self::Divider
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            Self::Item(item) => Some(&item.label),
            Self::SubMenu(sub_menu) => Some(&sub_menu.title),
            Self::Divider => None,
        }
    }

    pub fn is_divider(&self) -> bool {
        matches!(self, Self::Divider)
    }

    pub fn is_enabled(&self) -> bool {
        match self {
            Self::Item(item) => !item.disabled,
            Self::SubMenu(sub_menu) => !sub_menu.disabled,
            Self::Divider => false,
        }
    }

    pub fn children(&self) -> Option<&[MenuEntry]> {
        match self {
            Self::SubMenu(sub_menu) => Some(&sub_menu.entries),
            _ => None,
        }
    }
}

impl From<MenuItem> for MenuEntry {
    fn from(item: MenuItem) -> Self {
        Self::Item(item)
    }
}

impl From<SubMenuEntry> for MenuEntry {
    fn from(sub_menu: SubMenuEntry) -> Self {
        Self::SubMenu(sub_menu)
    }
}

/// Walk `path` (one index per nesting level) down through sub-menus.
pub fn entry_at<'a>(entries: &'a [MenuEntry], path: &[usize]) -> Option<&'a MenuEntry> {
    let (&last, parents) = path.split_last()?;
    let mut current = entries;
    for &index in parents {
        current = current.get(index)?.children()?;
    }
    current.get(last)
}

/// Shallow merge of `overrides` onto `base`.
pub fn merge_data(base: &MenuData, overrides: &MenuData) -> MenuData {
    let mut merged = base.clone();
    for (key, value) in overrides {
        merged.insert(key.clone(), value.clone());
    }
    merged
}
