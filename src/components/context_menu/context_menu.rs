use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::{debug, trace};

use super::state::{ContextMenuState, Teardown, VisibilityState};
use crate::bus::{HideReason, HideRequest, MenuData, MenuHandlers, MenuId, ShowRequest};
use crate::components::menu_item::{entry_at, merge_data, ItemClick, MenuEntry};
use crate::components::sub_menu::{MountedSubMenu, SubMenu, SubMenuInner};
use crate::config::MenuOptions;
use crate::error::MenuError;
use crate::geometry::{Offsets, Point};
use crate::host::MenuHost;
use crate::positioning::place_menu;
use crate::surface::{MenuSurface, NodeId};
use crate::viewport::{keycodes, ListenerId, ListenerKind, ViewportEvent};

#[derive(Debug, Clone, PartialEq)]
pub struct HideEvent {
    pub id: MenuId,
    pub reason: HideReason,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MouseLeaveEvent {
    pub id: MenuId,
    /// Menu data merged with the data of the last show request.
    pub data: MenuData,
    /// Node the last show request originated from.
    pub target: Option<NodeId>,
}

type ShowCallback = Rc<dyn Fn(&ShowRequest)>;
type HideCallback = Rc<dyn Fn(&HideEvent)>;
type LeaveCallback = Rc<dyn Fn(&MouseLeaveEvent)>;

#[derive(Default, Clone)]
struct Callbacks {
    on_show: Option<ShowCallback>,
    on_hide: Option<HideCallback>,
    on_mouse_leave: Option<LeaveCallback>,
}

/// A top-level context menu, before it is mounted.
///
/// ```ignore
/// let menu = ContextMenu::new("file-actions", entries)
///     .with_options(Config::with(|c| c.options()))
///     .on_hide(|event| tracing::info!(?event.reason, "closed"))
///     .mount(&host, surface)?;
/// host.context.show_menu("file-actions", Point::new(10.0, 10.0), None);
/// ```
#[derive(Clone)]
pub struct ContextMenu {
    id: MenuId,
    entries: Vec<MenuEntry>,
    data: MenuData,
    options: MenuOptions,
    callbacks: Callbacks,
}

impl ContextMenu {
    pub fn new(id: impl Into<MenuId>, entries: Vec<MenuEntry>) -> Self {
        Self {
            id: id.into(),
            entries,
            data: MenuData::new(),
            options: MenuOptions::default(),
            callbacks: Callbacks::default(),
        }
    }

    // === Builder API ===

    pub fn with_data(mut self, data: MenuData) -> Self {
        self.data = data;
        self
    }

    pub fn with_options(mut self, options: MenuOptions) -> Self {
        self.options = options;
        self
    }

    pub fn on_show(mut self, callback: impl Fn(&ShowRequest) + 'static) -> Self {
        self.callbacks.on_show = Some(Rc::new(callback));
        self
    }

    pub fn on_hide(mut self, callback: impl Fn(&HideEvent) + 'static) -> Self {
        self.callbacks.on_hide = Some(Rc::new(callback));
        self
    }

    pub fn on_mouse_leave(mut self, callback: impl Fn(&MouseLeaveEvent) + 'static) -> Self {
        self.callbacks.on_mouse_leave = Some(Rc::new(callback));
        self
    }

    /// Register with the host's [`crate::bus::MenuContext`] and start
    /// listening for show requests. `surface` is the rendered menu box and
    /// starts out hidden.
    pub fn mount(
        self,
        host: &MenuHost,
        surface: Rc<dyn MenuSurface>,
    ) -> Result<MountedMenu, MenuError> {
        let instance = Rc::new(MenuInstance {
            id: self.id,
            entries: self.entries,
            data: self.data,
            options: self.options,
            callbacks: self.callbacks,
            host: host.clone(),
            surface,
            state: RefCell::new(ContextMenuState::new()),
            sub_menus: RefCell::new(Vec::new()),
        });

        let (on_show, on_hide, on_leave) = (
            Rc::downgrade(&instance),
            Rc::downgrade(&instance),
            Rc::downgrade(&instance),
        );
        let handlers = MenuHandlers::new(
            move |request: &ShowRequest| {
                if let Some(instance) = on_show.upgrade() {
                    instance.handle_show(request);
                }
            },
            move |request: &HideRequest| {
                if let Some(instance) = on_hide.upgrade() {
                    instance.handle_hide(request);
                }
            },
        )
        .with_mouse_leave(move || {
            if let Some(instance) = on_leave.upgrade() {
                instance.handle_mouse_leave();
            }
        });

        let subscription = host.context.register(instance.id.clone(), handlers)?;
        instance.state.borrow_mut().set_subscription(subscription);
        instance.surface.set_displayed(false);
        Ok(MountedMenu { instance })
    }
}

struct MenuInstance {
    id: MenuId,
    entries: Vec<MenuEntry>,
    data: MenuData,
    options: MenuOptions,
    callbacks: Callbacks,
    host: MenuHost,
    surface: Rc<dyn MenuSurface>,
    state: RefCell<ContextMenuState>,
    sub_menus: RefCell<Vec<Weak<SubMenuInner>>>,
}

impl MenuInstance {
    fn handle_show(self: &Rc<Self>, request: &ShowRequest) {
        if request.target != self.id {
            return;
        }
        let Some(generation) = self.state.borrow_mut().show(request.position) else {
            trace!(menu = %self.id, "already open, ignoring show");
            return;
        };

        let listeners = self.attach_listeners();
        self.state.borrow_mut().attach_listeners(listeners);
        debug!(menu = %self.id, position = ?request.position, "showing menu");

        if let Some(on_show) = self.callbacks.on_show.clone() {
            on_show(request);
        }
        self.schedule_reveal(generation);
    }

    fn handle_hide(&self, request: &HideRequest) {
        if request.addresses(&self.id) {
            self.hide(request.reason);
        }
    }

    fn hide(&self, reason: HideReason) {
        let Some(teardown) = self.state.borrow_mut().begin_hide() else {
            return;
        };
        self.release(teardown);
        self.state.borrow_mut().finish_hide();

        self.surface.set_revealed(false);
        self.surface.set_offsets(&Offsets::collapsed());
        self.surface.set_displayed(false);
        self.close_sub_menus();
        debug!(menu = %self.id, ?reason, "hid menu");

        if let Some(on_hide) = self.callbacks.on_hide.clone() {
            on_hide(&HideEvent {
                id: self.id.clone(),
                reason,
            });
        }
    }

    fn release(&self, teardown: Teardown) {
        for listener in teardown.listeners {
            self.host.viewport.remove_listener(listener);
        }
        if let Some(frame) = teardown.reveal {
            self.host.scheduler.cancel(frame);
        }
    }

    fn attach_listeners(self: &Rc<Self>) -> Vec<ListenerId> {
        let viewport = &self.host.viewport;
        let mut listeners = Vec::with_capacity(6);

        for kind in [ListenerKind::PointerDown, ListenerKind::TouchStart] {
            let weak = Rc::downgrade(self);
            listeners.push(viewport.add_listener(kind, move |event| {
                if let Some(instance) = weak.upgrade() {
                    instance.handle_outside_pointer(event);
                }
            }));
        }

        let weak = Rc::downgrade(self);
        listeners.push(viewport.add_listener(ListenerKind::ContextMenu, move |_| {
            if let Some(instance) = weak.upgrade() {
                instance.hide(HideReason::ContextMenu);
            }
        }));

        let weak = Rc::downgrade(self);
        listeners.push(viewport.add_listener(ListenerKind::KeyUp, move |event| {
            if let (Some(instance), ViewportEvent::KeyUp { keycode }) = (weak.upgrade(), event) {
                if *keycode == keycodes::ESC {
                    instance
                        .host
                        .context
                        .publish_hide(&HideRequest::all(HideReason::Escape));
                }
            }
        }));

        if self.options.hide_on_scroll {
            let weak = Rc::downgrade(self);
            listeners.push(viewport.add_listener(ListenerKind::Scroll, move |_| {
                if let Some(instance) = weak.upgrade() {
                    instance.hide(HideReason::Scroll);
                }
            }));
        }

        let weak = Rc::downgrade(self);
        listeners.push(viewport.add_listener(ListenerKind::Resize, move |_| {
            if let Some(instance) = weak.upgrade() {
                instance.hide(HideReason::Resize);
            }
        }));

        listeners
    }

    fn handle_outside_pointer(&self, event: &ViewportEvent) {
        let target = match event {
            ViewportEvent::PointerDown { target } | ViewportEvent::TouchStart { target } => *target,
            _ => return,
        };
        // an unresolvable target counts as outside
        let inside = target.is_some_and(|node| self.surface.contains(node));
        if !inside {
            self.host
                .context
                .publish_hide(&HideRequest::all(HideReason::OutsidePointer));
        }
    }

    fn handle_mouse_leave(&self) {
        if self.state.borrow().visibility() == VisibilityState::Hidden {
            return;
        }
        let store = self.host.context.trigger_store();
        if let Some(on_mouse_leave) = self.callbacks.on_mouse_leave.clone() {
            on_mouse_leave(&MouseLeaveEvent {
                id: self.id.clone(),
                data: merge_data(&self.data, &store.data),
                target: store.target,
            });
        }
        if self.options.hide_on_leave {
            self.host
                .context
                .publish_hide(&HideRequest::all(HideReason::PointerLeave));
        }
    }

    // === Reveal sequence ===

    fn schedule_reveal(self: &Rc<Self>, generation: u64) {
        if !self.state.borrow().is_current(generation) {
            return;
        }
        let weak = Rc::downgrade(self);
        let frame = self.host.scheduler.request_frame(Box::new(move || {
            if let Some(instance) = weak.upgrade() {
                instance.unhide(generation);
            }
        }));
        self.state.borrow_mut().set_reveal(generation, frame);
    }

    /// First frame: lift the display suppression so the box can be measured.
    fn unhide(self: &Rc<Self>, generation: u64) {
        if !self.state.borrow().is_current(generation) {
            return;
        }
        self.surface.set_displayed(true);

        let weak = Rc::downgrade(self);
        let frame = self.host.scheduler.request_frame(Box::new(move || {
            if let Some(instance) = weak.upgrade() {
                instance.place_and_reveal(generation);
            }
        }));
        self.state.borrow_mut().set_reveal(generation, frame);
    }

    /// Second frame: measure, position, show.
    fn place_and_reveal(&self, generation: u64) {
        let anchor = {
            let state = self.state.borrow();
            if !state.is_current(generation) {
                return;
            }
            state.anchor()
        };

        let bounds = self.surface.bounds();
        match place_menu(anchor, bounds, self.host.viewport.size()) {
            Some(placement) => self.surface.set_offsets(&placement.offsets()),
            None => {
                debug!(menu = %self.id, "menu box unmeasurable, keeping default position");
                self.surface.set_offsets(&Offsets::collapsed());
            }
        }
        self.surface.set_revealed(true);
        self.state.borrow_mut().reveal(generation);
        trace!(menu = %self.id, "menu visible");
    }

    // === Content ===

    fn select(&self, path: &[usize]) -> bool {
        if self.state.borrow().visibility() == VisibilityState::Hidden {
            return false;
        }
        let Some(MenuEntry::Item(item)) = entry_at(&self.entries, path) else {
            return false;
        };
        if item.disabled {
            return false;
        }

        let store = self.host.context.trigger_store();
        let click = ItemClick {
            label: item.label.clone(),
            data: merge_data(&item.data, &store.data),
            target: store.target,
        };
        debug!(menu = %self.id, item = %item.label, "selected item");
        if let Some(on_click) = item.on_click.clone() {
            on_click(&click);
        }
        if !item.prevent_close {
            self.host
                .context
                .publish_hide(&HideRequest::all(HideReason::ItemSelected));
        }
        true
    }

    fn close_sub_menus(&self) {
        let live: Vec<Rc<SubMenuInner>> = {
            let mut sub_menus = self.sub_menus.borrow_mut();
            sub_menus.retain(|sub_menu| sub_menu.strong_count() > 0);
            sub_menus.iter().filter_map(Weak::upgrade).collect()
        };
        for sub_menu in live {
            sub_menu.close();
        }
    }

    fn unmount(&self) {
        let (teardown, subscription) = self.state.borrow_mut().unmount();
        self.release(teardown);
        if let Some(subscription) = subscription {
            self.host.context.unregister(&subscription);
        }
        trace!(menu = %self.id, "unmounted menu");
    }
}

/// A menu registered with its context. Dropping it detaches every listener,
/// cancels the reveal sequence and unregisters, whatever state it is in.
pub struct MountedMenu {
    instance: Rc<MenuInstance>,
}

impl MountedMenu {
    pub fn id(&self) -> &MenuId {
        &self.instance.id
    }

    pub fn entries(&self) -> &[MenuEntry] {
        &self.instance.entries
    }

    pub fn options(&self) -> &MenuOptions {
        &self.instance.options
    }

    pub fn visibility(&self) -> VisibilityState {
        self.instance.state.borrow().visibility()
    }

    pub fn is_visible(&self) -> bool {
        self.visibility() == VisibilityState::Visible
    }

    /// Anchor point of the current or last show.
    pub fn anchor(&self) -> Point {
        self.instance.state.borrow().anchor()
    }

    /// Dismissal listeners currently attached to the viewport.
    pub fn listener_count(&self) -> usize {
        self.instance.state.borrow().listener_count()
    }

    /// Hide this menu, if open.
    pub fn hide(&self) {
        self.instance.hide(HideReason::Request);
    }

    /// The pointer left the menu box.
    pub fn pointer_leave(&self) {
        self.instance.handle_mouse_leave();
    }

    /// Activate the leaf item at `path`. Returns whether an item ran.
    pub fn select(&self, path: &[usize]) -> bool {
        self.instance.select(path)
    }

    /// Mount the sub-menu described by the entry at `path` onto its
    /// rendered row and panel. It closes whenever this menu hides and
    /// ignores hover while this menu is hidden.
    ///
    /// Returns `None` when `path` does not point at a sub-menu entry.
    pub fn mount_sub_menu(
        &self,
        path: &[usize],
        row: Rc<dyn MenuSurface>,
        panel: Rc<dyn MenuSurface>,
    ) -> Option<MountedSubMenu> {
        let Some(MenuEntry::SubMenu(entry)) = entry_at(&self.instance.entries, path) else {
            return None;
        };
        let parent = Rc::downgrade(&self.instance);
        let sub_menu = SubMenu::from_entry(entry, &self.instance.options).mount_within(
            &self.instance.host,
            row,
            panel,
            move || {
                let Some(instance) = parent.upgrade() else {
                    return false;
                };
                let visibility = instance.state.borrow().visibility();
                visibility != VisibilityState::Hidden
            },
        );
        self.instance
            .sub_menus
            .borrow_mut()
            .push(sub_menu.downgrade());
        Some(sub_menu)
    }

    /// Unmount explicitly; same as dropping.
    pub fn unmount(self) {}
}

impl Drop for MountedMenu {
    fn drop(&mut self) {
        self.instance.unmount();
    }
}
