//! Menu event bus and registry.
//!
//! A [`MenuContext`] is created once at the application root and shared by
//! reference with every mounted menu. Triggers publish show/hide requests
//! into it; it routes each request to the one instance registered under the
//! addressed identifier.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::error::MenuError;
use crate::geometry::Point;
use crate::surface::NodeId;

/// Arbitrary key-value payload carried from a trigger to menu callbacks.
pub type MenuData = serde_json::Map<String, serde_json::Value>;

/// Identifier of a top-level menu.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MenuId(String);

impl MenuId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MenuId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MenuId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for MenuId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShowRequest {
    pub target: MenuId,
    /// Screen point the menu anchors at.
    pub position: Point,
    pub data: MenuData,
    /// Node the trigger event originated from, if known.
    pub trigger: Option<NodeId>,
}

impl ShowRequest {
    pub fn new(target: impl Into<MenuId>, position: Point) -> Self {
        Self {
            target: target.into(),
            position,
            data: MenuData::new(),
            trigger: None,
        }
    }

    pub fn with_data(mut self, data: MenuData) -> Self {
        self.data = data;
        self
    }

    pub fn with_trigger(mut self, trigger: NodeId) -> Self {
        self.trigger = Some(trigger);
        self
    }
}

/// Why a menu is being hidden.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HideReason {
    /// Explicit `hide_menu` call.
    Request,
    /// Another menu was shown.
    Superseded,
    OutsidePointer,
    Escape,
    ContextMenu,
    Scroll,
    Resize,
    PointerLeave,
    ItemSelected,
    /// The context was cleared at application teardown.
    Cleared,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HideRequest {
    /// `None` hides whichever menu is open.
    pub target: Option<MenuId>,
    pub reason: HideReason,
}

impl HideRequest {
    pub fn all(reason: HideReason) -> Self {
        Self {
            target: None,
            reason,
        }
    }

    pub fn menu(target: impl Into<MenuId>, reason: HideReason) -> Self {
        Self {
            target: Some(target.into()),
            reason,
        }
    }

    /// Whether a menu registered as `id` should act on this request.
    pub fn addresses(&self, id: &MenuId) -> bool {
        self.target.as_ref().map_or(true, |target| target == id)
    }
}

pub type ShowHandler = Rc<dyn Fn(&ShowRequest)>;
pub type HideHandler = Rc<dyn Fn(&HideRequest)>;
pub type LeaveHandler = Rc<dyn Fn()>;

/// Callbacks a mounted menu registers under its identifier.
#[derive(Clone)]
pub struct MenuHandlers {
    pub show: ShowHandler,
    pub hide: HideHandler,
    pub mouse_leave: Option<LeaveHandler>,
}

impl MenuHandlers {
    pub fn new(
        show: impl Fn(&ShowRequest) + 'static,
        hide: impl Fn(&HideRequest) + 'static,
    ) -> Self {
        Self {
            show: Rc::new(show),
            hide: Rc::new(hide),
            mouse_leave: None,
        }
    }

    pub fn with_mouse_leave(mut self, leave: impl Fn() + 'static) -> Self {
        self.mouse_leave = Some(Rc::new(leave));
        self
    }
}

/// Proof of a registration, handed back to `unregister`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    id: MenuId,
    token: u64,
}

impl Subscription {
    pub fn menu_id(&self) -> &MenuId {
        &self.id
    }
}

struct Registration {
    token: u64,
    handlers: MenuHandlers,
}

/// Data and origin of the most recent show request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriggerStore {
    pub data: MenuData,
    pub target: Option<NodeId>,
}

#[derive(Default)]
pub struct MenuContext {
    next_token: Cell<u64>,
    registry: RefCell<HashMap<MenuId, Registration>>,
    store: RefCell<TriggerStore>,
}

impl fmt::Debug for MenuContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry.borrow();
        let mut ids: Vec<&MenuId> = registry.keys().collect();
        ids.sort();
        f.debug_struct("MenuContext")
            .field("registered", &ids)
            .field("store", &self.store.borrow())
            .finish()
    }
}

impl MenuContext {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    // === Registry ===

    pub fn register(&self, id: MenuId, handlers: MenuHandlers) -> Result<Subscription, MenuError> {
        let mut registry = self.registry.borrow_mut();
        if registry.contains_key(&id) {
            return Err(MenuError::AlreadyRegistered(id));
        }
        let token = self.next_token.get() + 1;
        self.next_token.set(token);
        registry.insert(id.clone(), Registration { token, handlers });
        debug!(menu = %id, "registered menu");
        Ok(Subscription { id, token })
    }

    /// Drop a registration. A stale subscription, one whose identifier has
    /// since been re-registered, leaves the newer registration alone.
    pub fn unregister(&self, subscription: &Subscription) {
        let mut registry = self.registry.borrow_mut();
        let current = registry
            .get(&subscription.id)
            .is_some_and(|registration| registration.token == subscription.token);
        if current {
            registry.remove(&subscription.id);
            debug!(menu = %subscription.id, "unregistered menu");
        }
    }

    pub fn is_registered(&self, id: &MenuId) -> bool {
        self.registry.borrow().contains_key(id)
    }

    pub fn registered_count(&self) -> usize {
        self.registry.borrow().len()
    }

    /// Drop every registration, for application teardown. Open menus are
    /// hidden first so their dismissal listeners are released.
    pub fn clear(&self) {
        self.publish_hide(&HideRequest::all(HideReason::Cleared));
        self.registry.borrow_mut().clear();
        *self.store.borrow_mut() = TriggerStore::default();
    }

    pub fn trigger_store(&self) -> TriggerStore {
        self.store.borrow().clone()
    }

    // === Publishing ===

    /// Route a show request. Every other menu is asked to hide first, then
    /// the addressed menu receives the request. Requests for identifiers
    /// with no registration are dropped.
    pub fn publish_show(&self, request: &ShowRequest) {
        *self.store.borrow_mut() = TriggerStore {
            data: request.data.clone(),
            target: request.trigger,
        };

        let (target, others) = {
            let registry = self.registry.borrow();
            let target = registry
                .get(&request.target)
                .map(|registration| registration.handlers.show.clone());
            let others: Vec<HideHandler> = registry
                .iter()
                .filter(|(id, _)| **id != request.target)
                .map(|(_, registration)| registration.handlers.hide.clone())
                .collect();
            (target, others)
        };

        let superseded = HideRequest::all(HideReason::Superseded);
        for hide in others {
            hide(&superseded);
        }

        match target {
            Some(show) => {
                trace!(menu = %request.target, position = ?request.position, "publishing show");
                show(request);
            }
            None => debug!(menu = %request.target, "no menu registered, dropping show"),
        }
    }

    pub fn publish_hide(&self, request: &HideRequest) {
        let handlers: Vec<HideHandler> = {
            let registry = self.registry.borrow();
            registry
                .iter()
                .filter(|(id, _)| request.addresses(id))
                .map(|(_, registration)| registration.handlers.hide.clone())
                .collect()
        };
        if handlers.is_empty() {
            debug!(target = ?request.target, "no menu registered, dropping hide");
        }
        for hide in handlers {
            hide(request);
        }
    }

    /// Forward a pointer-leave notification to the menu registered as `id`.
    pub fn publish_mouse_leave(&self, id: &MenuId) {
        let leave = self
            .registry
            .borrow()
            .get(id)
            .and_then(|registration| registration.handlers.mouse_leave.clone());
        if let Some(leave) = leave {
            leave();
        }
    }

    // === Trigger-facing API ===

    pub fn show_menu(&self, id: impl Into<MenuId>, position: Point, data: Option<MenuData>) {
        let request = ShowRequest::new(id, position).with_data(data.unwrap_or_default());
        self.publish_show(&request);
    }

    pub fn hide_menu(&self, id: Option<&MenuId>) {
        let request = HideRequest {
            target: id.cloned(),
            reason: HideReason::Request,
        };
        self.publish_hide(&request);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Probe {
        shows: RefCell<Vec<Point>>,
        hides: RefCell<Vec<HideReason>>,
        leaves: Cell<usize>,
    }

    fn probe(context: &MenuContext, id: &str) -> (Rc<Probe>, Subscription) {
        let probe = Rc::new(Probe::default());
        let (on_show, on_hide, on_leave) = (probe.clone(), probe.clone(), probe.clone());
        let handlers = MenuHandlers::new(
            move |request: &ShowRequest| on_show.shows.borrow_mut().push(request.position),
            move |request: &HideRequest| on_hide.hides.borrow_mut().push(request.reason),
        )
        .with_mouse_leave(move || on_leave.leaves.set(on_leave.leaves.get() + 1));
        let subscription = context.register(MenuId::from(id), handlers).unwrap();
        (probe, subscription)
    }

    #[test]
    fn show_reaches_only_the_addressed_menu() {
        let context = MenuContext::new();
        let (a, _) = probe(&context, "a");
        let (b, _) = probe(&context, "b");

        context.show_menu("a", Point::new(1.0, 2.0), None);

        assert_eq!(*a.shows.borrow(), vec![Point::new(1.0, 2.0)]);
        assert!(a.hides.borrow().is_empty());
        assert!(b.shows.borrow().is_empty());
        assert_eq!(*b.hides.borrow(), vec![HideReason::Superseded]);
    }

    #[test]
    fn show_for_unknown_menu_is_dropped() {
        let context = MenuContext::new();
        let (a, _) = probe(&context, "a");
        context.show_menu("missing", Point::default(), None);
        assert!(a.shows.borrow().is_empty());
    }

    #[test]
    fn hide_without_target_reaches_everyone() {
        let context = MenuContext::new();
        let (a, _) = probe(&context, "a");
        let (b, _) = probe(&context, "b");

        context.hide_menu(None);
        context.hide_menu(Some(&MenuId::from("b")));

        assert_eq!(a.hides.borrow().len(), 1);
        assert_eq!(b.hides.borrow().len(), 2);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let context = MenuContext::new();
        let (_a, _) = probe(&context, "a");
        let err = context
            .register(MenuId::from("a"), MenuHandlers::new(|_| {}, |_| {}))
            .unwrap_err();
        assert!(matches!(err, MenuError::AlreadyRegistered(id) if id.as_str() == "a"));
    }

    #[test]
    fn stale_subscription_does_not_remove_newer_registration() {
        let context = MenuContext::new();
        let (_first, old) = probe(&context, "a");
        context.unregister(&old);
        let (second, _) = probe(&context, "a");

        context.unregister(&old);
        assert!(context.is_registered(&MenuId::from("a")));

        context.show_menu("a", Point::default(), None);
        assert_eq!(second.shows.borrow().len(), 1);
    }

    #[test]
    fn handler_may_unregister_itself_during_dispatch() {
        let context = MenuContext::new();
        let slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let (inner, own) = (Rc::downgrade(&context), slot.clone());
        let subscription = context
            .register(
                MenuId::from("a"),
                MenuHandlers::new(|_| {}, move |_| {
                    if let (Some(context), Some(subscription)) = (inner.upgrade(), own.take()) {
                        context.unregister(&subscription);
                    }
                }),
            )
            .unwrap();
        *slot.borrow_mut() = Some(subscription);
        let (b, _) = probe(&context, "b");

        context.hide_menu(None);

        assert_eq!(context.registered_count(), 1);
        assert_eq!(b.hides.borrow().len(), 1);
    }

    #[test]
    fn clear_hides_before_dropping_registrations() {
        let context = MenuContext::new();
        let (a, _) = probe(&context, "a");
        context.show_menu("a", Point::default(), None);

        context.clear();

        assert_eq!(*a.hides.borrow(), vec![HideReason::Cleared]);
        assert_eq!(context.registered_count(), 0);
        assert_eq!(context.trigger_store(), TriggerStore::default());
    }

    #[test]
    fn show_records_trigger_store() {
        let context = MenuContext::new();
        let mut data = MenuData::new();
        data.insert("row".into(), serde_json::json!(3));
        context.publish_show(
            &ShowRequest::new("a", Point::default())
                .with_data(data.clone())
                .with_trigger(NodeId(9)),
        );
        let store = context.trigger_store();
        assert_eq!(store.data, data);
        assert_eq!(store.target, Some(NodeId(9)));
    }

    #[test]
    fn mouse_leave_is_addressed() {
        let context = MenuContext::new();
        let (a, _) = probe(&context, "a");
        let (b, _) = probe(&context, "b");
        context.publish_mouse_leave(&MenuId::from("b"));
        assert_eq!(a.leaves.get(), 0);
        assert_eq!(b.leaves.get(), 1);
    }
}
