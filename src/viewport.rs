//! The host viewport: its current size and the document-level listeners
//! that dismiss open menus.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::geometry::Size;
use crate::surface::NodeId;

/// Key codes delivered with [`ViewportEvent::KeyUp`].
pub mod keycodes {
    /// Escape key (evdev scancode 1)
    pub const ESC: u32 = 1;

    /// Enter/Return key (scancode 28)
    pub const ENTER: u32 = 28;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerKind {
    PointerDown,
    TouchStart,
    ContextMenu,
    KeyUp,
    Scroll,
    Resize,
}

/// Document-level input delivered to dismissal listeners.
///
/// `target` is the node the pointer landed on, when the host could resolve
/// one.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewportEvent {
    PointerDown { target: Option<NodeId> },
    TouchStart { target: Option<NodeId> },
    /// Dispatch before handing the same gesture to a
    /// [`ContextMenuTrigger`](crate::components::trigger::ContextMenuTrigger).
    ContextMenu,
    KeyUp { keycode: u32 },
    Scroll,
    Resize { size: Size },
}

impl ViewportEvent {
    pub fn kind(&self) -> ListenerKind {
        match self {
            Self::PointerDown { .. } => ListenerKind::PointerDown,
            Self::TouchStart { .. } => ListenerKind::TouchStart,
            Self::ContextMenu => ListenerKind::ContextMenu,
            Self::KeyUp { .. } => ListenerKind::KeyUp,
            Self::Scroll => ListenerKind::Scroll,
            Self::Resize { .. } => ListenerKind::Resize,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Rc<dyn Fn(&ViewportEvent)>;

pub struct Viewport {
    size: Cell<Size>,
    next_id: Cell<u64>,
    listeners: RefCell<Vec<(ListenerId, ListenerKind, Listener)>>,
}

impl fmt::Debug for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Viewport")
            .field("size", &self.size.get())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl Viewport {
    pub fn new(size: Size) -> Self {
        Self {
            size: Cell::new(size),
            next_id: Cell::new(0),
            listeners: RefCell::new(Vec::new()),
        }
    }

    pub fn size(&self) -> Size {
        self.size.get()
    }

    /// Update the size and notify resize listeners.
    pub fn resize(&self, size: Size) {
        self.size.set(size);
        self.dispatch(&ViewportEvent::Resize { size });
    }

    pub fn add_listener(
        &self,
        kind: ListenerKind,
        listener: impl Fn(&ViewportEvent) + 'static,
    ) -> ListenerId {
        let id = ListenerId(self.next_id.get() + 1);
        self.next_id.set(id.0);
        self.listeners
            .borrow_mut()
            .push((id, kind, Rc::new(listener)));
        id
    }

    pub fn remove_listener(&self, id: ListenerId) {
        self.listeners
            .borrow_mut()
            .retain(|(listener_id, _, _)| *listener_id != id);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Deliver `event` to every listener of its kind.
    ///
    /// Listeners may add or remove listeners while running; the set that
    /// receives this event is fixed before the first one runs, except that
    /// a listener removed by an earlier one is skipped.
    pub fn dispatch(&self, event: &ViewportEvent) {
        let kind = event.kind();
        let snapshot: Vec<(ListenerId, Listener)> = self
            .listeners
            .borrow()
            .iter()
            .filter(|(_, listener_kind, _)| *listener_kind == kind)
            .map(|(id, _, listener)| (*id, listener.clone()))
            .collect();
        trace!(?event, listeners = snapshot.len(), "dispatching viewport event");

        for (id, listener) in snapshot {
            let still_attached = self
                .listeners
                .borrow()
                .iter()
                .any(|(listener_id, _, _)| *listener_id == id);
            if still_attached {
                listener(event);
            }
        }
    }
}
