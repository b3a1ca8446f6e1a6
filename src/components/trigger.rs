use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::bus::{MenuContext, MenuData, MenuId, ShowRequest};
use crate::geometry::Point;
use crate::surface::NodeId;

type Collect = Rc<dyn Fn() -> MenuData>;

/// Turns a context-menu gesture on some element into a show request for
/// the menu registered as `id`.
#[derive(Clone)]
pub struct ContextMenuTrigger {
    id: MenuId,
    disabled: bool,
    collect: Option<Collect>,
}

impl fmt::Debug for ContextMenuTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextMenuTrigger")
            .field("id", &self.id)
            .field("disabled", &self.disabled)
            .field("collect", &self.collect.is_some())
            .finish()
    }
}

impl ContextMenuTrigger {
    pub fn new(id: impl Into<MenuId>) -> Self {
        Self {
            id: id.into(),
            disabled: false,
            collect: None,
        }
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// Data attached to every show request, evaluated at trigger time.
    pub fn collect(mut self, collect: impl Fn() -> MenuData + 'static) -> Self {
        self.collect = Some(Rc::new(collect));
        self
    }

    pub fn id(&self) -> &MenuId {
        &self.id
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Handle a context-menu event at `position`. Returns whether the
    /// platform's native menu should be suppressed.
    ///
    /// Deliver the same event to the viewport as
    /// [`ViewportEvent::ContextMenu`](crate::viewport::ViewportEvent) first;
    /// in the other order the freshly shown menu hides itself.
    pub fn handle_context_menu(
        &self,
        context: &MenuContext,
        position: Point,
        target: Option<NodeId>,
    ) -> bool {
        if self.disabled {
            trace!(menu = %self.id, "trigger disabled");
            return false;
        }
        let data = self.collect.as_ref().map(|collect| collect()).unwrap_or_default();
        let mut request = ShowRequest::new(self.id.clone(), position).with_data(data);
        if let Some(target) = target {
            request = request.with_trigger(target);
        }
        context.publish_show(&request);
        true
    }
}
