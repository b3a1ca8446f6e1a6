use crate::bus::Subscription;
use crate::geometry::Point;
use crate::scheduler::TaskHandle;
use crate::viewport::ListenerId;

/// Lifecycle of a top-level menu.
///
/// `PendingVisible` only exists between a show and the end of the reveal
/// sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VisibilityState {
    #[default]
    Hidden,
    PendingVisible,
    Visible,
}

/// Resources released when a menu hides or unmounts.
#[derive(Debug, Default)]
pub struct Teardown {
    pub listeners: Vec<ListenerId>,
    pub reveal: Option<TaskHandle>,
}

/// State for ContextMenu
///
/// Pure bookkeeping - no surfaces, no scheduling. Every show starts a new
/// generation; deferred reveal frames carry the generation they were
/// scheduled for and are ignored once it is stale.
#[derive(Debug)]
pub struct ContextMenuState {
    visibility: VisibilityState,
    anchor: Point,
    listeners: Vec<ListenerId>,
    reveal: Option<TaskHandle>,
    generation: u64,
    subscription: Option<Subscription>,
    mounted: bool,
}

impl ContextMenuState {
    pub fn new() -> Self {
        Self {
            visibility: VisibilityState::Hidden,
            anchor: Point::default(),
            listeners: Vec::new(),
            reveal: None,
            generation: 0,
            subscription: None,
            mounted: true,
        }
    }

    // === Getters ===

    pub fn visibility(&self) -> VisibilityState {
        self.visibility
    }

    pub fn anchor(&self) -> Point {
        self.anchor
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Whether a reveal frame scheduled for `generation` may still run.
    pub fn is_current(&self, generation: u64) -> bool {
        self.mounted
            && self.visibility == VisibilityState::PendingVisible
            && self.generation == generation
    }

    // === Transitions ===

    pub fn set_subscription(&mut self, subscription: Subscription) {
        self.subscription = Some(subscription);
    }

    /// Hidden → PendingVisible. Returns the new generation, or `None` when
    /// the menu is already open or unmounted.
    pub fn show(&mut self, anchor: Point) -> Option<u64> {
        if !self.mounted || self.visibility != VisibilityState::Hidden {
            return None;
        }
        self.generation += 1;
        self.visibility = VisibilityState::PendingVisible;
        self.anchor = anchor;
        Some(self.generation)
    }

    pub fn attach_listeners(&mut self, listeners: Vec<ListenerId>) {
        self.listeners.extend(listeners);
    }

    /// Remember the pending reveal frame, if `generation` is still current.
    pub fn set_reveal(&mut self, generation: u64, handle: TaskHandle) {
        if self.is_current(generation) {
            self.reveal = Some(handle);
        }
    }

    /// PendingVisible → Visible at the end of the reveal sequence.
    pub fn reveal(&mut self, generation: u64) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        self.visibility = VisibilityState::Visible;
        self.reveal = None;
        true
    }

    /// Start hiding: invalidates pending frames and hands back what must be
    /// released. `None` when already hidden.
    pub fn begin_hide(&mut self) -> Option<Teardown> {
        if self.visibility == VisibilityState::Hidden {
            return None;
        }
        self.generation += 1;
        Some(Teardown {
            listeners: std::mem::take(&mut self.listeners),
            reveal: self.reveal.take(),
        })
    }

    pub fn finish_hide(&mut self) {
        self.visibility = VisibilityState::Hidden;
    }

    /// Unconditional release, whatever the current state.
    pub fn unmount(&mut self) -> (Teardown, Option<Subscription>) {
        self.mounted = false;
        self.generation += 1;
        self.visibility = VisibilityState::Hidden;
        let teardown = Teardown {
            listeners: std::mem::take(&mut self.listeners),
            reveal: self.reveal.take(),
        };
        (teardown, self.subscription.take())
    }
}

impl Default for ContextMenuState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn show_is_idempotent_while_open() {
        let mut state = ContextMenuState::new();
        let generation = state.show(Point::new(1.0, 1.0)).unwrap();
        assert_eq!(state.visibility(), VisibilityState::PendingVisible);
        assert!(state.show(Point::new(2.0, 2.0)).is_none());
        assert_eq!(state.anchor(), Point::new(1.0, 1.0));

        assert!(state.reveal(generation));
        assert!(state.show(Point::new(3.0, 3.0)).is_none());
    }

    #[test]
    fn hide_invalidates_pending_reveal() {
        let mut state = ContextMenuState::new();
        let generation = state.show(Point::default()).unwrap();
        assert!(state.begin_hide().is_some());
        state.finish_hide();

        assert!(!state.reveal(generation));
        assert_eq!(state.visibility(), VisibilityState::Hidden);
        assert!(state.begin_hide().is_none());
    }

    #[test]
    fn stale_generation_cannot_reveal_a_new_show() {
        let mut state = ContextMenuState::new();
        let first = state.show(Point::default()).unwrap();
        state.begin_hide();
        state.finish_hide();
        let second = state.show(Point::default()).unwrap();

        assert!(!state.reveal(first));
        assert!(state.reveal(second));
    }

    #[test]
    fn unmount_blocks_further_shows() {
        let mut state = ContextMenuState::new();
        state.show(Point::default());
        let (teardown, subscription) = state.unmount();
        assert!(teardown.listeners.is_empty());
        assert!(subscription.is_none());
        assert!(!state.is_mounted());
        assert!(state.show(Point::default()).is_none());
    }
}
