use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use popmenu::geometry::{Length, Offsets};
use popmenu::prelude::*;
use proptest::prelude::*;

const VIEWPORT: Size = Size {
    width: 800.0,
    height: 600.0,
};

struct Desk {
    scheduler: Rc<ManualScheduler>,
    host: MenuHost,
}

impl Desk {
    fn new() -> Self {
        let scheduler = Rc::new(ManualScheduler::new());
        let host = MenuHost::with_scheduler(VIEWPORT, scheduler.clone());
        Self { scheduler, host }
    }

    fn menu(&self, id: &str, node: u64) -> (MountedMenu, Rc<HeadlessSurface>) {
        self.menu_with(ContextMenu::new(id, content()), node)
    }

    fn menu_with(&self, menu: ContextMenu, node: u64) -> (MountedMenu, Rc<HeadlessSurface>) {
        let surface = Rc::new(HeadlessSurface::new(NodeId(node), Size::new(200.0, 300.0)));
        let mounted = menu.mount(&self.host, surface.clone()).unwrap();
        (mounted, surface)
    }

    fn settle(&self) {
        self.scheduler.run_frames();
    }
}

fn content() -> Vec<MenuEntry> {
    vec![
        MenuEntry::item("Copy"),
        MenuEntry::item("Paste"),
        MenuEntry::divider(),
        MenuEntry::sub_menu("More", vec![MenuEntry::item("Inspect")]),
    ]
}

#[test]
fn showing_another_menu_hides_the_first() {
    let desk = Desk::new();
    let (files, _) = desk.menu("files", 1);
    let (tabs, _) = desk.menu("tabs", 2);

    desk.host.context.show_menu("files", Point::new(10.0, 10.0), None);
    desk.settle();
    assert!(files.is_visible());

    desk.host.context.show_menu("tabs", Point::new(40.0, 40.0), None);
    desk.settle();
    assert_eq!(files.visibility(), VisibilityState::Hidden);
    assert!(tabs.is_visible());
    assert_eq!(files.listener_count(), 0);
}

#[test]
fn listeners_exist_only_while_open() {
    let desk = Desk::new();
    let (menu, _) = desk.menu("files", 1);
    assert_eq!(desk.host.viewport.listener_count(), 0);

    desk.host.context.show_menu("files", Point::new(10.0, 10.0), None);
    assert!(desk.host.viewport.listener_count() > 0);
    assert_eq!(desk.host.viewport.listener_count(), menu.listener_count());

    desk.host.context.hide_menu(None);
    assert_eq!(desk.host.viewport.listener_count(), 0);
}

#[test]
fn outside_click_hides_every_menu() {
    let desk = Desk::new();
    let reasons = Rc::new(RefCell::new(Vec::new()));
    let sink = reasons.clone();
    let (menu, _) = desk.menu_with(
        ContextMenu::new("files", content()).on_hide(move |event| sink.borrow_mut().push(event.reason)),
        1,
    );

    desk.host.context.show_menu("files", Point::new(10.0, 10.0), None);
    desk.settle();
    desk.host
        .viewport
        .dispatch(&ViewportEvent::PointerDown { target: Some(NodeId(1)) });
    assert!(menu.is_visible());

    desk.host
        .viewport
        .dispatch(&ViewportEvent::PointerDown { target: Some(NodeId(99)) });
    assert_eq!(menu.visibility(), VisibilityState::Hidden);
    assert_eq!(*reasons.borrow(), vec![HideReason::OutsidePointer]);
}

#[test]
fn repeated_context_menu_event_hides_open_menu() {
    let desk = Desk::new();
    let (menu, _) = desk.menu("files", 1);
    desk.host.context.show_menu("files", Point::new(10.0, 10.0), None);
    desk.settle();

    desk.host.viewport.dispatch(&ViewportEvent::ContextMenu);
    assert_eq!(menu.visibility(), VisibilityState::Hidden);
}

#[test]
fn scroll_hides_by_default() {
    let desk = Desk::new();
    let (menu, surface) = desk.menu("files", 1);
    desk.host.context.show_menu("files", Point::new(10.0, 10.0), None);
    desk.settle();

    desk.host.viewport.dispatch(&ViewportEvent::Scroll);
    assert_eq!(menu.visibility(), VisibilityState::Hidden);
    assert!(!surface.is_revealed());
    assert_eq!(surface.offsets(), Offsets::collapsed());
}

#[test]
fn resize_hides_and_next_show_uses_new_size() {
    let desk = Desk::new();
    let (menu, surface) = desk.menu("files", 1);
    desk.host.context.show_menu("files", Point::new(10.0, 10.0), None);
    desk.settle();

    desk.host.viewport.resize(Size::new(400.0, 400.0));
    assert_eq!(menu.visibility(), VisibilityState::Hidden);

    desk.host.context.show_menu("files", Point::new(390.0, 390.0), None);
    desk.settle();
    assert_eq!(surface.offsets().left, Some(Length::Px(190.0)));
    assert_eq!(surface.offsets().top, Some(Length::Px(90.0)));
}

#[test]
fn trigger_drives_full_pipeline() {
    let desk = Desk::new();
    let (menu, surface) = desk.menu("files", 1);
    let trigger = ContextMenuTrigger::new("files");

    assert!(trigger.handle_context_menu(&desk.host.context, Point::new(790.0, 590.0), None));
    desk.settle();

    assert!(menu.is_visible());
    assert_eq!(surface.offsets().top, Some(Length::Px(290.0)));
    assert_eq!(surface.offsets().left, Some(Length::Px(590.0)));
}

#[test]
fn right_click_elsewhere_reopens_at_new_position() {
    let desk = Desk::new();
    let (menu, _) = desk.menu("files", 1);
    let trigger = ContextMenuTrigger::new("files");

    desk.host.viewport.dispatch(&ViewportEvent::ContextMenu);
    trigger.handle_context_menu(&desk.host.context, Point::new(10.0, 10.0), None);
    desk.settle();
    assert!(menu.is_visible());

    desk.host.viewport.dispatch(&ViewportEvent::ContextMenu);
    trigger.handle_context_menu(&desk.host.context, Point::new(60.0, 70.0), None);
    desk.settle();
    assert!(menu.is_visible());
    assert_eq!(menu.anchor(), Point::new(60.0, 70.0));
}

#[test]
fn selecting_an_item_closes_the_menu() {
    let desk = Desk::new();
    let clicks = Rc::new(RefCell::new(Vec::new()));
    let sink = clicks.clone();
    let entries: Vec<MenuEntry> = vec![MenuItem::new("Copy")
        .on_click(move |click| sink.borrow_mut().push(click.label.clone()))
        .into()];
    let (menu, _) = desk.menu_with(ContextMenu::new("files", entries), 1);

    desk.host.context.show_menu("files", Point::new(10.0, 10.0), None);
    desk.settle();
    assert!(menu.select(&[0]));

    assert_eq!(*clicks.borrow(), vec!["Copy".to_string()]);
    assert_eq!(menu.visibility(), VisibilityState::Hidden);
}

#[test]
fn sub_menu_follows_hover_and_parent_hide() {
    let desk = Desk::new();
    let (menu, _) = desk.menu("files", 1);
    let row = Rc::new(
        HeadlessSurface::new(NodeId(10), Size::new(200.0, 28.0))
            .with_origin(Point::new(10.0, 100.0))
            .displayed(),
    );
    let panel = Rc::new(HeadlessSurface::new(NodeId(11), Size::new(150.0, 80.0)).displayed());
    let more = menu.mount_sub_menu(&[3], row.clone(), panel.clone()).unwrap();

    desk.host.context.show_menu("files", Point::new(10.0, 10.0), None);
    desk.settle();

    more.pointer_enter();
    desk.scheduler.advance(Duration::from_millis(499));
    assert!(!more.is_open());
    desk.scheduler.advance(Duration::from_millis(1));
    desk.settle();
    assert!(more.is_open());
    assert!(row.is_active());
    assert!(panel.is_revealed());

    desk.host
        .viewport
        .dispatch(&ViewportEvent::KeyUp { keycode: keycodes::ESC });
    assert!(!more.is_open());
    assert!(!row.is_active());
    assert_eq!(panel.offsets(), Offsets::beside_parent());
}

#[test]
fn dropping_an_open_menu_releases_everything() {
    let desk = Desk::new();
    let (menu, _) = desk.menu("files", 1);
    desk.host.context.show_menu("files", Point::new(10.0, 10.0), None);

    drop(menu);
    assert_eq!(desk.host.viewport.listener_count(), 0);
    assert_eq!(desk.scheduler.pending_frames(), 0);
    assert!(!desk.host.context.is_registered(&MenuId::from("files")));

    // a later show for the same id is a routing miss
    desk.host.context.show_menu("files", Point::new(10.0, 10.0), None);
    assert_eq!(desk.scheduler.pending_frames(), 0);
}

#[test]
fn clearing_the_context_closes_open_menus() {
    let desk = Desk::new();
    let reasons = Rc::new(RefCell::new(Vec::new()));
    let sink = reasons.clone();
    let (menu, surface) = desk.menu_with(
        ContextMenu::new("files", content()).on_hide(move |event| sink.borrow_mut().push(event.reason)),
        1,
    );
    desk.host.context.show_menu("files", Point::new(10.0, 10.0), None);
    desk.settle();
    assert!(menu.is_visible());

    desk.host.context.clear();

    assert_eq!(menu.visibility(), VisibilityState::Hidden);
    assert_eq!(desk.host.viewport.listener_count(), 0);
    assert!(!surface.is_revealed());
    assert_eq!(*reasons.borrow(), vec![HideReason::Cleared]);

    desk.host
        .viewport
        .dispatch(&ViewportEvent::KeyUp { keycode: keycodes::ESC });
    desk.host
        .viewport
        .dispatch(&ViewportEvent::PointerDown { target: Some(NodeId(99)) });
    assert_eq!(reasons.borrow().len(), 1);
}

#[test]
fn remounting_after_unmount_reuses_the_id() {
    let desk = Desk::new();
    let (menu, _) = desk.menu("files", 1);
    menu.unmount();

    let (again, _) = desk.menu("files", 2);
    desk.host.context.show_menu("files", Point::new(10.0, 10.0), None);
    desk.settle();
    assert!(again.is_visible());
}

proptest! {
    #[test]
    fn at_most_one_menu_is_ever_open(steps in prop::collection::vec((0usize..4, any::<bool>()), 1..40)) {
        let desk = Desk::new();
        let menus: Vec<(MountedMenu, Rc<HeadlessSurface>)> = (0..3)
            .map(|index| desk.menu(&format!("menu-{index}"), index as u64 + 1))
            .collect();

        for (target, settle) in steps {
            if target == 3 {
                desk.host.context.hide_menu(None);
            } else {
                desk.host
                    .context
                    .show_menu(format!("menu-{target}"), Point::new(50.0, 50.0), None);
            }
            if settle {
                desk.settle();
            }

            let open = menus
                .iter()
                .filter(|(menu, _)| menu.visibility() != VisibilityState::Hidden)
                .count();
            prop_assert!(open <= 1);
            let revealed = menus.iter().filter(|(_, surface)| surface.is_revealed()).count();
            prop_assert!(revealed <= 1);
        }
    }
}
