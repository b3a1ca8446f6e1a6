use std::rc::Rc;
use std::time::{Duration, Instant};

use anyhow::Context;
use calloop::EventLoop;
use popmenu::prelude::*;
use popmenu::Config;

fn main() -> anyhow::Result<()> {
    if let Ok(env_filter) = tracing_subscriber::EnvFilter::try_from_default_env() {
        tracing_subscriber::fmt()
            .compact()
            .with_env_filter(env_filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter("info")
            .compact()
            .init();
    }

    let options = Config::with(|config| config.options());
    tracing::info!("Starting popmenu demo with {:?}", options);

    let mut event_loop: EventLoop<'static, ()> =
        EventLoop::try_new().context("failed to create event loop")?;
    let scheduler = Rc::new(CalloopScheduler::new(event_loop.handle()));
    let host = MenuHost::with_scheduler(Size::new(1280.0, 800.0), scheduler.clone());

    let entries: Vec<MenuEntry> = vec![
        MenuItem::new("Open")
            .on_click(|click| tracing::info!("clicked {} with {:?}", click.label, click.data))
            .into(),
        MenuEntry::divider(),
        MenuEntry::sub_menu(
            "Share",
            vec![MenuEntry::item("Mail"), MenuEntry::item("Messages")],
        ),
        MenuItem::new("Delete").disabled().into(),
    ];

    let surface = Rc::new(HeadlessSurface::new(NodeId(100), Size::new(220.0, 120.0)));
    let menu = ContextMenu::new("demo", entries)
        .with_options(options)
        .on_show(|request| tracing::info!("menu requested at {:?}", request.position))
        .on_hide(|event| tracing::info!("menu {} hidden: {:?}", event.id, event.reason))
        .mount(&host, surface.clone())?;

    let row = Rc::new(
        HeadlessSurface::new(NodeId(101), Size::new(220.0, 28.0))
            .with_origin(Point::new(1200.0, 760.0))
            .displayed(),
    );
    let panel = Rc::new(HeadlessSurface::new(NodeId(102), Size::new(160.0, 60.0)).displayed());
    let share = menu
        .mount_sub_menu(&[2], row, panel.clone())
        .context("menu content has no sub-menu at row 2")?;

    let trigger = ContextMenuTrigger::new("demo").collect(|| {
        let mut data = MenuData::new();
        data.insert("file".into(), serde_json::json!("notes.txt"));
        data
    });
    host.viewport.dispatch(&ViewportEvent::ContextMenu);
    trigger.handle_context_menu(&host.context, Point::new(1200.0, 760.0), Some(NodeId(7)));

    run_until(&mut event_loop, Duration::from_secs(1), || menu.is_visible())?;
    tracing::info!("menu offsets: {:?}", surface.offsets());

    share.pointer_enter();
    let wait = options.hover_delay + Duration::from_secs(1);
    run_until(&mut event_loop, wait, || share.is_open() && panel.is_revealed())?;
    tracing::info!("sub-menu offsets: {:?}", panel.offsets());

    host.viewport
        .dispatch(&ViewportEvent::KeyUp { keycode: keycodes::ESC });
    tracing::info!(
        "after escape: visible={}, sub-menu open={}, pending tasks={}",
        menu.is_visible(),
        share.is_open(),
        scheduler.pending()
    );

    drop(share);
    menu.unmount();
    host.context.clear();
    Ok(())
}

fn run_until(
    event_loop: &mut EventLoop<'static, ()>,
    timeout: Duration,
    done: impl Fn() -> bool,
) -> anyhow::Result<()> {
    let deadline = Instant::now() + timeout;
    while !done() {
        if Instant::now() >= deadline {
            anyhow::bail!("timed out after {timeout:?}");
        }
        event_loop
            .dispatch(Some(Duration::from_millis(16)), &mut ())
            .context("event loop dispatch failed")?;
    }
    Ok(())
}
