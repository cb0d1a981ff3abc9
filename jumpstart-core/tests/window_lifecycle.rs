use jumpstart_core::{
    HeadlessPlatform, JumpstartError, NativeWindowHandle, PlatformKind, WindowConfig, WindowSystem,
};

#[test]
fn close_request_sets_should_close() {
    let mut system = WindowSystem::new(HeadlessPlatform::new());
    let window = system.create_window(800, 600, "Jumpstart").unwrap();
    let handle = window.handle().unwrap();

    assert!(!window.should_close());
    system.platform_mut().request_close(handle);
    system.poll_events();
    assert!(window.should_close());
}

#[test]
fn close_request_for_unregistered_handle_is_ignored() {
    let mut system = WindowSystem::new(HeadlessPlatform::new());
    let window = system.create_window(800, 600, "Jumpstart").unwrap();

    system.platform_mut().request_close(NativeWindowHandle(0xdead));
    system.poll_events();
    assert!(!window.should_close());
}

#[test]
fn close_request_only_reaches_its_own_window() {
    let mut system = WindowSystem::new(HeadlessPlatform::new());
    let first = system.create_window(640, 480, "first").unwrap();
    let second = system.create_window(320, 240, "second").unwrap();

    system.platform_mut().request_close(second.handle().unwrap());
    system.poll_events();
    assert!(!first.should_close());
    assert!(second.should_close());
}

#[test]
fn destroy_window_is_idempotent() {
    let mut system = WindowSystem::new(HeadlessPlatform::new());
    let mut window = system.create_window(800, 600, "Jumpstart").unwrap();
    let handle = window.handle().unwrap();

    system.destroy_window(&mut window);
    system.destroy_window(&mut window);

    assert!(window.is_destroyed());
    assert_eq!(system.platform().destroyed(), &[handle]);
    assert!(!system.registry().contains(handle));
}

#[test]
fn events_for_destroyed_window_are_dropped() {
    let mut system = WindowSystem::new(HeadlessPlatform::new());
    let mut window = system.create_window(800, 600, "Jumpstart").unwrap();
    let handle = window.handle().unwrap();
    system.destroy_window(&mut window);

    system.platform_mut().request_close(handle);
    system.poll_events();
    assert!(!window.should_close());
}

#[test]
fn window_keeps_its_configuration() {
    let mut system = WindowSystem::new(HeadlessPlatform::new());
    let window = system
        .create_window_with(WindowConfig::new(1024, 768, "hidden").with_visible(false))
        .unwrap();

    assert_eq!(window.resolution(), (1024, 768));
    assert_eq!(window.title(), "hidden");
    assert!(!window.config().visible);
    assert_eq!(system.kind(), PlatformKind::Headless);
    assert_eq!(system.platform().config(window.handle().unwrap()).unwrap().title, "hidden");
}

#[test]
fn zero_sized_window_is_rejected() {
    let mut system = WindowSystem::new(HeadlessPlatform::new());
    let err = system.create_window(0, 600, "bad").unwrap_err();
    assert!(matches!(err, JumpstartError::WindowCreation { .. }));
    assert_eq!(system.platform().created_count(), 0);
    assert!(system.registry().is_empty());
}

#[test]
fn platform_failure_surfaces_its_code() {
    let mut system = WindowSystem::new(HeadlessPlatform::with_window_limit(1));
    let _first = system.create_window(100, 100, "one").unwrap();
    match system.create_window(100, 100, "two") {
        Err(JumpstartError::WindowCreation { code, .. }) => assert_eq!(code, Some(8)),
        other => panic!("unexpected result: {:?}", other.map(|w| w.handle())),
    }
    assert_eq!(system.registry().len(), 1);
}

#[test]
fn headless_windows_have_no_surface_source() {
    let mut system = WindowSystem::new(HeadlessPlatform::new());
    let mut window = system.create_window(100, 100, "x").unwrap();
    assert!(matches!(
        system.raw_handles(&window),
        Err(JumpstartError::SurfaceCreation { .. })
    ));

    system.destroy_window(&mut window);
    assert!(matches!(
        system.raw_handles(&window),
        Err(JumpstartError::SurfaceCreation { .. })
    ));
}

#[test]
fn dropped_window_is_released_on_next_poll() {
    let mut system = WindowSystem::new(HeadlessPlatform::new());
    let kept = system.create_window(100, 100, "kept").unwrap();
    let dropped = system.create_window(100, 100, "dropped").unwrap();
    let handle = dropped.handle().unwrap();
    drop(dropped);

    assert!(system.platform().is_alive(handle));
    system.poll_events();

    assert!(!system.platform().is_alive(handle));
    assert_eq!(system.platform().destroyed(), &[handle]);
    assert!(!system.registry().contains(handle));
    assert!(system.registry().contains(kept.handle().unwrap()));
}
