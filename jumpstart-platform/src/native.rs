//! Native windows through winit: Win32 on Windows, X11 on Linux and the BSDs.
//!
//! winit's window id is the HWND on Win32 and the XID on X11, so it doubles as the
//! registry key. Window class registration happens inside winit, once per process.

use std::collections::HashMap;
use std::time::Duration;

use jumpstart_core::{
    JumpstartError, JumpstartResult, NativeWindowHandle, PlatformEvent, PlatformKind, PlatformWindow,
    WindowConfig,
};
use log::{info, warn};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle, RawDisplayHandle, RawWindowHandle};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    platform::pump_events::{EventLoopExtPumpEvents, PumpStatus},
    window::{Window, WindowId},
};

pub struct NativePlatform {
    event_loop: EventLoop<()>,
    windows: HashMap<NativeWindowHandle, Window>,
    kind: PlatformKind,
}

impl NativePlatform {
    pub fn new() -> JumpstartResult<Self> {
        let mut builder = EventLoop::builder();

        #[cfg(all(unix, not(any(target_os = "macos", target_os = "ios", target_os = "android"))))]
        {
            use winit::platform::x11::EventLoopBuilderExtX11;
            builder.with_x11();
        }

        let event_loop = builder
            .build()
            .map_err(|e| JumpstartError::window_creation(format!("Failed to create event loop: {}", e)))?;

        let kind = PlatformKind::native();
        info!("Native platform initialized ({:?})", kind);

        Ok(Self {
            event_loop,
            windows: HashMap::new(),
            kind,
        })
    }

    fn window(&self, handle: NativeWindowHandle) -> JumpstartResult<&Window> {
        self.windows
            .get(&handle)
            .ok_or_else(|| JumpstartError::surface_creation(format!("unknown window {}", handle)))
    }
}

fn native_handle(id: WindowId) -> NativeWindowHandle {
    NativeWindowHandle(u64::from(id))
}

impl PlatformWindow for NativePlatform {
    fn kind(&self) -> PlatformKind {
        self.kind
    }

    fn create(&mut self, config: &WindowConfig) -> JumpstartResult<NativeWindowHandle> {
        let window_attributes = Window::default_attributes()
            .with_title(config.title.as_str())
            .with_inner_size(PhysicalSize::new(config.width, config.height))
            .with_visible(config.visible);

        // Windows are created outside of the application callbacks; fine on Win32 and X11.
        #[allow(deprecated)]
        let window = self
            .event_loop
            .create_window(window_attributes)
            .map_err(|e| JumpstartError::WindowCreation {
                code: None,
                message: format!("Failed to create native window: {}", e),
            })?;

        let handle = native_handle(window.id());
        self.windows.insert(handle, window);
        Ok(handle)
    }

    fn destroy(&mut self, handle: NativeWindowHandle) {
        // Dropping the winit window releases the native one.
        if self.windows.remove(&handle).is_none() {
            warn!("destroy called for unknown native window {}", handle);
        }
    }

    fn raw_handles(
        &self,
        handle: NativeWindowHandle,
    ) -> JumpstartResult<(RawDisplayHandle, RawWindowHandle)> {
        let window = self.window(handle)?;
        let display = window
            .display_handle()
            .map_err(|e| JumpstartError::surface_creation(format!("Failed to get display handle: {}", e)))?
            .as_raw();
        let raw_window = window
            .window_handle()
            .map_err(|e| JumpstartError::surface_creation(format!("Failed to get window handle: {}", e)))?
            .as_raw();
        Ok((display, raw_window))
    }

    fn poll_events(&mut self, sink: &mut dyn FnMut(PlatformEvent)) {
        let mut collector = EventCollector { sink };
        if let PumpStatus::Exit(code) = self
            .event_loop
            .pump_app_events(Some(Duration::ZERO), &mut collector)
        {
            warn!("Platform event loop exited with code {}", code);
        }
    }
}

struct EventCollector<'a> {
    sink: &'a mut dyn FnMut(PlatformEvent),
}

impl ApplicationHandler for EventCollector<'_> {
    fn resumed(&mut self, _event_loop: &ActiveEventLoop) {}

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                (self.sink)(PlatformEvent::CloseRequested(native_handle(window_id)));
            }
            _ => (),
        }
    }
}
