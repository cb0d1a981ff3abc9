use log::{debug, info};
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};

use crate::platform::{PlatformKind, PlatformWindow};
use crate::registry::WindowRegistry;
use crate::window::{Window, WindowConfig};
use crate::{JumpstartError, JumpstartResult};

/// A platform plus the registry that routes its events back to windows.
pub struct WindowSystem<P: PlatformWindow> {
    platform: P,
    registry: WindowRegistry,
}

impl<P: PlatformWindow> WindowSystem<P> {
    pub fn new(platform: P) -> Self {
        Self {
            platform,
            registry: WindowRegistry::new(),
        }
    }

    pub fn kind(&self) -> PlatformKind {
        self.platform.kind()
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    pub fn registry(&self) -> &WindowRegistry {
        &self.registry
    }

    pub fn create_window(&mut self, width: u32, height: u32, title: &str) -> JumpstartResult<Window> {
        self.create_window_with(WindowConfig::new(width, height, title))
    }

    pub fn create_window_with(&mut self, config: WindowConfig) -> JumpstartResult<Window> {
        if config.width == 0 || config.height == 0 {
            return Err(JumpstartError::window_creation(format!(
                "invalid window size {}x{}",
                config.width, config.height
            )));
        }

        let handle = self.platform.create(&config)?;
        let window = Window::new(handle, config);
        self.registry.insert(handle, &window.state);

        info!(
            "Window {} created: \"{}\" {}x{}",
            handle, window.config.title, window.config.width, window.config.height
        );
        Ok(window)
    }

    /// Unregisters the window, then releases its native resource. Destroying a window
    /// twice is a no-op.
    pub fn destroy_window(&mut self, window: &mut Window) {
        let Some(handle) = window.handle.take() else {
            debug!("destroy_window on an already destroyed window");
            return;
        };

        self.registry.remove(handle);
        self.platform.destroy(handle);
        info!("Window {} destroyed", handle);
    }

    /// Pumps the platform once and applies close requests to their windows.
    ///
    /// Windows dropped without `destroy_window` are released here first.
    pub fn poll_events(&mut self) {
        for handle in self.registry.take_dropped() {
            self.platform.destroy(handle);
            debug!("Window {} was dropped without destroy_window; released", handle);
        }

        let registry = &self.registry;
        self.platform.poll_events(&mut |event| {
            registry.dispatch(event);
        });
    }

    pub fn raw_handles(&self, window: &Window) -> JumpstartResult<(RawDisplayHandle, RawWindowHandle)> {
        let handle = window
            .handle
            .ok_or_else(|| JumpstartError::surface_creation("window has been destroyed"))?;
        self.platform.raw_handles(handle)
    }
}
