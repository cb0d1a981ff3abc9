use std::ops::Deref;

use ash::vk;
use jumpstart_core::{
    JumpstartError, JumpstartResult, PlatformWindow, ScopedHandle, Window, WindowConfig, WindowSystem,
};
use log::debug;
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};

use crate::library::{LibraryConfig, LibraryState};

/// The library state and a window system behind one context.
///
/// Windows can only be created once the library is initialized. Fields drop in
/// order, so windows are gone before the module unloads.
pub struct Jumpstart<P: PlatformWindow> {
    windows: WindowSystem<P>,
    library: LibraryState,
}

impl<P: PlatformWindow> Jumpstart<P> {
    /// The platform decides which surface extension the library requires, whatever
    /// `config.platform` says.
    pub fn new(config: LibraryConfig, platform: P) -> Self {
        let kind = platform.kind();
        if config.platform != kind {
            debug!("Overriding configured platform {:?} with {:?}", config.platform, kind);
        }

        Self {
            windows: WindowSystem::new(platform),
            library: LibraryState::new(LibraryConfig { platform: kind, ..config }),
        }
    }

    pub fn initialize(&mut self) -> JumpstartResult<()> {
        self.library.initialize()
    }

    pub fn teardown(&mut self) {
        self.library.teardown();
    }

    pub fn library(&self) -> &LibraryState {
        &self.library
    }

    pub fn windows(&self) -> &WindowSystem<P> {
        &self.windows
    }

    pub fn windows_mut(&mut self) -> WindowsMut<'_, P> {
        self.split_mut().1
    }

    /// Both halves at once, so handles borrowing the library can stay alive while
    /// events are pumped.
    pub fn split_mut(&mut self) -> (&LibraryState, WindowsMut<'_, P>) {
        let windows = WindowsMut {
            library: &self.library,
            windows: &mut self.windows,
        };
        (&self.library, windows)
    }

    fn ensure_initialized(&self) -> JumpstartResult<()> {
        ensure_initialized(&self.library)
    }

    pub fn create_window(&mut self, width: u32, height: u32, title: &str) -> JumpstartResult<Window> {
        self.create_window_with(WindowConfig::new(width, height, title))
    }

    pub fn create_window_with(&mut self, config: WindowConfig) -> JumpstartResult<Window> {
        self.windows_mut().create_window_with(config)
    }

    pub fn destroy_window(&mut self, window: &mut Window) {
        self.windows.destroy_window(window);
    }

    pub fn window_resolution(&self, window: &Window) -> (u32, u32) {
        window.resolution()
    }

    pub fn window_should_close(&self, window: &Window) -> bool {
        window.should_close()
    }

    pub fn poll_events(&mut self) {
        self.windows.poll_events();
    }

    pub fn create_presentation_surface(
        &self,
        instance: vk::Instance,
        window: &Window,
        target: &mut ScopedHandle<'_, vk::SurfaceKHR>,
    ) -> JumpstartResult<()> {
        self.ensure_initialized()?;
        let (display_handle, window_handle) = self.windows.raw_handles(window)?;
        self.library.create_surface(instance, display_handle, window_handle, target)
    }
}

fn ensure_initialized(library: &LibraryState) -> JumpstartResult<()> {
    if library.is_initialized() {
        Ok(())
    } else {
        Err(JumpstartError::NotInitialized)
    }
}

/// Mutable access to the window system of a [`Jumpstart`].
///
/// Window creation goes through the library's initialization check here too; the
/// read-only side of [`WindowSystem`] is reachable through `Deref`.
pub struct WindowsMut<'a, P: PlatformWindow> {
    library: &'a LibraryState,
    windows: &'a mut WindowSystem<P>,
}

impl<P: PlatformWindow> WindowsMut<'_, P> {
    pub fn create_window(&mut self, width: u32, height: u32, title: &str) -> JumpstartResult<Window> {
        self.create_window_with(WindowConfig::new(width, height, title))
    }

    pub fn create_window_with(&mut self, config: WindowConfig) -> JumpstartResult<Window> {
        ensure_initialized(self.library)?;
        self.windows.create_window_with(config)
    }

    pub fn destroy_window(&mut self, window: &mut Window) {
        self.windows.destroy_window(window);
    }

    pub fn poll_events(&mut self) {
        self.windows.poll_events();
    }

    pub fn platform_mut(&mut self) -> &mut P {
        self.windows.platform_mut()
    }

    pub fn raw_handles(&self, window: &Window) -> JumpstartResult<(RawDisplayHandle, RawWindowHandle)> {
        self.windows.raw_handles(window)
    }
}

impl<P: PlatformWindow> Deref for WindowsMut<'_, P> {
    type Target = WindowSystem<P>;

    fn deref(&self) -> &WindowSystem<P> {
        self.windows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jumpstart_core::HeadlessPlatform;

    fn headless() -> Jumpstart<HeadlessPlatform> {
        Jumpstart::new(LibraryConfig::default(), HeadlessPlatform::new())
    }

    #[test]
    fn window_view_refuses_creation_while_uninitialized() {
        let mut context = headless();
        assert!(matches!(
            context.windows_mut().create_window(100, 100, "view"),
            Err(JumpstartError::NotInitialized)
        ));

        let (library, mut windows) = context.split_mut();
        assert!(!library.is_initialized());
        assert!(matches!(
            windows.create_window_with(WindowConfig::new(100, 100, "split")),
            Err(JumpstartError::NotInitialized)
        ));
        assert_eq!(windows.platform().created_count(), 0);
        assert!(windows.registry().is_empty());
    }
}
