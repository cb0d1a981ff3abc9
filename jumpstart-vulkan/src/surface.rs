use std::ptr;

use ash::vk;
use jumpstart_core::{JumpstartError, JumpstartResult, ScopedHandle};
use log::{error, info};
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};

use crate::library::LibraryState;

fn surface_error(function: &str, result: vk::Result) -> JumpstartError {
    error!("{} failed: {:?}", function, result);
    JumpstartError::SurfaceCreation {
        code: Some(result.as_raw()),
        message: format!("{} failed: {}", function, result),
    }
}

impl LibraryState {
    /// Creates a presentation surface for a native window into `target`. The window is
    /// only borrowed; it must outlive the surface.
    pub fn create_surface(
        &self,
        instance: vk::Instance,
        display_handle: RawDisplayHandle,
        window_handle: RawWindowHandle,
        target: &mut ScopedHandle<'_, vk::SurfaceKHR>,
    ) -> JumpstartResult<()> {
        let entry_points = self.entry_points()?;

        let result = match (display_handle, window_handle) {
            (_, RawWindowHandle::Win32(handle)) => {
                let create_win32_surface = entry_points.create_win32_surface_khr()?;
                let create_info = vk::Win32SurfaceCreateInfoKHR {
                    hinstance: handle.hinstance.map_or(0, |hinstance| hinstance.get()) as _,
                    hwnd: handle.hwnd.get() as _,
                    ..Default::default()
                };
                let slot = target.replace();
                let result = unsafe { create_win32_surface(instance, &create_info, ptr::null(), slot) };
                ("vkCreateWin32SurfaceKHR", result)
            }
            (RawDisplayHandle::Xlib(display), RawWindowHandle::Xlib(handle)) => {
                let create_xlib_surface = entry_points.create_xlib_surface_khr()?;
                let create_info = vk::XlibSurfaceCreateInfoKHR {
                    dpy: display.display.map_or(ptr::null_mut(), |dpy| dpy.as_ptr().cast()),
                    window: handle.window,
                    ..Default::default()
                };
                let slot = target.replace();
                let result = unsafe { create_xlib_surface(instance, &create_info, ptr::null(), slot) };
                ("vkCreateXlibSurfaceKHR", result)
            }
            (display, window) => {
                return Err(JumpstartError::surface_creation(format!(
                    "Unsupported window handle for this platform: {:?} / {:?}",
                    display, window
                )));
            }
        };

        match result {
            (_, vk::Result::SUCCESS) => {
                info!("Vulkan surface created successfully: {:?}", target.get());
                Ok(())
            }
            (function, result) => Err(surface_error(function, result)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LibraryConfig;
    use raw_window_handle::{WaylandDisplayHandle, WaylandWindowHandle};
    use std::ptr::NonNull;

    #[test]
    fn surface_needs_initialized_library() {
        let state = LibraryState::new(LibraryConfig::default());
        let mut dummy = 0u8;
        let surface = NonNull::from(&mut dummy).cast();
        let display = RawDisplayHandle::Wayland(WaylandDisplayHandle::new(surface));
        let window = RawWindowHandle::Wayland(WaylandWindowHandle::new(surface));

        let mut target = ScopedHandle::new(|_: vk::SurfaceKHR| {});
        assert!(matches!(
            state.create_surface(vk::Instance::null(), display, window, &mut target),
            Err(JumpstartError::NotInitialized)
        ));
        assert!(target.is_null());
    }

    #[test]
    fn surface_error_keeps_the_result_code() {
        match surface_error("vkCreateXlibSurfaceKHR", vk::Result::ERROR_OUT_OF_HOST_MEMORY) {
            JumpstartError::SurfaceCreation { code, message } => {
                assert_eq!(code, Some(vk::Result::ERROR_OUT_OF_HOST_MEMORY.as_raw()));
                assert!(message.starts_with("vkCreateXlibSurfaceKHR"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
