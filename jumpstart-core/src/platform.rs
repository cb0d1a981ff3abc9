use raw_window_handle::{RawDisplayHandle, RawWindowHandle};

use crate::window::{NativeWindowHandle, WindowConfig};
use crate::JumpstartResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlatformKind {
    Win32,
    X11,
    /// No native windowing; windows exist only as registry entries.
    Headless,
}

impl PlatformKind {
    /// The windowing system this build targets.
    pub const fn native() -> Self {
        if cfg!(target_os = "windows") {
            PlatformKind::Win32
        } else if cfg!(all(unix, not(any(target_os = "macos", target_os = "ios", target_os = "android")))) {
            PlatformKind::X11
        } else {
            PlatformKind::Headless
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlatformEvent {
    CloseRequested(NativeWindowHandle),
}

/// One windowing backend. The platform owns native window resources; the
/// `WindowSystem` owns the bookkeeping around them.
pub trait PlatformWindow {
    fn kind(&self) -> PlatformKind;

    /// Allocates a native window sized and shown according to `config`.
    fn create(&mut self, config: &WindowConfig) -> JumpstartResult<NativeWindowHandle>;

    /// Releases the native window. Unknown handles are ignored.
    fn destroy(&mut self, handle: NativeWindowHandle);

    /// Display and window handles a graphics API needs to build a presentation surface.
    fn raw_handles(
        &self,
        handle: NativeWindowHandle,
    ) -> JumpstartResult<(RawDisplayHandle, RawWindowHandle)>;

    /// Drains pending platform events without blocking, reporting the ones the
    /// substrate cares about to `sink`.
    fn poll_events(&mut self, sink: &mut dyn FnMut(PlatformEvent));
}
