use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// Opaque native window handle (HWND on Win32, XID on X11, a counter for headless).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NativeWindowHandle(pub u64);

impl fmt::Display for NativeWindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub visible: bool,
}

impl WindowConfig {
    pub fn new(width: u32, height: u32, title: impl Into<String>) -> Self {
        Self {
            width,
            height,
            title: title.into(),
            visible: true,
        }
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }
}

/// State mutated by event dispatch. Shared between the [`Window`] and the registry.
#[derive(Debug, Default)]
pub struct WindowState {
    should_close: Cell<bool>,
}

impl WindowState {
    pub fn should_close(&self) -> bool {
        self.should_close.get()
    }

    pub fn request_close(&self) {
        self.should_close.set(true);
    }
}

/// A platform window owned by its creator until passed to `destroy_window`.
///
/// Dropping it without `destroy_window` leaves the native window open until the next
/// `poll_events` of the system that created it.
#[derive(Debug)]
pub struct Window {
    pub(crate) handle: Option<NativeWindowHandle>,
    pub(crate) config: WindowConfig,
    pub(crate) state: Rc<WindowState>,
}

impl Window {
    pub(crate) fn new(handle: NativeWindowHandle, config: WindowConfig) -> Self {
        Self {
            handle: Some(handle),
            config,
            state: Rc::new(WindowState::default()),
        }
    }

    /// `None` once the window has been destroyed.
    pub fn handle(&self) -> Option<NativeWindowHandle> {
        self.handle
    }

    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    pub fn title(&self) -> &str {
        &self.config.title
    }

    pub fn resolution(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    pub fn should_close(&self) -> bool {
        self.state.should_close()
    }

    pub fn is_destroyed(&self) -> bool {
        self.handle.is_none()
    }
}
