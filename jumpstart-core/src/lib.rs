pub mod error;
pub mod handle;
pub mod window;
pub mod registry;
pub mod platform;
pub mod headless;
pub mod system;

pub use error::{JumpstartError, JumpstartResult};
pub use handle::{RawHandle, ScopedHandle};
pub use window::{NativeWindowHandle, Window, WindowConfig, WindowState};
pub use registry::WindowRegistry;
pub use platform::{PlatformEvent, PlatformKind, PlatformWindow};
pub use headless::HeadlessPlatform;
pub use system::WindowSystem;
