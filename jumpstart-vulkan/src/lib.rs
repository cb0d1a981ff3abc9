pub mod loader;
pub mod library;
pub mod device;
pub mod swapchain;
pub mod surface;
pub mod scoped;
pub mod debug;
pub mod context;

pub use loader::{EntryPointDiagnostic, EntryPointTier, EntryPoints};
pub use library::{
    InstanceDescriptor, LibraryConfig, LibraryState, VALIDATION_LAYER, missing_layers, required_device_extensions,
    required_instance_extensions, required_instance_layers,
};
pub use device::{DeviceCandidate, DeviceSelector, QueueFamilyIndices, SelectedDevice, find_queue_families};
pub use swapchain::{
    PREFERRED_FORMAT, SwapchainPlan, SwapchainSupport, negotiate, select_extent, select_format, select_image_count,
    select_present_mode,
};
pub use context::{Jumpstart, WindowsMut};
