use std::thread;
use std::time::Duration;

use jumpstart_core::Window;
use jumpstart_platform::NativePlatform;
use jumpstart_vulkan::{InstanceDescriptor, Jumpstart, LibraryConfig, LibraryState, WindowsMut, negotiate};
use log::{debug, info};

fn run(library: &LibraryState, windows: &mut WindowsMut<'_, NativePlatform>, window: &Window) -> anyhow::Result<()> {
    let entry_points = library.entry_points()?;

    let mut instance = entry_points.scoped_instance();
    library.create_instance(&InstanceDescriptor::new("Hello Window"), &mut instance)?;
    library.load_instance_entry_points(*instance)?;

    let mut messenger = entry_points.scoped_debug_messenger(&instance);
    library.create_debug_messenger(*instance, &mut messenger)?;

    let mut surface = entry_points.scoped_surface(&instance);
    let (display_handle, window_handle) = windows.raw_handles(window)?;
    library.create_surface(*instance, display_handle, window_handle, &mut surface)?;

    let selected = library.select_physical_device(*instance, *surface)?;
    let mut device = entry_points.scoped_device();
    library.create_device(&selected, &mut device)?;
    library.load_device_entry_points(*device)?;

    let graphics_queue = library.device_queue(*device, selected.graphics_family)?;
    let present_queue = library.device_queue(*device, selected.present_family)?;
    debug!("Graphics queue {:?}, present queue {:?}", graphics_queue, present_queue);

    let support = library.query_swapchain_support(selected.physical_device, *surface)?;
    let (width, height) = window.resolution();
    let plan = negotiate(&support, width, height)?;

    let queue_families = [selected.graphics_family, selected.present_family];
    let mut swapchain = entry_points.scoped_swapchain(&device);
    library.create_swapchain(*device, *surface, &plan, &queue_families, &mut swapchain)?;
    let images = library.swapchain_images(*device, *swapchain)?;
    info!("Swapchain ready with {} images", images.len());

    while !window.should_close() {
        windows.poll_events();
        thread::sleep(Duration::from_millis(16));
    }

    info!("Close requested, shutting down");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    info!("Starting Hello Window Example");

    let mut context = Jumpstart::new(LibraryConfig::default(), NativePlatform::new()?);
    context.initialize()?;

    let mut window = context.create_window(800, 600, "Jumpstart - Hello Window")?;
    let (library, mut windows) = context.split_mut();
    // Vulkan objects are released inside run(), before the window they present to.
    let result = run(library, &mut windows, &window);
    windows.destroy_window(&mut window);
    result?;

    context.teardown();
    Ok(())
}
