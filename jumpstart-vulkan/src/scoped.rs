//! [`ScopedHandle`] binders for the objects this crate creates.
//!
//! The destroy function is looked up in the entry-point table when the handle is
//! destroyed, not when the binder is made, so a wrapper can be built before the tier
//! that destroys it is loaded.

use std::ptr;

use ash::vk;
use jumpstart_core::ScopedHandle;
use log::error;

use crate::loader::EntryPoints;

impl EntryPoints {
    pub fn scoped_instance(&self) -> ScopedHandle<'_, vk::Instance> {
        ScopedHandle::new(move |instance: vk::Instance| match self.destroy_instance() {
            Ok(destroy) => unsafe { destroy(instance, ptr::null()) },
            Err(e) => error!("Leaking instance {:?}: {}", instance, e),
        })
    }

    pub fn scoped_device(&self) -> ScopedHandle<'_, vk::Device> {
        ScopedHandle::new(move |device: vk::Device| {
            match self.device_wait_idle() {
                Ok(wait_idle) => {
                    let result = unsafe { wait_idle(device) };
                    if result != vk::Result::SUCCESS {
                        error!("vkDeviceWaitIdle failed before destroying {:?}: {}", device, result);
                    }
                }
                Err(e) => error!("{}", e),
            }
            match self.destroy_device() {
                Ok(destroy) => unsafe { destroy(device, ptr::null()) },
                Err(e) => error!("Leaking device {:?}: {}", device, e),
            }
        })
    }

    pub fn scoped_surface<'a>(
        &'a self,
        instance: &'a ScopedHandle<'_, vk::Instance>,
    ) -> ScopedHandle<'a, vk::SurfaceKHR> {
        ScopedHandle::with_parent(instance, move |instance: vk::Instance, surface: vk::SurfaceKHR| {
            match self.destroy_surface_khr() {
                Ok(destroy) => unsafe { destroy(instance, surface, ptr::null()) },
                Err(e) => error!("Leaking surface {:?}: {}", surface, e),
            }
        })
    }

    pub fn scoped_debug_messenger<'a>(
        &'a self,
        instance: &'a ScopedHandle<'_, vk::Instance>,
    ) -> ScopedHandle<'a, vk::DebugUtilsMessengerEXT> {
        ScopedHandle::with_parent(instance, move |instance: vk::Instance, messenger: vk::DebugUtilsMessengerEXT| {
            match self.destroy_debug_utils_messenger_ext() {
                Ok(destroy) => unsafe { destroy(instance, messenger, ptr::null()) },
                Err(e) => error!("Leaking debug messenger {:?}: {}", messenger, e),
            }
        })
    }

    pub fn scoped_swapchain<'a>(
        &'a self,
        device: &'a ScopedHandle<'_, vk::Device>,
    ) -> ScopedHandle<'a, vk::SwapchainKHR> {
        ScopedHandle::with_parent(device, move |device: vk::Device, swapchain: vk::SwapchainKHR| {
            match self.destroy_swapchain_khr() {
                Ok(destroy) => unsafe { destroy(device, swapchain, ptr::null()) },
                Err(e) => error!("Leaking swapchain {:?}: {}", swapchain, e),
            }
        })
    }

    pub fn scoped_image_view<'a>(
        &'a self,
        device: &'a ScopedHandle<'_, vk::Device>,
    ) -> ScopedHandle<'a, vk::ImageView> {
        ScopedHandle::with_parent(device, move |device: vk::Device, view: vk::ImageView| {
            match self.destroy_image_view() {
                Ok(destroy) => unsafe { destroy(device, view, ptr::null()) },
                Err(e) => error!("Leaking image view {:?}: {}", view, e),
            }
        })
    }
}
