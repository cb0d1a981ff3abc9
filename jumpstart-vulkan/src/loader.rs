//! Tiered resolution of Vulkan entry points.
//!
//! Exported functions come straight out of the loaded module, global functions from
//! `vkGetInstanceProcAddr(NULL, ..)`, instance functions from
//! `vkGetInstanceProcAddr(instance, ..)` and device functions from
//! `vkGetDeviceProcAddr(device, ..)`. A symbol that fails to resolve leaves its slot
//! empty and is recorded as a diagnostic; the accessor for that slot then returns
//! `UnresolvedEntryPoint` instead of handing out a null function pointer.

use std::cell::{Cell, RefCell};
use std::ffi::CStr;
use std::fmt;
use std::mem;
use std::ptr;

use ash::vk;
use jumpstart_core::{JumpstartError, JumpstartResult};
use libloading::Library;
use log::{debug, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntryPointTier {
    Exported,
    Global,
    Instance,
    Device,
}

impl fmt::Display for EntryPointTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntryPointTier::Exported => "exported",
            EntryPointTier::Global => "global",
            EntryPointTier::Instance => "instance",
            EntryPointTier::Device => "device",
        };
        f.write_str(name)
    }
}

/// A symbol a tier pass could not resolve.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntryPointDiagnostic {
    pub tier: EntryPointTier,
    pub name: &'static CStr,
}

type Resolver<'a> = dyn FnMut(&CStr) -> vk::PFN_vkVoidFunction + 'a;

macro_rules! entry_points {
    ($( $tier:ident $field:ident: $pfn:ident = $symbol:literal; )*) => {
        /// Function table filled tier by tier. Slots live in `Cell`s so passes and
        /// lookups both work through `&self`; the table is not `Sync`.
        #[derive(Default)]
        pub struct EntryPoints {
            $( $field: Cell<Option<vk::$pfn>>, )*
            diagnostics: RefCell<Vec<EntryPointDiagnostic>>,
        }

        impl EntryPoints {
            $(
                pub fn $field(&self) -> JumpstartResult<vk::$pfn> {
                    self.$field.get().ok_or_else(|| {
                        JumpstartError::UnresolvedEntryPoint($symbol.to_string_lossy().into_owned())
                    })
                }
            )*

            pub(crate) fn resolve_tier(
                &self,
                tier: EntryPointTier,
                resolve: &mut Resolver<'_>,
            ) -> Vec<EntryPointDiagnostic> {
                let mut missing = Vec::new();
                $(
                    if EntryPointTier::$tier == tier {
                        let name: &'static CStr = $symbol;
                        let function = resolve(name).map(|function| unsafe {
                            mem::transmute::<unsafe extern "system" fn(), vk::$pfn>(function)
                        });
                        if function.is_none() {
                            missing.push(EntryPointDiagnostic { tier, name });
                        }
                        self.$field.set(function);
                    }
                )*
                missing
            }

            /// Number of resolved slots in `tier`.
            pub fn resolved_count(&self, tier: EntryPointTier) -> usize {
                let mut count = 0;
                $(
                    if EntryPointTier::$tier == tier && self.$field.get().is_some() {
                        count += 1;
                    }
                )*
                count
            }
        }
    };
}

entry_points! {
    Exported get_instance_proc_addr: PFN_vkGetInstanceProcAddr = c"vkGetInstanceProcAddr";

    Global create_instance: PFN_vkCreateInstance = c"vkCreateInstance";
    Global enumerate_instance_extension_properties: PFN_vkEnumerateInstanceExtensionProperties = c"vkEnumerateInstanceExtensionProperties";
    Global enumerate_instance_layer_properties: PFN_vkEnumerateInstanceLayerProperties = c"vkEnumerateInstanceLayerProperties";
    Global enumerate_instance_version: PFN_vkEnumerateInstanceVersion = c"vkEnumerateInstanceVersion";

    Instance destroy_instance: PFN_vkDestroyInstance = c"vkDestroyInstance";
    Instance enumerate_physical_devices: PFN_vkEnumeratePhysicalDevices = c"vkEnumeratePhysicalDevices";
    Instance get_physical_device_properties: PFN_vkGetPhysicalDeviceProperties = c"vkGetPhysicalDeviceProperties";
    Instance get_physical_device_features: PFN_vkGetPhysicalDeviceFeatures = c"vkGetPhysicalDeviceFeatures";
    Instance get_physical_device_queue_family_properties: PFN_vkGetPhysicalDeviceQueueFamilyProperties = c"vkGetPhysicalDeviceQueueFamilyProperties";
    Instance enumerate_device_extension_properties: PFN_vkEnumerateDeviceExtensionProperties = c"vkEnumerateDeviceExtensionProperties";
    Instance create_device: PFN_vkCreateDevice = c"vkCreateDevice";
    Instance get_device_proc_addr: PFN_vkGetDeviceProcAddr = c"vkGetDeviceProcAddr";
    Instance destroy_surface_khr: PFN_vkDestroySurfaceKHR = c"vkDestroySurfaceKHR";
    Instance get_physical_device_surface_support_khr: PFN_vkGetPhysicalDeviceSurfaceSupportKHR = c"vkGetPhysicalDeviceSurfaceSupportKHR";
    Instance get_physical_device_surface_capabilities_khr: PFN_vkGetPhysicalDeviceSurfaceCapabilitiesKHR = c"vkGetPhysicalDeviceSurfaceCapabilitiesKHR";
    Instance get_physical_device_surface_formats_khr: PFN_vkGetPhysicalDeviceSurfaceFormatsKHR = c"vkGetPhysicalDeviceSurfaceFormatsKHR";
    Instance get_physical_device_surface_present_modes_khr: PFN_vkGetPhysicalDeviceSurfacePresentModesKHR = c"vkGetPhysicalDeviceSurfacePresentModesKHR";
    Instance create_win32_surface_khr: PFN_vkCreateWin32SurfaceKHR = c"vkCreateWin32SurfaceKHR";
    Instance create_xlib_surface_khr: PFN_vkCreateXlibSurfaceKHR = c"vkCreateXlibSurfaceKHR";
    Instance create_debug_utils_messenger_ext: PFN_vkCreateDebugUtilsMessengerEXT = c"vkCreateDebugUtilsMessengerEXT";
    Instance destroy_debug_utils_messenger_ext: PFN_vkDestroyDebugUtilsMessengerEXT = c"vkDestroyDebugUtilsMessengerEXT";

    Device destroy_device: PFN_vkDestroyDevice = c"vkDestroyDevice";
    Device get_device_queue: PFN_vkGetDeviceQueue = c"vkGetDeviceQueue";
    Device device_wait_idle: PFN_vkDeviceWaitIdle = c"vkDeviceWaitIdle";
    Device create_swapchain_khr: PFN_vkCreateSwapchainKHR = c"vkCreateSwapchainKHR";
    Device destroy_swapchain_khr: PFN_vkDestroySwapchainKHR = c"vkDestroySwapchainKHR";
    Device get_swapchain_images_khr: PFN_vkGetSwapchainImagesKHR = c"vkGetSwapchainImagesKHR";
    Device acquire_next_image_khr: PFN_vkAcquireNextImageKHR = c"vkAcquireNextImageKHR";
    Device queue_present_khr: PFN_vkQueuePresentKHR = c"vkQueuePresentKHR";
    Device create_image_view: PFN_vkCreateImageView = c"vkCreateImageView";
    Device destroy_image_view: PFN_vkDestroyImageView = c"vkDestroyImageView";
}

impl EntryPoints {
    pub fn new() -> Self {
        Self::default()
    }

    /// A table whose exported tier is `get_instance_proc_addr` instead of a module lookup.
    #[cfg(test)]
    pub(crate) fn with_instance_proc_addr(get_instance_proc_addr: vk::PFN_vkGetInstanceProcAddr) -> Self {
        let entry_points = Self::new();
        entry_points.get_instance_proc_addr.set(Some(get_instance_proc_addr));
        entry_points
    }

    /// Resolves the exported tier with a plain symbol lookup in `module`.
    pub fn load_exported(&self, module: &Library) -> Vec<EntryPointDiagnostic> {
        let missing = self.resolve_tier(EntryPointTier::Exported, &mut |name| unsafe {
            module
                .get::<unsafe extern "system" fn()>(name.to_bytes_with_nul())
                .ok()
                .map(|symbol| *symbol)
        });
        self.record(EntryPointTier::Exported, missing)
    }

    pub fn load_global(&self) -> JumpstartResult<Vec<EntryPointDiagnostic>> {
        let get_instance_proc_addr = self.get_instance_proc_addr()?;
        let missing = self.resolve_tier(EntryPointTier::Global, &mut |name| unsafe {
            get_instance_proc_addr(vk::Instance::null(), name.as_ptr())
        });
        Ok(self.record(EntryPointTier::Global, missing))
    }

    /// Resolves instance-level functions for `instance`. Running it again for a new
    /// instance overwrites the tier.
    pub fn load_instance(&self, instance: vk::Instance) -> JumpstartResult<Vec<EntryPointDiagnostic>> {
        let get_instance_proc_addr = self.get_instance_proc_addr()?;
        let missing = self.resolve_tier(EntryPointTier::Instance, &mut |name| unsafe {
            get_instance_proc_addr(instance, name.as_ptr())
        });
        Ok(self.record(EntryPointTier::Instance, missing))
    }

    /// Resolves device-level functions for `device`. Needs the instance tier first,
    /// since `vkGetDeviceProcAddr` lives there.
    pub fn load_device(&self, device: vk::Device) -> JumpstartResult<Vec<EntryPointDiagnostic>> {
        let get_device_proc_addr = self.get_device_proc_addr()?;
        let missing = self.resolve_tier(EntryPointTier::Device, &mut |name| unsafe {
            get_device_proc_addr(device, name.as_ptr())
        });
        Ok(self.record(EntryPointTier::Device, missing))
    }

    /// Symbols that failed to resolve on the latest pass of each tier.
    pub fn diagnostics(&self) -> Vec<EntryPointDiagnostic> {
        self.diagnostics.borrow().clone()
    }

    fn record(&self, tier: EntryPointTier, missing: Vec<EntryPointDiagnostic>) -> Vec<EntryPointDiagnostic> {
        for diagnostic in &missing {
            warn!("Failed to load {} function: {}", tier, diagnostic.name.to_string_lossy());
        }
        debug!(
            "Loaded {} {} functions ({} missing)",
            self.resolved_count(tier),
            tier,
            missing.len()
        );

        let mut diagnostics = self.diagnostics.borrow_mut();
        diagnostics.retain(|d| d.tier != tier);
        diagnostics.extend(missing.iter().copied());
        missing
    }
}

impl fmt::Debug for EntryPoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryPoints")
            .field("exported", &self.resolved_count(EntryPointTier::Exported))
            .field("global", &self.resolved_count(EntryPointTier::Global))
            .field("instance", &self.resolved_count(EntryPointTier::Instance))
            .field("device", &self.resolved_count(EntryPointTier::Device))
            .field("missing", &self.diagnostics.borrow().len())
            .finish()
    }
}

/// Runs a Vulkan "count, then fill" enumeration until it is not `INCOMPLETE`.
///
/// # Safety
/// `call` must forward both arguments to a Vulkan enumeration command.
pub(crate) unsafe fn read_into_vec<T>(
    mut call: impl FnMut(&mut u32, *mut T) -> vk::Result,
) -> Result<Vec<T>, vk::Result> {
    loop {
        let mut count = 0;
        call(&mut count, ptr::null_mut()).result()?;

        let mut data = Vec::with_capacity(count as usize);
        let result = call(&mut count, data.as_mut_ptr());
        if result != vk::Result::INCOMPLETE {
            result.result()?;
            unsafe { data.set_len(count as usize) };
            return Ok(data);
        }
    }
}

pub(crate) fn vk_error(operation: &'static str) -> impl FnOnce(vk::Result) -> JumpstartError {
    move |result| JumpstartError::Vulkan {
        operation,
        result: result.to_string(),
    }
}
