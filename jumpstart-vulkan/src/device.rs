//! Physical device discovery, scoring and logical device creation.

use std::ptr;

use ash::vk;
use jumpstart_core::{JumpstartError, JumpstartResult, ScopedHandle};
use log::{debug, error, info};

use crate::library::{LibraryState, as_ptrs};
use crate::loader::{read_into_vec, vk_error};

const DISCRETE_GPU_BONUS: u32 = 10_000;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    pub graphics: Option<u32>,
    pub present: Option<u32>,
}

impl QueueFamilyIndices {
    pub fn is_complete(&self) -> bool {
        self.graphics.is_some() && self.present.is_some()
    }
}

/// Walks `families` in index order. The first family that can present becomes
/// `present`, the first with a graphics queue becomes `graphics`; the walk stops as
/// soon as both are known.
pub fn find_queue_families(
    families: &[vk::QueueFamilyProperties],
    mut supports_present: impl FnMut(u32) -> JumpstartResult<bool>,
) -> JumpstartResult<QueueFamilyIndices> {
    let mut indices = QueueFamilyIndices::default();

    for (index, family) in families.iter().enumerate() {
        let index = index as u32;

        if indices.present.is_none() && supports_present(index)? {
            indices.present = Some(index);
        }
        if indices.graphics.is_none()
            && family.queue_count > 0
            && family.queue_flags.contains(vk::QueueFlags::GRAPHICS)
        {
            indices.graphics = Some(index);
        }
        if indices.is_complete() {
            break;
        }
    }

    Ok(indices)
}

/// Everything the selector looks at for one physical device.
#[derive(Clone, Debug)]
pub struct DeviceCandidate {
    pub physical_device: vk::PhysicalDevice,
    pub properties: vk::PhysicalDeviceProperties,
    pub features: vk::PhysicalDeviceFeatures,
    pub supports_required_extensions: bool,
    pub queue_families: QueueFamilyIndices,
}

impl DeviceCandidate {
    pub fn name(&self) -> String {
        device_name(&self.properties)
    }
}

#[derive(Clone, Debug)]
pub struct SelectedDevice {
    pub physical_device: vk::PhysicalDevice,
    pub properties: vk::PhysicalDeviceProperties,
    pub graphics_family: u32,
    pub present_family: u32,
}

impl SelectedDevice {
    pub fn name(&self) -> String {
        device_name(&self.properties)
    }

    /// Graphics and present families, deduplicated.
    pub fn unique_families(&self) -> Vec<u32> {
        if self.graphics_family == self.present_family {
            vec![self.graphics_family]
        } else {
            vec![self.graphics_family, self.present_family]
        }
    }
}

fn device_name(properties: &vk::PhysicalDeviceProperties) -> String {
    properties
        .device_name_as_c_str()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[derive(Clone, Debug)]
pub struct DeviceSelector {
    pub require_geometry_shader: bool,
}

impl Default for DeviceSelector {
    fn default() -> Self {
        Self {
            require_geometry_shader: true,
        }
    }
}

impl DeviceSelector {
    /// Zero means unusable.
    pub fn score(&self, candidate: &DeviceCandidate) -> u32 {
        if self.require_geometry_shader && candidate.features.geometry_shader == vk::FALSE {
            return 0;
        }
        if !candidate.supports_required_extensions || !candidate.queue_families.is_complete() {
            return 0;
        }

        let mut score = candidate.properties.limits.max_image_dimension2_d;
        if candidate.properties.device_type == vk::PhysicalDeviceType::DISCRETE_GPU {
            score = score.saturating_add(DISCRETE_GPU_BONUS);
        }
        score
    }

    /// Highest score wins; on a tie the earlier candidate is kept.
    pub fn select_best(&self, candidates: &[DeviceCandidate]) -> JumpstartResult<SelectedDevice> {
        let mut best: Option<(&DeviceCandidate, u32)> = None;

        for candidate in candidates {
            let score = self.score(candidate);
            debug!("Device \"{}\" scored {}", candidate.name(), score);
            if score > best.map_or(0, |(_, s)| s) {
                best = Some((candidate, score));
            }
        }

        let (candidate, _) = best.ok_or(JumpstartError::NoCompatibleDevice)?;
        match (candidate.queue_families.graphics, candidate.queue_families.present) {
            (Some(graphics_family), Some(present_family)) => Ok(SelectedDevice {
                physical_device: candidate.physical_device,
                properties: candidate.properties,
                graphics_family,
                present_family,
            }),
            _ => Err(JumpstartError::NoCompatibleDevice),
        }
    }
}

impl LibraryState {
    pub fn enumerate_devices(&self, instance: vk::Instance) -> JumpstartResult<Vec<vk::PhysicalDevice>> {
        let enumerate = self.entry_points()?.enumerate_physical_devices()?;
        let devices = unsafe { read_into_vec(|count, data| enumerate(instance, count, data)) }
            .map_err(vk_error("vkEnumeratePhysicalDevices"))?;
        info!("Found {} physical devices", devices.len());
        Ok(devices)
    }

    /// Whether `physical_device` offers every required device extension.
    pub fn query_device_extension_support(&self, physical_device: vk::PhysicalDevice) -> JumpstartResult<bool> {
        let enumerate = self.entry_points()?.enumerate_device_extension_properties()?;
        let available = unsafe {
            read_into_vec(|count, data| enumerate(physical_device, ptr::null(), count, data))
        }
        .map_err(vk_error("vkEnumerateDeviceExtensionProperties"))?;

        let required = self.required_device_extensions()?;
        Ok(required.iter().all(|required| {
            available
                .iter()
                .any(|props| props.extension_name_as_c_str().is_ok_and(|name| name == *required))
        }))
    }

    pub fn query_queue_families(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> JumpstartResult<QueueFamilyIndices> {
        let entry_points = self.entry_points()?;
        let get_families = entry_points.get_physical_device_queue_family_properties()?;
        let get_support = entry_points.get_physical_device_surface_support_khr()?;

        let mut count = 0;
        unsafe { get_families(physical_device, &mut count, ptr::null_mut()) };
        let mut families = vec![vk::QueueFamilyProperties::default(); count as usize];
        unsafe { get_families(physical_device, &mut count, families.as_mut_ptr()) };
        families.truncate(count as usize);

        find_queue_families(&families, |index| {
            let mut supported = vk::FALSE;
            let result = unsafe { get_support(physical_device, index, surface, &mut supported) };
            result.result().map_err(vk_error("vkGetPhysicalDeviceSurfaceSupportKHR"))?;
            Ok(supported == vk::TRUE)
        })
    }

    /// Profiles every physical device of `instance` against `surface`.
    pub fn device_candidates(
        &self,
        instance: vk::Instance,
        surface: vk::SurfaceKHR,
    ) -> JumpstartResult<Vec<DeviceCandidate>> {
        let entry_points = self.entry_points()?;
        let get_properties = entry_points.get_physical_device_properties()?;
        let get_features = entry_points.get_physical_device_features()?;

        self.enumerate_devices(instance)?
            .into_iter()
            .map(|physical_device| {
                let mut properties = vk::PhysicalDeviceProperties::default();
                let mut features = vk::PhysicalDeviceFeatures::default();
                unsafe {
                    get_properties(physical_device, &mut properties);
                    get_features(physical_device, &mut features);
                }

                Ok(DeviceCandidate {
                    physical_device,
                    properties,
                    features,
                    supports_required_extensions: self.query_device_extension_support(physical_device)?,
                    queue_families: self.query_queue_families(physical_device, surface)?,
                })
            })
            .collect()
    }

    pub fn select_physical_device(
        &self,
        instance: vk::Instance,
        surface: vk::SurfaceKHR,
    ) -> JumpstartResult<SelectedDevice> {
        let candidates = self.device_candidates(instance, surface)?;
        let selected = DeviceSelector::default().select_best(&candidates)?;
        info!(
            "Selected device \"{}\" (graphics family {}, present family {})",
            selected.name(),
            selected.graphics_family,
            selected.present_family
        );
        Ok(selected)
    }

    /// Creates a logical device with one queue per unique family into `target`.
    pub fn create_device(
        &self,
        selected: &SelectedDevice,
        target: &mut ScopedHandle<'_, vk::Device>,
    ) -> JumpstartResult<()> {
        let create_device = self.entry_points()?.create_device()?;

        let priorities = [1.0];
        let queue_create_infos: Vec<_> = selected
            .unique_families()
            .into_iter()
            .map(|queue_family_index| vk::DeviceQueueCreateInfo {
                queue_family_index,
                p_queue_priorities: priorities.as_ptr(),
                queue_count: 1,
                ..Default::default()
            })
            .collect();

        let extension_names = as_ptrs(self.required_device_extensions()?);
        let features = vk::PhysicalDeviceFeatures::default();

        let create_info = vk::DeviceCreateInfo {
            p_queue_create_infos: queue_create_infos.as_ptr(),
            queue_create_info_count: queue_create_infos.len() as u32,
            pp_enabled_extension_names: extension_names.as_ptr(),
            enabled_extension_count: extension_names.len() as u32,
            p_enabled_features: &features,
            ..Default::default()
        };

        let slot = target.replace();
        let result = unsafe { create_device(selected.physical_device, &create_info, ptr::null(), slot) };
        if result != vk::Result::SUCCESS {
            error!("Failed to create logical device: {:?}", result);
            return Err(vk_error("vkCreateDevice")(result));
        }

        info!("Vulkan device created successfully");
        Ok(())
    }

    /// Queue 0 of `family`. Needs the device tier.
    pub fn device_queue(&self, device: vk::Device, family: u32) -> JumpstartResult<vk::Queue> {
        let get_device_queue = self.entry_points()?.get_device_queue()?;
        let mut queue = vk::Queue::null();
        unsafe { get_device_queue(device, family, 0, &mut queue) };
        Ok(queue)
    }
}
