//! Swapchain negotiation.
//!
//! The selection functions are pure and only look at what the surface reported;
//! [`LibraryState::query_swapchain_support`] gathers that report from the driver.

use std::ptr;

use ash::vk;
use jumpstart_core::{JumpstartError, JumpstartResult, ScopedHandle};
use log::{debug, error, info};

use crate::library::LibraryState;
use crate::loader::{read_into_vec, vk_error};

pub const PREFERRED_FORMAT: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
    format: vk::Format::B8G8R8A8_UNORM,
    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
};

#[derive(Clone, Debug, Default)]
pub struct SwapchainSupport {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SwapchainSupport {
    pub fn is_adequate(&self) -> bool {
        !self.formats.is_empty() && !self.present_modes.is_empty()
    }
}

fn is_preferred(format: &vk::SurfaceFormatKHR) -> bool {
    format.format == PREFERRED_FORMAT.format && format.color_space == PREFERRED_FORMAT.color_space
}

/// A lone `UNDEFINED` entry means the surface takes any format.
pub fn select_format(formats: &[vk::SurfaceFormatKHR]) -> JumpstartResult<vk::SurfaceFormatKHR> {
    match formats {
        [] => Err(JumpstartError::UnsupportedSwapchain),
        [only] if only.format == vk::Format::UNDEFINED => Ok(PREFERRED_FORMAT),
        _ => Ok(formats.iter().copied().find(is_preferred).unwrap_or(formats[0])),
    }
}

pub fn select_present_mode(present_modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    [vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::IMMEDIATE]
        .into_iter()
        .find(|mode| present_modes.contains(mode))
        .unwrap_or(vk::PresentModeKHR::FIFO)
}

pub fn select_extent(capabilities: &vk::SurfaceCapabilitiesKHR, width: u32, height: u32) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        return capabilities.current_extent;
    }

    let min = capabilities.min_image_extent;
    let max = capabilities.max_image_extent;
    vk::Extent2D {
        width: width.clamp(min.width, max.width.max(min.width)),
        height: height.clamp(min.height, max.height.max(min.height)),
    }
}

/// One image above the minimum, limited by the maximum when there is one.
pub fn select_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let count = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 {
        count.min(capabilities.max_image_count)
    } else {
        count
    }
}

#[derive(Clone, Copy, Debug)]
pub struct SwapchainPlan {
    pub format: vk::SurfaceFormatKHR,
    pub present_mode: vk::PresentModeKHR,
    pub extent: vk::Extent2D,
    pub image_count: u32,
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
}

pub fn negotiate(support: &SwapchainSupport, width: u32, height: u32) -> JumpstartResult<SwapchainPlan> {
    if !support.is_adequate() {
        return Err(JumpstartError::UnsupportedSwapchain);
    }

    let plan = SwapchainPlan {
        format: select_format(&support.formats)?,
        present_mode: select_present_mode(&support.present_modes),
        extent: select_extent(&support.capabilities, width, height),
        image_count: select_image_count(&support.capabilities),
        pre_transform: support.capabilities.current_transform,
    };
    debug!("Negotiated swapchain: {:?}", plan);
    Ok(plan)
}

impl SwapchainPlan {
    /// `queue_families` is `[graphics, present]`; distinct families share the images
    /// concurrently.
    pub fn create_info<'a>(
        &self,
        surface: vk::SurfaceKHR,
        queue_families: &'a [u32; 2],
    ) -> vk::SwapchainCreateInfoKHR<'a> {
        let info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface)
            .min_image_count(self.image_count)
            .image_format(self.format.format)
            .image_color_space(self.format.color_space)
            .image_extent(self.extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .pre_transform(self.pre_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(self.present_mode)
            .clipped(true);

        if queue_families[0] != queue_families[1] {
            info.image_sharing_mode(vk::SharingMode::CONCURRENT)
                .queue_family_indices(queue_families)
        } else {
            info.image_sharing_mode(vk::SharingMode::EXCLUSIVE)
        }
    }
}

impl LibraryState {
    pub fn query_swapchain_support(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> JumpstartResult<SwapchainSupport> {
        let entry_points = self.entry_points()?;
        let get_capabilities = entry_points.get_physical_device_surface_capabilities_khr()?;
        let get_formats = entry_points.get_physical_device_surface_formats_khr()?;
        let get_present_modes = entry_points.get_physical_device_surface_present_modes_khr()?;

        let mut capabilities = vk::SurfaceCapabilitiesKHR::default();
        let result = unsafe { get_capabilities(physical_device, surface, &mut capabilities) };
        result
            .result()
            .map_err(vk_error("vkGetPhysicalDeviceSurfaceCapabilitiesKHR"))?;

        let formats = unsafe { read_into_vec(|count, data| get_formats(physical_device, surface, count, data)) }
            .map_err(vk_error("vkGetPhysicalDeviceSurfaceFormatsKHR"))?;
        let present_modes =
            unsafe { read_into_vec(|count, data| get_present_modes(physical_device, surface, count, data)) }
                .map_err(vk_error("vkGetPhysicalDeviceSurfacePresentModesKHR"))?;

        Ok(SwapchainSupport {
            capabilities,
            formats,
            present_modes,
        })
    }

    /// Creates a swapchain for `plan` into `target`. Needs the device tier.
    pub fn create_swapchain(
        &self,
        device: vk::Device,
        surface: vk::SurfaceKHR,
        plan: &SwapchainPlan,
        queue_families: &[u32; 2],
        target: &mut ScopedHandle<'_, vk::SwapchainKHR>,
    ) -> JumpstartResult<()> {
        let create_swapchain = self.entry_points()?.create_swapchain_khr()?;
        let create_info = plan.create_info(surface, queue_families);

        let slot = target.replace();
        let result = unsafe { create_swapchain(device, &create_info, ptr::null(), slot) };
        if result != vk::Result::SUCCESS {
            error!("Failed to create swapchain: {:?}", result);
            return Err(vk_error("vkCreateSwapchainKHR")(result));
        }

        info!(
            "Swapchain created: {}x{}, {} images, {:?}",
            plan.extent.width, plan.extent.height, plan.image_count, plan.present_mode
        );
        Ok(())
    }

    pub fn swapchain_images(&self, device: vk::Device, swapchain: vk::SwapchainKHR) -> JumpstartResult<Vec<vk::Image>> {
        let get_images = self.entry_points()?.get_swapchain_images_khr()?;
        let images = unsafe { read_into_vec(|count, data| get_images(device, swapchain, count, data)) };
        images.map_err(vk_error("vkGetSwapchainImagesKHR"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(format: vk::Format, color_space: vk::ColorSpaceKHR) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR { format, color_space }
    }

    fn free_extent(min: (u32, u32), max: (u32, u32)) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D { width: u32::MAX, height: u32::MAX },
            min_image_extent: vk::Extent2D { width: min.0, height: min.1 },
            max_image_extent: vk::Extent2D { width: max.0, height: max.1 },
            ..Default::default()
        }
    }

    fn support(formats: Vec<vk::SurfaceFormatKHR>, present_modes: Vec<vk::PresentModeKHR>) -> SwapchainSupport {
        SwapchainSupport {
            capabilities: vk::SurfaceCapabilitiesKHR {
                min_image_count: 2,
                max_image_count: 3,
                current_extent: vk::Extent2D { width: 1280, height: 720 },
                current_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
                ..Default::default()
            },
            formats,
            present_modes,
        }
    }

    #[test]
    fn undefined_format_means_preferred() {
        let chosen = select_format(&[format(vk::Format::UNDEFINED, vk::ColorSpaceKHR::SRGB_NONLINEAR)]).unwrap();
        assert!(is_preferred(&chosen));
    }

    #[test]
    fn preferred_format_is_found_anywhere() {
        let formats = [
            format(vk::Format::R8G8B8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            format(vk::Format::B8G8R8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        ];
        assert!(is_preferred(&select_format(&formats).unwrap()));
    }

    #[test]
    fn first_format_is_the_fallback() {
        let formats = [
            format(vk::Format::R16G16B16A16_SFLOAT, vk::ColorSpaceKHR::EXTENDED_SRGB_LINEAR_EXT),
            format(vk::Format::B8G8R8A8_UNORM, vk::ColorSpaceKHR::DISPLAY_P3_NONLINEAR_EXT),
        ];
        let chosen = select_format(&formats).unwrap();
        assert_eq!(chosen.format, vk::Format::R16G16B16A16_SFLOAT);
        assert_eq!(chosen.color_space, vk::ColorSpaceKHR::EXTENDED_SRGB_LINEAR_EXT);
    }

    #[test]
    fn no_formats_is_unsupported() {
        assert!(matches!(select_format(&[]), Err(JumpstartError::UnsupportedSwapchain)));
    }

    #[test]
    fn present_mode_preference() {
        use vk::PresentModeKHR as Mode;
        assert_eq!(select_present_mode(&[]), Mode::FIFO);
        assert_eq!(select_present_mode(&[Mode::MAILBOX, Mode::FIFO]), Mode::MAILBOX);
        assert_eq!(select_present_mode(&[Mode::IMMEDIATE, Mode::FIFO]), Mode::IMMEDIATE);
        assert_eq!(select_present_mode(&[Mode::IMMEDIATE, Mode::MAILBOX]), Mode::MAILBOX);
        assert_eq!(select_present_mode(&[Mode::FIFO_RELAXED]), Mode::FIFO);
    }

    #[test]
    fn fixed_extent_is_used_verbatim() {
        let capabilities = vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D { width: 1920, height: 1080 },
            ..Default::default()
        };
        let extent = select_extent(&capabilities, 800, 600);
        assert_eq!((extent.width, extent.height), (1920, 1080));
    }

    #[test]
    fn free_extent_is_clamped_per_axis() {
        let capabilities = free_extent((100, 50), (1000, 400));

        let extent = select_extent(&capabilities, 5000, 10);
        assert_eq!((extent.width, extent.height), (1000, 50));

        let extent = select_extent(&capabilities, 10, 5000);
        assert_eq!((extent.width, extent.height), (100, 400));

        let extent = select_extent(&capabilities, 640, 300);
        assert_eq!((extent.width, extent.height), (640, 300));
    }

    #[test]
    fn image_count_respects_maximum() {
        let mut capabilities = vk::SurfaceCapabilitiesKHR {
            min_image_count: 2,
            max_image_count: 0,
            ..Default::default()
        };
        assert_eq!(select_image_count(&capabilities), 3);

        capabilities.max_image_count = 2;
        assert_eq!(select_image_count(&capabilities), 2);

        capabilities.max_image_count = 8;
        assert_eq!(select_image_count(&capabilities), 3);
    }

    #[test]
    fn negotiate_combines_selections() {
        let support = support(
            vec![format(vk::Format::B8G8R8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR)],
            vec![vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX],
        );
        let plan = negotiate(&support, 800, 600).unwrap();
        assert!(is_preferred(&plan.format));
        assert_eq!(plan.present_mode, vk::PresentModeKHR::MAILBOX);
        assert_eq!((plan.extent.width, plan.extent.height), (1280, 720));
        assert_eq!(plan.image_count, 3);
        assert_eq!(plan.pre_transform, vk::SurfaceTransformFlagsKHR::IDENTITY);
    }

    #[test]
    fn negotiate_rejects_empty_lists() {
        let no_modes = support(
            vec![format(vk::Format::B8G8R8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR)],
            vec![],
        );
        assert!(matches!(negotiate(&no_modes, 1, 1), Err(JumpstartError::UnsupportedSwapchain)));

        let no_formats = support(vec![], vec![vk::PresentModeKHR::FIFO]);
        assert!(matches!(negotiate(&no_formats, 1, 1), Err(JumpstartError::UnsupportedSwapchain)));
    }

    #[test]
    fn create_info_shares_between_distinct_families() {
        let support = support(
            vec![format(vk::Format::B8G8R8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR)],
            vec![vk::PresentModeKHR::FIFO],
        );
        let plan = negotiate(&support, 800, 600).unwrap();

        let shared = [0, 1];
        let info = plan.create_info(vk::SurfaceKHR::null(), &shared);
        assert_eq!(info.image_sharing_mode, vk::SharingMode::CONCURRENT);
        assert_eq!(info.queue_family_index_count, 2);
        assert_eq!(info.min_image_count, 3);
        assert_eq!(info.clipped, vk::TRUE);

        let same = [1, 1];
        let info = plan.create_info(vk::SurfaceKHR::null(), &same);
        assert_eq!(info.image_sharing_mode, vk::SharingMode::EXCLUSIVE);
        assert_eq!(info.queue_family_index_count, 0);
    }
}
