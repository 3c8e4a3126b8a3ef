//! Swapchain management.

use crate::capabilities::SurfaceSupport;
use crate::device::QueueFamilies;
use crate::driver::{enumerate, Driver};
use crate::error::{GpuError, Result};
use ash::vk;

/// Swapchain wrapper.
///
/// Images belong to the swapchain; the views are ours and must be destroyed
/// before the swapchain handle.
#[derive(Debug)]
pub struct Swapchain {
    pub swapchain: vk::SwapchainKHR,
    pub images: Vec<vk::Image>,
    pub image_views: Vec<vk::ImageView>,
    pub surface_format: vk::SurfaceFormatKHR,
    pub present_mode: vk::PresentModeKHR,
    pub extent: vk::Extent2D,
    pub sharing: ImageSharing,
}

impl Swapchain {
    /// Chosen image format.
    pub fn format(&self) -> vk::Format {
        self.surface_format.format
    }

    /// Destroy the image views (newest first), then the swapchain.
    pub fn destroy<D: Driver>(self, driver: &mut D, device: vk::Device) {
        for &view in self.image_views.iter().rev() {
            driver.destroy_image_view(device, view);
        }
        driver.destroy_swapchain(device, self.swapchain);
    }
}

/// How swapchain images are shared between queue families.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSharing {
    pub mode: vk::SharingMode,
    /// Families with access; empty for exclusive ownership.
    pub queue_families: Vec<u32>,
}

/// Select the surface format.
///
/// The first 8-bit BGRA sRGB / sRGB-nonlinear pair wins; otherwise the first
/// reported format.
pub fn select_surface_format(available: &[vk::SurfaceFormatKHR]) -> vk::SurfaceFormatKHR {
    // Prefer SRGB
    for format in available {
        if format.format == vk::Format::B8G8R8A8_SRGB
            && format.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        {
            return *format;
        }
    }

    // Fall back to first available
    available.first().copied().unwrap_or_default()
}

/// Select the present mode: mailbox when offered, otherwise FIFO.
pub fn select_present_mode(available: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    if available.contains(&vk::PresentModeKHR::MAILBOX) {
        vk::PresentModeKHR::MAILBOX
    } else {
        // FIFO support is mandatory
        vk::PresentModeKHR::FIFO
    }
}

/// Calculate swapchain extent.
///
/// A current extent of `u32::MAX` means the window system lets the swapchain
/// decide; the framebuffer size is then clamped into the supported range.
pub fn calculate_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    framebuffer: vk::Extent2D,
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        capabilities.current_extent
    } else {
        let min = capabilities.min_image_extent;
        let max = capabilities.max_image_extent;
        vk::Extent2D {
            width: framebuffer.width.max(min.width).min(max.width),
            height: framebuffer.height.max(min.height).min(max.height),
        }
    }
}

/// One image more than the minimum, unless the surface caps it lower.
/// A maximum of zero means "no limit".
pub fn select_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let mut image_count = capabilities.min_image_count.saturating_add(1);
    if capabilities.max_image_count > 0 && image_count > capabilities.max_image_count {
        image_count = capabilities.max_image_count;
    }
    image_count
}

/// Concurrent sharing across both families when they differ, exclusive
/// otherwise.
pub fn select_sharing_mode(families: QueueFamilies) -> ImageSharing {
    if families.is_split() {
        ImageSharing {
            mode: vk::SharingMode::CONCURRENT,
            queue_families: vec![families.graphics, families.present],
        }
    } else {
        ImageSharing {
            mode: vk::SharingMode::EXCLUSIVE,
            queue_families: Vec::new(),
        }
    }
}

/// Create a swapchain for `surface` and fetch its images.
///
/// The returned swapchain has no image views yet; see [`create_image_views`].
pub fn create_swapchain<D: Driver>(
    driver: &mut D,
    device: vk::Device,
    surface: vk::SurfaceKHR,
    support: &SurfaceSupport,
    queue_families: QueueFamilies,
    framebuffer: vk::Extent2D,
) -> Result<Swapchain> {
    let capabilities = &support.capabilities;
    let surface_format = select_surface_format(&support.formats);
    let present_mode = select_present_mode(&support.present_modes);
    let extent = calculate_extent(capabilities, framebuffer);
    let image_count = select_image_count(capabilities);
    let sharing = select_sharing_mode(queue_families);

    let mut create_info = vk::SwapchainCreateInfoKHR::default()
        .surface(surface)
        .min_image_count(image_count)
        .image_format(surface_format.format)
        .image_color_space(surface_format.color_space)
        .image_extent(extent)
        .image_array_layers(1)
        .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
        .image_sharing_mode(sharing.mode)
        .pre_transform(capabilities.current_transform)
        .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
        .present_mode(present_mode)
        .clipped(true)
        .old_swapchain(vk::SwapchainKHR::null());
    if sharing.mode == vk::SharingMode::CONCURRENT {
        create_info = create_info.queue_family_indices(&sharing.queue_families);
    }

    let swapchain = driver
        .create_swapchain(device, &create_info)
        .map_err(GpuError::SwapchainCreationFailed)?;

    // Get swapchain images; the driver may hand out more than requested
    let images = enumerate(|count, out| driver.swapchain_images(device, swapchain, count, out));

    tracing::info!(
        "Swapchain created: {}x{} ({} images, {:?}, {:?})",
        extent.width,
        extent.height,
        images.len(),
        surface_format.format,
        present_mode
    );

    Ok(Swapchain {
        swapchain,
        images,
        image_views: Vec::new(),
        surface_format,
        present_mode,
        extent,
        sharing,
    })
}

/// Create one 2D color view per image.
///
/// All or nothing: if any view fails, the ones already created are destroyed
/// before the error is returned.
pub fn create_image_views<D: Driver>(
    driver: &mut D,
    device: vk::Device,
    images: &[vk::Image],
    format: vk::Format,
) -> Result<Vec<vk::ImageView>> {
    let mut views = Vec::with_capacity(images.len());

    for (index, &image) in images.iter().enumerate() {
        let view_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .components(vk::ComponentMapping::default())
            .subresource_range(
                vk::ImageSubresourceRange::default()
                    .aspect_mask(vk::ImageAspectFlags::COLOR)
                    .base_mip_level(0)
                    .level_count(1)
                    .base_array_layer(0)
                    .layer_count(1),
            );

        match driver.create_image_view(device, &view_info) {
            Ok(view) => views.push(view),
            Err(result) => {
                for &view in views.iter().rev() {
                    driver.destroy_image_view(device, view);
                }
                return Err(GpuError::ImageViewCreationFailed { index, result });
            }
        }
    }

    Ok(views)
}
