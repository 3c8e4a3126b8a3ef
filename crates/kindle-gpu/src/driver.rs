//! The driver seam.
//!
//! Every Vulkan call made during bring-up goes through [`Driver`]. The
//! production implementation is [`crate::ash_driver::AshDriver`]; tests use a
//! recording fake.
//!
//! Enumeration calls keep Vulkan's two-call shape: invoke once without a
//! destination to learn the count, then again with a buffer of that size.
//! [`enumerate`] wraps that dance and is the only place it is spelled out.

use ash::prelude::VkResult;
use ash::vk;
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};

/// Synchronous access to the Vulkan loader and driver.
///
/// Query methods take `&self`; methods that create or destroy objects take
/// `&mut self` since implementations may need to track loaded function tables.
pub trait Driver {
    /// Instance layers, two-call shape.
    fn enumerate_instance_layers(
        &self,
        count: &mut u32,
        out: Option<&mut [vk::LayerProperties]>,
    ) -> vk::Result;

    /// Instance extensions, two-call shape.
    fn enumerate_instance_extensions(
        &self,
        count: &mut u32,
        out: Option<&mut [vk::ExtensionProperties]>,
    ) -> vk::Result;

    /// Physical devices of `instance`, two-call shape.
    fn enumerate_physical_devices(
        &self,
        instance: vk::Instance,
        count: &mut u32,
        out: Option<&mut [vk::PhysicalDevice]>,
    ) -> vk::Result;

    /// Device extensions of `device`, two-call shape.
    fn enumerate_device_extensions(
        &self,
        device: vk::PhysicalDevice,
        count: &mut u32,
        out: Option<&mut [vk::ExtensionProperties]>,
    ) -> vk::Result;

    /// Queue family properties of `device`, two-call shape. Cannot fail.
    fn queue_family_properties(
        &self,
        device: vk::PhysicalDevice,
        count: &mut u32,
        out: Option<&mut [vk::QueueFamilyProperties]>,
    );

    /// Surface formats supported by `device` for `surface`, two-call shape.
    fn surface_formats(
        &self,
        device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        count: &mut u32,
        out: Option<&mut [vk::SurfaceFormatKHR]>,
    ) -> vk::Result;

    /// Present modes supported by `device` for `surface`, two-call shape.
    fn surface_present_modes(
        &self,
        device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        count: &mut u32,
        out: Option<&mut [vk::PresentModeKHR]>,
    ) -> vk::Result;

    /// Images owned by `swapchain`, two-call shape.
    fn swapchain_images(
        &self,
        device: vk::Device,
        swapchain: vk::SwapchainKHR,
        count: &mut u32,
        out: Option<&mut [vk::Image]>,
    ) -> vk::Result;

    /// Whether queue family `family` of `device` can present to `surface`.
    fn surface_support(
        &self,
        device: vk::PhysicalDevice,
        family: u32,
        surface: vk::SurfaceKHR,
    ) -> VkResult<bool>;

    /// Surface capabilities of `device` for `surface`.
    fn surface_capabilities(
        &self,
        device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<vk::SurfaceCapabilitiesKHR>;

    /// Static properties (name, vendor, type, API version) of `device`.
    fn physical_device_properties(
        &self,
        device: vk::PhysicalDevice,
    ) -> vk::PhysicalDeviceProperties;

    fn create_instance(&mut self, info: &vk::InstanceCreateInfo<'_>) -> VkResult<vk::Instance>;

    fn create_surface(
        &mut self,
        instance: vk::Instance,
        display: RawDisplayHandle,
        window: RawWindowHandle,
    ) -> VkResult<vk::SurfaceKHR>;

    fn create_device(
        &mut self,
        physical_device: vk::PhysicalDevice,
        info: &vk::DeviceCreateInfo<'_>,
    ) -> VkResult<vk::Device>;

    fn device_queue(&self, device: vk::Device, family: u32, index: u32) -> vk::Queue;

    fn create_swapchain(
        &mut self,
        device: vk::Device,
        info: &vk::SwapchainCreateInfoKHR<'_>,
    ) -> VkResult<vk::SwapchainKHR>;

    fn create_image_view(
        &mut self,
        device: vk::Device,
        info: &vk::ImageViewCreateInfo<'_>,
    ) -> VkResult<vk::ImageView>;

    fn destroy_image_view(&mut self, device: vk::Device, view: vk::ImageView);

    fn destroy_swapchain(&mut self, device: vk::Device, swapchain: vk::SwapchainKHR);

    fn destroy_device(&mut self, device: vk::Device);

    fn destroy_surface(&mut self, instance: vk::Instance, surface: vk::SurfaceKHR);

    fn destroy_instance(&mut self, instance: vk::Instance);
}

/// Run a two-call enumeration and return the filled sequence.
///
/// `call` receives the count slot and either no destination (first call) or a
/// buffer sized from the first call. A failing status at either step yields an
/// empty sequence. `INCOMPLETE` keeps whatever was written.
pub fn enumerate<T, F>(mut call: F) -> Vec<T>
where
    T: Default + Clone,
    F: FnMut(&mut u32, Option<&mut [T]>) -> vk::Result,
{
    let mut count = 0u32;
    let status = call(&mut count, None);
    if status != vk::Result::SUCCESS {
        tracing::warn!("Enumeration count query failed: {status}");
        return Vec::new();
    }
    if count == 0 {
        return Vec::new();
    }

    let mut items = vec![T::default(); count as usize];
    let status = call(&mut count, Some(&mut items));
    match status {
        vk::Result::SUCCESS | vk::Result::INCOMPLETE => {
            items.truncate(count as usize);
            items
        }
        status => {
            tracing::warn!("Enumeration fetch failed: {status}");
            Vec::new()
        }
    }
}
