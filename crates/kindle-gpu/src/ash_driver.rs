//! [`Driver`] backed by the system Vulkan loader through ash.
//!
//! Holds the instance and device function tables once those objects exist.
//! Calls that need a table which has not been loaded yet fail with
//! `ERROR_INITIALIZATION_FAILED` (or return an empty/default answer where the
//! Vulkan call cannot fail).

use crate::driver::Driver;
use crate::error::{GpuError, Result};
use ash::prelude::VkResult;
use ash::vk;
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};

/// Destination pointer for the second half of a two-call enumeration.
fn out_ptr<T>(out: Option<&mut [T]>) -> *mut T {
    out.map_or(std::ptr::null_mut(), <[T]>::as_mut_ptr)
}

const NOT_LOADED: vk::Result = vk::Result::ERROR_INITIALIZATION_FAILED;

/// Vulkan driver loaded at runtime.
pub struct AshDriver {
    entry: ash::Entry,
    instance: Option<ash::Instance>,
    surface_loader: Option<ash::khr::surface::Instance>,
    device: Option<ash::Device>,
    swapchain_loader: Option<ash::khr::swapchain::Device>,
}

impl AshDriver {
    /// Load the Vulkan loader library.
    pub fn load() -> Result<Self> {
        // SAFETY: the loaded library stays alive as long as `entry`.
        let entry = unsafe { ash::Entry::load() }
            .map_err(|e| GpuError::EnvironmentUnavailable(format!("Failed to load Vulkan: {e}")))?;

        Ok(Self {
            entry,
            instance: None,
            surface_loader: None,
            device: None,
            swapchain_loader: None,
        })
    }
}

impl Driver for AshDriver {
    fn enumerate_instance_layers(
        &self,
        count: &mut u32,
        out: Option<&mut [vk::LayerProperties]>,
    ) -> vk::Result {
        unsafe { (self.entry.fp_v1_0().enumerate_instance_layer_properties)(count, out_ptr(out)) }
    }

    fn enumerate_instance_extensions(
        &self,
        count: &mut u32,
        out: Option<&mut [vk::ExtensionProperties]>,
    ) -> vk::Result {
        unsafe {
            (self.entry.fp_v1_0().enumerate_instance_extension_properties)(
                std::ptr::null(),
                count,
                out_ptr(out),
            )
        }
    }

    fn enumerate_physical_devices(
        &self,
        instance: vk::Instance,
        count: &mut u32,
        out: Option<&mut [vk::PhysicalDevice]>,
    ) -> vk::Result {
        let Some(loaded) = &self.instance else {
            return NOT_LOADED;
        };
        unsafe { (loaded.fp_v1_0().enumerate_physical_devices)(instance, count, out_ptr(out)) }
    }

    fn enumerate_device_extensions(
        &self,
        device: vk::PhysicalDevice,
        count: &mut u32,
        out: Option<&mut [vk::ExtensionProperties]>,
    ) -> vk::Result {
        let Some(instance) = &self.instance else {
            return NOT_LOADED;
        };
        unsafe {
            (instance.fp_v1_0().enumerate_device_extension_properties)(
                device,
                std::ptr::null(),
                count,
                out_ptr(out),
            )
        }
    }

    fn queue_family_properties(
        &self,
        device: vk::PhysicalDevice,
        count: &mut u32,
        out: Option<&mut [vk::QueueFamilyProperties]>,
    ) {
        let Some(instance) = &self.instance else {
            *count = 0;
            return;
        };
        unsafe {
            (instance.fp_v1_0().get_physical_device_queue_family_properties)(
                device,
                count,
                out_ptr(out),
            );
        }
    }

    fn surface_formats(
        &self,
        device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        count: &mut u32,
        out: Option<&mut [vk::SurfaceFormatKHR]>,
    ) -> vk::Result {
        let Some(loader) = &self.surface_loader else {
            return NOT_LOADED;
        };
        unsafe {
            (loader.fp().get_physical_device_surface_formats_khr)(
                device,
                surface,
                count,
                out_ptr(out),
            )
        }
    }

    fn surface_present_modes(
        &self,
        device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        count: &mut u32,
        out: Option<&mut [vk::PresentModeKHR]>,
    ) -> vk::Result {
        let Some(loader) = &self.surface_loader else {
            return NOT_LOADED;
        };
        unsafe {
            (loader.fp().get_physical_device_surface_present_modes_khr)(
                device,
                surface,
                count,
                out_ptr(out),
            )
        }
    }

    fn swapchain_images(
        &self,
        device: vk::Device,
        swapchain: vk::SwapchainKHR,
        count: &mut u32,
        out: Option<&mut [vk::Image]>,
    ) -> vk::Result {
        let Some(loader) = &self.swapchain_loader else {
            return NOT_LOADED;
        };
        unsafe { (loader.fp().get_swapchain_images_khr)(device, swapchain, count, out_ptr(out)) }
    }

    fn surface_support(
        &self,
        device: vk::PhysicalDevice,
        family: u32,
        surface: vk::SurfaceKHR,
    ) -> VkResult<bool> {
        let loader = self.surface_loader.as_ref().ok_or(NOT_LOADED)?;
        unsafe { loader.get_physical_device_surface_support(device, family, surface) }
    }

    fn surface_capabilities(
        &self,
        device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<vk::SurfaceCapabilitiesKHR> {
        let loader = self.surface_loader.as_ref().ok_or(NOT_LOADED)?;
        unsafe { loader.get_physical_device_surface_capabilities(device, surface) }
    }

    fn physical_device_properties(
        &self,
        device: vk::PhysicalDevice,
    ) -> vk::PhysicalDeviceProperties {
        self.instance
            .as_ref()
            .map(|instance| unsafe { instance.get_physical_device_properties(device) })
            .unwrap_or_default()
    }

    fn create_instance(&mut self, info: &vk::InstanceCreateInfo<'_>) -> VkResult<vk::Instance> {
        let instance = unsafe { self.entry.create_instance(info, None) }?;
        let handle = instance.handle();

        self.surface_loader = Some(ash::khr::surface::Instance::new(&self.entry, &instance));
        self.instance = Some(instance);
        Ok(handle)
    }

    fn create_surface(
        &mut self,
        _instance: vk::Instance,
        display: RawDisplayHandle,
        window: RawWindowHandle,
    ) -> VkResult<vk::SurfaceKHR> {
        let instance = self.instance.as_ref().ok_or(NOT_LOADED)?;
        // SAFETY: the caller keeps the window alive until the surface is destroyed.
        unsafe { ash_window::create_surface(&self.entry, instance, display, window, None) }
    }

    fn create_device(
        &mut self,
        physical_device: vk::PhysicalDevice,
        info: &vk::DeviceCreateInfo<'_>,
    ) -> VkResult<vk::Device> {
        let instance = self.instance.as_ref().ok_or(NOT_LOADED)?;
        let device = unsafe { instance.create_device(physical_device, info, None) }?;
        let handle = device.handle();

        self.swapchain_loader = Some(ash::khr::swapchain::Device::new(instance, &device));
        self.device = Some(device);
        Ok(handle)
    }

    fn device_queue(&self, _device: vk::Device, family: u32, index: u32) -> vk::Queue {
        self.device
            .as_ref()
            .map_or_else(vk::Queue::null, |device| unsafe {
                device.get_device_queue(family, index)
            })
    }

    fn create_swapchain(
        &mut self,
        _device: vk::Device,
        info: &vk::SwapchainCreateInfoKHR<'_>,
    ) -> VkResult<vk::SwapchainKHR> {
        let loader = self.swapchain_loader.as_ref().ok_or(NOT_LOADED)?;
        unsafe { loader.create_swapchain(info, None) }
    }

    fn create_image_view(
        &mut self,
        _device: vk::Device,
        info: &vk::ImageViewCreateInfo<'_>,
    ) -> VkResult<vk::ImageView> {
        let device = self.device.as_ref().ok_or(NOT_LOADED)?;
        unsafe { device.create_image_view(info, None) }
    }

    fn destroy_image_view(&mut self, _device: vk::Device, view: vk::ImageView) {
        if let Some(device) = &self.device {
            unsafe { device.destroy_image_view(view, None) };
        }
    }

    fn destroy_swapchain(&mut self, _device: vk::Device, swapchain: vk::SwapchainKHR) {
        if let Some(loader) = &self.swapchain_loader {
            unsafe { loader.destroy_swapchain(swapchain, None) };
        }
    }

    fn destroy_device(&mut self, _device: vk::Device) {
        self.swapchain_loader = None;
        if let Some(device) = self.device.take() {
            unsafe {
                let _ = device.device_wait_idle();
                device.destroy_device(None);
            }
        }
    }

    fn destroy_surface(&mut self, _instance: vk::Instance, surface: vk::SurfaceKHR) {
        if let Some(loader) = &self.surface_loader {
            unsafe { loader.destroy_surface(surface, None) };
        }
    }

    fn destroy_instance(&mut self, _instance: vk::Instance) {
        self.surface_loader = None;
        if let Some(instance) = self.instance.take() {
            unsafe { instance.destroy_instance(None) };
        }
    }
}
