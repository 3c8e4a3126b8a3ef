//! GPU capability detection.
//!
//! Everything here is a read-only driver query. A query that fails is treated
//! as reporting zero items, so callers only ever see "supported" or "not".

use std::collections::HashSet;
use std::ffi::{c_char, CStr};

use ash::vk;

use crate::driver::{enumerate, Driver};

/// GPU vendor identification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuVendor {
    Nvidia,
    Amd,
    Intel,
    Apple,
    Other(u32),
}

impl GpuVendor {
    /// Identify vendor from PCI vendor ID.
    pub fn from_vendor_id(id: u32) -> Self {
        match id {
            0x10DE => Self::Nvidia,
            0x1002 => Self::Amd,
            0x8086 => Self::Intel,
            0x106B => Self::Apple,
            other => Self::Other(other),
        }
    }
}

/// Identity of a physical device, used for logging the selection.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    /// GPU vendor
    pub vendor: GpuVendor,
    /// Device name
    pub device_name: String,
    /// Discrete, integrated, virtual, CPU...
    pub device_type: vk::PhysicalDeviceType,
    /// Vulkan API version
    pub api_version: u32,
}

impl DeviceInfo {
    /// Query identity from a physical device.
    pub fn query<D: Driver>(driver: &D, device: vk::PhysicalDevice) -> Self {
        let properties = driver.physical_device_properties(device);
        Self {
            vendor: GpuVendor::from_vendor_id(properties.vendor_id),
            device_name: name_from_raw(&properties.device_name),
            device_type: properties.device_type,
            api_version: properties.api_version,
        }
    }

    /// Get a human-readable summary.
    pub fn summary(&self) -> String {
        format!(
            "{} ({:?}, {:?}) - Vulkan {}.{}.{}",
            self.device_name,
            self.vendor,
            self.device_type,
            vk::api_version_major(self.api_version),
            vk::api_version_minor(self.api_version),
            vk::api_version_patch(self.api_version),
        )
    }
}

/// Surface support reported by one device for one surface.
#[derive(Debug, Clone, Default)]
pub struct SurfaceSupport {
    /// Raw surface capabilities.
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    /// Supported surface formats, in driver order.
    pub formats: Vec<vk::SurfaceFormatKHR>,
    /// Supported present modes, in driver order.
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SurfaceSupport {
    /// A swapchain can be built only with at least one format and one mode.
    pub fn is_adequate(&self) -> bool {
        !self.formats.is_empty() && !self.present_modes.is_empty()
    }
}

/// Decode a fixed-size, NUL-terminated name array filled in by the driver.
pub(crate) fn name_from_raw(raw: &[c_char]) -> String {
    // SAFETY: c_char and u8 have identical size and alignment.
    let bytes = unsafe { std::slice::from_raw_parts(raw.as_ptr().cast::<u8>(), raw.len()) };
    match CStr::from_bytes_until_nul(bytes) {
        Ok(name) => name.to_string_lossy().into_owned(),
        Err(_) => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Names of every instance layer the driver exposes.
pub fn available_layers<D: Driver>(driver: &D) -> Vec<String> {
    enumerate(|count, out| driver.enumerate_instance_layers(count, out))
        .iter()
        .map(|layer| name_from_raw(&layer.layer_name))
        .collect()
}

/// Check that every requested layer is exposed by the driver.
pub fn supports_requested_layers<D: Driver>(driver: &D, requested: &[&CStr]) -> bool {
    first_missing_layer(driver, requested).is_none()
}

/// The first requested layer the driver does not expose, if any.
pub(crate) fn first_missing_layer<D: Driver>(driver: &D, requested: &[&CStr]) -> Option<String> {
    if requested.is_empty() {
        return None;
    }

    let available: HashSet<String> = available_layers(driver).into_iter().collect();
    requested
        .iter()
        .map(|layer| layer.to_string_lossy().into_owned())
        .find(|layer| !available.contains(layer))
}

/// Names of every instance extension the driver exposes.
pub fn available_instance_extensions<D: Driver>(driver: &D) -> Vec<String> {
    enumerate(|count, out| driver.enumerate_instance_extensions(count, out))
        .iter()
        .map(|ext| name_from_raw(&ext.extension_name))
        .collect()
}

/// Check that `device` exposes every extension in `required`.
pub fn device_supports_extensions<D: Driver>(
    driver: &D,
    device: vk::PhysicalDevice,
    required: &[&CStr],
) -> bool {
    let mut missing: HashSet<String> = required
        .iter()
        .map(|ext| ext.to_string_lossy().into_owned())
        .collect();

    for ext in enumerate(|count, out| driver.enumerate_device_extensions(device, count, out)) {
        missing.remove(&name_from_raw(&ext.extension_name));
    }

    missing.is_empty()
}

/// Snapshot the surface support of `device` for `surface`.
pub fn query_surface_support<D: Driver>(
    driver: &D,
    device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
) -> SurfaceSupport {
    let capabilities = driver
        .surface_capabilities(device, surface)
        .unwrap_or_else(|e| {
            tracing::warn!("Surface capability query failed: {e}");
            vk::SurfaceCapabilitiesKHR::default()
        });

    SurfaceSupport {
        capabilities,
        formats: enumerate(|count, out| driver.surface_formats(device, surface, count, out)),
        present_modes: enumerate(|count, out| {
            driver.surface_present_modes(device, surface, count, out)
        }),
    }
}
