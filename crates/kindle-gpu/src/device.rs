//! Physical device selection and logical device creation.

use crate::capabilities::{
    device_supports_extensions, query_surface_support, DeviceInfo, SurfaceSupport,
};
use crate::driver::{enumerate, Driver};
use crate::error::{GpuError, Result};
use ash::vk;
use std::ffi::{c_char, CStr};

/// Required device extensions.
pub fn required_device_extensions() -> Vec<&'static CStr> {
    vec![ash::khr::swapchain::NAME]
}

/// Queue family indices found while probing a device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    pub graphics: Option<u32>,
    pub present: Option<u32>,
}

impl QueueFamilyIndices {
    pub fn is_complete(&self) -> bool {
        self.graphics.is_some() && self.present.is_some()
    }

    /// Plain indices, available only once both roles are resolved.
    pub fn resolve(self) -> Option<QueueFamilies> {
        Some(QueueFamilies {
            graphics: self.graphics?,
            present: self.present?,
        })
    }
}

/// Resolved queue families of the selected device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilies {
    pub graphics: u32,
    pub present: u32,
}

impl QueueFamilies {
    /// Whether graphics and presentation live in different families.
    pub fn is_split(&self) -> bool {
        self.graphics != self.present
    }

    /// Distinct family indices, graphics first.
    pub fn unique(&self) -> Vec<u32> {
        if self.is_split() {
            vec![self.graphics, self.present]
        } else {
            vec![self.graphics]
        }
    }
}

/// Find the first graphics family and the first family that can present to
/// `surface`. They may be the same family.
pub fn find_queue_families<D: Driver>(
    driver: &D,
    device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
) -> QueueFamilyIndices {
    let families = enumerate(|count, out| {
        driver.queue_family_properties(device, count, out);
        vk::Result::SUCCESS
    });

    let mut indices = QueueFamilyIndices::default();

    for (i, family) in families.iter().enumerate() {
        if indices.is_complete() {
            break;
        }
        let i = i as u32;

        if indices.graphics.is_none() && family.queue_flags.contains(vk::QueueFlags::GRAPHICS) {
            indices.graphics = Some(i);
        }

        // Presentation is a property of the (device, family, surface) triple.
        if indices.present.is_none() && driver.surface_support(device, i, surface).unwrap_or(false)
        {
            indices.present = Some(i);
        }
    }

    indices
}

/// The physical device chosen for rendering.
#[derive(Debug, Clone)]
pub struct SelectedDevice {
    pub handle: vk::PhysicalDevice,
    pub info: DeviceInfo,
    pub queue_families: QueueFamilies,
    /// Surface support snapshot taken while checking suitability.
    pub surface_support: SurfaceSupport,
}

/// Check a single device; `Some` when it satisfies every requirement.
fn check_device<D: Driver>(
    driver: &D,
    device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
    required_extensions: &[&CStr],
) -> Option<SelectedDevice> {
    let info = DeviceInfo::query(driver, device);

    let Some(queue_families) = find_queue_families(driver, device, surface).resolve() else {
        tracing::debug!("{}: missing graphics or present queue family", info.device_name);
        return None;
    };

    if !device_supports_extensions(driver, device, required_extensions) {
        tracing::debug!("{}: missing required extensions", info.device_name);
        return None;
    }

    let surface_support = query_surface_support(driver, device, surface);
    if !surface_support.is_adequate() {
        tracing::debug!("{}: no surface formats or present modes", info.device_name);
        return None;
    }

    Some(SelectedDevice {
        handle: device,
        info,
        queue_families,
        surface_support,
    })
}

/// Select the first suitable physical device, in enumeration order.
pub fn pick_physical_device<D: Driver>(
    driver: &D,
    instance: vk::Instance,
    surface: vk::SurfaceKHR,
    required_extensions: &[&CStr],
) -> Result<SelectedDevice> {
    let devices = enumerate(|count, out| driver.enumerate_physical_devices(instance, count, out));

    if devices.is_empty() {
        return Err(GpuError::NoVulkanCapableGpu);
    }

    tracing::debug!("Found {} physical device(s)", devices.len());

    let selected = devices
        .into_iter()
        .find_map(|device| check_device(driver, device, surface, required_extensions))
        .ok_or(GpuError::NoSuitableGpu)?;

    tracing::info!("Selected GPU: {}", selected.info.summary());

    Ok(selected)
}

/// Logical device and its queues.
#[derive(Debug, Clone, Copy)]
pub struct LogicalDevice {
    pub handle: vk::Device,
    pub graphics_queue: vk::Queue,
    pub present_queue: vk::Queue,
    pub queue_families: QueueFamilies,
}

/// Create the logical device and retrieve queues.
///
/// One queue is requested per distinct family; no device features are
/// enabled. `layers` is passed for implementations that still honour
/// device-level layers.
pub fn create_logical_device<D: Driver>(
    driver: &mut D,
    physical_device: vk::PhysicalDevice,
    queue_families: QueueFamilies,
    required_extensions: &[&CStr],
    layers: &[&CStr],
) -> Result<LogicalDevice> {
    let queue_priority = 1.0_f32;
    let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = queue_families
        .unique()
        .into_iter()
        .map(|family| {
            vk::DeviceQueueCreateInfo::default()
                .queue_family_index(family)
                .queue_priorities(std::slice::from_ref(&queue_priority))
        })
        .collect();

    let extension_names: Vec<*const c_char> =
        required_extensions.iter().map(|ext| ext.as_ptr()).collect();
    let layer_names: Vec<*const c_char> = layers.iter().map(|l| l.as_ptr()).collect();

    let features = vk::PhysicalDeviceFeatures::default();

    let create_info = vk::DeviceCreateInfo::default()
        .queue_create_infos(&queue_create_infos)
        .enabled_extension_names(&extension_names)
        .enabled_features(&features);
    // Device layers are deprecated but older loaders still read them.
    #[allow(deprecated)]
    let create_info = create_info.enabled_layer_names(&layer_names);

    let device = driver
        .create_device(physical_device, &create_info)
        .map_err(GpuError::LogicalDeviceCreationFailed)?;

    // Exactly one queue was requested per family, so index 0 is valid.
    let graphics_queue = driver.device_queue(device, queue_families.graphics, 0);
    let present_queue = driver.device_queue(device, queue_families.present, 0);

    tracing::info!(
        "Logical device created (graphics family {}, present family {})",
        queue_families.graphics,
        queue_families.present
    );

    Ok(LogicalDevice {
        handle: device,
        graphics_queue,
        present_queue,
        queue_families,
    })
}
