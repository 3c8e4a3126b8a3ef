//! Vulkan instance and surface creation.

use crate::capabilities::{available_instance_extensions, first_missing_layer};
use crate::driver::Driver;
use crate::error::{GpuError, Result};
use ash::vk;
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};
use std::ffi::{c_char, CStr, CString};

/// Engine name reported to the driver.
pub const ENGINE_NAME: &CStr = c"Kindle";

/// Validation layers to enable when validation is requested.
pub fn validation_layers() -> Vec<&'static CStr> {
    vec![
        // Standard validation layer
        c"VK_LAYER_KHRONOS_validation",
    ]
}

/// Instance extensions needed to present to windows on `display`.
///
/// The portability enumeration extension is always appended so drivers that
/// are not fully conformant (MoltenVK) still enumerate.
pub fn required_instance_extensions(display: RawDisplayHandle) -> Result<Vec<&'static CStr>> {
    let names = ash_window::enumerate_required_extensions(display).map_err(|e| {
        GpuError::EnvironmentUnavailable(format!("No Vulkan window-system support: {e}"))
    })?;

    let mut extensions: Vec<&'static CStr> = names
        .iter()
        // SAFETY: ash-window hands out pointers to static NUL-terminated names.
        .map(|&name| unsafe { CStr::from_ptr(name) })
        .collect();
    extensions.push(ash::khr::portability_enumeration::NAME);

    Ok(extensions)
}

/// Application name as a C string. Interior NUL bytes are dropped.
fn application_name(name: &str) -> CString {
    CString::new(name).unwrap_or_else(|_| {
        tracing::warn!("Application name {name:?} contains NUL bytes; stripping them");
        CString::new(name.replace('\0', "")).unwrap_or_default()
    })
}

/// Create a Vulkan instance.
///
/// `layers` is the set of layers to enable (empty when validation is off);
/// each must be exposed by the driver. `window_extensions` normally comes from
/// [`required_instance_extensions`].
pub fn create_instance<D: Driver>(
    driver: &mut D,
    app_name: &str,
    layers: &[&CStr],
    window_extensions: &[&CStr],
) -> Result<vk::Instance> {
    if let Some(missing) = first_missing_layer(driver, layers) {
        return Err(GpuError::UnsupportedLayer(missing));
    }

    let available = available_instance_extensions(driver);
    tracing::debug!(
        "Available instance extensions ({}): {}",
        available.len(),
        available.join(", ")
    );

    let app_name = application_name(app_name);
    let app_info = vk::ApplicationInfo::default()
        .application_name(&app_name)
        .application_version(vk::make_api_version(0, 0, 1, 0))
        .engine_name(ENGINE_NAME)
        .engine_version(vk::make_api_version(0, 0, 1, 0))
        .api_version(vk::API_VERSION_1_0);

    // Collect extension names
    let portability = ash::khr::portability_enumeration::NAME;
    let mut extension_names: Vec<*const c_char> =
        window_extensions.iter().map(|ext| ext.as_ptr()).collect();
    if !window_extensions.contains(&portability) {
        extension_names.push(portability.as_ptr());
    }

    let layer_names: Vec<*const c_char> = layers.iter().map(|l| l.as_ptr()).collect();

    let create_info = vk::InstanceCreateInfo::default()
        .application_info(&app_info)
        .enabled_extension_names(&extension_names)
        .enabled_layer_names(&layer_names)
        .flags(vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR);

    let instance = driver
        .create_instance(&create_info)
        .map_err(GpuError::InstanceCreationFailed)?;

    tracing::info!(
        "Vulkan instance created ({} extensions, {} layers)",
        extension_names.len(),
        layer_names.len()
    );

    Ok(instance)
}

/// Bind `instance` to a native window.
pub fn create_surface<D: Driver>(
    driver: &mut D,
    instance: vk::Instance,
    display: RawDisplayHandle,
    window: RawWindowHandle,
) -> Result<vk::SurfaceKHR> {
    driver
        .create_surface(instance, display, window)
        .map_err(GpuError::SurfaceCreationFailed)
}
