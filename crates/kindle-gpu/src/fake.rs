//! Recording fake driver for unit tests.
//!
//! Hands out synthetic handles, answers queries from a list of [`FakeGpu`]s
//! and appends every create/destroy call to a shared log.

use std::ffi::{c_char, CStr};
use std::sync::Arc;

use ash::prelude::VkResult;
use ash::vk::{self, Handle};
use parking_lot::Mutex;
use raw_window_handle::{
    RawDisplayHandle, RawWindowHandle, XlibDisplayHandle, XlibWindowHandle,
};

use crate::driver::Driver;

/// Encode `name` into a NUL-terminated fixed-size array.
pub(crate) fn raw_name<const N: usize>(name: &str) -> [c_char; N] {
    let mut out = [0 as c_char; N];
    for (dst, byte) in out.iter_mut().take(N - 1).zip(name.bytes()) {
        *dst = byte as c_char;
    }
    out
}

pub(crate) fn extension(name: &str) -> vk::ExtensionProperties {
    vk::ExtensionProperties {
        extension_name: raw_name(name),
        spec_version: 1,
        ..Default::default()
    }
}

pub(crate) fn layer(name: &str) -> vk::LayerProperties {
    vk::LayerProperties {
        layer_name: raw_name(name),
        spec_version: vk::API_VERSION_1_3,
        implementation_version: 1,
        ..Default::default()
    }
}

/// Placeholder window handles; the fake never dereferences them.
pub(crate) fn window_handles() -> (RawDisplayHandle, RawWindowHandle) {
    (
        RawDisplayHandle::Xlib(XlibDisplayHandle::new(None, 0)),
        RawWindowHandle::Xlib(XlibWindowHandle::new(1)),
    )
}

/// Decode an array of C string pointers.
///
/// # Safety
/// `names` must point to `count` valid NUL-terminated strings.
unsafe fn decode_names(names: *const *const c_char, count: u32) -> Vec<String> {
    if count == 0 || names.is_null() {
        return Vec::new();
    }
    unsafe {
        std::slice::from_raw_parts(names, count as usize)
            .iter()
            .map(|&name| CStr::from_ptr(name).to_string_lossy().into_owned())
            .collect()
    }
}

/// # Safety
/// `ptr` must be null or point to `count` readable elements.
unsafe fn decode_slice<T: Copy>(ptr: *const T, count: u32) -> Vec<T> {
    if count == 0 || ptr.is_null() {
        return Vec::new();
    }
    unsafe { std::slice::from_raw_parts(ptr, count as usize).to_vec() }
}

fn fill<T: Copy>(items: &[T], count: &mut u32, out: Option<&mut [T]>) -> vk::Result {
    match out {
        None => {
            *count = items.len() as u32;
            vk::Result::SUCCESS
        }
        Some(out) => {
            let n = (*count as usize).min(out.len()).min(items.len());
            out[..n].copy_from_slice(&items[..n]);
            *count = n as u32;
            if n < items.len() {
                vk::Result::INCOMPLETE
            } else {
                vk::Result::SUCCESS
            }
        }
    }
}

/// A queue request as seen by the driver.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct QueueRequest {
    pub family: u32,
    pub count: u32,
    pub priorities: Vec<f32>,
}

/// The interesting parts of a swapchain create request.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SwapchainRequest {
    pub min_image_count: u32,
    pub format: vk::Format,
    pub color_space: vk::ColorSpaceKHR,
    pub extent: (u32, u32),
    pub sharing_mode: vk::SharingMode,
    pub queue_families: Vec<u32>,
    pub present_mode: vk::PresentModeKHR,
    pub array_layers: u32,
}

/// The interesting parts of an image view create request.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ViewRequest {
    pub image: vk::Image,
    pub view_type: vk::ImageViewType,
    pub format: vk::Format,
    pub identity_swizzle: bool,
    pub aspect: vk::ImageAspectFlags,
    pub level_count: u32,
    pub layer_count: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    CreateInstance {
        layers: Vec<String>,
        extensions: Vec<String>,
        flags: vk::InstanceCreateFlags,
    },
    CreateSurface(vk::Instance),
    CreateDevice {
        physical_device: vk::PhysicalDevice,
        queues: Vec<QueueRequest>,
        extensions: Vec<String>,
        layers: Vec<String>,
        features_enabled: bool,
    },
    CreateSwapchain(SwapchainRequest),
    CreateImageView(ViewRequest),
    DestroyImageView(vk::ImageView),
    DestroySwapchain(vk::SwapchainKHR),
    DestroyDevice(vk::Device),
    DestroySurface(vk::SurfaceKHR),
    DestroyInstance(vk::Instance),
}

impl Call {
    /// Short label used by ordering assertions.
    pub fn label(&self) -> &'static str {
        match self {
            Self::CreateInstance { .. } => "create_instance",
            Self::CreateSurface(_) => "create_surface",
            Self::CreateDevice { .. } => "create_device",
            Self::CreateSwapchain(_) => "create_swapchain",
            Self::CreateImageView(_) => "create_image_view",
            Self::DestroyImageView(_) => "destroy_image_view",
            Self::DestroySwapchain(_) => "destroy_swapchain",
            Self::DestroyDevice(_) => "destroy_device",
            Self::DestroySurface(_) => "destroy_surface",
            Self::DestroyInstance(_) => "destroy_instance",
        }
    }
}

/// One fake physical device.
#[derive(Debug, Clone)]
pub(crate) struct FakeGpu {
    pub name: String,
    pub device_type: vk::PhysicalDeviceType,
    pub queue_families: Vec<vk::QueueFlags>,
    pub present_families: Vec<u32>,
    pub extensions: Vec<String>,
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl FakeGpu {
    /// A device that passes every selection check with a single
    /// graphics+present family.
    pub fn suitable(name: &str) -> Self {
        Self {
            name: name.to_string(),
            device_type: vk::PhysicalDeviceType::DISCRETE_GPU,
            queue_families: vec![vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE],
            present_families: vec![0],
            extensions: vec!["VK_KHR_swapchain".to_string()],
            capabilities: vk::SurfaceCapabilitiesKHR {
                min_image_count: 2,
                max_image_count: 8,
                current_extent: vk::Extent2D {
                    width: 800,
                    height: 600,
                },
                min_image_extent: vk::Extent2D {
                    width: 1,
                    height: 1,
                },
                max_image_extent: vk::Extent2D {
                    width: 4096,
                    height: 4096,
                },
                max_image_array_layers: 1,
                supported_transforms: vk::SurfaceTransformFlagsKHR::IDENTITY,
                current_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
                supported_composite_alpha: vk::CompositeAlphaFlagsKHR::OPAQUE,
                supported_usage_flags: vk::ImageUsageFlags::COLOR_ATTACHMENT,
            },
            formats: vec![vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_SRGB,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            }],
            present_modes: vec![vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX],
        }
    }

    pub fn with_queue_families(mut self, families: &[vk::QueueFlags], present: &[u32]) -> Self {
        self.queue_families = families.to_vec();
        self.present_families = present.to_vec();
        self
    }

    pub fn with_extensions(mut self, extensions: &[&str]) -> Self {
        self.extensions = extensions.iter().map(|e| (*e).to_string()).collect();
        self
    }

    pub fn with_formats(mut self, formats: &[vk::SurfaceFormatKHR]) -> Self {
        self.formats = formats.to_vec();
        self
    }

    pub fn with_present_modes(mut self, modes: &[vk::PresentModeKHR]) -> Self {
        self.present_modes = modes.to_vec();
        self
    }

    pub fn with_capabilities(mut self, capabilities: vk::SurfaceCapabilitiesKHR) -> Self {
        self.capabilities = capabilities;
        self
    }
}

/// Recording driver backed by [`FakeGpu`]s.
///
/// Physical device `i` in `gpus` has the raw handle `i + 1`.
pub(crate) struct FakeDriver {
    pub layers: Vec<String>,
    pub instance_extensions: Vec<String>,
    pub gpus: Vec<FakeGpu>,
    pub swapchain_image_count: u32,
    pub fail_instance: Option<vk::Result>,
    pub fail_surface: Option<vk::Result>,
    pub fail_device: Option<vk::Result>,
    pub fail_swapchain: Option<vk::Result>,
    pub fail_image_view_at: Option<usize>,
    pub fail_surface_support: bool,
    pub log: Arc<Mutex<Vec<Call>>>,
    /// Every `(device, family)` presentation query, in order.
    pub present_queries: Arc<Mutex<Vec<(vk::PhysicalDevice, u32)>>>,
    next_handle: u64,
    views_attempted: usize,
}

impl FakeDriver {
    pub fn new(gpus: Vec<FakeGpu>) -> Self {
        Self {
            layers: vec!["VK_LAYER_KHRONOS_validation".to_string()],
            instance_extensions: vec![
                "VK_KHR_surface".to_string(),
                "VK_KHR_xlib_surface".to_string(),
                "VK_KHR_portability_enumeration".to_string(),
            ],
            gpus,
            swapchain_image_count: 3,
            fail_instance: None,
            fail_surface: None,
            fail_device: None,
            fail_swapchain: None,
            fail_image_view_at: None,
            fail_surface_support: false,
            log: Arc::new(Mutex::new(Vec::new())),
            present_queries: Arc::new(Mutex::new(Vec::new())),
            next_handle: 100,
            views_attempted: 0,
        }
    }

    /// Snapshot of the recorded calls.
    pub fn calls(&self) -> Vec<Call> {
        self.log.lock().clone()
    }

    fn gpu(&self, device: vk::PhysicalDevice) -> Option<&FakeGpu> {
        let index = usize::try_from(device.as_raw()).ok()?.checked_sub(1)?;
        self.gpus.get(index)
    }

    fn next<H: Handle>(&mut self) -> H {
        self.next_handle += 1;
        H::from_raw(self.next_handle)
    }

    fn record(&self, call: Call) {
        self.log.lock().push(call);
    }
}

/// Labels of a call log, for ordering assertions.
pub(crate) fn labels(calls: &[Call]) -> Vec<&'static str> {
    calls.iter().map(Call::label).collect()
}

impl Driver for FakeDriver {
    fn enumerate_instance_layers(
        &self,
        count: &mut u32,
        out: Option<&mut [vk::LayerProperties]>,
    ) -> vk::Result {
        let layers: Vec<_> = self.layers.iter().map(|l| layer(l)).collect();
        fill(&layers, count, out)
    }

    fn enumerate_instance_extensions(
        &self,
        count: &mut u32,
        out: Option<&mut [vk::ExtensionProperties]>,
    ) -> vk::Result {
        let extensions: Vec<_> = self
            .instance_extensions
            .iter()
            .map(|e| extension(e))
            .collect();
        fill(&extensions, count, out)
    }

    fn enumerate_physical_devices(
        &self,
        _instance: vk::Instance,
        count: &mut u32,
        out: Option<&mut [vk::PhysicalDevice]>,
    ) -> vk::Result {
        let devices: Vec<_> = (1..=self.gpus.len() as u64)
            .map(vk::PhysicalDevice::from_raw)
            .collect();
        fill(&devices, count, out)
    }

    fn enumerate_device_extensions(
        &self,
        device: vk::PhysicalDevice,
        count: &mut u32,
        out: Option<&mut [vk::ExtensionProperties]>,
    ) -> vk::Result {
        let Some(gpu) = self.gpu(device) else {
            return vk::Result::ERROR_DEVICE_LOST;
        };
        let extensions: Vec<_> = gpu.extensions.iter().map(|e| extension(e)).collect();
        fill(&extensions, count, out)
    }

    fn queue_family_properties(
        &self,
        device: vk::PhysicalDevice,
        count: &mut u32,
        out: Option<&mut [vk::QueueFamilyProperties]>,
    ) {
        let families: Vec<_> = self
            .gpu(device)
            .map(|gpu| {
                gpu.queue_families
                    .iter()
                    .map(|&queue_flags| vk::QueueFamilyProperties {
                        queue_flags,
                        queue_count: 1,
                        ..Default::default()
                    })
                    .collect()
            })
            .unwrap_or_default();
        fill(&families, count, out);
    }

    fn surface_formats(
        &self,
        device: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
        count: &mut u32,
        out: Option<&mut [vk::SurfaceFormatKHR]>,
    ) -> vk::Result {
        match self.gpu(device) {
            Some(gpu) => fill(&gpu.formats, count, out),
            None => vk::Result::ERROR_SURFACE_LOST_KHR,
        }
    }

    fn surface_present_modes(
        &self,
        device: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
        count: &mut u32,
        out: Option<&mut [vk::PresentModeKHR]>,
    ) -> vk::Result {
        match self.gpu(device) {
            Some(gpu) => fill(&gpu.present_modes, count, out),
            None => vk::Result::ERROR_SURFACE_LOST_KHR,
        }
    }

    fn swapchain_images(
        &self,
        _device: vk::Device,
        swapchain: vk::SwapchainKHR,
        count: &mut u32,
        out: Option<&mut [vk::Image]>,
    ) -> vk::Result {
        let images: Vec<_> = (0..u64::from(self.swapchain_image_count))
            .map(|i| vk::Image::from_raw(swapchain.as_raw() * 100 + i))
            .collect();
        fill(&images, count, out)
    }

    fn surface_support(
        &self,
        device: vk::PhysicalDevice,
        family: u32,
        _surface: vk::SurfaceKHR,
    ) -> VkResult<bool> {
        self.present_queries.lock().push((device, family));
        if self.fail_surface_support {
            return Err(vk::Result::ERROR_SURFACE_LOST_KHR);
        }
        self.gpu(device)
            .map(|gpu| gpu.present_families.contains(&family))
            .ok_or(vk::Result::ERROR_SURFACE_LOST_KHR)
    }

    fn surface_capabilities(
        &self,
        device: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> VkResult<vk::SurfaceCapabilitiesKHR> {
        self.gpu(device)
            .map(|gpu| gpu.capabilities)
            .ok_or(vk::Result::ERROR_SURFACE_LOST_KHR)
    }

    fn physical_device_properties(
        &self,
        device: vk::PhysicalDevice,
    ) -> vk::PhysicalDeviceProperties {
        let Some(gpu) = self.gpu(device) else {
            return vk::PhysicalDeviceProperties::default();
        };
        vk::PhysicalDeviceProperties {
            api_version: vk::API_VERSION_1_3,
            vendor_id: 0x10DE,
            device_type: gpu.device_type,
            device_name: raw_name(&gpu.name),
            ..Default::default()
        }
    }

    fn create_instance(&mut self, info: &vk::InstanceCreateInfo<'_>) -> VkResult<vk::Instance> {
        // SAFETY: the create info borrows live name arrays for its lifetime.
        let (layers, extensions) = unsafe {
            (
                decode_names(info.pp_enabled_layer_names, info.enabled_layer_count),
                decode_names(
                    info.pp_enabled_extension_names,
                    info.enabled_extension_count,
                ),
            )
        };
        self.record(Call::CreateInstance {
            layers,
            extensions,
            flags: info.flags,
        });
        match self.fail_instance {
            Some(err) => Err(err),
            None => Ok(self.next()),
        }
    }

    fn create_surface(
        &mut self,
        instance: vk::Instance,
        _display: RawDisplayHandle,
        _window: RawWindowHandle,
    ) -> VkResult<vk::SurfaceKHR> {
        self.record(Call::CreateSurface(instance));
        match self.fail_surface {
            Some(err) => Err(err),
            None => Ok(self.next()),
        }
    }

    fn create_device(
        &mut self,
        physical_device: vk::PhysicalDevice,
        info: &vk::DeviceCreateInfo<'_>,
    ) -> VkResult<vk::Device> {
        // SAFETY: the create info borrows live arrays for its lifetime.
        let (queues, extensions, layers, features_enabled) = unsafe {
            let queues = decode_slice(info.p_queue_create_infos, info.queue_create_info_count)
                .iter()
                .map(|q| QueueRequest {
                    family: q.queue_family_index,
                    count: q.queue_count,
                    priorities: decode_slice(q.p_queue_priorities, q.queue_count),
                })
                .collect();
            let features_enabled = !info.p_enabled_features.is_null() && {
                let words = std::mem::size_of::<vk::PhysicalDeviceFeatures>()
                    / std::mem::size_of::<vk::Bool32>();
                std::slice::from_raw_parts(info.p_enabled_features.cast::<vk::Bool32>(), words)
                    .iter()
                    .any(|&flag| flag != vk::FALSE)
            };
            (
                queues,
                decode_names(
                    info.pp_enabled_extension_names,
                    info.enabled_extension_count,
                ),
                decode_names(info.pp_enabled_layer_names, info.enabled_layer_count),
                features_enabled,
            )
        };
        self.record(Call::CreateDevice {
            physical_device,
            queues,
            extensions,
            layers,
            features_enabled,
        });
        match self.fail_device {
            Some(err) => Err(err),
            None => Ok(self.next()),
        }
    }

    fn device_queue(&self, device: vk::Device, family: u32, index: u32) -> vk::Queue {
        vk::Queue::from_raw(device.as_raw() * 100 + u64::from(family) * 10 + u64::from(index))
    }

    fn create_swapchain(
        &mut self,
        _device: vk::Device,
        info: &vk::SwapchainCreateInfoKHR<'_>,
    ) -> VkResult<vk::SwapchainKHR> {
        // SAFETY: the create info borrows the family list for its lifetime.
        let queue_families =
            unsafe { decode_slice(info.p_queue_family_indices, info.queue_family_index_count) };
        self.record(Call::CreateSwapchain(SwapchainRequest {
            min_image_count: info.min_image_count,
            format: info.image_format,
            color_space: info.image_color_space,
            extent: (info.image_extent.width, info.image_extent.height),
            sharing_mode: info.image_sharing_mode,
            queue_families,
            present_mode: info.present_mode,
            array_layers: info.image_array_layers,
        }));
        match self.fail_swapchain {
            Some(err) => Err(err),
            None => Ok(self.next()),
        }
    }

    fn create_image_view(
        &mut self,
        _device: vk::Device,
        info: &vk::ImageViewCreateInfo<'_>,
    ) -> VkResult<vk::ImageView> {
        let c = info.components;
        self.record(Call::CreateImageView(ViewRequest {
            image: info.image,
            view_type: info.view_type,
            format: info.format,
            identity_swizzle: [c.r, c.g, c.b, c.a]
                .iter()
                .all(|&s| s == vk::ComponentSwizzle::IDENTITY),
            aspect: info.subresource_range.aspect_mask,
            level_count: info.subresource_range.level_count,
            layer_count: info.subresource_range.layer_count,
        }));
        let attempt = self.views_attempted;
        self.views_attempted += 1;
        if self.fail_image_view_at == Some(attempt) {
            return Err(vk::Result::ERROR_OUT_OF_HOST_MEMORY);
        }
        Ok(self.next())
    }

    fn destroy_image_view(&mut self, _device: vk::Device, view: vk::ImageView) {
        self.record(Call::DestroyImageView(view));
    }

    fn destroy_swapchain(&mut self, _device: vk::Device, swapchain: vk::SwapchainKHR) {
        self.record(Call::DestroySwapchain(swapchain));
    }

    fn destroy_device(&mut self, device: vk::Device) {
        self.record(Call::DestroyDevice(device));
    }

    fn destroy_surface(&mut self, _instance: vk::Instance, surface: vk::SurfaceKHR) {
        self.record(Call::DestroySurface(surface));
    }

    fn destroy_instance(&mut self, instance: vk::Instance) {
        self.record(Call::DestroyInstance(instance));
    }
}
