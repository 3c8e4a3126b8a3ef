//! GPU context management.
//!
//! [`GpuContext`] owns every handle created during bring-up and walks the
//! [`InitStage`] state machine one step at a time. Teardown releases whatever
//! was acquired, newest first, and also runs on drop.

use crate::device::{
    create_logical_device, pick_physical_device, required_device_extensions, LogicalDevice,
    SelectedDevice,
};
use crate::driver::Driver;
use crate::error::{GpuError, Result};
use crate::instance::{self, validation_layers};
use crate::swapchain::{self, Swapchain};
use ash::vk;
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};
use std::ffi::CStr;

/// Bring-up stage of a [`GpuContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InitStage {
    Uninitialized,
    InstanceReady,
    SurfaceReady,
    DeviceSelected,
    LogicalDeviceReady,
    SwapchainReady,
    Running,
    TornDown,
}

/// Settings consumed by the bring-up steps.
#[derive(Debug, Clone)]
pub struct GpuConfig {
    pub app_name: String,
    pub enable_validation: bool,
    /// Layers enabled when validation is on.
    pub validation_layers: Vec<&'static CStr>,
    pub device_extensions: Vec<&'static CStr>,
}

impl Default for GpuConfig {
    fn default() -> Self {
        Self {
            app_name: "Kindle".to_string(),
            enable_validation: cfg!(debug_assertions),
            validation_layers: validation_layers(),
            device_extensions: required_device_extensions(),
        }
    }
}

impl GpuConfig {
    /// Layers to pass to the instance and device.
    pub fn enabled_layers(&self) -> &[&'static CStr] {
        if self.enable_validation {
            &self.validation_layers
        } else {
            &[]
        }
    }
}

/// Builder for creating a GPU context.
#[derive(Debug, Clone, Default)]
pub struct GpuContextBuilder {
    config: GpuConfig,
}

impl GpuContextBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the application name.
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.config.app_name = name.into();
        self
    }

    /// Enable or disable validation layers.
    pub fn validation(mut self, enable: bool) -> Self {
        self.config.enable_validation = enable;
        self
    }

    /// Replace the validation layer list.
    pub fn validation_layers(mut self, layers: Vec<&'static CStr>) -> Self {
        self.config.validation_layers = layers;
        self
    }

    /// Replace the required device extension list.
    pub fn device_extensions(mut self, extensions: Vec<&'static CStr>) -> Self {
        self.config.device_extensions = extensions;
        self
    }

    /// The configuration built so far.
    pub fn config(&self) -> &GpuConfig {
        &self.config
    }

    /// Build an uninitialized context around `driver`.
    pub fn build<D: Driver>(self, driver: D) -> GpuContext<D> {
        GpuContext::new(driver, self.config)
    }
}

/// Main GPU context holding Vulkan resources.
pub struct GpuContext<D: Driver> {
    driver: D,
    config: GpuConfig,
    stage: InitStage,
    instance: Option<vk::Instance>,
    surface: Option<vk::SurfaceKHR>,
    physical_device: Option<SelectedDevice>,
    device: Option<LogicalDevice>,
    swapchain: Option<Swapchain>,
}

impl<D: Driver> GpuContext<D> {
    /// Create a context that has not touched the driver yet.
    pub fn new(driver: D, config: GpuConfig) -> Self {
        Self {
            driver,
            config,
            stage: InitStage::Uninitialized,
            instance: None,
            surface: None,
            physical_device: None,
            device: None,
            swapchain: None,
        }
    }

    fn expect_stage(&self, expected: InitStage) -> Result<()> {
        if self.stage == expected {
            Ok(())
        } else {
            Err(GpuError::InvalidStage {
                expected,
                actual: self.stage,
            })
        }
    }

    fn advance(&mut self, next: InitStage) {
        tracing::debug!("GPU context: {:?} -> {:?}", self.stage, next);
        self.stage = next;
    }

    /// Create the instance. `window_extensions` normally comes from
    /// [`instance::required_instance_extensions`].
    pub fn create_instance(&mut self, window_extensions: &[&CStr]) -> Result<()> {
        self.expect_stage(InitStage::Uninitialized)?;

        let instance = instance::create_instance(
            &mut self.driver,
            &self.config.app_name,
            self.config.enabled_layers(),
            window_extensions,
        )?;
        self.instance = Some(instance);
        self.advance(InitStage::InstanceReady);
        Ok(())
    }

    /// Bind the instance to a native window.
    pub fn create_surface(
        &mut self,
        display: RawDisplayHandle,
        window: RawWindowHandle,
    ) -> Result<()> {
        self.expect_stage(InitStage::InstanceReady)?;
        let instance = self.instance_handle()?;

        let surface = instance::create_surface(&mut self.driver, instance, display, window)?;
        self.surface = Some(surface);
        self.advance(InitStage::SurfaceReady);
        Ok(())
    }

    /// Select the first suitable physical device.
    pub fn pick_physical_device(&mut self) -> Result<()> {
        self.expect_stage(InitStage::SurfaceReady)?;
        let instance = self.instance_handle()?;
        let surface = self.surface_handle()?;

        let selected = pick_physical_device(
            &self.driver,
            instance,
            surface,
            &self.config.device_extensions,
        )?;
        self.physical_device = Some(selected);
        self.advance(InitStage::DeviceSelected);
        Ok(())
    }

    /// Create the logical device and fetch its queues.
    pub fn create_logical_device(&mut self) -> Result<()> {
        self.expect_stage(InitStage::DeviceSelected)?;
        let (physical, families) = match &self.physical_device {
            Some(selected) => (selected.handle, selected.queue_families),
            None => return Err(self.missing(InitStage::DeviceSelected)),
        };

        let device = create_logical_device(
            &mut self.driver,
            physical,
            families,
            &self.config.device_extensions,
            self.config.enabled_layers(),
        )?;
        self.device = Some(device);
        self.advance(InitStage::LogicalDeviceReady);
        Ok(())
    }

    /// Create the swapchain and one view per image.
    ///
    /// `framebuffer` is only used when the surface lets the swapchain pick
    /// its own extent.
    pub fn create_swapchain(&mut self, framebuffer: vk::Extent2D) -> Result<()> {
        self.expect_stage(InitStage::LogicalDeviceReady)?;
        let surface = self.surface_handle()?;
        let device = self.device_handle()?;
        let Some(selected) = &self.physical_device else {
            return Err(self.missing(InitStage::DeviceSelected));
        };

        let mut chain = swapchain::create_swapchain(
            &mut self.driver,
            device,
            surface,
            &selected.surface_support,
            selected.queue_families,
            framebuffer,
        )?;

        match swapchain::create_image_views(
            &mut self.driver,
            device,
            &chain.images,
            chain.format(),
        ) {
            Ok(views) => chain.image_views = views,
            Err(err) => {
                chain.destroy(&mut self.driver, device);
                return Err(err);
            }
        }

        self.swapchain = Some(chain);
        self.advance(InitStage::SwapchainReady);
        Ok(())
    }

    /// Enter the running stage once the swapchain is ready.
    pub fn start_running(&mut self) -> Result<()> {
        self.expect_stage(InitStage::SwapchainReady)?;
        self.advance(InitStage::Running);
        Ok(())
    }

    /// Run every bring-up step up to [`InitStage::Running`].
    pub fn initialize(
        &mut self,
        window_extensions: &[&CStr],
        display: RawDisplayHandle,
        window: RawWindowHandle,
        framebuffer: vk::Extent2D,
    ) -> Result<()> {
        self.create_instance(window_extensions)?;
        self.create_surface(display, window)?;
        self.pick_physical_device()?;
        self.create_logical_device()?;
        self.create_swapchain(framebuffer)?;
        self.start_running()
    }

    /// Release everything acquired so far, newest first.
    ///
    /// Safe to call more than once; only the first call does anything.
    pub fn teardown(&mut self) {
        if self.stage == InitStage::TornDown {
            return;
        }

        if let Some(device) = self.device.take() {
            if let Some(chain) = self.swapchain.take() {
                chain.destroy(&mut self.driver, device.handle);
            }
            self.driver.destroy_device(device.handle);
        }
        self.physical_device = None;

        if let Some(instance) = self.instance.take() {
            if let Some(surface) = self.surface.take() {
                self.driver.destroy_surface(instance, surface);
            }
            self.driver.destroy_instance(instance);
        }

        self.advance(InitStage::TornDown);
    }

    // Handles are present whenever the stage check passed; these only guard
    // against an inconsistent context.
    fn instance_handle(&self) -> Result<vk::Instance> {
        self.instance
            .ok_or_else(|| self.missing(InitStage::InstanceReady))
    }

    fn surface_handle(&self) -> Result<vk::SurfaceKHR> {
        self.surface.ok_or_else(|| self.missing(InitStage::SurfaceReady))
    }

    fn device_handle(&self) -> Result<vk::Device> {
        self.device
            .map(|device| device.handle)
            .ok_or_else(|| self.missing(InitStage::LogicalDeviceReady))
    }

    fn missing(&self, expected: InitStage) -> GpuError {
        GpuError::InvalidStage {
            expected,
            actual: self.stage,
        }
    }

    /// Current stage.
    pub fn stage(&self) -> InitStage {
        self.stage
    }

    /// Configuration in use.
    pub fn config(&self) -> &GpuConfig {
        &self.config
    }

    /// Get the driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Get the Vulkan instance handle.
    pub fn instance(&self) -> Option<vk::Instance> {
        self.instance
    }

    /// Get the window surface handle.
    pub fn surface(&self) -> Option<vk::SurfaceKHR> {
        self.surface
    }

    /// Get the selected physical device.
    pub fn physical_device(&self) -> Option<&SelectedDevice> {
        self.physical_device.as_ref()
    }

    /// Get the logical device and its queues.
    pub fn device(&self) -> Option<&LogicalDevice> {
        self.device.as_ref()
    }

    /// Get the swapchain.
    pub fn swapchain(&self) -> Option<&Swapchain> {
        self.swapchain.as_ref()
    }
}

impl<D: Driver> Drop for GpuContext<D> {
    fn drop(&mut self) {
        self.teardown();
    }
}
