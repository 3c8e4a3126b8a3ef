//! Application context.

use std::sync::Arc;

use anyhow::Context as _;
use ash::vk;
use kindle_gpu::{required_instance_extensions, AshDriver, GpuContext, GpuContextBuilder};
use kindle_platform::{framebuffer_size, raw_handles};
use winit::window::Window;

/// Window plus the Vulkan objects bound to it.
pub struct AppContext {
    /// GPU context, declared first so it is torn down before the window
    /// its surface points at.
    pub gpu: GpuContext<AshDriver>,
    /// The window handle.
    pub window: Arc<Window>,
}

impl AppContext {
    /// Bring Vulkan up against `window`, all the way to the running stage.
    ///
    /// On failure everything created so far is released before returning.
    pub(crate) fn new(
        window: Arc<Window>,
        app_name: &str,
        validation: bool,
    ) -> anyhow::Result<Self> {
        let (display, handle) = raw_handles(&window).context("Failed to get window handles")?;
        let extensions = required_instance_extensions(display)?;

        let driver = AshDriver::load()?;
        let mut gpu = GpuContextBuilder::new()
            .app_name(app_name)
            .validation(validation)
            .build(driver);

        let (width, height) = framebuffer_size(&window);
        gpu.initialize(
            &extensions,
            display,
            handle,
            vk::Extent2D { width, height },
        )
        .context("Vulkan initialization failed")?;

        if let Some(selected) = gpu.physical_device() {
            tracing::info!("GPU: {}", selected.info.summary());
        }
        if let Some(swapchain) = gpu.swapchain() {
            tracing::info!(
                "Presenting {}x{} with {} images ({:?}, {:?})",
                swapchain.extent.width,
                swapchain.extent.height,
                swapchain.images.len(),
                swapchain.format(),
                swapchain.present_mode
            );
        }

        Ok(Self { gpu, window })
    }

    /// Release the Vulkan objects. The window goes away when dropped.
    pub fn shutdown(&mut self) {
        tracing::info!("Tearing down Vulkan");
        self.gpu.teardown();
    }
}
