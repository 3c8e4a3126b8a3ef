//! GPU error types.

use ash::vk;
use thiserror::Error;

use crate::context::InitStage;

/// Errors raised while bringing up or tearing down the Vulkan stack.
#[derive(Error, Debug)]
pub enum GpuError {
    /// The host has no usable Vulkan loader or window-system integration.
    #[error("Vulkan environment unavailable: {0}")]
    EnvironmentUnavailable(String),

    /// A requested instance layer is not exposed by the driver.
    #[error("Requested layer is not available: {0}")]
    UnsupportedLayer(String),

    /// The driver rejected the instance creation request.
    #[error("Instance creation failed: {0}")]
    InstanceCreationFailed(vk::Result),

    /// The window surface could not be created.
    #[error("Surface creation failed (error code {})", .0.as_raw())]
    SurfaceCreationFailed(vk::Result),

    /// The instance enumerated no physical devices at all.
    #[error("No GPU with Vulkan support was found")]
    NoVulkanCapableGpu,

    /// Physical devices exist but none satisfies the requirements.
    #[error("No suitable GPU found")]
    NoSuitableGpu,

    /// The driver rejected the logical device creation request.
    #[error("Logical device creation failed: {0}")]
    LogicalDeviceCreationFailed(vk::Result),

    /// The driver rejected the swapchain creation request.
    #[error("Swapchain creation failed (error code {})", .0.as_raw())]
    SwapchainCreationFailed(vk::Result),

    /// An image view for a swapchain image could not be created.
    #[error("Image view creation failed for swapchain image {index}: {result}")]
    ImageViewCreationFailed { index: usize, result: vk::Result },

    /// A setup step was invoked out of order.
    #[error("Invalid stage: expected {expected:?}, context is {actual:?}")]
    InvalidStage {
        expected: InitStage,
        actual: InitStage,
    },
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, GpuError>;
