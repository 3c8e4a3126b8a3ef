//! Vulkan bring-up for the Kindle renderer.
//!
//! This crate provides:
//! - Capability probing (layers, extensions, surface support)
//! - Instance and surface creation
//! - Physical device selection and logical device creation
//! - Swapchain configuration
//! - A staged [`GpuContext`] that owns the handles and tears them down in
//!   reverse order
//!
//! All driver access goes through the [`Driver`] trait; [`AshDriver`] is the
//! real implementation.

pub mod ash_driver;
pub mod capabilities;
pub mod context;
pub mod device;
pub mod driver;
pub mod error;
pub mod instance;
pub mod swapchain;

#[cfg(test)]
mod fake;

pub use ash_driver::AshDriver;
pub use capabilities::{DeviceInfo, GpuVendor, SurfaceSupport};
pub use context::{GpuConfig, GpuContext, GpuContextBuilder, InitStage};
pub use device::{LogicalDevice, QueueFamilies, QueueFamilyIndices, SelectedDevice};
pub use driver::Driver;
pub use error::{GpuError, Result};
pub use instance::required_instance_extensions;
pub use swapchain::{ImageSharing, Swapchain};
