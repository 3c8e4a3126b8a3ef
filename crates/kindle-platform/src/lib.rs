//! Platform abstraction for Kindle.
//!
//! Window creation via winit and the raw handles Vulkan needs to bind a
//! surface to it.

use raw_window_handle::{HasDisplayHandle, HasWindowHandle, RawDisplayHandle, RawWindowHandle};
use thiserror::Error;
use winit::dpi::PhysicalSize;
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window, WindowAttributes};

#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Window creation failed: {0}")]
    WindowCreation(String),
    #[error("Event loop error: {0}")]
    EventLoop(String),
    #[error("Window handle unavailable: {0}")]
    WindowHandle(String),
}

pub type Result<T> = std::result::Result<T, PlatformError>;

/// Platform configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub resizable: bool,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            title: "Welcome to Vulkan".to_string(),
            width: 800,
            height: 600,
            resizable: false,
        }
    }
}

impl PlatformConfig {
    /// Create a new config with the given title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Set the window dimensions.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Allow or forbid user resizing.
    pub fn with_resizable(mut self, resizable: bool) -> Self {
        self.resizable = resizable;
        self
    }

    /// Window attributes for this configuration.
    pub fn window_attributes(&self) -> WindowAttributes {
        Window::default_attributes()
            .with_title(&self.title)
            .with_inner_size(PhysicalSize::new(self.width, self.height))
            .with_resizable(self.resizable)
    }
}

/// Open a window on the running event loop.
pub fn create_window(event_loop: &ActiveEventLoop, config: &PlatformConfig) -> Result<Window> {
    let window = event_loop
        .create_window(config.window_attributes())
        .map_err(|e| PlatformError::WindowCreation(e.to_string()))?;

    tracing::info!(
        "Window created: \"{}\" {}x{}",
        config.title,
        config.width,
        config.height
    );

    Ok(window)
}

/// Get raw handles from a window for Vulkan surface creation.
pub fn raw_handles(window: &Window) -> Result<(RawDisplayHandle, RawWindowHandle)> {
    let display = window
        .display_handle()
        .map_err(|e| PlatformError::WindowHandle(format!("display: {e}")))?;
    let handle = window
        .window_handle()
        .map_err(|e| PlatformError::WindowHandle(format!("window: {e}")))?;
    Ok((display.as_raw(), handle.as_raw()))
}

/// Current drawable size of the window in physical pixels.
pub fn framebuffer_size(window: &Window) -> (u32, u32) {
    let size = window.inner_size();
    (size.width, size.height)
}
