//! Application runner and event loop.

use std::sync::Arc;

use anyhow::Context as _;
use kindle_platform::{create_window, PlatformConfig, PlatformError};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::WindowId;

use crate::context::AppContext;

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Window title, also reported to the driver as the application name.
    pub title: String,
    /// Initial window width.
    pub width: u32,
    /// Initial window height.
    pub height: u32,
    /// Allow the user to resize the window.
    pub resizable: bool,
    /// Enable Vulkan validation layers (default: debug builds only).
    pub validation: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        let platform = PlatformConfig::default();
        Self {
            title: platform.title,
            width: platform.width,
            height: platform.height,
            resizable: platform.resizable,
            validation: cfg!(debug_assertions),
        }
    }
}

impl AppConfig {
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

    /// Allow or forbid window resizing.
    pub fn with_resizable(mut self, resizable: bool) -> Self {
        self.resizable = resizable;
        self
    }

    /// Enable or disable validation layers.
    pub fn with_validation(mut self, validation: bool) -> Self {
        self.validation = validation;
        self
    }

    /// Window settings for the platform layer.
    pub fn platform(&self) -> PlatformConfig {
        PlatformConfig::new(&self.title)
            .with_size(self.width, self.height)
            .with_resizable(self.resizable)
    }
}

/// Open the window, bring Vulkan up and wait until the window is closed.
///
/// Initializes logging from `RUST_LOG` (default `info`). Any setup failure
/// stops the event loop and is returned after partial state has been released.
pub fn run_app(config: AppConfig) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("{} starting...", config.title);

    let event_loop = EventLoop::new().map_err(|e| PlatformError::EventLoop(e.to_string()))?;
    // Nothing is drawn, so sleep until the host has an event for us.
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut runner = AppRunner::new(config);
    event_loop
        .run_app(&mut runner)
        .map_err(|e| PlatformError::EventLoop(e.to_string()))?;

    runner.finish()
}

/// Internal application runner that implements winit's ApplicationHandler.
struct AppRunner {
    config: AppConfig,
    ctx: Option<AppContext>,
    error: Option<anyhow::Error>,
}

impl AppRunner {
    fn new(config: AppConfig) -> Self {
        Self {
            config,
            ctx: None,
            error: None,
        }
    }

    fn create_context(&self, event_loop: &ActiveEventLoop) -> anyhow::Result<AppContext> {
        let window = Arc::new(create_window(event_loop, &self.config.platform())?);
        AppContext::new(window, &self.config.title, self.config.validation)
    }

    /// Release the window and its Vulkan objects, if any.
    fn close(&mut self) {
        if let Some(mut ctx) = self.ctx.take() {
            ctx.shutdown();
        }
    }

    /// Tear down whatever is still alive and report the stored failure.
    fn finish(&mut self) -> anyhow::Result<()> {
        self.close();
        match self.error.take() {
            Some(e) => Err(e.context("Startup failed")),
            None => {
                info!("Exited cleanly");
                Ok(())
            }
        }
    }
}

impl ApplicationHandler for AppRunner {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.ctx.is_some() || self.error.is_some() {
            return;
        }

        info!("Creating application state...");

        match self.create_context(event_loop) {
            Ok(ctx) => {
                self.ctx = Some(ctx);
                info!("Application ready!");
            }
            Err(e) => {
                error!("Failed to initialize application: {e:#}");
                self.error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if let WindowEvent::CloseRequested = event {
            info!("Close requested");
            self.close();
            event_loop.exit();
        }
    }
}
