//! Application shell for Kindle.
//!
//! Opens a window, brings Vulkan up against it and keeps it alive until the
//! user closes the window. Setup failures end the loop and are returned from
//! [`run_app`].
//!
//! # Example
//!
//! ```no_run
//! use kindle_app::{run_app, AppConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     run_app(AppConfig::default().with_validation(true))
//! }
//! ```

mod context;
mod runner;

pub use context::AppContext;
pub use runner::{run_app, AppConfig};

pub use kindle_gpu::{GpuContext, GpuContextBuilder, GpuError, InitStage};
