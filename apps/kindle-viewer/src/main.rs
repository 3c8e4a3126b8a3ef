//! Kindle Viewer
//!
//! Opens a window and brings Vulkan up against it: instance, surface, GPU
//! selection, logical device and swapchain. Nothing is drawn; close the window
//! to tear everything down and exit.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p kindle-viewer -- [OPTIONS]
//! ```
//!
//! ## Options
//!
//! - `-h, --help`: Print help message
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Set log level (e.g., info, debug, trace)

use kindle_app::{run_app, AppConfig};

fn main() -> anyhow::Result<()> {
    // Check for help flag before starting the app
    if std::env::args().any(|arg| arg == "-h" || arg == "--help") {
        print_help();
        return Ok(());
    }

    run_app(AppConfig::default())
}

fn print_help() {
    eprintln!(
        "Kindle Viewer

Opens an 800x600 window and initializes Vulkan for it. Exits with a non-zero
status if any setup step fails.

USAGE:
    cargo run -p kindle-viewer -- [OPTIONS]

OPTIONS:
    -h, --help              Print this help message

ENVIRONMENT VARIABLES:
    RUST_LOG                Set log level (e.g., info, debug, trace)"
    );
}
