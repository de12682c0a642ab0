//! Window creation without a display server
//!
//! Lives in its own test binary because it clears the display variables
//! for the whole process.

#![cfg(target_os = "linux")]

use vulkan_learn::backend::vulkan::{Window, WindowError};

#[test]
fn test_missing_display_returns_window_error() {
    vulkan_learn::foundation::logging::init();
    std::env::remove_var("DISPLAY");
    std::env::remove_var("WAYLAND_DISPLAY");

    match Window::new("vulkan_learn no display", 640, 480) {
        Err(WindowError::InitializationFailed | WindowError::CreationFailed) => {}
        Err(other) => panic!("unexpected window error: {other}"),
        Ok(_) => panic!("window created without a display"),
    }
}
