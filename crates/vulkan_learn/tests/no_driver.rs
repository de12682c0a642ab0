//! Startup without a usable Vulkan driver
//!
//! Lives in its own test binary because it points the Vulkan loader at a
//! driver manifest that does not exist, which affects the whole process.

use vulkan_learn::backend::vulkan::Window;
use vulkan_learn::core::config::ContextConfig;
use vulkan_learn::{VulkanContext, VulkanError};

#[test]
#[ignore = "requires a display"]
fn test_missing_driver_reports_initialization_error() {
    vulkan_learn::foundation::logging::init();
    std::env::set_var("VK_ICD_FILENAMES", "/nonexistent/vulkan_learn_icd.json");
    std::env::set_var("VK_DRIVER_FILES", "/nonexistent/vulkan_learn_icd.json");

    let mut window = match Window::new("vulkan_learn no driver", 640, 480) {
        Ok(window) => window,
        Err(e) => {
            log::warn!("Skipping, no display available: {e}");
            return;
        }
    };

    let result = VulkanContext::new(&window, &ContextConfig::default())
        .and_then(|mut ctx| ctx.initialize(&mut window).map(|()| ctx));

    match result {
        Err(VulkanError::Initialization(message)) => assert!(!message.is_empty()),
        Err(other) => panic!("expected an initialization error, got {other}"),
        Ok(_) => panic!("context initialized without a driver"),
    }
}
