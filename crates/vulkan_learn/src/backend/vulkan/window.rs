//! GLFW window for Vulkan rendering
//!
//! The window owns the GLFW library handle, so the windowing system is
//! initialized when the first window is created and shut down when it is
//! dropped. There is no process-wide window state.

use crate::app::AppEvent;
use ash::vk;
use thiserror::Error;

/// Window system errors
#[derive(Error, Debug)]
pub enum WindowError {
    /// GLFW initialization failed
    #[error("GLFW initialization failed")]
    InitializationFailed,

    /// Window creation failed
    #[error("Window creation failed")]
    CreationFailed,

    /// Error reported by GLFW
    #[error("GLFW error: {0}")]
    GlfwError(String),
}

/// Result type for window operations
pub type WindowResult<T> = Result<T, WindowError>;

/// Event source driven by the frame loop
pub trait WindowBackend {
    /// Pump the platform queue and return the events that arrived since the
    /// previous call, in order
    fn poll_events(&mut self) -> Vec<AppEvent>;

    /// Client area size in screen coordinates
    fn size(&self) -> (u32, u32);
}

/// Window that a Vulkan surface can be created for
pub trait SurfaceProvider {
    /// Instance extensions the window system needs
    fn required_instance_extensions(&self) -> WindowResult<Vec<String>>;

    /// Create a surface for this window on `instance`
    fn create_vulkan_surface(&mut self, instance: vk::Instance) -> WindowResult<vk::SurfaceKHR>;

    /// Drawable size in pixels
    fn framebuffer_size(&self) -> (u32, u32);
}

/// Translate a GLFW event into the framework's event type
///
/// Events the lessons have no use for yield `None`.
pub fn translate_event(event: glfw::WindowEvent) -> Option<AppEvent> {
    match event {
        glfw::WindowEvent::Close => Some(AppEvent::CloseRequested),
        glfw::WindowEvent::Key(key, _, action, _) => match action {
            glfw::Action::Press => Some(AppEvent::Key { key, pressed: true }),
            glfw::Action::Release => Some(AppEvent::Key { key, pressed: false }),
            glfw::Action::Repeat => None,
        },
        glfw::WindowEvent::FramebufferSize(width, height) => Some(AppEvent::Resized {
            width: width.max(0) as u32,
            height: height.max(0) as u32,
        }),
        _ => None,
    }
}

/// Window wrapper for GLFW
pub struct Window {
    glfw: glfw::Glfw,
    window: glfw::PWindow,
    events: glfw::GlfwReceiver<(f64, glfw::WindowEvent)>,
}

impl Window {
    /// Create a fixed-size window with no client API attached
    pub fn new(title: &str, width: u32, height: u32) -> WindowResult<Self> {
        let mut glfw = glfw::init(|error, description| {
            log::error!("GLFW error {:?}: {}", error, description);
        })
        .map_err(|_| WindowError::InitializationFailed)?;

        glfw.window_hint(glfw::WindowHint::ClientApi(glfw::ClientApiHint::NoApi));
        glfw.window_hint(glfw::WindowHint::Resizable(false));

        let (mut window, events) = glfw
            .create_window(width, height, title, glfw::WindowMode::Windowed)
            .ok_or(WindowError::CreationFailed)?;

        window.set_key_polling(true);
        window.set_close_polling(true);
        window.set_framebuffer_size_polling(true);

        log::info!("Created {}x{} window '{}'", width, height, title);

        Ok(Self {
            glfw,
            window,
            events,
        })
    }
}

impl WindowBackend for Window {
    fn poll_events(&mut self) -> Vec<AppEvent> {
        self.glfw.poll_events();
        glfw::flush_messages(&self.events)
            .filter_map(|(_, event)| translate_event(event))
            .collect()
    }

    fn size(&self) -> (u32, u32) {
        let (width, height) = self.window.get_size();
        (width.max(0) as u32, height.max(0) as u32)
    }
}

impl SurfaceProvider for Window {
    fn required_instance_extensions(&self) -> WindowResult<Vec<String>> {
        self.glfw
            .get_required_instance_extensions()
            .ok_or_else(|| WindowError::GlfwError("Failed to get required extensions".to_string()))
    }

    fn create_vulkan_surface(&mut self, instance: vk::Instance) -> WindowResult<vk::SurfaceKHR> {
        let mut surface = vk::SurfaceKHR::null();
        let result = self.window.create_window_surface(instance, std::ptr::null(), &mut surface);

        if result == vk::Result::SUCCESS {
            Ok(surface)
        } else {
            Err(WindowError::GlfwError(format!("Failed to create Vulkan surface: {:?}", result)))
        }
    }

    fn framebuffer_size(&self) -> (u32, u32) {
        let (width, height) = self.window.get_framebuffer_size();
        (width.max(0) as u32, height.max(0) as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_event() {
        assert_eq!(translate_event(glfw::WindowEvent::Close), Some(AppEvent::CloseRequested));
    }

    #[test]
    fn test_key_press_and_release() {
        let press = glfw::WindowEvent::Key(
            glfw::Key::Escape,
            9,
            glfw::Action::Press,
            glfw::Modifiers::empty(),
        );
        assert_eq!(
            translate_event(press),
            Some(AppEvent::Key { key: glfw::Key::Escape, pressed: true })
        );

        let release = glfw::WindowEvent::Key(
            glfw::Key::A,
            38,
            glfw::Action::Release,
            glfw::Modifiers::empty(),
        );
        assert_eq!(
            translate_event(release),
            Some(AppEvent::Key { key: glfw::Key::A, pressed: false })
        );
    }

    #[test]
    fn test_key_repeat_is_dropped() {
        let repeat = glfw::WindowEvent::Key(
            glfw::Key::Space,
            65,
            glfw::Action::Repeat,
            glfw::Modifiers::empty(),
        );
        assert_eq!(translate_event(repeat), None);
    }

    #[test]
    fn test_framebuffer_resize() {
        assert_eq!(
            translate_event(glfw::WindowEvent::FramebufferSize(800, -1)),
            Some(AppEvent::Resized { width: 800, height: 0 })
        );
    }

    #[test]
    fn test_unrelated_events_are_ignored() {
        assert_eq!(translate_event(glfw::WindowEvent::Focus(true)), None);
    }
}
