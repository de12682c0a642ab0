//! Frame driver
//!
//! Runs the per-frame cycle: drain events, update, acquire, render, present.
//! The driver is generic over its event source and its swapchain so the
//! cycle can be exercised without a GPU or a display.

use super::{App, AppError, AppEvent, AppResult, Frame};
use crate::backend::vulkan::{VulkanContext, VulkanResult, Window, WindowBackend};
use crate::core::config::ApplicationConfig;
use crate::foundation::time::FrameTimer;
use ash::vk;

/// The part of the device context the frame loop needs
pub trait SwapchainTarget {
    /// Acquire the next swapchain image, blocking until it is available
    fn acquire_next_image(&mut self) -> VulkanResult<u32>;

    /// Present a previously acquired image
    fn present(&mut self, index: u32) -> VulkanResult<()>;

    /// Block until the device is idle
    fn wait_idle(&mut self) -> VulkanResult<()>;

    /// Area covering a whole swapchain image
    fn client_rect(&self) -> VulkanResult<vk::Rect2D>;
}

impl SwapchainTarget for VulkanContext {
    fn acquire_next_image(&mut self) -> VulkanResult<u32> {
        VulkanContext::acquire_next_image(self)
    }

    fn present(&mut self, index: u32) -> VulkanResult<()> {
        VulkanContext::present(self, index)
    }

    fn wait_idle(&mut self) -> VulkanResult<()> {
        VulkanContext::wait_idle(self)
    }

    fn client_rect(&self) -> VulkanResult<vk::Rect2D> {
        Ok(vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent: self.swapchain_extent()?,
        })
    }
}

/// Lifecycle of a [`FrameDriver`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// Created, app not set up yet
    Uninitialized,
    /// App set up, frames may run
    Running,
    /// App torn down
    Stopped,
}

/// Owns the window and the context and drives an [`App`]
pub struct FrameDriver<W: WindowBackend, C: SwapchainTarget> {
    // Dropped before the window: the surface must go before the window it
    // was created for.
    context: C,
    window: W,
    state: DriverState,
    timer: FrameTimer,
    client_rect: vk::Rect2D,
    quit_on_escape: bool,
}

impl FrameDriver<Window, VulkanContext> {
    /// Create the window and a fully initialized device context
    pub fn open(config: &ApplicationConfig) -> AppResult<Self> {
        config.validate()?;

        let mut window = Window::new(
            &config.window.title,
            config.window.width,
            config.window.height,
        )?;
        let mut context = VulkanContext::new(&window, &config.context)?;
        context.initialize(&mut window)?;

        Ok(Self::new(window, context, config.quit_on_escape))
    }
}

impl<W: WindowBackend, C: SwapchainTarget> FrameDriver<W, C> {
    /// Wrap an existing window and context
    pub fn new(window: W, context: C, quit_on_escape: bool) -> Self {
        Self {
            context,
            window,
            state: DriverState::Uninitialized,
            timer: FrameTimer::new(),
            client_rect: vk::Rect2D::default(),
            quit_on_escape,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Device context
    pub fn context(&self) -> &C {
        &self.context
    }

    /// Mutable device context
    pub fn context_mut(&mut self) -> &mut C {
        &mut self.context
    }

    /// Event source
    pub fn window(&self) -> &W {
        &self.window
    }

    /// Frame timing statistics
    pub fn timer(&self) -> &FrameTimer {
        &self.timer
    }

    /// Run the app's one-time setup and start the frame clock
    ///
    /// Only valid once, from [`DriverState::Uninitialized`]. If setup fails
    /// the driver stays uninitialized and teardown is not called.
    pub fn initialize<A: App<C>>(&mut self, app: &mut A) -> AppResult<()> {
        if self.state != DriverState::Uninitialized {
            return Err(AppError::InvalidState(format!(
                "Cannot initialize a driver in state {:?}",
                self.state
            )));
        }

        self.client_rect = self.context.client_rect()?;
        let (width, height) = self.window.size();
        log::info!(
            "Setting up app: window {}x{}, render area {}x{}",
            width,
            height,
            self.client_rect.extent.width,
            self.client_rect.extent.height
        );

        app.setup(&mut self.context, self.client_rect)?;

        self.timer = FrameTimer::new();
        self.state = DriverState::Running;
        Ok(())
    }

    fn is_quit_event(&self, event: &AppEvent) -> bool {
        match event {
            AppEvent::CloseRequested => true,
            AppEvent::Key {
                key: glfw::Key::Escape,
                pressed: true,
            } => self.quit_on_escape,
            _ => false,
        }
    }

    /// Run one iteration of the frame cycle
    ///
    /// Returns `false` when a quit event arrived; nothing is rendered for
    /// that iteration.
    pub fn run_frame<A: App<C>>(&mut self, app: &mut A) -> AppResult<bool> {
        if self.state != DriverState::Running {
            return Err(AppError::InvalidState(format!(
                "Cannot run a frame in state {:?}",
                self.state
            )));
        }

        let mut quit = false;
        for event in self.window.poll_events() {
            app.handle_event(&event)?;
            quit |= self.is_quit_event(&event);
        }
        if quit {
            log::info!("Quit requested");
            return Ok(false);
        }

        let delta_time = self.timer.tick();
        app.update(&mut self.context, delta_time)?;

        let swapbuffer = self.context.acquire_next_image()?;
        let frame = Frame {
            swapbuffer,
            client_rect: self.client_rect,
            delta_time,
        };
        app.render(&mut self.context, &frame)?;
        self.context.present(swapbuffer)?;

        Ok(true)
    }

    /// Run frames until quit, then tear the app down
    ///
    /// Teardown also happens when a frame fails; the frame's error is
    /// returned afterwards.
    pub fn run<A: App<C>>(&mut self, app: &mut A) -> AppResult<()> {
        if self.state != DriverState::Running {
            return Err(AppError::InvalidState(format!(
                "Cannot run a driver in state {:?}",
                self.state
            )));
        }

        log::info!("Starting frame loop");
        let result = loop {
            match self.run_frame(app) {
                Ok(true) => {}
                Ok(false) => break Ok(()),
                Err(e) => {
                    log::error!("Frame failed: {}", e);
                    break Err(e);
                }
            }
        };

        let idle = self.context.wait_idle();
        app.teardown(&mut self.context);
        self.state = DriverState::Stopped;

        log::info!(
            "Stopped after {} frames ({:.1} fps average)",
            self.timer.frame_count(),
            self.timer.average_fps()
        );

        result?;
        idle.map_err(AppError::from)
    }
}

/// Open a window and context, set `app` up and run it to completion
pub fn run_app<A: App>(config: ApplicationConfig, app: A) -> AppResult<()> {
    let mut driver = FrameDriver::open(&config)?;

    // Declared after the driver so it drops first, releasing any GPU
    // resources it still holds while the context is alive.
    let mut app = app;
    driver.initialize(&mut app)?;
    driver.run(&mut app)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::vulkan::VulkanError;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<String>>>;

    struct MockWindow {
        log: Log,
        script: VecDeque<Vec<AppEvent>>,
    }

    impl WindowBackend for MockWindow {
        fn poll_events(&mut self) -> Vec<AppEvent> {
            self.script
                .pop_front()
                .unwrap_or_else(|| vec![AppEvent::CloseRequested])
        }

        fn size(&self) -> (u32, u32) {
            (640, 480)
        }
    }

    impl Drop for MockWindow {
        fn drop(&mut self) {
            self.log.borrow_mut().push("drop window".to_string());
        }
    }

    struct MockTarget {
        log: Log,
        next_image: u32,
        fail_present: bool,
    }

    impl SwapchainTarget for MockTarget {
        fn acquire_next_image(&mut self) -> VulkanResult<u32> {
            let index = self.next_image;
            self.next_image = (self.next_image + 1) % 2;
            self.log.borrow_mut().push(format!("acquire {index}"));
            Ok(index)
        }

        fn present(&mut self, index: u32) -> VulkanResult<()> {
            self.log.borrow_mut().push(format!("present {index}"));
            if self.fail_present {
                Err(VulkanError::Presentation(vk::Result::ERROR_OUT_OF_DATE_KHR))
            } else {
                Ok(())
            }
        }

        fn wait_idle(&mut self) -> VulkanResult<()> {
            self.log.borrow_mut().push("wait_idle".to_string());
            Ok(())
        }

        fn client_rect(&self) -> VulkanResult<vk::Rect2D> {
            Ok(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: vk::Extent2D { width: 640, height: 480 },
            })
        }
    }

    impl Drop for MockTarget {
        fn drop(&mut self) {
            self.log.borrow_mut().push("drop context".to_string());
        }
    }

    struct RecordingApp {
        log: Log,
        frames: Vec<Frame>,
        setup_rect: Option<vk::Rect2D>,
    }

    impl App<MockTarget> for RecordingApp {
        fn setup(&mut self, _ctx: &mut MockTarget, client_rect: vk::Rect2D) -> AppResult<()> {
            self.setup_rect = Some(client_rect);
            self.log.borrow_mut().push("setup".to_string());
            Ok(())
        }

        fn update(&mut self, _ctx: &mut MockTarget, delta_time: f64) -> AppResult<()> {
            assert!(delta_time >= 0.0);
            self.log.borrow_mut().push("update".to_string());
            Ok(())
        }

        fn render(&mut self, _ctx: &mut MockTarget, frame: &Frame) -> AppResult<()> {
            self.frames.push(*frame);
            self.log.borrow_mut().push(format!("render {}", frame.swapbuffer));
            Ok(())
        }

        fn teardown(&mut self, _ctx: &mut MockTarget) {
            self.log.borrow_mut().push("teardown".to_string());
        }

        fn handle_event(&mut self, event: &AppEvent) -> AppResult<()> {
            self.log.borrow_mut().push(format!("event {event:?}"));
            Ok(())
        }
    }

    fn driver_with(script: Vec<Vec<AppEvent>>, quit_on_escape: bool) -> (FrameDriver<MockWindow, MockTarget>, RecordingApp, Log) {
        let log: Log = Rc::default();
        let window = MockWindow {
            log: Rc::clone(&log),
            script: script.into(),
        };
        let target = MockTarget {
            log: Rc::clone(&log),
            next_image: 0,
            fail_present: false,
        };
        let app = RecordingApp {
            log: Rc::clone(&log),
            frames: Vec::new(),
            setup_rect: None,
        };
        (FrameDriver::new(window, target, quit_on_escape), app, log)
    }

    fn entries(log: &Log) -> Vec<String> {
        log.borrow().clone()
    }

    #[test]
    fn test_frame_cycle_order() {
        let (mut driver, mut app, log) = driver_with(vec![vec![], vec![AppEvent::CloseRequested]], true);

        driver.initialize(&mut app).unwrap();
        driver.run(&mut app).unwrap();

        assert_eq!(
            entries(&log),
            vec![
                "setup",
                "update",
                "acquire 0",
                "render 0",
                "present 0",
                "event CloseRequested",
                "wait_idle",
                "teardown",
            ]
        );
        assert_eq!(driver.state(), DriverState::Stopped);
    }

    #[test]
    fn test_quit_before_first_frame_renders_nothing() {
        let (mut driver, mut app, log) = driver_with(vec![vec![AppEvent::CloseRequested]], true);

        driver.initialize(&mut app).unwrap();
        driver.run(&mut app).unwrap();

        let log = entries(&log);
        assert!(!log.iter().any(|e| e == "update" || e.starts_with("acquire")));
        assert_eq!(log.iter().filter(|e| *e == "teardown").count(), 1);
        assert!(app.frames.is_empty());
    }

    #[test]
    fn test_frames_carry_acquired_index_and_client_rect() {
        let (mut driver, mut app, _log) = driver_with(vec![vec![], vec![], vec![]], true);

        driver.initialize(&mut app).unwrap();
        driver.run(&mut app).unwrap();

        let indices: Vec<u32> = app.frames.iter().map(|f| f.swapbuffer).collect();
        assert_eq!(indices, vec![0, 1, 0]);
        assert!(app.frames.iter().all(|f| f.client_rect.extent.width == 640));
        assert_eq!(app.setup_rect.map(|r| r.extent.height), Some(480));
        assert_eq!(driver.timer().frame_count(), 3);
    }

    #[test]
    fn test_escape_quits_only_when_enabled() {
        let escape = AppEvent::Key {
            key: glfw::Key::Escape,
            pressed: true,
        };

        let (mut driver, mut app, _log) = driver_with(vec![vec![escape]], true);
        driver.initialize(&mut app).unwrap();
        assert!(!driver.run_frame(&mut app).unwrap());

        let (mut driver, mut app, _log) = driver_with(vec![vec![escape]], false);
        driver.initialize(&mut app).unwrap();
        assert!(driver.run_frame(&mut app).unwrap());
        assert_eq!(app.frames.len(), 1);
    }

    #[test]
    fn test_frame_error_still_tears_down() {
        let (mut driver, mut app, log) = driver_with(vec![vec![], vec![]], true);
        driver.context_mut().fail_present = true;

        driver.initialize(&mut app).unwrap();
        let err = driver.run(&mut app).unwrap_err();

        assert!(matches!(
            err,
            AppError::Vulkan(VulkanError::Presentation(vk::Result::ERROR_OUT_OF_DATE_KHR))
        ));
        let log = entries(&log);
        assert_eq!(&log[log.len() - 2..], &["wait_idle", "teardown"]);
        assert_eq!(driver.state(), DriverState::Stopped);
    }

    #[test]
    fn test_state_machine_rejects_out_of_order_calls() {
        let (mut driver, mut app, _log) = driver_with(vec![], true);
        assert_eq!(driver.state(), DriverState::Uninitialized);
        assert!(matches!(driver.run(&mut app), Err(AppError::InvalidState(_))));
        assert!(matches!(driver.run_frame(&mut app), Err(AppError::InvalidState(_))));

        driver.initialize(&mut app).unwrap();
        assert_eq!(driver.state(), DriverState::Running);
        assert!(matches!(driver.initialize(&mut app), Err(AppError::InvalidState(_))));

        driver.run(&mut app).unwrap();
        assert!(matches!(driver.run(&mut app), Err(AppError::InvalidState(_))));
        assert!(matches!(driver.initialize(&mut app), Err(AppError::InvalidState(_))));
    }

    #[test]
    fn test_context_dropped_before_window() {
        let (driver, _app, log) = driver_with(vec![], true);
        drop(driver);
        assert_eq!(entries(&log), vec!["drop context", "drop window"]);
    }
}
