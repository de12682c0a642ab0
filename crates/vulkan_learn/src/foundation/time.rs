//! Time management utilities

use std::time::Instant;

/// Frame timer measuring the wall-clock time between loop iterations
pub struct FrameTimer {
    last_frame: Instant,
    delta_time: f64,
    total_time: f64,
    frame_count: u64,
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameTimer {
    /// Create a new timer starting now
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    /// Create a timer whose first delta is measured from `start`
    pub fn starting_at(start: Instant) -> Self {
        Self {
            last_frame: start,
            delta_time: 0.0,
            total_time: 0.0,
            frame_count: 0,
        }
    }

    /// Advance to the current instant and return the elapsed seconds
    pub fn tick(&mut self) -> f64 {
        self.tick_at(Instant::now())
    }

    /// Advance to `now` and return the seconds elapsed since the previous tick
    ///
    /// An instant earlier than the previous tick yields zero.
    pub fn tick_at(&mut self, now: Instant) -> f64 {
        self.delta_time = now.saturating_duration_since(self.last_frame).as_secs_f64();
        self.total_time += self.delta_time;
        self.last_frame = now;
        self.frame_count += 1;
        self.delta_time
    }

    /// Seconds between the last two ticks
    pub fn delta_time(&self) -> f64 {
        self.delta_time
    }

    /// Total seconds accumulated over all ticks
    pub fn total_time(&self) -> f64 {
        self.total_time
    }

    /// Number of ticks so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Average frames per second since creation
    pub fn average_fps(&self) -> f64 {
        if self.total_time > 0.0 {
            self.frame_count as f64 / self.total_time
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_tick_measures_elapsed_since_previous_tick() {
        let start = Instant::now();
        let mut timer = FrameTimer::starting_at(start);

        let dt = timer.tick_at(start + Duration::from_millis(16));
        assert!((dt - 0.016).abs() < 1e-9);

        let dt = timer.tick_at(start + Duration::from_millis(50));
        assert!((dt - 0.034).abs() < 1e-9);
        assert!((timer.total_time() - 0.050).abs() < 1e-9);
        assert_eq!(timer.frame_count(), 2);
    }

    #[test]
    fn test_tick_never_goes_negative() {
        let start = Instant::now() + Duration::from_secs(1);
        let mut timer = FrameTimer::starting_at(start);
        assert_eq!(timer.tick_at(start - Duration::from_millis(10)), 0.0);
    }

    #[test]
    fn test_average_fps() {
        let start = Instant::now();
        let mut timer = FrameTimer::starting_at(start);
        assert_eq!(timer.average_fps(), 0.0);

        for i in 1..=10 {
            timer.tick_at(start + Duration::from_millis(100 * i));
        }
        assert!((timer.average_fps() - 10.0).abs() < 1e-6);
    }
}
