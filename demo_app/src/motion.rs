//! Time-driven values fed to the shaders

use bytemuck::{Pod, Zeroable};
use vulkan_learn::foundation::math::{deg_to_rad, Mat4, Mat4Ext, Vec3};

/// Push constant block of the push-constant lesson
///
/// Matches `layout(push_constant) uniform Constants { vec4 color; float size; }`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct ColorConstants {
    /// Triangle color, each channel in `[0, 1]`
    pub color: [f32; 4],
    /// Triangle scale
    pub size: f32,
}

/// Slowly drifting color and pulsing size
///
/// Each channel walks by a sine of its own frequency per update and wraps
/// around at 255, so the triangle cycles through hues.
#[derive(Debug, Clone, Default)]
pub struct Rainbow {
    time: f32,
    channels: [f32; 3],
    constants: ColorConstants,
}

impl Rainbow {
    const FREQUENCIES: [f32; 3] = [1.13, 1.23, 1.33];

    /// Start at black with zero size
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance by `delta_time` seconds
    pub fn update(&mut self, delta_time: f64) {
        let steps = Self::FREQUENCIES.map(|f| (self.time * f).sin() * 0.5);
        for (channel, step) in self.channels.iter_mut().zip(steps) {
            *channel = (*channel + step).rem_euclid(255.0);
        }

        self.constants = ColorConstants {
            color: [
                self.channels[0] / 255.0,
                self.channels[1] / 255.0,
                self.channels[2] / 255.0,
                0.0,
            ],
            size: steps[0].abs() * 2.0,
        };
        self.time += delta_time as f32;
    }

    /// Values to push for the current frame
    pub fn constants(&self) -> &ColorConstants {
        &self.constants
    }
}

/// World-view-projection of a plane spinning about Y in front of the camera
///
/// The camera sits at `z = -2` looking down `+z`.
pub fn orbit_wvp(time: f32, aspect: f32) -> Mat4 {
    let projection = Mat4::perspective(deg_to_rad(45.0), aspect, 0.01, 500.0);
    let view = Mat4::look_at(
        Vec3::new(0.0, 0.0, -2.0),
        Vec3::new(0.0, 0.0, 1.0),
        Vec3::new(0.0, 1.0, 0.0),
    );
    projection * view * Mat4::rotation_y(time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector4;

    #[test]
    fn test_color_constants_layout() {
        assert_eq!(std::mem::size_of::<ColorConstants>(), 20);
    }

    #[test]
    fn test_rainbow_starts_still() {
        let mut rainbow = Rainbow::new();
        rainbow.update(0.016);
        // sin(0) on the first update
        assert_eq!(rainbow.constants().size, 0.0);
        assert_eq!(rainbow.constants().color, [0.0; 4]);
    }

    #[test]
    fn test_rainbow_channels_stay_in_unit_range() {
        let mut rainbow = Rainbow::new();
        for _ in 0..10_000 {
            rainbow.update(0.05);
            let c = rainbow.constants();
            assert!(c.color[..3].iter().all(|v| (0.0..=1.0).contains(v)));
            assert!((0.0..=1.0).contains(&c.size));
        }
    }

    #[test]
    fn test_rainbow_size_follows_first_frequency() {
        let mut rainbow = Rainbow::new();
        rainbow.update(1.0);
        rainbow.update(1.0);
        assert_relative_eq!(rainbow.constants().size, (1.13f32).sin().abs(), epsilon = 1e-6);
    }

    #[test]
    fn test_orbit_center_projects_to_screen_center() {
        let wvp = orbit_wvp(0.7, 4.0 / 3.0);
        let clip = wvp * Vector4::new(0.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(clip.x / clip.w, 0.0, epsilon = 1e-6);
        assert_relative_eq!(clip.y / clip.w, 0.0, epsilon = 1e-6);
        let depth = clip.z / clip.w;
        assert!(depth > 0.0 && depth < 1.0);
    }
}
