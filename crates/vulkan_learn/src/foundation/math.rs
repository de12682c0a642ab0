//! Math utilities and types
//!
//! Thin aliases over `nalgebra` plus the projection helpers the lessons use.
//! All helpers follow a left-handed convention with depth mapped to `[0, 1]`,
//! which is what Vulkan's clip space expects.

pub use nalgebra::{Matrix4, Vector2, Vector3, Vector4};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// Angle conversion helpers
pub fn deg_to_rad(degrees: f32) -> f32 {
    degrees.to_radians()
}

/// Extension trait for Mat4 with additional convenience methods
pub trait Mat4Ext {
    /// Create a rotation matrix around the Y axis
    fn rotation_y(angle: f32) -> Mat4;

    /// Create a left-handed perspective projection with zero-to-one depth
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4;

    /// Create a left-handed look-at view matrix
    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4;

    /// Copy the matrix out in column-major order, ready for a push constant
    fn to_cols_array(&self) -> [f32; 16];
}

impl Mat4Ext for Mat4 {
    fn rotation_y(angle: f32) -> Mat4 {
        Mat4::from_axis_angle(&Vec3::y_axis(), angle)
    }

    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        let tan_half_fovy = (fov_y * 0.5).tan();

        let mut result = Mat4::zeros();
        result[(0, 0)] = 1.0 / (aspect * tan_half_fovy);
        result[(1, 1)] = 1.0 / tan_half_fovy;
        result[(2, 2)] = far / (far - near);
        result[(2, 3)] = -(near * far) / (far - near);
        result[(3, 2)] = 1.0;

        result
    }

    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        let forward = (target - eye).normalize();
        let right = up.cross(&forward).normalize();
        let camera_up = forward.cross(&right);

        Mat4::new(
            right.x, right.y, right.z, -right.dot(&eye),
            camera_up.x, camera_up.y, camera_up.z, -camera_up.dot(&eye),
            forward.x, forward.y, forward.z, -forward.dot(&eye),
            0.0, 0.0, 0.0, 1.0,
        )
    }

    fn to_cols_array(&self) -> [f32; 16] {
        let mut out = [0.0; 16];
        out.copy_from_slice(self.as_slice());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn project(m: &Mat4, p: Vec3) -> Vec3 {
        let clip = m * Vec4::new(p.x, p.y, p.z, 1.0);
        Vec3::new(clip.x / clip.w, clip.y / clip.w, clip.z / clip.w)
    }

    #[test]
    fn test_perspective_maps_near_and_far_to_unit_depth() {
        let proj = Mat4::perspective(deg_to_rad(45.0), 640.0 / 480.0, 0.01, 500.0);

        assert_relative_eq!(project(&proj, Vec3::new(0.0, 0.0, 0.01)).z, 0.0, epsilon = 1e-5);
        assert_relative_eq!(project(&proj, Vec3::new(0.0, 0.0, 500.0)).z, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_perspective_respects_aspect() {
        let proj = Mat4::perspective(deg_to_rad(90.0), 2.0, 0.1, 10.0);
        assert_relative_eq!(proj[(1, 1)], 1.0, epsilon = 1e-6);
        assert_relative_eq!(proj[(0, 0)], 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_look_at_moves_eye_to_origin_looking_down_z() {
        let eye = Vec3::new(0.0, 0.0, -2.0);
        let view = Mat4::look_at(eye, Vec3::new(0.0, 0.0, 1.0), Vec3::new(0.0, 1.0, 0.0));

        let at_eye = view * Vec4::new(eye.x, eye.y, eye.z, 1.0);
        assert_relative_eq!(at_eye.xyz(), Vec3::zeros(), epsilon = 1e-6);

        let ahead = view * Vec4::new(0.0, 0.0, 3.0, 1.0);
        assert_relative_eq!(ahead.z, 5.0, epsilon = 1e-6);
    }

    #[test]
    fn test_cols_array_is_column_major() {
        let m = Mat4::new_translation(&Vec3::new(1.0, 2.0, 3.0));
        let cols = m.to_cols_array();
        assert_eq!(&cols[12..15], &[1.0, 2.0, 3.0]);
        assert_eq!(cols[15], 1.0);
    }
}
