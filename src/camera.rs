// camera.rs - desktop look-around camera with optional stereo eye offsets

use glam::{Mat4, Vec3};
use stereo_viewer::stereo::Eye;

/// Interpupillary distance in metres.
const IPD: f32 = 0.064;
const EYE_HEIGHT: f32 = 1.2;
const DEFAULT_FOV: f32 = 80.0;

pub struct ViewerCamera {
    /// Degrees; 180 looks down +Z where the media is placed.
    pub yaw: f32,
    pub pitch: f32,
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub sensitivity_scale: f32,
    pub is_fullscreen: bool,
}

impl ViewerCamera {
    pub fn new() -> Self {
        Self {
            yaw: 180.0,
            pitch: 0.0,
            fov: DEFAULT_FOV,
            sensitivity_scale: 1.0,
            is_fullscreen: false,
        }
    }

    pub fn reset(&mut self) {
        self.yaw = 180.0;
        self.pitch = 0.0;
        self.fov = DEFAULT_FOV;
    }

    fn forward(&self) -> Vec3 {
        let (sy, cy) = self.yaw.to_radians().sin_cos();
        let (sp, cp) = self.pitch.to_radians().sin_cos();
        Vec3::new(-sy * cp, sp, -cy * cp)
    }

    /// Turn by a mouse drag of `(dx, dy)` pixels in a `width` × `height` view.
    pub fn drag(&mut self, dx: f32, dy: f32, width: f32, height: f32) {
        if width <= 0.0 || height <= 0.0 {
            return;
        }
        let v_f = self.fov.to_radians();
        let h_f = 2.0 * ((v_f / 2.0).tan() * (width / height)).atan();
        let yaw_per_px = (h_f / width).to_degrees();
        let pitch_per_px = (v_f / height).to_degrees();

        self.yaw = (self.yaw + dx * yaw_per_px * self.sensitivity_scale).rem_euclid(360.0);
        self.pitch = (self.pitch + dy * pitch_per_px * self.sensitivity_scale).clamp(-89.0, 89.0);
    }

    pub fn zoom(&mut self, scroll: f32) {
        self.fov = (self.fov - scroll * 2.5).clamp(20.0, 110.0);
    }

    pub fn view_proj(&self, eye: Eye, aspect: f32) -> Mat4 {
        let forward = self.forward();
        let right = forward.cross(Vec3::Y).normalize_or_zero();
        let offset = match eye {
            Eye::Left => -IPD / 2.0,
            Eye::Right => IPD / 2.0,
            Eye::Mono => 0.0,
        };
        let position = Vec3::new(0.0, EYE_HEIGHT, 0.0) + right * offset;
        let proj = Mat4::perspective_rh(self.fov.to_radians(), aspect.max(0.01), 0.05, 2000.0);
        proj * Mat4::look_to_rh(position, forward, Vec3::Y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_view_faces_positive_z() {
        let cam = ViewerCamera::new();
        let f = cam.forward();
        assert!(f.z > 0.999);
    }

    #[test]
    fn pitch_is_clamped() {
        let mut cam = ViewerCamera::new();
        cam.drag(0.0, 100_000.0, 800.0, 600.0);
        assert_eq!(cam.pitch, 89.0);
    }

    #[test]
    fn eyes_are_separated_along_the_right_axis() {
        let cam = ViewerCamera::new();
        let point = Vec3::new(0.0, EYE_HEIGHT, 2.5).extend(1.0);
        let l = cam.view_proj(Eye::Left, 1.0) * point;
        let r = cam.view_proj(Eye::Right, 1.0) * point;
        assert!((l.x / l.w - r.x / r.w).abs() > 1e-3);
    }
}
