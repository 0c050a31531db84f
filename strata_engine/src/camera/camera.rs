/// Camera - position, orientation and perspective of the viewer.
///
/// Orientation is stored as yaw / pitch / roll (radians, applied in YXZ
/// order). The view matrix is the inverse of the camera's world transform;
/// the projection is right-handed with Vulkan's inverted Y clip axis and a
/// 0..1 depth range.

use glam::{EulerRot, Mat4, Vec3};

#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    position: Vec3,
    yaw: f32,
    pitch: f32,
    roll: f32,
    fov_y: f32,
    aspect_ratio: f32,
    near: f32,
    far: f32,
}

impl Camera {
    /// Create a camera at `position` looking down -Z
    pub fn new(position: Vec3, fov_y: f32, aspect_ratio: f32, near: f32, far: f32) -> Self {
        Self {
            position,
            yaw: 0.0,
            pitch: 0.0,
            roll: 0.0,
            fov_y,
            aspect_ratio,
            near,
            far,
        }
    }

    // ===== GETTERS =====

    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// (yaw, pitch, roll) in radians
    pub fn yaw_pitch_roll(&self) -> (f32, f32, f32) {
        (self.yaw, self.pitch, self.roll)
    }

    pub fn fov_y(&self) -> f32 {
        self.fov_y
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    pub fn near(&self) -> f32 {
        self.near
    }

    pub fn far(&self) -> f32 {
        self.far
    }

    /// World transform: translate, then yaw-pitch-roll
    pub fn world_matrix(&self) -> Mat4 {
        Mat4::from_translation(self.position)
            * Mat4::from_euler(EulerRot::YXZ, self.yaw, self.pitch, self.roll)
    }

    /// View matrix (inverse of the world transform)
    pub fn view_matrix(&self) -> Mat4 {
        self.world_matrix().inverse()
    }

    /// Perspective projection with the Y axis flipped for Vulkan clip space
    pub fn projection_matrix(&self) -> Mat4 {
        let mut projection = Mat4::perspective_rh(self.fov_y, self.aspect_ratio, self.near, self.far);
        projection.y_axis.y *= -1.0;
        projection
    }

    /// projection * view
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Camera mirrored about the horizontal plane `y = height`
    ///
    /// The position is reflected (`y' = y - 2(y - h)`) and the pitch negated;
    /// yaw, roll and the projection are unchanged.
    pub fn mirrored(&self, height: f32) -> Camera {
        let mut mirrored = self.clone();
        mirrored.position.y = self.position.y - 2.0 * (self.position.y - height);
        mirrored.pitch = -self.pitch;
        mirrored
    }

    // ===== SETTERS =====

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    pub fn set_yaw_pitch_roll(&mut self, yaw: f32, pitch: f32, roll: f32) {
        self.yaw = yaw;
        self.pitch = pitch;
        self.roll = roll;
    }

    pub fn set_fov_y(&mut self, fov_y: f32) {
        self.fov_y = fov_y;
    }

    /// Called on resize with the new swapchain aspect ratio
    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        self.aspect_ratio = aspect_ratio;
    }

    pub fn set_clip_distances(&mut self, near: f32, far: f32) {
        self.near = near;
        self.far = far;
    }
}

#[cfg(test)]
#[path = "camera_tests.rs"]
mod tests;
