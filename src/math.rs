//! Math types for PetalSonic Studio

pub use glam::{Quat, Vec2, Vec3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Pose {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    pub fn identity() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation * (-Vec3::Z)
    }

    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    pub fn look_at(&mut self, target: Vec3) {
        let forward = (target - self.position).normalize_or_zero();
        if forward != Vec3::ZERO {
            self.rotation = Quat::from_rotation_arc(Vec3::Z, -forward);
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

/// Maps a planar (2D) world position into the engine's 3D convention.
///
/// The height axis is pinned to zero and the 2D y axis becomes depth. A 2D
/// y axis pointing down the screen reads as "towards the viewer" in a
/// top-down view, which is +z for a right-handed runtime and -z for a
/// left-handed one.
pub fn planar_to_engine(position: Vec2, right_handed: bool) -> Vec3 {
    let depth = if right_handed { position.y } else { -position.y };
    Vec3::new(position.x, 0.0, depth)
}

/// Clamps a linear volume to the `[0, 1]` range. NaN maps to silence.
pub fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_planar_to_engine() {
        assert_eq!(
            planar_to_engine(Vec2::new(3.0, -4.0), true),
            Vec3::new(3.0, 0.0, -4.0)
        );
        assert_eq!(
            planar_to_engine(Vec2::new(3.0, -4.0), false),
            Vec3::new(3.0, 0.0, 4.0)
        );
    }

    #[test]
    fn test_clamp_volume() {
        assert_eq!(clamp_volume(-0.5), 0.0);
        assert_eq!(clamp_volume(0.25), 0.25);
        assert_eq!(clamp_volume(7.0), 1.0);
        assert_eq!(clamp_volume(f32::NAN), 0.0);
    }

    #[test]
    fn test_pose_look_at() {
        let mut pose = Pose::identity();
        pose.look_at(Vec3::new(1.0, 0.0, 0.0));
        assert!(pose.forward().abs_diff_eq(Vec3::X, 1e-5));
        assert!(pose.up().abs_diff_eq(Vec3::Y, 1e-5));
    }
}
