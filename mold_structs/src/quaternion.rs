use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::Vector3;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quaternion {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Serialize for Quaternion {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        [self.x, self.y, self.z, self.w].serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Quaternion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let arr = <[f32; 4]>::deserialize(deserializer)?;
        Ok(Quaternion::new(arr[0], arr[1], arr[2], arr[3]))
    }
}

impl fmt::Display for Quaternion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}, {})", self.x, self.y, self.z, self.w)
    }
}

impl Quaternion {
    pub const IDENTITY: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    pub fn identity() -> Self {
        Self::IDENTITY
    }

    #[inline(always)]
    pub fn to_glam(self) -> glam::Quat {
        glam::Quat::from_xyzw(self.x, self.y, self.z, self.w)
    }

    #[inline(always)]
    pub fn from_glam(q: glam::Quat) -> Self {
        Self::new(q.x, q.y, q.z, q.w)
    }

    /// Create quaternion from Euler angles in **degrees** (pitch, yaw, roll).
    pub fn from_euler_degrees(pitch_deg: f32, yaw_deg: f32, roll_deg: f32) -> Self {
        Self::from_euler(
            pitch_deg.to_radians(),
            yaw_deg.to_radians(),
            roll_deg.to_radians(),
        )
    }

    /// Create quaternion from Euler angles in radians (pitch, yaw, roll), applied YXZ.
    pub fn from_euler(pitch: f32, yaw: f32, roll: f32) -> Self {
        Self::from_glam(glam::Quat::from_euler(
            glam::EulerRot::YXZ,
            yaw,
            pitch,
            roll,
        ))
    }

    pub fn to_euler(&self) -> (f32, f32, f32) {
        let (yaw, pitch, roll) = self.to_glam().to_euler(glam::EulerRot::YXZ);
        (pitch, yaw, roll)
    }

    /// Convert quaternion to Euler angles in **degrees** (pitch, yaw, roll).
    pub fn to_euler_degrees(&self) -> (f32, f32, f32) {
        let (p, y, r) = self.to_euler();
        (p.to_degrees(), y.to_degrees(), r.to_degrees())
    }

    pub fn as_euler_degrees(&self) -> Vector3 {
        let (p, y, r) = self.to_euler_degrees();
        Vector3::new(p, y, r)
    }

    pub fn normalize(&self) -> Self {
        Self::from_glam(self.to_glam().normalize())
    }

    pub fn inverse(&self) -> Self {
        Self::from_glam(self.to_glam().inverse())
    }

    pub fn mul(&self, rhs: Self) -> Self {
        Self::from_glam(self.to_glam() * rhs.to_glam())
    }

    pub fn is_finite(&self) -> bool {
        self.to_glam().is_finite()
    }

    /// Shortest-arc angle between two orientations, in degrees (0..=180).
    ///
    /// `q` and `-q` describe the same orientation, so the sign of the relative
    /// rotation's scalar part is folded away. Uses the atan2 form, which stays
    /// accurate for the sub-degree deltas thresholds care about.
    pub fn angle_to_degrees(&self, other: Self) -> f32 {
        let a = self.to_glam().normalize();
        let b = other.to_glam().normalize();
        let delta = a.inverse() * b;
        let vector_len = glam::Vec3::new(delta.x, delta.y, delta.z).length();
        (2.0 * vector_len.atan2(delta.w.abs())).to_degrees()
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::identity()
    }
}
