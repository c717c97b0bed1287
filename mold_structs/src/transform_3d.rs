use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Quaternion, Vector3};

fn default_position() -> Vector3 {
    Vector3::ZERO
}
pub fn is_default_position(v: &Vector3) -> bool {
    *v == default_position()
}

fn default_rotation() -> Quaternion {
    Quaternion::identity()
}
pub fn is_default_rotation(q: &Quaternion) -> bool {
    *q == default_rotation()
}

fn default_scale() -> Vector3 {
    Vector3::ONE
}
pub fn is_default_scale(v: &Vector3) -> bool {
    *v == default_scale()
}

/// Local placement of a node relative to its parent.
#[derive(Clone, Debug, Serialize, Deserialize, Copy, PartialEq)]
pub struct Transform3D {
    #[serde(
        default = "default_position",
        skip_serializing_if = "is_default_position"
    )]
    pub position: Vector3,

    #[serde(
        default = "default_rotation",
        skip_serializing_if = "is_default_rotation"
    )]
    pub rotation: Quaternion,

    #[serde(default = "default_scale", skip_serializing_if = "is_default_scale")]
    pub scale: Vector3,
}

impl fmt::Display for Transform3D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Transform3D(position:{}, rotation:{}, scale:{})",
            self.position, self.rotation, self.scale
        )
    }
}

impl Transform3D {
    pub fn new(position: Vector3, rotation: Quaternion, scale: Vector3) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    pub fn from_position(position: Vector3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Euler rotation in degrees (pitch, yaw, roll).
    pub fn rotation_euler(&self) -> Vector3 {
        self.rotation.as_euler_degrees()
    }

    pub fn set_rotation_euler(&mut self, e: Vector3) {
        self.rotation = Quaternion::from_euler_degrees(e.x, e.y, e.z);
    }

    pub fn is_default(&self) -> bool {
        is_default_position(&self.position)
            && is_default_rotation(&self.rotation)
            && is_default_scale(&self.scale)
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.rotation.is_finite() && self.scale.is_finite()
    }
}

impl Default for Transform3D {
    fn default() -> Self {
        Self {
            position: default_position(),
            rotation: default_rotation(),
            scale: default_scale(),
        }
    }
}
