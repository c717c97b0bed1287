mod quaternion;
mod transform_3d;
mod vector3;

pub use quaternion::Quaternion;
pub use transform_3d::{Transform3D, is_default_position, is_default_rotation, is_default_scale};
pub use vector3::Vector3;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_matches_axis_offset() {
        let a = Vector3::new(0.0, 0.0, 0.0);
        let b = Vector3::new(0.5, 0.0, 0.0);
        assert_eq!(a.distance(b), 0.5);
        assert_eq!(b.distance(a), 0.5);
    }

    #[test]
    fn angle_between_identical_rotations_is_zero() {
        let q = Quaternion::from_euler_degrees(10.0, 20.0, 30.0);
        assert!(q.angle_to_degrees(q) < 1.0e-3);
    }

    #[test]
    fn angle_treats_negated_quaternion_as_same_orientation() {
        let q = Quaternion::from_euler_degrees(0.0, 45.0, 0.0);
        let negated = Quaternion::new(-q.x, -q.y, -q.z, -q.w);
        assert!(q.angle_to_degrees(negated) < 1.0e-3);
    }

    #[test]
    fn angle_is_shortest_arc() {
        let a = Quaternion::identity();
        let b = Quaternion::from_euler_degrees(0.0, 90.0, 0.0);
        assert!((a.angle_to_degrees(b) - 90.0).abs() < 1.0e-3);

        let c = Quaternion::from_euler_degrees(0.0, 270.0, 0.0);
        assert!((a.angle_to_degrees(c) - 90.0).abs() < 1.0e-3);
    }

    #[test]
    fn small_angles_stay_accurate() {
        let a = Quaternion::identity();
        let b = Quaternion::from_euler_degrees(0.0, 0.25, 0.0);
        assert!((a.angle_to_degrees(b) - 0.25).abs() < 1.0e-3);
    }

    #[test]
    fn euler_degrees_roundtrip_within_tolerance() {
        let q = Quaternion::from_euler_degrees(15.0, -40.0, 5.0);
        let e = q.as_euler_degrees();
        assert!((e.x - 15.0).abs() < 1.0e-3);
        assert!((e.y + 40.0).abs() < 1.0e-3);
        assert!((e.z - 5.0).abs() < 1.0e-3);
    }

    #[test]
    fn default_transform_is_identity() {
        let t = Transform3D::default();
        assert!(t.is_default());
        assert_eq!(t.scale, Vector3::ONE);
        assert!(!Transform3D::from_position(Vector3::new(1.0, 0.0, 0.0)).is_default());
    }
}
