use rapier3d::na::{Isometry3, Quaternion, Translation3, UnitQuaternion, Vector3};
use rapier3d::prelude::Real;

/// Identity rotation as an (x, y, z, w) quaternion.
pub const IDENTITY_ROTATION: (f32, f32, f32, f32) = (0.0, 0.0, 0.0, 1.0);

/// Shortest quaternion length accepted as a rotation.
const MIN_QUATERNION_NORM: f32 = 1.0e-6;

pub fn is_finite3(v: (f32, f32, f32)) -> bool {
    v.0.is_finite() && v.1.is_finite() && v.2.is_finite()
}

pub fn is_finite4(q: (f32, f32, f32, f32)) -> bool {
    q.0.is_finite() && q.1.is_finite() && q.2.is_finite() && q.3.is_finite()
}

pub fn to_engine_vector(v: (f32, f32, f32)) -> Vector3<Real> {
    Vector3::new(v.0, v.1, v.2)
}

/// Builds a unit rotation from (x, y, z, w) components, normalizing on the way.
///
/// Returns `None` for non-finite or near-zero quaternions.
pub fn to_engine_rotation(q: (f32, f32, f32, f32)) -> Option<UnitQuaternion<Real>> {
    if !is_finite4(q) {
        return None;
    }
    let quat = Quaternion::new(q.3, q.0, q.1, q.2);
    if quat.norm() < MIN_QUATERNION_NORM {
        return None;
    }
    Some(UnitQuaternion::from_quaternion(quat))
}

pub fn to_engine_isometry(
    position: (f32, f32, f32),
    rotation: UnitQuaternion<Real>,
) -> Isometry3<Real> {
    Isometry3::from_parts(Translation3::new(position.0, position.1, position.2), rotation)
}

pub fn from_engine_vector(v: &Vector3<Real>) -> [f32; 3] {
    [v.x, v.y, v.z]
}

/// (x, y, z, w) components of an engine rotation.
pub fn from_engine_rotation(q: &UnitQuaternion<Real>) -> [f32; 4] {
    [q.i, q.j, q.k, q.w]
}
