//! Helper functions

use crate::kinematic_traits::{JointVector, Joints, DOF};
use nalgebra::{Isometry3, UnitQuaternion};

/// Checks if all elements in the array are finite
pub fn is_valid(qs: &Joints) -> bool {
    qs.iter().all(|&q| q.is_finite())
}

/// Joint values as a row of numbers, optionally converted to degrees.
pub fn format_joints(joints: &Joints, in_degrees: bool) -> String {
    let mut row_str = String::new();
    for joint_idx in 0..DOF {
        let computed = if in_degrees {
            joints[joint_idx].to_degrees()
        } else {
            joints[joint_idx]
        };
        row_str.push_str(&format!("{:8.4} ", computed));
    }
    row_str.trim_end().to_string()
}

/// Print the pose as position and roll, pitch, yaw in degrees.
pub fn dump_pose(isometry: &Isometry3<f64>) {
    // Extract translation components
    let translation = isometry.translation.vector;

    // Extract rotation components and convert to Euler angles in radians
    let rotation: UnitQuaternion<f64> = isometry.rotation;
    let (roll, pitch, yaw) = rotation.euler_angles();

    println!(
        "x: {:.5}, y: {:.5}, z: {:.5},  roll: {:.3}°, pitch: {:.3}°, yaw: {:.3}°",
        translation.x, translation.y, translation.z,
        roll.to_degrees(), pitch.to_degrees(), yaw.to_degrees()
    );
}

/// formatting for YAML output
pub(crate) fn deg(x: &f64) -> String {
    if *x == 0.0 {
        return "0".to_string();
    }
    format!("deg({:.4})", x.to_degrees())
}

/// Converts ```nalgebra::SVector<f64, 7>``` to Joints ([f64; 7])
pub fn vector_to_joints(v: &JointVector) -> Joints {
    std::array::from_fn(|i| v[i])
}

/// Converts ```Joints ([f64; 7])``` to a ```nalgebra::SVector<f64, 7>```
pub fn joints_to_vector(j: &Joints) -> JointVector {
    JointVector::from_column_slice(j)
}
