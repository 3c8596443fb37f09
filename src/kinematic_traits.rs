//! Defines the kinematic provider used by the inverse kinematics solver, together with the
//! joint space types shared by the whole crate.

extern crate nalgebra as na;

use na::{Isometry3, SVector};

/// Number of revolute joints in the chain. All joint space vectors and matrices are sized
/// by this constant.
pub const DOF: usize = 7;

/// Pose is used a pose of the robot end effector (or any joint frame). It contains both
/// Cartesian position and rotation quaternion.
/// ```
/// extern crate nalgebra as na;
/// use na::{Isometry3, Translation3, UnitQuaternion, Vector3};
///
/// type Pose = Isometry3<f64>;
///
/// let translation = Translation3::new(0.3, 0.0, 0.5);
/// let rotation = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), std::f64::consts::FRAC_PI_2);
/// let transform = Pose::from_parts(translation, rotation);
/// ```
pub type Pose = Isometry3<f64>;

/// Joint space vector (angles, velocities, accelerations or torques), one value per joint.
/// Angles are in radians.
pub type Joints = [f64; DOF];

/// Joint space vector as nalgebra column, used for the linear algebra.
pub type JointVector = SVector<f64, DOF>;

/// For providing joint positions when all are zero.
pub const JOINTS_AT_ZERO: Joints = [0.0; DOF];

/// Forward kinematics of the chain. This is what the inverse kinematics solver consumes;
/// it must use the same DH convention and the same joint count as the dynamic model.
pub trait Kinematics: Send + Sync {
    /// Pose of the end effector in the base frame.
    fn forward(&self, qs: &Joints) -> Pose;

    /// Poses of the frames in which every joint rotates (joint i turns about the local z
    /// axis of the i-th returned pose), followed by the pose of the end effector. All poses
    /// are expressed in the base frame.
    fn forward_with_joint_poses(&self, qs: &Joints) -> ([Pose; DOF], Pose);

    /// Positions of the joint origins in the base frame.
    fn joint_positions(&self, qs: &Joints) -> [na::Vector3<f64>; DOF] {
        let (frames, _) = self.forward_with_joint_poses(qs);
        frames.map(|frame| frame.translation.vector)
    }
}
