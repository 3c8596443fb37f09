//! Recursive Newton-Euler inverse dynamics.
//!
//! The chain is traversed twice. The outward pass (base to tip) propagates angular velocity,
//! angular acceleration and the linear acceleration of every link origin and center of
//! mass. The inward pass (tip to base) accumulates the force and moment every link must
//! receive from its parent and projects the moment on the joint axis.
//!
//! All per-link quantities are expressed in the link's own frame and are kept in plain
//! arrays indexed by the joint number, created for each call and discarded afterwards.
//! Rotation matrices are rebuilt from the DH table on every call.
//!
//! There are no error branches: degenerate inputs produce NaN or infinite torques that the
//! caller is expected to detect.

use nalgebra::{Matrix3, Vector3, Vector6};

use crate::kinematic_traits::{Joints, DOF};
use crate::parameters::RobotParameters;

/// Outward pass results, one entry per link.
pub(crate) struct ChainMotion {
    /// Angular velocity of the link.
    pub omega: [Vector3<f64>; DOF],

    /// Angular acceleration of the link.
    pub omega_dot: [Vector3<f64>; DOF],

    /// Linear acceleration of the link center of mass (second derivative of its position).
    pub com_acceleration: [Vector3<f64>; DOF],

    /// Rotation from the link frame to the frame of the previous link (or the base).
    pub to_previous: [Matrix3<f64>; DOF],

    /// Rotation from the link frame to the base frame.
    pub to_base: [Matrix3<f64>; DOF],
}

/// Joint torques (or forces) required to produce the given motion.
///
/// # Arguments
///
/// * `q` - joint positions
/// * `dq` - joint velocities
/// * `ddq` - joint accelerations
/// * `gravity` - gravity acceleration in the base frame. Pass zero to exclude gravity.
/// * `parameters` - chain and link parameters
///
/// # Returns
///
/// Joint torques in the same order as `q`.
pub fn inverse_dynamics(
    q: &Joints,
    dq: &Joints,
    ddq: &Joints,
    gravity: &Vector3<f64>,
    parameters: &RobotParameters,
) -> Joints {
    inverse_dynamics_with_tip(q, dq, ddq, gravity, &Vector6::zeros(), parameters)
}

/// Same as [`inverse_dynamics`] when the end effector also pushes on the environment.
///
/// `tip_wrench` is the force (first three components) and moment (last three) exerted by
/// the end effector, expressed in the frame of the last link. The joints must supply it in
/// addition to the motion torques.
pub fn inverse_dynamics_with_tip(
    q: &Joints,
    dq: &Joints,
    ddq: &Joints,
    gravity: &Vector3<f64>,
    tip_wrench: &Vector6<f64>,
    parameters: &RobotParameters,
) -> Joints {
    let motion = outward_pass(q, dq, ddq, parameters);
    inward_pass(&motion, gravity, tip_wrench, parameters)
}

/// Propagates velocities and accelerations from the base to the tip. Gravity is not part
/// of this pass; it is added as a body force in the inward pass.
pub(crate) fn outward_pass(
    q: &Joints,
    dq: &Joints,
    ddq: &Joints,
    parameters: &RobotParameters,
) -> ChainMotion {
    let z = Vector3::z();
    let mut motion = ChainMotion {
        omega: [Vector3::zeros(); DOF],
        omega_dot: [Vector3::zeros(); DOF],
        com_acceleration: [Vector3::zeros(); DOF],
        to_previous: [Matrix3::identity(); DOF],
        to_base: [Matrix3::identity(); DOF],
    };

    // Base does not move
    let mut omega = Vector3::zeros();
    let mut omega_dot = Vector3::zeros();
    let mut acceleration = Vector3::zeros();
    let mut to_base = Matrix3::identity();

    for i in 0..DOF {
        let row = &parameters.dh[i];
        let rotation = row.rotation(q[i]);
        let back = rotation.transpose();
        let r = row.origin_in_own_frame();
        let com = parameters.links[i].center_of_mass;

        let omega_i = back * (omega + z * dq[i]);
        let omega_dot_i = back * (omega_dot + z * ddq[i] + omega.cross(&z) * dq[i]);
        let acceleration_i = back * acceleration
            + omega_dot_i.cross(&r)
            + omega_i.cross(&omega_i.cross(&r));

        to_base *= rotation;

        motion.omega[i] = omega_i;
        motion.omega_dot[i] = omega_dot_i;
        motion.com_acceleration[i] = acceleration_i
            + omega_dot_i.cross(&com)
            + omega_i.cross(&omega_i.cross(&com));
        motion.to_previous[i] = rotation;
        motion.to_base[i] = to_base;

        omega = omega_i;
        omega_dot = omega_dot_i;
        acceleration = acceleration_i;
    }
    motion
}

/// Accumulates forces and moments from the tip to the base and projects them on the joint
/// axes.
pub(crate) fn inward_pass(
    motion: &ChainMotion,
    gravity: &Vector3<f64>,
    tip_wrench: &Vector6<f64>,
    parameters: &RobotParameters,
) -> Joints {
    let z = Vector3::z();
    let mut torques = [0.0; DOF];

    // Force and moment the distal neighbour needs, in the frame of the current link.
    // Beyond the last link this is the wrench the end effector exerts.
    let mut force: Vector3<f64> = tip_wrench.fixed_rows::<3>(0).into_owned();
    let mut moment: Vector3<f64> = tip_wrench.fixed_rows::<3>(3).into_owned();
    let mut to_distal = Matrix3::identity();

    for i in (0..DOF).rev() {
        let link = &parameters.links[i];
        let r = parameters.dh[i].origin_in_own_frame();
        let com = link.center_of_mass;
        let inertia = link.inertia_tensor();
        let omega = motion.omega[i];

        let distal_force = to_distal * force;
        let distal_moment = to_distal * moment;

        // Gravity pulls on the center of mass; bring it into the link frame
        let local_gravity = motion.to_base[i].transpose() * gravity;
        let link_force = distal_force
            + link.mass * (motion.com_acceleration[i] - local_gravity);
        let link_moment = -link_force.cross(&(r + com))
            + distal_moment
            + distal_force.cross(&com)
            + inertia * motion.omega_dot[i]
            + omega.cross(&(inertia * omega));

        // The joint axis is z of the previous frame, expressed here
        let axis = motion.to_previous[i].transpose() * z;
        torques[i] = link_moment.dot(&axis);

        force = link_force;
        moment = link_moment;
        to_distal = motion.to_previous[i];
    }
    torques
}
