//! Forward dynamics built on repeated inverse dynamics calls.
//!
//! The joint space inertia matrix is assembled column by column: with zero velocity and
//! zero gravity the inverse dynamics is linear in the accelerations, so the torques for a
//! unit acceleration of joint i are exactly column i. One more call with zero acceleration
//! gives the bias torques (Coriolis, centrifugal, gravity and the end effector wrench).
//! The accelerations then follow from `M ddq = tau - h`.

use nalgebra::{SMatrix, Vector3, Vector6};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::debug;

use crate::kinematic_traits::{JointVector, Joints, DOF, JOINTS_AT_ZERO};
use crate::newton_euler::{inverse_dynamics, inverse_dynamics_with_tip};
use crate::parameter_error::NumericSingularity;
use crate::parameters::RobotParameters;
use crate::utils::{joints_to_vector, vector_to_joints};

/// Joint space inertia matrix, symmetric and positive definite for physical parameters.
pub type MassMatrix = SMatrix<f64, DOF, DOF>;

/// Computes the joint space inertia matrix at the configuration `q`.
///
/// Every column is an independent inverse dynamics call; with the `parallel` feature the
/// columns are computed concurrently.
pub fn mass_matrix(q: &Joints, parameters: &RobotParameters) -> MassMatrix {
    let column = |i: usize| {
        let mut unit = JOINTS_AT_ZERO;
        unit[i] = 1.0;
        inverse_dynamics(q, &JOINTS_AT_ZERO, &unit, &Vector3::zeros(), parameters)
    };

    #[cfg(feature = "parallel")]
    let columns: Vec<Joints> = (0..DOF).into_par_iter().map(column).collect();
    #[cfg(not(feature = "parallel"))]
    let columns: Vec<Joints> = (0..DOF).map(column).collect();

    let mut matrix = MassMatrix::zeros();
    for (i, torques) in columns.iter().enumerate() {
        matrix.set_column(i, &joints_to_vector(torques));
    }
    matrix
}

/// Torques needed to hold the current motion without any acceleration: velocity dependent
/// terms, gravity and the reaction of the end effector wrench.
pub fn bias_torques(
    q: &Joints,
    dq: &Joints,
    gravity: &Vector3<f64>,
    tip_wrench: &Vector6<f64>,
    parameters: &RobotParameters,
) -> Joints {
    inverse_dynamics_with_tip(q, dq, &JOINTS_AT_ZERO, gravity, tip_wrench, parameters)
}

/// Joint accelerations resulting from the actuator torques `tau`.
///
/// # Arguments
///
/// * `q` - joint positions
/// * `dq` - joint velocities
/// * `tau` - actuator torques. Zero for a passive (falling) robot.
/// * `gravity` - gravity acceleration in the base frame
/// * `parameters` - chain and link parameters
///
/// # Returns
///
/// Joint accelerations, or `NumericSingularity::MassMatrix` if the inertia matrix cannot be
/// inverted (degenerate dynamic parameters).
pub fn forward_dynamics(
    q: &Joints,
    dq: &Joints,
    tau: &Joints,
    gravity: &Vector3<f64>,
    parameters: &RobotParameters,
) -> Result<Joints, NumericSingularity> {
    forward_dynamics_with_tip(q, dq, tau, gravity, &Vector6::zeros(), parameters)
}

/// Same as [`forward_dynamics`] while the end effector exerts `tip_wrench` (force, then
/// moment, in the frame of the last link) on the environment.
pub fn forward_dynamics_with_tip(
    q: &Joints,
    dq: &Joints,
    tau: &Joints,
    gravity: &Vector3<f64>,
    tip_wrench: &Vector6<f64>,
    parameters: &RobotParameters,
) -> Result<Joints, NumericSingularity> {
    let matrix = mass_matrix(q, parameters);
    let bias = bias_torques(q, dq, gravity, tip_wrench, parameters);
    let rhs = joints_to_vector(tau) - joints_to_vector(&bias);
    let ddq = solve(matrix, &rhs)?;
    Ok(vector_to_joints(&ddq))
}

fn solve(matrix: MassMatrix, rhs: &JointVector) -> Result<JointVector, NumericSingularity> {
    if let Some(cholesky) = matrix.cholesky() {
        return Ok(cholesky.solve(rhs));
    }
    debug!("Mass matrix is not positive definite, trying LU decomposition");
    matrix.lu().solve(rhs).ok_or(NumericSingularity::MassMatrix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::newton_euler::inverse_dynamics;
    use crate::parameters::LinkParameters;
    use crate::parameters_robots::{standard_gravity, PANDA_NEUTRAL};

    #[test]
    fn test_mass_matrix_symmetric_positive_definite() {
        let parameters = RobotParameters::panda();
        let m = mass_matrix(&PANDA_NEUTRAL, &parameters);
        assert!((m - m.transpose()).amax() < 1e-12, "Not symmetric:\n{}", m);
        assert!(m.cholesky().is_some(), "Not positive definite:\n{}", m);
    }

    #[test]
    fn test_holding_torques_give_zero_acceleration() {
        let parameters = RobotParameters::panda();
        let gravity = standard_gravity();
        let holding = inverse_dynamics(
            &PANDA_NEUTRAL, &JOINTS_AT_ZERO, &JOINTS_AT_ZERO, &gravity, &parameters);
        let ddq = forward_dynamics(&PANDA_NEUTRAL, &JOINTS_AT_ZERO, &holding, &gravity, &parameters)
            .expect("Panda mass matrix must be invertible");
        for (i, a) in ddq.iter().enumerate() {
            assert!(a.abs() < 1e-9, "Joint {} accelerates with {}", i + 1, a);
        }
    }

    #[test]
    fn test_passive_robot_falls() {
        let parameters = RobotParameters::panda();
        let ddq = forward_dynamics(
            &PANDA_NEUTRAL, &JOINTS_AT_ZERO, &JOINTS_AT_ZERO, &standard_gravity(), &parameters)
            .expect("Panda mass matrix must be invertible");
        assert!(ddq.iter().all(|a| a.is_finite()));
        assert!(ddq.iter().any(|a| a.abs() > 1e-3), "Unsupported arm should move: {:?}", ddq);
    }

    #[test]
    fn test_massless_robot_is_singular() {
        let mut parameters = RobotParameters::panda();
        parameters.links = [LinkParameters::new(0.0, [0.0; 3], [0.0; 6]); DOF];
        let result = forward_dynamics(
            &PANDA_NEUTRAL, &JOINTS_AT_ZERO, &JOINTS_AT_ZERO, &standard_gravity(), &parameters);
        assert_eq!(result, Err(NumericSingularity::MassMatrix));
    }
}
