//! Iterative inverse kinematics with joint limit avoidance.
//!
//! Each iteration solves the pose error in the least squares sense through the Jacobian
//! (primary task) and adds a motion pulling every joint toward the center of its range
//! (secondary task). The secondary motion is projected on the null space of the Jacobian, so
//! it never disturbs the primary task. Joints 1 to 6 are clamped to their limits after every
//! step. The last joint is left free while iterating and brought into range once at the end,
//! wrapping around a full revolution when this is the shorter way.

use std::fmt;
use std::sync::Arc;

use nalgebra::{Matrix4, Vector3};
use tracing::{debug, trace, warn};

use crate::constraints::JointLimits;
use crate::jacobian::{pose_error, pose_error_vector, Jacobian};
use crate::kinematic_traits::{JointVector, Joints, Kinematics};
use crate::parameter_error::NumericSingularity;
use crate::utils::{format_joints, joints_to_vector, vector_to_joints};

/// Why the solver could not reach the target. The joint limits are checked first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IkFailure {
    /// The final configuration is outside the joint limits or not finite.
    JointLimits,
    /// Position is off by more than the linear tolerance.
    LinearTolerance,
    /// Orientation is off by more than the angular tolerance.
    AngularTolerance,
    /// Both position and orientation are off.
    LinearAndAngular,
}

impl fmt::Display for IkFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IkFailure::JointLimits => write!(f, "joint limits violated"),
            IkFailure::LinearTolerance => write!(f, "linear tolerance not reached"),
            IkFailure::AngularTolerance => write!(f, "angular tolerance not reached"),
            IkFailure::LinearAndAngular => write!(f, "linear and angular tolerances not reached"),
        }
    }
}

/// Result of [`IkSolver::inverse`]. Not reaching the target is reported here and is not an
/// error.
#[derive(Debug, Clone)]
pub struct IkSolution {
    /// Every configuration visited, starting with the initial guess.
    pub trajectory: Vec<Joints>,

    /// Final configuration, with the last joint brought into its limits.
    pub joints: Joints,

    pub success: bool,

    /// Set if and only if `success` is false.
    pub failure: Option<IkFailure>,

    /// Remaining position error of `joints`, meters.
    pub linear_error: f64,

    /// Remaining orientation error of `joints`, radians.
    pub angular_error: f64,
}

/// Why the iteration stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IkStop {
    /// The recorded configuration already meets the target.
    Solved,
    /// Iteration budget exhausted.
    MaxSteps,
    /// The computed joint motion is too small to continue.
    SmallStep,
}

/// One iteration as observed from outside the solver.
#[derive(Debug, Clone)]
pub struct IkStep {
    /// Zero based iteration number.
    pub iteration: usize,

    /// Configuration recorded in this iteration, before the step is applied.
    pub joints: Joints,

    pub linear_error: f64,
    pub angular_error: f64,

    /// Norm of the joint motion computed in this iteration (zero if none was computed).
    pub step_norm: f64,

    /// Set on the last step.
    pub stop: Option<IkStop>,
}

/// Least squares inverse kinematics solver for the 7 joint arm.
pub struct IkSolver {
    /// Forward kinematics provider. Must match the geometry of the robot being controlled.
    pub robot: Arc<dyn Kinematics>,

    pub limits: JointLimits,

    /// Accepted position error, meters.
    pub linear_tolerance: f64,

    /// Accepted orientation error, radians.
    pub angular_tolerance: f64,

    /// Maximal number of iterations (and of trajectory entries).
    pub max_steps: usize,

    /// Iteration stops when the norm of the joint motion drops below this.
    pub min_step_size: f64,

    /// Gain of the motion toward the center of the joint ranges.
    pub centering_rate: f64,
}

impl IkSolver {
    pub fn new(robot: Arc<dyn Kinematics>, limits: JointLimits) -> Self {
        IkSolver {
            robot,
            limits,
            linear_tolerance: 1e-4,
            angular_tolerance: 1e-3,
            max_steps: 500,
            min_step_size: 1e-5,
            centering_rate: 0.5,
        }
    }

    /// Least squares joint motion that removes the pose error. NaN components of the target
    /// leave the matching error components unconstrained.
    pub fn solve_primary_task(
        &self,
        target: &Matrix4<f64>,
        joints: &Joints,
    ) -> Result<JointVector, NumericSingularity> {
        let jacobian = Jacobian::new(self.robot.as_ref(), joints);
        self.primary_task(&jacobian, target, joints)
    }

    /// Joint motion toward the middle of the joint ranges, `-rate * 2 (q - center) / range`.
    pub fn solve_secondary_task(&self, joints: &Joints) -> JointVector {
        -self.centering_rate * joints_to_vector(&self.limits.normalized_offset(joints))
    }

    /// Position and orientation error of the given configuration. Non finite components
    /// (from NaN in the target) do not count. If the provider itself returns a non finite
    /// pose, both errors are NaN.
    pub fn errors(&self, target: &Matrix4<f64>, joints: &Joints) -> (f64, f64) {
        let current = self.robot.forward(joints).to_homogeneous();
        if !current.iter().all(|x| x.is_finite()) {
            return (f64::NAN, f64::NAN);
        }
        let (translation, rotation) = pose_error(target, &current);
        let linear = finite_norm(&translation);
        let angular = finite_norm(&rotation).clamp(0.0, 1.0).asin();
        (linear, angular)
    }

    /// Iterates toward the target starting from `guess`. Every item is one recorded
    /// configuration; the last one carries the reason to stop. A numeric failure is yielded
    /// once and ends the iteration.
    pub fn steps(&self, target: &Matrix4<f64>, guess: &Joints) -> IkSteps<'_> {
        IkSteps {
            solver: self,
            target: *target,
            joints: *guess,
            iteration: 0,
            finished: false,
        }
    }

    /// Solves the inverse kinematics for the target transform (4x4 homogeneous, base frame).
    ///
    /// # Returns
    ///
    /// The solution with the whole trajectory. Missing the target is reported through
    /// `success` and `failure`; `Err` is only returned if the Jacobian cannot be handled
    /// numerically.
    pub fn inverse(
        &self,
        target: &Matrix4<f64>,
        guess: &Joints,
    ) -> Result<IkSolution, NumericSingularity> {
        let mut trajectory = Vec::new();
        let mut joints = *guess;
        for step in self.steps(target, guess) {
            let step = step?;
            joints = step.joints;
            trajectory.push(step.joints);
            if let Some(stop) = step.stop {
                debug!("IK stopped after {} iterations: {:?}", step.iteration + 1, stop);
            }
        }

        let joints = self.limits.wrap_last_joint(&joints);
        let (linear_error, angular_error) = self.errors(target, &joints);
        let failure = self.classify(&joints, linear_error, angular_error);
        if let Some(failure) = failure {
            warn!(
                "IK failed ({}): linear error {:.6} m, angular error {:.6} rad, joints [{}]",
                failure, linear_error, angular_error, format_joints(&joints, false)
            );
        }

        Ok(IkSolution {
            trajectory,
            joints,
            success: failure.is_none(),
            failure,
            linear_error,
            angular_error,
        })
    }

    fn classify(
        &self,
        joints: &Joints,
        linear_error: f64,
        angular_error: f64,
    ) -> Option<IkFailure> {
        if !self.limits.compliant(joints) {
            return Some(IkFailure::JointLimits);
        }
        // Written so that NaN errors count as missed
        let linear_missed = !(linear_error <= self.linear_tolerance);
        let angular_missed = !(angular_error <= self.angular_tolerance);
        match (linear_missed, angular_missed) {
            (true, true) => Some(IkFailure::LinearAndAngular),
            (true, false) => Some(IkFailure::LinearTolerance),
            (false, true) => Some(IkFailure::AngularTolerance),
            (false, false) => None,
        }
    }

    fn primary_task(
        &self,
        jacobian: &Jacobian,
        target: &Matrix4<f64>,
        joints: &Joints,
    ) -> Result<JointVector, NumericSingularity> {
        let current = self.robot.forward(joints).to_homogeneous();
        jacobian.velocities_from_vector(&pose_error_vector(target, &current))
    }

    /// Combined joint motion: primary task plus the secondary task restricted to the null
    /// space of the Jacobian.
    fn joint_motion(
        &self,
        target: &Matrix4<f64>,
        joints: &Joints,
    ) -> Result<JointVector, NumericSingularity> {
        let jacobian = Jacobian::new(self.robot.as_ref(), joints);
        let primary = self.primary_task(&jacobian, target, joints)?;
        let secondary = jacobian.project_to_null_space(&self.solve_secondary_task(joints))?;
        Ok(primary + secondary)
    }
}

fn finite_norm(v: &Vector3<f64>) -> f64 {
    v.iter().filter(|x| x.is_finite()).map(|x| x * x).sum::<f64>().sqrt()
}

/// Iterator over the solver steps, see [`IkSolver::steps`].
pub struct IkSteps<'a> {
    solver: &'a IkSolver,
    target: Matrix4<f64>,
    joints: Joints,
    iteration: usize,
    finished: bool,
}

impl Iterator for IkSteps<'_> {
    type Item = Result<IkStep, NumericSingularity>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let solver = self.solver;
        let recorded = self.joints;
        let (linear_error, angular_error) = solver.errors(&self.target, &recorded);
        let mut step = IkStep {
            iteration: self.iteration,
            joints: recorded,
            linear_error,
            angular_error,
            step_norm: 0.0,
            stop: None,
        };

        if solver.classify(&recorded, linear_error, angular_error).is_none() {
            step.stop = Some(IkStop::Solved);
        } else if self.iteration + 1 >= solver.max_steps {
            step.stop = Some(IkStop::MaxSteps);
        } else {
            let motion = match solver.joint_motion(&self.target, &recorded) {
                Ok(motion) => motion,
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            };
            step.step_norm = motion.norm();
            if step.step_norm < solver.min_step_size {
                step.stop = Some(IkStop::SmallStep);
            } else {
                let moved = vector_to_joints(&(joints_to_vector(&recorded) + motion));
                self.joints = solver.limits.clamp_leading(&moved);
            }
        }

        trace!(
            "IK iteration {}: linear {:.6}, angular {:.6}, step {:.6}",
            step.iteration, linear_error, angular_error, step.step_norm
        );
        self.finished = step.stop.is_some();
        self.iteration += 1;
        Some(Ok(step))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinematics_impl::DhKinematics;
    use crate::parameters::RobotParameters;
    use crate::parameters_robots::PANDA_NEUTRAL;

    fn solver() -> IkSolver {
        IkSolver::new(
            Arc::new(DhKinematics::from_parameters(&RobotParameters::panda())),
            JointLimits::panda(),
        )
    }

    #[test]
    fn test_secondary_task_points_to_center() {
        let solver = solver();
        let center = solver.limits.center();
        assert!(solver.solve_secondary_task(&center).norm() < 1e-12);

        let pull = solver.solve_secondary_task(&solver.limits.upper);
        for (i, v) in pull.iter().enumerate() {
            assert!((v + solver.centering_rate).abs() < 1e-12, "Joint {}: {}", i + 1, v);
        }
    }

    #[test]
    fn test_primary_task_zero_at_target() {
        let solver = solver();
        let target = solver.robot.forward(&PANDA_NEUTRAL).to_homogeneous();
        let motion = solver.solve_primary_task(&target, &PANDA_NEUTRAL).unwrap();
        assert!(motion.norm() < 1e-12);
    }

    #[test]
    fn test_classify_order() {
        let solver = solver();
        let mut outside = PANDA_NEUTRAL;
        outside[3] = 0.5;
        assert_eq!(solver.classify(&outside, 0.0, 0.0), Some(IkFailure::JointLimits));
        assert_eq!(solver.classify(&outside, 1.0, 1.0), Some(IkFailure::JointLimits));
        assert_eq!(solver.classify(&PANDA_NEUTRAL, 1.0, 1.0), Some(IkFailure::LinearAndAngular));
        let q = PANDA_NEUTRAL;
        assert_eq!(solver.classify(&q, 1.0, 0.0), Some(IkFailure::LinearTolerance));
        assert_eq!(solver.classify(&q, 0.0, 1.0), Some(IkFailure::AngularTolerance));
        assert_eq!(solver.classify(&q, f64::NAN, 0.0), Some(IkFailure::LinearTolerance));
        assert_eq!(solver.classify(&q, 0.0, 0.0), None);
    }

    #[test]
    fn test_errors_ignore_nan_components() {
        let solver = solver();
        let mut target = solver.robot.forward(&PANDA_NEUTRAL).to_homogeneous();
        target[(0, 3)] = f64::NAN;
        target[(1, 3)] += 0.03;
        let (linear, angular) = solver.errors(&target, &PANDA_NEUTRAL);
        assert!((linear - 0.03).abs() < 1e-12, "linear error {}", linear);
        assert!(angular < 1e-12);
    }

    #[test]
    fn test_steps_stop_when_solved() {
        let solver = solver();
        let target = solver.robot.forward(&PANDA_NEUTRAL).to_homogeneous();
        let steps: Vec<_> = solver.steps(&target, &PANDA_NEUTRAL).collect();
        assert_eq!(steps.len(), 1);
        let step = steps[0].as_ref().unwrap();
        assert_eq!(step.stop, Some(IkStop::Solved));
        assert_eq!(step.joints, PANDA_NEUTRAL);
    }
}
