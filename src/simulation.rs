//! Passive motion of the arm under gravity, integrated with explicit Euler steps.

use std::fmt;

use nalgebra::Vector3;
use tracing::{debug, warn};

use crate::constraints::JointLimits;
use crate::forward_dynamics::forward_dynamics;
use crate::kinematic_traits::{Joints, DOF, JOINTS_AT_ZERO};
use crate::parameter_error::NumericSingularity;
use crate::parameters::RobotParameters;
use crate::parameters_robots::standard_gravity;
use crate::utils::is_valid;

/// Upper bound of trajectory samples reserved up front; longer runs grow as they go.
const PREALLOCATED_SAMPLES: usize = 1 << 16;

/// Why a simulation could not be run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimulationError {
    /// The step is not a positive finite number, or the duration is negative or not finite.
    InvalidTiming { dt: f64, duration: f64 },
    /// The forward dynamics failed on the way.
    Numeric(NumericSingularity),
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationError::InvalidTiming { dt, duration } => write!(
                f,
                "Invalid simulation timing: step {} s, duration {} s",
                dt, duration
            ),
            SimulationError::Numeric(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SimulationError {}

impl From<NumericSingularity> for SimulationError {
    fn from(err: NumericSingularity) -> Self {
        SimulationError::Numeric(err)
    }
}

/// Drives the robot without actuator torques: every step computes the accelerations from
/// the forward dynamics and integrates them over `dt`.
#[derive(Debug, Clone)]
pub struct Simulation {
    pub parameters: RobotParameters,
    pub limits: JointLimits,
    pub gravity: Vector3<f64>,

    /// Integration step, seconds.
    pub dt: f64,
}

impl Simulation {
    /// Simulation of the given robot under standard gravity with a 1 ms step.
    pub fn new(parameters: RobotParameters, limits: JointLimits) -> Self {
        Simulation {
            parameters,
            limits,
            gravity: standard_gravity(),
            dt: 0.001,
        }
    }

    /// Simulates `duration` seconds starting from positions `q0` and velocities `dq0`.
    ///
    /// # Returns
    ///
    /// The configuration after every step (the start configuration is not included).
    /// A joint of 1 to 6 that hits its limit stays there and loses its velocity; the last
    /// joint is wrapped around. If the state stops being finite, the run ends early with the
    /// configurations computed so far.
    ///
    /// Fails with `SimulationError::InvalidTiming` if `dt` is not positive and finite or if
    /// `duration` is negative or not finite.
    pub fn simulate(
        &self,
        q0: &Joints,
        dq0: &Joints,
        duration: f64,
    ) -> Result<Vec<Joints>, SimulationError> {
        let timing_valid = self.dt.is_finite() && self.dt > 0.0
            && duration.is_finite() && duration >= 0.0;
        if !timing_valid {
            return Err(SimulationError::InvalidTiming { dt: self.dt, duration });
        }
        // Saturates for absurdly long runs
        let steps = (duration / self.dt).round() as usize;
        debug!("Simulating {} steps of {} s", steps, self.dt);

        let mut trajectory = Vec::with_capacity(steps.min(PREALLOCATED_SAMPLES));
        let mut q = *q0;
        let mut dq = *dq0;

        for step in 0..steps {
            let ddq = forward_dynamics(&q, &dq, &JOINTS_AT_ZERO, &self.gravity, &self.parameters)?;
            for i in 0..DOF {
                dq[i] += ddq[i] * self.dt;
                q[i] += dq[i] * self.dt;
            }

            let clamped = self.limits.clamp_leading(&q);
            for i in 0..DOF - 1 {
                if clamped[i] != q[i] {
                    dq[i] = 0.0;
                }
            }
            q = self.limits.wrap_last_joint(&clamped);

            if !is_valid(&q) || !is_valid(&dq) {
                warn!("Simulation state is not finite after {} steps, stopping", step);
                break;
            }
            trajectory.push(q);
        }
        Ok(trajectory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters_robots::PANDA_NEUTRAL;

    fn simulation() -> Simulation {
        Simulation::new(RobotParameters::panda(), JointLimits::panda())
    }

    #[test]
    fn test_trajectory_length() {
        let trajectory = simulation().simulate(&PANDA_NEUTRAL, &JOINTS_AT_ZERO, 0.05).unwrap();
        assert_eq!(trajectory.len(), 50);
    }

    #[test]
    fn test_no_gravity_no_motion() {
        let mut simulation = simulation();
        simulation.gravity = Vector3::zeros();
        let trajectory = simulation.simulate(&PANDA_NEUTRAL, &JOINTS_AT_ZERO, 0.02).unwrap();
        for q in trajectory {
            for i in 0..DOF {
                assert!((q[i] - PANDA_NEUTRAL[i]).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_falling_arm_stays_within_limits() {
        let simulation = simulation();
        let trajectory = simulation.simulate(&PANDA_NEUTRAL, &JOINTS_AT_ZERO, 1.0).unwrap();
        assert!(!trajectory.is_empty());
        let first = trajectory[0];
        assert!(first.iter().zip(PANDA_NEUTRAL.iter()).any(|(a, b)| a != b), "Arm does not move");
        for q in &trajectory {
            assert!(simulation.limits.compliant(q), "Out of limits: {:?}", q);
        }
    }

    #[test]
    fn test_invalid_timing_rejected() {
        let mut simulation = simulation();
        for duration in [f64::INFINITY, f64::NAN, -1.0] {
            let result = simulation.simulate(&PANDA_NEUTRAL, &JOINTS_AT_ZERO, duration);
            assert!(
                matches!(result, Err(SimulationError::InvalidTiming { .. })),
                "duration {} accepted",
                duration
            );
        }
        for dt in [0.0, -0.001, f64::NAN, f64::INFINITY] {
            simulation.dt = dt;
            let result = simulation.simulate(&PANDA_NEUTRAL, &JOINTS_AT_ZERO, 1.0);
            assert!(
                matches!(result, Err(SimulationError::InvalidTiming { .. })),
                "step {} accepted",
                dt
            );
        }
    }

    #[test]
    fn test_long_run_stops_when_state_diverges() {
        // Far more steps than could ever be stored; the overflowing wrist ends the run early
        let simulation = simulation();
        let mut dq0 = JOINTS_AT_ZERO;
        dq0[DOF - 1] = 1e200;
        let trajectory = simulation.simulate(&PANDA_NEUTRAL, &dq0, 1e15).unwrap();
        assert!(trajectory.len() < 100, "Run did not stop: {} samples", trajectory.len());
        for q in &trajectory {
            assert!(is_valid(q), "Non finite sample {:?}", q);
        }
    }

    #[test]
    fn test_infinite_velocity_stops_immediately() {
        let mut dq0 = JOINTS_AT_ZERO;
        dq0[0] = f64::INFINITY;
        let trajectory = simulation().simulate(&PANDA_NEUTRAL, &dq0, 0.1).unwrap();
        assert!(trajectory.len() < 100);
        assert!(trajectory.iter().all(is_valid));
    }

    #[test]
    fn test_zero_duration() {
        let trajectory = simulation().simulate(&PANDA_NEUTRAL, &JOINTS_AT_ZERO, 0.0).unwrap();
        assert!(trajectory.is_empty());
    }
}
