//! Rust implementation of rigid body dynamics and iterative inverse kinematics for seven-axis
//! serial manipulators described by standard Denavit-Hartenberg parameters, with the
//! Franka Emika Panda as the reference robot.
//!
//! # Features
//!
//! - Inverse dynamics by the recursive Newton-Euler algorithm, optionally with a wrench
//!   exerted by the end effector.
//! - Forward dynamics: the joint space inertia matrix is assembled from repeated inverse
//!   dynamics calls (in parallel with the `parallel` feature) and solved for the joint
//!   accelerations.
//! - Geometric Jacobian, its least squares inversion and the null space projector.
//! - Inverse kinematics by iterative Jacobian inversion. Joints are pulled toward the center
//!   of their range in the null space of the Jacobian, so the secondary task never disturbs
//!   the pose. The last joint is wrapped around rather than stopped at its limit.
//! - Passive simulation of the arm falling under gravity.
//! - Robot descriptions from YAML files (`allow_filesystem` feature) and a command line tool.
//!
//! # Parameters
//!
//! Each joint is described by one DH row (`a`, `alpha`, `d`) and one link record (mass,
//! center of mass and inertia tensor about the center of mass, in the link frame). The
//! transform of joint i is `Rz(q) * Tz(d) * Tx(a) * Rx(alpha)`.
//!
//! ```
//! use rs_panda_dynamics::kinematic_traits::JOINTS_AT_ZERO;
//! use rs_panda_dynamics::newton_euler::inverse_dynamics;
//! use rs_panda_dynamics::parameters::RobotParameters;
//! use rs_panda_dynamics::parameters_robots::{standard_gravity, PANDA_NEUTRAL};
//!
//! let panda = RobotParameters::panda();
//! let holding = inverse_dynamics(&PANDA_NEUTRAL, &JOINTS_AT_ZERO, &JOINTS_AT_ZERO,
//!                                &standard_gravity(), &panda);
//! assert!(holding[1].abs() > 40.0); // The shoulder carries most of the arm
//! ```

pub mod parameters;
pub mod parameters_robots;

#[cfg(feature = "allow_filesystem")]
pub mod parameters_from_file;

#[path = "utils/utils.rs"]
pub mod utils;
pub mod kinematic_traits;
pub mod kinematics_impl;

pub mod constraints;

pub mod parameter_error;

pub mod newton_euler;

pub mod forward_dynamics;

pub mod jacobian;

pub mod inverse_kinematics;

pub mod simulation;

#[cfg(test)]
mod tests;
