//! Hardcoded parameters for the Franka Emika Panda

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use nalgebra::Vector3;

use crate::constraints::JointLimits;
use crate::kinematic_traits::Joints;
use crate::parameters::{DhParameters, LinkParameters, RobotParameters};

/// Gravity in the base frame, with the base standing on the floor.
pub const STANDARD_GRAVITY: [f64; 3] = [0.0, 0.0, -9.81];

/// Neutral ("ready") configuration of the Panda. The end effector points down in front of
/// the robot.
pub const PANDA_NEUTRAL: Joints = [0.0, 0.0, 0.0, -FRAC_PI_2, 0.0, FRAC_PI_2, FRAC_PI_4];

/// Width of the band above the upper limit of the last Panda joint that is still clamped
/// rather than wrapped around (radians).
pub const PANDA_LAST_JOINT_DEADZONE: f64 = 0.4887;

pub fn standard_gravity() -> Vector3<f64> {
    Vector3::from(STANDARD_GRAVITY)
}

impl RobotParameters {
    /// Franka Emika Panda with the hand attached (the last DH offset includes the flange
    /// and the gripper).
    pub fn panda() -> Self {
        RobotParameters {
            dh: [
                DhParameters::new(0.0, -FRAC_PI_2, 0.333),
                DhParameters::new(0.0, FRAC_PI_2, 0.0),
                DhParameters::new(0.082, FRAC_PI_2, 0.316),
                DhParameters::new(-0.082, -FRAC_PI_2, 0.0),
                DhParameters::new(0.0, FRAC_PI_2, 0.384),
                DhParameters::new(0.088, FRAC_PI_2, 0.0),
                DhParameters::new(0.0, 0.0, 0.051 + 0.159),
            ],
            links: [
                LinkParameters::new(
                    2.92,
                    [-0.025566, -2.88e-05, 0.057332],
                    [0.00782229414331, 0.0109027971813, 0.0102355503949,
                        -1.56191622996e-05, -0.00126005738123, 1.08233858202e-05],
                ),
                LinkParameters::new(
                    2.74,
                    [0.0, -0.0324958, -0.0675818],
                    [0.0180416958283, 0.0159136071891, 0.00620690827127,
                        0.0, 0.0, 0.0046758424612],
                ),
                LinkParameters::new(
                    2.74,
                    [0.0, -0.06861, 0.0322285],
                    [0.0182856182281, 0.00621358421175, 0.0161514346309,
                        0.0, 0.0, -0.00472844221905],
                ),
                LinkParameters::new(
                    2.38,
                    [0.0469893, 0.0316374, -0.031704],
                    [0.00771376630908, 0.00989108008727, 0.00811723558464,
                        -0.00248490625138, -0.00332147581033, -0.00217796151484],
                ),
                LinkParameters::new(
                    2.38,
                    [-0.0360446, 0.0336853, 0.031882],
                    [0.00799663881132, 0.00825390705278, 0.0102515004345,
                        0.00347095570217, -0.00241222942995, 0.00235774044121],
                ),
                LinkParameters::new(
                    2.74,
                    [0.0, 0.0610427, -0.104176],
                    [0.030371374513, 0.0288752887402, 0.00444134056164,
                        6.50283587108e-07, -1.05129179916e-05, -0.00775653445787],
                ),
                LinkParameters::new(
                    1.55,
                    [0.5, 0.0, 0.0],
                    [0.00303336450376, 0.00404479911567, 0.00558234286039,
                        -0.000437276865508, 0.000629257294877, 0.000130472021025],
                ),
            ],
        }
    }
}

impl JointLimits {
    /// Mechanical joint limits of the Panda.
    pub fn panda() -> Self {
        JointLimits::new(
            [-2.8973, -1.7628, -2.8973, -3.0718, -2.8973, -0.0175, -2.8973],
            [2.8973, 1.7628, 2.8973, -0.0698, 2.8973, 3.7525, 2.8973],
        ).with_deadzone(PANDA_LAST_JOINT_DEADZONE)
    }
}
