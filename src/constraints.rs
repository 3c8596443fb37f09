use std::f64::consts::PI;

use rand::Rng;

use crate::kinematic_traits::{Joints, DOF};
use crate::parameter_error::ParameterError;

/// Hard joint limits. The last joint is special: its numeric range exceeds one revolution
/// while its physical travel is limited, so it is wrapped around rather than clamped unless
/// it sits in the deadzone band just above its upper limit.
#[derive(Debug, Clone, PartialEq)]
pub struct JointLimits {
    /// Lower limit of every joint, radians.
    pub lower: Joints,

    /// Upper limit of every joint, radians. Must not be less than the lower limit.
    pub upper: Joints,

    /// Width of the band beyond the upper limit of the last joint (in absolute value) where
    /// the joint is clamped directly.
    pub last_joint_deadzone: f64,
}

impl JointLimits {
    /// Limits taken as given. Every lower limit must be finite and not above its upper
    /// limit, otherwise clamping and sampling panic; use `try_new` for unchecked input.
    pub fn new(lower: Joints, upper: Joints) -> Self {
        JointLimits { lower, upper, last_joint_deadzone: 0.0 }
    }

    /// Same as `new`, but rejects non-finite or inverted limits.
    pub fn try_new(lower: Joints, upper: Joints) -> Result<Self, ParameterError> {
        for i in 0..DOF {
            if !lower[i].is_finite() || !upper[i].is_finite() {
                return Err(ParameterError::InvalidLimits(format!(
                    "joint {}: limits [{}, {}] are not finite",
                    i + 1,
                    lower[i],
                    upper[i]
                )));
            }
            if lower[i] > upper[i] {
                return Err(ParameterError::InvalidLimits(format!(
                    "joint {}: lower limit {} exceeds upper limit {}",
                    i + 1,
                    lower[i],
                    upper[i]
                )));
            }
        }
        Ok(Self::new(lower, upper))
    }

    pub fn with_deadzone(self, last_joint_deadzone: f64) -> Self {
        JointLimits { last_joint_deadzone, ..self }
    }

    /// Middle of the range of motion of every joint.
    pub fn center(&self) -> Joints {
        std::array::from_fn(|i| self.lower[i] + (self.upper[i] - self.lower[i]) / 2.0)
    }

    /// True if all angles are finite and within limits. Non-finite angles are never compliant.
    pub fn compliant(&self, angles: &Joints) -> bool {
        angles.iter().enumerate().all(|(i, &angle)| {
            angle.is_finite() && angle >= self.lower[i] && angle <= self.upper[i]
        })
    }

    /// Offset of every joint from the center of its range, normalized so that the limits
    /// map to -1 and 1.
    pub fn normalized_offset(&self, angles: &Joints) -> Joints {
        let center = self.center();
        std::array::from_fn(|i| 2.0 * (angles[i] - center[i]) / (self.upper[i] - self.lower[i]))
    }

    /// Clamps every joint except the last one to its own limits. The last joint is
    /// returned unchanged.
    pub fn clamp_leading(&self, angles: &Joints) -> Joints {
        let mut clamped = *angles;
        for i in 0..DOF - 1 {
            clamped[i] = angles[i].clamp(self.lower[i], self.upper[i]);
        }
        clamped
    }

    /// Brings the last joint into its limits. An angle whose magnitude exceeds the upper
    /// limit by less than the deadzone is clamped. Any other angle is folded back below a full
    /// revolution, shifted by a full revolution toward the range if still outside, and
    /// clamped.
    pub fn wrap_last_joint(&self, angles: &Joints) -> Joints {
        let two_pi = 2.0 * PI;
        let last = DOF - 1;
        let (lower, upper) = (self.lower[last], self.upper[last]);

        let mut angle = angles[last];
        if angle.abs() - upper < self.last_joint_deadzone {
            angle = angle.clamp(lower, upper);
        } else {
            if angle.abs() > two_pi {
                // Remainder keeps the sign of the angle
                angle %= two_pi;
            }
            if angle < lower {
                angle += two_pi;
            } else if angle > upper {
                angle -= two_pi;
            }
        }

        let mut wrapped = *angles;
        wrapped[last] = angle.clamp(lower, upper);
        wrapped
    }

    /// Uniformly distributed random configuration inside the limits.
    pub fn random_joints<R: Rng + ?Sized>(&self, rng: &mut R) -> Joints {
        std::array::from_fn(|i| rng.gen_range(self.lower[i]..=self.upper[i]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn limits() -> JointLimits {
        JointLimits::panda()
    }

    #[test]
    fn test_center() {
        let center = limits().center();
        assert_eq!(center[0], 0.0);
        assert!((center[3] - (-3.0718 - 0.0698) / 2.0).abs() < 1e-12);
        assert!((center[5] - (-0.0175 + 3.7525) / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_compliant() {
        let limits = limits();
        assert!(limits.compliant(&limits.center()));
        assert!(limits.compliant(&limits.lower));
        assert!(limits.compliant(&limits.upper));

        let mut outside = limits.center();
        outside[3] = 0.5;
        assert!(!limits.compliant(&outside));

        let mut nan = limits.center();
        nan[1] = f64::NAN;
        assert!(!limits.compliant(&nan));
    }

    #[test]
    fn test_normalized_offset_at_limits() {
        let limits = limits();
        let at_upper = limits.normalized_offset(&limits.upper);
        let at_lower = limits.normalized_offset(&limits.lower);
        for i in 0..DOF {
            assert!((at_upper[i] - 1.0).abs() < 1e-12);
            assert!((at_lower[i] + 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_clamp_leading_leaves_last_joint() {
        let limits = limits();
        let angles = [4.0, -4.0, 0.0, 1.0, 0.0, -1.0, 5.0];
        let clamped = limits.clamp_leading(&angles);
        assert_eq!(clamped[0], limits.upper[0]);
        assert_eq!(clamped[1], limits.lower[1]);
        assert_eq!(clamped[2], 0.0);
        assert_eq!(clamped[3], limits.upper[3]);
        assert_eq!(clamped[5], limits.lower[5]);
        assert_eq!(clamped[6], 5.0);
    }

    #[test]
    fn test_last_joint_in_deadzone_clamped() {
        let limits = limits();
        let mut angles = limits.center();
        angles[6] = 3.2; // Above the upper limit but inside the deadzone
        let wrapped = limits.wrap_last_joint(&angles);
        assert_eq!(wrapped[6], limits.upper[6]);

        angles[6] = -3.2;
        let wrapped = limits.wrap_last_joint(&angles);
        assert_eq!(wrapped[6], limits.lower[6]);
    }

    #[test]
    fn test_last_joint_wraps_around() {
        let limits = limits();
        let mut angles = limits.center();
        angles[6] = 4.0; // Beyond the deadzone, equivalent to 4 - 2 PI
        let wrapped = limits.wrap_last_joint(&angles);
        assert!((wrapped[6] - (4.0 - 2.0 * PI)).abs() < 1e-12);

        angles[6] = -4.0;
        let wrapped = limits.wrap_last_joint(&angles);
        assert!((wrapped[6] - (2.0 * PI - 4.0)).abs() < 1e-12);
    }

    #[test]
    fn test_last_joint_beyond_full_revolution() {
        let limits = limits();
        let mut angles = limits.center();
        angles[6] = 2.0 * PI + 0.5;
        let wrapped = limits.wrap_last_joint(&angles);
        assert!((wrapped[6] - 0.5).abs() < 1e-12);

        angles[6] = -4.0 * PI - 0.25;
        let wrapped = limits.wrap_last_joint(&angles);
        assert!((wrapped[6] + 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_deadzone_checked_before_folding() {
        // Folds to -3.0, just below the lower limit, but far outside the deadzone before
        // folding: shifted by a revolution and clamped to the upper limit
        let limits = limits();
        let mut angles = limits.center();
        angles[6] = -(2.0 * PI + 3.0);
        let wrapped = limits.wrap_last_joint(&angles);
        assert_eq!(wrapped[6], limits.upper[6]);

        angles[6] = 2.0 * PI + 3.0;
        let wrapped = limits.wrap_last_joint(&angles);
        assert_eq!(wrapped[6], limits.lower[6]);
    }

    #[test]
    fn test_wrap_always_within_limits() {
        let limits = limits();
        let mut angles = limits.center();
        let mut angle = -15.0;
        while angle < 15.0 {
            angles[6] = angle;
            let wrapped = limits.wrap_last_joint(&angles);
            assert!(limits.compliant(&wrapped), "{} wrapped to {}", angle, wrapped[6]);
            angle += 0.01;
        }
    }

    #[test]
    fn test_try_new_validates_limits() {
        let panda = limits();
        let checked = JointLimits::try_new(panda.lower, panda.upper)
            .expect("Panda limits are valid");
        assert_eq!(checked, JointLimits::new(panda.lower, panda.upper));

        let mut inverted = panda.lower;
        inverted[2] = panda.upper[2] + 0.1;
        let result = JointLimits::try_new(inverted, panda.upper);
        assert!(matches!(result, Err(ParameterError::InvalidLimits(_))));

        let mut open = panda.upper;
        open[4] = f64::INFINITY;
        let result = JointLimits::try_new(panda.lower, open);
        assert!(matches!(result, Err(ParameterError::InvalidLimits(_))));

        let mut nan = panda.lower;
        nan[0] = f64::NAN;
        assert!(JointLimits::try_new(nan, panda.upper).is_err());
    }

    #[test]
    fn test_random_joints_within_limits() {
        let limits = limits();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            assert!(limits.compliant(&limits.random_joints(&mut rng)));
        }
    }
}
