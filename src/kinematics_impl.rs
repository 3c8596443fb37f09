use crate::kinematic_traits::{Joints, Kinematics, Pose, DOF};
use crate::parameters::{DhParameters, RobotParameters};

/// Forward kinematics by chaining the Denavit-Hartenberg transforms of the robot. This is
/// the kinematic provider for the inverse kinematics solver; it shares the DH table with the
/// dynamic model so that both see the same geometry.
#[derive(Debug, Clone)]
pub struct DhKinematics {
    dh: [DhParameters; DOF],
}

impl DhKinematics {
    /// Creates a new `DhKinematics` instance with the given DH table.
    pub fn new(dh: [DhParameters; DOF]) -> Self {
        DhKinematics { dh }
    }

    /// Uses the DH table of the complete robot description.
    pub fn from_parameters(parameters: &RobotParameters) -> Self {
        Self::new(parameters.dh)
    }
}

impl Kinematics for DhKinematics {
    fn forward(&self, qs: &Joints) -> Pose {
        self.dh.iter().zip(qs.iter())
            .fold(Pose::identity(), |pose, (row, &q)| pose * row.transform(q))
    }

    fn forward_with_joint_poses(&self, qs: &Joints) -> ([Pose; DOF], Pose) {
        let mut frames = [Pose::identity(); DOF];
        let mut pose = Pose::identity();
        for i in 0..DOF {
            // Joint i turns about z of the frame reached so far
            frames[i] = pose;
            pose *= self.dh[i].transform(qs[i]);
        }
        (frames, pose)
    }
}
