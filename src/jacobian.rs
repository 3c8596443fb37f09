extern crate nalgebra as na;

use na::linalg::SVD;
use na::{DMatrix, DVector, Matrix3, Matrix4, SMatrix, Vector3, Vector6};

use crate::kinematic_traits::{JointVector, Joints, Kinematics, DOF};
use crate::parameter_error::NumericSingularity;
use crate::utils::vector_to_joints;

/// 6 x 7 geometric Jacobian: rows are linear then angular velocity of the end effector,
/// columns are joints.
pub type JacobianMatrix = SMatrix<f64, 6, DOF>;

/// Projector on the null space of the Jacobian (joint velocities that do not move the end
/// effector).
pub type NullSpaceProjector = SMatrix<f64, DOF, DOF>;

/// Struct representing the Jacobian matrix
pub struct Jacobian {
    /// A 6x7 matrix representing the Jacobian
    ///
    /// The Jacobian matrix maps the joint velocities to the end-effector velocities.
    /// Each column corresponds to a joint, and each row corresponds to a degree of freedom
    /// of the end-effector (linear and angular velocities, in the base frame).
    matrix: JacobianMatrix,
}

impl Jacobian {
    /// Constructs a new Jacobian struct by computing the Jacobian matrix for the given robot
    /// and joint configuration
    ///
    /// # Arguments
    ///
    /// * `robot` - A reference to the robot implementing the Kinematics trait
    /// * `qs` - A reference to the joint configuration
    ///
    /// # Returns
    ///
    /// A new instance of `Jacobian`
    pub fn new(robot: &(impl Kinematics + ?Sized), qs: &Joints) -> Self {
        Self { matrix: compute_jacobian(robot, qs) }
    }

    pub fn from_matrix(matrix: JacobianMatrix) -> Self {
        Self { matrix }
    }

    pub fn matrix(&self) -> &JacobianMatrix {
        &self.matrix
    }

    /// Computes the joint velocities required to achieve a desired end-effector velocity
    ///
    /// # Arguments
    ///
    /// * `desired_end_effector_velocity` - A 6D vector representing the desired linear and
    ///   angular velocity of the end-effector. Components that are NaN are not constrained.
    ///
    /// # Returns
    ///
    /// Joint velocities, or `NumericSingularity::Jacobian` if the computation fails.
    ///
    /// The system is solved in the least squares sense (minimum norm solution through SVD),
    /// so rank deficient Jacobians are tolerated. The rows where the desired velocity is NaN
    /// are removed from both sides first; if nothing remains, the result is zero.
    pub fn velocities_from_vector(
        &self,
        desired_end_effector_velocity: &Vector6<f64>,
    ) -> Result<JointVector, NumericSingularity> {
        self.check_finite()?;
        let rows: Vec<usize> = (0..6)
            .filter(|&row| !desired_end_effector_velocity[row].is_nan())
            .collect();
        if rows.is_empty() {
            return Ok(JointVector::zeros());
        }

        let a = DMatrix::from_fn(rows.len(), DOF, |r, c| self.matrix[(rows[r], c)]);
        let b = DVector::from_fn(rows.len(), |r, _| desired_end_effector_velocity[rows[r]]);

        let svd = SVD::try_new(a, true, true, f64::EPSILON, 0)
            .ok_or(NumericSingularity::Jacobian)?;
        let cutoff = rank_cutoff(svd.singular_values.max(), rows.len());
        let solution = svd.solve(&b, cutoff).map_err(|_| NumericSingularity::Jacobian)?;
        Ok(JointVector::from_iterator(solution.iter().copied()))
    }

    /// Computes `I - J⁺J`. Valid for any rank of the Jacobian.
    pub fn null_space_projector(&self) -> Result<NullSpaceProjector, NumericSingularity> {
        self.check_finite()?;
        let svd = SVD::try_new(self.matrix, true, true, f64::EPSILON, 0)
            .ok_or(NumericSingularity::Jacobian)?;
        let cutoff = rank_cutoff(svd.singular_values.max(), DOF);
        let pseudo_inverse = svd.pseudo_inverse(cutoff)
            .map_err(|_| NumericSingularity::Jacobian)?;
        Ok(NullSpaceProjector::identity() - pseudo_inverse * self.matrix)
    }

    /// Removes from the joint velocity everything that would move the end effector.
    pub fn project_to_null_space(
        &self,
        joint_velocities: &JointVector,
    ) -> Result<JointVector, NumericSingularity> {
        Ok(self.null_space_projector()? * joint_velocities)
    }

    /// Computes the joint torques required to achieve a desired end-effector force/torque
    ///
    /// # Arguments
    ///
    /// * `desired_force_torque` - A 6D vector representing the desired force and torque at
    ///   the end-effector, in the base frame, torque taken about the end-effector origin.
    ///
    /// # Returns
    ///
    /// Joint torques.
    pub fn torques_from_vector(&self, desired_force_torque: &Vector6<f64>) -> Joints {
        let joint_torques = self.matrix.transpose() * desired_force_torque;
        vector_to_joints(&joint_torques)
    }

    fn check_finite(&self) -> Result<(), NumericSingularity> {
        if self.matrix.iter().all(|x| x.is_finite()) {
            Ok(())
        } else {
            Err(NumericSingularity::Jacobian)
        }
    }
}

/// Singular values below this are treated as zero (same convention as LAPACK least squares
/// with the default condition).
fn rank_cutoff(largest_singular_value: f64, dimension: usize) -> f64 {
    f64::EPSILON * dimension.max(DOF) as f64 * largest_singular_value
}

/// Function to compute the geometric Jacobian matrix for a given robot and joint configuration
///
/// Column i is `[z_i x (o_e - o_i); z_i]` where `z_i` and `o_i` are the axis and origin of
/// joint i and `o_e` is the end effector origin, all in the base frame.
pub fn compute_jacobian(robot: &(impl Kinematics + ?Sized), joints: &Joints) -> JacobianMatrix {
    let mut jacobian = JacobianMatrix::zeros();
    let (frames, tcp) = robot.forward_with_joint_poses(joints);
    let tip = tcp.translation.vector;

    for (i, frame) in frames.iter().enumerate() {
        let axis = frame.rotation * Vector3::z();
        let linear = axis.cross(&(tip - frame.translation.vector));
        jacobian.fixed_view_mut::<3, 1>(0, i).copy_from(&linear);
        jacobian.fixed_view_mut::<3, 1>(3, i).copy_from(&axis);
    }

    jacobian
}

/// Error between the target and the current end effector transforms (4x4 homogeneous, base
/// frame).
///
/// # Returns
///
/// `(translation, rotation)`: the displacement from the current origin to the target origin,
/// and the rotation vector turning the current frame toward the target. The rotation is
/// taken from the skew symmetric part of `R_targetᵀ R_current` and rotated back into base
/// coordinates; its length is the sine of the angle between the frames.
pub fn pose_error(target: &Matrix4<f64>, current: &Matrix4<f64>) -> (Vector3<f64>, Vector3<f64>) {
    let translation: Vector3<f64> =
        target.fixed_view::<3, 1>(0, 3) - current.fixed_view::<3, 1>(0, 3);

    let r_target: Matrix3<f64> = target.fixed_view::<3, 3>(0, 0).into_owned();
    let r_current: Matrix3<f64> = current.fixed_view::<3, 3>(0, 0).into_owned();
    let relative = r_target.transpose() * r_current;
    let skew = (relative - relative.transpose()) * 0.5;
    let axis = Vector3::new(-skew[(2, 1)], -skew[(0, 2)], -skew[(1, 0)]);

    (translation, r_target * axis)
}

/// [`pose_error`] stacked into a single 6D vector, translation first.
pub fn pose_error_vector(target: &Matrix4<f64>, current: &Matrix4<f64>) -> Vector6<f64> {
    let (translation, rotation) = pose_error(target, current);
    Vector6::new(
        translation.x, translation.y, translation.z,
        rotation.x, rotation.y, rotation.z,
    )
}
