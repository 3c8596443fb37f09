//! Defines the chain (Denavit-Hartenberg) and link (mass, center of mass, inertia) parameter
//! data structures shared by the dynamics and the kinematics.

use nalgebra::{Isometry3, Matrix3, Rotation3, Translation3, UnitQuaternion, Vector3};

use crate::kinematic_traits::DOF;
use crate::parameter_error::ParameterError;
use crate::utils::deg;

/// Denavit-Hartenberg parameters of one joint, standard convention. The transform from the
/// previous frame to the frame of this joint is `Rz(q) * Tz(d) * Tx(a) * Rx(alpha)`, so the
/// joint turns about the z axis of the previous frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DhParameters {
    /// Link length, along the x axis of this frame.
    pub a: f64,

    /// Link twist, about the x axis of this frame.
    pub alpha: f64,

    /// Link offset, along the z axis of the previous frame.
    pub d: f64,
}

impl DhParameters {
    pub const fn new(a: f64, alpha: f64, d: f64) -> Self {
        DhParameters { a, alpha, d }
    }

    /// Rotation matrix from this frame to the previous one for the joint angle `q`.
    pub fn rotation(&self, q: f64) -> Matrix3<f64> {
        let (s, c) = q.sin_cos();
        let (sa, ca) = self.alpha.sin_cos();
        Matrix3::new(
            c, -s * ca, s * sa,
            s, c * ca, -c * sa,
            0.0, sa, ca,
        )
    }

    /// Origin of this frame relative to the previous one, expressed in this frame. It does
    /// not depend on the joint angle.
    pub fn origin_in_own_frame(&self) -> Vector3<f64> {
        let (sa, ca) = self.alpha.sin_cos();
        Vector3::new(self.a, self.d * sa, self.d * ca)
    }

    /// Rigid transform from the previous frame to this one for the joint angle `q`.
    pub fn transform(&self, q: f64) -> Isometry3<f64> {
        let (s, c) = q.sin_cos();
        let rotation = Rotation3::from_matrix_unchecked(self.rotation(q));
        Isometry3::from_parts(
            Translation3::new(self.a * c, self.a * s, self.d),
            UnitQuaternion::from_rotation_matrix(&rotation),
        )
    }
}

/// Dynamic parameters of one link, all expressed in the frame attached at the distal end of
/// the link (the frame of its joint in the DH table).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkParameters {
    /// Mass in kilograms.
    pub mass: f64,

    /// Center of mass offset from the link frame origin, in meters.
    pub center_of_mass: Vector3<f64>,

    /// Inertia tensor about the center of mass as `[Ixx, Iyy, Izz, Ixy, Ixz, Iyz]`.
    pub inertia: [f64; 6],
}

impl LinkParameters {
    pub fn new(mass: f64, center_of_mass: [f64; 3], inertia: [f64; 6]) -> Self {
        LinkParameters {
            mass,
            center_of_mass: Vector3::from(center_of_mass),
            inertia,
        }
    }

    /// Symmetric 3x3 inertia tensor about the center of mass.
    pub fn inertia_tensor(&self) -> Matrix3<f64> {
        let [ixx, iyy, izz, ixy, ixz, iyz] = self.inertia;
        Matrix3::new(
            ixx, ixy, ixz,
            ixy, iyy, iyz,
            ixz, iyz, izz,
        )
    }
}

/// Complete description of the chain: one DH row and one link record per joint.
/// See [parameters_robots.rs](parameters_robots.rs) for the reference Panda values.
/// The structure is immutable once built and is shared by reference between any number
/// of concurrent dynamics computations.
#[derive(Debug, Clone, PartialEq)]
pub struct RobotParameters {
    pub dh: [DhParameters; DOF],
    pub links: [LinkParameters; DOF],
}

impl RobotParameters {
    /// Builds the description from lists that may come from a file. Both lists must have
    /// exactly one entry per joint.
    pub fn new(dh: Vec<DhParameters>, links: Vec<LinkParameters>) -> Result<Self, ParameterError> {
        let dh: [DhParameters; DOF] = dh.try_into().map_err(|rows: Vec<DhParameters>| {
            ParameterError::InvalidLength { expected: DOF, found: rows.len() }
        })?;
        let links: [LinkParameters; DOF] = links.try_into().map_err(|rows: Vec<LinkParameters>| {
            ParameterError::InvalidLength { expected: DOF, found: rows.len() }
        })?;
        Ok(RobotParameters { dh, links })
    }

    /// Convert to string yaml representation (quick viewing, etc).
    /// The output can be read back with `RobotConfig::from_yaml_str`.
    pub fn to_yaml(&self) -> String {
        let mut yaml = String::from("dh_parameters: # [a, alpha, d]\n");
        for row in &self.dh {
            yaml.push_str(&format!("  - [{}, {}, {}]\n", row.a, deg(&row.alpha), row.d));
        }
        yaml.push_str("links:\n");
        for link in &self.links {
            let com = &link.center_of_mass;
            yaml.push_str(&format!(
                "  - mass: {}\n    center_of_mass: [{}, {}, {}]\n    inertia: [{}]\n",
                link.mass,
                com.x, com.y, com.z,
                link.inertia.iter().map(|x| x.to_string())
                    .collect::<Vec<_>>().join(", ")
            ));
        }
        yaml
    }
}
