//! Supports extracting robot parameters from YAML file (optional)

use std::path::Path;

use nalgebra::Vector3;
use regex::Regex;
use yaml_rust2::{Yaml, YamlLoader};

use crate::constraints::JointLimits;
use crate::kinematic_traits::{Joints, DOF};
use crate::parameter_error::ParameterError;
use crate::parameters::{DhParameters, LinkParameters, RobotParameters};
use crate::parameters_robots::standard_gravity;

/// Everything a YAML robot description provides: the chain and link parameters, the joint
/// limits and the gravity vector.
#[derive(Debug, Clone, PartialEq)]
pub struct RobotConfig {
    pub parameters: RobotParameters,
    pub limits: JointLimits,
    pub gravity: Vector3<f64>,
}

impl RobotConfig {
    /// Read the robot configuration from YAML file. YAML file like this is supported:
    /// ```yaml
    /// # Franka Emika Panda
    /// dh_parameters: # [a, alpha, d]
    ///   - [0, deg(-90), 0.333]
    ///   - [0, deg(90), 0]
    ///   # ... one row per joint, 7 in total
    /// links:
    ///   - mass: 2.92
    ///     center_of_mass: [-0.025566, -2.88e-05, 0.057332]
    ///     # Ixx, Iyy, Izz, Ixy, Ixz, Iyz
    ///     inertia: [0.0078, 0.0109, 0.0102, -1.56e-05, -0.00126, 1.08e-05]
    ///   # ... one entry per joint
    /// joint_limits:
    ///   lower: [deg(-166), deg(-101), deg(-166), deg(-176), deg(-166), deg(-1), deg(-166)]
    ///   upper: [deg(166), deg(101), deg(166), deg(-4), deg(166), deg(215), deg(166)]
    ///   last_joint_deadzone: 0.4887
    /// gravity: [0, 0, -9.81]
    /// ```
    /// Joint limits default to the Panda limits and gravity defaults to the standard gravity
    /// pointing down the base z axis.
    ///
    /// YAML extension to parse the deg(angle) function is supported.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, ParameterError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Same as [`RobotConfig::from_yaml_file`] for YAML text already in memory.
    pub fn from_yaml_str(contents: &str) -> Result<Self, ParameterError> {
        let docs = YamlLoader::load_from_str(contents)
            .map_err(|e| ParameterError::ParseError(e.to_string()))?;
        let doc = docs.first()
            .ok_or_else(|| ParameterError::ParseError("Empty YAML document".to_string()))?;

        let dh = section(doc, "dh_parameters")?
            .iter()
            .map(parse_dh_row)
            .collect::<Result<Vec<_>, _>>()?;
        let links = section(doc, "links")?
            .iter()
            .map(parse_link)
            .collect::<Result<Vec<_>, _>>()?;
        let parameters = RobotParameters::new(dh, links)?;

        let limits = match &doc["joint_limits"] {
            Yaml::BadValue => JointLimits::panda(),
            node => parse_limits(node)?,
        };

        let gravity = match &doc["gravity"] {
            Yaml::BadValue => standard_gravity(),
            node => Vector3::from(parse_fixed::<3>(node, "gravity", parse_number)?),
        };

        Ok(RobotConfig { parameters, limits, gravity })
    }
}

fn section<'a>(doc: &'a Yaml, name: &str) -> Result<&'a Vec<Yaml>, ParameterError> {
    match &doc[name] {
        Yaml::Array(items) => Ok(items),
        Yaml::BadValue => Err(ParameterError::MissingField(name.to_string())),
        _ => Err(ParameterError::ParseError(format!("{} must be a list", name))),
    }
}

fn parse_dh_row(row: &Yaml) -> Result<DhParameters, ParameterError> {
    let items = as_list(row, "dh_parameters row")?;
    if items.len() != 3 {
        return Err(ParameterError::InvalidLength { expected: 3, found: items.len() });
    }
    Ok(DhParameters::new(
        parse_number(&items[0])?,
        parse_angle(&items[1])?,
        parse_number(&items[2])?,
    ))
}

fn parse_link(link: &Yaml) -> Result<LinkParameters, ParameterError> {
    let mass = match &link["mass"] {
        Yaml::BadValue => return Err(ParameterError::MissingField("mass".to_string())),
        value => parse_number(value)?,
    };
    let center_of_mass = parse_fixed::<3>(&link["center_of_mass"], "center_of_mass", parse_number)?;
    let inertia = parse_fixed::<6>(&link["inertia"], "inertia", parse_number)?;
    Ok(LinkParameters::new(mass, center_of_mass, inertia))
}

fn parse_limits(node: &Yaml) -> Result<JointLimits, ParameterError> {
    let lower: Joints = parse_fixed::<DOF>(&node["lower"], "joint_limits.lower", parse_angle)?;
    let upper: Joints = parse_fixed::<DOF>(&node["upper"], "joint_limits.upper", parse_angle)?;
    let deadzone = match &node["last_joint_deadzone"] {
        Yaml::BadValue => 0.0,
        value => parse_angle(value)?,
    };
    Ok(JointLimits::try_new(lower, upper)?.with_deadzone(deadzone))
}

fn as_list<'a>(node: &'a Yaml, name: &str) -> Result<&'a Vec<Yaml>, ParameterError> {
    match node {
        Yaml::Array(items) => Ok(items),
        Yaml::BadValue => Err(ParameterError::MissingField(name.to_string())),
        _ => Err(ParameterError::ParseError(format!("{} must be a list", name))),
    }
}

/// Reads a list of exactly N values.
fn parse_fixed<const N: usize>(
    node: &Yaml,
    name: &str,
    parse: fn(&Yaml) -> Result<f64, ParameterError>,
) -> Result<[f64; N], ParameterError> {
    let items = as_list(node, name)?;
    if items.len() != N {
        return Err(ParameterError::InvalidLength { expected: N, found: items.len() });
    }
    let mut values = [0.0; N];
    for (value, item) in values.iter_mut().zip(items) {
        *value = parse(item)?;
    }
    Ok(values)
}

fn parse_number(node: &Yaml) -> Result<f64, ParameterError> {
    match node {
        Yaml::Real(text) => text.parse()
            .map_err(|_| ParameterError::ParseError(format!("Not a number: {}", text))),
        Yaml::Integer(value) => Ok(*value as f64),
        other => Err(ParameterError::ParseError(format!("Not a number: {:?}", other))),
    }
}

/// Angle in radians, or in degrees when written as deg(angle).
fn parse_angle(node: &Yaml) -> Result<f64, ParameterError> {
    match node {
        Yaml::String(text) => parse_deg(text),
        other => parse_number(other),
    }
}

fn parse_deg(text: &str) -> Result<f64, ParameterError> {
    let re = Regex::new(r"^deg\(\s*([-+]?\d+(\.\d+)?([eE][-+]?\d+)?)\s*\)$")
        .map_err(|_| ParameterError::ParseError("Invalid regex pattern".to_string()))?;

    let caps = re.captures(text.trim())
        .ok_or_else(|| ParameterError::WrongAngle(text.to_string()))?;
    let degrees: f64 = caps.get(1)
        .ok_or_else(|| ParameterError::WrongAngle(format!("Bad representation: {}", text)))?
        .as_str()
        .parse()
        .map_err(|_| ParameterError::WrongAngle(text.to_string()))?;
    Ok(degrees.to_radians())
}
