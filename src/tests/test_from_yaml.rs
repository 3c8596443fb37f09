use crate::constraints::JointLimits;
use crate::kinematic_traits::DOF;
use crate::parameter_error::ParameterError;
use crate::parameters::RobotParameters;
use crate::parameters_from_file::RobotConfig;
use crate::parameters_robots::standard_gravity;

const READ_ERROR: &str = "Failed to load parameters from file";

fn assert_parameters_close(loaded: &RobotParameters, expected: &RobotParameters) {
    const SMALL: f64 = 1e-12;
    for i in 0..DOF {
        let (l, e) = (&loaded.dh[i], &expected.dh[i]);
        assert!((l.a - e.a).abs() < SMALL, "a of joint {}", i + 1);
        assert!((l.alpha - e.alpha).abs() < SMALL, "alpha of joint {}", i + 1);
        assert!((l.d - e.d).abs() < SMALL, "d of joint {}", i + 1);

        let (l, e) = (&loaded.links[i], &expected.links[i]);
        assert_eq!(l.mass, e.mass, "mass of link {}", i + 1);
        let offset = (l.center_of_mass - e.center_of_mass).norm();
        assert!(offset < SMALL, "center of mass of link {}", i + 1);
        assert_eq!(l.inertia, e.inertia, "inertia of link {}", i + 1);
    }
}

#[test]
fn test_panda_from_yaml() {
    let filename = "src/tests/data/panda.yaml";
    let loaded = RobotConfig::from_yaml_file(filename).expect(READ_ERROR);

    assert_parameters_close(&loaded.parameters, &RobotParameters::panda());
    assert_eq!(loaded.limits, JointLimits::panda());
    assert_eq!(loaded.gravity, standard_gravity());
}

#[test]
fn test_to_yaml_reads_back() {
    let panda = RobotParameters::panda();
    let loaded = RobotConfig::from_yaml_str(&panda.to_yaml()).expect(READ_ERROR);
    assert_parameters_close(&loaded.parameters, &panda);

    // Sections that are not written fall back to the defaults
    assert_eq!(loaded.limits, JointLimits::panda());
    assert_eq!(loaded.gravity, standard_gravity());
}

#[test]
fn test_limits_and_gravity_in_degrees() {
    let mut yaml = RobotParameters::panda().to_yaml();
    yaml.push_str(concat!(
        "joint_limits:\n",
        "  lower: [deg(-170), deg(-100), deg(-170), deg(-175), deg(-170), deg(-1), deg(-170)]\n",
        "  upper: [deg(170), deg(100), deg(170), deg(-4), deg(170), deg(215), deg(170)]\n",
        "gravity: [0, -9.81, 0]\n",
    ));
    let loaded = RobotConfig::from_yaml_str(&yaml).expect(READ_ERROR);
    assert!((loaded.limits.upper[5] - 215.0_f64.to_radians()).abs() < 1e-12);
    assert!((loaded.limits.lower[0] + 170.0_f64.to_radians()).abs() < 1e-12);
    assert_eq!(loaded.limits.last_joint_deadzone, 0.0);
    assert_eq!(loaded.gravity.y, -9.81);
}

#[test]
fn test_wrong_number_of_rows_rejected() {
    let yaml = RobotParameters::panda().to_yaml();
    // Drop the last DH row
    let shortened: Vec<&str> = yaml.lines()
        .filter(|line| !line.starts_with("  - [0, 0, "))
        .collect();
    let result = RobotConfig::from_yaml_str(&shortened.join("\n"));
    match result {
        Err(ParameterError::InvalidLength { expected, found }) => {
            assert_eq!(expected, DOF);
            assert_eq!(found, DOF - 1);
        }
        other => panic!("Expected InvalidLength, got {:?}", other),
    }
}

#[test]
fn test_inverted_limits_rejected() {
    let mut yaml = RobotParameters::panda().to_yaml();
    yaml.push_str(concat!(
        "joint_limits:\n",
        "  lower: [1, 0, 0, 0, 0, 0, 0]\n",
        "  upper: [0, 0, 0, 0, 0, 0, 0]\n",
    ));
    let result = RobotConfig::from_yaml_str(&yaml);
    assert!(matches!(result, Err(ParameterError::InvalidLimits(_))), "{:?}", result.err());
}

#[test]
fn test_bad_angle_rejected() {
    let yaml = RobotParameters::panda().to_yaml().replacen("deg(", "rad(", 1);
    assert!(matches!(RobotConfig::from_yaml_str(&yaml), Err(ParameterError::WrongAngle(_))));
}

#[test]
fn test_missing_file() {
    let result = RobotConfig::from_yaml_file("src/tests/data/no_such_robot.yaml");
    assert!(matches!(result, Err(ParameterError::IoError(_))));
}
