//! Error handling for robot descriptions and numeric failures

use std::io;

/// Unified error to report a robot description that cannot be used, both when built in code
/// and when read from a YAML file. These are configuration problems: they are detected once,
/// at load time, and are not retried.
#[derive(Debug)]
pub enum ParameterError {
    IoError(io::Error),
    ParseError(String),
    MissingField(String),
    WrongAngle(String),
    InvalidLength { expected: usize, found: usize },
    InvalidLimits(String),
}

impl std::fmt::Display for ParameterError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            ParameterError::IoError(ref err) =>
                write!(f, "IO Error: {}", err),
            ParameterError::ParseError(ref msg) =>
                write!(f, "Parse Error: {}", msg),
            ParameterError::WrongAngle(ref msg) =>
                write!(f, "Wrong angle representation: {}", msg),
            ParameterError::MissingField(ref field) =>
                write!(f, "Missing Field: {}", field),
            ParameterError::InvalidLength { expected, found } =>
                write!(f, "Invalid Length: expected {}, found {}", expected, found),
            ParameterError::InvalidLimits(ref msg) =>
                write!(f, "Invalid joint limits: {}", msg),
        }
    }
}

impl std::error::Error for ParameterError {}

impl From<io::Error> for ParameterError {
    fn from(err: io::Error) -> Self {
        ParameterError::IoError(err)
    }
}

/// A linear system that the dynamics or the inverse kinematics needed to solve is singular
/// or otherwise unusable. This fails the single computation only; the caller may retry with
/// perturbed input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericSingularity {
    /// The joint space inertia matrix is not invertible (degenerate dynamic parameters).
    MassMatrix,
    /// The Jacobian contains non-finite values or could not be decomposed.
    Jacobian,
}

impl std::fmt::Display for NumericSingularity {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            NumericSingularity::MassMatrix =>
                write!(f, "Numeric singularity: mass matrix is not invertible"),
            NumericSingularity::Jacobian =>
                write!(f, "Numeric singularity: Jacobian cannot be decomposed"),
        }
    }
}

impl std::error::Error for NumericSingularity {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_invalid_length() {
        let err = ParameterError::InvalidLength { expected: 7, found: 6 };
        assert_eq!(err.to_string(), "Invalid Length: expected 7, found 6");
    }

    #[test]
    fn test_display_invalid_limits() {
        let err = ParameterError::InvalidLimits("joint 3 is inverted".into());
        assert_eq!(err.to_string(), "Invalid joint limits: joint 3 is inverted");
    }

    #[test]
    fn test_io_error_conversion() {
        let err: ParameterError = io::Error::new(io::ErrorKind::NotFound, "robot.yaml").into();
        assert!(matches!(err, ParameterError::IoError(_)));
    }
}
