//! Command line front end: dynamics and inverse kinematics of a 7 axis arm, either the
//! built-in Panda or a robot described in YAML.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use nalgebra::{Translation3, UnitQuaternion, Vector6};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rs_panda_dynamics::constraints::JointLimits;
use rs_panda_dynamics::forward_dynamics::forward_dynamics_with_tip;
use rs_panda_dynamics::inverse_kinematics::IkSolver;
use rs_panda_dynamics::kinematic_traits::{Joints, Kinematics, Pose, DOF, JOINTS_AT_ZERO};
use rs_panda_dynamics::kinematics_impl::DhKinematics;
use rs_panda_dynamics::newton_euler::inverse_dynamics_with_tip;
use rs_panda_dynamics::parameters::RobotParameters;
use rs_panda_dynamics::parameters_from_file::RobotConfig;
use rs_panda_dynamics::parameters_robots::{standard_gravity, PANDA_NEUTRAL};
use rs_panda_dynamics::simulation::Simulation;
use rs_panda_dynamics::utils::{dump_pose, format_joints};

/// Dynamics and inverse kinematics of a 7 axis serial manipulator
#[derive(Parser)]
#[command(name = "rs-panda-dynamics")]
#[command(about = "Newton-Euler dynamics and null-space inverse kinematics", long_about = None)]
#[command(version)]
struct Cli {
    /// YAML robot description. The built-in Panda is used if not given.
    #[arg(long, global = true)]
    robot: Option<PathBuf>,

    /// Print the robot description as YAML before running the command
    #[arg(long, global = true)]
    show_robot: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Joint torques required for the given motion (inverse dynamics)
    Torques {
        /// Joint positions, radians, comma separated. Neutral configuration if not given.
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        q: Option<Vec<f64>>,

        /// Joint velocities, rad/s
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        dq: Option<Vec<f64>>,

        /// Joint accelerations, rad/s²
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        ddq: Option<Vec<f64>>,

        /// Wrench the end effector exerts: fx,fy,fz,mx,my,mz in the last link frame
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        wrench: Option<Vec<f64>>,
    },

    /// Joint accelerations caused by the given torques (forward dynamics)
    Accelerations {
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        q: Option<Vec<f64>>,

        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        dq: Option<Vec<f64>>,

        /// Actuator torques, Nm. Zero (passive arm) if not given.
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        tau: Option<Vec<f64>>,

        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        wrench: Option<Vec<f64>>,
    },

    /// Let the unpowered arm fall under gravity
    Simulate {
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        q: Option<Vec<f64>>,

        /// Integration step, seconds
        #[arg(long, default_value_t = 0.001)]
        dt: f64,

        /// Simulated time, seconds
        #[arg(long, default_value_t = 1.0)]
        duration: f64,

        /// Print every n-th sample
        #[arg(long, default_value_t = 100)]
        every: usize,
    },

    /// Joint configuration reaching the given end effector pose
    Ik {
        /// Target x,y,z,roll,pitch,yaw (meters and degrees)
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        pose: Vec<f64>,

        /// Initial guess, radians. Neutral configuration if not given.
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        guess: Option<Vec<f64>>,

        /// Number of attempts. Attempts after the first start from random configurations.
        #[arg(long, default_value_t = 1)]
        attempts: usize,

        /// Seed for the random restarts
        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Print the whole trajectory, not only the result
        #[arg(long)]
        trajectory: bool,
    },
}

fn main() -> Result<()> {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(directives.as_deref()))
        .init();

    let cli = Cli::parse();
    let config = match &cli.robot {
        Some(path) => RobotConfig::from_yaml_file(path)
            .with_context(|| format!("Failed to load robot from {}", path.display()))?,
        None => RobotConfig {
            parameters: RobotParameters::panda(),
            limits: JointLimits::panda(),
            gravity: standard_gravity(),
        },
    };
    if cli.show_robot {
        println!("{}", config.parameters.to_yaml());
    }

    match cli.command {
        Commands::Torques { q, dq, ddq, wrench } => {
            let q = joints_or(q, PANDA_NEUTRAL, "q")?;
            let dq = joints_or(dq, JOINTS_AT_ZERO, "dq")?;
            let ddq = joints_or(ddq, JOINTS_AT_ZERO, "ddq")?;
            let wrench = wrench_or_zero(wrench)?;
            let torques = inverse_dynamics_with_tip(
                &q, &dq, &ddq, &config.gravity, &wrench, &config.parameters);
            println!("[{}]", format_joints(&torques, false));
        }
        Commands::Accelerations { q, dq, tau, wrench } => {
            let q = joints_or(q, PANDA_NEUTRAL, "q")?;
            let dq = joints_or(dq, JOINTS_AT_ZERO, "dq")?;
            let tau = joints_or(tau, JOINTS_AT_ZERO, "tau")?;
            let wrench = wrench_or_zero(wrench)?;
            let ddq = forward_dynamics_with_tip(
                &q, &dq, &tau, &config.gravity, &wrench, &config.parameters)?;
            println!("[{}]", format_joints(&ddq, false));
        }
        Commands::Simulate { q, dt, duration, every } => {
            let q = joints_or(q, PANDA_NEUTRAL, "q")?;
            let mut simulation = Simulation::new(config.parameters, config.limits);
            simulation.gravity = config.gravity;
            simulation.dt = dt;
            let trajectory = simulation.simulate(&q, &JOINTS_AT_ZERO, duration)?;
            let every = every.max(1);
            for (step, joints) in trajectory.iter().enumerate() {
                if (step + 1) % every == 0 || step + 1 == trajectory.len() {
                    println!("{:8.3}: [{}]", (step + 1) as f64 * dt, format_joints(joints, false));
                }
            }
        }
        Commands::Ik { pose, guess, attempts, seed, trajectory } => {
            let target = target_pose(&pose)?;
            let guess = joints_or(guess, PANDA_NEUTRAL, "guess")?;
            let robot: Arc<dyn Kinematics> =
                Arc::new(DhKinematics::from_parameters(&config.parameters));
            let solver = IkSolver::new(robot.clone(), config.limits.clone());
            let mut rng = StdRng::seed_from_u64(seed);

            let mut start = guess;
            for attempt in 0..attempts.max(1) {
                let solution = solver.inverse(&target.to_homogeneous(), &start)?;
                info!(
                    "Attempt {}: {} iterations, success {}",
                    attempt + 1,
                    solution.trajectory.len(),
                    solution.success
                );
                if trajectory {
                    for joints in &solution.trajectory {
                        println!("  [{}]", format_joints(joints, false));
                    }
                }
                if solution.success {
                    println!("[{}]", format_joints(&solution.joints, false));
                    dump_pose(&robot.forward(&solution.joints));
                    return Ok(());
                }
                start = config.limits.random_joints(&mut rng);
            }
            bail!("No solution found in {} attempts", attempts.max(1));
        }
    }
    Ok(())
}

/// `RUST_LOG` directives if given and well formed, warnings only otherwise.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("warn"))
}

fn joints_or(values: Option<Vec<f64>>, default: Joints, name: &str) -> Result<Joints> {
    match values {
        None => Ok(default),
        Some(values) => {
            let found = values.len();
            values.try_into().map_err(|_| {
                anyhow::anyhow!("{} needs {} values, {} given", name, DOF, found)
            })
        }
    }
}

fn wrench_or_zero(values: Option<Vec<f64>>) -> Result<Vector6<f64>> {
    match values {
        None => Ok(Vector6::zeros()),
        Some(values) if values.len() == 6 => Ok(Vector6::from_column_slice(&values)),
        Some(values) => bail!("wrench needs 6 values, {} given", values.len()),
    }
}

fn target_pose(values: &[f64]) -> Result<Pose> {
    if values.len() != 6 {
        bail!("pose needs x,y,z,roll,pitch,yaw, {} values given", values.len());
    }
    let translation = Translation3::new(values[0], values[1], values[2]);
    let rotation = UnitQuaternion::from_euler_angles(
        values[3].to_radians(), values[4].to_radians(), values[5].to_radians());
    Ok(Pose::from_parts(translation, rotation))
}
