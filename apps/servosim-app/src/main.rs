//! Servosim command-line interface.
//!
//! Provides two modes of operation:
//! - `run`: cycle a robot description with a constant velocity target and
//!   print the final observation as JSON
//! - `info`: print the joint property table of a robot description

use std::error::Error;
use std::f64::consts::TAU;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use crossbeam_channel::RecvTimeoutError;
use servosim_actuator_core::layout::ServoLayout;
use servosim_core::{Dictionary, config::SimParameters};
use servosim_observation::prelude::*;
use servosim_sim::prelude::*;
use servosim_urdf::RobotModel;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

type AppResult<T> = Result<T, Box<dyn Error>>;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

/// Servo actuation and sensor emulation over a physics simulation.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Cycle the simulation and print the final observation.
    Run {
        /// Robot description (URDF).
        urdf: PathBuf,

        /// Simulation parameters (TOML).
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of cycles to run.
        #[arg(short = 'n', long, default_value_t = 1000)]
        cycles: u32,

        /// Velocity target of every servo (rev/s).
        #[arg(short, long, default_value_t = 0.0)]
        velocity: f64,

        /// Temperature file in millidegrees Celsius, published as CPU
        /// temperature while running.
        #[arg(long)]
        cpu_temperature_file: Option<PathBuf>,
    },

    /// Print the joint property table.
    Info {
        /// Robot description (URDF).
        urdf: PathBuf,

        /// Simulation parameters (TOML).
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

// ---------------------------------------------------------------------------
// Setup
// ---------------------------------------------------------------------------

fn load_parameters(urdf: &Path, config: Option<&Path>) -> AppResult<SimParameters> {
    let mut params = match config {
        Some(path) => SimParameters::from_file(path)?,
        None => SimParameters::default(),
    };
    params.robot_description_path = urdf.to_owned();
    Ok(params)
}

/// One servo per actuated joint, numbered from 1 in joint name order, all
/// on bus 1.
fn layout_from_model(model: &RobotModel) -> AppResult<ServoLayout> {
    let mut layout = ServoLayout::new();
    for (servo_id, joint) in (1..).zip(model.actuated_joint_names()) {
        layout.add_servo(servo_id, 1, joint)?;
    }
    Ok(layout)
}

// ---------------------------------------------------------------------------
// Mode implementations
// ---------------------------------------------------------------------------

/// Publish the temperature file every `period` until `stop` fires or the
/// subscriber goes away.
fn publish_temperature_file(
    path: &Path,
    publisher: &TemperaturePublisher,
    stop: &crossbeam_channel::Receiver<()>,
    period: Duration,
) {
    loop {
        match read_millidegrees(path) {
            Ok(temperature) => match publisher.publish(temperature) {
                Ok(()) => {}
                Err(ObservationError::Disconnected(_)) => return,
                Err(e) => debug!(error = %e, "temperature reading dropped"),
            },
            Err(e) => error!(error = %e, "cannot read CPU temperature"),
        }
        match stop.recv_timeout(period) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
        }
    }
}

fn run_cycles(
    urdf: &Path,
    config: Option<&Path>,
    cycles: u32,
    velocity: f64,
    cpu_temperature_file: Option<&Path>,
) -> AppResult<()> {
    let params = load_parameters(urdf, config)?;
    let model = servosim_urdf::parse_file(urdf)?;
    let layout = layout_from_model(&model)?;
    let mut interface = SimInterface::with_model(&layout, params, &model)?;

    let mut buffer = ActuationBuffer::new(&layout);
    let mut action = Dictionary::new();
    buffer.initialize_action(&mut action);
    for joint in layout.joints() {
        let target = action.child_mut(SERVO_NAMESPACE).child_mut(joint);
        target.insert("position", f64::NAN);
        target.insert("velocity", velocity * TAU);
    }
    buffer.write_position_commands(&action)?;

    let mut pipeline = ObserverPipeline::new();
    let (publisher, subscriber) = TemperatureSubscriber::channel("cpu_temperature");
    let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);

    let observation = std::thread::scope(|scope| {
        if let Some(path) = cpu_temperature_file {
            pipeline.connect_source(subscriber);
            scope.spawn(move || {
                publish_temperature_file(path, &publisher, &stop_rx, Duration::from_millis(100));
            });
        }
        info!(cycles, velocity, servos = layout.len(), "running");
        let observation = simulate(&mut interface, &mut buffer, &mut pipeline, cycles);
        // Unblocks the publisher before the scope joins it.
        let _ = stop_tx.send(());
        observation
    })?;

    println!("{}", serde_json::to_string_pretty(&observation.to_json())?);
    Ok(())
}

fn simulate(
    interface: &mut SimInterface,
    buffer: &mut ActuationBuffer,
    pipeline: &mut ObserverPipeline,
    cycles: u32,
) -> AppResult<Dictionary> {
    for _ in 0..cycles {
        interface.cycle(&mut buffer.data(), Box::new(|_| {}))?;
    }
    let mut observation = Dictionary::new();
    interface.observe(&mut observation);
    observe_servos(&mut observation, interface.servo_joint_map(), buffer.replies());
    pipeline.run(&mut observation);
    Ok(observation)
}

fn run_info(urdf: &Path, config: Option<&Path>) -> AppResult<()> {
    let params = load_parameters(urdf, config)?;
    let model = servosim_urdf::parse_file(urdf)?;
    let layout = layout_from_model(&model)?;
    let interface = SimInterface::with_model(&layout, params, &model)?;

    println!("servosim v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!(
        "robot: {} ({} links, {} actuated joints, {:.3} kg)",
        model.name,
        model.links.len(),
        model.dof(),
        model.total_mass()
    );
    println!();
    println!("{:>5}  {:<20} {:>12} {:>16}", "servo", "joint", "friction", "max torque");
    for (servo_id, _, joint) in layout.iter() {
        if let Some(props) = interface.joint_properties().get(joint) {
            println!(
                "{servo_id:>5}  {joint:<20} {:>12.4} {:>16.4}",
                props.friction, props.maximum_torque
            );
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // Logs go to stderr so stdout stays valid JSON.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            urdf,
            config,
            cycles,
            velocity,
            cpu_temperature_file,
        } => run_cycles(
            &urdf,
            config.as_deref(),
            cycles,
            velocity,
            cpu_temperature_file.as_deref(),
        ),
        Commands::Info { urdf, config } => run_info(&urdf, config.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_arguments() {
        let cli = Cli::try_parse_from([
            "servosim", "run", "robot.urdf", "-n", "10", "--velocity", "0.5",
        ])
        .unwrap();
        match cli.command {
            Commands::Run {
                urdf,
                cycles,
                velocity,
                config,
                cpu_temperature_file,
            } => {
                assert_eq!(urdf, PathBuf::from("robot.urdf"));
                assert_eq!(cycles, 10);
                assert!((velocity - 0.5).abs() < f64::EPSILON);
                assert!(config.is_none());
                assert!(cpu_temperature_file.is_none());
            }
            Commands::Info { .. } => panic!("expected run"),
        }
    }
}
