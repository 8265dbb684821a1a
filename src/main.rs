// Bench bring-up tool: list ports, open a rig and show its axes, convert values
//
// Usage:
//   stepper-rig ports
//   stepper-rig show --config rig.json
//   stepper-rig show --axes 3 --no-connection
//   stepper-rig convert --spr 2048 --radius 1.0 --steps 512

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use stepper_rig::config::{DEFAULT_BAUD_RATE, DEFAULT_RADIUS};
use stepper_rig::{
    OpenOptions, Rig, RigConfig, RigError, SerialTransport, SystemSerial, coord_to_step_linear,
    step_to_coord_linear,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stepper-rig", version, about = "Multi-axis stepper rig over serial")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List serial ports in the order autodetection would try them
    Ports,
    /// Open a rig and print its per-axis state
    Show {
        /// JSON rig description; overrides the flags below
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, default_value_t = 1)]
        axes: usize,
        /// Defaults to the first detected port
        #[arg(long)]
        port: Option<String>,
        #[arg(long, default_value_t = DEFAULT_BAUD_RATE)]
        baud: u32,
        /// Don't touch the serial port
        #[arg(long)]
        no_connection: bool,
    },
    /// Evaluate the linear conversion for one value
    Convert {
        /// Steps per revolution
        #[arg(long)]
        spr: u32,
        #[arg(long, default_value_t = DEFAULT_RADIUS)]
        radius: f64,
        #[arg(long, conflicts_with = "coord", required_unless_present = "coord")]
        steps: Option<f64>,
        #[arg(long)]
        coord: Option<f64>,
    },
}

fn main() {
    // Setup logging (set RUST_LOG=debug for more)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Command::Ports => {
            let ports = SystemSerial::new().available_ports()?;
            if ports.is_empty() {
                warn!("No serial ports detected");
            }
            for port in ports {
                println!("{}", port);
            }
        }
        Command::Show {
            config,
            axes,
            port,
            baud,
            no_connection,
        } => {
            let serial = SystemSerial::new();
            let rig = match config {
                Some(path) => {
                    let description = RigConfig::load(&path)?;
                    description.open_rig(&serial).inspect_err(|e| {
                        if matches!(
                            e,
                            RigError::LengthMismatch { .. } | RigError::InvalidConversion { .. }
                        ) {
                            warn!("Rejected rig description {}: {}", path.display(), e);
                        }
                    })?
                }
                None => {
                    let mut options = OpenOptions::new()
                        .baud_rate(baud)
                        .no_connection(no_connection);
                    options.port = port;
                    Rig::open(&serial, axes, &options)?
                }
            };
            print_rig(&rig);
        }
        Command::Convert {
            spr,
            radius,
            steps,
            coord,
        } => {
            if let Some(steps) = steps {
                let coord = step_to_coord_linear(spr, radius)?(steps);
                println!("{} steps -> {}", steps, coord);
            } else if let Some(coord) = coord {
                let steps = coord_to_step_linear(spr, radius)?(coord);
                println!("{} -> {} steps", coord, steps);
            }
        }
    }
    Ok(())
}

fn print_rig<H>(rig: &Rig<H>) {
    match rig.connection().port() {
        Some(port) => info!(
            "Connected to {} at {} baud",
            port,
            rig.connection().baud_rate().unwrap_or_default()
        ),
        None => info!("No connection (bench mode)"),
    }

    println!("{:<4} {:<12} {:>12} {:>10}", "#", "id", "position", "depends");
    for axis in 0..rig.axis_count() {
        println!(
            "{:<4} {:<12} {:>12.4} {:>10}",
            axis,
            rig.identifiers()[axis],
            rig.position()[axis],
            rig.dependency()[axis]
        );
    }
}
