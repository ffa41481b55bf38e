use apt_driver::{
    config::{LogFormat, LoggingConfig},
    AptResult, AptService, ConfigLoader, HardwareType, UsbSerialTransport,
};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

type Service = AptService<UsbSerialTransport>;

// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    name = "apt-driver",
    version,
    about = "Drive Thorlabs APT motor controllers over USB serial."
)]
struct Cli {
    /// Configuration file (defaults to the standard search path)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Restrict device selection to an APT hardware type code (0 = any)
    #[arg(long, global = true, default_value = "0", value_parser = parse_hw_type)]
    hw_type: HwFilter,

    /// Serial number of the controller to address
    #[arg(long, global = true)]
    serial: Option<u32>,

    /// Index among matching controllers, used when --serial is absent
    #[arg(long, global = true, default_value_t = 0)]
    index: usize,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List discovered controllers
    List,
    /// Read the identity block
    Info,
    /// Flash the front-panel LED
    Identify,
    /// Enable the drive channel
    Enable,
    /// Disable the drive channel
    Disable,
    /// Home the stage
    Home {
        #[arg(long)]
        wait: bool,
    },
    /// Move by a distance in encoder counts
    MoveRel {
        #[arg(allow_hyphen_values = true)]
        distance: f32,
        #[arg(long)]
        wait: bool,
    },
    /// Move to a position in encoder counts
    MoveAbs {
        #[arg(allow_hyphen_values = true)]
        position: f32,
        #[arg(long)]
        wait: bool,
    },
    /// Read the position counter
    Position,
    /// Read or write the velocity profile
    Velocity {
        #[command(subcommand)]
        command: VelocityCommand,
    },
    /// Read the stage limits
    Stage,
    /// Select a channel (after reading the identity block)
    Channel { channel: u16 },
    /// Run identity, channel select, identify, enable, home, zero move and position
    Demo,
}

#[derive(Subcommand, Debug)]
enum VelocityCommand {
    Get,
    Set { min: f32, accel: f32, max: f32 },
}

/// Hardware type filter; `None` matches every controller.
#[derive(Debug, Clone, Copy)]
struct HwFilter(Option<HardwareType>);

fn parse_hw_type(raw: &str) -> Result<HwFilter, String> {
    let code: u32 = raw
        .parse()
        .map_err(|_| format!("'{raw}' is not a hardware type code"))?;
    if code == 0 {
        return Ok(HwFilter(None));
    }
    HardwareType::from_code(code)
        .map(|t| HwFilter(Some(t)))
        .ok_or_else(|| format!("unknown hardware type code {code}"))
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
    }
}

/// Print `value` as JSON, or as `text` otherwise.
fn emit<T: Serialize>(
    json: bool,
    value: &T,
    text: impl FnOnce() -> String,
) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", text());
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let loader = match &cli.config {
        Some(path) => ConfigLoader::load_from(path)?,
        None => ConfigLoader::load()?,
    };
    init_tracing(&loader.config().logging);

    let service = AptService::usb(loader.into_config());
    service.initialize()?;

    let result = run(&cli, &service);
    service.teardown();
    result
}

/// Controller addressed by `--serial`, or by `--hw-type`/`--index`.
fn target(cli: &Cli, service: &Service) -> AptResult<u32> {
    match cli.serial {
        Some(serial) => Ok(serial),
        None => service.nth_serial(cli.hw_type.0, cli.index),
    }
}

fn run(cli: &Cli, service: &Service) -> Result<(), Box<dyn std::error::Error>> {
    if let Commands::List = cli.command {
        let records = service.records()?;
        return emit(cli.json, &records, || {
            records
                .iter()
                .map(|r| format!("{}\t{}\t{}", r.serial_number, r.hardware_type, r.port_identifier))
                .collect::<Vec<_>>()
                .join("\n")
        });
    }

    let serial = target(cli, service)?;
    match &cli.command {
        Commands::List => Ok(()),
        Commands::Info => {
            let info = service.query_info(serial)?;
            emit(cli.json, &info, || {
                format!(
                    "model {}\nfirmware {}\nhardware {}\nchannels {}\nnotes {}",
                    info.model_number,
                    info.firmware_version,
                    info.hardware_version,
                    info.channel_count,
                    info.notes
                )
            })
        }
        Commands::Identify => service.identify(serial).map_err(Into::into),
        Commands::Enable => service.set_channel_enable(serial, true).map_err(Into::into),
        Commands::Disable => service.set_channel_enable(serial, false).map_err(Into::into),
        Commands::Home { wait } => service.move_home(serial, *wait).map_err(Into::into),
        Commands::MoveRel { distance, wait } => service
            .move_relative(serial, *distance, *wait)
            .map_err(Into::into),
        Commands::MoveAbs { position, wait } => service
            .move_absolute(serial, *position, *wait)
            .map_err(Into::into),
        Commands::Position => {
            let position = service.get_position(serial)?;
            emit(cli.json, &position, || position.to_string())
        }
        Commands::Velocity { command } => {
            let params = match command {
                VelocityCommand::Get => service.get_velocity_params(serial)?,
                VelocityCommand::Set { min, accel, max } => {
                    service.set_velocity_params(serial, *min, *accel, *max)?
                }
            };
            emit(cli.json, &params, || {
                format!(
                    "min {} accel {} max {}",
                    params.min_vel, params.accel, params.max_vel
                )
            })
        }
        Commands::Stage => {
            let stage = service.get_stage_axis_info(serial)?;
            emit(cli.json, &stage, || {
                format!(
                    "min {} max {} units {} pitch {}",
                    stage.min_pos, stage.max_pos, stage.units, stage.pitch
                )
            })
        }
        Commands::Channel { channel } => {
            service.query_info(serial)?;
            service.select_channel(serial, *channel)?;
            let record = service.record(serial)?;
            emit(cli.json, &record, || {
                format!("device {} channel {}", serial, channel)
            })
        }
        Commands::Demo => demo(cli, service, serial),
    }
}

fn demo(cli: &Cli, service: &Service, serial: u32) -> Result<(), Box<dyn std::error::Error>> {
    service.query_info(serial)?;
    service.select_channel(serial, 1)?;
    service.identify(serial)?;
    service.set_channel_enable(serial, true)?;
    service.move_home(serial, true)?;
    service.move_relative(serial, 0.0, true)?;
    let position = service.get_position(serial)?;
    let record = service.record(serial)?;
    emit(cli.json, &(record, position), || {
        format!("device {} at position {}", serial, position)
    })
}
