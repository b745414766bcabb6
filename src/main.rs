//! Legion Aura CLI tool
//!
//! Controls the 4-zone RGB backlight of Lenovo Legion keyboards.

use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::builder::EnumValueParser;
use clap::{
    crate_description, crate_name, crate_version, value_parser, Arg, ArgAction, ArgMatches, Command,
};
use tracing::debug;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use legionaura::report::{validate_brightness, validate_speed};
use legionaura::{
    devices, parse_zones, DeviceId, Effect, EffectCode, EffectParams, Error, LightingController,
    UsbSession, WaveDirection, DEFAULT_DEVICE,
};

/// Exit code for rejected user input.
const EXIT_INVALID_INPUT: u8 = 2;

/// Exit code for devices which could not be opened.
const EXIT_DEVICE_UNAVAILABLE: u8 = 3;

/// Exit code for failed transfers.
const EXIT_TRANSFER_FAILED: u8 = 4;

/// Requested change of the keyboard lighting.
#[derive(Debug)]
enum Action {
    Apply(EffectParams),
    Off,
    Brightness(u8),
    Status,
}

/// Keyboard selection.
#[derive(PartialEq, Eq, Debug)]
enum Target {
    Device(DeviceId),
    /// Autodetect from a device descriptor file.
    Detect(PathBuf),
}

impl Display for Target {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Device(id) => write!(f, "{id}"),
            Self::Detect(path) => write!(f, "any device listed in {}", path.display()),
        }
    }
}

/// CLI configuration.
#[derive(Debug)]
struct Config {
    action: Action,
    target: Target,
    verbose: bool,
}

impl Config {
    fn from_cli(matches: &ArgMatches) -> Result<Self, Error> {
        let speed = validate_speed(*matches.get_one::<u8>("speed").unwrap_or(&1))?;
        let brightness = validate_brightness(*matches.get_one::<u8>("brightness").unwrap_or(&1))?;

        let action = match matches.subcommand() {
            Some((name @ ("static" | "breath"), sub)) => {
                let effect = if name == "static" { Effect::Static } else { Effect::Breath };
                let colors: Vec<&String> =
                    sub.get_many::<String>("colors").map(Iterator::collect).unwrap_or_default();
                let zones = parse_zones(&colors)?;
                Action::Apply(EffectParams::new(effect, speed, brightness)?.with_zones(zones))
            },
            Some(("wave", sub)) => {
                let direction =
                    sub.get_one::<WaveDirection>("direction").copied().unwrap_or_default();
                let params = EffectParams::new(Effect::Wave, speed, brightness)?;
                Action::Apply(params.with_wave_direction(direction))
            },
            Some(("hue", _)) => Action::Apply(EffectParams::new(Effect::Hue, speed, brightness)?),
            Some(("off", _)) => Action::Off,
            Some(("brightness", sub)) => {
                let level = *sub.get_one::<u8>("level").unwrap_or(&1);
                Action::Brightness(validate_brightness(level)?)
            },
            _ => Action::Status,
        };

        let target = match matches.get_one::<PathBuf>("devices") {
            Some(path) => Target::Detect(path.clone()),
            None => {
                let vendor_id = matches.get_one::<u16>("vid").copied();
                let product_id = matches.get_one::<u16>("pid").copied();
                Target::Device(DeviceId::new(
                    vendor_id.unwrap_or(DEFAULT_DEVICE.vendor_id),
                    product_id.unwrap_or(DEFAULT_DEVICE.product_id),
                ))
            },
        };

        Ok(Self { action, target, verbose: matches.get_flag("verbose") })
    }
}

fn main() -> ExitCode {
    let matches = cli();

    init_logger(matches.get_flag("verbose"));

    let config = match Config::from_cli(&matches) {
        Ok(config) => config,
        Err(err) => return failure(err),
    };

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => failure(err),
    }
}

/// Open the keyboard and execute the requested action.
fn run(config: &Config) -> Result<(), Error> {
    debug!("Opening {}", config.target);

    let mut session = UsbSession::new();
    match &config.target {
        Target::Device(id) => session.open(*id)?,
        Target::Detect(path) => {
            let candidates = devices::load_supported_devices(path);
            let id = session.auto_detect(&candidates)?;
            if config.verbose {
                println!("Detected keyboard {id}");
            }
        },
    }

    let mut controller = LightingController::new(&mut session);
    match config.action {
        Action::Apply(params) => {
            if params.effect.effect().map_or(false, Effect::has_colors) {
                let zones: Vec<String> = params.zones.iter().map(ToString::to_string).collect();
                eprintln!("Zones = [{}]", zones.join(", "));
            }
            controller.apply(&params)?
        },
        Action::Off => controller.off()?,
        Action::Brightness(level) => controller.set_brightness_only(level)?,
        Action::Status => {
            print_state(&controller.read_state()?);
            return Ok(());
        },
    }

    println!("\x1b[32mSuccessfully applied changes.\x1b[0m");

    Ok(())
}

/// Report an error and map it to the process exit code.
fn failure(err: Error) -> ExitCode {
    eprintln!("\x1b[31mError:\x1b[0m {err}");

    if err.is_invalid_input() {
        ExitCode::from(EXIT_INVALID_INPUT)
    } else if err.is_device_unavailable() {
        eprintln!("Is the keyboard connected and are udev rules installed?");
        ExitCode::from(EXIT_DEVICE_UNAVAILABLE)
    } else {
        ExitCode::from(EXIT_TRANSFER_FAILED)
    }
}

/// Print the lighting state read from the keyboard.
fn print_state(params: &EffectParams) {
    match params.effect {
        EffectCode::Known(effect) => println!("Effect:     {effect:?}"),
        EffectCode::Unknown(code) => println!("Effect:     unknown (0x{code:02x})"),
    }
    println!("Speed:      {}", params.speed);
    println!("Brightness: {}", params.brightness);

    if params.effect.effect().map_or(false, Effect::has_colors) {
        for (i, zone) in params.zones.iter().enumerate() {
            println!("Zone {i}:     {zone}");
        }
    }

    if params.wave_direction != WaveDirection::None {
        println!("Direction:  {:?}", params.wave_direction);
    }
}

/// Install the log subscriber.
///
/// `RUST_LOG` takes precedence over the `--verbose` flag.
fn init_logger(verbose: bool) {
    let directives = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) => directives,
        Err(_) if verbose => format!("{}=debug", env!("CARGO_CRATE_NAME")),
        Err(_) => String::new(),
    };

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .parse_lossy(directives);

    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

/// Parse a hexadecimal USB ID, with or without `0x` prefix.
fn parse_usb_id(value: &str) -> Result<u16, String> {
    let digits = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")).unwrap_or(value);
    u16::from_str_radix(digits, 16).map_err(|err| format!("invalid USB ID '{value}': {err}"))
}

/// Get clap CLI parameters.
fn cli() -> ArgMatches {
    cli_command().get_matches()
}

fn cli_command() -> Command {
    let colors = Arg::new("colors")
        .help("Zone colors [RRGGBB], the last color is repeated for remaining zones")
        .num_args(1..)
        .required(true);

    Command::new(crate_name!())
        .version(crate_version!())
        .about(crate_description!())
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(Command::new("static").about("Static zone colors").arg(colors.clone()))
        .subcommand(Command::new("breath").about("Breathing zone colors").arg(colors))
        .subcommand(
            Command::new("wave").about("Rainbow wave").arg(
                Arg::new("direction")
                    .help("Wave direction")
                    .required(true)
                    .ignore_case(true)
                    .value_parser(EnumValueParser::<WaveDirection>::new()),
            ),
        )
        .subcommand(Command::new("hue").about("Cycle all zones through the color spectrum"))
        .subcommand(Command::new("off").about("Turn the backlight off"))
        .subcommand(
            Command::new("brightness").about("Change brightness, keeping the current effect").arg(
                Arg::new("level")
                    .help("Brightness level [possible values: 1, 2]")
                    .required(true)
                    .value_parser(value_parser!(u8)),
            ),
        )
        .subcommand(Command::new("status").about("Print the current lighting state"))
        .arg(
            Arg::new("speed")
                .help("Animation speed [possible values: 1..=4]")
                .long("speed")
                .short('s')
                .global(true)
                .value_parser(value_parser!(u8)),
        )
        .arg(
            Arg::new("brightness")
                .help("Brightness [possible values: 1, 2]")
                .long("brightness")
                .short('b')
                .global(true)
                .value_parser(value_parser!(u8)),
        )
        .arg(
            Arg::new("vid")
                .help("USB vendor ID of the keyboard [default: 0x048d]")
                .long("vid")
                .global(true)
                .value_parser(parse_usb_id),
        )
        .arg(
            Arg::new("pid")
                .help("USB product ID of the keyboard [default: 0xc993]")
                .long("pid")
                .global(true)
                .value_parser(parse_usb_id),
        )
        .arg(
            Arg::new("devices")
                .help("Autodetect the keyboard from a device descriptor file")
                .long("devices")
                .short('d')
                .global(true)
                .conflicts_with_all(["vid", "pid"])
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("verbose")
                .help("Print debug output")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::SetTrue),
        )
}
