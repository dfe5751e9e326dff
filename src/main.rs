use anyhow::Result;
use clap::Parser;
use sdcam::{SdcamConfig, SdcamOrchestrator, ShutdownReason};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "sdcam")]
#[command(about = "Periodic camera capture to an SD card")]
#[command(version)]
#[command(long_about = "Mounts an SD card, initializes the camera sensor and saves one \
frame per capture period as a numbered file on the card. On a host the card is a \
directory and the sensor is simulated.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "sdcam.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit without touching hardware")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    /// Stop after this many captures instead of running forever
    #[arg(long, value_name = "N", help = "Number of capture iterations to run, then exit")]
    iterations: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    init_logging(&args)?;

    info!("Starting sdcam v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let config = match SdcamConfig::load_from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    match config.validate() {
        Ok(()) if args.validate_config => {
            println!("✓ Configuration is valid");
            return Ok(());
        }
        Ok(()) => {}
        Err(e) => {
            error!("Configuration validation failed: {}", e);
            eprintln!("✗ Configuration validation failed: {}", e);
            std::process::exit(1);
        }
    }

    let mut orchestrator = SdcamOrchestrator::from_config(config);

    orchestrator.initialize().await.map_err(|e| {
        error!("Failed to initialize system: {}", e);
        e
    })?;

    let reason = orchestrator.run(args.iterations).await.map_err(|e| {
        error!("System error during execution: {}", e);
        e
    })?;

    match reason {
        ShutdownReason::Signal(name) => info!("Shut down on {}", name),
        ShutdownReason::Completed => info!("Capture run completed"),
    }

    if let Some(monitor) = orchestrator.monitor() {
        let stats = monitor.stats();
        info!(
            "Saved {} of {} frames ({} acquire failures, {} write failures)",
            stats.frames_saved, stats.iterations, stats.acquire_failures, stats.write_failures
        );
    }

    Ok(())
}

fn init_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("sdcam={}", log_level)));

    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_target(true)
                .with_thread_ids(args.debug)
                .with_file(args.debug)
                .with_line_number(args.debug)
                .boxed()
        }
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .init();

    Ok(())
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    println!("# sdcam configuration file");
    println!("# Every key is optional; values below are the defaults.");
    println!("# Environment overrides use SDCAM_<SECTION>__<KEY>, e.g. SDCAM_CAPTURE__PERIOD_MS=1000");
    println!();
    println!("{}", toml::to_string(&SdcamConfig::default())?);
    Ok(())
}
