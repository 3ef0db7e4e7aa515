use anyhow::{Context, Result};
use clap::Parser;
use framecast::{FramecastConfig, FramecastOrchestrator, HttpTransport, PipelineMetrics, UploadDispatcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "framecast")]
#[command(about = "Samples camera frames and uploads them as JPEG for scene description")]
#[command(version)]
#[command(long_about = "Captures camera frames, lets through about two per second, converts \
them from YUV 4:2:0 to RGB, encodes them as JPEG and posts each one to a scene-description \
server without waiting for the answer.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "framecast.toml", help = "Path to TOML configuration file")]
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
    #[arg(long, help = "Validate configuration file and exit without starting the system")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Dry run mode - initialize but don't start components
    #[arg(long, help = "Perform dry run - open the camera and initialize components but don't start them")]
    dry_run: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    /// Fetch the latest audio clip into PATH and exit
    #[arg(long, value_name = "PATH", help = "Download the latest narration audio to PATH and exit")]
    fetch_audio: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    init_logging(&args)?;

    info!("Starting Framecast v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let config = match FramecastConfig::load_from_file(&args.config) {
        Ok(config) => {
            info!("Configuration loaded successfully from: {}", args.config);
            config
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    match config.validate() {
        Ok(()) if args.validate_config => {
            info!("Configuration validation successful");
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

    if let Some(path) = &args.fetch_audio {
        return fetch_audio(&config, path).await;
    }

    let mut orchestrator = match FramecastOrchestrator::new(config).await {
        Ok(orchestrator) => orchestrator,
        Err(e) if e.is_fatal() => {
            error!("Fatal: {}", e);
            eprintln!("✗ {}", e);
            std::process::exit(1);
        }
        Err(e) => {
            error!("Failed to create orchestrator: {}", e);
            return Err(e.into());
        }
    };

    orchestrator.initialize().await.map_err(|e| {
        error!("Failed to initialize system: {}", e);
        e
    })?;

    if args.dry_run {
        info!("Dry run mode - components initialized but not started");
        println!("✓ Dry run completed successfully - all components initialized");
        return Ok(());
    }

    if let Err(e) = orchestrator.start().await {
        error!("Failed to start system: {}", e);
        // Release whatever did start before bailing out
        if let Err(shutdown_error) = orchestrator.shutdown().await {
            error!("Cleanup after failed start also failed: {}", shutdown_error);
        }
        return Err(e.into());
    }

    let exit_code = orchestrator.run().await.map_err(|e| {
        error!("System error during execution: {}", e);
        e
    })?;

    info!("Framecast exited with code: {}", exit_code);
    std::process::exit(exit_code);
}

/// One-shot download of the server's latest audio clip
async fn fetch_audio(config: &FramecastConfig, path: &Path) -> Result<()> {
    let transport = Arc::new(HttpTransport::new(&config.upload));
    info!("Fetching audio from {}", transport.audio_url());

    let dispatcher = UploadDispatcher::new(&config.upload, transport, Arc::new(PipelineMetrics::new()))?;
    let audio = dispatcher.fetch_audio().await.map_err(|e| {
        error!("Audio fetch failed: {}", e);
        e
    })?;

    tokio::fs::write(path, &audio)
        .await
        .with_context(|| format!("Failed to write audio to {}", path.display()))?;

    info!("Wrote {} bytes of audio to {}", audio.len(), path.display());
    println!("✓ Saved {} bytes to {}", audio.len(), path.display());
    Ok(())
}

fn init_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    // Determine log level based on flags
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
        .unwrap_or_else(|_| EnvFilter::new(format!("framecast={}", log_level)));

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
    println!("# Framecast Configuration File");
    println!("# This is the default configuration with all available options");
    println!("# Environment overrides use FRAMECAST_<SECTION>__<KEY>, e.g. FRAMECAST_UPLOAD__BASE_URL");
    println!();

    let rendered = toml::to_string_pretty(&FramecastConfig::default())
        .context("Failed to render default configuration")?;
    print!("{}", rendered);
    Ok(())
}
