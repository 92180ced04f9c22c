use clap::{Parser, Subcommand};
use frametap::capture::{AfPacketSocket, CaptureHook, HookConfig};
use frametap::config;
use frametap::consumer::{ConsumerConfig, ConsumerLoop};
use frametap::pipeline;
use frametap::ring::RingChannel;
use frametap::sink::{EventSink, HexSink, LogSink};
use frametap::telemetry::{init_logging, CaptureMetrics, LogConfig};
use frametap_common::PacketEvent;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Interval between periodic capture stats log lines.
const STATS_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(name = "frametap")]
#[command(about = "A lossy-under-load packet capture pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the capture pipeline
    Run {
        /// Path to config.toml
        #[arg(short, long, default_value = "config.toml")]
        config: PathBuf,

        /// Override the configured interface
        #[arg(short, long)]
        interface: Option<String>,

        /// Hex-dump captured frames to stdout instead of logging them
        #[arg(long)]
        hex: bool,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate config.toml without starting the pipeline
    Validate {
        /// Path to config.toml
        #[arg(short, long, default_value = "config.toml")]
        config: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            interface,
            hex,
        } => {
            if let Err(e) = cmd_run(&config, interface, hex) {
                eprintln!("[ERROR] {}", e);
                std::process::exit(1);
            }
        }
        Commands::Config { action } => match action {
            ConfigAction::Validate { config } => {
                if let Err(e) = cmd_config_validate(&config) {
                    eprintln!("[ERROR] {}", e);
                    std::process::exit(1);
                }
            }
        },
    }
}

fn cmd_run(config_path: &PathBuf, interface: Option<String>, hex: bool) -> Result<(), String> {
    let mut cfg = config::load(config_path).map_err(|e| format!("Failed to load config: {}", e))?;
    if let Some(iface) = interface {
        cfg.capture.interface = iface;
    }

    init_logging(Some(&LogConfig {
        level: cfg.log.level.clone(),
        format: cfg.log.format.clone(),
    }));

    let validation = config::validate(&cfg);
    validation.print_diagnostics();
    if validation.has_errors() {
        return Err("Validation failed with errors".to_string());
    }

    // Fail on bad capacity before touching any socket.
    let ring = RingChannel::<PacketEvent>::with_capacity(cfg.channel.capacity)
        .map_err(|e| e.to_string())?;
    let drop_counter = ring.drop_counter();
    let (producer, rx) = ring.split();

    let metrics = Arc::new(CaptureMetrics::new());
    let hook = CaptureHook::new(
        producer,
        HookConfig {
            snap_len: cfg.capture.snap_len,
            sample_rate: cfg.capture.sample_rate,
        },
        metrics.clone(),
    );

    let sink: Box<dyn EventSink> = if hex {
        Box::new(HexSink::stdout())
    } else {
        Box::new(LogSink)
    };
    let consumer = ConsumerLoop::new(
        rx,
        sink,
        metrics.clone(),
        ConsumerConfig {
            poll_interval: cfg.channel.poll_interval(),
            drain_limit: cfg.channel.drain_limit,
        },
    );

    let rt = tokio::runtime::Runtime::new().map_err(|e| format!("Failed to create runtime: {}", e))?;

    rt.block_on(async move {
        info!("Binding to interface {}...", cfg.capture.interface);
        let socket = AfPacketSocket::bind(&cfg.capture.interface).map_err(|e| {
            format!(
                "Failed to bind to {}: {}. Run with root privileges.",
                cfg.capture.interface, e
            )
        })?;

        let capture = pipeline::attach(socket, hook);
        let consumer_handle = consumer.spawn().map_err(|e| e.to_string())?;

        info!(
            interface = %cfg.capture.interface,
            capacity = cfg.channel.capacity,
            snap_len = cfg.capture.snap_len,
            sample_rate = cfg.capture.sample_rate,
            "capture started"
        );

        let mut stats_timer = tokio::time::interval(STATS_INTERVAL);
        stats_timer.tick().await; // first tick fires immediately

        loop {
            tokio::select! {
                _ = stats_timer.tick() => {
                    info!(
                        frames = metrics.frames_seen.get(),
                        published = metrics.published.get(),
                        consumed = metrics.consumed.get(),
                        dropped = drop_counter.get(),
                        "capture stats"
                    );
                }
                result = tokio::signal::ctrl_c() => {
                    if let Err(e) = result {
                        return Err(format!("Failed waiting for ctrl-c: {}", e));
                    }
                    info!("shutting down");
                    break;
                }
            }
        }

        pipeline::detach(capture).await;
        consumer_handle.stop();

        for (key, value) in metrics.export() {
            info!(metric = key, value, "final");
        }

        Ok(())
    })
}

fn cmd_config_validate(config_path: &PathBuf) -> Result<(), String> {
    println!("[INFO] Validating {}...", config_path.display());

    let cfg = config::load(config_path).map_err(|e| format!("Failed to parse config: {}", e))?;

    let validation = config::validate(&cfg);
    validation.print_diagnostics();

    if validation.has_errors() {
        Err("Validation failed".to_string())
    } else {
        println!("[INFO] Configuration is valid");
        Ok(())
    }
}
