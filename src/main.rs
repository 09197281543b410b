//! Solar Logger - serial telemetry logger binary
//!
//! Reads the solar car sensor bus, writes the daily session log and serves
//! the live dashboard.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use solar_logger::{
    event_channel, list_ports, open_replay, open_serial, run_dashboard, spawn_acquisition,
    start_web_server, AcquisitionConfig, AcquisitionEvent, AcquisitionLoop, AppState,
    DashboardState, FrameParser, FrameSchema, HistoryReader, SessionLog, StopHandle, StopReason,
    WebConfig, DEFAULT_BAUD_RATE, DEFAULT_DEVICE, DEFAULT_READ_TIMEOUT_MS, DEFAULT_TICK_MS,
    DEFAULT_WEB_PORT, TRANSMITTED_FIELDS,
};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "solar_logger")]
#[command(about = "Solar car serial telemetry logger")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = "Logs the solar car sensor bus to a daily session file and serves a live dashboard")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Web server bind address
    #[arg(long, global = true, default_value = "0.0.0.0")]
    host: String,

    /// Web server port
    #[arg(short, long, global = true, default_value_t = DEFAULT_WEB_PORT)]
    port: u16,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Acquire telemetry and serve the dashboard (default)
    Serve(ServeArgs),

    /// List serial ports
    Ports,

    /// Print the history of one channel from a session log
    History(HistoryArgs),
}

#[derive(Args)]
struct ServeArgs {
    /// Serial device the sensor bus is attached to
    #[arg(long, default_value = DEFAULT_DEVICE)]
    device: String,

    /// Serial baud rate
    #[arg(long, default_value_t = DEFAULT_BAUD_RATE)]
    baud: u32,

    /// Serial read timeout in milliseconds
    #[arg(long, default_value_t = DEFAULT_READ_TIMEOUT_MS)]
    read_timeout_ms: u64,

    /// Directory for the daily session log
    #[arg(long, default_value = ".")]
    log_dir: PathBuf,

    /// Read frames from a recorded file instead of the serial device
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Number of tab-separated fields in a valid frame
    #[arg(long, default_value_t = TRANSMITTED_FIELDS)]
    fields: usize,

    /// Dashboard refresh tick in milliseconds
    #[arg(long, default_value_t = DEFAULT_TICK_MS)]
    tick_ms: u64,

    /// Directory with a custom dashboard index.html
    #[arg(long)]
    static_dir: Option<String>,

    /// Disable CORS headers
    #[arg(long)]
    no_cors: bool,

    /// Maximum WebSocket connections
    #[arg(long, default_value_t = 100)]
    max_connections: usize,
}

impl Default for ServeArgs {
    fn default() -> Self {
        Self {
            device: DEFAULT_DEVICE.to_string(),
            baud: DEFAULT_BAUD_RATE,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            log_dir: PathBuf::from("."),
            replay: None,
            fields: TRANSMITTED_FIELDS,
            tick_ms: DEFAULT_TICK_MS,
            static_dir: None,
            no_cors: false,
            max_connections: 100,
        }
    }
}

#[derive(Args)]
struct HistoryArgs {
    /// Session log file
    log: PathBuf,

    /// Column index (1 = Ah, 2 = Voltage, ...)
    channel: usize,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    format: String,

    /// Number of tab-separated fields the log was recorded with
    #[arg(long, default_value_t = TRANSMITTED_FIELDS)]
    fields: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(&cli)?;

    match &cli.command {
        Some(Commands::Serve(args)) => serve_command(&cli, args).await?,
        Some(Commands::Ports) => ports_command()?,
        Some(Commands::History(args)) => history_command(args)?,
        None => serve_command(&cli, &ServeArgs::default()).await?,
    }

    Ok(())
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

fn print_banner() {
    println!("Solar Logger - serial telemetry logger");
    println!("   Version: {}", env!("CARGO_PKG_VERSION"));
    println!();
}

fn open_source(
    args: &ServeArgs,
    config: &AcquisitionConfig,
) -> solar_logger::Result<Box<dyn Read + Send>> {
    match &args.replay {
        Some(path) => {
            info!("Replaying frames from {}", path.display());
            Ok(Box::new(open_replay(path)?))
        }
        None => {
            info!("Opening {} at {} baud", config.device, config.baud_rate);
            Ok(Box::new(open_serial(config)?))
        }
    }
}

async fn serve_command(cli: &Cli, args: &ServeArgs) -> anyhow::Result<()> {
    print_banner();

    let schema = FrameSchema::default().with_transmitted_fields(args.fields);
    let config = AcquisitionConfig::new(&args.device)
        .with_baud_rate(args.baud)
        .with_read_timeout_ms(args.read_timeout_ms)
        .with_log_dir(&args.log_dir)
        .with_schema(schema);

    let parser = FrameParser::new(config.schema.clone())?;
    let log = SessionLog::init_today(&config.log_dir, config.schema.clone())
        .context("creating session log")?;
    let history = log.reader();
    println!("   Session log: {}", log.path().display());

    let (events, rx) = event_channel(config.event_capacity);
    let stop = StopHandle::new();

    // A source that cannot be opened stops acquisition, not the dashboard.
    let acquisition = match open_source(args, &config) {
        Ok(source) => Some(spawn_acquisition(AcquisitionLoop::new(
            source,
            parser,
            log,
            events,
            stop.clone(),
        ))),
        Err(e) => {
            error!("Acquisition not started: {}", e);
            events.publish(AcquisitionEvent::Stopped(StopReason::SerialFault(e.to_string())));
            None
        }
    };

    let web_config = WebConfig::new(&cli.host, cli.port)
        .with_static_path(args.static_dir.clone())
        .with_cors(!args.no_cors)
        .with_max_websocket_connections(args.max_connections)
        .with_tick_ms(args.tick_ms);

    let dashboard = Arc::new(RwLock::new(DashboardState::new(&config.schema)));
    let (updates, _) = broadcast::channel(256);
    let pump = tokio::spawn(run_dashboard(
        rx,
        dashboard.clone(),
        updates.clone(),
        web_config.tick(),
    ));
    let state = AppState::new(dashboard, history, updates, &web_config);

    info!("Dashboard configuration:");
    info!("  - Bind address: {}", web_config.bind_address());
    info!("  - CORS enabled: {}", web_config.enable_cors);
    info!("  - Max WebSocket connections: {}", web_config.max_websocket_connections);
    info!("  - Refresh tick: {}ms", web_config.tick_ms);
    println!("   Dashboard: http://{}/", web_config.bind_address());

    let interrupt = stop.clone();
    let shutdown = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for interrupt: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Interrupt received, stopping acquisition");
        interrupt.raise();
    };

    start_web_server(web_config, state, shutdown).await?;
    stop.raise();

    if let Some(handle) = acquisition {
        let report = handle.await.context("acquisition task panicked")?;
        println!(
            "Acquisition stopped ({}): {} frames, {} accepted, {} rejected",
            report.reason, report.stats.frames, report.stats.accepted, report.stats.rejected
        );
    }
    if let Err(e) = pump.await {
        error!("Dashboard task failed: {}", e);
    }

    Ok(())
}

fn ports_command() -> anyhow::Result<()> {
    let ports = list_ports()?;
    if ports.is_empty() {
        println!("No serial ports found");
        return Ok(());
    }

    println!("Serial ports:");
    for port in &ports {
        match &port.product {
            Some(product) => println!("  {} ({}, {})", port.name, port.kind, product),
            None => println!("  {} ({})", port.name, port.kind),
        }
    }
    Ok(())
}

fn history_command(args: &HistoryArgs) -> anyhow::Result<()> {
    let schema = FrameSchema::default().with_transmitted_fields(args.fields);
    let name = schema
        .column_name(args.channel)
        .unwrap_or("unknown")
        .to_string();
    let reader = HistoryReader::open(&args.log, schema);
    let points = reader
        .read_all(args.channel)
        .with_context(|| format!("reading {}", args.log.display()))?;

    match args.format.as_str() {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&points)?);
        }
        "pretty" => {
            println!("{} ({} values)", name, points.len());
            println!("==========================================");
            for point in &points {
                println!("  {}  {}", point.timestamp, point.value);
            }
        }
        other => {
            anyhow::bail!("Unsupported format: {}. Use 'json' or 'pretty'", other);
        }
    }

    Ok(())
}
