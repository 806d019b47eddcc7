use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use cloudenum::cache::Cache;
use cloudenum::config::Config;
use cloudenum::gcp::auth;
use cloudenum::gcp::client::{format_gcp_error, GcpClient};
use cloudenum::remote::{google, Registry};
use cloudenum::resource::{DefaultResourceFactory, ResourceType};
use cloudenum::scan::{ScanOptions, ScanReport, Scanner};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Enumerate the resources of a Google Cloud project
#[derive(Parser, Debug)]
#[command(name = "cloudenum", version = cloudenum::VERSION, about, long_about = None)]
struct Args {
    /// GCP project to scan
    #[arg(short, long)]
    project: Option<String>,

    /// Resolved listings kept in the session cache
    #[arg(long)]
    cache_capacity: Option<usize>,

    /// Concurrent enumerations and detail reads
    #[arg(long)]
    concurrency: Option<usize>,

    /// Resource type to scan (repeatable, default all)
    #[arg(short = 't', long = "type")]
    types: Vec<String>,

    /// Read every resource in full where supported
    #[arg(long)]
    details: bool,

    /// Report format
    #[arg(short, long, value_enum, default_value = "json")]
    output: OutputFormat,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off")]
    log_level: LogLevel,

    /// Persist project, cache capacity, concurrency and types as defaults
    #[arg(long)]
    save_config: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Yaml,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Logging disabled, cannot open {:?}: {}", log_path, e);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(tracing_level.as_str()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("cloudenum {} started with log level: {:?}", cloudenum::VERSION, level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("cloudenum").join("cloudenum.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".cloudenum").join("cloudenum.log");
    }
    PathBuf::from("cloudenum.log")
}

/// Merge command line flags over the stored configuration
fn apply_args(mut config: Config, args: &Args) -> Config {
    if let Some(project) = &args.project {
        config.project_id = Some(project.clone());
    }
    if let Some(capacity) = args.cache_capacity {
        config.cache_capacity = capacity;
    }
    if let Some(concurrency) = args.concurrency {
        config.max_concurrency = concurrency;
    }
    if !args.types.is_empty() {
        config.resource_types = args.types.clone();
    }
    config
}

fn write_report(report: &ScanReport, format: OutputFormat) -> Result<()> {
    let output = match format {
        OutputFormat::Json => serde_json::to_string_pretty(report)?,
        OutputFormat::Yaml => serde_yaml::to_string(report)?,
    };
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", output)?;
    Ok(())
}

async fn run(args: Args) -> Result<()> {
    let config = apply_args(Config::load(), &args);
    if args.save_config {
        config.save()?;
        tracing::info!("Saved configuration to {:?}", Config::config_path());
    }

    let Some(project) = config.effective_project() else {
        bail!("No GCP project configured. Set GOOGLE_CLOUD_PROJECT or use --project flag");
    };
    if !auth::validate_project_id(&project) {
        bail!("Invalid project ID: {}", project);
    }
    tracing::info!("Using project: {}", project);

    let client = GcpClient::new(&project).await?;
    let cache = Arc::new(Cache::new(config.cache_capacity));
    let mut registry = Registry::new();
    google::init(
        client,
        cache.clone(),
        &mut registry,
        Arc::new(DefaultResourceFactory),
    )?;

    let options = ScanOptions {
        resource_types: config
            .resource_types
            .iter()
            .map(|t| ResourceType::new(t.as_str()))
            .collect(),
        details: args.details,
        max_concurrency: config.max_concurrency,
    };

    let report = Scanner::new(&registry, cache, options).run().await?;
    for failure in &report.failures {
        match &failure.id {
            Some(id) => eprintln!("warning: {} {}: {}", failure.resource_type, id, failure.error),
            None => eprintln!("warning: {}: {}", failure.resource_type, failure.error),
        }
    }

    write_report(&report, args.output)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_guard = setup_logging(args.log_level);

    let result = run(args).await;
    if let Err(err) = &result {
        tracing::error!("{:#}", err);
        eprintln!("Error: {}", format_gcp_error(err));
    }

    // Flush the log file before exiting
    drop(log_guard);
    if result.is_err() {
        std::process::exit(1);
    }

    Ok(())
}
