//! Spectrolink - DSP board acquisition tool
//!
//! Decodes the board's marker-delimited signal and spectrum stream from a
//! serial port or a captured file, logs every packet to CSV and prints a
//! summary or JSON line per packet.

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use spectrolink_core::cli::print_exit_codes;
use spectrolink_core::config::ConfigError;
use spectrolink_core::core::transport::{list_ports, ByteSource, DEFAULT_CAPTURE_CHUNK};
use spectrolink_core::{
    export_snapshot, summarize, AppConfig, CaptureSource, CliResult, CsvSink, DecoderSession,
    ExitCodes, JsonLinesSink, PacketDecoder, PacketEmitter, SerialTransport, SessionError,
    SinkError, SummarySink, SyntheticSignal, TransportError,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

/// Per-packet stdout format
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// One summary line per packet
    Text,
    /// One JSON object per packet
    Json,
}

/// Spectrolink CLI
#[derive(Parser, Debug)]
#[command(
    name = "spectrolink",
    version,
    about = "Host-side decoder for DSP board signal and spectrum streams",
    long_about = None
)]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true, env = "SPECTROLINK_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Log as JSON
    #[arg(long, global = true)]
    log_json: bool,

    /// Also write logs to a daily rotated file (platform log directory if no path is given)
    #[arg(long, global = true, num_args = 0..=1, value_name = "DIR")]
    log_dir: Option<Option<PathBuf>>,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every decoding command
#[derive(Args, Debug, Clone)]
struct DecodeArgs {
    /// CSV log file (overrides config)
    #[arg(long, conflicts_with = "no_csv")]
    csv: Option<PathBuf>,

    /// Do not write the CSV log
    #[arg(long)]
    no_csv: bool,

    /// Clear all section buffers after each packet
    #[arg(long)]
    reset_sections: bool,

    /// Per-packet stdout format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Stop after this many packets
    #[arg(short = 'n', long)]
    packets: Option<u64>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List available serial ports
    Ports {
        /// Show port type details
        #[arg(short, long)]
        detailed: bool,
    },

    /// Decode a serial port live
    Listen {
        /// Serial port name (e.g., /dev/ttyACM0, COM3)
        #[arg(short, long)]
        port: Option<String>,

        /// Baud rate
        #[arg(short, long)]
        baud: Option<u32>,

        #[command(flatten)]
        decode: DecodeArgs,
    },

    /// Decode a captured raw stream
    Replay {
        /// Capture file
        file: PathBuf,

        /// Bytes per read
        #[arg(long, default_value_t = DEFAULT_CAPTURE_CHUNK)]
        chunk: usize,

        /// Keep reading as the file grows
        #[arg(long)]
        follow: bool,

        #[command(flatten)]
        decode: DecodeArgs,
    },

    /// Emit synthetic packets in wire format
    Simulate {
        /// Number of packets
        #[arg(short = 'n', long, default_value_t = 1)]
        count: u64,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Delay between packets in milliseconds
        #[arg(long, default_value_t = 0)]
        interval_ms: u64,
    },

    /// Copy the CSV log to a timestamped export file
    Export {
        /// CSV log to copy (overrides config)
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Target directory
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },

    /// Summarise a CSV log per data type
    Stats {
        /// CSV log to read (overrides config)
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Add amplitude statistics per data type
        #[arg(short, long)]
        detailed: bool,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show or write the configuration
    Config {
        /// Persist the effective configuration
        #[arg(long)]
        write: bool,
    },

    /// Print the exit code table
    ExitCodes,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let _guard = init_tracing(&cli);

    let quiet = cli.quiet;
    let result = match run(cli).await {
        Ok(result) => result,
        Err(err) => classify(err),
    };

    match &result {
        CliResult::Success(Some(msg)) if !quiet => eprintln!("{}", msg),
        CliResult::Error(code, msg) => {
            error!(code, "{}", msg);
            eprintln!("Error: {}", msg);
        }
        _ => {}
    }
    result.to_exit_code()
}

/// Set up the global subscriber; the guard must outlive every log call
fn init_tracing(cli: &Cli) -> Option<WorkerGuard> {
    let default_level = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let log_dir = match &cli.log_dir {
        Some(Some(dir)) => Some(dir.clone()),
        Some(None) => {
            let dir = spectrolink_core::config::log_dir();
            if dir.is_none() {
                eprintln!("No platform log directory, logging to stderr");
            }
            dir
        }
        None => None,
    };

    let (writer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(&dir, "spectrolink.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (BoxMakeWriter::new(writer), Some(guard))
        }
        None => (BoxMakeWriter::new(std::io::stderr), None),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer);
    if cli.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
    guard
}

/// Map an error escaping a command onto an exit code
fn classify(err: anyhow::Error) -> CliResult {
    let err = match err.downcast::<SessionError>() {
        Ok(e) => return e.into(),
        Err(err) => err,
    };
    let err = match err.downcast::<TransportError>() {
        Ok(e) => return e.into(),
        Err(err) => err,
    };
    let err = match err.downcast::<SinkError>() {
        Ok(e) => return e.into(),
        Err(err) => err,
    };
    let err = match err.downcast::<ConfigError>() {
        Ok(e) => return e.into(),
        Err(err) => err,
    };
    match err.downcast::<std::io::Error>() {
        Ok(e) => e.into(),
        Err(err) => CliResult::error(ExitCodes::ERROR, format!("{:#}", err)),
    }
}

async fn run(cli: Cli) -> anyhow::Result<CliResult> {
    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };

    match cli.command {
        Commands::Ports { detailed } => show_ports(detailed),
        Commands::Listen { port, baud, decode } => {
            let mut serial = config.serial.clone();
            if let Some(port) = port {
                serial.port = port;
            }
            if let Some(baud) = baud {
                serial.baud_rate = baud;
            }
            let mut source = SerialTransport::new(serial);
            run_decode(&config, &decode, cli.quiet, &mut source).await
        }
        Commands::Replay {
            file,
            chunk,
            follow,
            decode,
        } => {
            if !file.exists() {
                return Ok(CliResult::file_not_found(&file.display().to_string()));
            }
            if chunk == 0 {
                return Ok(CliResult::invalid_args("--chunk must be at least 1"));
            }
            let mut source = CaptureSource::new(&file, chunk).follow(follow);
            run_decode(&config, &decode, cli.quiet, &mut source).await
        }
        Commands::Simulate {
            count,
            output,
            interval_ms,
        } => simulate(count, output.as_deref(), interval_ms).await,
        Commands::Export { csv, dir } => {
            let csv = csv.unwrap_or_else(|| config.csv.path.clone());
            if !csv.exists() {
                return Ok(CliResult::file_not_found(&csv.display().to_string()));
            }
            let (target, records) = export_snapshot(&csv, &dir)?;
            Ok(CliResult::success_with_message(format!(
                "Exported {} records to {}",
                records,
                target.display()
            )))
        }
        Commands::Stats {
            csv,
            detailed,
            json,
        } => {
            let csv = csv.unwrap_or_else(|| config.csv.path.clone());
            if !csv.exists() {
                return Ok(CliResult::file_not_found(&csv.display().to_string()));
            }
            show_stats(&csv, detailed, json)
        }
        Commands::Config { write } => {
            print!("{}", config.to_toml()?);
            if !write {
                return Ok(CliResult::success());
            }
            let path = match &cli.config {
                Some(path) => {
                    config.save_to(path)?;
                    path.clone()
                }
                None => config.save()?,
            };
            Ok(CliResult::success_with_message(format!(
                "Configuration written to {}",
                path.display()
            )))
        }
        Commands::ExitCodes => {
            print_exit_codes();
            Ok(CliResult::success())
        }
    }
}

fn show_ports(detailed: bool) -> anyhow::Result<CliResult> {
    let ports = list_ports()?;
    if ports.is_empty() {
        return Ok(CliResult::success_with_message("No serial ports found."));
    }

    for port in &ports {
        if detailed {
            println!("{} [{:?}]", port.port_name, port.port_type);
        } else {
            println!("{}", port.port_name);
        }
    }
    Ok(CliResult::success())
}

fn show_stats(csv: &Path, detailed: bool, json: bool) -> anyhow::Result<CliResult> {
    let summary = summarize(csv)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(CliResult::success());
    }

    println!("Records: {}", summary.records);
    println!("Packets: {}", summary.packets);
    if let (Some(first), Some(last)) = (&summary.first_timestamp, &summary.last_timestamp) {
        println!("Period:  {} .. {}", first, last);
    }
    for (label, figures) in &summary.by_type {
        println!("  {:<16} {:>8} rows", label, figures.count);
    }

    if detailed {
        for (label, figures) in &summary.by_type {
            println!();
            println!("{}", label.to_uppercase());
            println!("  rows     {}", figures.count);
            println!("  packets  {}", figures.packets);
            println!("  mean     {:.6}", figures.mean);
            match figures.std {
                Some(std) => println!("  std      {:.6}", std),
                None => println!("  std      n/a"),
            }
            println!("  min      {:.6}", figures.min);
            println!("  max      {:.6}", figures.max);
        }
    }
    Ok(CliResult::success())
}

async fn run_decode<S>(
    config: &AppConfig,
    args: &DecodeArgs,
    quiet: bool,
    source: &mut S,
) -> anyhow::Result<CliResult>
where
    S: ByteSource + ?Sized,
{
    let mut decoder_config = config.decoder.clone();
    if args.reset_sections {
        decoder_config.reset_unstarted_sections_on_complete = true;
    }
    let mut decoder = PacketDecoder::new(decoder_config);

    let mut emitter = PacketEmitter::new();
    if config.csv.enabled && !args.no_csv {
        let path = args.csv.clone().unwrap_or_else(|| config.csv.path.clone());
        emitter.add_sink(Box::new(CsvSink::open(&path)?));
    }
    if !quiet {
        match args.format {
            OutputFormat::Text => {
                emitter.add_sink(Box::new(SummarySink::new(std::io::stdout(), true)));
            }
            OutputFormat::Json => emitter.add_sink(Box::new(JsonLinesSink::new(std::io::stdout()))),
        }
    }

    let mut session_config = config.session.clone();
    if args.packets.is_some() {
        session_config.max_packets = args.packets;
    }
    let session = DecoderSession::new(session_config);

    let cancel = session.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, stopping");
            cancel.cancel();
        }
    });

    let summary = session.run(source, &mut decoder, emitter).await?;
    Ok(CliResult::success_with_message(format!(
        "{} packets ({} malformed lines, {} sink failures)",
        summary.packets_emitted, summary.decoder.malformed, summary.sink_failures
    )))
}

async fn simulate(count: u64, output: Option<&Path>, interval_ms: u64) -> anyhow::Result<CliResult> {
    let mut out: Box<dyn Write> = match output {
        Some(path) => Box::new(std::io::BufWriter::new(
            std::fs::File::create(path)
                .with_context(|| format!("creating {}", path.display()))?,
        )),
        None => Box::new(std::io::stdout()),
    };

    let signal = SyntheticSignal::default();
    for index in 0..count {
        out.write_all(signal.render(index).as_bytes())?;
        out.flush()?;
        if interval_ms > 0 && index + 1 < count {
            tokio::time::sleep(Duration::from_millis(interval_ms)).await;
        }
    }
    info!(packets = count, "Simulation finished");
    Ok(CliResult::success())
}
