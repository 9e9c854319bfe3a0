use anyhow::{bail, Context, Result};
use benchtrail::{
    config::AppConfiguration,
    create_app,
    extract::{self, ToolFormat},
    ingestion::{RawEntry, RawMeasurement},
    models::CommitInfo,
    storage::{export_document, BenchmarkDataDocument},
    AppState,
};
use chrono::DateTime;
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Benchmark history and regression tracking
#[derive(Parser)]
#[command(name = "benchtrail")]
#[command(version)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, global = true, env = "BENCHTRAIL_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest one benchmark run and report verdicts
    Ingest {
        /// Tool partition to ingest into
        #[arg(short, long)]
        tool: String,

        /// Input file, `-` for stdin
        #[arg(short, long, default_value = "-")]
        file: String,

        /// Harness output format (go, cargo, customSmallerIsBetter,
        /// customBiggerIsBetter); without it the input is an entry JSON
        #[arg(long)]
        format: Option<ToolFormat>,

        /// Commit id, required with --format
        #[arg(long)]
        commit: Option<String>,

        /// Commit time as RFC 3339 or epoch milliseconds
        #[arg(long)]
        date: Option<String>,

        /// Exit with status 2 when any benchmark regressed
        #[arg(long)]
        fail_on_regression: bool,
    },

    /// Show the newest values of one benchmark
    History {
        #[arg(short, long)]
        tool: String,

        #[arg(short, long)]
        name: String,

        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Show the newest entry of a tool
    Latest {
        #[arg(short, long)]
        tool: String,
    },

    /// Export every partition as a benchmark data document
    Export {
        /// Output file, stdout when absent
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Wrap the document as `window.BENCHMARK_DATA = ...`
        #[arg(long)]
        data_js: bool,

        /// Keep only the newest entries per tool
        #[arg(long)]
        max_items: Option<usize>,

        #[arg(long)]
        repo_url: Option<String>,
    },

    /// Replay a benchmark data document (JSON or data.js) into the store
    Import {
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Serve the HTTP API
    Serve,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = AppConfiguration::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Ingest {
            tool,
            file,
            format,
            commit,
            date,
            fail_on_regression,
        } => {
            if let Some(direction) = format.and_then(|f| f.direction()) {
                config
                    .detection
                    .directions
                    .tools
                    .entry(tool.clone())
                    .or_insert(direction);
            }
            let state = AppState::from_config(config).await?;

            let input = read_input(&file)?;
            let raw = match format {
                Some(format) => raw_from_output(format, &input, commit, date.as_deref())?,
                None => serde_json::from_str::<RawEntry>(&input)
                    .context("Input is not a benchmark entry JSON")?,
            };

            let result = state.pipeline.ingest(raw, Some(&tool)).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);

            if fail_on_regression && result.has_regressions() {
                warn!(
                    regressed = result.summary.regressed,
                    "❌ Benchmark regressions detected"
                );
                return Ok(ExitCode::from(2));
            }
        }
        Commands::History { tool, name, limit } => {
            let state = AppState::from_config(config).await?;
            let view = state.pipeline.store().history(&tool, &name, limit).await?;
            println!("{}", serde_json::to_string_pretty(&view.to_vec())?);
        }
        Commands::Latest { tool } => {
            let state = AppState::from_config(config).await?;
            match state.pipeline.store().latest(&tool).await? {
                Some(entry) => println!("{}", serde_json::to_string_pretty(entry.as_ref())?),
                None => bail!("No entries for tool '{}'", tool),
            }
        }
        Commands::Export {
            output,
            data_js,
            max_items,
            repo_url,
        } => {
            let state = AppState::from_config(config).await?;
            let document =
                export_document(state.pipeline.store().as_ref(), repo_url, max_items).await?;
            let text = if data_js {
                document.to_data_js()?
            } else {
                document.to_json_pretty()?
            };
            match output {
                Some(path) => {
                    tokio::fs::write(&path, text)
                        .await
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    info!(path = %path.display(), entries = document.entry_count(), "📦 Exported benchmark data");
                }
                None => println!("{}", text),
            }
        }
        Commands::Import { input } => {
            let state = AppState::from_config(config).await?;
            let text = tokio::fs::read_to_string(&input)
                .await
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let document = BenchmarkDataDocument::parse(&text)?;
            let summary = state.pipeline.import_document(document).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Serve => {
            let address = config.server.bind_address();
            let state = AppState::from_config(config).await?;
            let app = create_app(state);

            let listener = tokio::net::TcpListener::bind(&address)
                .await
                .with_context(|| format!("Failed to bind {}", address))?;
            info!("🚀 Server started successfully on {}", address);
            info!("📊 Health check: http://{}/api/healthchecker", address);

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn read_input(file: &str) -> Result<String> {
    if file == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read stdin")?;
        return Ok(buffer);
    }
    std::fs::read_to_string(Path::new(file)).with_context(|| format!("Failed to read {}", file))
}

/// Build an entry from harness output plus commit metadata given on the
/// command line
fn raw_from_output(
    format: ToolFormat,
    output: &str,
    commit: Option<String>,
    date: Option<&str>,
) -> Result<RawEntry> {
    let Some(commit) = commit else {
        bail!("--commit is required when --format is given");
    };
    let date = date.map(parse_date).transpose()?;
    let measurements = extract::extract(format, output)?;

    Ok(RawEntry {
        commit: Some(CommitInfo::new(commit)),
        date,
        tool: None,
        benches: Some(measurements.into_iter().map(RawMeasurement::from).collect()),
    })
}

fn parse_date(value: &str) -> Result<i64> {
    if let Ok(millis) = value.parse::<i64>() {
        return Ok(millis);
    }
    let parsed = DateTime::parse_from_rfc3339(value)
        .with_context(|| format!("'{}' is neither RFC 3339 nor epoch milliseconds", value))?;
    Ok(parsed.timestamp_millis())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("🛑 Shutting down");
}
