//! Binary entry point for intent-analyzer.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use intent_analyzer::cli::{
    OutputFormat, build_analyzer, build_generator, build_ollama_client, build_search_provider,
    write_json, write_result, write_summary,
};
use intent_analyzer::config::{AppConfig, LogFormat};
use intent_analyzer::io::{ExportOptions, Format, export_to_path, read_queries_from_path};
use intent_analyzer::config::LlmProvider;
use intent_analyzer::models::{AnalysisPath, BatchFilter, IntentLabel, Query, SignalSource};
use intent_analyzer::search::SearchOptions;
use intent_analyzer::observability;
use intent_analyzer::services::{BatchConfig, BatchOrchestrator, CancellationToken};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

/// Classify the search intent behind queries.
#[derive(Parser)]
#[command(name = "intent-analyzer")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to configuration file.
    #[arg(short, long, global = true, env = "INTENT_ANALYZER_CONFIG")]
    config: Option<PathBuf>,

    /// Analysis path.
    #[arg(short, long, global = true, value_enum)]
    mode: Option<Mode>,

    /// Emit logs as JSON.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    /// Keyword, SERP, content and classifier signal fusion.
    Fusion,
    /// Local language model judgment.
    Model,
}

impl From<Mode> for AnalysisPath {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Fusion => Self::Fusion,
            Mode::Model => Self::Model,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ReportFormat {
    /// One row per query.
    Csv,
    /// Report with a summary and all rows.
    Json,
}

impl From<ReportFormat> for Format {
    fn from(format: ReportFormat) -> Self {
        match format {
            ReportFormat::Csv => Self::Csv,
            ReportFormat::Json => Self::Json,
        }
    }
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Analyze one or more queries.
    Analyze {
        /// Queries to analyze.
        #[arg(required = true)]
        queries: Vec<String>,

        /// Output format: text or json.
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,

        /// Model name override for the model path.
        #[arg(long)]
        model: Option<String>,
    },

    /// Analyze queries from a file.
    Batch {
        /// Input file: text (one per line), CSV with a query column, or JSON.
        #[arg(short, long)]
        input: PathBuf,

        /// Report file; prints a summary only when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Report format; defaults to the output file extension.
        #[arg(short, long, value_enum)]
        format: Option<ReportFormat>,

        /// Worker threads (1-16).
        #[arg(short, long)]
        workers: Option<usize>,

        /// Per-query deadline in milliseconds.
        #[arg(long)]
        item_timeout_ms: Option<u64>,

        /// Only export results at or above this confidence.
        #[arg(long)]
        min_confidence: Option<f64>,

        /// Only export results with this primary intent (repeatable).
        #[arg(long = "intent")]
        intents: Vec<String>,

        /// Only export queries containing this text.
        #[arg(long)]
        contains: Option<String>,

        /// Keep repeated queries.
        #[arg(long)]
        no_dedupe: bool,
    },

    /// Check that the inference and search services are reachable.
    Check,

    /// Manage configuration.
    Config {
        /// Show the effective configuration.
        #[arg(long)]
        show: bool,
    },

    /// Generate shell completions.
    Completions {
        /// Target shell.
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() -> ExitCode {
    // Missing .env is fine.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        let mut command = Cli::command();
        clap_complete::generate(shell, &mut command, "intent-analyzer", &mut std::io::stdout());
        return ExitCode::SUCCESS;
    }

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::FAILURE;
        },
    };

    let mut observability = match observability::init(&config.logging, &config.metrics, cli.verbose)
    {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Error: failed to initialize logging: {e}");
            return ExitCode::FAILURE;
        },
    };

    let result = match cli.command {
        Commands::Analyze {
            queries,
            format,
            model,
        } => cmd_analyze(config, &queries, format, model, cli.verbose > 0),
        Commands::Batch {
            input,
            output,
            format,
            workers,
            item_timeout_ms,
            min_confidence,
            intents,
            contains,
            no_dedupe,
        } => cmd_batch(
            config,
            BatchArgs {
                input,
                output,
                format,
                workers,
                item_timeout_ms,
                min_confidence,
                intents,
                contains,
                no_dedupe,
            },
        ),
        Commands::Check => cmd_check(&config),
        Commands::Config { show } => cmd_config(&config, show),
        Commands::Completions { .. } => Ok(ExitCode::SUCCESS),
    };

    observability.shutdown();
    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        },
    }
}

/// Loads config from `--config` or the default locations, then applies
/// environment and flag overrides.
fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => AppConfig::load_default()?,
    };
    config.apply_process_env()?;
    if let Some(mode) = cli.mode {
        config.mode = mode.into();
    }
    if cli.json_logs {
        config.logging.format = LogFormat::Json;
    }
    Ok(config)
}

fn cmd_analyze(
    mut config: AppConfig,
    queries: &[String],
    format: OutputFormat,
    model: Option<String>,
    verbose: bool,
) -> Result<ExitCode> {
    if let Some(model) = model {
        config.model.model = model;
    }
    let analyzer = build_analyzer(&config)?;

    let mut failed = false;
    let mut results = Vec::with_capacity(queries.len());
    for raw in queries {
        match Query::parse(raw).and_then(|query| analyzer.analyze(&query)) {
            Ok(result) => results.push(result),
            Err(e) => {
                failed = true;
                eprintln!("{raw}: {e}");
            },
        }
    }

    let mut stdout = std::io::stdout().lock();
    match format {
        OutputFormat::Json => write_json(&mut stdout, &results)?,
        OutputFormat::Text => {
            for (i, result) in results.iter().enumerate() {
                if i > 0 {
                    writeln!(stdout)?;
                }
                write_result(&mut stdout, result, verbose)?;
            }
        },
    }

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

struct BatchArgs {
    input: PathBuf,
    output: Option<PathBuf>,
    format: Option<ReportFormat>,
    workers: Option<usize>,
    item_timeout_ms: Option<u64>,
    min_confidence: Option<f64>,
    intents: Vec<String>,
    contains: Option<String>,
    no_dedupe: bool,
}

fn cmd_batch(mut config: AppConfig, args: BatchArgs) -> Result<ExitCode> {
    if let Some(workers) = args.workers {
        config.batch.workers = workers;
    }
    if let Some(timeout) = args.item_timeout_ms {
        config.batch.item_timeout_ms = timeout;
    }
    let filter = BatchFilter {
        intents: args
            .intents
            .iter()
            .map(|s| IntentLabel::parse(s).with_context(|| format!("unknown intent '{s}'")))
            .collect::<Result<_>>()?,
        min_confidence: args.min_confidence,
        contains: args.contains,
    };

    let imported = read_queries_from_path(
        &args.input,
        None,
        config.batch.dedupe && !args.no_dedupe,
    )
    .with_context(|| format!("reading {}", args.input.display()))?;
    if imported.queries.is_empty() {
        bail!("no queries found in {}", args.input.display());
    }
    eprintln!(
        "Analyzing {} queries ({} blank, {} duplicates skipped)",
        imported.queries.len(),
        imported.skipped_blank,
        imported.skipped_duplicates
    );

    let analyzer = build_analyzer(&config)?;
    let token = CancellationToken::new();
    let handler_token = token.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nCancelling; waiting for running queries to finish...");
        handler_token.cancel();
    })
    .context("installing Ctrl-C handler")?;

    let orchestrator = BatchOrchestrator::new(analyzer, BatchConfig::from_settings(&config.batch))?
        .with_cancellation(token)
        .with_progress(|p| {
            let status = if p.ok { "ok" } else { "failed" };
            eprintln!("[{}/{}] {} ({status})", p.completed, p.total, p.query);
        });
    let batch = orchestrator.run(&imported.queries);

    let mut stdout = std::io::stdout().lock();
    write_summary(&mut stdout, &batch.summary())?;

    if let Some(output) = &args.output {
        let format = args
            .format
            .map_or_else(|| Format::from_path(output), Format::from);
        let format = if format.supports_export() {
            format
        } else {
            Format::Csv
        };
        let options = ExportOptions::default()
            .with_format(format)
            .with_filter(filter);
        let exported = export_to_path(output, &batch, &options)?;
        writeln!(
            stdout,
            "\nWrote {} of {} rows to {} ({})",
            exported.exported,
            exported.total,
            output.display(),
            exported.format
        )?;
    }

    Ok(if batch.was_cancelled() {
        ExitCode::from(130)
    } else {
        ExitCode::SUCCESS
    })
}

fn cmd_check(config: &AppConfig) -> Result<ExitCode> {
    config.validate()?;
    let mut healthy = true;

    let generator = build_generator(&config.model);
    let model_ok = generator.is_available();
    println!(
        "Model service ({}, {}): {}",
        config.model.provider.as_str(),
        config.model.model,
        if model_ok { "reachable" } else { "unreachable" }
    );
    if !model_ok && config.mode == AnalysisPath::Model {
        healthy = false;
    }
    if model_ok && config.model.provider == LlmProvider::Ollama {
        match build_ollama_client(&config.model).list_models() {
            Ok(models) if models.iter().any(|m| m == &config.model.model) => {},
            Ok(models) => println!(
                "  Model '{}' not pulled; available: {}",
                config.model.model,
                models.join(", ")
            ),
            Err(e) => println!("  Could not list models: {e}"),
        }
    }

    match build_search_provider(&config.search)? {
        Some(provider) => {
            let probe = Query::parse("weather")?;
            let options = SearchOptions {
                limit: 1,
                scrape_content: false,
                ..config.search.options()
            };
            match provider.search(&probe, &options) {
                Ok(_) => println!("Search service ({}): reachable", provider.name()),
                Err(e) => {
                    println!("Search service ({}): {e}", provider.name());
                    healthy = false;
                },
            }
        },
        None => println!("Search service: not configured (set FIRECRAWL_API_KEY)"),
    }

    let weights = config.weights.to_weights()?;
    println!(
        "Mode: {}  Weights: serp {:.2}, modifiers {:.2}, content {:.2}, classifier {:.2}",
        config.mode,
        weights.get(SignalSource::Serp),
        weights.get(SignalSource::Modifiers),
        weights.get(SignalSource::Content),
        weights.get(SignalSource::Classifier),
    );

    Ok(if healthy {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn cmd_config(config: &AppConfig, show: bool) -> Result<ExitCode> {
    if show {
        config.validate()?;
        print!("{}", config.to_toml()?);
    } else {
        println!("Configuration search paths:");
        for path in AppConfig::default_paths() {
            let marker = if path.exists() { " (found)" } else { "" };
            println!("  {}{marker}", path.display());
        }
        println!("\nUse --show to print the effective configuration.");
    }
    Ok(ExitCode::SUCCESS)
}
