//! URL Probe CLI Application
//!
//! A command-line interface for probing lists of URLs with a bounded number
//! of concurrent HTTP requests. This CLI application wraps the url-probe-lib
//! engine with configuration layering, a progress bar and a result file.

mod ui;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::Parser;
use std::fs::File;
use std::io::BufWriter;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use url_probe_lib::{load_env_config, ConfigManager, EnvConfig, FileConfig};
use url_probe_lib::{
    read_urls_from_file, OutputFormat, ProbeConfig, ProbeError, UrlProber, WriterSink,
    DEFAULT_TIMEOUT_MS, DEFAULT_WORKERS, MAX_WORKERS,
};

use crate::ui::ProgressReporter;

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

const DEFAULT_INPUT: &str = "urls.txt";
const DEFAULT_OUTPUT: &str = "results.csv";

/// CLI arguments for url-probe
#[derive(Parser, Debug)]
#[command(name = "url-probe")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Probe a list of URLs and record their HTTP status codes")]
#[command(
    long_about = "Probe a list of URLs over HTTP(S) and record, for each, the response status code or 'no-response'.\n\nA fixed pool of workers drains the list while a shared gate caps how many requests are in flight."
)]
#[command(styles = STYLES)]
pub struct Args {
    /// File with URLs, one per line ('-' for stdin) [default: urls.txt]
    #[arg(short = 'f', long = "file", value_name = "FILE", help_heading = "Input")]
    pub file: Option<String>,

    /// Number of worker loops [default: 100]
    #[arg(
        short = 'n',
        long = "workers",
        value_name = "N",
        help_heading = "Performance"
    )]
    pub workers: Option<usize>,

    /// Max requests in flight [default: same as workers]
    #[arg(
        short = 'c',
        long = "concurrency",
        value_name = "N",
        help_heading = "Performance"
    )]
    pub concurrency: Option<usize>,

    /// Per-request timeout in milliseconds [default: 3000]
    #[arg(
        short = 't',
        long = "timeout",
        value_name = "MS",
        help_heading = "Performance"
    )]
    pub timeout: Option<u64>,

    /// Result file path [default: results.csv]
    #[arg(short = 'o', long = "output", value_name = "FILE", help_heading = "Output")]
    pub output: Option<String>,

    /// Result format: csv or json (one JSON object per line)
    #[arg(long = "format", value_name = "FORMAT", help_heading = "Output")]
    pub format: Option<String>,

    /// Write a 'url,outcome' header line to CSV output
    #[arg(long = "header", help_heading = "Output")]
    pub header: bool,

    /// Emit an extra 301 result when a request fails on the URL's slash-terminated redirect target
    #[arg(long = "redirect-hint", help_heading = "Output")]
    pub redirect_hint: bool,

    /// Hide the progress bar
    #[arg(long = "no-progress", help_heading = "Output")]
    pub no_progress: bool,

    /// Use specific config file instead of automatic discovery
    #[arg(long = "config", value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<String>,

    /// Verbose logging
    #[arg(short = 'v', long = "verbose", help_heading = "Configuration")]
    pub verbose: bool,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RunConfig {
    pub(crate) workers: usize,
    /// Unset means "same as workers".
    pub(crate) concurrency: Option<usize>,
    pub(crate) timeout: Duration,
    pub(crate) redirect_hint: bool,
    pub(crate) input: String,
    pub(crate) output: String,
    pub(crate) format: OutputFormat,
    pub(crate) header: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            concurrency: None,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            redirect_hint: false,
            input: DEFAULT_INPUT.to_string(),
            output: DEFAULT_OUTPUT.to_string(),
            format: OutputFormat::default(),
            header: false,
        }
    }
}

impl RunConfig {
    /// Engine settings, with the concurrency cap falling back to the worker count.
    pub(crate) fn probe_config(&self) -> ProbeConfig {
        ProbeConfig::default()
            .with_workers(self.workers)
            .with_concurrency(self.concurrency.unwrap_or(self.workers))
            .with_timeout(self.timeout)
            .with_redirect_hint(self.redirect_hint)
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Validate arguments
    if let Err(e) = validate_args(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    init_logging(args.verbose);

    if let Err(e) = run_url_probe(args).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Install the tracing subscriber on stderr.
///
/// `RUST_LOG` wins when set; otherwise warnings only, or debug output for
/// both crates with `--verbose`.
fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "warn,url_probe=debug,url_probe_lib=debug"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Validate command line arguments
fn validate_args(args: &Args) -> Result<(), String> {
    if let Some(workers) = args.workers {
        if workers == 0 || workers > MAX_WORKERS {
            return Err(format!("Workers must be between 1 and {}", MAX_WORKERS));
        }
    }

    if let Some(concurrency) = args.concurrency {
        if concurrency == 0 || concurrency > MAX_WORKERS {
            return Err(format!("Concurrency must be between 1 and {}", MAX_WORKERS));
        }
    }

    if args.timeout == Some(0) {
        return Err("Timeout must be greater than 0 milliseconds".to_string());
    }

    if let Some(format) = &args.format {
        format.parse::<OutputFormat>().map_err(|e| e.to_string())?;
    }

    if args.file.as_deref().is_some_and(|f| f.trim().is_empty()) {
        return Err("Input file path cannot be empty".to_string());
    }

    if args.output.as_deref().is_some_and(|o| o.trim().is_empty()) {
        return Err("Output file path cannot be empty".to_string());
    }

    Ok(())
}

/// Main probing logic
async fn run_url_probe(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = build_config(&args)?;
    let probe_config = config.probe_config();

    let urls = match read_urls_from_file(&config.input) {
        Ok(urls) => urls,
        Err(e) => {
            warn!(error = %e, "could not read URL list, continuing with no URLs");
            Vec::new()
        }
    };
    info!(count = urls.len(), source = %config.input, "loaded URL list");

    let mut sink = open_result_sink(&config)?;

    ui::print_header(urls.len(), &probe_config, &config.output);

    let progress = Arc::new(ProgressReporter::new(urls.len(), args.no_progress));
    let prober = UrlProber::with_config(probe_config)?;
    let summary = prober.probe_all(urls, &mut sink, progress.clone()).await?;
    progress.finish();

    if summary.sink_failures > 0 {
        warn!(
            failures = summary.sink_failures,
            path = %config.output,
            "some results could not be written"
        );
    }

    ui::print_summary(&summary);
    println!();
    println!("All probes completed.");

    Ok(())
}

/// Create the result file and wrap it in a sink of the configured format.
fn open_result_sink(config: &RunConfig) -> Result<WriterSink<BufWriter<File>>, ProbeError> {
    let file = File::create(&config.output).map_err(|e| {
        ProbeError::file_error(config.output.as_str(), format!("Failed to create: {}", e))
    })?;

    let mut sink = WriterSink::new(BufWriter::new(file), config.format);
    if config.header {
        sink.write_header()?;
    }
    Ok(sink)
}

/// Resolve settings from config files, environment and CLI arguments.
///
/// Precedence, lowest to highest: defaults, config file, `UP_*` variables,
/// command line.
fn build_config(args: &Args) -> Result<RunConfig, Box<dyn std::error::Error>> {
    let mut config = RunConfig::default();
    let env_config = load_env_config();

    // Create config manager for file discovery
    let config_manager = ConfigManager::new(args.verbose);

    // Step 1: Determine config file path and load config files
    if let Some(explicit_config_path) = args.config.as_ref().or(env_config.config.as_ref()) {
        debug!(path = %explicit_config_path, "using explicit config file");

        let file_config = config_manager
            .load_file(explicit_config_path)
            .map_err(|e| {
                format!(
                    "Failed to load config file '{}': {}",
                    explicit_config_path, e
                )
            })?;

        config = merge_file_config_into_run_config(config, file_config);
    } else {
        match config_manager.discover_and_load() {
            Ok(file_config) => {
                config = merge_file_config_into_run_config(config, file_config);
            }
            Err(e) => warn!(error = %e, "config discovery failed, using defaults"),
        }
    }

    // Step 2: Apply environment variables (UP_*)
    config = apply_environment_config(config, &env_config);

    // Step 3: Apply CLI arguments (highest precedence)
    config = apply_cli_args_to_config(config, args)?;

    Ok(config)
}

/// Merge FileConfig into RunConfig
fn merge_file_config_into_run_config(mut config: RunConfig, file_config: FileConfig) -> RunConfig {
    if let Some(defaults) = file_config.defaults {
        if let Some(workers) = defaults.workers {
            config.workers = workers;
        }
        if let Some(concurrency) = defaults.concurrency {
            config.concurrency = Some(concurrency);
        }
        if let Some(timeout) = defaults
            .timeout
            .as_deref()
            .and_then(url_probe_lib::parse_timeout_string)
        {
            config.timeout = timeout;
        }
        if let Some(input) = defaults.input {
            config.input = input;
        }
        if let Some(redirect_hint) = defaults.redirect_hint {
            config.redirect_hint = redirect_hint;
        }
    }

    if let Some(output) = file_config.output {
        if let Some(path) = output.path {
            config.output = path;
        }
        if let Some(format) = output.format.and_then(|f| f.parse::<OutputFormat>().ok()) {
            config.format = format;
        }
        if let Some(header) = output.header {
            config.header = header;
        }
    }

    config
}

/// Apply `UP_*` environment variables to config.
fn apply_environment_config(mut config: RunConfig, env_config: &EnvConfig) -> RunConfig {
    if let Some(workers) = env_config.workers {
        config.workers = workers;
    }
    if let Some(concurrency) = env_config.concurrency {
        config.concurrency = Some(concurrency);
    }
    if let Some(timeout) = env_config.timeout {
        config.timeout = timeout;
    }
    if let Some(file) = &env_config.file {
        config.input = file.clone();
    }
    if let Some(output) = &env_config.output {
        config.output = output.clone();
    }
    if let Some(format) = env_config.format {
        config.format = format;
    }
    if let Some(header) = env_config.header {
        config.header = header;
    }
    if let Some(redirect_hint) = env_config.redirect_hint {
        config.redirect_hint = redirect_hint;
    }

    config
}

/// Apply CLI arguments to config. Flags only switch features on.
fn apply_cli_args_to_config(
    mut config: RunConfig,
    args: &Args,
) -> Result<RunConfig, Box<dyn std::error::Error>> {
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if let Some(concurrency) = args.concurrency {
        config.concurrency = Some(concurrency);
    }
    if let Some(timeout_ms) = args.timeout {
        config.timeout = Duration::from_millis(timeout_ms);
    }
    if let Some(file) = &args.file {
        config.input = file.clone();
    }
    if let Some(output) = &args.output {
        config.output = output.clone();
    }
    if let Some(format) = &args.format {
        config.format = format.parse::<OutputFormat>()?;
    }
    if args.header {
        config.header = true;
    }
    if args.redirect_hint {
        config.redirect_hint = true;
    }

    Ok(config)
}
