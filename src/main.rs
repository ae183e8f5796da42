// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{info, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use kwtrans::app_config::{self, Config, TranslationProvider};
use kwtrans::errors::{AppError, JobError};
use kwtrans::{
    read_keyword_file, render_export, resolve_language_name, ExportFormat, ExportSink,
    FileSystemSink, JobStatus, JobStore, LlmTranslator, Translator, Worker,
};

/// CLI Wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationProvider {
    Ollama,
    OpenAI,
    Anthropic,
    LMStudio,
}

impl From<CliTranslationProvider> for TranslationProvider {
    fn from(cli_provider: CliTranslationProvider) -> Self {
        match cli_provider {
            CliTranslationProvider::Ollama => TranslationProvider::Ollama,
            CliTranslationProvider::OpenAI => TranslationProvider::OpenAI,
            CliTranslationProvider::Anthropic => TranslationProvider::Anthropic,
            CliTranslationProvider::LMStudio => TranslationProvider::LMStudio,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

/// CLI Wrapper for JobStatus to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliJobStatus {
    Queued,
    InProgress,
    Completed,
    Failed,
}

impl From<CliJobStatus> for JobStatus {
    fn from(status: CliJobStatus) -> Self {
        match status {
            CliJobStatus::Queued => JobStatus::Queued,
            CliJobStatus::InProgress => JobStatus::InProgress,
            CliJobStatus::Completed => JobStatus::Completed,
            CliJobStatus::Failed => JobStatus::Failed,
        }
    }
}

/// CLI Wrapper for ExportFormat to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliExportFormat {
    Csv,
    Xlsx,
}

impl From<CliExportFormat> for ExportFormat {
    fn from(format: CliExportFormat) -> Self {
        match format {
            CliExportFormat::Csv => ExportFormat::Csv,
            CliExportFormat::Xlsx => ExportFormat::Xlsx,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Process one queued job, or drain every claimable job (default command)
    Work(WorkArgs),

    /// Submit a keyword sheet (.csv or .xlsx) as a new job
    Submit {
        /// Keyword file with a Keyword column
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Target language: ISO code ('fr', 'deu') or English name ('French')
        #[arg(short = 't', long)]
        language: String,

        /// Items per insert transaction
        #[arg(long)]
        chunk_size: Option<usize>,
    },

    /// List jobs, newest first
    List {
        /// Only show jobs with this status
        #[arg(short, long, value_enum)]
        status: Option<CliJobStatus>,
    },

    /// Re-render the export of a completed job
    Export {
        /// Job identifier
        job_id: String,

        /// Export format (defaults to the configured one)
        #[arg(short, long, value_enum)]
        format: Option<CliExportFormat>,
    },

    /// Delete a job and all of its items
    Delete {
        /// Job identifier
        job_id: String,
    },

    /// Generate shell completions for kwtrans
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug, Default)]
struct WorkArgs {
    /// Job to process; all claimable jobs when omitted
    #[arg(value_name = "JOB_ID")]
    job_id: Option<String>,

    /// Keep polling for new jobs until Ctrl-C
    #[arg(short, long, conflicts_with = "job_id")]
    watch: bool,

    /// Seconds between polls in watch mode
    #[arg(long, requires = "watch")]
    poll_secs: Option<u64>,
}

/// kwtrans - keyword translation job pipeline
///
/// Translates spreadsheets of SEO keywords into another language, two
/// variants per keyword, using AI providers (OpenAI, Anthropic, Ollama).
#[derive(Parser, Debug)]
#[command(name = "kwtrans")]
#[command(version)]
#[command(about = "AI-powered keyword translation pipeline")]
#[command(long_about = "kwtrans stores keyword sheets as translation jobs and translates them with AI providers.

EXAMPLES:
    kwtrans submit keywords.xlsx -t fr          # Queue a job translating into French
    kwtrans                                      # Process every queued job
    kwtrans work 4f1c...                         # Process one specific job
    kwtrans work --watch --poll-secs 10          # Keep processing new jobs until Ctrl-C
    kwtrans list --status completed              # Show finished jobs
    kwtrans export 4f1c... --format xlsx         # Write the job's table again
    kwtrans -p anthropic work                    # Use a specific provider
    kwtrans completions bash > kwtrans.bash      # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config. If the config file doesn't exist, a default one
    will be created automatically. Environment variables (also read from .env)
    override the file: OPENAI_API_KEY, ANTHROPIC_API_KEY, KWTRANS_PROVIDER,
    KWTRANS_MODEL, KWTRANS_DATABASE, KWTRANS_EXPORT_DIR, KWTRANS_MAX_ATTEMPTS,
    KWTRANS_REQUEST_DELAY_MS, KWTRANS_CHUNK_SIZE, KWTRANS_CONCURRENCY.

SUPPORTED PROVIDERS:
    openai    - OpenAI API (requires API key, default)
    anthropic - Anthropic Claude API (requires API key)
    ollama    - Local Ollama server
    lmstudio  - LM Studio local server (OpenAI-compatible on http://localhost:1234/v1)")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Job to process when no subcommand is given
    #[arg(value_name = "JOB_ID")]
    job_id: Option<String>,

    /// Configuration file path
    #[arg(short, long = "config", default_value = "conf.json", global = true)]
    config_path: PathBuf,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,

    /// Translation provider to use
    #[arg(short, long, value_enum, global = true)]
    provider: Option<CliTranslationProvider>,

    /// Model name to use for translation
    #[arg(short, long, global = true)]
    model: Option<String>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Marker and ANSI color for log level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("❌", "1;31"),
            Level::Warn => ("🚧", "1;33"),
            Level::Info => ("  ", "1;32"),
            Level::Debug => ("🔍", "1;36"),
            Level::Trace => ("📋", "1;35"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        // Levels raised later through `log::set_max_level` must pass too
        metadata.level() <= self.level.max(log::max_level())
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (marker, color) = Self::style_for_level(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "\x1B[{}m{} {} {}\x1B[0m",
                color,
                now,
                marker,
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger once with info level by default
    // We'll update the level after loading the config if needed
    CustomLogger::init(LevelFilter::Info)?;

    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = CommandLineOptions::parse();

    let command = match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "kwtrans", &mut std::io::stdout());
            return Ok(());
        }
        Some(command) => command,
        // Default behavior: work on the given job, or drain
        None => Commands::Work(WorkArgs {
            job_id: cli.job_id.clone(),
            ..WorkArgs::default()
        }),
    };

    let config = load_config(
        &cli.config_path,
        cli.log_level,
        cli.provider,
        cli.model,
    )?;
    let store = JobStore::open(config.database_path.as_deref())?;

    match command {
        Commands::Work(args) => run_work(&config, store, args).await,
        Commands::Submit { file, language, chunk_size } => {
            run_submit(&config, &store, &file, &language, chunk_size).await
        }
        Commands::List { status } => run_list(&store, status.map(Into::into)).await,
        Commands::Export { job_id, format } => {
            let format = format.map(Into::into).unwrap_or(config.export_format);
            run_export(&config, &store, &job_id, format).await
        }
        Commands::Delete { job_id } => run_delete(&store, &job_id).await,
        Commands::Completions { .. } => Ok(()),
    }
}

/// Load the config file, then apply environment and command line overrides
fn load_config(
    config_path: &Path,
    log_level: Option<CliLogLevel>,
    provider: Option<CliTranslationProvider>,
    model: Option<String>,
) -> Result<Config> {
    // If log level is set via command line, apply it immediately
    if let Some(level) = &log_level {
        let level: app_config::LogLevel = level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let mut config = Config::load_or_create(config_path)?;
    config.apply_env_overrides()?;

    if let Some(provider) = provider {
        config.translation.provider = provider.into();
    }
    if let Some(model) = model {
        config.translation.set_model(model);
    }
    if let Some(level) = log_level {
        config.log_level = level.into();
    }

    log::set_max_level(config.log_level.to_level_filter());
    Ok(config)
}

async fn run_work(config: &Config, store: JobStore, args: WorkArgs) -> Result<()> {
    config
        .validate()
        .map_err(|e| AppError::Config(format!("{:#}", e)))?;

    let translator: Arc<dyn Translator> = Arc::new(LlmTranslator::from_config(&config.translation)?);
    let sink: Arc<dyn ExportSink> = Arc::new(FileSystemSink::new(&config.export_dir));
    info!("Using {}", translator.describe());

    let worker = Worker::new(store, translator, sink, config.worker.clone())
        .with_export_format(config.export_format);

    if let Some(job_id) = args.job_id {
        let outcome = worker.process_job(&job_id).await?;
        println!("{}", outcome);
        if let Some(url) = outcome.download_url {
            println!("{}", url);
        }
        return Ok(());
    }

    if args.watch {
        let poll_interval = args
            .poll_secs
            .map(std::time::Duration::from_secs)
            .unwrap_or_else(|| config.worker.poll_interval());
        let shutdown = async {
            let _ = tokio::signal::ctrl_c().await;
        };
        return worker.watch(poll_interval, shutdown).await;
    }

    let report = worker.drain().await?;
    for outcome in &report.outcomes {
        println!("{}", outcome);
    }
    info!(
        "Drain finished: {} processed, {} aborted, {} lost to other workers",
        report.processed(),
        report.aborted,
        report.lost_claims
    );
    if report.aborted > 0 {
        return Err(anyhow!("{} job(s) were aborted, see log above", report.aborted));
    }
    Ok(())
}

async fn run_submit(
    config: &Config,
    store: &JobStore,
    file: &Path,
    language: &str,
    chunk_size: Option<usize>,
) -> Result<()> {
    if !file.is_file() {
        return Err(AppError::File(format!("Keyword file not found: {}", file.display())).into());
    }
    let target_language = resolve_language_name(language)?;
    let items = read_keyword_file(file)?;
    if items.is_empty() {
        return Err(JobError::EmptySubmission.into());
    }

    let chunk_size = chunk_size.unwrap_or(config.worker.chunk_size).max(1);
    let job = store.submit_job(&target_language, items, chunk_size).await?;

    println!("{}", job.id);
    Ok(())
}

async fn run_list(store: &JobStore, status: Option<JobStatus>) -> Result<()> {
    let jobs = store.list_jobs(status).await?;

    for job in &jobs {
        println!(
            "{}  {:<11}  {:<12}  {}  {}",
            job.id,
            job.status.to_string(),
            job.target_language,
            job.submitted_at,
            job.download_url.as_deref().unwrap_or("-")
        );
    }
    info!("{}", store.stats().await?);
    Ok(())
}

async fn run_export(config: &Config, store: &JobStore, job_id: &str, format: ExportFormat) -> Result<()> {
    let job = store
        .get_job(job_id)
        .await?
        .ok_or_else(|| JobError::NotFound(job_id.to_string()))?;
    if job.status != JobStatus::Completed {
        return Err(anyhow!("Job {} is {}, only completed jobs can be exported", job.id, job.status));
    }

    let items = store.list_items(&job.id).await?;
    let bytes = render_export(&items, format)?;
    let reference = FileSystemSink::new(&config.export_dir)
        .publish(&job.id, format, bytes)
        .await?;

    println!("{}", reference);
    Ok(())
}

async fn run_delete(store: &JobStore, job_id: &str) -> Result<()> {
    if !store.delete_job(job_id).await? {
        return Err(JobError::NotFound(job_id.to_string()).into());
    }
    info!("Deleted job {}", job_id);
    Ok(())
}
