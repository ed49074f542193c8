// Command-line interface for `vg`.
//
// Each subcommand loads the client configuration, reads the token file and
// calls into the library. Library errors are surfaced through `anyhow` so
// `main` can print them and choose an exit code.

use crate::api::ApiClient;
use crate::batch::{self, Phase};
use crate::config::{default_config_path, ClientConfig};
use crate::status::{self, Check};
use crate::task::load_task_config;
use crate::token::{default_token_path, read_token};
use crate::ui;
use crate::VgError;
use crate::upload::{IndicatifProgress, ProgressSink, ThreadSleeper, UploadOutcome};
use anyhow::{Context as _, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use dialoguer::Confirm;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "vg",
    version,
    about = "Virtual Geneticist API client: upload files, create analysis tasks and check their status",
    long_about = None
)]
pub struct Cli {
    /// Path to the token file containing the API token [default: ~/.vg_token]
    #[arg(short, long, global = true)]
    pub token: Option<PathBuf>,

    /// Client configuration file (JSON)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Run in interactive mode with menu
    #[arg(short, long)]
    pub interactive: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Upload a VCF, PDF or text file.
    Upload {
        /// File to upload (.vcf, .vcf.gz, .pdf, .txt)
        #[arg(short, long)]
        file_path: PathBuf,
        /// Prefix for file organization on the server
        #[arg(short, long)]
        prefix: Option<String>,
        /// Do not show a progress bar
        #[arg(long)]
        no_progress: bool,
        /// Maximum number of upload attempts
        #[arg(long)]
        max_attempts: Option<u32>,
        /// Base of the exponential backoff between attempts, in seconds
        #[arg(long)]
        backoff_factor: Option<f64>,
    },
    /// Create an analysis task from a JSON configuration file.
    Task {
        /// Task configuration file (JSON)
        #[arg(short = 'c', long)]
        task_config: PathBuf,
        /// Submit without asking for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Check the status of a submitted task.
    Status {
        /// Submission id returned when the task was created
        #[arg(short, long)]
        submission_id: String,
        /// Keep checking until the task finishes
        #[arg(short, long)]
        monitor: bool,
        /// Seconds between checks when monitoring
        #[arg(long, default_value_t = status::DEFAULT_MONITOR_INTERVAL.as_secs())]
        interval: u64,
        /// Maximum number of checks when monitoring
        #[arg(long, default_value_t = status::DEFAULT_MAX_CHECKS)]
        max_checks: u32,
    },
    /// Upload files and create tasks for every row of a CSV samplesheet.
    Batch {
        /// Samplesheet (CSV)
        #[arg(long)]
        csv: PathBuf,
        /// Which part of the batch to run
        #[arg(long, value_enum, default_value_t = BatchPhase::Full)]
        phase: BatchPhase,
        /// Directory for the JSON result files
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
        /// Do not show progress bars
        #[arg(long)]
        no_progress: bool,
    },
    /// Show the effective configuration.
    Config,
    /// Check that the API host resolves, accepts connections and answers.
    Diagnose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BatchPhase {
    /// Upload files only
    Upload,
    /// Create tasks from a previous upload_results.json
    Tasks,
    /// Upload files, then create tasks
    Full,
}

impl From<BatchPhase> for Phase {
    fn from(p: BatchPhase) -> Self {
        match p {
            BatchPhase::Upload => Phase::Upload,
            BatchPhase::Tasks => Phase::Tasks,
            BatchPhase::Full => Phase::Full,
        }
    }
}

/// Loaded configuration plus an authenticated client.
pub struct Context {
    pub config: ClientConfig,
    pub api: ApiClient,
    pub token: String,
    pub token_path: PathBuf,
}

impl Context {
    pub fn open(config: ClientConfig, token_path: PathBuf) -> Result<Self> {
        let token = read_token(&token_path)?;
        let api = ApiClient::from_config(&config)?.with_token(&token);
        Ok(Context {
            config,
            api,
            token,
            token_path,
        })
    }
}

/// Progress bar for `path`, or `None` when disabled.
pub fn progress_for(path: &Path, enabled: bool) -> Option<Arc<dyn ProgressSink>> {
    if !enabled {
        return None;
    }
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Some(Arc::new(IndicatifProgress::new(&name)))
}

pub fn run(cli: Cli) -> Result<()> {
    let config = ClientConfig::load(cli.config.as_deref())?;
    let token_path = cli.token.clone().unwrap_or_else(default_token_path);

    let command = match cli.command {
        Some(c) if !cli.interactive => c,
        _ => {
            let ctx = Context::open(config, token_path)?;
            return ui::main_menu(ctx);
        }
    };

    match command {
        Command::Upload {
            file_path,
            prefix,
            no_progress,
            max_attempts,
            backoff_factor,
        } => {
            let mut config = config;
            if let Some(n) = max_attempts {
                config.max_attempts = n;
            }
            if let Some(f) = backoff_factor {
                config.backoff_factor = f;
            }
            if no_progress {
                config.show_progress = false;
            }
            config.validate()?;
            let ctx = Context::open(config, token_path)?;
            upload(&ctx, &file_path, prefix)
        }
        Command::Task { task_config, yes } => {
            let ctx = Context::open(config, token_path)?;
            let task = load_task_config(&task_config)
                .with_context(|| format!("Error loading configuration from {}", task_config.display()))?;
            println!("{}", serde_json::to_string_pretty(&task)?);
            if !yes
                && !Confirm::new()
                    .with_prompt("Do you want to create this task?")
                    .default(false)
                    .interact()?
            {
                println!("Task creation cancelled.");
                return Ok(());
            }
            let created = ctx.api.create_task(&task).context("Task creation failed")?;
            println!("Task created successfully!");
            println!("Submission ID: {}", created.submission_id);
            if let Some(m) = created.message {
                println!("Message: {m}");
            }
            Ok(())
        }
        Command::Status {
            submission_id,
            monitor,
            interval,
            max_checks,
        } => {
            let ctx = Context::open(config, token_path)?;
            if monitor {
                monitor_status(&ctx, &submission_id, Duration::from_secs(interval), max_checks)
            } else {
                let report = ctx.api.get_status(&submission_id).context("Status check failed")?;
                ui::print_report(&report);
                Ok(())
            }
        }
        Command::Batch {
            csv,
            phase,
            output_dir,
            no_progress,
        } => {
            let ctx = Context::open(config, token_path)?;
            run_batch(&ctx, &csv, phase.into(), &output_dir, !no_progress)
        }
        Command::Config => {
            show_configuration(&config, &token_path);
            Ok(())
        }
        Command::Diagnose => diagnose(&ApiClient::from_config(&config)?),
    }
}

pub(crate) fn diagnose(api: &ApiClient) -> Result<()> {
    println!("Testing connectivity to {}", api.base_url());
    let diagnosis = api.diagnose();
    for report in &diagnosis.stages {
        let mark = if report.passed { "ok" } else { "failed" };
        println!("  [{mark}] {}: {}", report.stage.label(), report.detail);
    }
    match diagnosis.failed_stage() {
        None => {
            println!("The API server is reachable.");
            Ok(())
        }
        Some(stage) => Err(VgError::NetworkError(format!("connectivity check failed at {}", stage.label())).into()),
    }
}

pub(crate) fn upload(ctx: &Context, file_path: &Path, prefix: Option<String>) -> Result<()> {
    let uploader = ctx.api.uploader(ctx.config.upload_config());
    let request = ctx.api.upload_request(file_path, prefix)?;
    let progress = progress_for(file_path, ctx.config.show_progress);

    match uploader.upload(&request, progress)? {
        UploadOutcome::Uploaded { remote_path, .. } => {
            println!("Upload successful!");
            println!("Remote path: {remote_path}");
            Ok(())
        }
        UploadOutcome::Failed {
            last_reason,
            attempts_made,
        } => Err(anyhow::Error::new(last_reason).context(format!(
            "Upload of {} failed after {attempts_made} attempt(s)",
            file_path.display()
        ))),
    }
}

pub(crate) fn monitor_status(ctx: &Context, submission_id: &str, interval: Duration, max_checks: u32) -> Result<()> {
    println!(
        "Monitoring {submission_id}: every {}s, at most {max_checks} checks",
        interval.as_secs()
    );
    let outcome = status::monitor(&ctx.api, submission_id, interval, max_checks, &ThreadSleeper, |check| {
        print_check(&check)
    })
    .context("Failed to retrieve status, stopping monitoring")?;

    if outcome.finished {
        println!("Task monitoring complete! Final status: {}", outcome.last.status);
    } else {
        println!("Maximum monitoring time reached ({} checks)", outcome.checks);
    }
    Ok(())
}

fn print_check(check: &Check<'_>) {
    let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
    println!("Check #{} - {now}", check.number);
    if check.changed {
        ui::print_report(check.report);
    } else {
        println!("Status: {} (no change)", check.report.status);
    }
}

pub(crate) fn run_batch(ctx: &Context, csv: &Path, phase: Phase, output_dir: &Path, show_progress: bool) -> Result<()> {
    let rows = batch::read_samplesheet(csv).with_context(|| format!("Error reading {}", csv.display()))?;
    println!("Found {} rows in {}", rows.len(), csv.display());

    let uploader = ctx.api.uploader(ctx.config.upload_config());
    let summary = batch::run(
        phase,
        &rows,
        &uploader,
        &ctx.api,
        &ctx.token,
        output_dir,
        |path| progress_for(path, show_progress),
    )?;

    if let Some(uploads) = &summary.uploads {
        println!("Upload summary:");
        println!("  uploaded: {} files", uploads.uploaded.len());
        println!("  failed:   {} files", uploads.failed.len());
        for (file, reason) in &uploads.failed {
            println!("    {file}: {reason}");
        }
    }
    if let Some(tasks) = &summary.tasks {
        println!("Task creation summary:");
        println!("  created: {} tasks", tasks.created.len());
        for t in &tasks.created {
            println!("    {} ({}): {}", t.title, t.vcf_mode, t.submission_id);
        }
        for (title, reason) in &tasks.failed {
            println!("  not created: {title}: {reason}");
        }
    }
    for path in &summary.written {
        println!("Results saved to: {}", path.display());
    }
    Ok(())
}

pub(crate) fn show_configuration(config: &ClientConfig, token_path: &Path) {
    println!("Base URL:        {}", config.base_url);
    println!("Max attempts:    {}", config.max_attempts);
    println!("Backoff factor:  {}", config.backoff_factor);
    println!("Max backoff:     {}s", config.max_backoff_secs);
    println!("Show progress:   {}", config.show_progress);
    println!("Token file:      {}", token_path.display());
    if let Some(p) = default_config_path() {
        println!("Config file:     {}", p.display());
    }
}
