// UI layer: interactive menu built on `dialoguer`. Each entry collects its
// inputs, then delegates to the same functions the subcommands use.

use crate::batch::Phase;
use crate::cli::{self, Context};
use crate::status::{StatusReport, TaskStatus, DEFAULT_MAX_CHECKS, DEFAULT_MONITOR_INTERVAL};
use crate::task::{load_task_config, Assembly, TaskConfig, VcfMode};
use anyhow::Result;
use crossterm::style::{StyledContent, Stylize};
use dialoguer::{Confirm, Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;

fn print_banner() {
    let rule = "=".repeat(70);
    println!("{rule}");
    println!("{}", "VIRTUAL GENETICIST API CLIENT".bold());
    println!("Upload files, create analysis tasks and check their status");
    println!("{rule}");
}

fn styled_status(status: TaskStatus) -> StyledContent<&'static str> {
    let s = status.as_str();
    match status {
        TaskStatus::Created | TaskStatus::Initialized => s.yellow(),
        TaskStatus::Running => s.cyan(),
        TaskStatus::Completed => s.green(),
        TaskStatus::Failed => s.red(),
        TaskStatus::Cancelled | TaskStatus::Unknown => s.dark_grey(),
    }
}

/// Print a status report followed by a colored status line.
pub fn print_report(report: &StatusReport) {
    println!("{}", crate::status::format_report(report));
    println!("{} {}", "Current status:".bold(), styled_status(report.status));
}

fn spinner(msg: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(msg);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Main interactive menu. Runs a select loop until the user chooses "Exit".
/// A failed action is reported and the menu continues.
pub fn main_menu(ctx: Context) -> Result<()> {
    print_banner();
    println!("Token loaded from: {}", ctx.token_path.display());
    loop {
        let items = [
            "Upload file",
            "Create analysis task",
            "Check task status",
            "Monitor task status",
            "Run CSV batch",
            "Show current configuration",
            "Run connectivity diagnostic",
            "Exit",
        ];
        let selection = Select::new()
            .with_prompt("Main menu")
            .items(&items)
            .default(0)
            .interact()?;
        let result = match selection {
            0 => handle_upload(&ctx),
            1 => handle_create_task(&ctx),
            2 => handle_status(&ctx),
            3 => handle_monitor(&ctx),
            4 => handle_batch(&ctx),
            5 => {
                cli::show_configuration(&ctx.config, &ctx.token_path);
                Ok(())
            }
            6 => cli::diagnose(&ctx.api),
            _ => break,
        };
        if let Err(e) = result {
            println!("{} {e:#}", "Error:".red());
        }
    }
    println!("Thank you for using the Virtual Geneticist API client!");
    Ok(())
}

fn handle_upload(ctx: &Context) -> Result<()> {
    let path: String = Input::new().with_prompt("File path").interact_text()?;
    let prefix: String = Input::new()
        .with_prompt("Prefix (optional)")
        .allow_empty(true)
        .interact_text()?;
    let prefix = Some(prefix.trim().to_string()).filter(|p| !p.is_empty());
    cli::upload(ctx, &PathBuf::from(path.trim()), prefix)?;
    println!("You can now use the remote path in your task creation requests.");
    Ok(())
}

fn handle_create_task(ctx: &Context) -> Result<()> {
    let path: String = Input::new().with_prompt("Task configuration file").interact_text()?;
    let defaults = load_task_config(&PathBuf::from(path.trim()))?;
    println!("Current default configuration:");
    println!("{}", serde_json::to_string_pretty(&defaults)?);

    let use_defaults = Confirm::new()
        .with_prompt("Use default configuration?")
        .default(true)
        .interact()?;
    let task = if use_defaults {
        defaults
    } else {
        customize_task(&defaults)?
    };

    println!("Final task configuration:");
    println!("{}", serde_json::to_string_pretty(&task)?);
    if !Confirm::new()
        .with_prompt("Do you want to create this task?")
        .default(false)
        .interact()?
    {
        println!("Task creation cancelled.");
        return Ok(());
    }

    let spinner = spinner("Creating task...");
    let result = ctx.api.create_task(&task);
    spinner.finish_and_clear();
    let created = result?;
    println!("Task created successfully!");
    println!("Submission ID: {}", created.submission_id);
    println!("You can now use the submission id to check the task status.");
    Ok(())
}

fn prompt_with_default(prompt: &str, default: &str) -> Result<String> {
    let value: String = Input::new()
        .with_prompt(prompt)
        .default(default.to_string())
        .allow_empty(true)
        .interact_text()?;
    Ok(value.trim().to_string())
}

fn prompt_file(prompt: &str, default: &Option<String>) -> Result<Option<String>> {
    let value = prompt_with_default(prompt, default.as_deref().unwrap_or(""))?;
    Ok(Some(value).filter(|v| !v.is_empty()))
}

/// Walk through every task field, offering the loaded value as default.
fn customize_task(defaults: &TaskConfig) -> Result<TaskConfig> {
    let title = prompt_with_default("Title", &defaults.title)?;
    let project = prompt_with_default("Project", &defaults.project)?;

    let modes: Vec<&str> = VcfMode::ALL.iter().map(|m| m.label()).collect();
    let mode_default = VcfMode::ALL.iter().position(|m| *m == defaults.vcf_mode).unwrap_or(0);
    let vcf_mode = VcfMode::ALL[Select::new()
        .with_prompt("Analysis mode")
        .items(&modes)
        .default(mode_default)
        .interact()?];

    let assemblies: Vec<&str> = Assembly::ALL.iter().map(|a| a.as_str()).collect();
    let assembly_default = Assembly::ALL.iter().position(|a| *a == defaults.assembly).unwrap_or(0);
    let assembly = Assembly::ALL[Select::new()
        .with_prompt("Assembly")
        .items(&assemblies)
        .default(assembly_default)
        .interact()?];

    let mut task = TaskConfig::new(title, project, vcf_mode, assembly);
    if vcf_mode.needs_proband() {
        task.upload_vcf = prompt_file("Proband VCF path", &defaults.upload_vcf)?;
    }
    if vcf_mode.needs_parents() {
        task.upload_father = prompt_file("Father VCF path", &defaults.upload_father)?;
        task.upload_mother = prompt_file("Mother VCF path", &defaults.upload_mother)?;
    }

    if defaults.clinical_info.is_some() {
        task.clinical_info = prompt_file("Clinical information", &defaults.clinical_info)?;
    } else if defaults.upload_clinical.is_some() {
        task.upload_clinical = prompt_file("Clinical file path", &defaults.upload_clinical)?;
    } else {
        let choice = Select::new()
            .with_prompt("Clinical information")
            .items(&["Upload clinical file (upload_clinical)", "Clinical information text (clinical_info)"])
            .default(1)
            .interact()?;
        if choice == 0 {
            task.upload_clinical = prompt_file("Clinical file path", &None)?;
        } else {
            task.clinical_info = prompt_file("Clinical information", &None)?;
        }
    }
    task.upload_cnv = prompt_file("CNV file path (optional)", &defaults.upload_cnv)?;
    Ok(task)
}

fn handle_status(ctx: &Context) -> Result<()> {
    let id: String = Input::new().with_prompt("Submission ID").interact_text()?;
    let spinner = spinner("Checking status...");
    let result = ctx.api.get_status(id.trim());
    spinner.finish_and_clear();
    print_report(&result?);
    Ok(())
}

fn handle_monitor(ctx: &Context) -> Result<()> {
    let id: String = Input::new().with_prompt("Submission ID").interact_text()?;
    let interval: u64 = Input::new()
        .with_prompt("Check interval in seconds")
        .default(DEFAULT_MONITOR_INTERVAL.as_secs())
        .interact_text()?;
    let max_checks: u32 = Input::new()
        .with_prompt("Maximum number of checks")
        .default(DEFAULT_MAX_CHECKS)
        .interact_text()?;
    cli::monitor_status(ctx, id.trim(), Duration::from_secs(interval), max_checks)
}

fn handle_batch(ctx: &Context) -> Result<()> {
    let csv: String = Input::new().with_prompt("Samplesheet (CSV) path").interact_text()?;
    let phases = ["Upload files and create tasks", "Upload files only", "Create tasks from previous uploads"];
    let phase = match Select::new().with_prompt("Batch mode").items(&phases).default(0).interact()? {
        0 => Phase::Full,
        1 => Phase::Upload,
        _ => Phase::Tasks,
    };
    let output: String = Input::new()
        .with_prompt("Output directory")
        .default(".".to_string())
        .interact_text()?;
    cli::run_batch(
        ctx,
        &PathBuf::from(csv.trim()),
        phase,
        &PathBuf::from(output.trim()),
        ctx.config.show_progress,
    )
}
