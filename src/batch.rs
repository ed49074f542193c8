// CSV batch processing: upload every file named in a samplesheet, then
// create one analysis task per row using the remote paths.
//
// Results are written as flat JSON files in an output directory:
// `upload_results.json` (local path → remote path), `task_results.json`
// (created tasks) and, for a full run, `batch_results.json`.

use crate::api::TaskSubmitter;
use crate::error::{Result, VgError};
use crate::task::{Assembly, TaskConfig, VcfMode};
use crate::upload::{ProgressSink, Sleeper, UploadOutcome, UploadRequest, UploadTransport, Uploader};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

pub const UPLOAD_RESULTS_FILE: &str = "upload_results.json";
pub const TASK_RESULTS_FILE: &str = "task_results.json";
pub const BATCH_RESULTS_FILE: &str = "batch_results.json";

pub const REQUIRED_COLUMNS: [&str; 6] = ["samples", "title", "project", "vcf_mode", "assembly", "upload_vcf"];

/// Placeholder used in samplesheets for a missing parent file.
const NOT_AVAILABLE: &str = "NA";

/// One samplesheet row.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct SampleRow {
    pub samples: String,
    pub title: String,
    pub project: String,
    pub vcf_mode: String,
    pub assembly: String,
    pub upload_vcf: String,
    #[serde(default)]
    pub upload_father: Option<String>,
    #[serde(default)]
    pub upload_mother: Option<String>,
    #[serde(default)]
    pub clinical_info: Option<String>,
    #[serde(default)]
    pub upload_clinical: Option<String>,
}

fn present(v: Option<&str>) -> Option<&str> {
    v.map(str::trim).filter(|s| !s.is_empty() && *s != NOT_AVAILABLE)
}

impl SampleRow {
    fn mode(&self) -> Option<VcfMode> {
        self.vcf_mode.parse().ok()
    }

    /// Local files to upload for this row: the proband, the parents for
    /// modes that need them and the clinical file. Empty and `NA` cells are
    /// skipped.
    pub fn files(&self) -> Vec<&str> {
        let mut files: Vec<&str> = present(Some(&self.upload_vcf)).into_iter().collect();
        if self.mode().map_or(false, VcfMode::needs_parents) {
            files.extend(present(self.upload_father.as_deref()));
            files.extend(present(self.upload_mother.as_deref()));
        }
        files.extend(present(self.upload_clinical.as_deref()));
        files
    }
}

/// Read and check a samplesheet.
pub fn read_samplesheet(path: &Path) -> Result<Vec<SampleRow>> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(VgError::FileNotFound(path.to_path_buf())),
        Err(e) => return Err(VgError::Io(e)),
    };
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(file);

    let headers = reader.headers()?.clone();
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| !headers.iter().any(|h| h == **c))
        .map(|c| format!("Missing required column: {c}"))
        .collect();
    if !missing.is_empty() {
        return Err(VgError::InvalidSamplesheet(missing));
    }

    let rows = reader.deserialize().collect::<std::result::Result<Vec<SampleRow>, _>>()?;
    if rows.is_empty() {
        return Err(VgError::InvalidSamplesheet(vec!["CSV file is empty".to_string()]));
    }
    Ok(rows)
}

#[derive(Serialize, Debug, Default)]
pub struct UploadReport {
    /// Local path → remote path, for every successful upload.
    pub uploaded: BTreeMap<String, String>,
    /// Local path → reason, for every failed upload.
    pub failed: BTreeMap<String, String>,
}

/// Upload every file of every row, using the row title as prefix. Files
/// that appear in several rows are uploaded once.
pub fn upload_all<T, S, P>(
    rows: &[SampleRow],
    uploader: &Uploader<T, S>,
    token: &str,
    mut progress_for: P,
) -> UploadReport
where
    T: UploadTransport,
    S: Sleeper,
    P: FnMut(&Path) -> Option<Arc<dyn ProgressSink>>,
{
    let mut report = UploadReport::default();
    let total = rows.len();

    for (i, row) in rows.iter().enumerate() {
        info!(row = i + 1, total, title = %row.title, "processing samplesheet row");
        for file in row.files() {
            if report.uploaded.contains_key(file) {
                continue;
            }
            let request = UploadRequest::new(file, token, Some(row.title.clone()));
            let result = uploader.upload(&request, progress_for(Path::new(file)));
            match result {
                Ok(UploadOutcome::Uploaded { remote_path, .. }) => {
                    report.failed.remove(file);
                    report.uploaded.insert(file.to_string(), remote_path);
                }
                Ok(UploadOutcome::Failed { last_reason, attempts_made }) => {
                    warn!(file, attempts_made, error = %last_reason, "upload failed");
                    report.failed.insert(file.to_string(), last_reason.to_string());
                }
                Err(e) => {
                    warn!(file, error = %e, "file rejected");
                    report.failed.insert(file.to_string(), e.to_string());
                }
            }
        }
    }
    report
}

/// Task for `row` with a unique title `<title>_<stamp>`, still pointing at
/// local files.
pub fn build_task(row: &SampleRow, stamp: &str) -> Result<TaskConfig> {
    let mode: VcfMode = row.vcf_mode.parse().map_err(|e| VgError::InvalidSamplesheet(vec![e]))?;
    let assembly: Assembly = row.assembly.parse().map_err(|e| VgError::InvalidSamplesheet(vec![e]))?;
    let owned = |v: Option<&str>| present(v).map(str::to_string);

    let mut task = TaskConfig::new(format!("{}_{stamp}", row.title), row.project.clone(), mode, assembly);
    task.upload_vcf = owned(Some(&row.upload_vcf));
    if mode.needs_parents() {
        task.upload_father = owned(row.upload_father.as_deref());
        task.upload_mother = owned(row.upload_mother.as_deref());
    }
    task.clinical_info = row
        .clinical_info
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    task.upload_clinical = owned(row.upload_clinical.as_deref());
    Ok(task)
}

/// Replace every local path in `task` with its remote path. A file that was
/// not uploaded is an error, so no local path ever reaches the server.
pub fn resolve_remote_paths(mut task: TaskConfig, uploaded: &BTreeMap<String, String>) -> Result<TaskConfig> {
    let mode = task.vcf_mode;
    let mut missing = Vec::new();
    for (label, field) in [
        ("proband", &mut task.upload_vcf),
        ("father", &mut task.upload_father),
        ("mother", &mut task.upload_mother),
        ("clinical", &mut task.upload_clinical),
    ] {
        let Some(local) = field.clone() else {
            continue;
        };
        match uploaded.get(&local) {
            Some(remote) => *field = Some(remote.clone()),
            None => missing.push(format!("Missing {label} file for {mode}: {local}")),
        }
    }
    if mode.needs_proband() && task.upload_vcf.is_none() {
        missing.push(format!("Missing proband file for {mode}: no upload_vcf given"));
    }
    if missing.is_empty() {
        Ok(task)
    } else {
        Err(VgError::InvalidSamplesheet(missing))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CreatedTask {
    pub title: String,
    pub submission_id: String,
    pub vcf_mode: VcfMode,
}

#[derive(Serialize, Debug, Default)]
pub struct TaskReport {
    pub created: Vec<CreatedTask>,
    /// Row title → reason the task was not created.
    pub failed: BTreeMap<String, String>,
}

/// Create one task per row with the uploaded remote paths.
pub fn create_all<C: TaskSubmitter + ?Sized>(
    rows: &[SampleRow],
    submitter: &C,
    uploaded: &BTreeMap<String, String>,
    stamp: &str,
) -> TaskReport {
    let mut report = TaskReport::default();
    for (i, row) in rows.iter().enumerate() {
        info!(sample = i + 1, total = rows.len(), title = %row.title, "creating task");
        let result = build_task(row, stamp)
            .and_then(|task| resolve_remote_paths(task, uploaded))
            .and_then(|task| submitter.submit(&task).map(|created| (task, created)));
        match result {
            Ok((task, created)) => report.created.push(CreatedTask {
                title: task.title,
                submission_id: created.submission_id,
                vcf_mode: task.vcf_mode,
            }),
            Err(e) => {
                warn!(title = %row.title, error = %e, "task not created");
                report.failed.insert(row.title.clone(), e.to_string());
            }
        }
    }
    report
}

/// Timestamp appended to batch task titles.
pub fn title_stamp() -> String {
    chrono::Local::now().format("%Y-%m-%d_%H-%M").to_string()
}

pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let data = serde_json::to_string_pretty(value)?;
    fs::write(path, data)?;
    Ok(())
}

pub fn load_upload_results(dir: &Path) -> Result<BTreeMap<String, String>> {
    let path = dir.join(UPLOAD_RESULTS_FILE);
    let data = match fs::read_to_string(&path) {
        Ok(d) => d,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(VgError::FileNotFound(path)),
        Err(e) => return Err(VgError::Io(e)),
    };
    Ok(serde_json::from_str(&data)?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Upload,
    Tasks,
    Full,
}

/// Paths of the result files written by a batch run.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub uploads: Option<UploadReport>,
    pub tasks: Option<TaskReport>,
    pub written: Vec<PathBuf>,
}

/// Run one batch phase and write its result files into `output_dir`.
pub fn run<T, S, C, P>(
    phase: Phase,
    rows: &[SampleRow],
    uploader: &Uploader<T, S>,
    submitter: &C,
    token: &str,
    output_dir: &Path,
    progress_for: P,
) -> Result<BatchSummary>
where
    T: UploadTransport,
    S: Sleeper,
    C: TaskSubmitter + ?Sized,
    P: FnMut(&Path) -> Option<Arc<dyn ProgressSink>>,
{
    let mut summary = BatchSummary::default();

    let uploaded = if phase == Phase::Tasks {
        load_upload_results(output_dir)?
    } else {
        let report = upload_all(rows, uploader, token, progress_for);
        let path = output_dir.join(UPLOAD_RESULTS_FILE);
        write_json(&path, &report.uploaded)?;
        summary.written.push(path);
        let uploaded = report.uploaded.clone();
        summary.uploads = Some(report);
        uploaded
    };

    if phase == Phase::Upload {
        return Ok(summary);
    }
    if uploaded.is_empty() {
        warn!("no files were uploaded; skipping task creation");
        return Ok(summary);
    }

    let tasks = create_all(rows, submitter, &uploaded, &title_stamp());
    let path = output_dir.join(TASK_RESULTS_FILE);
    write_json(&path, &tasks.created)?;
    summary.written.push(path);

    if phase == Phase::Full {
        let path = output_dir.join(BATCH_RESULTS_FILE);
        write_json(
            &path,
            &serde_json::json!({
                "uploaded_files": uploaded,
                "created_tasks": tasks.created,
            }),
        )?;
        summary.written.push(path);
    }
    summary.tasks = Some(tasks);
    Ok(summary)
}
