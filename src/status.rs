// Task status: the `getstatus` response model, readable report formatting
// and periodic monitoring.

use crate::error::{Result, VgError};
use crate::upload::Sleeper;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Write as _;
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_MONITOR_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_CHECKS: u32 = 20;

const PLACEHOLDER_SUBMISSION_ID: &str = "your_submission_id_here";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    Created,
    Initialized,
    Running,
    Completed,
    Failed,
    Cancelled,
    #[default]
    #[serde(other)]
    Unknown,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Created => "CREATED",
            TaskStatus::Initialized => "INITIALIZED",
            TaskStatus::Running => "RUNNING",
            TaskStatus::Completed => "COMPLETED",
            TaskStatus::Failed => "FAILED",
            TaskStatus::Cancelled => "CANCELLED",
            TaskStatus::Unknown => "UNKNOWN",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            TaskStatus::Created => "Task has been created and is waiting to be processed",
            TaskStatus::Initialized => "Task has been initialized and is being prepared for processing",
            TaskStatus::Running => "Task is currently being processed by the analysis pipeline",
            TaskStatus::Completed => "Task has been completed successfully",
            TaskStatus::Failed => "Task processing failed - check error logs",
            TaskStatus::Cancelled => "Task was cancelled by user or system",
            TaskStatus::Unknown => "Unknown status",
        }
    }

    /// No further status changes are expected.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response of `getstatus`. The server omits fields freely, so everything but
/// the status is optional.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct StatusReport {
    pub status: TaskStatus,
    pub title: Option<String>,
    pub project: Option<String>,
    pub vcf_mode: Option<String>,
    pub assembly: Option<String>,
    pub task_id: Option<String>,
    pub creation_time: Option<String>,
    pub version: Option<String>,
    pub upload_vcf: Option<String>,
    pub upload_father: Option<String>,
    pub upload_mother: Option<String>,
    pub upload_clinical: Option<String>,
    pub upload_cnv: Option<String>,
}

impl StatusReport {
    fn files(&self) -> [(&'static str, Option<&str>); 5] {
        [
            ("Proband VCF", self.upload_vcf.as_deref()),
            ("Father VCF", self.upload_father.as_deref()),
            ("Mother VCF", self.upload_mother.as_deref()),
            ("Clinical File", self.upload_clinical.as_deref()),
            ("CNV File", self.upload_cnv.as_deref()),
        ]
    }
}

/// Something that can fetch a task's status; implemented by `ApiClient`.
pub trait StatusSource {
    fn get_status(&self, submission_id: &str) -> Result<StatusReport>;
}

pub fn check_submission_id(submission_id: &str) -> Result<()> {
    let id = submission_id.trim();
    if id.is_empty() || id == PLACEHOLDER_SUBMISSION_ID {
        return Err(VgError::InvalidSubmissionId(submission_id.to_string()));
    }
    Ok(())
}

/// Multi-line task status report.
pub fn format_report(report: &StatusReport) -> String {
    fn or_na(v: &Option<String>) -> &str {
        v.as_deref().unwrap_or("N/A")
    }

    let rule = "=".repeat(60);
    let mut out = String::new();
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "TASK STATUS REPORT");
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "Title:            {}", or_na(&report.title));
    let _ = writeln!(out, "Project:          {}", or_na(&report.project));
    let _ = writeln!(out, "Analysis Mode:    {}", or_na(&report.vcf_mode));
    let _ = writeln!(out, "Assembly:         {}", or_na(&report.assembly));
    let _ = writeln!(out, "Task ID:          {}", or_na(&report.task_id));
    let _ = writeln!(out, "Creation Time:    {}", or_na(&report.creation_time));
    let _ = writeln!(out, "Pipeline Version: {}", or_na(&report.version));
    let _ = writeln!(out, "Status:           {}", report.status);
    let _ = writeln!(out, "Description:      {}", report.status.description());
    let _ = writeln!(out);
    let _ = writeln!(out, "FILES:");
    for (label, path) in report.files() {
        match path {
            Some(p) => {
                let _ = writeln!(out, "  [x] {label}: {p}");
            }
            None => {
                let _ = writeln!(out, "  [ ] {label}: Not provided");
            }
        }
    }
    let _ = write!(out, "{rule}");
    out
}

/// One poll made by [`monitor`].
#[derive(Debug)]
pub struct Check<'a> {
    /// 1-based check number.
    pub number: u32,
    pub report: &'a StatusReport,
    /// Status differs from the previous check (always true for the first).
    pub changed: bool,
}

#[derive(Debug)]
pub struct MonitorOutcome {
    pub last: StatusReport,
    pub checks: u32,
    /// The task reached a terminal status before the check limit.
    pub finished: bool,
}

/// Poll `submission_id` every `interval` until its status is terminal or
/// `max_checks` polls have been made. A failed poll ends monitoring with
/// that error.
pub fn monitor<S, Z, F>(
    source: &S,
    submission_id: &str,
    interval: Duration,
    max_checks: u32,
    sleeper: &Z,
    mut on_check: F,
) -> Result<MonitorOutcome>
where
    S: StatusSource + ?Sized,
    Z: Sleeper + ?Sized,
    F: FnMut(Check<'_>),
{
    check_submission_id(submission_id)?;
    let max_checks = max_checks.max(1);
    let mut last: Option<StatusReport> = None;
    let mut number = 0;

    loop {
        number += 1;
        let report = source.get_status(submission_id)?;
        let changed = last.as_ref().map_or(true, |prev| prev.status != report.status);
        debug!(submission_id, check = number, status = %report.status, "status check");
        on_check(Check {
            number,
            report: &report,
            changed,
        });

        let finished = report.status.is_terminal();
        if finished || number >= max_checks {
            if finished {
                info!(submission_id, status = %report.status, checks = number, "task finished");
            }
            return Ok(MonitorOutcome {
                last: report,
                checks: number,
                finished,
            });
        }
        last = Some(report);
        sleeper.sleep(interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    struct Scripted {
        statuses: RefCell<VecDeque<Result<TaskStatus>>>,
        calls: RefCell<u32>,
    }

    impl Scripted {
        fn new(statuses: Vec<Result<TaskStatus>>) -> Self {
            Scripted {
                statuses: RefCell::new(statuses.into()),
                calls: RefCell::new(0),
            }
        }
    }

    impl StatusSource for Scripted {
        fn get_status(&self, _id: &str) -> Result<StatusReport> {
            *self.calls.borrow_mut() += 1;
            let status = self.statuses.borrow_mut().pop_front().unwrap_or(Ok(TaskStatus::Running))?;
            Ok(StatusReport {
                status,
                ..StatusReport::default()
            })
        }
    }

    #[derive(Default)]
    struct Recorder(RefCell<Vec<Duration>>);

    impl Sleeper for Recorder {
        fn sleep(&self, d: Duration) {
            self.0.borrow_mut().push(d);
        }
    }

    #[test]
    fn parses_status_response() {
        let report: StatusReport = serde_json::from_str(
            r#"{"status": "RUNNING", "title": "S1", "task_id": "42",
                "upload_vcf": "p/s1.vcf.gz", "extra": true}"#,
        )
        .unwrap();
        assert_eq!(report.status, TaskStatus::Running);
        assert_eq!(report.task_id.as_deref(), Some("42"));
        assert!(report.upload_mother.is_none());
    }

    #[test]
    fn unknown_status_value() {
        let report: StatusReport = serde_json::from_str(r#"{"status": "PAUSED"}"#).unwrap();
        assert_eq!(report.status, TaskStatus::Unknown);
        assert!(!report.status.is_terminal());
    }

    #[test]
    fn report_lists_files() {
        let report = StatusReport {
            status: TaskStatus::Completed,
            title: Some("S1".into()),
            upload_vcf: Some("p/s1.vcf.gz".into()),
            ..StatusReport::default()
        };
        let text = format_report(&report);
        assert!(text.contains("Title:            S1"));
        assert!(text.contains("Project:          N/A"));
        assert!(text.contains("Status:           COMPLETED"));
        assert!(text.contains("[x] Proband VCF: p/s1.vcf.gz"));
        assert!(text.contains("[ ] Mother VCF: Not provided"));
    }

    #[test]
    fn monitor_stops_on_terminal_status() {
        let source = Scripted::new(vec![
            Ok(TaskStatus::Created),
            Ok(TaskStatus::Running),
            Ok(TaskStatus::Running),
            Ok(TaskStatus::Completed),
        ]);
        let sleeper = Recorder::default();
        let mut changes = Vec::new();
        let outcome = monitor(&source, "b48e943c", Duration::from_secs(5), 20, &sleeper, |c| {
            changes.push((c.number, c.changed))
        })
        .unwrap();

        assert!(outcome.finished);
        assert_eq!(outcome.checks, 4);
        assert_eq!(outcome.last.status, TaskStatus::Completed);
        assert_eq!(changes, vec![(1, true), (2, true), (3, false), (4, true)]);
        assert_eq!(*sleeper.0.borrow(), vec![Duration::from_secs(5); 3]);
    }

    #[test]
    fn monitor_respects_check_limit() {
        let source = Scripted::new(vec![]);
        let sleeper = Recorder::default();
        let outcome = monitor(&source, "id", Duration::from_secs(1), 3, &sleeper, |_| {}).unwrap();
        assert!(!outcome.finished);
        assert_eq!(outcome.checks, 3);
        assert_eq!(*source.calls.borrow(), 3);
        assert_eq!(sleeper.0.borrow().len(), 2);
    }

    #[test]
    fn monitor_propagates_fetch_errors() {
        let source = Scripted::new(vec![
            Ok(TaskStatus::Running),
            Err(VgError::from_status(404, r#"{"message": "no such submission"}"#)),
        ]);
        let err = monitor(&source, "id", Duration::ZERO, 10, &Recorder::default(), |_| {}).unwrap_err();
        assert!(matches!(err, VgError::ClientError { status: 404, .. }));
    }

    #[test]
    fn placeholder_id_is_rejected() {
        let source = Scripted::new(vec![]);
        let err = monitor(&source, PLACEHOLDER_SUBMISSION_ID, Duration::ZERO, 1, &Recorder::default(), |_| {})
            .unwrap_err();
        assert!(matches!(err, VgError::InvalidSubmissionId(_)));
        assert_eq!(*source.calls.borrow(), 0);
        assert!(check_submission_id("  ").is_err());
    }
}
