use httpmock::prelude::*;
use httpmock::Mock;
use serde_json::json;
use std::cell::RefCell;
use std::fs;
use std::net::TcpListener;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use vg_client::api::ApiClient;
use vg_client::status::TaskStatus;
use vg_client::task::{Assembly, TaskConfig, VcfMode};
use vg_client::upload::{ProgressSink, Sleeper, UploadConfig, UploadOutcome, Uploader};
use vg_client::VgError;

const VCF: &[u8] = b"##fileformat=VCFv4.2\n#CHROM\tPOS\tID\tREF\tALT\n1\t10177\t.\tA\tAC\n";

fn fast_retries(max_attempts: u32) -> UploadConfig {
    let mut config = UploadConfig::default();
    config.retry.max_attempts = max_attempts;
    config.retry.max_backoff = Duration::ZERO;
    config
}

fn sample(dir: &tempfile::TempDir, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, data).unwrap();
    path
}

#[derive(Default)]
struct Counting(AtomicU64);

impl ProgressSink for Counting {
    fn advance(&self, chunk: u64, _sent: u64) {
        self.0.fetch_add(chunk, Ordering::SeqCst);
    }
}

/// Replaces the failing upload mock with a succeeding one while the
/// uploader waits between attempts.
struct RecoverOnRetry<'a> {
    server: &'a MockServer,
    busy: RefCell<Option<Mock<'a>>>,
    ready: RefCell<Option<Mock<'a>>>,
}

impl Sleeper for &RecoverOnRetry<'_> {
    fn sleep(&self, _delay: Duration) {
        if let Some(mut busy) = self.busy.borrow_mut().take() {
            busy.assert_hits(1);
            busy.delete();
        }
        let ready = self.server.mock(|when, then| {
            when.method(POST).path("/api/upload");
            then.status(200).json_body(json!({ "upload_path": "a/s.vcf" }));
        });
        *self.ready.borrow_mut() = Some(ready);
    }
}

#[test]
fn uploads_file_with_token_and_prefix() {
    let server = MockServer::start();
    let upload = server.mock(|when, then| {
        when.method(POST)
            .path("/api/upload")
            .header("authorization", "Bearer secret-token")
            .body_contains(r#"name="file"; filename="sample1.vcf.gz""#)
            .body_contains(r#"name="prefix""#)
            .body_contains("1\t10177\t.\tA\tAC");
        then.status(200).json_body(json!({ "upload_path": "proj/sample1.vcf.gz" }));
    });
    let dir = tempfile::tempdir().unwrap();
    let path = sample(&dir, "sample1.vcf.gz", VCF);

    let api = ApiClient::new(server.url("/api")).unwrap().with_token("secret-token");
    let counter = Arc::new(Counting::default());
    let request = api.upload_request(&path, Some("proj".into())).unwrap();
    let outcome = api.uploader(fast_retries(3)).upload(&request, Some(counter.clone())).unwrap();

    assert_eq!(outcome.remote_path(), Some("proj/sample1.vcf.gz"));
    assert_eq!(outcome.attempts_made(), 1);
    assert_eq!(counter.0.load(Ordering::SeqCst), VCF.len() as u64);
    upload.assert_hits(1);
}

#[test]
fn retries_after_service_unavailable() {
    let server = MockServer::start();
    let busy = server.mock(|when, then| {
        when.method(POST).path("/api/upload");
        then.status(503).json_body(json!({ "message": "busy" }));
    });
    let recover = RecoverOnRetry {
        server: &server,
        busy: RefCell::new(Some(busy)),
        ready: RefCell::new(None),
    };
    let dir = tempfile::tempdir().unwrap();
    let path = sample(&dir, "s.vcf", VCF);

    let api = ApiClient::new(server.url("/api")).unwrap().with_token("t");
    let uploader = Uploader::with_sleeper(api.transport(), fast_retries(3), &recover);
    let outcome = uploader.upload(&api.upload_request(&path, None).unwrap(), None).unwrap();

    assert_eq!(outcome.remote_path(), Some("a/s.vcf"));
    assert_eq!(outcome.attempts_made(), 2);
    recover.ready.borrow().as_ref().unwrap().assert_hits(1);
}

#[test]
fn unauthorized_is_not_retried() {
    let server = MockServer::start();
    let upload = server.mock(|when, then| {
        when.method(POST).path("/api/upload");
        then.status(401).json_body(json!({ "message": "invalid token" }));
    });
    let dir = tempfile::tempdir().unwrap();
    let path = sample(&dir, "s.txt", b"notes");

    let api = ApiClient::new(server.url("/api")).unwrap().with_token("t");
    let request = api.upload_request(&path, None).unwrap();
    match api.uploader(fast_retries(3)).upload(&request, None).unwrap() {
        UploadOutcome::Failed {
            last_reason: VgError::ClientError { status, message },
            attempts_made,
        } => {
            assert_eq!(status, 401);
            assert_eq!(message, "invalid token");
            assert_eq!(attempts_made, 1);
        }
        other => panic!("unexpected {other:?}"),
    }
    upload.assert_hits(1);
}

#[test]
fn non_json_success_is_malformed() {
    let server = MockServer::start();
    let upload = server.mock(|when, then| {
        when.method(POST).path("/api/upload");
        then.status(200).body("upload ok");
    });
    let dir = tempfile::tempdir().unwrap();
    let path = sample(&dir, "s.pdf", b"%PDF-1.4");

    let api = ApiClient::new(server.url("/api")).unwrap().with_token("t");
    let request = api.upload_request(&path, None).unwrap();
    let outcome = api.uploader(fast_retries(3)).upload(&request, None).unwrap();
    assert!(matches!(
        outcome,
        UploadOutcome::Failed {
            last_reason: VgError::MalformedResponse(_),
            attempts_made: 1
        }
    ));
    upload.assert_hits(1);
}

#[test]
fn refused_connection_is_retried_until_exhausted() {
    let port = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
    let dir = tempfile::tempdir().unwrap();
    let path = sample(&dir, "s.vcf", VCF);

    let api = ApiClient::new(format!("http://127.0.0.1:{port}/api")).unwrap().with_token("t");
    let request = api.upload_request(&path, None).unwrap();
    let outcome = api.uploader(fast_retries(2)).upload(&request, None).unwrap();
    assert!(matches!(
        outcome,
        UploadOutcome::Failed {
            last_reason: VgError::NetworkError(_),
            attempts_made: 2
        }
    ));
}

#[test]
fn fetches_status() {
    let server = MockServer::start();
    let status = server.mock(|when, then| {
        when.method(GET)
            .path("/api/getstatus")
            .query_param("submission_id", "b48e943c42659c50")
            .header("authorization", "Bearer t");
        then.status(200)
            .json_body(json!({ "status": "RUNNING", "title": "S1", "version": "2.1" }));
    });

    let api = ApiClient::new(server.url("/api")).unwrap().with_token("t");
    let report = api.get_status("b48e943c42659c50").unwrap();
    assert_eq!(report.status, TaskStatus::Running);
    assert_eq!(report.version.as_deref(), Some("2.1"));
    status.assert();
}

#[test]
fn duplicate_task_is_a_client_error() {
    let server = MockServer::start();
    let create = server.mock(|when, then| {
        when.method(POST)
            .path("/api/createtask")
            .json_body_partial(r#"{ "vcf_mode": "SNP", "assembly": "hg38" }"#);
        then.status(400)
            .json_body(json!({ "message": "This task has already been submitted" }));
    });

    let api = ApiClient::new(server.url("/api")).unwrap().with_token("t");
    let mut task = TaskConfig::new("S1", "Cardio", VcfMode::Snp, Assembly::Hg38);
    task.upload_vcf = Some("cardio/s1.vcf.gz".into());
    task.clinical_info = Some("HCM".into());

    let err = api.create_task(&task).unwrap_err();
    assert!(matches!(err, VgError::ClientError { status: 400, .. }));
    create.assert();
}

#[test]
fn created_task_returns_submission_id() {
    let server = MockServer::start();
    let create = server.mock(|when, then| {
        when.method(POST)
            .path("/api/createtask")
            .json_body_partial(r#"{ "vcf_mode": "CARRIER", "upload_father": "f", "upload_mother": "m" }"#);
        then.status(200).json_body(json!({ "submission_id": "abc123", "message": "ok" }));
    });

    let api = ApiClient::new(server.url("/api")).unwrap().with_token("t");
    let mut task = TaskConfig::new("S1", "Cardio", VcfMode::Carrier, Assembly::Hg19);
    task.upload_father = Some("f".into());
    task.upload_mother = Some("m".into());
    task.upload_clinical = Some("c.pdf".into());
    let created = api.create_task(&task).unwrap();
    assert_eq!(created.submission_id, "abc123");
    create.assert();
}

#[test]
fn diagnostic_reaches_mock_server() {
    let server = MockServer::start();
    let root = server.mock(|when, then| {
        when.method(GET).path("/api");
        then.status(200);
    });
    let api = ApiClient::new(server.url("/api")).unwrap();
    let diagnosis = api.diagnose();
    assert!(diagnosis.passed(), "{diagnosis:?}");
    root.assert();
}
