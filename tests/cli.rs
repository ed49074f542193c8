use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;

/// `vg` pointed at an address nothing listens on, so no test reaches a real
/// server.
fn vg() -> Result<Command, Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("vg")?;
    cmd.env("VG_API_URL", "http://127.0.0.1:9/api").env_remove("RUST_LOG");
    Ok(cmd)
}

#[test]
fn help_lists_commands() -> Result<(), Box<dyn std::error::Error>> {
    vg()?
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("upload"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("batch"));
    Ok(())
}

#[test]
fn missing_token_file() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    vg()?
        .arg("--token")
        .arg(dir.path().join("none.txt"))
        .args(["upload", "-f", "sample.vcf"])
        .assert()
        .failure()
        .code(66)
        .stderr(predicate::str::contains("Token file not found"));
    Ok(())
}

#[test]
fn empty_token_file() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let token = dir.path().join("token.txt");
    fs::write(&token, "\n  \n")?;
    vg()?
        .arg("--token")
        .arg(&token)
        .args(["upload", "-f", "sample.vcf"])
        .assert()
        .failure()
        .code(65)
        .stderr(predicate::str::contains("Token file is empty"));
    Ok(())
}

#[test]
fn unsupported_file_type() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let token = dir.path().join("token.txt");
    fs::write(&token, "abc")?;
    let doc = dir.path().join("report.docx");
    fs::write(&doc, "x")?;
    vg()?
        .arg("--token")
        .arg(&token)
        .arg("upload")
        .arg("-f")
        .arg(&doc)
        .assert()
        .failure()
        .code(65)
        .stderr(predicate::str::contains("Unsupported file type: .docx"));
    Ok(())
}

#[test]
fn upload_file_not_found() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let token = dir.path().join("token.txt");
    fs::write(&token, "abc")?;
    vg()?
        .arg("--token")
        .arg(&token)
        .arg("upload")
        .arg("-f")
        .arg(dir.path().join("missing.vcf.gz"))
        .assert()
        .failure()
        .code(66)
        .stderr(predicate::str::contains("File not found"));
    Ok(())
}

#[test]
fn unreachable_server_fails_after_retries() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let token = dir.path().join("token.txt");
    fs::write(&token, "abc")?;
    let vcf = dir.path().join("s.vcf");
    fs::write(&vcf, "##fileformat=VCFv4.2\n")?;
    vg()?
        .arg("--token")
        .arg(&token)
        .arg("upload")
        .arg("-f")
        .arg(&vcf)
        .args(["--no-progress", "--max-attempts", "1"])
        .assert()
        .failure()
        .code(69)
        .stderr(predicate::str::contains("failed after 1 attempt(s)"));
    Ok(())
}

#[test]
fn placeholder_submission_id_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let token = dir.path().join("token.txt");
    fs::write(&token, "abc")?;
    vg()?
        .arg("--token")
        .arg(&token)
        .args(["status", "-s", "your_submission_id_here"])
        .assert()
        .failure()
        .code(65)
        .stderr(predicate::str::contains("Invalid submission id"));
    Ok(())
}

#[test]
fn invalid_task_config_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let token = dir.path().join("token.txt");
    fs::write(&token, "abc")?;
    let task = dir.path().join("task.json");
    fs::write(&task, r#"{"title": "T", "project": "P", "vcf_mode": "TRIO", "assembly": "hg38"}"#)?;
    vg()?
        .arg("--token")
        .arg(&token)
        .arg("task")
        .arg("-c")
        .arg(&task)
        .arg("--yes")
        .assert()
        .failure()
        .code(65)
        .stderr(predicate::str::contains("upload_father is required for TRIO mode"));
    Ok(())
}

#[test]
fn config_shows_base_url_override() -> Result<(), Box<dyn std::error::Error>> {
    vg()?
        .env("VG_API_URL", "http://example.test/api")
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("http://example.test/api"));
    Ok(())
}

#[test]
fn zero_attempts_is_a_usage_error() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let token = dir.path().join("token.txt");
    fs::write(&token, "abc")?;
    vg()?
        .arg("--token")
        .arg(&token)
        .args(["upload", "-f", "s.vcf", "--max-attempts", "0"])
        .assert()
        .failure()
        .code(64)
        .stderr(predicate::str::contains("max_attempts must be at least 1"));
    Ok(())
}

#[test]
fn diagnose_reports_refused_connection() -> Result<(), Box<dyn std::error::Error>> {
    vg()?
        .arg("diagnose")
        .assert()
        .failure()
        .code(69)
        .stdout(predicate::str::contains("[ok] DNS resolution: 127.0.0.1"))
        .stdout(predicate::str::contains("[failed] TCP connect"))
        .stderr(predicate::str::contains("connectivity check failed at TCP connect"));
    Ok(())
}
