// Analysis task configuration. Field names match the `createtask` endpoint.

use crate::error::{Result, VgError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

const MAX_TITLE_LEN: usize = 256;
const MAX_PROJECT_LEN: usize = 256;
const MAX_CLINICAL_INFO_LEN: usize = 4096;

/// Analysis mode.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum VcfMode {
    /// Proband analysis.
    Snp,
    /// Family trio analysis.
    Trio,
    /// Carrier analysis.
    Carrier,
}

impl VcfMode {
    pub const ALL: [VcfMode; 3] = [VcfMode::Snp, VcfMode::Trio, VcfMode::Carrier];

    pub fn as_str(self) -> &'static str {
        match self {
            VcfMode::Snp => "SNP",
            VcfMode::Trio => "TRIO",
            VcfMode::Carrier => "CARRIER",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            VcfMode::Snp => "SNP - Proband analysis",
            VcfMode::Trio => "TRIO - Family trio analysis",
            VcfMode::Carrier => "CARRIER - Carrier analysis",
        }
    }

    pub fn needs_proband(self) -> bool {
        matches!(self, VcfMode::Snp | VcfMode::Trio)
    }

    pub fn needs_parents(self) -> bool {
        matches!(self, VcfMode::Trio | VcfMode::Carrier)
    }
}

impl fmt::Display for VcfMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VcfMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SNP" => Ok(VcfMode::Snp),
            "TRIO" => Ok(VcfMode::Trio),
            "CARRIER" => Ok(VcfMode::Carrier),
            other => Err(format!("Invalid vcf_mode: {other}. Must be one of: SNP, TRIO, CARRIER")),
        }
    }
}

/// Reference genome assembly.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Assembly {
    Hg19,
    Hg38,
}

impl Assembly {
    pub const ALL: [Assembly; 2] = [Assembly::Hg19, Assembly::Hg38];

    pub fn as_str(self) -> &'static str {
        match self {
            Assembly::Hg19 => "hg19",
            Assembly::Hg38 => "hg38",
        }
    }
}

impl fmt::Display for Assembly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Assembly {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hg19" => Ok(Assembly::Hg19),
            "hg38" => Ok(Assembly::Hg38),
            other => Err(format!("Invalid assembly: {other}. Must be one of: hg19, hg38")),
        }
    }
}

/// Request body for `createtask`. File fields hold remote paths returned by
/// the upload endpoint.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TaskConfig {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub project: String,
    pub vcf_mode: VcfMode,
    pub assembly: Assembly,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_vcf: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_father: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_mother: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_clinical: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clinical_info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_cnv: Option<String>,
}

/// Response of `createtask`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TaskCreated {
    pub submission_id: String,
    #[serde(default)]
    pub message: Option<String>,
}

fn is_blank(v: &Option<String>) -> bool {
    v.as_deref().map_or(true, |s| s.trim().is_empty())
}

impl TaskConfig {
    pub fn new(title: impl Into<String>, project: impl Into<String>, vcf_mode: VcfMode, assembly: Assembly) -> Self {
        TaskConfig {
            title: title.into(),
            project: project.into(),
            vcf_mode,
            assembly,
            upload_vcf: None,
            upload_father: None,
            upload_mother: None,
            upload_clinical: None,
            clinical_info: None,
            upload_cnv: None,
        }
    }

    /// Every problem with this configuration; empty when it can be submitted.
    pub fn problems(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.title.trim().is_empty() {
            errors.push("Missing required field: title".to_string());
        }
        if self.project.trim().is_empty() {
            errors.push("Missing required field: project".to_string());
        }
        if is_blank(&self.upload_clinical) && is_blank(&self.clinical_info) {
            errors.push("Either upload_clinical or clinical_info is required".to_string());
        }
        if self.vcf_mode.needs_proband() && is_blank(&self.upload_vcf) {
            errors.push(format!("upload_vcf is required for {} mode", self.vcf_mode));
        }
        if self.vcf_mode.needs_parents() {
            if is_blank(&self.upload_father) {
                errors.push(format!("upload_father is required for {} mode", self.vcf_mode));
            }
            if is_blank(&self.upload_mother) {
                errors.push(format!("upload_mother is required for {} mode", self.vcf_mode));
            }
        }
        if self.title.chars().count() > MAX_TITLE_LEN {
            errors.push(format!("title must be {MAX_TITLE_LEN} characters or less"));
        }
        if self.project.chars().count() > MAX_PROJECT_LEN {
            errors.push(format!("project must be {MAX_PROJECT_LEN} characters or less"));
        }
        if let Some(info) = &self.clinical_info {
            if info.chars().count() > MAX_CLINICAL_INFO_LEN {
                errors.push(format!("clinical_info must be {MAX_CLINICAL_INFO_LEN} characters or less"));
            }
        }
        errors
    }

    pub fn validate(&self) -> Result<()> {
        let errors = self.problems();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(VgError::InvalidTaskConfig(errors))
        }
    }
}

/// Read a task configuration from a JSON file.
pub fn load_task_config(path: &Path) -> Result<TaskConfig> {
    let data = match std::fs::read_to_string(path) {
        Ok(d) => d,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(VgError::FileNotFound(path.to_path_buf()))
        }
        Err(e) => return Err(VgError::Io(e)),
    };
    Ok(serde_json::from_str(&data)?)
}
