// File validation: runs before any network attempt is made.

use crate::error::{Result, VgError, SUPPORTED_EXTENSIONS};
use std::fs;
use std::path::Path;

/// Check that `path` is a regular file with a supported extension and
/// return its size in bytes.
pub fn validate_file(path: &Path) -> Result<u64> {
    let meta = match fs::metadata(path) {
        Ok(m) if m.is_file() => m,
        _ => return Err(VgError::FileNotFound(path.to_path_buf())),
    };

    let extension = file_extension(path);
    if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(VgError::UnsupportedFileType {
            path: path.to_path_buf(),
            extension,
        });
    }
    Ok(meta.len())
}

/// Lower-cased extension including the dot. A trailing `.gz` is combined
/// with the extension before it, so `sample.vcf.gz` yields `.vcf.gz`.
pub fn file_extension(path: &Path) -> String {
    let ext = match path.extension().and_then(|e| e.to_str()) {
        Some(e) => e.to_ascii_lowercase(),
        None => return String::new(),
    };
    if ext == "gz" {
        let inner = path
            .file_stem()
            .map(Path::new)
            .and_then(|stem| stem.extension())
            .and_then(|e| e.to_str());
        if let Some(inner) = inner {
            return format!(".{}.gz", inner.to_ascii_lowercase());
        }
    }
    format!(".{ext}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn accepts_supported_extensions() {
        let dir = tempdir().unwrap();
        for name in ["a.vcf", "b.vcf.gz", "c.pdf", "d.txt", "E.VCF.GZ"] {
            let p = dir.path().join(name);
            fs::write(&p, b"##fileformat=VCFv4.2\n").unwrap();
            assert_eq!(validate_file(&p).unwrap(), 21, "{name}");
        }
    }

    #[test]
    fn rejects_docx() {
        let dir = tempdir().unwrap();
        let p = dir.path().join("report.docx");
        fs::write(&p, b"x").unwrap();
        match validate_file(&p) {
            Err(VgError::UnsupportedFileType { extension, .. }) => assert_eq!(extension, ".docx"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn rejects_plain_gz_and_missing_extension() {
        let dir = tempdir().unwrap();
        for name in ["archive.tar.gz", "reads.gz", "README"] {
            let p = dir.path().join(name);
            fs::write(&p, b"x").unwrap();
            assert!(matches!(validate_file(&p), Err(VgError::UnsupportedFileType { .. })), "{name}");
        }
    }

    #[test]
    fn missing_path_is_not_found_regardless_of_extension() {
        let dir = tempdir().unwrap();
        for name in ["gone.vcf", "gone.docx"] {
            let p = dir.path().join(name);
            assert!(matches!(validate_file(&p), Err(VgError::FileNotFound(_))));
        }
    }

    #[test]
    fn directory_is_not_a_file() {
        let dir = tempdir().unwrap();
        let p = dir.path().join("calls.vcf");
        fs::create_dir(&p).unwrap();
        assert!(matches!(validate_file(&p), Err(VgError::FileNotFound(_))));
    }

    #[test]
    fn empty_file_is_allowed() {
        let dir = tempdir().unwrap();
        let p = dir.path().join("empty.txt");
        fs::write(&p, b"").unwrap();
        assert_eq!(validate_file(&p).unwrap(), 0);
    }

    #[test]
    fn extension_extraction() {
        assert_eq!(file_extension(Path::new("x/sample.vcf.gz")), ".vcf.gz");
        assert_eq!(file_extension(Path::new("sample.VCF")), ".vcf");
        assert_eq!(file_extension(Path::new("sample.tar.gz")), ".tar.gz");
        assert_eq!(file_extension(Path::new("reads.gz")), ".gz");
        assert_eq!(file_extension(Path::new("noext")), "");
    }
}
