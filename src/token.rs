// Bearer token loading. The token lives in a plain text file, by default
// `~/.vg_token`, so it can be reused across runs.

use crate::error::{Result, VgError};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const TOKEN_FILE_NAME: &str = ".vg_token";

/// Token file used when none is given on the command line.
pub fn default_token_path() -> PathBuf {
    let dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    dir.join(TOKEN_FILE_NAME)
}

/// Read a token file and return its trimmed contents.
pub fn read_token(path: &Path) -> Result<String> {
    let data = match std::fs::read_to_string(path) {
        Ok(d) => d,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(VgError::TokenFileMissing(path.to_path_buf()))
        }
        Err(e) => return Err(VgError::Io(e)),
    };
    let token = data.trim();
    if token.is_empty() {
        return Err(VgError::EmptyToken(path.to_path_buf()));
    }
    Ok(token.to_string())
}
