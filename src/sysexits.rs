// Exit status codes, following sysexits(3).

use crate::error::VgError;

/// The command was used incorrectly.
pub const EX_USAGE: i32 = 64;

/// The input data was incorrect in some way.
pub const EX_DATAERR: i32 = 65;

/// An input file did not exist or was not readable.
pub const EX_NOINPUT: i32 = 66;

/// A remote operation failed.
pub const EX_UNAVAILABLE: i32 = 69;

/// An internal software error.
pub const EX_SOFTWARE: i32 = 70;

/// Exit code for an error surfaced from the library.
pub fn code_for(err: &VgError) -> i32 {
    match err {
        VgError::FileNotFound(_) | VgError::TokenFileMissing(_) | VgError::Io(_) => EX_NOINPUT,
        VgError::UnsupportedFileType { .. }
        | VgError::EmptyToken(_)
        | VgError::InvalidTaskConfig(_)
        | VgError::InvalidSamplesheet(_)
        | VgError::InvalidSubmissionId(_)
        | VgError::Json(_)
        | VgError::Csv(_) => EX_DATAERR,
        VgError::Config(_) => EX_USAGE,
        VgError::NetworkTimeout(_)
        | VgError::NetworkError(_)
        | VgError::ServerError { .. }
        | VgError::ClientError { .. }
        | VgError::UnexpectedStatus { .. }
        | VgError::MalformedResponse(_) => EX_UNAVAILABLE,
    }
}
