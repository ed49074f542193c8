// Library root
// -----------
// This crate exposes the client library behind the `vg` binary.
//
// Module responsibilities:
// - `upload`: validation, timeout budgets, retrying multipart transport,
//   progress reporting and the `Uploader` that ties them together.
// - `api`: the HTTP client for task creation and status, and the factory
//   for uploaders sharing its connection pool.
// - `task`, `status`: request/response models for the analysis endpoints.
// - `batch`: CSV samplesheet processing with JSON result files.
// - `diagnose`: DNS, TCP and HTTP reachability checks for the API host.
// - `token`, `config`, `logging`, `error`: ambient concerns.
// - `cli`, `ui`: command-line and interactive front-ends.
pub mod api;
pub mod batch;
pub mod cli;
pub mod config;
pub mod diagnose;
pub mod error;
pub mod logging;
pub mod status;
pub mod sysexits;
pub mod task;
pub mod token;
pub mod ui;
pub mod upload;

pub use error::{Result, VgError};
