pub mod add;
pub mod install;

use serde::Serialize;
use sprig_core::pkg::PkgError;

/// Error payload for JSON output.
#[derive(Serialize)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

impl From<&PkgError> for ErrorInfo {
    fn from(e: &PkgError) -> Self {
        Self {
            code: e.code().to_string(),
            message: e.message().to_string(),
        }
    }
}
