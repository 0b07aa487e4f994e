//! Result helpers for shared error handling.

use crate::errors::ErrorEnvelope;

/// Shared result type used across the workspace.
pub type Result<T, E = ErrorEnvelope> = std::result::Result<T, E>;

/// Extension helpers for attaching diagnostics to failures.
pub trait ResultExt<T> {
    /// Attach the offending path to the error.
    fn with_error_path(self, path: &std::path::Path) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_error_path(self, path: &std::path::Path) -> Result<T> {
        self.map_err(|error| error.with_metadata("path", path.to_string_lossy().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn with_error_path_keeps_ok() {
        let value: Result<i32> = Ok(3);
        assert!(matches!(value.with_error_path(Path::new("info.json")), Ok(3)));
    }

    #[test]
    fn with_error_path_annotates_error() {
        let value: Result<i32> = Err(ErrorEnvelope::configuration("missing_file", "nope"));
        let annotated = value.with_error_path(Path::new("/models/config.json"));

        assert!(annotated.is_err());
        if let Err(error) = annotated {
            assert_eq!(
                error.metadata.get("path").map(String::as_str),
                Some("/models/config.json")
            );
        }
    }
}
