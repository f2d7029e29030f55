//! Resolution error types and diagnostics.

use thiserror::Error;

use crate::util::diagnostic::{suggestions, Diagnostic};

/// Error during name or closure resolution.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("could not resolve `{package}` to a store path: {reason}")]
    ResolutionNotFound {
        package: String,
        jobsets: Vec<String>,
        reason: String,
    },

    #[error("metadata unavailable for `{hash}`: {reason}")]
    MetadataUnavailable { hash: String, reason: String },
}

impl ResolveError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            ResolveError::ResolutionNotFound {
                package,
                jobsets,
                reason,
            } => {
                let mut diag =
                    Diagnostic::error(format!("could not resolve `{}` to a store path", package));

                if !jobsets.is_empty() {
                    diag = diag.with_context(format!("tried jobsets: {}", jobsets.join(", ")));
                }

                diag.with_context(format!("last failure: {}", reason))
                    .with_suggestion(suggestions::PACKAGE_NOT_FOUND)
            }

            ResolveError::MetadataUnavailable { hash, reason } => {
                Diagnostic::error(format!("metadata unavailable for `{}`", hash))
                    .with_context(reason.clone())
                    .with_suggestion(suggestions::FETCH_FAILED)
            }
        }
    }
}
