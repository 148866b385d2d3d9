use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AlignError {
    #[error("I/O error while {context} '{}': {source}", .path.display())]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed warping path: {message}")]
    MalformedWarpingPath { message: String },
    #[error("schema mismatch in {context}: {message}")]
    SchemaMismatch { context: String, message: String },
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
}

impl AlignError {
    pub(crate) fn io(context: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            context,
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn malformed_path(message: impl Into<String>) -> Self {
        Self::MalformedWarpingPath {
            message: message.into(),
        }
    }

    pub(crate) fn schema(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            context: context.into(),
            message: message.into(),
        }
    }

    pub(crate) fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Stable kind string recorded in run reports for failed jobs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Io { .. } => "JobIOFailure",
            Self::MalformedWarpingPath { .. } => "MalformedWarpingPath",
            Self::SchemaMismatch { .. } => "SchemaMismatch",
            Self::InvalidInput { .. } => "InvalidInput",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_strings_are_stable() {
        let io = AlignError::io(
            "reading annotation table",
            Path::new("notes.tsv"),
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(io.kind(), "JobIOFailure");
        assert_eq!(AlignError::malformed_path("x").kind(), "MalformedWarpingPath");
        assert_eq!(AlignError::schema("notes.tsv", "x").kind(), "SchemaMismatch");
        assert_eq!(AlignError::invalid_input("x").kind(), "InvalidInput");
    }

    #[test]
    fn io_display_names_context_and_path() {
        let err = AlignError::io(
            "writing alignment result",
            Path::new("out/x_aligned.csv"),
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let rendered = err.to_string();
        assert!(rendered.contains("writing alignment result"));
        assert!(rendered.contains("out/x_aligned.csv"));
    }
}
