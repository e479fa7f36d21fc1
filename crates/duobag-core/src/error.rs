//! Error types for bag construction, writing and loading.

use std::path::PathBuf;

/// Bag errors.
///
/// Index parse problems and checksum mismatches are not errors: the former
/// are collected as [`crate::IndexWarning`]s, the latter are reported as data
/// in a [`crate::VerifyReport`].
#[derive(Debug, thiserror::Error)]
pub enum BagError {
    /// Container unreadable or not shaped like a bag.
    #[error("invalid bag structure at {path}: {message}")]
    Structural { path: String, message: String },

    /// A source file could not be read or the destination written.
    #[error("i/o error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A configured resource limit was exceeded while reading.
    #[error("limit exceeded at {path}: {message}")]
    Limit { path: String, message: String },

    /// A member cannot be placed in the container as named.
    #[error("invalid member {name:?}: {reason}")]
    InvalidMember { name: String, reason: String },

    /// Two members resolve to the same archive path.
    #[error("duplicate archive path: {path}")]
    DuplicatePath { path: String },

    /// A metadata field name or language tag cannot be written as XML.
    #[error("invalid metadata field {name:?}: {reason}")]
    InvalidField { name: String, reason: String },
}

impl BagError {
    pub(crate) fn structural(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Structural {
            path: path.into(),
            message: message.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Exit code for CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Structural { .. } | Self::Limit { .. } => 3,
            Self::Io { .. } => 4,
            Self::InvalidMember { .. } | Self::DuplicatePath { .. } | Self::InvalidField { .. } => 5,
        }
    }
}

/// Result type for bag operations.
pub type BagResult<T> = Result<T, BagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_offending_path() {
        let err = BagError::structural("thesis/data/final/a.pdf", "absolute path");
        assert_eq!(
            err.to_string(),
            "invalid bag structure at thesis/data/final/a.pdf: absolute path"
        );

        let err = BagError::io(
            "/tmp/missing.pdf",
            std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        );
        assert!(err.to_string().contains("/tmp/missing.pdf"));
    }

    #[test]
    fn test_exit_codes_are_distinct_per_class() {
        let structural = BagError::structural("x", "y");
        let dup = BagError::DuplicatePath { path: "x".into() };
        assert_ne!(structural.exit_code(), dup.exit_code());
    }
}
