//! Error types for the gitdojo level engine.
//!
//! This module defines the error hierarchy for level loading, localization,
//! repository probing, profile persistence and configuration. A missing level
//! descriptor is deliberately *not* an error: loaders return `Ok(None)` for it.

use std::path::PathBuf;

/// A specialized `Result` type for level engine operations.
pub type Result<T> = std::result::Result<T, DojoError>;

/// Errors that can occur while loading, running or evaluating a level.
///
/// Error variants are organized by subsystem and include actionable suggestions
/// where possible to help level authors and learners resolve issues.
#[derive(Debug, thiserror::Error)]
pub enum DojoError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid JSON syntax in configuration file.
    #[error("Invalid JSON in config file '{path}': {message}\n\nSuggestion: Validate your dojo.json with a JSON linter")]
    ConfigParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// Configuration validation failed.
    #[error("Invalid configuration: {message}\n\nSuggestion: {suggestion}")]
    ConfigValidationError {
        /// Description of the validation failure.
        message: String,
        /// Actionable suggestion for the user.
        suggestion: String,
    },

    // ========================================================================
    // Level Content Errors
    // ========================================================================
    /// A level descriptor exists but is malformed.
    #[error("Invalid level descriptor '{path}': {message}\n\nSuggestion: {suggestion}")]
    LoadError {
        /// Path to the broken descriptor.
        path: PathBuf,
        /// Description of what is wrong with it.
        message: String,
        /// Actionable suggestion for the level author.
        suggestion: String,
    },

    /// A translation exists for a key but does not line up with the descriptor.
    #[error("Translation mismatch for '{key}' in locale '{locale}': {message}\n\nSuggestion: Keep the translated entry in sync with the level descriptor")]
    TranslationMismatch {
        /// Catalog key that was resolved.
        key: String,
        /// Locale the key was resolved in.
        locale: String,
        /// What did not line up.
        message: String,
    },

    // ========================================================================
    // Evaluation Errors
    // ========================================================================
    /// A repository probe failed while running level logic outside `solve`.
    #[error("Repository probe failed: {0}")]
    Probe(#[from] ProbeError),

    /// Invalid level state transition attempted.
    #[error("Invalid level state transition: cannot go from {from} to {to}")]
    InvalidStateTransition {
        /// The current state.
        from: String,
        /// The attempted target state.
        to: String,
    },

    // ========================================================================
    // Profile Errors
    // ========================================================================
    /// Profile file contains malformed JSON that cannot be recovered.
    #[error("Corrupted profile '{path}': {message}\n\nSuggestion: Remove the profile file to start over from the first level")]
    ProfileCorrupted {
        /// Path to the corrupted profile.
        path: PathBuf,
        /// Description of the corruption.
        message: String,
    },

    // ========================================================================
    // General I/O Errors
    // ========================================================================
    /// General I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised by repository probes and level actions.
///
/// Inside [`crate::Level::solve`] these mean "not solved yet"; everywhere
/// else they propagate as [`DojoError::Probe`].
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// The working directory is not a git repository (yet).
    #[error("not a git repository: '{path}'")]
    NotARepository {
        /// Directory that was probed.
        path: PathBuf,
    },

    /// Some repository state the probe expected does not exist.
    #[error("missing {what}")]
    Missing {
        /// Human readable description of the missing state.
        what: String,
    },

    /// Error reported by libgit2.
    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    /// I/O error while touching the working directory.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The learner could not be asked a question.
    #[error("cannot ask the learner: {message}")]
    Prompt {
        /// Why the question could not be asked.
        message: String,
    },

    /// `reset` was pointed at a directory it must not clear.
    #[error("refusing to clear '{path}': {reason}")]
    UnsafeReset {
        /// Directory that would have been cleared.
        path: PathBuf,
        /// What the directory holds.
        reason: String,
    },
}

impl ProbeError {
    /// Creates a new `Missing` probe error.
    #[must_use]
    pub fn missing(what: impl Into<String>) -> Self {
        Self::Missing { what: what.into() }
    }

    /// Creates a new `Prompt` probe error.
    #[must_use]
    pub fn prompt(message: impl Into<String>) -> Self {
        Self::Prompt {
            message: message.into(),
        }
    }
}

impl DojoError {
    /// Creates a new `ConfigParseError` with the given path and message.
    #[must_use]
    pub fn config_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ConfigParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new `ConfigValidationError` with the given message and suggestion.
    #[must_use]
    pub fn config_validation(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::ConfigValidationError {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Creates a new `LoadError` for the descriptor at `path`.
    #[must_use]
    pub fn load_error(
        path: impl Into<PathBuf>,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::LoadError {
            path: path.into(),
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Creates a new `TranslationMismatch` error.
    #[must_use]
    pub fn translation_mismatch(
        key: impl Into<String>,
        locale: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::TranslationMismatch {
            key: key.into(),
            locale: locale.into(),
            message: message.into(),
        }
    }

    /// Creates a new `ProfileCorrupted` error.
    #[must_use]
    pub fn profile_corrupted(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ProfileCorrupted {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new `InvalidStateTransition` error.
    #[must_use]
    pub fn invalid_transition(from: impl std::fmt::Display, to: impl std::fmt::Display) -> Self {
        Self::InvalidStateTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Returns `true` if this error points at broken content or setup and
    /// should abort the current command.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConfigParseError { .. }
                | Self::ConfigValidationError { .. }
                | Self::LoadError { .. }
                | Self::TranslationMismatch { .. }
                | Self::ProfileCorrupted { .. }
        )
    }
}
