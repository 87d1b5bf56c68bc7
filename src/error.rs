//! Error handling for the ambient mixer
//!
//! Nothing in the mixer is fatal to the process: every failure means "this one
//! operation did not take effect" and carries enough context for the caller to
//! report it.

use std::path::PathBuf;

use thiserror::Error;

use crate::tracks::{LoadError, PlaybackError};

/// Result type alias for mixer operations
pub type Result<T> = std::result::Result<T, MixerError>;

/// Main error type for mixer operations
#[derive(Error, Debug)]
pub enum MixerError {
    // Caller Errors
    #[error("Unknown track: {id}")]
    UnknownTrack { id: String },

    #[error("Invalid volume: {input:?} (expected an integer percent)")]
    InvalidVolume { input: String },

    #[error("Invalid command {input:?}: {reason}")]
    InvalidCommand { input: String, reason: String },

    // Playback Errors
    #[error("Track '{track}' failed to load")]
    Load {
        track: String,
        #[source]
        source: LoadError,
    },

    #[error("Track '{track}' failed to start")]
    Playback {
        track: String,
        #[source]
        source: PlaybackError,
    },

    // Preset Errors
    #[error("A preset named '{name}' already exists")]
    DuplicateName { name: String },

    #[error("Preset not found: {key}")]
    PresetNotFound { key: String },

    #[error("Preset name is empty")]
    EmptyPresetName,

    #[error("No active sounds to save")]
    NothingToSave,

    #[error("Stored presets could not be decoded: {reason}")]
    PresetDecode { reason: String },

    #[error("Stored presets under '{key}' could not be read or kept aside; not overwriting them")]
    PresetsLocked { key: String },

    // Storage Errors
    #[error("Failed to read file: {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory creation failed: {path}: {source}")]
    DirectoryCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Configuration Errors
    #[error("Invalid configuration {path}: {reason}")]
    Config { path: PathBuf, reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MixerError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            MixerError::UnknownTrack { .. } => "UNKNOWN_TRACK",
            MixerError::InvalidVolume { .. } => "INVALID_VOLUME",
            MixerError::InvalidCommand { .. } => "INVALID_COMMAND",
            MixerError::Load { .. } => "LOAD_ERROR",
            MixerError::Playback { .. } => "PLAYBACK_ERROR",
            MixerError::DuplicateName { .. } => "DUPLICATE_NAME",
            MixerError::PresetNotFound { .. } => "PRESET_NOT_FOUND",
            MixerError::EmptyPresetName => "EMPTY_PRESET_NAME",
            MixerError::NothingToSave => "NOTHING_TO_SAVE",
            MixerError::PresetDecode { .. } => "PRESET_DECODE_ERROR",
            MixerError::PresetsLocked { .. } => "PRESETS_LOCKED",
            MixerError::FileRead { .. } => "FILE_READ_ERROR",
            MixerError::FileWrite { .. } => "FILE_WRITE_ERROR",
            MixerError::DirectoryCreate { .. } => "DIRECTORY_CREATE_ERROR",
            MixerError::Config { .. } => "CONFIG_ERROR",
            MixerError::Io(_) => "IO_ERROR",
            MixerError::Json(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Returns true if this error was caused by the caller's input rather than
    /// by the environment.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            MixerError::UnknownTrack { .. }
                | MixerError::InvalidVolume { .. }
                | MixerError::InvalidCommand { .. }
                | MixerError::DuplicateName { .. }
                | MixerError::PresetNotFound { .. }
                | MixerError::EmptyPresetName
                | MixerError::NothingToSave
        )
    }

    /// Returns true if repeating the same request may succeed.
    ///
    /// The mixer itself never retries; this only informs the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MixerError::Playback { .. } | MixerError::FileWrite { .. } | MixerError::Io(_)
        )
    }

    /// Returns a user-friendly recovery suggestion.
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            MixerError::UnknownTrack { .. } => Some("Run 'ambient-mixer tracks' to list track ids."),
            MixerError::InvalidVolume { .. } => Some("Use a whole number between 0 and 100."),
            MixerError::InvalidCommand { .. } => Some("Type 'help' to list commands."),
            MixerError::Load { .. } => {
                Some("Check that the track's audio file exists and is a readable WAV file.")
            }
            MixerError::Playback { .. } => Some("Try toggling the track again."),
            MixerError::DuplicateName { .. } => Some("Pick a different preset name."),
            MixerError::PresetNotFound { .. } => {
                Some("Run 'ambient-mixer presets' to list available presets.")
            }
            MixerError::EmptyPresetName => Some("Please enter a preset name."),
            MixerError::NothingToSave => Some("Raise at least one track above 0 before saving."),
            MixerError::FileWrite { .. } | MixerError::DirectoryCreate { .. } => {
                Some("Check that the data directory is writable and the disk is not full.")
            }
            MixerError::Config { .. } => {
                Some("Fix the configuration file or run 'ambient-mixer init-config'.")
            }
            MixerError::PresetsLocked { .. } => {
                Some("Check the permissions of the presets file, then restart the mixer.")
            }
            _ => None,
        }
    }
}
