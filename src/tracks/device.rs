//! Playback device capability
//!
//! The mixer never touches audio data. Everything it needs from the audio
//! backend goes through [`PlaybackDevice`]: load a source once, then start,
//! pause and set the volume of the resulting handle.

use std::fmt;

use thiserror::Error;

use super::registry::TrackId;

/// A track's source could not be initialized.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot load '{source_ref}': {reason}")]
pub struct LoadError {
    pub source_ref: String,
    pub reason: String,
}

impl LoadError {
    pub fn new(source_ref: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            source_ref: source_ref.into(),
            reason: reason.into(),
        }
    }
}

/// Starting playback failed (decode error, device busy, permission denied...).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct PlaybackError {
    pub reason: String,
}

impl PlaybackError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Identifies one start request for one track.
///
/// Every start bumps the track's generation, and so does every pause. A
/// resolution carrying an older generation is stale and is ignored by the
/// engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StartTicket {
    track: TrackId,
    generation: u64,
}

impl StartTicket {
    pub(crate) fn new(track: TrackId, generation: u64) -> Self {
        Self { track, generation }
    }

    /// Track this start was requested for
    pub fn track(&self) -> &TrackId {
        &self.track
    }

    /// Generation of the request
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl fmt::Display for StartTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.track, self.generation)
    }
}

/// Immediate answer of [`PlaybackDevice::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartStatus {
    /// The handle is running now.
    Running,
    /// The device accepted the request and will report the outcome later,
    /// tagged with the ticket it was given.
    Pending,
}

/// Audio backend as seen by the mixer.
pub trait PlaybackDevice {
    /// Live handle for one loaded source.
    type Handle;

    /// Prepare a looping source for playback.
    fn load(&mut self, source_ref: &str) -> Result<Self::Handle, LoadError>;

    /// Request playback of a handle.
    ///
    /// A device that cannot answer synchronously returns
    /// [`StartStatus::Pending`] and later hands `(ticket, outcome)` back to the
    /// mixer. A pending handle must not report [`is_playing`](Self::is_playing)
    /// until the mixer calls [`confirm_start`](Self::confirm_start).
    fn start(
        &mut self,
        handle: &Self::Handle,
        ticket: &StartTicket,
    ) -> Result<StartStatus, PlaybackError>;

    /// The mixer accepted the successful outcome of a pending start.
    fn confirm_start(&mut self, _handle: &Self::Handle) {}

    /// Pause a handle. Pausing a paused handle does nothing.
    fn pause(&mut self, handle: &Self::Handle);

    /// Apply a loudness fraction in `[0, 1]`.
    fn set_volume(&mut self, handle: &Self::Handle, fraction: f32);

    /// Whether the handle is currently producing sound.
    fn is_playing(&self, handle: &Self::Handle) -> bool;
}
