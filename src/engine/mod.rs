//! Mix Engine Module
//!
//! Volume and playback state of the mixer:
//! - Integer percent volumes and the effective-volume rule
//! - Per-track play/pause state machine
//! - The engine that owns both and drives the playback device

pub mod mixer;
pub mod transport;
pub mod volume;

pub use mixer::{
    MixEngine, MixEvent, MixerSettings, ToggleAllReport, ToggleOutcome,
    DEFAULT_ALL_RESUME_VOLUME, DEFAULT_TRACK_RESUME_VOLUME,
};
pub use transport::{PlayState, TrackTransport};
pub use volume::{effective_fraction, Volume};
