//! Ambient Mixer - multi-track ambient sound mixing engine
//!
//! A set of independently looping tracks, each with its own volume, combined
//! under a master volume, with named mix snapshots ("presets") and a sleep
//! timer that pauses playback when it elapses.
//!
//! # Architecture
//!
//! - [`tracks`]: track catalog and the playback device seam
//! - [`engine`]: volumes, effective volume and per-track play state
//! - [`presets`]: built-in and persisted custom presets
//! - [`timer`]: countdown state machine
//! - [`orchestrator`]: composes the above and dispatches user intents
//!
//! Audio decoding and output are behind [`tracks::PlaybackDevice`]; the
//! crate ships a [`tracks::SimulatedDevice`] that only keeps state.

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod orchestrator;
pub mod presets;
pub mod timer;
pub mod tracks;

pub use config::Config;
pub use engine::{MixEngine, MixerSettings, PlayState, ToggleAllReport, ToggleOutcome, Volume};
pub use error::{MixerError, Result};
pub use orchestrator::{
    AmbientMixer, Intent, NullRenderer, Outcome, PresetLoadReport, RecordingRenderer,
    RenderEvent, Renderer, TrackStatus,
};
pub use presets::{FileStore, KeyValueStore, MemoryStore, Preset, PresetId, PresetKey, PresetStore};
pub use timer::{CountdownTimer, TimerEvent, TimerState, TimerToken};
pub use tracks::{PlaybackDevice, SimulatedDevice, SourceBehavior, StartTicket, Track, TrackId};
