//! Render collaborator interface
//!
//! The orchestrator reports every visible state change as a [`RenderEvent`].
//! How it is shown (terminal, GUI, nothing) is up to the [`Renderer`].

use crate::engine::Volume;
use crate::presets::{PresetId, PresetKey};
use crate::tracks::TrackId;

/// Visible state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderEvent {
    TrackPlayState { track: TrackId, playing: bool },
    TrackVolume { track: TrackId, volume: Volume },
    MasterVolume(Volume),
    /// At least one track is playing
    AggregatePlayState(bool),
    /// Preset the current mix was loaded from, if any
    ActivePreset(Option<PresetKey>),
    TimerTick { minutes: u64, seconds: u64 },
    /// The duration selection goes back to "no timer"
    TimerSelectionReset,
    CustomPresetAdded { id: PresetId, name: String },
    CustomPresetRemoved(PresetId),
}

/// Receives render notifications.
pub trait Renderer {
    fn render(&mut self, event: &RenderEvent);
}

impl<F: FnMut(&RenderEvent)> Renderer for F {
    fn render(&mut self, event: &RenderEvent) {
        self(event)
    }
}

/// Discards every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn render(&mut self, _event: &RenderEvent) {}
}

/// Keeps every notification, for tests and replays.
#[derive(Debug, Default, Clone)]
pub struct RecordingRenderer {
    pub events: Vec<RenderEvent>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the recorded events, leaving the log empty.
    pub fn take(&mut self) -> Vec<RenderEvent> {
        std::mem::take(&mut self.events)
    }

    /// Last volume reported for `track`.
    pub fn last_track_volume(&self, track: &str) -> Option<Volume> {
        self.events.iter().rev().find_map(|e| match e {
            RenderEvent::TrackVolume { track: t, volume } if t.as_str() == track => Some(*volume),
            _ => None,
        })
    }

    /// Last aggregate play state reported.
    pub fn last_aggregate(&self) -> Option<bool> {
        self.events.iter().rev().find_map(|e| match e {
            RenderEvent::AggregatePlayState(playing) => Some(*playing),
            _ => None,
        })
    }
}

impl Renderer for RecordingRenderer {
    fn render(&mut self, event: &RenderEvent) {
        self.events.push(event.clone());
    }
}
