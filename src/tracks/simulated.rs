//! Simulated playback device
//!
//! Tracks running state and volume per handle without producing any sound.
//! Used by the CLI (there is no audio output backend in this crate) and by the
//! tests, which script per-source behavior to exercise load and start failures.

use std::collections::HashMap;
use std::path::Path;

use log::debug;

use super::device::{LoadError, PlaybackDevice, PlaybackError, StartStatus, StartTicket};

/// Handle to one simulated voice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SimHandle(usize);

/// Scripted behavior for a source reference
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SourceBehavior {
    /// Loads and starts immediately
    #[default]
    Normal,
    /// `load` fails with the given reason
    FailLoad(String),
    /// `start` fails with the given reason
    FailStart(String),
    /// `start` answers `Pending`; the voice stays silent until the start is
    /// confirmed
    Deferred,
}

#[derive(Debug, Clone)]
struct Voice {
    source: String,
    running: bool,
    pending: bool,
    volume: f32,
    starts: u32,
}

/// A playback device that only keeps state.
#[derive(Debug, Default)]
pub struct SimulatedDevice {
    voices: Vec<Voice>,
    behaviors: HashMap<String, SourceBehavior>,
    check_sources: bool,
}

impl SimulatedDevice {
    /// Device that accepts every source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Device whose `load` requires the source file to exist; `.wav` sources
    /// must also have a readable WAV header.
    pub fn with_source_checks() -> Self {
        Self {
            check_sources: true,
            ..Self::default()
        }
    }

    /// Script the behavior of a source reference.
    pub fn set_behavior(&mut self, source_ref: impl Into<String>, behavior: SourceBehavior) {
        self.behaviors.insert(source_ref.into(), behavior);
    }

    fn behavior(&self, source_ref: &str) -> SourceBehavior {
        self.behaviors.get(source_ref).cloned().unwrap_or_default()
    }

    fn voice_for(&self, source_ref: &str) -> Option<&Voice> {
        self.voices.iter().find(|v| v.source == source_ref)
    }

    /// Current volume fraction of the voice loaded from `source_ref`
    pub fn volume_of(&self, source_ref: &str) -> Option<f32> {
        self.voice_for(source_ref).map(|v| v.volume)
    }

    /// Whether the voice loaded from `source_ref` is running
    pub fn is_running(&self, source_ref: &str) -> bool {
        self.voice_for(source_ref).is_some_and(|v| v.running)
    }

    /// Number of start requests the voice has received
    pub fn start_count(&self, source_ref: &str) -> u32 {
        self.voice_for(source_ref).map_or(0, |v| v.starts)
    }

    fn probe(source_ref: &str) -> Result<(), LoadError> {
        let path = Path::new(source_ref);
        let is_wav = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"));

        if is_wav {
            let reader =
                hound::WavReader::open(path).map_err(|e| LoadError::new(source_ref, e.to_string()))?;
            let spec = reader.spec();
            debug!(
                "Probed {}: {} ch, {} Hz",
                source_ref, spec.channels, spec.sample_rate
            );
            Ok(())
        } else {
            std::fs::metadata(path)
                .map(|_| ())
                .map_err(|e| LoadError::new(source_ref, e.to_string()))
        }
    }
}

impl PlaybackDevice for SimulatedDevice {
    type Handle = SimHandle;

    fn load(&mut self, source_ref: &str) -> Result<SimHandle, LoadError> {
        if let SourceBehavior::FailLoad(reason) = self.behavior(source_ref) {
            return Err(LoadError::new(source_ref, reason));
        }
        if self.check_sources {
            Self::probe(source_ref)?;
        }

        self.voices.push(Voice {
            source: source_ref.to_string(),
            running: false,
            pending: false,
            volume: 1.0,
            starts: 0,
        });
        Ok(SimHandle(self.voices.len() - 1))
    }

    fn start(
        &mut self,
        handle: &SimHandle,
        ticket: &StartTicket,
    ) -> Result<StartStatus, PlaybackError> {
        let behavior = self.behavior(&self.voices[handle.0].source);
        let voice = &mut self.voices[handle.0];
        voice.starts += 1;

        match behavior {
            SourceBehavior::FailStart(reason) => Err(PlaybackError::new(reason)),
            SourceBehavior::Deferred => {
                voice.pending = true;
                debug!("Start of {} deferred ({})", voice.source, ticket);
                Ok(StartStatus::Pending)
            }
            SourceBehavior::Normal | SourceBehavior::FailLoad(_) => {
                voice.running = true;
                Ok(StartStatus::Running)
            }
        }
    }

    fn confirm_start(&mut self, handle: &SimHandle) {
        let voice = &mut self.voices[handle.0];
        if voice.pending {
            voice.pending = false;
            voice.running = true;
        }
    }

    fn pause(&mut self, handle: &SimHandle) {
        let voice = &mut self.voices[handle.0];
        voice.running = false;
        voice.pending = false;
    }

    fn set_volume(&mut self, handle: &SimHandle, fraction: f32) {
        self.voices[handle.0].volume = fraction.clamp(0.0, 1.0);
    }

    fn is_playing(&self, handle: &SimHandle) -> bool {
        self.voices[handle.0].running
    }
}
