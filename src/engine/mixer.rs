//! Mix Engine
//!
//! Owns every track's volume, the master volume and the play state of every
//! track. Nothing else mutates them. Each change is queued as a [`MixEvent`]
//! so the orchestrator can forward it to the renderer.
//!
//! The effective volume `track * master / 10000` is pushed to the device
//! whenever either input changes, for tracks that are playing or starting.

use std::collections::BTreeMap;

use log::{debug, info, warn};

use crate::engine::transport::{PlayState, TrackTransport};
use crate::engine::volume::{effective_fraction, Volume};
use crate::error::{MixerError, Result};
use crate::tracks::{
    LoadError, PlaybackDevice, PlaybackError, StartStatus, StartTicket, Track, TrackId,
    TrackRegistry,
};

/// Default volume a zero-volume track is raised to when toggled on alone.
pub const DEFAULT_TRACK_RESUME_VOLUME: u8 = 50;

/// Default volume zero-volume tracks are raised to by "play all".
pub const DEFAULT_ALL_RESUME_VOLUME: u8 = 70;

/// Tunables of the mix engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MixerSettings {
    /// Resume default for `toggle_track`
    pub track_resume_volume: Volume,
    /// Resume default for `toggle_all`
    pub all_resume_volume: Volume,
    /// Master volume at startup and after `stop_all`
    pub master_volume: Volume,
}

impl Default for MixerSettings {
    fn default() -> Self {
        Self {
            track_resume_volume: Volume::new(DEFAULT_TRACK_RESUME_VOLUME as i64),
            all_resume_volume: Volume::new(DEFAULT_ALL_RESUME_VOLUME as i64),
            master_volume: Volume::FULL,
        }
    }
}

/// State change reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MixEvent {
    TrackVolume { track: TrackId, volume: Volume },
    TrackPlayState { track: TrackId, playing: bool },
    MasterVolume(Volume),
}

/// Result of asking a track to play.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// The track is playing.
    Started,
    /// The device will report the outcome later; pass it to
    /// [`MixEngine::resolve_start`] with this ticket.
    Starting(StartTicket),
    /// The track was paused.
    Paused,
}

/// Per-track results of `toggle_all`.
#[derive(Debug, Default)]
pub struct ToggleAllReport {
    /// True when the call paused everything instead of starting.
    pub paused: bool,
    pub started: Vec<TrackId>,
    pub pending: Vec<StartTicket>,
    pub failed: Vec<(TrackId, MixerError)>,
}

#[derive(Debug, Clone, Default)]
struct Channel {
    volume: Volume,
    transport: TrackTransport,
}

/// Per-track and master volume state driving a [`PlaybackDevice`].
pub struct MixEngine<D: PlaybackDevice> {
    device: D,
    registry: TrackRegistry<D::Handle>,
    channels: Vec<Channel>,
    master: Volume,
    settings: MixerSettings,
    events: Vec<MixEvent>,
}

impl<D: PlaybackDevice> MixEngine<D> {
    /// Register `tracks` on `device`. Every track starts paused at volume 0.
    pub fn new(mut device: D, tracks: impl IntoIterator<Item = Track>, settings: MixerSettings) -> Self {
        let registry = TrackRegistry::load(tracks, &mut device);
        let channels = vec![Channel::default(); registry.len()];
        info!(
            "Mix engine ready: {} tracks ({} inert)",
            registry.len(),
            registry.iter().filter(|s| s.is_inert()).count()
        );

        Self {
            device,
            registry,
            channels,
            master: settings.master_volume,
            settings,
            events: Vec::new(),
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn registry(&self) -> &TrackRegistry<D::Handle> {
        &self.registry
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn settings(&self) -> &MixerSettings {
        &self.settings
    }

    pub fn master_volume(&self) -> Volume {
        self.master
    }

    pub fn track_volume(&self, id: &str) -> Result<Volume> {
        Ok(self.channels[self.index_of(id)?].volume)
    }

    pub fn play_state(&self, id: &str) -> Result<PlayState> {
        Ok(self.channels[self.index_of(id)?].transport.state())
    }

    pub fn is_playing(&self, id: &str) -> Result<bool> {
        Ok(self.channels[self.index_of(id)?].transport.is_playing())
    }

    /// Effective loudness fraction of a track, whether or not it is applied.
    pub fn effective_volume(&self, id: &str) -> Result<f32> {
        Ok(effective_fraction(self.track_volume(id)?, self.master))
    }

    /// True if at least one track is playing.
    pub fn any_playing(&self) -> bool {
        self.channels.iter().any(|c| c.transport.is_playing())
    }

    fn any_active(&self) -> bool {
        self.channels.iter().any(|c| !c.transport.is_paused())
    }

    /// Current volume of every track.
    pub fn volumes(&self) -> BTreeMap<TrackId, Volume> {
        self.registry
            .ids()
            .cloned()
            .zip(self.channels.iter().map(|c| c.volume))
            .collect()
    }

    /// Take the state changes queued since the last call.
    pub fn drain_events(&mut self) -> Vec<MixEvent> {
        std::mem::take(&mut self.events)
    }

    fn index_of(&self, id: &str) -> Result<usize> {
        self.registry
            .position(id)
            .ok_or_else(|| MixerError::UnknownTrack { id: id.to_string() })
    }

    // ========================================================================
    // Volume
    // ========================================================================

    /// Set a track's volume. Applied immediately if the track is active.
    pub fn set_track_volume(&mut self, id: &str, volume: Volume) -> Result<()> {
        let idx = self.index_of(id)?;
        self.store_volume(idx, volume);
        self.apply_volume(idx);
        Ok(())
    }

    /// Set the master volume and re-apply it to every active track.
    ///
    /// Paused tracks pick the new master up when they resume.
    pub fn set_master_volume(&mut self, volume: Volume) {
        self.master = volume;
        self.events.push(MixEvent::MasterVolume(volume));
        for idx in 0..self.channels.len() {
            self.apply_volume(idx);
        }
    }

    fn store_volume(&mut self, idx: usize, volume: Volume) {
        self.channels[idx].volume = volume;
        self.events.push(MixEvent::TrackVolume {
            track: self.registry.slot(idx).id().clone(),
            volume,
        });
    }

    fn apply_volume(&mut self, idx: usize) {
        let channel = &self.channels[idx];
        if channel.transport.is_paused() {
            return;
        }
        if let Ok(handle) = self.registry.slot(idx).handle() {
            self.device
                .set_volume(handle, effective_fraction(channel.volume, self.master));
        }
    }

    // ========================================================================
    // Playback
    // ========================================================================

    /// Play a paused track, or pause an active one.
    ///
    /// A track toggled on from volume 0 is first raised to the track resume
    /// default so it is audible. If the device rejects the start the track is
    /// rolled back to paused and the error returned.
    pub fn toggle_track(&mut self, id: &str) -> Result<ToggleOutcome> {
        let idx = self.index_of(id)?;
        if self.channels[idx].transport.is_paused() {
            self.start_index(idx, Some(self.settings.track_resume_volume))
        } else {
            self.pause_index(idx);
            Ok(ToggleOutcome::Paused)
        }
    }

    /// Play a track at its current volume. Does nothing if it is already
    /// playing or starting.
    pub fn start_track(&mut self, id: &str) -> Result<ToggleOutcome> {
        let idx = self.index_of(id)?;
        self.start_index(idx, None)
    }

    /// Pause a track. Pausing a paused track does nothing.
    pub fn pause_track(&mut self, id: &str) -> Result<()> {
        let idx = self.index_of(id)?;
        self.pause_index(idx);
        Ok(())
    }

    fn start_index(&mut self, idx: usize, resume: Option<Volume>) -> Result<ToggleOutcome> {
        let track = self.registry.slot(idx).id().clone();

        match self.channels[idx].transport.state() {
            PlayState::Playing => return Ok(ToggleOutcome::Started),
            PlayState::Starting => {
                let generation = self.channels[idx].transport.generation();
                return Ok(ToggleOutcome::Starting(StartTicket::new(track, generation)));
            }
            PlayState::Paused => {}
        }

        if self.registry.slot(idx).is_inert() {
            return Err(self.load_error(idx));
        }

        if let Some(resume) = resume {
            if self.channels[idx].volume.is_silent() {
                self.store_volume(idx, resume);
            }
        }

        let handle = match self.registry.slot(idx).handle() {
            Ok(handle) => handle,
            Err(_) => return Err(self.load_error(idx)),
        };
        let generation = self.channels[idx].transport.begin_start();
        let ticket = StartTicket::new(track.clone(), generation);
        let fraction = effective_fraction(self.channels[idx].volume, self.master);
        self.device.set_volume(handle, fraction);

        match self.device.start(handle, &ticket) {
            Ok(StartStatus::Running) => {
                self.channels[idx].transport.confirm_start(generation);
                self.debug_check_device(idx);
                self.events.push(MixEvent::TrackPlayState {
                    track,
                    playing: true,
                });
                Ok(ToggleOutcome::Started)
            }
            Ok(StartStatus::Pending) => {
                debug!("Start of '{}' pending ({})", track, ticket);
                Ok(ToggleOutcome::Starting(ticket))
            }
            Err(source) => {
                self.channels[idx].transport.fail_start(generation);
                self.device.pause(handle);
                warn!("Failed to play {}: {}", track, source);
                Err(MixerError::Playback {
                    track: track.to_string(),
                    source,
                })
            }
        }
    }

    fn load_error(&self, idx: usize) -> MixerError {
        let slot = self.registry.slot(idx);
        let source = match slot.handle() {
            Err(e) => e.clone(),
            Ok(_) => LoadError::new(&slot.track().source, "not loaded"),
        };
        MixerError::Load {
            track: slot.id().to_string(),
            source,
        }
    }

    fn pause_index(&mut self, idx: usize) {
        let was_playing = self.channels[idx].transport.is_playing();
        if !self.channels[idx].transport.pause() {
            return;
        }
        if let Ok(handle) = self.registry.slot(idx).handle() {
            self.device.pause(handle);
        }
        self.debug_check_device(idx);
        if was_playing {
            self.events.push(MixEvent::TrackPlayState {
                track: self.registry.slot(idx).id().clone(),
                playing: false,
            });
        }
    }

    /// Once a start has settled the device and the transport agree on
    /// whether the track is sounding.
    fn debug_check_device(&self, idx: usize) {
        let transport = &self.channels[idx].transport;
        if transport.state() == PlayState::Starting {
            return;
        }
        if let Ok(handle) = self.registry.slot(idx).handle() {
            debug_assert_eq!(
                self.device.is_playing(handle),
                transport.is_playing(),
                "device out of sync for {}",
                self.registry.slot(idx).id()
            );
        }
    }

    /// Deliver the outcome of a pending start.
    ///
    /// Returns `Ok(true)` when the track is now playing and `Ok(false)` when
    /// the ticket is stale (the track was paused or restarted meanwhile). A
    /// stale success pauses the handle again unless a newer start is in
    /// flight. A current failure rolls the track back and is returned.
    pub fn resolve_start(
        &mut self,
        ticket: &StartTicket,
        outcome: std::result::Result<(), PlaybackError>,
    ) -> Result<bool> {
        let idx = self.index_of(ticket.track().as_str())?;
        let track = ticket.track().clone();

        match outcome {
            Ok(()) => {
                if self.channels[idx].transport.confirm_start(ticket.generation()) {
                    if let Ok(handle) = self.registry.slot(idx).handle() {
                        self.device.confirm_start(handle);
                    }
                    self.apply_volume(idx);
                    self.debug_check_device(idx);
                    self.events.push(MixEvent::TrackPlayState {
                        track,
                        playing: true,
                    });
                    return Ok(true);
                }
                debug!("Ignoring stale start of {}", ticket);
                if self.channels[idx].transport.is_paused() {
                    if let Ok(handle) = self.registry.slot(idx).handle() {
                        self.device.pause(handle);
                    }
                }
                Ok(false)
            }
            Err(source) => {
                if !self.channels[idx].transport.fail_start(ticket.generation()) {
                    debug!("Ignoring stale start failure of {}", ticket);
                    return Ok(false);
                }
                if let Ok(handle) = self.registry.slot(idx).handle() {
                    self.device.pause(handle);
                }
                warn!("Failed to play {}: {}", track, source);
                Err(MixerError::Playback {
                    track: track.to_string(),
                    source,
                })
            }
        }
    }

    /// Pause everything if anything is active, otherwise start every track.
    ///
    /// Before starting, every loaded track at volume 0 is raised to the "play
    /// all" resume default. A failing track does not stop the others.
    pub fn toggle_all(&mut self) -> ToggleAllReport {
        let mut report = ToggleAllReport::default();

        if self.any_active() {
            self.pause_all();
            report.paused = true;
            return report;
        }

        let resume = self.settings.all_resume_volume;
        for idx in 0..self.channels.len() {
            if !self.registry.slot(idx).is_inert() && self.channels[idx].volume.is_silent() {
                self.store_volume(idx, resume);
            }
        }

        for idx in 0..self.channels.len() {
            let track = self.registry.slot(idx).id().clone();
            match self.start_index(idx, None) {
                Ok(ToggleOutcome::Starting(ticket)) => report.pending.push(ticket),
                Ok(_) => report.started.push(track),
                Err(e) => report.failed.push((track, e)),
            }
        }

        report
    }

    /// Pause every track. Volumes are kept.
    pub fn pause_all(&mut self) {
        for idx in 0..self.channels.len() {
            self.pause_index(idx);
        }
    }

    /// Pause every track and zero every track volume. Master is kept.
    pub fn clear_mix(&mut self) {
        self.pause_all();
        for idx in 0..self.channels.len() {
            self.store_volume(idx, Volume::SILENT);
        }
    }

    /// Pause every track, zero every track volume, reset the master volume.
    pub fn stop_all(&mut self) {
        self.clear_mix();
        self.master = self.settings.master_volume;
        self.events.push(MixEvent::MasterVolume(self.master));
    }
}
