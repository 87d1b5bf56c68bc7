//! Orchestrator
//!
//! [`AmbientMixer`] composes the mix engine, the preset store and the
//! countdown timer. Every user intent goes through one of its methods; after
//! each mutating call the engine's state changes are forwarded to the
//! [`Renderer`] and the aggregate play state is reconciled.
//!
//! The orchestrator does not own a clock. The driver delivers one-second
//! ticks through [`AmbientMixer::timer_second`] and resolutions of pending
//! track starts through [`AmbientMixer::resolve_start`].

pub mod intent;
pub mod render;

use std::collections::BTreeMap;

use log::{info, warn};

use crate::engine::{MixEngine, MixEvent, PlayState, ToggleAllReport, ToggleOutcome, Volume};
use crate::error::{MixerError, Result};
use crate::presets::{KeyValueStore, Preset, PresetId, PresetKey, PresetStore};
use crate::timer::{CountdownTimer, TimerEvent, TimerState, TimerToken};
use crate::tracks::{PlaybackDevice, PlaybackError, StartTicket, TrackId};

pub use intent::{Intent, Outcome, PresetLoadReport};
pub use render::{NullRenderer, RecordingRenderer, RenderEvent, Renderer};

/// Listing entry for one registered track.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackStatus {
    pub id: TrackId,
    pub name: String,
    pub volume: Volume,
    pub state: PlayState,
    /// The track failed to load and can never play
    pub inert: bool,
}

/// The ambient mixer application core.
pub struct AmbientMixer<D: PlaybackDevice, S: KeyValueStore, R: Renderer> {
    engine: MixEngine<D>,
    presets: PresetStore<S>,
    builtin: BTreeMap<String, Preset>,
    timer: CountdownTimer,
    renderer: R,
    active_preset: Option<PresetKey>,
    any_playing: bool,
}

impl<D: PlaybackDevice, S: KeyValueStore, R: Renderer> AmbientMixer<D, S, R> {
    /// Compose the mixer and announce the initial state to the renderer.
    pub fn new(
        engine: MixEngine<D>,
        presets: PresetStore<S>,
        builtin: BTreeMap<String, Preset>,
        renderer: R,
    ) -> Self {
        let any_playing = engine.any_playing();
        let mut mixer = Self {
            engine,
            presets,
            builtin,
            timer: CountdownTimer::new(),
            renderer,
            active_preset: None,
            any_playing,
        };
        mixer.engine.drain_events();
        mixer.announce_all();
        mixer
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn engine(&self) -> &MixEngine<D> {
        &self.engine
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn active_preset(&self) -> Option<&PresetKey> {
        self.active_preset.as_ref()
    }

    pub fn any_playing(&self) -> bool {
        self.any_playing
    }

    pub fn timer_state(&self) -> TimerState {
        self.timer.state()
    }

    /// Token the driver passes to [`timer_second`](Self::timer_second).
    pub fn timer_token(&self) -> Option<TimerToken> {
        self.timer.token()
    }

    /// Custom presets in creation order.
    pub fn custom_presets(&self) -> impl Iterator<Item = &Preset> {
        self.presets.iter()
    }

    /// Built-in presets by key.
    pub fn builtin_presets(&self) -> impl Iterator<Item = (&str, &Preset)> {
        self.builtin.iter().map(|(key, preset)| (key.as_str(), preset))
    }

    /// Every registered track with its current status.
    pub fn tracks(&self) -> Vec<TrackStatus> {
        let volumes = self.engine.volumes();
        self.engine
            .registry()
            .iter()
            .map(|slot| TrackStatus {
                id: slot.id().clone(),
                name: slot.track().name.clone(),
                volume: volumes.get(slot.id()).copied().unwrap_or_default(),
                state: self
                    .engine
                    .play_state(slot.id().as_str())
                    .unwrap_or_default(),
                inert: slot.is_inert(),
            })
            .collect()
    }

    // ========================================================================
    // Track Intents
    // ========================================================================

    pub fn toggle_track(&mut self, id: &str) -> Result<ToggleOutcome> {
        let result = self.engine.toggle_track(id);
        self.flush();
        result
    }

    pub fn set_track_volume(&mut self, id: &str, volume: Volume) -> Result<()> {
        let result = self.engine.set_track_volume(id, volume);
        self.flush();
        result
    }

    pub fn set_master_volume(&mut self, volume: Volume) {
        self.engine.set_master_volume(volume);
        self.flush();
    }

    pub fn toggle_all(&mut self) -> ToggleAllReport {
        let report = self.engine.toggle_all();
        for (track, e) in &report.failed {
            warn!("Could not start {}: {}", track, e);
        }
        self.flush();
        report
    }

    /// Stop everything: tracks paused and zeroed, master reset, timer
    /// cancelled, active preset cleared.
    pub fn reset_all(&mut self) {
        self.engine.stop_all();
        self.flush();
        self.stop_timer();
        self.renderer.render(&RenderEvent::TimerSelectionReset);
        self.set_active_preset(None);
        info!("Mixer reset");
    }

    /// Deliver the outcome of a pending track start.
    pub fn resolve_start(
        &mut self,
        ticket: &StartTicket,
        outcome: std::result::Result<(), PlaybackError>,
    ) -> Result<bool> {
        let result = self.engine.resolve_start(ticket, outcome);
        self.flush();
        result
    }

    // ========================================================================
    // Preset Intents
    // ========================================================================

    /// Replace the mix with a preset.
    ///
    /// Every track is paused and zeroed first, then each preset entry is set
    /// to its volume and started. Entries that fail to start are reported and
    /// the rest of the preset still applies.
    pub fn load_preset(&mut self, key: &PresetKey) -> Result<PresetLoadReport> {
        let sounds = match key {
            PresetKey::Builtin(k) => self.builtin.get(k.as_str()),
            PresetKey::Custom(id) => self.presets.recall(id.as_str()).ok(),
        }
        .map(|preset| preset.sounds.clone())
        .ok_or_else(|| MixerError::PresetNotFound {
            key: key.as_str().to_string(),
        })?;

        self.engine.clear_mix();

        let mut report = PresetLoadReport::default();
        for (track, volume) in sounds {
            let started = self
                .engine
                .set_track_volume(track.as_str(), volume)
                .and_then(|()| self.engine.start_track(track.as_str()));
            match started {
                Ok(ToggleOutcome::Starting(ticket)) => report.pending.push(ticket),
                Ok(_) => report.started.push(track),
                Err(e) => {
                    warn!("Preset {}: could not start {}: {}", key, track, e);
                    report.failed.push((track, e));
                }
            }
        }

        self.flush();
        self.set_active_preset(Some(key.clone()));
        info!("Loaded preset {}", key);
        Ok(report)
    }

    /// Save the current mix as a custom preset.
    ///
    /// The name is trimmed. Only tracks above zero are stored; a mix with none
    /// is rejected.
    pub fn save_preset(&mut self, name: &str) -> Result<PresetId> {
        let name = name.trim();
        if name.is_empty() {
            return Err(MixerError::EmptyPresetName);
        }

        let volumes = self.engine.volumes();
        if volumes.values().all(|v| v.is_silent()) {
            return Err(MixerError::NothingToSave);
        }

        let id = self.presets.snapshot(name, volumes)?;
        self.renderer.render(&RenderEvent::CustomPresetAdded {
            id: id.clone(),
            name: name.to_string(),
        });
        Ok(id)
    }

    /// Delete a custom preset. Returns whether it existed.
    pub fn delete_preset(&mut self, id: &str) -> Result<bool> {
        if !self.presets.delete(id)? {
            return Ok(false);
        }

        let id = PresetId::from(id);
        self.renderer
            .render(&RenderEvent::CustomPresetRemoved(id.clone()));
        if self.active_preset == Some(PresetKey::Custom(id)) {
            self.set_active_preset(None);
        }
        Ok(true)
    }

    // ========================================================================
    // Timer Intents
    // ========================================================================

    /// Start a countdown; `minutes <= 0` cancels instead.
    pub fn start_timer(&mut self, minutes: i64) {
        let events = self.timer.start(minutes);
        self.handle_timer_events(events);
    }

    pub fn stop_timer(&mut self) {
        let events = self.timer.stop();
        self.handle_timer_events(events);
    }

    /// One second elapsed for the countdown identified by `token`.
    ///
    /// Stale tokens are ignored. When the countdown completes every track is
    /// paused and the timer selection is reset.
    pub fn timer_second(&mut self, token: TimerToken) {
        let events = self.timer.tick(token);
        self.handle_timer_events(events);
    }

    fn handle_timer_events(&mut self, events: Vec<TimerEvent>) {
        for event in events {
            match event {
                TimerEvent::Tick { minutes, seconds } => {
                    self.renderer
                        .render(&RenderEvent::TimerTick { minutes, seconds });
                }
                TimerEvent::Completed => {
                    info!("Timer elapsed, pausing all tracks");
                    self.engine.pause_all();
                    self.flush();
                    self.renderer.render(&RenderEvent::TimerSelectionReset);
                }
            }
        }
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Run one intent.
    pub fn dispatch(&mut self, intent: Intent) -> Result<Outcome> {
        match intent {
            Intent::ToggleTrack(id) => self.toggle_track(&id).map(Outcome::Track),
            Intent::SetTrackVolume { track, volume } => {
                self.set_track_volume(&track, volume).map(|()| Outcome::Done)
            }
            Intent::SetMasterVolume(volume) => {
                self.set_master_volume(volume);
                Ok(Outcome::Done)
            }
            Intent::ToggleAll => Ok(Outcome::All(self.toggle_all())),
            Intent::ResetAll => {
                self.reset_all();
                Ok(Outcome::Done)
            }
            Intent::LoadPreset { key, custom } => {
                let key = if custom {
                    PresetKey::Custom(PresetId::new(key))
                } else {
                    PresetKey::Builtin(key)
                };
                self.load_preset(&key).map(Outcome::PresetLoaded)
            }
            Intent::SavePreset(name) => self.save_preset(&name).map(Outcome::PresetSaved),
            Intent::DeletePreset(id) => self.delete_preset(&id).map(Outcome::PresetDeleted),
            Intent::StartTimer(minutes) => {
                self.start_timer(minutes);
                Ok(Outcome::Done)
            }
            Intent::StopTimer => {
                self.stop_timer();
                Ok(Outcome::Done)
            }
        }
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    /// Forward queued engine changes, then reconcile the aggregate state.
    fn flush(&mut self) {
        for event in self.engine.drain_events() {
            let event = match event {
                MixEvent::TrackVolume { track, volume } => {
                    RenderEvent::TrackVolume { track, volume }
                }
                MixEvent::TrackPlayState { track, playing } => {
                    RenderEvent::TrackPlayState { track, playing }
                }
                MixEvent::MasterVolume(volume) => RenderEvent::MasterVolume(volume),
            };
            self.renderer.render(&event);
        }

        let any_playing = self.engine.any_playing();
        if any_playing != self.any_playing {
            self.any_playing = any_playing;
            self.renderer
                .render(&RenderEvent::AggregatePlayState(any_playing));
        }
    }

    fn set_active_preset(&mut self, key: Option<PresetKey>) {
        self.active_preset = key.clone();
        self.renderer.render(&RenderEvent::ActivePreset(key));
    }

    fn announce_all(&mut self) {
        for status in self.tracks() {
            self.renderer.render(&RenderEvent::TrackVolume {
                track: status.id.clone(),
                volume: status.volume,
            });
            self.renderer.render(&RenderEvent::TrackPlayState {
                track: status.id,
                playing: status.state == PlayState::Playing,
            });
        }
        self.renderer
            .render(&RenderEvent::MasterVolume(self.engine.master_volume()));
        self.renderer
            .render(&RenderEvent::AggregatePlayState(self.any_playing));
        self.renderer
            .render(&RenderEvent::ActivePreset(self.active_preset.clone()));

        let custom: Vec<(PresetId, String)> = self
            .presets
            .iter()
            .map(|p| (p.id.clone(), p.name.clone()))
            .collect();
        for (id, name) in custom {
            self.renderer
                .render(&RenderEvent::CustomPresetAdded { id, name });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MixerSettings;
    use crate::presets::MemoryStore;
    use crate::tracks::{SimulatedDevice, SourceBehavior, Track};

    type TestMixer = AmbientMixer<SimulatedDevice, MemoryStore, RecordingRenderer>;

    fn catalog() -> Vec<Track> {
        vec![
            Track::new("rain", "Rain", "rain.wav"),
            Track::new("wind", "Wind", "wind.wav"),
            Track::new("thunder", "Thunder", "thunder.wav"),
            Track::new("birds", "Birds", "birds.wav"),
        ]
    }

    fn builtin() -> BTreeMap<String, Preset> {
        let storm = Preset::new(
            PresetId::new("storm"),
            "Thunderstorm",
            [
                (TrackId::from("rain"), Volume::new(80)),
                (TrackId::from("thunder"), Volume::new(60)),
            ],
        );
        BTreeMap::from([("storm".to_string(), storm)])
    }

    fn mixer_with(device: SimulatedDevice) -> TestMixer {
        let engine = MixEngine::new(device, catalog(), MixerSettings::default());
        let presets = PresetStore::open(MemoryStore::new());
        let mut mixer = AmbientMixer::new(engine, presets, builtin(), RecordingRenderer::new());
        mixer.renderer_mut().take();
        mixer
    }

    fn mixer() -> TestMixer {
        mixer_with(SimulatedDevice::new())
    }

    #[test]
    fn test_startup_announces_state() {
        let engine = MixEngine::new(SimulatedDevice::new(), catalog(), MixerSettings::default());
        let mut backend = MemoryStore::new();
        backend
            .set(
                crate::presets::DEFAULT_PRESETS_KEY,
                r#"{"custom_1": {"name": "Saved", "sounds": {"rain": 20}}}"#,
            )
            .unwrap();
        let mixer = AmbientMixer::new(
            engine,
            PresetStore::open(backend),
            builtin(),
            RecordingRenderer::new(),
        );

        let events = &mixer.renderer().events;
        assert_eq!(mixer.renderer().last_track_volume("birds"), Some(Volume::SILENT));
        assert!(events.contains(&RenderEvent::MasterVolume(Volume::FULL)));
        assert!(events.contains(&RenderEvent::AggregatePlayState(false)));
        assert!(events.contains(&RenderEvent::CustomPresetAdded {
            id: PresetId::from("custom_1"),
            name: "Saved".to_string()
        }));
    }

    #[test]
    fn test_aggregate_reconciled_after_toggle() {
        let mut mixer = mixer();
        mixer.toggle_track("rain").unwrap();
        assert!(mixer.any_playing());
        assert_eq!(mixer.renderer().last_aggregate(), Some(true));
        assert_eq!(mixer.renderer().last_track_volume("rain"), Some(Volume::new(50)));

        mixer.toggle_track("rain").unwrap();
        assert!(!mixer.any_playing());
        assert_eq!(mixer.renderer().last_aggregate(), Some(false));
    }

    #[test]
    fn test_aggregate_only_emitted_on_change() {
        let mut mixer = mixer();
        mixer.toggle_track("rain").unwrap();
        mixer.toggle_track("wind").unwrap();

        let aggregates = mixer
            .renderer()
            .events
            .iter()
            .filter(|e| matches!(e, RenderEvent::AggregatePlayState(_)))
            .count();
        assert_eq!(aggregates, 1);
    }

    #[test]
    fn test_load_builtin_preset() {
        let mut mixer = mixer();
        mixer.set_track_volume("birds", Volume::new(30)).unwrap();
        mixer.toggle_track("birds").unwrap();

        let report = mixer
            .load_preset(&PresetKey::Builtin("storm".to_string()))
            .unwrap();
        assert!(report.is_complete());
        assert_eq!(report.started.len(), 2);

        let engine = mixer.engine();
        assert_eq!(engine.track_volume("rain").unwrap(), Volume::new(80));
        assert_eq!(engine.track_volume("thunder").unwrap(), Volume::new(60));
        assert!(engine.is_playing("rain").unwrap());
        assert!(engine.is_playing("thunder").unwrap());
        for other in ["wind", "birds"] {
            assert_eq!(engine.track_volume(other).unwrap(), Volume::SILENT);
            assert!(!engine.is_playing(other).unwrap());
        }
        assert_eq!(
            mixer.active_preset(),
            Some(&PresetKey::Builtin("storm".to_string()))
        );
    }

    #[test]
    fn test_load_preset_keeps_master() {
        let mut mixer = mixer();
        mixer.set_master_volume(Volume::new(40));
        mixer
            .load_preset(&PresetKey::Builtin("storm".to_string()))
            .unwrap();
        assert_eq!(mixer.engine().master_volume(), Volume::new(40));
    }

    #[test]
    fn test_load_missing_preset() {
        let mut mixer = mixer();
        mixer.toggle_track("rain").unwrap();

        let err = mixer
            .load_preset(&PresetKey::Custom(PresetId::from("custom_404")))
            .unwrap_err();
        assert_eq!(err.error_code(), "PRESET_NOT_FOUND");
        assert!(mixer.engine().is_playing("rain").unwrap());
    }

    #[test]
    fn test_load_preset_applies_partially() {
        let mut device = SimulatedDevice::new();
        device.set_behavior("thunder.wav", SourceBehavior::FailStart("busy".into()));
        let mut mixer = mixer_with(device);

        let report = mixer
            .load_preset(&PresetKey::Builtin("storm".to_string()))
            .unwrap();
        assert_eq!(report.started, vec![TrackId::from("rain")]);
        assert_eq!(report.failed.len(), 1);
        assert!(mixer.engine().is_playing("rain").unwrap());
        assert!(!mixer.engine().is_playing("thunder").unwrap());
        assert_eq!(mixer.engine().track_volume("thunder").unwrap(), Volume::new(60));
    }

    #[test]
    fn test_save_then_load_custom_preset() {
        let mut mixer = mixer();
        mixer.set_track_volume("wind", Volume::new(45)).unwrap();
        mixer.set_track_volume("birds", Volume::new(15)).unwrap();

        let id = mixer.save_preset("  Breezy  ").unwrap();
        assert_eq!(
            mixer.renderer().events.last(),
            Some(&RenderEvent::CustomPresetAdded {
                id: id.clone(),
                name: "Breezy".to_string()
            })
        );

        mixer.reset_all();
        mixer
            .load_preset(&PresetKey::Custom(id.clone()))
            .unwrap();
        assert_eq!(mixer.engine().track_volume("wind").unwrap(), Volume::new(45));
        assert_eq!(mixer.engine().track_volume("birds").unwrap(), Volume::new(15));
        assert!(mixer.engine().is_playing("birds").unwrap());
        assert!(!mixer.engine().is_playing("rain").unwrap());
    }

    #[test]
    fn test_save_preset_validation() {
        let mut mixer = mixer();
        assert_eq!(
            mixer.save_preset("Quiet").unwrap_err().error_code(),
            "NOTHING_TO_SAVE"
        );

        mixer.set_track_volume("rain", Volume::new(10)).unwrap();
        assert_eq!(
            mixer.save_preset("   ").unwrap_err().error_code(),
            "EMPTY_PRESET_NAME"
        );

        mixer.save_preset("Drizzle").unwrap();
        assert_eq!(
            mixer.save_preset("Drizzle").unwrap_err().error_code(),
            "DUPLICATE_NAME"
        );
        assert_eq!(mixer.custom_presets().count(), 1);
    }

    #[test]
    fn test_delete_active_preset_clears_it() {
        let mut mixer = mixer();
        mixer.set_track_volume("rain", Volume::new(10)).unwrap();
        let id = mixer.save_preset("Drizzle").unwrap();
        mixer.load_preset(&PresetKey::Custom(id.clone())).unwrap();

        assert!(mixer.delete_preset(id.as_str()).unwrap());
        assert_eq!(mixer.active_preset(), None);
        let events = mixer.renderer_mut().take();
        assert!(events.contains(&RenderEvent::CustomPresetRemoved(id.clone())));
        assert_eq!(events.last(), Some(&RenderEvent::ActivePreset(None)));

        assert!(!mixer.delete_preset(id.as_str()).unwrap());
    }

    #[test]
    fn test_reset_all() {
        let mut mixer = mixer();
        mixer.set_master_volume(Volume::new(25));
        mixer
            .load_preset(&PresetKey::Builtin("storm".to_string()))
            .unwrap();
        mixer.start_timer(10);

        mixer.reset_all();
        assert!(!mixer.any_playing());
        assert!(!mixer.timer_state().running);
        assert_eq!(mixer.engine().master_volume(), Volume::FULL);
        assert!(mixer.engine().volumes().values().all(|v| v.is_silent()));
        assert_eq!(mixer.active_preset(), None);
        assert!(mixer
            .renderer()
            .events
            .contains(&RenderEvent::TimerSelectionReset));
    }

    #[test]
    fn test_timer_completion_pauses_everything() {
        let mut mixer = mixer();
        mixer.toggle_track("rain").unwrap();
        mixer.set_track_volume("wind", Volume::new(35)).unwrap();
        mixer.toggle_track("wind").unwrap();
        mixer.start_timer(1);
        let token = mixer.timer_token().unwrap();

        for _ in 0..60 {
            mixer.timer_second(token);
        }

        assert!(!mixer.any_playing());
        assert!(!mixer.timer_state().running);
        assert_eq!(mixer.engine().track_volume("wind").unwrap(), Volume::new(35));

        let events = mixer.renderer_mut().take();
        assert_eq!(events.last(), Some(&RenderEvent::TimerSelectionReset));
        assert!(events.contains(&RenderEvent::AggregatePlayState(false)));
        let resets = events
            .iter()
            .filter(|e| **e == RenderEvent::TimerSelectionReset)
            .count();
        assert_eq!(resets, 1);
    }

    #[test]
    fn test_stale_timer_ticks_ignored() {
        let mut mixer = mixer();
        mixer.toggle_track("rain").unwrap();
        mixer.start_timer(1);
        let stale = mixer.timer_token().unwrap();
        mixer.start_timer(5);

        for _ in 0..120 {
            mixer.timer_second(stale);
        }
        assert!(mixer.any_playing());
        assert_eq!(mixer.timer_state().remaining_seconds, 300);
    }

    #[test]
    fn test_dispatch_table() {
        let mut mixer = mixer();

        let outcome = mixer
            .dispatch(Intent::parse_line("toggle rain").unwrap())
            .unwrap();
        assert!(matches!(outcome, Outcome::Track(ToggleOutcome::Started)));

        mixer
            .dispatch(Intent::parse_line("master 40").unwrap())
            .unwrap();
        assert_eq!(mixer.engine().master_volume(), Volume::new(40));

        let outcome = mixer.dispatch(Intent::SavePreset("Mine".into())).unwrap();
        let Outcome::PresetSaved(id) = outcome else {
            panic!("expected a saved preset");
        };

        let outcome = mixer
            .dispatch(Intent::LoadPreset {
                key: id.to_string(),
                custom: true,
            })
            .unwrap();
        assert!(matches!(outcome, Outcome::PresetLoaded(_)));

        mixer.dispatch(Intent::StartTimer(3)).unwrap();
        assert!(mixer.timer_state().running);
        mixer.dispatch(Intent::StopTimer).unwrap();
        assert!(!mixer.timer_state().running);

        let err = mixer.dispatch(Intent::ToggleTrack("ocean".into())).unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_TRACK");
    }

    #[test]
    fn test_pending_start_reconciled_on_resolve() {
        let mut device = SimulatedDevice::new();
        device.set_behavior("rain.wav", SourceBehavior::Deferred);
        let mut mixer = mixer_with(device);

        let ToggleOutcome::Starting(ticket) = mixer.toggle_track("rain").unwrap() else {
            panic!("expected pending start");
        };
        assert!(!mixer.any_playing());

        assert!(mixer.resolve_start(&ticket, Ok(())).unwrap());
        assert!(mixer.any_playing());
        assert_eq!(mixer.renderer().last_aggregate(), Some(true));
    }
}
