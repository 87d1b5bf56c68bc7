//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::path::Path;

use log::info;

use crate::config::{self, Config};
use crate::engine::{MixEngine, Volume};
use crate::error::{MixerError, Result};
use crate::orchestrator::{AmbientMixer, NullRenderer, Renderer};
use crate::presets::{FileStore, PresetStore};
use crate::tracks::SimulatedDevice;

/// Mixer wired to the file-backed preset store.
pub type Mixer<R> = AmbientMixer<SimulatedDevice, FileStore, R>;

/// Build the mixer described by `config`.
pub fn open_mixer<R: Renderer>(config: &Config, check_sources: bool, renderer: R) -> Mixer<R> {
    let device = if check_sources {
        SimulatedDevice::with_source_checks()
    } else {
        SimulatedDevice::new()
    };
    let engine = MixEngine::new(device, config.tracks.clone(), config.settings);
    let store = PresetStore::open_with_key(
        FileStore::new(&config.data_dir),
        config.presets_key.clone(),
    );
    AmbientMixer::new(engine, store, config.builtin_presets().clone(), renderer)
}

/// Print the track catalog.
pub fn list_tracks(config: &Config, check_sources: bool) -> Result<()> {
    let mixer = open_mixer(config, check_sources, NullRenderer);
    let tracks = mixer.tracks();

    println!("Tracks:");
    println!("{:-<60}", "");
    for status in &tracks {
        let source = mixer
            .engine()
            .registry()
            .get(status.id.as_str())
            .map(|slot| slot.track().source.clone())
            .unwrap_or_default();
        println!(
            "{:<10} {:<18} {}{}",
            status.id,
            status.name,
            source,
            if status.inert { "  [unavailable]" } else { "" }
        );
    }
    println!("{:-<60}", "");
    println!(
        "{} tracks, {} unavailable",
        tracks.len(),
        tracks.iter().filter(|t| t.inert).count()
    );

    Ok(())
}

/// Print built-in and custom presets.
pub fn list_presets(config: &Config) -> Result<()> {
    let mixer = open_mixer(config, false, NullRenderer);

    println!("Built-in presets:");
    for (key, preset) in mixer.builtin_presets() {
        println!("  {:<12} {:<16} {}", key, preset.name, format_sounds(preset));
    }

    let custom: Vec<_> = mixer.custom_presets().collect();
    if custom.is_empty() {
        println!("No custom presets.");
        return Ok(());
    }

    println!("Custom presets:");
    for preset in custom {
        println!(
            "  {:<22} {:<16} {}",
            preset.id,
            preset.name,
            format_sounds(preset)
        );
    }

    Ok(())
}

/// Save a mix given as `id=volume` entries as a custom preset.
pub fn save_preset(config: &Config, name: &str, mix: &[String]) -> Result<()> {
    info!("Saving preset \"{}\"", name.trim());

    let mut mixer = open_mixer(config, false, NullRenderer);
    for entry in mix {
        let (track, volume) = parse_mix_entry(entry)?;
        mixer.set_track_volume(&track, volume)?;
    }
    let id = mixer.save_preset(name)?;

    println!("Preset \"{}\" saved with id {}", name.trim(), id);

    Ok(())
}

/// Delete a custom preset.
pub fn delete_preset(config: &Config, id: &str) -> Result<()> {
    let mut mixer = open_mixer(config, false, NullRenderer);
    if !mixer.delete_preset(id)? {
        return Err(MixerError::PresetNotFound { key: id.to_string() });
    }

    println!("Preset {} deleted", id);

    Ok(())
}

/// Write the embedded default configuration.
pub fn init_config(path: Option<&Path>, force: bool) -> Result<()> {
    let target = match path {
        Some(path) => path.to_path_buf(),
        None => config::user_config_path().ok_or_else(|| MixerError::Config {
            path: config::APP_DIR.into(),
            reason: "no user configuration directory on this platform".to_string(),
        })?,
    };

    Config::write_default(&target, force)?;
    println!("Configuration written to {}", target.display());

    Ok(())
}

/// Parse `rain=60` into a track id and volume.
pub fn parse_mix_entry(entry: &str) -> Result<(String, Volume)> {
    let (track, volume) = entry
        .split_once('=')
        .ok_or_else(|| MixerError::InvalidCommand {
            input: entry.to_string(),
            reason: "expected <track>=<volume>".to_string(),
        })?;

    let track = track.trim();
    if track.is_empty() {
        return Err(MixerError::InvalidCommand {
            input: entry.to_string(),
            reason: "missing track id".to_string(),
        });
    }
    Ok((track.to_string(), volume.parse()?))
}

fn format_sounds(preset: &crate::presets::Preset) -> String {
    preset
        .sounds
        .iter()
        .map(|(id, volume)| format!("{}={}", id, volume.percent()))
        .collect::<Vec<_>>()
        .join(", ")
}
