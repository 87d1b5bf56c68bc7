//! Configuration
//!
//! The embedded `config/default.toml` is always parsed first. A user file is
//! then laid over it: scalar keys override one by one, `tracks` and `presets`
//! replace the defaults wholesale when present.
//!
//! A malformed file at the default user location is logged and ignored. A
//! file passed explicitly must parse.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::Deserialize;

use crate::engine::{MixerSettings, Volume};
use crate::error::{MixerError, Result};
use crate::presets::{Preset, PresetId, DEFAULT_PRESETS_KEY};
use crate::tracks::{Track, TrackId};

const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

/// Directory name under the platform config and data directories.
pub const APP_DIR: &str = "ambient-mixer";

const EMBEDDED: &str = "<embedded default>";

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    audio_dir: Option<PathBuf>,
    #[serde(default)]
    mixer: MixerSection,
    #[serde(default)]
    storage: StorageSection,
    tracks: Option<Vec<TrackEntry>>,
    presets: Option<BTreeMap<String, PresetEntry>>,
}

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct MixerSection {
    track_resume_volume: Option<i64>,
    all_resume_volume: Option<i64>,
    master_volume: Option<i64>,
}

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct StorageSection {
    data_dir: Option<PathBuf>,
    presets_key: Option<String>,
}

#[derive(Deserialize, Clone)]
#[serde(deny_unknown_fields)]
struct TrackEntry {
    id: String,
    name: String,
    source: String,
}

#[derive(Deserialize, Clone)]
#[serde(deny_unknown_fields)]
struct PresetEntry {
    name: String,
    #[serde(default)]
    sounds: BTreeMap<String, i64>,
}

impl ConfigFile {
    fn parse(contents: &str, path: &Path) -> Result<Self> {
        toml::from_str(contents).map_err(|e| MixerError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    fn merge(&mut self, user: ConfigFile) {
        if user.audio_dir.is_some() {
            self.audio_dir = user.audio_dir;
        }
        if user.mixer.track_resume_volume.is_some() {
            self.mixer.track_resume_volume = user.mixer.track_resume_volume;
        }
        if user.mixer.all_resume_volume.is_some() {
            self.mixer.all_resume_volume = user.mixer.all_resume_volume;
        }
        if user.mixer.master_volume.is_some() {
            self.mixer.master_volume = user.mixer.master_volume;
        }
        if user.storage.data_dir.is_some() {
            self.storage.data_dir = user.storage.data_dir;
        }
        if user.storage.presets_key.is_some() {
            self.storage.presets_key = user.storage.presets_key;
        }
        if user.tracks.is_some() {
            self.tracks = user.tracks;
        }
        if user.presets.is_some() {
            self.presets = user.presets;
        }
    }
}

/// Resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub settings: MixerSettings,
    pub audio_dir: PathBuf,
    pub data_dir: PathBuf,
    pub presets_key: String,
    /// Track catalog with sources resolved against `audio_dir`
    pub tracks: Vec<Track>,
    builtin: BTreeMap<String, Preset>,
    /// User file the configuration was read from, if any
    pub loaded_from: Option<PathBuf>,
}

impl Config {
    /// Load the configuration, from `explicit` if given, otherwise from the
    /// user config path when that file exists.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut base = ConfigFile::parse(DEFAULT_CONFIG, Path::new(EMBEDDED))?;

        let loaded_from = match explicit {
            Some(path) => {
                let contents = fs::read_to_string(path).map_err(|e| MixerError::FileRead {
                    path: path.to_path_buf(),
                    source: e,
                })?;
                base.merge(ConfigFile::parse(&contents, path)?);
                Some(path.to_path_buf())
            }
            None => match user_config_path().filter(|p| p.exists()) {
                Some(path) => match fs::read_to_string(&path) {
                    Ok(contents) => match ConfigFile::parse(&contents, &path) {
                        Ok(user) => {
                            base.merge(user);
                            Some(path)
                        }
                        Err(e) => {
                            warn!(target: "config", "ignoring malformed config: {}", e);
                            None
                        }
                    },
                    Err(e) => {
                        warn!(target: "config", "could not read config {}: {}", path.display(), e);
                        None
                    }
                },
                None => None,
            },
        };

        let config = Self::resolve(base, loaded_from)?;
        info!(
            "Configuration: {} tracks, {} built-in presets{}",
            config.tracks.len(),
            config.builtin.len(),
            config
                .loaded_from
                .as_ref()
                .map(|p| format!(" (from {})", p.display()))
                .unwrap_or_default()
        );
        Ok(config)
    }

    /// Embedded defaults overlaid with `contents`.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let mut base = ConfigFile::parse(DEFAULT_CONFIG, Path::new(EMBEDDED))?;
        base.merge(ConfigFile::parse(contents, Path::new("<string>"))?);
        Self::resolve(base, None)
    }

    /// The embedded default configuration text.
    pub fn default_toml() -> &'static str {
        DEFAULT_CONFIG
    }

    /// Write the default configuration to `path`. An existing file is only
    /// replaced when `force` is set.
    pub fn write_default(path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            return Err(MixerError::Config {
                path: path.to_path_buf(),
                reason: "file already exists (use --force to overwrite)".to_string(),
            });
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| MixerError::DirectoryCreate {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        fs::write(path, DEFAULT_CONFIG).map_err(|e| MixerError::FileWrite {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Built-in presets by key.
    pub fn builtin_presets(&self) -> &BTreeMap<String, Preset> {
        &self.builtin
    }

    fn resolve(file: ConfigFile, loaded_from: Option<PathBuf>) -> Result<Self> {
        let origin = loaded_from
            .clone()
            .unwrap_or_else(|| PathBuf::from(EMBEDDED));
        let invalid = |reason: String| MixerError::Config {
            path: origin.clone(),
            reason,
        };

        let defaults = MixerSettings::default();
        let resume = |value: Option<i64>, fallback: Volume| {
            value.map_or(fallback, |v| Volume::new(v.clamp(1, 100)))
        };
        let settings = MixerSettings {
            track_resume_volume: resume(file.mixer.track_resume_volume, defaults.track_resume_volume),
            all_resume_volume: resume(file.mixer.all_resume_volume, defaults.all_resume_volume),
            master_volume: file
                .mixer
                .master_volume
                .map_or(defaults.master_volume, Volume::new),
        };

        let audio_dir = file.audio_dir.unwrap_or_else(|| PathBuf::from("audio"));

        let mut seen = HashSet::new();
        let mut tracks = Vec::new();
        for entry in file.tracks.unwrap_or_default() {
            if entry.id.trim().is_empty() {
                return Err(invalid("track with an empty id".to_string()));
            }
            if !seen.insert(entry.id.clone()) {
                return Err(invalid(format!("duplicate track id '{}'", entry.id)));
            }
            let source = if Path::new(&entry.source).is_absolute() {
                entry.source
            } else {
                audio_dir.join(&entry.source).to_string_lossy().into_owned()
            };
            tracks.push(Track::new(entry.id, entry.name, source));
        }

        let mut builtin = BTreeMap::new();
        for (key, entry) in file.presets.unwrap_or_default() {
            if let Some(unknown) = entry.sounds.keys().find(|id| !seen.contains(*id)) {
                return Err(invalid(format!(
                    "preset '{}' references unknown track '{}'",
                    key, unknown
                )));
            }
            let sounds = entry
                .sounds
                .into_iter()
                .map(|(id, v)| (TrackId::from(id), Volume::new(v)));
            let preset = Preset::new(PresetId::new(key.clone()), entry.name, sounds);
            builtin.insert(key, preset);
        }

        let data_dir = file.storage.data_dir.unwrap_or_else(default_data_dir);
        let presets_key = file
            .storage
            .presets_key
            .filter(|k| !k.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PRESETS_KEY.to_string());

        Ok(Config {
            settings,
            audio_dir,
            data_dir,
            presets_key,
            tracks,
            builtin,
            loaded_from,
        })
    }
}

/// `<config dir>/ambient-mixer/config.toml`
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from(".ambient-mixer"))
}
