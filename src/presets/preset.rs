//! Preset types

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::engine::Volume;
use crate::tracks::TrackId;

/// Prefix of generated custom preset ids.
pub const CUSTOM_ID_PREFIX: &str = "custom_";

/// Identifier of a stored preset (`custom_<millis>` for custom presets, the
/// catalog key for built-in ones).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PresetId(String);

impl PresetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub(crate) fn custom(millis: i64) -> Self {
        Self(format!("{}{}", CUSTOM_ID_PREFIX, millis))
    }

    /// Millisecond token of a generated custom id
    pub fn custom_millis(&self) -> Option<i64> {
        self.0.strip_prefix(CUSTOM_ID_PREFIX)?.parse().ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Sort key putting generated ids first, by their millisecond token.
    pub fn creation_key(&self) -> (bool, i64, &str) {
        let millis = self.custom_millis();
        (millis.is_none(), millis.unwrap_or(0), &self.0)
    }
}

impl fmt::Display for PresetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for PresetId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PresetId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A named mix: the volume of every track that is part of it.
///
/// Only tracks above zero belong to a mix. The id is the key the preset is
/// stored under and is not part of the serialized record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    #[serde(skip)]
    pub id: PresetId,
    pub name: String,
    pub sounds: BTreeMap<TrackId, Volume>,
}

impl Preset {
    /// Build a preset, dropping silent tracks.
    pub fn new(
        id: PresetId,
        name: impl Into<String>,
        volumes: impl IntoIterator<Item = (TrackId, Volume)>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            sounds: volumes.into_iter().filter(|(_, v)| !v.is_silent()).collect(),
        }
    }
}

/// Which catalog a preset is loaded from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PresetKey {
    /// Shipped with the configuration, read-only
    Builtin(String),
    /// User-created, persisted
    Custom(PresetId),
}

impl PresetKey {
    pub fn as_str(&self) -> &str {
        match self {
            PresetKey::Builtin(key) => key,
            PresetKey::Custom(id) => id.as_str(),
        }
    }
}

impl fmt::Display for PresetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PresetKey::Builtin(key) => write!(f, "{}", key),
            PresetKey::Custom(id) => write!(f, "{} (custom)", id),
        }
    }
}
