//! Track catalog and live handles
//!
//! Tracks are registered once at startup and never removed. A track whose
//! source fails to load stays registered without a handle: it is inert and can
//! never play, but every operation on it still answers.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::device::{LoadError, PlaybackDevice};

/// Stable, unique identifier of a track (e.g. `"rain"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for TrackId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TrackId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for TrackId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A loopable sound in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    /// Display name
    pub name: String,
    /// Source reference handed to the playback device
    pub source: String,
}

impl Track {
    pub fn new(id: impl Into<TrackId>, name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            source: source.into(),
        }
    }
}

/// A registered track together with its playback handle.
#[derive(Debug)]
pub struct TrackSlot<H> {
    track: Track,
    handle: Result<H, LoadError>,
}

impl<H> TrackSlot<H> {
    pub fn track(&self) -> &Track {
        &self.track
    }

    pub fn id(&self) -> &TrackId {
        &self.track.id
    }

    /// The live handle, or the error that kept the track from loading.
    pub fn handle(&self) -> Result<&H, &LoadError> {
        self.handle.as_ref()
    }

    /// True when the source failed to load.
    pub fn is_inert(&self) -> bool {
        self.handle.is_err()
    }
}

/// Catalog of registered tracks in registration order.
#[derive(Debug)]
pub struct TrackRegistry<H> {
    slots: Vec<TrackSlot<H>>,
    index: HashMap<TrackId, usize>,
}

impl<H> TrackRegistry<H> {
    /// Register every track, loading its source on `device`.
    ///
    /// Load failures are logged and leave the track inert. A repeated id keeps
    /// the first registration.
    pub fn load<D>(tracks: impl IntoIterator<Item = Track>, device: &mut D) -> Self
    where
        D: PlaybackDevice<Handle = H>,
    {
        let mut registry = Self {
            slots: Vec::new(),
            index: HashMap::new(),
        };

        for track in tracks {
            if registry.index.contains_key(&track.id) {
                warn!("Ignoring duplicate track id '{}'", track.id);
                continue;
            }

            let handle = device.load(&track.source);
            match &handle {
                Ok(_) => debug!("Loaded track '{}' from {}", track.id, track.source),
                Err(e) => warn!("Could not load sound: {} ({}): {}", track.name, track.id, e),
            }

            registry.index.insert(track.id.clone(), registry.slots.len());
            registry.slots.push(TrackSlot { track, handle });
        }

        registry
    }

    /// Position of a track in registration order
    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn get(&self, id: &str) -> Option<&TrackSlot<H>> {
        self.position(id).map(|idx| &self.slots[idx])
    }

    pub fn slot(&self, idx: usize) -> &TrackSlot<H> {
        &self.slots[idx]
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackSlot<H>> {
        self.slots.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &TrackId> {
        self.slots.iter().map(|slot| &slot.track.id)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracks::{SimulatedDevice, SourceBehavior};

    fn catalog() -> Vec<Track> {
        vec![
            Track::new("rain", "Rain", "rain.wav"),
            Track::new("wind", "Wind", "wind.wav"),
            Track::new("fire", "Fireplace", "fire.wav"),
        ]
    }

    #[test]
    fn test_registration_order_and_lookup() {
        let mut device = SimulatedDevice::new();
        let registry = TrackRegistry::load(catalog(), &mut device);

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.position("wind"), Some(1));
        assert_eq!(registry.get("fire").map(|s| s.track().name.as_str()), Some("Fireplace"));
        assert!(registry.get("thunder").is_none());

        let ids: Vec<&str> = registry.ids().map(TrackId::as_str).collect();
        assert_eq!(ids, vec!["rain", "wind", "fire"]);
    }

    #[test]
    fn test_load_failure_leaves_track_inert() {
        let mut device = SimulatedDevice::new();
        device.set_behavior("wind.wav", SourceBehavior::FailLoad("missing file".to_string()));
        let registry = TrackRegistry::load(catalog(), &mut device);

        let wind = registry.get("wind").unwrap();
        assert!(wind.is_inert());
        assert_eq!(wind.handle().unwrap_err().reason, "missing file");
        assert!(!registry.get("rain").unwrap().is_inert());
    }

    #[test]
    fn test_duplicate_id_keeps_first() {
        let mut device = SimulatedDevice::new();
        let mut tracks = catalog();
        tracks.push(Track::new("rain", "Heavy Rain", "heavy.wav"));
        let registry = TrackRegistry::load(tracks, &mut device);

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.get("rain").unwrap().track().name, "Rain");
    }
}
