//! Custom preset store
//!
//! The in-memory collection is the source of truth for the session. Every
//! mutation is persisted before it is reported as successful; a failed write
//! is rolled back in memory so the two never disagree.
//!
//! The persisted blob is a best-effort cache: if it cannot be read or decoded
//! the store starts empty and keeps the raw blob aside under `<key>.corrupt`.
//! When even that fails the store stays usable for reading but refuses to
//! overwrite the key for the rest of the session.

use std::collections::BTreeMap;

use chrono::Utc;
use log::{info, warn};

use crate::engine::Volume;
use crate::error::{MixerError, Result};
use crate::presets::migration;
use crate::presets::persistence::KeyValueStore;
use crate::presets::preset::{Preset, PresetId};
use crate::tracks::TrackId;

/// Key holding the serialized custom-preset collection.
pub const DEFAULT_PRESETS_KEY: &str = "ambientMixerPresets";

/// Suffix of the key a malformed blob is moved to.
const CORRUPT_SUFFIX: &str = ".corrupt";

/// Persisted collection of user-created presets.
pub struct PresetStore<S: KeyValueStore> {
    backend: S,
    key: String,
    presets: BTreeMap<PresetId, Preset>,
    last_millis: i64,
    locked: bool,
}

impl<S: KeyValueStore> PresetStore<S> {
    /// Open the store under [`DEFAULT_PRESETS_KEY`].
    pub fn open(backend: S) -> Self {
        Self::open_with_key(backend, DEFAULT_PRESETS_KEY)
    }

    /// Open the store under a custom key, loading whatever is persisted.
    pub fn open_with_key(mut backend: S, key: impl Into<String>) -> Self {
        let key = key.into();

        let mut locked = false;
        let presets = match backend.get(&key).and_then(|blob| match blob {
            Some(blob) => migration::decode(&blob),
            None => Ok(BTreeMap::new()),
        }) {
            Ok(presets) => presets,
            Err(e) => {
                warn!("Discarding stored presets: {}", e);
                locked = !Self::keep_aside(&mut backend, &key);
                BTreeMap::new()
            }
        };

        let last_millis = presets
            .keys()
            .filter_map(PresetId::custom_millis)
            .max()
            .unwrap_or(0);
        info!("Loaded {} custom presets", presets.len());

        Self {
            backend,
            key,
            presets,
            last_millis,
            locked,
        }
    }

    /// Copy the unusable blob under `key` out of the way. Returns false if it
    /// could not be preserved.
    fn keep_aside(backend: &mut S, key: &str) -> bool {
        let aside = format!("{}{}", key, CORRUPT_SUFFIX);
        match backend.copy(key, &aside) {
            Ok(_) => {
                info!("Kept unreadable presets under '{}'", aside);
                true
            }
            Err(e) => {
                warn!(
                    "Could not keep presets under '{}': {}; '{}' will not be overwritten",
                    aside, e, key
                );
                false
            }
        }
    }

    /// Store the non-silent part of `volumes` as a new preset named `name`.
    ///
    /// Names are unique (exact, case-sensitive match). The returned id is
    /// unique within the store.
    pub fn snapshot(
        &mut self,
        name: &str,
        volumes: impl IntoIterator<Item = (TrackId, Volume)>,
    ) -> Result<PresetId> {
        if self.exists_by_name(name) {
            return Err(MixerError::DuplicateName {
                name: name.to_string(),
            });
        }

        let id = self.next_id();
        let preset = Preset::new(id.clone(), name, volumes);
        self.presets.insert(id.clone(), preset);

        if let Err(e) = self.persist() {
            self.presets.remove(&id);
            return Err(e);
        }

        info!("Preset \"{}\" saved with id {}", name, id);
        Ok(id)
    }

    /// Look a preset up by id.
    pub fn recall(&self, id: &str) -> Result<&Preset> {
        self.presets
            .get(id)
            .ok_or_else(|| MixerError::PresetNotFound { key: id.to_string() })
    }

    /// Delete a preset. Returns whether it existed.
    pub fn delete(&mut self, id: &str) -> Result<bool> {
        let Some((id, preset)) = self.presets.remove_entry(id) else {
            return Ok(false);
        };

        if let Err(e) = self.persist() {
            self.presets.insert(id, preset);
            return Err(e);
        }

        info!("Preset {} deleted", id);
        Ok(true)
    }

    pub fn exists_by_name(&self, name: &str) -> bool {
        self.presets.values().any(|p| p.name == name)
    }

    /// Presets in creation order
    pub fn iter(&self) -> impl Iterator<Item = &Preset> {
        let mut presets: Vec<&Preset> = self.presets.values().collect();
        presets.sort_by(|a, b| a.id.creation_key().cmp(&b.id.creation_key()));
        presets.into_iter()
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    /// True when the stored blob could not be preserved and writes are refused.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    fn persist(&mut self) -> Result<()> {
        if self.locked {
            return Err(MixerError::PresetsLocked {
                key: self.key.clone(),
            });
        }
        let blob = migration::encode(&self.presets)?;
        self.backend.set(&self.key, &blob)
    }

    /// Millisecond timestamp token, bumped past the last issued one so ids
    /// stay monotonic and unique even within one millisecond.
    fn next_id(&mut self) -> PresetId {
        let mut millis = Utc::now().timestamp_millis().max(self.last_millis + 1);
        while self.presets.contains_key(PresetId::custom(millis).as_str()) {
            millis += 1;
        }
        self.last_millis = millis;
        PresetId::custom(millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets::persistence::{FileStore, MemoryStore};
    use tempfile::TempDir;

    /// Backend whose writes can be switched off.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        fail_writes: bool,
    }

    /// Backend whose reads and copies always fail.
    #[derive(Default)]
    struct UnreadableStore {
        writes: usize,
    }

    impl KeyValueStore for UnreadableStore {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(MixerError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "permission denied",
            )))
        }

        fn set(&mut self, _key: &str, _blob: &str) -> Result<()> {
            self.writes += 1;
            Ok(())
        }
    }

    impl KeyValueStore for FlakyStore {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.inner.get(key)
        }

        fn set(&mut self, key: &str, blob: &str) -> Result<()> {
            if self.fail_writes {
                return Err(MixerError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "disk full",
                )));
            }
            self.inner.set(key, blob)
        }
    }

    fn mix(entries: &[(&str, i64)]) -> Vec<(TrackId, Volume)> {
        entries
            .iter()
            .map(|(id, v)| (TrackId::from(*id), Volume::new(*v)))
            .collect()
    }

    #[test]
    fn test_snapshot_then_recall() {
        let mut store = PresetStore::open(MemoryStore::new());
        let id = store
            .snapshot("Rain", mix(&[("rain", 80), ("wind", 0), ("thunder", 40)]))
            .unwrap();

        let preset = store.recall(id.as_str()).unwrap();
        assert_eq!(preset.name, "Rain");
        assert_eq!(preset.sounds.len(), 2);
        assert_eq!(preset.sounds["rain"], Volume::new(80));
        assert_eq!(preset.sounds["thunder"], Volume::new(40));
        assert!(!preset.sounds.contains_key("wind"));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut store = PresetStore::open(MemoryStore::new());
        store.snapshot("X", mix(&[("rain", 10)])).unwrap();

        let err = store.snapshot("X", mix(&[("wind", 20)])).unwrap_err();
        assert!(matches!(err, MixerError::DuplicateName { ref name } if name == "X"));
        assert_eq!(store.iter().filter(|p| p.name == "X").count(), 1);

        // Case-sensitive
        assert!(store.snapshot("x", mix(&[("wind", 20)])).is_ok());
    }

    #[test]
    fn test_ids_are_unique_and_monotonic() {
        let mut store = PresetStore::open(MemoryStore::new());
        let ids: Vec<PresetId> = (0..5)
            .map(|i| store.snapshot(&format!("P{}", i), mix(&[("rain", 10)])).unwrap())
            .collect();

        for pair in ids.windows(2) {
            assert!(pair[0].custom_millis().unwrap() < pair[1].custom_millis().unwrap());
        }
    }

    #[test]
    fn test_recall_missing() {
        let store = PresetStore::open(MemoryStore::new());
        let err = store.recall("custom_1").unwrap_err();
        assert_eq!(err.error_code(), "PRESET_NOT_FOUND");
    }

    #[test]
    fn test_delete() {
        let mut store = PresetStore::open(MemoryStore::new());
        let id = store.snapshot("Calm", mix(&[("rain", 10)])).unwrap();

        assert!(store.delete(id.as_str()).unwrap());
        assert!(!store.delete(id.as_str()).unwrap());
        assert!(!store.exists_by_name("Calm"));
    }

    #[test]
    fn test_persisted_across_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let id = {
            let mut store = PresetStore::open(FileStore::new(temp_dir.path()));
            store.snapshot("Night", mix(&[("crickets", 55)])).unwrap()
        };

        let store = PresetStore::open(FileStore::new(temp_dir.path()));
        assert_eq!(store.len(), 1);
        assert_eq!(store.recall(id.as_str()).unwrap().name, "Night");
    }

    #[test]
    fn test_reopen_continues_after_highest_id() {
        let mut backend = MemoryStore::new();
        backend
            .set(
                DEFAULT_PRESETS_KEY,
                r#"{"custom_99999999999999": {"name": "Future", "sounds": {"rain": 5}}}"#,
            )
            .unwrap();

        let mut store = PresetStore::open(backend);
        let id = store.snapshot("Next", mix(&[("rain", 5)])).unwrap();
        assert_eq!(id.custom_millis(), Some(100_000_000_000_000));

        let names: Vec<&str> = store.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Future", "Next"]);
    }

    #[test]
    fn test_malformed_blob_starts_empty_and_is_kept_aside() {
        let mut backend = MemoryStore::new();
        backend.set(DEFAULT_PRESETS_KEY, "{broken").unwrap();

        let mut store = PresetStore::open(backend);
        assert!(store.is_empty());
        assert_eq!(
            store.backend().get("ambientMixerPresets.corrupt").unwrap().as_deref(),
            Some("{broken")
        );

        store.snapshot("Fresh", mix(&[("rain", 30)])).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_non_utf8_file_is_kept_aside_before_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FileStore::new(temp_dir.path());
        let original = b"{\"custom_1\": {\"name\": \"Caf\xe9\", \"sounds\": {}}}".to_vec();
        std::fs::write(backend.path_for(DEFAULT_PRESETS_KEY), &original).unwrap();

        let mut store = PresetStore::open(backend);
        assert!(store.is_empty());
        assert!(!store.is_locked());

        store.snapshot("New", mix(&[("rain", 10)])).unwrap();

        let aside = store.backend().path_for("ambientMixerPresets.corrupt");
        assert_eq!(std::fs::read(aside).unwrap(), original);
        let reopened = PresetStore::open(FileStore::new(temp_dir.path()));
        assert_eq!(reopened.len(), 1);
    }

    #[test]
    fn test_unreadable_blob_locks_the_store() {
        let mut store = PresetStore::open(UnreadableStore::default());
        assert!(store.is_locked());

        let err = store.snapshot("New", mix(&[("rain", 10)])).unwrap_err();
        assert_eq!(err.error_code(), "PRESETS_LOCKED");
        assert!(store.is_empty());
        assert_eq!(store.backend().writes, 0);
    }

    #[test]
    fn test_failed_write_rolls_back() {
        let mut store = PresetStore::open(FlakyStore::default());
        let kept = store.snapshot("Kept", mix(&[("rain", 30)])).unwrap();

        store.backend.fail_writes = true;
        assert!(store.snapshot("Lost", mix(&[("wind", 30)])).is_err());
        assert!(!store.exists_by_name("Lost"));

        assert!(store.delete(kept.as_str()).is_err());
        assert!(store.recall(kept.as_str()).is_ok());
    }
}
