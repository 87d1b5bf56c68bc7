//! Schema versioning of the persisted custom-preset collection.
//!
//! Current layout:
//!
//! ```json
//! { "schema_version": 1, "presets": { "custom_1700000000000": { "name": "...", "sounds": { "rain": 60 } } } }
//! ```
//!
//! Version 0 is the unversioned layout: the bare `id -> preset` mapping.
//! Blobs are upgraded one version at a time on read; newer versions than
//! this build knows are rejected.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{MixerError, Result};
use crate::presets::preset::{Preset, PresetId};

/// Current schema version of the preset blob.
pub const CURRENT_SCHEMA_VERSION: u64 = 1;

/// Field holding the schema version.
const VERSION_FIELD: &str = "schema_version";

type MigrationFn = fn(Value) -> Result<Value>;

/// Migration from version `n` to `n + 1` lives at index `n`.
const MIGRATIONS: &[MigrationFn] = &[migrate_0_to_1];

#[derive(Serialize, Deserialize)]
struct Envelope {
    schema_version: u64,
    presets: BTreeMap<PresetId, Preset>,
}

/// Schema version of a decoded blob. Objects without a version field are
/// version 0.
pub fn schema_version(data: &Value) -> Result<u64> {
    match data.get(VERSION_FIELD) {
        None => Ok(0),
        Some(v) => v.as_u64().ok_or_else(|| MixerError::PresetDecode {
            reason: format!("invalid schema_version {}", v),
        }),
    }
}

/// Upgrade a blob to [`CURRENT_SCHEMA_VERSION`].
pub fn migrate(mut data: Value) -> Result<Value> {
    if !data.is_object() {
        return Err(MixerError::PresetDecode {
            reason: "expected a JSON object".to_string(),
        });
    }

    let mut version = schema_version(&data)?;
    if version > CURRENT_SCHEMA_VERSION {
        return Err(MixerError::PresetDecode {
            reason: format!(
                "schema version {} is newer than supported version {}",
                version, CURRENT_SCHEMA_VERSION
            ),
        });
    }

    while version < CURRENT_SCHEMA_VERSION {
        data = MIGRATIONS[version as usize](data)?;
        version += 1;
    }

    Ok(data)
}

/// Decode a persisted blob into the preset collection.
///
/// Ids are restored from the map keys and silent entries are dropped.
pub fn decode(blob: &str) -> Result<BTreeMap<PresetId, Preset>> {
    let data: Value = serde_json::from_str(blob).map_err(|e| MixerError::PresetDecode {
        reason: e.to_string(),
    })?;
    let envelope: Envelope =
        serde_json::from_value(migrate(data)?).map_err(|e| MixerError::PresetDecode {
            reason: e.to_string(),
        })?;

    Ok(envelope
        .presets
        .into_iter()
        .map(|(id, mut preset)| {
            preset.id = id.clone();
            preset.sounds.retain(|_, v| !v.is_silent());
            (id, preset)
        })
        .collect())
}

/// Encode the preset collection at the current schema version.
pub fn encode(presets: &BTreeMap<PresetId, Preset>) -> Result<String> {
    let envelope = json!({
        "schema_version": CURRENT_SCHEMA_VERSION,
        "presets": presets,
    });
    Ok(serde_json::to_string_pretty(&envelope)?)
}

/// Wrap the bare mapping in a versioned envelope.
fn migrate_0_to_1(data: Value) -> Result<Value> {
    Ok(json!({
        "schema_version": 1,
        "presets": data,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Volume;
    use crate::tracks::TrackId;

    #[test]
    fn test_legacy_mapping_is_migrated() {
        let blob = r#"{"custom_1700000000000": {"name": "Storm", "sounds": {"rain": 80, "thunder": 40}}}"#;
        let presets = decode(blob).unwrap();

        let storm = &presets["custom_1700000000000"];
        assert_eq!(storm.id.as_str(), "custom_1700000000000");
        assert_eq!(storm.name, "Storm");
        assert_eq!(storm.sounds["rain"], Volume::new(80));
    }

    #[test]
    fn test_empty_legacy_mapping() {
        assert!(decode("{}").unwrap().is_empty());
    }

    #[test]
    fn test_encode_then_decode_current_version() {
        let mut presets = BTreeMap::new();
        let id = PresetId::custom(42);
        presets.insert(
            id.clone(),
            Preset::new(id.clone(), "Calm", [(TrackId::from("rain"), Volume::new(25))]),
        );

        let blob = encode(&presets).unwrap();
        let value: Value = serde_json::from_str(&blob).unwrap();
        assert_eq!(schema_version(&value).unwrap(), CURRENT_SCHEMA_VERSION);
        assert_eq!(decode(&blob).unwrap(), presets);
    }

    #[test]
    fn test_silent_entries_dropped_on_read() {
        let blob = r#"{"schema_version": 1, "presets": {"custom_1": {"name": "A", "sounds": {"rain": 0, "wind": 10}}}}"#;
        let presets = decode(blob).unwrap();
        assert_eq!(presets["custom_1"].sounds.len(), 1);
    }

    #[test]
    fn test_newer_version_is_rejected() {
        let err = decode(r#"{"schema_version": 99, "presets": {}}"#).unwrap_err();
        assert_eq!(err.error_code(), "PRESET_DECODE_ERROR");
    }

    #[test]
    fn test_malformed_blobs_are_rejected() {
        for blob in ["not json", "[1, 2]", r#"{"custom_1": {"name": 5}}"#] {
            assert!(decode(blob).is_err(), "blob {:?}", blob);
        }
    }
}
