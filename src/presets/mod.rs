//! Presets
//!
//! Named mixes. Built-in presets come from configuration and are read-only;
//! custom presets are created from the live mix and persisted through a
//! [`KeyValueStore`].

pub mod migration;
pub mod persistence;
pub mod preset;
pub mod store;

pub use migration::CURRENT_SCHEMA_VERSION;
pub use persistence::{FileStore, KeyValueStore, MemoryStore};
pub use preset::{Preset, PresetId, PresetKey, CUSTOM_ID_PREFIX};
pub use store::{PresetStore, DEFAULT_PRESETS_KEY};
