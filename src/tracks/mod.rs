//! Track Registry Module
//!
//! The catalog of loopable tracks and the playback capability they run on:
//! - Track identity and registration
//! - The playback device seam
//! - A simulated device for headless use and tests

pub mod device;
pub mod registry;
pub mod simulated;

pub use device::{LoadError, PlaybackDevice, PlaybackError, StartStatus, StartTicket};
pub use registry::{Track, TrackId, TrackRegistry, TrackSlot};
pub use simulated::{SimHandle, SimulatedDevice, SourceBehavior};
