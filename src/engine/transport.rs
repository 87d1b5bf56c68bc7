//! Per-track play/pause state machine
//!
//! Starting a track can be asynchronous, so a track moves through an
//! intermediate `Starting` state:
//!
//! ```text
//! Paused --begin_start--> Starting --confirm_start--> Playing
//!    ^                       |                          |
//!    +------ fail_start -----+                          |
//!    +------------------ pause -------------------------+
//! ```
//!
//! Each start and each pause bumps a generation counter. Only a resolution
//! carrying the current generation can move `Starting` forward, so a start
//! that resolves after the user already paused the track is ignored.

use std::fmt;

/// Playback state of one track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayState {
    /// Not producing sound (default state)
    #[default]
    Paused,
    /// Start requested, outcome not yet known
    Starting,
    /// The track's handle is running
    Playing,
}

impl fmt::Display for PlayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayState::Paused => write!(f, "Paused"),
            PlayState::Starting => write!(f, "Starting"),
            PlayState::Playing => write!(f, "Playing"),
        }
    }
}

/// Play state plus the start generation of one track.
#[derive(Debug, Clone, Default)]
pub struct TrackTransport {
    state: PlayState,
    generation: u64,
}

impl TrackTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter `Starting` and return the generation of this start request.
    ///
    /// Callers only start paused tracks; a repeated call simply issues a newer
    /// generation and invalidates the previous one.
    pub fn begin_start(&mut self) -> u64 {
        self.generation += 1;
        self.state = PlayState::Starting;
        self.generation
    }

    /// A start succeeded. Returns false when `generation` is stale, in which
    /// case nothing changes.
    pub fn confirm_start(&mut self, generation: u64) -> bool {
        if self.state == PlayState::Starting && self.generation == generation {
            self.state = PlayState::Playing;
            true
        } else {
            false
        }
    }

    /// A start failed: roll back to `Paused`. Returns false when stale.
    pub fn fail_start(&mut self, generation: u64) -> bool {
        if self.state == PlayState::Starting && self.generation == generation {
            self.state = PlayState::Paused;
            true
        } else {
            false
        }
    }

    /// Pause from any state, cancelling a pending start.
    ///
    /// Returns true if the track was playing or starting.
    pub fn pause(&mut self) -> bool {
        let was_active = self.state != PlayState::Paused;
        if was_active {
            self.generation += 1;
            self.state = PlayState::Paused;
        }
        was_active
    }

    // ========================================================================
    // State Queries
    // ========================================================================

    pub fn is_playing(&self) -> bool {
        self.state == PlayState::Playing
    }

    pub fn is_starting(&self) -> bool {
        self.state == PlayState::Starting
    }

    pub fn is_paused(&self) -> bool {
        self.state == PlayState::Paused
    }

    pub fn state(&self) -> PlayState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_paused() {
        let transport = TrackTransport::new();
        assert!(transport.is_paused());
        assert!(!transport.is_playing());
        assert_eq!(transport.state(), PlayState::Paused);
    }

    #[test]
    fn test_start_then_confirm() {
        let mut transport = TrackTransport::new();
        let generation = transport.begin_start();
        assert!(transport.is_starting());

        assert!(transport.confirm_start(generation));
        assert!(transport.is_playing());
    }

    #[test]
    fn test_failed_start_rolls_back() {
        let mut transport = TrackTransport::new();
        let generation = transport.begin_start();

        assert!(transport.fail_start(generation));
        assert!(transport.is_paused());
    }

    #[test]
    fn test_pause_invalidates_pending_start() {
        let mut transport = TrackTransport::new();
        let generation = transport.begin_start();
        assert!(transport.pause());

        assert!(!transport.confirm_start(generation));
        assert!(transport.is_paused());
    }

    #[test]
    fn test_restart_invalidates_older_generation() {
        let mut transport = TrackTransport::new();
        let first = transport.begin_start();
        transport.pause();
        let second = transport.begin_start();

        assert!(!transport.confirm_start(first));
        assert!(transport.is_starting());
        assert!(transport.confirm_start(second));
        assert!(transport.is_playing());
    }

    #[test]
    fn test_pause_is_idempotent() {
        let mut transport = TrackTransport::new();
        assert!(!transport.pause());
        let generation = transport.generation();
        assert!(!transport.pause());
        assert_eq!(transport.generation(), generation);
    }

    #[test]
    fn test_stale_failure_does_not_touch_playing_track() {
        let mut transport = TrackTransport::new();
        let first = transport.begin_start();
        transport.pause();
        let second = transport.begin_start();
        transport.confirm_start(second);

        assert!(!transport.fail_start(first));
        assert!(transport.is_playing());
    }
}
