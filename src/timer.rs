//! Countdown Timer
//!
//! Single-shot countdown ticking once per second. The timer does not own a
//! clock: whoever drives it calls [`CountdownTimer::tick`] with the token it
//! got when the countdown started. Starting or stopping bumps the generation,
//! so ticks scheduled for a superseded countdown are ignored.

use std::fmt;

use log::{debug, info};

/// Countdown state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimerState {
    pub total_seconds: u64,
    pub remaining_seconds: u64,
    pub running: bool,
}

impl TimerState {
    /// Remaining time as (minutes, seconds)
    pub fn remaining(&self) -> (u64, u64) {
        (self.remaining_seconds / 60, self.remaining_seconds % 60)
    }
}

/// Identifies one countdown. Ticks carrying an older token are stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken(u64);

impl fmt::Display for TimerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

/// Signal emitted by the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    Tick { minutes: u64, seconds: u64 },
    Completed,
}

impl TimerEvent {
    fn tick(remaining_seconds: u64) -> Self {
        TimerEvent::Tick {
            minutes: remaining_seconds / 60,
            seconds: remaining_seconds % 60,
        }
    }
}

/// Idle → Running → {Completed, Idle}
#[derive(Debug, Default)]
pub struct CountdownTimer {
    state: TimerState,
    generation: u64,
}

impl CountdownTimer {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // State Queries
    // ========================================================================

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state.running
    }

    /// Token of the running countdown, `None` when idle.
    pub fn token(&self) -> Option<TimerToken> {
        self.state.running.then_some(TimerToken(self.generation))
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Start a countdown of `minutes`, replacing any running one.
    ///
    /// The replaced countdown never completes. `minutes <= 0` is [`stop`].
    ///
    /// [`stop`]: CountdownTimer::stop
    pub fn start(&mut self, minutes: i64) -> Vec<TimerEvent> {
        if minutes <= 0 {
            return self.stop();
        }

        let total = (minutes as u64).saturating_mul(60);
        self.generation += 1;
        self.state = TimerState {
            total_seconds: total,
            remaining_seconds: total,
            running: true,
        };
        info!("Timer started: {} minutes", minutes);

        vec![TimerEvent::tick(total)]
    }

    /// One second elapsed for the countdown identified by `token`.
    pub fn tick(&mut self, token: TimerToken) -> Vec<TimerEvent> {
        if !self.state.running || token.0 != self.generation {
            debug!("Ignoring stale tick for {}", token);
            return Vec::new();
        }

        self.state.remaining_seconds = self.state.remaining_seconds.saturating_sub(1);
        let mut events = vec![TimerEvent::tick(self.state.remaining_seconds)];

        if self.state.remaining_seconds == 0 {
            self.generation += 1;
            self.state = TimerState::default();
            info!("Timer completed");
            events.push(TimerEvent::Completed);
        }

        events
    }

    /// Cancel any countdown and report a zero tick. Never completes.
    pub fn stop(&mut self) -> Vec<TimerEvent> {
        if self.state.running {
            self.generation += 1;
            info!("Timer stopped");
        }
        self.state = TimerState::default();

        vec![TimerEvent::tick(0)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completions(events: &[TimerEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, TimerEvent::Completed))
            .count()
    }

    #[test]
    fn test_initial_state() {
        let timer = CountdownTimer::new();
        assert!(!timer.is_running());
        assert_eq!(timer.token(), None);
        assert_eq!(timer.state(), TimerState::default());
    }

    #[test]
    fn test_start_emits_full_time() {
        let mut timer = CountdownTimer::new();
        let events = timer.start(15);

        assert_eq!(events, vec![TimerEvent::Tick { minutes: 15, seconds: 0 }]);
        assert_eq!(timer.state().total_seconds, 900);
        assert_eq!(timer.state().remaining_seconds, 900);
        assert!(timer.is_running());
    }

    #[test]
    fn test_one_minute_completes_exactly_once() {
        let mut timer = CountdownTimer::new();
        timer.start(1);
        let token = timer.token().unwrap();

        let mut completed = 0;
        for second in 1..=60 {
            let events = timer.tick(token);
            completed += completions(&events);
            if second == 1 {
                assert_eq!(events[0], TimerEvent::Tick { minutes: 0, seconds: 59 });
            }
        }

        assert_eq!(completed, 1);
        assert_eq!(timer.state().remaining_seconds, 0);
        assert!(!timer.is_running());

        // Further ticks of the finished countdown do nothing
        assert!(timer.tick(token).is_empty());
    }

    #[test]
    fn test_stop_mid_countdown_never_completes() {
        let mut timer = CountdownTimer::new();
        timer.start(1);
        let token = timer.token().unwrap();

        let mut completed = 0;
        for _ in 0..30 {
            completed += completions(&timer.tick(token));
        }
        assert_eq!(timer.stop(), vec![TimerEvent::Tick { minutes: 0, seconds: 0 }]);
        for _ in 0..60 {
            completed += completions(&timer.tick(token));
        }

        assert_eq!(completed, 0);
        assert!(!timer.is_running());
    }

    #[test]
    fn test_stop_when_idle_is_noop() {
        let mut timer = CountdownTimer::new();
        timer.stop();
        timer.stop();
        assert_eq!(timer.state(), TimerState::default());
    }

    #[test]
    fn test_restart_invalidates_old_token() {
        let mut timer = CountdownTimer::new();
        timer.start(1);
        let old = timer.token().unwrap();

        timer.start(2);
        let new = timer.token().unwrap();
        assert_ne!(old, new);

        assert!(timer.tick(old).is_empty());
        assert_eq!(timer.state().remaining_seconds, 120);

        let events = timer.tick(new);
        assert_eq!(events, vec![TimerEvent::Tick { minutes: 1, seconds: 59 }]);
    }

    #[test]
    fn test_non_positive_minutes_stops() {
        let mut timer = CountdownTimer::new();
        timer.start(5);

        assert_eq!(timer.start(0), vec![TimerEvent::Tick { minutes: 0, seconds: 0 }]);
        assert!(!timer.is_running());

        timer.start(-3);
        assert!(!timer.is_running());
    }
}
