//! Race configuration and state machine.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RaceConfig
// ---------------------------------------------------------------------------

/// Configuration for a race session.
///
/// Missing fields fall back to the defaults when deserialized, so a config
/// file only needs to name what it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceConfig {
    /// Maze height in cells (1..=255).
    pub rows: u8,

    /// Maze width in cells (1..=255).
    pub columns: u8,

    /// How long both players together have to send `ready` after the maze
    /// was delivered. The deadline is shared, not per player.
    pub ready_timeout: Duration,

    /// How long the race may go without a message from either player.
    /// Every message restarts the window.
    pub inactivity_timeout: Duration,

    /// How long a single packet may take to be written to a player. A
    /// player who stops reading is dropped once this runs out.
    pub send_timeout: Duration,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            rows: 10,
            columns: 20,
            ready_timeout: Duration::from_secs(10),
            inactivity_timeout: Duration::from_secs(10),
            send_timeout: Duration::from_secs(5),
        }
    }
}

// ---------------------------------------------------------------------------
// RaceState
// ---------------------------------------------------------------------------

/// The lifecycle state of a race.
///
/// The normal path is strictly ordered:
///
/// ```text
/// Pairing → AwaitingReady → Racing → Finished
/// ```
///
/// - **Pairing**: two players were taken from the queue and the maze is
///   being delivered.
/// - **AwaitingReady**: both have the maze; waiting for each `ready`.
/// - **Racing**: `start` was sent; moves are being arbitrated.
/// - **Finished**: someone won, or the race was cut short. Any earlier
///   state may jump straight here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RaceState {
    Pairing,
    AwaitingReady,
    Racing,
    Finished,
}

impl RaceState {
    /// Returns `true` while players may still send game messages.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::AwaitingReady | Self::Racing)
    }

    /// The next state on the normal path, or `None` once finished.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Pairing => Some(Self::AwaitingReady),
            Self::AwaitingReady => Some(Self::Racing),
            Self::Racing => Some(Self::Finished),
            Self::Finished => None,
        }
    }

    /// Returns `true` if moving to `target` is allowed: the next state in
    /// order, or `Finished` from anywhere before it.
    pub fn can_transition_to(self, target: Self) -> bool {
        self.next() == Some(target) || (target == Self::Finished && self != Self::Finished)
    }
}

impl fmt::Display for RaceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pairing => write!(f, "Pairing"),
            Self::AwaitingReady => write!(f, "AwaitingReady"),
            Self::Racing => write!(f, "Racing"),
            Self::Finished => write!(f, "Finished"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_race_state_next_follows_strict_order() {
        assert_eq!(RaceState::Pairing.next(), Some(RaceState::AwaitingReady));
        assert_eq!(RaceState::AwaitingReady.next(), Some(RaceState::Racing));
        assert_eq!(RaceState::Racing.next(), Some(RaceState::Finished));
        assert_eq!(RaceState::Finished.next(), None);
    }

    #[test]
    fn test_race_state_can_transition_to() {
        assert!(RaceState::Pairing.can_transition_to(RaceState::AwaitingReady));
        assert!(!RaceState::Pairing.can_transition_to(RaceState::Racing));
        assert!(RaceState::Pairing.can_transition_to(RaceState::Finished));
        assert!(RaceState::AwaitingReady.can_transition_to(RaceState::Finished));
        assert!(!RaceState::Finished.can_transition_to(RaceState::Finished));
        assert!(!RaceState::Racing.can_transition_to(RaceState::AwaitingReady));
    }

    #[test]
    fn test_race_state_is_active() {
        assert!(!RaceState::Pairing.is_active());
        assert!(RaceState::AwaitingReady.is_active());
        assert!(RaceState::Racing.is_active());
        assert!(!RaceState::Finished.is_active());
    }

    #[test]
    fn test_race_config_defaults() {
        let config = RaceConfig::default();
        assert_eq!((config.rows, config.columns), (10, 20));
        assert_eq!(config.ready_timeout, Duration::from_secs(10));
        assert_eq!(config.inactivity_timeout, Duration::from_secs(10));
        assert_eq!(config.send_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_race_config_partial_json_keeps_defaults() {
        let config: RaceConfig = serde_json::from_str(r#"{ "rows": 1, "columns": 2 }"#).unwrap();
        assert_eq!((config.rows, config.columns), (1, 2));
        assert_eq!(config.inactivity_timeout, Duration::from_secs(10));
    }
}
