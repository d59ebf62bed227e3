use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use serde::Serialize;

/// Lifecycle of a bus connection.
///
/// `Disconnected -> Connecting -> Connected`, and back to `Disconnected` on
/// shutdown or a failed connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            Self::Disconnected => 0,
            Self::Connecting => 1,
            Self::Connected => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Connecting,
            2 => Self::Connected,
            _ => Self::Disconnected,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A [`ConnectionState`] that can be shared between tasks.
#[derive(Debug)]
pub struct AtomicConnectionState(AtomicU8);

impl AtomicConnectionState {
    pub fn new(state: ConnectionState) -> Self {
        Self(AtomicU8::new(state.to_u8()))
    }

    pub fn load(&self) -> ConnectionState {
        ConnectionState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn store(&self, state: ConnectionState) {
        self.0.store(state.to_u8(), Ordering::Release);
    }

    /// Moves from `current` to `new` only if the cell still holds `current`.
    ///
    /// On failure returns the state actually observed.
    pub fn transition(
        &self,
        current: ConnectionState,
        new: ConnectionState,
    ) -> Result<(), ConnectionState> {
        self.0
            .compare_exchange(
                current.to_u8(),
                new.to_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(|_| ())
            .map_err(ConnectionState::from_u8)
    }

    pub fn is_connected(&self) -> bool {
        self.load() == ConnectionState::Connected
    }
}

impl Default for AtomicConnectionState {
    fn default() -> Self {
        Self::new(ConnectionState::Disconnected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_disconnected() {
        let state = AtomicConnectionState::default();
        assert_eq!(state.load(), ConnectionState::Disconnected);
        assert!(!state.is_connected());
    }

    #[test]
    fn test_transition_succeeds_from_expected_state() {
        let state = AtomicConnectionState::default();

        state
            .transition(ConnectionState::Disconnected, ConnectionState::Connecting)
            .unwrap();
        state
            .transition(ConnectionState::Connecting, ConnectionState::Connected)
            .unwrap();

        assert!(state.is_connected());
    }

    #[test]
    fn test_transition_reports_observed_state() {
        let state = AtomicConnectionState::new(ConnectionState::Connected);

        let result = state.transition(ConnectionState::Disconnected, ConnectionState::Connecting);

        assert_eq!(result, Err(ConnectionState::Connected));
        assert!(state.is_connected());
    }

    #[test]
    fn test_serializes_lowercase() {
        let json = serde_json::to_string(&ConnectionState::Connecting).unwrap();
        assert_eq!(json, "\"connecting\"");
        assert_eq!(ConnectionState::Connected.to_string(), "connected");
    }
}
