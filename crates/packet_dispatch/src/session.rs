//! The view of a game session the dispatcher needs.
//!
//! The session state machine lives elsewhere; the dispatcher only reads the
//! current state and, for banned accounts, asks the session to close.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a session in its login state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    Inactive,
    WaitingForToken,
    WaitingForLogin,
    PickingCharacter,
    Active,
    AccountBanned,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Inactive => "INACTIVE",
            SessionState::WaitingForToken => "WAITING_FOR_TOKEN",
            SessionState::WaitingForLogin => "WAITING_FOR_LOGIN",
            SessionState::PickingCharacter => "PICKING_CHARACTER",
            SessionState::Active => "ACTIVE",
            SessionState::AccountBanned => "ACCOUNT_BANNED",
        };
        f.write_str(name)
    }
}

/// A long-lived client connection as seen by the dispatcher.
///
/// Implementations must be safe to share across transport threads, since
/// the same session may be dispatched concurrently.
pub trait GameSession: Send + Sync {
    /// Current state machine position.
    fn state(&self) -> SessionState;

    /// Closes the connection. Repeated calls must be harmless.
    fn close(&self);
}
