//! Session-state gating for inbound packets.
//!
//! Rules are evaluated top-down and the first match wins:
//!
//! 1. ping is always admitted
//! 2. token request is admitted only while waiting for a token
//! 3. a banned session is closed, whatever else it sends
//! 4. login request is admitted only while waiting for login
//! 5. character selection is admitted only while picking a character
//! 6. anything else requires an active session
//!
//! Rule 2 precedes rule 3, so a banned session may still request a token.

use crate::opcode::{Opcode, SpecialOpcodes};
use crate::session::SessionState;

/// Result of the admission check for one packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Hand the packet on to interception and the handler
    Allow,
    /// Discard silently
    Drop,
    /// Close the session, then discard
    Close,
}

impl Admission {
    fn allow_if(condition: bool) -> Self {
        if condition {
            Admission::Allow
        } else {
            Admission::Drop
        }
    }
}

/// Pure decision function from `(opcode, state)` to an [`Admission`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdmissionPolicy {
    special: SpecialOpcodes,
}

impl AdmissionPolicy {
    pub fn new(special: SpecialOpcodes) -> Self {
        Self { special }
    }

    pub fn special_opcodes(&self) -> &SpecialOpcodes {
        &self.special
    }

    pub fn decide(&self, opcode: Opcode, state: SessionState) -> Admission {
        let special = &self.special;

        if opcode == special.ping {
            Admission::Allow
        } else if opcode == special.token {
            Admission::allow_if(state == SessionState::WaitingForToken)
        } else if state == SessionState::AccountBanned {
            Admission::Close
        } else if opcode == special.login {
            Admission::allow_if(state == SessionState::WaitingForLogin)
        } else if opcode == special.character_selection {
            Admission::allow_if(state == SessionState::PickingCharacter)
        } else {
            Admission::allow_if(state == SessionState::Active)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATES: [SessionState; 6] = [
        SessionState::Inactive,
        SessionState::WaitingForToken,
        SessionState::WaitingForLogin,
        SessionState::PickingCharacter,
        SessionState::Active,
        SessionState::AccountBanned,
    ];

    const ORDINARY: Opcode = Opcode(4242);

    fn policy() -> AdmissionPolicy {
        AdmissionPolicy::default()
    }

    #[test]
    fn test_ping_allowed_in_every_state() {
        let ping = policy().special_opcodes().ping;
        for state in ALL_STATES {
            assert_eq!(policy().decide(ping, state), Admission::Allow, "state {state}");
        }
    }

    #[test]
    fn test_token_request_only_while_waiting_for_token() {
        let token = policy().special_opcodes().token;
        for state in ALL_STATES {
            let expected = if state == SessionState::WaitingForToken {
                Admission::Allow
            } else {
                Admission::Drop
            };
            assert_eq!(policy().decide(token, state), expected, "state {state}");
        }
    }

    #[test]
    fn test_banned_session_token_request_is_dropped_not_closed() {
        let token = policy().special_opcodes().token;
        assert_eq!(policy().decide(token, SessionState::AccountBanned), Admission::Drop);
    }

    #[test]
    fn test_banned_session_closed_for_everything_else() {
        let special = *policy().special_opcodes();
        for opcode in [special.login, special.character_selection, ORDINARY] {
            assert_eq!(policy().decide(opcode, SessionState::AccountBanned), Admission::Close);
        }
    }

    #[test]
    fn test_login_and_character_selection_gates() {
        let special = *policy().special_opcodes();
        assert_eq!(policy().decide(special.login, SessionState::WaitingForLogin), Admission::Allow);
        assert_eq!(policy().decide(special.login, SessionState::Active), Admission::Drop);
        assert_eq!(
            policy().decide(special.character_selection, SessionState::PickingCharacter),
            Admission::Allow
        );
        assert_eq!(
            policy().decide(special.character_selection, SessionState::Active),
            Admission::Drop
        );
    }

    #[test]
    fn test_ordinary_opcodes_require_active() {
        for state in ALL_STATES {
            let expected = match state {
                SessionState::Active => Admission::Allow,
                SessionState::AccountBanned => Admission::Close,
                _ => Admission::Drop,
            };
            assert_eq!(policy().decide(ORDINARY, state), expected, "state {state}");
        }
    }

    #[test]
    fn test_custom_special_opcodes() {
        let policy = AdmissionPolicy::new(SpecialOpcodes {
            ping: Opcode(1),
            token: Opcode(2),
            login: Opcode(3),
            character_selection: Opcode(4),
        });
        assert_eq!(policy.decide(Opcode(1), SessionState::Inactive), Admission::Allow);
        // The default ping opcode is ordinary under this table.
        assert_eq!(policy.decide(Opcode(7), SessionState::Inactive), Admission::Drop);
    }
}
