//! btok: the smart-token layer (STB 34.101.79)
//!
//! Three cooperating parts: the password attempt automaton that gates
//! authentication state, the CV certificate codec with chain validation
//! ([`cvc`]), and APDU secure messaging ([`sm`]). [`bauth`] adapts the BMQV
//! engine to the token/terminal role names.

pub mod cvc;
pub mod sm;
pub mod bauth;

/// PIN attempt counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinState {
    /// Three attempts left.
    Pin3,
    /// Two attempts left.
    Pin2,
    /// One attempt left.
    Pin1,
    /// Exhausted; only the PUK can restore.
    Pin0,
    /// Suspended until a successful PUK presentation.
    Suspended,
    /// Deactivated by the holder.
    Deactivated,
}

/// Authentication result of the automaton.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    None,
    Pin,
    Puk,
    Can,
}

/// Password attempt automaton.
///
/// Tracks the PIN counter, the PUK counter (nine presentations) and the
/// current authentication. Transition methods return `false` and leave the
/// state unchanged when the transition is illegal in the current state.
#[derive(Debug, Clone)]
pub struct PwdAutomaton {
    pin: PinState,
    puk_left: u8,
    auth: AuthState,
}

impl Default for PwdAutomaton {
    fn default() -> Self {
        Self::new()
    }
}

impl PwdAutomaton {
    pub fn new() -> Self {
        PwdAutomaton {
            pin: PinState::Pin3,
            puk_left: 9,
            auth: AuthState::None,
        }
    }

    pub fn pin_state(&self) -> PinState {
        self.pin
    }

    pub fn puk_left(&self) -> u8 {
        self.puk_left
    }

    pub fn auth(&self) -> AuthState {
        self.auth
    }

    /// Successful PIN presentation; needs at least one attempt left.
    pub fn pin_ok(&mut self) -> bool {
        match self.pin {
            PinState::Pin3 | PinState::Pin2 | PinState::Pin1 => {
                self.pin = PinState::Pin3;
                self.auth = AuthState::Pin;
                true
            }
            _ => false,
        }
    }

    /// Failed PIN presentation; decrements the counter.
    pub fn pin_bad(&mut self) -> bool {
        match self.pin {
            PinState::Pin3 => {
                self.pin = PinState::Pin2;
                true
            }
            PinState::Pin2 => {
                self.pin = PinState::Pin1;
                true
            }
            PinState::Pin1 => {
                self.pin = PinState::Pin0;
                true
            }
            // exhausted and suspended states absorb further failures
            PinState::Pin0 | PinState::Suspended => {
                self.pin = PinState::Suspended;
                true
            }
            PinState::Deactivated => false,
        }
    }

    /// Successful PUK presentation; restores the PIN counter unless the PIN
    /// is deactivated or the PUK is exhausted.
    pub fn puk_ok(&mut self) -> bool {
        if self.puk_left == 0 {
            return false;
        }

        self.auth = AuthState::Puk;

        if self.pin != PinState::Deactivated {
            self.pin = PinState::Pin3;
        }

        true
    }

    /// Failed PUK presentation; the counter runs to zero and stays there.
    pub fn puk_bad(&mut self) -> bool {
        if self.puk_left == 0 {
            return false;
        }

        self.puk_left -= 1;
        true
    }

    /// Successful CAN presentation.
    pub fn can_ok(&mut self) -> bool {
        self.auth = AuthState::Can;
        true
    }

    /// Failed CAN presentation; no state change.
    pub fn can_bad(&mut self) -> bool {
        true
    }

    /// Holder deactivates the PIN.
    pub fn pin_deactivate(&mut self) -> bool {
        if self.pin == PinState::Deactivated {
            return false;
        }

        self.pin = PinState::Deactivated;
        true
    }

    /// Reactivate the PIN; requires PUK authentication.
    pub fn pin_activate(&mut self) -> bool {
        if self.auth != AuthState::Puk || self.pin != PinState::Deactivated {
            return false;
        }

        self.pin = PinState::Pin3;
        true
    }

    /// Close the authenticated session.
    pub fn auth_close(&mut self) -> bool {
        self.auth = AuthState::None;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pin_counter_runs_down() {
        let mut a = PwdAutomaton::new();

        assert!(a.pin_bad());
        assert_eq!(a.pin_state(), PinState::Pin2);
        assert!(a.pin_bad());
        assert_eq!(a.pin_state(), PinState::Pin1);

        // success resets
        assert!(a.pin_ok());
        assert_eq!(a.pin_state(), PinState::Pin3);
        assert_eq!(a.auth(), AuthState::Pin);

        // run out completely
        assert!(a.pin_bad());
        assert!(a.pin_bad());
        assert!(a.pin_bad());
        assert_eq!(a.pin_state(), PinState::Pin0);

        // no more successes from the exhausted state
        assert!(!a.pin_ok());

        // further failures suspend
        assert!(a.pin_bad());
        assert_eq!(a.pin_state(), PinState::Suspended);
        assert!(!a.pin_ok());
    }

    #[test]
    fn puk_restores_the_pin() {
        let mut a = PwdAutomaton::new();

        for _ in 0..4 {
            a.pin_bad();
        }
        assert_eq!(a.pin_state(), PinState::Suspended);

        assert!(a.puk_ok());
        assert_eq!(a.auth(), AuthState::Puk);
        assert_eq!(a.pin_state(), PinState::Pin3);
        assert!(a.pin_ok());
    }

    #[test]
    fn puk_counter_exhausts() {
        let mut a = PwdAutomaton::new();

        for i in (0..9).rev() {
            assert!(a.puk_bad());
            assert_eq!(a.puk_left(), i);
        }

        assert!(!a.puk_bad());
        assert!(!a.puk_ok());
    }

    #[test]
    fn deactivation_cycle() {
        let mut a = PwdAutomaton::new();

        assert!(a.pin_deactivate());
        assert_eq!(a.pin_state(), PinState::Deactivated);
        assert!(!a.pin_deactivate());

        // a deactivated PIN neither verifies nor decrements
        assert!(!a.pin_ok());
        assert!(!a.pin_bad());

        // reactivation needs PUK authority
        assert!(!a.pin_activate());
        assert!(a.puk_ok());
        // PUK success does not silently reactivate
        assert_eq!(a.pin_state(), PinState::Deactivated);
        assert!(a.pin_activate());
        assert_eq!(a.pin_state(), PinState::Pin3);
    }

    #[test]
    fn can_and_close() {
        let mut a = PwdAutomaton::new();

        assert!(a.can_ok());
        assert_eq!(a.auth(), AuthState::Can);

        assert!(a.can_bad());
        assert_eq!(a.auth(), AuthState::Can);

        assert!(a.auth_close());
        assert_eq!(a.auth(), AuthState::None);
    }
}
