//! Passphrase gate in front of note operations.
//!
//! This is a presentation gate only: the passphrase is a plain string
//! comparison and protects nothing at rest.

use std::error::Error;
use std::fmt::{Display, Formatter};

const WRONG_PASSWORD_MESSAGE: &str = "Incorrect password. Please try again.";

/// Rejected unlock attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrongPassword;

impl Display for WrongPassword {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(WRONG_PASSWORD_MESSAGE)
    }
}

impl Error for WrongPassword {}

/// Locked/unlocked state of one session. Starts locked.
#[derive(Debug, Clone)]
pub struct UnlockGate {
    passphrase: String,
    unlocked: bool,
}

impl UnlockGate {
    pub fn new(passphrase: impl Into<String>) -> Self {
        Self {
            passphrase: passphrase.into(),
            unlocked: false,
        }
    }

    pub fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    pub fn unlock(&mut self, attempt: &str) -> Result<(), WrongPassword> {
        if attempt == self.passphrase {
            self.unlocked = true;
            Ok(())
        } else {
            Err(WrongPassword)
        }
    }

    pub fn lock(&mut self) {
        self.unlocked = false;
    }
}

#[cfg(test)]
mod tests {
    use super::{UnlockGate, WrongPassword};

    #[test]
    fn only_exact_passphrase_unlocks() {
        let mut gate = UnlockGate::new("RudraPad");
        assert!(!gate.is_unlocked());
        assert_eq!(gate.unlock("rudrapad"), Err(WrongPassword));
        assert!(!gate.is_unlocked());
        gate.unlock("RudraPad").unwrap();
        assert!(gate.is_unlocked());
        gate.lock();
        assert!(!gate.is_unlocked());
    }

    #[test]
    fn wrong_password_message_is_user_facing() {
        assert_eq!(
            WrongPassword.to_string(),
            "Incorrect password. Please try again."
        );
    }
}
