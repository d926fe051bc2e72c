//! The [`Driver`] trait and the [`KeyAction`] every key expression carries.

use crate::error::Result;
use async_trait::async_trait;
use std::fmt;

/// What to do with a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAction {
    /// Press and release.
    Press,
    /// Press and hold.
    On,
    /// Release a held key.
    Off,
}

impl KeyAction {
    /// Whether this action includes the key-down half.
    pub fn presses(self) -> bool {
        matches!(self, KeyAction::Press | KeyAction::On)
    }

    /// Whether this action includes the key-up half.
    pub fn releases(self) -> bool {
        matches!(self, KeyAction::Press | KeyAction::Off)
    }
}

impl fmt::Display for KeyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            KeyAction::Press => "press",
            KeyAction::On => "on",
            KeyAction::Off => "off",
        })
    }
}

/// Characters that need a shift chord on a US keyboard besides uppercase letters.
pub const SHIFTED_CHARS: &str = "~!@#$%^&*()_+{}|:\"<>?";

/// Whether typing `key` requires holding shift.
pub fn needs_shift(key: char) -> bool {
    key.is_uppercase() || SHIFTED_CHARS.contains(key)
}

/// A console that can receive keystrokes.
///
/// Implemented once per transport. A driver is owned by a single VM session
/// and drives one sequence at a time, hence `&mut self` and `?Send`.
#[async_trait(?Send)]
pub trait Driver {
    /// Type a printable character.
    async fn send_key(&mut self, key: char, action: KeyAction) -> Result<()>;

    /// Type one of the named special keys (`enter`, `f10`, `leftctrl`, ...).
    async fn send_special(&mut self, name: &str, action: KeyAction) -> Result<()>;

    /// Deliver anything the driver has buffered.
    ///
    /// Called before every wait and once after the last expression.
    async fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    /// Drop anything buffered without delivering it.
    ///
    /// Called when a sequence stops early, so keys from an aborted run never
    /// reach the console on the next one.
    fn discard(&mut self) {}
}
