//! [`Literal`] expression: one printable character.
//!
//! Macro syntax: any character outside angle brackets is pressed and
//! released; `<xOn>` and `<xOff>` hold and release the character `x`.

use super::Expression;
use crate::driver::{Driver, KeyAction};
use crate::error::Result;
use crate::parser::strip_toggle;
use std::fmt;

/// Types `key` with the given action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Literal {
    pub key: char,
    pub action: KeyAction,
}

impl Literal {
    pub fn new(key: char, action: KeyAction) -> Self {
        Self { key, action }
    }

    pub(crate) fn parse_toggle(body: &str, _offset: usize) -> Option<Result<(Expression, usize)>> {
        let mut chars = body.chars();
        let key = chars.next()?;
        let (action, rest) = strip_toggle(chars.as_str())?;
        let rest = rest.strip_prefix('>')?;
        Some(Ok((
            Expression::Literal(Self::new(key, action)),
            body.len() - rest.len(),
        )))
    }

    pub(crate) async fn execute<D>(&self, driver: &mut D) -> Result<()>
    where
        D: Driver + ?Sized,
    {
        driver.send_key(self.key, self.action).await
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.action {
            // a bare '<' would open a bracket
            KeyAction::Press if self.key == '<' => f.write_str("<<On><<Off>"),
            KeyAction::Press => write!(f, "{}", self.key),
            KeyAction::On => write!(f, "<{}On>", self.key),
            KeyAction::Off => write!(f, "<{}Off>", self.key),
        }
    }
}
