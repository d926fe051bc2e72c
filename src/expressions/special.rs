//! [`Special`] expression: a named non-printing key.
//!
//! Macro syntax: `<enter>`, `<f10>`, `<leftCtrlOn>`, `<leftCtrlOff>`.
//! Names and the `On`/`Off` suffix are case-insensitive.

use super::Expression;
use crate::driver::{Driver, KeyAction};
use crate::error::{Error, Result};
use crate::parser::{strip_prefix_ci, strip_toggle};
use std::fmt;

/// Every special key name the macro language accepts, lowercase.
pub const SPECIAL_KEYS: &[&str] = &[
    "bs", "del", "enter", "esc", "f1", "f2", "f3", "f4", "f5", "f6", "f7", "f8", "f9", "f10",
    "f11", "f12", "return", "tab", "up", "down", "left", "right", "spacebar", "insert", "home",
    "end", "pageup", "pagedown", "leftalt", "leftctrl", "leftshift", "rightalt", "rightctrl",
    "rightshift", "leftsuper", "rightsuper",
];

/// Types the special key `name` with the given action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Special {
    pub name: String,
    pub action: KeyAction,
}

impl Special {
    pub fn new(name: impl Into<String>, action: KeyAction) -> Self {
        Self {
            name: name.into(),
            action,
        }
    }

    pub(crate) fn parse_bracket(body: &str, _offset: usize) -> Option<Result<(Expression, usize)>> {
        // `f10` must not be read as `f1` followed by junk, so take the longest name.
        let (name, rest) = SPECIAL_KEYS
            .iter()
            .filter_map(|name| strip_prefix_ci(body, name).map(|rest| (*name, rest)))
            .max_by_key(|(name, _)| name.len())?;
        let (action, rest) = strip_toggle(rest).unwrap_or((KeyAction::Press, rest));
        let rest = rest.strip_prefix('>')?;
        Some(Ok((
            Expression::Special(Self::new(name, action)),
            body.len() - rest.len(),
        )))
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if SPECIAL_KEYS.contains(&self.name.as_str()) {
            Ok(())
        } else {
            Err(Error::UnknownSpecial(self.name.clone()))
        }
    }

    pub(crate) async fn execute<D>(&self, driver: &mut D) -> Result<()>
    where
        D: Driver + ?Sized,
    {
        driver.send_special(&self.name, self.action).await
    }
}

impl fmt::Display for Special {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.action {
            KeyAction::Press => write!(f, "<{}>", self.name),
            KeyAction::On => write!(f, "<{}On>", self.name),
            KeyAction::Off => write!(f, "<{}Off>", self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> Option<Special> {
        match Special::parse_bracket(body, 0)? {
            Ok((Expression::Special(special), _)) => Some(special),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_longest_match() {
        assert_eq!(parse("f10>").unwrap().name, "f10");
        assert_eq!(parse("f1>").unwrap().name, "f1");
        assert_eq!(parse("leftshiftoff>").unwrap(), Special::new("leftshift", KeyAction::Off));
        assert_eq!(parse("end>").unwrap().name, "end");
        assert_eq!(parse("enter>").unwrap().name, "enter");
    }

    #[test]
    fn test_normalizes_case() {
        assert_eq!(parse("PageUp>").unwrap(), Special::new("pageup", KeyAction::Press));
        assert_eq!(parse("TabON>").unwrap(), Special::new("tab", KeyAction::On));
    }

    #[test]
    fn test_rejects() {
        assert!(parse("f13>").is_none());
        assert!(parse("enter").is_none());
        assert!(parse("nothing>").is_none());
    }

    #[test]
    fn test_names_are_unique_and_lowercase() {
        for (i, name) in SPECIAL_KEYS.iter().enumerate() {
            assert_eq!(*name, name.to_ascii_lowercase());
            assert!(!SPECIAL_KEYS[i + 1..].contains(name), "duplicate {name}");
        }
    }

    #[test]
    fn test_validate() {
        assert!(Special::new("enter", KeyAction::Press).validate().is_ok());
        assert!(matches!(
            Special::new("hyper", KeyAction::Press).validate(),
            Err(Error::UnknownSpecial(name)) if name == "hyper"
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(Special::new("enter", KeyAction::Press).to_string(), "<enter>");
        assert_eq!(Special::new("leftalt", KeyAction::On).to_string(), "<leftaltOn>");
    }
}
