//! Remote-framebuffer keysym driver.
//!
//! Every key transition is one RFB key event. Printable characters are sent
//! as their code point; special keys use the X11 keysym values below.

use crate::driver::{Driver, KeyAction, needs_shift};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Keysym of the left shift key, used to chord shifted characters.
pub const KEY_LEFT_SHIFT: u32 = 0xFFE1;

/// A connection that accepts RFB key events.
#[async_trait(?Send)]
pub trait KeyEventSink {
    async fn key_event(&mut self, keysym: u32, down: bool) -> anyhow::Result<()>;
}

const SPECIALS: &[(&str, u32)] = &[
    ("bs", 0xFF08),
    ("del", 0xFFFF),
    ("down", 0xFF54),
    ("end", 0xFF57),
    ("enter", 0xFF0D),
    ("esc", 0xFF1B),
    ("f1", 0xFFBE),
    ("f2", 0xFFBF),
    ("f3", 0xFFC0),
    ("f4", 0xFFC1),
    ("f5", 0xFFC2),
    ("f6", 0xFFC3),
    ("f7", 0xFFC4),
    ("f8", 0xFFC5),
    ("f9", 0xFFC6),
    ("f10", 0xFFC7),
    ("f11", 0xFFC8),
    ("f12", 0xFFC9),
    ("home", 0xFF50),
    ("insert", 0xFF63),
    ("left", 0xFF51),
    ("leftalt", 0xFFE9),
    ("leftctrl", 0xFFE3),
    ("leftshift", KEY_LEFT_SHIFT),
    ("leftsuper", 0xFFEB),
    ("pagedown", 0xFF56),
    ("pageup", 0xFF55),
    ("return", 0xFF0D),
    ("right", 0xFF53),
    ("rightalt", 0xFFEA),
    ("rightctrl", 0xFFE4),
    ("rightshift", 0xFFE2),
    ("rightsuper", 0xFFEC),
    ("spacebar", 0x0020),
    ("tab", 0xFF09),
    ("up", 0xFF52),
];

/// Keysym of the special key `name`.
pub fn special_keysym(name: &str) -> Result<u32> {
    SPECIALS
        .iter()
        .find(|(special, _)| *special == name)
        .map(|(_, keysym)| *keysym)
        .ok_or_else(|| Error::UnknownSpecial(name.to_string()))
}

/// Types on an RFB console, one key event at a time.
///
/// Each event is followed by `interval` so slow guests do not drop input.
/// The first failed event is remembered: from then on the driver sends
/// nothing and returns that same error from every call.
pub struct KeysymDriver<C> {
    conn: C,
    interval: Duration,
    failed: Option<Error>,
}

impl<C: KeyEventSink> KeysymDriver<C> {
    pub fn new(conn: C, interval: Duration) -> Self {
        Self {
            conn,
            interval,
            failed: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// The error that stopped this driver, if any.
    pub fn failure(&self) -> Option<&Error> {
        self.failed.as_ref()
    }

    pub fn conn(&self) -> &C {
        &self.conn
    }

    pub fn into_conn(self) -> C {
        self.conn
    }

    async fn key_event(&mut self, keysym: u32, down: bool) -> Result<()> {
        if let Some(err) = &self.failed {
            return Err(err.clone());
        }
        if let Err(err) = self.conn.key_event(keysym, down).await {
            let err = Error::transmit(err);
            self.failed = Some(err.clone());
            return Err(err);
        }
        tokio::time::sleep(self.interval).await;
        Ok(())
    }

    async fn transition(&mut self, keysym: u32, action: KeyAction, shift: bool) -> Result<()> {
        if action.presses() {
            if shift {
                self.key_event(KEY_LEFT_SHIFT, true).await?;
            }
            self.key_event(keysym, true).await?;
        }
        if action.releases() {
            self.key_event(keysym, false).await?;
            if shift {
                self.key_event(KEY_LEFT_SHIFT, false).await?;
            }
        }
        Ok(())
    }
}

#[async_trait(?Send)]
impl<C: KeyEventSink> Driver for KeysymDriver<C> {
    async fn send_key(&mut self, key: char, action: KeyAction) -> Result<()> {
        let keysym = u32::from(key);
        let shift = needs_shift(key);
        tracing::debug!(
            key = %key.escape_debug(),
            keysym = format_args!("0x{keysym:X}"),
            %action,
            shift,
            "sending char"
        );
        self.transition(keysym, action, shift).await
    }

    async fn send_special(&mut self, name: &str, action: KeyAction) -> Result<()> {
        let keysym = special_keysym(name)?;
        tracing::debug!(
            special = name,
            keysym = format_args!("0x{keysym:X}"),
            %action,
            "sending special"
        );
        self.transition(keysym, action, false).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expressions::SPECIAL_KEYS;

    #[derive(Default)]
    struct Events {
        sent: Vec<(u32, bool)>,
        attempts: usize,
        fail_at: Option<usize>,
    }

    #[async_trait(?Send)]
    impl KeyEventSink for Events {
        async fn key_event(&mut self, keysym: u32, down: bool) -> anyhow::Result<()> {
            self.attempts += 1;
            if self.fail_at.is_some_and(|n| self.attempts >= n) {
                anyhow::bail!("connection reset (event {})", self.attempts);
            }
            self.sent.push((keysym, down));
            Ok(())
        }
    }

    fn driver(events: Events) -> KeysymDriver<Events> {
        KeysymDriver::new(events, Duration::ZERO)
    }

    #[tokio::test]
    async fn test_plain_press() {
        let mut d = driver(Events::default());
        d.send_key('a', KeyAction::Press).await.unwrap();
        assert_eq!(d.conn().sent, vec![(0x61, true), (0x61, false)]);
    }

    #[tokio::test]
    async fn test_shifted_press() {
        let mut d = driver(Events::default());
        d.send_key('?', KeyAction::Press).await.unwrap();
        assert_eq!(
            d.conn().sent,
            vec![
                (KEY_LEFT_SHIFT, true),
                (0x3F, true),
                (0x3F, false),
                (KEY_LEFT_SHIFT, false),
            ]
        );
    }

    #[tokio::test]
    async fn test_shifted_on_off() {
        let mut d = driver(Events::default());
        d.send_key('F', KeyAction::On).await.unwrap();
        d.send_key('F', KeyAction::Off).await.unwrap();
        assert_eq!(
            d.conn().sent,
            vec![
                (KEY_LEFT_SHIFT, true),
                (0x46, true),
                (0x46, false),
                (KEY_LEFT_SHIFT, false),
            ]
        );
    }

    #[tokio::test]
    async fn test_multibyte_char_uses_code_point() {
        let mut d = driver(Events::default());
        d.send_key('界', KeyAction::On).await.unwrap();
        assert_eq!(d.conn().sent, vec![(0x754C, true)]);
    }

    #[tokio::test]
    async fn test_special() {
        let mut d = driver(Events::default());
        d.send_special("enter", KeyAction::Press).await.unwrap();
        d.send_special("leftctrl", KeyAction::On).await.unwrap();
        assert_eq!(
            d.conn().sent,
            vec![(0xFF0D, true), (0xFF0D, false), (0xFFE3, true)]
        );
    }

    #[tokio::test]
    async fn test_unknown_special() {
        let mut d = driver(Events::default());
        let err = d.send_special("hyper", KeyAction::Press).await.unwrap_err();
        assert_eq!(err.to_string(), "special hyper not found");
        assert!(d.failure().is_none());
    }

    #[test]
    fn test_every_parsed_special_has_a_keysym() {
        for name in SPECIAL_KEYS {
            assert!(special_keysym(name).is_ok(), "{name}");
        }
    }

    #[tokio::test]
    async fn test_first_error_is_sticky() {
        // Shift-down succeeds, key-down fails.
        let mut d = driver(Events {
            fail_at: Some(2),
            ..Default::default()
        });
        let first = d.send_key('A', KeyAction::Press).await.unwrap_err();
        assert!(first.to_string().contains("event 2"), "got: {first}");
        assert_eq!(d.conn().attempts, 2);

        let later = d.send_special("enter", KeyAction::Press).await.unwrap_err();
        assert!(later.to_string().contains("event 2"), "got: {later}");
        assert_eq!(d.conn().attempts, 2);
        assert_eq!(d.conn().sent, vec![(KEY_LEFT_SHIFT, true)]);
    }

    #[tokio::test]
    async fn test_interval_between_events() {
        let mut d = KeysymDriver::new(Events::default(), Duration::from_millis(20));
        let start = std::time::Instant::now();
        d.send_key('a', KeyAction::Press).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(40));
    }
}
