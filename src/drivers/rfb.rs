//! RFB client KeyEvent messages over an established connection.
//!
//! Only the key event itself is written (RFC 6143, section 7.5.4); the
//! handshake, security negotiation and framebuffer traffic belong to
//! whoever opened the stream.

use super::keysym::KeyEventSink;
use anyhow::Context as _;
use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};

const KEY_EVENT: u8 = 4;

/// Encode one client KeyEvent message.
pub fn encode_key_event(keysym: u32, down: bool) -> [u8; 8] {
    let mut msg = [0u8; 8];
    msg[0] = KEY_EVENT;
    msg[1] = u8::from(down);
    msg[4..].copy_from_slice(&keysym.to_be_bytes());
    msg
}

/// Writes key events to an RFB stream that has completed its handshake.
pub struct RfbKeyEvents<W> {
    stream: W,
}

impl<W: AsyncWrite + Unpin> RfbKeyEvents<W> {
    pub fn new(stream: W) -> Self {
        Self { stream }
    }

    pub fn into_inner(self) -> W {
        self.stream
    }
}

#[async_trait(?Send)]
impl<W: AsyncWrite + Unpin> KeyEventSink for RfbKeyEvents<W> {
    async fn key_event(&mut self, keysym: u32, down: bool) -> anyhow::Result<()> {
        self.stream
            .write_all(&encode_key_event(keysym, down))
            .await
            .context("Failed to write RFB key event")?;
        self.stream
            .flush()
            .await
            .context("Failed to flush RFB stream")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{Driver, KeyAction};
    use crate::drivers::KeysymDriver;
    use std::time::Duration;

    #[test]
    fn test_encode() {
        assert_eq!(
            encode_key_event(0xFF0D, true),
            [4, 1, 0, 0, 0x00, 0x00, 0xFF, 0x0D]
        );
        assert_eq!(encode_key_event(0x61, false), [4, 0, 0, 0, 0, 0, 0, 0x61]);
    }

    #[tokio::test]
    async fn test_driver_over_stream() {
        let mut driver = KeysymDriver::new(RfbKeyEvents::new(Vec::new()), Duration::ZERO);
        driver.send_special("enter", KeyAction::Press).await.unwrap();

        let written = driver.into_conn().into_inner();
        assert_eq!(
            written,
            [encode_key_event(0xFF0D, true), encode_key_event(0xFF0D, false)].concat()
        );
    }

    #[tokio::test]
    async fn test_closed_stream_fails() {
        let (client, server) = tokio::io::duplex(64);
        drop(server);
        let mut events = RfbKeyEvents::new(client);
        let err = events.key_event(0x61, true).await.unwrap_err();
        assert!(format!("{err:#}").contains("RFB key event"), "got: {err:#}");
    }
}
