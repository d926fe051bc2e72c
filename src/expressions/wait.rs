//! [`Wait`] expression: pauses typing for a fixed duration.
//!
//! Macro syntax: `<wait>` (one second), `<wait10>` (whole seconds) or
//! `<wait1m30s>` (duration with units).

use super::Expression;
use crate::driver::Driver;
use crate::error::{Error, Result};
use crate::parser::{parse_duration, strip_prefix_ci};
use std::fmt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Pauses for `duration` before the next expression runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wait {
    pub duration: Duration,
}

impl Wait {
    pub const KEYWORD: &'static str = "wait";
    pub const DEFAULT: Duration = Duration::from_secs(1);

    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    pub(crate) fn parse_bracket(body: &str, offset: usize) -> Option<Result<(Expression, usize)>> {
        let rest = strip_prefix_ci(body, Self::KEYWORD)?;
        let Some(end) = rest.find('>') else {
            return Some(Err(Error::parse(offset, "unterminated '<wait'")));
        };
        let consumed = Self::KEYWORD.len() + end + 1;
        Some(
            Self::parse_arg(&rest[..end], offset + 1 + Self::KEYWORD.len())
                .map(|wait| (Expression::Wait(wait), consumed)),
        )
    }

    fn parse_arg(arg: &str, offset: usize) -> Result<Self> {
        if arg.is_empty() {
            return Ok(Self::new(Self::DEFAULT));
        }
        if !arg.starts_with(|c: char| c.is_ascii_digit()) {
            return Err(Error::parse(offset, format!("invalid wait duration {arg:?}")));
        }
        if has_leading_zero(arg) {
            return Err(Error::parse(
                offset,
                format!("invalid wait duration {arg:?}: leading zero"),
            ));
        }

        if arg.bytes().all(|b| b.is_ascii_digit()) {
            let secs: u64 = arg
                .parse()
                .map_err(|_| Error::parse(offset, format!("wait of {arg} seconds is out of range")))?;
            return Ok(Self::new(Duration::from_secs(secs)));
        }

        match parse_duration(arg) {
            Ok(duration) => Ok(Self::new(duration)),
            Err(Error::Parse {
                offset: inner,
                message,
            }) => Err(Error::parse(offset + inner, message)),
            Err(err) => Err(err),
        }
    }

    pub(crate) async fn execute<D>(&self, cancel: &CancellationToken, driver: &mut D) -> Result<()>
    where
        D: Driver + ?Sized,
    {
        // Anything already typed has to reach the console before we pause.
        driver.flush().await?;
        tracing::debug!(duration = ?self.duration, "waiting");
        sleep_or_cancel(self.duration, cancel).await
    }
}

impl fmt::Display for Wait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.duration.subsec_nanos() == 0 {
            write!(f, "<wait{}s>", self.duration.as_secs())
        } else {
            write!(f, "<wait{}ns>", self.duration.as_nanos())
        }
    }
}

/// Sleep for `duration`, returning early with [`Error::Cancelled`] if
/// `cancel` fires first.
pub async fn sleep_or_cancel(duration: Duration, cancel: &CancellationToken) -> Result<()> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}

/// Numbers in a wait argument may not start with a redundant zero (`05s`).
fn has_leading_zero(arg: &str) -> bool {
    let bytes = arg.as_bytes();
    bytes.iter().enumerate().any(|(i, &b)| {
        let starts_number = i == 0 || !(bytes[i - 1].is_ascii_digit() || bytes[i - 1] == b'.');
        starts_number && b == b'0' && bytes.get(i + 1).is_some_and(u8::is_ascii_digit)
    })
}
