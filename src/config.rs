//! Boot settings read from a build recipe.
//!
//! A recipe is a JSON object; only the boot fields are read here, any other
//! keys are ignored:
//!
//! ```json
//! {
//!   "boot_wait": "10s",
//!   "boot_command": ["<esc><wait>", "install auto=true<enter>"],
//!   "boot_keygroup_interval": "100ms",
//!   "boot_key_interval": "10ms",
//!   "scancode_chunk_size": 25
//! }
//! ```

use crate::error::Error;
use crate::parser::{flatten, parse_duration, parse_str};
use crate::sequence::ExpressionSequence;
use serde::Deserialize;
use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;

/// Environment variable overriding the per-event pause of the keysym driver.
pub const KEY_INTERVAL_ENV: &str = "BOOT_KEY_INTERVAL";

/// Per-event pause of the keysym driver when nothing overrides it.
pub const DEFAULT_KEY_INTERVAL: Duration = Duration::from_millis(100);

/// How long to wait for the guest to boot before typing, when unset.
pub const DEFAULT_BOOT_WAIT: Duration = Duration::from_secs(10);

/// Boot fields exactly as they appear in the recipe.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawBootConfig {
    pub boot_wait: Option<String>,
    pub boot_command: Vec<String>,
    pub boot_keygroup_interval: Option<String>,
    pub boot_key_interval: Option<String>,
    /// The recipe builds without a VNC console. A boot command is then
    /// rejected whichever console it would be typed on.
    pub disable_vnc: bool,
    pub scancode_chunk_size: Option<i64>,
}

impl RawBootConfig {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        use anyhow::Context as _;

        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read recipe: {}", path.display()))?;
        Self::from_json(&content).with_context(|| format!("Failed to decode recipe: {}", path.display()))
    }
}

/// Validated boot settings, with the boot command already parsed.
#[derive(Debug, Clone)]
pub struct BootConfig {
    pub boot_wait: Duration,
    pub boot_command: Vec<String>,
    pub sequence: ExpressionSequence,
    pub group_interval: Duration,
    pub key_interval: Option<Duration>,
    pub disable_vnc: bool,
    pub chunk_size: Option<NonZeroUsize>,
}

impl BootConfig {
    /// Check every field and parse the boot command.
    ///
    /// All problems are reported together rather than stopping at the first.
    pub fn prepare(raw: RawBootConfig) -> Result<Self, Vec<Error>> {
        let mut errors = Vec::new();

        let mut duration = |field: &str, value: Option<&str>| match value {
            None | Some("") => None,
            Some(text) => match parse_duration(text) {
                Ok(duration) => Some(duration),
                Err(err) => {
                    errors.push(Error::Config(format!("failed parsing {field}: {err}")));
                    None
                }
            },
        };
        let boot_wait = duration("boot_wait", raw.boot_wait.as_deref()).unwrap_or(DEFAULT_BOOT_WAIT);
        let group_interval =
            duration("boot_keygroup_interval", raw.boot_keygroup_interval.as_deref())
                .unwrap_or_default();
        let key_interval = duration("boot_key_interval", raw.boot_key_interval.as_deref());

        if raw.disable_vnc && !raw.boot_command.is_empty() {
            errors.push(Error::Config(
                "a boot command cannot be used when vnc is disabled".into(),
            ));
        }

        let sequence = match parse_str(&flatten(&raw.boot_command)) {
            Ok(sequence) => {
                errors.extend(sequence.validate());
                sequence
            }
            Err(err) => {
                errors.push(err);
                ExpressionSequence::default()
            }
        };

        if errors.is_empty() {
            Ok(Self {
                boot_wait,
                boot_command: raw.boot_command,
                sequence,
                group_interval,
                key_interval,
                disable_vnc: raw.disable_vnc,
                chunk_size: chunk_limit(raw.scancode_chunk_size),
            })
        } else {
            Err(errors)
        }
    }

    /// The boot command as one macro string.
    pub fn flat_boot_command(&self) -> String {
        flatten(&self.boot_command)
    }

    /// The keysym driver's per-event pause for this recipe.
    pub fn key_interval(&self) -> Duration {
        resolve_key_interval(self.key_interval)
    }
}

/// A non-positive chunk size means "no limit".
pub fn chunk_limit(raw: Option<i64>) -> Option<NonZeroUsize> {
    raw.and_then(|n| usize::try_from(n).ok())
        .and_then(NonZeroUsize::new)
}

/// Per-event pause: a non-zero builder override wins, then
/// [`KEY_INTERVAL_ENV`] if it holds a valid duration, then
/// [`DEFAULT_KEY_INTERVAL`].
pub fn resolve_key_interval(override_interval: Option<Duration>) -> Duration {
    let from_env = std::env::var(KEY_INTERVAL_ENV).ok();
    key_interval_from(override_interval, from_env.as_deref())
}

fn key_interval_from(override_interval: Option<Duration>, env: Option<&str>) -> Duration {
    if let Some(interval) = override_interval.filter(|d| !d.is_zero()) {
        return interval;
    }
    match env.map(parse_duration) {
        Some(Ok(interval)) => interval,
        Some(Err(err)) => {
            tracing::warn!(error = %err, "ignoring invalid {KEY_INTERVAL_ENV}");
            DEFAULT_KEY_INTERVAL
        }
        None => DEFAULT_KEY_INTERVAL,
    }
}
