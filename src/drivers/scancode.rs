//! PC/AT scancode driver.
//!
//! Keys are encoded as set-1 make/break bytes (break = make + 0x80, extended
//! keys prefixed with `e0`), buffered per logical key, and delivered in
//! batches no larger than the backend accepts. Reference:
//! <https://www.win.tue.nl/~aeb/linux/kbd/scancodes-10.html>

use crate::driver::{Driver, KeyAction, needs_shift};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::LazyLock;
use std::time::Duration;

const SHIFT_MAKE: u8 = 0x2a;
const SHIFT_BREAK: u8 = 0xaa;
const EXTENDED: u8 = 0xe0;

/// Receives batches of hex-encoded scancodes, e.g. `["2a", "1e", "9e", "aa"]`.
///
/// An implementation hands each batch to the hypervisor's keyboard injection
/// command and reports failure; it must deliver codes in the order given.
#[async_trait(?Send)]
pub trait ScancodeSink {
    async fn send_codes(&mut self, codes: &[String]) -> anyhow::Result<()>;
}

/// Each keyboard row starts at a base code and increases by one per key.
/// Shifted rows share the base of their unshifted row.
static SCANCODES: LazyLock<HashMap<char, u8>> = LazyLock::new(|| {
    const ROWS: &[(&str, u8)] = &[
        ("1234567890-=", 0x02),
        ("!@#$%^&*()_+", 0x02),
        ("qwertyuiop[]", 0x10),
        ("QWERTYUIOP{}", 0x10),
        ("asdfghjkl;'`", 0x1e),
        ("ASDFGHJKL:\"~", 0x1e),
        ("\\zxcvbnm,./", 0x2b),
        ("|ZXCVBNM<>?", 0x2b),
        (" ", 0x39),
    ];
    ROWS.iter()
        .flat_map(|(row, base)| row.chars().zip(*base..))
        .collect()
});

/// Make codes of the special keys. Their break codes set the high bit of the
/// last byte.
const SPECIALS: &[(&str, &[u8])] = &[
    ("bs", &[0x0e]),
    ("del", &[EXTENDED, 0x53]),
    ("enter", &[0x1c]),
    ("esc", &[0x01]),
    ("f1", &[0x3b]),
    ("f2", &[0x3c]),
    ("f3", &[0x3d]),
    ("f4", &[0x3e]),
    ("f5", &[0x3f]),
    ("f6", &[0x40]),
    ("f7", &[0x41]),
    ("f8", &[0x42]),
    ("f9", &[0x43]),
    ("f10", &[0x44]),
    ("f11", &[0x57]),
    ("f12", &[0x58]),
    ("return", &[0x1c]),
    ("tab", &[0x0f]),
    ("up", &[EXTENDED, 0x48]),
    ("down", &[EXTENDED, 0x50]),
    ("left", &[EXTENDED, 0x4b]),
    ("right", &[EXTENDED, 0x4d]),
    ("spacebar", &[0x39]),
    ("insert", &[EXTENDED, 0x52]),
    ("home", &[EXTENDED, 0x47]),
    ("end", &[EXTENDED, 0x4f]),
    ("pageup", &[EXTENDED, 0x49]),
    ("pagedown", &[EXTENDED, 0x51]),
    ("leftalt", &[0x38]),
    ("leftctrl", &[0x1d]),
    ("leftshift", &[SHIFT_MAKE]),
    ("rightalt", &[EXTENDED, 0x38]),
    ("rightctrl", &[EXTENDED, 0x1d]),
    ("rightshift", &[0x36]),
    ("leftsuper", &[EXTENDED, 0x5b]),
    ("rightsuper", &[EXTENDED, 0x5c]),
];

fn release(make: &[u8]) -> Vec<u8> {
    let mut codes = make.to_vec();
    if let Some(last) = codes.last_mut() {
        *last |= 0x80;
    }
    codes
}

/// Scancodes for typing `key` with `action`, shift included.
pub fn key_codes(key: char, action: KeyAction) -> Result<Vec<u8>> {
    let make = *SCANCODES.get(&key).ok_or(Error::UnmappedChar(key))?;
    let shift = needs_shift(key);
    let mut codes = Vec::with_capacity(4);
    if action.presses() {
        if shift {
            codes.push(SHIFT_MAKE);
        }
        codes.push(make);
    }
    if action.releases() {
        codes.push(make + 0x80);
        if shift {
            codes.push(SHIFT_BREAK);
        }
    }
    Ok(codes)
}

/// Scancodes for the special key `name` with `action`.
pub fn special_codes(name: &str, action: KeyAction) -> Result<Vec<u8>> {
    let (_, make) = SPECIALS
        .iter()
        .find(|(special, _)| *special == name)
        .ok_or_else(|| Error::UnknownSpecial(name.to_string()))?;
    Ok(match action {
        KeyAction::On => make.to_vec(),
        KeyAction::Off => release(make),
        KeyAction::Press => [make.to_vec(), release(make)].concat(),
    })
}

/// Pack code groups into batches of at most `size` codes.
///
/// Groups are never split and keep their order. With no size limit every
/// code lands in a single batch.
///
/// # Errors
///
/// [`Error::ChunkTooWide`] if a single group is wider than `size`.
pub fn chunk_scan_codes<T: Clone>(
    groups: &[Vec<T>],
    size: Option<NonZeroUsize>,
) -> Result<Vec<Vec<T>>> {
    let mut batches = Vec::new();
    let mut running: Vec<T> = Vec::new();
    for group in groups {
        if let Some(size) = size.map(NonZeroUsize::get) {
            if group.len() > size {
                return Err(Error::ChunkTooWide {
                    width: group.len(),
                    size,
                });
            }
            if running.len() + group.len() > size {
                batches.push(std::mem::take(&mut running));
            }
        }
        running.extend_from_slice(group);
    }
    if !running.is_empty() {
        batches.push(running);
    }
    Ok(batches)
}

/// Types on a console that accepts raw scancodes.
///
/// Key groups are buffered until [`Driver::flush`], which the sequence calls
/// before every wait and at the end.
pub struct ScancodeDriver<S> {
    sink: S,
    chunk_size: Option<NonZeroUsize>,
    group_interval: Duration,
    buffer: Vec<Vec<u8>>,
}

impl<S: ScancodeSink> ScancodeDriver<S> {
    /// A driver that delivers everything buffered in one batch per flush.
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            chunk_size: None,
            group_interval: Duration::ZERO,
            buffer: Vec::new(),
        }
    }

    /// Limit how many codes the backend receives per call.
    pub fn with_chunk_size(mut self, chunk_size: Option<NonZeroUsize>) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Pause after each delivered batch.
    pub fn with_group_interval(mut self, interval: Duration) -> Self {
        self.group_interval = interval;
        self
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}

#[async_trait(?Send)]
impl<S: ScancodeSink> Driver for ScancodeDriver<S> {
    async fn send_key(&mut self, key: char, action: KeyAction) -> Result<()> {
        let codes = key_codes(key, action)?;
        tracing::debug!(
            key = %key.escape_debug(),
            %action,
            codes = %hex(&codes).join(" "),
            shift = needs_shift(key),
            "sending char"
        );
        self.buffer.push(codes);
        Ok(())
    }

    async fn send_special(&mut self, name: &str, action: KeyAction) -> Result<()> {
        let codes = special_codes(name, action)?;
        tracing::debug!(special = name, %action, codes = %hex(&codes).join(" "), "sending special");
        self.buffer.push(codes);
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        let groups = std::mem::take(&mut self.buffer);
        if groups.is_empty() {
            return Ok(());
        }
        for batch in chunk_scan_codes(&groups, self.chunk_size)? {
            let codes = hex(&batch);
            tracing::debug!(count = codes.len(), "delivering scancode batch");
            self.sink.send_codes(&codes).await.map_err(Error::transmit)?;
            if !self.group_interval.is_zero() {
                tokio::time::sleep(self.group_interval).await;
            }
        }
        Ok(())
    }

    fn discard(&mut self) {
        if !self.buffer.is_empty() {
            tracing::debug!(groups = self.buffer.len(), "discarding buffered keys");
            self.buffer.clear();
        }
    }
}

fn hex(codes: &[u8]) -> Vec<String> {
    codes.iter().map(|code| format!("{code:02x}")).collect()
}
