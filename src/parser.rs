//! Parser for the boot command macro language.
//!
//! The top-level entry points are [`parse_str`], [`parse_lines`] and
//! [`parse_file`]. Text outside angle brackets is typed literally; a `<`
//! always opens a bracket expression, which must be one of `<wait…>`, a
//! character toggle such as `<aOn>`, or a special key such as `<f10>`.

use crate::driver::KeyAction;
use crate::error::{Error, Result};
use crate::expressions::{Expression, Literal, Special, Wait};
use crate::sequence::ExpressionSequence;
use std::path::Path;
use std::time::Duration;

/// Parse a boot command macro into an [`ExpressionSequence`].
///
/// # Errors
///
/// Returns [`Error::Parse`] for an unterminated or unrecognized bracket
/// expression or a malformed wait duration. No partial sequence is returned.
///
/// # Example
///
/// ```
/// use bootcommand::parse_str;
///
/// let seq = parse_str("root<enter><wait5>").unwrap();
/// assert_eq!(seq.len(), 6);
/// ```
pub fn parse_str(input: &str) -> Result<ExpressionSequence> {
    let mut expressions = Vec::new();
    let mut pos = 0;
    while let Some(ch) = input[pos..].chars().next() {
        if ch == '<' {
            let (expr, consumed) = parse_bracket(&input[pos + 1..], pos)?;
            expressions.push(expr);
            pos += 1 + consumed;
        } else {
            expressions.push(Expression::Literal(Literal::new(ch, KeyAction::Press)));
            pos += ch.len_utf8();
        }
    }
    Ok(ExpressionSequence::new(expressions))
}

/// Parse a boot command given as several recipe lines.
///
/// Lines are concatenated with no separator before parsing, so a bracket
/// expression may not be split across lines but a command may.
pub fn parse_lines<S: AsRef<str>>(lines: &[S]) -> Result<ExpressionSequence> {
    parse_str(&flatten(lines))
}

/// Read a boot command from a file, one recipe line per file line.
///
/// Line terminators are dropped and the lines concatenated as in
/// [`parse_lines`]; use `<enter>` to type a newline.
pub fn parse_file(path: impl AsRef<Path>) -> anyhow::Result<ExpressionSequence> {
    use anyhow::Context as _;

    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read boot command file: {}", path.display()))?;
    let lines: Vec<&str> = content.lines().collect();
    parse_lines(&lines).with_context(|| format!("Failed to parse {}", path.display()))
}

pub(crate) fn flatten<S: AsRef<str>>(lines: &[S]) -> String {
    lines.iter().map(AsRef::as_ref).collect()
}

type BracketFn = fn(&str, usize) -> Option<Result<(Expression, usize)>>;

/// Bracket alternatives, tried in order after a `<`.
///
/// Each returns `None` when the text does not start with its form, or the
/// parsed expression and the number of bytes consumed after the `<`,
/// including the closing `>`.
static BRACKETS: &[BracketFn] = &[
    Wait::parse_bracket,
    Literal::parse_toggle,
    Special::parse_bracket,
];

fn parse_bracket(body: &str, offset: usize) -> Result<(Expression, usize)> {
    BRACKETS
        .iter()
        .find_map(|parse| parse(body, offset))
        .unwrap_or_else(|| match body.find('>') {
            None => Err(Error::parse(offset, "unterminated '<'")),
            Some(end) => Err(Error::parse(
                offset,
                format!("unrecognized expression <{}>", &body[..end]),
            )),
        })
}

/// Strip an ASCII `prefix` from `s`, ignoring case.
pub(crate) fn strip_prefix_ci<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &s[prefix.len()..])
}

/// Strip an `on`/`off` suffix keyword, ignoring case.
pub(crate) fn strip_toggle(s: &str) -> Option<(KeyAction, &str)> {
    if let Some(rest) = strip_prefix_ci(s, "on") {
        Some((KeyAction::On, rest))
    } else {
        strip_prefix_ci(s, "off").map(|rest| (KeyAction::Off, rest))
    }
}

/// Parse a duration such as `1h30m`, `1.5s`, `250ms` or `4m2ns`.
///
/// Accepts a sequence of decimal numbers, each with an optional fraction and
/// a required unit (`h`, `m`, `s`, `ms`, `us`, `µs`, `μs`, `ns`). A bare `0`
/// is also accepted.
///
/// Stricter than Go's `time.ParseDuration`: a leading `-` is an error rather
/// than a negative duration, so `<wait-1s>` fails to parse instead of
/// silently not pausing.
///
/// On error the offset in [`Error::Parse`] is relative to `text`.
pub fn parse_duration(text: &str) -> Result<Duration> {
    let mut rest = text.strip_prefix('+').unwrap_or(text);
    if rest.starts_with('-') {
        return Err(Error::parse(0, "negative durations are not allowed"));
    }
    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err(Error::parse(0, format!("invalid duration {text:?}")));
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let offset = text.len() - rest.len();
        let (whole, after) = split_digits(rest);
        let (fraction, after) = match after.strip_prefix('.') {
            Some(after) => split_digits(after),
            None => ("", after),
        };
        if whole.is_empty() && fraction.is_empty() {
            return Err(Error::parse(offset, format!("invalid duration {text:?}")));
        }

        let unit_len = after
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(after.len());
        let (unit, after) = after.split_at(unit_len);
        let scale = match unit {
            "ns" => 1,
            "us" | "µs" | "μs" => 1_000,
            "ms" => 1_000_000,
            "s" => 1_000_000_000,
            "m" => 60 * 1_000_000_000,
            "h" => 3_600 * 1_000_000_000,
            "" => {
                return Err(Error::parse(
                    offset,
                    format!("missing unit in duration {text:?}"),
                ));
            }
            other => {
                return Err(Error::parse(
                    offset + whole.len(),
                    format!("unknown unit {other:?} in duration {text:?}"),
                ));
            }
        };

        let out_of_range = || Error::parse(offset, format!("duration {text:?} is out of range"));
        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| out_of_range())?
        };
        let mut nanos = whole.checked_mul(scale).ok_or_else(out_of_range)?;
        if !fraction.is_empty() {
            // Digits past the 18th are below nanosecond precision for every unit.
            let digits = &fraction[..fraction.len().min(18)];
            let value: u128 = digits.parse().map_err(|_| out_of_range())?;
            nanos += value * scale / 10u128.pow(digits.len() as u32);
        }
        total = total.checked_add(nanos).ok_or_else(out_of_range)?;
        rest = after;
    }

    u64::try_from(total)
        .map(Duration::from_nanos)
        .map_err(|_| Error::parse(0, format!("duration {text:?} is out of range")))
}

fn split_digits(s: &str) -> (&str, &str) {
    let len = s.bytes().take_while(u8::is_ascii_digit).count();
    s.split_at(len)
}
