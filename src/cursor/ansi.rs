//! ANSI escape-sequence protocol
//!
//! Position is queried with `ESC[6n`; the terminal types back
//! `ESC[{row};{col}R` on standard input. Styling is a run of table codes
//! before the text and `ESC[0m` after it.

use std::thread;
use std::time::{Duration, Instant};

use super::Position;
use crate::core::attrs::{ansi_code, color_sequence, ColorAttribute, Style};
use crate::core::raw_input::{InputChannel, ReadSession};
use crate::core::stream::StreamHandle;
use crate::error::{CursorError, Result};

/// Turn off character attributes
pub const MODES_OFF: &str = "\x1b[0m";
/// Ask the terminal for the cursor position
pub const GET_CURSOR: &str = "\x1b[6n";
/// Terminator of the position reply
pub const REPLY_END: u8 = b'R';

/// How long and how eagerly to wait for a position reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuerySettings {
    /// `None` waits forever: a terminal that never answers hangs the caller
    pub timeout: Option<Duration>,
    pub poll_interval: Duration,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            timeout: None,
            poll_interval: Duration::from_millis(1),
        }
    }
}

/// `ESC[{row};{col}H`
pub fn move_sequence(to: Position) -> String {
    format!("\x1b[{};{}H", to.y, to.x)
}

fn push_code(seq: &mut String, attr: ColorAttribute) {
    if let Some(code) = ansi_code(attr) {
        seq.push_str(code);
    }
}

/// Escape codes that put the terminal into the requested style.
///
/// With no explicit attributes the persistent style is used. Bold and
/// underscore come first, each at most once, whether they were asked for
/// explicitly or are persistent. Colour is last; explicit colour bits win
/// over the persistent colour.
pub fn attribute_sequence(explicit: Option<ColorAttribute>, style: &Style) -> String {
    let attrs = match explicit {
        Some(attrs) => attrs,
        None if !style.is_plain() => style.to_attributes(),
        None => return String::new(),
    };

    let mut seq = String::new();
    if attrs.contains(ColorAttribute::BOLD) || style.bold {
        push_code(&mut seq, ColorAttribute::BOLD);
    }
    if attrs.contains(ColorAttribute::UNDERSCORE) || style.underscore {
        push_code(&mut seq, ColorAttribute::UNDERSCORE);
    }

    let colors = attrs.colors();
    if !colors.is_empty() {
        seq.push_str(&color_sequence(colors));
    } else if let Some(color) = style.color {
        seq.push_str(&color_sequence(color));
    }
    seq
}

/// Full byte payload for one styled write (minus any cursor move)
pub fn styled_text(text: &str, attributes: &str) -> String {
    if attributes.is_empty() {
        return text.to_string();
    }
    let mut out = String::with_capacity(attributes.len() + text.len() + MODES_OFF.len());
    out.push_str(attributes);
    out.push_str(text);
    out.push_str(MODES_OFF);
    out
}

/// Parse `ESC[{row};{col}R`, tolerating unrelated input before the reply
/// and ignoring anything after the first terminator.
pub fn parse_position_reply(bytes: &[u8]) -> Result<Position> {
    let malformed = || CursorError::MalformedReply(String::from_utf8_lossy(bytes).into_owned());

    let end = bytes
        .iter()
        .position(|&b| b == REPLY_END)
        .ok_or_else(malformed)?;
    let head = &bytes[..end];
    let start = head
        .windows(2)
        .rposition(|w| w == b"\x1b[")
        .ok_or_else(malformed)?
        + 2;

    let body = std::str::from_utf8(&head[start..]).map_err(|_| malformed())?;
    let (row, col) = body.split_once(';').ok_or_else(malformed)?;
    let row: u16 = row.trim().parse().map_err(|_| malformed())?;
    let col: u16 = col.trim().parse().map_err(|_| malformed())?;
    Ok(Position::new(col, row))
}

/// Send the position query on `handle` and collect raw input from `input`
/// until the reply terminator shows up.
pub fn read_reply(
    handle: &StreamHandle,
    input: &mut dyn InputChannel,
    settings: QuerySettings,
) -> Result<Vec<u8>> {
    let mut session = ReadSession::begin(input)?;
    handle.emit(GET_CURSOR.as_bytes())?;

    let started = Instant::now();
    let mut reply = Vec::new();
    while !reply.contains(&REPLY_END) {
        let chunk = session.read_available()?;
        if !chunk.is_empty() {
            reply.extend_from_slice(&chunk);
            continue;
        }
        if let Some(limit) = settings.timeout {
            if started.elapsed() >= limit {
                return Err(CursorError::Timeout(limit));
            }
        }
        thread::sleep(settings.poll_interval);
    }
    Ok(reply)
}

/// Send the position query on `handle` and wait for the reply on `input`.
pub fn query_position(
    handle: &StreamHandle,
    input: &mut dyn InputChannel,
    settings: QuerySettings,
) -> Result<Position> {
    let reply = read_reply(handle, input, settings)?;
    parse_position_reply(&reply)
}
