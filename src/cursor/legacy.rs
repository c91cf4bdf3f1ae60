//! Native Windows console protocol
//!
//! The console has no bold; underscore and colours are bits of a single
//! attribute word that stays in effect until it is reset.

use std::io;

use super::Position;
use crate::core::attrs::{ColorAttribute, Style};
use crate::core::console;
use crate::core::stream::StdStream;

/// Attribute word for one write.
///
/// Explicit attributes replace the persistent style, except that a
/// persistent underscore is always added and the persistent colour fills in
/// when the explicit value carries no colour. Bold is dropped.
pub fn console_attributes(explicit: Option<ColorAttribute>, style: &Style) -> ColorAttribute {
    let mut attrs = explicit.unwrap_or_else(|| {
        let mut attrs = style.color.unwrap_or_default();
        if style.underscore {
            attrs |= ColorAttribute::UNDERSCORE;
        }
        attrs
    });

    attrs.remove(ColorAttribute::BOLD);
    if style.underscore {
        attrs |= ColorAttribute::UNDERSCORE;
    }
    if attrs.difference(ColorAttribute::UNDERSCORE).is_empty() {
        if let Some(color) = style.color {
            attrs |= color;
        }
    }
    attrs
}

fn to_coord(value: u16) -> i16 {
    i16::try_from(value.saturating_sub(1)).unwrap_or(i16::MAX)
}

fn from_coord(value: i16) -> u16 {
    u16::try_from(value).unwrap_or(0).saturating_add(1)
}

/// One standard stream's console screen buffer
#[derive(Debug, Clone, Copy)]
pub struct LegacyConsole {
    stream: StdStream,
    /// Attribute word in effect when the console was opened; writes restore it
    default_attributes: u16,
}

impl LegacyConsole {
    pub fn open(stream: StdStream) -> Self {
        let default_attributes = match console::screen_buffer_info(stream) {
            Ok(info) => info.attributes,
            Err(e) => {
                tracing::debug!("Console attributes of {} unreadable: {}", stream.name(), e);
                0
            }
        };
        Self {
            stream,
            default_attributes,
        }
    }

    pub fn default_attributes(&self) -> u16 {
        self.default_attributes
    }

    /// Cursor position, 1-based
    pub fn position(&self) -> io::Result<Position> {
        let info = console::screen_buffer_info(self.stream)?;
        Ok(Position::new(from_coord(info.cursor.0), from_coord(info.cursor.1)))
    }

    pub fn move_to(&self, to: Position) -> io::Result<()> {
        console::set_cursor_position(self.stream, to_coord(to.x), to_coord(to.y))
    }

    pub fn apply(&self, attrs: ColorAttribute) -> io::Result<()> {
        console::set_text_attribute(self.stream, attrs.console_word())
    }

    pub fn reset(&self) -> io::Result<()> {
        console::set_text_attribute(self.stream, self.default_attributes)
    }
}
