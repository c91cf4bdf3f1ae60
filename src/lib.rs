//! termcursor - cursor control and terminal detection for any output stream
//!
//! termcursor figures out what kind of terminal a stream is attached to and
//! hands back a [`Cursor`] that can read and move the cursor position, apply
//! colours, bold and underscore, and report the terminal size on that
//! stream. Streams that are not terminals get a cursor that writes text
//! through untouched, so callers never have to branch on the environment.
//!
//! # Quick Start
//!
//! ```no_run
//! use termcursor::{ColorAttribute, stdout};
//!
//! let cursor = stdout();
//! cursor.set_bold(true);
//! cursor.write("done", Some(1), Some(5), Some(ColorAttribute::FOREGROUND_DARK_GREEN))?;
//! println!("{} columns", cursor.width());
//! # Ok::<(), std::io::Error>(())
//! ```
//!
//! # Terminal kinds
//!
//! | Kind | Detected when | Protocol |
//! |------|---------------|----------|
//! | ANSI | PyCharm/Jupyter host, known `TERM`, `ANSICON` | escape sequences |
//! | legacy Windows console | Windows, none of the above | console API |
//! | none | stream is not a terminal | passthrough |
//!
//! Cursors are shared per stream through a process-wide
//! [`CursorRegistry`]; all operations on one cursor are serialized.

pub mod config;
pub mod core;
pub mod cursor;
pub mod error;

#[cfg(test)]
mod test_support;

pub use crate::config::Config;
pub use crate::core::attrs::{ColorAttribute, Style};
pub use crate::core::classify::TerminalKind;
pub use crate::core::env::Environment;
pub use crate::core::size::TermSize;
pub use crate::core::stream::{Sink, StdStream, StreamHandle};
pub use crate::cursor::registry::{cursor, global, stderr, stdout, CursorRegistry};
pub use crate::cursor::{Cursor, CursorOptions, Position};
pub use crate::error::{ConfigError, CursorError, ProbeError};
