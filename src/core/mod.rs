//! Platform-facing building blocks.
//!
//! This module contains the leaf components the cursor backends are built
//! from:
//!
//! - **env**: snapshot of the environment variables detection relies on
//! - **stream**: output stream identity (`StreamHandle`, `Sink`)
//! - **classify**: ANSI / legacy Windows console / plain classification
//! - **attrs**: colour and style bitmask plus the ANSI escape table
//! - **raw_input**: non-canonical stdin reads for cursor position replies
//! - **console**: native Windows console calls
//! - **size**: ordered terminal-size strategies with memoization
//!
//! # Architecture
//!
//! ```text
//! Cursor
//! ├── StreamHandle (where bytes go)
//! ├── TerminalKind (from classify)
//! ├── SizeResolver
//! │   └── SizeProbe (notebook → terminal → … → COLUMNS/LINES → fallback)
//! └── backend protocol
//!     ├── ANSI: escape sequences + InputChannel
//!     └── legacy: console API
//! ```

pub mod attrs;
pub mod classify;
pub mod console;
pub mod env;
pub mod raw_input;
pub mod size;
pub mod stream;
