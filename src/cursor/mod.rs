//! Cursor backends
//!
//! A [`Cursor`] draws on one stream using whichever protocol the stream was
//! classified for:
//!
//! - **ANSI**: escape sequences, position read back from standard input
//! - **legacy Windows console**: console API calls
//! - **none**: text passes through untouched
//!
//! Every public operation takes the cursor's reentrant lock, so a write is
//! atomic with respect to other threads using the same cursor while still
//! being free to call `set_position` and friends internally. Use
//! [`Cursor::batch`] to make a sequence of operations atomic.

pub mod ansi;
pub mod legacy;
pub mod registry;

use std::cell::RefCell;
use std::io;
use std::time::Duration;

use parking_lot::ReentrantMutex;
use tracing::{debug, warn};

use crate::config::Config;
use crate::core::attrs::{ColorAttribute, Style};
use crate::core::classify::TerminalKind;
use crate::core::env::Environment;
use crate::core::raw_input::{InputChannel, StdinChannel};
use crate::core::size::{ProbeTarget, SizeProbe, SizeResolver, TermSize};
use crate::core::stream::{Descriptor, StreamHandle};
use crate::error::{CursorError, Result};

use ansi::QuerySettings;
use legacy::LegacyConsole;

/// Shortest sleep between empty polls for a position reply
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Cell coordinates, 1-based, column first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub x: u16,
    pub y: u16,
}

impl Position {
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }
}

/// Pieces a cursor is assembled from
pub struct CursorOptions {
    pub probe: SizeProbe,
    pub input: Box<dyn InputChannel>,
    pub query: QuerySettings,
    pub env: Environment,
}

impl CursorOptions {
    /// Built-in size chain and the process's standard input
    pub fn from_config(config: &Config, env: Environment) -> Self {
        let fallback = TermSize::new(
            config.size.fallback_width.max(1),
            config.size.fallback_height.max(1),
        );
        Self {
            probe: SizeProbe::standard(fallback),
            input: Box::new(StdinChannel::new()),
            query: QuerySettings {
                timeout: config.query.timeout(),
                poll_interval: config.query.poll_interval().max(MIN_POLL_INTERVAL),
            },
            env,
        }
    }
}

enum Backend {
    Ansi,
    Console(LegacyConsole),
    Null,
}

struct Inner {
    style: Style,
    size: SizeResolver,
    input: Box<dyn InputChannel>,
}

/// Position, size and style control for one output stream
pub struct Cursor {
    handle: StreamHandle,
    kind: TerminalKind,
    backend: Backend,
    /// Whether positions can be read and set on this stream at all
    addressable: bool,
    query: QuerySettings,
    env: Environment,
    inner: ReentrantMutex<RefCell<Inner>>,
}

impl Cursor {
    pub fn new(handle: StreamHandle, kind: TerminalKind, options: CursorOptions) -> Self {
        let (backend, addressable) = match (kind, handle.standard()) {
            (TerminalKind::Ansi, _) => (Backend::Ansi, handle.is_attached()),
            (TerminalKind::WindowsLegacy, Some(stream)) => {
                (Backend::Console(LegacyConsole::open(stream)), true)
            }
            (TerminalKind::WindowsLegacy, None) => (Backend::Null, false),
            (TerminalKind::None, _) => (Backend::Null, false),
        };
        debug!(
            "Cursor for {:?}: kind={}, addressable={}",
            handle, kind, addressable
        );

        Self {
            handle,
            kind,
            backend,
            addressable,
            query: options.query,
            env: options.env,
            inner: ReentrantMutex::new(RefCell::new(Inner {
                style: Style::default(),
                size: SizeResolver::new(options.probe),
                input: options.input,
            })),
        }
    }

    pub fn handle(&self) -> &StreamHandle {
        &self.handle
    }

    pub fn kind(&self) -> TerminalKind {
        self.kind
    }

    pub fn is_terminal(&self) -> bool {
        self.handle.is_terminal()
    }

    pub fn descriptor(&self) -> Option<Descriptor> {
        self.handle.descriptor()
    }

    pub fn flush(&self) -> io::Result<()> {
        let _guard = self.inner.lock();
        self.handle.flush()
    }

    /// Run `f` with this cursor locked against other threads.
    pub fn batch<R>(&self, f: impl FnOnce(&Self) -> R) -> R {
        let _guard = self.inner.lock();
        f(self)
    }

    // ---- position ----

    /// Current position, or an error explaining why it is unknown.
    ///
    /// `Ok(None)` means the stream has no readable position at all.
    pub fn try_position(&self) -> Result<Option<Position>> {
        let guard = self.inner.lock();
        if !self.addressable {
            return Ok(None);
        }
        match &self.backend {
            Backend::Ansi => {
                let mut inner = guard.borrow_mut();
                ansi::query_position(&self.handle, inner.input.as_mut(), self.query).map(Some)
            }
            Backend::Console(console) => console.position().map(Some).map_err(CursorError::from),
            Backend::Null => Ok(None),
        }
    }

    /// Current position, `None` when it cannot be determined
    pub fn position(&self) -> Option<Position> {
        match self.try_position() {
            Ok(position) => position,
            Err(e @ CursorError::Timeout(_)) => {
                warn!("{}", e);
                None
            }
            Err(e) => {
                debug!("Cursor position unavailable: {}", e);
                None
            }
        }
    }

    /// Move to the given column and/or row; an axis left as `None` keeps
    /// its current value. Nothing is emitted when the cursor is already
    /// there.
    pub fn set_position(&self, x: Option<u16>, y: Option<u16>) -> io::Result<()> {
        let _guard = self.inner.lock();
        if !self.addressable || (x.is_none() && y.is_none()) {
            return Ok(());
        }

        let current = self.position();
        let target = match (current, x, y) {
            (Some(at), x, y) => Position::new(x.unwrap_or(at.x), y.unwrap_or(at.y)),
            (None, Some(x), Some(y)) => Position::new(x, y),
            (None, _, _) => return Ok(()),
        };
        if current == Some(target) {
            return Ok(());
        }

        match &self.backend {
            Backend::Ansi => self.handle.emit(ansi::move_sequence(target).as_bytes()),
            Backend::Console(console) => console.move_to(target),
            Backend::Null => Ok(()),
        }
    }

    pub fn x(&self) -> Option<u16> {
        self.position().map(|p| p.x)
    }

    pub fn y(&self) -> Option<u16> {
        self.position().map(|p| p.y)
    }

    pub fn set_x(&self, x: u16) -> io::Result<()> {
        self.set_position(Some(x), None)
    }

    pub fn set_y(&self, y: u16) -> io::Result<()> {
        self.set_position(None, Some(y))
    }

    // ---- size ----

    fn probe_target(&self) -> Option<ProbeTarget> {
        let standard = self.handle.standard();
        let descriptor = self.handle.descriptor();
        if standard.is_none() && descriptor.is_none() {
            return None;
        }
        Some(ProbeTarget {
            standard,
            descriptor,
            is_terminal: self.handle.is_terminal(),
            env: self.env.clone(),
        })
    }

    /// Terminal size, resolved on first use and memoized afterwards
    pub fn size(&self) -> TermSize {
        let guard = self.inner.lock();
        let mut inner = guard.borrow_mut();
        if inner.size.is_resolved() {
            return inner.size.size(None);
        }
        let target = self.probe_target();
        inner.size.size(target.as_ref())
    }

    pub fn width(&self) -> u16 {
        self.size().width
    }

    pub fn height(&self) -> u16 {
        self.size().height
    }

    /// Ask the strategy that resolved the size again, e.g. after a resize
    pub fn refresh_size(&self) -> TermSize {
        let guard = self.inner.lock();
        let target = self.probe_target();
        let size = guard.borrow_mut().size.refresh(target.as_ref());
        size
    }

    /// Name of the strategy the size came from; `None` before resolution
    /// and when the fallback was used
    pub fn size_strategy(&self) -> Option<&'static str> {
        let guard = self.inner.lock();
        let strategy = guard.borrow().size.strategy();
        strategy
    }

    // ---- style ----

    pub fn style(&self) -> Style {
        let guard = self.inner.lock();
        let style = guard.borrow().style;
        style
    }

    fn update_style(&self, f: impl FnOnce(&mut Style)) {
        let guard = self.inner.lock();
        f(&mut guard.borrow_mut().style);
    }

    pub fn bold(&self) -> bool {
        self.style().bold
    }

    pub fn set_bold(&self, bold: bool) {
        self.update_style(|s| s.bold = bold);
    }

    pub fn underscore(&self) -> bool {
        self.style().underscore
    }

    pub fn set_underscore(&self, underscore: bool) {
        self.update_style(|s| s.underscore = underscore);
    }

    pub fn color(&self) -> Option<ColorAttribute> {
        self.style().color
    }

    /// Persistent colour; styling bits in `color` are ignored
    pub fn set_color(&self, color: Option<ColorAttribute>) {
        let color = color.map(ColorAttribute::colors).filter(|c| !c.is_empty());
        self.update_style(|s| s.color = color);
    }

    // ---- output ----

    /// Write `text`, optionally at (`x`, `y`) and with explicit attributes.
    ///
    /// Without explicit attributes the persistent style applies. Streams
    /// that cannot be addressed get the text verbatim.
    pub fn write(
        &self,
        text: &str,
        x: Option<u16>,
        y: Option<u16>,
        attrs: Option<ColorAttribute>,
    ) -> io::Result<()> {
        let _guard = self.inner.lock();
        if !self.addressable {
            return self.handle.emit(text.as_bytes());
        }

        let style = self.style();
        match &self.backend {
            Backend::Ansi => {
                let attributes = ansi::attribute_sequence(attrs, &style);
                self.set_position(x, y)?;
                self.handle
                    .emit(ansi::styled_text(text, &attributes).as_bytes())
            }
            Backend::Console(console) => {
                let attributes = legacy::console_attributes(attrs, &style);
                self.set_position(x, y)?;
                if attributes.is_empty() {
                    return self.handle.emit(text.as_bytes());
                }
                if let Err(e) = console.apply(attributes) {
                    debug!("SetConsoleTextAttribute failed: {}", e);
                }
                let written = self.handle.emit(text.as_bytes());
                if let Err(e) = console.reset() {
                    debug!("Console attribute reset failed: {}", e);
                }
                written
            }
            Backend::Null => self.handle.emit(text.as_bytes()),
        }
    }

    /// Plain `write` at the current position
    pub fn print(&self, text: &str) -> io::Result<()> {
        self.write(text, None, None, None)
    }
}
