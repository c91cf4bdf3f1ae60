//! Terminal size discovery
//!
//! There are several ways to find out how big a terminal is, and which one
//! works depends on the OS, the stream and the host. [`SizeProbe`] tries an
//! ordered chain of [`SizeSource`]s; the first one that answers with two
//! positive numbers wins. [`SizeResolver`] remembers the winner so the chain
//! is walked at most once per cursor.
//!
//! Built-in chain, in order:
//!
//! | # | Strategy            | Mechanism                                   |
//! |---|---------------------|---------------------------------------------|
//! | 1 | `notebook`          | fixed 79x24 inside a Jupyter kernel         |
//! | 2 | `terminal`          | crossterm's size query, width minus one     |
//! | 3 | `controlling-tty`   | `TIOCGWINSZ` on `/dev/tty`                  |
//! | 4 | `tput`              | `tput cols` / `tput lines` subprocess       |
//! | 5 | `ioctl`             | `TIOCGWINSZ` on the stream's descriptor     |
//! | 6 | `console-buffer`    | `GetConsoleScreenBufferInfo` window rect    |
//! | 7 | `environment`       | `COLUMNS` / `LINES`                         |
//!
//! When all of them fail the configured fallback (79x24 by default) is used.

use std::process::{Command, Stdio};

use tracing::{debug, trace};

use super::console;
use super::env::{Environment, COLUMNS, LINES};
use super::stream::{Descriptor, StdStream};
use crate::error::ProbeError;

/// Columns held back from the OS-reported width for the rendering layer
pub const OS_WIDTH_MARGIN: i32 = 1;

/// Size reported inside notebooks and used as the last resort
pub const DEFAULT_SIZE: TermSize = TermSize {
    width: 79,
    height: 24,
};

/// Terminal dimensions in character cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermSize {
    pub width: u16,
    pub height: u16,
}

impl TermSize {
    pub const fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }

    /// Accept only two positive dimensions
    pub fn from_dimensions(width: i32, height: i32) -> Result<Self, ProbeError> {
        match (u16::try_from(width), u16::try_from(height)) {
            (Ok(w), Ok(h)) if w > 0 && h > 0 => Ok(Self::new(w, h)),
            _ => Err(ProbeError::Invalid { width, height }),
        }
    }
}

impl Default for TermSize {
    fn default() -> Self {
        DEFAULT_SIZE
    }
}

/// What a strategy may inspect about the stream being measured
#[derive(Debug, Clone)]
pub struct ProbeTarget {
    pub standard: Option<StdStream>,
    pub descriptor: Option<Descriptor>,
    pub is_terminal: bool,
    pub env: Environment,
}

/// One way of asking for the terminal size
pub trait SizeSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Raw (width, height); validation happens in the probe
    fn query(&self, target: &ProbeTarget) -> Result<(i32, i32), ProbeError>;
}

/// Built-in strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Notebook,
    Terminal,
    ControllingTty,
    Tput,
    Ioctl,
    ConsoleBuffer,
    Environment,
}

impl Strategy {
    /// Every built-in strategy in probing order
    pub const CHAIN: [Strategy; 7] = [
        Strategy::Notebook,
        Strategy::Terminal,
        Strategy::ControllingTty,
        Strategy::Tput,
        Strategy::Ioctl,
        Strategy::ConsoleBuffer,
        Strategy::Environment,
    ];
}

impl SizeSource for Strategy {
    fn name(&self) -> &'static str {
        match self {
            Strategy::Notebook => "notebook",
            Strategy::Terminal => "terminal",
            Strategy::ControllingTty => "controlling-tty",
            Strategy::Tput => "tput",
            Strategy::Ioctl => "ioctl",
            Strategy::ConsoleBuffer => "console-buffer",
            Strategy::Environment => "environment",
        }
    }

    fn query(&self, target: &ProbeTarget) -> Result<(i32, i32), ProbeError> {
        match self {
            Strategy::Notebook => notebook(target),
            Strategy::Terminal => {
                let (w, h) = crossterm::terminal::size()?;
                Ok((i32::from(w) - OS_WIDTH_MARGIN, i32::from(h)))
            }
            Strategy::ControllingTty => controlling_tty(),
            Strategy::Tput => Ok((tput("cols")?, tput("lines")?)),
            Strategy::Ioctl => match target.descriptor {
                Some(fd) => descriptor_size(fd),
                None => Err(ProbeError::Unsupported),
            },
            Strategy::ConsoleBuffer => match target.standard {
                Some(stream) => Ok(console::screen_buffer_info(stream)?.window_size()),
                None => Err(ProbeError::Unsupported),
            },
            Strategy::Environment => environment(&target.env),
        }
    }
}

fn notebook(target: &ProbeTarget) -> Result<(i32, i32), ProbeError> {
    if target.env.is_notebook() && !target.is_terminal {
        Ok((i32::from(DEFAULT_SIZE.width), i32::from(DEFAULT_SIZE.height)))
    } else {
        Err(ProbeError::Unsupported)
    }
}

fn environment(env: &Environment) -> Result<(i32, i32), ProbeError> {
    let read = |name: &'static str| -> Result<i32, ProbeError> {
        env.get(name)
            .ok_or(ProbeError::Missing(name))?
            .trim()
            .parse()
            .map_err(|_| ProbeError::Parse)
    };
    Ok((read(COLUMNS)?, read(LINES)?))
}

fn tput(capability: &str) -> Result<i32, ProbeError> {
    let output = Command::new("tput")
        .arg(capability)
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()?;
    if !output.status.success() {
        return Err(ProbeError::Unsupported);
    }
    String::from_utf8_lossy(&output.stdout)
        .trim()
        .parse()
        .map_err(|_| ProbeError::Parse)
}

#[cfg(unix)]
fn winsize(fd: libc::c_int) -> Result<(i32, i32), ProbeError> {
    let mut ws = libc::winsize {
        ws_row: 0,
        ws_col: 0,
        ws_xpixel: 0,
        ws_ypixel: 0,
    };
    // SAFETY: ws is a valid winsize the kernel writes into.
    if unsafe { libc::ioctl(fd, libc::TIOCGWINSZ, &mut ws) } != 0 {
        return Err(std::io::Error::last_os_error().into());
    }
    Ok((i32::from(ws.ws_col), i32::from(ws.ws_row)))
}

#[cfg(unix)]
fn descriptor_size(fd: Descriptor) -> Result<(i32, i32), ProbeError> {
    let fd = libc::c_int::try_from(fd).map_err(|_| ProbeError::Unsupported)?;
    winsize(fd)
}

#[cfg(unix)]
fn controlling_tty() -> Result<(i32, i32), ProbeError> {
    use std::os::unix::io::AsRawFd;

    let tty = std::fs::File::open("/dev/tty")?;
    winsize(tty.as_raw_fd())
}

#[cfg(not(unix))]
fn descriptor_size(_fd: Descriptor) -> Result<(i32, i32), ProbeError> {
    Err(ProbeError::Unsupported)
}

#[cfg(not(unix))]
fn controlling_tty() -> Result<(i32, i32), ProbeError> {
    Err(ProbeError::Unsupported)
}

/// Outcome of walking the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Strategy at `index` answered with `size`
    Strategy { index: usize, size: TermSize },
    /// Every strategy failed
    Fallback(TermSize),
}

/// Ordered chain of size strategies
pub struct SizeProbe {
    sources: Vec<Box<dyn SizeSource>>,
    fallback: TermSize,
}

impl SizeProbe {
    pub fn new(sources: Vec<Box<dyn SizeSource>>, fallback: TermSize) -> Self {
        Self { sources, fallback }
    }

    /// The built-in chain
    pub fn standard(fallback: TermSize) -> Self {
        let sources = Strategy::CHAIN
            .into_iter()
            .map(|s| Box::new(s) as Box<dyn SizeSource>)
            .collect();
        Self::new(sources, fallback)
    }

    pub fn fallback(&self) -> TermSize {
        self.fallback
    }

    pub fn source_name(&self, index: usize) -> Option<&'static str> {
        self.sources.get(index).map(|s| s.name())
    }

    /// Ask a single strategy
    pub fn query(&self, index: usize, target: &ProbeTarget) -> Result<TermSize, ProbeError> {
        let source = self.sources.get(index).ok_or(ProbeError::Unsupported)?;
        let (width, height) = source.query(target)?;
        TermSize::from_dimensions(width, height)
    }

    /// Walk the chain until a strategy succeeds
    pub fn resolve(&self, target: &ProbeTarget) -> Resolution {
        for (index, source) in self.sources.iter().enumerate() {
            match self.query(index, target) {
                Ok(size) => {
                    debug!(
                        "Terminal size {}x{} from strategy '{}'",
                        size.width,
                        size.height,
                        source.name()
                    );
                    return Resolution::Strategy { index, size };
                }
                Err(e) => trace!("Size strategy '{}' failed: {}", source.name(), e),
            }
        }
        debug!(
            "No size strategy succeeded, using fallback {}x{}",
            self.fallback.width, self.fallback.height
        );
        Resolution::Fallback(self.fallback)
    }
}

/// Memoized size for one stream.
///
/// Transitions once from unresolved to either a resolved strategy or the
/// fallback, and never changes afterwards.
pub struct SizeResolver {
    probe: SizeProbe,
    state: Option<Resolution>,
}

impl SizeResolver {
    pub fn new(probe: SizeProbe) -> Self {
        Self { probe, state: None }
    }

    pub fn is_resolved(&self) -> bool {
        self.state.is_some()
    }

    /// Name of the strategy that won, if any
    pub fn strategy(&self) -> Option<&'static str> {
        match self.state {
            Some(Resolution::Strategy { index, .. }) => self.probe.source_name(index),
            _ => None,
        }
    }

    /// Current size, resolving on first use.
    ///
    /// `target` is `None` for streams with nothing to measure; those go
    /// straight to the fallback.
    pub fn size(&mut self, target: Option<&ProbeTarget>) -> TermSize {
        match self.state {
            Some(Resolution::Strategy { size, .. }) | Some(Resolution::Fallback(size)) => size,
            None => {
                let resolution = match target {
                    Some(target) => self.probe.resolve(target),
                    None => Resolution::Fallback(self.probe.fallback()),
                };
                self.state = Some(resolution);
                match resolution {
                    Resolution::Strategy { size, .. } | Resolution::Fallback(size) => size,
                }
            }
        }
    }

    /// Re-ask the resolved strategy (and only that one) for a fresh size.
    /// A failed re-query keeps the cached size.
    pub fn refresh(&mut self, target: Option<&ProbeTarget>) -> TermSize {
        match (self.state, target) {
            (Some(Resolution::Strategy { index, size }), Some(target)) => {
                match self.probe.query(index, target) {
                    Ok(fresh) => {
                        self.state = Some(Resolution::Strategy { index, size: fresh });
                        fresh
                    }
                    Err(e) => {
                        trace!("Size refresh failed, keeping {}x{}: {}", size.width, size.height, e);
                        size
                    }
                }
            }
            _ => self.size(target),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::CountingSource;

    fn target(env: Environment) -> ProbeTarget {
        ProbeTarget {
            standard: None,
            descriptor: None,
            is_terminal: false,
            env,
        }
    }

    #[test]
    fn test_dimension_validation() {
        assert_eq!(TermSize::from_dimensions(80, 24).unwrap(), TermSize::new(80, 24));
        assert!(TermSize::from_dimensions(0, 24).is_err());
        assert!(TermSize::from_dimensions(80, 0).is_err());
        assert!(TermSize::from_dimensions(-1, 24).is_err());
        assert!(TermSize::from_dimensions(80, 70_000).is_err());
    }

    #[test]
    fn test_environment_strategy() {
        let env = Environment::from_pairs([(COLUMNS, "132"), (LINES, " 43 ")]);
        assert_eq!(Strategy::Environment.query(&target(env)).unwrap(), (132, 43));

        let partial = Environment::from_pairs([(COLUMNS, "132")]);
        assert!(matches!(
            Strategy::Environment.query(&target(partial)),
            Err(ProbeError::Missing(LINES))
        ));

        let garbage = Environment::from_pairs([(COLUMNS, "wide"), (LINES, "24")]);
        assert!(matches!(
            Strategy::Environment.query(&target(garbage)),
            Err(ProbeError::Parse)
        ));
    }

    #[test]
    fn test_notebook_strategy() {
        let env = Environment::from_pairs([(crate::core::env::JPY_PARENT_PID, "99")]);
        assert_eq!(Strategy::Notebook.query(&target(env.clone())).unwrap(), (79, 24));

        let mut tty = target(env);
        tty.is_terminal = true;
        assert!(Strategy::Notebook.query(&tty).is_err());
        assert!(Strategy::Notebook.query(&target(Environment::default())).is_err());
    }

    #[test]
    fn test_handle_specific_strategies_need_a_handle() {
        let t = target(Environment::default());
        assert!(matches!(Strategy::Ioctl.query(&t), Err(ProbeError::Unsupported)));
        assert!(matches!(Strategy::ConsoleBuffer.query(&t), Err(ProbeError::Unsupported)));
    }

    #[test]
    fn test_first_success_wins() {
        let failing = CountingSource::failing("broken");
        let zero = CountingSource::answering("zero", (0, 24));
        let good = CountingSource::answering("good", (100, 30));
        let later = CountingSource::answering("later", (1, 1));
        let counters = [failing.calls(), zero.calls(), good.calls(), later.calls()];

        let sources: Vec<Box<dyn SizeSource>> =
            vec![Box::new(failing), Box::new(zero), Box::new(good), Box::new(later)];
        let probe = SizeProbe::new(sources, DEFAULT_SIZE);
        let resolution = probe.resolve(&target(Environment::default()));
        assert_eq!(
            resolution,
            Resolution::Strategy {
                index: 2,
                size: TermSize::new(100, 30)
            }
        );
        assert_eq!(
            counters.iter().map(|c| c.get()).collect::<Vec<_>>(),
            vec![1, 1, 1, 0]
        );
    }

    #[test]
    fn test_fallback_when_everything_fails() {
        let sources: Vec<Box<dyn SizeSource>> = vec![
            Box::new(CountingSource::failing("a")),
            Box::new(CountingSource::answering("b", (-5, 10))),
        ];
        let probe = SizeProbe::new(sources, TermSize::new(79, 24));
        let mut resolver = SizeResolver::new(probe);
        assert_eq!(resolver.size(Some(&target(Environment::default()))), TermSize::new(79, 24));
        assert!(resolver.is_resolved());
        assert_eq!(resolver.strategy(), None);
    }

    #[test]
    fn test_resolution_is_memoized() {
        let source = CountingSource::answering("os", (120, 40));
        let calls = source.calls();
        let sources: Vec<Box<dyn SizeSource>> = vec![Box::new(source)];
        let mut resolver = SizeResolver::new(SizeProbe::new(sources, DEFAULT_SIZE));

        let t = target(Environment::default());
        for _ in 0..10 {
            assert_eq!(resolver.size(Some(&t)), TermSize::new(120, 40));
        }
        assert_eq!(calls.get(), 1);

        // A changed environment does not trigger re-probing.
        let changed = target(Environment::from_pairs([(COLUMNS, "10"), (LINES, "10")]));
        assert_eq!(resolver.size(Some(&changed)), TermSize::new(120, 40));
        assert_eq!(calls.get(), 1);
        assert_eq!(resolver.strategy(), Some("os"));
    }

    #[test]
    fn test_refresh_only_asks_the_resolved_strategy() {
        let failing = CountingSource::failing("first");
        let good = CountingSource::answering("second", (80, 25));
        let (failing_calls, good_calls) = (failing.calls(), good.calls());
        let sources: Vec<Box<dyn SizeSource>> = vec![Box::new(failing), Box::new(good)];
        let mut resolver = SizeResolver::new(SizeProbe::new(sources, DEFAULT_SIZE));

        let t = target(Environment::default());
        resolver.size(Some(&t));
        resolver.refresh(Some(&t));
        resolver.refresh(Some(&t));
        assert_eq!(failing_calls.get(), 1);
        assert_eq!(good_calls.get(), 3);
    }

    #[test]
    fn test_unmeasurable_stream_uses_fallback_without_probing() {
        let source = CountingSource::answering("os", (120, 40));
        let calls = source.calls();
        let sources: Vec<Box<dyn SizeSource>> = vec![Box::new(source)];
        let mut resolver = SizeResolver::new(SizeProbe::new(sources, TermSize::new(60, 20)));
        assert_eq!(resolver.size(None), TermSize::new(60, 20));
        assert_eq!(calls.get(), 0);
    }
}
