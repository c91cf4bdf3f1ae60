//! Output stream identity
//!
//! A [`StreamHandle`] names the destination a cursor draws on: the process
//! standard output, standard error, or an arbitrary caller-supplied sink.
//! Handles compare by [`StreamKey`], which uses the OS descriptor when one
//! is known and object identity otherwise.

use std::fmt;
use std::fs::File;
use std::io::{self, IsTerminal, Write};
use std::sync::Arc;

use parking_lot::Mutex;

/// Raw OS descriptor (file descriptor on Unix, handle value on Windows)
pub type Descriptor = u64;

/// The two process-wide output streams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StdStream {
    Stdout,
    Stderr,
}

impl StdStream {
    pub fn name(&self) -> &'static str {
        match self {
            StdStream::Stdout => "stdout",
            StdStream::Stderr => "stderr",
        }
    }
}

/// A writable destination other than the standard streams.
pub trait Sink: Write + Send {
    /// Whether the sink is attached to a terminal
    fn is_terminal(&self) -> bool {
        false
    }

    /// Underlying OS descriptor, if the sink has one
    fn descriptor(&self) -> Option<Descriptor> {
        None
    }

    /// Whether a terminal reading this sink answers queries on the
    /// process's standard input. Only such sinks get cursor addressing.
    fn is_attached(&self) -> bool {
        false
    }
}

impl Sink for File {
    fn is_terminal(&self) -> bool {
        IsTerminal::is_terminal(self)
    }

    #[cfg(unix)]
    fn descriptor(&self) -> Option<Descriptor> {
        use std::os::unix::io::AsRawFd;
        Some(self.as_raw_fd() as Descriptor)
    }

    #[cfg(windows)]
    fn descriptor(&self) -> Option<Descriptor> {
        use std::os::windows::io::AsRawHandle;
        Some(self.as_raw_handle() as usize as Descriptor)
    }
}

/// Registry key for a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKey {
    Standard(StdStream),
    Descriptor(Descriptor),
    Object(usize),
}

/// Identity of an output destination
#[derive(Clone)]
pub enum StreamHandle {
    Stdout,
    Stderr,
    Custom(Arc<Mutex<dyn Sink>>),
}

impl StreamHandle {
    /// Wrap a sink. Clones of the returned handle share its identity.
    pub fn from_sink<S: Sink + 'static>(sink: S) -> Self {
        StreamHandle::Custom(Arc::new(Mutex::new(sink)))
    }

    pub fn standard(&self) -> Option<StdStream> {
        match self {
            StreamHandle::Stdout => Some(StdStream::Stdout),
            StreamHandle::Stderr => Some(StdStream::Stderr),
            StreamHandle::Custom(_) => None,
        }
    }

    pub fn is_standard(&self) -> bool {
        self.standard().is_some()
    }

    pub fn key(&self) -> StreamKey {
        match self {
            StreamHandle::Stdout => StreamKey::Standard(StdStream::Stdout),
            StreamHandle::Stderr => StreamKey::Standard(StdStream::Stderr),
            StreamHandle::Custom(sink) => match sink.lock().descriptor() {
                #[cfg(unix)]
                Some(1) => StreamKey::Standard(StdStream::Stdout),
                #[cfg(unix)]
                Some(2) => StreamKey::Standard(StdStream::Stderr),
                Some(fd) => StreamKey::Descriptor(fd),
                None => StreamKey::Object(Arc::as_ptr(sink) as *const () as usize),
            },
        }
    }

    /// The `isatty` query
    pub fn is_terminal(&self) -> bool {
        match self {
            StreamHandle::Stdout => io::stdout().is_terminal(),
            StreamHandle::Stderr => io::stderr().is_terminal(),
            StreamHandle::Custom(sink) => sink.lock().is_terminal(),
        }
    }

    /// Whether position replies for this stream arrive on our stdin
    pub fn is_attached(&self) -> bool {
        match self {
            StreamHandle::Stdout | StreamHandle::Stderr => true,
            StreamHandle::Custom(sink) => sink.lock().is_attached(),
        }
    }

    /// The `fileno` query
    pub fn descriptor(&self) -> Option<Descriptor> {
        match self {
            StreamHandle::Stdout => std_descriptor(StdStream::Stdout),
            StreamHandle::Stderr => std_descriptor(StdStream::Stderr),
            StreamHandle::Custom(sink) => sink.lock().descriptor(),
        }
    }

    /// Write all bytes and flush
    pub fn emit(&self, bytes: &[u8]) -> io::Result<()> {
        match self {
            StreamHandle::Stdout => {
                let mut out = io::stdout().lock();
                out.write_all(bytes)?;
                out.flush()
            }
            StreamHandle::Stderr => {
                let mut err = io::stderr().lock();
                err.write_all(bytes)?;
                err.flush()
            }
            StreamHandle::Custom(sink) => {
                let mut sink = sink.lock();
                sink.write_all(bytes)?;
                sink.flush()
            }
        }
    }

    pub fn flush(&self) -> io::Result<()> {
        match self {
            StreamHandle::Stdout => io::stdout().flush(),
            StreamHandle::Stderr => io::stderr().flush(),
            StreamHandle::Custom(sink) => sink.lock().flush(),
        }
    }
}

#[cfg(unix)]
fn std_descriptor(stream: StdStream) -> Option<Descriptor> {
    Some(match stream {
        StdStream::Stdout => libc::STDOUT_FILENO as Descriptor,
        StdStream::Stderr => libc::STDERR_FILENO as Descriptor,
    })
}

#[cfg(windows)]
fn std_descriptor(stream: StdStream) -> Option<Descriptor> {
    use std::os::windows::io::AsRawHandle;
    let raw = match stream {
        StdStream::Stdout => io::stdout().as_raw_handle(),
        StdStream::Stderr => io::stderr().as_raw_handle(),
    };
    if raw.is_null() {
        None
    } else {
        Some(raw as usize as Descriptor)
    }
}

#[cfg(not(any(unix, windows)))]
fn std_descriptor(_stream: StdStream) -> Option<Descriptor> {
    None
}

impl fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamHandle::Stdout => f.write_str("StreamHandle::Stdout"),
            StreamHandle::Stderr => f.write_str("StreamHandle::Stderr"),
            StreamHandle::Custom(_) => write!(f, "StreamHandle::Custom({:?})", self.key()),
        }
    }
}

impl PartialEq for StreamHandle {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for StreamHandle {}
