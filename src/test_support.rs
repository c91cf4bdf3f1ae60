//! In-memory stand-ins for streams, terminal input and size sources.

use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::core::raw_input::InputChannel;
use crate::core::size::{ProbeTarget, SizeSource};
use crate::core::stream::Sink;
use crate::error::ProbeError;

/// Bytes written to a [`MemorySink`], readable after the sink is moved away
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> Vec<u8> {
        self.0.lock().clone()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }

    pub fn clear(&self) {
        self.0.lock().clear();
    }
}

/// Writable sink that records everything and can pretend to be a terminal
pub struct MemorySink {
    buffer: SharedBuffer,
    tty: bool,
    attached: bool,
}

impl MemorySink {
    pub fn new(tty: bool) -> (Self, SharedBuffer) {
        let buffer = SharedBuffer::default();
        (
            Self {
                buffer: buffer.clone(),
                tty,
                attached: false,
            },
            buffer,
        )
    }

    /// A terminal whose replies arrive on our input, like stdout
    pub fn attached() -> (Self, SharedBuffer) {
        let (mut sink, buffer) = Self::new(true);
        sink.attached = true;
        (sink, buffer)
    }
}

impl Write for MemorySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Sink for MemorySink {
    fn is_terminal(&self) -> bool {
        self.tty
    }

    fn is_attached(&self) -> bool {
        self.attached
    }
}

/// Shared counter readable from outside the object that bumps it
#[derive(Debug, Clone, Default)]
pub struct Counter(Arc<AtomicUsize>);

impl Counter {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Mode switch bookkeeping of a [`ScriptedInput`]
#[derive(Debug, Clone, Default)]
pub struct InputProbe {
    starts: Counter,
    ends: Counter,
}

impl InputProbe {
    pub fn starts(&self) -> usize {
        self.starts.get()
    }

    pub fn ends(&self) -> usize {
        self.ends.get()
    }
}

/// Raw-mode windows shared by several inputs; notes any two that overlap
#[derive(Debug, Clone, Default)]
pub struct ReadWindows {
    open: Arc<AtomicUsize>,
    overlapped: Arc<AtomicBool>,
}

impl ReadWindows {
    pub fn overlapped(&self) -> bool {
        self.overlapped.load(Ordering::SeqCst)
    }

    fn enter(&self) {
        if self.open.fetch_add(1, Ordering::SeqCst) > 0 {
            self.overlapped.store(true, Ordering::SeqCst);
        }
    }

    fn leave(&self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Terminal input that replays canned chunks, one per read, then stays empty
pub struct ScriptedInput {
    chunks: VecDeque<Vec<u8>>,
    probe: InputProbe,
    windows: Option<ReadWindows>,
}

impl ScriptedInput {
    pub fn new(chunks: Vec<Vec<u8>>) -> Self {
        Self {
            chunks: chunks.into(),
            probe: InputProbe::default(),
            windows: None,
        }
    }

    /// Report every start/end window to `windows`
    pub fn sharing(mut self, windows: ReadWindows) -> Self {
        self.windows = Some(windows);
        self
    }

    /// A terminal that never answers
    pub fn silent() -> Self {
        Self::new(Vec::new())
    }

    pub fn probe(&self) -> InputProbe {
        self.probe.clone()
    }
}

impl InputChannel for ScriptedInput {
    fn start_read(&mut self) -> io::Result<()> {
        self.probe.starts.bump();
        if let Some(windows) = &self.windows {
            windows.enter();
        }
        Ok(())
    }

    fn end_read(&mut self) -> io::Result<()> {
        if let Some(windows) = &self.windows {
            windows.leave();
        }
        self.probe.ends.bump();
        Ok(())
    }

    fn read_available(&mut self) -> io::Result<Vec<u8>> {
        Ok(self.chunks.pop_front().unwrap_or_default())
    }
}

/// Size source with a fixed answer that counts how often it is asked
pub struct CountingSource {
    name: &'static str,
    answer: Option<(i32, i32)>,
    calls: Counter,
}

impl CountingSource {
    pub fn failing(name: &'static str) -> Self {
        Self {
            name,
            answer: None,
            calls: Counter::default(),
        }
    }

    pub fn answering(name: &'static str, answer: (i32, i32)) -> Self {
        Self {
            name,
            answer: Some(answer),
            calls: Counter::default(),
        }
    }

    pub fn calls(&self) -> Counter {
        self.calls.clone()
    }
}

impl SizeSource for CountingSource {
    fn name(&self) -> &'static str {
        self.name
    }

    fn query(&self, _target: &ProbeTarget) -> Result<(i32, i32), ProbeError> {
        self.calls.bump();
        self.answer.ok_or(ProbeError::Unsupported)
    }
}
