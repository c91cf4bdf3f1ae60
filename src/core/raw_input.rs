//! Raw terminal input for cursor position replies
//!
//! An ANSI terminal answers `ESC[6n` by typing `ESC[{row};{col}R` into the
//! process's input stream. To see that reply the input must be switched out
//! of canonical (line buffered) and echo mode for the duration of the query.
//!
//! The terminal mode is process-wide state, so the mode switch lives in a
//! single static shared by every [`StdinChannel`], and only one query may be
//! in flight at a time ([`QUERY_LOCK`]). The original mode is restored by
//! [`InputChannel::end_read`], by dropping a [`ReadSession`], and by an
//! exit hook registered on first use.

use std::io;

use parking_lot::{Mutex, MutexGuard};

/// Serializes position queries across every backend in the process.
pub static QUERY_LOCK: Mutex<()> = Mutex::new(());

/// Source of terminal reply bytes
pub trait InputChannel: Send {
    /// Enter non-canonical, non-echo mode
    fn start_read(&mut self) -> io::Result<()>;

    /// Restore the mode saved by `start_read`. Safe to call repeatedly.
    fn end_read(&mut self) -> io::Result<()>;

    /// Return whatever input is buffered right now without blocking
    fn read_available(&mut self) -> io::Result<Vec<u8>>;
}

/// Bracket around a raw read: holds the process-wide query lock and
/// restores the terminal mode when dropped.
pub struct ReadSession<'a> {
    channel: &'a mut dyn InputChannel,
    _serial: MutexGuard<'static, ()>,
}

impl<'a> ReadSession<'a> {
    pub fn begin(channel: &'a mut dyn InputChannel) -> io::Result<Self> {
        let serial = QUERY_LOCK.lock();
        channel.start_read()?;
        Ok(Self {
            channel,
            _serial: serial,
        })
    }

    pub fn read_available(&mut self) -> io::Result<Vec<u8>> {
        self.channel.read_available()
    }
}

impl Drop for ReadSession<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.channel.end_read() {
            tracing::warn!("Failed to restore terminal mode: {}", e);
        }
    }
}

/// The process's standard input
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinChannel;

impl StdinChannel {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(unix)]
mod imp {
    use std::io;
    use std::mem::MaybeUninit;

    use parking_lot::Mutex;

    /// Saved terminal mode and exit-hook bookkeeping
    struct RawModeState {
        original: Option<libc::termios>,
        active: bool,
        hook_registered: bool,
    }

    static RAW_MODE: Mutex<RawModeState> = Mutex::new(RawModeState::new());

    const FD: libc::c_int = libc::STDIN_FILENO;

    fn get_attrs() -> io::Result<libc::termios> {
        let mut term = MaybeUninit::<libc::termios>::uninit();
        // SAFETY: tcgetattr fully initializes `term` when it returns 0.
        if unsafe { libc::tcgetattr(FD, term.as_mut_ptr()) } != 0 {
            return Err(io::Error::last_os_error());
        }
        // SAFETY: checked the return value above.
        Ok(unsafe { term.assume_init() })
    }

    fn set_attrs(term: &libc::termios) -> io::Result<()> {
        // SAFETY: `term` is a valid termios obtained from tcgetattr.
        if unsafe { libc::tcsetattr(FD, libc::TCSAFLUSH, term) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    impl RawModeState {
        const fn new() -> Self {
            Self {
                original: None,
                active: false,
                hook_registered: false,
            }
        }

        /// Register the exit hook once; true only for the registering call
        fn ensure_exit_hook(&mut self) -> bool {
            if self.hook_registered {
                return false;
            }
            // SAFETY: restore_at_exit is a plain extern "C" fn with no captured state.
            self.hook_registered = unsafe { libc::atexit(restore_at_exit) } == 0;
            self.hook_registered
        }

        fn restore(&mut self) -> io::Result<()> {
            if !self.active {
                return Ok(());
            }
            self.active = false;
            match self.original.as_ref() {
                Some(original) => set_attrs(original),
                None => Ok(()),
            }
        }
    }

    extern "C" fn restore_at_exit() {
        // Another thread may hold the lock mid-query while the process exits.
        if let Some(mut state) = RAW_MODE.try_lock() {
            let _ = state.restore();
        }
    }

    pub(super) fn start_read() -> io::Result<()> {
        let mut state = RAW_MODE.lock();
        if state.active {
            return Ok(());
        }

        let original = get_attrs()?;
        let mut raw = original;
        raw.c_lflag &= !(libc::ICANON | libc::ECHO);
        set_attrs(&raw)?;

        state.original = Some(original);
        state.active = true;

        state.ensure_exit_hook();
        Ok(())
    }

    pub(super) fn end_read() -> io::Result<()> {
        RAW_MODE.lock().restore()
    }

    pub(super) fn read_available() -> io::Result<Vec<u8>> {
        let mut data = Vec::new();
        let mut buffer = [0u8; 64];

        loop {
            let mut pollfd = libc::pollfd {
                fd: FD,
                events: libc::POLLIN,
                revents: 0,
            };
            // SAFETY: pollfd is a valid, initialized array of length 1.
            let ready = unsafe { libc::poll(&mut pollfd, 1, 0) };
            if ready < 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(err);
            }
            if ready == 0 || pollfd.revents & libc::POLLIN == 0 {
                break;
            }

            // SAFETY: buffer is writable for its full length.
            let n = unsafe {
                libc::read(FD, buffer.as_mut_ptr() as *mut libc::c_void, buffer.len())
            };
            if n < 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(err);
            }
            if n == 0 {
                break;
            }
            data.extend_from_slice(&buffer[..n as usize]);
        }

        Ok(data)
    }

}

#[cfg(windows)]
mod imp {
    use std::io;

    // Console input through the C runtime; it needs no mode switch.
    extern "C" {
        fn _kbhit() -> i32;
        fn _getch() -> i32;
    }

    pub(super) fn start_read() -> io::Result<()> {
        Ok(())
    }

    pub(super) fn end_read() -> io::Result<()> {
        Ok(())
    }

    pub(super) fn read_available() -> io::Result<Vec<u8>> {
        let mut data = Vec::new();
        // SAFETY: _kbhit and _getch take no arguments and only touch CRT console state.
        unsafe {
            while _kbhit() != 0 {
                data.push(_getch() as u8);
            }
        }
        Ok(data)
    }
}

#[cfg(not(any(unix, windows)))]
mod imp {
    use std::io;

    pub(super) fn start_read() -> io::Result<()> {
        Err(io::ErrorKind::Unsupported.into())
    }

    pub(super) fn end_read() -> io::Result<()> {
        Ok(())
    }

    pub(super) fn read_available() -> io::Result<Vec<u8>> {
        Ok(Vec::new())
    }
}

impl InputChannel for StdinChannel {
    fn start_read(&mut self) -> io::Result<()> {
        imp::start_read()
    }

    fn end_read(&mut self) -> io::Result<()> {
        imp::end_read()
    }

    fn read_available(&mut self) -> io::Result<Vec<u8>> {
        imp::read_available()
    }
}
