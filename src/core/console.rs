//! Native Windows console calls used by the legacy backend and the size
//! probe. On other platforms every call fails with `Unsupported`.

use std::io;

use super::stream::StdStream;

/// The parts of `CONSOLE_SCREEN_BUFFER_INFO` this crate reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenBufferInfo {
    /// Buffer size in character cells
    pub buffer: (i16, i16),
    /// Cursor position, 0-based
    pub cursor: (i16, i16),
    /// Current character attribute word
    pub attributes: u16,
    /// Visible window (left, top, right, bottom), inclusive
    pub window: (i16, i16, i16, i16),
}

impl ScreenBufferInfo {
    /// Visible window size as (columns, rows)
    pub fn window_size(&self) -> (i32, i32) {
        let (left, top, right, bottom) = self.window;
        (
            i32::from(right) - i32::from(left) + 1,
            i32::from(bottom) - i32::from(top) + 1,
        )
    }
}

#[cfg(windows)]
mod imp {
    use std::io;

    use windows::Win32::Foundation::HANDLE;
    use windows::Win32::System::Console::{
        GetConsoleScreenBufferInfo, GetStdHandle, SetConsoleCursorPosition,
        SetConsoleTextAttribute, CONSOLE_CHARACTER_ATTRIBUTES, CONSOLE_SCREEN_BUFFER_INFO, COORD,
        STD_ERROR_HANDLE, STD_OUTPUT_HANDLE,
    };

    use super::ScreenBufferInfo;
    use crate::core::stream::StdStream;

    fn to_io(e: windows::core::Error) -> io::Error {
        io::Error::from_raw_os_error(e.code().0)
    }

    fn std_handle(stream: StdStream) -> io::Result<HANDLE> {
        let id = match stream {
            StdStream::Stdout => STD_OUTPUT_HANDLE,
            StdStream::Stderr => STD_ERROR_HANDLE,
        };
        let handle = unsafe { GetStdHandle(id) }.map_err(to_io)?;
        if handle.is_invalid() {
            return Err(io::Error::new(io::ErrorKind::NotFound, "no console handle"));
        }
        Ok(handle)
    }

    pub(super) fn screen_buffer_info(stream: StdStream) -> io::Result<ScreenBufferInfo> {
        let handle = std_handle(stream)?;
        let mut info = CONSOLE_SCREEN_BUFFER_INFO::default();
        unsafe { GetConsoleScreenBufferInfo(handle, &mut info) }.map_err(to_io)?;
        Ok(ScreenBufferInfo {
            buffer: (info.dwSize.X, info.dwSize.Y),
            cursor: (info.dwCursorPosition.X, info.dwCursorPosition.Y),
            attributes: info.wAttributes.0,
            window: (
                info.srWindow.Left,
                info.srWindow.Top,
                info.srWindow.Right,
                info.srWindow.Bottom,
            ),
        })
    }

    pub(super) fn set_cursor_position(stream: StdStream, x: i16, y: i16) -> io::Result<()> {
        let handle = std_handle(stream)?;
        unsafe { SetConsoleCursorPosition(handle, COORD { X: x, Y: y }) }.map_err(to_io)
    }

    pub(super) fn set_text_attribute(stream: StdStream, attributes: u16) -> io::Result<()> {
        let handle = std_handle(stream)?;
        unsafe { SetConsoleTextAttribute(handle, CONSOLE_CHARACTER_ATTRIBUTES(attributes)) }
            .map_err(to_io)
    }
}

#[cfg(not(windows))]
mod imp {
    use std::io;

    use super::ScreenBufferInfo;
    use crate::core::stream::StdStream;

    pub(super) fn screen_buffer_info(_stream: StdStream) -> io::Result<ScreenBufferInfo> {
        Err(io::ErrorKind::Unsupported.into())
    }

    pub(super) fn set_cursor_position(_stream: StdStream, _x: i16, _y: i16) -> io::Result<()> {
        Err(io::ErrorKind::Unsupported.into())
    }

    pub(super) fn set_text_attribute(_stream: StdStream, _attributes: u16) -> io::Result<()> {
        Err(io::ErrorKind::Unsupported.into())
    }
}

/// `GetConsoleScreenBufferInfo` on a standard stream
pub fn screen_buffer_info(stream: StdStream) -> io::Result<ScreenBufferInfo> {
    imp::screen_buffer_info(stream)
}

/// `SetConsoleCursorPosition` with 0-based coordinates
pub fn set_cursor_position(stream: StdStream, x: i16, y: i16) -> io::Result<()> {
    imp::set_cursor_position(stream, x, y)
}

/// `SetConsoleTextAttribute`
pub fn set_text_attribute(stream: StdStream, attributes: u16) -> io::Result<()> {
    imp::set_text_attribute(stream, attributes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_size_is_inclusive() {
        let info = ScreenBufferInfo {
            buffer: (120, 9001),
            cursor: (0, 0),
            attributes: 0x07,
            window: (0, 100, 119, 129),
        };
        assert_eq!(info.window_size(), (120, 30));
    }

    #[test]
    #[cfg(not(windows))]
    fn test_unsupported_off_windows() {
        let err = screen_buffer_info(StdStream::Stdout).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
    }
}
