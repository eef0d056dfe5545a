// SPDX-License-Identifier: MIT
//
// The real terminal device.
//
// Safety: termios (tcgetattr, tcsetattr), ioctl (TIOCGWINSZ), isatty, and
// unbuffered read/write on raw fds are the POSIX interfaces for terminal
// control. There is no safe alternative; every unsafe block is a single call.
#![allow(unsafe_code)]
//
// `Tty` is a pair of borrowed file descriptors, not an owner. It never closes
// anything, which is what lets the event loop copy it freely: one copy inside
// the raw-mode guard, one for reading keys and writing frames.
//
// Reads and writes go straight to the fd. Rust's `Stdout` is line-buffered
// and would split a frame at every `\n`; a frame must reach the terminal as
// one `write()`.

use std::io::{self, Read, Write};
use std::os::fd::RawFd;

use crate::geometry::WindowSize;
use crate::raw::{LineDiscipline, TerminalSettings};

/// A terminal reached through an input fd and an output fd.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tty {
    input: RawFd,
    output: RawFd,
}

impl Tty {
    /// The process's own terminal: stdin for input, stdout for output.
    #[must_use]
    pub const fn stdio() -> Self {
        Self {
            input: libc::STDIN_FILENO,
            output: libc::STDOUT_FILENO,
        }
    }

    /// A terminal on arbitrary fds. The caller keeps them open for as long
    /// as this handle (and every copy of it) is in use.
    #[must_use]
    pub const fn from_fds(input: RawFd, output: RawFd) -> Self {
        Self { input, output }
    }

    /// Whether the input fd is connected to a terminal.
    #[must_use]
    pub fn is_tty(&self) -> bool {
        unsafe { libc::isatty(self.input) != 0 }
    }
}

impl LineDiscipline for Tty {
    fn get_settings(&self) -> io::Result<TerminalSettings> {
        let mut termios: libc::termios = unsafe { std::mem::zeroed() };
        if unsafe { libc::tcgetattr(self.input, &raw mut termios) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(TerminalSettings::from_termios(termios))
    }

    fn set_settings(&self, settings: &TerminalSettings) -> io::Result<()> {
        if unsafe { libc::tcsetattr(self.input, libc::TCSAFLUSH, settings.as_termios()) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn panic_fds(&self) -> Option<(RawFd, RawFd)> {
        Some((self.input, self.output))
    }
}

impl WindowSize for Tty {
    fn window_size(&self) -> io::Result<(u16, u16)> {
        let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
        if unsafe { libc::ioctl(self.output, libc::TIOCGWINSZ, &raw mut ws) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok((ws.ws_row, ws.ws_col))
    }
}

impl Read for Tty {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = unsafe { libc::read(self.input, buf.as_mut_ptr().cast(), buf.len()) };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        #[allow(clippy::cast_sign_loss)] // n >= 0 checked above.
        Ok(n as usize)
    }
}

impl Write for Tty {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = unsafe { libc::write(self.output, buf.as_ptr().cast(), buf.len()) };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        #[allow(clippy::cast_sign_loss)]
        Ok(n as usize)
    }

    fn flush(&mut self) -> io::Result<()> {
        // Unbuffered: every write() already reached the fd.
        Ok(())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// A pipe: not a terminal, but real fds for read/write.
    fn pipe() -> (RawFd, RawFd) {
        let mut fds = [0; 2];
        assert_eq!(unsafe { libc::pipe(fds.as_mut_ptr()) }, 0);
        (fds[0], fds[1])
    }

    fn close(fd: RawFd) {
        unsafe {
            libc::close(fd);
        }
    }

    #[test]
    fn stdio_uses_standard_fds() {
        assert_eq!(Tty::stdio(), Tty::from_fds(0, 1));
    }

    #[test]
    fn pipe_is_not_a_tty() {
        let (r, w) = pipe();
        assert!(!Tty::from_fds(r, w).is_tty());
        close(r);
        close(w);
    }

    #[test]
    fn settings_on_pipe_fail_with_enotty() {
        let (r, w) = pipe();
        let err = Tty::from_fds(r, w).get_settings().unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::ENOTTY));
        close(r);
        close(w);
    }

    #[test]
    fn window_size_on_pipe_fails() {
        let (r, w) = pipe();
        assert!(Tty::from_fds(r, w).window_size().is_err());
        close(r);
        close(w);
    }

    #[test]
    fn write_then_read_through_pipe() {
        let (r, w) = pipe();
        let mut tty = Tty::from_fds(r, w);
        tty.write_all(b"\x1b[H~").unwrap();
        let mut buf = [0u8; 8];
        let n = tty.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"\x1b[H~");
        close(r);
        close(w);
    }
}
