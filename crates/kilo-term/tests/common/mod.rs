// SPDX-License-Identifier: MIT
//
// Pseudo-terminal fixture for integration tests.
//
// The slave side stands in for the user's terminal; the test plays the
// terminal emulator on the master side, reading what the editor draws and
// typing keys back.
#![allow(unsafe_code, dead_code)]

use std::os::fd::RawFd;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

pub struct Pty {
    pub master: RawFd,
    pub slave: RawFd,
}

impl Pty {
    /// Open a pty pair sized `rows × cols`. `None` where the environment has
    /// no pty support (some containers); callers skip in that case.
    pub fn open(rows: u16, cols: u16) -> Option<Self> {
        unsafe {
            let master = libc::posix_openpt(libc::O_RDWR | libc::O_NOCTTY);
            if master < 0 {
                return None;
            }
            if libc::grantpt(master) != 0 || libc::unlockpt(master) != 0 {
                libc::close(master);
                return None;
            }

            let mut name = [0 as libc::c_char; 128];
            if libc::ptsname_r(master, name.as_mut_ptr(), name.len()) != 0 {
                libc::close(master);
                return None;
            }
            let slave = libc::open(name.as_ptr(), libc::O_RDWR | libc::O_NOCTTY);
            if slave < 0 {
                libc::close(master);
                return None;
            }

            let pty = Self { master, slave };
            pty.resize(rows, cols);
            Some(pty)
        }
    }

    pub fn resize(&self, rows: u16, cols: u16) {
        let ws = libc::winsize {
            ws_row: rows,
            ws_col: cols,
            ws_xpixel: 0,
            ws_ypixel: 0,
        };
        unsafe {
            libc::ioctl(self.master, libc::TIOCSWINSZ, &raw const ws);
        }
    }

    /// Type `bytes` into the terminal.
    pub fn type_keys(&self, bytes: &[u8]) {
        type_keys(self.master, bytes);
    }

    /// Everything the slave side wrote, waiting at most `idle` for more.
    pub fn drain(&self, idle: Duration) -> Vec<u8> {
        drain_until(self.master, idle, |_| false)
    }
}

impl Drop for Pty {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.slave);
            libc::close(self.master);
        }
    }
}

/// Raw mode is one session per process; tests that open one take turns.
pub fn serial() -> MutexGuard<'static, ()> {
    static SERIAL: Mutex<()> = Mutex::new(());
    SERIAL.lock().unwrap_or_else(PoisonError::into_inner)
}

pub fn type_keys(master: RawFd, bytes: &[u8]) {
    let n = unsafe { libc::write(master, bytes.as_ptr().cast(), bytes.len()) };
    assert_eq!(usize::try_from(n).ok(), Some(bytes.len()));
}

/// Read from `master` until `done` accepts the bytes so far, or nothing
/// arrives for `idle`.
pub fn drain_until(master: RawFd, idle: Duration, done: impl Fn(&[u8]) -> bool) -> Vec<u8> {
    let mut out = Vec::new();
    let mut buf = [0u8; 4096];
    let mut last = Instant::now();

    while last.elapsed() < idle && !done(&out) {
        let mut pfd = libc::pollfd {
            fd: master,
            events: libc::POLLIN,
            revents: 0,
        };
        if unsafe { libc::poll(&raw mut pfd, 1, 20) } <= 0 {
            continue;
        }
        let n = unsafe { libc::read(master, buf.as_mut_ptr().cast(), buf.len()) };
        if n <= 0 {
            break;
        }
        #[allow(clippy::cast_sign_loss)]
        out.extend_from_slice(&buf[..n as usize]);
        last = Instant::now();
    }
    out
}

/// Occurrences of `needle` in `haystack`.
pub fn count(haystack: &[u8], needle: &[u8]) -> usize {
    haystack.windows(needle.len()).filter(|w| *w == needle).count()
}
