// SPDX-License-Identifier: MIT
//
// Raw mode and the line-discipline state machine.
//
// Safety: the panic hook below writes to a raw fd and calls tcsetattr
// directly, bypassing the `LineDiscipline` trait object it has no access to.
// Those two calls are the only unsafe code in this module.
#![allow(unsafe_code)]
//
// `RawMode::enter` snapshots the terminal's settings, derives a raw working
// copy, installs it, and hands back a guard. The guard reinstalls the
// snapshot when it is dropped, so every early `?` return between startup and
// shutdown restores the terminal without anyone having to remember to.
// Only one guard may be live per process, and its first `leave` ends the
// session for good: a second `enter` while it is live is refused.
//
// A panic unwinds through the guard too, but the default panic message would
// print to a terminal that has OPOST off and the cursor hidden. The panic
// hook restores first (screen clear, cursor show, original settings) and then
// hands over to the previous hook, so the message lands on a sane terminal.

use std::io;
use std::os::fd::RawFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, Once};

use tracing::debug;

use crate::ansi;
use crate::error::{Error, Result};

// ─── Terminal Settings ───────────────────────────────────────────────────────

/// Opaque snapshot of a terminal's line-discipline configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalSettings(libc::termios);

impl TerminalSettings {
    /// Wrap a raw `termios` value.
    #[must_use]
    pub const fn from_termios(termios: libc::termios) -> Self {
        Self(termios)
    }

    /// The underlying `termios` value.
    #[must_use]
    pub const fn as_termios(&self) -> &libc::termios {
        &self.0
    }

    /// Whether typed characters are echoed back.
    #[must_use]
    pub const fn echo(&self) -> bool {
        self.0.c_lflag & libc::ECHO != 0
    }

    /// Whether input is line-buffered.
    #[must_use]
    pub const fn canonical(&self) -> bool {
        self.0.c_lflag & libc::ICANON != 0
    }

    /// Derive the raw working copy of these settings.
    ///
    /// Input: no XON/XOFF flow control (Ctrl-S/Ctrl-Q reach us), no CR→NL
    /// translation, no SIGINT on break, no parity check, no 8th-bit strip.
    /// Output: no post-processing, so `\n` is not expanded to `\r\n`.
    /// Control: 8-bit characters. Local: no echo, no line buffering, no
    /// Ctrl-V literal-next, no signals from Ctrl-C/Ctrl-Z.
    ///
    /// `VMIN = 0`, `VTIME = timeout`: `read()` returns as soon as a byte is
    /// available, or with zero bytes after `timeout` tenths of a second.
    #[must_use]
    pub fn raw(&self, timeout: ReadTimeout) -> Self {
        let mut t = self.0;
        t.c_iflag &= !(libc::BRKINT | libc::ICRNL | libc::INPCK | libc::ISTRIP | libc::IXON);
        t.c_oflag &= !libc::OPOST;
        t.c_cflag |= libc::CS8;
        t.c_lflag &= !(libc::ECHO | libc::ICANON | libc::IEXTEN | libc::ISIG);
        t.c_cc[libc::VMIN] = 0;
        t.c_cc[libc::VTIME] = timeout.deciseconds();
        Self(t)
    }
}

/// Upper bound on how long a single `read()` waits for input, in tenths of a
/// second. Never zero: a zero `VTIME` with `VMIN = 0` turns the key loop into
/// a busy spin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadTimeout(u8);

impl ReadTimeout {
    /// Build a timeout, clamping zero up to one decisecond.
    #[must_use]
    pub const fn from_deciseconds(ds: u8) -> Self {
        if ds == 0 { Self(1) } else { Self(ds) }
    }

    /// The timeout in tenths of a second.
    #[must_use]
    pub const fn deciseconds(self) -> u8 {
        self.0
    }

    /// The timeout as a [`Duration`](std::time::Duration).
    #[must_use]
    pub const fn as_duration(self) -> std::time::Duration {
        std::time::Duration::from_millis(self.0 as u64 * 100)
    }
}

impl Default for ReadTimeout {
    /// 100 ms.
    fn default() -> Self {
        Self(1)
    }
}

// ─── Line Discipline ─────────────────────────────────────────────────────────

/// A device whose line-discipline settings can be read and replaced.
pub trait LineDiscipline {
    /// Read the current settings (`tcgetattr`).
    ///
    /// # Errors
    ///
    /// Returns the OS error if the device is not a terminal.
    fn get_settings(&self) -> io::Result<TerminalSettings>;

    /// Install `settings`, discarding unread input (`tcsetattr(TCSAFLUSH)`).
    ///
    /// # Errors
    ///
    /// Returns the OS error if the settings cannot be applied.
    fn set_settings(&self, settings: &TerminalSettings) -> io::Result<()>;

    /// The fds the panic hook should restore `(input, output)`, if any.
    ///
    /// Test doubles have no fd and keep the default.
    fn panic_fds(&self) -> Option<(RawFd, RawFd)> {
        None
    }
}

// ─── Panic-Safe Restore ──────────────────────────────────────────────────────

/// What the panic hook needs to undo raw mode: input fd, output fd, and the
/// original settings. `None` whenever raw mode is not active.
static PANIC_BACKUP: Mutex<Option<(RawFd, RawFd, libc::termios)>> = Mutex::new(None);

static PANIC_HOOK_INSTALLED: Once = Once::new();

fn install_panic_hook() {
    PANIC_HOOK_INSTALLED.call_once(|| {
        let original = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            emergency_restore();
            original(info);
        }));
    });
}

/// Write the restore sequence straight to the output fd and reinstall the
/// original settings. Best-effort; nothing here can report failure.
fn emergency_restore() {
    let Ok(mut guard) = PANIC_BACKUP.lock() else {
        return;
    };
    if let Some((input, output, original)) = guard.take() {
        unsafe {
            let _ = libc::write(
                output,
                ansi::RESTORE_SCREEN.as_ptr().cast::<libc::c_void>(),
                ansi::RESTORE_SCREEN.len(),
            );
            let _ = libc::tcsetattr(input, libc::TCSAFLUSH, &raw const original);
        }
    }
}

fn set_panic_backup(backup: Option<(RawFd, RawFd, libc::termios)>) {
    if let Ok(mut guard) = PANIC_BACKUP.lock() {
        *guard = backup;
    }
}

// ─── Session Ownership ───────────────────────────────────────────────────────

/// Set while a [`RawMode`] guard owns the terminal. One per process.
static SESSION_ACTIVE: AtomicBool = AtomicBool::new(false);

fn claim_session() -> Result<()> {
    SESSION_ACTIVE
        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        .map(drop)
        .map_err(|_| Error::AlreadyActive)
}

fn release_session() {
    SESSION_ACTIVE.store(false, Ordering::Release);
}

/// Tests that open sessions run one at a time; the harness runs tests on
/// parallel threads of a single process.
#[cfg(test)]
pub(crate) fn serial_sessions() -> std::sync::MutexGuard<'static, ()> {
    static SERIAL: Mutex<()> = Mutex::new(());
    SERIAL.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

// ─── RawMode ─────────────────────────────────────────────────────────────────

/// Raw mode held for as long as this guard lives.
///
/// Dropping an active guard reinstalls the original settings. Errors during
/// that drop are swallowed, since there is nobody left to report them to;
/// call [`leave`](Self::leave) explicitly to observe them.
///
/// # Example
///
/// ```no_run
/// use kilo_term::raw::{RawMode, ReadTimeout};
/// use kilo_term::tty::Tty;
///
/// let raw = RawMode::enter(Tty::stdio(), ReadTimeout::default())?;
/// // ... read keys, draw frames ...
/// drop(raw); // terminal restored
/// # Ok::<(), kilo_term::Error>(())
/// ```
#[derive(Debug)]
pub struct RawMode<D: LineDiscipline> {
    device: D,
    original: TerminalSettings,
    active: bool,
}

impl<D: LineDiscipline> RawMode<D> {
    /// Snapshot `device`'s settings and switch it to raw mode.
    ///
    /// Restoration is armed (guard constructed, panic backup recorded) before
    /// the raw settings are installed, so a failure or panic at any later
    /// point puts the snapshot back.
    ///
    /// # Errors
    ///
    /// [`Error::AlreadyActive`] if another guard is live in this process,
    /// [`Error::GetSettings`] if the snapshot cannot be taken,
    /// [`Error::SetSettings`] if the raw settings cannot be installed.
    pub fn enter(device: D, timeout: ReadTimeout) -> Result<Self> {
        claim_session()?;
        let original = match device.get_settings() {
            Ok(settings) => settings,
            Err(e) => {
                release_session();
                return Err(Error::GetSettings(e));
            }
        };

        if let Some((input, output)) = device.panic_fds() {
            install_panic_hook();
            set_panic_backup(Some((input, output, original.0)));
        }

        let guard = Self {
            device,
            original,
            active: true,
        };

        // On failure the guard drops here and its leave() disarms everything.
        let working = original.raw(timeout);
        guard
            .device
            .set_settings(&working)
            .map_err(Error::SetSettings)?;

        debug!(timeout_ds = timeout.deciseconds(), "raw mode entered");
        Ok(guard)
    }

    /// Reinstall the original settings and end the session.
    ///
    /// Only the first call touches the device. Later calls, and the drop,
    /// do nothing: the terminal may already belong to the next session.
    ///
    /// # Errors
    ///
    /// [`Error::SetSettings`] if the snapshot cannot be installed. The
    /// terminal may still be raw; there is no retry.
    pub fn leave(&mut self) -> Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;

        let restored = self
            .device
            .set_settings(&self.original)
            .map_err(Error::SetSettings);
        set_panic_backup(None);
        release_session();

        debug!(restored = restored.is_ok(), "raw mode left");
        restored
    }

    /// Whether the session is still open.
    #[inline]
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// The settings captured before raw mode was entered.
    #[inline]
    #[must_use]
    pub const fn original(&self) -> &TerminalSettings {
        &self.original
    }

    /// The device raw mode was entered on.
    #[inline]
    #[must_use]
    pub const fn device(&self) -> &D {
        &self.device
    }
}

impl<D: LineDiscipline> Drop for RawMode<D> {
    fn drop(&mut self) {
        if self.active {
            let _ = self.leave();
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
