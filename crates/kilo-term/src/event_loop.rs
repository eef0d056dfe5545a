// SPDX-License-Identifier: MIT
//
// Event loop: setup, then redraw, read and dispatch until quit, then teardown.
//
// The loop is strictly sequential and single-threaded:
//
//   1. Enter raw mode. The guard lives on this stack frame, so every way out
//      of `run` (quit, `?`, panic) restores the terminal.
//   2. Determine the geometry, once. There is no resize handling.
//   3. Forever: compose and write a frame, block for one key, dispatch it.
//
// The per-read timeout set up by raw mode bounds each `read()`, so an idle
// editor sleeps in the kernel instead of spinning.
//
// Frame writes are allowed to fail. A lost frame is logged and the next
// iteration draws a fresh one; only key reads and terminal configuration can
// end the session with an error.

use std::io::{Read, Write};

use tracing::{debug, info, warn};

use crate::ansi;
use crate::error::{Error, Result};
use crate::frame::{self, FrameBuffer};
use crate::geometry::{self, Geometry, WindowSize};
use crate::keys::{self, Action};
use crate::raw::{LineDiscipline, RawMode, ReadTimeout};
use crate::tty::Tty;

// ─── App Trait ───────────────────────────────────────────────────────────────

/// Application interface for the event loop.
///
/// Everything has a default, so an empty `impl App for T {}` is a blank
/// screen of placeholders that quits on the quit chord.
pub trait App {
    /// Called once, after the geometry is known and before the first frame.
    fn on_start(&mut self, _geometry: Geometry) {}

    /// Handle a key that is not the quit chord.
    ///
    /// Return [`Action::Quit`] to end the session as if the quit chord had
    /// been pressed.
    fn on_key(&mut self, _key: u8) -> Action {
        Action::Continue
    }

    /// Append the content of screen row `row` to `buf`.
    ///
    /// The loop adds the erase-to-end-of-line and the row separator; the
    /// content itself must not exceed `geometry.cols()` bytes.
    fn draw_row(&self, buf: &mut FrameBuffer, row: u16, _geometry: Geometry) {
        frame::placeholder_row(buf, row);
    }
}

// ─── Loop Config ─────────────────────────────────────────────────────────────

/// Tunables for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopConfig {
    /// How long one `read()` waits before returning empty-handed.
    pub timeout: ReadTimeout,
    /// The byte that ends the session.
    pub quit_key: u8,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            timeout: ReadTimeout::default(),
            quit_key: keys::QUIT,
        }
    }
}

// ─── EventLoop ───────────────────────────────────────────────────────────────

/// The editor's main loop over a terminal device.
///
/// # Example
///
/// ```no_run
/// use kilo_term::event_loop::{App, EventLoop};
///
/// struct Blank;
/// impl App for Blank {}
///
/// EventLoop::new().run(&mut Blank)?;
/// # Ok::<(), kilo_term::Error>(())
/// ```
#[derive(Debug)]
pub struct EventLoop<T = Tty> {
    tty: T,
    config: LoopConfig,
}

impl EventLoop<Tty> {
    /// An event loop on the process's own terminal with default settings.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_config(Tty::stdio(), LoopConfig {
            timeout: ReadTimeout::from_deciseconds(1),
            quit_key: keys::QUIT,
        })
    }
}

impl Default for EventLoop<Tty> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EventLoop<T> {
    /// An event loop on `tty` with custom settings.
    #[must_use]
    pub const fn with_config(tty: T, config: LoopConfig) -> Self {
        Self { tty, config }
    }

    /// The session settings.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &LoopConfig {
        &self.config
    }
}

impl<T> EventLoop<T>
where
    T: LineDiscipline + WindowSize + Read + Write + Clone,
{
    /// Run a session until the quit chord or a fatal error.
    ///
    /// On the way out, whichever way that is, the screen is cleared and the
    /// original terminal settings are reinstalled.
    ///
    /// # Errors
    ///
    /// Any fatal [`Error`]: raw mode could not be entered or left, the
    /// geometry could not be determined, or reading a key failed. When both
    /// the session and the restore fail, the session's error is returned.
    pub fn run(&mut self, app: &mut impl App) -> Result<()> {
        let mut raw = RawMode::enter(self.tty.clone(), self.config.timeout)?;

        let result = self.session(app);

        // Best-effort: the terminal is about to be handed back either way.
        let _ = self.tty.write_all(ansi::RESTORE_SCREEN);
        let left = raw.leave();

        match &result {
            Ok(()) => info!("session ended"),
            Err(e) => debug!(error = %e, "session failed"),
        }
        result.and(left)
    }

    fn session(&mut self, app: &mut impl App) -> Result<()> {
        let geometry = geometry::get_size(&mut self.tty)?;
        info!(rows = geometry.rows(), cols = geometry.cols(), "session started");
        app.on_start(geometry);

        loop {
            self.redraw(&*app, geometry);

            let key = keys::read_key(&mut self.tty)?;
            let action = match keys::dispatch(key, self.config.quit_key) {
                Action::Quit => Action::Quit,
                Action::Continue => app.on_key(key),
            };
            if action == Action::Quit {
                return Ok(());
            }
        }
    }

    /// Compose and write one frame. A failed write costs this frame only.
    fn redraw(&mut self, app: &impl App, geometry: Geometry) {
        let draw = |buf: &mut FrameBuffer, row| app.draw_row(buf, row, geometry);
        if let Err(e) = frame::refresh(&mut self.tty, geometry, draw) {
            warn!(error = %e, "frame dropped");
        }
    }
}

/// Map the outcome of a session to a process exit code.
#[must_use]
pub fn exit_code(result: &Result<()>) -> i32 {
    i32::from(result.is_err())
}

/// Refuse to start on a device that is not a terminal.
///
/// # Errors
///
/// [`Error::NotATty`] if `tty`'s input is not a terminal.
pub fn ensure_tty(tty: &Tty) -> Result<()> {
    if tty.is_tty() { Ok(()) } else { Err(Error::NotATty) }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
