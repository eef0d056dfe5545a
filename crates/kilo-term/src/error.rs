// SPDX-License-Identifier: MIT
//
// Error taxonomy for terminal control.
//
// Everything here is fatal to the session: the caller restores the terminal,
// reports the message, and exits. Transient "no byte yet" reads never become
// an `Error`, and frame write failures are logged and dropped by the event
// loop instead of surfacing here.

use std::io;

use thiserror::Error;

/// A fatal terminal failure.
#[derive(Debug, Error)]
pub enum Error {
    /// Reading the line-discipline settings failed (`tcgetattr`).
    #[error("failed to read terminal settings: {0}")]
    GetSettings(#[source] io::Error),

    /// Installing line-discipline settings failed (`tcsetattr`).
    #[error("failed to apply terminal settings: {0}")]
    SetSettings(#[source] io::Error),

    /// Raw mode is already held by another guard in this process.
    #[error("raw mode is already active in this process")]
    AlreadyActive,

    /// Writing the cursor probe or reading its reply failed.
    #[error("cursor position probe failed: {0}")]
    Probe(#[source] io::Error),

    /// The terminal's reply to `ESC[6n` was not `ESC [ row ; col R`.
    #[error("malformed cursor position report: \"{}\"", .0.escape_ascii())]
    MalformedReport(Vec<u8>),

    /// The terminal reported a screen with zero rows or columns.
    #[error("terminal reported a degenerate size ({rows}x{cols})")]
    DegenerateGeometry { rows: u16, cols: u16 },

    /// Reading a key from the terminal failed.
    #[error("failed to read from terminal: {0}")]
    Read(#[source] io::Error),

    /// Writing to the terminal failed outside of frame composition.
    #[error("failed to write to terminal: {0}")]
    Write(#[source] io::Error),

    /// The input side is not attached to a terminal device.
    #[error("not a terminal")]
    NotATty,
}

/// Shorthand for results carrying a terminal [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

// ─── Tests ───────────────────────────────────────────────────────────────────
