// SPDX-License-Identifier: MIT
//
// ANSI escape sequence generation.
//
// Pure functions that write VT100 sequences to any `impl Write`. No state,
// no decisions about when to emit. That's the renderer's and the prober's
// job; this module only knows the byte-level encoding of the handful of
// commands a full-screen redraw and a cursor probe need.
//
// All functions return `io::Result` propagated from the underlying writer.
// Writing into a `FrameBuffer` never fails.

use std::io::{self, Write};

/// The escape byte that starts every sequence.
pub const ESC: u8 = 0x1b;

// ─── Cursor ──────────────────────────────────────────────────────────────────

/// Move the cursor to the top-left corner (CUP with no parameters).
#[inline]
pub fn cursor_home(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[H")
}

/// Hide the cursor (DECTCEM reset).
#[inline]
pub fn cursor_hide(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?25l")
}

/// Show the cursor (DECTCEM set).
#[inline]
pub fn cursor_show(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?25h")
}

/// Move the cursor right by `n` columns (CUF).
///
/// The terminal clamps the movement at the right margin, which is what makes
/// a large `n` useful for finding the last column.
#[inline]
pub fn cursor_forward(w: &mut impl Write, n: u16) -> io::Result<()> {
    write!(w, "\x1b[{n}C")
}

/// Move the cursor down by `n` rows (CUD), clamped at the bottom margin.
#[inline]
pub fn cursor_down(w: &mut impl Write, n: u16) -> io::Result<()> {
    write!(w, "\x1b[{n}B")
}

/// Ask the terminal to report the cursor position (DSR 6).
///
/// The reply arrives on the input side as `ESC [ row ; col R`.
#[inline]
pub fn request_cursor_position(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[6n")
}

// ─── Screen ──────────────────────────────────────────────────────────────────

/// Clear the entire screen (ED 2).
#[inline]
pub fn clear_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[2J")
}

/// Erase from the cursor to the end of the line (EL 0).
#[inline]
pub fn clear_line(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[K")
}

/// Screen reset written on the way out: clear, home, show cursor.
///
/// Sent at quit, after a fatal error, and by the panic hook. There is no
/// frame in progress at any of those points and nothing left to preserve.
pub const RESTORE_SCREEN: &[u8] = b"\x1b[2J\x1b[H\x1b[?25h";

// ─── Tests ───────────────────────────────────────────────────────────────────
