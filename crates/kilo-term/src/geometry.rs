// SPDX-License-Identifier: MIT
//
// Screen geometry discovery.
//
// Two tiers. The fast path asks the OS (`ioctl(TIOCGWINSZ)` on unix) and
// returns immediately if the answer is sane. Some environments answer with
// an error or with zero columns, so the slow path asks the terminal itself:
// park the cursor in the bottom-right corner with clamped relative moves,
// request a cursor position report, and read back `ESC [ row ; col R`.
//
// The reply is read one byte at a time into a fixed scratch buffer. A
// terminal that never answers, answers with garbage, or answers with more
// than fits in the buffer fails the probe. There is no retry: a terminal that
// cannot report its size once won't do better the second time.

use std::io::{self, Read, Write};

use tracing::debug;

use crate::ansi;
use crate::error::{Error, Result};

// ─── Geometry ────────────────────────────────────────────────────────────────

/// Screen dimensions in character cells. Both fields are strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    rows: u16,
    cols: u16,
}

impl Geometry {
    /// Build a geometry, rejecting zero in either dimension.
    #[must_use]
    pub const fn new(rows: u16, cols: u16) -> Option<Self> {
        if rows == 0 || cols == 0 {
            None
        } else {
            Some(Self { rows, cols })
        }
    }

    /// Number of rows (height in character cells).
    #[inline]
    #[must_use]
    pub const fn rows(self) -> u16 {
        self.rows
    }

    /// Number of columns (width in character cells).
    #[inline]
    #[must_use]
    pub const fn cols(self) -> u16 {
        self.cols
    }

    /// Total number of cells (`cols × rows`).
    #[inline]
    #[must_use]
    pub const fn area(self) -> u32 {
        self.cols as u32 * self.rows as u32
    }
}

// ─── Window Size Query ───────────────────────────────────────────────────────

/// A device that can report its size directly.
///
/// Implementations return whatever the OS says, zeros included. Deciding
/// whether the answer is usable is [`get_size`]'s business.
pub trait WindowSize {
    /// Query `(rows, cols)` from the OS.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the query is unsupported on this device.
    fn window_size(&self) -> io::Result<(u16, u16)>;
}

/// Column and row count for the clamped cursor moves. Any value past the
/// largest plausible terminal works; the terminal stops at its margin.
const FAR_CORNER: u16 = 999;

/// Capacity of the scratch buffer for the cursor position reply.
///
/// `ESC [ 65535 ; 65535 R` is 14 bytes, so anything that overflows this is
/// not a cursor report.
const REPORT_CAPACITY: usize = 32;

/// Determine the screen geometry of `tty`.
///
/// Tries the direct OS query first and falls back to the cursor-report probe
/// when the query fails or reports zero rows or columns.
///
/// # Errors
///
/// Returns [`Error::Probe`] if the probe cannot be written or its reply
/// cannot be read, [`Error::MalformedReport`] if the reply is not a cursor
/// position report, and [`Error::DegenerateGeometry`] if the report contains
/// a zero.
pub fn get_size<T>(tty: &mut T) -> Result<Geometry>
where
    T: WindowSize + Read + Write,
{
    match tty.window_size() {
        Ok((rows, cols)) => {
            if let Some(geometry) = Geometry::new(rows, cols) {
                debug!(rows, cols, "window size from direct query");
                return Ok(geometry);
            }
            debug!(rows, cols, "direct query degenerate, probing cursor");
        }
        Err(e) => debug!(error = %e, "direct query unavailable, probing cursor"),
    }

    probe_size(tty)
}

/// Find the bottom-right corner with the cursor and ask where it ended up.
///
/// # Errors
///
/// See [`get_size`].
pub fn probe_size<T: Read + Write>(tty: &mut T) -> Result<Geometry> {
    let mut request = Vec::with_capacity(16);
    ansi::cursor_forward(&mut request, FAR_CORNER).map_err(Error::Probe)?;
    ansi::cursor_down(&mut request, FAR_CORNER).map_err(Error::Probe)?;
    ansi::request_cursor_position(&mut request).map_err(Error::Probe)?;
    tty.write_all(&request).map_err(Error::Probe)?;
    tty.flush().map_err(Error::Probe)?;

    let (rows, cols) = read_cursor_report(tty)?;
    debug!(rows, cols, "window size from cursor report");
    Geometry::new(rows, cols).ok_or(Error::DegenerateGeometry { rows, cols })
}

/// Read a cursor position report from `input` and parse it.
///
/// Stops at the `R` terminator, when the scratch buffer is full, or when a
/// read returns no data (the raw-mode read timeout expired).
///
/// # Errors
///
/// [`Error::Probe`] on a read failure, [`Error::MalformedReport`] if the
/// collected bytes are not `ESC [ row ; col R`.
pub fn read_cursor_report(input: &mut impl Read) -> Result<(u16, u16)> {
    let mut buf = [0u8; REPORT_CAPACITY];
    let mut len = 0;

    while len < buf.len() {
        match input.read(&mut buf[len..=len]) {
            Ok(0) => break,
            Ok(_) => {
                len += 1;
                if buf[len - 1] == b'R' {
                    break;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
            Err(e) => return Err(Error::Probe(e)),
        }
    }

    parse_cursor_report(&buf[..len]).ok_or_else(|| Error::MalformedReport(buf[..len].to_vec()))
}

/// Parse `ESC [ row ; col R` into `(row, col)`.
///
/// Both fields must be non-empty runs of ASCII digits that fit in a `u16`,
/// and the terminator must be the final byte. Zero is accepted here; the
/// caller decides whether a zero makes sense.
#[must_use]
pub fn parse_cursor_report(reply: &[u8]) -> Option<(u16, u16)> {
    let body = reply
        .strip_prefix(&[ansi::ESC, b'['])?
        .strip_suffix(b"R")?;

    let split = body.iter().position(|&b| b == b';')?;
    let row = parse_decimal(&body[..split])?;
    let col = parse_decimal(&body[split + 1..])?;
    Some((row, col))
}

/// Parse a non-empty ASCII decimal without going through `str`.
fn parse_decimal(digits: &[u8]) -> Option<u16> {
    if digits.is_empty() {
        return None;
    }
    digits.iter().try_fold(0u16, |acc, &b| {
        if b.is_ascii_digit() {
            acc.checked_mul(10)?.checked_add(u16::from(b - b'0'))
        } else {
            None
        }
    })
}

// ─── Tests ───────────────────────────────────────────────────────────────────
