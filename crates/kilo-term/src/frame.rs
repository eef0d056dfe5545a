// SPDX-License-Identifier: MIT
//
// Frame composition: one refresh, one write().
//
// Every redraw builds the complete screen update in a `FrameBuffer` first:
// hide the cursor, home it, paint each row (erasing the rest of the line so a
// previous, wider frame leaves no residue), home again, show the cursor. Only
// then does anything reach the terminal, as a single `write_all`. A frame
// written piecemeal can be seen half-drawn; a frame written once cannot.
//
// The buffer is local to one refresh. It is created empty, filled, flushed,
// and dropped; nothing carries over to the next frame.
//
// Appends never fail. If the allocator refuses to grow the buffer, the
// fragment is dropped and the frame goes out incomplete. The next refresh
// repaints everything, so a garbled frame heals itself.

use std::collections::TryReserveError;
use std::io::{self, Write};

use crate::ansi;
use crate::geometry::Geometry;

/// Glyph drawn at the start of rows that have no text.
pub const PLACEHOLDER: u8 = b'~';

// ─── FrameBuffer ─────────────────────────────────────────────────────────────

/// A byte buffer that accumulates one frame for a single `write()`.
///
/// Sized up front from the geometry, so a frame of placeholders never
/// reallocates.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buf: Vec<u8>,
}

/// Per-row overhead: glyph, `ESC[K`, `\r\n`.
const ROW_OVERHEAD: usize = 6;

/// Fixed overhead: hide + home + home + show.
const FRAME_OVERHEAD: usize = 18;

impl FrameBuffer {
    /// Create an empty buffer.
    #[must_use]
    pub const fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Create an empty buffer with room for a placeholder frame of `geometry`.
    #[must_use]
    pub fn for_geometry(geometry: Geometry) -> Self {
        let mut frame = Self::new();
        let want = FRAME_OVERHEAD + usize::from(geometry.rows()) * ROW_OVERHEAD;
        // Best-effort: if this fails, append() tries again fragment by fragment.
        let _ = frame.buf.try_reserve(want);
        frame
    }

    /// Append `bytes`, or drop them if memory cannot be acquired.
    ///
    /// Returns whether the fragment made it into the buffer.
    pub fn append(&mut self, bytes: &[u8]) -> bool {
        self.append_with(bytes, Vec::try_reserve)
    }

    fn append_with(
        &mut self,
        bytes: &[u8],
        reserve: impl FnOnce(&mut Vec<u8>, usize) -> Result<(), TryReserveError>,
    ) -> bool {
        if reserve(&mut self.buf, bytes.len()).is_err() {
            return false;
        }
        self.buf.extend_from_slice(bytes);
        true
    }

    /// Number of bytes accumulated.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether the buffer is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// The accumulated bytes.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Write the whole frame to `w` with one `write_all`, consuming the buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `w` fails.
    pub fn flush_to(self, w: &mut impl Write) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        w.write_all(&self.buf)?;
        w.flush()
    }
}

impl Write for FrameBuffer {
    /// Always reports the full length written: a dropped fragment is not an
    /// I/O error from the frame's point of view.
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.append(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        // Intentionally a no-op. The real flush is flush_to().
        Ok(())
    }
}

// ─── Composition ─────────────────────────────────────────────────────────────

/// Build a complete frame for `geometry`.
///
/// `draw_row(buf, row)` appends the content of screen row `row` (0-based),
/// without erase or line break; those are added here. Content wider than
/// the screen is the caller's to truncate.
pub fn compose(geometry: Geometry, mut draw_row: impl FnMut(&mut FrameBuffer, u16)) -> FrameBuffer {
    let mut frame = FrameBuffer::for_geometry(geometry);

    // Writes into a FrameBuffer cannot fail; the results are discarded.
    let _ = ansi::cursor_hide(&mut frame);
    let _ = ansi::cursor_home(&mut frame);

    let last = geometry.rows() - 1;
    for row in 0..=last {
        draw_row(&mut frame, row);
        let _ = ansi::clear_line(&mut frame);
        if row < last {
            frame.append(b"\r\n");
        }
    }

    let _ = ansi::cursor_home(&mut frame);
    let _ = ansi::cursor_show(&mut frame);
    frame
}

/// Draw an empty row: just the placeholder glyph.
pub fn placeholder_row(buf: &mut FrameBuffer, _row: u16) {
    buf.append(&[PLACEHOLDER]);
}

/// Compose a frame and write it to `out` in one `write_all`.
///
/// # Errors
///
/// Returns an error if writing to `out` fails. Callers treat that as a lost
/// frame, not a fatal condition.
pub fn refresh(
    out: &mut impl Write,
    geometry: Geometry,
    draw_row: impl FnMut(&mut FrameBuffer, u16),
) -> io::Result<()> {
    compose(geometry, draw_row).flush_to(out)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
