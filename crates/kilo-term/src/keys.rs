// SPDX-License-Identifier: MIT
//
// Key reading and dispatch.
//
// In raw mode with `VMIN = 0`, a read returns zero bytes when the timeout
// expires with nothing typed. That is the normal idle state, not an error,
// so `read_key` simply asks again. Only a genuine I/O failure escapes.
//
// One byte is one key. Escape sequences for arrows and function keys arrive
// as several keys; nothing here tries to reassemble them.

use std::io::{self, Read};

use tracing::trace;

use crate::error::{Error, Result};

/// The byte a terminal sends for Ctrl plus `key`.
///
/// Ctrl clears bits 5 and 6 of the ASCII code: `ctrl_key(b'q') == 0x11`.
#[inline]
#[must_use]
pub const fn ctrl_key(key: u8) -> u8 {
    key & 0x1f
}

/// The default quit chord, Ctrl-Q.
pub const QUIT: u8 = ctrl_key(b'q');

/// What the event loop should do after a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Keep running.
    Continue,
    /// Restore the terminal, clear the screen, exit successfully.
    Quit,
}

/// Block until one byte arrives on `input` and return it.
///
/// Timeouts (`Ok(0)`), `WouldBlock`, and `Interrupted` are retried.
///
/// # Errors
///
/// [`Error::Read`] for any other read failure.
pub fn read_key(input: &mut impl Read) -> Result<u8> {
    let mut byte = [0u8; 1];
    loop {
        match input.read(&mut byte) {
            Ok(1) => return Ok(byte[0]),
            Ok(_) => {}
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) => {}
            Err(e) => return Err(Error::Read(e)),
        }
    }
}

/// Map a key to an action. Only `quit` means anything; every other byte is
/// ignored until there is an editing core to give it meaning.
#[must_use]
pub fn dispatch(key: u8, quit: u8) -> Action {
    if key == quit {
        Action::Quit
    } else {
        trace!(key, "ignored key");
        Action::Continue
    }
}

/// Describe a key the way the key inspector prints it: the decimal code,
/// plus the character itself when it is printable.
#[must_use]
pub fn describe(key: u8) -> String {
    if key.is_ascii_control() || !key.is_ascii() {
        format!("{key}")
    } else {
        format!("{key} ('{}')", char::from(key))
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
