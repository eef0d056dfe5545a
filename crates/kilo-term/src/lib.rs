// SPDX-License-Identifier: MIT
//
// kilo-term: terminal control for the kilo editor.
//
// Takes the terminal into raw mode and guarantees it comes back, finds out
// how big the screen is even when the OS won't say, and draws every frame
// with a single write so nothing tears. Direct termios and ANSI escape
// sequences, no TUI framework in between.
//
// Layers, bottom-up:
//
//   ansi        byte encodings of the escape sequences we emit
//   raw, tty    line-discipline snapshot, raw working copy, RAII guard
//   geometry    ioctl query with cursor-report fallback
//   frame       one-write frame composition
//   keys        blocking single-byte reads and quit dispatch
//   event_loop  setup → (draw, read, dispatch)* → teardown

pub mod ansi;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod keys;

#[cfg(unix)]
pub mod event_loop;
#[cfg(unix)]
pub mod raw;
#[cfg(unix)]
pub mod tty;

pub use error::{Error, Result};
