// SPDX-License-Identifier: MIT
//
// kilo: a minimal text-mode screen editor.
//
// This binary wires kilo-term's event loop to the editor's screen:
//
//   stdin → read_key → quit chord? → Editor::on_key
//   draw_row × rows → FrameBuffer → one write → terminal
//
// There is no text buffer yet. Every row shows the `~` placeholder, and the
// row a third of the way down carries the centered welcome banner.
//
// `kilo --keys` runs the key inspector instead: raw mode, no frames, one
// line per byte read, `q` to quit. Handy for finding out what a terminal
// sends for a given chord.
//
// Logging goes to the file named by `KILO_LOG` (level from `KILO_LOG_LEVEL`,
// default `info`). Nothing is logged otherwise; stdout belongs to the screen.

use std::env;
use std::ffi::OsString;
use std::fs::OpenOptions;
use std::process;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

#[cfg(unix)]
use kilo_term::event_loop::App;
use kilo_term::frame::{self, FrameBuffer};
use kilo_term::geometry::Geometry;

const VERSION: &str = env!("CARGO_PKG_VERSION");

// ─── Command line ───────────────────────────────────────────────────────────

/// What the process was asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// The full-screen editor.
    Editor,
    /// Print the code of every key pressed until `q`.
    Keys,
}

/// Parsed command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Options {
    mode: Mode,
    /// Per-read timeout in tenths of a second.
    timeout_ds: u8,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            mode: Mode::Editor,
            timeout_ds: 1,
        }
    }
}

/// Outcome of argument parsing that doesn't start a session.
#[derive(Debug, PartialEq, Eq)]
enum Early {
    Help,
    Version,
    Usage(String),
}

impl Options {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self, Early> {
        let mut options = Self::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-h" | "--help" => return Err(Early::Help),
                "-V" | "--version" => return Err(Early::Version),
                "--keys" => options.mode = Mode::Keys,
                "--timeout" => {
                    let value = args
                        .next()
                        .ok_or_else(|| Early::Usage("--timeout needs a value".into()))?;
                    options.timeout_ds = parse_timeout(&value)?;
                }
                other => {
                    if let Some(value) = other.strip_prefix("--timeout=") {
                        options.timeout_ds = parse_timeout(value)?;
                    } else {
                        return Err(Early::Usage(format!("unexpected argument '{other}'")));
                    }
                }
            }
        }

        Ok(options)
    }
}

fn parse_timeout(value: &str) -> Result<u8, Early> {
    match value.parse::<u8>() {
        Ok(ds) if ds > 0 => Ok(ds),
        _ => Err(Early::Usage(format!(
            "--timeout expects 1-255 tenths of a second, got '{value}'"
        ))),
    }
}

fn print_help() {
    eprintln!("kilo {VERSION} - a minimal text-mode screen editor");
    eprintln!();
    eprintln!("Usage: kilo [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --keys            Print the code of each key pressed; q quits");
    eprintln!("  --timeout <DS>    Key read timeout in tenths of a second (default 1)");
    eprintln!("  -V, --version     Show version");
    eprintln!("  -h, --help        Show this help");
    eprintln!();
    eprintln!("Keys:");
    eprintln!("  Ctrl-Q            Quit");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  KILO_LOG          Write a log to this file");
    eprintln!("  KILO_LOG_LEVEL    Log filter (default: info)");
}

// ─── Logging ────────────────────────────────────────────────────────────────

/// Install a file logger if `log_path` is set. Failures leave logging off.
fn init_logging(log_path: Option<OsString>, level: Option<String>) {
    let Some(path) = log_path else {
        return;
    };
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };

    let filter = level
        .and_then(|l| EnvFilter::try_new(l).ok())
        .unwrap_or_else(|| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

// ─── Editor ─────────────────────────────────────────────────────────────────

/// The editor's screen: placeholders and a welcome banner.
struct Editor {
    welcome: String,
}

impl Editor {
    fn new() -> Self {
        Self {
            welcome: format!("Kilo editor -- version {VERSION}"),
        }
    }

    /// The banner row: placeholder, padding, message, centered and cut to
    /// the screen width.
    fn draw_welcome(&self, buf: &mut FrameBuffer, cols: u16) {
        let cols = usize::from(cols);
        let len = self.welcome.len().min(cols);
        let mut padding = (cols - len) / 2;

        if padding > 0 {
            buf.append(&[frame::PLACEHOLDER]);
            padding -= 1;
        }
        buf.append(&b" ".repeat(padding));
        buf.append(&self.welcome.as_bytes()[..len]);
    }

    fn paint_row(&self, buf: &mut FrameBuffer, row: u16, geometry: Geometry) {
        if row == geometry.rows() / 3 {
            self.draw_welcome(buf, geometry.cols());
        } else {
            frame::placeholder_row(buf, row);
        }
    }
}

#[cfg(unix)]
impl App for Editor {
    fn on_start(&mut self, geometry: Geometry) {
        tracing::debug!(rows = geometry.rows(), cols = geometry.cols(), "editor ready");
    }

    fn draw_row(&self, buf: &mut FrameBuffer, row: u16, geometry: Geometry) {
        self.paint_row(buf, row, geometry);
    }
}

// ─── Key inspector ──────────────────────────────────────────────────────────

/// Raw mode, then one line per byte until `q`.
#[cfg(unix)]
fn inspect_keys(
    mut tty: kilo_term::tty::Tty,
    timeout: kilo_term::raw::ReadTimeout,
) -> kilo_term::Result<()> {
    use std::io::Write;

    use kilo_term::Error;
    use kilo_term::keys;
    use kilo_term::raw::RawMode;

    let mut raw = RawMode::enter(tty, timeout)?;
    loop {
        let key = keys::read_key(&mut tty)?;
        // OPOST is off: the line needs its own carriage return.
        write!(tty, "{}\r\n", keys::describe(key)).map_err(Error::Write)?;
        if key == b'q' {
            break;
        }
    }
    raw.leave()
}

// ─── Entry point ────────────────────────────────────────────────────────────

#[cfg(unix)]
fn main() {
    use std::io::Write;

    use kilo_term::ansi;
    use kilo_term::event_loop::{self, EventLoop, LoopConfig};
    use kilo_term::keys;
    use kilo_term::raw::ReadTimeout;
    use kilo_term::tty::Tty;

    let options = match Options::parse(env::args().skip(1)) {
        Ok(options) => options,
        Err(Early::Help) => {
            print_help();
            return;
        }
        Err(Early::Version) => {
            eprintln!("kilo {VERSION}");
            return;
        }
        Err(Early::Usage(msg)) => {
            eprintln!("kilo: {msg}");
            eprintln!("Try 'kilo --help' for more information.");
            process::exit(2);
        }
    };

    init_logging(env::var_os("KILO_LOG"), env::var("KILO_LOG_LEVEL").ok());
    tracing::info!(version = VERSION, mode = ?options.mode, "kilo starting");

    let tty = Tty::stdio();
    let timeout = ReadTimeout::from_deciseconds(options.timeout_ds);

    let result = event_loop::ensure_tty(&tty).and_then(|()| match options.mode {
        Mode::Editor => {
            let config = LoopConfig {
                timeout,
                quit_key: keys::QUIT,
            };
            EventLoop::with_config(tty, config).run(&mut Editor::new())
        }
        Mode::Keys => inspect_keys(tty, timeout),
    });

    if let Err(e) = &result {
        if tty.is_tty() {
            let _ = std::io::stdout().write_all(ansi::RESTORE_SCREEN);
            let _ = std::io::stdout().flush();
        }
        tracing::error!(error = %e, "fatal");
        eprintln!("kilo: {e}");
    }

    process::exit(event_loop::exit_code(&result));
}

#[cfg(not(unix))]
fn main() {
    let _ = Options::parse(env::args().skip(1));
    init_logging(env::var_os("KILO_LOG"), env::var("KILO_LOG_LEVEL").ok());
    eprintln!("kilo: terminal control requires a unix system");
    process::exit(1);
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    fn geometry(rows: u16, cols: u16) -> Geometry {
        Geometry::new(rows, cols).unwrap()
    }

    fn row_text(editor: &Editor, row: u16, g: Geometry) -> String {
        let mut buf = FrameBuffer::new();
        editor.paint_row(&mut buf, row, g);
        String::from_utf8(buf.as_bytes().to_vec()).unwrap()
    }

    // ── Options ───────────────────────────────────────────────────────

    #[test]
    fn no_args_runs_editor() {
        assert_eq!(Options::parse(args(&[])), Ok(Options::default()));
        assert_eq!(Options::default().mode, Mode::Editor);
        assert_eq!(Options::default().timeout_ds, 1);
    }

    #[test]
    fn keys_flag() {
        let o = Options::parse(args(&["--keys"])).unwrap();
        assert_eq!(o.mode, Mode::Keys);
    }

    #[test]
    fn timeout_forms() {
        assert_eq!(Options::parse(args(&["--timeout", "5"])).unwrap().timeout_ds, 5);
        assert_eq!(Options::parse(args(&["--timeout=7"])).unwrap().timeout_ds, 7);
    }

    #[test]
    fn bad_timeouts_are_usage_errors() {
        let cases: [&[&str]; 4] = [
            &["--timeout"],
            &["--timeout", "0"],
            &["--timeout", "256"],
            &["--timeout=x"],
        ];
        for bad in cases {
            assert!(
                matches!(Options::parse(args(bad)), Err(Early::Usage(_))),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn help_and_version() {
        assert_eq!(Options::parse(args(&["-h"])), Err(Early::Help));
        assert_eq!(Options::parse(args(&["--version"])), Err(Early::Version));
    }

    #[test]
    fn unknown_argument() {
        assert_eq!(
            Options::parse(args(&["file.txt"])),
            Err(Early::Usage("unexpected argument 'file.txt'".into()))
        );
    }

    // ── Logging ───────────────────────────────────────────────────────

    #[test]
    fn logging_off_without_path() {
        // Must not install anything or panic.
        init_logging(None, Some("debug".into()));
    }

    // ── Welcome banner ────────────────────────────────────────────────

    #[test]
    fn banner_on_third_row() {
        let editor = Editor::new();
        let g = geometry(24, 80);
        let banner = row_text(&editor, 8, g);
        assert!(banner.starts_with('~'));
        assert!(banner.ends_with(&editor.welcome));
        assert_eq!(row_text(&editor, 0, g), "~");
        assert_eq!(row_text(&editor, 23, g), "~");
    }

    #[test]
    fn banner_is_centered() {
        let editor = Editor::new();
        let banner = row_text(&editor, 8, geometry(24, 80));
        let len = editor.welcome.len();
        let padding = (80 - len) / 2;
        assert_eq!(banner.len(), padding + len);
        assert_eq!(&banner[1..padding], " ".repeat(padding - 1));
    }

    #[test]
    fn banner_truncated_to_width() {
        let editor = Editor::new();
        let banner = row_text(&editor, 3, geometry(10, 10));
        assert_eq!(banner, &editor.welcome[..10]);
    }

    #[test]
    fn banner_on_first_row_of_tiny_screen() {
        let editor = Editor::new();
        let banner = row_text(&editor, 0, geometry(1, 80));
        assert!(banner.contains("Kilo editor"));
    }

    #[test]
    fn full_frame_has_one_banner() {
        let editor = Editor::new();
        let g = geometry(24, 80);
        let frame = frame::compose(g, |buf, row| editor.paint_row(buf, row, g));
        let s = String::from_utf8(frame.as_bytes().to_vec()).unwrap();
        assert_eq!(s.matches("Kilo editor").count(), 1);
        assert_eq!(s.matches('~').count(), 24);
        assert_eq!(s.matches("\r\n").count(), 23);
        assert!(s.starts_with("\x1b[?25l"));
        assert!(s.ends_with("\x1b[?25h"));
    }
}
