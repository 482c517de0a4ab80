// common.rs -- console output shared by the image and renderer crates

//! Console sink for the `log` facade.
//!
//! Every crate in the workspace reports through `log::{warn, debug, ...}`.
//! [`ConsoleLogger`] is the default backend: it prints to stdout, can be
//! redirected into a buffer (for command output capture and tests), and
//! only lets debug/trace records through when developer mode is on.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use parking_lot::Mutex;

/// Largest single console message; longer messages are truncated.
pub const MAXPRINTMSG: usize = 4096;

// ============================================================
// Redirect buffer
// ============================================================

static RD_BUFFER: Mutex<Option<String>> = parking_lot::const_mutex(None);

/// Developer mode gates debug and trace records.
static DEVELOPER: AtomicBool = AtomicBool::new(false);

/// Begin redirecting console output into a buffer.
pub fn begin_redirect() {
    let mut buf = RD_BUFFER.lock();
    *buf = Some(String::new());
}

/// End redirect and return the captured output.
pub fn end_redirect() -> Option<String> {
    RD_BUFFER.lock().take()
}

/// Enable or disable developer output.
pub fn set_developer(enabled: bool) {
    DEVELOPER.store(enabled, Ordering::Relaxed);
}

/// Whether developer output is enabled.
pub fn developer() -> bool {
    DEVELOPER.load(Ordering::Relaxed)
}

// ============================================================
// Console print
// ============================================================

/// Print to stdout, or append to the redirect buffer if one is active.
pub fn console_print(msg: &str) {
    let msg = truncate_message(msg);
    {
        let mut buf = RD_BUFFER.lock();
        if let Some(ref mut s) = *buf {
            s.push_str(msg);
            return;
        }
    }
    print!("{}", msg);
}

fn truncate_message(msg: &str) -> &str {
    if msg.len() <= MAXPRINTMSG {
        return msg;
    }
    let mut end = MAXPRINTMSG;
    while !msg.is_char_boundary(end) {
        end -= 1;
    }
    &msg[..end]
}

// ============================================================
// log backend
// ============================================================

/// `log::Log` implementation writing through [`console_print`].
pub struct ConsoleLogger;

static LOGGER: ConsoleLogger = ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Info || developer()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = match record.level() {
            Level::Error | Level::Warn => {
                format!("{}: {}: {}\n", record.level(), record.target(), record.args())
            }
            _ => format!("{}: {}\n", record.target(), record.args()),
        };
        console_print(&line);
    }

    fn flush(&self) {
        let _ = std::io::stdout().flush();
    }
}

/// Install [`ConsoleLogger`] as the global logger.
///
/// Fails if another logger was installed first.
pub fn init_console_logger() -> Result<(), SetLoggerError> {
    log::set_logger(&LOGGER)?;
    log::set_max_level(LevelFilter::Trace);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_captures_console_print() {
        begin_redirect();
        console_print("texture: 4 levels\n");
        console_print("done\n");
        let captured = end_redirect();
        assert_eq!(captured.as_deref(), Some("texture: 4 levels\ndone\n"));
        assert!(end_redirect().is_none());
    }

    #[test]
    fn test_truncate_message_respects_char_boundary() {
        let long = "é".repeat(MAXPRINTMSG);
        let cut = truncate_message(&long);
        assert!(cut.len() <= MAXPRINTMSG);
        assert!(cut.chars().all(|c| c == 'é'));
    }

    #[test]
    fn test_short_message_untouched() {
        assert_eq!(truncate_message("abc"), "abc");
    }

    #[test]
    fn test_logger_enabled_levels() {
        let logger = ConsoleLogger;
        let warn = Metadata::builder().level(Level::Warn).build();
        assert!(logger.enabled(&warn));
        set_developer(false);
        let debug = Metadata::builder().level(Level::Debug).build();
        assert!(!logger.enabled(&debug));
    }
}
