#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

pub use color_eyre::eyre;

use color_backtrace::{BacktracePrinter, Frame};
use color_eyre::config::HookBuilder;
use log::{Level, LevelFilter, Log, Metadata, Record};
use owo_colors::{OwoColorize, Style};
use regex::Regex;
use std::cell::RefCell;
use std::io::Write;
use std::sync::{LazyLock, Once};

/// A log record captured on the current thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedRecord {
    /// Level the record was emitted at
    pub level: Level,
    /// Module path / target of the record
    pub target: String,
    /// Formatted message
    pub message: String,
}

thread_local! {
    static CAPTURE: RefCell<Option<Vec<CapturedRecord>>> = const { RefCell::new(None) };
}

struct SimpleLogger;

impl Log for SimpleLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        CAPTURE.with(|capture| {
            if let Some(records) = capture.borrow_mut().as_mut() {
                records.push(CapturedRecord {
                    level: record.level(),
                    target: record.target().to_string(),
                    message: record.args().to_string(),
                });
            }
        });

        let level_style = match record.level() {
            Level::Error => Style::new().fg_rgb::<243, 139, 168>(),
            Level::Warn => Style::new().fg_rgb::<249, 226, 175>(),
            Level::Info => Style::new().fg_rgb::<166, 227, 161>(),
            Level::Debug => Style::new().fg_rgb::<137, 180, 250>(),
            Level::Trace => Style::new().fg_rgb::<148, 226, 213>(),
        };

        eprintln!(
            "{} - {}: {}",
            record.level().style(level_style),
            record
                .target()
                .style(Style::new().fg_rgb::<137, 180, 250>()),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static INIT: Once = Once::new();

/// Frames dropped from error reports and panic backtraces: panic machinery,
/// the test runner and closure shims.
static IGNORE_FRAMES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(std::panic|core::panic|test::run_test|__pthread_cond_wait|std::sys::(pal|backtrace)|std::thread::Builder|core::ops::function|test::__rust_begin_short_backtrace|<core::panic::|<alloc::boxed::Box<F,A> as core::ops::function::FnOnce<Args>>::call_once)")
        .unwrap()
});

#[cfg(not(miri))]
fn install_error_hooks() {
    let eyre_filter = move |frames: &mut Vec<&color_eyre::config::Frame>| {
        frames.retain(|frame| {
            frame
                .name
                .as_ref()
                .map(|n| !IGNORE_FRAMES.is_match(&n.to_string()))
                .unwrap_or(true)
        });
    };
    if let Err(err) = HookBuilder::default()
        .add_frame_filter(Box::new(eyre_filter))
        .install()
    {
        eprintln!("color-eyre was already installed: {err}");
    }

    let filter = move |frames: &mut Vec<&Frame>| {
        frames.retain(|frame| {
            frame
                .name
                .as_ref()
                .map(|name| !IGNORE_FRAMES.is_match(name))
                .unwrap_or(true)
        });
    };
    let stderr = color_backtrace::termcolor::StandardStream::stderr(
        color_backtrace::termcolor::ColorChoice::Auto,
    );
    BacktracePrinter::new()
        .add_frame_filter(Box::new(filter))
        .install(Box::new(stderr));
}

/// Installs color-eyre and color-backtrace (except on miri) and the test
/// logger. Safe to call from every test: only the first call in a process
/// installs anything.
pub fn setup() {
    INIT.call_once(|| {
        #[cfg(not(miri))]
        install_error_hooks();

        // another test harness may already own the global logger
        if log::set_boxed_logger(Box::new(SimpleLogger)).is_ok() {
            log::set_max_level(LevelFilter::Trace);
        }
    });
}

/// Runs `f` and returns its result along with every record logged on this
/// thread while it ran.
pub fn capture_logs<R>(f: impl FnOnce() -> R) -> (R, Vec<CapturedRecord>) {
    setup();
    let previous = CAPTURE.with(|capture| capture.borrow_mut().replace(Vec::new()));
    let result = f();
    let records = CAPTURE.with(|capture| {
        let mut slot = capture.borrow_mut();
        let records = slot.take().unwrap_or_default();
        *slot = previous;
        records
    });
    (result, records)
}

/// Returns `true` if any captured record at `level` contains `needle`.
pub fn logged(records: &[CapturedRecord], level: Level, needle: &str) -> bool {
    records
        .iter()
        .any(|r| r.level == level && r.message.contains(needle))
}
