//! Process-wide log capture for unit tests.
//!
//! `log` allows one global logger per process, so every test shares the same
//! buffer. Assertions should look for lines unique to the test.

use std::sync::{Mutex, Once};

static LINES: Mutex<Vec<String>> = Mutex::new(Vec::new());
static INSTALL: Once = Once::new();

/// Routes `Info` and above into the shared buffer. Idempotent.
pub(crate) fn install() {
    INSTALL.call_once(|| {
        let _ = fern::Dispatch::new()
            .level(log::LevelFilter::Info)
            .chain(fern::Output::call(|record| {
                if let Ok(mut lines) = LINES.lock() {
                    lines.push(record.args().to_string());
                }
            }))
            .apply();
    });
}

/// Captured lines containing `needle`.
pub(crate) fn count_containing(needle: &str) -> usize {
    LINES
        .lock()
        .map(|lines| lines.iter().filter(|line| line.contains(needle)).count())
        .unwrap_or(0)
}
