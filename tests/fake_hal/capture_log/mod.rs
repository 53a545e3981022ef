use log::{Level, LevelFilter, Log, Metadata, Record};
use std::cell::RefCell;
use std::sync::Once;

thread_local! {
    static RECORDS: RefCell<Vec<(Level, String)>> = RefCell::new(Vec::new());
}

/// Keeps every record logged on the current thread, so parallel tests don't see each other's logs.
struct CaptureLog;

static LOGGER: CaptureLog = CaptureLog;
static INSTALL: Once = Once::new();

impl Log for CaptureLog {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        RECORDS.with(|records| {
            records
                .borrow_mut()
                .push((record.level(), format!("{}", record.args())))
        });
    }

    fn flush(&self) {}
}

/// Installs the capturing logger if needed and clears this thread's records.
pub fn init() {
    INSTALL.call_once(|| {
        log::set_logger(&LOGGER).unwrap();
        log::set_max_level(LevelFilter::Trace);
    });
    RECORDS.with(|records| records.borrow_mut().clear());
}

/// Whether a record at `level` containing `needle` was logged on this thread since [`init`].
pub fn contains(level: Level, needle: &str) -> bool {
    RECORDS.with(|records| {
        records
            .borrow()
            .iter()
            .any(|(record_level, message)| *record_level == level && message.contains(needle))
    })
}

pub fn count(level: Level) -> usize {
    RECORDS.with(|records| {
        records
            .borrow()
            .iter()
            .filter(|(record_level, _)| *record_level == level)
            .count()
    })
}
