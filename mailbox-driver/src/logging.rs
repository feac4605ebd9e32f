//! `log` backend for the driver.
//!
//! The driver only emits records through the `log` macros. Whoever embeds it
//! installs [`LOGGER`] with a [`LogSink`] for wherever lines should go: a
//! serial port on the target, stdout in the simulator.

use core::fmt;

use log::{LevelFilter, Metadata, Record, SetLoggerError};
use spinning_top::Spinlock;

/// Destination for formatted log lines.
pub trait LogSink: Sync {
    /// Write one line; the sink adds the line terminator.
    fn write_line(&self, args: fmt::Arguments<'_>);
}

pub struct Logger {
    sink: Spinlock<Option<&'static dyn LogSink>>,
}

pub static LOGGER: Logger = Logger::new();

impl Logger {
    pub const fn new() -> Self {
        Self {
            sink: Spinlock::new(None),
        }
    }

    /// Route records up to `level` into `sink` and make this the global
    /// logger.
    pub fn init(
        &'static self,
        sink: &'static dyn LogSink,
        level: LevelFilter,
    ) -> Result<(), SetLoggerError> {
        *self.sink.lock() = Some(sink);
        log::set_logger(self)?;
        log::set_max_level(level);
        Ok(())
    }

    /// Swap the sink of an installed logger.
    pub fn set_sink(&self, sink: &'static dyn LogSink) {
        *self.sink.lock() = Some(sink);
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl log::Log for Logger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        self.sink.lock().is_some()
    }

    fn log(&self, record: &Record) {
        let sink = *self.sink.lock();
        if let Some(sink) = sink {
            sink.write_line(format_args!(
                "[{}:{}] {}: {}",
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.level(),
                record.args()
            ));
        }
    }

    fn flush(&self) {
        // nothing
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::vec::Vec;
    use core::fmt::Write;

    use log::Log;

    use super::*;

    struct Capture(Spinlock<Vec<String>>);

    impl LogSink for Capture {
        fn write_line(&self, args: fmt::Arguments<'_>) {
            let mut line = String::new();
            let _ = line.write_fmt(args);
            self.0.lock().push(line);
        }
    }

    #[test]
    fn formats_file_line_and_level() {
        static CAPTURE: Capture = Capture(Spinlock::new(Vec::new()));
        let logger = Logger::new();
        assert!(!logger.enabled(&Metadata::builder().build()));

        logger.set_sink(&CAPTURE);
        logger.log(
            &Record::builder()
                .args(format_args!("dropped {}", 3))
                .level(log::Level::Warn)
                .file(Some("src/receive.rs"))
                .line(Some(42))
                .build(),
        );
        assert_eq!(
            CAPTURE.0.lock().as_slice(),
            ["[src/receive.rs:42] WARN: dropped 3"]
        );
    }
}
