use colored::Colorize;
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::io::{self, Write};
use std::sync::Mutex;

pub struct SandboxLogger {
    level: Mutex<LevelFilter>,
    output: Mutex<Box<dyn Write + Send>>,
}

impl SandboxLogger {
    pub fn new(level: LevelFilter) -> &'static Self {
        Box::leak(Box::new(Self {
            level: Mutex::new(level),
            output: Mutex::new(Box::new(io::stderr())),
        }))
    }

    pub fn init(&'static self) -> Result<&'static Self, log::SetLoggerError> {
        log::set_logger(self)?;
        log::set_max_level(LevelFilter::Trace);
        Ok(self)
    }

    pub fn set_level(&self, level: LevelFilter) {
        *self.level.lock().expect("Failed to lock level") = level;
    }
}

impl Log for SandboxLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= *self.level.lock().expect("Failed to lock level")
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let (level_str, color) = match record.level() {
            Level::Error => (record.level().to_string(), colored::Color::Red),
            Level::Warn => {
                (format!("{} ", record.level()), colored::Color::Yellow)
            }
            Level::Info => {
                (format!("{} ", record.level()), colored::Color::White)
            }
            Level::Debug => (record.level().to_string(), colored::Color::Blue),
            Level::Trace => {
                (record.level().to_string(), colored::Color::BrightBlack)
            }
        };
        let level_str = level_str.color(color);
        let line =
            format!("[{}] {}: {}", level_str, record.target(), record.args())
                .color(color);
        let mut output = self.output.lock().expect("Failed to lock output");
        let _ = writeln!(output, "{}", line);
    }

    fn flush(&self) {
        let _ = self.output.lock().expect("Failed to lock output").flush();
    }
}
