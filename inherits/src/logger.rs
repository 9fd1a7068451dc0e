use chrono::Local;
use once_cell::sync::Lazy;
use std::fmt;

pub const LOG_ENV: &str = "INHERITS_LOG";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Error,
    Warn,
    Info,
    Debug,
}

impl Level {
    pub fn parse(raw: &str) -> Option<Level> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "error" => Some(Level::Error),
            "warn" | "warning" => Some(Level::Warn),
            "info" => Some(Level::Info),
            "debug" | "trace" => Some(Level::Debug),
            _ => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
        }
    }
}

static MAX_LEVEL: Lazy<Level> = Lazy::new(|| {
    std::env::var(LOG_ENV)
        .ok()
        .and_then(|raw| Level::parse(&raw))
        .unwrap_or(Level::Info)
});

pub fn enabled(level: Level) -> bool {
    level <= *MAX_LEVEL
}

pub fn log(level: Level, args: fmt::Arguments) {
    if enabled(level) {
        let now = Local::now();
        println!("[{}] {} {}", now.format("%Y-%m-%d %H:%M:%S"), level.label(), args);
    }
}

pub fn info(args: fmt::Arguments) {
    log(Level::Info, args)
}

pub fn warn(args: fmt::Arguments) {
    log(Level::Warn, args)
}

pub fn error(args: fmt::Arguments) {
    log(Level::Error, args)
}

pub fn debug(args: fmt::Arguments) {
    log(Level::Debug, args)
}

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::logger::info(format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::logger::warn(format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::logger::error(format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        $crate::logger::debug(format_args!($($arg)*))
    };
}
