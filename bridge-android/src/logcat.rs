//! Mirror bridge logs into logcat.

use async_trait::async_trait;
use bridge_traits::{LogEntry, LogLevel, LoggerSink, Result};

/// [`LoggerSink`] that writes through the `log` facade.
///
/// On Android the facade is backed by `android_logger`, see
/// [`LogcatSink::install`].
#[derive(Debug, Clone)]
pub struct LogcatSink {
    min_level: LogLevel,
}

impl LogcatSink {
    pub fn new(min_level: LogLevel) -> Self {
        Self { min_level }
    }

    /// Route the `log` facade to logcat under `tag` and return a sink.
    #[cfg(target_os = "android")]
    pub fn install(tag: &str, min_level: LogLevel) -> Self {
        android_logger::init_once(
            android_logger::Config::default()
                .with_max_level(level_filter(min_level))
                .with_tag(tag),
        );
        Self::new(min_level)
    }
}

#[async_trait]
impl LoggerSink for LogcatSink {
    async fn log(&self, entry: LogEntry) -> Result<()> {
        write(&entry);
        Ok(())
    }

    fn min_level(&self) -> LogLevel {
        self.min_level
    }

    fn log_now(&self, entry: &LogEntry) -> Option<Result<()>> {
        write(entry);
        Some(Ok(()))
    }
}

fn write(entry: &LogEntry) {
    log::log!(target: &entry.target, log_level(entry.level), "{}", format_entry(entry));
}

fn log_level(level: LogLevel) -> log::Level {
    match level {
        LogLevel::Trace => log::Level::Trace,
        LogLevel::Debug => log::Level::Debug,
        LogLevel::Info => log::Level::Info,
        LogLevel::Warn => log::Level::Warn,
        LogLevel::Error => log::Level::Error,
    }
}

#[cfg(target_os = "android")]
fn level_filter(level: LogLevel) -> log::LevelFilter {
    log_level(level).to_level_filter()
}

/// `[span] message key=value ...`, fields sorted for stable output.
fn format_entry(entry: &LogEntry) -> String {
    let mut line = String::new();
    if let Some(span) = &entry.span {
        line.push('[');
        line.push_str(span);
        line.push_str("] ");
    }
    line.push_str(&entry.message);

    let mut fields: Vec<_> = entry.fields.iter().collect();
    fields.sort();
    for (key, value) in fields {
        line.push(' ');
        line.push_str(key);
        line.push('=');
        line.push_str(value);
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_entry() {
        let entry = LogEntry::new(LogLevel::Error, "core_bridge", "Handler failed")
            .with_field("event", "preferences")
            .with_field("error", "tile refused")
            .with_span("multiplexer");

        assert_eq!(
            format_entry(&entry),
            "[multiplexer] Handler failed error=tile refused event=preferences"
        );
    }

    #[test]
    fn test_level_mapping() {
        assert_eq!(log_level(LogLevel::Warn), log::Level::Warn);
        assert_eq!(LogcatSink::new(LogLevel::Debug).min_level(), LogLevel::Debug);
    }

    #[test]
    fn test_writes_without_a_runtime() {
        assert!(tokio::runtime::Handle::try_current().is_err());

        let entry = LogEntry::new(LogLevel::Info, "bridge_android", "Service connected");
        let written = LogcatSink::new(LogLevel::Info).log_now(&entry);

        assert!(matches!(written, Some(Ok(()))));
    }
}
