//! Integration tests for logging system

use async_trait::async_trait;
use bridge_traits::{LogEntry, LogLevel, LoggerSink};
use core_runtime::logging::{
    init_logging, redact_if_sensitive, strip_path, LogFormat, LoggingConfig,
};
use core_runtime::Error;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct RecordingSink {
    entries: Mutex<Vec<LogEntry>>,
}

#[async_trait]
impl LoggerSink for RecordingSink {
    async fn log(&self, entry: LogEntry) -> bridge_traits::Result<()> {
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }

    fn min_level(&self) -> LogLevel {
        LogLevel::Warn
    }
}

// Only one test in this binary may install the global subscriber.
#[test]
fn test_init_logging_once_and_mirror_to_sink() {
    let sink = Arc::new(RecordingSink::default());
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Debug)
        .with_logger_sink(sink.clone());

    init_logging(config).unwrap();

    tracing::debug!(target: "core_bridge::multiplexer", "below sink level");
    tracing::warn!(target: "core_bridge::multiplexer", event = "preferences", "handler failed");

    {
        let entries = sink.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].level, LogLevel::Warn);
        assert_eq!(entries[0].message, "handler failed");
        assert_eq!(
            entries[0].fields.get("event"),
            Some(&"preferences".to_string())
        );
    }

    let second = init_logging(LoggingConfig::default());
    assert!(matches!(second, Err(Error::Logging(_))));
}

#[test]
fn test_pii_redaction_secrets() {
    assert_eq!(redact_if_sensitive("auth_key", "tskey-abc"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("access_token", "t"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("password", "p"), "[REDACTED]");
}

#[test]
fn test_pii_redaction_emails() {
    let redacted = redact_if_sensitive("login_name", "user@example.com");

    assert!(redacted.starts_with('u'));
    assert!(redacted.contains("[REDACTED]"));
    assert!(!redacted.contains("example.com"));
}

#[test]
fn test_pii_redaction_urls_keep_host() {
    let redacted = redact_if_sensitive("browse_url", "https://login.example.com/a/0123abcd");
    assert_eq!(redacted, "https://login.example.com/[REDACTED]");
}

#[test]
fn test_pii_redaction_normal_values() {
    assert_eq!(redact_if_sensitive("interface", "wlan0"), "wlan0");
    assert_eq!(redact_if_sensitive("selector", "isTV"), "isTV");
    assert_eq!(redact_if_sensitive("mtu", "1500"), "1500");
}

#[test]
fn test_path_stripping() {
    assert_eq!(strip_path("content://downloads/public/7"), "7");
    assert_eq!(strip_path("/storage/emulated/0/Download/a.txt"), "a.txt");
    assert_eq!(strip_path("D:\\data\\file.txt"), "file.txt");
    assert_eq!(strip_path("filename.txt"), "filename.txt");
    assert_eq!(strip_path("/var/log/"), "");
    assert_eq!(strip_path(""), "");
}

#[test]
fn test_config_chaining() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Warn)
        .with_pii_redaction(false)
        .with_spans(false)
        .with_target(false)
        .with_thread_info(true);

    assert_eq!(config.format, LogFormat::Compact);
    assert_eq!(config.level, LogLevel::Warn);
    assert!(!config.redact_pii);
    assert!(!config.enable_spans);
    assert!(!config.display_target);
    assert!(config.display_thread_info);
}
