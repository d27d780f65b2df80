//! Integration tests for logging initialisation

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::time::{LogEntry, LogLevel, LoggerSink};
use core_runtime::logging::{init_logging, redact_if_sensitive, short_id, LogFormat, LoggingConfig};
use core_runtime::Error;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct CollectingSink {
    entries: Mutex<Vec<LogEntry>>,
}

#[async_trait]
impl LoggerSink for CollectingSink {
    async fn log(&self, entry: LogEntry) -> BridgeResult<()> {
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }

    fn min_level(&self) -> LogLevel {
        LogLevel::Info
    }
}

// Global subscriber can only be installed once per process, so both the
// first and the second initialisation are exercised in one test.
#[test]
fn test_init_logging_once_and_mirror_to_sink() {
    let sink = Arc::new(CollectingSink::default());
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Debug)
        .with_logger_sink(sink.clone());

    init_logging(config).expect("first initialisation succeeds");

    tracing::debug!(target: "core_library::library", "below sink level");
    tracing::info!(target: "core_library::library", book_id = "b1", "book saved");
    tracing::info!(target: "hyper::client", "filtered out by default directives");

    {
        let entries = sink.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "book saved");
        assert_eq!(entries[0].fields.get("book_id"), Some(&"b1".to_string()));
    }

    let second = init_logging(LoggingConfig::default());
    assert!(matches!(second, Err(Error::Config(_))));
}

#[test]
fn test_redaction_helpers() {
    assert_eq!(redact_if_sensitive("refresh_token", "abc"), "[REDACTED]");

    let email = redact_if_sensitive("email", "reader@example.com");
    assert!(!email.contains("example.com"));

    assert_eq!(redact_if_sensitive("owner_id", "user_123"), "user_123");
    assert_eq!(short_id("2f9c1d7a-0000"), "2f9c1d…");
}
