//! Structured log records and the durable file sink.

use std::{
    fs::{self, File, OpenOptions},
    io::Write as _,
    path::Path,
    sync::{Mutex, PoisonError},
};

use jiff::Timestamp;
use serde_json::{Map, Value, json};
use tracing::{error, info, warn};

/// Field names the emitter always owns. Caller extras carrying these keys
/// are dropped rather than merged.
const RESERVED_FIELDS: [&str; 7] = [
    "time", "level", "message", "logger", "module", "function", "line",
];

/// Severity of an emitted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LogLevel {
    Info,
    Warning,
    Error,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }
}

/// Source location attached to every record.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Callsite {
    pub(crate) module: &'static str,
    pub(crate) function: &'static str,
    pub(crate) line: u32,
}

/// Turns a message plus key/value context into a single-line JSON record
/// and appends it to the durable sink tailed by the log shipper.
///
/// Each record is also mirrored as a tracing event so console output and
/// span events stay correlated with the sink.
#[derive(Debug)]
pub(crate) struct LogEmitter {
    logger: &'static str,
    sink: FileSink,
}

impl LogEmitter {
    pub(crate) fn new(logger: &'static str, path: &Path) -> Self {
        Self {
            logger,
            sink: FileSink::open(path),
        }
    }

    pub(crate) fn info(&self, message: &str, extra: &Map<String, Value>, callsite: Callsite) {
        self.emit(LogLevel::Info, message, extra, callsite);
    }

    pub(crate) fn warning(&self, message: &str, extra: &Map<String, Value>, callsite: Callsite) {
        self.emit(LogLevel::Warning, message, extra, callsite);
    }

    pub(crate) fn error(&self, message: &str, extra: &Map<String, Value>, callsite: Callsite) {
        self.emit(LogLevel::Error, message, extra, callsite);
    }

    fn emit(&self, level: LogLevel, message: &str, extra: &Map<String, Value>, callsite: Callsite) {
        let record = build_record(level, message, self.logger, extra, callsite);

        match serde_json::to_string(&record) {
            Ok(line) => self.sink.append(&line),
            Err(source) => error!("failed to serialize log record: {source}"),
        }

        match level {
            LogLevel::Info => info!("{message}"),
            LogLevel::Warning => warn!("{message}"),
            LogLevel::Error => error!("{message}"),
        }
    }
}

fn build_record(
    level: LogLevel,
    message: &str,
    logger: &str,
    extra: &Map<String, Value>,
    callsite: Callsite,
) -> Value {
    let mut fields = Map::new();

    fields.insert("time".to_owned(), json!(epoch_nanos()));
    fields.insert("level".to_owned(), json!(level.as_str()));
    fields.insert("message".to_owned(), json!(message));
    fields.insert("logger".to_owned(), json!(logger));
    fields.insert("module".to_owned(), json!(callsite.module));
    fields.insert("function".to_owned(), json!(callsite.function));
    fields.insert("line".to_owned(), json!(callsite.line));

    for (key, value) in extra {
        if RESERVED_FIELDS.contains(&key.as_str()) {
            continue;
        }

        fields.insert(key.clone(), value.clone());
    }

    Value::Object(fields)
}

fn epoch_nanos() -> i64 {
    i64::try_from(Timestamp::now().as_nanosecond()).unwrap_or(i64::MAX)
}

/// Append-only JSON-lines sink; one guarded write per record so concurrent
/// requests never interleave within a line.
#[derive(Debug)]
struct FileSink {
    file: Mutex<Option<File>>,
}

impl FileSink {
    fn open(path: &Path) -> Self {
        if let Some(parent) = path.parent() {
            // A missing directory surfaces as an open failure below.
            _ = fs::create_dir_all(parent);
        }

        let file = match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(file),
            Err(source) => {
                warn!(
                    path = %path.display(),
                    "failed to open log sink, records will not be persisted: {source}"
                );

                None
            }
        };

        Self {
            file: Mutex::new(file),
        }
    }

    fn append(&self, line: &str) {
        let mut guard = self.file.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(file) = guard.as_mut()
            && let Err(source) = writeln!(file, "{line}")
        {
            error!("failed to write to log sink: {source}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use testresult::TestResult;

    use super::*;

    fn record_fields(record: &Value) -> Map<String, Value> {
        record.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn record_carries_all_reserved_fields() {
        let record = build_record(
            LogLevel::Info,
            "Request processed",
            "pulse_api",
            &Map::new(),
            Callsite {
                module: module_path!(),
                function: "record_carries_all_reserved_fields",
                line: line!(),
            },
        );

        let fields = record_fields(&record);

        for reserved in RESERVED_FIELDS {
            assert!(
                fields.contains_key(reserved),
                "record is missing reserved field {reserved}"
            );
        }

        assert_eq!(
            fields.get("level").and_then(Value::as_str),
            Some("INFO"),
            "level must reflect the emitted severity"
        );
        assert!(
            fields.get("time").and_then(Value::as_i64).unwrap_or(0) > 0,
            "time must be a positive nanosecond epoch integer"
        );
    }

    #[test]
    fn extras_merge_without_touching_reserved_fields() {
        let mut extra = Map::new();
        extra.insert("endpoint".to_owned(), json!("/health"));
        extra.insert("level".to_owned(), json!("FAKE"));
        extra.insert("message".to_owned(), json!("spoofed"));

        let record = build_record(
            LogLevel::Warning,
            "HTTP Error: Service temporarily unavailable",
            "pulse_api",
            &extra,
            Callsite {
                module: module_path!(),
                function: "extras_merge_without_touching_reserved_fields",
                line: line!(),
            },
        );

        let fields = record_fields(&record);

        assert_eq!(
            fields.get("endpoint").and_then(Value::as_str),
            Some("/health")
        );
        assert_eq!(
            fields.get("level").and_then(Value::as_str),
            Some("WARNING"),
            "caller extras must not override the real severity"
        );
        assert_eq!(
            fields.get("message").and_then(Value::as_str),
            Some("HTTP Error: Service temporarily unavailable"),
            "caller extras must not override the real message"
        );

        // The caller's mapping is merged by copy, never mutated.
        assert_eq!(extra.len(), 3, "caller extras map must stay untouched");
        assert_eq!(extra.get("level").and_then(Value::as_str), Some("FAKE"));
    }

    #[test]
    fn sink_appends_one_json_object_per_line() -> TestResult {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("app.log");
        let emitter = LogEmitter::new("pulse_api", &path);

        let mut extra = Map::new();
        extra.insert("endpoint".to_owned(), json!("/"));

        emitter.info("Request processed", &extra, Callsite {
            module: module_path!(),
            function: "sink_appends_one_json_object_per_line",
            line: line!(),
        });
        emitter.error("Server Error: boom", &Map::new(), Callsite {
            module: module_path!(),
            function: "sink_appends_one_json_object_per_line",
            line: line!(),
        });

        let contents = fs::read_to_string(&path)?;
        let lines: Vec<&str> = contents.lines().collect();

        assert_eq!(lines.len(), 2, "expected one line per emitted record");

        for line in lines {
            let record: Value = serde_json::from_str(line)?;
            let fields = record_fields(&record);

            for reserved in RESERVED_FIELDS {
                assert!(
                    fields.contains_key(reserved),
                    "sink line is missing reserved field {reserved}"
                );
            }
        }

        Ok(())
    }

    #[test]
    fn unwritable_sink_is_swallowed() {
        let emitter = LogEmitter::new("pulse_api", Path::new("/dev/null/not-a-directory/app.log"));

        // Must not panic; the failure is reported through tracing instead.
        emitter.info("Request processed", &Map::new(), Callsite {
            module: module_path!(),
            function: "unwritable_sink_is_swallowed",
            line: line!(),
        });
    }
}
