use hostname::get;
use serde::Serialize;
use serde_json::{Map, Value};
use std::env;
use std::sync::Arc;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
}

impl LogLevel {
    fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }

    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "error" => LogLevel::Error,
            "warn" | "warning" => LogLevel::Warn,
            "debug" | "trace" => LogLevel::Debug,
            _ => LogLevel::Info,
        }
    }
}

/// JSON-lines logger. Warn and error go to stderr, the rest to stdout.
#[derive(Clone)]
pub struct Logger {
    service: Arc<str>,
    environment: Arc<str>,
    host: Arc<str>,
    min_level: LogLevel,
}

impl Logger {
    pub fn new(service: &'static str) -> Self {
        let min_level = env::var("LOG_LEVEL")
            .ok()
            .map(|value| LogLevel::parse(&value))
            .unwrap_or(LogLevel::Info);
        Self::with_level(service, min_level)
    }

    pub fn with_level(service: &'static str, min_level: LogLevel) -> Self {
        let environment = env::var("APP_ENV")
            .or_else(|_| env::var("RUST_ENV"))
            .unwrap_or_else(|_| "development".to_string());
        let host = get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .or_else(|| env::var("HOSTNAME").ok())
            .unwrap_or_else(|| "unknown".to_string());

        Self {
            service: Arc::from(service),
            environment: Arc::from(environment),
            host: Arc::from(host),
            min_level,
        }
    }

    pub fn enabled(&self, level: LogLevel) -> bool {
        level <= self.min_level
    }

    fn render<T: Serialize>(&self, level: LogLevel, event: &str, context: T) -> Value {
        let timestamp = OffsetDateTime::now_utc();
        let mut payload = Map::new();
        payload.insert(
            "timestamp".into(),
            Value::String(
                timestamp
                    .format(&Rfc3339)
                    .unwrap_or_else(|_| timestamp.to_string()),
            ),
        );
        payload.insert("service".into(), Value::from(self.service.as_ref()));
        payload.insert("env".into(), Value::from(self.environment.as_ref()));
        payload.insert("host".into(), Value::from(self.host.as_ref()));
        payload.insert("level".into(), Value::from(level.as_str()));
        payload.insert("event".into(), Value::from(event));

        match serde_json::to_value(context).unwrap_or(Value::Null) {
            Value::Object(map) => payload.extend(map),
            Value::Null => {}
            other => {
                payload.insert("context".into(), other);
            }
        }
        Value::Object(payload)
    }

    fn emit<T: Serialize>(&self, level: LogLevel, event: &str, context: T) {
        if !self.enabled(level) {
            return;
        }
        let line = self.render(level, event, context).to_string();
        match level {
            LogLevel::Error | LogLevel::Warn => eprintln!("{line}"),
            _ => println!("{line}"),
        }
    }

    pub fn debug<T: Serialize>(&self, event: &str, context: T) {
        self.emit(LogLevel::Debug, event, context);
    }

    pub fn info<T: Serialize>(&self, event: &str, context: T) {
        self.emit(LogLevel::Info, event, context);
    }

    pub fn warn<T: Serialize>(&self, event: &str, context: T) {
        self.emit(LogLevel::Warn, event, context);
    }

    pub fn error<T: Serialize>(&self, event: &str, context: T) {
        self.emit(LogLevel::Error, event, context);
    }
}
