use crate::formatter::SlotPolicy;
use std::env;
use thiserror::Error;
use time::UtcOffset;
use time::macros::format_description;

const DEFAULT_PORT: u16 = 4030;
const DEFAULT_MAX_HTML_BYTES: usize = 1024 * 1024;
const DEFAULT_MAX_CONCURRENCY: usize = 16;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0}")]
    Message(String),
}

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub token: Option<String>,
    pub host_offset: UtcOffset,
    pub on_missing_slot: SlotPolicy,
    pub max_html_bytes: usize,
    pub max_concurrency: usize,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = parse_port(lookup("PORT"), DEFAULT_PORT);
        let token = lookup("DATE_LABELS_TOKEN")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        let host_offset = match lookup("DATE_LABELS_UTC_OFFSET") {
            Some(raw) if !raw.trim().is_empty() => parse_offset(&raw)?,
            _ => UtcOffset::UTC,
        };

        let on_missing_slot = match lookup("DATE_LABELS_ON_MISSING_SLOT") {
            Some(raw) if !raw.trim().is_empty() => {
                raw.parse::<SlotPolicy>().map_err(ConfigError::Message)?
            }
            _ => SlotPolicy::Abort,
        };

        let max_html_bytes = parse_positive_usize(
            lookup("DATE_LABELS_MAX_HTML_BYTES"),
            DEFAULT_MAX_HTML_BYTES,
        )
        .clamp(16 * 1024, 10 * 1024 * 1024);
        let max_concurrency = parse_positive_usize(
            lookup("DATE_LABELS_MAX_CONCURRENCY"),
            DEFAULT_MAX_CONCURRENCY,
        )
        .clamp(1, 256);

        Ok(Self {
            port,
            token,
            host_offset,
            on_missing_slot,
            max_html_bytes,
            max_concurrency,
        })
    }
}

fn parse_offset(raw: &str) -> Result<UtcOffset, ConfigError> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("z") || trimmed.eq_ignore_ascii_case("utc") {
        return Ok(UtcOffset::UTC);
    }
    UtcOffset::parse(
        trimmed,
        format_description!("[offset_hour sign:mandatory]:[offset_minute]"),
    )
    .map_err(|_| {
        ConfigError::Message(format!(
            "DATE_LABELS_UTC_OFFSET must look like +HH:MM, got `{trimmed}`"
        ))
    })
}

fn parse_positive_usize(value: Option<String>, default_value: usize) -> usize {
    value
        .as_deref()
        .and_then(|raw| raw.trim().parse::<usize>().ok())
        .filter(|parsed| *parsed > 0)
        .unwrap_or(default_value)
}

fn parse_port(value: Option<String>, default_value: u16) -> u16 {
    value
        .as_deref()
        .and_then(|raw| raw.trim().parse::<u16>().ok())
        .filter(|parsed| *parsed > 0)
        .unwrap_or(default_value)
}
