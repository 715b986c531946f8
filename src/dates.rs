use time::format_description::well_known::Rfc2822;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

/// Lowercase month names indexed by zero-based month.
pub const MONTH_NAMES: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

pub const INVALID_WEEKDAY_LABEL: &str = "NaN";
pub const INVALID_MONTH_LABEL: &str = "undefined";
pub const INVALID_DATE_LABEL: &str = "Invalid Date";

/// A `data-date` value resolved into the host offset, or the invalid date
/// that unparsable input produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParsedDate {
    Valid(OffsetDateTime),
    Invalid,
}

impl ParsedDate {
    pub fn is_valid(&self) -> bool {
        matches!(self, ParsedDate::Valid(_))
    }

    /// Day of week, Sunday = 0.
    pub fn weekday_index(&self) -> Option<u8> {
        match self {
            ParsedDate::Valid(value) => Some(value.weekday().number_days_from_sunday()),
            ParsedDate::Invalid => None,
        }
    }

    /// Zero-based month, January = 0.
    pub fn month_index(&self) -> Option<usize> {
        match self {
            ParsedDate::Valid(value) => Some(usize::from(u8::from(value.month())) - 1),
            ParsedDate::Invalid => None,
        }
    }

    /// Text for an event card's "day" slot. This is the weekday index, not
    /// the day of month.
    pub fn weekday_label(&self) -> String {
        self.weekday_index()
            .map(|index| index.to_string())
            .unwrap_or_else(|| INVALID_WEEKDAY_LABEL.to_string())
    }

    pub fn month_label(&self) -> &'static str {
        self.month_index()
            .and_then(|index| MONTH_NAMES.get(index).copied())
            .unwrap_or(INVALID_MONTH_LABEL)
    }

    /// `Fri Mar 15 2024` style rendering used on post cards.
    pub fn date_string(&self) -> String {
        let ParsedDate::Valid(value) = self else {
            return INVALID_DATE_LABEL.to_string();
        };
        value
            .format(format_description!(
                "[weekday repr:short] [month repr:short] [day] [year]"
            ))
            .unwrap_or_else(|_| INVALID_DATE_LABEL.to_string())
    }
}

/// Parses a `data-date` attribute. A missing attribute, an empty string
/// or an unrecognised format all produce [`ParsedDate::Invalid`].
///
/// Date-only ISO values are read as UTC midnight, date-times without a
/// designator and the informal calendar forms are read in `host_offset`.
/// The result is always expressed in `host_offset`.
pub fn parse_date_attribute(raw: Option<&str>, host_offset: UtcOffset) -> ParsedDate {
    let Some(raw) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return ParsedDate::Invalid;
    };

    let parsed = parse_iso_date(raw)
        .or_else(|| parse_iso_date_time(raw, host_offset))
        .or_else(|| OffsetDateTime::parse(raw, &Rfc2822).ok())
        .or_else(|| parse_calendar_date(raw).map(|date| date.midnight().assume_offset(host_offset)));

    match parsed.and_then(|value| value.checked_to_offset(host_offset)) {
        Some(value) => ParsedDate::Valid(value),
        None => ParsedDate::Invalid,
    }
}

fn parse_iso_date(raw: &str) -> Option<OffsetDateTime> {
    let bytes = raw.as_bytes();
    let expanded = match bytes.len() {
        4 if bytes.iter().all(u8::is_ascii_digit) => format!("{raw}-01-01"),
        7 if bytes[4] == b'-' && raw.is_ascii() => format!("{raw}-01"),
        10 => raw.to_string(),
        _ => return None,
    };
    Date::parse(&expanded, format_description!("[year]-[month]-[day]"))
        .ok()
        .map(|date| date.with_time(Time::MIDNIGHT).assume_utc())
}

fn parse_iso_date_time(raw: &str, host_offset: UtcOffset) -> Option<OffsetDateTime> {
    if raw.len() < 16 || !raw.is_char_boundary(10) {
        return None;
    }
    let (date_part, rest) = raw.split_at(10);
    let rest = rest.strip_prefix(['T', 't', ' '])?;

    let (time_part, offset) = split_designator(rest)?;
    let naive = format!("{date_part}T{time_part}");
    let value = PrimitiveDateTime::parse(
        &naive,
        format_description!(
            version = 2,
            "[year]-[month]-[day]T[hour]:[minute][optional [:[second][optional [.[subsecond]]]]]"
        ),
    )
    .ok()?;

    Some(value.assume_offset(offset.unwrap_or(host_offset)))
}

/// Splits a trailing `Z` or `±HH:MM` off the time component. `None` inside
/// the tuple means the value carried no designator.
fn split_designator(time_part: &str) -> Option<(&str, Option<UtcOffset>)> {
    if let Some(stripped) = time_part.strip_suffix(['Z', 'z']) {
        return Some((stripped, Some(UtcOffset::UTC)));
    }

    let split = time_part.len().saturating_sub(6);
    if split > 0 && time_part.is_char_boundary(split) {
        let (head, tail) = time_part.split_at(split);
        if tail.starts_with(['+', '-']) {
            let offset = UtcOffset::parse(
                tail,
                format_description!("[offset_hour sign:mandatory]:[offset_minute]"),
            )
            .ok()?;
            return Some((head, Some(offset)));
        }
    }

    Some((time_part, None))
}

fn parse_calendar_date(raw: &str) -> Option<Date> {
    Date::parse(
        raw,
        format_description!("[month repr:long case_sensitive:false] [day padding:none], [year]"),
    )
    .or_else(|_| {
        Date::parse(
            raw,
            format_description!(
                "[month repr:short case_sensitive:false] [day padding:none], [year]"
            ),
        )
    })
    .or_else(|_| {
        Date::parse(
            raw,
            format_description!("[month repr:short case_sensitive:false] [day padding:none] [year]"),
        )
    })
    .or_else(|_| {
        Date::parse(
            raw,
            format_description!("[year]/[month padding:none]/[day padding:none]"),
        )
    })
    .or_else(|_| {
        Date::parse(
            raw,
            format_description!("[month padding:none]/[day padding:none]/[year]"),
        )
    })
    .ok()
}
