use chrono::{DateTime, Duration, Local, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Remaining time at or under which a deadline counts as due soon.
pub const SOON_WINDOW_MS: i64 = 86_400_000;

const NAIVE_FORMATS: [&str; 5] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Urgency {
    None,
    Soon,
    Overdue,
}

impl Urgency {
    pub fn css_class(&self) -> &'static str {
        match self {
            Urgency::None => "",
            Urgency::Soon => "is-soon",
            Urgency::Overdue => "is-overdue",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Urgency::None => "",
            Urgency::Soon => "soon",
            Urgency::Overdue => "overdue",
        }
    }
}

/// Classifies a deadline against `now`.
///
/// Absent or unparsable deadlines are `None`. Anything in the past is
/// `Overdue`; up to and including 24h remaining is `Soon`.
pub fn classify(deadline: Option<&str>, now: DateTime<Utc>) -> Urgency {
    let at = match deadline.and_then(parse_timestamp) {
        Some(at) => at,
        None => return Urgency::None,
    };
    let remaining = at.signed_duration_since(now);
    if remaining < Duration::zero() {
        Urgency::Overdue
    } else if remaining <= Duration::milliseconds(SOON_WINDOW_MS) {
        Urgency::Soon
    } else {
        Urgency::None
    }
}

/// Parses the timestamp shapes the notes service emits.
///
/// Offset-less date-times are local wall-clock time; a bare date is UTC
/// midnight.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    parse_timestamp_in(raw, &Local)
}

fn parse_timestamp_in<Tz: TimeZone>(raw: &str, tz: &Tz) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return resolve_local(tz, naive);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Pins a wall-clock time in `tz`. Repeated times take the earlier instant;
/// times skipped by a forward shift land one hour later.
fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    let local = match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => tz
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest()?,
    };
    Some(local.with_timezone(&Utc))
}

/// Cuts a timestamp down to `YYYY-MM-DDTHH:MM` for editing.
pub fn to_minute_precision(raw: Option<&str>) -> String {
    match raw {
        Some(value) => value.chars().take(16).collect(),
        None => String::new(),
    }
}
