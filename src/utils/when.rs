use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use regex::Regex;
use std::sync::OnceLock;

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M",
];

fn relative_day_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(today|tomorrow)(?:\s+at\s+(\d{1,2})(?::(\d{2}))?\s*(am|pm)?)?$")
            .expect("relative day pattern")
    })
}

fn in_days_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^in\s+(\d{1,3})\s+days?$").expect("in-days pattern"))
}

/// Parse a user-supplied date into UTC. Accepts the numeric formats the
/// assistant advertises plus a few relative phrases. Returns `None` for
/// anything it cannot understand; callers must not substitute a default.
pub fn parse_when(input: &str) -> Option<DateTime<Utc>> {
    parse_when_at(input, Utc::now())
}

/// Same as [`parse_when`], with an explicit "now" for the relative forms.
pub fn parse_when_at(input: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in NAIVE_FORMATS {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(input, fmt) {
            return Some(Utc.from_utc_datetime(&ndt));
        }
    }

    if let Ok(d) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&d.and_time(NaiveTime::MIN)));
    }

    if let Some(caps) = relative_day_re().captures(input) {
        let mut date = now.date_naive();
        if caps[1].eq_ignore_ascii_case("tomorrow") {
            date = date.checked_add_days(Days::new(1))?;
        }
        let time = match caps.get(2) {
            Some(hour) => {
                let mut hour: u32 = hour.as_str().parse().ok()?;
                let minute: u32 = caps
                    .get(3)
                    .map(|m| m.as_str().parse())
                    .transpose()
                    .ok()?
                    .unwrap_or(0);
                match caps.get(4).map(|m| m.as_str().to_ascii_lowercase()) {
                    Some(ref meridiem) if meridiem == "pm" => {
                        if hour < 12 {
                            hour += 12;
                        }
                    }
                    Some(ref meridiem) if meridiem == "am" && hour == 12 => hour = 0,
                    _ => {}
                }
                NaiveTime::from_hms_opt(hour, minute, 0)?
            }
            None => NaiveTime::MIN,
        };
        return Some(Utc.from_utc_datetime(&date.and_time(time)));
    }

    if let Some(caps) = in_days_re().captures(input) {
        let days: u64 = caps[1].parse().ok()?;
        let date = now.date_naive().checked_add_days(Days::new(days))?;
        return Some(Utc.from_utc_datetime(&date.and_time(now.time())));
    }

    None
}

/// Long form for detail views: weekday, month name, 12-hour clock.
pub fn format_long(dt: &DateTime<Utc>) -> String {
    format!(
        "{}, {} {}, {} at {}",
        dt.format("%A"),
        dt.format("%B"),
        dt.day(),
        dt.year(),
        dt.format("%I:%M %p")
    )
}

/// Short numeric form for list views, matching what the parser accepts.
pub fn format_short(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M").to_string()
}
