use chrono::{
    DateTime, Datelike, Duration, FixedOffset, Local, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc, Weekday,
};
use anyhow::{anyhow, bail, Result};

const DATE_FORMAT: &str = "%Y-%m-%d";
const NAIVE_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Parse a due date given on the command line or by a tool call.
///
/// A plain `YYYY-MM-DD` is midnight UTC of that day, which is what the
/// server stores for date-only input. Human forms (`today`, `tom`, `eow`,
/// `eom`, `+3d`/`+2w`/`+1m`, `fri`, `2:fri`) resolve to the end of
/// that day in local time.
pub fn parse_due_date(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();
    if let Some(midnight) = parse_date_midnight(input) {
        return Ok(Utc.from_utc_datetime(&midnight));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M:%S") {
        return local_to_utc(&dt);
    }
    parse_human_date(input, Local::now().date_naive())
}

/// Resolve the human date forms relative to `today`.
pub fn parse_human_date(input: &str, today: NaiveDate) -> Result<DateTime<Utc>> {
    let lower = input.to_lowercase();

    // 1. Reserved keywords
    match lower.as_str() {
        "today" | "tod" => return end_of_day(today),
        "tomorrow" | "tom" => return end_of_day(today + Duration::days(1)),
        "eow" => {
            // End of week (Sunday)
            let days_to_sunday = 6 - today.weekday().num_days_from_monday() as i64;
            return end_of_day(today + Duration::days(days_to_sunday));
        }
        "eom" => return end_of_day(last_day_of_month(today.year(), today.month())?),
        _ => {}
    }

    // 2. Relative format (+Nd, +Nw, +Nm)
    if let Some(rest) = lower.strip_prefix('+') {
        let split = rest.char_indices().last().map_or(0, |(i, _)| i);
        let (num_str, unit) = rest.split_at(split);
        let count: i64 = num_str.parse().map_err(|_| anyhow!("Invalid relative format: {}", input))?;

        let target = match unit {
            "d" => add_days(today, count)?,
            "w" => add_days(today, count.checked_mul(7).ok_or_else(|| anyhow!("date out of range: {}", input))?)?,
            "m" => add_months(today, count)?,
            _ => bail!("Unknown unit in relative time: {}", unit),
        };
        return end_of_day(target);
    }

    // 3. Weekday format (fri, 2:fri)
    let (count, day_str) = match lower.split_once(':') {
        Some((count, day)) => {
            let count: i64 = count.parse().map_err(|_| anyhow!("Could not parse date: {}", input))?;
            (count, day)
        }
        None => (1, lower.as_str()),
    };
    if let Some(target_weekday) = parse_weekday_str(day_str) {
        let mut days_needed = target_weekday.num_days_from_monday() as i64
            - today.weekday().num_days_from_monday() as i64;
        if days_needed <= 0 {
            days_needed += 7;
        }
        // count = 1 means the next such day, count = 2 the one after that
        let days_needed = (count.max(1) - 1)
            .checked_mul(7)
            .and_then(|weeks| weeks.checked_add(days_needed))
            .ok_or_else(|| anyhow!("date out of range: {}", input))?;
        return end_of_day(add_days(today, days_needed)?);
    }

    Err(anyhow!("Could not parse date: {}", input))
}

/// Parse a point in time for the time tools.
///
/// Accepts empty or `now`, unix seconds (milliseconds from 13 digits on),
/// RFC 3339, and naive `YYYY-MM-DDTHH:MM:SS` / `YYYY-MM-DD`. Naive values are
/// read in `from` when given, else in local time.
pub fn parse_timestamp(input: &str, from: Option<FixedOffset>) -> Result<DateTime<FixedOffset>> {
    let trimmed = input.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("now") {
        return Ok(Local::now().fixed_offset());
    }

    if trimmed.chars().all(|c| c.is_ascii_digit()) {
        let value: i64 = trimmed.parse()?;
        let utc = if trimmed.len() >= 13 {
            Utc.timestamp_millis_opt(value).single()
        } else {
            Utc.timestamp_opt(value, 0).single()
        };
        let utc = utc.ok_or_else(|| anyhow!("timestamp out of range: {}", trimmed))?;
        return Ok(utc.with_timezone(&local_offset()));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt);
    }

    let naive = NaiveDateTime::parse_from_str(trimmed, NAIVE_DATETIME_FORMAT)
        .ok()
        .or_else(|| parse_date_midnight(trimmed));
    if let Some(naive) = naive {
        return match from {
            Some(offset) => offset
                .from_local_datetime(&naive)
                .single()
                .ok_or_else(|| anyhow!("invalid local time: {}", trimmed)),
            None => Ok(local_to_utc(&naive)?.with_timezone(&local_offset())),
        };
    }

    Err(anyhow!("invalid ts: {:?} (RFC3339, YYYY-MM-DD, 'now' or unix epoch)", input))
}

/// Parse a zone given as `UTC`, `Z`, `local`, `+02:00`, `-0530` or `+02`.
pub fn parse_offset(input: &str) -> Result<FixedOffset> {
    let s = input.trim();
    match s.to_lowercase().as_str() {
        "utc" | "z" | "gmt" => return Ok(Utc.fix()),
        "local" => return Ok(local_offset()),
        _ => {}
    }

    let s = s.strip_prefix("UTC").or_else(|| s.strip_prefix("utc")).unwrap_or(s);
    let (sign, rest) = match s.chars().next() {
        Some('+') => (1, &s[1..]),
        Some('-') => (-1, &s[1..]),
        _ => bail!("unknown time-zone: {}", input),
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        bail!("unknown time-zone: {}", input);
    }
    let (hours, minutes) = match digits.len() {
        1 | 2 => (digits.parse::<i32>()?, 0),
        4 => (digits[..2].parse::<i32>()?, digits[2..].parse::<i32>()?),
        _ => bail!("unknown time-zone: {}", input),
    };
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .ok_or_else(|| anyhow!("unknown time-zone: {}", input))
}

/// Parse a duration.
///
/// Understands compact forms (`2h30m`, `90s`, `1.5h`, `3d`, `1w`), ISO-8601
/// (`P1DT30M`) and phrases (`2 hours`, `1 day 30 min`, `90min`).
pub fn parse_duration(input: &str) -> Result<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(anyhow!("Empty duration string"));
    }
    if input.starts_with(['P', 'p']) {
        return parse_iso_duration(input);
    }

    let (negative, body) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input.strip_prefix('+').unwrap_or(input)),
    };

    let mut total_ms = 0.0;
    let mut chars = body.chars().peekable();
    let mut parts = 0;
    loop {
        while chars.next_if(|c| c.is_whitespace() || *c == ',').is_some() {}
        if chars.peek().is_none() {
            break;
        }

        let mut number = String::new();
        while let Some(c) = chars.next_if(|c| c.is_ascii_digit() || *c == '.') {
            number.push(c);
        }
        let value: f64 = number.parse().map_err(|_| anyhow!("invalid duration: {:?}", input))?;

        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        let mut unit = String::new();
        while let Some(c) = chars.next_if(|c| c.is_alphabetic()) {
            unit.push(c);
        }
        let unit_ms = unit_millis(&unit).ok_or_else(|| anyhow!("Unknown duration unit: {}", unit))?;

        total_ms += value * unit_ms;
        parts += 1;
    }

    if parts == 0 {
        bail!("invalid duration: {:?}", input);
    }
    let ms = total_ms.round();
    if !ms.is_finite() || ms.abs() >= i64::MAX as f64 {
        bail!("duration out of range: {:?}", input);
    }
    let ms = ms as i64;
    Duration::try_milliseconds(if negative { -ms } else { ms })
        .ok_or_else(|| anyhow!("duration out of range: {:?}", input))
}

/// Unit for reporting the difference between two instants.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DiffUnit {
    #[default]
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl DiffUnit {
    /// Unknown names fall back to seconds.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "minutes" | "minute" | "min" | "mins" | "m" => DiffUnit::Minutes,
            "hours" | "hour" | "hr" | "hrs" | "h" => DiffUnit::Hours,
            "days" | "day" | "d" => DiffUnit::Days,
            _ => DiffUnit::Seconds,
        }
    }

    fn seconds(self) -> f64 {
        match self {
            DiffUnit::Seconds => 1.0,
            DiffUnit::Minutes => 60.0,
            DiffUnit::Hours => 3600.0,
            DiffUnit::Days => 86_400.0,
        }
    }
}

/// `to - from` expressed in `unit`.
pub fn time_diff<A: TimeZone, B: TimeZone>(from: &DateTime<A>, to: &DateTime<B>, unit: DiffUnit) -> f64 {
    let delta = to.timestamp_millis() - from.timestamp_millis();
    delta as f64 / 1000.0 / unit.seconds()
}

fn unit_millis(unit: &str) -> Option<f64> {
    let ms = match unit.to_lowercase().as_str() {
        "ms" | "msec" | "millisecond" | "milliseconds" => 1.0,
        "s" | "sec" | "secs" | "second" | "seconds" => 1_000.0,
        "m" | "min" | "mins" | "minute" | "minutes" => 60_000.0,
        "h" | "hr" | "hrs" | "hour" | "hours" => 3_600_000.0,
        "d" | "day" | "days" => 86_400_000.0,
        "w" | "week" | "weeks" => 604_800_000.0,
        _ => return None,
    };
    Some(ms)
}

fn parse_iso_duration(input: &str) -> Result<Duration> {
    let upper = input.to_uppercase();
    let body = &upper[1..];
    let (date_part, time_part) = match body.split_once('T') {
        Some((d, t)) => (d, Some(t)),
        None => (body, None),
    };

    let mut total = Duration::zero();
    let mut parts = 0;
    for (section, is_time) in [(date_part, false), (time_part.unwrap_or(""), true)] {
        let mut number = String::new();
        for c in section.chars() {
            if c.is_ascii_digit() {
                number.push(c);
                continue;
            }
            let value: i64 = number.parse().map_err(|_| anyhow!("not ISO-8601 duration: {}", input))?;
            number.clear();
            let part = match (c, is_time) {
                ('W', false) => Duration::try_weeks(value),
                ('D', false) => Duration::try_days(value),
                ('H', true) => Duration::try_hours(value),
                ('M', true) => Duration::try_minutes(value),
                ('S', true) => Duration::try_seconds(value),
                _ => bail!("not ISO-8601 duration: {}", input),
            };
            total = part
                .and_then(|part| total.checked_add(&part))
                .ok_or_else(|| anyhow!("duration out of range: {}", input))?;
            parts += 1;
        }
        if !number.is_empty() {
            bail!("not ISO-8601 duration: {}", input);
        }
    }

    if parts == 0 {
        bail!("not ISO-8601 duration: {}", input);
    }
    Ok(total)
}

fn parse_date_midnight(input: &str) -> Option<NaiveDateTime> {
    NaiveDate::parse_from_str(input, DATE_FORMAT)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn local_offset() -> FixedOffset {
    Local::now().offset().fix()
}

fn local_to_utc(dt: &NaiveDateTime) -> Result<DateTime<Utc>> {
    Local
        .from_local_datetime(dt)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| anyhow!("{} does not exist in the local time zone", dt))
}

fn end_of_day(date: NaiveDate) -> Result<DateTime<Utc>> {
    let local_dt = date
        .and_hms_opt(23, 59, 59)
        .ok_or_else(|| anyhow!("invalid date: {}", date))?;
    local_to_utc(&local_dt)
}

fn last_day_of_month(year: i32, month: u32) -> Result<NaiveDate> {
    let (next_year, next_month) = if month == 12 { (year.saturating_add(1), 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .ok_or_else(|| anyhow!("invalid month: {}-{}", year, month))
}

fn add_days(date: NaiveDate, days: i64) -> Result<NaiveDate> {
    Duration::try_days(days)
        .and_then(|delta| date.checked_add_signed(delta))
        .ok_or_else(|| anyhow!("date out of range: {} + {} days", date, days))
}

fn add_months(date: NaiveDate, count: i64) -> Result<NaiveDate> {
    let months = (date.year() as i64 * 12 + date.month0() as i64)
        .checked_add(count)
        .ok_or_else(|| anyhow!("date out of range: {} + {} months", date, count))?;
    let year = i32::try_from(months.div_euclid(12))
        .map_err(|_| anyhow!("date out of range: {} + {} months", date, count))?;
    let month = (months.rem_euclid(12) + 1) as u32;
    // Jan 31 + 1m lands on the last day of February
    match NaiveDate::from_ymd_opt(year, month, date.day()) {
        Some(d) => Ok(d),
        None => last_day_of_month(year, month),
    }
}

fn parse_weekday_str(s: &str) -> Option<Weekday> {
    match s {
        "mon" | "monday" => Some(Weekday::Mon),
        "tue" | "tuesday" => Some(Weekday::Tue),
        "wed" | "wednesday" => Some(Weekday::Wed),
        "thu" | "thursday" => Some(Weekday::Thu),
        "fri" | "friday" => Some(Weekday::Fri),
        "sat" | "saturday" => Some(Weekday::Sat),
        "sun" | "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}
