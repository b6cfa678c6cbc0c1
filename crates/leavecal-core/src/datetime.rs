use std::sync::OnceLock;

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Datelike,
  Duration,
  NaiveDate,
  Utc,
  Weekday
};
use chrono_tz::Tz;
use regex::Regex;

pub const TIMEZONE_ENV_VAR: &str =
  "LEAVECAL_TIMEZONE";
const DEFAULT_TIMEZONE: &str = "UTC";

fn date_prefix_re() -> Option<&'static Regex>
{
  static DATE_PREFIX: OnceLock<
    Option<Regex>
  > = OnceLock::new();
  DATE_PREFIX
    .get_or_init(|| {
      Regex::new(
        r"^(?P<year>\d{4})-(?P<month>\d{2})-(?P<day>\d{2})(?:[T ]|$)",
      )
      .map_err(|err| {
        tracing::error!(
          error = %err,
          "internal date regex compile failure"
        );
      })
      .ok()
    })
    .as_ref()
}

/// Reduces an ISO-8601 date or timestamp to its calendar-date portion as
/// written, ignoring any time of day and offset.
///
/// `2025-01-01T18:30:00+05:30`, `2025-01-01T00:00:00Z` and `2025-01-01` all
/// normalise to the same key. Returns `None` for anything that does not start
/// with a valid `YYYY-MM-DD`.
#[must_use]
pub fn normalize_calendar_date(
  raw: &str
) -> Option<NaiveDate> {
  let token = raw.trim();
  let captures =
    date_prefix_re()?.captures(token)?;

  let year = captures
    .name("year")?
    .as_str()
    .parse::<i32>()
    .ok()?;
  let month = captures
    .name("month")?
    .as_str()
    .parse::<u32>()
    .ok()?;
  let day = captures
    .name("day")?
    .as_str()
    .parse::<u32>()
    .ok()?;

  let date = NaiveDate::from_ymd_opt(
    year, month, day
  );
  if date.is_none() {
    tracing::trace!(
      input = token,
      "date prefix out of range"
    );
  }
  date
}

#[must_use]
pub fn format_calendar_date(
  date: NaiveDate
) -> String {
  date.format("%Y-%m-%d").to_string()
}

/// Parses a date given on the command line.
#[tracing::instrument(skip(today), fields(input = input))]
pub fn parse_date_arg(
  input: &str,
  today: NaiveDate
) -> anyhow::Result<NaiveDate> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();

  match lower.as_str() {
    | "today" => return Ok(today),
    | "tomorrow" => {
      return Ok(add_days(today, 1));
    }
    | "yesterday" => {
      return Ok(add_days(today, -1));
    }
    | _ => {}
  }

  if let Some(date) =
    normalize_calendar_date(token)
  {
    return Ok(date);
  }

  if let Some((year, month)) =
    token.split_once('-')
    && year.len() == 4
    && month.len() == 2
  {
    let year: i32 = year
      .parse()
      .context("invalid year")?;
    let month: u32 = month
      .parse()
      .context("invalid month")?;
    return NaiveDate::from_ymd_opt(
      year, month, 1
    )
    .ok_or_else(|| {
      anyhow!(
        "invalid year/month: {token}"
      )
    });
  }

  Err(anyhow!(
    "unrecognized date: {input}"
  ))
  .with_context(|| {
    "supported formats: \
     today/tomorrow/yesterday, \
     YYYY-MM-DD, YYYY-MM, RFC3339"
  })
}

/// Resolves the timezone used to decide what "today" is.
///
/// Order: the configured value, then `LEAVECAL_TIMEZONE`, then UTC.
pub fn resolve_timezone(
  configured: Option<&str>
) -> Tz {
  if let Some(raw) = configured
    && let Some(tz) =
      parse_timezone(raw, "config")
  {
    return tz;
  }

  if let Ok(raw) =
    std::env::var(TIMEZONE_ENV_VAR)
    && let Some(tz) = parse_timezone(
      &raw,
      TIMEZONE_ENV_VAR
    )
  {
    return tz;
  }

  parse_timezone(
    DEFAULT_TIMEZONE,
    "default"
  )
  .unwrap_or(chrono_tz::UTC)
}

fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    tracing::warn!(
      source,
      "timezone source was empty"
    );
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::debug!(
        source,
        timezone = %trimmed,
        "resolved display timezone"
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::error!(
        source,
        timezone = %trimmed,
        error = %err,
        "failed to parse timezone id"
      );
      None
    }
  }
}

#[must_use]
pub fn today_in(tz: Tz) -> NaiveDate {
  date_in(Utc::now(), tz)
}

#[must_use]
pub fn date_in(
  now: DateTime<Utc>,
  tz: Tz
) -> NaiveDate {
  now.with_timezone(&tz).date_naive()
}

#[must_use]
pub fn first_day_of_month(
  year: i32,
  month: u32
) -> NaiveDate {
  NaiveDate::from_ymd_opt(
    year, month, 1
  )
  .unwrap_or(NaiveDate::MIN)
}

#[must_use]
pub fn last_day_of_month(
  year: i32,
  month: u32
) -> NaiveDate {
  let (next_year, next_month) =
    if month >= 12 {
      (year.saturating_add(1), 1_u32)
    } else {
      (year, month + 1)
    };
  add_days(
    first_day_of_month(
      next_year, next_month
    ),
    -1
  )
}

#[must_use]
pub fn days_in_month(
  year: i32,
  month: u32
) -> u32 {
  last_day_of_month(year, month).day()
}

#[must_use]
pub fn add_days(
  date: NaiveDate,
  days: i64
) -> NaiveDate {
  Duration::try_days(days)
    .and_then(|delta| {
      date.checked_add_signed(delta)
    })
    .unwrap_or(date)
}

#[must_use]
pub fn shift_months(
  date: NaiveDate,
  months: i32
) -> NaiveDate {
  let total = i64::from(date.year())
    * 12
    + i64::from(date.month0())
    + i64::from(months);
  let Ok(year) =
    i32::try_from(total.div_euclid(12))
  else {
    return date;
  };
  let month =
    total.rem_euclid(12) as u32 + 1;

  let day = date
    .day()
    .min(days_in_month(year, month));
  NaiveDate::from_ymd_opt(
    year, month, day
  )
  .unwrap_or(date)
}

#[must_use]
pub fn start_of_week(
  day: NaiveDate,
  week_start: Weekday
) -> NaiveDate {
  let day_idx = day
    .weekday()
    .num_days_from_monday()
    as i64;
  let start_idx = week_start
    .num_days_from_monday()
    as i64;
  let diff =
    (7 + day_idx - start_idx) % 7;
  add_days(day, -diff)
}

#[must_use]
pub fn is_weekend(
  date: NaiveDate
) -> bool {
  matches!(
    date.weekday(),
    Weekday::Sat | Weekday::Sun
  )
}

/// Serde adapters for backend date fields.
///
/// Values that are missing, `null`, not a string, or not a valid date
/// deserialise to `None` so a single bad record never fails a whole snapshot.
pub mod calendar_date_serde {
  pub mod option {
    use chrono::NaiveDate;
    use serde::{
      Deserialize,
      Deserializer,
      Serializer
    };
    use serde_json::Value;

    use crate::datetime::{
      format_calendar_date,
      normalize_calendar_date
    };

    pub fn serialize<S>(
      date: &Option<NaiveDate>,
      serializer: S
    ) -> Result<S::Ok, S::Error>
    where
      S: Serializer
    {
      match date {
        | Some(value) => serializer
          .serialize_str(
            &format_calendar_date(
              *value
            )
          ),
        | None => {
          serializer.serialize_none()
        }
      }
    }

    pub fn deserialize<'de, D>(
      deserializer: D
    ) -> Result<
      Option<NaiveDate>,
      D::Error
    >
    where
      D: Deserializer<'de>
    {
      let raw =
        Option::<Value>::deserialize(
          deserializer
        )?;
      let parsed = match raw {
        | Some(Value::String(text)) => {
          let date =
            normalize_calendar_date(
              &text
            );
          if date.is_none() {
            tracing::debug!(
              input = %text,
              "unparseable record date; treating as absent"
            );
          }
          date
        }
        | Some(Value::Null) | None => {
          None
        }
        | Some(other) => {
          tracing::debug!(
            value = %other,
            "non-string record date; treating as absent"
          );
          None
        }
      };
      Ok(parsed)
    }
  }
}
