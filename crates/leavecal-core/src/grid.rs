use chrono::{
  Datelike,
  NaiveDate,
  Weekday
};
use serde::Serialize;

use crate::datetime::{
  add_days,
  days_in_month,
  first_day_of_month,
  is_weekend,
  shift_months,
  start_of_week
};
use crate::model::CalendarCell;

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
  Month,
  Week
}

impl ViewMode {
  pub fn from_key(
    raw: &str
  ) -> Option<Self> {
    match raw
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "month" => Some(Self::Month),
      | "week" => Some(Self::Week),
      | _ => None
    }
  }

  pub fn as_key(self) -> &'static str {
    match self {
      | Self::Month => "month",
      | Self::Week => "week"
    }
  }
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize,
)]
pub struct WeekdayLabel {
  pub name:       &'static str,
  pub short:      &'static str,
  pub is_weekend: bool
}

/// Builds the cells of a Sunday-first month grid for the anchor's month.
///
/// Leading blanks align the 1st with its weekday column and trailing blanks
/// complete the last week row, so the length is always a multiple of 7.
#[tracing::instrument]
pub fn build_month_grid(
  anchor: NaiveDate
) -> Vec<CalendarCell> {
  let first = first_day_of_month(
    anchor.year(),
    anchor.month()
  );
  let month_days = days_in_month(
    anchor.year(),
    anchor.month()
  );
  let leading = first
    .weekday()
    .num_days_from_sunday()
    as usize;
  let total = (leading
    + month_days as usize)
    .div_ceil(7)
    * 7;

  let mut cells =
    Vec::with_capacity(total);
  cells.resize(
    leading,
    CalendarCell::blank()
  );
  for day in 1..=month_days {
    let date = add_days(
      first,
      i64::from(day - 1)
    );
    cells.push(CalendarCell {
      day_number: Some(day),
      date:       Some(date),
      is_weekend: is_weekend(date)
    });
  }
  cells.resize(
    total,
    CalendarCell::blank()
  );

  tracing::trace!(
    leading,
    month_days,
    total,
    "built month grid"
  );
  cells
}

/// The seven dates of the week containing `anchor`, starting on Sunday.
#[must_use]
pub fn build_week_grid(
  anchor: NaiveDate
) -> [NaiveDate; 7] {
  let start =
    start_of_week(anchor, Weekday::Sun);
  std::array::from_fn(|offset| {
    add_days(start, offset as i64)
  })
}

#[must_use]
pub fn weekday_labels()
-> [WeekdayLabel; 7] {
  const NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday"
  ];
  std::array::from_fn(|idx| {
    let name = NAMES[idx];
    WeekdayLabel {
      name,
      short: &name[..3],
      is_weekend: idx == 0 || idx == 6
    }
  })
}

pub fn shift_period(
  anchor: NaiveDate,
  mode: ViewMode,
  step: i32
) -> NaiveDate {
  match mode {
    | ViewMode::Month => {
      shift_months(anchor, step)
    }
    | ViewMode::Week => add_days(
      anchor,
      i64::from(step) * 7
    )
  }
}

pub fn month_title(
  anchor: NaiveDate
) -> String {
  anchor.format("%B %Y").to_string()
}

pub fn week_title(
  anchor: NaiveDate
) -> String {
  let days = build_week_grid(anchor);
  format!(
    "{} - {}",
    days[0].format("%b %d"),
    days[6].format("%b %d, %Y")
  )
}
