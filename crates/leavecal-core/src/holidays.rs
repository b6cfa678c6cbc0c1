use std::collections::btree_map::Entry;
use std::collections::{
  BTreeMap,
  BTreeSet
};

use chrono::{
  Datelike,
  NaiveDate
};
use serde::Serialize;

use crate::datetime::{
  first_day_of_month,
  last_day_of_month,
  normalize_calendar_date
};
use crate::model::HolidayRecord;

const UPCOMING_WINDOW_DAYS: i64 = 30;

/// Date-keyed lookup over a holiday snapshot.
///
/// Keys are calendar dates only. When two records share a date the first one
/// in input order is kept.
#[derive(Debug, Clone, Default)]
pub struct HolidayIndex<'a> {
  by_date: BTreeMap<
    NaiveDate,
    &'a HolidayRecord
  >,
  skipped: usize
}

impl<'a> HolidayIndex<'a> {
  #[tracing::instrument(skip(holidays), fields(count = holidays.len()))]
  pub fn build(
    holidays: &'a [HolidayRecord]
  ) -> Self {
    let mut by_date = BTreeMap::new();
    let mut skipped = 0_usize;

    for holiday in holidays {
      let Some(date) = holiday.date
      else {
        skipped += 1;
        continue;
      };
      match by_date.entry(date) {
        | Entry::Vacant(slot) => {
          slot.insert(holiday);
        }
        | Entry::Occupied(existing) => {
          tracing::debug!(
            %date,
            kept = %existing.get().name,
            dropped = %holiday.name,
            "duplicate holiday date; keeping first"
          );
        }
      }
    }

    if skipped > 0 {
      tracing::debug!(
        skipped,
        "holidays without a date left out of index"
      );
    }

    Self { by_date, skipped }
  }

  pub fn lookup(
    &self,
    date: NaiveDate
  ) -> Option<&'a HolidayRecord> {
    self.by_date.get(&date).copied()
  }

  /// Looks up a raw ISO date or timestamp after reducing it to a date.
  pub fn lookup_str(
    &self,
    raw: &str
  ) -> Option<&'a HolidayRecord> {
    self.lookup(
      normalize_calendar_date(raw)?
    )
  }

  pub fn contains(
    &self,
    date: NaiveDate
  ) -> bool {
    self.by_date.contains_key(&date)
  }

  /// First holiday in `start..=end`, ascending. Empty when `start > end`.
  pub fn first_between(
    &self,
    start: NaiveDate,
    end: NaiveDate
  ) -> Option<&'a HolidayRecord> {
    if start > end {
      return None;
    }
    self
      .by_date
      .range(start..=end)
      .next()
      .map(|(_, holiday)| *holiday)
  }

  pub fn len(&self) -> usize {
    self.by_date.len()
  }

  pub fn is_empty(&self) -> bool {
    self.by_date.is_empty()
  }

  pub fn skipped(&self) -> usize {
    self.skipped
  }

  pub fn iter(
    &self
  ) -> impl Iterator<
    Item = (NaiveDate, &'a HolidayRecord)
  > + '_ {
    self
      .by_date
      .iter()
      .map(|(date, holiday)| {
        (*date, *holiday)
      })
  }

  /// Holidays on or after `today`, soonest first.
  pub fn upcoming(
    &self,
    today: NaiveDate,
    limit: usize
  ) -> Vec<&'a HolidayRecord> {
    self
      .by_date
      .range(today..)
      .take(limit)
      .map(|(_, holiday)| *holiday)
      .collect()
  }

  pub fn in_year(
    &self,
    year: i32
  ) -> Vec<&'a HolidayRecord> {
    let start =
      first_day_of_month(year, 1);
    let end =
      last_day_of_month(year, 12);
    self
      .by_date
      .range(start..=end)
      .map(|(_, holiday)| *holiday)
      .collect()
  }

  pub fn in_month(
    &self,
    anchor: NaiveDate
  ) -> Vec<&'a HolidayRecord> {
    let start = first_day_of_month(
      anchor.year(),
      anchor.month()
    );
    let end = last_day_of_month(
      anchor.year(),
      anchor.month()
    );
    self
      .by_date
      .range(start..=end)
      .map(|(_, holiday)| *holiday)
      .collect()
  }

  pub fn available_years(
    &self
  ) -> Vec<i32> {
    self
      .by_date
      .keys()
      .map(Datelike::year)
      .collect::<BTreeSet<_>>()
      .into_iter()
      .collect()
  }
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize,
)]
#[serde(
  tag = "kind",
  content = "days",
  rename_all = "lowercase"
)]
pub enum HolidayProximity {
  Past,
  Today,
  Tomorrow,
  Upcoming(i64),
  Later(i64)
}

impl HolidayProximity {
  pub fn classify(
    date: NaiveDate,
    today: NaiveDate
  ) -> Self {
    match days_until(date, today) {
      | days if days < 0 => Self::Past,
      | 0 => Self::Today,
      | 1 => Self::Tomorrow,
      | days
        if days
          < UPCOMING_WINDOW_DAYS =>
      {
        Self::Upcoming(days)
      }
      | days => Self::Later(days)
    }
  }

  pub fn label(self) -> String {
    match self {
      | Self::Past => "Past".to_string(),
      | Self::Today => {
        "Today".to_string()
      }
      | Self::Tomorrow => {
        "Tomorrow".to_string()
      }
      | Self::Upcoming(days)
      | Self::Later(days) => {
        let (count, unit) = match days {
          | 0..7 => (days, "day"),
          | 7..30 => (days / 7, "week"),
          | _ => (days / 30, "month")
        };
        let plural =
          if count == 1 { "" } else { "s" };
        format!("In {count} {unit}{plural}")
      }
    }
  }
}

#[must_use]
pub fn days_until(
  date: NaiveDate,
  today: NaiveDate
) -> i64 {
  (date - today).num_days()
}
