use anyhow::{
  anyhow,
  bail
};
use chrono::NaiveDate;
use serde::Serialize;

use crate::holidays::HolidayIndex;
use crate::model::{
  HolidayRecord,
  LeaveInterval
};

/// Every leave whose inclusive interval contains `date`, in input order.
pub fn leaves_on_date(
  leaves: &[LeaveInterval],
  date: NaiveDate
) -> Vec<&LeaveInterval> {
  leaves
    .iter()
    .filter(|leave| leave.covers(date))
    .collect()
}

/// First holiday falling inside `start..=end`, scanning ascending.
///
/// Callers validate `start <= end` first; a reversed range finds nothing.
pub fn find_blocking_holiday<'a>(
  index: &HolidayIndex<'a>,
  start: NaiveDate,
  end: NaiveDate
) -> Option<&'a HolidayRecord> {
  let found =
    index.first_between(start, end);
  if let Some(holiday) = found {
    tracing::debug!(
      %start,
      %end,
      holiday = %holiday.name,
      "holiday inside requested range"
    );
  }
  found
}

#[must_use]
pub fn inclusive_day_count(
  start: NaiveDate,
  end: NaiveDate
) -> i64 {
  (end - start).num_days() + 1
}

/// Dates picked in the apply-leave form; either may still be unset.
#[derive(
  Debug, Clone, Default, PartialEq, Eq,
)]
pub struct LeaveApplication {
  pub leave_type: Option<String>,
  pub start_date: Option<NaiveDate>,
  pub end_date:   Option<NaiveDate>
}

impl LeaveApplication {
  pub fn new(
    leave_type: impl Into<String>,
    start_date: NaiveDate,
    end_date: NaiveDate
  ) -> Self {
    Self {
      leave_type: Some(leave_type.into()),
      start_date: Some(start_date),
      end_date:   Some(end_date)
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(
  tag = "verdict",
  rename_all = "lowercase"
)]
pub enum Verdict<'a> {
  Accepted {
    start:     NaiveDate,
    end:       NaiveDate,
    day_count: i64
  },
  Blocked {
    holiday: &'a HolidayRecord
  }
}

/// Checks a leave application before it is sent for approval.
///
/// Malformed input (no leave type, missing or reversed dates, a start in the
/// past) is an error. A range that would span a holiday is a `Blocked` verdict.
#[tracing::instrument(skip(index))]
pub fn validate_application<'a>(
  application: &LeaveApplication,
  index: &HolidayIndex<'a>,
  today: NaiveDate
) -> anyhow::Result<Verdict<'a>> {
  if application
    .leave_type
    .as_deref()
    .is_none_or(|label| label.trim().is_empty())
  {
    bail!("please select a leave type");
  }

  let (Some(start), Some(end)) = (
    application.start_date,
    application.end_date
  ) else {
    bail!(
      "please select both start and \
       end dates"
    );
  };

  if start > end {
    return Err(anyhow!(
      "end date must be on or after \
       start date ({start} > {end})"
    ));
  }

  if start < today {
    bail!(
      "start date cannot be in the \
       past ({start} < {today})"
    );
  }

  if let Some(holiday) =
    find_blocking_holiday(
      index, start, end
    )
  {
    return Ok(Verdict::Blocked {
      holiday
    });
  }

  Ok(Verdict::Accepted {
    start,
    end,
    day_count: inclusive_day_count(
      start, end
    )
  })
}
