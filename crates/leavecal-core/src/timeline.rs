use std::collections::HashMap;

use chrono::{
  Datelike,
  NaiveDate
};
use serde::Serialize;

use crate::classify::Classifier;
use crate::datetime::{
  add_days,
  days_in_month,
  first_day_of_month,
  is_weekend,
  last_day_of_month
};
use crate::holidays::HolidayIndex;
use crate::model::{
  CategoryStyle,
  HolidayRecord,
  LeaveInterval
};

/// Horizontal extent of one leave within a displayed month.
///
/// `start_fraction` and `width_fraction` are shares of the month width;
/// `first_day` and `last_day` are the visible day numbers after clipping.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineBar {
  pub leave_id:       String,
  pub start_fraction: f64,
  pub width_fraction: f64,
  pub first_day:      u32,
  pub last_day:       u32
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmployeeRow {
  pub employee_name: String,
  /// Every leave of this employee in the input, visible this month or not.
  pub leave_count:   usize,
  pub bars:          Vec<TimelineBar>
}

#[derive(Debug, Clone, Copy)]
struct MonthBounds {
  start: NaiveDate,
  end:   NaiveDate,
  days:  u32
}

impl MonthBounds {
  fn of(anchor: NaiveDate) -> Self {
    Self {
      start: first_day_of_month(
        anchor.year(),
        anchor.month()
      ),
      end:   last_day_of_month(
        anchor.year(),
        anchor.month()
      ),
      days:  days_in_month(
        anchor.year(),
        anchor.month()
      )
    }
  }
}

/// Groups every leave by employee in first-seen order, each group sorted by
/// start date. Leaves without a start sort last.
fn group_by_employee(
  leaves: &[LeaveInterval]
) -> Vec<(&str, Vec<&LeaveInterval>)> {
  let mut groups: Vec<(
    &str,
    Vec<&LeaveInterval>
  )> = Vec::new();
  let mut positions: HashMap<
    &str,
    usize
  > = HashMap::new();

  for leave in leaves {
    let name =
      leave.employee_name.as_str();
    let slot = *positions
      .entry(name)
      .or_insert_with(|| {
        groups.push((name, Vec::new()));
        groups.len() - 1
      });
    groups[slot].1.push(leave);
  }

  for (_, entries) in &mut groups {
    entries.sort_by_key(|leave| {
      (
        leave.start_date.is_none(),
        leave.start_date
      )
    });
  }
  groups
}

/// Lays out the anchor's month, one row per employee.
///
/// Rows keep first-seen employee order and include employees with no visible
/// bar this month. Bars within a row are ordered by start date; leaves outside
/// the month or without a valid span get no bar.
#[tracing::instrument(skip(leaves), fields(leaves = leaves.len()))]
pub fn layout_month(
  anchor: NaiveDate,
  leaves: &[LeaveInterval]
) -> Vec<EmployeeRow> {
  let month = MonthBounds::of(anchor);
  let rows = group_by_employee(leaves)
    .into_iter()
    .map(|(name, entries)| EmployeeRow {
      employee_name: name.to_string(),
      leave_count:   entries.len(),
      bars:          entries
        .into_iter()
        .filter_map(|leave| {
          bar_for(leave, month)
        })
        .collect()
    })
    .collect::<Vec<_>>();

  tracing::debug!(
    rows = rows.len(),
    month = %month.start.format("%Y-%m"),
    "laid out month timeline"
  );
  rows
}

fn bar_for(
  leave: &LeaveInterval,
  month: MonthBounds
) -> Option<TimelineBar> {
  let Some((start, end)) = leave.span()
  else {
    tracing::trace!(
      leave_id = %leave.id,
      "leave without a valid span has no bar"
    );
    return None;
  };
  let visible_start =
    start.max(month.start);
  let visible_end = end.min(month.end);
  if visible_start > visible_end {
    return None;
  }

  let first_day = visible_start.day();
  let last_day = visible_end.day();
  let width = f64::from(month.days);
  Some(TimelineBar {
    leave_id: leave.id.clone(),
    start_fraction: f64::from(
      first_day - 1
    ) / width,
    width_fraction: f64::from(
      last_day - first_day + 1
    ) / width,
    first_day,
    last_day
  })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineDay<'a> {
  pub day:        u32,
  pub date:       NaiveDate,
  pub is_weekend: bool,
  pub holiday:    Option<&'a HolidayRecord>
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorizedBar {
  #[serde(flatten)]
  pub bar:      TimelineBar,
  pub category: CategoryStyle,
  pub label:    String
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamRow {
  pub employee_name: String,
  pub leave_count:   usize,
  pub bars:          Vec<CategorizedBar>
}

/// The manager's team view for one month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamTimeline<'a> {
  pub month_start: NaiveDate,
  pub days:        Vec<TimelineDay<'a>>,
  pub rows:        Vec<TeamRow>
}

impl<'a> TeamTimeline<'a> {
  pub fn build(
    anchor: NaiveDate,
    leaves: &[LeaveInterval],
    index: &HolidayIndex<'a>,
    classifier: &Classifier
  ) -> Self {
    let month = MonthBounds::of(anchor);
    let days: Vec<TimelineDay<'a>> = (0
      ..month.days)
      .map(|offset| {
        let date = add_days(
          month.start,
          i64::from(offset)
        );
        TimelineDay {
          day: offset + 1,
          date,
          is_weekend: is_weekend(date),
          holiday: index.lookup(date)
        }
      })
      .collect();

    let rows: Vec<TeamRow> =
      group_by_employee(leaves)
        .into_iter()
        .map(|(name, entries)| TeamRow {
          employee_name: name.to_string(),
          leave_count:   entries.len(),
          bars:          entries
            .into_iter()
            .filter_map(|leave| {
              let bar =
                bar_for(leave, month)?;
              Some(CategorizedBar {
                bar,
                category: classifier
                  .classify(
                    &leave.leave_type_label,
                    &leave.status
                  ),
                label: leave
                  .leave_type_label
                  .clone()
              })
            })
            .collect()
        })
        .collect();

    Self {
      month_start: month.start,
      days,
      rows
    }
  }

  /// All leaves of the listed employees, including those with no bar.
  pub fn total_leaves(&self) -> usize {
    self
      .rows
      .iter()
      .map(|row| row.leave_count)
      .sum()
  }

  pub fn visible_bars(&self) -> usize {
    self
      .rows
      .iter()
      .map(|row| row.bars.len())
      .sum()
  }

  pub fn is_empty(&self) -> bool {
    self.rows.is_empty()
  }

  pub fn days_in_month(&self) -> usize {
    self.days.len()
  }
}
