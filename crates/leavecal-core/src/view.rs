use chrono::{
  Datelike,
  NaiveDate
};
use serde::Serialize;

use crate::classify::Classifier;
use crate::datetime::is_weekend;
use crate::grid::{
  WeekdayLabel,
  build_month_grid,
  build_week_grid,
  month_title,
  week_title,
  weekday_labels
};
use crate::holidays::HolidayIndex;
use crate::model::{
  CalendarCell,
  CategoryStyle,
  HolidayRecord,
  LeaveInterval
};
use crate::overlap::leaves_on_date;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotatedLeave<'a> {
  pub leave:    &'a LeaveInterval,
  pub category: CategoryStyle
}

/// A grid cell together with what falls on its date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayAnnotation<'a> {
  #[serde(flatten)]
  pub cell:     CalendarCell,
  pub is_today: bool,
  pub holiday:  Option<&'a HolidayRecord>,
  pub leaves:   Vec<AnnotatedLeave<'a>>
}

impl<'a> DayAnnotation<'a> {
  fn blank() -> Self {
    Self {
      cell:     CalendarCell::blank(),
      is_today: false,
      holiday:  None,
      leaves:   Vec::new()
    }
  }
}

/// Annotates a single date with its holiday and covering leaves.
pub fn annotate_date<'a>(
  cell: CalendarCell,
  leaves: &'a [LeaveInterval],
  index: &HolidayIndex<'a>,
  classifier: &Classifier,
  today: NaiveDate
) -> DayAnnotation<'a> {
  let Some(date) = cell.date else {
    return DayAnnotation::blank();
  };

  DayAnnotation {
    cell,
    is_today: date == today,
    holiday: index.lookup(date),
    leaves: leaves_on_date(leaves, date)
      .into_iter()
      .map(|leave| AnnotatedLeave {
        leave,
        category: classifier.classify(
          &leave.leave_type_label,
          &leave.status
        )
      })
      .collect()
  }
}

fn date_cell(
  date: NaiveDate
) -> CalendarCell {
  CalendarCell {
    day_number: Some(date.day()),
    date:       Some(date),
    is_weekend: is_weekend(date)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthView<'a> {
  pub anchor:   NaiveDate,
  pub title:    String,
  pub weekdays: [WeekdayLabel; 7],
  pub cells:    Vec<DayAnnotation<'a>>
}

impl<'a> MonthView<'a> {
  #[tracing::instrument(skip(leaves, index, classifier), fields(leaves = leaves.len()))]
  pub fn build(
    anchor: NaiveDate,
    leaves: &'a [LeaveInterval],
    index: &HolidayIndex<'a>,
    classifier: &Classifier,
    today: NaiveDate
  ) -> Self {
    let cells: Vec<DayAnnotation<'a>> =
      build_month_grid(anchor)
      .into_iter()
      .map(|cell| {
        annotate_date(
          cell, leaves, index,
          classifier, today
        )
      })
      .collect();

    Self {
      anchor,
      title: month_title(anchor),
      weekdays: weekday_labels(),
      cells
    }
  }

  pub fn leave_days(&self) -> usize {
    self
      .cells
      .iter()
      .filter(|cell| !cell.leaves.is_empty())
      .count()
  }

  pub fn holidays(
    &self
  ) -> impl Iterator<
    Item = (NaiveDate, &'a HolidayRecord)
  > + '_ {
    self.cells.iter().filter_map(|cell| {
      Some((cell.cell.date?, cell.holiday?))
    })
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekView<'a> {
  pub start: NaiveDate,
  pub end:   NaiveDate,
  pub title: String,
  pub days:  Vec<DayAnnotation<'a>>
}

impl<'a> WeekView<'a> {
  #[tracing::instrument(skip(leaves, index, classifier), fields(leaves = leaves.len()))]
  pub fn build(
    anchor: NaiveDate,
    leaves: &'a [LeaveInterval],
    index: &HolidayIndex<'a>,
    classifier: &Classifier,
    today: NaiveDate
  ) -> Self {
    let dates = build_week_grid(anchor);
    let days: Vec<DayAnnotation<'a>> = dates
      .iter()
      .map(|date| {
        annotate_date(
          date_cell(*date),
          leaves,
          index,
          classifier,
          today
        )
      })
      .collect();

    Self {
      start: dates[0],
      end: dates[6],
      title: week_title(anchor),
      days
    }
  }
}

/// What the day detail view shows for one date.
pub fn day_view<'a>(
  date: NaiveDate,
  leaves: &'a [LeaveInterval],
  index: &HolidayIndex<'a>,
  classifier: &Classifier,
  today: NaiveDate
) -> DayAnnotation<'a> {
  annotate_date(
    date_cell(date),
    leaves,
    index,
    classifier,
    today
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::LeaveStatus;

  fn ymd(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  fn fixtures()
  -> (Vec<LeaveInterval>, Vec<HolidayRecord>)
  {
    let leaves = vec![
      LeaveInterval::new(
        "1",
        "Asha",
        "Sick Leave",
        ymd(2025, 12, 22),
        ymd(2025, 12, 23),
        LeaveStatus::Approved
      ),
      LeaveInterval::new(
        "2",
        "Ravi",
        "WFH",
        ymd(2025, 12, 23),
        ymd(2025, 12, 23),
        LeaveStatus::Pending
      ),
    ];
    let holidays = vec![HolidayRecord::new(
      "h1",
      "Christmas",
      ymd(2025, 12, 25)
    )];
    (leaves, holidays)
  }

  #[test]
  fn month_view_annotates_cells() {
    let (leaves, holidays) = fixtures();
    let index =
      HolidayIndex::build(&holidays);
    let today = ymd(2025, 12, 23);
    let view = MonthView::build(
      ymd(2025, 12, 1),
      &leaves,
      &index,
      &Classifier::default(),
      today
    );

    assert_eq!(view.title, "December 2025");
    assert_eq!(view.cells.len() % 7, 0);
    // 2025-12-01 is a Monday, so the 23rd sits at index 23.
    let cell = &view.cells[23];
    assert_eq!(
      cell.cell.date,
      Some(today)
    );
    assert!(cell.is_today);
    let categories = cell
      .leaves
      .iter()
      .map(|l| l.category)
      .collect::<Vec<_>>();
    assert_eq!(
      categories,
      vec![
        CategoryStyle::Sick,
        CategoryStyle::Pending
      ]
    );
    assert_eq!(view.leave_days(), 2);
    assert_eq!(
      view
        .holidays()
        .map(|(date, _)| date)
        .collect::<Vec<_>>(),
      vec![ymd(2025, 12, 25)]
    );
    assert!(view.cells[0].cell.is_blank());
    assert!(view.cells[0].leaves.is_empty());
  }

  #[test]
  fn week_view_covers_seven_days() {
    let (leaves, holidays) = fixtures();
    let index =
      HolidayIndex::build(&holidays);
    let view = WeekView::build(
      ymd(2025, 12, 24),
      &leaves,
      &index,
      &Classifier::default(),
      ymd(2025, 12, 1)
    );
    assert_eq!(view.days.len(), 7);
    assert_eq!(view.start, ymd(2025, 12, 21));
    assert_eq!(view.end, ymd(2025, 12, 27));
    assert!(view.days[0].cell.is_weekend);
    assert!(view.days[4].holiday.is_some());
    assert_eq!(view.days[2].leaves.len(), 2);
    assert!(view
      .days
      .iter()
      .all(|day| !day.is_today));
  }

  #[test]
  fn empty_inputs_render_empty_views() {
    let index = HolidayIndex::build(&[]);
    let view = MonthView::build(
      ymd(2025, 2, 1),
      &[],
      &index,
      &Classifier::default(),
      ymd(2025, 2, 1)
    );
    assert_eq!(view.leave_days(), 0);
    assert_eq!(view.holidays().count(), 0);

    let day = day_view(
      ymd(2025, 2, 3),
      &[],
      &index,
      &Classifier::default(),
      ymd(2025, 2, 1)
    );
    assert!(day.leaves.is_empty());
    assert!(day.holiday.is_none());
  }
}
