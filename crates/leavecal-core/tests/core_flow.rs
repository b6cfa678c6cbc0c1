use std::fs;

use chrono::NaiveDate;
use leavecal_core::classify::Classifier;
use leavecal_core::config::Config;
use leavecal_core::holidays::HolidayIndex;
use leavecal_core::model::CategoryStyle;
use leavecal_core::overlap::{LeaveApplication, Verdict, validate_application};
use leavecal_core::source::{Snapshot, SnapshotPaths};
use leavecal_core::timeline::TeamTimeline;
use leavecal_core::view::{MonthView, WeekView};
use tempfile::tempdir;

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

const LEAVES: &str = r#"{"data": [
    {"id": 11, "employee": "Meera", "leave_type": "Annual Leave",
     "start_date": "2025-08-28T00:00:00Z", "end_date": "2025-09-10",
     "days": 14, "status": "APPROVED"},
    {"id": 12, "employee": "Arjun", "leave_type": "Casual Leave",
     "start_date": "2025-09-15", "end_date": "2025-09-16",
     "days": 2, "status": "REJECTED"},
    {"id": 13, "employee": "Meera", "leave_type": "Sick Leave",
     "start_date": "2025-09-22", "end_date": "2025-09-22",
     "days": 1, "status": "APPROVED"},
    {"id": 14, "employee": "Kiran", "leave_type": "Comp Off",
     "start_date": "not-a-date", "end_date": "2025-09-03",
     "days": 1, "status": "APPROVED"}
]}"#;

const HOLIDAYS: &str = r#"[
    {"id": "h1", "name": "Onam", "date": "2025-09-05", "day": "Friday", "type": "MANDATORY"},
    {"id": "h2", "name": "Gandhi Jayanti", "date": "2025-10-02", "day": "Thursday", "type": "MANDATORY"},
    {"id": "h3", "name": "Broken", "date": null, "day": "", "type": "OPTIONAL"}
]"#;

fn load_fixture() -> Snapshot {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("leaves.json"), LEAVES).expect("write leaves");
    fs::write(dir.path().join("holidays.json"), HOLIDAYS).expect("write holidays");

    let paths = SnapshotPaths::resolve(&Config::default(), dir.path());
    Snapshot::load(&paths).expect("load snapshot")
}

#[test]
fn snapshot_feeds_month_week_and_timeline_views() {
    let snapshot = load_fixture();
    assert_eq!(snapshot.leaves.len(), 4);
    assert!(snapshot.leaves[3].start_date.is_none());

    let index = HolidayIndex::build(&snapshot.holidays);
    assert_eq!(index.len(), 2);
    assert_eq!(index.skipped(), 1);

    let classifier = Classifier::default();
    let today = ymd(2025, 9, 1);

    let month = MonthView::build(ymd(2025, 9, 17), &snapshot.leaves, &index, &classifier, today);
    assert_eq!(month.title, "September 2025");
    // 2025-09-01 is a Monday: one leading blank, five rows.
    assert_eq!(month.cells.len(), 35);
    assert!(month.cells[0].cell.is_blank());
    assert!(month.cells[1].is_today);
    // Meera's annual leave runs into the month and the rejected leave still shows.
    assert_eq!(month.cells[1].leaves.len(), 1);
    assert_eq!(month.cells[1].leaves[0].category, CategoryStyle::Annual);
    assert_eq!(month.cells[15].leaves[0].category, CategoryStyle::Casual);
    assert_eq!(month.holidays().count(), 1);

    let week = WeekView::build(ymd(2025, 9, 3), &snapshot.leaves, &index, &classifier, today);
    assert_eq!(week.start, ymd(2025, 8, 31));
    assert_eq!(week.end, ymd(2025, 9, 6));
    assert_eq!(week.days[5].holiday.map(|h| h.name.as_str()), Some("Onam"));

    let timeline = TeamTimeline::build(ymd(2025, 9, 1), &snapshot.leaves, &index, &classifier);
    let names = timeline
        .rows
        .iter()
        .map(|row| row.employee_name.as_str())
        .collect::<Vec<_>>();
    // Kiran's leave has no usable start, so the row stays but carries no bar.
    assert_eq!(names, vec!["Meera", "Arjun", "Kiran"]);
    assert!(timeline.rows[2].bars.is_empty());
    assert_eq!(timeline.total_leaves(), 4);
    assert_eq!(timeline.visible_bars(), 3);

    let carried = &timeline.rows[0].bars[0].bar;
    assert_eq!(carried.first_day, 1);
    assert_eq!(carried.last_day, 10);
    assert!(carried.start_fraction.abs() < 1e-9);
    assert!((carried.width_fraction - 10.0 / 30.0).abs() < 1e-9);
}

#[test]
fn applications_spanning_holidays_are_blocked() {
    let snapshot = load_fixture();
    let index = HolidayIndex::build(&snapshot.holidays);
    let today = ymd(2025, 9, 1);

    let blocked = validate_application(
        &LeaveApplication::new("Annual Leave", ymd(2025, 9, 4), ymd(2025, 9, 8)),
        &index,
        today,
    )
    .expect("valid application");
    match blocked {
        Verdict::Blocked { holiday } => assert_eq!(holiday.name, "Onam"),
        other => panic!("expected blocked verdict, got {other:?}"),
    }

    let accepted = validate_application(
        &LeaveApplication::new("Annual Leave", ymd(2025, 9, 8), ymd(2025, 9, 12)),
        &index,
        today,
    )
    .expect("valid application");
    assert_eq!(
        accepted,
        Verdict::Accepted {
            start: ymd(2025, 9, 8),
            end: ymd(2025, 9, 12),
            day_count: 5
        }
    );
}

#[test]
fn missing_data_files_are_an_empty_calendar() {
    let dir = tempdir().expect("tempdir");
    let paths = SnapshotPaths::resolve(&Config::default(), dir.path());
    let snapshot = Snapshot::load(&paths).expect("load empty snapshot");

    let index = HolidayIndex::build(&snapshot.holidays);
    let timeline = TeamTimeline::build(ymd(2025, 2, 1), &snapshot.leaves, &index, &Classifier::default());
    assert!(timeline.is_empty());
    assert_eq!(timeline.days.len(), 28);
}
