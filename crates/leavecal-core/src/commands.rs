use std::io::Write;

use anyhow::Context;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::classify::Classifier;
use crate::cli::Command;
use crate::config::Config;
use crate::datetime::parse_date_arg;
use crate::grid::{ViewMode, shift_period};
use crate::holidays::{HolidayIndex, HolidayProximity};
use crate::model::{CategoryStyle, HolidayRecord, LeaveStatus};
use crate::overlap::{LeaveApplication, validate_application};
use crate::render::Renderer;
use crate::source::Snapshot;
use crate::timeline::TeamTimeline;
use crate::view::{MonthView, WeekView, day_view};

#[derive(Debug, Serialize)]
struct HolidayEntry<'a> {
    #[serde(flatten)]
    holiday: &'a HolidayRecord,
    proximity: HolidayProximity,
}

#[derive(Debug, Serialize)]
struct ClassifyOutput<'a> {
    label: &'a str,
    status: &'a LeaveStatus,
    category: CategoryStyle,
}

/// Default rules plus any extra rule file named by `classify.rules`.
pub fn build_classifier(cfg: &Config) -> anyhow::Result<Classifier> {
    let mut classifier = Classifier::default();
    if let Some(path) = cfg.classify_rules() {
        classifier
            .extend_from_file(&path)
            .context("failed to load classify.rules")?;
    }
    Ok(classifier)
}

#[instrument(skip(out, cfg, snapshot, renderer))]
pub fn dispatch<W: Write>(
    out: &mut W,
    cfg: &Config,
    snapshot: &Snapshot,
    renderer: &Renderer,
    command: Command,
    today: NaiveDate,
    json: bool,
) -> anyhow::Result<()> {
    let index = HolidayIndex::build(&snapshot.holidays);
    if index.skipped() > 0 {
        debug!(skipped = index.skipped(), "holiday records without a usable date");
    }
    let classifier = build_classifier(cfg)?;
    let leaves = snapshot.leaves.as_slice();

    match command {
        Command::Month { date, shift } => {
            let anchor = anchor_date(date.as_deref(), today)?;
            let anchor = shift_period(anchor, ViewMode::Month, shift);
            let view = MonthView::build(anchor, leaves, &index, &classifier, today);
            info!(title = %view.title, leave_days = view.leave_days(), "month view");
            if json {
                write_json(out, &view)
            } else {
                renderer.render_month(out, &view)
            }
        }
        Command::Week { date, shift } => {
            let anchor = anchor_date(date.as_deref(), today)?;
            let anchor = shift_period(anchor, ViewMode::Week, shift);
            let view = WeekView::build(anchor, leaves, &index, &classifier, today);
            if json {
                write_json(out, &view)
            } else {
                renderer.render_week(out, &view)
            }
        }
        Command::Timeline { date } => {
            let anchor = anchor_date(date.as_deref(), today)?;
            let timeline = TeamTimeline::build(anchor, leaves, &index, &classifier);
            info!(
                rows = timeline.rows.len(),
                total = timeline.total_leaves(),
                "team timeline"
            );
            if json {
                write_json(out, &timeline)
            } else {
                renderer.render_timeline(out, &timeline)
            }
        }
        Command::Day { date } => {
            let date = anchor_date(date.as_deref(), today)?;
            let day = day_view(date, leaves, &index, &classifier, today);
            if json {
                write_json(out, &day)
            } else {
                renderer.render_day(out, &day)
            }
        }
        Command::Check {
            start,
            end,
            leave_type,
        } => {
            let start = parse_date_arg(&start, today).context("invalid start date")?;
            let end = parse_date_arg(&end, today).context("invalid end date")?;
            let application = LeaveApplication::new(leave_type, start, end);
            let verdict = validate_application(&application, &index, today)?;
            if json {
                write_json(out, &verdict)
            } else {
                renderer.render_verdict(out, &verdict)
            }
        }
        Command::Holidays { year, upcoming } => {
            let listed = if upcoming {
                index.upcoming(today, cfg.upcoming_limit()?)
            } else {
                index.in_year(year.unwrap_or_else(|| today.year()))
            };
            debug!(
                count = listed.len(),
                years = ?index.available_years(),
                "listing holidays"
            );
            if json {
                let entries = listed
                    .iter()
                    .filter_map(|holiday| {
                        let date = holiday.date?;
                        Some(HolidayEntry {
                            holiday,
                            proximity: HolidayProximity::classify(date, today),
                        })
                    })
                    .collect::<Vec<_>>();
                write_json(out, &entries)
            } else {
                renderer.render_holidays(out, &listed, today)
            }
        }
        Command::Classify { label, status } => {
            let status = LeaveStatus::parse(&status);
            let category = classifier.classify(&label, &status);
            if json {
                write_json(
                    out,
                    &ClassifyOutput {
                        label: &label,
                        status: &status,
                        category,
                    },
                )
            } else {
                writeln!(out, "{category}")?;
                Ok(())
            }
        }
    }
}

fn anchor_date(raw: Option<&str>, today: NaiveDate) -> anyhow::Result<NaiveDate> {
    match raw {
        Some(raw) => parse_date_arg(raw, today),
        None => Ok(today),
    }
}

fn write_json<W: Write, T: Serialize + ?Sized>(out: &mut W, value: &T) -> anyhow::Result<()> {
    let text = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    writeln!(out, "{text}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn snapshot() -> Snapshot {
        Snapshot::from_json(
            r#"[
                {"id": 1, "employee": "Asha", "leave_type": "Sick Leave",
                 "start_date": "2025-12-22", "end_date": "2025-12-23",
                 "days": 2, "status": "APPROVED"},
                {"id": 2, "employee": "Ravi", "leave_type": "Work From Home",
                 "start_date": "2025-12-29", "end_date": "2026-01-02",
                 "days": 5, "status": "PENDING"}
            ]"#,
            r#"[{"id": "h1", "name": "Christmas", "date": "2025-12-25", "day": "Thursday", "type": "MANDATORY"},
                {"id": "h2", "name": "New Year", "date": "2026-01-01", "day": "Thursday", "type": "OPTIONAL"}]"#,
        )
        .expect("snapshot")
    }

    fn run(command: Command, json: bool) -> anyhow::Result<String> {
        let mut out = Vec::new();
        dispatch(
            &mut out,
            &Config::default(),
            &snapshot(),
            &Renderer::plain(),
            command,
            ymd(2025, 12, 1),
            json,
        )?;
        Ok(String::from_utf8(out).expect("utf8"))
    }

    #[test]
    fn check_blocks_ranges_with_holidays() {
        let text = run(
            Command::Check {
                start: "2025-12-24".to_string(),
                end: "2025-12-26".to_string(),
                leave_type: "Casual Leave".to_string(),
            },
            true,
        )
        .expect("check");
        let value: Value = serde_json::from_str(&text).expect("json");
        assert_eq!(value["verdict"], "blocked");
        assert_eq!(value["holiday"]["name"], "Christmas");
    }

    #[test]
    fn check_rejects_past_start() {
        let err = run(
            Command::Check {
                start: "2025-11-03".to_string(),
                end: "2025-11-04".to_string(),
                leave_type: "Casual Leave".to_string(),
            },
            false,
        )
        .expect_err("past start");
        assert!(err.to_string().contains("start date cannot be in the past"));
    }

    #[test]
    fn check_requires_a_leave_type() {
        let err = run(
            Command::Check {
                start: "2025-12-08".to_string(),
                end: "2025-12-09".to_string(),
                leave_type: String::new(),
            },
            false,
        )
        .expect_err("no leave type");
        assert!(err.to_string().contains("please select a leave type"));
    }

    #[test]
    fn timeline_json_lists_rows_in_first_seen_order() {
        let text = run(
            Command::Timeline {
                date: Some("2025-12".to_string()),
            },
            true,
        )
        .expect("timeline");
        let value: Value = serde_json::from_str(&text).expect("json");
        let names = value["rows"]
            .as_array()
            .expect("rows")
            .iter()
            .map(|row| row["employee_name"].as_str().unwrap_or_default().to_string())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["Asha", "Ravi"]);
    }

    #[test]
    fn month_shift_moves_to_next_month() {
        let text = run(
            Command::Month {
                date: None,
                shift: 1,
            },
            false,
        )
        .expect("month");
        assert!(text.starts_with("January 2026"));
        assert!(text.contains("New Year"));
        assert!(text.contains("Ravi - Work From Home [PENDING]"));
    }

    #[test]
    fn upcoming_holidays_carry_proximity() {
        let text = run(
            Command::Holidays {
                year: None,
                upcoming: true,
            },
            true,
        )
        .expect("holidays");
        let value: Value = serde_json::from_str(&text).expect("json");
        assert_eq!(value[0]["name"], "Christmas");
        assert_eq!(value[0]["proximity"]["kind"], "upcoming");
        assert_eq!(value[0]["proximity"]["days"], 24);
        assert_eq!(value[1]["proximity"]["kind"], "later");
    }

    #[test]
    fn classify_prints_category_tag() {
        let text = run(
            Command::Classify {
                label: "Work From Home".to_string(),
                status: "approved".to_string(),
            },
            false,
        )
        .expect("classify");
        assert_eq!(text.trim(), "remote");
    }
}
