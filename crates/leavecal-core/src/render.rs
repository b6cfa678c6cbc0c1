use std::io::{self, IsTerminal, Write};

use chrono::NaiveDate;
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::holidays::HolidayProximity;
use crate::model::{CategoryStyle, HolidayKind, HolidayRecord};
use crate::overlap::Verdict;
use crate::timeline::TeamTimeline;
use crate::view::{DayAnnotation, MonthView, WeekView};

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            color: cfg.color_enabled()? && io::stdout().is_terminal(),
        })
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip(self, out, view), fields(title = %view.title))]
    pub fn render_month<W: Write>(&self, out: &mut W, view: &MonthView<'_>) -> anyhow::Result<()> {
        writeln!(out, "{}", view.title)?;
        let header = view
            .weekdays
            .iter()
            .map(|label| format!("{:<5}", label.short))
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(out, "{}", header.trim_end())?;

        for week in view.cells.chunks(7) {
            let line = week
                .iter()
                .map(|day| self.month_cell(day))
                .collect::<Vec<_>>()
                .join(" ");
            writeln!(out, "{}", line.trim_end())?;
        }

        let details = view
            .cells
            .iter()
            .filter(|day| day.holiday.is_some() || !day.leaves.is_empty())
            .collect::<Vec<_>>();
        if !details.is_empty() {
            writeln!(out)?;
            self.write_day_details(out, &details)?;
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, out, view), fields(title = %view.title))]
    pub fn render_week<W: Write>(&self, out: &mut W, view: &WeekView<'_>) -> anyhow::Result<()> {
        writeln!(out, "Week {}", view.title)?;
        let mut rows = Vec::with_capacity(view.days.len());
        for day in &view.days {
            let Some(date) = day.cell.date else {
                continue;
            };
            let mut label = date.format("%a %b %d").to_string();
            if day.is_today {
                label = self.paint(&label, "1");
            }
            let holiday = day
                .holiday
                .map(|holiday| self.paint(&holiday.name, "91"))
                .unwrap_or_default();
            let leaves = day
                .leaves
                .iter()
                .map(|entry| {
                    self.paint_category(
                        &format!("{} ({})", entry.leave.employee_name, entry.leave.leave_type_label),
                        entry.category,
                    )
                })
                .collect::<Vec<_>>()
                .join(", ");
            rows.push(vec![label, holiday, leaves]);
        }
        write_table(
            out,
            vec!["Day".to_string(), "Holiday".to_string(), "Leaves".to_string()],
            rows,
        )
    }

    pub fn render_day<W: Write>(&self, out: &mut W, day: &DayAnnotation<'_>) -> anyhow::Result<()> {
        let Some(date) = day.cell.date else {
            return Ok(());
        };
        writeln!(out, "{}", date.format("%A, %Y-%m-%d"))?;
        match day.holiday {
            Some(holiday) => writeln!(out, "holiday   {} ({})", holiday.name, kind_label(holiday.kind))?,
            None => writeln!(out, "holiday   -")?,
        }
        if day.leaves.is_empty() {
            writeln!(out, "leaves    none")?;
            return Ok(());
        }

        let rows = day
            .leaves
            .iter()
            .map(|entry| {
                vec![
                    entry.leave.employee_name.clone(),
                    entry.leave.leave_type_label.clone(),
                    entry.leave.status.to_string(),
                    self.paint_category(entry.category.as_tag(), entry.category),
                    entry.leave.reason.clone().unwrap_or_default(),
                ]
            })
            .collect();
        write_table(
            out,
            vec![
                "Employee".to_string(),
                "Type".to_string(),
                "Status".to_string(),
                "Category".to_string(),
                "Reason".to_string(),
            ],
            rows,
        )
    }

    #[tracing::instrument(skip(self, out, timeline), fields(rows = timeline.rows.len()))]
    pub fn render_timeline<W: Write>(
        &self,
        out: &mut W,
        timeline: &TeamTimeline<'_>,
    ) -> anyhow::Result<()> {
        writeln!(out, "Team Timeline {}", timeline.month_start.format("%B %Y"))?;
        if timeline.is_empty() {
            writeln!(out, "No team leaves for this period")?;
            return Ok(());
        }

        let name_width = timeline
            .rows
            .iter()
            .map(|row| UnicodeWidthStr::width(row.employee_name.as_str()))
            .max()
            .unwrap_or(0)
            .max("Employee".len());

        let ruler = timeline
            .days
            .iter()
            .map(|day| char::from_digit(day.day % 10, 10).unwrap_or(' '))
            .collect::<String>();
        writeln!(out, "{}  {}", pad("Employee", name_width), ruler)?;

        for row in &timeline.rows {
            let mut strip = timeline
                .days
                .iter()
                .map(|day| {
                    if day.holiday.is_some() {
                        "!".to_string()
                    } else if day.is_weekend {
                        ":".to_string()
                    } else {
                        ".".to_string()
                    }
                })
                .collect::<Vec<_>>();
            for entry in &row.bars {
                let glyph = category_glyph(entry.category).to_string();
                let first = entry.bar.first_day.saturating_sub(1) as usize;
                let last = (entry.bar.last_day as usize).min(strip.len());
                for slot in strip.iter_mut().take(last).skip(first) {
                    *slot = self.paint_category(&glyph, entry.category);
                }
            }
            let count = match row.leave_count {
                1 => "1 leave".to_string(),
                n => format!("{n} leaves"),
            };
            writeln!(
                out,
                "{}  {}  {count}",
                pad(&row.employee_name, name_width),
                strip.concat()
            )?;
        }

        writeln!(out)?;
        writeln!(
            out,
            "{} Team Members, {} Total Leaves",
            timeline.rows.len(),
            timeline.total_leaves()
        )?;
        Ok(())
    }

    pub fn render_holidays<W: Write>(
        &self,
        out: &mut W,
        holidays: &[&HolidayRecord],
        today: NaiveDate,
    ) -> anyhow::Result<()> {
        if holidays.is_empty() {
            writeln!(out, "No holidays")?;
            return Ok(());
        }

        let rows = holidays
            .iter()
            .filter_map(|holiday| {
                let date = holiday.date?;
                let proximity = HolidayProximity::classify(date, today);
                let when = match proximity {
                    HolidayProximity::Past => self.paint(&proximity.label(), "90"),
                    HolidayProximity::Today | HolidayProximity::Tomorrow => {
                        self.paint(&proximity.label(), "1")
                    }
                    _ => proximity.label(),
                };
                Some(vec![
                    date.format("%Y-%m-%d").to_string(),
                    date.format("%A").to_string(),
                    holiday.name.clone(),
                    kind_label(holiday.kind).to_string(),
                    when,
                ])
            })
            .collect();
        write_table(
            out,
            vec![
                "Date".to_string(),
                "Day".to_string(),
                "Holiday".to_string(),
                "Type".to_string(),
                "When".to_string(),
            ],
            rows,
        )
    }

    pub fn render_verdict<W: Write>(&self, out: &mut W, verdict: &Verdict<'_>) -> anyhow::Result<()> {
        match verdict {
            Verdict::Accepted {
                start,
                end,
                day_count,
            } => writeln!(
                out,
                "{} {day_count} day(s) from {start} to {end}",
                self.paint("ok", "32")
            )?,
            Verdict::Blocked { holiday } => {
                let date = holiday
                    .date
                    .map(|date| date.format("%Y-%m-%d").to_string())
                    .unwrap_or_default();
                writeln!(
                    out,
                    "{} cannot apply leave on {} ({date})",
                    self.paint("blocked", "31"),
                    holiday.name
                )?
            }
        }
        Ok(())
    }

    fn month_cell(&self, day: &DayAnnotation<'_>) -> String {
        let Some(number) = day.cell.day_number else {
            return " ".repeat(5);
        };
        let holiday_flag = if day.holiday.is_some() { "!" } else { " " };
        let count = match day.leaves.len() {
            0 => "  ".to_string(),
            n if n < 10 => format!("+{n}"),
            _ => "+*".to_string(),
        };
        let text = format!("{number:>2}{holiday_flag}{count}");
        if day.is_today {
            self.paint(&text, "7")
        } else if day.holiday.is_some() {
            self.paint(&text, "91")
        } else if day.cell.is_weekend {
            self.paint(&text, "90")
        } else {
            text
        }
    }

    fn write_day_details<W: Write>(&self, out: &mut W, days: &[&DayAnnotation<'_>]) -> anyhow::Result<()> {
        let mut rows = Vec::new();
        for day in days {
            let Some(date) = day.cell.date else {
                continue;
            };
            let label = date.format("%b %d").to_string();
            if let Some(holiday) = day.holiday {
                rows.push(vec![label.clone(), self.paint(&holiday.name, "91")]);
            }
            for entry in &day.leaves {
                rows.push(vec![
                    label.clone(),
                    self.paint_category(
                        &format!(
                            "{} - {} [{}]",
                            entry.leave.employee_name,
                            entry.leave.leave_type_label,
                            entry.leave.status
                        ),
                        entry.category,
                    ),
                ]);
            }
        }
        write_table(out, vec!["Date".to_string(), "Details".to_string()], rows)
    }

    fn paint_category(&self, text: &str, category: CategoryStyle) -> String {
        self.paint(text, category_color(category))
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn category_color(category: CategoryStyle) -> &'static str {
    match category {
        CategoryStyle::Casual => "34",
        CategoryStyle::Sick => "31",
        CategoryStyle::Remote => "35",
        CategoryStyle::Annual => "94",
        CategoryStyle::Maternity => "95",
        CategoryStyle::Pending => "33",
        CategoryStyle::ApprovedOther => "32",
        CategoryStyle::RejectedOther => "90",
    }
}

fn category_glyph(category: CategoryStyle) -> char {
    match category {
        CategoryStyle::Casual => 'C',
        CategoryStyle::Sick => 'S',
        CategoryStyle::Remote => 'R',
        CategoryStyle::Annual => 'A',
        CategoryStyle::Maternity => 'M',
        CategoryStyle::Pending => 'P',
        CategoryStyle::ApprovedOther => 'O',
        CategoryStyle::RejectedOther => 'X',
    }
}

fn kind_label(kind: HolidayKind) -> &'static str {
    match kind {
        HolidayKind::Mandatory => "Mandatory",
        HolidayKind::Optional => "Optional",
    }
}

fn pad(text: &str, width: usize) -> String {
    let visible = UnicodeWidthStr::width(text);
    format!("{text}{}", " ".repeat(width.saturating_sub(visible)))
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    let header_line = headers
        .iter()
        .zip(&widths)
        .map(|(header, width)| pad(header, *width))
        .collect::<Vec<_>>()
        .join(" ");
    writeln!(writer, "{}", header_line.trim_end())?;

    let rule = widths
        .iter()
        .map(|width| "-".repeat(*width))
        .collect::<Vec<_>>()
        .join(" ");
    writeln!(writer, "{rule}")?;

    for row in rows {
        let line = row
            .iter()
            .zip(&widths)
            .map(|(cell, width)| {
                let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
                format!("{cell}{}", " ".repeat(width.saturating_sub(visible_width)))
            })
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(writer, "{}", line.trim_end())?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Classifier;
    use crate::holidays::HolidayIndex;
    use crate::model::{LeaveInterval, LeaveStatus};

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn render_to_string(f: impl FnOnce(&mut Vec<u8>) -> anyhow::Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).expect("render");
        String::from_utf8(buf).expect("utf8 output")
    }

    #[test]
    fn month_grid_renders_one_line_per_week() {
        let leaves = vec![LeaveInterval::new(
            "1",
            "Asha",
            "Sick Leave",
            ymd(2025, 12, 22),
            ymd(2025, 12, 23),
            LeaveStatus::Approved,
        )];
        let holidays = vec![HolidayRecord::new("h1", "Christmas", ymd(2025, 12, 25))];
        let index = HolidayIndex::build(&holidays);
        let view = MonthView::build(
            ymd(2025, 12, 1),
            &leaves,
            &index,
            &Classifier::default(),
            ymd(2025, 11, 1),
        );

        let text = render_to_string(|out| Renderer::plain().render_month(out, &view));
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "December 2025");
        assert!(lines[1].starts_with("Sun"));
        assert!(text.contains("25!"));
        assert!(text.contains("22 +1"));
        assert!(text.contains("Christmas"));
        assert!(text.contains("Asha - Sick Leave [APPROVED]"));
        assert!(!text.contains('\x1b'));
    }

    #[test]
    fn timeline_strip_marks_bars_and_holidays() {
        let leaves = vec![LeaveInterval::new(
            "1",
            "Asha",
            "Casual Leave",
            ymd(2025, 9, 2),
            ymd(2025, 9, 4),
            LeaveStatus::Approved,
        )];
        let holidays = vec![HolidayRecord::new("h1", "Onam", ymd(2025, 9, 5))];
        let index = HolidayIndex::build(&holidays);
        let timeline = TeamTimeline::build(ymd(2025, 9, 1), &leaves, &index, &Classifier::default());

        let text = render_to_string(|out| Renderer::plain().render_timeline(out, &timeline));
        let row = text
            .lines()
            .find(|line| line.starts_with("Asha"))
            .expect("employee row");
        let columns = row.split_whitespace().collect::<Vec<_>>();
        let strip = columns[1];
        assert_eq!(strip.len(), 30);
        assert_eq!(&strip[..6], ".CCC!:");
        assert_eq!(&columns[2..], ["1", "leave"]);
        assert!(text.contains("1 Team Members, 1 Total Leaves"));
    }

    #[test]
    fn empty_timeline_says_so() {
        let index = HolidayIndex::build(&[]);
        let timeline = TeamTimeline::build(ymd(2025, 9, 1), &[], &index, &Classifier::default());
        let text = render_to_string(|out| Renderer::plain().render_timeline(out, &timeline));
        assert!(text.contains("No team leaves for this period"));
    }

    #[test]
    fn renderer_reads_the_color_setting() {
        let mut cfg = Config::default();
        cfg.apply_overrides([("color".to_string(), "off".to_string())]);
        assert!(!Renderer::new(&cfg).expect("color off").color);

        cfg.apply_overrides([("color".to_string(), "sometimes".to_string())]);
        let err = Renderer::new(&cfg).expect_err("bad color");
        assert!(err.to_string().contains("color"));
    }

    #[test]
    fn verdicts_render_plainly() {
        let holiday = HolidayRecord::new("h1", "Christmas", ymd(2025, 12, 25));
        let text = render_to_string(|out| {
            Renderer::plain().render_verdict(out, &Verdict::Blocked { holiday: &holiday })
        });
        assert_eq!(text.trim(), "blocked cannot apply leave on Christmas (2025-12-25)");
    }

    #[test]
    fn strip_ansi_removes_escape_sequences() {
        assert_eq!(strip_ansi("\x1b[31mred\x1b[0m"), "red");
    }
}
