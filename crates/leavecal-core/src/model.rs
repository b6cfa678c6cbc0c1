use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::datetime::calendar_date_serde;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
    Other(String),
    #[default]
    Unknown,
}

impl LeaveStatus {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.to_ascii_uppercase().as_str() {
            "PENDING" => Self::Pending,
            "APPROVED" => Self::Approved,
            "REJECTED" => Self::Rejected,
            "" => Self::Unknown,
            _ => Self::Other(trimmed.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Other(raw) => raw,
            Self::Unknown => "",
        }
    }
}

impl From<String> for LeaveStatus {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<LeaveStatus> for String {
    fn from(status: LeaveStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for LeaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum HolidayKind {
    #[default]
    Mandatory,
    Optional,
}

impl From<String> for HolidayKind {
    fn from(raw: String) -> Self {
        if raw.trim().eq_ignore_ascii_case("optional") {
            Self::Optional
        } else {
            Self::Mandatory
        }
    }
}

impl From<HolidayKind> for String {
    fn from(kind: HolidayKind) -> Self {
        match kind {
            HolidayKind::Mandatory => "MANDATORY".to_string(),
            HolidayKind::Optional => "OPTIONAL".to_string(),
        }
    }
}

/// A requested or approved absence spanning an inclusive date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaveInterval {
    #[serde(default, deserialize_with = "deserialize_text")]
    pub id: String,

    #[serde(
        rename = "employee",
        alias = "employee_name",
        default,
        deserialize_with = "deserialize_text"
    )]
    pub employee_name: String,

    #[serde(
        rename = "leave_type",
        alias = "leave_type_label",
        default,
        deserialize_with = "deserialize_text"
    )]
    pub leave_type_label: String,

    #[serde(default, with = "calendar_date_serde::option")]
    pub start_date: Option<NaiveDate>,

    #[serde(default, with = "calendar_date_serde::option")]
    pub end_date: Option<NaiveDate>,

    #[serde(
        rename = "days",
        alias = "day_count",
        default,
        deserialize_with = "deserialize_day_count"
    )]
    pub day_count: f64,

    #[serde(default, deserialize_with = "deserialize_status")]
    pub status: LeaveStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl LeaveInterval {
    pub fn new(
        id: impl Into<String>,
        employee_name: impl Into<String>,
        leave_type_label: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
        status: LeaveStatus,
    ) -> Self {
        let day_count = (end_date - start_date).num_days() + 1;
        Self {
            id: id.into(),
            employee_name: employee_name.into(),
            leave_type_label: leave_type_label.into(),
            start_date: Some(start_date),
            end_date: Some(end_date),
            day_count: day_count.max(0) as f64,
            status,
            reason: None,
        }
    }

    /// Both ends, when present and ordered.
    pub fn span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let start = self.start_date?;
        let end = self.end_date?;
        (start <= end).then_some((start, end))
    }

    pub fn covers(&self, date: NaiveDate) -> bool {
        self.span()
            .map(|(start, end)| start <= date && date <= end)
            .unwrap_or(false)
    }
}

/// A company-observed non-working date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolidayRecord {
    #[serde(default, deserialize_with = "deserialize_text")]
    pub id: String,

    #[serde(default, deserialize_with = "deserialize_text")]
    pub name: String,

    #[serde(default, with = "calendar_date_serde::option")]
    pub date: Option<NaiveDate>,

    #[serde(
        rename = "day",
        alias = "weekday_label",
        default,
        deserialize_with = "deserialize_text"
    )]
    pub weekday_label: String,

    #[serde(
        rename = "type",
        alias = "kind",
        default,
        deserialize_with = "deserialize_kind"
    )]
    pub kind: HolidayKind,
}

impl HolidayRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            date: Some(date),
            weekday_label: date.format("%A").to_string(),
            kind: HolidayKind::Mandatory,
        }
    }
}

/// One slot of a month grid. Padding slots carry neither a day nor a date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CalendarCell {
    pub day_number: Option<u32>,
    pub date: Option<NaiveDate>,
    pub is_weekend: bool,
}

impl CalendarCell {
    pub fn blank() -> Self {
        Self::default()
    }

    pub fn is_blank(&self) -> bool {
        self.date.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CategoryStyle {
    Casual,
    Sick,
    Remote,
    Annual,
    Maternity,
    Pending,
    ApprovedOther,
    RejectedOther,
}

impl CategoryStyle {
    pub const ALL: [CategoryStyle; 8] = [
        Self::Casual,
        Self::Sick,
        Self::Remote,
        Self::Annual,
        Self::Maternity,
        Self::Pending,
        Self::ApprovedOther,
        Self::RejectedOther,
    ];

    pub fn as_tag(self) -> &'static str {
        match self {
            Self::Casual => "casual",
            Self::Sick => "sick",
            Self::Remote => "remote",
            Self::Annual => "annual",
            Self::Maternity => "maternity",
            Self::Pending => "pending",
            Self::ApprovedOther => "approved-other",
            Self::RejectedOther => "rejected-other",
        }
    }
}

impl fmt::Display for CategoryStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

impl FromStr for CategoryStyle {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|category| category.as_tag() == wanted)
            .ok_or_else(|| anyhow!("unknown category: {s}"))
    }
}

/// Text fields arrive as strings, numbers (ids) or null. Anything else is
/// treated as empty so one odd record never sinks the whole snapshot.
fn deserialize_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(raw)) => raw,
        Some(Value::Number(raw)) => raw.to_string(),
        Some(Value::Bool(raw)) => raw.to_string(),
        Some(other @ (Value::Array(_) | Value::Object(_))) => {
            tracing::debug!(value = %other, "ignoring non-scalar text field");
            String::new()
        }
        Some(Value::Null) | None => String::new(),
    })
}

fn deserialize_status<'de, D>(deserializer: D) -> Result<LeaveStatus, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_text(deserializer).map(|raw| LeaveStatus::parse(&raw))
}

fn deserialize_kind<'de, D>(deserializer: D) -> Result<HolidayKind, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_text(deserializer).map(HolidayKind::from)
}

fn deserialize_day_count<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(raw)) => raw.as_f64().unwrap_or(0.0),
        Some(Value::String(raw)) => raw.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    })
}
